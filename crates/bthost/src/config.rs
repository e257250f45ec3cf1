//! Host configuration

use std::time::Duration;

/// USB transport settings forwarded to the transport before power-on
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsbTransportConfig {
    /// USB port path of the dongle to open; empty selects the first match
    pub path: Vec<u8>,
    /// Extra (vendor id, product id) pairs to accept as controllers
    pub devices: Vec<(u16, u16)>,
}

impl UsbTransportConfig {
    pub fn is_empty(&self) -> bool {
        self.path.is_empty() && self.devices.is_empty()
    }
}

/// Configuration for a [`crate::BluetoothHost`]
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Maximum LE MTU to apply at start-up; `None` keeps the transport default
    pub max_le_mtu: Option<u16>,
    /// How long [`crate::BluetoothHost::power_on`] waits for the controller
    pub power_on_timeout: Duration,
    pub usb: UsbTransportConfig,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            max_le_mtu: None,
            power_on_timeout: Duration::from_secs(5),
            usb: UsbTransportConfig::default(),
        }
    }
}
