//! Transport capability consumed by the host glue
//!
//! The transport owns the physical link to the controller (USB or otherwise)
//! and the lower stack layers. The host only issues commands through
//! [`Transport`] and receives packets through a single subscribed
//! [`PacketHandler`]. Status codes follow the convention in
//! [`crate::error::check_status`]: zero is success.

use crate::config::UsbTransportConfig;
use crate::gap::AdvertisingParameters;
use crate::hci::{HciCommand, PowerMode};
use crate::l2cap::SecurityLevel;
use std::sync::Arc;

/// Receiver for every packet the transport delivers upward.
///
/// `packet` is only valid for the duration of the call; implementations must
/// copy anything they keep.
pub trait PacketHandler: Send + Sync {
    fn handle_packet(&self, packet_type: u8, channel: u16, packet: &[u8]);
}

/// Outbound command contract towards the controller stack
pub trait Transport: Send + Sync {
    /// Whether the transport has been initialized and accepts commands
    fn is_ready(&self) -> bool;

    /// Install the upward handler, replacing any previous one
    fn subscribe(&self, handler: Arc<dyn PacketHandler>);

    /// Drop the upward handler
    fn unsubscribe(&self);

    /// Apply transport-specific USB settings before power-on
    fn configure_usb(&self, config: &UsbTransportConfig) -> i32;

    fn power_control(&self, mode: PowerMode) -> i32;

    fn send_command(&self, command: &HciCommand) -> i32;

    /// Hand one outbound payload to the transport for `handle`
    fn send_packet(&self, handle: u16, data: &[u8]) -> i32;

    /// Whether another outbound packet for `handle` would be accepted now
    fn can_send_now(&self, handle: u16) -> bool;

    fn register_fixed_channel(&self, cid: u16) -> i32;

    fn register_service(&self, psm: u16, mtu: u16, security: SecurityLevel) -> i32;

    fn unregister_service(&self, psm: u16) -> i32;

    fn register_le_service(&self, psm: u16, mtu: u16, security: SecurityLevel) -> i32;

    fn unregister_le_service(&self, psm: u16) -> i32;

    /// Largest BR/EDR MTU the controller stack supports
    fn max_mtu(&self) -> u16;

    fn max_le_mtu(&self) -> u16;

    fn set_max_le_mtu(&self, mtu: u16);

    /// Local public address, little-endian
    fn local_address(&self) -> [u8; 6];

    fn set_advertising_parameters(&self, params: &AdvertisingParameters) -> i32;

    /// Replace the advertising payload. The transport copies `data`.
    fn set_advertising_data(&self, data: &[u8]) -> i32;

    /// Replace the scan response payload. The transport copies `data`.
    fn set_scan_response_data(&self, data: &[u8]) -> i32;

    fn set_advertising_enabled(&self, enabled: bool) -> i32;
}
