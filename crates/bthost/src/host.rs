//! Owned wiring of the host components around one transport

use crate::config::HostConfig;
use crate::dispatch::EventDispatcher;
use crate::error::{check_status, Result};
use crate::hci::{ControllerState, HostController, PowerMode};
use crate::l2cap::{L2capManager, L2capServer};
use crate::transport::Transport;
use log::info;
use std::sync::Arc;

/// Controller state machine, channel manager and dispatcher for one transport.
///
/// The dispatcher stays subscribed to the transport for as long as the host
/// lives.
pub struct BluetoothHost {
    transport: Arc<dyn Transport>,
    controller: Arc<HostController>,
    l2cap: Arc<L2capManager>,
    config: HostConfig,
}

impl BluetoothHost {
    pub fn new(transport: Arc<dyn Transport>, config: HostConfig) -> Result<Self> {
        let controller = Arc::new(HostController::new(transport.clone()));
        let l2cap = Arc::new(L2capManager::new(transport.clone()));

        if !config.usb.is_empty() {
            check_status(transport.configure_usb(&config.usb))?;
        }
        if let Some(mtu) = config.max_le_mtu {
            l2cap.set_max_le_mtu(mtu)?;
        }

        transport.subscribe(Arc::new(EventDispatcher::new(controller.clone(), l2cap.clone())));

        Ok(Self {
            transport,
            controller,
            l2cap,
            config,
        })
    }

    pub fn controller(&self) -> &Arc<HostController> {
        &self.controller
    }

    pub fn l2cap(&self) -> &Arc<L2capManager> {
        &self.l2cap
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Request power-on and wait for the controller to report `On`.
    pub fn power_on(&self) -> Result<()> {
        self.controller.set_power(PowerMode::On)?;
        self.controller
            .wait_for_state(ControllerState::On, self.config.power_on_timeout)?;
        info!("Controller {} is on", self.controller.local_address());
        Ok(())
    }

    /// Server on the LE ATT fixed channel, bound to the local address
    pub fn le_server(&self) -> Result<L2capServer> {
        L2capServer::low_energy(self.l2cap.clone(), self.controller.local_address())
    }

    /// Server on an LE PSM, bound to the local address
    pub fn le_psm_server(&self, psm: u16) -> Result<L2capServer> {
        L2capServer::for_le_psm(self.l2cap.clone(), self.controller.local_address(), psm)
    }
}

impl Drop for BluetoothHost {
    fn drop(&mut self) {
        self.transport.unsubscribe();
    }
}
