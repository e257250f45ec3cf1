//! Controller power and lifecycle state
//!
//! The controller reports its own state through stack state events. The host
//! never sets the state directly: [`HostController::set_power`] only asks the
//! transport for a transition, and the state moves when the dispatcher sees
//! the matching event.

use crate::error::{check_status, Error, Result};
use crate::gap::advertising::check_advertising_payload;
use crate::gap::{AdvertisingParameters, BdAddr};
use crate::transport::Transport;
use log::{debug, info};
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Requested power mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PowerMode {
    Off = 0,
    On = 1,
    Sleep = 2,
}

/// Lifecycle state reported by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ControllerState {
    #[default]
    Off = 0,
    Initializing = 1,
    On = 2,
    Halting = 3,
    Sleeping = 4,
    FallingAsleep = 5,
}

impl ControllerState {
    /// Decode a raw state code. Unknown codes map to `Off` so a bad event
    /// cannot leave the previous state in place.
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Self::Off,
            1 => Self::Initializing,
            2 => Self::On,
            3 => Self::Halting,
            4 => Self::Sleeping,
            5 => Self::FallingAsleep,
            _ => Self::Off,
        }
    }
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Off => write!(f, "off"),
            Self::Initializing => write!(f, "initializing"),
            Self::On => write!(f, "on"),
            Self::Halting => write!(f, "halting"),
            Self::Sleeping => write!(f, "sleeping"),
            Self::FallingAsleep => write!(f, "falling asleep"),
        }
    }
}

/// Observer invoked with `(previous, current)` on every transition
pub type StateObserver = Arc<dyn Fn(ControllerState, ControllerState) + Send + Sync + 'static>;

/// Tracks the controller state machine
pub struct HostController {
    transport: Arc<dyn Transport>,
    state: Mutex<ControllerState>,
    changed: Condvar,
    observers: Mutex<Vec<StateObserver>>,
    advertising: AtomicBool,
}

impl HostController {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            state: Mutex::new(ControllerState::Off),
            changed: Condvar::new(),
            observers: Mutex::new(Vec::new()),
            advertising: AtomicBool::new(false),
        }
    }

    /// Current state
    pub fn state(&self) -> ControllerState {
        *self.state.lock()
    }

    pub fn is_on(&self) -> bool {
        self.state() == ControllerState::On
    }

    /// Ask the controller for a power transition.
    ///
    /// The state does not change here; poll [`Self::state`] or use
    /// [`Self::wait_for_state`] until the controller confirms.
    pub fn set_power(&self, mode: PowerMode) -> Result<()> {
        debug!("Requesting power mode {:?}", mode);
        check_status(self.transport.power_control(mode))
    }

    /// Register an observer for state transitions
    pub fn observe<F>(&self, observer: F)
    where
        F: Fn(ControllerState, ControllerState) + Send + Sync + 'static,
    {
        self.observers.lock().push(Arc::new(observer));
    }

    /// Block until the controller reports `target` or the timeout expires.
    pub fn wait_for_state(&self, target: ControllerState, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while *state != target {
            if self.changed.wait_until(&mut state, deadline).timed_out() && *state != target {
                return Err(Error::Timeout);
            }
        }
        Ok(())
    }

    /// Public address of the local controller
    pub fn local_address(&self) -> BdAddr {
        BdAddr::new(self.transport.local_address())
    }

    pub fn set_advertising_parameters(&self, params: &AdvertisingParameters) -> Result<()> {
        params.validate()?;
        debug!(
            "Advertising {:?} every 0x{:04X}-0x{:04X} on channels 0x{:02X}",
            params.advertising_type, params.interval_min, params.interval_max, params.channel_map
        );
        check_status(self.transport.set_advertising_parameters(params))
    }

    /// Replace the advertising payload. `data` is already AD-encoded.
    pub fn set_advertising_data(&self, data: &[u8]) -> Result<()> {
        check_advertising_payload(data)?;
        debug!("Advertising data: {}", hex::encode(data));
        check_status(self.transport.set_advertising_data(data))
    }

    /// Replace the scan response payload. `data` is already AD-encoded.
    pub fn set_scan_response(&self, data: &[u8]) -> Result<()> {
        check_advertising_payload(data)?;
        debug!("Scan response data: {}", hex::encode(data));
        check_status(self.transport.set_scan_response_data(data))
    }

    /// Start or stop advertising
    pub fn set_advertising(&self, enabled: bool) -> Result<()> {
        check_status(self.transport.set_advertising_enabled(enabled))?;
        self.advertising.store(enabled, Ordering::SeqCst);
        info!("Advertising {}", if enabled { "enabled" } else { "disabled" });
        Ok(())
    }

    /// Whether advertising was last enabled, cleared when the controller turns off
    pub fn is_advertising(&self) -> bool {
        self.advertising.load(Ordering::SeqCst)
    }

    /// Apply a state reported by the controller. Only the dispatcher calls this.
    pub(crate) fn update_state(&self, new_state: ControllerState) {
        let previous = {
            let mut state = self.state.lock();
            std::mem::replace(&mut *state, new_state)
        };
        self.changed.notify_all();

        if previous == new_state {
            return;
        }

        info!("Controller state {} -> {}", previous, new_state);
        if new_state == ControllerState::Off {
            self.advertising.store(false, Ordering::SeqCst);
        }

        // Observers may register further observers
        let observers = self.observers.lock().clone();
        for observer in observers {
            observer(previous, new_state);
        }
    }
}
