//! Bluetooth HCI (Host Controller Interface) implementation
//!
//! This module provides event parsing and the controller state machine.

pub mod constants;
pub mod controller;
pub mod packet;


pub use controller::{ControllerState, HostController, PowerMode, StateObserver};
pub use packet::{DisconnectionComplete, Event, HciCommand, HciEvent, LeConnectionComplete, TransportUsbInfo};
