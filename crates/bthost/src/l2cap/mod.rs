//! L2CAP (Logical Link Control and Adaptation Protocol) glue
//!
//! This module provides the host side of L2CAP on top of a transport that
//! already implements the protocol itself:
//! - Fixed channel and PSM registration for BR/EDR and LE
//! - Pending connection queue and per-handle receive queues
//! - Socket-style connections for the ATT/GATT layer

pub mod constants;
pub mod core;
pub mod psm;
pub mod socket;
pub mod types;
#[cfg(test)]
mod tests;

// Re-export the public API
pub use self::core::L2capManager;
pub use self::psm::{is_valid_le_psm, PSM};
pub use self::socket::{L2capConnection, L2capServer, L2capSocket, ServerBinding, SocketFlags, SocketStatus};
pub use self::types::*;
