//! Attribute Protocol (ATT) opcodes
//!
//! PDU encoding and the attribute database belong to the GATT server built on
//! top of [`crate::l2cap::L2capConnection`]. The host only needs to recognise
//! opcodes to describe incoming ATT traffic.

pub mod constants;
pub mod opcode;

pub use self::constants::*;
pub use self::opcode::AttOpcode;
