//! HCI protocol constants
//!
//! This module contains the packet type tags delivered by the transport
//! callback and the event codes the dispatcher understands.

// Packet types handed to the packet handler
pub const HCI_COMMAND_DATA_PACKET: u8 = 0x01;
pub const HCI_ACL_DATA_PACKET: u8 = 0x02;
pub const HCI_EVENT_PACKET: u8 = 0x04;
pub const L2CAP_DATA_PACKET: u8 = 0x06;
pub const RFCOMM_DATA_PACKET: u8 = 0x07;
pub const ATT_DATA_PACKET: u8 = 0x08;

// Common OGF (Opcode Group Field) values
pub const OGF_LINK_CTL: u8 = 0x01;

// Link Control Commands (OGF: 0x01)
pub const OCF_DISCONNECT: u16 = 0x0006;

// Disconnect reasons
pub const HCI_REMOTE_USER_TERMINATED_CONNECTION: u8 = 0x13;

// HCI Events
pub const EVT_DISCONN_COMPLETE: u8 = 0x05;
pub const EVT_LE_META_EVENT: u8 = 0x3E;
pub const EVT_VENDOR_SPECIFIC: u8 = 0xFF;

// Stack events emitted by the transport itself
pub const EVT_STACK_STATE: u8 = 0x60;
pub const EVT_TRANSPORT_USB_INFO: u8 = 0x70;

// LE Meta Events
pub const EVT_LE_CONN_COMPLETE: u8 = 0x01;
pub const EVT_LE_ENHANCED_CONN_COMPLETE: u8 = 0x0A;

// Fixed parameter lengths, subevent code included for meta events
pub const DISCONN_COMPLETE_LEN: usize = 4;
pub const LE_CONN_COMPLETE_LEN: usize = 19;
pub const LE_ENHANCED_CONN_COMPLETE_LEN: usize = 31;
pub const TRANSPORT_USB_INFO_MIN_LEN: usize = 5;

/// Connection handles only use the low 12 bits.
pub const CONNECTION_HANDLE_MASK: u16 = 0x0FFF;
