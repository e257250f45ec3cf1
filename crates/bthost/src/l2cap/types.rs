//! Type definitions for L2CAP operations
//!
//! This module contains the registry and connection vocabulary shared by the
//! channel manager and the connection sockets.

use crate::gap::{AddressType, BdAddr};
use std::fmt;

/// Controller-assigned identifier of an open link
pub type ConnectionHandle = u16;

/// Fixed or dynamically negotiated channel identifier
pub type ChannelId = u16;

/// Connection types for L2CAP
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionType {
    /// Classic Bluetooth connection (ACL)
    Classic,
    /// Bluetooth Low Energy connection (LE)
    LE,
}

/// Socket security level, numbered like BlueZ's `BT_SECURITY_*` values
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[repr(u8)]
pub enum SecurityLevel {
    /// Only allowed for SDP
    #[default]
    Sdp = 0,
    /// No encryption, no authentication
    Low = 1,
    /// Encryption without MITM protection
    Medium = 2,
    /// Authenticated encryption
    High = 3,
    /// Authenticated LE Secure Connections with 128-bit keys
    Fips = 4,
}

impl fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sdp => write!(f, "SDP"),
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
            Self::Fips => write!(f, "FIPS"),
        }
    }
}

/// A PSM registered for incoming connections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceRegistration {
    pub psm: u16,
    pub mtu: u16,
    pub security_level: SecurityLevel,
    pub connection_type: ConnectionType,
}

/// Where a handle is in its lifecycle. Closed handles are forgotten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// Link-layer connection complete, not yet handed to the application
    Pending,
    /// Returned by `accept`
    Accepted,
}

/// One link-layer connection as handed out by `accept_link`.
///
/// The controller may reuse a handle once its link closes; the generation
/// tells the old and new links apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkId {
    pub handle: ConnectionHandle,
    pub generation: u64,
}

/// Remote side of a link, as reported in the connection complete event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerInfo {
    pub address: BdAddr,
    pub address_type: AddressType,
}

impl PeerInfo {
    pub fn new(address: BdAddr, address_type: AddressType) -> Self {
        Self { address, address_type }
    }
}

/// One payload taken off a receive queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedFrame {
    pub data: Vec<u8>,
    /// Bytes past the requested length that were dropped
    pub discarded: usize,
}

impl ReceivedFrame {
    pub fn is_truncated(&self) -> bool {
        self.discarded > 0
    }
}
