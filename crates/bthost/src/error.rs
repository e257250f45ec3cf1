//! Error types for the bthost library
//!
//! Every fallible operation on the controller, the channel manager and the
//! connection sockets reports one of these kinds. Raw status codes coming back
//! from the transport are mapped onto the taxonomy with [`check_status`].

use thiserror::Error;

/// Errors reported by the host glue
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Transport or controller not ready")]
    NotReady,

    #[error("Channel or PSM already registered")]
    AlreadyRegistered,

    #[error("Channel or PSM not registered")]
    NotRegistered,

    #[error("No pending connection")]
    NoPendingConnection,

    #[error("No data available")]
    NoData,

    #[error("Transport congested")]
    Congested,

    #[error("Connection closed")]
    Disconnected,

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid packet: {0}")]
    InvalidPacket(&'static str),

    #[error("Timed out")]
    Timeout,

    #[error("Unspecified error (status {0})")]
    Unspecified(i32),
}

/// Result type for host operations
pub type Result<T> = std::result::Result<T, Error>;

// Status codes the transport uses for the error kinds it can detect itself.
pub const STATUS_SUCCESS: i32 = 0;
pub const STATUS_COMMAND_DISALLOWED: i32 = 0x0C;
pub const STATUS_UNKNOWN_CONNECTION_IDENTIFIER: i32 = 0x02;
pub const STATUS_ACL_BUFFERS_FULL: i32 = 0x57;
pub const STATUS_SERVICE_ALREADY_REGISTERED: i32 = 0x69;
pub const STATUS_SERVICE_NOT_REGISTERED: i32 = 0x6B;

impl Error {
    /// Map a non-zero transport status code to an error kind.
    pub fn from_status(code: i32) -> Self {
        match code {
            STATUS_COMMAND_DISALLOWED => Error::NotReady,
            STATUS_UNKNOWN_CONNECTION_IDENTIFIER => Error::Disconnected,
            STATUS_ACL_BUFFERS_FULL => Error::Congested,
            STATUS_SERVICE_ALREADY_REGISTERED => Error::AlreadyRegistered,
            STATUS_SERVICE_NOT_REGISTERED => Error::NotRegistered,
            other => Error::Unspecified(other),
        }
    }

    /// Whether polling again later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Congested | Error::NoData | Error::NoPendingConnection)
    }

    /// The controller status byte behind an opaque failure, if it fits in one.
    pub fn hci_status(&self) -> Option<u8> {
        match *self {
            Error::Unspecified(code) => u8::try_from(code).ok(),
            _ => None,
        }
    }
}

/// Turn a raw transport status code into a `Result`.
pub fn check_status(code: i32) -> Result<()> {
    if code == STATUS_SUCCESS {
        Ok(())
    } else {
        Err(Error::from_status(code))
    }
}
