//! bthost - Host-side glue between a Bluetooth controller stack and a GATT server
//!
//! This library tracks the controller's power state, keeps the L2CAP channel
//! and connection registry, and turns the transport's single packet callback
//! into per-connection queues. Connections are exposed as sockets for the
//! ATT/GATT layer above.

pub mod att;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod gap;
pub mod hci;
pub mod host;
pub mod l2cap;
pub mod transport;

// Re-export common types for convenience
pub use config::{HostConfig, UsbTransportConfig};
pub use dispatch::EventDispatcher;
pub use error::{Error, Result};
pub use gap::{AdvertisingParameters, AdvertisingType, BdAddr};
pub use hci::{ControllerState, HostController, PowerMode};
pub use host::BluetoothHost;
pub use l2cap::{L2capConnection, L2capManager, L2capServer, L2capSocket, SecurityLevel, SocketStatus};
pub use transport::{PacketHandler, Transport};
