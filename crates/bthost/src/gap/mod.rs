//! Generic Access Profile types shared by the host layers
//!
//! Addressing vocabulary and the legacy advertising parameters the host
//! hands to the transport. Discovery is owned by the transport.

pub mod advertising;
pub mod types;

pub use advertising::{AdvertisingParameters, AdvertisingType};
pub use types::*;
