//! Legacy LE advertising parameters
//!
//! Advertising and scan response payloads are opaque bytes here; building
//! AD structures is left to the caller.

use super::types::{AddressType, BdAddr};
use crate::error::{Error, Result};

/// Largest legacy advertising or scan response payload
pub const ADVERTISING_DATA_MAX_LEN: usize = 31;

// Advertising interval bounds, in 0.625 ms units
pub const ADVERTISING_INTERVAL_MIN: u16 = 0x0020;
pub const ADVERTISING_INTERVAL_MAX: u16 = 0x4000;
pub const ADVERTISING_INTERVAL_DEFAULT: u16 = 0x0030;

/// All three primary advertising channels
pub const ADVERTISING_CHANNEL_ALL: u8 = 0x07;

/// Advertising PDU type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum AdvertisingType {
    /// ADV_IND
    #[default]
    ConnectableUndirected = 0x00,
    /// ADV_DIRECT_IND, high duty cycle
    ConnectableDirectedHighDuty = 0x01,
    /// ADV_SCAN_IND
    ScannableUndirected = 0x02,
    /// ADV_NONCONN_IND
    NonConnectableUndirected = 0x03,
    /// ADV_DIRECT_IND, low duty cycle
    ConnectableDirectedLowDuty = 0x04,
}

/// Parameters for LE Set Advertising Parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvertisingParameters {
    pub interval_min: u16,
    pub interval_max: u16,
    pub advertising_type: AdvertisingType,
    /// Only used by directed advertising
    pub direct_address_type: AddressType,
    pub direct_address: BdAddr,
    pub channel_map: u8,
    pub filter_policy: u8,
}

impl Default for AdvertisingParameters {
    fn default() -> Self {
        Self {
            interval_min: ADVERTISING_INTERVAL_DEFAULT,
            interval_max: ADVERTISING_INTERVAL_DEFAULT,
            advertising_type: AdvertisingType::ConnectableUndirected,
            direct_address_type: AddressType::Public,
            direct_address: BdAddr::ZERO,
            channel_map: ADVERTISING_CHANNEL_ALL,
            filter_policy: 0x00,
        }
    }
}

impl AdvertisingParameters {
    pub fn validate(&self) -> Result<()> {
        let range = ADVERTISING_INTERVAL_MIN..=ADVERTISING_INTERVAL_MAX;
        if !range.contains(&self.interval_min) || !range.contains(&self.interval_max) {
            return Err(Error::InvalidParameter(format!(
                "Advertising interval 0x{:04X}-0x{:04X} out of range",
                self.interval_min, self.interval_max
            )));
        }
        if self.interval_min > self.interval_max {
            return Err(Error::InvalidParameter(format!(
                "Advertising interval min 0x{:04X} above max 0x{:04X}",
                self.interval_min, self.interval_max
            )));
        }
        if self.channel_map == 0 || self.channel_map & !ADVERTISING_CHANNEL_ALL != 0 {
            return Err(Error::InvalidParameter(format!(
                "Invalid channel map 0x{:02X}",
                self.channel_map
            )));
        }
        if self.filter_policy > 0x03 {
            return Err(Error::InvalidParameter(format!(
                "Invalid filter policy 0x{:02X}",
                self.filter_policy
            )));
        }
        Ok(())
    }
}

/// Reject payloads that do not fit a legacy advertising PDU
pub(crate) fn check_advertising_payload(data: &[u8]) -> Result<()> {
    if data.len() > ADVERTISING_DATA_MAX_LEN {
        return Err(Error::InvalidParameter(format!(
            "Advertising payload of {} bytes exceeds {}",
            data.len(),
            ADVERTISING_DATA_MAX_LEN
        )));
    }
    Ok(())
}
