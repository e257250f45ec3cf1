//! Protocol/Service Multiplexer (PSM) handling for L2CAP
//!
//! BR/EDR and LE PSMs live in independent number spaces with different
//! validity rules, so they are checked separately.

use super::constants::*;
use std::fmt;

/// Protocol/Service Multiplexer (PSM) values used on BR/EDR links.
///
/// See Bluetooth Core Specification Vol 3, Part A, Section 4.2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum PSM {
    /// Service Discovery Protocol
    SDP,
    /// RFCOMM protocol
    RFCOMM,
    /// BNEP protocol
    BNEP,
    /// HID Control
    HID_CONTROL,
    /// HID Interrupt
    HID_INTERRUPT,
    /// AVCTP protocol
    AVCTP,
    /// AVDTP protocol
    AVDTP,
    /// ATT over BR/EDR
    ATT,
    /// Enhanced ATT
    EATT,
    /// Dynamically assigned PSM
    Dynamic(u16),
}

impl PSM {
    /// Check if the PSM is valid
    pub fn is_valid(&self) -> bool {
        match self {
            PSM::Dynamic(value) => *value >= L2CAP_DYNAMIC_PSM_MIN && has_psm_shape(*value),
            _ => true,
        }
    }

    /// Get the PSM value as u16
    pub fn value(&self) -> u16 {
        match self {
            PSM::SDP => 0x0001,
            PSM::RFCOMM => 0x0003,
            PSM::BNEP => 0x000F,
            PSM::HID_CONTROL => 0x0011,
            PSM::HID_INTERRUPT => 0x0013,
            PSM::AVCTP => 0x0017,
            PSM::AVDTP => 0x0019,
            PSM::ATT => 0x001F,
            PSM::EATT => 0x0027,
            PSM::Dynamic(value) => *value,
        }
    }

    /// Try to create a PSM from a u16 value
    pub fn from_value(value: u16) -> Option<Self> {
        match value {
            0x0001 => Some(PSM::SDP),
            0x0003 => Some(PSM::RFCOMM),
            0x000F => Some(PSM::BNEP),
            0x0011 => Some(PSM::HID_CONTROL),
            0x0013 => Some(PSM::HID_INTERRUPT),
            0x0017 => Some(PSM::AVCTP),
            0x0019 => Some(PSM::AVDTP),
            0x001F => Some(PSM::ATT),
            0x0027 => Some(PSM::EATT),
            _ => Some(PSM::Dynamic(value)).filter(PSM::is_valid),
        }
    }
}

impl fmt::Display for PSM {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PSM::SDP => write!(f, "SDP (0x0001)"),
            PSM::RFCOMM => write!(f, "RFCOMM (0x0003)"),
            PSM::BNEP => write!(f, "BNEP (0x000F)"),
            PSM::HID_CONTROL => write!(f, "HID-Control (0x0011)"),
            PSM::HID_INTERRUPT => write!(f, "HID-Interrupt (0x0013)"),
            PSM::AVCTP => write!(f, "AVCTP (0x0017)"),
            PSM::AVDTP => write!(f, "AVDTP (0x0019)"),
            PSM::ATT => write!(f, "ATT (0x001F)"),
            PSM::EATT => write!(f, "EATT (0x0027)"),
            PSM::Dynamic(value) => write!(f, "Dynamic PSM (0x{:04X})", value),
        }
    }
}

// Least significant octet odd, most significant octet even.
fn has_psm_shape(value: u16) -> bool {
    value & 0x0101 == 0x0001
}

/// LE PSMs occupy a single octet: 0x0001-0x007F fixed, 0x0080-0x00FF dynamic.
pub fn is_valid_le_psm(value: u16) -> bool {
    (L2CAP_LE_PSM_MIN..=L2CAP_LE_PSM_MAX).contains(&value)
}
