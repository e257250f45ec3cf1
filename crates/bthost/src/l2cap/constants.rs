//! L2CAP protocol constants

/// Fixed channel carrying ATT on LE links
pub const L2CAP_ATT_CID: u16 = 0x0004;

// MTU limits
pub const L2CAP_MIN_MTU: u16 = 48;
pub const L2CAP_LE_DEFAULT_MTU: u16 = 23;

// PSM ranges
pub const L2CAP_DYNAMIC_PSM_MIN: u16 = 0x1001;
pub const L2CAP_LE_PSM_MIN: u16 = 0x0001;
pub const L2CAP_LE_PSM_MAX: u16 = 0x00FF;
