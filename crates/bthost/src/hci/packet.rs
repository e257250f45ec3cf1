//! HCI packet structures and parsing
//!
//! Events are parsed as borrowed views over the transport's buffer. Nothing in
//! this module copies payload bytes; callers that need the data after the
//! packet handler returns must copy it themselves.

use crate::error::{Error, Result};
use crate::gap::{AddressType, BdAddr, Role};
use crate::hci::constants::*;
use crate::hci::controller::ControllerState;
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};

/// HCI commands issued by the host glue
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum HciCommand {
    Disconnect { handle: u16, reason: u8 },
}

impl HciCommand {
    /// Get the OGF and OCF for this command
    pub fn opcode_parts(&self) -> (u8, u16) {
        match self {
            Self::Disconnect { .. } => (OGF_LINK_CTL, OCF_DISCONNECT),
        }
    }

    /// The combined 16-bit opcode
    pub fn opcode(&self) -> u16 {
        let (ogf, ocf) = self.opcode_parts();
        ((ogf as u16) << 10) | (ocf & 0x3ff)
    }

    fn parameters(&self) -> Vec<u8> {
        match *self {
            Self::Disconnect { handle, reason } => {
                let mut params = Vec::with_capacity(3);
                params.extend_from_slice(&handle.to_le_bytes());
                params.push(reason);
                params
            }
        }
    }

    /// Convert the command to a raw HCI packet
    pub fn to_packet(&self) -> Vec<u8> {
        let params = self.parameters();

        let mut packet = vec![HCI_COMMAND_DATA_PACKET];
        packet.extend_from_slice(&self.opcode().to_le_bytes());
        packet.push(params.len() as u8);
        packet.extend_from_slice(&params);
        packet
    }
}

/// Read-only view of an HCI event packet
#[derive(Debug, Clone, Copy)]
pub struct HciEvent<'a> {
    pub event_code: u8,
    pub parameter_total_length: u8,
    pub parameters: &'a [u8],
}

impl<'a> HciEvent<'a> {
    /// Parse an HCI event from raw bytes (event code first, no packet type).
    pub fn parse(data: &'a [u8]) -> Option<Self> {
        if data.len() < 2 {
            return None;
        }

        let event_code = data[0];
        let parameter_total_length = data[1];
        let end = parameter_total_length as usize + 2;

        let parameters = data.get(2..end)?;

        Some(HciEvent {
            event_code,
            parameter_total_length,
            parameters,
        })
    }
}

/// LE Connection Complete (plain or enhanced)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeConnectionComplete {
    pub status: u8,
    pub handle: u16,
    pub role: Role,
    pub peer_address_type: AddressType,
    pub peer_address: BdAddr,
    pub conn_interval: u16,
    pub conn_latency: u16,
    pub supervision_timeout: u16,
}

impl LeConnectionComplete {
    /// Parse from LE meta event parameters, subevent code included.
    pub fn parse(params: &[u8]) -> Result<Self> {
        let subevent = *params.first().ok_or(Error::InvalidPacket("empty LE meta event"))?;
        let required = match subevent {
            EVT_LE_CONN_COMPLETE => LE_CONN_COMPLETE_LEN,
            EVT_LE_ENHANCED_CONN_COMPLETE => LE_ENHANCED_CONN_COMPLETE_LEN,
            _ => return Err(Error::InvalidPacket("not a connection complete subevent")),
        };
        if params.len() < required {
            return Err(Error::InvalidPacket("truncated LE connection complete"));
        }

        let mut cursor = Cursor::new(&params[1..]);
        let status = read_u8(&mut cursor)?;
        let handle = read_u16(&mut cursor)? & CONNECTION_HANDLE_MASK;
        let role = Role::from(read_u8(&mut cursor)?);
        let peer_address_type = AddressType::from(read_u8(&mut cursor)?);

        let mut addr = [0u8; 6];
        cursor
            .read_exact(&mut addr)
            .map_err(|_| Error::InvalidPacket("truncated peer address"))?;

        if subevent == EVT_LE_ENHANCED_CONN_COMPLETE {
            // Local and peer resolvable private addresses
            let mut rpa = [0u8; 12];
            cursor
                .read_exact(&mut rpa)
                .map_err(|_| Error::InvalidPacket("truncated private addresses"))?;
        }

        Ok(Self {
            status,
            handle,
            role,
            peer_address_type,
            peer_address: BdAddr::new(addr),
            conn_interval: read_u16(&mut cursor)?,
            conn_latency: read_u16(&mut cursor)?,
            supervision_timeout: read_u16(&mut cursor)?,
        })
    }
}

/// Disconnection Complete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisconnectionComplete {
    pub status: u8,
    pub handle: u16,
    pub reason: u8,
}

impl DisconnectionComplete {
    pub fn parse(params: &[u8]) -> Result<Self> {
        if params.len() < DISCONN_COMPLETE_LEN {
            return Err(Error::InvalidPacket("truncated disconnection complete"));
        }

        let mut cursor = Cursor::new(params);
        Ok(Self {
            status: read_u8(&mut cursor)?,
            handle: read_u16(&mut cursor)? & CONNECTION_HANDLE_MASK,
            reason: read_u8(&mut cursor)?,
        })
    }
}

/// USB transport information
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportUsbInfo<'a> {
    pub vendor_id: u16,
    pub product_id: u16,
    pub path: &'a [u8],
}

impl<'a> TransportUsbInfo<'a> {
    pub fn parse(params: &'a [u8]) -> Result<Self> {
        if params.len() < TRANSPORT_USB_INFO_MIN_LEN {
            return Err(Error::InvalidPacket("truncated USB info"));
        }

        let mut cursor = Cursor::new(params);
        let vendor_id = read_u16(&mut cursor)?;
        let product_id = read_u16(&mut cursor)?;
        let path_len = read_u8(&mut cursor)? as usize;
        let path = params
            .get(TRANSPORT_USB_INFO_MIN_LEN..TRANSPORT_USB_INFO_MIN_LEN + path_len)
            .ok_or(Error::InvalidPacket("truncated USB path"))?;

        Ok(Self {
            vendor_id,
            product_id,
            path,
        })
    }
}

/// Events the host glue reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event<'a> {
    State(ControllerState),
    TransportUsbInfo(TransportUsbInfo<'a>),
    VendorSpecific(&'a [u8]),
    LeConnectionComplete(LeConnectionComplete),
    /// Any other LE meta subevent
    LeMeta(u8),
    DisconnectionComplete(DisconnectionComplete),
    Other(u8),
}

impl<'a> Event<'a> {
    /// Classify an event by code and, for LE meta events, by subevent.
    pub fn classify(event: &HciEvent<'a>) -> Result<Self> {
        let params = event.parameters;
        match event.event_code {
            EVT_STACK_STATE => {
                let raw = *params.first().ok_or(Error::InvalidPacket("empty state event"))?;
                Ok(Event::State(ControllerState::from_raw(raw)))
            }
            EVT_TRANSPORT_USB_INFO => Ok(Event::TransportUsbInfo(TransportUsbInfo::parse(params)?)),
            EVT_VENDOR_SPECIFIC => Ok(Event::VendorSpecific(params)),
            EVT_LE_META_EVENT => {
                let subevent = *params.first().ok_or(Error::InvalidPacket("empty LE meta event"))?;
                match subevent {
                    EVT_LE_CONN_COMPLETE | EVT_LE_ENHANCED_CONN_COMPLETE => {
                        Ok(Event::LeConnectionComplete(LeConnectionComplete::parse(params)?))
                    }
                    other => Ok(Event::LeMeta(other)),
                }
            }
            EVT_DISCONN_COMPLETE => Ok(Event::DisconnectionComplete(DisconnectionComplete::parse(params)?)),
            other => Ok(Event::Other(other)),
        }
    }
}

fn read_u8(cursor: &mut Cursor<&[u8]>) -> Result<u8> {
    cursor.read_u8().map_err(|_| Error::InvalidPacket("unexpected end of event"))
}

fn read_u16(cursor: &mut Cursor<&[u8]>) -> Result<u16> {
    cursor
        .read_u16::<LittleEndian>()
        .map_err(|_| Error::InvalidPacket("unexpected end of event"))
}
