//! Socket-style access to L2CAP connections
//!
//! [`L2capServer`] hands out [`L2capConnection`]s, and both expose a uniform
//! status view computed live from the channel manager. These are the types an
//! ATT/GATT server is built on.

use crate::error::{Error, Result};
use crate::gap::BdAddr;
use crate::l2cap::constants::L2CAP_ATT_CID;
use crate::l2cap::core::L2capManager;
use crate::l2cap::types::{ChannelId, ConnectionHandle, LinkId, SecurityLevel};
use bitflags::bitflags;
use log::debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

bitflags! {
    /// Readiness flags reported by a socket
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SocketFlags: u8 {
        const SEND = 0b001;
        const RECEIVE = 0b010;
        const ACCEPT = 0b100;
    }
}

/// Snapshot of what a socket can do right now
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SocketStatus {
    pub flags: SocketFlags,
    pub error: Option<Error>,
}

impl SocketStatus {
    pub fn can_send(&self) -> bool {
        self.flags.contains(SocketFlags::SEND)
    }

    pub fn can_receive(&self) -> bool {
        self.flags.contains(SocketFlags::RECEIVE)
    }

    pub fn can_accept(&self) -> bool {
        self.flags.contains(SocketFlags::ACCEPT)
    }
}

/// Capabilities a connected L2CAP socket offers the layer above
pub trait L2capSocket {
    /// Hand bytes to the transport
    fn send(&self, data: &[u8]) -> Result<()>;

    /// Pop the next payload, at most `max_length` bytes of it
    fn receive(&self, max_length: usize) -> Result<Vec<u8>>;

    fn status(&self) -> SocketStatus;

    /// Request disconnection. Closing twice is not an error.
    fn close(&self) -> Result<()>;

    fn security_level(&self) -> Result<SecurityLevel>;

    fn set_security_level(&self, level: SecurityLevel) -> Result<()>;
}

/// An accepted connection, scoped to one link.
///
/// Once the link closes the connection stays closed, even if the controller
/// later hands the same handle to a new peer.
pub struct L2capConnection {
    link: LinkId,
    address: BdAddr,
    destination: BdAddr,
    manager: Arc<L2capManager>,
    closed: AtomicBool,
}

impl L2capConnection {
    pub(crate) fn new(manager: Arc<L2capManager>, link: LinkId, address: BdAddr, destination: BdAddr) -> Self {
        Self {
            link,
            address,
            destination,
            manager,
            closed: AtomicBool::new(false),
        }
    }

    pub fn handle(&self) -> ConnectionHandle {
        self.link.handle
    }

    pub fn link(&self) -> LinkId {
        self.link
    }

    /// Local address
    pub fn address(&self) -> BdAddr {
        self.address
    }

    /// Peer address
    pub fn destination(&self) -> BdAddr {
        self.destination
    }
}

impl L2capSocket for L2capConnection {
    fn send(&self, data: &[u8]) -> Result<()> {
        self.manager.send_link(self.link, data)
    }

    fn receive(&self, max_length: usize) -> Result<Vec<u8>> {
        self.manager
            .receive_link(self.link, max_length)
            .map(|frame| frame.data)
    }

    fn status(&self) -> SocketStatus {
        let mut flags = SocketFlags::empty();
        flags.set(SocketFlags::SEND, self.manager.can_send_link(self.link));
        flags.set(SocketFlags::RECEIVE, self.manager.can_receive_link(self.link));

        let error = if self.manager.is_link_open(self.link) {
            None
        } else {
            Some(Error::Disconnected)
        };

        SocketStatus { flags, error }
    }

    fn close(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Ok(());
        }
        // A failed request leaves the connection open so close can be retried.
        match self.manager.disconnect_link(self.link) {
            Ok(()) | Err(Error::Disconnected) => {
                self.closed.store(true, Ordering::SeqCst);
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    fn security_level(&self) -> Result<SecurityLevel> {
        Ok(SecurityLevel::Sdp)
    }

    fn set_security_level(&self, level: SecurityLevel) -> Result<()> {
        debug!("Security level {} requested on 0x{:04X}, pairing unavailable", level, self.link.handle);
        Err(Error::Unspecified(-1))
    }
}

/// What a server listens on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerBinding {
    FixedChannel(ChannelId),
    LePsm(u16),
}

/// Accepts incoming connections from the channel manager
pub struct L2capServer {
    address: BdAddr,
    binding: ServerBinding,
    manager: Arc<L2capManager>,
}

impl L2capServer {
    /// Listen on a fixed channel
    pub fn for_channel(manager: Arc<L2capManager>, address: BdAddr, cid: ChannelId) -> Result<Self> {
        manager.register_fixed_channel(cid)?;
        Ok(Self {
            address,
            binding: ServerBinding::FixedChannel(cid),
            manager,
        })
    }

    /// Listen on an LE PSM, without security requirements
    pub fn for_le_psm(manager: Arc<L2capManager>, address: BdAddr, psm: u16) -> Result<Self> {
        manager.register_le_service(psm, SecurityLevel::Sdp)?;
        Ok(Self {
            address,
            binding: ServerBinding::LePsm(psm),
            manager,
        })
    }

    /// LE server on the ATT fixed channel
    pub fn low_energy(manager: Arc<L2capManager>, address: BdAddr) -> Result<Self> {
        Self::for_channel(manager, address, L2CAP_ATT_CID)
    }

    pub fn address(&self) -> BdAddr {
        self.address
    }

    pub fn binding(&self) -> ServerBinding {
        self.binding
    }

    /// Take the oldest pending connection
    pub fn accept(&self) -> Result<L2capConnection> {
        let link = self.manager.accept_link()?;
        let destination = self
            .manager
            .link_peer(link)
            .map_or(BdAddr::ZERO, |peer| peer.address);

        Ok(L2capConnection::new(self.manager.clone(), link, self.address, destination))
    }

    pub fn status(&self) -> SocketStatus {
        let mut flags = SocketFlags::empty();
        flags.set(SocketFlags::ACCEPT, self.manager.can_accept());
        SocketStatus { flags, error: None }
    }

    /// Stop listening. Fixed channels stay registered with the transport.
    pub fn close(&self) -> Result<()> {
        match self.binding {
            ServerBinding::LePsm(psm) => self.manager.unregister_le_service(psm),
            ServerBinding::FixedChannel(_) => Ok(()),
        }
    }
}
