//! L2CAP Core Manager implementation
//!
//! This module provides the channel manager that handles:
//! - Fixed channel and PSM registration (BR/EDR and LE)
//! - Pending incoming connections awaiting `accept`
//! - Per-connection receive queues fed by the dispatcher
//! - Outbound sends and disconnect requests
//!
//! Registrations and connection state sit behind separate locks. Every public
//! entry point takes the lock it needs for the whole call, so the dispatcher
//! callback and application threads never interleave inside one operation.

use crate::error::{check_status, Error, Result};
use crate::hci::constants::HCI_REMOTE_USER_TERMINATED_CONNECTION;
use crate::hci::HciCommand;
use crate::l2cap::constants::*;
use crate::l2cap::psm::{is_valid_le_psm, PSM};
use crate::l2cap::types::*;
use crate::transport::Transport;
use log::{debug, info, trace, warn};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

#[derive(Default)]
struct Registrations {
    fixed_channels: HashSet<ChannelId>,
    services: HashMap<u16, ServiceRegistration>,
    le_services: HashMap<u16, ServiceRegistration>,
}

/// State kept for an open link
struct Link {
    generation: u64,
    state: LinkState,
    peer: Option<PeerInfo>,
    receive_queue: VecDeque<Vec<u8>>,
}

#[derive(Default)]
struct Connections {
    /// Open handles only; a handle leaves this map when it closes
    links: HashMap<ConnectionHandle, Link>,
    /// Handles in `LinkState::Pending`, oldest first
    pending: VecDeque<ConnectionHandle>,
    /// Bumped for every connection complete, so a reused handle gets a new id
    next_generation: u64,
}

impl Connections {
    /// The open link on `handle`, if it is still the one `generation` names
    fn link(&self, handle: ConnectionHandle, generation: Option<u64>) -> Option<&Link> {
        self.links
            .get(&handle)
            .filter(|link| generation.map_or(true, |expected| link.generation == expected))
    }

    fn link_mut(&mut self, handle: ConnectionHandle, generation: Option<u64>) -> Option<&mut Link> {
        self.links
            .get_mut(&handle)
            .filter(|link| generation.map_or(true, |expected| link.generation == expected))
    }
}

/// L2CAP Manager responsible for channel registration and connection queues
pub struct L2capManager {
    transport: Arc<dyn Transport>,
    registrations: Mutex<Registrations>,
    connections: Mutex<Connections>,
}

impl L2capManager {
    /// Create a new L2CAP Manager on top of `transport`
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            registrations: Mutex::new(Registrations::default()),
            connections: Mutex::new(Connections::default()),
        }
    }

    fn ensure_ready(&self) -> Result<()> {
        if self.transport.is_ready() {
            Ok(())
        } else {
            Err(Error::NotReady)
        }
    }

    /// Largest BR/EDR MTU the controller stack supports
    pub fn max_mtu(&self) -> u16 {
        self.transport.max_mtu()
    }

    pub fn max_le_mtu(&self) -> u16 {
        self.transport.max_le_mtu()
    }

    pub fn set_max_le_mtu(&self, mtu: u16) -> Result<()> {
        if mtu < L2CAP_LE_DEFAULT_MTU {
            return Err(Error::InvalidParameter(format!(
                "LE MTU {} below minimum {}",
                mtu, L2CAP_LE_DEFAULT_MTU
            )));
        }
        self.transport.set_max_le_mtu(mtu);
        Ok(())
    }

    /// Register a fixed channel such as the ATT channel
    pub fn register_fixed_channel(&self, cid: ChannelId) -> Result<()> {
        self.ensure_ready()?;
        let mut registrations = self.registrations.lock();

        if registrations.fixed_channels.contains(&cid) {
            return Err(Error::AlreadyRegistered);
        }

        check_status(self.transport.register_fixed_channel(cid))?;
        registrations.fixed_channels.insert(cid);
        debug!("Registered fixed channel 0x{:04X}", cid);
        Ok(())
    }

    pub fn is_fixed_channel_registered(&self, cid: ChannelId) -> bool {
        self.registrations.lock().fixed_channels.contains(&cid)
    }

    /// Register a BR/EDR PSM for incoming connections
    pub fn register_service(&self, psm: u16, mtu: u16, security_level: SecurityLevel) -> Result<()> {
        self.ensure_ready()?;
        let psm = PSM::from_value(psm)
            .ok_or_else(|| Error::InvalidParameter(format!("Invalid PSM 0x{:04X}", psm)))?;
        if mtu < L2CAP_MIN_MTU {
            return Err(Error::InvalidParameter(format!("MTU {} below minimum {}", mtu, L2CAP_MIN_MTU)));
        }

        let mut registrations = self.registrations.lock();
        if registrations.services.contains_key(&psm.value()) {
            return Err(Error::AlreadyRegistered);
        }

        check_status(self.transport.register_service(psm.value(), mtu, security_level))?;
        registrations.services.insert(
            psm.value(),
            ServiceRegistration {
                psm: psm.value(),
                mtu,
                security_level,
                connection_type: ConnectionType::Classic,
            },
        );
        info!("Registered service {} (MTU {}, security {})", psm, mtu, security_level);
        Ok(())
    }

    /// Unregister a BR/EDR PSM. Open connections made through it stay open.
    pub fn unregister_service(&self, psm: u16) -> Result<()> {
        self.ensure_ready()?;
        let mut registrations = self.registrations.lock();

        if !registrations.services.contains_key(&psm) {
            return Err(Error::NotRegistered);
        }

        check_status(self.transport.unregister_service(psm))?;
        registrations.services.remove(&psm);
        info!("Unregistered service 0x{:04X}", psm);
        Ok(())
    }

    /// Register an LE PSM. The MTU is the current maximum LE MTU.
    pub fn register_le_service(&self, psm: u16, security_level: SecurityLevel) -> Result<()> {
        self.ensure_ready()?;
        if !is_valid_le_psm(psm) {
            return Err(Error::InvalidParameter(format!("Invalid LE PSM 0x{:04X}", psm)));
        }

        let mut registrations = self.registrations.lock();
        if registrations.le_services.contains_key(&psm) {
            return Err(Error::AlreadyRegistered);
        }

        let mtu = self.transport.max_le_mtu();
        check_status(self.transport.register_le_service(psm, mtu, security_level))?;
        registrations.le_services.insert(
            psm,
            ServiceRegistration {
                psm,
                mtu,
                security_level,
                connection_type: ConnectionType::LE,
            },
        );
        info!("Registered LE service 0x{:04X} (MTU {}, security {})", psm, mtu, security_level);
        Ok(())
    }

    pub fn unregister_le_service(&self, psm: u16) -> Result<()> {
        self.ensure_ready()?;
        let mut registrations = self.registrations.lock();

        if !registrations.le_services.contains_key(&psm) {
            return Err(Error::NotRegistered);
        }

        check_status(self.transport.unregister_le_service(psm))?;
        registrations.le_services.remove(&psm);
        info!("Unregistered LE service 0x{:04X}", psm);
        Ok(())
    }

    pub fn service(&self, psm: u16) -> Option<ServiceRegistration> {
        self.registrations.lock().services.get(&psm).copied()
    }

    pub fn le_service(&self, psm: u16) -> Option<ServiceRegistration> {
        self.registrations.lock().le_services.get(&psm).copied()
    }

    /// Request teardown of a link.
    ///
    /// Queues are only purged once the controller reports the disconnection.
    pub fn disconnect(&self, handle: ConnectionHandle) -> Result<()> {
        self.ensure_ready()?;
        self.request_disconnect(handle)
    }

    /// Like [`Self::disconnect`], failing with `Disconnected` once `link`
    /// has closed, even if its handle has been reused since.
    pub fn disconnect_link(&self, link: LinkId) -> Result<()> {
        self.ensure_ready()?;
        if !self.is_link_open(link) {
            return Err(Error::Disconnected);
        }
        self.request_disconnect(link.handle)
    }

    fn request_disconnect(&self, handle: ConnectionHandle) -> Result<()> {
        debug!("Requesting disconnect of handle 0x{:04X}", handle);
        check_status(self.transport.send_command(&HciCommand::Disconnect {
            handle,
            reason: HCI_REMOTE_USER_TERMINATED_CONNECTION,
        }))
    }

    pub fn can_accept(&self) -> bool {
        !self.connections.lock().pending.is_empty()
    }

    /// Take the oldest pending connection
    pub fn accept(&self) -> Result<ConnectionHandle> {
        self.accept_link().map(|link| link.handle)
    }

    /// Take the oldest pending connection, identified by handle and generation
    pub fn accept_link(&self) -> Result<LinkId> {
        let mut connections = self.connections.lock();
        let handle = connections.pending.pop_front().ok_or(Error::NoPendingConnection)?;
        let link = connections
            .links
            .get_mut(&handle)
            .ok_or(Error::NoPendingConnection)?;

        link.state = LinkState::Accepted;
        debug!("Accepted connection 0x{:04X}", handle);
        Ok(LinkId {
            handle,
            generation: link.generation,
        })
    }

    /// Lifecycle state of `handle`, `None` once closed or never seen
    pub fn link_state(&self, handle: ConnectionHandle) -> Option<LinkState> {
        self.connections.lock().links.get(&handle).map(|link| link.state)
    }

    pub fn is_open(&self, handle: ConnectionHandle) -> bool {
        self.connections.lock().link(handle, None).is_some()
    }

    /// Whether `link` is still open under the generation it was accepted with
    pub fn is_link_open(&self, link: LinkId) -> bool {
        self.connections
            .lock()
            .link(link.handle, Some(link.generation))
            .is_some()
    }

    pub fn peer(&self, handle: ConnectionHandle) -> Option<PeerInfo> {
        self.connections.lock().link(handle, None).and_then(|link| link.peer)
    }

    pub fn link_peer(&self, link: LinkId) -> Option<PeerInfo> {
        self.connections
            .lock()
            .link(link.handle, Some(link.generation))
            .and_then(|link| link.peer)
    }

    /// Whether the transport would take another packet for `handle` now
    pub fn can_send(&self, handle: ConnectionHandle) -> bool {
        self.is_open(handle) && self.transport.can_send_now(handle)
    }

    pub fn can_send_link(&self, link: LinkId) -> bool {
        self.is_link_open(link) && self.transport.can_send_now(link.handle)
    }

    /// Hand `data` to the transport. Delivery to the peer is not confirmed.
    pub fn send(&self, handle: ConnectionHandle, data: &[u8]) -> Result<()> {
        self.send_checked(handle, None, data)
    }

    pub fn send_link(&self, link: LinkId, data: &[u8]) -> Result<()> {
        self.send_checked(link.handle, Some(link.generation), data)
    }

    fn send_checked(&self, handle: ConnectionHandle, generation: Option<u64>, data: &[u8]) -> Result<()> {
        self.ensure_ready()?;
        if data.len() > u16::MAX as usize {
            return Err(Error::InvalidParameter(format!("Payload of {} bytes too long", data.len())));
        }
        if self.connections.lock().link(handle, generation).is_none() {
            return Err(Error::Disconnected);
        }
        if !self.transport.can_send_now(handle) {
            return Err(Error::Congested);
        }

        trace!("Sending {} bytes on 0x{:04X}: {}", data.len(), handle, hex::encode(data));
        check_status(self.transport.send_packet(handle, data))
    }

    pub fn can_receive(&self, handle: ConnectionHandle) -> bool {
        self.connections
            .lock()
            .link(handle, None)
            .is_some_and(|link| !link.receive_queue.is_empty())
    }

    pub fn can_receive_link(&self, link: LinkId) -> bool {
        self.connections
            .lock()
            .link(link.handle, Some(link.generation))
            .is_some_and(|link| !link.receive_queue.is_empty())
    }

    /// Pop the oldest payload for `handle`, truncated to `max_length`.
    ///
    /// Bytes past `max_length` are dropped, not kept for the next call.
    pub fn receive(&self, handle: ConnectionHandle, max_length: usize) -> Result<Vec<u8>> {
        self.receive_frame(handle, max_length).map(|frame| frame.data)
    }

    /// Like [`Self::receive`], also reporting how many bytes were dropped.
    pub fn receive_frame(&self, handle: ConnectionHandle, max_length: usize) -> Result<ReceivedFrame> {
        self.receive_checked(handle, None, max_length)
    }

    /// Pop the oldest payload for `link`. Payloads that arrived on a later
    /// link reusing the same handle are never returned.
    pub fn receive_link(&self, link: LinkId, max_length: usize) -> Result<ReceivedFrame> {
        self.receive_checked(link.handle, Some(link.generation), max_length)
    }

    fn receive_checked(
        &self,
        handle: ConnectionHandle,
        generation: Option<u64>,
        max_length: usize,
    ) -> Result<ReceivedFrame> {
        let mut connections = self.connections.lock();
        let link = connections
            .link_mut(handle, generation)
            .ok_or(Error::Disconnected)?;
        let mut data = link.receive_queue.pop_front().ok_or(Error::NoData)?;

        let discarded = data.len().saturating_sub(max_length);
        if discarded > 0 {
            warn!(
                "Truncated {} byte payload on 0x{:04X} to {} bytes",
                data.len(),
                handle,
                max_length
            );
            data.truncate(max_length);
        }

        Ok(ReceivedFrame { data, discarded })
    }

    /// Number of payloads waiting for `handle`
    pub fn queued(&self, handle: ConnectionHandle) -> usize {
        self.connections
            .lock()
            .links
            .get(&handle)
            .map_or(0, |link| link.receive_queue.len())
    }

    /// Queue a copy of an incoming payload
    pub(crate) fn on_received(&self, handle: ConnectionHandle, data: &[u8]) {
        let mut connections = self.connections.lock();
        match connections.links.get_mut(&handle) {
            Some(link) => {
                trace!("Queued {} bytes on 0x{:04X}", data.len(), handle);
                link.receive_queue.push_back(data.to_vec());
            }
            None => warn!("Dropping {} bytes for unknown handle 0x{:04X}", data.len(), handle),
        }
    }

    /// Record a completed link-layer connection as pending
    pub(crate) fn on_connection_complete(&self, handle: ConnectionHandle, peer: Option<PeerInfo>) {
        let mut connections = self.connections.lock();

        // The controller reused a handle without reporting the disconnect.
        if connections.links.remove(&handle).is_some() {
            warn!("Handle 0x{:04X} reported connected twice, resetting", handle);
            connections.pending.retain(|pending| *pending != handle);
        }

        connections.next_generation += 1;
        let generation = connections.next_generation;
        connections.links.insert(
            handle,
            Link {
                generation,
                state: LinkState::Pending,
                peer,
                receive_queue: VecDeque::new(),
            },
        );
        connections.pending.push_back(handle);
        info!("Connection 0x{:04X} pending", handle);
    }

    /// Forget everything about a closed link
    pub(crate) fn on_disconnection_complete(&self, handle: ConnectionHandle) {
        let mut connections = self.connections.lock();

        let removed = connections.links.remove(&handle);
        connections.pending.retain(|pending| *pending != handle);

        match removed {
            Some(link) => info!(
                "Connection 0x{:04X} closed, {} queued payloads dropped",
                handle,
                link.receive_queue.len()
            ),
            None => debug!("Disconnection for unknown handle 0x{:04X}", handle),
        }
    }
}
