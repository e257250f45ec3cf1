//! Unit tests for the L2CAP channel manager and sockets

use super::constants::*;
use super::*;
use crate::error::{Error, STATUS_SERVICE_ALREADY_REGISTERED};
use crate::gap::{AddressType, BdAddr};
use crate::hci::HciCommand;
use crate::transport::mock::MockTransport;
use std::sync::atomic::Ordering;
use std::sync::Arc;

fn setup() -> (Arc<MockTransport>, Arc<L2capManager>) {
    let transport = MockTransport::new();
    let manager = Arc::new(L2capManager::new(transport.clone()));
    (transport, manager)
}

fn peer(last: u8) -> PeerInfo {
    PeerInfo::new(BdAddr::new([last, 0x22, 0x33, 0x44, 0x55, 0x66]), AddressType::Public)
}

#[test]
fn test_pending_connections_are_fifo() {
    let (_, manager) = setup();

    for handle in [0x000A, 0x000B, 0x000C] {
        manager.on_connection_complete(handle, None);
    }
    assert_eq!(manager.link_state(0x000B), Some(LinkState::Pending));

    assert_eq!(manager.accept().unwrap(), 0x000A);
    assert_eq!(manager.accept().unwrap(), 0x000B);
    assert_eq!(manager.link_state(0x000B), Some(LinkState::Accepted));
    assert_eq!(manager.accept().unwrap(), 0x000C);

    assert!(!manager.can_accept());
    assert_eq!(manager.accept(), Err(Error::NoPendingConnection));
}

#[test]
fn test_disconnected_before_accept_is_never_accepted() {
    let (_, manager) = setup();

    manager.on_connection_complete(0x0001, None);
    manager.on_connection_complete(0x0002, None);
    manager.on_disconnection_complete(0x0001);

    assert_eq!(manager.accept().unwrap(), 0x0002);
    assert_eq!(manager.accept(), Err(Error::NoPendingConnection));
    assert_eq!(manager.link_state(0x0001), None);
}

#[test]
fn test_reused_handle_resets_link() {
    let (_, manager) = setup();

    manager.on_connection_complete(0x0005, Some(peer(0x01)));
    manager.on_received(0x0005, &[1, 2]);
    manager.on_connection_complete(0x0005, Some(peer(0x02)));

    assert_eq!(manager.queued(0x0005), 0);
    assert_eq!(manager.peer(0x0005), Some(peer(0x02)));
    assert_eq!(manager.accept().unwrap(), 0x0005);
    assert!(!manager.can_accept());
}

#[test]
fn test_receive_queue_order() {
    let (_, manager) = setup();
    manager.on_connection_complete(0x0040, None);

    manager.on_received(0x0040, &[0x01]);
    manager.on_received(0x0040, &[0x02, 0x02]);
    manager.on_received(0x0040, &[0x03, 0x03, 0x03]);
    assert_eq!(manager.queued(0x0040), 3);

    assert_eq!(manager.receive(0x0040, 64).unwrap(), vec![0x01]);
    assert_eq!(manager.receive(0x0040, 64).unwrap(), vec![0x02, 0x02]);
    assert_eq!(manager.receive(0x0040, 64).unwrap(), vec![0x03, 0x03, 0x03]);
    assert!(!manager.can_receive(0x0040));
    assert_eq!(manager.receive(0x0040, 64), Err(Error::NoData));
}

#[test]
fn test_receive_truncates_and_discards_remainder() {
    let (_, manager) = setup();
    manager.on_connection_complete(0x0040, None);
    manager.on_received(0x0040, &[1, 2, 3, 4, 5]);
    manager.on_received(0x0040, &[6, 7]);

    let frame = manager.receive_frame(0x0040, 3).unwrap();
    assert_eq!(frame.data, vec![1, 2, 3]);
    assert_eq!(frame.discarded, 2);
    assert!(frame.is_truncated());

    // The dropped tail does not come back on the next call
    let frame = manager.receive_frame(0x0040, 3).unwrap();
    assert_eq!(frame.data, vec![6, 7]);
    assert!(!frame.is_truncated());

    assert_eq!(manager.receive(0x0040, 3), Err(Error::NoData));
}

#[test]
fn test_disconnection_purges_queue() {
    let (_, manager) = setup();
    manager.on_connection_complete(0x0040, None);
    manager.accept().unwrap();
    manager.on_received(0x0040, &[1, 2, 3]);

    manager.on_disconnection_complete(0x0040);

    assert!(!manager.is_open(0x0040));
    assert!(!manager.can_receive(0x0040));
    assert_eq!(manager.queued(0x0040), 0);
    assert_eq!(manager.receive(0x0040, 16), Err(Error::Disconnected));
}

#[test]
fn test_data_for_unknown_handle_is_dropped() {
    let (_, manager) = setup();

    manager.on_received(0x0099, &[1, 2, 3]);
    assert!(!manager.can_receive(0x0099));

    // A later connection on that handle starts empty
    manager.on_connection_complete(0x0099, None);
    assert_eq!(manager.receive(0x0099, 16), Err(Error::NoData));
}

#[test]
fn test_service_registration_conflicts() {
    let (transport, manager) = setup();

    manager.register_service(0x1001, 672, SecurityLevel::Sdp).unwrap();
    assert_eq!(
        manager.register_service(0x1001, 672, SecurityLevel::Medium),
        Err(Error::AlreadyRegistered)
    );
    assert_eq!(transport.services.lock().len(), 1);

    manager.unregister_service(0x1001).unwrap();
    assert_eq!(manager.unregister_service(0x1001), Err(Error::NotRegistered));

    manager.register_service(0x1001, 1024, SecurityLevel::High).unwrap();
    let registration = manager.service(0x1001).unwrap();
    assert_eq!(registration.mtu, 1024);
    assert_eq!(registration.security_level, SecurityLevel::High);
    assert_eq!(registration.connection_type, ConnectionType::Classic);
}

#[test]
fn test_service_registration_validation() {
    let (_, manager) = setup();

    // Even PSM
    assert!(matches!(
        manager.register_service(0x1002, 672, SecurityLevel::Sdp),
        Err(Error::InvalidParameter(_))
    ));
    // MTU below the L2CAP minimum
    assert!(matches!(
        manager.register_service(0x1001, L2CAP_MIN_MTU - 1, SecurityLevel::Sdp),
        Err(Error::InvalidParameter(_))
    ));
    assert!(manager.service(0x1001).is_none());
}

#[test]
fn test_le_service_registration() {
    let (transport, manager) = setup();
    manager.set_max_le_mtu(185).unwrap();

    manager.register_le_service(0x0080, SecurityLevel::Sdp).unwrap();
    assert_eq!(*transport.le_services.lock(), vec![(0x0080, 185, SecurityLevel::Sdp)]);
    assert_eq!(manager.le_service(0x0080).unwrap().connection_type, ConnectionType::LE);

    assert_eq!(
        manager.register_le_service(0x0080, SecurityLevel::Sdp),
        Err(Error::AlreadyRegistered)
    );
    assert!(matches!(
        manager.register_le_service(0x0000, SecurityLevel::Sdp),
        Err(Error::InvalidParameter(_))
    ));
    assert!(matches!(
        manager.register_le_service(0x0100, SecurityLevel::Sdp),
        Err(Error::InvalidParameter(_))
    ));

    manager.unregister_le_service(0x0080).unwrap();
    assert!(transport.le_services.lock().is_empty());
}

#[test]
fn test_le_mtu_floor() {
    let (_, manager) = setup();

    assert!(matches!(manager.set_max_le_mtu(22), Err(Error::InvalidParameter(_))));
    assert_eq!(manager.max_le_mtu(), L2CAP_LE_DEFAULT_MTU);

    manager.set_max_le_mtu(L2CAP_LE_DEFAULT_MTU).unwrap();
    assert_eq!(manager.max_mtu(), 1691);
}

#[test]
fn test_fixed_channel_registration() {
    let (transport, manager) = setup();

    manager.register_fixed_channel(L2CAP_ATT_CID).unwrap();
    assert!(manager.is_fixed_channel_registered(L2CAP_ATT_CID));
    assert_eq!(manager.register_fixed_channel(L2CAP_ATT_CID), Err(Error::AlreadyRegistered));
    assert_eq!(*transport.fixed_channels.lock(), vec![L2CAP_ATT_CID]);
}

#[test]
fn test_not_ready_transport() {
    let (transport, manager) = setup();
    manager.on_connection_complete(0x0040, None);
    transport.set_ready(false);

    assert_eq!(manager.register_fixed_channel(L2CAP_ATT_CID), Err(Error::NotReady));
    assert_eq!(
        manager.register_service(0x1001, 672, SecurityLevel::Sdp),
        Err(Error::NotReady)
    );
    assert_eq!(manager.register_le_service(0x0080, SecurityLevel::Sdp), Err(Error::NotReady));
    assert_eq!(manager.send(0x0040, &[1]), Err(Error::NotReady));
    assert_eq!(manager.disconnect(0x0040), Err(Error::NotReady));
    assert!(transport.fixed_channels.lock().is_empty());
    assert!(transport.commands.lock().is_empty());
}

#[test]
fn test_send_errors() {
    let (transport, manager) = setup();

    assert_eq!(manager.send(0x0040, &[1]), Err(Error::Disconnected));

    manager.on_connection_complete(0x0040, None);
    transport.set_congested(0x0040, true);
    assert!(!manager.can_send(0x0040));
    let err = manager.send(0x0040, &[1]).unwrap_err();
    assert_eq!(err, Error::Congested);
    assert!(err.is_retryable());

    transport.set_congested(0x0040, false);
    transport
        .send_status
        .store(STATUS_SERVICE_ALREADY_REGISTERED, Ordering::SeqCst);
    assert_eq!(manager.send(0x0040, &[1]), Err(Error::AlreadyRegistered));
    transport.send_status.store(0x1F, Ordering::SeqCst);
    assert_eq!(manager.send(0x0040, &[1]), Err(Error::Unspecified(0x1F)));
    assert!(transport.sent.lock().is_empty());

    let oversized = vec![0u8; u16::MAX as usize + 1];
    assert!(matches!(manager.send(0x0040, &oversized), Err(Error::InvalidParameter(_))));
}

#[test]
fn test_disconnect_waits_for_controller() {
    let (transport, manager) = setup();
    manager.on_connection_complete(0x0040, None);
    manager.on_received(0x0040, &[1]);

    manager.disconnect(0x0040).unwrap();
    assert_eq!(
        *transport.commands.lock(),
        vec![HciCommand::Disconnect {
            handle: 0x0040,
            reason: 0x13
        }]
    );

    // Still open until the disconnection complete event arrives
    assert!(manager.is_open(0x0040));
    assert_eq!(manager.receive(0x0040, 16).unwrap(), vec![1]);
}

#[test]
fn test_psm_validity() {
    assert!(PSM::SDP.is_valid());
    assert!(PSM::ATT.is_valid());
    assert!(PSM::Dynamic(0x1001).is_valid());
    assert!(PSM::Dynamic(0x1003).is_valid());
    assert!(!PSM::Dynamic(0x1002).is_valid());
    assert!(!PSM::Dynamic(0x1101).is_valid());
    assert!(!PSM::Dynamic(0x0081).is_valid());

    assert_eq!(PSM::from_value(0x0003), Some(PSM::RFCOMM));
    assert_eq!(PSM::from_value(0x1001), Some(PSM::Dynamic(0x1001)));
    assert_eq!(PSM::from_value(0x0002), None);
    assert_eq!(PSM::from_value(0x1002), None);
    assert_eq!(PSM::from_value(0x1101), None);

    assert!(is_valid_le_psm(0x0001));
    assert!(is_valid_le_psm(0x00FF));
    assert!(!is_valid_le_psm(0x0000));
    assert!(!is_valid_le_psm(0x0100));
}

#[test]
fn test_connection_socket_status() {
    let (transport, manager) = setup();
    manager.on_connection_complete(0x0040, Some(peer(0xC0)));
    let server = L2capServer::low_energy(manager.clone(), BdAddr::ZERO).unwrap();
    assert_eq!(server.binding(), ServerBinding::FixedChannel(L2CAP_ATT_CID));

    let connection = server.accept().unwrap();
    assert_eq!(connection.destination(), peer(0xC0).address);

    let status = connection.status();
    assert!(status.can_send());
    assert!(!status.can_receive());
    assert_eq!(status.error, None);

    manager.on_received(0x0040, &[0x0A]);
    transport.set_congested(0x0040, true);
    let status = connection.status();
    assert_eq!(status.flags, SocketFlags::RECEIVE);

    manager.on_disconnection_complete(0x0040);
    let status = connection.status();
    assert!(status.flags.is_empty());
    assert_eq!(status.error, Some(Error::Disconnected));
    assert_eq!(connection.receive(16), Err(Error::Disconnected));
}

#[test]
fn test_connection_socket_close_and_security() {
    let (transport, manager) = setup();
    manager.on_connection_complete(0x0041, None);
    let server = L2capServer::low_energy(manager.clone(), BdAddr::ZERO).unwrap();
    let connection = server.accept().unwrap();
    assert_eq!(connection.destination(), BdAddr::ZERO);

    assert_eq!(connection.security_level(), Ok(SecurityLevel::Sdp));
    assert_eq!(connection.set_security_level(SecurityLevel::High), Err(Error::Unspecified(-1)));

    connection.close().unwrap();
    connection.close().unwrap();
    assert_eq!(transport.commands.lock().len(), 1);

    // Fixed channel servers keep their registration on close
    server.close().unwrap();
    assert!(manager.is_fixed_channel_registered(L2CAP_ATT_CID));
}

#[test]
fn test_reused_handle_gets_new_generation() {
    let (_, manager) = setup();

    manager.on_connection_complete(0x0040, None);
    let first = manager.accept_link().unwrap();
    manager.on_disconnection_complete(0x0040);
    manager.on_connection_complete(0x0040, None);
    let second = manager.accept_link().unwrap();

    assert_eq!(first.handle, second.handle);
    assert_ne!(first.generation, second.generation);
    assert!(!manager.is_link_open(first));
    assert!(manager.is_link_open(second));
}

#[test]
fn test_stale_connection_after_handle_reuse() {
    let (transport, manager) = setup();
    let server = L2capServer::low_energy(manager.clone(), BdAddr::ZERO).unwrap();

    manager.on_connection_complete(0x0040, Some(peer(0x01)));
    let old = server.accept().unwrap();
    manager.on_disconnection_complete(0x0040);

    // The controller hands the same handle to a different peer
    manager.on_connection_complete(0x0040, Some(peer(0x02)));
    let new = server.accept().unwrap();
    manager.on_received(0x0040, &[0xAB]);

    let status = old.status();
    assert_eq!(status.error, Some(Error::Disconnected));
    assert!(status.flags.is_empty());
    assert_eq!(old.receive(16), Err(Error::Disconnected));
    assert_eq!(old.send(&[0x01]), Err(Error::Disconnected));
    assert!(transport.sent.lock().is_empty());

    // Closing the old connection must not tear down the new link
    old.close().unwrap();
    assert!(transport.commands.lock().is_empty());

    assert_eq!(new.destination(), peer(0x02).address);
    assert_eq!(new.status().error, None);
    assert_eq!(new.receive(16).unwrap(), vec![0xAB]);
}

#[test]
fn test_connection_superseded_without_disconnect() {
    let (_, manager) = setup();
    let server = L2capServer::low_energy(manager.clone(), BdAddr::ZERO).unwrap();

    manager.on_connection_complete(0x0041, None);
    let old = server.accept().unwrap();
    manager.on_connection_complete(0x0041, None);
    manager.on_received(0x0041, &[0x01]);

    assert_eq!(old.status().error, Some(Error::Disconnected));
    assert_eq!(old.receive(16), Err(Error::Disconnected));
    assert_eq!(manager.receive(0x0041, 16).unwrap(), vec![0x01]);
}

#[test]
fn test_failed_close_can_be_retried() {
    let (transport, manager) = setup();
    manager.on_connection_complete(0x0042, None);
    let server = L2capServer::low_energy(manager.clone(), BdAddr::ZERO).unwrap();
    let connection = server.accept().unwrap();

    transport.set_ready(false);
    assert_eq!(connection.close(), Err(Error::NotReady));
    assert!(transport.commands.lock().is_empty());

    transport.set_ready(true);
    connection.close().unwrap();
    connection.close().unwrap();
    assert_eq!(
        *transport.commands.lock(),
        vec![HciCommand::Disconnect {
            handle: 0x0042,
            reason: 0x13
        }]
    );
}
