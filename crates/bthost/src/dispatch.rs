//! Packet dispatch from the transport callback
//!
//! [`EventDispatcher`] is the single [`PacketHandler`] subscribed to the
//! transport. It classifies each packet and forwards it to the controller
//! state machine or the channel manager, copying payloads into owned queues
//! before returning. Malformed input is logged and dropped; nothing here
//! panics or reports errors upward.

use crate::att::AttOpcode;
use crate::hci::constants::*;
use crate::hci::{Event, HciEvent, HostController};
use crate::l2cap::{L2capManager, PeerInfo};
use crate::transport::PacketHandler;
use log::{debug, trace, warn};
use std::sync::Arc;

pub struct EventDispatcher {
    controller: Arc<HostController>,
    l2cap: Arc<L2capManager>,
}

impl EventDispatcher {
    pub fn new(controller: Arc<HostController>, l2cap: Arc<L2capManager>) -> Self {
        Self { controller, l2cap }
    }

    fn handle_event(&self, packet: &[u8]) {
        let Some(event) = HciEvent::parse(packet) else {
            warn!("Dropping malformed HCI event: {}", hex::encode(packet));
            return;
        };

        let event = match Event::classify(&event) {
            Ok(event) => event,
            Err(err) => {
                warn!("Dropping HCI event 0x{:02X}: {}", event.event_code, err);
                return;
            }
        };

        match event {
            Event::State(state) => self.controller.update_state(state),
            Event::TransportUsbInfo(info) => debug!(
                "USB transport {:04X}:{:04X} at path {}",
                info.vendor_id,
                info.product_id,
                hex::encode(info.path)
            ),
            Event::VendorSpecific(params) => debug!("Vendor specific event: {}", hex::encode(params)),
            Event::LeConnectionComplete(complete) => {
                if complete.status != 0 {
                    warn!(
                        "LE connection to {} failed with status 0x{:02X}",
                        complete.peer_address, complete.status
                    );
                    return;
                }
                debug!(
                    "LE connection 0x{:04X} from {} as {:?}",
                    complete.handle, complete.peer_address, complete.role
                );
                self.l2cap.on_connection_complete(
                    complete.handle,
                    Some(PeerInfo::new(complete.peer_address, complete.peer_address_type)),
                );
            }
            Event::LeMeta(subevent) => trace!("Ignoring LE meta subevent 0x{:02X}", subevent),
            Event::DisconnectionComplete(complete) => {
                if complete.status != 0 {
                    warn!(
                        "Disconnect of 0x{:04X} failed with status 0x{:02X}",
                        complete.handle, complete.status
                    );
                    return;
                }
                debug!(
                    "Disconnection complete 0x{:04X}, reason 0x{:02X}",
                    complete.handle, complete.reason
                );
                self.l2cap.on_disconnection_complete(complete.handle);
            }
            Event::Other(code) => trace!("Ignoring HCI event 0x{:02X}", code),
        }
    }

    fn handle_att_data(&self, handle: u16, packet: &[u8]) {
        match packet.first() {
            None => warn!("Empty ATT PDU on 0x{:04X}", handle),
            Some(&byte) => match AttOpcode::from_u8(byte) {
                Some(opcode) if opcode.is_command() => debug!("ATT command {} on 0x{:04X}", opcode, handle),
                Some(opcode) => debug!("ATT {} on 0x{:04X}", opcode, handle),
                None => warn!("Unknown ATT opcode 0x{:02X} on 0x{:04X}", byte, handle),
            },
        }
        self.l2cap.on_received(handle, packet);
    }
}

impl PacketHandler for EventDispatcher {
    fn handle_packet(&self, packet_type: u8, channel: u16, packet: &[u8]) {
        match packet_type {
            HCI_EVENT_PACKET => self.handle_event(packet),
            L2CAP_DATA_PACKET => self.l2cap.on_received(channel, packet),
            ATT_DATA_PACKET => self.handle_att_data(channel, packet),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hci::{ControllerState, PowerMode};
    use crate::transport::mock::MockTransport;
    use parking_lot::Mutex;

    fn setup() -> (Arc<MockTransport>, Arc<HostController>, Arc<L2capManager>, EventDispatcher) {
        let transport = MockTransport::new();
        let controller = Arc::new(HostController::new(transport.clone()));
        let l2cap = Arc::new(L2capManager::new(transport.clone()));
        let dispatcher = EventDispatcher::new(controller.clone(), l2cap.clone());
        (transport, controller, l2cap, dispatcher)
    }

    fn le_connection_complete(status: u8, handle: u16) -> Vec<u8> {
        let mut params = vec![EVT_LE_CONN_COMPLETE, status];
        params.extend_from_slice(&handle.to_le_bytes());
        params.push(0x01); // peripheral
        params.push(0x00); // public peer address
        params.extend_from_slice(&[0x55, 0x44, 0x33, 0x22, 0x11, 0x00]);
        params.extend_from_slice(&0x0018u16.to_le_bytes());
        params.extend_from_slice(&0x0000u16.to_le_bytes());
        params.extend_from_slice(&0x00C8u16.to_le_bytes());
        params.push(0x00);

        let mut packet = vec![EVT_LE_META_EVENT, params.len() as u8];
        packet.extend_from_slice(&params);
        packet
    }

    fn disconnection_complete(handle: u16) -> Vec<u8> {
        let mut packet = vec![EVT_DISCONN_COMPLETE, 4, 0x00];
        packet.extend_from_slice(&handle.to_le_bytes());
        packet.push(HCI_REMOTE_USER_TERMINATED_CONNECTION);
        packet
    }

    #[test]
    fn test_state_event_updates_controller() {
        let (_, controller, _, dispatcher) = setup();

        dispatcher.handle_packet(HCI_EVENT_PACKET, 0, &[EVT_STACK_STATE, 1, 2]);
        assert_eq!(controller.state(), ControllerState::On);

        dispatcher.handle_packet(HCI_EVENT_PACKET, 0, &[EVT_STACK_STATE, 1, 4]);
        assert_eq!(controller.state(), ControllerState::Sleeping);
    }

    #[test]
    fn test_power_on_notifies_observers_once() {
        let (transport, controller, _, dispatcher) = setup();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = seen.clone();
        controller.observe(move |old, new| recorder.lock().push((old, new)));

        controller.set_power(PowerMode::On).unwrap();
        assert_eq!(*transport.power_requests.lock(), vec![PowerMode::On]);
        assert!(seen.lock().is_empty());

        dispatcher.handle_packet(HCI_EVENT_PACKET, 0, &[EVT_STACK_STATE, 1, 2]);
        // The controller may repeat a state it already reported
        dispatcher.handle_packet(HCI_EVENT_PACKET, 0, &[EVT_STACK_STATE, 1, 2]);

        assert!(controller.is_on());
        assert_eq!(*seen.lock(), vec![(ControllerState::Off, ControllerState::On)]);
    }

    #[test]
    fn test_out_of_range_state_defaults_to_off() {
        let (_, controller, _, dispatcher) = setup();

        dispatcher.handle_packet(HCI_EVENT_PACKET, 0, &[EVT_STACK_STATE, 1, 2]);
        assert!(controller.is_on());

        dispatcher.handle_packet(HCI_EVENT_PACKET, 0, &[EVT_STACK_STATE, 1, 0x7F]);
        assert_eq!(controller.state(), ControllerState::Off);
    }

    #[test]
    fn test_connection_lifecycle_through_events() {
        let (_, _, l2cap, dispatcher) = setup();

        dispatcher.handle_packet(HCI_EVENT_PACKET, 0, &le_connection_complete(0, 0x0040));
        assert!(l2cap.can_accept());
        let peer = l2cap.peer(0x0040).unwrap();
        assert_eq!(peer.address.to_string(), "00:11:22:33:44:55");

        dispatcher.handle_packet(ATT_DATA_PACKET, 0x0040, &[0x02, 0x00, 0x02]);
        assert!(l2cap.can_receive(0x0040));

        dispatcher.handle_packet(HCI_EVENT_PACKET, 0, &disconnection_complete(0x0040));
        assert!(!l2cap.can_accept());
        assert!(!l2cap.can_receive(0x0040));
    }

    #[test]
    fn test_failed_connection_is_not_pending() {
        let (_, _, l2cap, dispatcher) = setup();

        dispatcher.handle_packet(HCI_EVENT_PACKET, 0, &le_connection_complete(0x3E, 0x0040));
        assert!(!l2cap.can_accept());
    }

    #[test]
    fn test_att_payloads_queued_regardless_of_opcode() {
        let (_, _, l2cap, dispatcher) = setup();
        dispatcher.handle_packet(HCI_EVENT_PACKET, 0, &le_connection_complete(0, 0x0001));

        dispatcher.handle_packet(ATT_DATA_PACKET, 0x0001, &[0xEE, 0x01]);
        dispatcher.handle_packet(ATT_DATA_PACKET, 0x0001, &[0x52, 0x03, 0x00, 0x01]);
        dispatcher.handle_packet(ATT_DATA_PACKET, 0x0001, &[]);

        assert_eq!(l2cap.receive(0x0001, 64).unwrap(), vec![0xEE, 0x01]);
        assert_eq!(l2cap.receive(0x0001, 64).unwrap(), vec![0x52, 0x03, 0x00, 0x01]);
        assert_eq!(l2cap.receive(0x0001, 64).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_l2cap_data_is_copied_into_queue() {
        let (_, _, l2cap, dispatcher) = setup();
        dispatcher.handle_packet(HCI_EVENT_PACKET, 0, &le_connection_complete(0, 0x0002));

        let mut buffer = vec![1, 2, 3];
        dispatcher.handle_packet(L2CAP_DATA_PACKET, 0x0002, &buffer);
        // The transport reuses its buffer after the callback returns
        buffer.copy_from_slice(&[9, 9, 9]);

        assert_eq!(l2cap.receive(0x0002, 16).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_malformed_events_are_dropped() {
        let (_, controller, l2cap, dispatcher) = setup();
        dispatcher.handle_packet(HCI_EVENT_PACKET, 0, &le_connection_complete(0, 0x0003));

        // Disconnection complete shorter than its fixed layout
        dispatcher.handle_packet(HCI_EVENT_PACKET, 0, &[EVT_DISCONN_COMPLETE, 2, 0x00, 0x03]);
        // Declared length longer than the packet
        dispatcher.handle_packet(HCI_EVENT_PACKET, 0, &[EVT_DISCONN_COMPLETE, 4, 0x00]);
        // Truncated LE meta event
        dispatcher.handle_packet(HCI_EVENT_PACKET, 0, &[EVT_LE_META_EVENT, 2, EVT_LE_CONN_COMPLETE, 0]);
        // State event without a state byte
        dispatcher.handle_packet(HCI_EVENT_PACKET, 0, &[EVT_STACK_STATE, 0]);
        dispatcher.handle_packet(HCI_EVENT_PACKET, 0, &[]);

        assert!(l2cap.is_open(0x0003));
        assert_eq!(l2cap.accept().unwrap(), 0x0003);
        assert_eq!(controller.state(), ControllerState::Off);
    }

    #[test]
    fn test_unknown_packet_types_are_ignored() {
        let (_, _, l2cap, dispatcher) = setup();
        dispatcher.handle_packet(HCI_EVENT_PACKET, 0, &le_connection_complete(0, 0x0004));

        dispatcher.handle_packet(RFCOMM_DATA_PACKET, 0x0004, &[1, 2, 3]);
        dispatcher.handle_packet(HCI_ACL_DATA_PACKET, 0x0004, &[1, 2, 3]);

        assert!(!l2cap.can_receive(0x0004));
    }
}
