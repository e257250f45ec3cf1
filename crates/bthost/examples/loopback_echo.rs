/// Example: ATT echo over a loopback transport
///
/// The loopback transport plays the controller: it reports power-on, connects
/// one peer on the ATT channel, sends a request, and answers the disconnect.
/// Run with `RUST_LOG=debug` to watch the dispatcher.
use bthost::hci::constants::*;
use bthost::hci::{HciCommand, PowerMode};
use bthost::*;
use log::info;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

type Handler = Arc<Mutex<Option<Arc<dyn PacketHandler>>>>;

const PEER_HANDLE: u16 = 0x0040;

struct LoopbackTransport {
    handler: Handler,
    le_mtu: AtomicU16,
}

impl LoopbackTransport {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            handler: Arc::new(Mutex::new(None)),
            le_mtu: AtomicU16::new(23),
        })
    }

    fn deliver(handler: &Handler, packet_type: u8, channel: u16, packet: &[u8]) {
        let current = handler.lock().clone();
        if let Some(current) = current {
            current.handle_packet(packet_type, channel, packet);
        }
    }

    /// Boot, then a peer connects and sends an ATT Read Request
    fn simulate_controller(handler: Handler) {
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            Self::deliver(&handler, HCI_EVENT_PACKET, 0, &[EVT_STACK_STATE, 1, 1]);
            Self::deliver(&handler, HCI_EVENT_PACKET, 0, &[EVT_STACK_STATE, 1, 2]);

            let mut event = vec![EVT_LE_META_EVENT, 19, EVT_LE_CONN_COMPLETE, 0x00];
            event.extend_from_slice(&PEER_HANDLE.to_le_bytes());
            event.extend_from_slice(&[0x01, 0x01, 0x9A, 0x78, 0x56, 0x34, 0x12, 0xC0]);
            event.extend_from_slice(&[0x18, 0x00, 0x00, 0x00, 0xC8, 0x00, 0x00]);
            Self::deliver(&handler, HCI_EVENT_PACKET, 0, &event);

            thread::sleep(Duration::from_millis(20));
            Self::deliver(&handler, ATT_DATA_PACKET, PEER_HANDLE, &[0x0A, 0x03, 0x00]);
        });
    }
}

impl Transport for LoopbackTransport {
    fn is_ready(&self) -> bool {
        true
    }

    fn subscribe(&self, handler: Arc<dyn PacketHandler>) {
        *self.handler.lock() = Some(handler);
    }

    fn unsubscribe(&self) {
        *self.handler.lock() = None;
    }

    fn configure_usb(&self, _config: &UsbTransportConfig) -> i32 {
        0
    }

    fn power_control(&self, mode: PowerMode) -> i32 {
        if mode == PowerMode::On {
            Self::simulate_controller(self.handler.clone());
        }
        0
    }

    fn send_command(&self, command: &HciCommand) -> i32 {
        if let HciCommand::Disconnect { handle, reason } = *command {
            let mut event = vec![EVT_DISCONN_COMPLETE, 4, 0x00];
            event.extend_from_slice(&handle.to_le_bytes());
            event.push(reason);
            Self::deliver(&self.handler, HCI_EVENT_PACKET, 0, &event);
        }
        0
    }

    fn send_packet(&self, handle: u16, data: &[u8]) -> i32 {
        println!("-> 0x{:04X}: {}", handle, hex::encode(data));
        0
    }

    fn can_send_now(&self, _handle: u16) -> bool {
        true
    }

    fn register_fixed_channel(&self, _cid: u16) -> i32 {
        0
    }

    fn register_service(&self, _psm: u16, _mtu: u16, _security: SecurityLevel) -> i32 {
        0
    }

    fn unregister_service(&self, _psm: u16) -> i32 {
        0
    }

    fn register_le_service(&self, _psm: u16, _mtu: u16, _security: SecurityLevel) -> i32 {
        0
    }

    fn unregister_le_service(&self, _psm: u16) -> i32 {
        0
    }

    fn max_mtu(&self) -> u16 {
        1691
    }

    fn max_le_mtu(&self) -> u16 {
        self.le_mtu.load(Ordering::SeqCst)
    }

    fn set_max_le_mtu(&self, mtu: u16) {
        self.le_mtu.store(mtu, Ordering::SeqCst);
    }

    fn local_address(&self) -> [u8; 6] {
        [0x01, 0x00, 0x00, 0xDC, 0x1A, 0x00]
    }

    fn set_advertising_parameters(&self, params: &AdvertisingParameters) -> i32 {
        println!("Advertising interval 0x{:04X}", params.interval_min);
        0
    }

    fn set_advertising_data(&self, data: &[u8]) -> i32 {
        println!("Advertising data: {}", hex::encode(data));
        0
    }

    fn set_scan_response_data(&self, _data: &[u8]) -> i32 {
        0
    }

    fn set_advertising_enabled(&self, _enabled: bool) -> i32 {
        0
    }
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = HostConfig {
        max_le_mtu: Some(185),
        ..HostConfig::default()
    };
    let host = BluetoothHost::new(LoopbackTransport::new(), config)?;
    host.controller().observe(|old, new| println!("Controller {} -> {}", old, new));

    host.power_on()?;
    let server = host.le_server()?;

    // Flags (LE General Discoverable, BR/EDR not supported) and a short name
    let controller = host.controller();
    controller.set_advertising_parameters(&AdvertisingParameters::default())?;
    controller.set_advertising_data(&[0x02, 0x01, 0x06, 0x05, 0x09, b'e', b'c', b'h', b'o'])?;
    controller.set_advertising(true)?;

    while !server.status().can_accept() {
        thread::sleep(Duration::from_millis(5));
    }
    let connection = server.accept()?;
    info!("Accepted {} on 0x{:04X}", connection.destination(), connection.handle());
    controller.set_advertising(false)?;

    let mtu = host.l2cap().max_le_mtu() as usize;
    let request = loop {
        match connection.receive(mtu) {
            Ok(request) => break request,
            Err(err) if err.is_retryable() => thread::sleep(Duration::from_millis(5)),
            Err(err) => return Err(err.into()),
        }
    };
    println!("<- 0x{:04X}: {}", connection.handle(), hex::encode(&request));

    // Read Response carrying the requested handle back as the value
    let mut response = vec![0x0B];
    response.extend_from_slice(request.get(1..).unwrap_or_default());
    connection.send(&response)?;

    connection.close()?;
    println!("Closed, socket error now {:?}", connection.status().error);
    Ok(())
}
