//! Shared test support: an in-memory transport with tunable chunking and a
//! handler that records every dispatch as a comparable string.

// Each test binary uses a different subset of these helpers.
#![allow(dead_code)]

use bytes::Bytes;
use protocol::types::*;
use protocol::{Capability, CapabilitySet};
use session::{PacketHandler, Role, Session, SessionConfig, Transport, TransportError};

/// In-memory transport. Read and write sizes can be capped per call to
/// exercise partial-progress paths.
pub struct VecTransport {
    incoming: Vec<u8>,
    read_pos: usize,
    pub read_chunk: usize,
    pub outgoing: Vec<u8>,
    pub write_chunk: usize,
}

impl VecTransport {
    pub fn new() -> Self {
        Self {
            incoming: Vec::new(),
            read_pos: 0,
            read_chunk: usize::MAX,
            outgoing: Vec::new(),
            write_chunk: usize::MAX,
        }
    }

    pub fn feed(&mut self, bytes: &[u8]) {
        self.incoming.extend_from_slice(bytes);
    }
}

impl Transport for VecTransport {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        let available = self.incoming.len() - self.read_pos;
        let n = buf.len().min(available).min(self.read_chunk);
        buf[..n].copy_from_slice(&self.incoming[self.read_pos..self.read_pos + n]);
        self.read_pos += n;
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, TransportError> {
        let n = buf.len().min(self.write_chunk);
        self.outgoing.extend_from_slice(&buf[..n]);
        Ok(n)
    }
}

/// Records one string per dispatched packet, including ids, header fields
/// and payload bytes, so two dispatch histories can be compared directly.
#[derive(Debug, Default)]
pub struct RecordingHandler {
    pub events: Vec<String>,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PacketHandler for RecordingHandler {
    fn hello(&mut self, version: &str, _peer_caps: &CapabilitySet) {
        self.events.push(format!("hello {version}"));
    }
    fn device_connect(&mut self, h: &DeviceConnectHeader) {
        self.events.push(format!("device_connect {h:?}"));
    }
    fn device_disconnect(&mut self) {
        self.events.push("device_disconnect".into());
    }
    fn reset(&mut self) {
        self.events.push("reset".into());
    }
    fn interface_info(&mut self, h: &InterfaceInfoHeader) {
        self.events.push(format!("interface_info {h:?}"));
    }
    fn ep_info(&mut self, h: &EpInfoHeader) {
        self.events.push(format!("ep_info {h:?}"));
    }
    fn set_configuration(&mut self, id: u64, h: &SetConfigurationHeader) {
        self.events.push(format!("set_configuration {id} {h:?}"));
    }
    fn get_configuration(&mut self, id: u64) {
        self.events.push(format!("get_configuration {id}"));
    }
    fn configuration_status(&mut self, id: u64, h: &ConfigurationStatusHeader) {
        self.events.push(format!("configuration_status {id} {h:?}"));
    }
    fn set_alt_setting(&mut self, id: u64, h: &SetAltSettingHeader) {
        self.events.push(format!("set_alt_setting {id} {h:?}"));
    }
    fn get_alt_setting(&mut self, id: u64, h: &GetAltSettingHeader) {
        self.events.push(format!("get_alt_setting {id} {h:?}"));
    }
    fn alt_setting_status(&mut self, id: u64, h: &AltSettingStatusHeader) {
        self.events.push(format!("alt_setting_status {id} {h:?}"));
    }
    fn start_iso_stream(&mut self, id: u64, h: &StartIsoStreamHeader) {
        self.events.push(format!("start_iso_stream {id} {h:?}"));
    }
    fn stop_iso_stream(&mut self, id: u64, h: &StopIsoStreamHeader) {
        self.events.push(format!("stop_iso_stream {id} {h:?}"));
    }
    fn iso_stream_status(&mut self, id: u64, h: &IsoStreamStatusHeader) {
        self.events.push(format!("iso_stream_status {id} {h:?}"));
    }
    fn start_interrupt_receiving(&mut self, id: u64, h: &StartInterruptReceivingHeader) {
        self.events.push(format!("start_interrupt_receiving {id} {h:?}"));
    }
    fn stop_interrupt_receiving(&mut self, id: u64, h: &StopInterruptReceivingHeader) {
        self.events.push(format!("stop_interrupt_receiving {id} {h:?}"));
    }
    fn interrupt_receiving_status(&mut self, id: u64, h: &InterruptReceivingStatusHeader) {
        self.events.push(format!("interrupt_receiving_status {id} {h:?}"));
    }
    fn alloc_bulk_streams(&mut self, id: u64, h: &AllocBulkStreamsHeader) {
        self.events.push(format!("alloc_bulk_streams {id} {h:?}"));
    }
    fn free_bulk_streams(&mut self, id: u64, h: &FreeBulkStreamsHeader) {
        self.events.push(format!("free_bulk_streams {id} {h:?}"));
    }
    fn bulk_streams_status(&mut self, id: u64, h: &BulkStreamsStatusHeader) {
        self.events.push(format!("bulk_streams_status {id} {h:?}"));
    }
    fn cancel_data_packet(&mut self, id: u64) {
        self.events.push(format!("cancel_data_packet {id}"));
    }
    fn filter_reject(&mut self) {
        self.events.push("filter_reject".into());
    }
    fn filter_filter(&mut self, rules_text: Bytes) {
        self.events.push(format!(
            "filter_filter {}",
            String::from_utf8_lossy(&rules_text)
        ));
    }
    fn device_disconnect_ack(&mut self) {
        self.events.push("device_disconnect_ack".into());
    }
    fn start_bulk_receiving(&mut self, id: u64, h: &StartBulkReceivingHeader) {
        self.events.push(format!("start_bulk_receiving {id} {h:?}"));
    }
    fn stop_bulk_receiving(&mut self, id: u64, h: &StopBulkReceivingHeader) {
        self.events.push(format!("stop_bulk_receiving {id} {h:?}"));
    }
    fn bulk_receiving_status(&mut self, id: u64, h: &BulkReceivingStatusHeader) {
        self.events.push(format!("bulk_receiving_status {id} {h:?}"));
    }
    fn control_packet(&mut self, id: u64, h: &ControlPacketHeader, data: Bytes) {
        self.events.push(format!("control_packet {id} {h:?} {data:?}"));
    }
    fn bulk_packet(&mut self, id: u64, h: &BulkPacketHeader, data: Bytes) {
        self.events.push(format!("bulk_packet {id} {h:?} {data:?}"));
    }
    fn iso_packet(&mut self, id: u64, h: &IsoPacketHeader, data: Bytes) {
        self.events.push(format!("iso_packet {id} {h:?} {data:?}"));
    }
    fn interrupt_packet(&mut self, id: u64, h: &InterruptPacketHeader, data: Bytes) {
        self.events.push(format!("interrupt_packet {id} {h:?} {data:?}"));
    }
    fn buffered_bulk_packet(&mut self, id: u64, h: &BufferedBulkPacketHeader, data: Bytes) {
        self.events.push(format!("buffered_bulk_packet {id} {h:?} {data:?}"));
    }
}

/// Route engine tracing to the test writer; honors RUST_LOG.
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn host_config(caps: &[Capability]) -> SessionConfig {
    SessionConfig::new(Role::UsbHost).with_capabilities(CapabilitySet::with(caps))
}

pub fn guest_config(caps: &[Capability]) -> SessionConfig {
    SessionConfig::new(Role::UsbGuest).with_capabilities(CapabilitySet::with(caps))
}

/// Pull everything the session has queued.
pub fn drain(session: &mut Session) -> Vec<u8> {
    let mut transport = VecTransport::new();
    while session.has_pending() {
        session.write_step(&mut transport).expect("write step");
    }
    transport.outgoing
}

/// Feed bytes through a fresh transport into the session.
pub fn feed(
    session: &mut Session,
    bytes: &[u8],
    handler: &mut RecordingHandler,
) -> session::Result<usize> {
    let mut transport = VecTransport::new();
    transport.feed(bytes);
    session.read_step(&mut transport, handler)
}

/// Run the hello exchange between two sessions.
pub fn exchange_hellos(
    host: &mut Session,
    guest: &mut Session,
) -> (RecordingHandler, RecordingHandler) {
    init_logging();
    let mut host_handler = RecordingHandler::new();
    let mut guest_handler = RecordingHandler::new();

    let host_hello = drain(host);
    let guest_hello = drain(guest);
    feed(guest, &host_hello, &mut guest_handler).expect("guest reads host hello");
    feed(host, &guest_hello, &mut host_handler).expect("host reads guest hello");

    assert!(host.is_negotiated());
    assert!(guest.is_negotiated());
    (host_handler, guest_handler)
}
