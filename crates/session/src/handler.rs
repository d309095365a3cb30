//! Packet handler interface
//!
//! The embedder supplies one object implementing [`PacketHandler`]; the
//! dispatcher calls exactly one method per framed packet, synchronously, on
//! the thread driving [`crate::Session::read_step`]. Every method is
//! required, so adding a packet kind is a compile error in every embedder
//! until it decides how to handle it.
//!
//! Id-bearing kinds receive the transaction id from the generic header.
//! The session does not validate request/response causality: a status for
//! an id that was never issued is delivered verbatim; correlating ids is
//! the embedder's job.
//!
//! Data kinds receive their payload as an owned [`Bytes`] buffer. Ownership
//! transfers to the handler; dropping the buffer releases it.

use bytes::Bytes;
use protocol::CapabilitySet;
use protocol::types::*;

/// One method per packet kind.
pub trait PacketHandler {
    /// Peer hello. Called once, just after the effective capability set is
    /// fixed, with the peer's version string and raw announcement.
    fn hello(&mut self, version: &str, peer_caps: &CapabilitySet);

    fn device_connect(&mut self, header: &DeviceConnectHeader);
    fn device_disconnect(&mut self);
    fn reset(&mut self);
    fn interface_info(&mut self, header: &InterfaceInfoHeader);
    fn ep_info(&mut self, header: &EpInfoHeader);

    fn set_configuration(&mut self, id: u64, header: &SetConfigurationHeader);
    fn get_configuration(&mut self, id: u64);
    fn configuration_status(&mut self, id: u64, header: &ConfigurationStatusHeader);
    fn set_alt_setting(&mut self, id: u64, header: &SetAltSettingHeader);
    fn get_alt_setting(&mut self, id: u64, header: &GetAltSettingHeader);
    fn alt_setting_status(&mut self, id: u64, header: &AltSettingStatusHeader);

    fn start_iso_stream(&mut self, id: u64, header: &StartIsoStreamHeader);
    fn stop_iso_stream(&mut self, id: u64, header: &StopIsoStreamHeader);
    fn iso_stream_status(&mut self, id: u64, header: &IsoStreamStatusHeader);

    fn start_interrupt_receiving(&mut self, id: u64, header: &StartInterruptReceivingHeader);
    fn stop_interrupt_receiving(&mut self, id: u64, header: &StopInterruptReceivingHeader);
    fn interrupt_receiving_status(&mut self, id: u64, header: &InterruptReceivingStatusHeader);

    fn alloc_bulk_streams(&mut self, id: u64, header: &AllocBulkStreamsHeader);
    fn free_bulk_streams(&mut self, id: u64, header: &FreeBulkStreamsHeader);
    fn bulk_streams_status(&mut self, id: u64, header: &BulkStreamsStatusHeader);

    /// Advisory: the peer no longer wants the result of request `id`. The
    /// response may already be in flight and will still be dispatched if it
    /// arrives; suppressing it is the embedder's choice.
    fn cancel_data_packet(&mut self, id: u64);

    fn filter_reject(&mut self);
    /// Filter rule text from the peer; parse with the `filter` crate.
    fn filter_filter(&mut self, rules_text: Bytes);
    fn device_disconnect_ack(&mut self);

    fn start_bulk_receiving(&mut self, id: u64, header: &StartBulkReceivingHeader);
    fn stop_bulk_receiving(&mut self, id: u64, header: &StopBulkReceivingHeader);
    fn bulk_receiving_status(&mut self, id: u64, header: &BulkReceivingStatusHeader);

    fn control_packet(&mut self, id: u64, header: &ControlPacketHeader, data: Bytes);
    fn bulk_packet(&mut self, id: u64, header: &BulkPacketHeader, data: Bytes);
    fn iso_packet(&mut self, id: u64, header: &IsoPacketHeader, data: Bytes);
    fn interrupt_packet(&mut self, id: u64, header: &InterruptPacketHeader, data: Bytes);
    fn buffered_bulk_packet(&mut self, id: u64, header: &BufferedBulkPacketHeader, data: Bytes);
}
