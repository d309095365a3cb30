//! Session engine
//!
//! A [`Session`] owns the mutable state of one redirection: the negotiation
//! state machine, the read framer, the write queue and the transaction id
//! counter. It is a synchronous state machine: no internal threads, no
//! hidden I/O. The embedder drives it:
//!
//! - [`Session::read_step`] pulls bytes from the transport, frames zero or
//!   more packets and dispatches each to the handler, in arrival order;
//! - [`Session::enqueue`] serializes an outbound packet onto the FIFO
//!   write queue;
//! - [`Session::write_step`] hands queued bytes to the transport, in
//!   enqueue order.
//!
//! Creating a session queues this side's hello; the peer's hello fixes the
//! effective capability set for the session's lifetime.

use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::framer::ReadFramer;
use crate::handler::PacketHandler;
use crate::lock::{NoopLock, SessionLock};
use crate::negotiate::Negotiator;
use crate::queue::WriteQueue;
use crate::snapshot::{self, SnapshotV1};
use crate::transport::Transport;
use protocol::{Capability, CapabilitySet, GenericHeader, Packet, PacketKind, encode_packet};
use tracing::{debug, trace, warn};

/// Transport bytes pulled per read call.
const READ_CHUNK: usize = 16 * 1024;

/// One live redirection session.
///
/// Generic over the injected lock; single-threaded embedders use the
/// default [`NoopLock`].
#[derive(Debug)]
pub struct Session<L: SessionLock = NoopLock> {
    config: SessionConfig,
    negotiator: Negotiator,
    framer: ReadFramer,
    queue: WriteQueue,
    next_id: u64,
    lock: L,
}

impl Session<NoopLock> {
    /// Create a session and queue its hello packet.
    pub fn new(config: SessionConfig) -> Result<Self> {
        Self::with_lock(config, NoopLock)
    }

    /// Reconstruct a session from a snapshot blob.
    ///
    /// The restored session behaves as if the handoff never happened:
    /// pending writes drain in their original order and a partially
    /// received packet completes once the transport delivers the rest.
    /// Restore is atomic: a bad blob produces an error and no session.
    pub fn restore(blob: &[u8]) -> Result<Self> {
        Self::restore_with_lock(blob, NoopLock)
    }
}

impl<L: SessionLock> Session<L> {
    /// Create a session with an embedder-supplied lock around the write
    /// queue.
    pub fn with_lock(config: SessionConfig, lock: L) -> Result<Self> {
        let mut session = Self {
            config,
            negotiator: Negotiator::new(),
            framer: ReadFramer::new(),
            queue: WriteQueue::new(),
            next_id: 0,
            lock,
        };
        session.queue_hello()?;
        Ok(session)
    }

    /// [`Session::restore`] with an embedder-supplied lock.
    pub fn restore_with_lock(blob: &[u8], lock: L) -> Result<Self> {
        let snap = snapshot::decode(blob)?;
        let negotiator =
            Negotiator::from_parts(snap.state, snap.peer_caps, &snap.config.capabilities);
        debug!(
            pending_writes = snap.pending_writes.len(),
            residue = snap.read_residue.len(),
            "session restored from snapshot"
        );
        Ok(Self {
            config: snap.config,
            negotiator,
            framer: ReadFramer::from_residue(&snap.read_residue),
            queue: WriteQueue::from_pending(
                snap.pending_writes.into_iter().map(|p| p.0).collect(),
            ),
            next_id: snap.next_id,
            lock,
        })
    }

    fn queue_hello(&mut self) -> Result<()> {
        let hello = Packet::Hello {
            version: self.config.version.clone(),
            capabilities: self.config.capabilities,
        };
        // Hello precedes negotiation, so it is encoded against the empty set
        let bytes = encode_packet(&hello, 0, &CapabilitySet::new())?;
        self.lock.with(|| self.queue.push(bytes));
        Ok(())
    }

    /// Session configuration as given at creation.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// True once the peer's hello has been processed.
    pub fn is_negotiated(&self) -> bool {
        self.negotiator.is_negotiated()
    }

    /// Effective capabilities: empty until negotiated, then the AND of both
    /// announcements. Never gains a bit mid-session.
    pub fn effective_capabilities(&self) -> CapabilitySet {
        self.negotiator.effective()
    }

    /// The peer's raw capability announcement.
    pub fn peer_capabilities(&self) -> CapabilitySet {
        *self.negotiator.peer_caps()
    }

    fn wide_ids(&self) -> bool {
        self.negotiator.effective().has(Capability::Ids64Bit)
    }

    /// Allocate the next transaction id.
    ///
    /// Ids are unique while in flight; they wrap at the id width the
    /// session negotiated.
    pub fn next_transaction_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id = if self.wide_ids() {
            self.next_id.wrapping_add(1)
        } else {
            (self.next_id + 1) & u64::from(u32::MAX)
        };
        id
    }

    /// Pull available transport bytes, frame and dispatch completed
    /// packets. Returns the number of packets dispatched.
    ///
    /// Framing and dispatch errors abort the step with no partial packet
    /// delivered; packets already dispatched in the same step stay
    /// dispatched.
    pub fn read_step<T: Transport, H: PacketHandler>(
        &mut self,
        transport: &mut T,
        handler: &mut H,
    ) -> Result<usize> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            let n = transport.read(&mut chunk)?;
            if n == 0 {
                break;
            }
            self.framer.extend(&chunk[..n]);
        }

        let mut dispatched = 0;
        loop {
            // Re-read per packet: the hello we dispatch below can widen ids
            // and unlock capability-dependent layouts for what follows.
            let caps = self.negotiator.effective();
            let wide = self.wide_ids();
            let Some((header, packet)) = self.framer.next_packet(&caps, wide)? else {
                break;
            };
            self.dispatch(header, packet, handler)?;
            dispatched += 1;
        }
        Ok(dispatched)
    }

    fn dispatch<H: PacketHandler>(
        &mut self,
        header: GenericHeader,
        packet: Packet,
        handler: &mut H,
    ) -> Result<()> {
        let kind = packet.kind();
        trace!(?kind, id = header.id, "dispatching packet");

        if kind != PacketKind::Hello {
            if !self.negotiator.is_negotiated() {
                warn!(?kind, "packet received before hello exchange");
                return Err(SessionError::PacketBeforeHello { kind });
            }
            if let Some(cap) = kind.required_capability() {
                if !self.negotiator.effective().has(cap) {
                    warn!(?kind, ?cap, "capability-gated packet without capability");
                    return Err(SessionError::Protocol(
                        protocol::ProtocolError::CapabilityRequired { kind, cap },
                    ));
                }
            }
        }

        let id = header.id;
        match packet {
            Packet::Hello {
                version,
                capabilities,
            } => {
                self.negotiator
                    .on_hello(&self.config.capabilities, &version, capabilities)?;
                handler.hello(&version, &capabilities);
            }
            Packet::DeviceConnect(h) => handler.device_connect(&h),
            Packet::DeviceDisconnect => handler.device_disconnect(),
            Packet::Reset => handler.reset(),
            Packet::InterfaceInfo(h) => handler.interface_info(&h),
            Packet::EpInfo(h) => handler.ep_info(&h),
            Packet::SetConfiguration(h) => handler.set_configuration(id, &h),
            Packet::GetConfiguration => handler.get_configuration(id),
            Packet::ConfigurationStatus(h) => handler.configuration_status(id, &h),
            Packet::SetAltSetting(h) => handler.set_alt_setting(id, &h),
            Packet::GetAltSetting(h) => handler.get_alt_setting(id, &h),
            Packet::AltSettingStatus(h) => handler.alt_setting_status(id, &h),
            Packet::StartIsoStream(h) => handler.start_iso_stream(id, &h),
            Packet::StopIsoStream(h) => handler.stop_iso_stream(id, &h),
            Packet::IsoStreamStatus(h) => handler.iso_stream_status(id, &h),
            Packet::StartInterruptReceiving(h) => handler.start_interrupt_receiving(id, &h),
            Packet::StopInterruptReceiving(h) => handler.stop_interrupt_receiving(id, &h),
            Packet::InterruptReceivingStatus(h) => handler.interrupt_receiving_status(id, &h),
            Packet::AllocBulkStreams(h) => handler.alloc_bulk_streams(id, &h),
            Packet::FreeBulkStreams(h) => handler.free_bulk_streams(id, &h),
            Packet::BulkStreamsStatus(h) => handler.bulk_streams_status(id, &h),
            Packet::CancelDataPacket => handler.cancel_data_packet(id),
            Packet::FilterReject => handler.filter_reject(),
            Packet::FilterFilter { rules_text } => handler.filter_filter(rules_text),
            Packet::DeviceDisconnectAck => handler.device_disconnect_ack(),
            Packet::StartBulkReceiving(h) => handler.start_bulk_receiving(id, &h),
            Packet::StopBulkReceiving(h) => handler.stop_bulk_receiving(id, &h),
            Packet::BulkReceivingStatus(h) => handler.bulk_receiving_status(id, &h),
            Packet::ControlPacket { header: h, data } => handler.control_packet(id, &h, data),
            Packet::BulkPacket { header: h, data } => handler.bulk_packet(id, &h, data),
            Packet::IsoPacket { header: h, data } => handler.iso_packet(id, &h, data),
            Packet::InterruptPacket { header: h, data } => handler.interrupt_packet(id, &h, data),
            Packet::BufferedBulkPacket { header: h, data } => {
                handler.buffered_bulk_packet(id, &h, data)
            }
        }
        Ok(())
    }

    /// Serialize a packet and append it to the write queue.
    ///
    /// Fails if the session is not negotiated yet, if this side may not
    /// originate the kind, or if the packet needs a capability the session
    /// does not have. Queued packets go out in exact enqueue order.
    pub fn enqueue(&mut self, id: u64, packet: &Packet) -> Result<()> {
        let kind = packet.kind();
        if kind == PacketKind::Hello {
            // The session sends its own hello at creation
            return Err(SessionError::UnexpectedHello);
        }
        if !self.negotiator.is_negotiated() {
            return Err(SessionError::NotNegotiated);
        }
        if !self.config.role.may_send(kind) {
            return Err(SessionError::IllegalDirection {
                kind,
                role: self.config.role,
            });
        }

        let bytes = encode_packet(packet, id, &self.negotiator.effective())?;
        self.lock.with(|| self.queue.push(bytes));
        Ok(())
    }

    /// True while any queued bytes await the transport.
    pub fn has_pending(&self) -> bool {
        self.lock.with(|| self.queue.has_pending())
    }

    /// Hand queued bytes to the transport. Returns bytes written; partial
    /// acceptance keeps the remainder queued for the next step.
    pub fn write_step<T: Transport>(&mut self, transport: &mut T) -> Result<usize> {
        let queue = &mut self.queue;
        let written = self.lock.with(|| queue.drain_step(transport))?;
        Ok(written)
    }

    /// Capture the session's full mutable state as an opaque blob.
    ///
    /// Call only while no read or write step is in progress. The session
    /// remains usable afterwards; the blob is an independent copy.
    pub fn snapshot(&self) -> Result<Vec<u8>> {
        let pending = self.lock.with(|| self.queue.pending());
        let snap = SnapshotV1::new(
            self.config.clone(),
            self.negotiator.state(),
            *self.negotiator.peer_caps(),
            self.next_id,
            self.framer.residue().to_vec(),
            pending,
        );
        let blob = snapshot::encode(&snap)?;
        debug!(bytes = blob.len(), "session snapshot taken");
        Ok(blob)
    }
}
