//! Read framer
//!
//! Reassembles discrete packets out of whatever byte chunks the transport
//! delivers. Partial data stays in the accumulation buffer across calls, so
//! a packet split at any offset, even inside the generic header, frames
//! identically to one delivered whole.
//!
//! The declared length is validated against [`protocol::max_wire_length`]
//! while only the generic header is buffered, before any body bytes are
//! awaited or retained. A hostile length field therefore cannot make the
//! framer allocate more than the per-type structural maximum.

use crate::error::{Result, SessionError};
use bytes::{Buf, BytesMut};
use protocol::{
    CapabilitySet, GenericHeader, Packet, PacketKind, decode_body, generic_header_len,
    max_wire_length,
};
use tracing::warn;

#[derive(Debug, Default)]
pub(crate) struct ReadFramer {
    buf: BytesMut,
}

impl ReadFramer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Rebuild from a snapshotted partial-packet buffer.
    pub(crate) fn from_residue(residue: &[u8]) -> Self {
        Self {
            buf: BytesMut::from(residue),
        }
    }

    /// Unconsumed bytes, for snapshotting mid-packet state.
    pub(crate) fn residue(&self) -> &[u8] {
        &self.buf
    }

    /// Append freshly read transport bytes.
    pub(crate) fn extend(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Try to frame one complete packet off the front of the buffer.
    ///
    /// `Ok(None)` means more bytes are needed. Errors are protocol
    /// violations; the buffer is left as-is and the session is expected to
    /// be torn down rather than resynchronized.
    pub(crate) fn next_packet(
        &mut self,
        caps: &CapabilitySet,
        wide_ids: bool,
    ) -> Result<Option<(GenericHeader, Packet)>> {
        let Some(header) = GenericHeader::decode(&self.buf, wide_ids) else {
            return Ok(None);
        };

        let kind = PacketKind::from_wire(header.kind_raw).inspect_err(|_| {
            warn!(kind = header.kind_raw, "unknown packet type in stream");
        })?;

        let max = max_wire_length(kind, caps);
        if header.length > max {
            warn!(
                ?kind,
                declared = header.length,
                max,
                "declared packet length over structural maximum"
            );
            return Err(SessionError::Protocol(
                protocol::ProtocolError::PacketTooLarge {
                    kind,
                    declared: header.length,
                    max,
                },
            ));
        }

        let header_len = generic_header_len(wide_ids);
        let total = header_len + header.length as usize;
        if self.buf.len() < total {
            return Ok(None);
        }

        self.buf.advance(header_len);
        let body = self.buf.split_to(header.length as usize).freeze();
        let packet = decode_body(kind, body, caps)?;
        Ok(Some((header, packet)))
    }
}
