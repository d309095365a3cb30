//! Session state snapshots
//!
//! A snapshot captures everything mutable about a live session (the
//! negotiated state, the framer's partial-packet residue, the unsent tail
//! of every queued write, and the id counter) so a redirection can be
//! handed to a new process and resume as if nothing happened.
//!
//! Blob layout: a postcard-encoded [`SnapshotV1`] followed by a CRC32 of
//! those bytes, little-endian. The structure itself leads with a magic and
//! a format version so an incompatible blob fails loudly instead of being
//! misread. The layout is private to this crate; callers treat blobs as
//! opaque.

use crate::config::SessionConfig;
use crate::error::SnapshotError;
use crate::negotiate::NegotiationState;
use protocol::CapabilitySet;
use serde::{Deserialize, Serialize};

const SNAPSHOT_MAGIC: u32 = 0x5542_5331; // "UBS1"
const SNAPSHOT_FORMAT: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct SnapshotV1 {
    magic: u32,
    format: u32,
    pub(crate) config: SessionConfig,
    pub(crate) state: NegotiationState,
    pub(crate) peer_caps: CapabilitySet,
    pub(crate) next_id: u64,
    #[serde(with = "serde_bytes")]
    pub(crate) read_residue: Vec<u8>,
    pub(crate) pending_writes: Vec<PendingBytes>,
}

/// One queued write's unsent bytes.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct PendingBytes(#[serde(with = "serde_bytes")] pub(crate) Vec<u8>);

impl SnapshotV1 {
    pub(crate) fn new(
        config: SessionConfig,
        state: NegotiationState,
        peer_caps: CapabilitySet,
        next_id: u64,
        read_residue: Vec<u8>,
        pending_writes: Vec<Vec<u8>>,
    ) -> Self {
        Self {
            magic: SNAPSHOT_MAGIC,
            format: SNAPSHOT_FORMAT,
            config,
            state,
            peer_caps,
            next_id,
            read_residue,
            pending_writes: pending_writes.into_iter().map(PendingBytes).collect(),
        }
    }
}

/// Encode a snapshot into an opaque blob.
pub(crate) fn encode(snapshot: &SnapshotV1) -> Result<Vec<u8>, SnapshotError> {
    let mut blob = postcard::to_allocvec(snapshot)?;
    let crc = crc32fast::hash(&blob);
    blob.extend_from_slice(&crc.to_le_bytes());
    Ok(blob)
}

/// Decode and validate a blob.
///
/// Every failure mode is checked before any state is handed back: length,
/// checksum, structure, trailing bytes, magic, format version.
pub(crate) fn decode(blob: &[u8]) -> Result<SnapshotV1, SnapshotError> {
    if blob.len() < 4 {
        return Err(SnapshotError::Truncated);
    }
    let (payload, crc_bytes) = blob.split_at(blob.len() - 4);
    let expected = u32::from_le_bytes([crc_bytes[0], crc_bytes[1], crc_bytes[2], crc_bytes[3]]);
    if crc32fast::hash(payload) != expected {
        return Err(SnapshotError::ChecksumMismatch);
    }

    let (snapshot, rest) = postcard::take_from_bytes::<SnapshotV1>(payload)?;
    if !rest.is_empty() {
        return Err(SnapshotError::TrailingBytes);
    }
    if snapshot.magic != SNAPSHOT_MAGIC {
        return Err(SnapshotError::BadMagic);
    }
    if snapshot.format != SNAPSHOT_FORMAT {
        return Err(SnapshotError::UnsupportedFormat {
            found: snapshot.format,
            expected: SNAPSHOT_FORMAT,
        });
    }
    Ok(snapshot)
}
