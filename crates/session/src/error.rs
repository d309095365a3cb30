//! Session error types

use crate::config::Role;
use protocol::{PacketKind, ProtocolError};
use thiserror::Error;

/// Errors surfaced by the session step operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Structural protocol violation from the framer or codec
    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolError),

    /// The transport failed or closed
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Peer sent a non-hello packet before the hello exchange completed
    #[error("peer sent {kind:?} before completing the hello exchange")]
    PacketBeforeHello { kind: PacketKind },

    /// Peer sent a second hello; capabilities cannot change mid-session
    #[error("peer sent a second hello")]
    UnexpectedHello,

    /// Operation requires a negotiated session
    #[error("session is not negotiated yet")]
    NotNegotiated,

    /// This side of the session may not originate this packet kind
    #[error("{kind:?} may not be sent by the {role:?} side")]
    IllegalDirection { kind: PacketKind, role: Role },

    /// Snapshot encode or restore failed
    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
}

/// Errors reported by a [`crate::Transport`] implementation.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The peer closed the byte stream
    #[error("transport closed")]
    Closed,

    /// Underlying I/O failure
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from snapshot encoding and restore.
///
/// Restore is atomic: any of these leaves no partially-built session behind.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Blob shorter than its fixed framing
    #[error("snapshot blob truncated")]
    Truncated,

    /// Trailing checksum does not match the payload
    #[error("snapshot checksum mismatch")]
    ChecksumMismatch,

    /// Blob does not start with the snapshot magic
    #[error("bad snapshot magic")]
    BadMagic,

    /// Blob was written by an incompatible format version
    #[error("unsupported snapshot format {found} (expected {expected})")]
    UnsupportedFormat { found: u32, expected: u32 },

    /// Payload bytes left over after the snapshot structure ended
    #[error("trailing bytes after snapshot payload")]
    TrailingBytes,

    /// Postcard (de)serialization failure
    #[error("snapshot codec error: {0}")]
    Codec(#[from] postcard::Error),
}

/// Type alias for session results
pub type Result<T> = std::result::Result<T, SessionError>;
