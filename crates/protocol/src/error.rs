//! Protocol error types

use crate::caps::Capability;
use crate::packet::PacketKind;
use thiserror::Error;

/// Structural errors raised while framing or (de)serializing packets.
///
/// Every variant here indicates a misbehaving peer or a corrupted stream;
/// none of them are retryable. The session layer surfaces them to the
/// embedder, which is expected to tear the session down.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The generic header named a packet type this version does not know
    #[error("unknown packet type {value}")]
    UnknownPacketType { value: u32 },

    /// Declared length exceeds the hard cap or the per-type maximum
    #[error("{kind:?} packet declares {declared} bytes (max {max})")]
    PacketTooLarge {
        kind: PacketKind,
        declared: u32,
        max: u32,
    },

    /// Declared length matches no valid layout for this packet type
    #[error("{kind:?} header length {declared} matches no layout")]
    HeaderLengthMismatch { kind: PacketKind, declared: u32 },

    /// Packet type is gated behind a capability the session does not have
    #[error("{kind:?} requires the {cap:?} capability")]
    CapabilityRequired { kind: PacketKind, cap: Capability },

    /// Hello packet failed structural validation
    #[error("malformed hello packet: {reason}")]
    MalformedHello { reason: &'static str },

    /// Interface-info count field exceeds the fixed slot layout
    #[error("interface count {count} exceeds {max} slots")]
    InterfaceCountOutOfRange { count: u32, max: u32 },

    /// Payload handed to the encoder is larger than the type allows
    #[error("{kind:?} payload of {len} bytes exceeds {max}")]
    PayloadTooLarge {
        kind: PacketKind,
        len: usize,
        max: u32,
    },

    /// Transaction id needs 64 bits but the session negotiated 32-bit ids
    #[error("transaction id {id} does not fit a 32-bit header")]
    IdOutOfRange { id: u64 },
}

/// Type alias for protocol results
pub type Result<T> = std::result::Result<T, ProtocolError>;
