//! Capability bit set exchanged during hello negotiation
//!
//! Each side announces the optional protocol features it supports as a fixed
//! array of 32-bit words. Once both hellos have been seen, the effective set
//! for the session is the bitwise AND of the two announcements; a feature is
//! usable only if both sides carry its bit. The effective set never changes
//! after negotiation.

use serde::{Deserialize, Serialize};

/// Number of 32-bit words in a capability set.
///
/// Fixed by the protocol; hello packets may carry fewer words on the wire
/// (missing words read as zero) but never more.
pub const CAPS_WORDS: usize = 32;

/// Optional protocol features, one bit each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum Capability {
    /// USB 3 bulk streams (alloc/free/status packets, ep-info max_streams)
    BulkStreams = 0,
    /// Device-connect header carries the bcd device version field
    ConnectDeviceVersion = 1,
    /// Filter rules may be exchanged (filter-filter / filter-reject packets)
    Filter = 2,
    /// Device disconnect is acknowledged by the guest side
    DeviceDisconnectAck = 3,
    /// Ep-info header carries per-endpoint max packet sizes
    EpInfoMaxPacketSize = 4,
    /// Transaction ids on the wire are 64-bit instead of 32-bit
    Ids64Bit = 5,
    /// Bulk packet headers carry a high 16 bits of payload length
    Bulk32BitLength = 6,
    /// Host-driven buffered bulk receiving is supported
    BulkReceiving = 7,
}

impl Capability {
    /// All capabilities this implementation knows about.
    pub const ALL: [Capability; 8] = [
        Capability::BulkStreams,
        Capability::ConnectDeviceVersion,
        Capability::Filter,
        Capability::DeviceDisconnectAck,
        Capability::EpInfoMaxPacketSize,
        Capability::Ids64Bit,
        Capability::Bulk32BitLength,
        Capability::BulkReceiving,
    ];

    /// Bit index of this capability within the set.
    pub fn bit(self) -> u32 {
        self as u32
    }
}

/// Fixed-size capability bit array.
///
/// The default value is the empty set. Word 0 bit 0 is capability 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CapabilitySet {
    words: [u32; CAPS_WORDS],
}

impl CapabilitySet {
    /// The empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from a list of capabilities.
    pub fn with(caps: &[Capability]) -> Self {
        let mut set = Self::default();
        for &cap in caps {
            set.set(cap);
        }
        set
    }

    /// Build a set from raw words as received in a hello packet.
    ///
    /// Fewer than [`CAPS_WORDS`] words is allowed (older peers announce a
    /// shorter array); the remainder reads as zero. Extra words are the
    /// caller's error to reject before calling this.
    pub fn from_words(words: &[u32]) -> Self {
        let mut set = Self::default();
        for (dst, src) in set.words.iter_mut().zip(words) {
            *dst = *src;
        }
        set
    }

    /// Raw words, for serialization into a hello packet.
    pub fn words(&self) -> &[u32; CAPS_WORDS] {
        &self.words
    }

    /// Set a capability bit.
    pub fn set(&mut self, cap: Capability) {
        let bit = cap.bit();
        self.words[(bit / 32) as usize] |= 1 << (bit % 32);
    }

    /// Clear a capability bit.
    pub fn clear(&mut self, cap: Capability) {
        let bit = cap.bit();
        self.words[(bit / 32) as usize] &= !(1 << (bit % 32));
    }

    /// Test a capability bit.
    pub fn has(&self, cap: Capability) -> bool {
        let bit = cap.bit();
        self.words[(bit / 32) as usize] & (1 << (bit % 32)) != 0
    }

    /// Bitwise AND of two sets: the effective capabilities of a session.
    pub fn intersection(&self, other: &CapabilitySet) -> CapabilitySet {
        let mut out = CapabilitySet::default();
        for i in 0..CAPS_WORDS {
            out.words[i] = self.words[i] & other.words[i];
        }
        out
    }

    /// True if no bit is set.
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }
}
