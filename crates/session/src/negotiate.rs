//! Hello negotiation state machine
//!
//! A session starts in `AwaitingHello` with its own hello already queued.
//! The peer's hello fixes the effective capability set (the AND of both
//! announcements) and moves the session to `Negotiated` for the rest of
//! its life. There is no renegotiation: a second hello is a protocol
//! violation.

use crate::error::SessionError;
use protocol::CapabilitySet;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Negotiation progress of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NegotiationState {
    /// Peer hello not seen yet; only hello packets are legal
    AwaitingHello,
    /// Capability set fixed; normal traffic
    Negotiated,
}

#[derive(Debug)]
pub(crate) struct Negotiator {
    state: NegotiationState,
    peer_caps: CapabilitySet,
    effective: CapabilitySet,
}

impl Negotiator {
    pub(crate) fn new() -> Self {
        Self {
            state: NegotiationState::AwaitingHello,
            peer_caps: CapabilitySet::new(),
            effective: CapabilitySet::new(),
        }
    }

    /// Rebuild from snapshotted parts.
    pub(crate) fn from_parts(
        state: NegotiationState,
        peer_caps: CapabilitySet,
        local: &CapabilitySet,
    ) -> Self {
        let effective = match state {
            NegotiationState::AwaitingHello => CapabilitySet::new(),
            NegotiationState::Negotiated => local.intersection(&peer_caps),
        };
        Self {
            state,
            peer_caps,
            effective,
        }
    }

    pub(crate) fn state(&self) -> NegotiationState {
        self.state
    }

    pub(crate) fn is_negotiated(&self) -> bool {
        self.state == NegotiationState::Negotiated
    }

    pub(crate) fn peer_caps(&self) -> &CapabilitySet {
        &self.peer_caps
    }

    /// Effective set: empty until negotiated, then local AND peer.
    pub(crate) fn effective(&self) -> CapabilitySet {
        self.effective
    }

    /// Record the peer's hello.
    pub(crate) fn on_hello(
        &mut self,
        local: &CapabilitySet,
        version: &str,
        peer_caps: CapabilitySet,
    ) -> Result<(), SessionError> {
        match self.state {
            NegotiationState::Negotiated => Err(SessionError::UnexpectedHello),
            NegotiationState::AwaitingHello => {
                self.peer_caps = peer_caps;
                self.effective = local.intersection(&peer_caps);
                self.state = NegotiationState::Negotiated;
                debug!(peer_version = version, "hello exchange complete");
                Ok(())
            }
        }
    }
}
