//! Outbound write queue
//!
//! Packets are serialized at enqueue time and their bytes wait here in
//! strict FIFO order until the transport accepts them. Ordering is a
//! correctness requirement, not a convenience: USB completion order on an
//! endpoint must survive the trip over the wire, so the queue never
//! reorders, merges or drops entries. Partial transport acceptance leaves
//! the remainder of the head entry for the next drain.

use crate::error::TransportError;
use crate::transport::Transport;
use std::collections::VecDeque;
use tracing::trace;

#[derive(Debug)]
struct PendingWrite {
    bytes: Vec<u8>,
    offset: usize,
}

impl PendingWrite {
    fn remaining(&self) -> &[u8] {
        &self.bytes[self.offset..]
    }
}

#[derive(Debug, Default)]
pub(crate) struct WriteQueue {
    entries: VecDeque<PendingWrite>,
}

impl WriteQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Rebuild from snapshotted entry remainders, oldest first.
    pub(crate) fn from_pending(pending: Vec<Vec<u8>>) -> Self {
        Self {
            entries: pending
                .into_iter()
                .map(|bytes| PendingWrite { bytes, offset: 0 })
                .collect(),
        }
    }

    /// Append one serialized packet to the tail.
    pub(crate) fn push(&mut self, bytes: Vec<u8>) {
        self.entries.push_back(PendingWrite { bytes, offset: 0 });
    }

    pub(crate) fn has_pending(&self) -> bool {
        !self.entries.is_empty()
    }

    /// Unsent bytes per entry, head first, for snapshotting.
    pub(crate) fn pending(&self) -> Vec<Vec<u8>> {
        self.entries
            .iter()
            .map(|entry| entry.remaining().to_vec())
            .collect()
    }

    /// Hand the transport as much of the queue as it will take, in order.
    ///
    /// Stops at the first partial or zero-byte acceptance; the unsent tail
    /// of the current entry stays at the head. Returns bytes written.
    pub(crate) fn drain_step<T: Transport>(
        &mut self,
        transport: &mut T,
    ) -> Result<usize, TransportError> {
        let mut written = 0;
        while let Some(entry) = self.entries.front_mut() {
            let remaining = entry.remaining();
            let accepted = transport.write(remaining)?;
            written += accepted;
            if accepted < remaining.len() {
                entry.offset += accepted;
                break;
            }
            self.entries.pop_front();
        }
        if written > 0 {
            trace!(written, queued = self.entries.len(), "drained write queue");
        }
        Ok(written)
    }
}
