//! Transport boundary
//!
//! The engine never owns a socket. The embedder supplies any reliable,
//! ordered byte channel behind this trait and the session pulls from it in
//! [`crate::Session::read_step`] and pushes to it in
//! [`crate::Session::write_step`]. Both sides may accept or deliver fewer
//! bytes than offered; the engine retains the remainder and never retries
//! internally.

use crate::error::TransportError;

/// A reliable byte-stream channel supplied by the embedder.
///
/// Implementations must preserve byte order and must not duplicate or drop
/// data; everything else (blocking behavior, buffering, encryption) is the
/// transport's business.
pub trait Transport {
    /// Pull up to `buf.len()` bytes.
    ///
    /// `Ok(0)` means no bytes are available right now; it is not
    /// end-of-stream. A closed stream is [`TransportError::Closed`].
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;

    /// Push a prefix of `buf`, returning how many bytes were accepted.
    ///
    /// `Ok(0)` means the transport cannot accept anything right now.
    fn write(&mut self, buf: &[u8]) -> Result<usize, TransportError>;
}
