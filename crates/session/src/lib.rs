//! Session engine for usb-bridge
//!
//! This crate drives one USB redirection session over any reliable byte
//! stream: it frames and validates inbound packets, negotiates capabilities
//! through the hello exchange, dispatches each packet to an embedder
//! handler, queues outbound packets in FIFO order, and can snapshot its
//! entire live state to hand a running session to another process.
//!
//! The engine is a synchronous state machine. It owns no socket and spawns
//! no thread; the embedder supplies a [`Transport`], a [`PacketHandler`]
//! and (for multi-threaded enqueueing) a [`SessionLock`], then calls the
//! step operations from its own event loop.
//!
//! # Example
//!
//! ```
//! use protocol::{Capability, CapabilitySet};
//! use session::{Role, Session, SessionConfig, Transport, TransportError};
//!
//! struct Sink(Vec<u8>);
//!
//! impl Transport for Sink {
//!     fn read(&mut self, _buf: &mut [u8]) -> Result<usize, TransportError> {
//!         Ok(0)
//!     }
//!     fn write(&mut self, buf: &[u8]) -> Result<usize, TransportError> {
//!         self.0.extend_from_slice(buf);
//!         Ok(buf.len())
//!     }
//! }
//!
//! let config = SessionConfig::new(Role::UsbGuest)
//!     .with_capabilities(CapabilitySet::with(&[Capability::Filter]));
//! let mut session = Session::new(config).unwrap();
//!
//! // The hello is queued at creation and drains on the first write step
//! assert!(session.has_pending());
//! let mut sink = Sink(Vec::new());
//! session.write_step(&mut sink).unwrap();
//! assert!(!session.has_pending());
//! assert!(!sink.0.is_empty());
//! ```

pub mod config;
pub mod error;
pub mod handler;
pub mod lock;
pub mod transport;

mod framer;
mod negotiate;
mod queue;
mod session;
mod snapshot;

pub use config::{Role, SessionConfig};
pub use error::{Result, SessionError, SnapshotError, TransportError};
pub use handler::PacketHandler;
pub use lock::{MutexLock, NoopLock, SessionLock};
pub use session::Session;
pub use transport::Transport;
