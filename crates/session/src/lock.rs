//! Injected locking capability
//!
//! The write queue is the one piece of session state an embedder may touch
//! from a thread other than the one driving the read loop (enqueueing a
//! response while the reader runs). The session takes a lock implementation
//! from the embedder and brackets queue access with it; it never chooses a
//! threading model of its own. Single-threaded embedders pass [`NoopLock`].

use std::sync::Mutex;

/// Scoped lock the session holds around write-queue access.
pub trait SessionLock {
    /// Run `f` with the lock held.
    fn with<R>(&self, f: impl FnOnce() -> R) -> R;
}

/// No-op lock for single-threaded use.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLock;

impl SessionLock for NoopLock {
    fn with<R>(&self, f: impl FnOnce() -> R) -> R {
        f()
    }
}

/// Mutex-backed lock for embedders that enqueue from multiple threads.
#[derive(Debug, Default)]
pub struct MutexLock {
    inner: Mutex<()>,
}

impl MutexLock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionLock for MutexLock {
    fn with<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f()
    }
}
