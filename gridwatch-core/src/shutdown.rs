//! Process-wide shutdown token.
//!
//! One token is created by the supervisor and shared by reference with the
//! signal handler and any component that needs to observe termination. The
//! handler trips it; the supervisor polls it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable flag signalling graceful shutdown.
#[derive(Clone, Default)]
pub struct ShutdownToken {
    tripped: Arc<AtomicBool>,
}

impl ShutdownToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests shutdown. Safe to call from a signal handler context.
    pub fn trip(&self) {
        self.tripped.store(true, Ordering::SeqCst);
    }

    pub fn is_tripped(&self) -> bool {
        self.tripped.load(Ordering::SeqCst)
    }
}
