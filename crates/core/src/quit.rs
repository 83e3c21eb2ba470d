//! Quit Handling
//!
//! A quit raised by an external interrupt (e.g. SIGINT) does not go through
//! the queue. It sets a flag that the next poll or wait turns into an
//! [`Event::Quit`](crate::Event::Quit), ahead of anything already queued.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable handle for requesting a quit from outside the event loop.
///
/// [`QuitHandle::interrupt`] is a single atomic store, so it is safe to call
/// from a signal handler.
#[derive(Debug, Clone, Default)]
pub struct QuitHandle {
    pending: Arc<AtomicBool>,
}

impl QuitHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a quit, bypassing type state, filter and queue
    pub fn interrupt(&self) {
        self.pending.store(true, Ordering::SeqCst);
    }

    /// Whether an interrupt quit is waiting to be delivered
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst)
    }

    /// Consume the pending interrupt, if any
    pub(crate) fn take(&self) -> bool {
        self.pending.swap(false, Ordering::SeqCst)
    }

    pub(crate) fn clear(&self) {
        self.pending.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupt_delivered_once() {
        let handle = QuitHandle::new();
        let signal_side = handle.clone();
        assert!(!handle.take());

        signal_side.interrupt();
        signal_side.interrupt();
        assert!(handle.is_pending());
        assert!(handle.take());
        assert!(!handle.take());
    }
}
