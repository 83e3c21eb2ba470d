//! Event Filter Slot
//!
//! Holds at most one predicate that can veto queue admission.
//!
//! The predicate runs on whichever thread posts the event, after the slot's
//! lock has been released. A filter installed while another thread is in the
//! middle of posting may or may not see that event.

use crate::event::Event;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// Admission predicate: `true` enqueues the event, `false` drops it.
///
/// Must not block indefinitely. Rejecting an event does not undo state the
/// producer already updated before posting it.
pub type EventFilter = Arc<dyn Fn(&Event) -> bool + Send + Sync>;

/// Wrap a closure as an [`EventFilter`]
pub fn filter_fn<F>(f: F) -> EventFilter
where
    F: Fn(&Event) -> bool + Send + Sync + 'static,
{
    Arc::new(f)
}

#[derive(Default)]
pub struct FilterSlot {
    current: RwLock<Option<EventFilter>>,
}

impl FilterSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `filter` (or clear with `None`), returning the previous one
    pub fn set(&self, filter: Option<EventFilter>) -> Option<EventFilter> {
        std::mem::replace(&mut *self.current.write(), filter)
    }

    /// Currently installed filter, for chaining
    pub fn get(&self) -> Option<EventFilter> {
        self.current.read().clone()
    }

    pub fn is_set(&self) -> bool {
        self.current.read().is_some()
    }

    /// Run the installed filter; no filter accepts everything
    pub fn accepts(&self, event: &Event) -> bool {
        // Clone out so the predicate runs without the lock held
        match self.get() {
            Some(filter) => filter(event),
            None => true,
        }
    }
}

impl fmt::Debug for FilterSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterSlot")
            .field("installed", &self.is_set())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventType;

    #[test]
    fn test_empty_slot_accepts() {
        let slot = FilterSlot::new();
        assert!(!slot.is_set());
        assert!(slot.accepts(&Event::Quit));
    }

    #[test]
    fn test_replace_returns_previous() {
        let slot = FilterSlot::new();
        assert!(slot.set(Some(filter_fn(|_| false))).is_none());

        let previous = slot.set(Some(filter_fn(|e| e.event_type() != EventType::QUIT)));
        let previous = previous.expect("first filter should be returned");
        assert!(!previous(&Event::user(1)));

        assert!(!slot.accepts(&Event::Quit));
        assert!(slot.accepts(&Event::user(1)));

        assert!(slot.set(None).is_some());
        assert!(slot.accepts(&Event::Quit));
    }

    #[test]
    fn test_filter_may_reinstall_itself() {
        // The predicate runs outside the lock, so touching the slot is fine
        let slot = Arc::new(FilterSlot::new());
        let inner = Arc::clone(&slot);
        slot.set(Some(filter_fn(move |_| {
            let _ = inner.get();
            true
        })));
        assert!(slot.accepts(&Event::Quit));
    }
}
