//! Event Queue
//!
//! Bounded FIFO of admitted events, stored in a fixed-capacity ring:
//! - `head` is the oldest live entry, `tail` the next free slot
//! - live entries are `head..head + count` taken modulo capacity
//! - everything (cursors, count, slots) is mutated only under one mutex
//!
//! A full queue rejects new events instead of overwriting old ones.

use crate::error::{EventError, Result};
use crate::event::{Event, EventMask};
use parking_lot::{Condvar, Mutex};
use std::time::Duration;
use tracing::trace;

/// Default number of events the queue can hold
pub const DEFAULT_QUEUE_CAPACITY: usize = 128;

/// Operation performed by [`EventQueue::peep`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeepAction {
    /// Append caller-supplied events at the tail, bypassing admission
    Add,
    /// Copy matching events out without removing them
    Peek,
    /// Remove matching events and return them
    Get,
}

struct Ring {
    slots: Box<[Option<Event>]>,
    head: usize,
    tail: usize,
    count: usize,
    active: bool,
}

impl Ring {
    fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity].into_boxed_slice(),
            head: 0,
            tail: 0,
            count: 0,
            active: true,
        }
    }

    fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn push(&mut self, event: Event) -> bool {
        if self.count == self.capacity() {
            return false;
        }
        self.slots[self.tail] = Some(event);
        self.tail = (self.tail + 1) % self.capacity();
        self.count += 1;
        true
    }

    fn iter(&self) -> impl Iterator<Item = &Event> + '_ {
        let cap = self.capacity();
        (0..self.count).filter_map(move |i| self.slots[(self.head + i) % cap].as_ref())
    }

    fn peek_into(&self, out: &mut Vec<Event>, max: usize, mask: EventMask) -> usize {
        let before = out.len();
        out.extend(self.iter().filter(|event| mask.matches(event)).take(max).copied());
        out.len() - before
    }

    /// Remove up to `max` matching events, then close the gaps so the
    /// survivors stay contiguous and in order, ending at `tail`.
    fn cut_into(&mut self, out: &mut Vec<Event>, max: usize, mask: EventMask) -> usize {
        let cap = self.capacity();
        let mut taken = 0;

        for i in 0..self.count {
            if taken == max {
                break;
            }
            let idx = (self.head + i) % cap;
            if self.slots[idx].as_ref().is_some_and(|event| mask.matches(event)) {
                if let Some(event) = self.slots[idx].take() {
                    out.push(event);
                    taken += 1;
                }
            }
        }
        if taken == 0 {
            return 0;
        }

        // Slide survivors toward the tail; removing from the front then only
        // moves the head. `write` never falls behind `read`.
        let mut write = self.count;
        for read in (0..self.count).rev() {
            let src = (self.head + read) % cap;
            if let Some(event) = self.slots[src].take() {
                write -= 1;
                self.slots[(self.head + write) % cap] = Some(event);
            }
        }

        self.head = (self.head + write) % cap;
        self.count -= taken;
        taken
    }

    fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.head = 0;
        self.tail = 0;
        self.count = 0;
    }
}

/// Thread-safe bounded event queue
pub struct EventQueue {
    ring: Mutex<Ring>,
    /// Signalled whenever events are appended or the queue shuts down
    available: Condvar,
}

impl EventQueue {
    /// Create an empty queue holding at most `capacity` events
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(EventError::InvalidConfig(
                "queue capacity must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            ring: Mutex::new(Ring::new(capacity)),
            available: Condvar::new(),
        })
    }

    /// Append one event (the tail end of admission)
    pub fn push(&self, event: Event) -> Result<()> {
        let mut ring = self.ring.lock();
        if !ring.active {
            return Err(EventError::ShutDown);
        }
        if !ring.push(event) {
            return Err(EventError::QueueFull {
                capacity: ring.capacity(),
            });
        }
        trace!("Queued {} ({} pending)", event.event_type(), ring.count);
        drop(ring);
        self.available.notify_all();
        Ok(())
    }

    /// Batch primitive behind poll, wait and push.
    ///
    /// - `Add` appends up to `max` events from the front of `events`, as many
    ///   as fit; a full queue adds 0.
    /// - `Peek` appends up to `max` matching events to `events`, oldest first.
    /// - `Get` does the same as `Peek` and also removes them from the queue.
    ///
    /// Returns the number of events transferred.
    pub fn peep(
        &self,
        events: &mut Vec<Event>,
        max: usize,
        action: PeepAction,
        mask: EventMask,
    ) -> Result<usize> {
        let mut ring = self.ring.lock();
        if !ring.active {
            return Err(EventError::ShutDown);
        }

        match action {
            PeepAction::Add => {
                let mut added = 0;
                for event in events.iter().take(max) {
                    if !ring.push(*event) {
                        break;
                    }
                    added += 1;
                }
                drop(ring);
                if added > 0 {
                    self.available.notify_all();
                }
                Ok(added)
            }
            PeepAction::Peek => Ok(ring.peek_into(events, max, mask)),
            PeepAction::Get => Ok(ring.cut_into(events, max, mask)),
        }
    }

    /// Append events directly, bypassing admission
    pub fn add(&self, events: &[Event]) -> Result<usize> {
        let mut buffer = events.to_vec();
        self.peep(&mut buffer, events.len(), PeepAction::Add, EventMask::ALL)
    }

    /// Up to `max` matching events, oldest first, left in the queue
    pub fn peek(&self, max: usize, mask: EventMask) -> Result<Vec<Event>> {
        let mut out = Vec::new();
        self.peep(&mut out, max, PeepAction::Peek, mask)?;
        Ok(out)
    }

    /// Up to `max` matching events, oldest first, removed from the queue
    pub fn get(&self, max: usize, mask: EventMask) -> Result<Vec<Event>> {
        let mut out = Vec::new();
        self.peep(&mut out, max, PeepAction::Get, mask)?;
        Ok(out)
    }

    /// Park until the queue holds an event, `timeout` passes or the queue
    /// shuts down. Returns whether events are available.
    pub fn wait_nonempty(&self, timeout: Duration) -> Result<bool> {
        let mut ring = self.ring.lock();
        if ring.active && ring.count == 0 {
            self.available.wait_for(&mut ring, timeout);
        }
        if !ring.active {
            return Err(EventError::ShutDown);
        }
        Ok(ring.count > 0)
    }

    pub fn len(&self) -> usize {
        self.ring.lock().count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.ring.lock().capacity()
    }

    /// Drop every pending event
    pub fn clear(&self) {
        self.ring.lock().clear();
    }

    /// Empty the queue and reopen it after a shutdown
    pub fn reset(&self) {
        let mut ring = self.ring.lock();
        ring.clear();
        ring.active = true;
    }

    /// Empty the queue, refuse further operations and release all waiters
    pub fn shutdown(&self) {
        {
            let mut ring = self.ring.lock();
            ring.clear();
            ring.active = false;
        }
        self.available.notify_all();
    }

    pub fn is_shut_down(&self) -> bool {
        !self.ring.lock().active
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self {
            ring: Mutex::new(Ring::new(DEFAULT_QUEUE_CAPACITY)),
            available: Condvar::new(),
        }
    }
}

impl std::fmt::Debug for EventQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ring = self.ring.lock();
        f.debug_struct("EventQueue")
            .field("len", &ring.count)
            .field("capacity", &ring.capacity())
            .field("active", &ring.active)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{ButtonState, EventType, Keysym};
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    fn key(sym: u32) -> Event {
        Event::key(ButtonState::Pressed, Keysym::new(0, sym), 0)
    }

    fn codes(events: &[Event]) -> Vec<i32> {
        events
            .iter()
            .map(|e| match e {
                Event::User(u) => u.code,
                _ => -1,
            })
            .collect()
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(matches!(EventQueue::new(0), Err(EventError::InvalidConfig(_))));
    }

    #[test]
    fn test_fifo_order() {
        let queue = EventQueue::new(8).unwrap();
        for code in 0..5 {
            queue.push(Event::user(code)).unwrap();
        }
        let events = queue.get(10, EventMask::ALL).unwrap();
        assert_eq!(codes(&events), vec![0, 1, 2, 3, 4]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_capacity_boundary() {
        let queue = EventQueue::new(4).unwrap();
        let mut failures = 0;
        for code in 0..5 {
            if let Err(EventError::QueueFull { capacity }) = queue.push(Event::user(code)) {
                assert_eq!(capacity, 4);
                failures += 1;
            }
        }
        assert_eq!(failures, 1);
        assert_eq!(queue.len(), 4);
        // Oldest data is kept, not overwritten
        assert_eq!(codes(&queue.peek(4, EventMask::ALL).unwrap()), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_peek_is_idempotent() {
        let queue = EventQueue::new(8).unwrap();
        queue.push(Event::Quit).unwrap();
        queue.push(Event::user(1)).unwrap();

        let first = queue.peek(8, EventMask::ALL).unwrap();
        let second = queue.peek(8, EventMask::ALL).unwrap();
        assert_eq!(first, second);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_get_with_mask_leaves_others_in_place() {
        let queue = EventQueue::new(8).unwrap();
        queue.push(Event::user(1)).unwrap();
        queue.push(key('a' as u32)).unwrap();
        queue.push(Event::user(2)).unwrap();
        queue.push(key('b' as u32)).unwrap();
        queue.push(Event::Quit).unwrap();

        let keys = queue.get(8, EventMask::KEY_EVENTS).unwrap();
        assert_eq!(keys, vec![key('a' as u32), key('b' as u32)]);

        let rest = queue.peek(8, EventMask::ALL).unwrap();
        assert_eq!(rest, vec![Event::user(1), Event::user(2), Event::Quit]);
    }

    #[test]
    fn test_get_respects_max() {
        let queue = EventQueue::new(8).unwrap();
        for code in 0..4 {
            queue.push(Event::user(code)).unwrap();
        }
        assert_eq!(codes(&queue.get(2, EventMask::ALL).unwrap()), vec![0, 1]);
        assert_eq!(codes(&queue.get(2, EventMask::ALL).unwrap()), vec![2, 3]);
    }

    #[test]
    fn test_compaction_across_wraparound() {
        let queue = EventQueue::new(4).unwrap();
        // Move the head to the middle of the ring so live entries wrap
        queue.push(Event::user(100)).unwrap();
        queue.push(Event::user(101)).unwrap();
        queue.push(Event::user(102)).unwrap();
        queue.get(3, EventMask::ALL).unwrap();

        queue.push(Event::user(0)).unwrap();
        queue.push(Event::Quit).unwrap();
        queue.push(Event::user(1)).unwrap();
        queue.push(Event::Quit).unwrap();

        // Live entries now sit in slots 3, 0, 1, 2
        let quits = queue.get(4, EventMask::QUIT).unwrap();
        assert_eq!(quits.len(), 2);
        assert_eq!(queue.len(), 2);

        // Freed slots are reusable and order is intact
        queue.push(Event::user(2)).unwrap();
        queue.push(Event::user(3)).unwrap();
        assert!(queue.push(Event::user(4)).is_err());
        assert_eq!(codes(&queue.get(4, EventMask::ALL).unwrap()), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_add_bounded_by_space() {
        let queue = EventQueue::new(3).unwrap();
        queue.push(Event::Quit).unwrap();

        let mut batch = vec![Event::user(1), Event::user(2), Event::user(3)];
        let added = queue.peep(&mut batch, 3, PeepAction::Add, EventMask::ALL).unwrap();
        assert_eq!(added, 2);
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.add(&[Event::user(9)]).unwrap(), 0);
    }

    #[test]
    fn test_peek_appends_to_buffer() {
        let queue = EventQueue::new(4).unwrap();
        queue.push(Event::user(5)).unwrap();
        let mut out = vec![Event::Quit];
        let n = queue.peep(&mut out, 4, PeepAction::Peek, EventMask::ALL).unwrap();
        assert_eq!(n, 1);
        assert_eq!(out, vec![Event::Quit, Event::user(5)]);
    }

    #[test]
    fn test_shutdown_and_reset() {
        let queue = EventQueue::new(4).unwrap();
        queue.push(Event::Quit).unwrap();
        queue.shutdown();

        assert!(matches!(queue.push(Event::Quit), Err(EventError::ShutDown)));
        assert!(matches!(queue.get(1, EventMask::ALL), Err(EventError::ShutDown)));
        assert!(matches!(
            queue.wait_nonempty(Duration::from_millis(1)),
            Err(EventError::ShutDown)
        ));

        queue.reset();
        assert!(queue.is_empty());
        assert!(queue.push(Event::Quit).is_ok());
    }

    #[test]
    fn test_wait_wakes_on_push() {
        let queue = Arc::new(EventQueue::new(4).unwrap());
        let producer = Arc::clone(&queue);

        let start = Instant::now();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            producer.push(Event::user(7)).unwrap();
        });

        let mut ready = false;
        while !ready && start.elapsed() < Duration::from_secs(5) {
            ready = queue.wait_nonempty(Duration::from_secs(1)).unwrap();
        }
        handle.join().unwrap();
        assert!(ready);
        assert_eq!(queue.get(1, EventMask::ALL).unwrap(), vec![Event::user(7)]);
    }

    #[test]
    fn test_wait_released_by_shutdown() {
        let queue = Arc::new(EventQueue::new(4).unwrap());
        let closer = Arc::clone(&queue);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            closer.shutdown();
        });

        let result = queue.wait_nonempty(Duration::from_secs(5));
        handle.join().unwrap();
        assert!(matches!(result, Err(EventError::ShutDown)));
    }

    #[test]
    fn test_mask_subsets() {
        let queue = EventQueue::new(16).unwrap();
        let all = [
            Event::user(1),
            key('x' as u32),
            Event::Quit,
            Event::user(2),
            Event::Quit,
        ];
        queue.add(&all).unwrap();

        let masks = [
            EventMask::NONE,
            EventMask::QUIT,
            EventMask::of(EventType::USER),
            EventMask::QUIT | EventMask::KEY_DOWN,
            EventMask::ALL,
        ];
        for mask in masks {
            let expected: Vec<Event> = all.iter().copied().filter(|e| mask.matches(e)).collect();
            assert_eq!(queue.peek(16, mask).unwrap(), expected);
        }
        assert_eq!(queue.len(), all.len());
    }
}
