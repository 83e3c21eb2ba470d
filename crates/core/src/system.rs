//! Event System
//!
//! The subsystem context object. Owns the queue, type state table, filter
//! slot, input state and registered sources, and exposes the consumer-facing
//! operations (pump, poll, wait, peep, push).
//!
//! `EventSystem` is a cheap cloneable handle; producers and consumers on
//! different threads each hold a clone.

use crate::config::EventConfig;
use crate::error::{EventError, Result};
use crate::event::{ButtonState, Event, EventMask, EventType, KeyMod};
use crate::event_thread::EventThread;
use crate::filter::{EventFilter, FilterSlot};
use crate::input_state::InputState;
use crate::queue::{EventQueue, PeepAction};
use crate::quit::QuitHandle;
use crate::source::{Admission, EventPoster, EventSource};
use crate::state::{default_disabled, StateRequest, TypeState, TypeStateTable};
use parking_lot::{Mutex, MutexGuard};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

type Sources = Vec<Box<dyn EventSource>>;

/// State shared by every handle and the event thread
pub(crate) struct Shared {
    config: EventConfig,
    queue: EventQueue,
    types: TypeStateTable,
    filter: FilterSlot,
    pub(crate) input: Mutex<InputState>,
    quit: QuitHandle,
    sources: Mutex<Sources>,
    /// Thread currently holding `sources` (pumping or a [`PumpLock`])
    sources_holder: Mutex<Option<ThreadId>>,
    /// Shutdown ran on the holder thread; drop sources once it lets go
    clear_sources: AtomicBool,
    /// Set while the event thread owns pumping
    pump_owner: Mutex<Option<ThreadId>>,
}

impl Shared {
    /// Admission: type state, then filter, then queue
    pub(crate) fn admit(&self, event: Event) -> Result<Admission> {
        let ty = event.event_type();

        if !self.types.is_enabled(ty) {
            trace!("Dropped {}: type disabled", ty);
            return Ok(Admission::Disabled);
        }

        // Runs without any lock held; may race with set_event_filter
        if !self.filter.accepts(&event) {
            trace!("Dropped {}: rejected by filter", ty);
            return Ok(Admission::Filtered);
        }

        match self.queue.push(event) {
            Ok(()) => Ok(Admission::Admitted),
            Err(e @ EventError::QueueFull { .. }) => {
                warn!("Lost {}: {}", ty, e);
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    fn pump(&self) {
        if let Some(owner) = *self.pump_owner.lock() {
            if owner != thread::current().id() {
                return;
            }
        }

        // Busy means another pump is running or the event thread is locked
        let Some(mut sources) = self.sources.try_lock() else {
            return;
        };
        *self.sources_holder.lock() = Some(thread::current().id());

        let poster = EventPoster::new(self);
        for source in sources.iter_mut() {
            // A source or filter may have shut the system down mid-pump
            if self.queue.is_shut_down() {
                break;
            }
            source.pump(&poster);
        }

        self.release_sources(&mut sources);
    }

    /// Called by the holder of `sources` just before unlocking
    fn release_sources(&self, sources: &mut Sources) {
        *self.sources_holder.lock() = None;
        if self.clear_sources.swap(false, Ordering::SeqCst) {
            sources.clear();
        }
    }

    /// Drop every source, deferring to the holder if that is this thread
    fn drop_sources(&self) {
        if *self.sources_holder.lock() == Some(thread::current().id()) {
            self.clear_sources.store(true, Ordering::SeqCst);
            return;
        }
        self.sources.lock().clear();
    }
}

/// Guard returned by [`EventSystem::lock_event_thread`]; no pumping happens
/// on any thread while it is alive.
pub struct PumpLock<'a> {
    shared: &'a Shared,
    sources: MutexGuard<'a, Sources>,
}

impl Drop for PumpLock<'_> {
    fn drop(&mut self) {
        self.shared.release_sources(&mut self.sources);
    }
}

/// Handle to the event subsystem
#[derive(Clone)]
pub struct EventSystem {
    shared: Arc<Shared>,
    event_thread: Arc<Mutex<Option<EventThread>>>,
}

impl EventSystem {
    /// Build the subsystem and start the event thread if configured
    pub fn init(config: EventConfig) -> Result<Self> {
        config.validate()?;

        let disabled = default_disabled() | config.disabled_mask()?;
        let shared = Arc::new(Shared {
            queue: EventQueue::new(config.queue_capacity)?,
            types: TypeStateTable::new(disabled),
            filter: FilterSlot::new(),
            input: Mutex::new(InputState::new()),
            quit: QuitHandle::new(),
            sources: Mutex::new(Vec::new()),
            sources_holder: Mutex::new(None),
            clear_sources: AtomicBool::new(false),
            pump_owner: Mutex::new(None),
            config,
        });

        let system = EventSystem {
            shared,
            event_thread: Arc::new(Mutex::new(None)),
        };

        if system.shared.config.event_thread {
            system.start_event_thread()?;
        }

        info!(
            "Event system initialized (capacity {}, event thread: {})",
            system.shared.config.queue_capacity, system.shared.config.event_thread
        );
        Ok(system)
    }

    fn start_event_thread(&self) -> Result<()> {
        let shared = Arc::clone(&self.shared);
        let thread = EventThread::spawn(self.shared.config.pump_interval(), move || shared.pump())?;
        *self.shared.pump_owner.lock() = thread.thread_id();
        *self.event_thread.lock() = Some(thread);
        Ok(())
    }

    pub fn config(&self) -> &EventConfig {
        &self.shared.config
    }

    /// Register a driver; it is pumped after the ones already registered
    pub fn add_source(&self, source: Box<dyn EventSource>) {
        debug!("Registered event source: {}", source.name());
        self.shared.sources.lock().push(source);
    }

    /// Poster for drivers that deliver input outside of a pump (callbacks)
    pub fn poster(&self) -> EventPoster<'_> {
        EventPoster::new(&self.shared)
    }

    /// Let every source translate its pending input into events.
    ///
    /// Does nothing on other threads while the event thread owns pumping,
    /// and nothing if a pump is already in progress.
    pub fn pump_events(&self) {
        self.shared.pump();
    }

    /// Pump, then remove and return the oldest event.
    ///
    /// An interrupt quit is returned ahead of anything queued.
    pub fn poll_event(&self) -> Result<Option<Event>> {
        self.pump_events();
        if self.shared.quit.take() {
            return Ok(Some(Event::Quit));
        }

        let mut events = Vec::with_capacity(1);
        self.shared
            .queue
            .peep(&mut events, 1, PeepAction::Get, EventMask::ALL)?;
        Ok(events.pop())
    }

    /// Pump and report whether an event is pending, without removing it
    pub fn has_pending_events(&self) -> Result<bool> {
        self.pump_events();
        if self.shared.quit.is_pending() {
            return Ok(true);
        }
        let mut events = Vec::with_capacity(1);
        let found = self
            .shared
            .queue
            .peep(&mut events, 1, PeepAction::Peek, EventMask::ALL)?;
        Ok(found > 0)
    }

    /// Block until an event is available and return it.
    ///
    /// Only fails if the subsystem shuts down while waiting.
    pub fn wait_event(&self) -> Result<Event> {
        loop {
            if let Some(event) = self.wait_until(None)? {
                return Ok(event);
            }
        }
    }

    /// Like [`wait_event`](Self::wait_event), giving up after `timeout`
    pub fn wait_event_timeout(&self, timeout: Duration) -> Result<Option<Event>> {
        self.wait_until(Some(Instant::now() + timeout))
    }

    fn wait_until(&self, deadline: Option<Instant>) -> Result<Option<Event>> {
        let interval = self.shared.config.wait_poll_interval();
        loop {
            if let Some(event) = self.poll_event()? {
                return Ok(Some(event));
            }

            // Park on the queue; wake at least once per interval to pump
            // sources and notice interrupt quits
            let park = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(None);
                    }
                    interval.min(deadline - now)
                }
                None => interval,
            };
            self.shared.queue.wait_nonempty(park)?;
        }
    }

    /// Batch add/peek/get on the queue; see [`EventQueue::peep`].
    ///
    /// `Add` bypasses type state and filter.
    pub fn peep_events(
        &self,
        events: &mut Vec<Event>,
        max: usize,
        action: PeepAction,
        mask: EventMask,
    ) -> Result<usize> {
        self.shared.queue.peep(events, max, action, mask)
    }

    /// Submit an event through normal admission.
    ///
    /// `Ok(Admitted)` = queued, `Ok(Disabled | Filtered)` = dropped by policy,
    /// `Err(QueueFull)` = lost because the queue is saturated.
    pub fn push_event(&self, event: Event) -> Result<Admission> {
        self.shared.admit(event)
    }

    /// Install or clear the filter, returning the previous one.
    ///
    /// Posts already past the filter check on other threads are unaffected.
    pub fn set_event_filter(&self, filter: Option<EventFilter>) -> Option<EventFilter> {
        debug!("Event filter {}", if filter.is_some() { "installed" } else { "cleared" });
        self.shared.filter.set(filter)
    }

    pub fn get_event_filter(&self) -> Option<EventFilter> {
        self.shared.filter.get()
    }

    /// Enable, disable or query processing of a raw tag; returns the state
    /// from before the call.
    pub fn event_state(&self, tag: u8, request: StateRequest) -> Result<TypeState> {
        let ty = EventType::new(tag)?;
        Ok(self.set_type_state(ty, request))
    }

    pub fn set_type_state(&self, ty: EventType, request: StateRequest) -> TypeState {
        let previous = self.shared.types.set_state(ty, request);
        if request != StateRequest::Query {
            debug!("{} processing: {:?} -> {:?}", ty, previous, request);
        }
        previous
    }

    /// Handle for raising an interrupt quit (e.g. from a signal handler)
    pub fn quit_handle(&self) -> QuitHandle {
        self.shared.quit.clone()
    }

    /// Post a quit request through normal admission
    pub fn send_quit(&self) -> Result<Admission> {
        self.shared.admit(Event::Quit)
    }

    /// True if an interrupt quit is pending or a quit event is queued
    pub fn quit_requested(&self) -> bool {
        if self.shared.quit.is_pending() {
            return true;
        }
        let mut events = Vec::new();
        matches!(
            self.shared.queue.peep(&mut events, 1, PeepAction::Peek, EventMask::QUIT),
            Ok(n) if n > 0
        )
    }

    pub fn key_state(&self, scancode: u8) -> ButtonState {
        self.shared.input.lock().key_state(scancode)
    }

    pub fn mod_state(&self) -> KeyMod {
        self.shared.input.lock().modifiers()
    }

    pub fn set_mod_state(&self, modifiers: KeyMod) {
        self.shared.input.lock().set_modifiers(modifiers);
    }

    /// (button mask, x, y)
    pub fn mouse_state(&self) -> (u8, i32, i32) {
        self.shared.input.lock().mouse_state()
    }

    /// Number of queued events
    pub fn pending_count(&self) -> usize {
        self.shared.queue.len()
    }

    pub fn event_thread_id(&self) -> Option<ThreadId> {
        *self.shared.pump_owner.lock()
    }

    /// Block pumping (including the event thread) until the guard drops
    pub fn lock_event_thread(&self) -> PumpLock<'_> {
        let sources = self.shared.sources.lock();
        *self.shared.sources_holder.lock() = Some(thread::current().id());
        PumpLock {
            shared: &self.shared,
            sources,
        }
    }

    /// Empty the queue and restore type states, filter, quit flag and
    /// input state to their initial values. Registered sources are kept.
    ///
    /// After [`shutdown`](Self::shutdown) this reopens the queue and restarts
    /// the event thread if configured; sources dropped by the shutdown must
    /// be registered again.
    pub fn reset(&self) -> Result<()> {
        let reopening = self.shared.queue.is_shut_down();
        self.shared.queue.reset();
        self.shared.types.reset();
        self.shared.filter.set(None);
        self.shared.quit.clear();
        self.shared.input.lock().reset();

        if reopening && self.shared.config.event_thread && self.event_thread.lock().is_none() {
            self.start_event_thread()?;
        }
        debug!("Event system reset");
        Ok(())
    }

    /// Stop the event thread, drop sources and release blocked waiters.
    /// Every later queue operation fails with [`EventError::ShutDown`].
    ///
    /// May be called from inside a source's pump or a filter; the sources
    /// are then dropped when that pump returns.
    pub fn shutdown(&self) {
        if self.shared.queue.is_shut_down() {
            return;
        }

        if let Some(mut thread) = self.event_thread.lock().take() {
            thread.stop();
        }
        *self.shared.pump_owner.lock() = None;
        self.shared.drop_sources();

        self.shared.queue.shutdown();
        self.shared.types.reset();
        self.shared.filter.set(None);
        self.shared.quit.clear();
        self.shared.input.lock().reset();
        info!("Event system shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.queue.is_shut_down()
    }
}

impl fmt::Debug for EventSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSystem")
            .field("queue", &self.shared.queue)
            .field("filter", &self.shared.filter)
            .field("event_thread", &self.event_thread_id())
            .finish()
    }
}
