//! Event Sources
//!
//! The driver-facing side of the subsystem. A platform driver implements
//! [`EventSource`]; each pump hands it an [`EventPoster`], the only way
//! translated input enters the queue.

use crate::error::Result;
use crate::event::{
    ButtonState, Event, KeyboardEvent, Keysym, MouseButtonEvent, MouseMotionEvent, WindowId,
};
use crate::system::Shared;

/// Outcome of a successful admission attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Event was appended to the queue
    Admitted,
    /// Event type is disabled; dropped before the filter ran
    Disabled,
    /// The installed filter rejected the event
    Filtered,
}

impl Admission {
    pub fn is_admitted(self) -> bool {
        self == Admission::Admitted
    }

    /// 1 when queued, 0 when dropped by policy
    pub fn code(self) -> i32 {
        match self {
            Admission::Admitted => 1,
            Admission::Disabled | Admission::Filtered => 0,
        }
    }
}

/// A driver that translates native input into events.
///
/// `pump` is called from [`crate::EventSystem::pump_events`] (or from the
/// event thread) and never concurrently with another pump. It must not call
/// back into `pump_events` itself.
pub trait EventSource: Send {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Translate whatever input is pending and post it
    fn pump(&mut self, poster: &EventPoster<'_>);
}

/// Handle through which drivers submit events
#[derive(Clone, Copy)]
pub struct EventPoster<'a> {
    shared: &'a Shared,
}

impl<'a> EventPoster<'a> {
    pub(crate) fn new(shared: &'a Shared) -> Self {
        Self { shared }
    }

    /// Run `event` through type state, filter and queue
    pub fn post(&self, event: Event) -> Result<Admission> {
        self.shared.admit(event)
    }

    /// Report a key transition.
    ///
    /// Key and modifier state are updated first, even if the event is then
    /// disabled or filtered out. Returns `Ok(None)` when the key was already
    /// in `state`.
    pub fn send_keyboard_key(
        &self,
        which: u8,
        state: ButtonState,
        keysym: Keysym,
        window_id: WindowId,
    ) -> Result<Option<Admission>> {
        let Some(keysym) = self.shared.input.lock().update_key(state, keysym) else {
            return Ok(None);
        };

        let data = KeyboardEvent {
            which,
            state,
            keysym,
            window_id,
        };
        let event = match state {
            ButtonState::Pressed => Event::KeyDown(data),
            ButtonState::Released => Event::KeyUp(data),
        };
        self.post(event).map(Some)
    }

    /// Report an absolute pointer position; relative motion is derived
    /// from the previous one. Returns `Ok(None)` if the pointer did not move.
    pub fn send_mouse_motion(
        &self,
        which: u8,
        x: i32,
        y: i32,
        window_id: WindowId,
    ) -> Result<Option<Admission>> {
        let (buttons, (xrel, yrel)) = {
            let mut input = self.shared.input.lock();
            let Some(delta) = input.update_mouse_position(x, y) else {
                return Ok(None);
            };
            (input.mouse_state().0, delta)
        };

        self.post(Event::MouseMotion(MouseMotionEvent {
            which,
            state: buttons,
            x,
            y,
            xrel,
            yrel,
            window_id,
        }))
        .map(Some)
    }

    /// Report a mouse button transition at the current pointer position.
    /// Returns `Ok(None)` when the button was already in `state`.
    pub fn send_mouse_button(
        &self,
        which: u8,
        button: u8,
        state: ButtonState,
        window_id: WindowId,
    ) -> Result<Option<Admission>> {
        let (x, y) = {
            let mut input = self.shared.input.lock();
            if !input.update_mouse_button(button, state) {
                return Ok(None);
            }
            let (_, x, y) = input.mouse_state();
            (x, y)
        };

        let data = MouseButtonEvent {
            which,
            button,
            state,
            x,
            y,
            window_id,
        };
        let event = match state {
            ButtonState::Pressed => Event::MouseButtonDown(data),
            ButtonState::Released => Event::MouseButtonUp(data),
        };
        self.post(event).map(Some)
    }

    /// Post a quit request through normal admission (e.g. a window close)
    pub fn send_quit(&self) -> Result<Admission> {
        self.post(Event::Quit)
    }
}
