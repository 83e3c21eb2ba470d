//! EvPump Core Library
//!
//! Thread-safe input event queue shared between platform drivers and the
//! application's event loop.
//!
//! Architecture:
//! - Drivers implement [`EventSource`] and post through an [`EventPoster`]
//! - Every post passes type state, then the filter, then the bounded queue
//! - The application polls or waits on an [`EventSystem`] handle
//! - An optional background thread pumps sources on its own (event_thread module)

pub mod config;
pub mod error;
pub mod event;
mod event_thread;
pub mod filter;
pub mod input_state;
pub mod queue;
pub mod quit;
pub mod source;
pub mod state;
pub mod system;

pub use config::EventConfig;
pub use error::{EventError, Result};
pub use event::{ButtonState, Event, EventMask, EventType, KeyMod, Keysym};
pub use filter::{filter_fn, EventFilter};
pub use queue::PeepAction;
pub use quit::QuitHandle;
pub use source::{Admission, EventPoster, EventSource};
pub use state::{StateRequest, TypeState};
pub use system::{EventSystem, PumpLock};
