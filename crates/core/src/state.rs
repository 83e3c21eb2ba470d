//! Type State Table
//!
//! Per-type enable/disable state. A disabled type is dropped at admission,
//! before the filter is consulted. The table is a single atomic bitset, so
//! every update and its "previous state" result are one atomic operation.

use crate::event::{EventMask, EventType};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};

/// What to do with a type's processing state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateRequest {
    Enable,
    Disable,
    /// Read without changing anything
    Query,
}

/// Processing state of a type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeState {
    Enabled,
    Disabled,
}

impl TypeState {
    pub fn is_enabled(self) -> bool {
        self == TypeState::Enabled
    }
}

/// Tags that start out disabled: the reserved ones plus platform messages
pub fn default_disabled() -> EventMask {
    (0..EventType::NUM_EVENTS as u8)
        .filter_map(|tag| EventType::new(tag).ok())
        .filter(|ty| ty.is_reserved())
        .collect::<EventMask>()
        | EventMask::SYS_WM
}

/// Enabled-bit per event type
#[derive(Debug)]
pub struct TypeStateTable {
    enabled: AtomicU32,
    defaults: u32,
}

impl TypeStateTable {
    /// New table with every type enabled except `disabled`
    pub fn new(disabled: EventMask) -> Self {
        let defaults = !disabled.bits();
        Self {
            enabled: AtomicU32::new(defaults),
            defaults,
        }
    }

    /// Apply `request` to `ty` and return the state from before the call
    pub fn set_state(&self, ty: EventType, request: StateRequest) -> TypeState {
        let bit = EventMask::of(ty).bits();
        let previous = match request {
            StateRequest::Enable => self.enabled.fetch_or(bit, Ordering::AcqRel),
            StateRequest::Disable => self.enabled.fetch_and(!bit, Ordering::AcqRel),
            StateRequest::Query => self.enabled.load(Ordering::Acquire),
        };
        Self::state_of(previous, bit)
    }

    pub fn state(&self, ty: EventType) -> TypeState {
        self.set_state(ty, StateRequest::Query)
    }

    pub fn is_enabled(&self, ty: EventType) -> bool {
        self.state(ty).is_enabled()
    }

    /// Mask of every currently enabled type
    pub fn enabled_mask(&self) -> EventMask {
        EventMask::from_bits(self.enabled.load(Ordering::Acquire))
    }

    /// Restore the states the table was created with
    pub fn reset(&self) {
        self.enabled.store(self.defaults, Ordering::Release);
    }

    fn state_of(bits: u32, bit: u32) -> TypeState {
        if bits & bit != 0 {
            TypeState::Enabled
        } else {
            TypeState::Disabled
        }
    }
}

impl Default for TypeStateTable {
    fn default() -> Self {
        Self::new(default_disabled())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let table = TypeStateTable::default();
        assert!(table.is_enabled(EventType::KEY_DOWN));
        assert!(table.is_enabled(EventType::QUIT));
        assert!(table.is_enabled(EventType::USER));
        assert!(!table.is_enabled(EventType::NOEVENT));
        assert!(!table.is_enabled(EventType::RESERVED2));
        assert!(!table.is_enabled(EventType::SYS_WM));
    }

    #[test]
    fn test_set_state_returns_previous() {
        let table = TypeStateTable::default();
        let ty = EventType::MOUSE_MOTION;

        assert_eq!(table.set_state(ty, StateRequest::Disable), TypeState::Enabled);
        assert_eq!(table.set_state(ty, StateRequest::Query), TypeState::Disabled);
        assert_eq!(table.set_state(ty, StateRequest::Disable), TypeState::Disabled);
        assert_eq!(table.set_state(ty, StateRequest::Enable), TypeState::Disabled);
        assert_eq!(table.set_state(ty, StateRequest::Query), TypeState::Enabled);
    }

    #[test]
    fn test_query_does_not_mutate() {
        let table = TypeStateTable::default();
        let before = table.enabled_mask();
        table.set_state(EventType::JOY_HAT_MOTION, StateRequest::Query);
        assert_eq!(table.enabled_mask(), before);
    }

    #[test]
    fn test_reset() {
        let table = TypeStateTable::default();
        table.set_state(EventType::KEY_UP, StateRequest::Disable);
        table.set_state(EventType::SYS_WM, StateRequest::Enable);
        table.reset();
        assert!(table.is_enabled(EventType::KEY_UP));
        assert!(!table.is_enabled(EventType::SYS_WM));
    }
}
