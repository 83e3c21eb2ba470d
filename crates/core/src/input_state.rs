//! Input State Tracker
//!
//! Keyboard and mouse state kept by the driver-facing helpers on
//! [`crate::EventPoster`]. State is updated before the event goes through
//! admission, so it reflects the input even when the event itself is
//! disabled or rejected by the filter.

use crate::event::{ButtonState, KeyMod, Keysym};

/// Bit for a 1-based mouse button index in a button-state mask
pub const fn button_mask(button: u8) -> u8 {
    if button >= 1 && button <= 8 {
        1 << (button - 1)
    } else {
        0
    }
}

pub const BUTTON_LEFT: u8 = 1;
pub const BUTTON_MIDDLE: u8 = 2;
pub const BUTTON_RIGHT: u8 = 3;

/// Current keyboard and mouse state
#[derive(Debug, Clone)]
pub struct InputState {
    keys: [ButtonState; 256],
    modifiers: KeyMod,
    mouse_buttons: u8,
    mouse_x: i32,
    mouse_y: i32,
}

impl InputState {
    pub fn new() -> Self {
        Self {
            keys: [ButtonState::Released; 256],
            modifiers: KeyMod::NONE,
            mouse_buttons: 0,
            mouse_x: 0,
            mouse_y: 0,
        }
    }

    /// Record a key transition.
    ///
    /// Returns the keysym stamped with the resulting modifier state, or
    /// `None` when the key is already in `state` (nothing to report).
    pub fn update_key(&mut self, state: ButtonState, keysym: Keysym) -> Option<Keysym> {
        let slot = &mut self.keys[keysym.scancode as usize];
        if *slot == state {
            return None;
        }
        *slot = state;

        if let Some(modifier) = KeyMod::for_keycode(keysym.sym) {
            let is_lock = modifier == KeyMod::CAPS || modifier == KeyMod::NUM;
            match (is_lock, state) {
                // Lock keys flip on press and ignore the release
                (true, ButtonState::Pressed) => self.modifiers.toggle(modifier),
                (true, ButtonState::Released) => {}
                (false, ButtonState::Pressed) => self.modifiers.insert(modifier),
                (false, ButtonState::Released) => self.modifiers.remove(modifier),
            }
        }

        Some(Keysym {
            modifiers: self.modifiers,
            ..keysym
        })
    }

    /// Move the pointer; returns the relative motion, or `None` if it did not move.
    ///
    /// Relative motion saturates at the `i32` range for jumps between extremes.
    pub fn update_mouse_position(&mut self, x: i32, y: i32) -> Option<(i32, i32)> {
        let delta = (x.saturating_sub(self.mouse_x), y.saturating_sub(self.mouse_y));
        if delta == (0, 0) {
            return None;
        }
        self.mouse_x = x;
        self.mouse_y = y;
        Some(delta)
    }

    /// Record a button transition; returns false if nothing changed
    pub fn update_mouse_button(&mut self, button: u8, state: ButtonState) -> bool {
        let bit = button_mask(button);
        let was_pressed = self.mouse_buttons & bit != 0;
        if bit == 0 || was_pressed == state.is_pressed() {
            return false;
        }
        match state {
            ButtonState::Pressed => self.mouse_buttons |= bit,
            ButtonState::Released => self.mouse_buttons &= !bit,
        }
        true
    }

    pub fn key_state(&self, scancode: u8) -> ButtonState {
        self.keys[scancode as usize]
    }

    pub fn modifiers(&self) -> KeyMod {
        self.modifiers
    }

    pub fn set_modifiers(&mut self, modifiers: KeyMod) {
        self.modifiers = modifiers;
    }

    /// (button mask, x, y)
    pub fn mouse_state(&self) -> (u8, i32, i32) {
        (self.mouse_buttons, self.mouse_x, self.mouse_y)
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}
