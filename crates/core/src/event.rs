//! Event Record Types
//!
//! Defines the tagged records carried by the event queue:
//! - EventType: the validated type tag shared by every record
//! - EventMask: bitset over tags used by peek/get matching
//! - Event: the sum type over all event kinds, with one payload struct per kind
//!
//! The queue only ever looks at [`Event::event_type`]; payloads are opaque to it.

use crate::error::{EventError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Identifier of the window an event belongs to (0 = none)
pub type WindowId = u32;

/// Event type tag
///
/// Tags live in `0..NUM_EVENTS` so that a set of them fits in a `u32` mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct EventType(u8);

impl EventType {
    /// Unused, never admitted
    pub const NOEVENT: EventType = EventType(0);
    pub const WINDOW: EventType = EventType(1);
    pub const KEY_DOWN: EventType = EventType(2);
    pub const KEY_UP: EventType = EventType(3);
    pub const MOUSE_MOTION: EventType = EventType(4);
    pub const MOUSE_BUTTON_DOWN: EventType = EventType(5);
    pub const MOUSE_BUTTON_UP: EventType = EventType(6);
    pub const JOY_AXIS_MOTION: EventType = EventType(7);
    pub const JOY_BALL_MOTION: EventType = EventType(8);
    pub const JOY_HAT_MOTION: EventType = EventType(9);
    pub const JOY_BUTTON_DOWN: EventType = EventType(10);
    pub const JOY_BUTTON_UP: EventType = EventType(11);
    pub const QUIT: EventType = EventType(12);
    pub const SYS_WM: EventType = EventType(13);
    pub const RESERVED1: EventType = EventType(14);
    pub const RESERVED2: EventType = EventType(15);
    pub const RESERVED3: EventType = EventType(16);
    /// First application-defined tag; `USER..NUM_EVENTS` are free for applications
    pub const USER: EventType = EventType(24);

    /// Number of distinct tags (bits in the mask word)
    pub const NUM_EVENTS: usize = 32;

    /// Validate a raw tag
    pub fn new(tag: u8) -> Result<Self> {
        if (tag as usize) < Self::NUM_EVENTS {
            Ok(EventType(tag))
        } else {
            Err(EventError::InvalidType(tag))
        }
    }

    /// The `offset`-th application-defined tag
    pub fn user(offset: u8) -> Result<Self> {
        let tag = Self::USER
            .0
            .checked_add(offset)
            .ok_or(EventError::InvalidType(u8::MAX))?;
        Self::new(tag)
    }

    /// Raw tag value
    pub const fn tag(self) -> u8 {
        self.0
    }

    /// Whether this tag is in the application-defined range
    pub const fn is_user(self) -> bool {
        self.0 >= Self::USER.0
    }

    /// Tags reserved for internal use; these start out disabled
    pub const fn is_reserved(self) -> bool {
        matches!(self.0, 0 | 14..=16)
    }

    /// Human-readable name for logs
    pub fn name(self) -> &'static str {
        match self.0 {
            0 => "NoEvent",
            1 => "Window",
            2 => "KeyDown",
            3 => "KeyUp",
            4 => "MouseMotion",
            5 => "MouseButtonDown",
            6 => "MouseButtonUp",
            7 => "JoyAxisMotion",
            8 => "JoyBallMotion",
            9 => "JoyHatMotion",
            10 => "JoyButtonDown",
            11 => "JoyButtonUp",
            12 => "Quit",
            13 => "SysWm",
            14..=16 => "Reserved",
            24..=31 => "User",
            _ => "Unassigned",
        }
    }
}

impl TryFrom<u8> for EventType {
    type Error = EventError;

    fn try_from(tag: u8) -> Result<Self> {
        EventType::new(tag)
    }
}

impl From<EventType> for u8 {
    fn from(ty: EventType) -> u8 {
        ty.0
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.0)
    }
}

/// Bitset over event type tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EventMask(u32);

impl EventMask {
    pub const NONE: EventMask = EventMask(0);
    /// Matches every tag
    pub const ALL: EventMask = EventMask(u32::MAX);

    pub const WINDOW: EventMask = EventMask::of(EventType::WINDOW);
    pub const KEY_DOWN: EventMask = EventMask::of(EventType::KEY_DOWN);
    pub const KEY_UP: EventMask = EventMask::of(EventType::KEY_UP);
    pub const KEY_EVENTS: EventMask = EventMask(Self::KEY_DOWN.0 | Self::KEY_UP.0);
    pub const MOUSE_MOTION: EventMask = EventMask::of(EventType::MOUSE_MOTION);
    pub const MOUSE_BUTTON_DOWN: EventMask = EventMask::of(EventType::MOUSE_BUTTON_DOWN);
    pub const MOUSE_BUTTON_UP: EventMask = EventMask::of(EventType::MOUSE_BUTTON_UP);
    pub const MOUSE_EVENTS: EventMask =
        EventMask(Self::MOUSE_MOTION.0 | Self::MOUSE_BUTTON_DOWN.0 | Self::MOUSE_BUTTON_UP.0);
    pub const JOY_AXIS_MOTION: EventMask = EventMask::of(EventType::JOY_AXIS_MOTION);
    pub const JOY_BALL_MOTION: EventMask = EventMask::of(EventType::JOY_BALL_MOTION);
    pub const JOY_HAT_MOTION: EventMask = EventMask::of(EventType::JOY_HAT_MOTION);
    pub const JOY_BUTTON_DOWN: EventMask = EventMask::of(EventType::JOY_BUTTON_DOWN);
    pub const JOY_BUTTON_UP: EventMask = EventMask::of(EventType::JOY_BUTTON_UP);
    pub const JOY_EVENTS: EventMask = EventMask(
        Self::JOY_AXIS_MOTION.0
            | Self::JOY_BALL_MOTION.0
            | Self::JOY_HAT_MOTION.0
            | Self::JOY_BUTTON_DOWN.0
            | Self::JOY_BUTTON_UP.0,
    );
    pub const QUIT: EventMask = EventMask::of(EventType::QUIT);
    pub const SYS_WM: EventMask = EventMask::of(EventType::SYS_WM);

    /// Mask selecting a single tag
    pub const fn of(ty: EventType) -> Self {
        EventMask(1u32 << ty.0)
    }

    pub const fn from_bits(bits: u32) -> Self {
        EventMask(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, ty: EventType) -> bool {
        self.0 & (1u32 << ty.0) != 0
    }

    /// Whether the event's tag is selected; payload is never inspected
    pub fn matches(self, event: &Event) -> bool {
        self.contains(event.event_type())
    }
}

impl BitOr for EventMask {
    type Output = EventMask;

    fn bitor(self, rhs: EventMask) -> EventMask {
        EventMask(self.0 | rhs.0)
    }
}

impl BitOrAssign for EventMask {
    fn bitor_assign(&mut self, rhs: EventMask) {
        self.0 |= rhs.0;
    }
}

impl From<EventType> for EventMask {
    fn from(ty: EventType) -> Self {
        EventMask::of(ty)
    }
}

impl FromIterator<EventType> for EventMask {
    fn from_iter<I: IntoIterator<Item = EventType>>(iter: I) -> Self {
        iter.into_iter()
            .fold(EventMask::NONE, |mask, ty| mask | EventMask::of(ty))
    }
}

/// Pressed / released state for keys and buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum ButtonState {
    #[default]
    Released = 0,
    Pressed = 1,
}

impl ButtonState {
    pub fn is_pressed(self) -> bool {
        self == ButtonState::Pressed
    }
}

impl From<bool> for ButtonState {
    fn from(pressed: bool) -> Self {
        if pressed {
            ButtonState::Pressed
        } else {
            ButtonState::Released
        }
    }
}

/// Modifier key bitmask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct KeyMod(u16);

impl KeyMod {
    pub const NONE: KeyMod = KeyMod(0x0000);
    pub const LSHIFT: KeyMod = KeyMod(0x0001);
    pub const RSHIFT: KeyMod = KeyMod(0x0002);
    pub const LCTRL: KeyMod = KeyMod(0x0040);
    pub const RCTRL: KeyMod = KeyMod(0x0080);
    pub const LALT: KeyMod = KeyMod(0x0100);
    pub const RALT: KeyMod = KeyMod(0x0200);
    pub const LGUI: KeyMod = KeyMod(0x0400);
    pub const RGUI: KeyMod = KeyMod(0x0800);
    pub const NUM: KeyMod = KeyMod(0x1000);
    pub const CAPS: KeyMod = KeyMod(0x2000);
    pub const MODE: KeyMod = KeyMod(0x4000);

    pub const SHIFT: KeyMod = KeyMod(Self::LSHIFT.0 | Self::RSHIFT.0);
    pub const CTRL: KeyMod = KeyMod(Self::LCTRL.0 | Self::RCTRL.0);
    pub const ALT: KeyMod = KeyMod(Self::LALT.0 | Self::RALT.0);
    pub const GUI: KeyMod = KeyMod(Self::LGUI.0 | Self::RGUI.0);

    pub const fn from_bits(bits: u16) -> Self {
        KeyMod(bits)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    /// True if any of the bits in `other` are set
    pub const fn intersects(self, other: KeyMod) -> bool {
        self.0 & other.0 != 0
    }

    pub fn insert(&mut self, other: KeyMod) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: KeyMod) {
        self.0 &= !other.0;
    }

    pub fn toggle(&mut self, other: KeyMod) {
        self.0 ^= other.0;
    }

    /// Modifier bit driven by a key symbol, if the key is a modifier
    pub fn for_keycode(sym: u32) -> Option<KeyMod> {
        match sym {
            keycode::NUMLOCK => Some(KeyMod::NUM),
            keycode::CAPSLOCK => Some(KeyMod::CAPS),
            keycode::LSHIFT => Some(KeyMod::LSHIFT),
            keycode::RSHIFT => Some(KeyMod::RSHIFT),
            keycode::LCTRL => Some(KeyMod::LCTRL),
            keycode::RCTRL => Some(KeyMod::RCTRL),
            keycode::LALT => Some(KeyMod::LALT),
            keycode::RALT => Some(KeyMod::RALT),
            keycode::LGUI => Some(KeyMod::LGUI),
            keycode::RGUI => Some(KeyMod::RGUI),
            keycode::MODE => Some(KeyMod::MODE),
            _ => None,
        }
    }
}

impl BitOr for KeyMod {
    type Output = KeyMod;

    fn bitor(self, rhs: KeyMod) -> KeyMod {
        KeyMod(self.0 | rhs.0)
    }
}

/// Translated key symbols used by the input state tracker.
///
/// Printable keys use their ASCII value (`'a' as u32`, ...).
pub mod keycode {
    pub const BACKSPACE: u32 = 8;
    pub const TAB: u32 = 9;
    pub const RETURN: u32 = 13;
    pub const ESCAPE: u32 = 27;
    pub const SPACE: u32 = 32;
    pub const DELETE: u32 = 127;
    pub const UP: u32 = 273;
    pub const DOWN: u32 = 274;
    pub const RIGHT: u32 = 275;
    pub const LEFT: u32 = 276;
    pub const F1: u32 = 282;
    pub const NUMLOCK: u32 = 300;
    pub const CAPSLOCK: u32 = 301;
    pub const SCROLLLOCK: u32 = 302;
    pub const RSHIFT: u32 = 303;
    pub const LSHIFT: u32 = 304;
    pub const RCTRL: u32 = 305;
    pub const LCTRL: u32 = 306;
    pub const RALT: u32 = 307;
    pub const LALT: u32 = 308;
    pub const LGUI: u32 = 311;
    pub const RGUI: u32 = 312;
    pub const MODE: u32 = 313;
}

/// The key that was pressed or released
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Keysym {
    /// Hardware scan code
    pub scancode: u8,
    /// Translated key symbol (see [`keycode`])
    pub sym: u32,
    /// Modifier state at the time of the event
    pub modifiers: KeyMod,
}

impl Keysym {
    pub fn new(scancode: u8, sym: u32) -> Self {
        Self {
            scancode,
            sym,
            modifiers: KeyMod::NONE,
        }
    }
}

/// Joystick hat position, an 8-way compass plus centered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct HatPosition(u8);

impl HatPosition {
    pub const CENTERED: HatPosition = HatPosition(0x00);
    pub const UP: HatPosition = HatPosition(0x01);
    pub const RIGHT: HatPosition = HatPosition(0x02);
    pub const DOWN: HatPosition = HatPosition(0x04);
    pub const LEFT: HatPosition = HatPosition(0x08);
    pub const RIGHT_UP: HatPosition = HatPosition(0x02 | 0x01);
    pub const RIGHT_DOWN: HatPosition = HatPosition(0x02 | 0x04);
    pub const LEFT_UP: HatPosition = HatPosition(0x08 | 0x01);
    pub const LEFT_DOWN: HatPosition = HatPosition(0x08 | 0x04);

    /// Accepts only the nine valid encodings
    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0x00 | 0x01 | 0x02 | 0x04 | 0x08 | 0x03 | 0x06 | 0x09 | 0x0c => {
                Some(HatPosition(bits))
            }
            _ => None,
        }
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub fn is_centered(self) -> bool {
        self.0 == 0
    }
}

/// Opaque, caller-owned word carried by user and system events.
///
/// The queue copies it around but never dereferences or frees it; whatever
/// it points to is entirely the application's responsibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct OpaqueData(usize);

impl OpaqueData {
    pub const NULL: OpaqueData = OpaqueData(0);

    pub const fn from_raw(value: usize) -> Self {
        OpaqueData(value)
    }

    pub fn from_ptr<T>(ptr: *const T) -> Self {
        OpaqueData(ptr as usize)
    }

    pub const fn raw(self) -> usize {
        self.0
    }

    pub fn as_ptr<T>(self) -> *const T {
        self.0 as *const T
    }

    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// Window state change sub-event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum WindowEventId {
    #[default]
    None = 0,
    Shown,
    Hidden,
    Exposed,
    Moved,
    Resized,
    Minimized,
    Maximized,
    Restored,
    Enter,
    Leave,
    FocusGained,
    FocusLost,
    Close,
}

/// Window state change event data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowEvent {
    pub event: WindowEventId,
    /// Event dependent data
    pub data1: i32,
    /// Event dependent data
    pub data2: i32,
    pub window_id: WindowId,
}

/// Keyboard event data (KEY_DOWN / KEY_UP)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyboardEvent {
    /// Keyboard device index
    pub which: u8,
    pub state: ButtonState,
    pub keysym: Keysym,
    /// Window with keyboard focus, if any
    pub window_id: WindowId,
}

/// Mouse motion event data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MouseMotionEvent {
    /// Mouse device index
    pub which: u8,
    /// Current button state bitmask
    pub state: u8,
    pub x: i32,
    pub y: i32,
    pub xrel: i32,
    pub yrel: i32,
    pub window_id: WindowId,
}

/// Mouse button event data (MOUSE_BUTTON_DOWN / MOUSE_BUTTON_UP)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MouseButtonEvent {
    pub which: u8,
    /// Button index, 1-based (1 = left, 2 = middle, 3 = right)
    pub button: u8,
    pub state: ButtonState,
    pub x: i32,
    pub y: i32,
    pub window_id: WindowId,
}

/// Joystick axis motion; values span the full `i16` range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JoyAxisEvent {
    pub which: u8,
    pub axis: u8,
    pub value: i16,
}

/// Joystick trackball motion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JoyBallEvent {
    pub which: u8,
    pub ball: u8,
    pub xrel: i32,
    pub yrel: i32,
}

/// Joystick hat position change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JoyHatEvent {
    pub which: u8,
    pub hat: u8,
    pub value: HatPosition,
}

/// Joystick button event data (JOY_BUTTON_DOWN / JOY_BUTTON_UP)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JoyButtonEvent {
    pub which: u8,
    pub button: u8,
    pub state: ButtonState,
}

/// Platform-specific message; `msg` points at driver-private data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SysWmEvent {
    pub msg: OpaqueData,
}

/// Application-defined event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserEvent {
    ty: EventType,
    /// Application-chosen code
    pub code: i32,
    pub data1: OpaqueData,
    pub data2: OpaqueData,
}

impl UserEvent {
    /// Build a user event; `ty` must be in the application-defined range
    pub fn new(ty: EventType, code: i32, data1: OpaqueData, data2: OpaqueData) -> Result<Self> {
        if !ty.is_user() {
            return Err(EventError::InvalidType(ty.tag()));
        }
        Ok(Self {
            ty,
            code,
            data1,
            data2,
        })
    }

    pub fn event_type(&self) -> EventType {
        self.ty
    }
}

/// One occurrence placed into the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Window(WindowEvent),
    KeyDown(KeyboardEvent),
    KeyUp(KeyboardEvent),
    MouseMotion(MouseMotionEvent),
    MouseButtonDown(MouseButtonEvent),
    MouseButtonUp(MouseButtonEvent),
    JoyAxisMotion(JoyAxisEvent),
    JoyBallMotion(JoyBallEvent),
    JoyHatMotion(JoyHatEvent),
    JoyButtonDown(JoyButtonEvent),
    JoyButtonUp(JoyButtonEvent),
    /// Request to terminate
    Quit,
    SysWm(SysWmEvent),
    User(UserEvent),
}

impl Event {
    /// The type tag, readable without knowing the variant's payload
    pub fn event_type(&self) -> EventType {
        match self {
            Event::Window(_) => EventType::WINDOW,
            Event::KeyDown(_) => EventType::KEY_DOWN,
            Event::KeyUp(_) => EventType::KEY_UP,
            Event::MouseMotion(_) => EventType::MOUSE_MOTION,
            Event::MouseButtonDown(_) => EventType::MOUSE_BUTTON_DOWN,
            Event::MouseButtonUp(_) => EventType::MOUSE_BUTTON_UP,
            Event::JoyAxisMotion(_) => EventType::JOY_AXIS_MOTION,
            Event::JoyBallMotion(_) => EventType::JOY_BALL_MOTION,
            Event::JoyHatMotion(_) => EventType::JOY_HAT_MOTION,
            Event::JoyButtonDown(_) => EventType::JOY_BUTTON_DOWN,
            Event::JoyButtonUp(_) => EventType::JOY_BUTTON_UP,
            Event::Quit => EventType::QUIT,
            Event::SysWm(_) => EventType::SYS_WM,
            Event::User(user) => user.event_type(),
        }
    }

    /// User event on the first application-defined tag
    pub fn user(code: i32) -> Event {
        Event::User(UserEvent {
            ty: EventType::USER,
            code,
            data1: OpaqueData::NULL,
            data2: OpaqueData::NULL,
        })
    }

    /// Key event with the tag picked from `state`
    pub fn key(state: ButtonState, keysym: Keysym, window_id: WindowId) -> Event {
        let data = KeyboardEvent {
            which: 0,
            state,
            keysym,
            window_id,
        };
        match state {
            ButtonState::Pressed => Event::KeyDown(data),
            ButtonState::Released => Event::KeyUp(data),
        }
    }

    /// Owning window, for the variants that carry one
    pub fn window_id(&self) -> Option<WindowId> {
        match self {
            Event::Window(e) => Some(e.window_id),
            Event::KeyDown(e) | Event::KeyUp(e) => Some(e.window_id),
            Event::MouseMotion(e) => Some(e.window_id),
            Event::MouseButtonDown(e) | Event::MouseButtonUp(e) => Some(e.window_id),
            _ => None,
        }
    }

    pub fn is_quit(&self) -> bool {
        matches!(self, Event::Quit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_bounds() {
        assert!(EventType::new(31).is_ok());
        assert!(matches!(EventType::new(32), Err(EventError::InvalidType(32))));
        assert_eq!(EventType::user(7).unwrap().tag(), 31);
        assert!(EventType::user(8).is_err());
        assert!(EventType::NOEVENT.is_reserved());
        assert!(EventType::RESERVED3.is_reserved());
        assert!(!EventType::QUIT.is_reserved());
    }

    #[test]
    fn test_event_tags() {
        assert_eq!(Event::Quit.event_type(), EventType::QUIT);
        let key = Event::key(ButtonState::Released, Keysym::new(4, 'a' as u32), 1);
        assert_eq!(key.event_type(), EventType::KEY_UP);
        assert_eq!(key.window_id(), Some(1));
        assert_eq!(Event::user(5).event_type(), EventType::USER);
    }

    #[test]
    fn test_mask_matching() {
        let mask = EventMask::KEY_EVENTS | EventMask::QUIT;
        assert!(mask.matches(&Event::Quit));
        assert!(mask.contains(EventType::KEY_DOWN));
        assert!(!mask.contains(EventType::MOUSE_MOTION));
        assert!(EventMask::ALL.matches(&Event::user(0)));
        assert!(!EventMask::NONE.matches(&Event::Quit));

        let collected: EventMask = [EventType::WINDOW, EventType::QUIT].into_iter().collect();
        assert_eq!(collected.bits(), (1 << 1) | (1 << 12));
    }

    #[test]
    fn test_user_event_range() {
        let ok = UserEvent::new(EventType::user(3).unwrap(), 9, OpaqueData::NULL, OpaqueData::NULL);
        assert!(ok.is_ok());
        let bad = UserEvent::new(EventType::QUIT, 9, OpaqueData::NULL, OpaqueData::NULL);
        assert!(matches!(bad, Err(EventError::InvalidType(12))));
    }

    #[test]
    fn test_hat_and_opaque() {
        assert_eq!(HatPosition::from_bits(0x09), Some(HatPosition::LEFT_UP));
        assert_eq!(HatPosition::from_bits(0x05), None);
        assert!(HatPosition::default().is_centered());

        let value = 42u64;
        let data = OpaqueData::from_ptr(&value);
        assert_eq!(data.as_ptr::<u64>(), &value as *const u64);
        assert!(OpaqueData::NULL.is_null());
    }
}
