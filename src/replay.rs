//! Scripted Input Replay
//!
//! Data structures for replay scripts and an [`EventSource`] that feeds
//! them into the event system:
//! - ScriptedInput: one step (key press, mouse click, delay, ...)
//! - ReplayScript: the ordered steps, loaded from JSON
//! - ReplaySource: posts steps on each pump, honouring delays

use anyhow::{Context, Result};
use evpump_core::event::{keycode, ButtonState, Event, Keysym};
use evpump_core::input_state::{BUTTON_LEFT, BUTTON_MIDDLE, BUTTON_RIGHT};
use evpump_core::{Admission, EventPoster, EventSource, QuitHandle};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Window the replayed input is attributed to
pub const REPLAY_WINDOW: u32 = 1;

/// Mouse button types for click actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    pub fn index(self) -> u8 {
        match self {
            MouseButton::Left => BUTTON_LEFT,
            MouseButton::Middle => BUTTON_MIDDLE,
            MouseButton::Right => BUTTON_RIGHT,
        }
    }
}

/// Individual step within a replay script
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ScriptedInput {
    /// Key press (key down) with optional delay in milliseconds
    KeyPress {
        key: String,
        #[serde(default)]
        delay_ms: u64,
    },
    /// Key release (key up) with optional delay in milliseconds
    KeyRelease {
        key: String,
        #[serde(default)]
        delay_ms: u64,
    },
    /// Mouse button click (press or release)
    MouseClick {
        button: MouseButton,
        /// true = press (down), false = release (up)
        press: bool,
    },
    /// Move mouse to absolute position
    MouseMove { x: i32, y: i32 },
    /// Pure delay between steps
    Delay { ms: u64 },
    /// Application-defined event
    User { code: i32 },
    /// Request to quit (goes through the filter like any other event)
    Quit,
}

/// Ordered list of steps
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReplayScript {
    pub steps: Vec<ScriptedInput>,
}

impl ReplayScript {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let script: ReplayScript = serde_json::from_str(json)?;
        for step in &script.steps {
            if let ScriptedInput::KeyPress { key, .. } | ScriptedInput::KeyRelease { key, .. } = step {
                if key_to_keysym(key).is_none() {
                    anyhow::bail!("Unknown key name in script: {}", key);
                }
            }
        }
        Ok(script)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read script {}", path.display()))?;
        Self::from_json_str(&contents)
            .with_context(|| format!("Failed to parse script {}", path.display()))
    }
}

/// Convert a key name to a keysym (USB HID scancode + keycode)
pub fn key_to_keysym(key: &str) -> Option<Keysym> {
    let upper = key.to_uppercase();

    // Letters and digits
    if upper.len() == 1 {
        let c = upper.chars().next()?;
        return match c {
            'A'..='Z' => Some(Keysym::new(4 + (c as u8 - b'A'), c.to_ascii_lowercase() as u32)),
            '1'..='9' => Some(Keysym::new(30 + (c as u8 - b'1'), c as u32)),
            '0' => Some(Keysym::new(39, '0' as u32)),
            _ => None,
        };
    }

    // Function keys
    if let Some(n) = upper.strip_prefix('F').and_then(|n| n.parse::<u8>().ok()) {
        if (1..=12).contains(&n) {
            return Some(Keysym::new(57 + n, keycode::F1 + u32::from(n - 1)));
        }
    }

    let (scancode, sym) = match upper.as_str() {
        "ENTER" | "RETURN" => (40, keycode::RETURN),
        "ESC" | "ESCAPE" => (41, keycode::ESCAPE),
        "BACKSPACE" => (42, keycode::BACKSPACE),
        "TAB" => (43, keycode::TAB),
        "SPACE" => (44, keycode::SPACE),
        "CAPSLOCK" => (57, keycode::CAPSLOCK),
        "DELETE" => (76, keycode::DELETE),
        "RIGHT" => (79, keycode::RIGHT),
        "LEFT" => (80, keycode::LEFT),
        "DOWN" => (81, keycode::DOWN),
        "UP" => (82, keycode::UP),
        "NUMLOCK" => (83, keycode::NUMLOCK),
        "CTRL" | "LCTRL" => (224, keycode::LCTRL),
        "SHIFT" | "LSHIFT" => (225, keycode::LSHIFT),
        "ALT" | "LALT" => (226, keycode::LALT),
        "WIN" | "LWIN" | "LGUI" => (227, keycode::LGUI),
        "RCTRL" => (228, keycode::RCTRL),
        "RSHIFT" => (229, keycode::RSHIFT),
        "RALT" => (230, keycode::RALT),
        "RWIN" | "RGUI" => (231, keycode::RGUI),
        _ => return None,
    };
    Some(Keysym::new(scancode, sym))
}

/// Event source that replays a script and posts a `Quit` behind the last
/// step, unless the script posted its own
pub struct ReplaySource {
    steps: VecDeque<ScriptedInput>,
    resume_at: Option<Instant>,
    quit: QuitHandle,
    finished: bool,
}

impl ReplaySource {
    pub fn new(script: ReplayScript, quit: QuitHandle) -> Self {
        Self {
            steps: script.steps.into(),
            resume_at: None,
            quit,
            finished: false,
        }
    }

    pub fn remaining(&self) -> usize {
        self.steps.len()
    }

    fn delay(&mut self, ms: u64) {
        if ms > 0 {
            self.resume_at = Some(Instant::now() + Duration::from_millis(ms));
        }
    }

    fn send_key(&self, key: &str, state: ButtonState, poster: &EventPoster<'_>) -> Result<()> {
        let Some(keysym) = key_to_keysym(key) else {
            warn!("[Replay] Skipping unknown key: {}", key);
            return Ok(());
        };
        poster.send_keyboard_key(0, state, keysym, REPLAY_WINDOW)?;
        Ok(())
    }

    fn play(&mut self, step: ScriptedInput, poster: &EventPoster<'_>) -> Result<()> {
        match step {
            ScriptedInput::KeyPress { key, delay_ms } => {
                debug!("[Replay] KeyPress: {}", key);
                self.delay(delay_ms);
                self.send_key(&key, ButtonState::Pressed, poster)?;
            }
            ScriptedInput::KeyRelease { key, delay_ms } => {
                debug!("[Replay] KeyRelease: {}", key);
                self.delay(delay_ms);
                self.send_key(&key, ButtonState::Released, poster)?;
            }
            ScriptedInput::MouseClick { button, press } => {
                debug!("[Replay] MouseClick: {:?} (press: {})", button, press);
                poster.send_mouse_button(0, button.index(), press.into(), REPLAY_WINDOW)?;
            }
            ScriptedInput::MouseMove { x, y } => {
                debug!("[Replay] MouseMove: ({}, {})", x, y);
                poster.send_mouse_motion(0, x, y, REPLAY_WINDOW)?;
            }
            ScriptedInput::Delay { ms } => {
                debug!("[Replay] Delay: {}ms", ms);
                self.delay(ms);
            }
            ScriptedInput::User { code } => {
                poster.post(Event::user(code))?;
            }
            ScriptedInput::Quit => {
                debug!("[Replay] Quit");
                self.finish(poster)?;
            }
        }
        Ok(())
    }

    /// Queue the closing quit behind everything already posted. If it is
    /// disabled, filtered or lost, raise an interrupt quit instead so the
    /// consumer still stops.
    fn finish(&mut self, poster: &EventPoster<'_>) -> Result<()> {
        self.finished = true;
        match poster.send_quit() {
            Ok(Admission::Admitted) => Ok(()),
            Ok(dropped) => {
                debug!("[Replay] Quit {:?}, raising interrupt", dropped);
                self.quit.interrupt();
                Ok(())
            }
            Err(e) => {
                self.quit.interrupt();
                Err(e.into())
            }
        }
    }
}

impl EventSource for ReplaySource {
    fn name(&self) -> &str {
        "replay"
    }

    fn pump(&mut self, poster: &EventPoster<'_>) {
        if let Some(resume_at) = self.resume_at {
            if Instant::now() < resume_at {
                return;
            }
            self.resume_at = None;
        }

        while let Some(step) = self.steps.pop_front() {
            if let Err(e) = self.play(step, poster) {
                warn!("[Replay] Event lost: {}", e);
            }
            if self.resume_at.is_some() {
                return;
            }
        }

        if !self.finished {
            info!("[Replay] Script finished");
            if let Err(e) = self.finish(poster) {
                warn!("[Replay] Event lost: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evpump_core::{EventConfig, EventSystem};

    fn load(json: &str) -> ReplayScript {
        ReplayScript::from_json_str(json).unwrap()
    }

    #[test]
    fn test_script_parsing() {
        let script = load(
            r#"{ "steps": [
                { "KeyPress": { "key": "a" } },
                { "KeyRelease": { "key": "A", "delay_ms": 5 } },
                { "MouseClick": { "button": "Left", "press": true } },
                { "Delay": { "ms": 10 } },
                "Quit"
            ] }"#,
        );
        assert_eq!(script.steps.len(), 5);
        assert_eq!(
            script.steps[1],
            ScriptedInput::KeyRelease {
                key: "A".to_string(),
                delay_ms: 5
            }
        );
        assert_eq!(script.steps[4], ScriptedInput::Quit);
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(ReplayScript::from_json_str(r#"{ "steps": [ { "KeyPress": { "key": "Hyper" } } ] }"#).is_err());
    }

    #[test]
    fn test_key_names() {
        assert_eq!(key_to_keysym("a"), Some(Keysym::new(4, 'a' as u32)));
        assert_eq!(key_to_keysym("0"), Some(Keysym::new(39, '0' as u32)));
        assert_eq!(key_to_keysym("F12"), Some(Keysym::new(69, keycode::F1 + 11)));
        assert_eq!(key_to_keysym("shift"), Some(Keysym::new(225, keycode::LSHIFT)));
        assert_eq!(key_to_keysym("F13"), None);
    }

    #[test]
    fn test_replay_posts_then_quits() {
        let system = EventSystem::init(EventConfig::default()).unwrap();
        let script = load(
            r#"{ "steps": [
                { "KeyPress": { "key": "shift" } },
                { "KeyPress": { "key": "q" } },
                { "MouseMove": { "x": 10, "y": 20 } },
                { "User": { "code": 9 } }
            ] }"#,
        );
        system.add_source(Box::new(ReplaySource::new(script, system.quit_handle())));

        match system.poll_event().unwrap() {
            Some(Event::KeyDown(key)) => assert_eq!(key.keysym.sym, keycode::LSHIFT),
            other => panic!("unexpected event {:?}", other),
        }
        match system.poll_event().unwrap() {
            Some(Event::KeyDown(key)) => {
                assert_eq!(key.keysym.sym, 'q' as u32);
                assert_eq!(key.window_id, REPLAY_WINDOW);
                assert!(key.keysym.modifiers.intersects(evpump_core::KeyMod::SHIFT));
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert!(matches!(system.poll_event().unwrap(), Some(Event::MouseMotion(_))));
        assert_eq!(system.poll_event().unwrap(), Some(Event::user(9)));
        // The closing quit is queued behind the script's input
        assert_eq!(system.poll_event().unwrap(), Some(Event::Quit));
        assert_eq!(system.poll_event().unwrap(), None);
    }

    #[test]
    fn test_trailing_steps_arrive_before_quit() {
        let system = EventSystem::init(EventConfig::default()).unwrap();
        let script = load(
            r#"{ "steps": [
                { "User": { "code": 1 } },
                { "User": { "code": 2 } },
                { "User": { "code": 3 } },
                { "User": { "code": 4 } }
            ] }"#,
        );
        system.add_source(Box::new(ReplaySource::new(script, system.quit_handle())));

        let mut received = Vec::new();
        loop {
            let event = system.wait_event().unwrap();
            received.push(event);
            if event.is_quit() {
                break;
            }
        }
        assert_eq!(
            received,
            vec![
                Event::user(1),
                Event::user(2),
                Event::user(3),
                Event::user(4),
                Event::Quit
            ]
        );
    }

    #[test]
    fn test_vetoed_quit_falls_back_to_interrupt() {
        let system = EventSystem::init(EventConfig::default()).unwrap();
        system.set_event_filter(Some(evpump_core::filter_fn(|event| !event.is_quit())));

        let script = load(r#"{ "steps": [ { "User": { "code": 1 } }, "Quit" ] }"#);
        system.add_source(Box::new(ReplaySource::new(script, system.quit_handle())));

        assert_eq!(
            system.wait_event_timeout(Duration::from_secs(5)).unwrap(),
            Some(Event::Quit)
        );
        assert_eq!(system.poll_event().unwrap(), Some(Event::user(1)));
        // Finished: no second quit at the end of the script
        assert_eq!(system.poll_event().unwrap(), None);
    }

    #[test]
    fn test_disabled_quit_at_script_end_falls_back_to_interrupt() {
        let system = EventSystem::init(EventConfig::default()).unwrap();
        system.set_type_state(evpump_core::EventType::QUIT, evpump_core::StateRequest::Disable);

        let script = load(r#"{ "steps": [ { "User": { "code": 1 } } ] }"#);
        system.add_source(Box::new(ReplaySource::new(script, system.quit_handle())));

        assert_eq!(
            system.wait_event_timeout(Duration::from_secs(5)).unwrap(),
            Some(Event::Quit)
        );
    }

    #[test]
    fn test_delay_holds_back_later_steps() {
        let system = EventSystem::init(EventConfig::default()).unwrap();
        let script = load(
            r#"{ "steps": [
                { "User": { "code": 1 } },
                { "Delay": { "ms": 40 } },
                { "User": { "code": 2 } },
                "Quit"
            ] }"#,
        );
        system.add_source(Box::new(ReplaySource::new(script, system.quit_handle())));

        let start = Instant::now();
        assert_eq!(system.poll_event().unwrap(), Some(Event::user(1)));
        assert_eq!(system.poll_event().unwrap(), None);

        let second = system.wait_event().unwrap();
        assert_eq!(second, Event::user(2));
        assert!(start.elapsed() >= Duration::from_millis(40));
        assert_eq!(system.wait_event().unwrap(), Event::Quit);
    }
}
