use std::fmt;

use crate::error::KeymapError;
use crate::event::{Event, JoystickButton, KeyCode, KeyState, Modifiers, MouseButton};

/// A physical input that an action can be bound to.
///
/// Inputs are identified by short string ids (`MOUSE_LEFT`, `JOY_A`,
/// `C+s`, `UP`) so that default bindings and user overrides can live in
/// static tables and config files instead of code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HardwareInput {
    Key(KeyState),
    Mouse(MouseButton),
    Joystick(JoystickButton),
}

const MOUSE_NAMES: &[(&str, MouseButton)] = &[
    ("MOUSE_LEFT", MouseButton::Left),
    ("MOUSE_RIGHT", MouseButton::Right),
    ("MOUSE_MIDDLE", MouseButton::Middle),
    ("MOUSE_WHEEL_UP", MouseButton::WheelUp),
    ("MOUSE_WHEEL_DOWN", MouseButton::WheelDown),
];

const JOY_NAMES: &[(&str, JoystickButton)] = &[
    ("JOY_A", JoystickButton::A),
    ("JOY_B", JoystickButton::B),
    ("JOY_X", JoystickButton::X),
    ("JOY_Y", JoystickButton::Y),
    ("JOY_BACK", JoystickButton::Back),
    ("JOY_START", JoystickButton::Start),
    ("JOY_LEFT_SHOULDER", JoystickButton::LeftShoulder),
    ("JOY_RIGHT_SHOULDER", JoystickButton::RightShoulder),
    ("JOY_UP", JoystickButton::DpadUp),
    ("JOY_DOWN", JoystickButton::DpadDown),
    ("JOY_LEFT", JoystickButton::DpadLeft),
    ("JOY_RIGHT", JoystickButton::DpadRight),
];

const KEY_NAMES: &[(&str, KeyCode)] = &[
    ("UP", KeyCode::Up),
    ("DOWN", KeyCode::Down),
    ("LEFT", KeyCode::Left),
    ("RIGHT", KeyCode::Right),
    ("RETURN", KeyCode::Return),
    ("ESCAPE", KeyCode::Escape),
    ("SPACE", KeyCode::Space),
    ("TAB", KeyCode::Tab),
    ("BACKSPACE", KeyCode::Backspace),
    // `;` separates entries in input lists.
    ("SEMICOLON", KeyCode::Char(';')),
];

impl HardwareInput {
    pub fn parse(id: &str) -> Result<Self, KeymapError> {
        let trimmed = id.trim();
        if let Some((_, button)) = MOUSE_NAMES.iter().find(|(name, _)| *name == trimmed) {
            return Ok(HardwareInput::Mouse(*button));
        }
        if let Some((_, button)) = JOY_NAMES.iter().find(|(name, _)| *name == trimmed) {
            return Ok(HardwareInput::Joystick(*button));
        }

        let mut modifiers = Modifiers::NONE;
        let mut rest = trimmed;
        loop {
            if let Some(stripped) = rest.strip_prefix("C+") {
                modifiers.ctrl = true;
                rest = stripped;
            } else if let Some(stripped) = rest.strip_prefix("S+") {
                modifiers.shift = true;
                rest = stripped;
            } else if let Some(stripped) = rest.strip_prefix("A+") {
                modifiers.alt = true;
                rest = stripped;
            } else {
                break;
            }
        }

        let code = parse_key_code(rest).ok_or_else(|| KeymapError::UnknownInput(id.to_string()))?;
        Ok(HardwareInput::Key(KeyState::with_modifiers(code, modifiers)))
    }

    /// Extracts the input behind a press or release event.
    pub fn from_event(event: &Event) -> Option<Self> {
        match event {
            Event::KeyDown(state) | Event::KeyUp(state) => {
                Some(HardwareInput::Key(normalize_key(*state)))
            }
            Event::MouseDown(button) | Event::MouseUp(button) => {
                Some(HardwareInput::Mouse(*button))
            }
            Event::JoyButtonDown(button) | Event::JoyButtonUp(button) => {
                Some(HardwareInput::Joystick(*button))
            }
            _ => None,
        }
    }

    /// Builds the press event that this input would generate.
    pub fn press_event(self) -> Event {
        match self {
            HardwareInput::Key(state) => Event::KeyDown(state),
            HardwareInput::Mouse(button) => Event::MouseDown(button),
            HardwareInput::Joystick(button) => Event::JoyButtonDown(button),
        }
    }

    pub fn release_event(self) -> Event {
        match self {
            HardwareInput::Key(state) => Event::KeyUp(state),
            HardwareInput::Mouse(button) => Event::MouseUp(button),
            HardwareInput::Joystick(button) => Event::JoyButtonUp(button),
        }
    }
}

fn normalize_key(state: KeyState) -> KeyState {
    match state.code {
        KeyCode::Char(c) => KeyState::with_modifiers(KeyCode::Char(c.to_ascii_lowercase()), state.modifiers),
        _ => state,
    }
}

fn parse_key_code(name: &str) -> Option<KeyCode> {
    if let Some((_, code)) = KEY_NAMES.iter().find(|(key, _)| *key == name) {
        return Some(*code);
    }
    if let Some(number) = name.strip_prefix("KP") {
        return number
            .parse::<u8>()
            .ok()
            .filter(|d| *d <= 9)
            .map(KeyCode::Keypad);
    }
    if name.len() > 1 {
        if let Some(number) = name.strip_prefix('F') {
            return number
                .parse::<u8>()
                .ok()
                .filter(|n| (1..=12).contains(n))
                .map(KeyCode::F);
        }
    }

    let mut chars = name.chars();
    let c = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    if c.is_ascii_digit() {
        Some(KeyCode::Digit(c as u8 - b'0'))
    } else if c.is_ascii_alphabetic() {
        Some(KeyCode::Char(c.to_ascii_lowercase()))
    } else if c.is_ascii_punctuation() {
        Some(KeyCode::Char(c))
    } else {
        None
    }
}

impl fmt::Display for HardwareInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HardwareInput::Mouse(button) => {
                let name = MOUSE_NAMES
                    .iter()
                    .find(|(_, b)| b == button)
                    .map(|(name, _)| *name)
                    .unwrap_or("MOUSE_?");
                f.write_str(name)
            }
            HardwareInput::Joystick(button) => {
                let name = JOY_NAMES
                    .iter()
                    .find(|(_, b)| b == button)
                    .map(|(name, _)| *name)
                    .unwrap_or("JOY_?");
                f.write_str(name)
            }
            HardwareInput::Key(state) => {
                if state.modifiers.ctrl {
                    f.write_str("C+")?;
                }
                if state.modifiers.shift {
                    f.write_str("S+")?;
                }
                if state.modifiers.alt {
                    f.write_str("A+")?;
                }
                match state.code {
                    KeyCode::Char(';') => f.write_str("SEMICOLON"),
                    KeyCode::Char(c) => write!(f, "{c}"),
                    KeyCode::Digit(d) => write!(f, "{d}"),
                    KeyCode::F(n) => write!(f, "F{n}"),
                    KeyCode::Keypad(n) => write!(f, "KP{n}"),
                    other => {
                        let name = KEY_NAMES
                            .iter()
                            .find(|(_, code)| *code == other)
                            .map(|(name, _)| *name)
                            .unwrap_or("?");
                        f.write_str(name)
                    }
                }
            }
        }
    }
}
