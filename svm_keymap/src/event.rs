use serde::{Deserialize, Serialize};

/// Logical key codes understood by the keymapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum KeyCode {
    Char(char),
    Digit(u8),
    F(u8),
    Keypad(u8),
    Up,
    Down,
    Left,
    Right,
    Return,
    Escape,
    Space,
    Tab,
    Backspace,
}

impl KeyCode {
    /// ASCII value delivered alongside the key press, if any.
    pub fn ascii(self) -> Option<u8> {
        match self {
            KeyCode::Char(c) if c.is_ascii() => Some(c as u8),
            KeyCode::Digit(d) if d <= 9 => Some(b'0' + d),
            KeyCode::Keypad(d) if d <= 9 => Some(b'0' + d),
            KeyCode::Return => Some(13),
            KeyCode::Escape => Some(27),
            KeyCode::Space => Some(b' '),
            KeyCode::Tab => Some(9),
            KeyCode::Backspace => Some(8),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        ctrl: false,
        shift: false,
        alt: false,
    };

    pub fn is_empty(self) -> bool {
        !(self.ctrl || self.shift || self.alt)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KeyState {
    pub code: KeyCode,
    pub modifiers: Modifiers,
}

impl KeyState {
    pub fn new(code: KeyCode) -> Self {
        KeyState {
            code,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn with_modifiers(code: KeyCode, modifiers: Modifiers) -> Self {
        KeyState { code, modifiers }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    WheelUp,
    WheelDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum JoystickButton {
    A,
    B,
    X,
    Y,
    Back,
    Start,
    LeftShoulder,
    RightShoulder,
    DpadUp,
    DpadDown,
    DpadLeft,
    DpadRight,
}

/// Input and control events flowing from the backend into an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    KeyDown(KeyState),
    KeyUp(KeyState),
    MouseMove { x: i32, y: i32 },
    MouseDown(MouseButton),
    MouseUp(MouseButton),
    JoyButtonDown(JoystickButton),
    JoyButtonUp(JoystickButton),
    CustomEngineActionStart(u32),
    CustomEngineActionEnd(u32),
    Quit,
    ReturnToLauncher,
}

impl Event {
    pub fn is_press(&self) -> bool {
        matches!(
            self,
            Event::KeyDown(_) | Event::MouseDown(_) | Event::JoyButtonDown(_)
        )
    }

    pub fn is_release(&self) -> bool {
        matches!(
            self,
            Event::KeyUp(_) | Event::MouseUp(_) | Event::JoyButtonUp(_)
        )
    }
}
