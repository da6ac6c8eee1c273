//! Input remapping shared by every engine.
//!
//! Backends deliver raw [`Event`]s; the [`Keymapper`] translates the ones
//! bound in the active [`Keymap`]s into engine-defined actions before the
//! engine sees them.

pub mod action;
pub mod error;
pub mod event;
pub mod input;
pub mod keymap;
pub mod keymapper;

pub use action::{Action, ActionEvent, ActionSpec};
pub use error::KeymapError;
pub use event::{Event, JoystickButton, KeyCode, KeyState, Modifiers, MouseButton};
pub use input::HardwareInput;
pub use keymap::{Keymap, KeymapKind};
pub use keymapper::Keymapper;
