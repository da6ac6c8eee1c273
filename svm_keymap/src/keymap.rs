use serde::{Deserialize, Serialize};

use crate::action::{Action, ActionSpec};
use crate::error::KeymapError;
use crate::input::HardwareInput;

/// Priority class of a keymap; GUI keymaps shadow game keymaps, which in
/// turn shadow global ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum KeymapKind {
    Gui,
    Game,
    Global,
}

#[derive(Debug, Clone)]
pub struct Keymap {
    pub kind: KeymapKind,
    pub id: String,
    pub description: String,
    pub enabled: bool,
    actions: Vec<Action>,
}

impl Keymap {
    pub fn new(kind: KeymapKind, id: impl Into<String>, description: impl Into<String>) -> Self {
        Keymap {
            kind,
            id: id.into(),
            description: description.into(),
            enabled: true,
            actions: Vec::new(),
        }
    }

    pub fn from_table(
        kind: KeymapKind,
        id: impl Into<String>,
        description: impl Into<String>,
        table: &[ActionSpec],
    ) -> Self {
        let mut keymap = Keymap::new(kind, id, description);
        for spec in table {
            keymap.add_action(Action::from_spec(spec));
        }
        keymap
    }

    /// Adds an action, replacing any earlier action with the same id.
    pub fn add_action(&mut self, action: Action) {
        if let Some(existing) = self.actions.iter_mut().find(|a| a.id == action.id) {
            *existing = action;
        } else {
            self.actions.push(action);
        }
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn action(&self, id: &str) -> Option<&Action> {
        self.actions.iter().find(|a| a.id == id)
    }

    /// First action in table order bound to `input`.
    pub fn find_action(&self, input: &HardwareInput) -> Option<&Action> {
        self.actions.iter().find(|a| a.is_bound_to(input))
    }

    pub fn set_bindings(
        &mut self,
        action_id: &str,
        inputs: Vec<HardwareInput>,
    ) -> Result<(), KeymapError> {
        let action = self.action_mut(action_id)?;
        action.set_inputs(inputs);
        Ok(())
    }

    pub fn reset_bindings(&mut self, action_id: &str) -> Result<(), KeymapError> {
        self.action_mut(action_id)?.reset_inputs();
        Ok(())
    }

    fn action_mut(&mut self, action_id: &str) -> Result<&mut Action, KeymapError> {
        let keymap = self.id.clone();
        self.actions
            .iter_mut()
            .find(|a| a.id == action_id)
            .ok_or_else(|| KeymapError::UnknownAction {
                keymap,
                action: action_id.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionEvent;

    const TABLE: &[ActionSpec] = &[
        ActionSpec {
            id: "FWD",
            description: "Move forward",
            event: ActionEvent::CustomEngine(1),
            inputs: &["UP", "w"],
        },
        ActionSpec {
            id: "ALT_FWD",
            description: "Also forward",
            event: ActionEvent::CustomEngine(2),
            inputs: &["w"],
        },
    ];

    #[test]
    fn first_bound_action_wins() {
        let keymap = Keymap::from_table(KeymapKind::Game, "test", "Test", TABLE);
        let w = HardwareInput::parse("w").unwrap();
        assert_eq!(keymap.find_action(&w).map(|a| a.id.as_str()), Some("FWD"));
    }

    #[test]
    fn rebinding_unknown_action_fails() {
        let mut keymap = Keymap::from_table(KeymapKind::Game, "test", "Test", TABLE);
        let err = keymap.set_bindings("NOPE", Vec::new()).unwrap_err();
        assert!(matches!(err, KeymapError::UnknownAction { .. }));
    }

    #[test]
    fn empty_override_unbinds() {
        let mut keymap = Keymap::from_table(KeymapKind::Game, "test", "Test", TABLE);
        keymap.set_bindings("FWD", Vec::new()).unwrap();
        let w = HardwareInput::parse("w").unwrap();
        assert_eq!(keymap.find_action(&w).map(|a| a.id.as_str()), Some("ALT_FWD"));
        let up = HardwareInput::parse("UP").unwrap();
        assert!(keymap.find_action(&up).is_none());
    }
}
