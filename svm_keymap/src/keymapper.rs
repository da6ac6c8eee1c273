use std::collections::HashMap;

use log::debug;

use crate::action::ActionEvent;
use crate::error::KeymapError;
use crate::event::{Event, MouseButton};
use crate::input::HardwareInput;
use crate::keymap::{Keymap, KeymapKind};

/// Translates hardware events into the actions of the registered keymaps.
#[derive(Debug, Default, Clone)]
pub struct Keymapper {
    keymaps: Vec<Keymap>,
    pressed: HashMap<HardwareInput, ActionEvent>,
}

impl Keymapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_keymap(&mut self, keymap: Keymap) -> Result<(), KeymapError> {
        if self.keymaps.iter().any(|k| k.id == keymap.id) {
            return Err(KeymapError::DuplicateKeymap(keymap.id));
        }
        debug!(
            "registering keymap {} ({} actions)",
            keymap.id,
            keymap.actions().len()
        );
        self.keymaps.push(keymap);
        Ok(())
    }

    pub fn remove_keymap(&mut self, id: &str) -> Option<Keymap> {
        let index = self.keymaps.iter().position(|k| k.id == id)?;
        Some(self.keymaps.remove(index))
    }

    pub fn keymaps(&self) -> &[Keymap] {
        &self.keymaps
    }

    pub fn keymap(&self, id: &str) -> Option<&Keymap> {
        self.keymaps.iter().find(|k| k.id == id)
    }

    pub fn set_enabled(&mut self, id: &str, enabled: bool) -> Result<(), KeymapError> {
        self.keymap_mut(id)?.enabled = enabled;
        Ok(())
    }

    pub fn rebind(
        &mut self,
        keymap: &str,
        action: &str,
        inputs: Vec<HardwareInput>,
    ) -> Result<(), KeymapError> {
        self.keymap_mut(keymap)?.set_bindings(action, inputs)
    }

    pub fn reset(&mut self, keymap: &str, action: &str) -> Result<(), KeymapError> {
        self.keymap_mut(keymap)?.reset_bindings(action)
    }

    /// Current bindings of every action in a keymap, in table order.
    pub fn bindings(&self, keymap: &str) -> Result<Vec<(String, Vec<HardwareInput>)>, KeymapError> {
        let keymap = self
            .keymap(keymap)
            .ok_or_else(|| KeymapError::UnknownKeymap(keymap.to_string()))?;
        Ok(keymap
            .actions()
            .iter()
            .map(|a| (a.id.clone(), a.inputs().to_vec()))
            .collect())
    }

    /// Parses a `;`-separated list of input ids as stored in config files.
    /// The `;` key itself is written `SEMICOLON`.
    pub fn parse_input_list(list: &str) -> Result<Vec<HardwareInput>, KeymapError> {
        list.split(';')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(HardwareInput::parse)
            .collect()
    }

    pub fn format_input_list(inputs: &[HardwareInput]) -> String {
        inputs
            .iter()
            .map(|input| input.to_string())
            .collect::<Vec<_>>()
            .join(";")
    }

    pub fn map_event(&mut self, event: &Event) -> Vec<Event> {
        let Some(input) = HardwareInput::from_event(event) else {
            return vec![*event];
        };

        if event.is_press() {
            match self.lookup(&input) {
                Some(action_event) => {
                    self.pressed.insert(input, action_event);
                    vec![start_event(action_event)]
                }
                None => vec![*event],
            }
        } else {
            match self.pressed.remove(&input) {
                Some(action_event) => end_event(action_event).into_iter().collect(),
                None => vec![*event],
            }
        }
    }

    fn lookup(&self, input: &HardwareInput) -> Option<ActionEvent> {
        for kind in [KeymapKind::Gui, KeymapKind::Game, KeymapKind::Global] {
            let hit = self
                .keymaps
                .iter()
                .filter(|k| k.enabled && k.kind == kind)
                .find_map(|k| k.find_action(input));
            if let Some(action) = hit {
                return Some(action.event);
            }
        }
        None
    }

    fn keymap_mut(&mut self, id: &str) -> Result<&mut Keymap, KeymapError> {
        self.keymaps
            .iter_mut()
            .find(|k| k.id == id)
            .ok_or_else(|| KeymapError::UnknownKeymap(id.to_string()))
    }
}

fn start_event(action: ActionEvent) -> Event {
    match action {
        ActionEvent::CustomEngine(id) => Event::CustomEngineActionStart(id),
        ActionEvent::Key(state) => Event::KeyDown(state),
        ActionEvent::LeftClick => Event::MouseDown(MouseButton::Left),
        ActionEvent::RightClick => Event::MouseDown(MouseButton::Right),
        ActionEvent::Quit => Event::Quit,
    }
}

fn end_event(action: ActionEvent) -> Option<Event> {
    match action {
        ActionEvent::CustomEngine(id) => Some(Event::CustomEngineActionEnd(id)),
        ActionEvent::Key(state) => Some(Event::KeyUp(state)),
        ActionEvent::LeftClick => Some(Event::MouseUp(MouseButton::Left)),
        ActionEvent::RightClick => Some(Event::MouseUp(MouseButton::Right)),
        ActionEvent::Quit => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionSpec;
    use crate::event::{JoystickButton, KeyCode, KeyState};

    const GAME: &[ActionSpec] = &[
        ActionSpec {
            id: "SHOOT",
            description: "Shoot",
            event: ActionEvent::CustomEngine(4),
            inputs: &["MOUSE_LEFT", "JOY_A"],
        },
        ActionSpec {
            id: "MENU",
            description: "Menu",
            event: ActionEvent::Key(KeyState {
                code: KeyCode::Escape,
                modifiers: crate::event::Modifiers::NONE,
            }),
            inputs: &["JOY_START"],
        },
    ];

    const GLOBAL: &[ActionSpec] = &[ActionSpec {
        id: "CLICK",
        description: "Click",
        event: ActionEvent::LeftClick,
        inputs: &["MOUSE_LEFT", "JOY_B"],
    }];

    fn mapper() -> Keymapper {
        let mut mapper = Keymapper::new();
        mapper
            .add_keymap(Keymap::from_table(KeymapKind::Global, "global", "Global", GLOBAL))
            .unwrap();
        mapper
            .add_keymap(Keymap::from_table(KeymapKind::Game, "game", "Game", GAME))
            .unwrap();
        mapper
    }

    #[test]
    fn game_keymap_shadows_global() {
        let mut mapper = mapper();
        let down = mapper.map_event(&Event::MouseDown(MouseButton::Left));
        assert_eq!(down, vec![Event::CustomEngineActionStart(4)]);
        let up = mapper.map_event(&Event::MouseUp(MouseButton::Left));
        assert_eq!(up, vec![Event::CustomEngineActionEnd(4)]);
    }

    #[test]
    fn disabled_keymap_falls_through() {
        let mut mapper = mapper();
        mapper.set_enabled("game", false).unwrap();
        let down = mapper.map_event(&Event::MouseDown(MouseButton::Left));
        assert_eq!(down, vec![Event::MouseDown(MouseButton::Left)]);
        let joy = mapper.map_event(&Event::JoyButtonDown(JoystickButton::B));
        assert_eq!(joy, vec![Event::MouseDown(MouseButton::Left)]);
    }

    #[test]
    fn key_actions_emit_key_events() {
        let mut mapper = mapper();
        let down = mapper.map_event(&Event::JoyButtonDown(JoystickButton::Start));
        assert_eq!(down, vec![Event::KeyDown(KeyState::new(KeyCode::Escape))]);
    }

    #[test]
    fn unmatched_release_passes_through() {
        let mut mapper = mapper();
        let up = mapper.map_event(&Event::JoyButtonUp(JoystickButton::A));
        assert_eq!(up, vec![Event::JoyButtonUp(JoystickButton::A)]);
        assert_eq!(mapper.map_event(&Event::Quit), vec![Event::Quit]);
    }

    #[test]
    fn rebinding_changes_lookup() {
        let mut mapper = mapper();
        let inputs = Keymapper::parse_input_list("x; C+s").unwrap();
        mapper.rebind("game", "SHOOT", inputs).unwrap();
        let x = mapper.map_event(&Event::KeyDown(KeyState::new(KeyCode::Char('x'))));
        assert_eq!(x, vec![Event::CustomEngineActionStart(4)]);
        let click = mapper.map_event(&Event::MouseDown(MouseButton::Left));
        assert_eq!(click, vec![Event::MouseDown(MouseButton::Left)]);

        let bindings = mapper.bindings("game").unwrap();
        assert_eq!(Keymapper::format_input_list(&bindings[0].1), "x;C+s");

        mapper.reset("game", "SHOOT").unwrap();
        let click = mapper.map_event(&Event::MouseDown(MouseButton::Left));
        assert_eq!(click, vec![Event::CustomEngineActionStart(4)]);
    }

    #[test]
    fn quit_action_swallows_release() {
        let mut mapper = Keymapper::new();
        let table = [ActionSpec {
            id: "QUIT",
            description: "Quit",
            event: ActionEvent::Quit,
            inputs: &["C+q"],
        }];
        mapper
            .add_keymap(Keymap::from_table(KeymapKind::Global, "global", "Global", &table))
            .unwrap();
        let chord = HardwareInput::parse("C+q").unwrap();
        assert_eq!(mapper.map_event(&chord.press_event()), vec![Event::Quit]);
        assert!(mapper.map_event(&chord.release_event()).is_empty());
    }

    #[test]
    fn duplicate_keymaps_are_rejected() {
        let mut mapper = mapper();
        let err = mapper
            .add_keymap(Keymap::new(KeymapKind::Game, "game", "Again"))
            .unwrap_err();
        assert_eq!(err, KeymapError::DuplicateKeymap("game".to_string()));
    }

    #[test]
    fn semicolon_key_survives_input_lists() {
        let inputs = Keymapper::parse_input_list("SEMICOLON;C+SEMICOLON;a").unwrap();
        assert_eq!(inputs.len(), 3);
        assert_eq!(
            inputs[0],
            HardwareInput::Key(KeyState::new(KeyCode::Char(';')))
        );
        let formatted = Keymapper::format_input_list(&inputs);
        assert_eq!(formatted, "SEMICOLON;C+SEMICOLON;a");
        assert_eq!(Keymapper::parse_input_list(&formatted).unwrap(), inputs);
    }
}
