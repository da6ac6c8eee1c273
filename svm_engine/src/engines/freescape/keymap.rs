use svm_keymap::{ActionEvent, ActionSpec, Keymap, KeymapKind};

use super::data::Variant;

pub const DEFAULT_KEYMAP_ID: &str = "freescape-default";
pub const CASTLE_KEYMAP_ID: &str = "freescape-castle";
pub const DARK_KEYMAP_ID: &str = "freescape-dark";

pub const MOVE_FORWARD: u32 = 1;
pub const MOVE_BACKWARD: u32 = 2;
pub const STRAFE_LEFT: u32 = 3;
pub const STRAFE_RIGHT: u32 = 4;
pub const TURN_LEFT: u32 = 5;
pub const TURN_RIGHT: u32 = 6;
pub const LOOK_UP: u32 = 7;
pub const LOOK_DOWN: u32 = 8;
pub const CENTER_VIEW: u32 = 9;
pub const SHOOT: u32 = 10;
pub const QUICK_SAVE: u32 = 11;
pub const QUICK_LOAD: u32 = 12;
pub const MENU: u32 = 13;
pub const ACTIVATE: u32 = 20;
pub const CROUCH: u32 = 21;
pub const SWITCH_JETPACK: u32 = 30;
pub const RISE: u32 = 31;
pub const LOWER: u32 = 32;

const fn action(
    id: &'static str,
    description: &'static str,
    event: u32,
    inputs: &'static [&'static str],
) -> ActionSpec {
    ActionSpec {
        id,
        description,
        event: ActionEvent::CustomEngine(event),
        inputs,
    }
}

const DEFAULT_ACTIONS: &[ActionSpec] = &[
    action("FORWARD", "Move forward", MOVE_FORWARD, &["UP", "w", "JOY_UP"]),
    action("BACKWARD", "Move backward", MOVE_BACKWARD, &["DOWN", "s", "JOY_DOWN"]),
    action("STRAFE_LEFT", "Strafe left", STRAFE_LEFT, &["a"]),
    action("STRAFE_RIGHT", "Strafe right", STRAFE_RIGHT, &["d"]),
    action("TURN_LEFT", "Turn left", TURN_LEFT, &["LEFT", "q", "JOY_LEFT"]),
    action("TURN_RIGHT", "Turn right", TURN_RIGHT, &["RIGHT", "e", "JOY_RIGHT"]),
    action("LOOK_UP", "Look up", LOOK_UP, &["r", "JOY_Y"]),
    action("LOOK_DOWN", "Look down", LOOK_DOWN, &["f", "JOY_X"]),
    action("CENTER", "Center view", CENTER_VIEW, &["c"]),
    action("SHOOT", "Shoot", SHOOT, &["MOUSE_LEFT", "SPACE", "JOY_A"]),
    action("QUICK_SAVE", "Quick save", QUICK_SAVE, &["F5"]),
    action("QUICK_LOAD", "Quick load", QUICK_LOAD, &["F9"]),
    action("MENU", "Return to launcher", MENU, &["ESCAPE", "JOY_BACK"]),
];

const CASTLE_ACTIONS: &[ActionSpec] = &[
    action("ACTIVATE", "Activate", ACTIVATE, &["MOUSE_RIGHT", "x", "JOY_B"]),
    action("CROUCH", "Crouch", CROUCH, &["z"]),
];

const DARK_ACTIONS: &[ActionSpec] = &[
    action("JETPACK", "Switch jetpack", SWITCH_JETPACK, &["j", "JOY_B"]),
    action("RISE", "Rise", RISE, &["p", "JOY_RIGHT_SHOULDER"]),
    action("LOWER", "Lower", LOWER, &["l", "JOY_LEFT_SHOULDER"]),
];

pub fn keymaps(variant: Variant) -> Vec<Keymap> {
    let default = Keymap::from_table(
        KeymapKind::Game,
        DEFAULT_KEYMAP_ID,
        "Freescape",
        DEFAULT_ACTIONS,
    );
    let extra = match variant {
        Variant::Castle => {
            Keymap::from_table(KeymapKind::Game, CASTLE_KEYMAP_ID, "Castle Master", CASTLE_ACTIONS)
        }
        Variant::Dark => {
            Keymap::from_table(KeymapKind::Game, DARK_KEYMAP_ID, "Dark Side", DARK_ACTIONS)
        }
    };
    vec![default, extra]
}

#[cfg(test)]
mod tests {
    use super::*;
    use svm_keymap::HardwareInput;

    #[test]
    fn variant_keymaps_add_their_actions() {
        let castle = keymaps(Variant::Castle);
        assert_eq!(castle.len(), 2);
        assert!(castle[1].action("ACTIVATE").is_some());
        assert!(castle[1].action("JETPACK").is_none());

        let dark = keymaps(Variant::Dark);
        let j = HardwareInput::parse("j").unwrap();
        assert_eq!(
            dark[1].find_action(&j).map(|a| a.event),
            Some(ActionEvent::CustomEngine(SWITCH_JETPACK))
        );
    }

    #[test]
    fn every_default_input_parses() {
        for table in [DEFAULT_ACTIONS, CASTLE_ACTIONS, DARK_ACTIONS] {
            for spec in table {
                for input in spec.inputs {
                    assert!(HardwareInput::parse(input).is_ok(), "{input}");
                }
            }
        }
    }
}
