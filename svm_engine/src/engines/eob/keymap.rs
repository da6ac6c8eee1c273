use svm_keymap::{ActionEvent, ActionSpec, Keymap, KeymapKind};

pub const KEYMAP_ID: &str = "eob-default";

pub const MOVE_FORWARD: u32 = 1;
pub const MOVE_BACKWARD: u32 = 2;
pub const STRAFE_LEFT: u32 = 3;
pub const STRAFE_RIGHT: u32 = 4;
pub const TURN_LEFT: u32 = 5;
pub const TURN_RIGHT: u32 = 6;
/// `ATTACK_1 + n` attacks with party member `n`.
pub const ATTACK_1: u32 = 11;
pub const ATTACK_6: u32 = 16;
/// `CAST_1 + n` casts the first memorized spell of party member `n`.
pub const CAST_1: u32 = 21;
pub const CAST_6: u32 = 26;
pub const REST: u32 = 30;
pub const QUICK_SAVE: u32 = 40;
pub const QUICK_LOAD: u32 = 41;
pub const MENU: u32 = 42;

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

const ACTIONS: &[ActionSpec] = &[
    action("FORWARD", "Move forward", MOVE_FORWARD, &["KP8", "UP", "w", "JOY_UP"]),
    action("BACKWARD", "Move backward", MOVE_BACKWARD, &["KP2", "DOWN", "s", "JOY_DOWN"]),
    action("STRAFE_LEFT", "Strafe left", STRAFE_LEFT, &["KP4", "a"]),
    action("STRAFE_RIGHT", "Strafe right", STRAFE_RIGHT, &["KP6", "d"]),
    action("TURN_LEFT", "Turn left", TURN_LEFT, &["KP7", "LEFT", "q", "JOY_LEFT"]),
    action("TURN_RIGHT", "Turn right", TURN_RIGHT, &["KP9", "RIGHT", "e", "JOY_RIGHT"]),
    action("ATTACK_1", "Attack with character 1", ATTACK_1, &["1", "JOY_A"]),
    action("ATTACK_2", "Attack with character 2", ATTACK_1 + 1, &["2", "JOY_B"]),
    action("ATTACK_3", "Attack with character 3", ATTACK_1 + 2, &["3"]),
    action("ATTACK_4", "Attack with character 4", ATTACK_1 + 3, &["4"]),
    action("ATTACK_5", "Attack with character 5", ATTACK_1 + 4, &["5"]),
    action("ATTACK_6", "Attack with character 6", ATTACK_6, &["6"]),
    action("CAST_1", "Cast with character 1", CAST_1, &["S+1"]),
    action("CAST_2", "Cast with character 2", CAST_1 + 1, &["S+2"]),
    action("CAST_3", "Cast with character 3", CAST_1 + 2, &["S+3"]),
    action("CAST_4", "Cast with character 4", CAST_1 + 3, &["S+4"]),
    action("CAST_5", "Cast with character 5", CAST_1 + 4, &["S+5"]),
    action("CAST_6", "Cast with character 6", CAST_6, &["S+6"]),
    action("REST", "Rest", REST, &["r"]),
    action("QUICK_SAVE", "Quick save", QUICK_SAVE, &["F5"]),
    action("QUICK_LOAD", "Quick load", QUICK_LOAD, &["F9"]),
    action("MENU", "Return to launcher", MENU, &["ESCAPE", "JOY_BACK"]),
];

pub fn keymaps() -> Vec<Keymap> {
    vec![Keymap::from_table(
        KeymapKind::Game,
        KEYMAP_ID,
        "Eye of the Beholder",
        ACTIONS,
    )]
}

#[cfg(test)]
mod tests {
    use super::*;
    use svm_keymap::HardwareInput;

    #[test]
    fn shifted_digits_cast_and_plain_digits_attack() {
        let keymap = &keymaps()[0];
        let plain = HardwareInput::parse("3").unwrap();
        let shifted = HardwareInput::parse("S+3").unwrap();
        assert_eq!(
            keymap.find_action(&plain).map(|a| a.event),
            Some(ActionEvent::CustomEngine(ATTACK_1 + 2))
        );
        assert_eq!(
            keymap.find_action(&shifted).map(|a| a.event),
            Some(ActionEvent::CustomEngine(CAST_1 + 2))
        );
    }

    #[test]
    fn every_default_input_parses() {
        for spec in ACTIONS {
            for input in spec.inputs {
                assert!(HardwareInput::parse(input).is_ok(), "{input}");
            }
        }
    }
}
