//! Interpreter for condition scripts.

use log::{debug, warn};

use super::data::{Condition, FreescapeData, Instruction, Test, Trigger};
use super::state::{EndReason, GameState};

/// Side effects the interpreter cannot apply itself because they need the
/// engine: area changes and pauses.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Effects {
    pub goto: Option<(u16, i16)>,
    pub delay_ticks: u32,
}

/// Runs every condition of `conditions` whose trigger is `trigger`.
/// Returns how many ran.
pub fn run_conditions(
    conditions: &[Condition],
    trigger: Trigger,
    data: &FreescapeData,
    state: &mut GameState,
    effects: &mut Effects,
) -> usize {
    let mut ran = 0;
    for condition in conditions.iter().filter(|c| c.trigger == trigger) {
        execute(&condition.instructions, data, state, effects);
        ran += 1;
    }
    ran
}

pub fn execute(
    instructions: &[Instruction],
    data: &FreescapeData,
    state: &mut GameState,
    effects: &mut Effects,
) {
    for instruction in instructions {
        match instruction {
            Instruction::AddVar { var, value } => state.add_var(data, *var, *value),
            Instruction::SubVar { var, value } => state.add_var(data, *var, -*value),
            Instruction::SetVar { var, value } => state.set_var(data, *var, *value),
            Instruction::SetBit { bit } => state.set_bit(*bit, true),
            Instruction::ClearBit { bit } => state.set_bit(*bit, false),
            Instruction::ToggleBit { bit } => {
                let on = state.bit(*bit);
                state.set_bit(*bit, !on);
            }
            Instruction::Goto { area, entrance } => effects.goto = Some((*area, *entrance)),
            Instruction::Visible { object, area } => {
                let area = area.unwrap_or(state.area);
                set_visibility(state, area, *object, Some(true));
            }
            Instruction::Invisible { object, area } => {
                let area = area.unwrap_or(state.area);
                set_visibility(state, area, *object, Some(false));
            }
            Instruction::ToggleVisibility { object, area } => {
                let area = area.unwrap_or(state.area);
                set_visibility(state, area, *object, None);
            }
            Instruction::Destroy { object, area } => {
                let area = area.unwrap_or(state.area);
                if !state.destroy(data, area, *object) {
                    debug!("destroy: object {object} in area {area} already gone");
                }
            }
            Instruction::Print { message } => match data.messages.get(*message) {
                Some(text) => state.push_message(text.clone()),
                None => warn!("print: no message {message}"),
            },
            Instruction::Sound { id } => {
                debug!("sound {id}");
                state.sounds_played += 1;
            }
            Instruction::Delay { ticks } => effects.delay_ticks += ticks,
            Instruction::SwapJet => match state.dark_mut() {
                Some(dark) => dark.flying = !dark.flying,
                None => debug!("swap_jet ignored outside Dark Side"),
            },
            Instruction::Riddle { index } => {
                let Some(lines) = data.riddles.get(*index) else {
                    warn!("riddle: no riddle {index}");
                    continue;
                };
                let text = lines.join("\n");
                if let Some(castle) = state.castle_mut() {
                    if !castle.riddles_shown.contains(index) {
                        castle.riddles_shown.push(*index);
                    }
                }
                state.push_message(text);
            }
            Instruction::EndGame => {
                if state.game_over.is_none() {
                    state.game_over = Some(EndReason::Scripted);
                }
            }
            Instruction::If {
                test,
                then,
                otherwise,
            } => {
                if evaluate(test, state) {
                    execute(then, data, state, effects);
                } else {
                    execute(otherwise, data, state, effects);
                }
            }
        }
    }
}

fn set_visibility(state: &mut GameState, area: u16, object: u16, visible: Option<bool>) {
    let Some(current) = state.object(area, object) else {
        warn!("visibility change for unknown object {object} in area {area}");
        return;
    };
    state.set_visible(area, object, visible.unwrap_or(!current.visible));
}

pub fn evaluate(test: &Test, state: &GameState) -> bool {
    match test {
        Test::VarEq { var, value } => state.var(*var) == *value,
        Test::VarGtEq { var, value } => state.var(*var) >= *value,
        Test::VarLtEq { var, value } => state.var(*var) <= *value,
        Test::BitSet { bit } => state.bit(*bit),
        Test::BitClear { bit } => !state.bit(*bit),
        Test::Visible { object, area } => state
            .object(area.unwrap_or(state.area), *object)
            .is_some_and(|o| o.visible),
        Test::Invisible { object, area } => state
            .object(area.unwrap_or(state.area), *object)
            .is_some_and(|o| !o.visible),
        Test::Destroyed { object, area } => state
            .object(area.unwrap_or(state.area), *object)
            .is_some_and(|o| o.destroyed),
        Test::Not { inner } => !evaluate(inner, state),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::freescape::data::{VAR_ENERGY, VAR_SCORE, VAR_SHIELD};

    fn data() -> FreescapeData {
        serde_json::from_str(
            r#"{
                "title": "test", "variant": "dark", "start_area": 1,
                "max_shield": 50, "max_energy": 40,
                "messages": ["ACCESS GRANTED"],
                "areas": [
                    {"id": 1, "name": "Plexor", "objects": [
                        {"id": 3, "kind": "cube", "origin": [0, 0, 0], "size": [4, 4, 4]},
                        {"id": 4, "kind": "cube", "origin": [8, 0, 0], "size": [4, 4, 4], "ecd": true}
                    ]},
                    {"id": 2, "name": "Balberith"}
                ]
            }"#,
        )
        .unwrap()
    }

    fn run(script: &str, data: &FreescapeData, state: &mut GameState) -> Effects {
        let instructions: Vec<Instruction> = serde_json::from_str(script).unwrap();
        let mut effects = Effects::default();
        execute(&instructions, data, state, &mut effects);
        effects
    }

    #[test]
    fn variable_ops_clamp_shield_and_energy() {
        let data = data();
        let mut state = GameState::new(&data);
        run(
            r#"[{"op": "add_var", "var": 63, "value": 100},
                {"op": "sub_var", "var": 62, "value": 100},
                {"op": "add_var", "var": 61, "value": 7}]"#,
            &data,
            &mut state,
        );
        assert_eq!(state.var(VAR_SHIELD), 50);
        assert_eq!(state.var(VAR_ENERGY), 0);
        assert_eq!(state.var(VAR_SCORE), 7);
    }

    #[test]
    fn conditionals_and_bits() {
        let data = data();
        let mut state = GameState::new(&data);
        let script = r#"[
            {"op": "toggle_bit", "bit": 2},
            {"op": "if", "test": {"test": "bit_set", "bit": 2},
             "then": [{"op": "print", "message": 0}, {"op": "goto", "area": 2, "entrance": 1}],
             "else": [{"op": "end_game"}]},
            {"op": "delay", "ticks": 5}
        ]"#;
        let effects = run(script, &data, &mut state);
        assert_eq!(effects.goto, Some((2, 1)));
        assert_eq!(effects.delay_ticks, 5);
        assert_eq!(state.messages, vec!["ACCESS GRANTED".to_string()]);
        assert!(state.game_over.is_none());

        run(r#"[{"op": "clear_bit", "bit": 2}]"#, &data, &mut state);
        assert!(evaluate(&Test::BitClear { bit: 2 }, &state));
    }

    #[test]
    fn destroying_ecds_counts_towards_victory() {
        let data = data();
        let mut state = GameState::new(&data);
        assert_eq!(state.dark().unwrap().ecds_total, 1);
        run(
            r#"[{"op": "invisible", "object": 3},
                {"op": "destroy", "object": 4},
                {"op": "destroy", "object": 4},
                {"op": "swap_jet"}]"#,
            &data,
            &mut state,
        );
        assert!(evaluate(
            &Test::Invisible {
                object: 3,
                area: None
            },
            &state
        ));
        assert_eq!(state.dark().unwrap().ecds_destroyed, 1);
        assert!(state.dark().unwrap().flying);
        assert_eq!(state.check_if_game_ended(), Some(EndReason::Victory));
    }
}
