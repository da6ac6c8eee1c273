use log::warn;
use serde::{Deserialize, Serialize};

use crate::event::KeyState;
use crate::input::HardwareInput;

/// What an action emits once one of its inputs fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionEvent {
    CustomEngine(u32),
    Key(KeyState),
    LeftClick,
    RightClick,
    Quit,
}

/// Static table row describing an action and its default bindings.
#[derive(Debug, Clone, Copy)]
pub struct ActionSpec {
    pub id: &'static str,
    pub description: &'static str,
    pub event: ActionEvent,
    pub inputs: &'static [&'static str],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub id: String,
    pub description: String,
    pub event: ActionEvent,
    pub default_inputs: Vec<HardwareInput>,
    inputs: Vec<HardwareInput>,
}

impl Action {
    pub fn new(id: impl Into<String>, description: impl Into<String>, event: ActionEvent) -> Self {
        Action {
            id: id.into(),
            description: description.into(),
            event,
            default_inputs: Vec::new(),
            inputs: Vec::new(),
        }
    }

    pub fn from_spec(spec: &ActionSpec) -> Self {
        let mut action = Action::new(spec.id, spec.description, spec.event);
        for id in spec.inputs {
            match HardwareInput::parse(id) {
                Ok(input) => action.add_default_input(input),
                Err(err) => warn!("action {}: skipping default input: {err}", spec.id),
            }
        }
        action
    }

    pub fn add_default_input(&mut self, input: HardwareInput) {
        if !self.default_inputs.contains(&input) {
            self.default_inputs.push(input);
            self.inputs.push(input);
        }
    }

    pub fn inputs(&self) -> &[HardwareInput] {
        &self.inputs
    }

    pub fn is_bound_to(&self, input: &HardwareInput) -> bool {
        self.inputs.contains(input)
    }

    pub(crate) fn set_inputs(&mut self, inputs: Vec<HardwareInput>) {
        let mut unique = Vec::with_capacity(inputs.len());
        for input in inputs {
            if !unique.contains(&input) {
                unique.push(input);
            }
        }
        self.inputs = unique;
    }

    pub(crate) fn reset_inputs(&mut self) {
        self.inputs = self.default_inputs.clone();
    }
}
