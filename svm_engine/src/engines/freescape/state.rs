use std::collections::BTreeMap;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::data::{FreescapeData, Variant, VAR_ENERGY, VAR_KEYS, VAR_SCORE, VAR_SHIELD};

const MESSAGE_LOG_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectState {
    pub visible: bool,
    pub destroyed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    ShieldExhausted,
    EnergyExhausted,
    TimeOut,
    StrengthExhausted,
    OvercomeBySpirits,
    Scripted,
    Victory,
}

impl EndReason {
    pub fn message(self) -> &'static str {
        match self {
            EndReason::ShieldExhausted => "SHIELD EXHAUSTED",
            EndReason::EnergyExhausted => "ENERGY EXHAUSTED",
            EndReason::TimeOut => "TIME OUT",
            EndReason::StrengthExhausted => "STRENGTH EXHAUSTED",
            EndReason::OvercomeBySpirits => "OVERCOME BY SPIRITS",
            EndReason::Scripted => "GAME OVER",
            EndReason::Victory => "MISSION ACCOMPLISHED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CastleState {
    pub spirits_meter: i32,
    pub spirits_max: i32,
    pub strength: i32,
    pub riddles_shown: Vec<usize>,
    pub crouched: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DarkState {
    pub flying: bool,
    pub ecds_total: u32,
    pub ecds_destroyed: u32,
    pub countdown: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "variant", rename_all = "lowercase")]
pub enum VariantState {
    Castle(CastleState),
    Dark(DarkState),
}

/// Key packing an area id and an object id.
pub fn object_key(area: u16, object: u16) -> u32 {
    ((area as u32) << 16) | object as u32
}

/// Everything about a Freescape game that changes while playing; this is
/// what a save slot stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub vars: BTreeMap<u16, i32>,
    pub bits: u32,
    pub area: u16,
    pub position: [f32; 3],
    pub yaw: f32,
    pub pitch: f32,
    pub objects: BTreeMap<u32, ObjectState>,
    pub variant: VariantState,
    pub ticks: u64,
    pub seconds: u64,
    pub delay_ticks: u32,
    pub sensor_timers: BTreeMap<u16, u32>,
    pub game_over: Option<EndReason>,
    pub messages: Vec<String>,
    pub sounds_played: u32,
}

impl GameState {
    pub fn new(data: &FreescapeData) -> Self {
        let mut vars = data.initial_vars.clone();
        vars.entry(VAR_SHIELD).or_insert(data.max_shield);
        vars.entry(VAR_ENERGY).or_insert(data.max_energy);
        vars.entry(VAR_SCORE).or_insert(0);
        vars.entry(VAR_KEYS).or_insert(0);

        let mut objects = BTreeMap::new();
        let mut ecds_total = 0;
        for area in &data.areas {
            for object in &area.objects {
                objects.insert(
                    object_key(area.id, object.id),
                    ObjectState {
                        visible: !object.invisible,
                        destroyed: object.destroyed,
                    },
                );
                if object.ecd && !object.destroyed {
                    ecds_total += 1;
                }
            }
        }

        let variant = match data.variant {
            Variant::Castle => {
                let (spirits_max, strength) = data
                    .castle
                    .as_ref()
                    .map(|c| (c.spirits_max, c.strength))
                    .unwrap_or((10, 10));
                VariantState::Castle(CastleState {
                    spirits_meter: 0,
                    spirits_max,
                    strength,
                    riddles_shown: Vec::new(),
                    crouched: false,
                })
            }
            Variant::Dark => VariantState::Dark(DarkState {
                flying: false,
                ecds_total,
                ecds_destroyed: 0,
                countdown: data.dark.as_ref().and_then(|d| d.countdown),
            }),
        };

        GameState {
            vars,
            bits: 0,
            area: data.start_area,
            position: [0.0; 3],
            yaw: 0.0,
            pitch: 0.0,
            objects,
            variant,
            ticks: 0,
            seconds: 0,
            delay_ticks: 0,
            sensor_timers: BTreeMap::new(),
            game_over: None,
            messages: Vec::new(),
            sounds_played: 0,
        }
    }

    pub fn var(&self, var: u16) -> i32 {
        self.vars.get(&var).copied().unwrap_or(0)
    }

    /// Sets a variable; shield and energy are kept within `0..=max`.
    pub fn set_var(&mut self, data: &FreescapeData, var: u16, value: i32) {
        let value = match var {
            VAR_SHIELD => value.clamp(0, data.max_shield),
            VAR_ENERGY => value.clamp(0, data.max_energy),
            _ => value,
        };
        self.vars.insert(var, value);
    }

    pub fn add_var(&mut self, data: &FreescapeData, var: u16, delta: i32) {
        let value = self.var(var).saturating_add(delta);
        self.set_var(data, var, value);
    }

    pub fn bit(&self, bit: u8) -> bool {
        bit < 32 && self.bits & (1 << bit) != 0
    }

    pub fn set_bit(&mut self, bit: u8, on: bool) {
        if bit >= 32 {
            return;
        }
        if on {
            self.bits |= 1 << bit;
        } else {
            self.bits &= !(1 << bit);
        }
    }

    pub fn object(&self, area: u16, object: u16) -> Option<ObjectState> {
        self.objects.get(&object_key(area, object)).copied()
    }

    pub fn is_present(&self, area: u16, object: u16) -> bool {
        self.object(area, object)
            .is_some_and(|o| o.visible && !o.destroyed)
    }

    pub fn set_visible(&mut self, area: u16, object: u16, visible: bool) -> bool {
        match self.objects.get_mut(&object_key(area, object)) {
            Some(state) => {
                state.visible = visible;
                true
            }
            None => false,
        }
    }

    /// Marks an object destroyed; returns false if it already was or does not
    /// exist. Destroyed ECDs are counted.
    pub fn destroy(&mut self, data: &FreescapeData, area: u16, object: u16) -> bool {
        let Some(state) = self.objects.get_mut(&object_key(area, object)) else {
            return false;
        };
        if state.destroyed {
            return false;
        }
        state.destroyed = true;
        let is_ecd = data.object(area, object).is_some_and(|o| o.ecd);
        if let (true, VariantState::Dark(dark)) = (is_ecd, &mut self.variant) {
            dark.ecds_destroyed += 1;
        }
        true
    }

    pub fn position(&self) -> Vec3 {
        Vec3::from(self.position)
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position.to_array();
    }

    pub fn push_message(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
        if self.messages.len() > MESSAGE_LOG_LEN {
            let excess = self.messages.len() - MESSAGE_LOG_LEN;
            self.messages.drain(..excess);
        }
    }

    pub fn castle(&self) -> Option<&CastleState> {
        match &self.variant {
            VariantState::Castle(castle) => Some(castle),
            VariantState::Dark(_) => None,
        }
    }

    pub fn castle_mut(&mut self) -> Option<&mut CastleState> {
        match &mut self.variant {
            VariantState::Castle(castle) => Some(castle),
            VariantState::Dark(_) => None,
        }
    }

    pub fn dark(&self) -> Option<&DarkState> {
        match &self.variant {
            VariantState::Dark(dark) => Some(dark),
            VariantState::Castle(_) => None,
        }
    }

    pub fn dark_mut(&mut self) -> Option<&mut DarkState> {
        match &mut self.variant {
            VariantState::Dark(dark) => Some(dark),
            VariantState::Castle(_) => None,
        }
    }

    /// Decides whether the game has ended; the first reason found sticks.
    pub fn check_if_game_ended(&mut self) -> Option<EndReason> {
        if self.game_over.is_some() {
            return self.game_over;
        }
        let reason = if self.var(VAR_SHIELD) <= 0 {
            Some(EndReason::ShieldExhausted)
        } else if self.var(VAR_ENERGY) <= 0 {
            Some(EndReason::EnergyExhausted)
        } else {
            match &self.variant {
                VariantState::Castle(castle) if castle.strength <= 0 => {
                    Some(EndReason::StrengthExhausted)
                }
                VariantState::Castle(castle) if castle.spirits_meter >= castle.spirits_max => {
                    Some(EndReason::OvercomeBySpirits)
                }
                VariantState::Dark(dark) if dark.countdown == Some(0) => Some(EndReason::TimeOut),
                VariantState::Dark(dark)
                    if dark.ecds_total > 0 && dark.ecds_destroyed >= dark.ecds_total =>
                {
                    Some(EndReason::Victory)
                }
                _ => None,
            }
        };
        self.game_over = reason;
        reason
    }
}
