//! JSON export of a Freescape game: areas, objects and condition scripts.

use std::collections::BTreeMap;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

pub const VAR_SHIELD: u16 = 63;
pub const VAR_ENERGY: u16 = 62;
pub const VAR_SCORE: u16 = 61;
pub const VAR_KEYS: u16 = 60;

/// Entrance id that keeps the player where they are on area change.
pub const KEEP_POSITION: i16 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Castle,
    Dark,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FreescapeData {
    pub title: String,
    pub variant: Variant,
    pub start_area: u16,
    #[serde(default)]
    pub start_entrance: i16,
    #[serde(default = "default_ticks_per_second")]
    pub ticks_per_second: u32,
    #[serde(default)]
    pub initial_vars: BTreeMap<u16, i32>,
    pub max_shield: i32,
    pub max_energy: i32,
    #[serde(default = "default_max_fall")]
    pub max_fall: f32,
    #[serde(default = "default_step_height")]
    pub step_height: f32,
    #[serde(default = "default_player_height")]
    pub player_height: f32,
    #[serde(default = "default_player_radius")]
    pub player_radius: f32,
    #[serde(default)]
    pub messages: Vec<String>,
    #[serde(default)]
    pub riddles: Vec<Vec<String>>,
    #[serde(default)]
    pub global_conditions: Vec<Condition>,
    pub areas: Vec<Area>,
    #[serde(default)]
    pub castle: Option<CastleSettings>,
    #[serde(default)]
    pub dark: Option<DarkSettings>,
}

fn default_ticks_per_second() -> u32 {
    10
}

fn default_max_fall() -> f32 {
    16.0
}

fn default_step_height() -> f32 {
    4.0
}

fn default_player_height() -> f32 {
    12.0
}

fn default_player_radius() -> f32 {
    2.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct CastleSettings {
    pub spirits_max: i32,
    pub strength: i32,
    #[serde(default = "default_reach")]
    pub activate_reach: f32,
}

fn default_reach() -> f32 {
    12.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct DarkSettings {
    /// Seconds until the weapon fires; absent means no time limit.
    #[serde(default)]
    pub countdown: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Area {
    pub id: u16,
    pub name: String,
    #[serde(default = "default_scale")]
    pub scale: f32,
    /// RGB entries indexed by object color.
    #[serde(default)]
    pub palette: Vec<[u8; 3]>,
    #[serde(default)]
    pub objects: Vec<Object>,
    #[serde(default)]
    pub entrances: Vec<Entrance>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

fn default_scale() -> f32 {
    4.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Cube,
    Wedge,
    Pyramid,
    Rectangle,
    Sensor,
    Group,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Object {
    pub id: u16,
    pub kind: ObjectKind,
    pub origin: [f32; 3],
    #[serde(default)]
    pub size: [f32; 3],
    #[serde(default)]
    pub color: u8,
    #[serde(default)]
    pub invisible: bool,
    #[serde(default)]
    pub destroyed: bool,
    #[serde(default = "default_solid")]
    pub solid: bool,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub sensor: Option<SensorSpec>,
    /// Energy collection device (Dark Side victory target).
    #[serde(default)]
    pub ecd: bool,
    /// Castle Master spirit; its fire feeds the spirit meter.
    #[serde(default)]
    pub ghost: bool,
}

fn default_solid() -> bool {
    true
}

impl Object {
    pub fn min(&self) -> Vec3 {
        Vec3::from(self.origin)
    }

    pub fn max(&self) -> Vec3 {
        Vec3::from(self.origin) + Vec3::from(self.size)
    }

    pub fn center(&self) -> Vec3 {
        (self.min() + self.max()) * 0.5
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SensorSpec {
    pub firing_range: f32,
    /// Game ticks between shots.
    pub firing_interval: u32,
    pub damage: i32,
    /// Axes along which the sensor looks; empty means every direction.
    #[serde(default)]
    pub axes: Vec<Axis>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Entrance {
    pub id: i16,
    pub position: [f32; 3],
    #[serde(default)]
    pub yaw: f32,
    #[serde(default)]
    pub pitch: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    Shot,
    Collided,
    Activated,
    Timer,
    Always,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Condition {
    pub trigger: Trigger,
    pub instructions: Vec<Instruction>,
}

/// Freescape command language, one variant per opcode.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Instruction {
    AddVar {
        var: u16,
        value: i32,
    },
    SubVar {
        var: u16,
        value: i32,
    },
    SetVar {
        var: u16,
        value: i32,
    },
    SetBit {
        bit: u8,
    },
    ClearBit {
        bit: u8,
    },
    ToggleBit {
        bit: u8,
    },
    Goto {
        area: u16,
        #[serde(default = "keep_position")]
        entrance: i16,
    },
    Visible {
        object: u16,
        #[serde(default)]
        area: Option<u16>,
    },
    Invisible {
        object: u16,
        #[serde(default)]
        area: Option<u16>,
    },
    ToggleVisibility {
        object: u16,
        #[serde(default)]
        area: Option<u16>,
    },
    Destroy {
        object: u16,
        #[serde(default)]
        area: Option<u16>,
    },
    Print {
        message: usize,
    },
    Sound {
        id: u16,
    },
    Delay {
        ticks: u32,
    },
    SwapJet,
    Riddle {
        index: usize,
    },
    EndGame,
    If {
        test: Test,
        #[serde(default)]
        then: Vec<Instruction>,
        #[serde(default, rename = "else")]
        otherwise: Vec<Instruction>,
    },
}

fn keep_position() -> i16 {
    KEEP_POSITION
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "test", rename_all = "snake_case")]
pub enum Test {
    VarEq {
        var: u16,
        value: i32,
    },
    VarGtEq {
        var: u16,
        value: i32,
    },
    VarLtEq {
        var: u16,
        value: i32,
    },
    BitSet {
        bit: u8,
    },
    BitClear {
        bit: u8,
    },
    Visible {
        object: u16,
        #[serde(default)]
        area: Option<u16>,
    },
    Invisible {
        object: u16,
        #[serde(default)]
        area: Option<u16>,
    },
    Destroyed {
        object: u16,
        #[serde(default)]
        area: Option<u16>,
    },
    Not {
        inner: Box<Test>,
    },
}

impl FreescapeData {
    pub fn area(&self, id: u16) -> Option<&Area> {
        self.areas.iter().find(|a| a.id == id)
    }

    pub fn object(&self, area: u16, object: u16) -> Option<&Object> {
        self.area(area)?.objects.iter().find(|o| o.id == object)
    }

    /// Cross-reference checks the JSON schema cannot express.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.ticks_per_second == 0 {
            return Err(EngineError::GameData("ticks_per_second must be positive".into()));
        }
        if self.area(self.start_area).is_none() {
            return Err(EngineError::GameData(format!(
                "start area {} does not exist",
                self.start_area
            )));
        }
        for area in &self.areas {
            if area.scale <= 0.0 {
                return Err(EngineError::GameData(format!(
                    "area {} has non-positive scale",
                    area.id
                )));
            }
            if self.areas.iter().filter(|a| a.id == area.id).count() > 1 {
                return Err(EngineError::GameData(format!("area {} is defined twice", area.id)));
            }
            for object in &area.objects {
                if object.size.iter().any(|s| *s < 0.0) {
                    return Err(EngineError::GameData(format!(
                        "object {} in area {} has a negative size",
                        object.id, area.id
                    )));
                }
                if object.kind == ObjectKind::Sensor && object.sensor.is_none() {
                    return Err(EngineError::GameData(format!(
                        "sensor {} in area {} lacks firing parameters",
                        object.id, area.id
                    )));
                }
            }
        }
        match self.variant {
            Variant::Castle if self.castle.is_none() => {
                Err(EngineError::GameData("castle variant needs castle settings".into()))
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instructions_parse_from_tagged_json() {
        let raw = r#"[
            {"op": "add_var", "var": 61, "value": 5},
            {"op": "goto", "area": 2},
            {"op": "if", "test": {"test": "not", "inner": {"test": "bit_set", "bit": 3}},
             "then": [{"op": "swap_jet"}], "else": [{"op": "end_game"}]}
        ]"#;
        let parsed: Vec<Instruction> = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed[0], Instruction::AddVar { var: VAR_SCORE, value: 5 });
        assert_eq!(
            parsed[1],
            Instruction::Goto {
                area: 2,
                entrance: KEEP_POSITION
            }
        );
        let Instruction::If { test, then, otherwise } = &parsed[2] else {
            panic!("expected if");
        };
        assert_eq!(
            *test,
            Test::Not {
                inner: Box::new(Test::BitSet { bit: 3 })
            }
        );
        assert_eq!(then, &vec![Instruction::SwapJet]);
        assert_eq!(otherwise, &vec![Instruction::EndGame]);
    }

    #[test]
    fn validation_rejects_dangling_start_area() {
        let raw = r#"{
            "title": "broken", "variant": "dark", "start_area": 9,
            "max_shield": 10, "max_energy": 10,
            "areas": [{"id": 1, "name": "one"}]
        }"#;
        let data: FreescapeData = serde_json::from_str(raw).unwrap();
        assert!(matches!(data.validate(), Err(EngineError::GameData(_))));
    }
}
