use bitflags::bitflags;
use serde::de::Error as _;
use serde::{Deserialize, Serialize};

use super::data::{Dice, Direction, MonsterPlacement, Position};
use crate::rng::RandomSource;

bitflags! {
    /// Special capabilities of a monster type.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct MonsterCaps: u32 {
        /// Takes large-creature weapon damage.
        const LARGE = 0x0001;
        const POISON = 0x0010;
        const PARALYZE = 0x0020;
        const MULTI_TARGET = 0x4000;
        const PETRIFY = 0x8000;
    }
}

// Game data lists capabilities by name.
impl Serialize for MonsterCaps {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let names: Vec<&str> = self.iter_names().map(|(name, _)| name).collect();
        names.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for MonsterCaps {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let names = Vec::<String>::deserialize(deserializer)?;
        names.iter().try_fold(MonsterCaps::empty(), |caps, name| {
            MonsterCaps::from_name(name)
                .map(|flag| caps | flag)
                .ok_or_else(|| D::Error::custom(format!("unknown monster capability {name}")))
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonsterType {
    pub name: String,
    pub level: i32,
    pub armor_class: i32,
    /// Base to-hit number; the character's AC is subtracted from it.
    pub hit_chance: i32,
    pub hit_dice: Dice,
    /// One damage roll per attack per round.
    pub attacks: Vec<Dice>,
    pub experience: u32,
    #[serde(default)]
    pub caps: MonsterCaps,
}

/// A monster placed on the level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Monster {
    pub monster_type: usize,
    pub position: Position,
    pub direction: Direction,
    pub hp: i32,
    pub hp_max: i32,
}

impl Monster {
    pub fn spawn(placement: &MonsterPlacement, kind: &MonsterType, rng: &mut RandomSource) -> Self {
        let hp = kind.hit_dice.roll(rng).max(1);
        Monster {
            monster_type: placement.monster_type,
            position: placement.position,
            direction: placement.direction,
            hp,
            hp_max: hp,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }
}
