//! JSON export of an Eye of the Beholder level: map, party and monsters.

use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

use super::character::Character;
use super::monster::MonsterType;
use crate::error::EngineError;
use crate::rng::RandomSource;

pub const PARTY_SIZE: usize = 6;
/// Largest die count and die size accepted from game data.
pub const MAX_DICE: i32 = 100;
const WALL: char = '#';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum Direction {
    North = 0,
    East = 1,
    South = 2,
    West = 3,
}

impl Direction {
    pub fn turn_left(self) -> Self {
        Direction::from_index(self as u8 + 3)
    }

    pub fn turn_right(self) -> Self {
        Direction::from_index(self as u8 + 1)
    }

    pub fn opposite(self) -> Self {
        Direction::from_index(self as u8 + 2)
    }

    fn from_index(index: u8) -> Self {
        match index % 4 {
            0 => Direction::North,
            1 => Direction::East,
            2 => Direction::South,
            _ => Direction::West,
        }
    }

    /// Grid offset of one step; north is towards row 0.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::East => (1, 0),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
        }
    }
}

/// `times` dice with `pips` sides plus `base`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dice {
    pub times: i32,
    pub pips: i32,
    #[serde(default)]
    pub base: i32,
}

impl Dice {
    pub const fn new(times: i32, pips: i32, base: i32) -> Self {
        Dice { times, pips, base }
    }

    pub fn roll(&self, rng: &mut RandomSource) -> i32 {
        rng.roll_dice(self.times, self.pips, self.base)
    }

    fn in_bounds(&self) -> bool {
        self.times <= MAX_DICE && self.pips <= MAX_DICE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Position { x, y }
    }

    pub fn step(self, direction: Direction) -> Self {
        let (dx, dy) = direction.offset();
        Position::new(self.x + dx, self.y + dy)
    }

    /// Block distance as the game measures it: the larger axis offset.
    pub fn distance(self, other: Position) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }

    pub fn is_adjacent(self, other: Position) -> bool {
        (self.x - other.x).abs() + (self.y - other.y).abs() == 1
    }
}

/// Wall grid; `#` is solid, anything else is floor.
#[derive(Debug, Clone, Deserialize)]
pub struct Level {
    pub width: i32,
    pub height: i32,
    pub rows: Vec<String>,
}

impl Level {
    /// Out-of-bounds blocks count as walls.
    pub fn is_wall(&self, at: Position) -> bool {
        if at.x < 0 || at.y < 0 || at.x >= self.width || at.y >= self.height {
            return true;
        }
        self.rows
            .get(at.y as usize)
            .and_then(|row| row.chars().nth(at.x as usize))
            .map_or(true, |c| c == WALL)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ItemType {
    pub name: String,
    pub damage_small: Dice,
    pub damage_large: Dice,
    /// Enchantment; adds to hit and damage rolls.
    #[serde(default)]
    pub bonus: i32,
    #[serde(default)]
    pub missile: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonsterPlacement {
    pub monster_type: usize,
    pub position: Position,
    pub direction: Direction,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PartyStart {
    pub position: Position,
    pub direction: Direction,
}

/// Timing knobs, all in game ticks unless named otherwise.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Timing {
    pub monster_attack_interval: u32,
    pub attack_cooldown: u32,
    pub poison_interval_secs: u32,
    pub paralysis_secs: u32,
    pub bless: u32,
    pub prayer: u32,
    pub protection_from_evil: u32,
    pub blur: u32,
    pub invisibility: u32,
}

impl Default for Timing {
    fn default() -> Self {
        Timing {
            monster_attack_interval: 10,
            attack_cooldown: 8,
            poison_interval_secs: 8,
            paralysis_secs: 150,
            bless: 600,
            prayer: 600,
            protection_from_evil: 1200,
            blur: 600,
            invisibility: 1200,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EobData {
    pub title: String,
    #[serde(default = "default_ticks_per_second")]
    pub ticks_per_second: u32,
    pub level: Level,
    pub start: PartyStart,
    pub characters: Vec<Character>,
    #[serde(default)]
    pub monster_types: Vec<MonsterType>,
    #[serde(default)]
    pub monsters: Vec<MonsterPlacement>,
    #[serde(default)]
    pub items: Vec<ItemType>,
    #[serde(default)]
    pub timing: Timing,
}

fn default_ticks_per_second() -> u32 {
    10
}

impl EobData {
    pub fn validate(&self) -> Result<(), EngineError> {
        let bad = |msg: String| Err(EngineError::GameData(msg));
        if self.ticks_per_second == 0 {
            return bad("ticks_per_second must be positive".into());
        }
        if self.characters.is_empty() || self.characters.len() > PARTY_SIZE {
            return bad(format!(
                "party must have 1..={PARTY_SIZE} characters, found {}",
                self.characters.len()
            ));
        }
        if self.level.rows.len() != self.level.height as usize
            || self
                .level
                .rows
                .iter()
                .any(|row| row.chars().count() != self.level.width as usize)
        {
            return bad(format!(
                "level rows do not match {}x{}",
                self.level.width, self.level.height
            ));
        }
        if self.level.is_wall(self.start.position) {
            return bad("party starts inside a wall".into());
        }
        for character in &self.characters {
            for stat in [character.strength, character.dexterity, character.constitution] {
                if !(3..=25).contains(&stat) {
                    return bad(format!("{} has an ability score out of 3..=25", character.name));
                }
            }
            if character.weapon.is_some_and(|w| w >= self.items.len()) {
                return bad(format!("{} wields an unknown item", character.name));
            }
        }
        for item in &self.items {
            if !(item.damage_small.in_bounds() && item.damage_large.in_bounds()) {
                return bad(format!("{} rolls more than {MAX_DICE}d{MAX_DICE}", item.name));
            }
        }
        for kind in &self.monster_types {
            if !kind.hit_dice.in_bounds() || kind.attacks.iter().any(|d| !d.in_bounds()) {
                return bad(format!("{} rolls more than {MAX_DICE}d{MAX_DICE}", kind.name));
            }
        }
        for placement in &self.monsters {
            if placement.monster_type >= self.monster_types.len() {
                return bad(format!("unknown monster type {}", placement.monster_type));
            }
            if self.level.is_wall(placement.position) {
                return bad(format!(
                    "monster placed inside a wall at {},{}",
                    placement.position.x, placement.position.y
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directions_turn_and_step() {
        assert_eq!(Direction::North.turn_left(), Direction::West);
        assert_eq!(Direction::West.turn_right(), Direction::North);
        assert_eq!(Direction::East.opposite(), Direction::West);
        let p = Position::new(2, 2);
        assert_eq!(p.step(Direction::North), Position::new(2, 1));
        assert!(p.is_adjacent(Position::new(3, 2)));
        assert!(!p.is_adjacent(Position::new(3, 3)));
        assert_eq!(p.distance(Position::new(5, 0)), 3);
    }

    #[test]
    fn walls_and_bounds() {
        let level = Level {
            width: 3,
            height: 2,
            rows: vec!["#..".into(), "..#".into()],
        };
        assert!(level.is_wall(Position::new(0, 0)));
        assert!(!level.is_wall(Position::new(1, 0)));
        assert!(level.is_wall(Position::new(2, 1)));
        assert!(level.is_wall(Position::new(-1, 0)));
        assert!(level.is_wall(Position::new(0, 2)));
    }

    #[test]
    fn directions_use_numeric_wire_values() {
        let parsed: Vec<Direction> = serde_json::from_str("[0, 1, 2, 3]").unwrap();
        assert_eq!(
            parsed,
            vec![
                Direction::North,
                Direction::East,
                Direction::South,
                Direction::West
            ]
        );
    }

    #[test]
    fn oversized_dice_are_rejected() {
        use super::super::monster::{MonsterCaps, MonsterType};
        use super::super::state::tiny_data;

        let mut data = tiny_data();
        data.monster_types.push(MonsterType {
            name: "tarrasque".into(),
            level: 20,
            armor_class: -3,
            hit_chance: 1,
            hit_dice: Dice::new(MAX_DICE, 8, 0),
            attacks: vec![Dice::new(1, 6, 0)],
            experience: 1,
            caps: MonsterCaps::empty(),
        });
        assert!(data.validate().is_ok());

        data.monster_types[0].attacks.push(Dice::new(i32::MAX, 6, 0));
        let err = data.validate().unwrap_err();
        assert!(err.to_string().contains("tarrasque"), "{err}");

        let mut data = tiny_data();
        data.items.push(ItemType {
            name: "vorpal".into(),
            damage_small: Dice::new(1, 8, 0),
            damage_large: Dice::new(1, MAX_DICE + 1, 0),
            bonus: 0,
            missile: false,
        });
        assert!(data.validate().is_err());
    }
}
