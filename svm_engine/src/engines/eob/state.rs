use serde::{Deserialize, Serialize};

use super::character::Character;
use super::data::{Direction, EobData, Position};
use super::monster::Monster;
use crate::rng::RandomSource;

const MESSAGE_LOG_LEN: usize = 16;

/// Everything a save game has to restore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EobState {
    pub party: Vec<Character>,
    pub monsters: Vec<Monster>,
    pub position: Position,
    pub direction: Direction,
    /// Remaining ticks of the party-wide bless.
    pub bless: u32,
    pub prayer: u32,
    pub ticks: u64,
    pub seconds: u64,
    pub game_over: bool,
    pub messages: Vec<String>,
}

impl EobState {
    pub fn new(data: &EobData, rng: &mut RandomSource) -> Self {
        let monsters = data
            .monsters
            .iter()
            .map(|placement| {
                Monster::spawn(placement, &data.monster_types[placement.monster_type], rng)
            })
            .collect();
        EobState {
            party: data.characters.clone(),
            monsters,
            position: data.start.position,
            direction: data.start.direction,
            bless: 0,
            prayer: 0,
            ticks: 0,
            seconds: 0,
            game_over: false,
            messages: Vec::new(),
        }
    }

    pub fn front_block(&self) -> Position {
        self.position.step(self.direction)
    }

    /// Index of the living monster standing on `at`.
    pub fn monster_at(&self, at: Position) -> Option<usize> {
        self.monsters
            .iter()
            .position(|m| m.is_alive() && m.position == at)
    }

    pub fn is_blocked(&self, data: &EobData, at: Position) -> bool {
        data.level.is_wall(at) || self.monster_at(at).is_some() || at == self.position
    }

    pub fn party_can_act(&self) -> bool {
        self.party.iter().any(Character::can_act)
    }

    pub fn push_message(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
        if self.messages.len() > MESSAGE_LOG_LEN {
            let excess = self.messages.len() - MESSAGE_LOG_LEN;
            self.messages.drain(..excess);
        }
    }

    /// Counts down party and character effects by one tick.
    pub fn tick_effects(&mut self) {
        self.bless = self.bless.saturating_sub(1);
        self.prayer = self.prayer.saturating_sub(1);
        for character in &mut self.party {
            character.effects.tick();
            character.cooldown = character.cooldown.saturating_sub(1);
        }
    }
}

/// A 2x1 corridor facing east with one fighter.
#[cfg(test)]
pub(crate) fn tiny_data() -> EobData {
    use super::character::{test_character, CharacterClass};
    use super::data::{Level, PartyStart};

    EobData {
        title: "Cellar".into(),
        ticks_per_second: 10,
        level: Level {
            width: 4,
            height: 3,
            rows: vec!["####".into(), "#..#".into(), "####".into()],
        },
        start: PartyStart {
            position: Position::new(1, 1),
            direction: Direction::East,
        },
        characters: vec![test_character("Anya", CharacterClass::Fighter)],
        monster_types: Vec::new(),
        monsters: Vec::new(),
        items: Vec::new(),
        timing: Default::default(),
    }
}
