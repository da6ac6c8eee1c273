use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

use super::rules::SaveClass;
use super::spells::Spell;

/// Races in the order the save tables index them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum Race {
    Human = 0,
    Elf = 1,
    HalfElf = 2,
    Dwarf = 3,
    Gnome = 4,
    Halfling = 5,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharacterClass {
    Fighter,
    Ranger,
    Paladin,
    Mage,
    Cleric,
    Thief,
}

impl CharacterClass {
    pub fn save_class(self) -> SaveClass {
        match self {
            CharacterClass::Fighter | CharacterClass::Ranger | CharacterClass::Paladin => {
                SaveClass::Warrior
            }
            CharacterClass::Mage => SaveClass::Wizard,
            CharacterClass::Cleric => SaveClass::Priest,
            CharacterClass::Thief => SaveClass::Rogue,
        }
    }

    pub fn casts_arcane(self) -> bool {
        self == CharacterClass::Mage
    }

    pub fn casts_divine(self) -> bool {
        matches!(self, CharacterClass::Cleric | CharacterClass::Paladin)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CharacterStatus: u8 {
        const ACTIVE = 0x01;
        const POISONED = 0x02;
        const PARALYZED = 0x04;
        const PETRIFIED = 0x08;
    }
}

impl Default for CharacterStatus {
    fn default() -> Self {
        CharacterStatus::ACTIVE
    }
}

impl Serialize for CharacterStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.bits().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CharacterStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let bits = u8::deserialize(deserializer)?;
        Ok(CharacterStatus::from_bits_truncate(bits))
    }
}

/// Remaining ticks of each timed effect on one character.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterEffects {
    pub protection_from_evil: u32,
    pub blur: u32,
    pub invisibility: u32,
}

impl CharacterEffects {
    pub fn tick(&mut self) {
        for remaining in [
            &mut self.protection_from_evil,
            &mut self.blur,
            &mut self.invisibility,
        ] {
            *remaining = remaining.saturating_sub(1);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub name: String,
    pub race: Race,
    pub class: CharacterClass,
    pub level: i32,
    pub strength: i32,
    /// Exceptional strength (18/xx); 0 when absent.
    #[serde(default)]
    pub strength_ext: i32,
    pub dexterity: i32,
    pub constitution: i32,
    pub hp: i32,
    pub hp_max: i32,
    pub armor_class: i32,
    #[serde(default)]
    pub weapon: Option<usize>,
    /// Spells the character prepares when resting.
    #[serde(default)]
    pub prepared: Vec<Spell>,
    #[serde(default)]
    pub memorized: Vec<Spell>,
    #[serde(default)]
    pub experience: u32,
    #[serde(default)]
    pub status: CharacterStatus,
    #[serde(default)]
    pub effects: CharacterEffects,
    #[serde(default)]
    pub cooldown: u32,
    #[serde(default)]
    pub paralysis_secs: u32,
}

impl Character {
    /// In the party and not dead or petrified; unconscious counts.
    pub fn is_alive(&self) -> bool {
        self.status.contains(CharacterStatus::ACTIVE)
            && self.hp > -10
            && !self.status.contains(CharacterStatus::PETRIFIED)
    }

    pub fn is_conscious(&self) -> bool {
        self.is_alive() && self.hp > 0
    }

    /// Conscious and neither paralyzed nor petrified.
    pub fn can_act(&self) -> bool {
        self.is_conscious()
            && !self
                .status
                .intersects(CharacterStatus::PARALYZED | CharacterStatus::PETRIFIED)
    }

    pub fn is_invisible(&self) -> bool {
        self.effects.invisibility > 0
    }

    pub fn is_poisoned(&self) -> bool {
        self.status.contains(CharacterStatus::POISONED)
    }

    /// Adds hit points to a living character, up to the maximum.
    pub fn heal(&mut self, points: i32) -> i32 {
        if !self.is_alive() {
            return 0;
        }
        let before = self.hp;
        self.hp = (self.hp + points).min(self.hp_max);
        self.hp - before
    }

    pub fn clear_effects(&mut self) {
        self.effects = CharacterEffects::default();
        self.paralysis_secs = 0;
    }
}

#[cfg(test)]
pub(crate) fn test_character(name: &str, class: CharacterClass) -> Character {
    Character {
        name: name.to_string(),
        race: Race::Human,
        class,
        level: 1,
        strength: 12,
        strength_ext: 0,
        dexterity: 12,
        constitution: 12,
        hp: 10,
        hp_max: 10,
        armor_class: 10,
        weapon: None,
        prepared: Vec::new(),
        memorized: Vec::new(),
        experience: 0,
        status: CharacterStatus::ACTIVE,
        effects: CharacterEffects::default(),
        cooldown: 0,
        paralysis_secs: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn life_states_follow_hit_points_and_status() {
        let mut c = test_character("Anya", CharacterClass::Fighter);
        assert!(c.can_act());
        c.hp = 0;
        assert!(c.is_alive() && !c.is_conscious());
        c.hp = -10;
        assert!(!c.is_alive());
        c.hp = 5;
        c.status |= CharacterStatus::PARALYZED;
        assert!(c.is_conscious() && !c.can_act());
        c.status = CharacterStatus::ACTIVE | CharacterStatus::PETRIFIED;
        assert!(!c.is_alive());
    }

    #[test]
    fn healing_caps_at_maximum_and_skips_the_dead() {
        let mut c = test_character("Tod", CharacterClass::Cleric);
        c.hp = 4;
        assert_eq!(c.heal(20), 6);
        assert_eq!(c.hp, 10);
        c.hp = -10;
        assert_eq!(c.heal(5), 0);
    }

    #[test]
    fn status_serializes_as_bits() {
        let status = CharacterStatus::ACTIVE | CharacterStatus::POISONED;
        assert_eq!(serde_json::to_string(&status).unwrap(), "3");
        let back: CharacterStatus = serde_json::from_str("5").unwrap();
        assert!(back.contains(CharacterStatus::PARALYZED));
    }
}
