//! Spells the party can cast from memory.

use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::character::CharacterStatus;
use super::combat::inflict_monster_damage;
use super::data::EobData;
use super::rules::{monster_saving_throw, saving_throw_reduce_damage, SAVE_EFFECT_HALF, SAVE_SPELL};
use super::state::EobState;
use crate::rng::RandomSource;

const MAX_MISSILES: i32 = 5;
const MAX_FIREBALL_DICE: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Spell {
    MagicMissile,
    Blur,
    Invisibility,
    Fireball,
    CureLightWounds,
    Bless,
    ProtectionFromEvil,
    Prayer,
    NeutralizePoison,
}

impl Spell {
    /// Mage spells; the rest are granted to clerics and paladins.
    pub fn is_arcane(self) -> bool {
        matches!(
            self,
            Spell::MagicMissile | Spell::Blur | Spell::Invisibility | Spell::Fireball
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            Spell::MagicMissile => "magic missile",
            Spell::Blur => "blur",
            Spell::Invisibility => "invisibility",
            Spell::Fireball => "fireball",
            Spell::CureLightWounds => "cure light wounds",
            Spell::Bless => "bless",
            Spell::ProtectionFromEvil => "protection from evil",
            Spell::Prayer => "prayer",
            Spell::NeutralizePoison => "neutralize poison",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpellError {
    #[error("character {0} cannot cast right now")]
    CasterUnable(usize),
    #[error("{caster} cannot cast {spell}")]
    WrongClass { caster: String, spell: &'static str },
    #[error("{caster} has no {spell} memorized")]
    NotMemorized { caster: String, spell: &'static str },
    #[error("{0} has no target")]
    NoTarget(&'static str),
}

/// Casts `spell` from party member `caster`. Spells without a target fail
/// before the memorized slot is spent.
pub fn cast(
    state: &mut EobState,
    data: &EobData,
    rng: &mut RandomSource,
    caster: usize,
    spell: Spell,
) -> Result<(), SpellError> {
    let Some(character) = state.party.get(caster).filter(|c| c.can_act()) else {
        return Err(SpellError::CasterUnable(caster));
    };
    let allowed = if spell.is_arcane() {
        character.class.casts_arcane()
    } else {
        character.class.casts_divine()
    };
    let name = character.name.clone();
    if !allowed {
        return Err(SpellError::WrongClass {
            caster: name,
            spell: spell.name(),
        });
    }
    let Some(slot) = character.memorized.iter().position(|s| *s == spell) else {
        return Err(SpellError::NotMemorized {
            caster: name,
            spell: spell.name(),
        });
    };
    let level = character.level.max(1);

    let front = state.front_block();
    let target_monsters: Vec<usize> = state
        .monsters
        .iter()
        .enumerate()
        .filter(|(_, m)| m.is_alive() && m.position == front)
        .map(|(i, _)| i)
        .collect();
    let no_target = match spell {
        Spell::MagicMissile | Spell::Fireball => target_monsters.is_empty(),
        Spell::CureLightWounds => !state.party.iter().any(|c| c.is_alive() && c.hp < c.hp_max),
        Spell::NeutralizePoison => !state.party.iter().any(|c| c.is_alive() && c.is_poisoned()),
        _ => false,
    };
    if no_target {
        return Err(SpellError::NoTarget(spell.name()));
    }

    state.party[caster].memorized.remove(slot);
    info!("{name} casts {}", spell.name());
    state.push_message(format!("{name} casts {}", spell.name()));

    match spell {
        Spell::MagicMissile => {
            let missiles = ((level + 1) / 2).min(MAX_MISSILES);
            let damage = (0..missiles).map(|_| rng.roll_dice(1, 4, 1)).sum();
            inflict_monster_damage(state, data, target_monsters[0], damage);
        }
        Spell::Fireball => {
            let damage = rng.roll_dice(level.min(MAX_FIREBALL_DICE), 6, 0);
            for monster in target_monsters {
                let kind = &data.monster_types[state.monsters[monster].monster_type];
                let taken = if monster_saving_throw(rng, kind.level, SAVE_SPELL) {
                    saving_throw_reduce_damage(SAVE_EFFECT_HALF, damage)
                } else {
                    damage
                };
                inflict_monster_damage(state, data, monster, taken);
            }
        }
        Spell::CureLightWounds => {
            let amount = rng.roll_dice(1, 8, 0);
            if let Some(patient) = state
                .party
                .iter_mut()
                .filter(|c| c.is_alive() && c.hp < c.hp_max)
                .min_by_key(|c| c.hp)
            {
                patient.heal(amount);
            }
        }
        Spell::Bless => state.bless = data.timing.bless,
        Spell::Prayer => state.prayer = data.timing.prayer,
        Spell::ProtectionFromEvil => {
            state.party[caster].effects.protection_from_evil = data.timing.protection_from_evil
        }
        Spell::Blur => state.party[caster].effects.blur = data.timing.blur,
        Spell::Invisibility => {
            state.party[caster].effects.invisibility = data.timing.invisibility
        }
        Spell::NeutralizePoison => {
            if let Some(patient) = state
                .party
                .iter_mut()
                .find(|c| c.is_alive() && c.is_poisoned())
            {
                patient.status.remove(CharacterStatus::POISONED);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::eob::character::{test_character, CharacterClass};
    use crate::engines::eob::data::{Dice, Direction, MonsterPlacement, Position};
    use crate::engines::eob::monster::{MonsterCaps, MonsterType};
    use crate::engines::eob::state::tiny_data;

    fn party_with_casters() -> (EobData, EobState) {
        let mut data = tiny_data();
        let mut mage = test_character("Cyd", CharacterClass::Mage);
        mage.level = 9;
        mage.memorized = vec![Spell::MagicMissile, Spell::Fireball, Spell::Blur];
        let mut cleric = test_character("Tod", CharacterClass::Cleric);
        cleric.memorized = vec![Spell::CureLightWounds, Spell::NeutralizePoison, Spell::Bless];
        data.characters.push(mage);
        data.characters.push(cleric);
        data.monster_types.push(MonsterType {
            name: "skeleton".into(),
            level: 1,
            armor_class: 7,
            hit_chance: 20,
            hit_dice: Dice::new(0, 0, 40),
            attacks: vec![Dice::new(1, 6, 0)],
            experience: 60,
            caps: MonsterCaps::empty(),
        });
        data.monsters.push(MonsterPlacement {
            monster_type: 0,
            position: Position::new(2, 1),
            direction: Direction::West,
        });
        let state = EobState::new(&data, &mut RandomSource::new(3));
        (data, state)
    }

    #[test]
    fn magic_missile_scales_with_level_and_spends_the_slot() {
        let (data, mut state) = party_with_casters();
        cast(&mut state, &data, &mut RandomSource::new(1), 1, Spell::MagicMissile).unwrap();
        // Five missiles of 1d4+1.
        let taken = 40 - state.monsters[0].hp;
        assert!((10..=25).contains(&taken), "took {taken}");
        assert_eq!(state.party[1].memorized, vec![Spell::Fireball, Spell::Blur]);
        assert_eq!(
            cast(&mut state, &data, &mut RandomSource::new(1), 1, Spell::MagicMissile),
            Err(SpellError::NotMemorized {
                caster: "Cyd".into(),
                spell: "magic missile"
            })
        );
    }

    #[test]
    fn class_and_condition_gate_casting() {
        let (data, mut state) = party_with_casters();
        let mut rng = RandomSource::new(1);
        assert!(matches!(
            cast(&mut state, &data, &mut rng, 2, Spell::Fireball),
            Err(SpellError::WrongClass { .. })
        ));
        state.party[1].status |= CharacterStatus::PARALYZED;
        assert_eq!(
            cast(&mut state, &data, &mut rng, 1, Spell::Blur),
            Err(SpellError::CasterUnable(1))
        );
        assert_eq!(
            cast(&mut state, &data, &mut rng, 9, Spell::Blur),
            Err(SpellError::CasterUnable(9))
        );
    }

    #[test]
    fn targetless_spells_keep_their_slot() {
        let (data, mut state) = party_with_casters();
        let mut rng = RandomSource::new(1);
        assert_eq!(
            cast(&mut state, &data, &mut rng, 2, Spell::NeutralizePoison),
            Err(SpellError::NoTarget("neutralize poison"))
        );
        state.direction = Direction::West;
        assert_eq!(
            cast(&mut state, &data, &mut rng, 1, Spell::Fireball),
            Err(SpellError::NoTarget("fireball"))
        );
        assert_eq!(state.party[1].memorized.len(), 3);
        assert_eq!(state.party[2].memorized.len(), 3);
    }

    #[test]
    fn fireball_damage_is_bounded_by_its_dice() {
        let (data, mut state) = party_with_casters();
        cast(&mut state, &data, &mut RandomSource::new(8), 1, Spell::Fireball).unwrap();
        // 9d6, halved on a save.
        let taken = 40 - state.monsters[0].hp;
        assert!((4..=54).contains(&taken), "took {taken}");
    }

    #[test]
    fn healing_spells_pick_the_worst_off() {
        let (data, mut state) = party_with_casters();
        let mut rng = RandomSource::new(1);
        state.party[0].hp = 2;
        state.party[1].hp = 5;
        state.party[0].status |= CharacterStatus::POISONED;
        cast(&mut state, &data, &mut rng, 2, Spell::CureLightWounds).unwrap();
        assert!(state.party[0].hp > 2);
        assert_eq!(state.party[1].hp, 5);
        cast(&mut state, &data, &mut rng, 2, Spell::NeutralizePoison).unwrap();
        assert!(!state.party[0].is_poisoned());
        cast(&mut state, &data, &mut rng, 2, Spell::Bless).unwrap();
        assert_eq!(state.bless, data.timing.bless);
        assert!(state.party[2].memorized.is_empty());
    }

    #[test]
    fn blur_protects_the_caster() {
        let (data, mut state) = party_with_casters();
        cast(&mut state, &data, &mut RandomSource::new(1), 1, Spell::Blur).unwrap();
        assert_eq!(state.party[1].effects.blur, data.timing.blur);
        assert_eq!(state.party[0].effects.blur, 0);
    }
}
