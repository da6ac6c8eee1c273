//! Damage resolution between the party and monsters.

use log::{debug, info};

use super::character::{Character, CharacterStatus};
use super::data::{EobData, Position};
use super::monster::MonsterCaps;
use super::rules::{
    character_hit_test, character_saving_throw, monster_hit_test, strength_damage_modifier,
    NO_SAVE, SAVE_PARALYZE, SAVE_PETRIFY,
};
use super::state::EobState;
use crate::rng::RandomSource;

/// Characters below this hit point total are dead.
pub const DEATH_HP: i32 = -10;
/// Only the front rank reaches with hand weapons.
const FRONT_RANK: usize = 2;
/// Blocks a missile travels before dropping.
const MISSILE_RANGE: i32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackOutcome {
    /// The character is missing, busy or cannot act.
    Unable,
    OutOfReach,
    NoTarget,
    Miss,
    Hit { damage: i32, killed: bool },
}

/// Subtracts `damage` from a living character; at `DEATH_HP` the
/// character dies and loses every status and effect.
pub fn inflict_character_damage(character: &mut Character, damage: i32) {
    if !character.is_alive() {
        return;
    }
    character.hp -= damage;
    if character.hp <= DEATH_HP {
        character.hp = DEATH_HP;
        character.status &= CharacterStatus::ACTIVE;
        character.clear_effects();
        info!("{} dies", character.name);
    }
}

/// Splits `points` evenly among the living characters.
pub fn award_experience(party: &mut [Character], points: u32) {
    let living = party.iter().filter(|c| c.is_alive()).count() as u32;
    if living == 0 {
        return;
    }
    let share = points / living;
    for character in party.iter_mut().filter(|c| c.is_alive()) {
        character.experience += share;
    }
}

/// Returns true when the hit killed the monster.
pub fn inflict_monster_damage(
    state: &mut EobState,
    data: &EobData,
    monster: usize,
    damage: i32,
) -> bool {
    let Some(target) = state.monsters.get_mut(monster) else {
        return false;
    };
    if !target.is_alive() {
        return false;
    }
    target.hp -= damage;
    if target.hp > 0 {
        return false;
    }
    let kind = &data.monster_types[target.monster_type];
    info!("{} destroyed, {} experience", kind.name, kind.experience);
    state.push_message(format!("{} is destroyed", kind.name));
    award_experience(&mut state.party, kind.experience);
    true
}

/// Applies `flag` unless the character already has it, is dead or saves.
/// Petrification replaces every other status.
pub fn status_attack(
    rng: &mut RandomSource,
    character: &mut Character,
    flag: CharacterStatus,
    save_type: u8,
    duration_secs: u32,
) -> bool {
    if character.status.contains(flag) || !character.is_alive() {
        return false;
    }
    if save_type != NO_SAVE && character_saving_throw(rng, character, save_type) {
        debug!("{} saves against {flag:?}", character.name);
        return false;
    }
    if flag.contains(CharacterStatus::PETRIFIED) {
        character.clear_effects();
        character.status = CharacterStatus::ACTIVE | CharacterStatus::PETRIFIED;
    } else {
        character.status |= flag;
    }
    if flag.contains(CharacterStatus::PARALYZED) {
        character.paralysis_secs = duration_secs;
    }
    true
}

/// Front rank first; a coin decides which side of each rank goes first.
fn attack_order(rng: &mut RandomSource) -> [usize; 6] {
    if rng.roll_dice(1, 2, -1) == 0 {
        [0, 1, 2, 3, 4, 5]
    } else {
        [1, 0, 3, 2, 5, 4]
    }
}

/// Melee round of one monster against the party. Returns the characters
/// it engaged with the damage each took.
pub fn monster_close_attack(
    state: &mut EobState,
    data: &EobData,
    rng: &mut RandomSource,
    monster: usize,
) -> Vec<(usize, i32)> {
    let mut engaged = Vec::new();
    let Some(attacker) = state.monsters.get(monster).filter(|m| m.is_alive()) else {
        return engaged;
    };
    let kind = &data.monster_types[attacker.monster_type];
    let prayer = state.prayer > 0;

    for index in attack_order(rng) {
        let Some(character) = state.party.get_mut(index) else {
            continue;
        };
        if !character.is_alive() {
            continue;
        }
        if character.is_invisible() && rng.roll_dice(1, 20, 0) >= 5 {
            continue;
        }

        let mut damage = 0;
        for attack in &kind.attacks {
            if monster_hit_test(rng, kind.hit_chance, character, prayer) {
                damage += attack.roll(rng);
            }
        }

        let name = character.name.clone();
        let mut notes = Vec::new();
        if damage > 0 {
            inflict_character_damage(character, damage);
            if kind.caps.contains(MonsterCaps::POISON)
                && status_attack(rng, character, CharacterStatus::POISONED, SAVE_PARALYZE, 0)
            {
                notes.push(format!("{name} is poisoned"));
            }
            if kind.caps.contains(MonsterCaps::PARALYZE)
                && status_attack(
                    rng,
                    character,
                    CharacterStatus::PARALYZED,
                    SAVE_PETRIFY,
                    data.timing.paralysis_secs,
                )
            {
                notes.push(format!("{name} is paralyzed"));
            }
            if kind.caps.contains(MonsterCaps::PETRIFY)
                && status_attack(rng, character, CharacterStatus::PETRIFIED, SAVE_PETRIFY, 0)
            {
                notes.push(format!("{name} is turned to stone"));
            }
            debug!("{} hits {name} for {damage}", kind.name);
            notes.insert(0, format!("{} hits {name} for {damage}", kind.name));
        } else {
            notes.push(format!("{} misses {name}", kind.name));
        }
        for note in notes {
            state.push_message(note);
        }
        engaged.push((index, damage));

        if !kind.caps.contains(MonsterCaps::MULTI_TARGET) {
            break;
        }
    }
    engaged
}

/// First living monster along the facing direction within `range` blocks,
/// stopping at walls.
fn monster_in_line(state: &EobState, data: &EobData, range: i32) -> Option<usize> {
    let mut at: Position = state.position;
    for _ in 0..range {
        at = at.step(state.direction);
        if data.level.is_wall(at) {
            return None;
        }
        if let Some(found) = state.monster_at(at) {
            return Some(found);
        }
    }
    None
}

/// Attack of party member `index` with the wielded weapon, or bare hands.
pub fn character_attack(
    state: &mut EobState,
    data: &EobData,
    rng: &mut RandomSource,
    index: usize,
) -> AttackOutcome {
    let Some(character) = state.party.get(index) else {
        return AttackOutcome::Unable;
    };
    if !character.can_act() || character.cooldown > 0 {
        return AttackOutcome::Unable;
    }
    let weapon = character.weapon.and_then(|w| data.items.get(w));
    let melee = weapon.map_or(true, |w| !w.missile);
    if melee && index >= FRONT_RANK {
        return AttackOutcome::OutOfReach;
    }
    let target = if melee {
        state.monster_at(state.front_block())
    } else {
        monster_in_line(state, data, MISSILE_RANGE)
    };
    let Some(target) = target else {
        return AttackOutcome::NoTarget;
    };

    let kind = &data.monster_types[state.monsters[target].monster_type];
    let bonus = weapon.map_or(0, |w| w.bonus);
    let blessed = state.bless > 0;
    let hit = character_hit_test(rng, character, kind.armor_class, bonus, melee, blessed);
    let name = character.name.clone();
    let strength = (character.strength, character.strength_ext);
    state.party[index].cooldown = data.timing.attack_cooldown;
    if !hit {
        state.push_message(format!("{name} misses"));
        return AttackOutcome::Miss;
    }

    let mut damage = match weapon {
        Some(w) if kind.caps.contains(MonsterCaps::LARGE) => w.damage_large.roll(rng) + w.bonus,
        Some(w) => w.damage_small.roll(rng) + w.bonus,
        None => rng.roll_dice(1, 2, 0),
    };
    if melee {
        damage += strength_damage_modifier(strength.0, strength.1);
    }
    let damage = damage.max(0);
    state.push_message(format!("{name} hits {} for {damage}", kind.name));
    let killed = inflict_monster_damage(state, data, target, damage);
    AttackOutcome::Hit { damage, killed }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::eob::character::{test_character, CharacterClass};
    use crate::engines::eob::data::{Dice, Direction, ItemType, MonsterPlacement};
    use crate::engines::eob::monster::MonsterType;
    use crate::engines::eob::state::tiny_data;

    fn ogre(caps: MonsterCaps) -> MonsterType {
        MonsterType {
            name: "ogre".into(),
            level: 4,
            armor_class: 5,
            // Hits AC 10 on any roll.
            hit_chance: 0,
            hit_dice: Dice::new(0, 0, 20),
            attacks: vec![Dice::new(0, 0, 3)],
            experience: 90,
            caps,
        }
    }

    fn arena(caps: MonsterCaps) -> (EobData, EobState) {
        let mut data = tiny_data();
        data.characters
            .push(test_character("Bren", CharacterClass::Fighter));
        data.characters.push(test_character("Cyd", CharacterClass::Mage));
        data.monster_types.push(ogre(caps));
        data.monsters.push(MonsterPlacement {
            monster_type: 0,
            position: Position::new(2, 1),
            direction: Direction::West,
        });
        let state = EobState::new(&data, &mut RandomSource::new(9));
        (data, state)
    }

    #[test]
    fn dying_clears_status() {
        let mut c = test_character("Anya", CharacterClass::Fighter);
        c.status |= CharacterStatus::POISONED;
        c.effects.blur = 40;
        inflict_character_damage(&mut c, 5);
        assert_eq!(c.hp, 5);
        inflict_character_damage(&mut c, 30);
        assert_eq!(c.hp, DEATH_HP);
        assert_eq!(c.status, CharacterStatus::ACTIVE);
        assert_eq!(c.effects.blur, 0);
        assert!(!c.is_alive());
        inflict_character_damage(&mut c, 5);
        assert_eq!(c.hp, DEATH_HP, "the dead take no damage");
    }

    #[test]
    fn experience_is_split_among_the_living() {
        let mut party = vec![
            test_character("A", CharacterClass::Fighter),
            test_character("B", CharacterClass::Cleric),
            test_character("C", CharacterClass::Thief),
        ];
        party[2].hp = DEATH_HP;
        award_experience(&mut party, 91);
        assert_eq!(party[0].experience, 45);
        assert_eq!(party[1].experience, 45);
        assert_eq!(party[2].experience, 0);
    }

    #[test]
    fn single_target_monsters_stop_after_one_character() {
        let (data, mut state) = arena(MonsterCaps::empty());
        let engaged = monster_close_attack(&mut state, &data, &mut RandomSource::new(4), 0);
        assert_eq!(engaged.len(), 1);
        let (index, damage) = engaged[0];
        assert!(index < 2);
        assert_eq!(damage, 3);
        assert_eq!(state.party[index].hp, 7);
    }

    #[test]
    fn multi_target_monsters_engage_every_living_character() {
        let (data, mut state) = arena(MonsterCaps::MULTI_TARGET);
        state.party[1].hp = DEATH_HP;
        let engaged = monster_close_attack(&mut state, &data, &mut RandomSource::new(4), 0);
        let mut hit: Vec<usize> = engaged.iter().map(|(i, _)| *i).collect();
        hit.sort_unstable();
        assert_eq!(hit, vec![0, 2]);
    }

    #[test]
    fn unconscious_characters_are_still_targets() {
        let (data, mut state) = arena(MonsterCaps::empty());
        state.party[0].hp = 0;
        state.party[1].hp = 0;
        let engaged = monster_close_attack(&mut state, &data, &mut RandomSource::new(2), 0);
        let (index, _) = engaged[0];
        assert_eq!(state.party[index].hp, -3);
    }

    #[test]
    fn petrification_replaces_other_statuses() {
        let mut rng = RandomSource::new(5);
        let mut c = test_character("Anya", CharacterClass::Fighter);
        c.status |= CharacterStatus::POISONED;
        c.effects.protection_from_evil = 9;
        assert!(status_attack(&mut rng, &mut c, CharacterStatus::PETRIFIED, NO_SAVE, 0));
        assert_eq!(c.status, CharacterStatus::ACTIVE | CharacterStatus::PETRIFIED);
        assert_eq!(c.effects.protection_from_evil, 0);
        assert!(!status_attack(&mut rng, &mut c, CharacterStatus::PARALYZED, NO_SAVE, 5));
    }

    #[test]
    fn paralysis_sets_its_duration_once() {
        let mut rng = RandomSource::new(5);
        let mut c = test_character("Anya", CharacterClass::Fighter);
        assert!(status_attack(&mut rng, &mut c, CharacterStatus::PARALYZED, NO_SAVE, 30));
        assert_eq!(c.paralysis_secs, 30);
        c.paralysis_secs = 10;
        assert!(!status_attack(&mut rng, &mut c, CharacterStatus::PARALYZED, NO_SAVE, 30));
        assert_eq!(c.paralysis_secs, 10);
    }

    #[test]
    fn only_the_front_rank_swings_hand_weapons() {
        let (data, mut state) = arena(MonsterCaps::empty());
        let mut rng = RandomSource::new(1);
        assert_eq!(
            character_attack(&mut state, &data, &mut rng, 2),
            AttackOutcome::OutOfReach
        );
        assert_eq!(character_attack(&mut state, &data, &mut rng, 7), AttackOutcome::Unable);
        state.direction = Direction::West;
        assert_eq!(character_attack(&mut state, &data, &mut rng, 0), AttackOutcome::NoTarget);
    }

    #[test]
    fn attacks_eventually_kill_and_award_experience() {
        let (mut data, mut state) = arena(MonsterCaps::LARGE);
        data.items.push(ItemType {
            name: "long sword".into(),
            damage_small: Dice::new(0, 0, 1),
            damage_large: Dice::new(0, 0, 7),
            bonus: 3,
            missile: false,
        });
        state.party[0].weapon = Some(0);
        let mut rng = RandomSource::new(11);
        let mut kills = 0;
        for _ in 0..200 {
            state.party[0].cooldown = 0;
            if let AttackOutcome::Hit { damage, killed } =
                character_attack(&mut state, &data, &mut rng, 0)
            {
                assert_eq!(damage, 10, "large damage plus enchantment");
                if killed {
                    kills += 1;
                    break;
                }
            }
        }
        assert_eq!(kills, 1);
        assert!(!state.monsters[0].is_alive());
        assert_eq!(state.party[0].experience, 30);
        assert_eq!(state.party[0].cooldown, data.timing.attack_cooldown);
    }
}
