//! AD&D tables: saving throws, to-hit numbers and ability modifiers.

use super::character::{Character, Race};
use crate::rng::RandomSource;

pub const SAVE_PARALYZE: u8 = 0;
pub const SAVE_ROD: u8 = 1;
pub const SAVE_PETRIFY: u8 = 2;
pub const SAVE_BREATH: u8 = 3;
pub const SAVE_SPELL: u8 = 4;
/// Attacks of this type cannot be saved against.
pub const NO_SAVE: u8 = 5;

/// A successful save halves the damage.
pub const SAVE_EFFECT_HALF: u8 = 1;
/// A successful save negates the damage.
pub const SAVE_EFFECT_NEGATE: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveClass {
    Warrior,
    Wizard,
    Priest,
    Rogue,
}

// Rows are save types, columns level brackets.
const WARRIOR_SAVES: [[u8; 10]; 5] = [
    [16, 14, 13, 11, 10, 8, 7, 5, 4, 3],
    [18, 16, 15, 13, 12, 10, 9, 7, 6, 5],
    [17, 15, 14, 12, 11, 9, 8, 6, 5, 4],
    [20, 17, 16, 13, 12, 9, 8, 5, 4, 4],
    [19, 17, 16, 14, 13, 11, 10, 8, 7, 6],
];

const PRIEST_SAVES: [[u8; 7]; 5] = [
    [10, 9, 7, 6, 5, 4, 2],
    [14, 13, 11, 10, 9, 8, 6],
    [13, 12, 10, 9, 8, 7, 5],
    [16, 15, 13, 12, 11, 10, 8],
    [15, 14, 12, 11, 10, 9, 7],
];

const ROGUE_SAVES: [[u8; 6]; 5] = [
    [13, 12, 11, 10, 9, 8],
    [14, 12, 10, 8, 6, 4],
    [12, 11, 10, 9, 8, 7],
    [16, 15, 14, 13, 12, 11],
    [15, 13, 11, 9, 7, 5],
];

const WIZARD_SAVES: [[u8; 5]; 5] = [
    [14, 13, 11, 10, 8],
    [11, 9, 7, 5, 3],
    [13, 11, 9, 7, 5],
    [15, 13, 11, 9, 7],
    [12, 10, 8, 6, 4],
];

/// Constitution bonus of the short races, indexed by constitution.
const CONST_SAVE_BONUS: [i32; 20] = [0, 0, 0, 0, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 4, 4, 4, 4, 5, 5];

/// Number a d20 must reach to save.
pub fn save_target(class: SaveClass, level: i32, save_type: u8) -> i32 {
    let row = usize::from(save_type.min(SAVE_SPELL));
    let level = level.max(0) as usize;
    let value = match class {
        SaveClass::Warrior => WARRIOR_SAVES[row][((level + 1) / 2).min(9)],
        SaveClass::Priest => PRIEST_SAVES[row][((level.max(1) - 1) / 3).min(6)],
        SaveClass::Rogue => ROGUE_SAVES[row][((level.max(1) - 1) / 4).min(5)],
        SaveClass::Wizard => WIZARD_SAVES[row][((level.max(1) - 1) / 5).min(4)],
    };
    i32::from(value)
}

fn race_bonus_applies(race: Race, save_type: u8) -> bool {
    match race {
        Race::Dwarf | Race::Halfling => {
            matches!(save_type, SAVE_PARALYZE | SAVE_ROD | SAVE_SPELL)
        }
        Race::Gnome => matches!(save_type, SAVE_ROD | SAVE_SPELL),
        _ => false,
    }
}

/// Rolls a saving throw. `NO_SAVE` always fails.
pub fn try_saving_throw(
    rng: &mut RandomSource,
    class: SaveClass,
    level: i32,
    save_type: u8,
    race: Option<(Race, i32)>,
) -> bool {
    if save_type >= NO_SAVE {
        return false;
    }
    let mut target = save_target(class, level, save_type);
    if let Some((race, constitution)) = race {
        if race_bonus_applies(race, save_type) {
            target -= CONST_SAVE_BONUS[constitution.clamp(0, 19) as usize];
        }
    }
    rng.roll_dice(1, 20, 0) >= target
}

pub fn character_saving_throw(rng: &mut RandomSource, c: &Character, save_type: u8) -> bool {
    try_saving_throw(
        rng,
        c.class.save_class(),
        c.level,
        save_type,
        Some((c.race, c.constitution)),
    )
}

/// Monsters save as warriors of their level.
pub fn monster_saving_throw(rng: &mut RandomSource, level: i32, save_type: u8) -> bool {
    try_saving_throw(rng, SaveClass::Warrior, level, save_type, None)
}

pub fn saving_throw_reduce_damage(effect: u8, damage: i32) -> i32 {
    match effect {
        SAVE_EFFECT_NEGATE => 0,
        0 | SAVE_EFFECT_HALF => damage >> 1,
        _ => damage,
    }
}

const STR_HIT: [i32; 25] = [
    -4, -3, -3, -2, -2, -1, -1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 3, 3, 4, 4, 5, 6, 7,
];
const STR_DAMAGE: [i32; 25] = [
    -3, -2, -1, -1, -1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 2, 7, 8, 9, 10, 11, 12, 14,
];
const STR_EXT_LIMITS: [i32; 5] = [1, 51, 76, 91, 100];
const STR_EXT_HIT: [i32; 5] = [1, 2, 2, 2, 3];
const STR_EXT_DAMAGE: [i32; 5] = [3, 3, 4, 5, 6];
const DEX_HIT: [i32; 19] = [-5, -4, -3, -2, -1, 0, 0, 0, 0, 0, 0, 1, 2, 2, 3, 3, 4, 4, 4];

fn strength_lookup(table: &[i32; 25], ext_table: &[i32; 5], strength: i32, ext: i32) -> i32 {
    let mut modifier = table[(strength.clamp(1, 25) - 1) as usize];
    if ext > 0 {
        for (limit, value) in STR_EXT_LIMITS.iter().zip(ext_table) {
            if ext >= *limit {
                modifier = *value;
            }
        }
    }
    modifier
}

pub fn strength_hit_modifier(strength: i32, ext: i32) -> i32 {
    strength_lookup(&STR_HIT, &STR_EXT_HIT, strength, ext)
}

pub fn strength_damage_modifier(strength: i32, ext: i32) -> i32 {
    strength_lookup(&STR_DAMAGE, &STR_EXT_DAMAGE, strength, ext)
}

pub fn dexterity_hit_modifier(dexterity: i32) -> i32 {
    DEX_HIT[(dexterity.clamp(1, 19) - 1) as usize]
}

/// To-hit number for armor class 0.
pub fn thac0(class: SaveClass, level: i32) -> i32 {
    let (every, by) = match class {
        SaveClass::Warrior => (3, 2),
        SaveClass::Wizard => (2, 1),
        SaveClass::Priest => (1, 1),
        SaveClass::Rogue => (3, 1),
    };
    20 - ((level.max(1) - 1) / every) * by
}

/// d20 attack roll of a character against a monster's armor class.
/// `weapon_bonus` is the weapon's enchantment; melee attacks use the
/// strength modifier, missiles dexterity.
pub fn character_hit_test(
    rng: &mut RandomSource,
    attacker: &Character,
    monster_ac: i32,
    weapon_bonus: i32,
    melee: bool,
    blessed: bool,
) -> bool {
    let ability = if melee {
        strength_hit_modifier(attacker.strength, attacker.strength_ext)
    } else {
        dexterity_hit_modifier(attacker.dexterity)
    };
    let needed = thac0(attacker.class.save_class(), attacker.level) - monster_ac - (weapon_bonus + ability);
    let mut roll = rng.roll_dice(1, 20, 0);
    if blessed {
        roll += 1;
    }
    roll.clamp(1, 20) >= needed
}

/// A natural 20 always hits; protection from evil and blur each cost the
/// monster 2, a party prayer 1.
pub fn monster_hit_test(
    rng: &mut RandomSource,
    hit_chance: i32,
    target: &Character,
    prayer: bool,
) -> bool {
    let mut roll = rng.roll_dice(1, 20, 0);
    if roll == 20 {
        return true;
    }
    if target.effects.protection_from_evil > 0 {
        roll -= 2;
    }
    if target.effects.blur > 0 {
        roll -= 2;
    }
    if prayer {
        roll -= 1;
    }
    roll >= hit_chance - target.armor_class
}
