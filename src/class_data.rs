//! Static per-class reference data and shadow generation.
//!
//! Holds the base stat table and fixed skill kit for each shadow class,
//! plus the pure stat-generation formula and the weighted rarity roll used
//! at forge time. All randomness takes an injected RNG, with `thread_rng`
//! convenience wrappers.

use crate::world::{Rarity, Shadow, ShadowClass, ShadowId, ShadowOwner, Skill, SkillKind, Stats};
use rand::Rng;

// ============================================================================
// Base Stats
// ============================================================================

/// Class base-stat profile before rarity scaling.
#[derive(Debug, Clone, Copy)]
pub struct BaseStats {
    pub health: i32,
    pub attack: i32,
    pub defense: i32,
    pub speed: i32,
    pub mana: i32,
}

/// Base stat table. Warriors are durable, mages trade health for mana and
/// raw attack, archers are balanced, assassins are fast glass cannons.
pub fn base_stats(class: ShadowClass) -> BaseStats {
    match class {
        ShadowClass::Warrior => BaseStats {
            health: 120,
            attack: 25,
            defense: 20,
            speed: 15,
            mana: 50,
        },
        ShadowClass::Mage => BaseStats {
            health: 80,
            attack: 30,
            defense: 10,
            speed: 20,
            mana: 100,
        },
        ShadowClass::Archer => BaseStats {
            health: 100,
            attack: 28,
            defense: 15,
            speed: 25,
            mana: 70,
        },
        ShadowClass::Assassin => BaseStats {
            health: 90,
            attack: 32,
            defense: 12,
            speed: 30,
            mana: 60,
        },
    }
}

/// Generate the stats for a freshly forged shadow.
///
/// Deterministic: base table scaled by the rarity multiplier, floored to
/// integers. Health and mana start at their maximums.
pub fn generate_stats(class: ShadowClass, rarity: Rarity) -> Stats {
    let base = base_stats(class);
    let multiplier = rarity.multiplier();
    let scale = |stat: i32| (stat as f64 * multiplier).floor() as i32;

    let health = scale(base.health);
    let mana = scale(base.mana);

    Stats {
        health,
        max_health: health,
        attack: scale(base.attack),
        defense: scale(base.defense),
        speed: scale(base.speed),
        mana,
        max_mana: mana,
    }
}

// ============================================================================
// Skill Kits
// ============================================================================

/// The fixed skill kit for a class.
pub fn skill_kit(class: ShadowClass) -> Vec<Skill> {
    match class {
        ShadowClass::Warrior => vec![
            Skill::new(
                "slash",
                "Slash",
                "Basic sword attack",
                Some(25),
                10,
                0,
                SkillKind::Attack,
            ),
            Skill::new(
                "shield_bash",
                "Shield Bash",
                "Stun enemy and deal damage",
                Some(20),
                15,
                2,
                SkillKind::Attack,
            ),
            Skill::new(
                "berserker_rage",
                "Berserker Rage",
                "Increase attack for 3 turns",
                None,
                20,
                4,
                SkillKind::Buff,
            ),
        ],
        ShadowClass::Mage => vec![
            Skill::new(
                "fireball",
                "Fireball",
                "Cast a fireball",
                Some(30),
                15,
                0,
                SkillKind::Attack,
            ),
            Skill::new(
                "ice_shard",
                "Ice Shard",
                "Freeze enemy for 1 turn",
                Some(20),
                18,
                3,
                SkillKind::Attack,
            ),
            Skill::new(
                "heal",
                "Heal",
                "Restore health",
                None,
                12,
                2,
                SkillKind::Heal,
            ),
        ],
        ShadowClass::Archer => vec![
            Skill::new(
                "arrow_shot",
                "Arrow Shot",
                "Precise ranged attack",
                Some(22),
                8,
                0,
                SkillKind::Attack,
            ),
            Skill::new(
                "poison_arrow",
                "Poison Arrow",
                "Poison enemy for 3 turns",
                Some(15),
                15,
                3,
                SkillKind::Attack,
            ),
            Skill::new(
                "multi_shot",
                "Multi Shot",
                "Attack multiple times",
                Some(18),
                20,
                4,
                SkillKind::Attack,
            ),
        ],
        ShadowClass::Assassin => vec![
            Skill::new(
                "backstab",
                "Backstab",
                "Critical stealth attack",
                Some(35),
                12,
                0,
                SkillKind::Attack,
            ),
            Skill::new(
                "smoke_bomb",
                "Smoke Bomb",
                "Become invisible for 2 turns",
                None,
                18,
                5,
                SkillKind::Buff,
            ),
            Skill::new(
                "poison_blade",
                "Poison Blade",
                "Poison on hit",
                Some(20),
                15,
                3,
                SkillKind::Attack,
            ),
        ],
    }
}

// ============================================================================
// Random Rolls
// ============================================================================

/// Weighted rarity roll: common 50%, rare 30%, epic 15%, legendary 5%.
pub fn roll_rarity_with_rng(rng: &mut impl Rng) -> Rarity {
    let roll: f64 = rng.gen();
    if roll < 0.5 {
        Rarity::Common
    } else if roll < 0.8 {
        Rarity::Rare
    } else if roll < 0.95 {
        Rarity::Epic
    } else {
        Rarity::Legendary
    }
}

/// Weighted rarity roll using the thread-local RNG.
pub fn roll_rarity() -> Rarity {
    roll_rarity_with_rng(&mut rand::thread_rng())
}

/// Pick a uniformly random class.
pub fn random_class_with_rng(rng: &mut impl Rng) -> ShadowClass {
    let classes = ShadowClass::all();
    classes[rng.gen_range(0..classes.len())]
}

// ============================================================================
// Forging
// ============================================================================

/// Assemble a level-1 shadow of the given class and rarity.
pub fn forge(
    name: impl Into<String>,
    class: ShadowClass,
    rarity: Rarity,
    owner: ShadowOwner,
) -> Shadow {
    Shadow {
        id: ShadowId::new(),
        name: name.into(),
        rarity,
        class,
        level: 1,
        experience: 0,
        stats: generate_stats(class, rarity),
        skills: skill_kit(class),
        owner,
    }
}
