//! Shadow Realm entity model.
//!
//! Contains the core data types for game state: users, shadows (collectible
//! combat units), their stats and skills, and status effects. Pure data plus
//! invariant helpers; behavior lives in the battle and progress modules.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// ID Types
// ============================================================================

/// Unique identifier for users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for shadows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShadowId(pub Uuid);

impl ShadowId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ShadowId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ShadowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for adventure stages. Stages are static content keyed by
/// stable, human-readable names (e.g. `mystical_forest_1`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StageId(pub String);

impl StageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for StageId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Rarity and Class
// ============================================================================

/// Rarity tier of a shadow. Ordered: higher tiers scale every base stat by a
/// larger multiplier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Legendary,
}

impl Rarity {
    pub fn name(&self) -> &'static str {
        match self {
            Rarity::Common => "common",
            Rarity::Rare => "rare",
            Rarity::Epic => "epic",
            Rarity::Legendary => "legendary",
        }
    }

    /// Stat multiplier applied on top of the class base table.
    pub fn multiplier(&self) -> f64 {
        match self {
            Rarity::Common => 1.0,
            Rarity::Rare => 1.2,
            Rarity::Epic => 1.5,
            Rarity::Legendary => 2.0,
        }
    }

    pub fn all() -> [Rarity; 4] {
        [Rarity::Common, Rarity::Rare, Rarity::Epic, Rarity::Legendary]
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Shadow archetype. Each class has a distinct base-stat profile and a fixed
/// skill kit (see `class_data`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShadowClass {
    Warrior,
    Mage,
    Archer,
    Assassin,
}

impl ShadowClass {
    pub fn name(&self) -> &'static str {
        match self {
            ShadowClass::Warrior => "warrior",
            ShadowClass::Mage => "mage",
            ShadowClass::Archer => "archer",
            ShadowClass::Assassin => "assassin",
        }
    }

    /// Capitalized display name, used for generated opponent names.
    pub fn title(&self) -> &'static str {
        match self {
            ShadowClass::Warrior => "Warrior",
            ShadowClass::Mage => "Mage",
            ShadowClass::Archer => "Archer",
            ShadowClass::Assassin => "Assassin",
        }
    }

    pub fn all() -> [ShadowClass; 4] {
        [
            ShadowClass::Warrior,
            ShadowClass::Mage,
            ShadowClass::Archer,
            ShadowClass::Assassin,
        ]
    }
}

impl fmt::Display for ShadowClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// Stats
// ============================================================================

/// Combat statistics for a shadow.
///
/// Invariants: `0 <= health <= max_health` and `0 <= mana <= max_mana`. All
/// mutation goes through the clamping helpers below.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub health: i32,
    pub max_health: i32,
    pub attack: i32,
    pub defense: i32,
    pub speed: i32,
    pub mana: i32,
    pub max_mana: i32,
}

impl Stats {
    /// Apply damage, clamping health at zero. Returns the damage actually
    /// taken.
    pub fn take_damage(&mut self, amount: i32) -> i32 {
        let old = self.health;
        self.health = (self.health - amount.max(0)).max(0);
        old - self.health
    }

    /// Restore health, capped at `max_health`. Returns the amount actually
    /// healed.
    pub fn heal(&mut self, amount: i32) -> i32 {
        let old = self.health;
        self.health = (self.health + amount.max(0)).min(self.max_health);
        self.health - old
    }

    /// Spend mana if enough is available. Returns false (and changes
    /// nothing) otherwise.
    pub fn spend_mana(&mut self, cost: i32) -> bool {
        if self.mana >= cost {
            self.mana -= cost;
            true
        } else {
            false
        }
    }

    /// Restore mana, capped at `max_mana`. Returns the amount actually
    /// restored.
    pub fn restore_mana(&mut self, amount: i32) -> i32 {
        let old = self.mana;
        self.mana = (self.mana + amount.max(0)).min(self.max_mana);
        self.mana - old
    }

    pub fn is_defeated(&self) -> bool {
        self.health <= 0
    }

    pub fn health_ratio(&self) -> f32 {
        (self.health as f32 / self.max_health as f32).max(0.0)
    }
}

// ============================================================================
// Skills
// ============================================================================

/// Effect category of a skill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillKind {
    Attack,
    Defense,
    Heal,
    Buff,
    Debuff,
}

/// A per-class ability. Immutable reference data: skill kits are fixed per
/// class and are not learned incrementally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Base damage. Absent for pure heal/buff skills.
    pub damage: Option<i32>,
    pub mana_cost: i32,
    /// Declared cooldown in turns. Not yet enforced between turns.
    pub cooldown: u32,
    pub kind: SkillKind,
}

impl Skill {
    pub fn new(
        id: &str,
        name: &str,
        description: &str,
        damage: Option<i32>,
        mana_cost: i32,
        cooldown: u32,
        kind: SkillKind,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            damage,
            mana_cost,
            cooldown,
            kind,
        }
    }
}

// ============================================================================
// Status Effects
// ============================================================================

/// Lingering effect applied during battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusEffectKind {
    Poison,
    Burn,
    Freeze,
    Stun,
    Boost,
    Shield,
}

/// A status effect with its remaining duration and magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEffect {
    pub kind: StatusEffectKind,
    pub duration: u32,
    pub value: i32,
}

// ============================================================================
// Shadow
// ============================================================================

/// Who owns a shadow: a player's collection, or the battle engine for
/// ephemeral generated opponents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShadowOwner {
    User(UserId),
    Opponent,
}

/// A collectible combat unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shadow {
    pub id: ShadowId,
    pub name: String,
    pub rarity: Rarity,
    pub class: ShadowClass,
    pub level: u32,
    pub experience: u32,
    pub stats: Stats,
    pub skills: Vec<Skill>,
    pub owner: ShadowOwner,
}

impl Shadow {
    /// Look up a skill on this shadow by id.
    pub fn skill(&self, skill_id: &str) -> Option<&Skill> {
        self.skills.iter().find(|s| s.id == skill_id)
    }

    /// Experience required to reach the next level from the current one.
    pub fn experience_to_next_level(&self) -> u32 {
        self.level * 100
    }

    /// Raise the level by one and apply stat growth.
    ///
    /// Growth per stat is proportional to the new level: `inc = floor(level
    /// * 0.1)`, with health and mana growing fastest, then attack and
    /// defense, then speed. Health and mana are restored to their new
    /// maximums. Below level 10 the increment is zero; stats never shrink.
    pub fn grow_level(&mut self) {
        self.level += 1;
        let inc = (self.level as f64 * 0.1).floor() as i32;

        self.stats.max_health += inc * 10;
        self.stats.health = self.stats.max_health;
        self.stats.max_mana += inc * 5;
        self.stats.mana = self.stats.max_mana;
        self.stats.attack += inc * 2;
        self.stats.defense += inc * 2;
        self.stats.speed += inc;

        log::debug!(
            "shadow {} ({}) reached level {}",
            self.name,
            self.id,
            self.level
        );
    }
}

// ============================================================================
// User
// ============================================================================

/// A player account with its currency balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub level: u32,
    pub experience: u32,
    /// Shadow tokens: spent on forging shadows, earned from battle and
    /// stage rewards. Unbounded.
    pub shadow_tokens: u32,
}

impl User {
    /// Create a fresh guest account with the starting token balance.
    pub fn guest(username: impl Into<String>, email: impl Into<String>, tokens: u32) -> Self {
        Self {
            id: UserId::new(),
            username: username.into(),
            email: email.into(),
            level: 1,
            experience: 0,
            shadow_tokens: tokens,
        }
    }
}
