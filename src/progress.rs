//! Adventure progression: rewards, leveling, and the stage unlock graph.
//!
//! The tracker owns two things: applying battle rewards to a user and their
//! shadow (with level-up growth), and evaluating the static stage dependency
//! graph when a stage is completed. Stages form a DAG by construction; a
//! stage unlocks once every prerequisite is in the completed set, and the
//! evaluation runs only at completion time.

use crate::battle::BattleReward;
use crate::content::{EnemySpec, NpcSpec, ShopItem};
use crate::world::{Shadow, StageId, User};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Counters credited per completed stage. Fixed constants rather than a
/// tally of actual encounters.
const STAGE_BATTLES_WON: u32 = 2;
const STAGE_SHADOWS_DISCOVERED: u32 = 1;

// ============================================================================
// Types
// ============================================================================

/// A reward granted when a stage is cleared.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StageReward {
    Experience { amount: u32 },
    ShadowTokens { amount: u32 },
    Item { item: ShopItem },
}

/// A node in the adventure graph. Content (enemies, NPCs, rewards) is
/// seeded lazily on first visit; see `content::populate_stage`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdventureStage {
    pub id: StageId,
    pub name: String,
    pub description: String,
    pub enemies: Vec<EnemySpec>,
    pub npcs: Vec<NpcSpec>,
    pub rewards: Vec<StageReward>,
    pub completed: bool,
    /// Prerequisite stages. All must be completed before this stage
    /// unlocks. Static: never extended after the graph is defined.
    pub unlock_requirements: Vec<StageId>,
}

impl AdventureStage {
    pub fn new(id: impl Into<StageId>, name: &str, description: &str) -> Self {
        Self {
            id: id.into(),
            name: name.to_string(),
            description: description.to_string(),
            enemies: Vec::new(),
            npcs: Vec::new(),
            rewards: Vec::new(),
            completed: false,
            unlock_requirements: Vec::new(),
        }
    }

    pub fn requires(mut self, prerequisites: &[&str]) -> Self {
        self.unlock_requirements = prerequisites.iter().map(|p| StageId::from(*p)).collect();
        self
    }

    /// Total experience granted on clear.
    pub fn experience_reward(&self) -> u32 {
        self.rewards
            .iter()
            .map(|r| match r {
                StageReward::Experience { amount } => *amount,
                _ => 0,
            })
            .sum()
    }

    /// Total shadow tokens granted on clear.
    pub fn token_reward(&self) -> u32 {
        self.rewards
            .iter()
            .map(|r| match r {
                StageReward::ShadowTokens { amount } => *amount,
                _ => 0,
            })
            .sum()
    }
}

/// Tracked milestone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Achievement {
    pub id: String,
    pub name: String,
    pub description: String,
    pub progress: u32,
    pub target: u32,
    pub completed: bool,
}

/// Per-user adventure state: position in the graph and aggregate counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdventureProgress {
    pub current_stage: StageId,
    pub completed_stages: HashSet<StageId>,
    pub unlocked_stages: HashSet<StageId>,
    pub total_experience: u32,
    pub battles_won: u32,
    pub shadows_discovered: u32,
    pub achievements: Vec<Achievement>,
}

/// Result of completing a stage.
#[derive(Debug, Clone)]
pub struct StageCompletion {
    /// Stages whose prerequisites became fully satisfied, in stage-list
    /// order.
    pub newly_unlocked: Vec<StageId>,
    pub experience: u32,
    pub shadow_tokens: u32,
    /// True when the stage had already been completed; nothing was granted.
    pub already_completed: bool,
}

/// Errors from progression operations.
#[derive(Debug, Error)]
pub enum ProgressError {
    #[error("unknown stage '{0}'")]
    StageNotFound(StageId),

    #[error("stage '{0}' is locked")]
    StageLocked(StageId),
}

// ============================================================================
// Adventure
// ============================================================================

/// The adventure mode: stage list plus the user's progress through it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Adventure {
    pub stages: Vec<AdventureStage>,
    pub progress: AdventureProgress,
}

impl Default for Adventure {
    /// The starting graph: a three-stage chain beginning in the Whispering
    /// Woods, with only the first stage unlocked.
    fn default() -> Self {
        let stages = vec![
            AdventureStage::new(
                "mystical_forest_1",
                "Whispering Woods",
                "Ancient forest where shadows first learned to dance with moonlight",
            ),
            AdventureStage::new(
                "shadow_caverns_1",
                "Echoing Caverns",
                "Deep underground caves where shadow magic resonates",
            )
            .requires(&["mystical_forest_1"]),
            AdventureStage::new(
                "blood_moon_peaks",
                "Blood Moon Peaks",
                "Treacherous mountains where the blood moon rises",
            )
            .requires(&["shadow_caverns_1"]),
        ];

        let first = stages[0].id.clone();
        Self {
            stages,
            progress: AdventureProgress {
                current_stage: first.clone(),
                completed_stages: HashSet::new(),
                unlocked_stages: HashSet::from([first]),
                total_experience: 0,
                battles_won: 0,
                shadows_discovered: 0,
                achievements: Vec::new(),
            },
        }
    }
}

impl Adventure {
    pub fn stage(&self, id: &StageId) -> Option<&AdventureStage> {
        self.stages.iter().find(|s| &s.id == id)
    }

    pub fn stage_mut(&mut self, id: &StageId) -> Option<&mut AdventureStage> {
        self.stages.iter_mut().find(|s| &s.id == id)
    }

    /// A stage is unlockable once every prerequisite is completed.
    pub fn is_unlockable(&self, stage: &AdventureStage) -> bool {
        stage
            .unlock_requirements
            .iter()
            .all(|req| self.progress.completed_stages.contains(req))
    }

    pub fn is_unlocked(&self, id: &StageId) -> bool {
        self.progress.unlocked_stages.contains(id)
    }

    /// Complete a stage and re-evaluate the unlock graph.
    ///
    /// First completion marks the stage, unlocks every stage whose
    /// prerequisites are now fully satisfied, advances the current stage to
    /// the first newly unlocked one (stage-list order breaks ties), and
    /// credits stage rewards to the progress totals and the user.
    /// Re-completing is a full no-op: rewards and counters are granted
    /// exactly once per stage.
    pub fn complete_stage(
        &mut self,
        id: &StageId,
        user: &mut User,
    ) -> Result<StageCompletion, ProgressError> {
        let stage_index = self
            .stages
            .iter()
            .position(|s| &s.id == id)
            .ok_or_else(|| ProgressError::StageNotFound(id.clone()))?;

        if self.progress.completed_stages.contains(id) {
            return Ok(StageCompletion {
                newly_unlocked: Vec::new(),
                experience: 0,
                shadow_tokens: 0,
                already_completed: true,
            });
        }

        self.stages[stage_index].completed = true;
        self.progress.completed_stages.insert(id.clone());

        let newly_unlocked: Vec<StageId> = self
            .stages
            .iter()
            .filter(|s| {
                !self.progress.unlocked_stages.contains(&s.id)
                    && s.unlock_requirements
                        .iter()
                        .all(|req| self.progress.completed_stages.contains(req))
            })
            .map(|s| s.id.clone())
            .collect();

        for unlocked in &newly_unlocked {
            self.progress.unlocked_stages.insert(unlocked.clone());
            log::info!("stage unlocked: {unlocked}");
        }
        if let Some(next) = newly_unlocked.first() {
            self.progress.current_stage = next.clone();
        }

        let stage = &self.stages[stage_index];
        let experience = stage.experience_reward();
        let shadow_tokens = stage.token_reward();

        self.progress.total_experience += experience;
        self.progress.battles_won += STAGE_BATTLES_WON;
        self.progress.shadows_discovered += STAGE_SHADOWS_DISCOVERED;

        user.experience += experience;
        user.shadow_tokens += shadow_tokens;

        log::info!(
            "stage {id} completed: +{experience} xp, +{shadow_tokens} tokens, {} unlocked",
            newly_unlocked.len()
        );

        Ok(StageCompletion {
            newly_unlocked,
            experience,
            shadow_tokens,
            already_completed: false,
        })
    }
}

// ============================================================================
// Battle Rewards and Leveling
// ============================================================================

/// Commit a battle reward: tokens to the user, experience to the shadow.
///
/// Level-ups loop while the accumulated experience clears the
/// level-dependent threshold (`level * 100`), carrying the overflow into the
/// next level, so one large reward can grant several levels. Returns the
/// number of levels gained.
pub fn apply_battle_reward(user: &mut User, shadow: &mut Shadow, reward: &BattleReward) -> u32 {
    user.shadow_tokens += reward.shadow_tokens;
    shadow.experience += reward.experience;

    let mut levels_gained = 0;
    while shadow.experience >= shadow.experience_to_next_level() {
        shadow.experience -= shadow.experience_to_next_level();
        shadow.grow_level();
        levels_gained += 1;
    }
    levels_gained
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class_data::forge;
    use crate::content::{populate_stage, MockGenerator};
    use crate::world::{Rarity, ShadowClass, ShadowOwner};

    fn user() -> User {
        User::guest("Shadow Mage", "guest@shadowrealm.com", 100)
    }

    fn shadow() -> Shadow {
        forge(
            "Umbra",
            ShadowClass::Warrior,
            Rarity::Common,
            ShadowOwner::Opponent,
        )
    }

    #[test]
    fn test_default_graph_seeds_first_stage() {
        let adventure = Adventure::default();
        assert_eq!(adventure.stages.len(), 3);
        assert_eq!(adventure.progress.current_stage.as_str(), "mystical_forest_1");
        assert!(adventure.is_unlocked(&StageId::from("mystical_forest_1")));
        assert!(!adventure.is_unlocked(&StageId::from("shadow_caverns_1")));
    }

    #[test]
    fn test_completion_unlocks_exact_successor() {
        let mut adventure = Adventure::default();
        let mut user = user();

        let completion = adventure
            .complete_stage(&StageId::from("mystical_forest_1"), &mut user)
            .expect("stage exists");

        assert_eq!(completion.newly_unlocked, vec![StageId::from("shadow_caverns_1")]);
        assert_eq!(adventure.progress.current_stage.as_str(), "shadow_caverns_1");
        assert!(adventure.is_unlocked(&StageId::from("shadow_caverns_1")));
        // The third stage requires the second, which is not yet completed.
        assert!(!adventure.is_unlocked(&StageId::from("blood_moon_peaks")));
    }

    #[test]
    fn test_completion_credits_rewards_and_counters() {
        let mut adventure = Adventure::default();
        let mut user = user();
        let id = StageId::from("mystical_forest_1");
        populate_stage(
            adventure.stage_mut(&id).expect("stage exists"),
            &MockGenerator,
        );

        let completion = adventure.complete_stage(&id, &mut user).expect("stage exists");

        assert_eq!(completion.experience, 100);
        assert_eq!(completion.shadow_tokens, 25);
        assert_eq!(adventure.progress.total_experience, 100);
        assert_eq!(adventure.progress.battles_won, 2);
        assert_eq!(adventure.progress.shadows_discovered, 1);
        assert_eq!(user.experience, 100);
        assert_eq!(user.shadow_tokens, 125);
    }

    #[test]
    fn test_recompletion_is_a_full_noop() {
        let mut adventure = Adventure::default();
        let mut user = user();
        let id = StageId::from("mystical_forest_1");
        populate_stage(
            adventure.stage_mut(&id).expect("stage exists"),
            &MockGenerator,
        );

        adventure.complete_stage(&id, &mut user).expect("stage exists");
        let tokens_after_first = user.shadow_tokens;

        let second = adventure.complete_stage(&id, &mut user).expect("stage exists");

        assert!(second.already_completed);
        assert!(second.newly_unlocked.is_empty());
        assert_eq!(adventure.progress.completed_stages.len(), 1);
        assert_eq!(adventure.progress.battles_won, 2);
        assert_eq!(adventure.progress.shadows_discovered, 1);
        assert_eq!(user.shadow_tokens, tokens_after_first);
    }

    #[test]
    fn test_unknown_stage_is_rejected() {
        let mut adventure = Adventure::default();
        let mut user = user();

        let err = adventure
            .complete_stage(&StageId::from("void_citadel"), &mut user)
            .expect_err("stage does not exist");
        assert!(matches!(err, ProgressError::StageNotFound(_)));
    }

    #[test]
    fn test_multi_prerequisite_stage_waits_for_all() {
        let mut adventure = Adventure::default();
        adventure.stages.push(
            AdventureStage::new(
                "convergence",
                "Convergence",
                "Where every path through the realm meets",
            )
            .requires(&["mystical_forest_1", "shadow_caverns_1"]),
        );
        let mut user = user();

        adventure
            .complete_stage(&StageId::from("mystical_forest_1"), &mut user)
            .expect("stage exists");
        assert!(!adventure.is_unlocked(&StageId::from("convergence")));

        let completion = adventure
            .complete_stage(&StageId::from("shadow_caverns_1"), &mut user)
            .expect("stage exists");
        assert!(completion.newly_unlocked.contains(&StageId::from("convergence")));
        assert!(adventure.is_unlocked(&StageId::from("convergence")));
    }

    #[test]
    fn test_reward_below_threshold_keeps_level() {
        let mut user = user();
        let mut shadow = shadow();

        let gained = apply_battle_reward(
            &mut user,
            &mut shadow,
            &BattleReward {
                experience: 99,
                shadow_tokens: 10,
            },
        );

        assert_eq!(gained, 0);
        assert_eq!(shadow.level, 1);
        assert_eq!(shadow.experience, 99);
        assert_eq!(user.shadow_tokens, 110);
    }

    #[test]
    fn test_reward_at_threshold_levels_exactly_once() {
        let mut user = user();
        let mut shadow = shadow();

        let gained = apply_battle_reward(
            &mut user,
            &mut shadow,
            &BattleReward {
                experience: 100,
                shadow_tokens: 0,
            },
        );

        assert_eq!(gained, 1);
        assert_eq!(shadow.level, 2);
        assert_eq!(shadow.experience, 0);
    }

    #[test]
    fn test_large_reward_levels_multiple_times_with_overflow() {
        let mut user = user();
        let mut shadow = shadow();

        // 100 to clear level 1, 200 to clear level 2, 50 left over.
        let gained = apply_battle_reward(
            &mut user,
            &mut shadow,
            &BattleReward {
                experience: 350,
                shadow_tokens: 0,
            },
        );

        assert_eq!(gained, 2);
        assert_eq!(shadow.level, 3);
        assert_eq!(shadow.experience, 50);
    }
}
