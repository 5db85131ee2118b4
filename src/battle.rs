//! Turn-based battle engine.
//!
//! A `Battle` is an ephemeral state machine owning by-value snapshots of
//! both participants: mutations during battle never alias back into the
//! player's persisted shadow until the session commits the reward. The flow
//! is `Preparation -> Active -> Finished`, alternating player actions with
//! generated opponent turns.
//!
//! The opponent turn is modeled as an explicit `PendingOpponentTurn` token
//! tied to the battle id rather than a hidden deferred callback, so a turn
//! scheduled for a battle that has since finished or been abandoned is
//! rejected instead of silently corrupting state.

use crate::class_data;
use crate::world::{Shadow, ShadowOwner, SkillKind, StatusEffect};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Constants
// ============================================================================

/// Random bonus added on top of the attack stat (exclusive upper bound).
const ATTACK_BONUS: i32 = 10;
/// Base healing restored by heal-type skills.
const HEAL_BASE: i32 = 30;
/// Random bonus added to heal-type skills (exclusive upper bound).
const HEAL_BONUS: i32 = 20;
/// Victory reward ranges.
const REWARD_EXPERIENCE_BASE: u32 = 50;
const REWARD_EXPERIENCE_BONUS: u32 = 30;
const REWARD_TOKENS_BASE: u32 = 10;
const REWARD_TOKENS_BONUS: u32 = 15;

// ============================================================================
// Types
// ============================================================================

/// Unique identifier for battles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BattleId(pub Uuid);

impl BattleId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BattleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BattleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Battle mode. PvP is reserved in the type system but unimplemented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BattleMode {
    Pve,
    Pvp,
}

/// Battle lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BattleStatus {
    Preparation,
    Active,
    Finished,
}

/// Whose turn it is, and who won.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnActor {
    Player,
    Opponent,
}

/// One action a combatant can take.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BattleAction {
    Attack,
    Skill { skill_id: String },
    /// Reserved: logged but currently has no numeric effect.
    Defend,
}

/// Numeric result of one resolved action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnOutcome {
    pub damage: i32,
    pub healing: i32,
    pub status_effects: Vec<StatusEffect>,
}

/// Immutable record of one resolved action. Append-only log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleTurn {
    pub turn_number: u32,
    pub actor: TurnActor,
    pub action: BattleAction,
    pub outcome: TurnOutcome,
}

/// Reward granted for winning a battle. Committed by the session when the
/// battle ends, not when it finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleReward {
    pub experience: u32,
    pub shadow_tokens: u32,
}

/// Token for a scheduled opponent turn. Resolving it against a battle other
/// than the one that issued it (or one that has since finished) fails with
/// `BattleError::StaleOpponentTurn`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "the opponent turn must be resolved or the battle stays on the opponent's turn"]
pub struct PendingOpponentTurn {
    battle_id: BattleId,
}

impl PendingOpponentTurn {
    pub fn battle_id(&self) -> BattleId {
        self.battle_id
    }
}

/// Errors from battle operations. All recoverable.
#[derive(Debug, Error)]
pub enum BattleError {
    #[error("action attempted out of turn")]
    OutOfTurn,

    #[error("battle is already finished")]
    AlreadyFinished,

    #[error("shadow does not know skill '{0}'")]
    UnknownSkill(String),

    #[error("not enough mana: skill costs {cost}, only {available} available")]
    InsufficientMana { cost: i32, available: i32 },

    #[error("stale opponent turn: the battle it was scheduled for is gone")]
    StaleOpponentTurn,
}

// ============================================================================
// Battle
// ============================================================================

/// An active battle session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Battle {
    pub id: BattleId,
    pub mode: BattleMode,
    pub player_shadow: Shadow,
    pub opponent_shadow: Shadow,
    pub status: BattleStatus,
    pub current_turn: TurnActor,
    pub turns: Vec<BattleTurn>,
    pub winner: Option<TurnActor>,
    pub reward: Option<BattleReward>,
}

impl Battle {
    /// Start a battle against a generated opponent.
    ///
    /// The opponent gets a random class and mirrors the player shadow's
    /// rarity and level so battles stay level-appropriate. The player shadow
    /// is copied by value; the caller's shadow is untouched until rewards
    /// are committed.
    pub fn start(player_shadow: &Shadow, mode: BattleMode, rng: &mut impl Rng) -> Self {
        let opponent_shadow = generate_opponent(player_shadow, rng);

        log::info!(
            "battle: {} ({} {}) vs {} ({} {})",
            player_shadow.name,
            player_shadow.rarity,
            player_shadow.class,
            opponent_shadow.name,
            opponent_shadow.rarity,
            opponent_shadow.class,
        );

        Self::with_participants(player_shadow.clone(), opponent_shadow, mode)
    }

    /// Start a battle with explicit participants. Used by tests and reserved
    /// for PvP, where the opponent is not generated.
    pub fn with_participants(player_shadow: Shadow, opponent_shadow: Shadow, mode: BattleMode) -> Self {
        Self {
            id: BattleId::new(),
            mode,
            player_shadow,
            opponent_shadow,
            status: BattleStatus::Preparation,
            current_turn: TurnActor::Player,
            turns: Vec::new(),
            winner: None,
            reward: None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status == BattleStatus::Finished
    }

    /// Resolve a player action.
    ///
    /// Valid while the battle is not finished and it is the player's turn;
    /// the first action promotes `Preparation` to `Active`. Returns the
    /// resolved turn and, when the battle continues, the pending opponent
    /// turn that must be resolved before the player may act again.
    pub fn perform_player_action(
        &mut self,
        action: BattleAction,
        rng: &mut impl Rng,
    ) -> Result<(BattleTurn, Option<PendingOpponentTurn>), BattleError> {
        if self.status == BattleStatus::Finished {
            return Err(BattleError::AlreadyFinished);
        }
        if self.current_turn != TurnActor::Player {
            return Err(BattleError::OutOfTurn);
        }

        let outcome = self.resolve_player_action(&action, rng)?;
        self.status = BattleStatus::Active;

        if outcome.damage > 0 {
            self.opponent_shadow.stats.take_damage(outcome.damage);
        }
        if outcome.healing > 0 {
            self.player_shadow.stats.heal(outcome.healing);
        }

        let turn = self.log_turn(TurnActor::Player, action, outcome);

        let pending = if self.check_terminal(rng) {
            None
        } else {
            self.current_turn = TurnActor::Opponent;
            Some(PendingOpponentTurn { battle_id: self.id })
        };

        Ok((turn, pending))
    }

    /// Resolve the opponent's scheduled turn.
    ///
    /// The token is validated against this battle's id and state, so a turn
    /// scheduled before the battle ended (or for an abandoned battle) is
    /// rejected rather than applied.
    pub fn resolve_opponent_turn(
        &mut self,
        pending: PendingOpponentTurn,
        rng: &mut impl Rng,
    ) -> Result<BattleTurn, BattleError> {
        if pending.battle_id != self.id
            || self.status != BattleStatus::Active
            || self.current_turn != TurnActor::Opponent
        {
            return Err(BattleError::StaleOpponentTurn);
        }

        // The generated opponent only ever attacks.
        let damage = self.opponent_shadow.stats.attack + rng.gen_range(0..ATTACK_BONUS);
        self.player_shadow.stats.take_damage(damage);

        let turn = self.log_turn(
            TurnActor::Opponent,
            BattleAction::Attack,
            TurnOutcome {
                damage,
                ..TurnOutcome::default()
            },
        );

        if !self.check_terminal(rng) {
            self.current_turn = TurnActor::Player;
        }

        Ok(turn)
    }

    fn resolve_player_action(
        &mut self,
        action: &BattleAction,
        rng: &mut impl Rng,
    ) -> Result<TurnOutcome, BattleError> {
        let mut outcome = TurnOutcome::default();

        match action {
            BattleAction::Attack => {
                outcome.damage =
                    self.player_shadow.stats.attack + rng.gen_range(0..ATTACK_BONUS);
            }
            BattleAction::Skill { skill_id } => {
                let skill = self
                    .player_shadow
                    .skill(skill_id)
                    .ok_or_else(|| BattleError::UnknownSkill(skill_id.clone()))?
                    .clone();

                if !self.player_shadow.stats.spend_mana(skill.mana_cost) {
                    return Err(BattleError::InsufficientMana {
                        cost: skill.mana_cost,
                        available: self.player_shadow.stats.mana,
                    });
                }

                // TODO: enforce skill cooldowns across turns.
                match skill.kind {
                    SkillKind::Attack => {
                        outcome.damage =
                            skill.damage.unwrap_or(0) + rng.gen_range(0..ATTACK_BONUS);
                    }
                    SkillKind::Heal => {
                        outcome.healing = HEAL_BASE + rng.gen_range(0..HEAL_BONUS);
                    }
                    // Buffs and the rest spend mana but have no immediate
                    // numeric effect yet.
                    _ => {}
                }
            }
            BattleAction::Defend => {}
        }

        Ok(outcome)
    }

    fn log_turn(
        &mut self,
        actor: TurnActor,
        action: BattleAction,
        outcome: TurnOutcome,
    ) -> BattleTurn {
        let turn = BattleTurn {
            turn_number: self.turns.len() as u32 + 1,
            actor,
            action,
            outcome,
        };
        self.turns.push(turn.clone());
        turn
    }

    /// Check win/loss conditions, rolling the reward on victory. Returns
    /// true if the battle finished.
    fn check_terminal(&mut self, rng: &mut impl Rng) -> bool {
        if self.opponent_shadow.stats.is_defeated() {
            self.status = BattleStatus::Finished;
            self.winner = Some(TurnActor::Player);
            self.reward = Some(BattleReward {
                experience: REWARD_EXPERIENCE_BASE + rng.gen_range(0..REWARD_EXPERIENCE_BONUS),
                shadow_tokens: REWARD_TOKENS_BASE + rng.gen_range(0..REWARD_TOKENS_BONUS),
            });
            log::info!("battle {}: player wins after {} turns", self.id, self.turns.len());
            true
        } else if self.player_shadow.stats.is_defeated() {
            self.status = BattleStatus::Finished;
            self.winner = Some(TurnActor::Opponent);
            log::info!("battle {}: opponent wins after {} turns", self.id, self.turns.len());
            true
        } else {
            false
        }
    }
}

/// Generate an AI opponent matched to a player shadow.
///
/// Random class, same rarity and level. Stats come from the generator for
/// that class and rarity; per-level growth is not replayed onto opponents.
pub fn generate_opponent(player_shadow: &Shadow, rng: &mut impl Rng) -> Shadow {
    let class = class_data::random_class_with_rng(rng);
    let mut opponent = class_data::forge(
        format!("Dark {}", class.title()),
        class,
        player_shadow.rarity,
        ShadowOwner::Opponent,
    );
    opponent.level = player_shadow.level;
    opponent
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class_data::forge;
    use crate::world::{Rarity, ShadowClass};

    fn player(class: ShadowClass) -> Shadow {
        forge("Hero", class, Rarity::Common, ShadowOwner::Opponent)
    }

    fn start(class: ShadowClass) -> Battle {
        Battle::start(&player(class), BattleMode::Pve, &mut rand::thread_rng())
    }

    #[test]
    fn test_start_copies_participants() {
        let hero = player(ShadowClass::Warrior);
        let battle = Battle::start(&hero, BattleMode::Pve, &mut rand::thread_rng());

        assert_eq!(battle.status, BattleStatus::Preparation);
        assert_eq!(battle.current_turn, TurnActor::Player);
        assert_eq!(battle.player_shadow.id, hero.id);
        assert_eq!(battle.opponent_shadow.rarity, hero.rarity);
        assert_eq!(battle.opponent_shadow.level, hero.level);
        assert_eq!(battle.opponent_shadow.owner, ShadowOwner::Opponent);
        assert!(battle.opponent_shadow.name.starts_with("Dark "));
    }

    #[test]
    fn test_attack_damages_opponent_and_flips_turn() {
        let mut rng = rand::thread_rng();
        let mut battle = start(ShadowClass::Warrior);
        let opponent_hp = battle.opponent_shadow.stats.health;

        let (turn, pending) = battle
            .perform_player_action(BattleAction::Attack, &mut rng)
            .expect("attack should resolve");

        assert_eq!(turn.turn_number, 1);
        assert_eq!(turn.actor, TurnActor::Player);
        assert!(turn.outcome.damage >= battle.player_shadow.stats.attack);
        assert!(turn.outcome.damage < battle.player_shadow.stats.attack + ATTACK_BONUS);
        assert_eq!(
            battle.opponent_shadow.stats.health,
            opponent_hp - turn.outcome.damage
        );
        assert_eq!(battle.status, BattleStatus::Active);
        assert_eq!(battle.current_turn, TurnActor::Opponent);
        assert!(pending.is_some());
    }

    #[test]
    fn test_out_of_turn_is_rejected() {
        let mut rng = rand::thread_rng();
        let mut battle = start(ShadowClass::Warrior);
        let (_, pending) = battle
            .perform_player_action(BattleAction::Attack, &mut rng)
            .expect("attack should resolve");
        assert!(pending.is_some());

        let err = battle
            .perform_player_action(BattleAction::Attack, &mut rng)
            .expect_err("second action before the opponent turn must fail");
        assert!(matches!(err, BattleError::OutOfTurn));
    }

    #[test]
    fn test_opponent_turn_damages_player_and_flips_back() {
        let mut rng = rand::thread_rng();
        let mut battle = start(ShadowClass::Warrior);
        let (_, pending) = battle
            .perform_player_action(BattleAction::Defend, &mut rng)
            .expect("defend should resolve");
        let player_hp = battle.player_shadow.stats.health;

        let turn = battle
            .resolve_opponent_turn(pending.expect("battle continues"), &mut rng)
            .expect("opponent turn should resolve");

        assert_eq!(turn.actor, TurnActor::Opponent);
        assert_eq!(turn.action, BattleAction::Attack);
        assert_eq!(
            battle.player_shadow.stats.health,
            (player_hp - turn.outcome.damage).max(0)
        );
        if !battle.is_finished() {
            assert_eq!(battle.current_turn, TurnActor::Player);
        }
    }

    #[test]
    fn test_stale_pending_turn_is_rejected() {
        let mut rng = rand::thread_rng();
        let mut battle = start(ShadowClass::Warrior);
        let (_, pending) = battle
            .perform_player_action(BattleAction::Attack, &mut rng)
            .expect("attack should resolve");
        let pending = pending.expect("battle continues");

        // A different battle must reject the token.
        let mut other = start(ShadowClass::Mage);
        let err = other
            .resolve_opponent_turn(pending, &mut rng)
            .expect_err("token from another battle must be stale");
        assert!(matches!(err, BattleError::StaleOpponentTurn));

        // The issuing battle still accepts it.
        battle
            .resolve_opponent_turn(pending, &mut rng)
            .expect("original battle should accept its own token");

        // And resolving it twice is stale.
        let err = battle
            .resolve_opponent_turn(pending, &mut rng)
            .expect_err("double resolution must be stale");
        assert!(matches!(err, BattleError::StaleOpponentTurn));
    }

    #[test]
    fn test_unknown_skill_is_rejected() {
        let mut rng = rand::thread_rng();
        let mut battle = start(ShadowClass::Warrior);

        let err = battle
            .perform_player_action(
                BattleAction::Skill {
                    skill_id: "fireball".to_string(),
                },
                &mut rng,
            )
            .expect_err("warrior does not know fireball");
        assert!(matches!(err, BattleError::UnknownSkill(_)));
        assert!(battle.turns.is_empty());
    }

    #[test]
    fn test_insufficient_mana_changes_nothing() {
        let mut rng = rand::thread_rng();
        let mut battle = start(ShadowClass::Mage);
        battle.player_shadow.stats.mana = 5;
        let snapshot = battle.player_shadow.stats.clone();
        let opponent_hp = battle.opponent_shadow.stats.health;

        let err = battle
            .perform_player_action(
                BattleAction::Skill {
                    skill_id: "fireball".to_string(),
                },
                &mut rng,
            )
            .expect_err("fireball costs 15 mana");

        assert!(matches!(
            err,
            BattleError::InsufficientMana { cost: 15, available: 5 }
        ));
        assert_eq!(battle.player_shadow.stats, snapshot);
        assert_eq!(battle.opponent_shadow.stats.health, opponent_hp);
        assert!(battle.turns.is_empty());
        assert_eq!(battle.current_turn, TurnActor::Player);
    }

    #[test]
    fn test_skill_spends_mana_and_deals_skill_damage() {
        let mut rng = rand::thread_rng();
        let mut battle = start(ShadowClass::Mage);
        let mana = battle.player_shadow.stats.mana;
        let opponent_hp = battle.opponent_shadow.stats.health;

        let (turn, _) = battle
            .perform_player_action(
                BattleAction::Skill {
                    skill_id: "fireball".to_string(),
                },
                &mut rng,
            )
            .expect("fireball should resolve");

        assert_eq!(battle.player_shadow.stats.mana, mana - 15);
        assert!(turn.outcome.damage >= 30 && turn.outcome.damage < 30 + ATTACK_BONUS);
        assert_eq!(
            battle.opponent_shadow.stats.health,
            opponent_hp - turn.outcome.damage
        );
    }

    #[test]
    fn test_heal_skill_restores_and_clamps() {
        let mut rng = rand::thread_rng();
        let mut battle = start(ShadowClass::Mage);
        battle.player_shadow.stats.take_damage(10);

        let (turn, _) = battle
            .perform_player_action(
                BattleAction::Skill {
                    skill_id: "heal".to_string(),
                },
                &mut rng,
            )
            .expect("heal should resolve");

        assert!(turn.outcome.healing >= HEAL_BASE);
        // Only 10 health was missing, so healing clamps at max.
        assert_eq!(
            battle.player_shadow.stats.health,
            battle.player_shadow.stats.max_health
        );
    }

    #[test]
    fn test_overwhelming_attacker_finishes_quickly() {
        let mut rng = rand::thread_rng();
        let mut hero = player(ShadowClass::Warrior);
        hero.stats.attack = 100_000;
        let mut battle = Battle::start(&hero, BattleMode::Pve, &mut rng);

        let (turn, pending) = battle
            .perform_player_action(BattleAction::Attack, &mut rng)
            .expect("attack should resolve");

        assert!(pending.is_none());
        assert!(battle.is_finished());
        assert_eq!(battle.winner, Some(TurnActor::Player));
        assert!(turn.outcome.damage >= 100_000);

        let reward = battle.reward.expect("victory rolls a reward");
        assert!(reward.experience >= REWARD_EXPERIENCE_BASE);
        assert!(reward.experience < REWARD_EXPERIENCE_BASE + REWARD_EXPERIENCE_BONUS);
        assert!(reward.shadow_tokens >= REWARD_TOKENS_BASE);
        assert!(reward.shadow_tokens < REWARD_TOKENS_BASE + REWARD_TOKENS_BONUS);
    }

    #[test]
    fn test_battle_invariants_hold_throughout() {
        let mut rng = rand::thread_rng();
        let mut battle = start(ShadowClass::Archer);

        for _ in 0..200 {
            if battle.is_finished() {
                break;
            }
            let (_, pending) = battle
                .perform_player_action(BattleAction::Attack, &mut rng)
                .expect("attack should resolve");

            for shadow in [&battle.player_shadow, &battle.opponent_shadow] {
                assert!(shadow.stats.health >= 0);
                assert!(shadow.stats.health <= shadow.stats.max_health);
                assert!(shadow.stats.mana >= 0);
                assert!(shadow.stats.mana <= shadow.stats.max_mana);
            }

            if let Some(pending) = pending {
                battle
                    .resolve_opponent_turn(pending, &mut rng)
                    .expect("opponent turn should resolve");
            }
        }

        assert!(battle.is_finished(), "equal-stat battle must terminate");
        // Turn numbers are monotonic.
        for (i, turn) in battle.turns.iter().enumerate() {
            assert_eq!(turn.turn_number, i as u32 + 1);
        }
    }

    #[test]
    fn test_finished_battle_rejects_actions() {
        let mut rng = rand::thread_rng();
        let mut hero = player(ShadowClass::Warrior);
        hero.stats.attack = 100_000;
        let mut battle = Battle::start(&hero, BattleMode::Pve, &mut rng);
        battle
            .perform_player_action(BattleAction::Attack, &mut rng)
            .expect("attack should resolve");

        let err = battle
            .perform_player_action(BattleAction::Attack, &mut rng)
            .expect_err("finished battles take no actions");
        assert!(matches!(err, BattleError::AlreadyFinished));
    }
}
