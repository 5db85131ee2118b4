//! GameSession - the primary public API for the Shadow Realm engine.
//!
//! A session is an explicit handle owning all game state: the user, their
//! shadow collection, the current battle, and adventure progress. The UI
//! layer constructs one with a snapshot store and drives it with commands;
//! nothing is reachable through ambient globals.
//!
//! Persistence is best-effort: snapshots are written after each mutation
//! settles, and a failed write is logged and dropped rather than rolling
//! the mutation back.

use crate::battle::{
    Battle, BattleAction, BattleError, BattleMode, BattleReward, BattleTurn, PendingOpponentTurn,
};
use crate::class_data;
use crate::content::{ContentGenerator, MockGenerator};
use crate::persist::{
    self, PersistError, SnapshotStore, PROGRESS_KEY, SHADOWS_KEY, STAGES_KEY, USER_KEY,
};
use crate::progress::{
    Adventure, AdventureProgress, AdventureStage, ProgressError, StageCompletion,
};
use crate::world::{Shadow, ShadowClass, ShadowId, ShadowOwner, StageId, User};
use std::time::Duration;
use thiserror::Error;

/// Errors from session operations. All recoverable and surfaced to the UI
/// as user-visible messages; none are fatal.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("operation requires a logged-in user")]
    NotAuthenticated,

    #[error("shadow {0} not found in your collection")]
    ShadowNotFound(ShadowId),

    #[error("not enough shadow tokens: need {cost}, have {balance}")]
    InsufficientTokens { cost: u32, balance: u32 },

    #[error("no battle in progress")]
    NoActiveBattle,

    #[error("a battle is already in progress")]
    BattleInProgress,

    #[error(transparent)]
    Battle(#[from] BattleError),

    #[error(transparent)]
    Progress(#[from] ProgressError),

    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// Configuration for creating a new game session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Username for the guest account created on login.
    pub guest_username: String,

    /// Email for the guest account.
    pub guest_email: String,

    /// Shadow tokens a fresh account starts with.
    pub starting_tokens: u32,

    /// Fixed token cost of forging a shadow.
    pub shadow_cost: u32,

    /// Delay before the opponent's scheduled turn resolves.
    pub opponent_turn_delay: Duration,
}

impl SessionConfig {
    pub fn new() -> Self {
        Self {
            guest_username: "Shadow Mage".to_string(),
            guest_email: "guest@shadowrealm.com".to_string(),
            starting_tokens: 100,
            shadow_cost: 20,
            opponent_turn_delay: Duration::from_secs(2),
        }
    }

    pub fn with_guest_username(mut self, username: impl Into<String>) -> Self {
        self.guest_username = username.into();
        self
    }

    pub fn with_starting_tokens(mut self, tokens: u32) -> Self {
        self.starting_tokens = tokens;
        self
    }

    pub fn with_shadow_cost(mut self, cost: u32) -> Self {
        self.shadow_cost = cost;
        self
    }

    pub fn with_opponent_turn_delay(mut self, delay: Duration) -> Self {
        self.opponent_turn_delay = delay;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// A running game session.
pub struct GameSession {
    config: SessionConfig,
    store: Box<dyn SnapshotStore>,
    generator: Box<dyn ContentGenerator + Send + Sync>,
    user: Option<User>,
    shadows: Vec<Shadow>,
    battle: Option<Battle>,
    adventure: Adventure,
}

impl GameSession {
    /// Create a session, restoring any snapshots present in the store and
    /// initializing default state otherwise.
    pub async fn new(
        config: SessionConfig,
        store: Box<dyn SnapshotStore>,
    ) -> Result<Self, SessionError> {
        let user = persist::load_entity(store.as_ref(), USER_KEY).await?;
        let shadows = persist::load_entity(store.as_ref(), SHADOWS_KEY)
            .await?
            .unwrap_or_default();

        let progress: Option<AdventureProgress> =
            persist::load_entity(store.as_ref(), PROGRESS_KEY).await?;
        let stages: Option<Vec<AdventureStage>> =
            persist::load_entity(store.as_ref(), STAGES_KEY).await?;
        let adventure = match (progress, stages) {
            (Some(progress), Some(stages)) => Adventure { stages, progress },
            _ => Adventure::default(),
        };

        Ok(Self {
            config,
            store,
            generator: Box::new(MockGenerator),
            user,
            shadows,
            battle: None,
            adventure,
        })
    }

    /// Swap in a different content generator for adventure stages.
    pub fn set_content_generator(
        &mut self,
        generator: Box<dyn ContentGenerator + Send + Sync>,
    ) {
        self.generator = generator;
    }

    // ========================================================================
    // Auth
    // ========================================================================

    /// Log in, creating a guest account on first use.
    pub async fn login(&mut self) -> User {
        if let Some(user) = &self.user {
            return user.clone();
        }

        let user = User::guest(
            self.config.guest_username.clone(),
            self.config.guest_email.clone(),
            self.config.starting_tokens,
        );
        log::info!("guest login: {} ({})", user.username, user.id);
        self.user = Some(user.clone());
        self.save_user().await;
        user
    }

    /// Guest mode: registering is the same as logging in.
    pub async fn register(&mut self) -> User {
        self.login().await
    }

    /// Log out, clearing all session state and removing snapshots.
    pub async fn logout(&mut self) {
        self.user = None;
        self.shadows.clear();
        self.battle = None;
        self.adventure = Adventure::default();

        for key in [USER_KEY, SHADOWS_KEY, PROGRESS_KEY, STAGES_KEY] {
            if let Err(err) = self.store.remove(key).await {
                log::warn!("failed to remove snapshot {key}: {err}");
            }
        }
    }

    pub fn current_user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    fn require_user(&self) -> Result<&User, SessionError> {
        self.user.as_ref().ok_or(SessionError::NotAuthenticated)
    }

    // ========================================================================
    // Shadows
    // ========================================================================

    /// Forge a new shadow for the fixed token cost. Rarity is rolled with
    /// the weighted distribution.
    pub async fn create_shadow(
        &mut self,
        name: impl Into<String>,
        class: ShadowClass,
    ) -> Result<Shadow, SessionError> {
        let cost = self.config.shadow_cost;
        let user = self.user.as_mut().ok_or(SessionError::NotAuthenticated)?;
        if user.shadow_tokens < cost {
            return Err(SessionError::InsufficientTokens {
                cost,
                balance: user.shadow_tokens,
            });
        }
        user.shadow_tokens -= cost;
        let owner = ShadowOwner::User(user.id);

        let rarity = class_data::roll_rarity();
        let shadow = class_data::forge(name, class, rarity, owner);
        log::info!(
            "forged {} {} shadow '{}' ({})",
            shadow.rarity,
            shadow.class,
            shadow.name,
            shadow.id
        );

        self.shadows.push(shadow.clone());
        self.save_user().await;
        self.save_shadows().await;
        Ok(shadow)
    }

    /// The logged-in user's shadow collection.
    pub fn shadows(&self) -> Vec<&Shadow> {
        match &self.user {
            Some(user) => self
                .shadows
                .iter()
                .filter(|s| s.owner == ShadowOwner::User(user.id))
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn shadow(&self, id: ShadowId) -> Option<&Shadow> {
        self.shadows.iter().find(|s| s.id == id)
    }

    /// Mutable access to an owned shadow, for trainer and item effects.
    pub fn shadow_mut(&mut self, id: ShadowId) -> Option<&mut Shadow> {
        self.shadows.iter_mut().find(|s| s.id == id)
    }

    /// Manually ascend a shadow one level. Experience resets to zero.
    pub async fn level_up_shadow(&mut self, id: ShadowId) -> Result<u32, SessionError> {
        self.require_user()?;
        let shadow = self
            .shadows
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(SessionError::ShadowNotFound(id))?;

        shadow.experience = 0;
        shadow.grow_level();
        let level = shadow.level;

        self.save_shadows().await;
        Ok(level)
    }

    // ========================================================================
    // Battle
    // ========================================================================

    /// Start a battle with one of the user's shadows against a generated
    /// opponent. Only one battle may be in progress at a time.
    pub fn start_battle(
        &mut self,
        shadow_id: ShadowId,
        mode: BattleMode,
    ) -> Result<&Battle, SessionError> {
        let user = self.require_user()?;
        if self.battle.is_some() {
            return Err(SessionError::BattleInProgress);
        }

        let owner = ShadowOwner::User(user.id);
        let shadow = self
            .shadows
            .iter()
            .find(|s| s.id == shadow_id && s.owner == owner)
            .ok_or(SessionError::ShadowNotFound(shadow_id))?;

        let battle = Battle::start(shadow, mode, &mut rand::thread_rng());
        Ok(&*self.battle.insert(battle))
    }

    pub fn current_battle(&self) -> Option<&Battle> {
        self.battle.as_ref()
    }

    /// Resolve a player battle action. When the battle continues, the
    /// returned pending turn must be fed back through
    /// `resolve_opponent_turn` (or the delayed variant) before the player
    /// may act again.
    pub fn perform_battle_action(
        &mut self,
        action: BattleAction,
    ) -> Result<(BattleTurn, Option<PendingOpponentTurn>), SessionError> {
        let battle = self.battle.as_mut().ok_or(SessionError::NoActiveBattle)?;
        Ok(battle.perform_player_action(action, &mut rand::thread_rng())?)
    }

    /// Resolve the opponent's scheduled turn immediately. A token issued
    /// for a battle that has since ended or been abandoned is rejected.
    pub fn resolve_opponent_turn(
        &mut self,
        pending: PendingOpponentTurn,
    ) -> Result<BattleTurn, SessionError> {
        match self.battle.as_mut() {
            Some(battle) => Ok(battle.resolve_opponent_turn(pending, &mut rand::thread_rng())?),
            None => Err(BattleError::StaleOpponentTurn.into()),
        }
    }

    /// Resolve the opponent's scheduled turn after the configured delay,
    /// for UIs that want the original pacing. The staleness guard still
    /// applies after the sleep.
    pub async fn resolve_opponent_turn_after_delay(
        &mut self,
        pending: PendingOpponentTurn,
    ) -> Result<BattleTurn, SessionError> {
        tokio::time::sleep(self.config.opponent_turn_delay).await;
        self.resolve_opponent_turn(pending)
    }

    /// End the current battle, committing any pending reward.
    ///
    /// From a finished, won battle the reward is applied to the user and
    /// the participating shadow (which may level up, repeatedly for a large
    /// reward). Ending an unfinished battle abandons it and forfeits any
    /// reward. The battle itself is discarded either way.
    pub async fn end_battle(&mut self) -> Result<Option<BattleReward>, SessionError> {
        let battle = self.battle.take().ok_or(SessionError::NoActiveBattle)?;

        let Some(reward) = battle.reward else {
            if !battle.is_finished() {
                log::info!("battle {} abandoned", battle.id);
            }
            return Ok(None);
        };

        if let Some(user) = self.user.as_mut() {
            if let Some(shadow) = self
                .shadows
                .iter_mut()
                .find(|s| s.id == battle.player_shadow.id)
            {
                let levels = crate::progress::apply_battle_reward(user, shadow, &reward);
                if levels > 0 {
                    log::info!("shadow {} gained {levels} level(s)", shadow.name);
                }
            } else {
                user.shadow_tokens += reward.shadow_tokens;
            }
        }

        self.save_user().await;
        self.save_shadows().await;
        Ok(Some(reward))
    }

    // ========================================================================
    // Adventure
    // ========================================================================

    pub fn adventure(&self) -> &Adventure {
        &self.adventure
    }

    pub fn progress(&self) -> &AdventureProgress {
        &self.adventure.progress
    }

    /// Enter an unlocked stage, seeding its content on first visit.
    pub async fn enter_stage(&mut self, id: &StageId) -> Result<&AdventureStage, SessionError> {
        self.require_user()?;
        if self.adventure.stage(id).is_none() {
            return Err(ProgressError::StageNotFound(id.clone()).into());
        }
        if !self.adventure.is_unlocked(id) {
            return Err(ProgressError::StageLocked(id.clone()).into());
        }

        let generator = self.generator.as_ref();
        let Some(stage) = self.adventure.stage_mut(id) else {
            return Err(ProgressError::StageNotFound(id.clone()).into());
        };
        let was_empty = stage.enemies.is_empty();
        crate::content::populate_stage(stage, generator);

        if was_empty {
            self.save_adventure().await;
        }
        self.adventure
            .stage(id)
            .ok_or_else(|| ProgressError::StageNotFound(id.clone()).into())
    }

    /// Complete an unlocked stage, advancing the unlock graph and crediting
    /// stage rewards. Re-completion is a no-op.
    pub async fn complete_stage(
        &mut self,
        id: &StageId,
    ) -> Result<StageCompletion, SessionError> {
        let user = self.user.as_mut().ok_or(SessionError::NotAuthenticated)?;
        if self.adventure.stage(id).is_some() && !self.adventure.is_unlocked(id) {
            return Err(ProgressError::StageLocked(id.clone()).into());
        }

        let completion = self.adventure.complete_stage(id, user)?;

        self.save_user().await;
        self.save_adventure().await;
        Ok(completion)
    }

    // ========================================================================
    // Persistence (best-effort)
    // ========================================================================

    async fn save_user(&self) {
        if let Some(user) = &self.user {
            if let Err(err) = persist::save_entity(self.store.as_ref(), USER_KEY, user).await {
                log::warn!("failed to save user snapshot: {err}");
            }
        }
    }

    async fn save_shadows(&self) {
        if let Err(err) =
            persist::save_entity(self.store.as_ref(), SHADOWS_KEY, &self.shadows).await
        {
            log::warn!("failed to save shadow collection snapshot: {err}");
        }
    }

    async fn save_adventure(&self) {
        if let Err(err) =
            persist::save_entity(self.store.as_ref(), PROGRESS_KEY, &self.adventure.progress)
                .await
        {
            log::warn!("failed to save adventure progress snapshot: {err}");
        }
        if let Err(err) =
            persist::save_entity(self.store.as_ref(), STAGES_KEY, &self.adventure.stages).await
        {
            log::warn!("failed to save adventure stages snapshot: {err}");
        }
    }
}
