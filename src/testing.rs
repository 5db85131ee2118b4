//! Testing utilities for the Shadow Realm engine.
//!
//! This module provides tools for integration testing:
//! - `TestHarness` for scripted session scenarios over an in-memory store
//! - Assertion helpers for verifying session state

use crate::battle::{BattleAction, BattleMode, BattleReward};
use crate::persist::MemoryStore;
use crate::session::{GameSession, SessionConfig};
use crate::world::{Shadow, ShadowClass, ShadowId, StageId, User};
use std::time::Duration;

/// Test harness for running session scenarios.
///
/// Wraps a `GameSession` over an in-memory store with a logged-in guest and
/// a zero opponent-turn delay, so scenarios run instantly and leave nothing
/// on disk.
pub struct TestHarness {
    /// The session under test.
    pub session: GameSession,
}

impl TestHarness {
    /// Create a harness with a fresh, logged-in session.
    pub async fn new() -> Self {
        Self::with_config(
            SessionConfig::new().with_opponent_turn_delay(Duration::ZERO),
        )
        .await
    }

    /// Create a harness with a custom configuration.
    pub async fn with_config(config: SessionConfig) -> Self {
        let mut session = GameSession::new(config, Box::new(MemoryStore::new()))
            .await
            .expect("in-memory session creation cannot fail");
        session.login().await;
        Self { session }
    }

    /// The logged-in user.
    pub fn user(&self) -> &User {
        self.session
            .current_user()
            .expect("harness sessions are logged in")
    }

    /// Current shadow token balance.
    pub fn tokens(&self) -> u32 {
        self.user().shadow_tokens
    }

    /// Forge a shadow, panicking on failure.
    pub async fn forge(&mut self, name: &str, class: ShadowClass) -> Shadow {
        self.session
            .create_shadow(name, class)
            .await
            .expect("shadow creation should succeed")
    }

    /// Set a shadow's attack stat directly, for forcing battle outcomes.
    pub fn set_attack(&mut self, id: ShadowId, attack: i32) {
        self.session
            .shadow_mut(id)
            .expect("shadow should exist")
            .stats
            .attack = attack;
    }

    /// Run a full PvE battle to a guaranteed win and commit the reward.
    ///
    /// The shadow's attack is boosted so its first strike is lethal.
    pub async fn win_battle(&mut self, id: ShadowId) -> BattleReward {
        self.set_attack(id, 100_000);
        self.session
            .start_battle(id, BattleMode::Pve)
            .expect("battle should start");

        let (_, pending) = self
            .session
            .perform_battle_action(BattleAction::Attack)
            .expect("attack should resolve");
        assert!(pending.is_none(), "a lethal first strike ends the battle");

        self.session
            .end_battle()
            .await
            .expect("ending a finished battle should succeed")
            .expect("victory carries a reward")
    }

    /// Look up a shadow's current level.
    pub fn shadow_level(&self, id: ShadowId) -> u32 {
        self.session
            .shadow(id)
            .expect("shadow should exist")
            .level
    }
}

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Assert the user's shadow token balance.
#[track_caller]
pub fn assert_tokens(harness: &TestHarness, expected: u32) {
    let actual = harness.tokens();
    assert_eq!(
        actual, expected,
        "Expected {expected} shadow tokens, got {actual}"
    );
}

/// Assert the size of the user's shadow collection.
#[track_caller]
pub fn assert_shadow_count(harness: &TestHarness, expected: usize) {
    let actual = harness.session.shadows().len();
    assert_eq!(actual, expected, "Expected {expected} shadows, got {actual}");
}

/// Assert a stage is unlocked.
#[track_caller]
pub fn assert_unlocked(harness: &TestHarness, id: &StageId) {
    assert!(
        harness.session.adventure().is_unlocked(id),
        "Expected stage '{id}' to be unlocked"
    );
}

/// Assert a stage is NOT unlocked.
#[track_caller]
pub fn assert_locked(harness: &TestHarness, id: &StageId) {
    assert!(
        !harness.session.adventure().is_unlocked(id),
        "Expected stage '{id}' to be locked"
    );
}

/// Assert no battle is in progress.
#[track_caller]
pub fn assert_no_battle(harness: &TestHarness) {
    assert!(
        harness.session.current_battle().is_none(),
        "Expected no battle in progress"
    );
}
