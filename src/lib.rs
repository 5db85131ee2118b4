//! Shadow Realm game engine.
//!
//! This crate provides:
//! - Shadow forging with class base stats and weighted rarity rolls
//! - Turn-based battles against generated opponents, with rewards and leveling
//! - An adventure map with prerequisite-gated stage unlocks
//! - Snapshot persistence for user, collection, and progress
//!
//! # Quick Start
//!
//! ```ignore
//! use shadow_core::{BattleAction, BattleMode, GameSession, SessionConfig, ShadowClass};
//! use shadow_core::persist::FileStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Box::new(FileStore::new("saves"));
//!     let mut session = GameSession::new(SessionConfig::new(), store).await?;
//!     session.login().await;
//!
//!     let shadow = session.create_shadow("Umbra", ShadowClass::Warrior).await?;
//!     session.start_battle(shadow.id, BattleMode::Pve)?;
//!     let (turn, _pending) = session.perform_battle_action(BattleAction::Attack)?;
//!     println!("dealt {} damage", turn.outcome.damage);
//!     Ok(())
//! }
//! ```

pub mod battle;
pub mod class_data;
pub mod content;
pub mod persist;
pub mod progress;
pub mod session;
pub mod testing;
pub mod world;

// Primary public API
pub use battle::{
    Battle, BattleAction, BattleError, BattleMode, BattleReward, BattleStatus, BattleTurn,
    PendingOpponentTurn, TurnActor,
};
pub use content::{ContentGenerator, MockGenerator};
pub use persist::{FileStore, MemoryStore, SnapshotStore};
pub use progress::{Adventure, AdventureProgress, AdventureStage, StageCompletion};
pub use session::{GameSession, SessionConfig, SessionError};
pub use testing::TestHarness;
pub use world::{Rarity, Shadow, ShadowClass, ShadowId, StageId, User, UserId};
