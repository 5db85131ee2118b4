//! Snapshot persistence for game state.
//!
//! Each persisted entity (user profile, shadow collection, adventure state)
//! is serialized independently as a versioned JSON envelope and stored under
//! a stable key through the `SnapshotStore` trait. Persistence is
//! best-effort local storage: writes happen after state changes settle and
//! are not part of any transaction boundary.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::sync::Mutex;

/// Current snapshot format version.
const SNAPSHOT_VERSION: u32 = 1;

/// Stable keys for the persisted entities.
pub const USER_KEY: &str = "shadowmage_user";
pub const SHADOWS_KEY: &str = "shadowmage_shadows";
pub const PROGRESS_KEY: &str = "shadowmage_adventure_progress";
pub const STAGES_KEY: &str = "shadowmage_adventure_stages";

/// Errors from persistence operations.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
}

// ============================================================================
// Snapshot Envelope
// ============================================================================

/// Versioned wrapper around one persisted entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot<T> {
    /// Snapshot format version for compatibility checking.
    pub version: u32,

    /// When the snapshot was written (unix seconds).
    pub saved_at: String,

    /// The entity itself.
    pub data: T,
}

impl<T: Serialize + DeserializeOwned> Snapshot<T> {
    pub fn new(data: T) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            saved_at: unix_now(),
            data,
        }
    }

    /// Serialize the envelope to pretty JSON.
    pub fn encode(&self) -> Result<String, PersistError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse an envelope, checking the format version.
    pub fn decode(content: &str) -> Result<Self, PersistError> {
        let snapshot: Self = serde_json::from_str(content)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(PersistError::VersionMismatch {
                expected: SNAPSHOT_VERSION,
                found: snapshot.version,
            });
        }
        Ok(snapshot)
    }
}

/// Read just the envelope metadata without deserializing the entity.
pub fn peek_saved_at(content: &str) -> Result<String, PersistError> {
    #[derive(Deserialize)]
    struct Partial {
        version: u32,
        saved_at: String,
    }

    let partial: Partial = serde_json::from_str(content)?;
    if partial.version != SNAPSHOT_VERSION {
        return Err(PersistError::VersionMismatch {
            expected: SNAPSHOT_VERSION,
            found: partial.version,
        });
    }
    Ok(partial.saved_at)
}

/// Current timestamp as unix seconds.
fn unix_now() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!("{}", now.as_secs())
}

// ============================================================================
// Stores
// ============================================================================

/// Simple load/save interface over a local key-value store.
///
/// `load` returns `Ok(None)` when no snapshot exists under the key, which
/// callers treat as "initialize default state".
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn load(&self, key: &str) -> Result<Option<String>, PersistError>;
    async fn save(&self, key: &str, content: &str) -> Result<(), PersistError>;
    async fn remove(&self, key: &str) -> Result<(), PersistError>;
}

/// File-backed store: one JSON file per key inside a base directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    base_dir: PathBuf,
}

impl FileStore {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let sanitized = key
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect::<String>();
        self.base_dir.join(format!("{sanitized}.json"))
    }
}

#[async_trait]
impl SnapshotStore for FileStore {
    async fn load(&self, key: &str) -> Result<Option<String>, PersistError> {
        match fs::read_to_string(self.path_for(key)).await {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn save(&self, key: &str, content: &str) -> Result<(), PersistError> {
        fs::create_dir_all(&self.base_dir).await?;
        fs::write(self.path_for(key), content).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), PersistError> {
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn load(&self, key: &str) -> Result<Option<String>, PersistError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn save(&self, key: &str, content: &str) -> Result<(), PersistError> {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), content.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), PersistError> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}

// ============================================================================
// Typed Helpers
// ============================================================================

/// Save an entity under a key, wrapped in a versioned envelope.
pub async fn save_entity<T: Serialize + DeserializeOwned>(
    store: &dyn SnapshotStore,
    key: &str,
    entity: &T,
) -> Result<(), PersistError>
where
    T: Clone,
{
    let snapshot = Snapshot::new(entity.clone());
    store.save(key, &snapshot.encode()?).await
}

/// Load an entity from a key, or `None` when no snapshot exists.
pub async fn load_entity<T: Serialize + DeserializeOwned>(
    store: &dyn SnapshotStore,
    key: &str,
) -> Result<Option<T>, PersistError> {
    match store.load(key).await? {
        Some(content) => Ok(Some(Snapshot::<T>::decode(&content)?.data)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::User;

    #[test]
    fn test_envelope_round_trip() {
        let user = User::guest("Shadow Mage", "guest@shadowrealm.com", 100);
        let snapshot = Snapshot::new(user.clone());
        let encoded = snapshot.encode().expect("encode should succeed");

        let decoded = Snapshot::<User>::decode(&encoded).expect("decode should succeed");
        assert_eq!(decoded.version, SNAPSHOT_VERSION);
        assert_eq!(decoded.data.username, user.username);
        assert_eq!(decoded.data.shadow_tokens, 100);
    }

    #[test]
    fn test_version_mismatch_is_rejected() {
        let user = User::guest("Shadow Mage", "guest@shadowrealm.com", 100);
        let mut snapshot = Snapshot::new(user);
        snapshot.version = 99;
        let encoded = snapshot.encode().expect("encode should succeed");

        let err = Snapshot::<User>::decode(&encoded).expect_err("wrong version must fail");
        assert!(matches!(
            err,
            PersistError::VersionMismatch { expected: 1, found: 99 }
        ));
    }

    #[test]
    fn test_peek_saved_at() {
        let user = User::guest("Shadow Mage", "guest@shadowrealm.com", 100);
        let snapshot = Snapshot::new(user);
        let encoded = snapshot.encode().expect("encode should succeed");

        let saved_at = peek_saved_at(&encoded).expect("peek should succeed");
        assert_eq!(saved_at, snapshot.saved_at);
    }

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryStore::new();
        let user = User::guest("Shadow Mage", "guest@shadowrealm.com", 100);

        save_entity(&store, USER_KEY, &user)
            .await
            .expect("save should succeed");
        let loaded: Option<User> = load_entity(&store, USER_KEY)
            .await
            .expect("load should succeed");

        assert_eq!(loaded.expect("snapshot exists").id, user.id);
    }

    #[tokio::test]
    async fn test_missing_key_loads_none() {
        let store = MemoryStore::new();
        let loaded: Option<User> = load_entity(&store, USER_KEY)
            .await
            .expect("load should succeed");
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let store = MemoryStore::new();
        store.remove(USER_KEY).await.expect("remove missing key is fine");

        let user = User::guest("Shadow Mage", "guest@shadowrealm.com", 100);
        save_entity(&store, USER_KEY, &user)
            .await
            .expect("save should succeed");
        store.remove(USER_KEY).await.expect("remove should succeed");

        let loaded: Option<User> = load_entity(&store, USER_KEY)
            .await
            .expect("load should succeed");
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = FileStore::new(dir.path());
        let user = User::guest("Shadow Mage", "guest@shadowrealm.com", 100);

        save_entity(&store, USER_KEY, &user)
            .await
            .expect("save should succeed");
        assert!(dir.path().join("shadowmage_user.json").exists());

        let loaded: Option<User> = load_entity(&store, USER_KEY)
            .await
            .expect("load should succeed");
        assert_eq!(loaded.expect("snapshot exists").email, user.email);
    }

    #[tokio::test]
    async fn test_file_store_missing_file_loads_none() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = FileStore::new(dir.path().join("nested"));

        let loaded: Option<User> = load_entity(&store, USER_KEY)
            .await
            .expect("load should succeed");
        assert!(loaded.is_none());
    }
}
