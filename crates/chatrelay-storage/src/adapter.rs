// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the relay's storage-side traits.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use chatrelay_config::model::StorageConfig;
use chatrelay_core::types::{Agent, AiModel};
use chatrelay_core::{
    AdapterType, AgentCatalog, HealthStatus, PluginAdapter, RelayError, SessionStore,
    TranscriptStore,
};

use crate::database::{Database, map_tr_err};
use crate::queries;

/// SQLite-backed catalog, transcript store and session store.
///
/// The database is opened lazily by [`SqliteStorage::initialize`]; every
/// other call fails until then.
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage; nothing is opened yet.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Open the database and run migrations. Fails if called twice.
    pub async fn initialize(&self) -> Result<(), RelayError> {
        let db = Database::open(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| RelayError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    /// Returns the underlying Database, or an error if not initialized.
    pub fn database(&self) -> Result<&Database, RelayError> {
        self.db.get().ok_or_else(|| RelayError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, RelayError> {
        self.database()?
            .connection()
            .call(|conn| conn.query_row("SELECT 1", [], |_| Ok(())))
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), RelayError> {
        if let Some(db) = self.db.get() {
            if self.config.wal_mode {
                db.checkpoint().await?;
                debug!("shutdown: WAL checkpoint complete");
            }
        }
        Ok(())
    }
}

#[async_trait]
impl AgentCatalog for SqliteStorage {
    async fn agent_by_bot(&self, bot_id: i64) -> Result<Option<Agent>, RelayError> {
        queries::agents::agent_by_bot(self.database()?, bot_id).await
    }

    async fn model_by_id(&self, model_id: i64) -> Result<Option<AiModel>, RelayError> {
        queries::agents::model_by_id(self.database()?, model_id).await
    }
}

#[async_trait]
impl TranscriptStore for SqliteStorage {
    async fn update_content_by_send_id(
        &self,
        send_id: i64,
        content: &str,
    ) -> Result<bool, RelayError> {
        queries::messages::update_content_by_send_id(self.database()?, send_id, content).await
    }
}

#[async_trait]
impl SessionStore for SqliteStorage {
    async fn insert_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, RelayError> {
        let now = now_ms();
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        queries::sessions::insert_if_absent(
            self.database()?,
            key,
            value,
            now,
            now.saturating_add(ttl_ms),
        )
        .await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, RelayError> {
        queries::sessions::get_live(self.database()?, key, now_ms()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn make_config(path: &std::path::Path) -> StorageConfig {
        StorageConfig {
            database_path: path.to_str().unwrap().to_string(),
            wal_mode: true,
        }
    }

    #[tokio::test]
    async fn identity() {
        let dir = tempdir().unwrap();
        let storage = SqliteStorage::new(make_config(&dir.path().join("id.db")));
        assert_eq!(storage.name(), "sqlite");
        assert_eq!(storage.adapter_type(), AdapterType::Storage);
    }

    #[tokio::test]
    async fn initialize_creates_file_and_rejects_second_call() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("init.db");
        let storage = SqliteStorage::new(make_config(&path));

        storage.initialize().await.unwrap();
        assert!(path.exists());
        assert!(storage.initialize().await.is_err());
    }

    #[tokio::test]
    async fn calls_fail_before_initialize() {
        let dir = tempdir().unwrap();
        let storage = SqliteStorage::new(make_config(&dir.path().join("none.db")));
        assert!(storage.health_check().await.is_err());
        assert!(storage.get("stream:x").await.is_err());
    }

    #[tokio::test]
    async fn session_round_trip_and_collision() {
        let dir = tempdir().unwrap();
        let storage = SqliteStorage::new(make_config(&dir.path().join("s.db")));
        storage.initialize().await.unwrap();

        let ttl = Duration::from_secs(600);
        assert!(storage.insert_if_absent("stream:abc", "{}", ttl).await.unwrap());
        assert!(!storage.insert_if_absent("stream:abc", "[]", ttl).await.unwrap());
        assert_eq!(storage.get("stream:abc").await.unwrap().as_deref(), Some("{}"));
        assert!(storage.get("stream:nope").await.unwrap().is_none());

        assert_eq!(storage.health_check().await.unwrap(), HealthStatus::Healthy);
        storage.shutdown().await.unwrap();
    }
}
