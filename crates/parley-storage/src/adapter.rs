// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter and CredentialSource traits.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use parley_config::model::StorageConfig;
use parley_core::types::{Channel, PlatformCredentials};
use parley_core::{
    AdapterType, CredentialSource, HealthStatus, ParleyError, PluginAdapter, StorageAdapter,
};

use crate::database::Database;
use crate::models::PlatformRow;
use crate::queries;

/// SQLite-backed storage adapter.
///
/// The database is opened on the first call to [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Wrap an already opened database.
    pub fn from_database(config: StorageConfig, db: Database) -> Self {
        Self {
            config,
            db: OnceCell::new_with(Some(db)),
        }
    }

    /// The underlying Database, or an error if not initialized.
    pub fn database(&self) -> Result<&Database, ParleyError> {
        self.db.get().ok_or_else(|| ParleyError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
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

    async fn health_check(&self) -> Result<HealthStatus, ParleyError> {
        match self.database()?.ping().await {
            Ok(()) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), ParleyError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), ParleyError> {
        let db =
            Database::open_with_options(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| ParleyError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), ParleyError> {
        self.database()?.checkpoint().await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

#[async_trait]
impl CredentialSource for SqliteStorage {
    async fn credentials(
        &self,
        channel: Channel,
    ) -> Result<Option<PlatformCredentials>, ParleyError> {
        let row = queries::platforms::get_platform(self.database()?, channel).await?;
        Ok(row.and_then(row_to_credentials))
    }
}

/// Platform rows without a token cannot send.
fn row_to_credentials(row: PlatformRow) -> Option<PlatformCredentials> {
    let token = row.token.filter(|t| !t.is_empty())?;
    let account_id = match row.platform {
        Channel::WhatsApp => row.phone_number_id,
        Channel::Instagram => row.platform_id,
        Channel::Telegram => None,
    };
    Some(PlatformCredentials {
        channel: row.platform,
        token,
        account_id,
        active: row.active,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PlatformUpsert;
    use tempfile::tempdir;

    fn config_in(dir: &tempfile::TempDir) -> StorageConfig {
        StorageConfig {
            database_path: dir.path().join("adapter.db").to_string_lossy().into_owned(),
            wal_mode: true,
        }
    }

    #[tokio::test]
    async fn uninitialized_storage_reports_error() {
        let dir = tempdir().unwrap();
        let storage = SqliteStorage::new(config_in(&dir));
        assert!(storage.database().is_err());
        assert!(storage.health_check().await.is_err());
    }

    #[tokio::test]
    async fn initialize_twice_fails() {
        let dir = tempdir().unwrap();
        let storage = SqliteStorage::new(config_in(&dir));
        storage.initialize().await.unwrap();
        assert_eq!(storage.health_check().await.unwrap(), HealthStatus::Healthy);
        assert!(storage.initialize().await.is_err());
        storage.close().await.unwrap();
    }

    #[tokio::test]
    async fn credentials_come_from_platform_rows() {
        let dir = tempdir().unwrap();
        let storage = SqliteStorage::new(config_in(&dir));
        storage.initialize().await.unwrap();
        let db = storage.database().unwrap();

        queries::platforms::upsert_platform(
            db,
            Channel::WhatsApp,
            &PlatformUpsert {
                token: Some("wa-token".into()),
                phone_number_id: Some("555".into()),
                active: true,
                ..Default::default()
            },
            "2026-01-01T00:00:00.000Z",
        )
        .await
        .unwrap();
        queries::platforms::upsert_platform(
            db,
            Channel::Instagram,
            &PlatformUpsert {
                platform_id: Some("page-9".into()),
                token: Some("ig-token".into()),
                active: false,
                ..Default::default()
            },
            "2026-01-01T00:00:00.000Z",
        )
        .await
        .unwrap();

        let wa = storage.credentials(Channel::WhatsApp).await.unwrap().unwrap();
        assert_eq!(wa.token, "wa-token");
        assert_eq!(wa.account_id.as_deref(), Some("555"));
        assert!(wa.active);

        let ig = storage.credentials(Channel::Instagram).await.unwrap().unwrap();
        assert_eq!(ig.account_id.as_deref(), Some("page-9"));
        assert!(!ig.active);

        assert!(storage.credentials(Channel::Telegram).await.unwrap().is_none());
    }
}
