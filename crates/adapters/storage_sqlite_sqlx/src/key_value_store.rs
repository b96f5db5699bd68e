//! `SQLite` implementation of [`KeyValueStore`].

use std::future::Future;

use sqlx::SqlitePool;

use smarttrack_app::ports::KeyValueStore;
use smarttrack_domain::error::TrackerError;

use crate::error::StorageError;

const SELECT: &str = "SELECT value FROM key_values WHERE key = ?";
const UPSERT: &str = r"
    INSERT INTO key_values (key, value) VALUES (?, ?)
    ON CONFLICT (key) DO UPDATE SET value = excluded.value
";
const DELETE: &str = "DELETE FROM key_values WHERE key = ?";

/// `SQLite`-backed string store.
#[derive(Clone)]
pub struct SqliteKeyValueStore {
    pool: SqlitePool,
}

impl SqliteKeyValueStore {
    /// Create a new store using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl KeyValueStore for SqliteKeyValueStore {
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, TrackerError>> + Send {
        let pool = self.pool.clone();
        let key = key.to_owned();
        async move {
            let row: Option<(String,)> = sqlx::query_as(SELECT)
                .bind(&key)
                .fetch_optional(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(row.map(|(value,)| value))
        }
    }

    fn set(&self, key: &str, value: &str) -> impl Future<Output = Result<(), TrackerError>> + Send {
        let pool = self.pool.clone();
        let key = key.to_owned();
        let value = value.to_owned();
        async move {
            sqlx::query(UPSERT)
                .bind(&key)
                .bind(&value)
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(())
        }
    }

    fn remove(&self, key: &str) -> impl Future<Output = Result<(), TrackerError>> + Send {
        let pool = self.pool.clone();
        let key = key.to_owned();
        async move {
            sqlx::query(DELETE)
                .bind(&key)
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use smarttrack_app::services::device_registry::DeviceRegistry;
    use smarttrack_domain::device::DeviceRef;
    use smarttrack_domain::id::DeviceId;

    use super::*;
    use crate::pool::Config;

    async fn setup() -> SqliteKeyValueStore {
        let db = Config {
            database_url: "sqlite::memory:".to_string(),
        }
        .build()
        .await
        .unwrap();
        db.key_value_store()
    }

    #[tokio::test]
    async fn should_return_none_when_key_missing() {
        let store = setup().await;
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn should_overwrite_existing_value() {
        let store = setup().await;
        store.set("k", "first").await.unwrap();
        store.set("k", "second").await.unwrap();

        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn should_remove_key_and_ignore_missing() {
        let store = setup().await;
        store.set("k", "v").await.unwrap();

        store.remove("k").await.unwrap();
        store.remove("k").await.unwrap();

        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn should_back_device_registry() {
        let registry = DeviceRegistry::new(setup().await);
        let device = DeviceRef::new(
            DeviceId::new("A4:C1:38:5B:0E:DF").unwrap(),
            Some("SmartTrack".to_owned()),
        );

        registry.remember(&device).await.unwrap();
        let recalled = registry.recall().await.unwrap().unwrap();
        assert_eq!(recalled, device);
        assert_eq!(recalled.display_name, "SmartTrack");

        registry.forget().await.unwrap();
        assert!(registry.recall().await.unwrap().is_none());
    }
}
