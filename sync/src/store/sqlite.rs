//! SQLite-backed key-value store for on-device persistence.

use std::str::FromStr;

use futures::future::BoxFuture;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use super::{KvStore, StorageError, StorageResult};

/// Durable store keeping each blob as one row of `kv_store`.
#[derive(Debug, Clone)]
pub struct SqliteKvStore {
    pool: SqlitePool,
}

impl SqliteKvStore {
    /// Open (creating if missing) the database and run migrations.
    ///
    /// A single connection is used: the store has one logical writer, and
    /// `sqlite::memory:` databases are per-connection.
    pub async fn connect(database_url: &str) -> StorageResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;

        tracing::info!(database_url = %database_url, "key-value store ready");
        Ok(store)
    }

    /// Wrap an existing pool. Migrations are the caller's responsibility.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Run database migrations.
    pub async fn run_migrations(&self) -> StorageResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StorageError::unavailable("failed to run kv store migrations", e))
    }
}

impl KvStore for SqliteKvStore {
    fn get(&self, key: &str) -> BoxFuture<'static, StorageResult<Option<String>>> {
        let pool = self.pool.clone();
        let key = key.to_string();

        Box::pin(async move {
            let row: Option<(String,)> = sqlx::query_as("SELECT value FROM kv_store WHERE key = ?1")
                .bind(&key)
                .fetch_optional(&pool)
                .await?;
            Ok(row.map(|(value,)| value))
        })
    }

    fn set(&self, key: &str, value: String) -> BoxFuture<'static, StorageResult<()>> {
        let pool = self.pool.clone();
        let key = key.to_string();
        let updated_at = chrono::Utc::now().timestamp_millis();

        Box::pin(async move {
            sqlx::query(
                r#"
                INSERT INTO kv_store (key, value, updated_at)
                VALUES (?1, ?2, ?3)
                ON CONFLICT (key) DO UPDATE SET
                    value = excluded.value,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(&key)
            .bind(&value)
            .bind(updated_at)
            .execute(&pool)
            .await?;
            Ok(())
        })
    }

    fn remove(&self, key: &str) -> BoxFuture<'static, StorageResult<()>> {
        let pool = self.pool.clone();
        let key = key.to_string();

        Box::pin(async move {
            sqlx::query("DELETE FROM kv_store WHERE key = ?1")
                .bind(&key)
                .execute(&pool)
                .await?;
            Ok(())
        })
    }
}
