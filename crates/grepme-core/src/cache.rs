//! `SQLite` cache for historical API responses.
//!
//! Message pages anchored at a `before_id` never change, so repeated searches
//! over old history can be answered from disk. The newest page and the
//! conversation listings are never cached. The database lives at
//! `$XDG_CACHE_HOME/grepme/responses/responses.db`; `--clear-cache` removes
//! the whole directory.

use std::path::Path;
use std::str::FromStr;

use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use crate::CoreError;

/// File name of the database inside the cache directory.
const DB_FILE: &str = "responses.db";

/// On-disk map from request key to JSON payload.
#[derive(Debug, Clone)]
pub struct ResponseCache {
    pool: SqlitePool,
}

impl ResponseCache {
    /// Open or create the cache inside `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or database cannot be created.
    pub async fn open(dir: &Path) -> Result<Self, CoreError> {
        std::fs::create_dir_all(dir).map_err(CoreError::Io)?;

        let db_path = dir.join(DB_FILE);
        let db_url = format!("sqlite:{}", db_path.display());
        let options = SqliteConnectOptions::from_str(&db_url)
            .map_err(|e| CoreError::Cache(format!("invalid db path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| CoreError::Cache(format!("opening cache db: {e}")))?;

        let cache = Self { pool };
        cache.run_migrations().await?;
        Ok(cache)
    }

    async fn run_migrations(&self) -> Result<(), CoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS responses (
                key TEXT PRIMARY KEY,
                body TEXT NOT NULL,
                stored_at INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| CoreError::Cache(format!("creating responses table: {e}")))?;
        Ok(())
    }

    /// Look up a stored payload.
    ///
    /// A row that no longer parses as JSON is treated as a miss.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn get(&self, key: &str) -> Result<Option<Value>, CoreError> {
        let row = sqlx::query("SELECT body FROM responses WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| CoreError::Cache(format!("reading {key}: {e}")))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let body: String = row
            .try_get("body")
            .map_err(|e| CoreError::Cache(format!("reading {key}: {e}")))?;
        match serde_json::from_str(&body) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                log::debug!("discarding corrupt cache entry {key}: {e}");
                Ok(None)
            }
        }
    }

    /// Store a payload, replacing any previous entry for `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the insert fails.
    pub async fn put(&self, key: &str, payload: &Value) -> Result<(), CoreError> {
        let body = serde_json::to_string(payload)
            .map_err(|e| CoreError::Serialization(format!("serializing {key}: {e}")))?;
        sqlx::query(
            "INSERT INTO responses (key, body, stored_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET body = excluded.body, stored_at = excluded.stored_at",
        )
        .bind(key)
        .bind(body)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| CoreError::Cache(format!("writing {key}: {e}")))?;
        Ok(())
    }

    /// Number of stored responses.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn entry_count(&self) -> Result<i64, CoreError> {
        sqlx::query("SELECT COUNT(*) AS n FROM responses")
            .fetch_one(&self.pool)
            .await
            .and_then(|row| row.try_get("n"))
            .map_err(|e| CoreError::Cache(format!("counting responses: {e}")))
    }

    /// Delete the cache directory and everything in it.
    ///
    /// Returns `false` if there was nothing to delete.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory exists but cannot be removed.
    pub fn purge(dir: &Path) -> Result<bool, CoreError> {
        match std::fs::remove_dir_all(dir) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CoreError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn stores_and_replaces_payloads() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = ResponseCache::open(&dir.path().join("responses"))
            .await
            .expect("open cache");

        assert_eq!(cache.get("/groups/1/messages?before_id=9").await.expect("get"), None);

        cache
            .put("/groups/1/messages?before_id=9", &json!({"messages": [1]}))
            .await
            .expect("put");
        cache
            .put("/groups/1/messages?before_id=9", &json!({"messages": [2]}))
            .await
            .expect("put again");

        assert_eq!(
            cache.get("/groups/1/messages?before_id=9").await.expect("get"),
            Some(json!({"messages": [2]}))
        );
        assert_eq!(cache.entry_count().await.expect("count"), 1);
    }

    #[tokio::test]
    async fn purge_removes_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache_dir = dir.path().join("responses");
        let cache = ResponseCache::open(&cache_dir).await.expect("open cache");
        cache.put("k", &json!(1)).await.expect("put");
        drop(cache);

        assert!(ResponseCache::purge(&cache_dir).expect("purge"));
        assert!(!cache_dir.exists());
        assert!(!ResponseCache::purge(&cache_dir).expect("second purge"));
    }
}
