//! SQLite implementation of StateStorage.
//!
//! Persists conversation state snapshots to a local SQLite database, one
//! row per session holding the serialized state. The file is created on
//! first use, so a fresh deployment needs no migration step.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;

use crate::domain::conversation::ConversationState;
use crate::domain::foundation::SessionId;
use crate::ports::{StateStorage, StateStorageError};

/// SQLite-backed storage for conversation state.
#[derive(Clone)]
pub struct SqliteStateStorage {
    pool: SqlitePool,
}

impl SqliteStateStorage {
    /// Opens the database at the given path, creating file and schema on
    /// first use.
    pub async fn connect(db_path: &str) -> Result<Self, StateStorageError> {
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| {
                StateStorageError::DatabaseError(format!("Failed to open database: {}", e))
            })?;

        let storage = Self { pool };
        storage.init_schema().await?;
        Ok(storage)
    }

    async fn init_schema(&self) -> Result<(), StateStorageError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS conversation_states (
                session_id TEXT PRIMARY KEY,
                snapshot TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StateStorageError::DatabaseError(format!("Failed to create schema: {}", e)))?;

        Ok(())
    }
}

#[async_trait]
impl StateStorage for SqliteStateStorage {
    async fn save_state(
        &self,
        session_id: &SessionId,
        state: &ConversationState,
    ) -> Result<(), StateStorageError> {
        let snapshot = serde_json::to_string(state)
            .map_err(|e| StateStorageError::SerializationFailed(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO conversation_states (session_id, snapshot, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(session_id) DO UPDATE SET
                snapshot = excluded.snapshot,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(session_id.as_str())
        .bind(snapshot)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StateStorageError::DatabaseError(format!("Failed to save state: {}", e)))?;

        Ok(())
    }

    async fn load_state(
        &self,
        session_id: &SessionId,
    ) -> Result<ConversationState, StateStorageError> {
        let row = sqlx::query("SELECT snapshot FROM conversation_states WHERE session_id = ?1")
            .bind(session_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                StateStorageError::DatabaseError(format!("Failed to fetch state: {}", e))
            })?;

        let row = row.ok_or_else(|| StateStorageError::NotFound(session_id.clone()))?;

        let snapshot: String = row
            .try_get("snapshot")
            .map_err(|e| StateStorageError::DatabaseError(format!("Failed to read row: {}", e)))?;

        serde_json::from_str(&snapshot)
            .map_err(|e| StateStorageError::DeserializationFailed(e.to_string()))
    }

    async fn exists(&self, session_id: &SessionId) -> Result<bool, StateStorageError> {
        let result: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM conversation_states WHERE session_id = ?1")
                .bind(session_id.as_str())
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    StateStorageError::DatabaseError(format!(
                        "Failed to check state existence: {}",
                        e
                    ))
                })?;

        Ok(result.0 > 0)
    }

    async fn delete(&self, session_id: &SessionId) -> Result<(), StateStorageError> {
        sqlx::query("DELETE FROM conversation_states WHERE session_id = ?1")
            .bind(session_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                StateStorageError::DatabaseError(format!("Failed to delete state: {}", e))
            })?;

        Ok(())
    }
}
