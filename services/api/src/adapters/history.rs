//! services/api/src/adapters/history.rs
//!
//! This module contains the history-store adapter, the concrete
//! implementation of the `HistoryStore` port. The whole bounded history list
//! is serialized as one JSON blob and kept under a single fixed key in a
//! PostgreSQL key-value table, mirroring the browser local-storage shape it
//! replaces.

use async_trait::async_trait;
use lessongen_core::history::{LessonHistory, HISTORY_STORAGE_KEY};
use lessongen_core::ports::{HistoryStore, PortError, PortResult};
use sqlx::PgPool;
use tracing::warn;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `HistoryStore` port.
#[derive(Clone)]
pub struct DbHistoryStore {
    pool: PgPool,
}

impl DbHistoryStore {
    /// Creates a new `DbHistoryStore`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

//=========================================================================================
// `HistoryStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl HistoryStore for DbHistoryStore {
    /// Loads the full history list. A missing row means no history yet; an
    /// undecodable blob is logged and treated as empty, never fatal.
    async fn load(&self) -> PortResult<LessonHistory> {
        let row: Option<(Vec<u8>,)> =
            sqlx::query_as("SELECT value FROM kv_store WHERE key = $1")
                .bind(HISTORY_STORAGE_KEY)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| PortError::Unexpected(e.to_string()))?;

        match row {
            None => Ok(LessonHistory::new()),
            Some((bytes,)) => match serde_json::from_slice(&bytes) {
                Ok(history) => Ok(history),
                Err(e) => {
                    warn!("Failed to load stored lesson history, starting empty: {}", e);
                    Ok(LessonHistory::new())
                }
            },
        }
    }

    /// Writes the full list back under the fixed key (read-modify-write is
    /// the caller's responsibility; append is the sole mutation).
    async fn save(&self, history: &LessonHistory) -> PortResult<()> {
        let bytes =
            serde_json::to_vec(history).map_err(|e| PortError::Unexpected(e.to_string()))?;

        sqlx::query(
            "INSERT INTO kv_store (key, value, updated_at) VALUES ($1, $2, NOW()) \
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()",
        )
        .bind(HISTORY_STORAGE_KEY)
        .bind(bytes)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(())
    }
}
