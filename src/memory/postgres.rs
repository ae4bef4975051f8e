//! Direct Postgres history backend
//!
//! Same `chat_history` table as the Supabase backend, reached without
//! PostgREST. `chat_id` is a bigint, so only numeric conversation ids
//! (Telegram chat ids) can be stored here.

use crate::error::RelayError;
use crate::memory::store::HistoryStore;
use crate::models::{decode_history, ConversationId, ConversationRecord, HistoryEntry};
use crate::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use std::sync::Arc;
use tokio::sync::OnceCell;

pub struct PostgresHistoryStore {
    pool: PgPool,
    schema_ready: Arc<OnceCell<()>>,
}

/// Bind value for the bigint `chat_id` column
fn chat_key(id: &ConversationId) -> Result<i64> {
    id.as_i64().ok_or_else(|| {
        RelayError::Storage(format!(
            "chat_history.chat_id is bigint; cannot store non-numeric id {}",
            id
        ))
    })
}

impl PostgresHistoryStore {
    /// Create the pool without connecting; the first query opens a connection.
    pub fn connect_lazy(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect_lazy(url)?;

        Ok(Self {
            pool,
            schema_ready: Arc::new(OnceCell::new()),
        })
    }

    async fn ensure_schema(&self) -> Result<()> {
        self.schema_ready
            .get_or_try_init(|| async {
                sqlx::query(
                    r#"
                    CREATE TABLE IF NOT EXISTS chat_history (
                      chat_id BIGINT PRIMARY KEY,
                      history JSONB NOT NULL DEFAULT '[]'::jsonb,
                      updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                    );
                    "#,
                )
                .execute(&self.pool)
                .await?;

                Ok::<(), sqlx::Error>(())
            })
            .await
            .map_err(|e| {
                RelayError::Storage(format!("Failed to initialize chat_history schema: {}", e))
            })?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl HistoryStore for PostgresHistoryStore {
    async fn fetch(&self, id: &ConversationId) -> Result<Vec<HistoryEntry>> {
        let key = chat_key(id)?;
        self.ensure_schema().await?;

        let row = sqlx::query("SELECT history FROM chat_history WHERE chat_id = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RelayError::Storage(format!("Failed to load chat history: {}", e)))?;

        let Some(row) = row else {
            return Ok(Vec::new());
        };

        let history: serde_json::Value = row
            .try_get("history")
            .map_err(|e| RelayError::Storage(format!("Unreadable history column: {}", e)))?;

        decode_history(history)
            .map_err(|e| RelayError::Storage(format!("Malformed stored history: {}", e)))
    }

    async fn save(&self, id: &ConversationId, history: &[HistoryEntry]) -> Result<()> {
        let key = chat_key(id)?;
        self.ensure_schema().await?;

        let record = ConversationRecord::new(id.clone(), history.to_vec());

        sqlx::query(
            r#"
            INSERT INTO chat_history (chat_id, history, updated_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (chat_id)
            DO UPDATE SET history = EXCLUDED.history, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(key)
        .bind(Json(&record.history))
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RelayError::Storage(format!("Failed to upsert chat history: {}", e)))?;

        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
