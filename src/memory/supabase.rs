//! Supabase history backend
//!
//! Talks to the PostgREST endpoint of the `chat_history` table:
//! `chat_id` (primary key), `history` (jsonb), `updated_at` (timestamptz).

use crate::error::RelayError;
use crate::memory::store::HistoryStore;
use crate::models::{decode_history, ConversationId, ConversationRecord, HistoryEntry};
use crate::Result;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, error};

const TABLE: &str = "chat_history";

pub struct SupabaseHistoryStore {
    client: Client,
    table_url: String,
    key: String,
}

#[derive(Debug, Deserialize)]
struct HistoryRow {
    #[serde(default)]
    history: Value,
}

impl SupabaseHistoryStore {
    pub fn new(project_url: &str, key: &str) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| RelayError::Storage(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            table_url: format!("{}/rest/v1/{}", project_url.trim_end_matches('/'), TABLE),
            key: key.to_string(),
        })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.key)
            .bearer_auth(&self.key)
    }
}

/// Numeric ids are written as JSON numbers so they match a bigint column.
fn chat_id_value(id: &ConversationId) -> Value {
    match id.as_i64() {
        Some(n) => json!(n),
        None => json!(id.as_str()),
    }
}

#[async_trait::async_trait]
impl HistoryStore for SupabaseHistoryStore {
    async fn fetch(&self, id: &ConversationId) -> Result<Vec<HistoryEntry>> {
        let response = self
            .authorized(self.client.get(&self.table_url))
            .query(&[("select", "history".to_string()), ("chat_id", format!("eq.{}", id))])
            .send()
            .await
            .map_err(|e| RelayError::Storage(format!("Supabase fetch failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(chat_id = %id, %status, "Supabase fetch rejected: {}", body);
            return Err(RelayError::Storage(format!(
                "Supabase fetch returned {}: {}",
                status, body
            )));
        }

        let rows: Vec<HistoryRow> = response
            .json()
            .await
            .map_err(|e| RelayError::Storage(format!("Malformed Supabase response: {}", e)))?;

        let Some(row) = rows.into_iter().next() else {
            debug!(chat_id = %id, "No stored history");
            return Ok(Vec::new());
        };

        decode_history(row.history)
            .map_err(|e| RelayError::Storage(format!("Malformed stored history: {}", e)))
    }

    async fn save(&self, id: &ConversationId, history: &[HistoryEntry]) -> Result<()> {
        let record = ConversationRecord::new(id.clone(), history.to_vec());
        let body = json!([{
            "chat_id": chat_id_value(&record.chat_id),
            "history": record.history,
            "updated_at": record.updated_at,
        }]);

        let response = self
            .authorized(self.client.post(&self.table_url))
            .query(&[("on_conflict", "chat_id")])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&body)
            .send()
            .await
            .map_err(|e| RelayError::Storage(format!("Supabase upsert failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(chat_id = %id, %status, "Supabase upsert rejected: {}", body);
            return Err(RelayError::Storage(format!(
                "Supabase upsert returned {}: {}",
                status, body
            )));
        }

        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "supabase"
    }
}
