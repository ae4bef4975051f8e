//! Conversation history storage
//!
//! One record per conversation, upserted by id. A missing record is an
//! empty history, never an error.

use crate::config::BotConfig;
use crate::memory::postgres::PostgresHistoryStore;
use crate::memory::supabase::SupabaseHistoryStore;
use crate::models::{ConversationId, ConversationRecord, HistoryEntry};
use crate::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Trait for history persistence
#[async_trait::async_trait]
pub trait HistoryStore: Send + Sync {
    /// Stored history for `id`, or an empty history if there is no record.
    /// Fails only when the backend itself is unavailable.
    async fn fetch(&self, id: &ConversationId) -> Result<Vec<HistoryEntry>>;

    /// Replace the stored history for `id` and stamp `updated_at`.
    /// Last writer wins.
    async fn save(&self, id: &ConversationId, history: &[HistoryEntry]) -> Result<()>;

    fn backend_name(&self) -> &'static str;
}

/// In-memory history store for development and tests
pub struct InMemoryHistoryStore {
    records: Arc<RwLock<HashMap<ConversationId, ConversationRecord>>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Full record including `updated_at`
    pub async fn record(&self, id: &ConversationId) -> Option<ConversationRecord> {
        let records = self.records.read().await;
        records.get(id).cloned()
    }
}

impl Default for InMemoryHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn fetch(&self, id: &ConversationId) -> Result<Vec<HistoryEntry>> {
        let records = self.records.read().await;
        Ok(records
            .get(id)
            .map(|record| record.history.clone())
            .unwrap_or_default())
    }

    async fn save(&self, id: &ConversationId, history: &[HistoryEntry]) -> Result<()> {
        let mut records = self.records.write().await;
        records.insert(
            id.clone(),
            ConversationRecord::new(id.clone(), history.to_vec()),
        );
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "in-memory"
    }
}

/// Pick a backend: Supabase if configured, then direct Postgres, then memory.
pub fn build_history_store(config: &BotConfig) -> Result<Arc<dyn HistoryStore>> {
    if let Some(supabase) = &config.supabase {
        let store = SupabaseHistoryStore::new(&supabase.url, &supabase.key)?;
        info!("History backend: supabase");
        return Ok(Arc::new(store));
    }

    if let Some(url) = &config.database_url {
        match PostgresHistoryStore::connect_lazy(url) {
            Ok(store) => {
                info!("History backend: postgres");
                return Ok(Arc::new(store));
            }
            Err(error) => {
                warn!(
                    "Failed to initialize postgres history backend, falling back to in-memory: {}",
                    error
                );
            }
        }
    }

    warn!("History backend: in-memory (history is lost on restart)");
    Ok(Arc::new(InMemoryHistoryStore::new()))
}
