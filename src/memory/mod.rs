//! Conversation memory
//!
//! Per-conversation history persistence and the sliding window that bounds it

pub mod postgres;
pub mod store;
pub mod supabase;
pub mod window;

pub use postgres::PostgresHistoryStore;
pub use store::{build_history_store, HistoryStore, InMemoryHistoryStore};
pub use supabase::SupabaseHistoryStore;
