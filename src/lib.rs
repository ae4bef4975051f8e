//! Persona Relay Bot
//!
//! A chat bot that answers as a fixed persona:
//! - Receives text messages from Telegram (long polling)
//! - Loads the chat's recent history from Supabase / Postgres / memory
//! - Sends persona + history + new message to Gemini
//! - Stores the updated, windowed history and replies
//!
//! TURN:
//! RECEIVED → FETCH HISTORY → ASSEMBLE → COMPLETE → PERSIST → REPLY

pub mod api;
pub mod channel;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod gemini;
pub mod memory;
pub mod models;
pub mod persona;
pub mod prompt;

pub use error::Result;

// Re-export common types
pub use models::*;
pub use dispatcher::{Dispatcher, TurnOutcome, TurnStage};
