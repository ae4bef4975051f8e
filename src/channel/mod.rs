//! Chat transport boundary
//!
//! The dispatcher only needs to send text and a typing hint back to a chat;
//! inbound events are filtered down to plain text messages here.

use crate::models::{ConversationId, InboundMessage};
use async_trait::async_trait;
use serde_json::Value;

pub mod telegram;

pub use telegram::TelegramClient;

/// Outbound side of a chat platform
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Deliver a text reply to the chat
    async fn send_text(&self, chat_id: &ConversationId, text: &str) -> crate::Result<()>;

    /// Show a "typing" hint in the chat
    async fn send_typing(&self, chat_id: &ConversationId) -> crate::Result<()>;
}

/// Extract a text message from a Telegram update.
///
/// Returns `None` for anything the bot does not answer: non-message
/// updates, non-text messages (photos, stickers, voice) and bot commands.
pub fn parse_update(update: &Value) -> Option<InboundMessage> {
    let message = update.get("message")?;

    let chat_id = message.get("chat")?.get("id")?.as_i64()?;
    let text = message.get("text")?.as_str()?;

    if text.starts_with('/') {
        return None;
    }

    Some(InboundMessage {
        chat_id: ConversationId::from(chat_id),
        text: text.to_string(),
        message_id: message.get("message_id").and_then(Value::as_i64),
    })
}
