//! Telegram Bot API client — long-polls for updates and sends replies

use crate::channel::{parse_update, ChatTransport};
use crate::dispatcher::Dispatcher;
use crate::error::RelayError;
use crate::models::ConversationId;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const DEFAULT_API_ROOT: &str = "https://api.telegram.org";
const POLL_TIMEOUT_SECS: u64 = 30;
const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

pub struct TelegramClient {
    bot_token: String,
    api_root: String,
    client: Client,
}

impl TelegramClient {
    pub fn new(bot_token: String) -> crate::Result<Self> {
        let client = Client::builder()
            // Long polls hold the request open for POLL_TIMEOUT_SECS
            .timeout(Duration::from_secs(POLL_TIMEOUT_SECS + 15))
            .build()
            .map_err(|e| RelayError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            bot_token,
            api_root: DEFAULT_API_ROOT.to_string(),
            client,
        })
    }

    /// Point the client at another API root (used by tests)
    pub fn with_api_root(mut self, api_root: impl Into<String>) -> Self {
        self.api_root = api_root.into().trim_end_matches('/').to_string();
        self
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_root, self.bot_token)
    }

    /// POST a Bot API method and return its `result`
    async fn call(&self, method: &str, body: Value) -> crate::Result<Value> {
        let response = self
            .client
            .post(self.api_url(method))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                RelayError::Transport(format!("Telegram {} failed: {}", method, e.without_url()))
            })?;

        let status = response.status();
        let data: Value = response.json().await.map_err(|e| {
            RelayError::Transport(format!(
                "Telegram {} returned unreadable body: {}",
                method,
                e.without_url()
            ))
        })?;

        if !status.is_success() || data.get("ok").and_then(Value::as_bool) != Some(true) {
            let description = data
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or("no description");
            return Err(RelayError::Transport(format!(
                "Telegram {} rejected ({}): {}",
                method, status, description
            )));
        }

        Ok(data.get("result").cloned().unwrap_or(Value::Null))
    }

    /// Fetch pending updates starting at `offset`, waiting up to `timeout_secs`
    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> crate::Result<Vec<Value>> {
        let result = self
            .call(
                "getUpdates",
                json!({
                    "offset": offset,
                    "timeout": timeout_secs,
                    "allowed_updates": ["message"]
                }),
            )
            .await?;

        match result {
            Value::Array(updates) => Ok(updates),
            other => Err(RelayError::Transport(format!(
                "Telegram getUpdates returned non-array result: {}",
                other
            ))),
        }
    }

    /// Long-poll forever, handing each text message to the dispatcher.
    ///
    /// Updates are handled one at a time, in arrival order.
    pub async fn run_polling(self: Arc<Self>, dispatcher: Arc<Dispatcher>) {
        let mut offset: i64 = 0;

        info!("Telegram channel listening for messages...");

        loop {
            let updates = match self.get_updates(offset, POLL_TIMEOUT_SECS).await {
                Ok(updates) => updates,
                Err(e) => {
                    warn!("Telegram poll error: {}", e);
                    tokio::time::sleep(POLL_RETRY_DELAY).await;
                    continue;
                }
            };

            for update in updates {
                if let Some(uid) = update.get("update_id").and_then(Value::as_i64) {
                    offset = offset.max(uid + 1);
                }

                let Some(inbound) = parse_update(&update) else {
                    debug!("Ignoring non-text update");
                    continue;
                };

                dispatcher.handle(inbound).await;
            }
        }
    }
}

#[async_trait]
impl ChatTransport for TelegramClient {
    async fn send_text(&self, chat_id: &ConversationId, text: &str) -> crate::Result<()> {
        self.call(
            "sendMessage",
            json!({
                "chat_id": chat_id.as_str(),
                "text": text
            }),
        )
        .await?;
        Ok(())
    }

    async fn send_typing(&self, chat_id: &ConversationId) -> crate::Result<()> {
        self.call(
            "sendChatAction",
            json!({
                "chat_id": chat_id.as_str(),
                "action": "typing"
            }),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{error_chain, FailureKind};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> TelegramClient {
        TelegramClient::new("123:ABC".into())
            .unwrap()
            .with_api_root(server.uri())
    }

    #[test]
    fn test_api_url() {
        let client = TelegramClient::new("123:ABC".into()).unwrap();
        assert_eq!(
            client.api_url("getMe"),
            "https://api.telegram.org/bot123:ABC/getMe"
        );
    }

    #[tokio::test]
    async fn test_get_updates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:ABC/getUpdates"))
            .and(body_partial_json(json!({"offset": 3, "timeout": 0})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": [
                    {"update_id": 3, "message": {"message_id": 1, "chat": {"id": 42}, "text": "hi"}}
                ]
            })))
            .mount(&server)
            .await;

        let updates = client_for(&server).get_updates(3, 0).await.unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(parse_update(&updates[0]).unwrap().text, "hi");
    }

    #[tokio::test]
    async fn test_send_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:ABC/sendMessage"))
            .and(body_partial_json(json!({"chat_id": "42", "text": "hello"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": {"message_id": 2}
            })))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server)
            .send_text(&ConversationId::from(42_i64), "hello")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_send_typing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:ABC/sendChatAction"))
            .and(body_partial_json(json!({"action": "typing"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true, "result": true})))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server)
            .send_typing(&ConversationId::from(42_i64))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_connection_error_does_not_expose_token() {
        let client = TelegramClient::new("123:SECRETTOKEN".into())
            .unwrap()
            .with_api_root("http://127.0.0.1:1");

        let err = client
            .send_text(&ConversationId::from(42_i64), "hello")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::Transport);
        assert!(!error_chain(&err).contains("SECRETTOKEN"));

        let err = client.get_updates(0, 0).await.unwrap_err();
        assert!(!error_chain(&err).contains("SECRETTOKEN"));
    }

    #[tokio::test]
    async fn test_rejected_call_is_transport_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "ok": false,
                "description": "Forbidden: bot was blocked by the user"
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .send_text(&ConversationId::from(42_i64), "hello")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::Transport);
        assert!(err.to_string().contains("blocked"));
    }
}
