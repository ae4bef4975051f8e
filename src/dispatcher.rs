//! Message dispatcher - runs one turn per inbound message
//!
//! RECEIVED → FETCH HISTORY → ASSEMBLE → COMPLETE → PERSIST → REPLY
//!
//! Any failure ends the turn: the cause is logged, the user gets the fixed
//! apology and the stored history is left as it was. Nothing is retried.

use crate::channel::ChatTransport;
use crate::error::{error_chain, FailureKind, RelayError, APOLOGY};
use crate::gemini::CompletionClient;
use crate::memory::window;
use crate::memory::HistoryStore;
use crate::models::{ConversationId, InboundMessage, Turn};
use crate::persona::Persona;
use crate::prompt;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Step at which a turn stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStage {
    FetchHistory,
    Complete,
    PersistHistory,
    Reply,
}

impl fmt::Display for TurnStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TurnStage::FetchHistory => "fetch-history",
            TurnStage::Complete => "complete",
            TurnStage::PersistHistory => "persist-history",
            TurnStage::Reply => "reply",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Replied { reply: String },
    Failed { stage: TurnStage, kind: FailureKind },
}

type TurnFailure = (TurnStage, RelayError);

type LockMap = StdMutex<HashMap<ConversationId, LockSlot>>;

/// Turn lock of one conversation and the number of turns holding or awaiting it
struct LockSlot {
    lock: Arc<Mutex<()>>,
    holders: usize,
}

/// A turn's claim on its conversation lock. Dropping it (also when the turn
/// future is cancelled) releases the claim; the last one out removes the slot.
struct ConversationLease<'a> {
    locks: &'a LockMap,
    chat_id: ConversationId,
    lock: Arc<Mutex<()>>,
}

impl Drop for ConversationLease<'_> {
    fn drop(&mut self) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = locks.get_mut(&self.chat_id) {
            slot.holders = slot.holders.saturating_sub(1);
            if slot.holders == 0 {
                locks.remove(&self.chat_id);
            }
        }
    }
}

pub struct Dispatcher {
    store: Arc<dyn HistoryStore>,
    completion: Arc<dyn CompletionClient>,
    transport: Arc<dyn ChatTransport>,
    persona: Arc<Persona>,
    window: usize,
    /// One lock per conversation with a turn in flight
    locks: LockMap,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn HistoryStore>,
        completion: Arc<dyn CompletionClient>,
        transport: Arc<dyn ChatTransport>,
        persona: Arc<Persona>,
        window: usize,
    ) -> Self {
        Self {
            store,
            completion,
            transport,
            persona,
            window,
            locks: StdMutex::new(HashMap::new()),
        }
    }

    /// Process one inbound message to completion.
    ///
    /// Turns for the same conversation run one after another; turns for
    /// different conversations do not wait on each other.
    pub async fn handle(&self, message: InboundMessage) -> TurnOutcome {
        let turn_id = Uuid::new_v4();
        let started = Instant::now();

        info!(
            %turn_id,
            chat_id = %message.chat_id,
            message_id = ?message.message_id,
            "Received message"
        );

        let lease = self.lease(&message.chat_id);
        let result = {
            let _guard = lease.lock.lock().await;
            self.run_turn(turn_id, &message).await
        };
        drop(lease);

        match result {
            Ok(reply) => {
                info!(
                    %turn_id,
                    chat_id = %message.chat_id,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Turn complete"
                );
                TurnOutcome::Replied { reply }
            }
            Err((stage, err)) => {
                error!(
                    %turn_id,
                    chat_id = %message.chat_id,
                    %stage,
                    kind = ?err.kind(),
                    "Turn failed: {}",
                    error_chain(&err)
                );

                if let Err(send_err) = self.transport.send_text(&message.chat_id, APOLOGY).await {
                    error!(
                        %turn_id,
                        chat_id = %message.chat_id,
                        "Failed to deliver apology: {}",
                        error_chain(&send_err)
                    );
                }

                TurnOutcome::Failed {
                    stage,
                    kind: err.kind(),
                }
            }
        }
    }

    async fn run_turn(
        &self,
        turn_id: Uuid,
        message: &InboundMessage,
    ) -> std::result::Result<String, TurnFailure> {
        let chat_id = &message.chat_id;

        // === FETCH HISTORY ===
        let history = self
            .store
            .fetch(chat_id)
            .await
            .map_err(|e| (TurnStage::FetchHistory, e))?;

        let (history, repaired) = window::repair(history);
        debug!(%turn_id, entries = history.len(), repaired, "History fetched");

        self.spawn_typing(chat_id.clone());

        // === ASSEMBLE + COMPLETE ===
        let messages = prompt::assemble(&self.persona, &history, &message.text);

        let reply = self
            .completion
            .complete(&messages)
            .await
            .map_err(|e| (TurnStage::Complete, e))?;

        // === PERSIST ===
        let updated = window::trim(history, Turn::new(message.text.clone(), reply.clone()), self.window);

        self.store
            .save(chat_id, &updated)
            .await
            .map_err(|e| (TurnStage::PersistHistory, e))?;

        debug!(%turn_id, entries = updated.len(), "History persisted");

        // === REPLY ===
        self.transport
            .send_text(chat_id, &reply)
            .await
            .map_err(|e| (TurnStage::Reply, e))?;

        Ok(reply)
    }

    /// Best effort; the turn never waits for or fails on the typing hint.
    fn spawn_typing(&self, chat_id: ConversationId) {
        let transport = Arc::clone(&self.transport);
        tokio::spawn(async move {
            if let Err(e) = transport.send_typing(&chat_id).await {
                debug!(%chat_id, "Typing indicator failed: {}", e);
            }
        });
    }

    fn lease(&self, chat_id: &ConversationId) -> ConversationLease<'_> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = locks.entry(chat_id.clone()).or_insert_with(|| LockSlot {
            lock: Arc::new(Mutex::new(())),
            holders: 0,
        });
        slot.holders += 1;

        ConversationLease {
            locks: &self.locks,
            chat_id: chat_id.clone(),
            lock: Arc::clone(&slot.lock),
        }
    }

    #[cfg(test)]
    fn tracked_conversations(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
