//! Prompt assembly
//!
//! Request layout sent to the model:
//! persona (user) → acknowledgment (model) → stored history → new message (user)

use crate::models::{HistoryEntry, Role};
use crate::persona::Persona;
use serde::Serialize;

/// Role-tagged message handed to the completion client
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PromptMessage {
    pub role: Role,
    pub text: String,
}

impl PromptMessage {
    fn new(role: Role, text: &str) -> Self {
        Self {
            role,
            text: text.to_string(),
        }
    }
}

/// Build the ordered message sequence for one model request.
///
/// History roles are taken from the stored entries, not from position.
pub fn assemble(persona: &Persona, history: &[HistoryEntry], user_message: &str) -> Vec<PromptMessage> {
    let mut messages = Vec::with_capacity(history.len() + 3);

    messages.push(PromptMessage::new(Role::User, &persona.prompt));
    messages.push(PromptMessage::new(Role::Model, &persona.acknowledgment));

    messages.extend(
        history
            .iter()
            .map(|entry| PromptMessage::new(entry.role, &entry.text)),
    );

    messages.push(PromptMessage::new(Role::User, user_message));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::decode_history;
    use serde_json::json;

    fn persona() -> Persona {
        Persona {
            version: "test".into(),
            prompt: "You are Emma.".into(),
            acknowledgment: "Understood.".into(),
        }
    }

    #[test]
    fn test_empty_history() {
        let messages = assemble(&persona(), &[], "hi");
        assert_eq!(
            messages,
            vec![
                PromptMessage::new(Role::User, "You are Emma."),
                PromptMessage::new(Role::Model, "Understood."),
                PromptMessage::new(Role::User, "hi"),
            ]
        );
    }

    #[test]
    fn test_history_roles_follow_parity_for_legacy_rows() {
        let history = decode_history(json!(["m0", "m1", "m2"])).unwrap();
        let messages = assemble(&persona(), &history, "next");

        let roles: Vec<Role> = messages[2..5].iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Model, Role::User]);
        assert_eq!(messages.len(), 6);
        assert_eq!(messages.last().unwrap().text, "next");
    }

    #[test]
    fn test_explicit_roles_are_not_recomputed() {
        let history = vec![HistoryEntry::model("greeting"), HistoryEntry::user("q")];
        let messages = assemble(&persona(), &history, "follow-up");
        assert_eq!(messages[2].role, Role::Model);
        assert_eq!(messages[3].role, Role::User);
    }
}
