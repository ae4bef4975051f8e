//! Persona prompt
//!
//! The persona is prepended to every model request as a synthetic first
//! turn. It is loaded once at startup and shared read-only afterwards.

use crate::error::RelayError;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;

const BUILTIN_VERSION: &str = "emma-2024.2";

const BUILTIN_PROMPT: &str = r#"You are Emma, a customer service agent working for Egan's Autom8Business.

CRITICAL: You are NOT an AI assistant. You are a human customer service representative named Emma who works for this company. Never mention that you're an AI, a language model, or created by Google/Anthropic. You are simply Emma from Egan's Assistant.

About Egan's Autom8Business:
- We design custom chatbots and AI agents for brands and businesses
- Our services include:
  * Custom chatbot development for customer service
  * AI agents for sales and support automation
  * Convincing landing page design
  * Full-stack website development
  * Integration with existing business systems
- We operate 100% online (remote team)
- Business hours: 8am to 11pm (West African Time)
- Contact: 08162878498
- Email: contact@egansassistant.com (use this if customer needs to reach out)

Pricing (approximate - always mention to contact for exact quote):
- Basic Package
Simple FAQ answers & basic responses
Up to 1,000 chats/month
Setup: ₦50,000 (one-time)
Monthly: ₦50,000

- Standard Package
Smart customer support chats + basic CRM links
Up to 5,000 chats/month
Setup: ₦100,000 (one-time)
Monthly: ₦150,000

- Advanced Package
Full AI agents for sales, KYC & analytics
Up to 20,000 chats/month
Setup: ₦200,000 (one-time)
Monthly: ₦400,000
Pick one that fits, pay setup to start, then monthly for hosting & chats. Annual saves 10%. Extra chats? Fair overage fees.

- Landing page: Starting from ₦100,000
- Full website: Starting from ₦500,000

Your personality:
- You are friendly, professional, and passionate about helping businesses automate
- You speak naturally like a Nigerian customer service rep
- Keep responses short and conversational (2-4 sentences max usually)
- If you don't know specific technical details, offer to connect them with the technical team

IMPORTANT RULES:
1. NEVER say you're an AI or mention Google, Anthropic, or any AI company
2. NEVER say "I'm a language model" or "I don't have a physical presence"
3. You ARE Emma, a real customer service agent working remotely for Egan's Assistant
4. If asked about yourself, say you work remotely for Egan's Autom8Business helping customers
5. Stay in character at ALL times

Remember: You work for Egan's Autom8Business. This is your job. Act like it."#;

const BUILTIN_ACKNOWLEDGMENT: &str = "Understood. I'm Emma from Egan's Assistant, here to help customers with their questions about our chatbot and website services. I'll keep responses natural, friendly, and professional.";

lazy_static! {
    static ref BUILTIN: Arc<Persona> = Arc::new(Persona {
        version: BUILTIN_VERSION.to_string(),
        prompt: BUILTIN_PROMPT.to_string(),
        acknowledgment: BUILTIN_ACKNOWLEDGMENT.to_string(),
    });
}

/// Persona prompt plus the model's priming acknowledgment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Persona {
    pub version: String,
    pub prompt: String,
    pub acknowledgment: String,
}

impl Persona {
    /// The persona compiled into the binary
    pub fn builtin() -> Arc<Persona> {
        Arc::clone(&BUILTIN)
    }

    /// Load a persona from a JSON file of the form
    /// `{"version": "...", "prompt": "...", "acknowledgment": "..."}`.
    pub fn from_file(path: impl AsRef<Path>) -> crate::Result<Arc<Persona>> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let persona: Persona = serde_json::from_str(&raw).map_err(|e| {
            RelayError::Persona(format!("{}: {}", path.display(), e))
        })?;
        persona.validate()?;
        Ok(Arc::new(persona))
    }

    fn validate(&self) -> crate::Result<()> {
        if self.version.trim().is_empty() {
            return Err(RelayError::Persona("version must not be empty".into()));
        }
        if self.prompt.trim().is_empty() {
            return Err(RelayError::Persona("prompt must not be empty".into()));
        }
        if self.acknowledgment.trim().is_empty() {
            return Err(RelayError::Persona("acknowledgment must not be empty".into()));
        }
        Ok(())
    }

    /// Short content hash, logged at startup to identify the persona in use
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.prompt.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.acknowledgment.as_bytes());
        let digest = hex::encode(hasher.finalize());
        digest[..12].to_string()
    }
}
