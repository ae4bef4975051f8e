//! Environment configuration
//!
//! Values are read once at startup. Only the Telegram token is required;
//! everything else has a default or selects an optional component.

use crate::error::RelayError;
use crate::persona::Persona;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_HISTORY_WINDOW: usize = 20;

#[derive(Clone)]
pub struct SupabaseConfig {
    pub url: String,
    pub key: String,
}

#[derive(Clone)]
pub struct BotConfig {
    pub telegram_token: String,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub supabase: Option<SupabaseConfig>,
    pub database_url: Option<String>,
    /// Number of history entries kept per conversation
    pub history_window: usize,
    /// Health-check port; `None` disables the health server
    pub health_port: Option<u16>,
    pub persona_file: Option<PathBuf>,
}

impl BotConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> crate::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> crate::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values count as unset
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let telegram_token = get("TELEGRAM_TOKEN")
            .ok_or_else(|| RelayError::Config("TELEGRAM_TOKEN not set".to_string()))?;

        let supabase = match (get("SUPABASE_URL"), get("SUPABASE_KEY")) {
            (Some(url), Some(key)) => Some(SupabaseConfig { url, key }),
            _ => None,
        };

        let history_window = match get("HISTORY_WINDOW") {
            Some(raw) => {
                let window: usize = raw.parse().map_err(|_| {
                    RelayError::Config(format!("HISTORY_WINDOW is not a number: {}", raw))
                })?;
                if window < 2 || window % 2 != 0 {
                    return Err(RelayError::Config(format!(
                        "HISTORY_WINDOW must be an even number >= 2, got {}",
                        window
                    )));
                }
                window
            }
            None => DEFAULT_HISTORY_WINDOW,
        };

        let health_port = get("PORT")
            .map(|raw| {
                raw.parse::<u16>()
                    .map_err(|_| RelayError::Config(format!("PORT is not a valid port: {}", raw)))
            })
            .transpose()?;

        Ok(Self {
            telegram_token,
            gemini_api_key: get("GEMINI_API_KEY").unwrap_or_default(),
            gemini_model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            supabase,
            database_url: get("DATABASE_URL").or_else(|| get("POSTGRES_URL")),
            history_window,
            health_port,
            persona_file: get("PERSONA_FILE").map(PathBuf::from),
        })
    }

    /// Persona from `PERSONA_FILE`, or the built-in one
    pub fn load_persona(&self) -> crate::Result<Arc<Persona>> {
        match &self.persona_file {
            Some(path) => Persona::from_file(path),
            None => Ok(Persona::builtin()),
        }
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}

impl fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotConfig")
            .field("telegram_token", &redact(&self.telegram_token))
            .field("gemini_api_key", &redact(&self.gemini_api_key))
            .field("gemini_model", &self.gemini_model)
            .field("supabase_url", &self.supabase.as_ref().map(|s| s.url.as_str()))
            .field("database_url", &self.database_url.as_ref().map(|_| "<redacted>"))
            .field("history_window", &self.history_window)
            .field("health_port", &self.health_port)
            .field("persona_file", &self.persona_file)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> crate::Result<BotConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        BotConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_missing_telegram_token_is_fatal() {
        let err = config_from(&[("GEMINI_API_KEY", "k")]).unwrap_err();
        assert!(matches!(err, RelayError::Config(_)));

        let err = config_from(&[("TELEGRAM_TOKEN", "   ")]).unwrap_err();
        assert!(err.to_string().contains("TELEGRAM_TOKEN"));
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[("TELEGRAM_TOKEN", "123:ABC")]).unwrap();
        assert_eq!(config.gemini_model, DEFAULT_MODEL);
        assert_eq!(config.history_window, DEFAULT_HISTORY_WINDOW);
        assert!(config.gemini_api_key.is_empty());
        assert!(config.supabase.is_none());
        assert!(config.database_url.is_none());
        assert!(config.health_port.is_none());
    }

    #[test]
    fn test_supabase_requires_url_and_key() {
        let config = config_from(&[
            ("TELEGRAM_TOKEN", "t"),
            ("SUPABASE_URL", "https://x.supabase.co"),
        ])
        .unwrap();
        assert!(config.supabase.is_none());

        let config = config_from(&[
            ("TELEGRAM_TOKEN", "t"),
            ("SUPABASE_URL", "https://x.supabase.co"),
            ("SUPABASE_KEY", "anon"),
        ])
        .unwrap();
        assert_eq!(config.supabase.unwrap().url, "https://x.supabase.co");
    }

    #[test]
    fn test_history_window_must_be_even() {
        assert!(config_from(&[("TELEGRAM_TOKEN", "t"), ("HISTORY_WINDOW", "7")]).is_err());
        assert!(config_from(&[("TELEGRAM_TOKEN", "t"), ("HISTORY_WINDOW", "0")]).is_err());
        assert!(config_from(&[("TELEGRAM_TOKEN", "t"), ("HISTORY_WINDOW", "many")]).is_err());

        let config = config_from(&[("TELEGRAM_TOKEN", "t"), ("HISTORY_WINDOW", "8")]).unwrap();
        assert_eq!(config.history_window, 8);
    }

    #[test]
    fn test_port_and_database_fallback() {
        let config = config_from(&[
            ("TELEGRAM_TOKEN", "t"),
            ("PORT", "10000"),
            ("POSTGRES_URL", "postgres://localhost/bot"),
        ])
        .unwrap();
        assert_eq!(config.health_port, Some(10000));
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/bot"));

        assert!(config_from(&[("TELEGRAM_TOKEN", "t"), ("PORT", "99999")]).is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = config_from(&[
            ("TELEGRAM_TOKEN", "123:SECRET"),
            ("GEMINI_API_KEY", "AIza-secret"),
        ])
        .unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("SECRET"));
        assert!(!rendered.contains("AIza"));
    }
}
