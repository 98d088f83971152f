//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Title shown in the chat screen header.
pub const APP_TITLE: &str = "Islamic AI Assistant";

/// First message of every transcript.
pub const WELCOME_MESSAGE: &str = "Asalamulaikum! I am here as your Islamic companion and guide. \
I can help with Islamic teachings, practical guidance, and even local recommendations like halal \
restaurants near you. How may I assist you today?";

/// Reply returned when no response service is configured.
pub const PLACEHOLDER_RESPONSE: &str = "This is a placeholder response from the AI.";

/// Delay between two revealed characters.
pub const DEFAULT_TYPING_DELAY: Duration = Duration::from_millis(25);

/// Upper bound on a single response wait.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(30);

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_API_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_DB_PATH: &str = "./data/companion.db";
pub const DEFAULT_LOG_DIR: &str = "./data/logs";

/// Chat engine configuration.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Delay between successive revealed characters.
    pub typing_delay: Duration,
    /// How long to wait for the response service before giving up.
    pub response_timeout: Duration,
    /// Fixed first message of every transcript.
    pub welcome_message: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            typing_delay: DEFAULT_TYPING_DELAY,
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            welcome_message: WELCOME_MESSAGE.to_string(),
        }
    }
}

/// Where persistent state lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageLocation {
    Memory,
    File(PathBuf),
}

/// Response service selection.
#[derive(Debug, Clone)]
pub enum ResponderConfig {
    /// Fixed placeholder reply.
    Placeholder,
    /// Anthropic Messages API.
    Anthropic {
        api_key: SecretString,
        model: String,
        base_url: String,
    },
}

/// Application configuration, built from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub chat: ChatConfig,
    pub storage: StorageLocation,
    pub log_dir: PathBuf,
    pub responder: ResponderConfig,
}

impl AppConfig {
    /// Build config from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let typing_delay = match parse_u64(&lookup, "COMPANION_TYPING_DELAY_MS")? {
            Some(ms) => Duration::from_millis(ms),
            None => DEFAULT_TYPING_DELAY,
        };

        let response_timeout = match parse_u64(&lookup, "COMPANION_RESPONSE_TIMEOUT_SECS")? {
            Some(0) => {
                return Err(ConfigError::InvalidValue {
                    key: "COMPANION_RESPONSE_TIMEOUT_SECS".to_string(),
                    message: "must be greater than zero".to_string(),
                });
            }
            Some(secs) => Duration::from_secs(secs),
            None => DEFAULT_RESPONSE_TIMEOUT,
        };

        let storage = match lookup("COMPANION_DB_PATH") {
            Some(path) if path == ":memory:" => StorageLocation::Memory,
            Some(path) if !path.trim().is_empty() => StorageLocation::File(PathBuf::from(path)),
            _ => StorageLocation::File(PathBuf::from(DEFAULT_DB_PATH)),
        };

        let log_dir = lookup("COMPANION_LOG_DIR")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR));

        let responder = match lookup("ANTHROPIC_API_KEY").filter(|k| !k.trim().is_empty()) {
            Some(key) => ResponderConfig::Anthropic {
                api_key: SecretString::from(key),
                model: lookup("COMPANION_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                base_url: lookup("COMPANION_API_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            },
            None => ResponderConfig::Placeholder,
        };

        Ok(Self {
            chat: ChatConfig {
                typing_delay,
                response_timeout,
                ..ChatConfig::default()
            },
            storage,
            log_dir,
            responder,
        })
    }
}

fn parse_u64<F>(lookup: &F, key: &str) -> Result<Option<u64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("{raw:?}: {e}"),
            }),
    }
}
