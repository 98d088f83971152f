//! Error types for the companion client.

use std::time::Duration;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Migration failed: {0}")]
    Migration(String),
}

/// Response service errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} rate limited, retry after {retry_after:?}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },
}

impl LlmError {
    /// Whether repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RequestFailed { .. } | Self::RateLimited { .. } | Self::InvalidResponse { .. }
        )
    }
}

/// Chat engine errors. Surfaced to the chat view as a banner.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("No response after {0:?}")]
    Timeout(Duration),

    #[error("Response cancelled")]
    Cancelled,

    #[error("Response failed: {0}")]
    Response(#[from] LlmError),

    #[error("A response is already in progress")]
    Busy,

    #[error("Nothing to retry")]
    NothingToRetry,

    #[error("Session {0} not found")]
    SessionNotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl ChatError {
    /// Whether `/retry` makes sense after this failure.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Cancelled => true,
            Self::Response(e) => e.is_retryable(),
            _ => false,
        }
    }
}

/// Terminal front-end errors.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Unknown command: /{0}")]
    UnknownCommand(String),

    #[error("Invalid argument for /{command}: {reason}")]
    InvalidArgument { command: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
