//! Response acquisition for the chat engine.
//!
//! Supports:
//! - **Placeholder**: fixed reply, used when no API key is configured
//! - **Anthropic**: Messages API over reqwest
//!
//! The engine only sees the [`ResponseService`] trait, so tests swap in fakes.

pub mod anthropic;
pub mod placeholder;
pub mod prompt;

pub use anthropic::AnthropicResponder;
pub use placeholder::PlaceholderResponder;

use std::sync::Arc;

use async_trait::async_trait;

use crate::chat::message::Message;
use crate::config::ResponderConfig;
use crate::context::Preferences;
use crate::error::LlmError;

/// Produces the assistant's reply for a transcript.
#[async_trait]
pub trait ResponseService: Send + Sync {
    /// Short provider name for logs and errors.
    fn name(&self) -> &str;

    /// Reply to the transcript, which ends with the user's latest message.
    async fn respond(
        &self,
        transcript: &[Message],
        preferences: &Preferences,
    ) -> Result<String, LlmError>;
}

/// Create a response service from configuration.
pub fn create_service(config: &ResponderConfig) -> Result<Arc<dyn ResponseService>, LlmError> {
    match config {
        ResponderConfig::Placeholder => {
            tracing::info!("Using placeholder responses");
            Ok(Arc::new(PlaceholderResponder::new()))
        }
        ResponderConfig::Anthropic {
            api_key,
            model,
            base_url,
        } => {
            let responder = AnthropicResponder::new(api_key.clone(), model, base_url)?;
            tracing::info!("Using Anthropic (model: {})", model);
            Ok(Arc::new(responder))
        }
    }
}
