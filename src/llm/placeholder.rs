//! Placeholder responder — always answers with the same sentence.

use async_trait::async_trait;

use crate::chat::message::Message;
use crate::config::PLACEHOLDER_RESPONSE;
use crate::context::Preferences;
use crate::error::LlmError;
use crate::llm::ResponseService;

#[derive(Debug, Clone)]
pub struct PlaceholderResponder {
    reply: String,
}

impl PlaceholderResponder {
    pub fn new() -> Self {
        Self::with_reply(PLACEHOLDER_RESPONSE)
    }

    pub fn with_reply(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
        }
    }
}

impl Default for PlaceholderResponder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResponseService for PlaceholderResponder {
    fn name(&self) -> &str {
        "placeholder"
    }

    async fn respond(
        &self,
        _transcript: &[Message],
        _preferences: &Preferences,
    ) -> Result<String, LlmError> {
        Ok(self.reply.clone())
    }
}
