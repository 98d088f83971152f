//! Anthropic Messages API responder.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::chat::message::{Message, Role};
use crate::context::Preferences;
use crate::error::LlmError;
use crate::llm::ResponseService;
use crate::llm::prompt::system_prompt;

const PROVIDER: &str = "anthropic";
const API_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 1024;

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: String,
    messages: Vec<WireMessage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Calls `POST {base_url}/v1/messages`.
pub struct AnthropicResponder {
    client: reqwest::Client,
    api_key: SecretString,
    model: String,
    base_url: String,
    max_tokens: u32,
}

impl AnthropicResponder {
    pub fn new(api_key: SecretString, model: &str, base_url: &str) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: format!("Failed to create HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            api_key,
            model: model.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
        })
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }
}

/// The API wants a user turn first, so the leading welcome message is dropped.
/// Consecutive turns from the same role (a failed reply followed by a new
/// question) are merged.
fn to_wire_messages(transcript: &[Message]) -> Vec<WireMessage> {
    let mut wire: Vec<WireMessage> = Vec::with_capacity(transcript.len());
    for message in transcript
        .iter()
        .skip_while(|m| m.role == Role::Assistant)
    {
        match wire.last_mut() {
            Some(last) if last.role == message.role.as_str() => {
                last.content.push_str("\n\n");
                last.content.push_str(&message.content);
            }
            _ => wire.push(WireMessage {
                role: message.role.as_str(),
                content: message.content.clone(),
            }),
        }
    }
    wire
}

fn retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[async_trait]
impl ResponseService for AnthropicResponder {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn respond(
        &self,
        transcript: &[Message],
        preferences: &Preferences,
    ) -> Result<String, LlmError> {
        let messages = to_wire_messages(transcript);
        if messages.is_empty() {
            return Err(LlmError::InvalidResponse {
                provider: PROVIDER.to_string(),
                reason: "transcript has no user message".to_string(),
            });
        }

        let body = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system: system_prompt(preferences),
            messages,
        };

        tracing::debug!(
            model = %self.model,
            turns = body.messages.len(),
            "Sending messages request"
        );

        let resp = self
            .client
            .post(self.endpoint())
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(LlmError::AuthFailed {
                provider: PROVIDER.to_string(),
            });
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmError::RateLimited {
                provider: PROVIDER.to_string(),
                retry_after: retry_after(resp.headers()),
            });
        }
        if !status.is_success() {
            let err = resp.text().await.unwrap_or_default();
            tracing::warn!(status = ?status, "Messages request failed");
            return Err(LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: format!("HTTP {status}: {err}"),
            });
        }

        let parsed: MessagesResponse =
            resp.json().await.map_err(|e| LlmError::InvalidResponse {
                provider: PROVIDER.to_string(),
                reason: e.to_string(),
            })?;

        let text: String = parsed
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect();

        Ok(text)
    }
}
