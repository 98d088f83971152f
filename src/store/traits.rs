//! `Store` trait — single async interface for everything the client persists.

use async_trait::async_trait;

use crate::chat::message::Message;
use crate::context::Session;
use crate::error::DatabaseError;

/// Well-known keys in the key/value settings space.
pub mod settings_keys {
    /// Id of the session that was active last.
    pub const LAST_CHAT_ID: &str = "last_chat_id";
    /// JSON-encoded `Preferences`.
    pub const PREFERENCES: &str = "preferences";
}

/// Backend-agnostic persistence for settings, sessions and transcripts.
#[async_trait]
pub trait Store: Send + Sync {
    // ── Key/value settings ──────────────────────────────────────────

    async fn get(&self, key: &str) -> Result<Option<String>, DatabaseError>;

    /// Insert or overwrite.
    async fn set(&self, key: &str, value: &str) -> Result<(), DatabaseError>;

    /// Returns whether the key existed.
    async fn delete(&self, key: &str) -> Result<bool, DatabaseError>;

    // ── Sessions ────────────────────────────────────────────────────

    /// Insert a session or update its name.
    async fn save_session(&self, session: &Session) -> Result<(), DatabaseError>;

    /// All sessions, newest first.
    async fn list_sessions(&self) -> Result<Vec<Session>, DatabaseError>;

    /// Remove a session and its transcript. Returns whether it existed.
    async fn delete_session(&self, id: &str) -> Result<bool, DatabaseError>;

    // ── Transcripts ─────────────────────────────────────────────────

    /// Append one message to the end of a session's transcript.
    async fn append_message(&self, session_id: &str, message: &Message)
    -> Result<(), DatabaseError>;

    /// A session's transcript in append order.
    async fn list_messages(&self, session_id: &str) -> Result<Vec<Message>, DatabaseError>;
}
