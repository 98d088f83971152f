//! In-memory `Store` — used for `:memory:` runs and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::chat::message::Message;
use crate::context::Session;
use crate::error::DatabaseError;
use crate::store::traits::Store;

#[derive(Debug, Default)]
pub struct MemoryStore {
    settings: RwLock<HashMap<String, String>>,
    sessions: RwLock<Vec<Session>>,
    messages: RwLock<HashMap<String, Vec<Message>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        Ok(self.settings.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        self.settings
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, DatabaseError> {
        Ok(self.settings.write().await.remove(key).is_some())
    }

    async fn save_session(&self, session: &Session) -> Result<(), DatabaseError> {
        let mut sessions = self.sessions.write().await;
        match sessions.iter_mut().find(|s| s.id == session.id) {
            Some(existing) => existing.name = session.name.clone(),
            None => sessions.push(session.clone()),
        }
        Ok(())
    }

    async fn list_sessions(&self) -> Result<Vec<Session>, DatabaseError> {
        let mut sessions = self.sessions.read().await.clone();
        // Newest first; later inserts win ties.
        sessions.reverse();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions)
    }

    async fn delete_session(&self, id: &str) -> Result<bool, DatabaseError> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|s| s.id != id);
        self.messages.write().await.remove(id);
        Ok(sessions.len() != before)
    }

    async fn append_message(
        &self,
        session_id: &str,
        message: &Message,
    ) -> Result<(), DatabaseError> {
        if !self.sessions.read().await.iter().any(|s| s.id == session_id) {
            return Err(DatabaseError::NotFound {
                entity: "session".to_string(),
                id: session_id.to_string(),
            });
        }
        self.messages
            .write()
            .await
            .entry(session_id.to_string())
            .or_default()
            .push(message.clone());
        Ok(())
    }

    async fn list_messages(&self, session_id: &str) -> Result<Vec<Message>, DatabaseError> {
        Ok(self
            .messages
            .read()
            .await
            .get(session_id)
            .cloned()
            .unwrap_or_default())
    }
}
