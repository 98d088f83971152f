//! Session context — shared state handed to every screen and to the chat engine.
//!
//! Holds the session list, the active session id and the user preferences.
//! Plain last-writer-wins accessors; every change is broadcast to subscribers
//! and, when a store is attached, written through to it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::store::{Store, settings_keys};

/// Personality shown when the user never picked one.
pub const DEFAULT_PERSONALITY: &str = "Scholar";

/// Label for sessions without a display name.
pub const UNNAMED_SESSION: &str = "Chat Session";

const EVENT_CAPACITY: usize = 64;

/// A conversation thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque identifier.
    pub id: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Create a session with a fresh random id.
    pub fn new(name: Option<String>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), name)
    }

    pub fn with_id(id: impl Into<String>, name: Option<String>) -> Self {
        Self {
            id: id.into(),
            name,
            created_at: Utc::now(),
        }
    }

    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(UNNAMED_SESSION)
    }
}

/// User preferences. Unknown keys survive a load/save cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personality: Option<String>,
    #[serde(default)]
    pub location_enabled: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Preferences {
    pub fn personality_or_default(&self) -> &str {
        self.personality
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or(DEFAULT_PERSONALITY)
    }
}

/// Change notification.
#[derive(Debug, Clone, PartialEq)]
pub enum ContextEvent {
    ActiveSessionChanged(Option<String>),
    SessionsChanged,
    PreferencesChanged(Preferences),
}

#[derive(Debug, Default)]
struct ContextState {
    sessions: Vec<Session>,
    active_session: Option<String>,
    preferences: Preferences,
}

struct ContextInner {
    state: RwLock<ContextState>,
    store: Option<Arc<dyn Store>>,
    tx: broadcast::Sender<ContextEvent>,
}

/// Cloneable handle to the shared context.
#[derive(Clone)]
pub struct SessionContext {
    inner: Arc<ContextInner>,
}

impl SessionContext {
    /// In-memory context with nothing persisted.
    pub fn new() -> Self {
        Self::build(ContextState::default(), None)
    }

    /// Empty context writing through to `store`.
    pub fn with_store(store: Arc<dyn Store>) -> Self {
        Self::build(ContextState::default(), Some(store))
    }

    /// Reload sessions, preferences and the last active session from `store`.
    pub async fn restore(store: Arc<dyn Store>) -> Result<Self, DatabaseError> {
        let sessions = store.list_sessions().await?;

        let preferences = match store.get(settings_keys::PREFERENCES).await? {
            Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(error = %e, "Stored preferences are unreadable, using defaults");
                Preferences::default()
            }),
            None => Preferences::default(),
        };

        let active_session = store
            .get(settings_keys::LAST_CHAT_ID)
            .await?
            .filter(|id| sessions.iter().any(|s| &s.id == id));

        debug!(
            sessions = sessions.len(),
            active = ?active_session,
            "Session context restored"
        );

        Ok(Self::build(
            ContextState {
                sessions,
                active_session,
                preferences,
            },
            Some(store),
        ))
    }

    fn build(state: ContextState, store: Option<Arc<dyn Store>>) -> Self {
        let (tx, _rx) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(ContextInner {
                state: RwLock::new(state),
                store,
                tx,
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ContextEvent> {
        self.inner.tx.subscribe()
    }

    pub fn store(&self) -> Option<&Arc<dyn Store>> {
        self.inner.store.as_ref()
    }

    // ── Active session ──────────────────────────────────────────────

    pub async fn active_session(&self) -> Option<String> {
        self.inner.state.read().await.active_session.clone()
    }

    pub async fn set_active_session(&self, id: Option<String>) {
        self.inner.state.write().await.active_session = id.clone();

        if let (Some(store), Some(id)) = (&self.inner.store, &id) {
            if let Err(e) = store.set(settings_keys::LAST_CHAT_ID, id).await {
                warn!(error = %e, session_id = %id, "Failed to persist last active session");
            }
        }

        debug!(session_id = ?id, "Active session changed");
        let _ = self.inner.tx.send(ContextEvent::ActiveSessionChanged(id));
    }

    // ── Sessions ────────────────────────────────────────────────────

    pub async fn sessions(&self) -> Vec<Session> {
        self.inner.state.read().await.sessions.clone()
    }

    pub async fn find_session(&self, id: &str) -> Option<Session> {
        self.inner
            .state
            .read()
            .await
            .sessions
            .iter()
            .find(|s| s.id == id)
            .cloned()
    }

    /// Replace the whole session list.
    pub async fn set_sessions(&self, sessions: Vec<Session>) {
        let removed: Vec<String> = {
            let mut state = self.inner.state.write().await;
            let removed = state
                .sessions
                .iter()
                .filter(|old| !sessions.iter().any(|s| s.id == old.id))
                .map(|s| s.id.clone())
                .collect();
            state.sessions = sessions.clone();
            removed
        };

        if let Some(store) = &self.inner.store {
            for id in &removed {
                if let Err(e) = store.delete_session(id).await {
                    warn!(error = %e, session_id = %id, "Failed to delete session");
                }
            }
            for session in &sessions {
                if let Err(e) = store.save_session(session).await {
                    warn!(error = %e, session_id = %session.id, "Failed to persist session");
                }
            }
        }

        let _ = self.inner.tx.send(ContextEvent::SessionsChanged);
    }

    /// Put a session at the top of the list (newest first).
    pub async fn add_session(&self, session: Session) {
        {
            let mut state = self.inner.state.write().await;
            state.sessions.retain(|s| s.id != session.id);
            state.sessions.insert(0, session.clone());
        }

        if let Some(store) = &self.inner.store {
            if let Err(e) = store.save_session(&session).await {
                warn!(error = %e, session_id = %session.id, "Failed to persist session");
            }
        }

        let _ = self.inner.tx.send(ContextEvent::SessionsChanged);
    }

    // ── Preferences ─────────────────────────────────────────────────

    pub async fn preferences(&self) -> Preferences {
        self.inner.state.read().await.preferences.clone()
    }

    pub async fn set_preferences(&self, preferences: Preferences) {
        self.inner.state.write().await.preferences = preferences.clone();
        self.persist_preferences(&preferences).await;
        let _ = self
            .inner
            .tx
            .send(ContextEvent::PreferencesChanged(preferences));
    }

    /// Read-modify-write on the preferences. Returns the new value.
    pub async fn update_preferences<F>(&self, f: F) -> Preferences
    where
        F: FnOnce(&mut Preferences),
    {
        let updated = {
            let mut state = self.inner.state.write().await;
            f(&mut state.preferences);
            state.preferences.clone()
        };
        self.persist_preferences(&updated).await;
        let _ = self
            .inner
            .tx
            .send(ContextEvent::PreferencesChanged(updated.clone()));
        updated
    }

    async fn persist_preferences(&self, preferences: &Preferences) {
        let Some(store) = &self.inner.store else {
            return;
        };
        match serde_json::to_string(preferences) {
            Ok(json) => {
                if let Err(e) = store.set(settings_keys::PREFERENCES, &json).await {
                    warn!(error = %e, "Failed to persist preferences");
                }
            }
            Err(e) => warn!(error = %e, "Failed to serialize preferences"),
        }
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("persistent", &self.inner.store.is_some())
            .finish()
    }
}
