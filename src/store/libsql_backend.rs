//! libSQL backend — async `Store` implementation.
//!
//! Supports local file and in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::chat::message::{Message, Role};
use crate::context::Session;
use crate::error::DatabaseError;
use crate::store::migrations;
use crate::store::traits::Store;

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let store = Self::from_database(db).await?;
        info!(path = %path.display(), "Database opened");
        Ok(store)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;
        Self::from_database(db).await
    }

    async fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let store = Self {
            db: Arc::new(db),
            conn,
        };
        migrations::run_migrations(store.conn()).await?;
        Ok(store)
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }

    async fn session_exists(&self, id: &str) -> Result<bool, DatabaseError> {
        let mut rows = self
            .conn()
            .query("SELECT COUNT(*) FROM sessions WHERE id = ?1", params![id])
            .await
            .map_err(|e| DatabaseError::Query(format!("session_exists: {e}")))?;
        match rows.next().await {
            Ok(Some(row)) => Ok(row.get::<i64>(0).unwrap_or(0) > 0),
            Ok(None) => Ok(false),
            Err(e) => Err(DatabaseError::Query(format!("session_exists: {e}"))),
        }
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

fn opt_text(s: Option<&str>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s.to_string()),
        None => libsql::Value::Null,
    }
}

/// Column order: 0:id, 1:name, 2:created_at
fn row_to_session(row: &libsql::Row) -> Result<Session, libsql::Error> {
    let id: String = row.get(0)?;
    let name: Option<String> = row.get::<String>(1).ok();
    let created_str: String = row.get(2)?;
    Ok(Session {
        id,
        name,
        created_at: parse_datetime(&created_str),
    })
}

#[async_trait]
impl Store for LibSqlStore {
    // ── Settings ────────────────────────────────────────────────────

    async fn get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        let mut rows = self
            .conn()
            .query("SELECT value FROM settings WHERE key = ?1", params![key])
            .await
            .map_err(|e| DatabaseError::Query(format!("get_setting: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => row
                .get::<String>(0)
                .map(Some)
                .map_err(|e| DatabaseError::Query(format!("get_setting: {e}"))),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_setting: {e}"))),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        let now = Utc::now().to_rfc3339();
        self.conn()
            .execute(
                "INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT (key) DO UPDATE SET value = ?2, updated_at = ?3",
                params![key, value, now],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("set_setting: {e}")))?;
        debug!(key = key, "Setting stored");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, DatabaseError> {
        let count = self
            .conn()
            .execute("DELETE FROM settings WHERE key = ?1", params![key])
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_setting: {e}")))?;
        Ok(count > 0)
    }

    // ── Sessions ────────────────────────────────────────────────────

    async fn save_session(&self, session: &Session) -> Result<(), DatabaseError> {
        let now = Utc::now().to_rfc3339();
        self.conn()
            .execute(
                "INSERT INTO sessions (id, name, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (id) DO UPDATE SET name = ?2, updated_at = ?4",
                params![
                    session.id.as_str(),
                    opt_text(session.name.as_deref()),
                    session.created_at.to_rfc3339(),
                    now
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("save_session: {e}")))?;
        Ok(())
    }

    async fn list_sessions(&self) -> Result<Vec<Session>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT id, name, created_at FROM sessions
                 ORDER BY created_at DESC, rowid DESC",
                (),
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_sessions: {e}")))?;

        let mut sessions = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            match row_to_session(&row) {
                Ok(session) => sessions.push(session),
                Err(e) => tracing::warn!("Skipping session row: {e}"),
            }
        }
        Ok(sessions)
    }

    async fn delete_session(&self, id: &str) -> Result<bool, DatabaseError> {
        let conn = self.conn();
        conn.execute(
            "DELETE FROM session_messages WHERE session_id = ?1",
            params![id],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("delete_session messages: {e}")))?;
        let count = conn
            .execute("DELETE FROM sessions WHERE id = ?1", params![id])
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_session: {e}")))?;
        Ok(count > 0)
    }

    // ── Transcripts ─────────────────────────────────────────────────

    async fn append_message(
        &self,
        session_id: &str,
        message: &Message,
    ) -> Result<(), DatabaseError> {
        if !self.session_exists(session_id).await? {
            return Err(DatabaseError::NotFound {
                entity: "session".to_string(),
                id: session_id.to_string(),
            });
        }

        let id = Uuid::new_v4().to_string();
        self.conn()
            .execute(
                "INSERT INTO session_messages (id, session_id, seq, role, content)
                 VALUES (?1, ?2,
                    (SELECT COALESCE(MAX(seq), 0) + 1 FROM session_messages WHERE session_id = ?2),
                    ?3, ?4)",
                params![id, session_id, message.role.as_str(), message.content.as_str()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("append_message: {e}")))?;

        let now = Utc::now().to_rfc3339();
        if let Err(e) = self
            .conn()
            .execute(
                "UPDATE sessions SET updated_at = ?2 WHERE id = ?1",
                params![session_id, now],
            )
            .await
        {
            warn!(session_id = session_id, error = %e, "Failed to touch session updated_at");
        }

        debug!(session_id = session_id, role = %message.role, "Message appended");
        Ok(())
    }

    async fn list_messages(&self, session_id: &str) -> Result<Vec<Message>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT role, content FROM session_messages
                 WHERE session_id = ?1 ORDER BY seq ASC",
                params![session_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_messages: {e}")))?;

        let mut messages = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            let role_str: String = row.get(0).unwrap_or_default();
            let content: String = row.get(1).unwrap_or_default();
            match role_str.parse::<Role>() {
                Ok(role) => messages.push(Message { role, content }),
                Err(e) => tracing::warn!(session_id = session_id, "Skipping message row: {e}"),
            }
        }
        Ok(messages)
    }
}
