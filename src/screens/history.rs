//! History screen — the list of stored sessions.

use crate::context::{Session, SessionContext};

pub const TITLE: &str = "Chat History";
pub const EMPTY_TITLE: &str = "No chat history yet";
pub const EMPTY_HINT: &str = "Start a conversation to see your chat history here";

/// One row of the list. `number` is 1-based, as typed in `/open <n>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryItem {
    pub number: usize,
    pub session: Session,
    pub active: bool,
}

pub struct HistoryScreen {
    context: SessionContext,
}

impl HistoryScreen {
    pub fn new(context: SessionContext) -> Self {
        Self { context }
    }

    pub async fn items(&self) -> Vec<HistoryItem> {
        let active = self.context.active_session().await;
        self.context
            .sessions()
            .await
            .into_iter()
            .enumerate()
            .map(|(i, session)| HistoryItem {
                number: i + 1,
                active: active.as_deref() == Some(session.id.as_str()),
                session,
            })
            .collect()
    }

    pub async fn render(&self) -> String {
        let items = self.items().await;
        let mut out = vec![TITLE.to_string(), "═".repeat(TITLE.chars().count())];
        if items.is_empty() {
            out.push(EMPTY_TITLE.to_string());
            out.push(EMPTY_HINT.to_string());
            return out.join("\n");
        }
        for item in &items {
            let marker = if item.active { "*" } else { " " };
            out.push(format!(
                "{marker} {:>2}. {}  ({})",
                item.number,
                item.session.display_name(),
                item.session.created_at.format("%Y-%m-%d %H:%M")
            ));
        }
        out.join("\n")
    }

    /// Make the `number`-th session active. `None` if out of range.
    pub async fn select(&self, number: usize) -> Option<Session> {
        let session = self
            .context
            .sessions()
            .await
            .into_iter()
            .nth(number.checked_sub(1)?)?;
        self.context
            .set_active_session(Some(session.id.clone()))
            .await;
        Some(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ContextEvent, UNNAMED_SESSION};

    #[tokio::test]
    async fn empty_state() {
        let screen = HistoryScreen::new(SessionContext::new());
        let text = screen.render().await;
        assert!(text.starts_with(TITLE));
        assert!(text.contains(EMPTY_TITLE));
        assert!(text.contains(EMPTY_HINT));
    }

    #[tokio::test]
    async fn lists_sessions_with_fallback_name() {
        let context = SessionContext::new();
        context.add_session(Session::with_id("a", None)).await;
        context
            .add_session(Session::with_id("b", Some("Prayer times".into())))
            .await;
        let screen = HistoryScreen::new(context);

        let text = screen.render().await;
        assert!(text.contains(" 1. Prayer times"));
        assert!(text.contains(&format!(" 2. {UNNAMED_SESSION}")));
        assert!(!text.contains(EMPTY_TITLE));
    }

    #[tokio::test]
    async fn select_sets_active_session() {
        let context = SessionContext::new();
        context.add_session(Session::with_id("a", None)).await;
        let mut rx = context.subscribe();
        let screen = HistoryScreen::new(context.clone());

        let picked = screen.select(1).await.unwrap();
        assert_eq!(picked.id, "a");
        assert_eq!(context.active_session().await.as_deref(), Some("a"));
        assert_eq!(
            rx.recv().await.unwrap(),
            ContextEvent::ActiveSessionChanged(Some("a".into()))
        );
        assert!(screen.items().await[0].active);
        assert!(screen.render().await.contains("*  1."));
    }

    #[tokio::test]
    async fn select_out_of_range() {
        let screen = HistoryScreen::new(SessionContext::new());
        assert!(screen.select(0).await.is_none());
        assert!(screen.select(3).await.is_none());
    }
}
