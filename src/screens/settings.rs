//! Settings screen — personality, location and about.

use crate::context::{Preferences, SessionContext};

pub const TITLE: &str = "Settings";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub struct SettingsScreen {
    context: SessionContext,
}

impl SettingsScreen {
    pub fn new(context: SessionContext) -> Self {
        Self { context }
    }

    pub async fn render(&self) -> String {
        let prefs = self.context.preferences().await;
        let location = if prefs.location_enabled { "on" } else { "off" };
        [
            TITLE.to_string(),
            "═".repeat(TITLE.len()),
            "Chat Preferences".to_string(),
            format!("  AI Personality: {}", prefs.personality_or_default()),
            String::new(),
            "Privacy & Location".to_string(),
            format!("  Location Services: {location}"),
            String::new(),
            "About".to_string(),
            format!("  Version: {VERSION}"),
        ]
        .join("\n")
    }

    /// Blank text resets to the default personality.
    pub async fn update_personality(&self, text: &str) -> Preferences {
        let text = text.trim();
        let personality = (!text.is_empty()).then(|| text.to_string());
        self.context
            .update_preferences(|p| p.personality = personality)
            .await
    }

    pub async fn set_location(&self, enabled: bool) -> Preferences {
        self.context
            .update_preferences(|p| p.location_enabled = enabled)
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::context::DEFAULT_PERSONALITY;
    use crate::store::{MemoryStore, Store, settings_keys};

    #[tokio::test]
    async fn renders_defaults() {
        let text = SettingsScreen::new(SessionContext::new()).render().await;
        assert!(text.contains(&format!("AI Personality: {DEFAULT_PERSONALITY}")));
        assert!(text.contains("Location Services: off"));
        assert!(text.contains(&format!("Version: {VERSION}")));
    }

    #[tokio::test]
    async fn edits_persist_through_context() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let context = SessionContext::with_store(Arc::clone(&store));
        let screen = SettingsScreen::new(context.clone());

        screen.update_personality("  Friendly ").await;
        let prefs = screen.set_location(true).await;
        assert_eq!(prefs.personality.as_deref(), Some("Friendly"));
        assert!(prefs.location_enabled);

        let restored = SessionContext::restore(store).await.unwrap();
        assert_eq!(restored.preferences().await, prefs);
        assert!(screen.render().await.contains("Location Services: on"));
    }

    #[tokio::test]
    async fn blank_personality_resets_to_default() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let screen = SettingsScreen::new(SessionContext::with_store(Arc::clone(&store)));
        screen.update_personality("Teacher").await;
        let prefs = screen.update_personality("   ").await;
        assert_eq!(prefs.personality, None);
        assert_eq!(prefs.personality_or_default(), DEFAULT_PERSONALITY);
        assert!(store
            .get(settings_keys::PREFERENCES)
            .await
            .unwrap()
            .is_some());
    }
}
