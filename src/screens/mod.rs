//! Text renderings of the three views and the actions each one offers.

pub mod chat;
pub mod history;
pub mod settings;

pub use chat::ChatView;
pub use history::{HistoryItem, HistoryScreen};
pub use settings::SettingsScreen;
