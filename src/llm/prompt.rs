//! System prompt built from the user's preferences.

use crate::context::Preferences;

const BASE_PROMPT: &str = "You are an Islamic companion and guide. You help with Islamic \
teachings, practical guidance and local recommendations such as halal restaurants. Answer \
respectfully and concisely, and say so when scholars differ on a question.";

/// Compose the system prompt for one request.
pub fn system_prompt(preferences: &Preferences) -> String {
    let location = if preferences.location_enabled {
        "The user has enabled location services, so location-based recommendations are welcome."
    } else {
        "The user has not shared a location. Do not assume one; ask if a recommendation needs it."
    };

    format!(
        "{BASE_PROMPT}\n\nPersonality: respond as a {}.\n{location}",
        preferences.personality_or_default()
    )
}
