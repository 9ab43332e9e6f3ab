//! Persisted user preferences.

use serde::{Deserialize, Serialize};

/// Dashboard color theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Dark background.
    #[default]
    Dark,
    /// Light background.
    Light,
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dark => f.pad("dark"),
            Self::Light => f.pad("light"),
        }
    }
}

/// User preferences. Exactly one instance exists; an unset slot reads as
/// [`UserSettings::default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    /// Show notifications for store changes.
    pub notifications: bool,
    /// Periodically re-read the store into the dashboard view.
    pub auto_refresh: bool,
    /// Color theme.
    pub theme: Theme,
    /// Locale code, e.g. `en`.
    pub language: String,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            notifications: true,
            auto_refresh: true,
            theme: Theme::Dark,
            language: "en".to_string(),
        }
    }
}
