//! Read-only user preferences
//!
//! The engine only reads four keys. Absent or blank values fall back to the
//! documented defaults.

use std::collections::HashMap;

/// Preference key for the companion's name
pub const KEY_COMPANION_NAME: &str = "companion_name";

/// Preference key for the user's favorite topic
pub const KEY_FAVORITE_TOPIC: &str = "favorite_topic";

/// Preference key for the speech recognition locale
pub const KEY_INPUT_LOCALE: &str = "input_locale";

/// Preference key for the speech synthesis locale
pub const KEY_OUTPUT_LOCALE: &str = "output_locale";

const DEFAULT_COMPANION_NAME: &str = "Loona";
const DEFAULT_FAVORITE_TOPIC: &str = "space";
const DEFAULT_LOCALE: &str = "en-US";

/// External key/value store the engine reads preferences from
pub trait PreferenceStore: Send + Sync {
    /// Look up a string value
    fn get(&self, key: &str) -> Option<String>;
}

/// In-memory preference store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    #[must_use]
    pub fn new(values: HashMap<String, String>) -> Self {
        Self { values }
    }

    /// Set a value, returning the store for chaining
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl PreferenceStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// Resolved preferences with defaults applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preferences {
    pub companion_name: String,
    pub favorite_topic: String,
    pub input_locale: String,
    pub output_locale: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            companion_name: DEFAULT_COMPANION_NAME.to_string(),
            favorite_topic: DEFAULT_FAVORITE_TOPIC.to_string(),
            input_locale: DEFAULT_LOCALE.to_string(),
            output_locale: DEFAULT_LOCALE.to_string(),
        }
    }
}

impl Preferences {
    /// Read all preferences from `store`
    #[must_use]
    pub fn load(store: &dyn PreferenceStore) -> Self {
        Self {
            companion_name: read(store, KEY_COMPANION_NAME, DEFAULT_COMPANION_NAME),
            favorite_topic: read(store, KEY_FAVORITE_TOPIC, DEFAULT_FAVORITE_TOPIC),
            input_locale: read(store, KEY_INPUT_LOCALE, DEFAULT_LOCALE),
            output_locale: read(store, KEY_OUTPUT_LOCALE, DEFAULT_LOCALE),
        }
    }
}

fn read(store: &dyn PreferenceStore, key: &str, default: &str) -> String {
    store
        .get(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_absent() {
        let prefs = Preferences::load(&MemoryStore::default());
        assert_eq!(prefs, Preferences::default());
        assert_eq!(prefs.companion_name, "Loona");
    }

    #[test]
    fn test_blank_values_fall_back() {
        let store = MemoryStore::default()
            .with(KEY_COMPANION_NAME, "   ")
            .with(KEY_FAVORITE_TOPIC, "dinosaurs")
            .with(KEY_OUTPUT_LOCALE, "zh-CN");
        let prefs = Preferences::load(&store);

        assert_eq!(prefs.companion_name, "Loona");
        assert_eq!(prefs.favorite_topic, "dinosaurs");
        assert_eq!(prefs.output_locale, "zh-CN");
        assert_eq!(prefs.input_locale, "en-US");
    }
}
