//! TOML configuration file loading
//!
//! Supports `~/.config/loona/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{Error, Result};

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct LoonaConfigFile {
    /// User preferences
    #[serde(default)]
    pub preferences: PreferencesFileConfig,

    /// Engine timings and limits
    #[serde(default)]
    pub engine: EngineFileConfig,

    /// Console perception feed
    #[serde(default)]
    pub perception: PerceptionFileConfig,

    /// Console voice
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// Event log
    #[serde(default)]
    pub telemetry: TelemetryFileConfig,

    /// Additional wake words
    #[serde(default)]
    pub wake: WakeFileConfig,

    /// Mini-game phrases
    #[serde(default)]
    pub game: GameFileConfig,
}

/// Preference overrides, keyed like the preference store
#[derive(Debug, Default, Deserialize)]
pub struct PreferencesFileConfig {
    /// Companion display name (e.g. "Loona")
    pub companion_name: Option<String>,
    /// Topic used in small talk (e.g. "space")
    pub favorite_topic: Option<String>,
    /// Recognition locale (e.g. "en-US")
    pub input_locale: Option<String>,
    /// Voice locale (e.g. "zh-CN")
    pub output_locale: Option<String>,
}

/// Engine timing overrides
#[derive(Debug, Default, Deserialize)]
pub struct EngineFileConfig {
    /// Mode to start in (e.g. "monitor")
    pub start_mode: Option<String>,
    pub idle_period_secs: Option<u64>,
    pub idle_threshold_secs: Option<u64>,
    pub duplicate_window_ms: Option<u64>,
    pub hint_cooldown_secs: Option<u64>,
    pub hint_duration_secs: Option<u64>,
    pub resume_grace_ms: Option<u64>,
    pub silence_timeout_ms: Option<u64>,
    /// Alert on every n-th face or hand
    pub alert_every: Option<u32>,
    /// Messages kept in the conversation log
    pub log_capacity: Option<usize>,
}

/// Scripted perception feed
#[derive(Debug, Default, Deserialize)]
pub struct PerceptionFileConfig {
    /// Scene summaries to cycle through; empty means no camera
    pub scenes: Option<Vec<String>>,
    /// Time between two summaries
    pub interval_ms: Option<u64>,
}

/// Console voice settings
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// Simulated speaking rate
    pub words_per_second: Option<f32>,
    /// Whether the console microphone grants access
    pub authorized: Option<bool>,
}

/// Telemetry settings
#[derive(Debug, Default, Deserialize)]
pub struct TelemetryFileConfig {
    /// JSON-lines file companion events are appended to
    pub event_log: Option<String>,
}

/// Wake word settings
#[derive(Debug, Default, Deserialize)]
pub struct WakeFileConfig {
    /// Tried after the built-in wake words
    pub extra_words: Option<Vec<String>>,
}

/// Mini-game settings
#[derive(Debug, Default, Deserialize)]
pub struct GameFileConfig {
    /// Replaces the built-in phrase list
    pub phrases: Option<Vec<String>>,
}

/// Load the TOML config file from the standard path
///
/// Returns `LoonaConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> LoonaConfigFile {
    let Some(path) = config_file_path() else {
        return LoonaConfigFile::default();
    };

    if !path.exists() {
        return LoonaConfigFile::default();
    }

    match load_config_file_from(&path) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to load config file, using defaults"
            );
            LoonaConfigFile::default()
        }
    }
}

/// Load a config file from an explicit path
///
/// # Errors
///
/// Returns error if the file cannot be read or is not valid TOML
pub fn load_config_file_from(path: &Path) -> Result<LoonaConfigFile> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
    let config = toml::from_str(&content)?;
    tracing::info!(path = %path.display(), "loaded config file");
    Ok(config)
}

/// Return the config file path: `~/.config/loona/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("loona").join("config.toml"))
}
