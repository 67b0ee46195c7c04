//! Configuration management for the companion

pub mod file;

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::engine::EngineSettings;
use crate::game::PhrasePool;
use crate::mode::Mode;
use crate::perception::MIN_SAMPLE_INTERVAL;
use crate::preferences::{
    KEY_COMPANION_NAME, KEY_FAVORITE_TOPIC, KEY_INPUT_LOCALE, KEY_OUTPUT_LOCALE, MemoryStore,
    Preferences,
};
use crate::{Error, Result};

use self::file::LoonaConfigFile;

/// Preference keys paired with the env vars that override them
const PREFERENCE_ENV: [(&str, &str); 4] = [
    (KEY_COMPANION_NAME, "LOONA_NAME"),
    (KEY_FAVORITE_TOPIC, "LOONA_TOPIC"),
    (KEY_INPUT_LOCALE, "LOONA_INPUT_LOCALE"),
    (KEY_OUTPUT_LOCALE, "LOONA_OUTPUT_LOCALE"),
];

/// Companion configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Resolved user preferences
    pub preferences: Preferences,

    /// Engine timings and limits
    pub settings: EngineSettings,

    /// Mode the session starts in
    pub start_mode: Mode,

    /// Wake words tried after the built-ins
    pub wake_words: Vec<String>,

    /// Mini-game phrases
    pub phrases: PhrasePool,

    /// Console perception feed
    pub perception: PerceptionConfig,

    /// Console voice
    pub voice: VoiceConfig,

    /// JSON-lines event log, set via `LOONA_EVENT_LOG`
    pub event_log: Option<PathBuf>,
}

/// Scripted perception configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerceptionConfig {
    /// Scene summaries to cycle; empty means no camera
    pub scenes: Vec<String>,
    /// Time between two summaries
    pub interval: Duration,
}

impl Default for PerceptionConfig {
    fn default() -> Self {
        Self {
            scenes: vec![
                "desk scene, no face".to_string(),
                "1 face detected".to_string(),
            ],
            interval: Duration::from_secs(5),
        }
    }
}

/// Console voice configuration
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceConfig {
    /// Simulated speaking rate
    pub words_per_second: f32,
    /// Whether the console microphone grants access
    pub authorized: bool,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            words_per_second: 3.0,
            authorized: true,
        }
    }
}

impl Config {
    /// Load configuration (env > toml > default)
    ///
    /// With `path`, that file must exist and parse. Without it the standard
    /// location is tried and silently skipped when absent.
    ///
    /// # Errors
    ///
    /// Returns error if an explicit config file cannot be loaded or a value
    /// is out of range
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let fc = match path {
            Some(path) => file::load_config_file_from(path)?,
            None => file::load_config_file(),
        };
        Self::from_sources(fc, |key| std::env::var(key).ok())
    }

    /// Merge a parsed config file with an environment lookup
    ///
    /// # Errors
    ///
    /// Returns error if the start mode is unknown or a value is out of range
    pub fn from_sources(fc: LoonaConfigFile, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        // Preferences (env > toml > default), resolved through the store
        let file_prefs = [
            fc.preferences.companion_name,
            fc.preferences.favorite_topic,
            fc.preferences.input_locale,
            fc.preferences.output_locale,
        ];
        let store = PREFERENCE_ENV.iter().zip(file_prefs).fold(
            MemoryStore::default(),
            |store, ((key, var), file_value)| match env(var).or(file_value) {
                Some(value) => store.with(*key, value),
                None => store,
            },
        );
        let preferences = Preferences::load(&store);

        let start_mode = match fc.engine.start_mode.as_deref() {
            Some(name) => Mode::from_name(name)
                .ok_or_else(|| Error::Config(format!("unknown start mode: {name}")))?,
            None => Mode::default(),
        };

        let default = EngineSettings::default();
        let engine = fc.engine;
        let settings = EngineSettings {
            idle_period: engine
                .idle_period_secs
                .map_or(default.idle_period, Duration::from_secs),
            idle_threshold: engine
                .idle_threshold_secs
                .map_or(default.idle_threshold, Duration::from_secs),
            duplicate_window: engine
                .duplicate_window_ms
                .map_or(default.duplicate_window, Duration::from_millis),
            hint_cooldown: engine
                .hint_cooldown_secs
                .map_or(default.hint_cooldown, Duration::from_secs),
            hint_duration: engine
                .hint_duration_secs
                .map_or(default.hint_duration, Duration::from_secs),
            resume_grace: engine
                .resume_grace_ms
                .map_or(default.resume_grace, Duration::from_millis),
            silence_timeout: engine
                .silence_timeout_ms
                .map_or(default.silence_timeout, Duration::from_millis),
            alert_every: engine.alert_every.unwrap_or(default.alert_every),
            log_capacity: engine.log_capacity.unwrap_or(default.log_capacity),
        };

        if settings.alert_every == 0 {
            return Err(Error::Config("alert_every must be at least 1".to_string()));
        }
        if settings.idle_period.is_zero() {
            return Err(Error::Config("idle_period_secs must be positive".to_string()));
        }

        let perception = {
            let default = PerceptionConfig::default();
            PerceptionConfig {
                scenes: fc.perception.scenes.unwrap_or(default.scenes),
                interval: fc
                    .perception
                    .interval_ms
                    .map_or(default.interval, Duration::from_millis)
                    .max(MIN_SAMPLE_INTERVAL),
            }
        };

        let voice = {
            let default = VoiceConfig::default();
            VoiceConfig {
                words_per_second: fc
                    .voice
                    .words_per_second
                    .filter(|wps| *wps > 0.0)
                    .unwrap_or(default.words_per_second),
                authorized: fc.voice.authorized.unwrap_or(default.authorized),
            }
        };

        let event_log = env("LOONA_EVENT_LOG")
            .or(fc.telemetry.event_log)
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            preferences,
            settings,
            start_mode,
            wake_words: fc.wake.extra_words.unwrap_or_default(),
            phrases: fc.game.phrases.map_or_else(PhrasePool::default, PhrasePool::new),
            perception,
            voice,
            event_log,
        })
    }
}
