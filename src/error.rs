//! Error types for the companion engine

use thiserror::Error;

/// Result type alias for companion operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the companion engine
///
/// None of these escalate past the engine boundary: the orchestration loop
/// absorbs them and surfaces a message or a state flag instead.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Microphone, speech recognition or camera access was denied
    #[error("permission denied: {0}")]
    Permission(String),

    /// Speech recognizer failed to start or stream
    #[error("recognizer error: {0}")]
    Recognizer(String),

    /// Voice output failed to synthesize or play
    #[error("playback error: {0}")]
    Playback(String),

    /// Perception collaborator is unavailable or misconfigured
    #[error("perception error: {0}")]
    Perception(String),

    /// Engine event channel closed
    #[error("engine channel closed")]
    ChannelClosed,

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
