//! Read-only view of engine state for consumers

use std::fmt;

use serde::Serialize;

use crate::companion::{CompanionState, Emotion};
use crate::conversation::Message;
use crate::mode::Mode;

/// Phase of the listen/speak cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// No capture and no playback
    #[default]
    Idle,
    /// Microphone open, waiting for a final transcript
    Listening,
    /// Interpreting a final transcript
    Processing,
    /// Voice output playing a reply
    Speaking,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Listening => "listening",
            Self::Processing => "processing",
            Self::Speaking => "speaking",
        };
        f.write_str(name)
    }
}

/// Observable outputs, published after every handled event
#[derive(Debug, Clone, Default, Serialize)]
pub struct Snapshot {
    pub mode: Mode,
    pub phase: Phase,
    pub is_listening: bool,
    pub is_speaking: bool,
    /// Latest interim transcript; not authoritative
    pub heard_preview: String,
    pub last_reply: String,
    pub scene_summary: String,
    pub companion: CompanionState,
    pub emotion: Emotion,
    /// Wake word hint, shown briefly after an unrecognized utterance
    pub hint: Option<String>,
    pub game_target: String,
    pub messages: Vec<Message>,
}
