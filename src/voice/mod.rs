//! Voice collaborators
//!
//! Speech capture and voice output are owned outside the engine. The engine
//! drives them through these traits and hears back only through sinks.

mod capture;
mod playback;

pub use capture::{ConsoleSpeech, SpeechCapture, TranscriptSink};
pub use playback::{ConsoleVoice, PlaybackSink, VoiceOutput};
