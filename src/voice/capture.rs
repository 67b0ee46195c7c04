//! Speech capture
//!
//! The capture collaborator owns the microphone and the recognizer. The engine
//! only sees transcripts, delivered through a [`TranscriptSink`] tagged with the
//! listening session that requested them.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::engine::{EngineEvent, EventSender};
use crate::Result;

/// Streams transcription results for one locale
#[async_trait]
pub trait SpeechCapture: Send + Sync {
    /// Ask for microphone and speech recognition access
    async fn request_authorization(&self) -> bool;

    /// Begin streaming interim and final results into `sink`
    ///
    /// # Errors
    ///
    /// Returns error if the recognizer cannot be started
    fn start_transcribing(&self, locale: &str, sink: TranscriptSink) -> Result<()>;

    /// Stop streaming; safe to call when not transcribing
    fn stop_transcribing(&self);
}

/// Delivers transcripts for one listening session into the engine
#[derive(Debug, Clone)]
pub struct TranscriptSink {
    session: u64,
    events: EventSender,
}

impl TranscriptSink {
    #[must_use]
    pub const fn new(session: u64, events: EventSender) -> Self {
        Self { session, events }
    }

    /// Listening session these transcripts belong to
    #[must_use]
    pub const fn session(&self) -> u64 {
        self.session
    }

    /// Push a result; returns false once the engine is gone
    pub fn send(&self, text: impl Into<String>, is_final: bool) -> bool {
        self.events
            .send(EngineEvent::Transcript {
                session: self.session,
                text: text.into(),
                is_final,
            })
            .is_ok()
    }
}

/// Speech capture fed from typed console lines
///
/// Lines delivered while no session is active are dropped, just like speech
/// spoken while the microphone is closed.
#[derive(Debug)]
pub struct ConsoleSpeech {
    authorized: bool,
    sink: Mutex<Option<TranscriptSink>>,
}

impl Default for ConsoleSpeech {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ConsoleSpeech {
    #[must_use]
    pub const fn new(authorized: bool) -> Self {
        Self {
            authorized,
            sink: Mutex::new(None),
        }
    }

    /// Whether a listening session is open
    #[must_use]
    pub fn is_transcribing(&self) -> bool {
        self.sink.lock().is_ok_and(|sink| sink.is_some())
    }

    /// Deliver a typed line as an interim result followed by a final one
    ///
    /// Returns false when the line was dropped.
    pub fn deliver(&self, line: &str) -> bool {
        let Ok(sink) = self.sink.lock() else {
            return false;
        };

        let Some(sink) = sink.as_ref() else {
            tracing::debug!(line, "microphone closed, dropping line");
            return false;
        };

        sink.send(line, false) && sink.send(line, true)
    }
}

#[async_trait]
impl SpeechCapture for ConsoleSpeech {
    async fn request_authorization(&self) -> bool {
        self.authorized
    }

    fn start_transcribing(&self, locale: &str, sink: TranscriptSink) -> Result<()> {
        if let Ok(mut current) = self.sink.lock() {
            tracing::debug!(locale, session = sink.session(), "console capture started");
            *current = Some(sink);
        }
        Ok(())
    }

    fn stop_transcribing(&self) {
        if let Ok(mut current) = self.sink.lock() {
            if current.take().is_some() {
                tracing::debug!("console capture stopped");
            }
        }
    }
}
