//! Voice output
//!
//! The voice collaborator owns the speaker. Completion of each utterance is
//! reported through a [`PlaybackSink`] tagged with the utterance id, so a late
//! completion of an interrupted utterance can be told apart from the current one.

use std::io::Write;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::task::AbortHandle;

use crate::engine::{EngineEvent, EventSender};
use crate::{Error, Result};

/// Extra time after the last word before playback counts as finished
const TAIL: Duration = Duration::from_millis(150);

/// Synthesizes and plays text
pub trait VoiceOutput: Send + Sync {
    /// Start speaking `text`; `sink` is notified when playback ends naturally
    ///
    /// # Errors
    ///
    /// Returns error if synthesis or playback cannot start
    fn speak(&self, text: &str, language_code: &str, sink: PlaybackSink) -> Result<()>;

    /// Stop playback immediately; no completion is reported
    fn stop_speaking(&self);

    /// Whether audio is currently playing
    fn is_playing(&self) -> bool;
}

/// Reports completion of one utterance to the engine
#[derive(Debug, Clone)]
pub struct PlaybackSink {
    utterance: u64,
    events: EventSender,
}

impl PlaybackSink {
    #[must_use]
    pub const fn new(utterance: u64, events: EventSender) -> Self {
        Self { utterance, events }
    }

    #[must_use]
    pub const fn utterance(&self) -> u64 {
        self.utterance
    }

    /// Signal that playback ended; returns false once the engine is gone
    pub fn finished(&self) -> bool {
        self.events
            .send(EngineEvent::PlaybackFinished {
                utterance: self.utterance,
            })
            .is_ok()
    }
}

/// Voice output that prints replies and simulates playback time
///
/// Must be used from within a tokio runtime.
pub struct ConsoleVoice {
    words_per_second: f32,
    playing: Arc<AtomicBool>,
    task: Mutex<Option<AbortHandle>>,
}

impl ConsoleVoice {
    #[must_use]
    pub fn new(words_per_second: f32) -> Self {
        Self {
            words_per_second: words_per_second.max(0.5),
            playing: Arc::new(AtomicBool::new(false)),
            task: Mutex::new(None),
        }
    }

    /// Simulated playback time for `text`
    #[must_use]
    pub fn duration_for(&self, text: &str) -> Duration {
        #[allow(clippy::cast_precision_loss)]
        let words = text.split_whitespace().count().max(1) as f32;
        Duration::from_secs_f32(words / self.words_per_second) + TAIL
    }
}

impl VoiceOutput for ConsoleVoice {
    fn speak(&self, text: &str, language_code: &str, sink: PlaybackSink) -> Result<()> {
        self.stop_speaking();

        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "🔊 {text}").map_err(|e| Error::Playback(e.to_string()))?;
        drop(stdout);

        let duration = self.duration_for(text);
        let playing = Arc::clone(&self.playing);
        playing.store(true, Ordering::SeqCst);

        let task = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            playing.store(false, Ordering::SeqCst);
            sink.finished();
        });

        tracing::debug!(
            language_code,
            duration_ms = duration.as_millis(),
            "playback started"
        );

        if let Ok(mut current) = self.task.lock() {
            *current = Some(task.abort_handle());
        }
        Ok(())
    }

    fn stop_speaking(&self) {
        if let Ok(mut current) = self.task.lock() {
            if let Some(task) = current.take() {
                task.abort();
            }
        }
        if self.playing.swap(false, Ordering::SeqCst) {
            tracing::debug!("playback stopped");
        }
    }

    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }
}
