//! Ambient perception
//!
//! The perception collaborator owns the camera and publishes short scene
//! summaries such as `"1 face detected"`. It is best-effort: when it cannot
//! start, the engine shows [`PERCEPTION_UNAVAILABLE`] and carries on.

use std::sync::Mutex;
use std::time::Duration;

use tokio::task::AbortHandle;
use uuid::Uuid;

use crate::engine::{EngineEvent, EventSender};
use crate::{Error, Result};

/// Scene shown when perception cannot run
pub const PERCEPTION_UNAVAILABLE: &str = "perception unavailable";

/// Scene shown after perception starts, before the first summary
pub const SCENE_PENDING: &str = "nothing in view yet";

/// Lower bound between two scene summaries
pub const MIN_SAMPLE_INTERVAL: Duration = Duration::from_millis(500);

/// Opaque handle to the capture session, for presentation layers only
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureSession(Uuid);

impl CaptureSession {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CaptureSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Samples a video feed and publishes scene summaries
pub trait Perception: Send + Sync {
    /// Start sampling; summaries go to `sink`
    ///
    /// # Errors
    ///
    /// Returns error if no camera is available or access was denied
    fn start(&self, sink: SceneSink) -> Result<()>;

    /// Stop sampling; safe to call when stopped
    fn stop(&self);

    /// Active capture session, if any
    fn capture_session(&self) -> Option<CaptureSession>;
}

/// Publishes scene summaries into the engine
#[derive(Debug, Clone)]
pub struct SceneSink {
    events: EventSender,
}

impl SceneSink {
    #[must_use]
    pub const fn new(events: EventSender) -> Self {
        Self { events }
    }

    /// Publish a summary; returns false once the engine is gone
    pub fn publish(&self, summary: impl Into<String>) -> bool {
        self.events.send(EngineEvent::Scene(summary.into())).is_ok()
    }
}

/// Whether a summary reports at least one face
#[must_use]
pub fn has_face(summary: &str) -> bool {
    reports_present(summary, "face") || summary.contains("人脸")
}

/// Whether a summary reports a raised hand
#[must_use]
pub fn has_hand(summary: &str) -> bool {
    reports_present(summary, "hand") || summary.contains('手')
}

/// Some word starting with `stem` is not preceded by a zero count
fn reports_present(summary: &str, stem: &str) -> bool {
    let lower = summary.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    words.iter().enumerate().any(|(i, word)| {
        word.starts_with(stem)
            && !i
                .checked_sub(1)
                .is_some_and(|prev| matches!(words[prev], "no" | "zero" | "0"))
    })
}

/// Perception that cycles through a fixed list of scene summaries
///
/// With no scenes configured it behaves like a device without a camera.
/// Must be used from within a tokio runtime.
pub struct ScriptedPerception {
    scenes: Vec<String>,
    interval: Duration,
    task: Mutex<Option<AbortHandle>>,
    session: Mutex<Option<CaptureSession>>,
}

impl ScriptedPerception {
    #[must_use]
    pub fn new(scenes: Vec<String>, interval: Duration) -> Self {
        Self {
            scenes,
            interval: interval.max(MIN_SAMPLE_INTERVAL),
            task: Mutex::new(None),
            session: Mutex::new(None),
        }
    }
}

impl Perception for ScriptedPerception {
    fn start(&self, sink: SceneSink) -> Result<()> {
        if self.scenes.is_empty() {
            return Err(Error::Perception("no camera configured".to_string()));
        }

        self.stop();

        let scenes = self.scenes.clone();
        let interval = self.interval;
        let task = tokio::spawn(async move {
            for scene in scenes.iter().cycle() {
                if !sink.publish(scene.clone()) {
                    break;
                }
                tokio::time::sleep(interval).await;
            }
        });

        if let Ok(mut current) = self.task.lock() {
            *current = Some(task.abort_handle());
        }
        if let Ok(mut session) = self.session.lock() {
            *session = Some(CaptureSession::new());
        }

        tracing::debug!(
            scenes = self.scenes.len(),
            interval_ms = interval.as_millis(),
            "scripted perception started"
        );
        Ok(())
    }

    fn stop(&self) {
        if let Ok(mut current) = self.task.lock() {
            if let Some(task) = current.take() {
                task.abort();
                tracing::debug!("scripted perception stopped");
            }
        }
        if let Ok(mut session) = self.session.lock() {
            session.take();
        }
    }

    fn capture_session(&self) -> Option<CaptureSession> {
        self.session.lock().ok().and_then(|s| *s)
    }
}
