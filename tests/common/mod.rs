//! Shared test utilities
//!
//! Scriptable collaborators plus a manual clock and scheduler, so engine
//! tests control every callback and every timer firing.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Notify;

use loona_companion::engine::{
    Collaborators, Engine, EngineBuilder, EngineEvent, EngineHandle, Phase,
};
use loona_companion::perception::{CaptureSession, Perception, SceneSink};
use loona_companion::scheduler::{Clock, Scheduler, TimerId, TimerKind};
use loona_companion::voice::{PlaybackSink, SpeechCapture, TranscriptSink, VoiceOutput};
use loona_companion::{Error, Result};

/// Speech capture driven by the test
#[derive(Default)]
pub struct FakeSpeech {
    pub deny: AtomicBool,
    /// Authorization waits for `grant` while set
    pub hold: AtomicBool,
    pub grant: Notify,
    pub fail_start: AtomicBool,
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
    pub locale: Mutex<Option<String>>,
    sink: Mutex<Option<TranscriptSink>>,
    stale: Mutex<Option<TranscriptSink>>,
}

impl FakeSpeech {
    pub fn is_open(&self) -> bool {
        self.sink.lock().unwrap().is_some()
    }

    /// Emit an interim result on the open session
    pub fn interim(&self, text: &str) {
        let sink = self.sink.lock().unwrap().clone().expect("capture not open");
        sink.send(text, false);
    }

    /// Emit a final result on the open session
    pub fn final_result(&self, text: &str) {
        let sink = self.sink.lock().unwrap().clone().expect("capture not open");
        sink.send(text, true);
    }

    /// Emit a final result on the most recently closed session
    pub fn late_final(&self, text: &str) {
        let sink = self.stale.lock().unwrap().clone().expect("no closed session");
        sink.send(text, true);
    }
}

#[async_trait]
impl SpeechCapture for FakeSpeech {
    async fn request_authorization(&self) -> bool {
        if self.hold.load(Ordering::SeqCst) {
            self.grant.notified().await;
        }
        !self.deny.load(Ordering::SeqCst)
    }

    fn start_transcribing(&self, locale: &str, sink: TranscriptSink) -> Result<()> {
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(Error::Recognizer("audio engine unavailable".to_string()));
        }
        self.starts.fetch_add(1, Ordering::SeqCst);
        *self.locale.lock().unwrap() = Some(locale.to_string());
        *self.sink.lock().unwrap() = Some(sink);
        Ok(())
    }

    fn stop_transcribing(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        if let Some(sink) = self.sink.lock().unwrap().take() {
            *self.stale.lock().unwrap() = Some(sink);
        }
    }
}

/// Voice output that records utterances and finishes on demand
#[derive(Default)]
pub struct FakeVoice {
    pub fail: AtomicBool,
    pub stops: AtomicUsize,
    pub spoken: Mutex<Vec<(String, String)>>,
    playing: AtomicBool,
    sink: Mutex<Option<PlaybackSink>>,
    stale: Mutex<Option<PlaybackSink>>,
}

impl FakeVoice {
    pub fn spoken_texts(&self) -> Vec<String> {
        self.spoken.lock().unwrap().iter().map(|(t, _)| t.clone()).collect()
    }

    pub fn last_spoken(&self) -> Option<String> {
        self.spoken.lock().unwrap().last().map(|(t, _)| t.clone())
    }

    /// Finish the current utterance naturally
    pub fn finish(&self) {
        self.playing.store(false, Ordering::SeqCst);
        if let Some(sink) = self.sink.lock().unwrap().take() {
            sink.finished();
        }
    }

    /// Report completion of the most recently interrupted utterance
    pub fn late_finish(&self) {
        if let Some(sink) = self.stale.lock().unwrap().clone() {
            sink.finished();
        }
    }
}

impl VoiceOutput for FakeVoice {
    fn speak(&self, text: &str, language_code: &str, sink: PlaybackSink) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Playback("no output device".to_string()));
        }
        self.spoken
            .lock()
            .unwrap()
            .push((text.to_string(), language_code.to_string()));
        self.playing.store(true, Ordering::SeqCst);
        *self.sink.lock().unwrap() = Some(sink);
        Ok(())
    }

    fn stop_speaking(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.playing.store(false, Ordering::SeqCst);
        if let Some(sink) = self.sink.lock().unwrap().take() {
            *self.stale.lock().unwrap() = Some(sink);
        }
    }

    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }
}

/// Perception fed scene summaries by the test
#[derive(Default)]
pub struct FakePerception {
    pub unavailable: AtomicBool,
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
    sink: Mutex<Option<SceneSink>>,
    session: Mutex<Option<CaptureSession>>,
}

impl FakePerception {
    pub fn show(&self, summary: &str) {
        let sink = self.sink.lock().unwrap().clone().expect("perception not started");
        sink.publish(summary);
    }
}

impl Perception for FakePerception {
    fn start(&self, sink: SceneSink) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Error::Perception("camera denied".to_string()));
        }
        self.starts.fetch_add(1, Ordering::SeqCst);
        *self.sink.lock().unwrap() = Some(sink);
        *self.session.lock().unwrap() = Some(CaptureSession::new());
        Ok(())
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.sink.lock().unwrap().take();
        self.session.lock().unwrap().take();
    }

    fn capture_session(&self) -> Option<CaptureSession> {
        *self.session.lock().unwrap()
    }
}

/// Clock advanced by hand
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }
}

impl ManualClock {
    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap()
    }
}

/// A timer the engine asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scheduled {
    pub id: TimerId,
    pub kind: TimerKind,
    pub delay: Duration,
    pub repeating: bool,
}

/// Scheduler that only records; tests fire timers explicitly
#[derive(Default)]
pub struct ManualScheduler {
    active: Mutex<Vec<Scheduled>>,
    pub cancelled: Mutex<Vec<TimerId>>,
}

impl ManualScheduler {
    pub fn pending(&self, kind: TimerKind) -> Option<Scheduled> {
        self.active
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|t| t.kind == kind)
            .copied()
    }

    pub fn active_count(&self) -> usize {
        self.active.lock().unwrap().len()
    }

    fn insert(&self, timer: Scheduled) {
        self.active.lock().unwrap().push(timer);
    }
}

impl Scheduler for ManualScheduler {
    fn once(&self, id: TimerId, kind: TimerKind, delay: Duration) {
        self.insert(Scheduled {
            id,
            kind,
            delay,
            repeating: false,
        });
    }

    fn every(&self, id: TimerId, kind: TimerKind, period: Duration) {
        self.insert(Scheduled {
            id,
            kind,
            delay: period,
            repeating: true,
        });
    }

    fn cancel(&self, id: TimerId) {
        self.active.lock().unwrap().retain(|t| t.id != id);
        self.cancelled.lock().unwrap().push(id);
    }
}

/// An engine wired to fakes, pumped by hand
pub struct Harness {
    pub engine: Engine,
    pub handle: EngineHandle,
    pub speech: Arc<FakeSpeech>,
    pub voice: Arc<FakeVoice>,
    pub perception: Arc<FakePerception>,
    pub clock: Arc<ManualClock>,
    pub scheduler: Arc<ManualScheduler>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(|builder| builder)
    }

    pub fn with(configure: impl FnOnce(EngineBuilder) -> EngineBuilder) -> Self {
        let speech = Arc::new(FakeSpeech::default());
        let voice = Arc::new(FakeVoice::default());
        let perception = Arc::new(FakePerception::default());
        let clock = Arc::new(ManualClock::default());
        let scheduler = Arc::new(ManualScheduler::default());

        let builder = Engine::builder(Collaborators {
            speech: speech.clone(),
            voice: voice.clone(),
            perception: perception.clone(),
        })
        .clock(clock.clone())
        .scheduler(scheduler.clone())
        .seed(7);

        let (engine, handle) = configure(builder).build();

        Self {
            engine,
            handle,
            speech,
            voice,
            perception,
            clock,
            scheduler,
        }
    }

    /// Handle everything queued so far, letting spawned authorization settle
    pub async fn pump(&mut self) {
        for _ in 0..64 {
            let handled = self.engine.process_pending();
            if handled == 0 && !self.engine.is_authorizing() {
                return;
            }
            tokio::task::yield_now().await;
        }
    }

    pub async fn send(&mut self, event: EngineEvent) {
        self.handle.send(event).unwrap();
        self.pump().await;
    }

    /// Start a session and wait until listening
    pub async fn start(&mut self) {
        self.send(EngineEvent::Start).await;
    }

    /// Speak a final utterance into the open microphone
    pub async fn say(&mut self, text: &str) {
        self.speech.final_result(text);
        self.pump().await;
    }

    /// Fire the pending timer of `kind`; returns false if none was pending
    pub async fn fire(&mut self, kind: TimerKind) -> bool {
        let Some(timer) = self.scheduler.pending(kind) else {
            return false;
        };
        self.send(EngineEvent::Timer {
            id: timer.id,
            kind,
        })
        .await;
        true
    }

    /// Let the current utterance finish and the microphone re-arm
    pub async fn finish_speaking(&mut self) {
        self.voice.finish();
        self.pump().await;
        self.fire(TimerKind::ResumeListening).await;
    }

    /// Spoken reply followed by the microphone re-arming
    pub async fn exchange(&mut self, text: &str) -> Option<String> {
        let before = self.voice.spoken_texts().len();
        self.say(text).await;
        let reply = self.voice.spoken_texts().get(before).cloned();
        if self.engine.phase() == Phase::Speaking {
            self.finish_speaking().await;
        }
        reply
    }

    /// The core exclusivity property
    pub fn assert_exclusive(&self) {
        assert!(
            !(self.engine.is_listening() && self.engine.is_speaking()),
            "listening and speaking at once"
        );
        if self.engine.is_speaking() {
            assert!(!self.speech.is_open(), "microphone open while speaking");
        }
    }
}
