//! Companion orchestration engine
//!
//! A single owner task holds all mutable companion state: mode, counters,
//! message log and the listen/speak phase. Collaborators, timers and the UI
//! reach it only by posting [`EngineEvent`]s onto one channel, and the engine
//! handles each event to completion before taking the next.
//!
//! ```text
//!   Idle ──start──▶ Listening ──final──▶ Processing ──reply──▶ Speaking
//!                      ▲                      │                    │
//!                      └──── no command ──────┘                    │
//!                      └──────────── playback ends / touch ────────┘
//! ```
//!
//! Listening and Speaking are both derived from the single [`Phase`], and the
//! capture collaborator is always stopped before the voice collaborator starts.

mod reply;
mod snapshot;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

pub use reply::{Reply, ReplyContext};
pub use snapshot::{Phase, Snapshot};

use crate::companion::{CompanionState, Emotion};
use crate::conversation::{Message, MessageLog};
use crate::events;
use crate::game::{Attempt, PhrasePool};
use crate::interpreter::{CommandInterpreter, HardCommand, Intent};
use crate::mode::{Mode, ModeMachine, QuickAction};
use crate::perception::{self, PERCEPTION_UNAVAILABLE, Perception, SCENE_PENDING, SceneSink};
use crate::preferences::Preferences;
use crate::scheduler::{Clock, Scheduler, SystemClock, TimerId, TimerKind, TokioScheduler};
use crate::voice::{PlaybackSink, SpeechCapture, TranscriptSink, VoiceOutput};
use crate::{Error, Result};

/// Sending half of the engine channel
pub type EventSender = mpsc::UnboundedSender<EngineEvent>;

/// Longest wait for the user to grant microphone access
const AUTHORIZATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Shown when microphone or recognition access is denied
const PERMISSION_MESSAGE: &str =
    "I can't hear you yet. Please allow microphone and speech recognition access, then start me again.";

/// Appended when a touch interrupts playback
const INTERRUPT_ACK: &str = "Okay, I'm listening.";

/// Everything that can happen to the engine
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// Begin a companion session
    Start,
    /// End the session; idempotent
    Stop,
    /// User touched or tapped the companion
    Touch,
    /// User picked a quick action
    QuickAction(QuickAction),
    /// User picked a mode directly
    SetMode(Mode),
    /// Transcription result from the listening session `session`
    Transcript {
        session: u64,
        text: String,
        is_final: bool,
    },
    /// Utterance `utterance` finished playing
    PlaybackFinished { utterance: u64 },
    /// New scene summary from perception
    Scene(String),
    /// Scheduled timer fired
    Timer { id: TimerId, kind: TimerKind },
    /// Authorization request `attempt` resolved
    Authorized { attempt: u64, granted: bool },
}

/// Engine timings and limits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// Period of the proactive engagement check
    pub idle_period: Duration,
    /// Silence required before a proactive prompt
    pub idle_threshold: Duration,
    /// Identical finals closer than this are treated as one
    pub duplicate_window: Duration,
    /// Minimum time between two wake word hints
    pub hint_cooldown: Duration,
    /// How long a wake word hint stays visible
    pub hint_duration: Duration,
    /// Delay between playback end and re-arming the microphone
    pub resume_grace: Duration,
    /// Silence after an interim result before it is taken as final
    pub silence_timeout: Duration,
    /// Alert on every n-th qualifying scene signal
    pub alert_every: u32,
    /// Messages kept in the conversation log
    pub log_capacity: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            idle_period: Duration::from_secs(42),
            idle_threshold: Duration::from_secs(34),
            duplicate_window: Duration::from_millis(1150),
            hint_cooldown: Duration::from_secs(10),
            hint_duration: Duration::from_secs(4),
            resume_grace: Duration::from_millis(300),
            silence_timeout: Duration::from_millis(1600),
            alert_every: 3,
            log_capacity: crate::conversation::DEFAULT_CAPACITY,
        }
    }
}

/// External collaborators the engine drives
#[derive(Clone)]
pub struct Collaborators {
    pub speech: Arc<dyn SpeechCapture>,
    pub voice: Arc<dyn VoiceOutput>,
    pub perception: Arc<dyn Perception>,
}

/// Builder for [`Engine`]
pub struct EngineBuilder {
    collaborators: Collaborators,
    preferences: Preferences,
    settings: EngineSettings,
    wake_words: Vec<String>,
    phrases: PhrasePool,
    mode: Mode,
    clock: Option<Arc<dyn Clock>>,
    scheduler: Option<Arc<dyn Scheduler>>,
    seed: Option<u64>,
}

impl EngineBuilder {
    /// Start building an engine around the given collaborators
    #[must_use]
    pub fn new(collaborators: Collaborators) -> Self {
        Self {
            collaborators,
            preferences: Preferences::default(),
            settings: EngineSettings::default(),
            wake_words: Vec::new(),
            phrases: PhrasePool::default(),
            mode: Mode::default(),
            clock: None,
            scheduler: None,
            seed: None,
        }
    }

    #[must_use]
    pub fn preferences(mut self, preferences: Preferences) -> Self {
        self.preferences = preferences;
        self
    }

    #[must_use]
    pub fn settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Extra wake words tried after the built-ins
    #[must_use]
    pub fn wake_words(mut self, wake_words: Vec<String>) -> Self {
        self.wake_words = wake_words;
        self
    }

    #[must_use]
    pub fn phrases(mut self, phrases: PhrasePool) -> Self {
        self.phrases = phrases;
        self
    }

    /// Mode the session starts in
    #[must_use]
    pub const fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Replace the tokio-backed scheduler
    #[must_use]
    pub fn scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Seed the mini-game phrase picker
    #[must_use]
    pub const fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Build the engine and a handle for talking to it
    #[must_use]
    pub fn build(self) -> (Engine, EngineHandle) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let scheduler = self
            .scheduler
            .unwrap_or_else(|| Arc::new(TokioScheduler::new(events_tx.clone())));
        let rng = self
            .seed
            .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        let shutdown = CancellationToken::new();
        let (snapshot_tx, snapshot_rx) = watch::channel(Snapshot::default());
        let now = clock.now();

        let engine = Engine {
            speech: self.collaborators.speech,
            voice: self.collaborators.voice,
            perception: self.collaborators.perception,
            clock,
            scheduler,
            events_tx: events_tx.clone(),
            events_rx,
            snapshot_tx,
            shutdown: shutdown.clone(),
            interpreter: CommandInterpreter::for_companion(
                &self.preferences.companion_name,
                &self.wake_words,
            ),
            phrases: self.phrases,
            rng,
            machine: ModeMachine::new(self.mode),
            companion: CompanionState::default(),
            emotion: self.mode.default_emotion(),
            log: MessageLog::with_capacity(self.settings.log_capacity),
            settings: self.settings,
            preferences: self.preferences,
            phase: Phase::Idle,
            session_active: false,
            authorizing: None,
            auth_attempt: 0,
            should_resume: false,
            muted: false,
            heard_preview: String::new(),
            last_reply: String::new(),
            scene: PERCEPTION_UNAVAILABLE.to_string(),
            hint: None,
            last_final: None,
            last_interaction: now,
            last_hint_at: None,
            listen_session: 0,
            utterance: 0,
            next_timer: 0,
            timers: HashMap::new(),
        };
        engine.publish_snapshot();

        let handle = EngineHandle {
            events: events_tx,
            snapshot: snapshot_rx,
            shutdown,
        };

        (engine, handle)
    }
}

/// Cloneable handle for posting events to a running engine
#[derive(Clone)]
pub struct EngineHandle {
    events: EventSender,
    snapshot: watch::Receiver<Snapshot>,
    shutdown: CancellationToken,
}

impl EngineHandle {
    /// Post an event to the engine
    ///
    /// # Errors
    ///
    /// Returns error if the engine has shut down
    pub fn send(&self, event: EngineEvent) -> Result<()> {
        self.events.send(event).map_err(|_| Error::ChannelClosed)
    }

    /// Begin a session
    ///
    /// # Errors
    ///
    /// Returns error if the engine has shut down
    pub fn start(&self) -> Result<()> {
        self.send(EngineEvent::Start)
    }

    /// End the session
    ///
    /// # Errors
    ///
    /// Returns error if the engine has shut down
    pub fn stop(&self) -> Result<()> {
        self.send(EngineEvent::Stop)
    }

    /// Report a touch or tap
    ///
    /// # Errors
    ///
    /// Returns error if the engine has shut down
    pub fn touch(&self) -> Result<()> {
        self.send(EngineEvent::Touch)
    }

    /// Trigger a quick action
    ///
    /// # Errors
    ///
    /// Returns error if the engine has shut down
    pub fn quick_action(&self, action: QuickAction) -> Result<()> {
        self.send(EngineEvent::QuickAction(action))
    }

    /// Switch to a mode
    ///
    /// # Errors
    ///
    /// Returns error if the engine has shut down
    pub fn set_mode(&self, mode: Mode) -> Result<()> {
        self.send(EngineEvent::SetMode(mode))
    }

    /// Latest published snapshot
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot.borrow().clone()
    }

    /// Receiver notified after every handled event
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshot.clone()
    }

    /// Stop the session and end [`Engine::run`]
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Resolves once shutdown has been requested
    pub async fn cancelled(&self) {
        self.shutdown.cancelled().await;
    }

    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

/// The orchestration loop and sole owner of companion state
pub struct Engine {
    speech: Arc<dyn SpeechCapture>,
    voice: Arc<dyn VoiceOutput>,
    perception: Arc<dyn Perception>,
    clock: Arc<dyn Clock>,
    scheduler: Arc<dyn Scheduler>,
    events_tx: EventSender,
    events_rx: mpsc::UnboundedReceiver<EngineEvent>,
    snapshot_tx: watch::Sender<Snapshot>,
    shutdown: CancellationToken,

    settings: EngineSettings,
    preferences: Preferences,
    interpreter: CommandInterpreter,
    phrases: PhrasePool,
    rng: StdRng,

    machine: ModeMachine,
    companion: CompanionState,
    emotion: Emotion,
    log: MessageLog,

    phase: Phase,
    session_active: bool,
    authorizing: Option<u64>,
    auth_attempt: u64,
    should_resume: bool,
    muted: bool,
    heard_preview: String,
    last_reply: String,
    scene: String,
    hint: Option<String>,
    last_final: Option<(String, Instant)>,
    last_interaction: Instant,
    last_hint_at: Option<Instant>,

    listen_session: u64,
    utterance: u64,
    next_timer: u64,
    timers: HashMap<TimerKind, TimerId>,
}

impl Engine {
    /// Start building an engine
    #[must_use]
    pub fn builder(collaborators: Collaborators) -> EngineBuilder {
        EngineBuilder::new(collaborators)
    }

    /// Process events until [`EngineHandle::shutdown`] is called
    pub async fn run(mut self) {
        tracing::info!(
            mode = %self.machine.mode(),
            companion = %self.preferences.companion_name,
            "companion engine running"
        );

        let shutdown = self.shutdown.clone();
        loop {
            let event = tokio::select! {
                () = shutdown.cancelled() => None,
                event = self.events_rx.recv() => event,
            };
            let Some(event) = event else {
                break;
            };
            self.handle(event);
        }

        self.stop();
        self.publish_snapshot();
        tracing::info!("companion engine stopped");
    }

    /// Handle every event already queued, returning how many were handled
    pub fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle(event);
            handled += 1;
        }
        handled
    }

    /// Handle one event to completion
    pub fn handle(&mut self, event: EngineEvent) {
        tracing::trace!(?event, phase = %self.phase, "handling event");

        match event {
            EngineEvent::Start => self.start(),
            EngineEvent::Stop => self.stop(),
            EngineEvent::Touch => self.touch(),
            EngineEvent::QuickAction(action) => self.switch_mode(action.mode()),
            EngineEvent::SetMode(mode) => self.switch_mode(mode),
            EngineEvent::Transcript {
                session,
                text,
                is_final,
            } => self.on_transcript(session, text, is_final),
            EngineEvent::PlaybackFinished { utterance } => self.on_playback_finished(utterance),
            EngineEvent::Scene(summary) => self.on_scene(summary),
            EngineEvent::Timer { id, kind } => self.on_timer(id, kind),
            EngineEvent::Authorized { attempt, granted } => self.on_authorized(attempt, granted),
        }

        self.publish_snapshot();
    }

    /// Sender for posting events from outside, e.g. to build collaborator sinks
    #[must_use]
    pub fn events(&self) -> EventSender {
        self.events_tx.clone()
    }

    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.phase == Phase::Listening
    }

    #[must_use]
    pub fn is_speaking(&self) -> bool {
        self.phase == Phase::Speaking
    }

    #[must_use]
    pub const fn is_session_active(&self) -> bool {
        self.session_active
    }

    /// Waiting on the user to grant microphone access
    #[must_use]
    pub const fn is_authorizing(&self) -> bool {
        self.authorizing.is_some()
    }

    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.machine.mode()
    }

    #[must_use]
    pub const fn companion(&self) -> &CompanionState {
        &self.companion
    }

    #[must_use]
    pub const fn emotion(&self) -> Emotion {
        self.emotion
    }

    #[must_use]
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.log.iter()
    }

    #[must_use]
    pub fn last_reply(&self) -> &str {
        &self.last_reply
    }

    #[must_use]
    pub fn scene_summary(&self) -> &str {
        &self.scene
    }

    #[must_use]
    pub fn game_target(&self) -> &str {
        self.machine.game_target()
    }

    /// Replace the pending mini-game phrase
    pub fn assign_game_target(&mut self, target: impl Into<String>) {
        self.machine.set_game_target(target);
        self.publish_snapshot();
    }

    /// Current observable outputs
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            mode: self.machine.mode(),
            phase: self.phase,
            is_listening: self.is_listening(),
            is_speaking: self.is_speaking(),
            heard_preview: self.heard_preview.clone(),
            last_reply: self.last_reply.clone(),
            scene_summary: self.scene.clone(),
            companion: self.companion.clone(),
            emotion: self.emotion,
            hint: self.hint.clone(),
            game_target: self.machine.game_target().to_string(),
            messages: self.log.to_vec(),
        }
    }

    // -- Session lifecycle --

    fn start(&mut self) {
        if self.session_active || self.authorizing.is_some() {
            tracing::debug!("session already active or starting");
            return;
        }

        self.auth_attempt += 1;
        let attempt = self.auth_attempt;
        self.authorizing = Some(attempt);

        let speech = Arc::clone(&self.speech);
        let events = self.events_tx.clone();
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            let outcome = tokio::select! {
                outcome = authorize(speech.as_ref()) => outcome,
                () = shutdown.cancelled() => return,
            };
            if let Err(e) = &outcome {
                tracing::warn!(error = %e, attempt, "authorization failed");
            }
            let _ = events.send(EngineEvent::Authorized {
                attempt,
                granted: outcome.is_ok(),
            });
        });
        tracing::debug!(attempt, "awaiting authorization");
    }

    fn on_authorized(&mut self, attempt: u64, granted: bool) {
        if self.authorizing != Some(attempt) {
            tracing::debug!(attempt, "stale authorization result dropped");
            return;
        }
        self.authorizing = None;

        if !granted {
            self.log.assistant(PERMISSION_MESSAGE);
            self.last_reply = PERMISSION_MESSAGE.to_string();
            self.emotion = Emotion::Sad;
            self.record("permission_denied");
            return;
        }

        self.session_active = true;
        self.last_interaction = self.clock.now();

        match self
            .perception
            .start(SceneSink::new(self.events_tx.clone()))
        {
            Ok(()) => {
                tracing::debug!("perception started");
                SCENE_PENDING.clone_into(&mut self.scene);
            }
            Err(e) => {
                tracing::warn!(error = %e, "perception unavailable");
                self.scene = PERCEPTION_UNAVAILABLE.to_string();
            }
        }

        self.schedule_every(TimerKind::IdlePrompt, self.settings.idle_period);
        tracing::info!(mode = %self.machine.mode(), "session started");
        self.record("session_started");
        self.begin_listening();
    }

    /// Tear down the session; safe to call repeatedly
    fn stop(&mut self) {
        let was_active = self.session_active;

        if let Some(attempt) = self.authorizing.take() {
            tracing::debug!(attempt, "pending authorization abandoned");
        }

        self.cancel_timer(TimerKind::IdlePrompt);
        self.cancel_timer(TimerKind::AutoStop);
        self.speech.stop_transcribing();
        self.listen_session += 1;
        if self.phase == Phase::Speaking || self.voice.is_playing() {
            self.voice.stop_speaking();
        }
        self.utterance += 1;
        self.should_resume = false;
        self.cancel_timer(TimerKind::ResumeListening);
        self.cancel_timer(TimerKind::HintExpiry);
        self.perception.stop();

        self.session_active = false;
        self.phase = Phase::Idle;
        self.heard_preview.clear();
        self.hint = None;

        if was_active {
            tracing::info!("session stopped");
            self.record("session_stopped");
        }
    }

    // -- Listening --

    fn begin_listening(&mut self) {
        if !self.session_active || matches!(self.phase, Phase::Listening | Phase::Speaking) {
            return;
        }

        self.cancel_timer(TimerKind::ResumeListening);
        self.listen_session += 1;
        let sink = TranscriptSink::new(self.listen_session, self.events_tx.clone());

        match self
            .speech
            .start_transcribing(&self.preferences.input_locale, sink)
        {
            Ok(()) => {
                self.phase = Phase::Listening;
                self.heard_preview.clear();
                tracing::debug!(session = self.listen_session, "listening");
            }
            Err(e) => {
                tracing::warn!(error = %e, "recognizer failed to start");
                self.stop();
                let message = format!("I couldn't start listening ({e}). Start me again to retry.");
                self.log.assistant(&message);
                self.last_reply = message;
                self.record("recognizer_failed");
            }
        }
    }

    /// The user has started talking into the open microphone
    fn is_mid_utterance(&self) -> bool {
        self.phase == Phase::Listening && !self.heard_preview.is_empty()
    }

    fn stop_listening(&mut self) {
        self.cancel_timer(TimerKind::AutoStop);
        if self.phase == Phase::Listening {
            self.speech.stop_transcribing();
            self.listen_session += 1;
            self.phase = Phase::Idle;
        }
    }

    fn on_transcript(&mut self, session: u64, text: String, is_final: bool) {
        if session != self.listen_session || self.phase != Phase::Listening {
            tracing::trace!(session, current = self.listen_session, "stale transcript dropped");
            return;
        }

        if is_final {
            self.on_final(&text);
        } else {
            self.heard_preview = text;
            self.schedule_once(TimerKind::AutoStop, self.settings.silence_timeout);
        }
    }

    fn on_final(&mut self, raw: &str) {
        self.stop_listening();

        let text = raw.trim();
        self.heard_preview = text.to_string();
        let now = self.clock.now();

        if text.is_empty() {
            tracing::debug!("empty final absorbed");
            self.begin_listening();
            return;
        }

        let duplicate = self.last_final.as_ref().is_some_and(|(previous, at)| {
            previous == text && now.duration_since(*at) < self.settings.duplicate_window
        });
        self.last_final = Some((text.to_string(), now));

        if duplicate {
            tracing::debug!(text, "duplicate final suppressed");
            self.begin_listening();
            return;
        }

        tracing::info!(text, mode = %self.machine.mode(), "utterance received");
        self.phase = Phase::Processing;
        self.last_interaction = now;
        self.muted = false;
        self.log.user(text);
        self.companion.speech_turn();
        self.publish_last_event();

        match self.respond(text) {
            Some(reply) => self.speak(reply),
            None => {
                tracing::debug!(text, "no actionable command");
                self.phase = Phase::Idle;
                self.offer_hint(now);
                self.begin_listening();
            }
        }
    }

    fn offer_hint(&mut self, now: Instant) {
        let cooling_down = self
            .last_hint_at
            .is_some_and(|at| now.duration_since(at) < self.settings.hint_cooldown);
        if cooling_down {
            return;
        }

        self.last_hint_at = Some(now);
        self.hint = Some(format!(
            "Say \"Hello {}\" first, then tell me what to do.",
            self.preferences.companion_name
        ));
        self.schedule_once(TimerKind::HintExpiry, self.settings.hint_duration);
    }

    // -- Processing --

    fn respond(&mut self, text: &str) -> Option<Reply> {
        let command = self.interpreter.extract_command(text);
        let intent = command.as_deref().map(|c| self.interpreter.classify(c));

        if let Some(Intent::Hard(HardCommand::SwitchMode(mode))) = intent {
            return Some(self.request_mode(mode));
        }

        let content = command.as_deref().unwrap_or(text);
        match self.machine.mode() {
            Mode::MiniGames => return Some(self.game_turn(content)),
            Mode::TalentShow => {
                if let Some(reply) = reply::talent(content) {
                    self.record("talent");
                    return Some(reply);
                }
            }
            Mode::Interaction | Mode::RemoteControl | Mode::Monitor => {}
        }

        match intent? {
            Intent::Hard(command) => Some(self.hard_command(command)),
            Intent::Chat(content) => Some(reply::chat(&self.context(), &content)),
        }
    }

    fn hard_command(&mut self, command: HardCommand) -> Reply {
        let label = match command {
            HardCommand::Mute => {
                self.muted = true;
                "mute"
            }
            HardCommand::LookLeft => "gaze_left",
            HardCommand::LookRight => "gaze_right",
            HardCommand::Introduce => "introduce",
            HardCommand::DescribeScene => "describe_scene",
            HardCommand::SwitchMode(mode) => return self.request_mode(mode),
        };
        self.record(label);
        reply::hard_command(&self.context(), command)
    }

    fn game_turn(&mut self, content: &str) -> Reply {
        let target = self.machine.game_target().to_string();

        match self.phrases.play(&target, content, &mut self.rng) {
            Attempt::Assigned { target } => {
                self.machine.set_game_target(target.as_str());
                self.record("game_target");
                Reply::new(
                    format!("Let's play! Repeat after me: {target}"),
                    Emotion::Excited,
                )
            }
            Attempt::Success { completed, next } => {
                self.companion.game_success();
                self.publish_last_event();
                self.machine.set_game_target(next.as_str());
                tracing::info!(%completed, %next, skill = self.companion.skill_point, "game round won");
                Reply::new(
                    format!(
                        "Perfect, \"{completed}\"! You have {} skill points. Next one: {next}",
                        self.companion.skill_point
                    ),
                    Emotion::Proud,
                )
            }
            Attempt::Miss { target } => Reply::new(
                format!("Almost! Try saying: {target}"),
                Emotion::Curious,
            ),
        }
    }

    // -- Modes --

    /// Mode change asked for by voice; answers even when nothing changes
    fn request_mode(&mut self, mode: Mode) -> Reply {
        if self.apply_transition(mode) {
            Reply::new(mode.announcement(), mode.default_emotion())
        } else {
            Reply::new(format!("We're already in {mode} mode."), self.emotion)
        }
    }

    /// Mode change from the UI; announced only when the mode actually changes
    fn switch_mode(&mut self, mode: Mode) {
        self.last_interaction = self.clock.now();
        if self.apply_transition(mode) {
            self.speak(Reply::new(mode.announcement(), mode.default_emotion()));
        }
    }

    fn apply_transition(&mut self, mode: Mode) -> bool {
        let Some(transition) = self.machine.transition(mode) else {
            return false;
        };
        self.emotion = mode.default_emotion();
        self.record(transition.event_label());
        true
    }

    // -- Speaking --

    fn speak(&mut self, reply: Reply) {
        self.stop_listening();
        if self.phase == Phase::Speaking {
            self.voice.stop_speaking();
        }
        self.cancel_timer(TimerKind::ResumeListening);

        self.utterance += 1;
        self.emotion = reply.emotion;
        self.last_reply.clone_from(&reply.text);
        self.log.assistant(reply.text.as_str());

        let sink = PlaybackSink::new(self.utterance, self.events_tx.clone());
        match self
            .voice
            .speak(&reply.text, &self.preferences.output_locale, sink)
        {
            Ok(()) => {
                self.phase = Phase::Speaking;
                self.should_resume = self.session_active;
                tracing::debug!(utterance = self.utterance, emotion = %self.emotion, "speaking");
            }
            Err(e) => {
                tracing::warn!(error = %e, "voice output failed");
                self.phase = Phase::Idle;
                self.should_resume = false;
                self.begin_listening();
            }
        }
    }

    fn on_playback_finished(&mut self, utterance: u64) {
        if utterance != self.utterance || self.phase != Phase::Speaking {
            tracing::trace!(utterance, current = self.utterance, "stale playback completion");
            return;
        }

        self.phase = Phase::Idle;
        if std::mem::take(&mut self.should_resume) && self.session_active {
            if self.settings.resume_grace.is_zero() {
                self.begin_listening();
            } else {
                self.schedule_once(TimerKind::ResumeListening, self.settings.resume_grace);
            }
        }
    }

    fn touch(&mut self) {
        self.last_interaction = self.clock.now();
        self.companion.touch();

        if self.phase == Phase::Speaking {
            self.should_resume = false;
            self.voice.stop_speaking();
            self.utterance += 1;
            self.phase = Phase::Idle;
            self.log.assistant(INTERRUPT_ACK);
            self.emotion = Emotion::Curious;
            tracing::info!("playback interrupted by touch");
            self.record("interrupted");
            self.begin_listening();
            return;
        }

        self.publish_last_event();
        if self.session_active && !self.is_mid_utterance() {
            let reply = reply::touched(&self.context());
            self.speak(reply);
        }
    }

    // -- Perception --

    fn on_scene(&mut self, summary: String) {
        if !self.session_active {
            return;
        }
        self.scene = summary;

        let (qualifies, alert, label) = match self.machine.mode() {
            Mode::Monitor => (
                perception::has_face(&self.scene),
                reply::face_alert(&self.scene),
                "face_alert",
            ),
            Mode::RemoteControl => (
                perception::has_hand(&self.scene),
                reply::gesture_seen(),
                "gesture_seen",
            ),
            Mode::Interaction | Mode::MiniGames | Mode::TalentShow => return,
        };

        if !qualifies || !self.machine.record_scene_signal(self.settings.alert_every) {
            return;
        }

        if self.phase == Phase::Speaking || self.is_mid_utterance() {
            tracing::debug!(scene = %self.scene, phase = %self.phase, "scene alert skipped");
            return;
        }

        self.record(label);
        self.speak(alert);
    }

    // -- Timers --

    fn on_timer(&mut self, id: TimerId, kind: TimerKind) {
        if self.timers.get(&kind) != Some(&id) {
            tracing::trace!(%id, ?kind, "stale timer ignored");
            return;
        }
        if kind != TimerKind::IdlePrompt {
            self.timers.remove(&kind);
            self.scheduler.cancel(id);
        }

        match kind {
            TimerKind::IdlePrompt => self.on_idle_tick(),
            TimerKind::AutoStop => {
                if self.phase == Phase::Listening && !self.heard_preview.is_empty() {
                    let text = std::mem::take(&mut self.heard_preview);
                    tracing::debug!(%text, "silence detected, finalizing");
                    self.on_final(&text);
                }
            }
            TimerKind::ResumeListening => self.begin_listening(),
            TimerKind::HintExpiry => self.hint = None,
        }
    }

    fn on_idle_tick(&mut self) {
        if !self.session_active || self.muted {
            return;
        }
        if self.phase == Phase::Speaking || self.voice.is_playing() {
            return;
        }
        if self.is_mid_utterance() {
            return;
        }

        let now = self.clock.now();
        if now.duration_since(self.last_interaction) <= self.settings.idle_threshold {
            return;
        }

        if self.machine.mode() == Mode::MiniGames && self.machine.game_target().is_empty() {
            let target = self.phrases.next_target("", &mut self.rng);
            self.machine.set_game_target(target);
        }

        let prompt = reply::idle_prompt(&self.context());
        self.last_interaction = now;
        tracing::info!(mode = %self.machine.mode(), "proactive prompt");
        self.record("proactive_prompt");
        self.speak(prompt);
    }

    fn schedule_once(&mut self, kind: TimerKind, delay: Duration) {
        let id = self.arm(kind);
        self.scheduler.once(id, kind, delay);
    }

    fn schedule_every(&mut self, kind: TimerKind, period: Duration) {
        let id = self.arm(kind);
        self.scheduler.every(id, kind, period);
    }

    fn arm(&mut self, kind: TimerKind) -> TimerId {
        self.cancel_timer(kind);
        self.next_timer += 1;
        let id = TimerId(self.next_timer);
        self.timers.insert(kind, id);
        id
    }

    fn cancel_timer(&mut self, kind: TimerKind) {
        if let Some(id) = self.timers.remove(&kind) {
            self.scheduler.cancel(id);
        }
    }

    // -- Outputs --

    fn context(&self) -> ReplyContext<'_> {
        ReplyContext {
            name: &self.preferences.companion_name,
            topic: &self.preferences.favorite_topic,
            mode: self.machine.mode(),
            scene: &self.scene,
            energy: self.companion.energy,
            game_target: self.machine.game_target(),
        }
    }

    /// Set the "last event" label and publish it
    fn record(&mut self, label: impl Into<String>) {
        self.companion.last_event = label.into();
        self.publish_last_event();
    }

    fn publish_last_event(&self) {
        events::publish(events::build_label_event(
            &self.companion.last_event,
            self.machine.mode().title(),
            &self.phase.to_string(),
        ));
    }

    fn publish_snapshot(&self) {
        self.snapshot_tx.send_replace(self.snapshot());
    }
}

/// Ask the capture collaborator for microphone and recognition access
async fn authorize(speech: &dyn SpeechCapture) -> Result<()> {
    match tokio::time::timeout(AUTHORIZATION_TIMEOUT, speech.request_authorization()).await {
        Ok(true) => Ok(()),
        Ok(false) => Err(Error::Permission(
            "microphone or speech recognition access denied".to_string(),
        )),
        Err(_) => Err(Error::Permission(format!(
            "no answer within {}s",
            AUTHORIZATION_TIMEOUT.as_secs()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = EngineSettings::default();
        assert_eq!(settings.idle_period, Duration::from_secs(42));
        assert_eq!(settings.idle_threshold, Duration::from_secs(34));
        assert_eq!(settings.duplicate_window, Duration::from_millis(1150));
        assert_eq!(settings.hint_cooldown, Duration::from_secs(10));
        assert_eq!(settings.alert_every, 3);
        assert_eq!(settings.log_capacity, 80);
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::Listening.to_string(), "listening");
        assert_eq!(Phase::default(), Phase::Idle);
    }
}
