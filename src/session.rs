//! Session - the interactive console companion
//!
//! Wires console collaborators into the engine and feeds it from stdin.
//! Plain lines are spoken utterances; lines starting with `/` are UI actions.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::engine::{Collaborators, Engine, EngineHandle, Snapshot};
use crate::events::{self, EventsConfig};
use crate::mode::{Mode, QuickAction};
use crate::perception::ScriptedPerception;
use crate::voice::{ConsoleSpeech, ConsoleVoice};
use crate::{Config, Result};

const HELP: &str = "\
commands:
  /tap                  touch the companion (interrupts speech)
  /mode <name>          interaction, remote, games, monitor, talent
  /action <name>        patrol, trick, ball, gesture, community
  /state                show companion state
  /start, /stop         start or stop the session
  /quit                 exit
anything else is heard as speech";

/// One line of console input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Spoken utterance
    Say(String),
    Tap,
    Mode(Mode),
    Action(QuickAction),
    State,
    Start,
    Stop,
    Help,
    Quit,
    /// Unrecognized slash command, with a reason
    Invalid(String),
}

impl ConsoleCommand {
    /// Parse a console line; `None` for blank lines
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let Some(rest) = line.strip_prefix('/') else {
            return Some(Self::Say(line.to_string()));
        };

        let (name, arg) = rest
            .split_once(char::is_whitespace)
            .map_or((rest, ""), |(n, a)| (n, a.trim()));

        let command = match name.to_lowercase().as_str() {
            "tap" | "touch" => Self::Tap,
            "mode" => Mode::from_name(arg)
                .map_or_else(|| Self::Invalid(format!("unknown mode: {arg}")), Self::Mode),
            "action" => QuickAction::from_name(arg).map_or_else(
                || Self::Invalid(format!("unknown quick action: {arg}")),
                Self::Action,
            ),
            "state" => Self::State,
            "start" => Self::Start,
            "stop" => Self::Stop,
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => Self::Invalid(format!("unknown command: /{other}")),
        };
        Some(command)
    }
}

/// The console companion session
pub struct Session {
    config: Config,
}

impl Session {
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run until `/quit`, end of input or Ctrl-C
    ///
    /// # Errors
    ///
    /// Returns error if stdin cannot be read
    pub async fn run(self) -> Result<()> {
        tracing::info!(
            companion = %self.config.preferences.companion_name,
            mode = %self.config.start_mode,
            "session starting"
        );

        events::init_publisher(EventsConfig {
            log_path: self.config.event_log.clone(),
        });

        let speech = Arc::new(ConsoleSpeech::new(self.config.voice.authorized));
        let collaborators = Collaborators {
            speech: speech.clone(),
            voice: Arc::new(ConsoleVoice::new(self.config.voice.words_per_second)),
            perception: Arc::new(ScriptedPerception::new(
                self.config.perception.scenes.clone(),
                self.config.perception.interval,
            )),
        };

        let (engine, handle) = Engine::builder(collaborators)
            .preferences(self.config.preferences.clone())
            .settings(self.config.settings.clone())
            .wake_words(self.config.wake_words.clone())
            .phrases(self.config.phrases.clone())
            .mode(self.config.start_mode)
            .build();

        let engine_task = tokio::spawn(engine.run());

        // Set up shutdown signal
        let signal_handle = handle.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("shutdown requested");
                signal_handle.shutdown();
            }
        });

        tokio::spawn(watch_hints(handle.clone()));

        println!(
            "{} is awake. Say \"Hello {}\" to talk, /help for commands.",
            self.config.preferences.companion_name, self.config.preferences.companion_name
        );
        handle.start()?;

        let result = read_console(&handle, &speech).await;

        handle.shutdown();
        if let Err(e) = engine_task.await {
            tracing::warn!(error = %e, "engine task ended abnormally");
        }

        tracing::info!("session ended");
        result
    }
}

async fn read_console(handle: &EngineHandle, speech: &ConsoleSpeech) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            () = handle.cancelled() => return Ok(()),
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            return Ok(());
        };
        let Some(command) = ConsoleCommand::parse(&line) else {
            continue;
        };

        match command {
            ConsoleCommand::Say(text) => {
                if !speech.deliver(&text) {
                    println!("(not listening right now)");
                }
            }
            ConsoleCommand::Tap => handle.touch()?,
            ConsoleCommand::Mode(mode) => handle.set_mode(mode)?,
            ConsoleCommand::Action(action) => handle.quick_action(action)?,
            ConsoleCommand::State => println!("{}", describe(&handle.snapshot())),
            ConsoleCommand::Start => handle.start()?,
            ConsoleCommand::Stop => handle.stop()?,
            ConsoleCommand::Help => println!("{HELP}"),
            ConsoleCommand::Quit => return Ok(()),
            ConsoleCommand::Invalid(reason) => println!("{reason} (try /help)"),
        }
    }
}

/// Print wake word hints as they appear
async fn watch_hints(handle: EngineHandle) {
    let mut snapshots = handle.subscribe();
    let mut shown: Option<String> = None;

    while snapshots.changed().await.is_ok() {
        let hint = snapshots.borrow_and_update().hint.clone();
        if hint != shown {
            if let Some(text) = &hint {
                println!("💡 {text}");
            }
            shown = hint;
        }
    }
}

/// One-screen summary of a snapshot
#[must_use]
pub fn describe(snapshot: &Snapshot) -> String {
    let companion = &snapshot.companion;
    let mut out = format!(
        "{} ({}) | {} | {}\n\
         affection {} energy {} skill {} | last event: {}\n\
         scene: {}",
        snapshot.mode.title(),
        snapshot.mode.subtitle(),
        snapshot.phase,
        snapshot.emotion,
        companion.affection,
        companion.energy,
        companion.skill_point,
        companion.last_event,
        snapshot.scene_summary,
    );
    if !snapshot.game_target.is_empty() {
        out.push_str(&format!("\ngame target: {}", snapshot.game_target));
    }
    if !snapshot.heard_preview.is_empty() {
        out.push_str(&format!("\nheard: {}", snapshot.heard_preview));
    }
    out
}
