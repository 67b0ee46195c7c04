//! Loona - companion orchestration engine
//!
//! This library provides the control loop for a voice companion:
//! - Wake word and command interpretation
//! - A listen/speak state machine with interruption and duplicate suppression
//! - Interaction modes, quick actions and the repeat-after-me mini-game
//! - Proactive prompts and perception-driven alerts
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                  Collaborators                       │
//! │   Speech capture  │  Voice output  │  Perception     │
//! └────────────────────┬────────────────────────────────┘
//!                      │ events (session / utterance tagged)
//! ┌────────────────────▼────────────────────────────────┐
//! │                     Engine                           │
//! │  Interpreter  │  Mode machine  │  Timers  │  State   │
//! └────────────────────┬────────────────────────────────┘
//!                      │ snapshots
//! ┌────────────────────▼────────────────────────────────┐
//! │            Presentation (console session)            │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod companion;
pub mod config;
pub mod conversation;
pub mod engine;
pub mod error;
pub mod events;
pub mod game;
pub mod interpreter;
pub mod mode;
pub mod perception;
pub mod preferences;
pub mod scheduler;
pub mod session;
pub mod voice;

pub use companion::{CompanionState, Emotion};
pub use config::Config;
pub use conversation::{Message, MessageLog, Role};
pub use engine::{
    Collaborators, Engine, EngineBuilder, EngineEvent, EngineHandle, EngineSettings, EventSender,
    Phase, Snapshot,
};
pub use error::{Error, Result};
pub use interpreter::{CommandInterpreter, HardCommand, Intent};
pub use mode::{Mode, QuickAction};
pub use preferences::{PreferenceStore, Preferences};
pub use session::Session;
