//! Behavioral modes and the mode state machine
//!
//! Exactly one [`Mode`] is active at a time. Switching modes clears the
//! mode-local transient state (mini-game target, scene-stability counter) and
//! produces a [`Transition`] the engine turns into an announcement.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::companion::Emotion;

/// One of five mutually exclusive behavioral configurations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Free conversation
    #[default]
    Interaction,
    /// Follows gaze and gesture commands
    RemoteControl,
    /// Word-repetition mini-game
    MiniGames,
    /// Watches the camera feed and alerts on faces
    Monitor,
    /// Scripted emotional performances
    TalentShow,
}

impl Mode {
    /// All modes, in display order
    pub const ALL: [Self; 5] = [
        Self::Interaction,
        Self::RemoteControl,
        Self::MiniGames,
        Self::Monitor,
        Self::TalentShow,
    ];

    /// Display title
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Interaction => "Interaction",
            Self::RemoteControl => "Remote Control",
            Self::MiniGames => "Mini Games",
            Self::Monitor => "Monitor",
            Self::TalentShow => "Talent Show",
        }
    }

    /// Display subtitle
    #[must_use]
    pub const fn subtitle(self) -> &'static str {
        match self {
            Self::Interaction => "Chat freely with your companion",
            Self::RemoteControl => "Steer with your voice and hands",
            Self::MiniGames => "Repeat the phrase to score",
            Self::Monitor => "Keeps watch over the room",
            Self::TalentShow => "Ask for a dance or a song",
        }
    }

    /// Icon tag for presentation layers
    #[must_use]
    pub const fn icon(self) -> &'static str {
        match self {
            Self::Interaction => "bubble.left.and.bubble.right",
            Self::RemoteControl => "hand.raised",
            Self::MiniGames => "gamecontroller",
            Self::Monitor => "video",
            Self::TalentShow => "sparkles",
        }
    }

    /// Accent tint as a hex color
    #[must_use]
    pub const fn tint(self) -> &'static str {
        match self {
            Self::Interaction => "#4F8EF7",
            Self::RemoteControl => "#2EC4B6",
            Self::MiniGames => "#FF9F1C",
            Self::Monitor => "#E71D36",
            Self::TalentShow => "#9B5DE5",
        }
    }

    /// Emotion the companion expresses on entering this mode
    #[must_use]
    pub const fn default_emotion(self) -> Emotion {
        match self {
            Self::Interaction => Emotion::Happy,
            Self::RemoteControl => Emotion::Curious,
            Self::MiniGames | Self::TalentShow => Emotion::Excited,
            Self::Monitor => Emotion::Alert,
        }
    }

    /// Spoken announcement on entering this mode
    #[must_use]
    pub fn announcement(self) -> String {
        match self {
            Self::Interaction => "Interaction mode. I'm all ears, let's talk!".to_string(),
            Self::RemoteControl => {
                "Remote control mode. Tell me to look left or look right.".to_string()
            }
            Self::MiniGames => {
                "Mini games mode. Say anything and I'll give you a phrase to repeat.".to_string()
            }
            Self::Monitor => "Monitor mode. I'll keep an eye on the room for you.".to_string(),
            Self::TalentShow => "Talent show mode. Ask me to dance or sing!".to_string(),
        }
    }

    /// Parse a mode from a loose name such as `"mini-games"` or `"monitor"`
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized: String = name
            .chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "interaction" | "chat" => Some(Self::Interaction),
            "remotecontrol" | "remote" => Some(Self::RemoteControl),
            "minigames" | "minigame" | "game" | "games" => Some(Self::MiniGames),
            "monitor" | "patrol" => Some(Self::Monitor),
            "talentshow" | "talent" | "show" => Some(Self::TalentShow),
            _ => None,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Fixed shortcuts that map 1:1 onto a mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuickAction {
    Patrol,
    Trick,
    BallGame,
    Gesture,
    Community,
}

impl QuickAction {
    /// Mode this shortcut switches to
    #[must_use]
    pub const fn mode(self) -> Mode {
        match self {
            Self::Patrol => Mode::Monitor,
            Self::Trick => Mode::TalentShow,
            Self::BallGame => Mode::MiniGames,
            Self::Gesture => Mode::RemoteControl,
            Self::Community => Mode::Interaction,
        }
    }

    /// Parse a shortcut name such as `"ball-game"`
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized: String = name
            .chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "patrol" => Some(Self::Patrol),
            "trick" => Some(Self::Trick),
            "ballgame" | "ball" => Some(Self::BallGame),
            "gesture" => Some(Self::Gesture),
            "community" => Some(Self::Community),
            _ => None,
        }
    }
}

/// A completed mode switch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: Mode,
    pub to: Mode,
}

impl Transition {
    /// Label recorded as the latest event
    #[must_use]
    pub fn event_label(&self) -> String {
        format!("mode:{}->{}", label(self.from), label(self.to))
    }
}

const fn label(mode: Mode) -> &'static str {
    match mode {
        Mode::Interaction => "interaction",
        Mode::RemoteControl => "remote_control",
        Mode::MiniGames => "mini_games",
        Mode::Monitor => "monitor",
        Mode::TalentShow => "talent_show",
    }
}

/// Active mode plus the transient state that belongs to it
#[derive(Debug, Clone, Default)]
pub struct ModeMachine {
    mode: Mode,
    game_target: String,
    scene_streak: u32,
}

impl ModeMachine {
    /// Create a machine starting in `mode`
    #[must_use]
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Currently active mode
    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    /// Switch to `to`, resetting mode-local state
    ///
    /// Returns `None` when `to` is already active; nothing changes then.
    pub fn transition(&mut self, to: Mode) -> Option<Transition> {
        if to == self.mode {
            tracing::debug!(mode = %to, "mode already active, ignoring");
            return None;
        }

        let from = self.mode;
        if from == Mode::MiniGames {
            self.game_target.clear();
        }
        self.scene_streak = 0;
        self.mode = to;

        tracing::info!(from = %from, to = %to, "mode switched");
        Some(Transition { from, to })
    }

    /// Pending mini-game phrase; empty when none is assigned yet
    #[must_use]
    pub fn game_target(&self) -> &str {
        &self.game_target
    }

    /// Assign the pending mini-game phrase
    pub fn set_game_target(&mut self, target: impl Into<String>) {
        self.game_target = target.into();
    }

    /// Number of qualifying scene signals seen since the last reset
    #[must_use]
    pub const fn scene_streak(&self) -> u32 {
        self.scene_streak
    }

    /// Count a qualifying scene signal
    ///
    /// Returns true on the 1st, (n+1)th, (2n+1)th… signal for `every = n`.
    pub fn record_scene_signal(&mut self, every: u32) -> bool {
        let every = every.max(1);
        let fire = self.scene_streak % every == 0;
        self.scene_streak = self.scene_streak.saturating_add(1);
        fire
    }
}
