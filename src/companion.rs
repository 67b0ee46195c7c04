//! Companion counters and expressed emotion

use std::fmt;

use serde::{Deserialize, Serialize};

/// Upper bound for affection and energy
pub const MAX_GAUGE: u8 = 100;

/// Upper bound for skill points
pub const MAX_SKILL: u16 = 999;

/// Emotion the companion currently expresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emotion {
    #[default]
    Neutral,
    Happy,
    Curious,
    Excited,
    Alert,
    Sleepy,
    Sad,
    Proud,
}

impl Emotion {
    /// Whether this emotion reads as positive to the user
    #[must_use]
    pub const fn is_positive(self) -> bool {
        matches!(self, Self::Happy | Self::Excited | Self::Proud)
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Neutral => "neutral",
            Self::Happy => "happy",
            Self::Curious => "curious",
            Self::Excited => "excited",
            Self::Alert => "alert",
            Self::Sleepy => "sleepy",
            Self::Sad => "sad",
            Self::Proud => "proud",
        };
        f.write_str(name)
    }
}

/// Numeric companion state
///
/// Every mutation saturates at the field's bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanionState {
    pub affection: u8,
    pub energy: u8,
    pub skill_point: u16,
    pub last_event: String,
}

impl Default for CompanionState {
    fn default() -> Self {
        Self {
            affection: 50,
            energy: 80,
            skill_point: 0,
            last_event: "ready".to_string(),
        }
    }
}

impl CompanionState {
    /// User touched or tapped the companion
    pub fn touch(&mut self) {
        self.add_affection(2);
        self.add_energy(1);
        self.last_event = "touch".to_string();
    }

    /// User finished a spoken turn
    pub fn speech_turn(&mut self) {
        self.drain_energy(1);
        self.last_event = "speech".to_string();
    }

    /// User repeated the mini-game phrase correctly
    pub fn game_success(&mut self) {
        self.add_skill(2);
        self.add_affection(3);
        self.last_event = "game_success".to_string();
    }

    /// Raise affection, clamped to [`MAX_GAUGE`]
    pub fn add_affection(&mut self, amount: u8) {
        self.affection = self.affection.saturating_add(amount).min(MAX_GAUGE);
    }

    /// Raise energy, clamped to [`MAX_GAUGE`]
    pub fn add_energy(&mut self, amount: u8) {
        self.energy = self.energy.saturating_add(amount).min(MAX_GAUGE);
    }

    /// Lower energy, clamped at zero
    pub const fn drain_energy(&mut self, amount: u8) {
        self.energy = self.energy.saturating_sub(amount);
    }

    /// Raise skill points, clamped to [`MAX_SKILL`]
    pub fn add_skill(&mut self, amount: u16) {
        self.skill_point = self.skill_point.saturating_add(amount).min(MAX_SKILL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_affection_saturates() {
        let mut state = CompanionState::default();
        for _ in 0..60 {
            state.add_affection(2);
        }
        assert_eq!(state.affection, 100);
    }

    #[test]
    fn test_energy_never_underflows() {
        let mut state = CompanionState::default();
        for _ in 0..500 {
            state.speech_turn();
        }
        assert_eq!(state.energy, 0);
        assert_eq!(state.affection, 50);
        assert_eq!(state.last_event, "speech");
    }

    #[test]
    fn test_skill_saturates() {
        let mut state = CompanionState::default();
        for _ in 0..600 {
            state.game_success();
        }
        assert_eq!(state.skill_point, 999);
        assert_eq!(state.last_event, "game_success");
    }

    #[test]
    fn test_gauge_bounds_hold_near_max() {
        let mut state = CompanionState {
            affection: 99,
            energy: 255,
            ..CompanionState::default()
        };
        state.touch();
        assert_eq!(state.affection, 100);
        assert_eq!(state.energy, 100);
    }
}
