//! Word-repetition mini-game
//!
//! The companion names a phrase from a fixed pool and the user repeats it.

use rand::Rng;
use rand::seq::SliceRandom;

/// Phrases the mini-game draws targets from
pub const DEFAULT_PHRASES: &[&str] = &[
    "Terima kasih",
    "Selamat pagi",
    "Apa kabar",
    "Sampai jumpa",
    "Good morning",
    "Thank you very much",
    "Nice to meet you",
    "See you tomorrow",
];

/// Outcome of one game turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt {
    /// No target was pending; `target` is the freshly assigned one
    Assigned { target: String },
    /// Utterance matched; `next` is the new target
    Success { completed: String, next: String },
    /// Utterance did not match the still-pending `target`
    Miss { target: String },
}

/// Fixed pool of target phrases
#[derive(Debug, Clone)]
pub struct PhrasePool {
    phrases: Vec<String>,
}

impl Default for PhrasePool {
    fn default() -> Self {
        Self::new(DEFAULT_PHRASES.iter().map(|p| (*p).to_string()))
    }
}

impl PhrasePool {
    /// Build a pool; blank phrases are skipped and an empty result falls back
    /// to [`DEFAULT_PHRASES`]
    pub fn new(phrases: impl IntoIterator<Item = String>) -> Self {
        let phrases: Vec<String> = phrases
            .into_iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();

        if phrases.is_empty() {
            return Self::default();
        }

        Self { phrases }
    }

    #[must_use]
    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }

    /// Pick a target that differs from `excluding` whenever the pool allows it
    pub fn next_target<R: Rng + ?Sized>(&self, excluding: &str, rng: &mut R) -> String {
        let excluded = normalize(excluding);
        let candidates: Vec<&String> = self
            .phrases
            .iter()
            .filter(|p| normalize(p) != excluded)
            .collect();

        candidates
            .choose(rng)
            .map(|p| (*p).clone())
            .or_else(|| self.phrases.first().cloned())
            .unwrap_or_default()
    }

    /// Play one turn against the pending `target` (empty when none assigned)
    pub fn play<R: Rng + ?Sized>(&self, target: &str, utterance: &str, rng: &mut R) -> Attempt {
        if target.is_empty() {
            return Attempt::Assigned {
                target: self.next_target("", rng),
            };
        }

        if is_repetition(utterance, target) {
            Attempt::Success {
                completed: target.to_string(),
                next: self.next_target(target, rng),
            }
        } else {
            Attempt::Miss {
                target: target.to_string(),
            }
        }
    }
}

/// Whether `utterance` repeats `target`, ignoring case, spacing and punctuation
#[must_use]
pub fn is_repetition(utterance: &str, target: &str) -> bool {
    let target = normalize(target);
    !target.is_empty() && normalize(utterance).contains(&target)
}

fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn test_next_target_never_repeats() {
        let pool = PhrasePool::default();
        let mut rng = StdRng::seed_from_u64(7);
        for phrase in pool.phrases() {
            for _ in 0..50 {
                assert_ne!(&pool.next_target(phrase, &mut rng), phrase);
            }
        }
    }

    #[test]
    fn test_single_phrase_pool_returns_it() {
        let pool = PhrasePool::new(["Halo".to_string()]);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(pool.next_target("Halo", &mut rng), "Halo");
    }

    #[test]
    fn test_repetition_ignores_case_and_punctuation() {
        assert!(is_repetition("terima kasih!", "Terima kasih"));
        assert!(is_repetition("Hello Loona, terima  kasih.", "Terima kasih"));
        assert!(!is_repetition("terima", "Terima kasih"));
        assert!(!is_repetition("anything", ""));
    }

    #[test]
    fn test_play_turns() {
        let pool = PhrasePool::default();
        let mut rng = StdRng::seed_from_u64(3);

        let Attempt::Assigned { target } = pool.play("", "hi", &mut rng) else {
            panic!("expected assignment");
        };
        assert!(pool.phrases().contains(&target));

        assert_eq!(
            pool.play("Apa kabar", "apa", &mut rng),
            Attempt::Miss {
                target: "Apa kabar".to_string()
            }
        );

        match pool.play("Apa kabar", "Apa kabar?", &mut rng) {
            Attempt::Success { completed, next } => {
                assert_eq!(completed, "Apa kabar");
                assert_ne!(next, "Apa kabar");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_blank_pool_falls_back() {
        let pool = PhrasePool::new(["  ".to_string()]);
        assert_eq!(pool.phrases().len(), DEFAULT_PHRASES.len());
    }
}
