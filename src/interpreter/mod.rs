//! Command interpretation
//!
//! Pure text processing over recognized utterances:
//! - wake word detection and stripping ([`WakeWordMatcher`])
//! - hard commands that need no wake word ([`HardCommand`])
//! - everything else is free-form chat

mod rules;
mod wake_word;

pub use rules::{HardCommand, match_hard_command, mentions_vision};
pub use wake_word::{DEFAULT_WAKE_WORDS, WakeWordMatcher};

/// Substituted when a wake word is followed by nothing
pub const DEFAULT_GREETING: &str = "hello";

/// What a command asks the companion to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// A direct intent from the rule table
    Hard(HardCommand),
    /// Free-form content
    Chat(String),
}

/// Turns recognized utterances into commands
#[derive(Debug, Clone, Default)]
pub struct CommandInterpreter {
    matcher: WakeWordMatcher,
}

impl CommandInterpreter {
    /// Create an interpreter with extra wake words appended to the built-ins
    pub fn new<I, S>(extra_wake_words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            matcher: WakeWordMatcher::new(extra_wake_words),
        }
    }

    /// Create an interpreter that also answers to the companion's `name`
    ///
    /// Greeting forms of the name come before `extra`, so "hello mochi" wins
    /// over a bare "mochi".
    #[must_use]
    pub fn for_companion<S: AsRef<str>>(name: &str, extra: &[S]) -> Self {
        let name = name.trim().to_lowercase();
        let mut words: Vec<String> = Vec::new();
        if !name.is_empty() {
            words.extend(["hello", "hey", "hi", "ok"].map(|g| format!("{g} {name}")));
        }
        words.extend(extra.iter().map(|w| w.as_ref().to_string()));
        if !name.is_empty() {
            words.push(name);
        }
        Self::new(words)
    }

    #[must_use]
    pub const fn matcher(&self) -> &WakeWordMatcher {
        &self.matcher
    }

    /// Extract the actionable command from an utterance
    ///
    /// - wake word prefix: the remainder with surrounding punctuation and
    ///   whitespace trimmed, or [`DEFAULT_GREETING`] when nothing remains
    /// - hard command without wake word: the utterance unchanged
    /// - otherwise `None`
    #[must_use]
    pub fn extract_command(&self, raw: &str) -> Option<String> {
        let text = raw.trim();
        if text.is_empty() {
            return None;
        }

        if let Some((wake_word, rest)) = self.matcher.strip(text) {
            let command = rest.trim_matches(is_separator);
            tracing::debug!(wake_word, command, "wake word detected");
            return Some(if command.is_empty() {
                DEFAULT_GREETING.to_string()
            } else {
                command.to_string()
            });
        }

        if match_hard_command(text).is_some() {
            return Some(text.to_string());
        }

        None
    }

    /// Classify an extracted command
    #[must_use]
    pub fn classify(&self, command: &str) -> Intent {
        match_hard_command(command).map_or_else(|| Intent::Chat(command.to_string()), Intent::Hard)
    }
}

/// Whitespace and punctuation trimmed around a stripped command
fn is_separator(c: char) -> bool {
    c.is_whitespace()
        || c.is_ascii_punctuation()
        || matches!(c, '，' | '。' | '！' | '？' | '、' | '：' | '；' | '…')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_companion_name() {
        let interpreter = CommandInterpreter::for_companion("Mochi", &["yo buddy"]);
        assert_eq!(
            interpreter.extract_command("Hey Mochi, dance"),
            Some("dance".to_string())
        );
        assert_eq!(
            interpreter.extract_command("yo buddy sing"),
            Some("sing".to_string())
        );
        assert_eq!(
            interpreter.extract_command("hello loona"),
            Some(DEFAULT_GREETING.to_string())
        );
    }

    #[test]
    fn test_extract_command() {
        let interpreter = CommandInterpreter::default();
        assert_eq!(
            interpreter.extract_command("Hey Loona, what's the weather?"),
            Some("what's the weather".to_string())
        );
        assert_eq!(
            interpreter.extract_command("你好露娜，讲个故事。"),
            Some("讲个故事".to_string())
        );
    }

    #[test]
    fn test_bare_wake_word_yields_greeting() {
        let interpreter = CommandInterpreter::default();
        assert_eq!(
            interpreter.extract_command("Hello Loona!"),
            Some(DEFAULT_GREETING.to_string())
        );
        assert_eq!(
            interpreter.extract_command("露娜"),
            Some(DEFAULT_GREETING.to_string())
        );
    }

    #[test]
    fn test_hard_command_without_wake_word() {
        let interpreter = CommandInterpreter::default();
        assert_eq!(
            interpreter.extract_command("  look left "),
            Some("look left".to_string())
        );
    }

    #[test]
    fn test_wake_word_stripped_before_hard_command() {
        let interpreter = CommandInterpreter::default();
        let command = interpreter
            .extract_command("Hello Loona, who are you")
            .unwrap();
        assert_eq!(command, "who are you");
        assert_eq!(
            interpreter.classify(&command),
            Intent::Hard(HardCommand::Introduce)
        );
    }

    #[test]
    fn test_no_command() {
        let interpreter = CommandInterpreter::default();
        assert_eq!(interpreter.extract_command("tell me a story"), None);
        assert_eq!(interpreter.extract_command(""), None);
        assert_eq!(interpreter.extract_command("   "), None);
    }

    #[test]
    fn test_classify_chat() {
        let interpreter = CommandInterpreter::default();
        assert_eq!(
            interpreter.classify("tell me a story"),
            Intent::Chat("tell me a story".to_string())
        );
    }
}
