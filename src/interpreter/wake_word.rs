//! Wake word matching
//!
//! Wake words are matched as a prefix of the transcript. Latin-script wake
//! words compare case-insensitively and must end on a word boundary; other
//! scripts compare exactly.

/// Built-in wake words, in priority order
pub const DEFAULT_WAKE_WORDS: &[&str] = &[
    "hello loona",
    "hey loona",
    "hi loona",
    "ok loona",
    "你好露娜",
    "嗨露娜",
    "露娜",
    "loona",
];

/// Matches and strips wake word prefixes
#[derive(Debug, Clone)]
pub struct WakeWordMatcher {
    wake_words: Vec<String>,
}

impl Default for WakeWordMatcher {
    fn default() -> Self {
        Self::new(std::iter::empty::<String>())
    }
}

impl WakeWordMatcher {
    /// Create a matcher from the built-ins followed by `extra` wake words
    pub fn new<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut wake_words: Vec<String> = DEFAULT_WAKE_WORDS
            .iter()
            .map(|w| (*w).to_string())
            .collect();

        for word in extra {
            let normalized = word.as_ref().trim().to_lowercase();
            if !normalized.is_empty() && !wake_words.contains(&normalized) {
                wake_words.push(normalized);
            }
        }

        tracing::debug!(wake_words = ?wake_words, "wake word matcher initialized");

        Self { wake_words }
    }

    /// Configured wake words, in priority order
    #[must_use]
    pub fn wake_words(&self) -> &[String] {
        &self.wake_words
    }

    /// Find the first wake word prefixing `transcript`
    ///
    /// Returns the wake word and the raw remainder after it.
    #[must_use]
    pub fn strip<'a>(&self, transcript: &'a str) -> Option<(&str, &'a str)> {
        let text = transcript.trim_start();

        self.wake_words.iter().find_map(|wake_word| {
            strip_prefix_ignore_case(text, wake_word).map(|rest| (wake_word.as_str(), rest))
        })
    }

    /// Check whether `transcript` starts with any wake word
    #[must_use]
    pub fn is_wake(&self, transcript: &str) -> bool {
        self.strip(transcript).is_some()
    }
}

/// Strip `prefix` from `text`, comparing Latin letters case-insensitively
///
/// A prefix ending in a Latin letter only matches when the next character is
/// not alphanumeric.
fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let mut chars = text.char_indices();
    let mut end = 0;

    for expected in prefix.chars() {
        let (idx, actual) = chars.next()?;
        if !actual.to_lowercase().eq(expected.to_lowercase()) {
            return None;
        }
        end = idx + actual.len_utf8();
    }

    let rest = &text[end..];
    let needs_boundary = prefix.chars().last().is_some_and(|c| c.is_ascii_alphanumeric());
    if needs_boundary && rest.chars().next().is_some_and(char::is_alphanumeric) {
        return None;
    }

    Some(rest)
}
