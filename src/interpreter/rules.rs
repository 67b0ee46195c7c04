//! Phrase → intent rule table

use crate::mode::Mode;

/// Direct intent recognized without a wake word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardCommand {
    SwitchMode(Mode),
    Mute,
    LookLeft,
    LookRight,
    Introduce,
    DescribeScene,
}

/// Phrases per rule, checked top to bottom; first match wins
///
/// Phrases are lowercase. Latin phrases match whole words; others match as
/// substrings.
const RULES: &[(HardCommand, &[&str])] = &[
    (
        HardCommand::SwitchMode(Mode::Interaction),
        &["interaction mode", "chat mode", "互动模式", "聊天模式"],
    ),
    (
        HardCommand::SwitchMode(Mode::RemoteControl),
        &["remote control", "gesture mode", "遥控模式", "手势模式"],
    ),
    (
        HardCommand::SwitchMode(Mode::MiniGames),
        &["mini game", "minigame", "play a game", "小游戏", "玩游戏"],
    ),
    (
        HardCommand::SwitchMode(Mode::Monitor),
        &["monitor mode", "patrol mode", "start patrol", "监控模式", "巡逻"],
    ),
    (
        HardCommand::SwitchMode(Mode::TalentShow),
        &["talent show", "show a trick", "才艺表演", "表演才艺"],
    ),
    (
        HardCommand::Mute,
        &["be quiet", "stop talking", "shut up", "mute", "安静", "别说话"],
    ),
    (HardCommand::LookLeft, &["look left", "turn left", "向左看", "看左边"]),
    (HardCommand::LookRight, &["look right", "turn right", "向右看", "看右边"]),
    (
        HardCommand::Introduce,
        &["who are you", "introduce yourself", "your name", "你是谁", "介绍一下你自己"],
    ),
    (
        HardCommand::DescribeScene,
        &["what do you see", "what can you see", "你看到了什么", "你看到什么"],
    ),
];

/// Words that make an open-ended reply mention the current scene
const VISION_KEYWORDS: &[&str] = &[
    "see", "look", "around", "camera", "watch", "room", "看", "周围", "摄像头",
];

/// Match `text` against the rule table
#[must_use]
pub fn match_hard_command(text: &str) -> Option<HardCommand> {
    let lower = text.to_lowercase();
    let words = format!(" {} ", word_sequence(&lower));
    RULES
        .iter()
        .find(|(_, phrases)| {
            phrases.iter().any(|p| {
                if p.is_ascii() {
                    words.contains(&format!(" {p} "))
                } else {
                    lower.contains(p)
                }
            })
        })
        .map(|(command, _)| *command)
}

/// Alphanumeric runs of `text` joined by single spaces
fn word_sequence(text: &str) -> String {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether `text` refers to what the companion can see
#[must_use]
pub fn mentions_vision(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| VISION_KEYWORDS.contains(&word))
        || VISION_KEYWORDS
            .iter()
            .filter(|k| !k.is_ascii())
            .any(|k| lower.contains(k))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_phrases() {
        assert_eq!(
            match_hard_command("switch to Talent Show please"),
            Some(HardCommand::SwitchMode(Mode::TalentShow))
        );
        assert_eq!(
            match_hard_command("进入监控模式"),
            Some(HardCommand::SwitchMode(Mode::Monitor))
        );
    }

    #[test]
    fn test_direct_commands() {
        assert_eq!(match_hard_command("please be quiet"), Some(HardCommand::Mute));
        assert_eq!(match_hard_command("Look Left"), Some(HardCommand::LookLeft));
        assert_eq!(match_hard_command("who are you"), Some(HardCommand::Introduce));
        assert_eq!(
            match_hard_command("what do you see"),
            Some(HardCommand::DescribeScene)
        );
        assert_eq!(match_hard_command("tell me a story"), None);
    }

    #[test]
    fn test_phrases_inside_words_do_not_match() {
        assert_eq!(match_hard_command("my commute was long today"), None);
        assert_eq!(match_hard_command("the unmuted speaker"), None);
        assert_eq!(match_hard_command("Mute, please!"), Some(HardCommand::Mute));
        assert_eq!(
            match_hard_command("let's play a game."),
            Some(HardCommand::SwitchMode(Mode::MiniGames))
        );
    }

    #[test]
    fn test_vision_keywords_whole_words() {
        assert!(mentions_vision("what's around us?"));
        assert!(mentions_vision("is the camera on"));
        assert!(mentions_vision("看看周围"));
        assert!(!mentions_vision("seesaw"));
        assert!(!mentions_vision("tell me a joke"));
    }
}
