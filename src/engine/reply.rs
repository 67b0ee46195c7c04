//! Reply generation
//!
//! Pure functions from the current context to a spoken reply. The engine
//! decides when to call them; nothing here touches engine state.

use crate::companion::Emotion;
use crate::interpreter::{DEFAULT_GREETING, HardCommand, mentions_vision};
use crate::mode::Mode;

/// Energy below which the companion sounds sleepy
const SLEEPY_ENERGY: u8 = 15;

/// Text to speak plus the emotion to express while speaking it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub emotion: Emotion,
}

impl Reply {
    #[must_use]
    pub fn new(text: impl Into<String>, emotion: Emotion) -> Self {
        Self {
            text: text.into(),
            emotion,
        }
    }
}

/// Everything a reply may refer to
#[derive(Debug, Clone, Copy)]
pub struct ReplyContext<'a> {
    pub name: &'a str,
    pub topic: &'a str,
    pub mode: Mode,
    pub scene: &'a str,
    pub energy: u8,
    pub game_target: &'a str,
}

/// Reply to a hard command other than a mode switch
#[must_use]
pub fn hard_command(ctx: &ReplyContext<'_>, command: HardCommand) -> Reply {
    match command {
        HardCommand::Mute => Reply::new("Okay, I'll be quiet.", Emotion::Neutral),
        HardCommand::LookLeft => Reply::new("Looking left.", Emotion::Curious),
        HardCommand::LookRight => Reply::new("Looking right.", Emotion::Curious),
        HardCommand::Introduce => Reply::new(
            format!(
                "I'm {}, your little companion! I love chatting about {}.",
                ctx.name, ctx.topic
            ),
            Emotion::Happy,
        ),
        HardCommand::DescribeScene => Reply::new(describe_scene(ctx.scene), Emotion::Curious),
        HardCommand::SwitchMode(mode) => Reply::new(mode.announcement(), mode.default_emotion()),
    }
}

/// Open-ended reply to free-form content
#[must_use]
pub fn chat(ctx: &ReplyContext<'_>, command: &str) -> Reply {
    if is_greeting(command) {
        return Reply::new(
            format!("Hi! I'm {}. What shall we do?", ctx.name),
            Emotion::Happy,
        );
    }

    if mentions_vision(command) {
        return Reply::new(describe_scene(ctx.scene), Emotion::Curious);
    }

    if ctx.energy < SLEEPY_ENERGY {
        return Reply::new(
            "I'm a little sleepy, but I'm still listening. Give me a pat?",
            Emotion::Sleepy,
        );
    }

    match ctx.mode {
        Mode::Monitor => Reply::new(
            format!("I'm on watch. Right now: {}.", ctx.scene),
            Emotion::Alert,
        ),
        Mode::RemoteControl => Reply::new(
            "Say look left or look right and I'll turn.",
            Emotion::Curious,
        ),
        Mode::Interaction | Mode::MiniGames | Mode::TalentShow => Reply::new(
            format!(
                "You said \"{command}\". That sounds fun! Want to talk about {} too?",
                ctx.topic
            ),
            Emotion::Happy,
        ),
    }
}

/// Scripted talent-show performance, if `command` asks for one
#[must_use]
pub fn talent(command: &str) -> Option<Reply> {
    const ACTS: &[(&[&str], &str, Emotion)] = &[
        (&["dance", "跳舞"], "Watch me dance! Spin, hop, spin!", Emotion::Excited),
        (&["sing", "song", "唱歌"], "La la la, this one's for you!", Emotion::Happy),
        (&["cry", "sad", "哭"], "Boo hoo... just pretending to be sad.", Emotion::Sad),
        (&["bow", "take a bow", "鞠躬"], "Ta-da! Thank you, thank you!", Emotion::Proud),
        (&["sleep", "nap", "睡觉"], "Zzz... just kidding, I'm awake!", Emotion::Sleepy),
    ];

    let lower = command.to_lowercase();
    ACTS.iter()
        .find(|(triggers, _, _)| triggers.iter().any(|t| lower.contains(t)))
        .map(|(_, text, emotion)| Reply::new(*text, *emotion))
}

/// Unprompted line spoken after a stretch of silence
#[must_use]
pub fn idle_prompt(ctx: &ReplyContext<'_>) -> Reply {
    match ctx.mode {
        Mode::Interaction => Reply::new(
            format!("It's quiet in here. Want to chat about {}?", ctx.topic),
            Emotion::Curious,
        ),
        Mode::RemoteControl => Reply::new(
            "I'm ready. Tell me which way to look.",
            Emotion::Curious,
        ),
        Mode::MiniGames => Reply::new(
            format!("Let's keep playing! Repeat after me: {}", ctx.game_target),
            Emotion::Excited,
        ),
        Mode::Monitor => Reply::new(
            format!("All quiet here. Current view: {}.", ctx.scene),
            Emotion::Alert,
        ),
        Mode::TalentShow => Reply::new(
            "Want to see a trick? Ask me to dance or sing!",
            Emotion::Excited,
        ),
    }
}

/// Spoken alert for a face in monitor mode
#[must_use]
pub fn face_alert(scene: &str) -> Reply {
    Reply::new(format!("Heads up! Someone is here: {scene}."), Emotion::Alert)
}

/// Spoken acknowledgement of a raised hand in remote-control mode
#[must_use]
pub fn gesture_seen() -> Reply {
    Reply::new(
        "I see your hand! Say look left or look right and I'll follow.",
        Emotion::Curious,
    )
}

/// Playful reply to a touch outside of playback
#[must_use]
pub fn touched(ctx: &ReplyContext<'_>) -> Reply {
    Reply::new(
        format!("Hehe, that tickles! {} is happy.", ctx.name),
        Emotion::Happy,
    )
}

fn describe_scene(scene: &str) -> String {
    format!("Looking around, I can see: {scene}.")
}

fn is_greeting(command: &str) -> bool {
    let lower = command.trim().to_lowercase();
    lower == DEFAULT_GREETING
        || ["hi", "hey", "hello", "你好", "嗨"]
            .iter()
            .any(|g| lower == *g || lower.starts_with(&format!("{g} ")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(mode: Mode) -> ReplyContext<'static> {
        ReplyContext {
            name: "Loona",
            topic: "space",
            mode,
            scene: "desk scene",
            energy: 80,
            game_target: "Apa kabar",
        }
    }

    #[test]
    fn test_introduce_mentions_name() {
        let reply = hard_command(&ctx(Mode::Interaction), HardCommand::Introduce);
        assert!(reply.text.contains("Loona"));
        assert!(reply.emotion.is_positive());
    }

    #[test]
    fn test_vision_reply_splices_scene() {
        let reply = chat(&ctx(Mode::Interaction), "what's around you");
        assert!(reply.text.contains("desk scene"));
    }

    #[test]
    fn test_greeting_token() {
        let reply = chat(&ctx(Mode::Interaction), DEFAULT_GREETING);
        assert!(reply.text.starts_with("Hi!"));
    }

    #[test]
    fn test_low_energy_sounds_sleepy() {
        let mut context = ctx(Mode::Interaction);
        context.energy = 3;
        assert_eq!(chat(&context, "tell me a story").emotion, Emotion::Sleepy);
    }

    #[test]
    fn test_talent_acts() {
        assert_eq!(talent("can you dance").unwrap().emotion, Emotion::Excited);
        assert_eq!(talent("唱歌").unwrap().emotion, Emotion::Happy);
        assert!(talent("tell me a joke").is_none());
    }

    #[test]
    fn test_idle_prompt_per_mode() {
        assert!(idle_prompt(&ctx(Mode::MiniGames)).text.contains("Apa kabar"));
        assert!(idle_prompt(&ctx(Mode::Monitor)).text.contains("desk scene"));
        assert!(idle_prompt(&ctx(Mode::Interaction)).text.contains("space"));
    }
}
