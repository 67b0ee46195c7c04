//! Voice pipeline integration tests
//!
//! Runs the real engine loop with console collaborators and tokio timers,
//! no audio hardware required.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use loona_companion::engine::{Collaborators, Engine, EngineSettings, Snapshot};
use loona_companion::interpreter::{CommandInterpreter, HardCommand, Intent};
use loona_companion::mode::Mode;
use loona_companion::perception::{PERCEPTION_UNAVAILABLE, ScriptedPerception};
use loona_companion::voice::{ConsoleSpeech, ConsoleVoice};
use loona_companion::Error;

const WAIT: Duration = Duration::from_secs(5);

async fn wait_until(snapshots: &mut watch::Receiver<Snapshot>, check: impl FnMut(&Snapshot) -> bool) {
    tokio::time::timeout(WAIT, snapshots.wait_for(check))
        .await
        .expect("timed out waiting for snapshot")
        .expect("engine dropped");
}

fn console_engine(
    speech: &Arc<ConsoleSpeech>,
    scenes: Vec<String>,
) -> (Engine, loona_companion::EngineHandle) {
    Engine::builder(Collaborators {
        speech: speech.clone(),
        voice: Arc::new(ConsoleVoice::new(40.0)),
        perception: Arc::new(ScriptedPerception::new(scenes, Duration::from_millis(500))),
    })
    .settings(EngineSettings {
        resume_grace: Duration::from_millis(20),
        ..EngineSettings::default()
    })
    .seed(1)
    .build()
}

#[tokio::test]
async fn test_console_round_trip() {
    let speech = Arc::new(ConsoleSpeech::new(true));
    let (engine, handle) = console_engine(&speech, Vec::new());
    let task = tokio::spawn(engine.run());
    let mut snapshots = handle.subscribe();

    tokio_test::assert_ok!(handle.start());
    wait_until(&mut snapshots, |s| s.is_listening).await;
    assert_eq!(handle.snapshot().scene_summary, PERCEPTION_UNAVAILABLE);

    assert!(speech.deliver("Hello Loona, who are you"));
    wait_until(&mut snapshots, |s| s.last_reply.contains("Loona")).await;

    // Playback ends on its own and the microphone comes back
    wait_until(&mut snapshots, |s| s.is_listening && !s.is_speaking).await;
    assert!(speech.is_transcribing());

    handle.shutdown();
    tokio::time::timeout(WAIT, task).await.unwrap().unwrap();
    assert!(handle.is_shut_down());
    assert!(!speech.is_transcribing());
    assert!(matches!(handle.start(), Err(Error::ChannelClosed)));
}

#[tokio::test]
async fn test_console_mode_and_scenes() {
    let speech = Arc::new(ConsoleSpeech::new(true));
    let (engine, handle) = console_engine(&speech, vec!["1 face detected".to_string()]);
    let task = tokio::spawn(engine.run());
    let mut snapshots = handle.subscribe();

    tokio_test::assert_ok!(handle.start());
    wait_until(&mut snapshots, |s| s.scene_summary == "1 face detected").await;

    tokio_test::assert_ok!(handle.set_mode(Mode::Monitor));
    wait_until(&mut snapshots, |s| s.mode == Mode::Monitor).await;
    wait_until(&mut snapshots, |s| s.companion.last_event == "face_alert").await;

    tokio_test::assert_ok!(handle.stop());
    wait_until(&mut snapshots, |s| !s.is_listening && !s.is_speaking).await;
    assert!(!speech.deliver("Hello Loona"));

    handle.shutdown();
    tokio::time::timeout(WAIT, task).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_console_permission_denied() {
    let speech = Arc::new(ConsoleSpeech::new(false));
    let (engine, handle) = console_engine(&speech, Vec::new());
    let task = tokio::spawn(engine.run());
    let mut snapshots = handle.subscribe();

    tokio_test::assert_ok!(handle.start());
    wait_until(&mut snapshots, |s| s.companion.last_event == "permission_denied").await;
    assert!(!handle.snapshot().is_listening);
    assert!(!speech.deliver("Hello Loona"));

    handle.shutdown();
    tokio::time::timeout(WAIT, task).await.unwrap().unwrap();
}

#[test]
fn test_wake_word_variants() {
    let interpreter = CommandInterpreter::default();

    for (utterance, expected) in [
        ("Hello Loona, who are you", "who are you"),
        ("hey loona... dance!", "dance"),
        ("OK Loona look left", "look left"),
        ("你好露娜，你看到了什么？", "你看到了什么"),
        ("露娜", "hello"),
    ] {
        assert_eq!(
            interpreter.extract_command(utterance).as_deref(),
            Some(expected),
            "{utterance}"
        );
    }
}

#[test]
fn test_wake_word_needs_word_boundary() {
    let interpreter = CommandInterpreter::default();
    assert_eq!(interpreter.extract_command("loonatic behaviour"), None);
}

#[test]
fn test_hard_commands_without_wake_word() {
    let interpreter = CommandInterpreter::default();

    let command = interpreter.extract_command("Look right please").unwrap();
    assert_eq!(command, "Look right please");
    assert_eq!(
        interpreter.classify(&command),
        Intent::Hard(HardCommand::LookRight)
    );

    assert_eq!(interpreter.extract_command("nice weather today"), None);
    assert_eq!(interpreter.extract_command("my commute was long today"), None);
}

#[test]
fn test_wake_word_then_hard_command_is_stripped() {
    let interpreter = CommandInterpreter::default();

    let command = interpreter
        .extract_command("Hello Loona, switch to talent show")
        .unwrap();
    assert_eq!(command, "switch to talent show");
    assert_eq!(
        interpreter.classify(&command),
        Intent::Hard(HardCommand::SwitchMode(Mode::TalentShow))
    );
}
