//! Companion event publishing
//!
//! Every change of the engine's "last event" label becomes a
//! [`CompanionEvent`]. Events are logged on the `loona_companion::events`
//! target and, when an event log is configured, appended to it as JSON lines.
//! Publishing is best-effort: errors are logged and never propagate to callers.
//!
//! Initialize once at startup with [`init_publisher`], then call [`publish`] anywhere.

use std::path::PathBuf;
use std::sync::OnceLock;

use serde::Serialize;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Source identifier stamped on every event
const SOURCE: &str = "loona-companion";

/// Global publisher configuration
static CONFIG: OnceLock<EventsConfig> = OnceLock::new();

/// Configuration for the event publisher
#[derive(Debug, Clone, Default)]
pub struct EventsConfig {
    /// JSON-lines file events are appended to
    pub log_path: Option<PathBuf>,
}

/// A telemetry event emitted by the companion engine
#[derive(Debug, Clone, Serialize)]
pub struct CompanionEvent {
    /// Unique event ID (UUID v4)
    pub id: String,
    /// Event type (e.g., `"companion.mode.switched"`)
    #[serde(rename = "type")]
    pub event_type: String,
    /// Source service identifier
    pub source: String,
    /// Arbitrary event payload
    pub data: serde_json::Value,
    /// ISO 8601 timestamp
    pub timestamp: String,
}

impl CompanionEvent {
    /// Create a new event with auto-generated `id` and `timestamp`.
    #[must_use]
    pub fn new(event_type: &str, data: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            event_type: event_type.to_string(),
            source: SOURCE.to_string(),
            data,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Build an event for an engine "last event" label such as `"interrupted"`
/// or `"mode:interaction->monitor"`.
#[must_use]
pub fn build_label_event(label: &str, mode: &str, phase: &str) -> CompanionEvent {
    let kind = label.split(':').next().unwrap_or(label);
    CompanionEvent::new(
        &format!("companion.{kind}"),
        serde_json::json!({
            "label": label,
            "mode": mode,
            "phase": phase,
        }),
    )
}

/// Initialize the global publisher.
///
/// No-op if already initialized. Call once at startup.
pub fn init_publisher(config: EventsConfig) {
    let path = config.log_path.clone();
    if CONFIG.set(config).is_ok() {
        tracing::info!(event_log = ?path, "event publisher initialized");
    }
}

/// Publish a `CompanionEvent` (best-effort, fire-and-forget).
pub fn publish(event: CompanionEvent) {
    tracing::info!(
        target: "loona_companion::events",
        id = %event.id,
        event_type = %event.event_type,
        data = %event.data,
        "companion event"
    );

    let Some(path) = CONFIG.get().and_then(|c| c.log_path.clone()) else {
        return;
    };
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        return;
    };

    drop(runtime.spawn(async move {
        if let Err(e) = append_event(&path, &event).await {
            tracing::warn!(
                event_type = %event.event_type,
                path = %path.display(),
                error = %e,
                "failed to append companion event"
            );
        }
    }));
}

/// Append one event as a JSON line.
///
/// # Errors
///
/// Returns error if the event cannot be encoded or the file cannot be written.
async fn append_event(path: &std::path::Path, event: &CompanionEvent) -> crate::Result<()> {
    let mut line = serde_json::to_vec(event)?;
    line.push(b'\n');

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(&line).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_event_uses_label_prefix_as_type() {
        let event = build_label_event("mode:interaction->monitor", "Monitor", "speaking");
        assert_eq!(event.event_type, "companion.mode");
        assert_eq!(event.source, "loona-companion");
        assert_eq!(event.data["label"], "mode:interaction->monitor");
        assert_eq!(event.data["mode"], "Monitor");
    }

    #[test]
    fn plain_label_event() {
        let event = build_label_event("interrupted", "Interaction", "listening");
        assert_eq!(event.event_type, "companion.interrupted");
        assert_eq!(event.data["phase"], "listening");
    }

    #[tokio::test]
    async fn append_writes_json_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");

        let event = build_label_event("touch", "Interaction", "idle");
        append_event(&path, &event).await.unwrap();
        append_event(&path, &event).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed["type"], "companion.touch");
    }
}
