//! Monotonic clock and cancellable timers
//!
//! Timers never touch engine state directly. When one fires, the scheduler
//! posts [`EngineEvent::Timer`] onto the engine channel, and the engine drops
//! any firing whose id it no longer tracks.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tokio::task::AbortHandle;

use crate::engine::{EngineEvent, EventSender};

/// Identifies one scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(pub u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

/// What a timer is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Recurring check for proactive engagement
    IdlePrompt,
    /// Silence after an interim result; finalize the utterance
    AutoStop,
    /// Grace delay between playback end and re-arming the microphone
    ResumeListening,
    /// Clears the wake word hint
    HintExpiry,
}

/// Source of monotonic time
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock backed by [`Instant::now`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Schedules delayed and recurring timers
pub trait Scheduler: Send + Sync {
    /// Fire `kind` once after `delay`
    fn once(&self, id: TimerId, kind: TimerKind, delay: Duration);

    /// Fire `kind` every `period`, first after one period
    fn every(&self, id: TimerId, kind: TimerKind, period: Duration);

    /// Cancel a timer; unknown ids are ignored
    fn cancel(&self, id: TimerId);
}

/// Scheduler backed by tokio tasks
///
/// Must be used from within a tokio runtime.
pub struct TokioScheduler {
    events: EventSender,
    tasks: Mutex<HashMap<TimerId, AbortHandle>>,
}

impl TokioScheduler {
    #[must_use]
    pub fn new(events: EventSender) -> Self {
        Self {
            events,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    fn track(&self, id: TimerId, handle: AbortHandle) {
        if let Ok(mut tasks) = self.tasks.lock() {
            if let Some(previous) = tasks.insert(id, handle) {
                previous.abort();
            }
        }
    }
}

impl Scheduler for TokioScheduler {
    fn once(&self, id: TimerId, kind: TimerKind, delay: Duration) {
        let events = self.events.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(EngineEvent::Timer { id, kind });
        });

        tracing::trace!(%id, ?kind, delay_ms = delay.as_millis(), "timer scheduled");
        self.track(id, task.abort_handle());
    }

    fn every(&self, id: TimerId, kind: TimerKind, period: Duration) {
        let events = self.events.clone();
        let task = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut interval = tokio::time::interval_at(start, period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                if events.send(EngineEvent::Timer { id, kind }).is_err() {
                    break;
                }
            }
        });

        tracing::trace!(%id, ?kind, period_ms = period.as_millis(), "recurring timer scheduled");
        self.track(id, task.abort_handle());
    }

    fn cancel(&self, id: TimerId) {
        if let Ok(mut tasks) = self.tasks.lock() {
            if let Some(handle) = tasks.remove(&id) {
                handle.abort();
                tracing::trace!(%id, "timer cancelled");
            }
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        if let Ok(mut tasks) = self.tasks.lock() {
            for (_, handle) in tasks.drain() {
                handle.abort();
            }
        }
    }
}
