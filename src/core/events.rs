//! Task lifecycle events and sinks.
//!
//! Every event is logged through `tracing` under a `task.*` target. An
//! optional [`EventSink`] receives the same events for inspection.

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::util::serde::{Priority, TaskId};

/// Lifecycle transition of a single task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Aging raised the task's priority.
    Promoted {
        /// Task identity.
        id: TaskId,
        /// Priority before promotion.
        from: Priority,
        /// Priority after promotion.
        to: Priority,
    },
    /// A failed attempt was re-queued.
    Retrying {
        /// Task identity.
        id: TaskId,
        /// Preset label.
        preset: String,
        /// Re-executions scheduled so far, including this one.
        attempt: u32,
        /// Retry budget.
        max_attempts: u32,
        /// Failure of the attempt that just ran.
        error: String,
        /// Duration of that attempt.
        elapsed: Duration,
    },
    /// The retry budget ran out.
    Exhausted {
        /// Task identity.
        id: TaskId,
        /// Preset label.
        preset: String,
        /// Re-executions performed.
        attempt: u32,
        /// Retry budget.
        max_attempts: u32,
        /// Final failure.
        error: String,
        /// Duration of the final attempt.
        elapsed: Duration,
    },
    /// The task failed without retry.
    Failed {
        /// Task identity.
        id: TaskId,
        /// Preset label.
        preset: String,
        /// Failure.
        error: String,
        /// Duration of the attempt.
        elapsed: Duration,
    },
    /// A retry could not be re-queued; the task is lost.
    RetryRejected {
        /// Task identity.
        id: TaskId,
        /// Preset label.
        preset: String,
        /// Re-execution that was refused.
        attempt: u32,
        /// Why the push was refused.
        error: String,
    },
    /// The task succeeded.
    Completed {
        /// Task identity.
        id: TaskId,
        /// Preset label.
        preset: String,
        /// Re-executions needed before success.
        attempt: u32,
        /// Duration of the successful attempt.
        elapsed: Duration,
    },
}

impl LifecycleEvent {
    /// Stable event name, e.g. `task.completed`.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Promoted { .. } => "task.promoted",
            Self::Retrying { .. } => "task.retrying",
            Self::Exhausted { .. } => "task.exhausted",
            Self::Failed { .. } => "task.failed",
            Self::RetryRejected { .. } => "task.retry_rejected",
            Self::Completed { .. } => "task.completed",
        }
    }

    /// Identity of the task the event concerns.
    #[must_use]
    pub fn task_id(&self) -> &str {
        match self {
            Self::Promoted { id, .. }
            | Self::Retrying { id, .. }
            | Self::Exhausted { id, .. }
            | Self::Failed { id, .. }
            | Self::RetryRejected { id, .. }
            | Self::Completed { id, .. } => id,
        }
    }

    /// Emit the event as a structured log record.
    pub fn log(&self) {
        match self {
            Self::Promoted { id, from, to } => {
                debug!(target: "task.promoted", task_id = %id, from = %from, to = %to, "task promoted");
            }
            Self::Retrying {
                id,
                preset,
                attempt,
                max_attempts,
                error,
                elapsed,
            } => {
                warn!(
                    target: "task.retrying",
                    task_id = %id,
                    preset = %preset,
                    attempt,
                    max_attempts,
                    error = %error,
                    elapsed_ms = millis(*elapsed),
                    "task failed, retrying"
                );
            }
            Self::Exhausted {
                id,
                preset,
                attempt,
                max_attempts,
                error,
                elapsed,
            } => {
                error!(
                    target: "task.exhausted",
                    task_id = %id,
                    preset = %preset,
                    attempt,
                    max_attempts,
                    error = %error,
                    elapsed_ms = millis(*elapsed),
                    "task failed, retries exhausted"
                );
            }
            Self::Failed {
                id,
                preset,
                error,
                elapsed,
            } => {
                error!(
                    target: "task.failed",
                    task_id = %id,
                    preset = %preset,
                    error = %error,
                    elapsed_ms = millis(*elapsed),
                    "task failed"
                );
            }
            Self::RetryRejected {
                id,
                preset,
                attempt,
                error,
            } => {
                error!(
                    target: "task.retry_rejected",
                    task_id = %id,
                    preset = %preset,
                    attempt,
                    error = %error,
                    "task retry could not be queued"
                );
            }
            Self::Completed {
                id,
                preset,
                attempt,
                elapsed,
            } => {
                info!(
                    target: "task.completed",
                    task_id = %id,
                    preset = %preset,
                    attempt,
                    elapsed_ms = millis(*elapsed),
                    "task completed"
                );
            }
        }
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Receiver of lifecycle events. Called from worker threads.
pub trait EventSink: Send + Sync {
    /// Record an event.
    fn record(&self, event: &LifecycleEvent);
}

/// In-memory event sink for testing and dev. Keeps the most recent
/// `max_events` events.
#[derive(Debug)]
pub struct InMemoryEventSink {
    events: Mutex<VecDeque<LifecycleEvent>>,
    max_events: usize,
}

impl InMemoryEventSink {
    /// Create a new in-memory sink with a bounded buffer.
    #[must_use]
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::with_capacity(max_events.min(1024))),
            max_events,
        }
    }

    /// Retrieve a snapshot of stored events.
    #[must_use]
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events.lock().iter().cloned().collect()
    }

    /// Stored events with the given name (e.g. `task.retrying`).
    #[must_use]
    pub fn named(&self, name: &str) -> Vec<LifecycleEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.name() == name)
            .cloned()
            .collect()
    }
}

impl EventSink for InMemoryEventSink {
    fn record(&self, event: &LifecycleEvent) {
        let mut events = self.events.lock();
        if events.len() >= self.max_events {
            events.pop_front();
        }
        events.push_back(event.clone());
    }
}
