//! The task record: identity, action, scheduling metadata and retry state.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::error::SchedulerError;
use super::executor::TaskAction;
use crate::util::serde::{Priority, TaskId};

/// Retry budget applied when retries are enabled without an explicit maximum.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Completion callback. Receives the task id and `None` on success, or the
/// terminal error on failure. Invoked off the worker thread with no ordering
/// guarantee relative to later executions.
pub type TaskCallback = Arc<dyn Fn(TaskId, Option<SchedulerError>) + Send + Sync>;

/// A unit of scheduling.
///
/// Owned by exactly one holder at a time: the pending store while queued,
/// a worker while running. Only the store rewrites `priority` and
/// `enqueued_at` in place, and only while holding its lock.
pub struct Task {
    id: TaskId,
    preset: String,
    priority: Priority,
    action: Arc<dyn TaskAction>,
    timeout: Duration,
    callback: Option<TaskCallback>,
    enqueued_at: Instant,
    seq: u64,
    retry_enabled: bool,
    max_attempts: u32,
    attempts: u32,
}

impl Task {
    /// Create a task with a freshly generated id and retries disabled.
    pub fn new<A>(preset: impl Into<String>, priority: Priority, timeout: Duration, action: A) -> Self
    where
        A: TaskAction,
    {
        Self::from_shared(preset, priority, timeout, Arc::new(action))
    }

    /// Create a task around an already shared action.
    pub fn from_shared(
        preset: impl Into<String>,
        priority: Priority,
        timeout: Duration,
        action: Arc<dyn TaskAction>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            preset: preset.into(),
            priority,
            action,
            timeout,
            callback: None,
            enqueued_at: Instant::now(),
            seq: 0,
            retry_enabled: false,
            max_attempts: 0,
            attempts: 0,
        }
    }

    /// Replace the generated id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<TaskId>) -> Self {
        self.id = id.into();
        self
    }

    /// Attach a completion callback.
    #[must_use]
    pub fn with_callback(mut self, callback: TaskCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Enable retries with at most `max_attempts` re-executions.
    #[must_use]
    pub const fn with_retry(mut self, max_attempts: u32) -> Self {
        self.retry_enabled = true;
        self.max_attempts = max_attempts;
        self
    }

    /// Override the enqueue timestamp.
    #[must_use]
    pub const fn with_enqueued_at(mut self, at: Instant) -> Self {
        self.enqueued_at = at;
        self
    }

    /// Task identity.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Preset label the task was admitted under.
    #[must_use]
    pub fn preset(&self) -> &str {
        &self.preset
    }

    /// Current priority, possibly bumped by aging or retry.
    #[must_use]
    pub const fn priority(&self) -> Priority {
        self.priority
    }

    /// Per-attempt execution timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// When the task last entered the queue.
    #[must_use]
    pub const fn enqueued_at(&self) -> Instant {
        self.enqueued_at
    }

    /// Whether failed attempts are re-queued.
    #[must_use]
    pub const fn retry_enabled(&self) -> bool {
        self.retry_enabled
    }

    /// Maximum number of re-executions after the first run.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Re-executions performed so far.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    pub(crate) fn action(&self) -> Arc<dyn TaskAction> {
        Arc::clone(&self.action)
    }

    pub(crate) fn callback(&self) -> Option<TaskCallback> {
        self.callback.clone()
    }

    pub(crate) const fn seq(&self) -> u64 {
        self.seq
    }

    pub(crate) const fn set_seq(&mut self, seq: u64) {
        self.seq = seq;
    }

    /// Rewrite priority and restart the age clock. Store-internal.
    pub(crate) const fn promote(&mut self, to: Priority, now: Instant) {
        self.priority = to;
        self.enqueued_at = now;
    }

    /// Whether another attempt is allowed after a retryable failure.
    #[must_use]
    pub const fn can_retry(&self) -> bool {
        self.retry_enabled && self.attempts < self.max_attempts
    }

    /// Prepare the task for re-queueing after a failed attempt.
    pub(crate) fn prepare_retry(&mut self) {
        self.attempts += 1;
        self.priority = Priority::Retry;
        self.enqueued_at = Instant::now();
    }

    /// Heap order: priority, then enqueue time, then store sequence.
    pub(crate) fn precedes(&self, other: &Self) -> bool {
        (self.priority, self.enqueued_at, self.seq) < (other.priority, other.enqueued_at, other.seq)
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("preset", &self.preset)
            .field("priority", &self.priority)
            .field("timeout", &self.timeout)
            .field("retry_enabled", &self.retry_enabled)
            .field("max_attempts", &self.max_attempts)
            .field("attempts", &self.attempts)
            .finish_non_exhaustive()
    }
}
