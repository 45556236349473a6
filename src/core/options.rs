//! Per-task admission options.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::error::SchedulerError;
use super::task::{TaskCallback, DEFAULT_MAX_ATTEMPTS};
use crate::util::serde::TaskId;

/// Overrides applied to a single `enqueue` call.
#[derive(Clone, Default)]
pub struct EnqueueOptions {
    pub(crate) task_id: Option<TaskId>,
    pub(crate) timeout: Option<Duration>,
    pub(crate) callback: Option<TaskCallback>,
    pub(crate) retry: Option<u32>,
}

impl EnqueueOptions {
    /// No overrides.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `id` instead of a generated identity. An empty id is ignored.
    #[must_use]
    pub fn with_task_id(mut self, id: impl Into<TaskId>) -> Self {
        let id = id.into();
        self.task_id = (!id.is_empty()).then_some(id);
        self
    }

    /// Use `timeout` verbatim instead of the preset's resolved timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Invoke `callback` once the task reaches a terminal state: with `None`
    /// on success, with the error otherwise.
    #[must_use]
    pub fn with_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(TaskId, Option<SchedulerError>) + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(callback));
        self
    }

    /// Enable retries. `None` uses [`DEFAULT_MAX_ATTEMPTS`].
    #[must_use]
    pub fn with_retry(mut self, max_attempts: Option<u32>) -> Self {
        self.retry = Some(max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS));
        self
    }
}

impl fmt::Debug for EnqueueOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnqueueOptions")
            .field("task_id", &self.task_id)
            .field("timeout", &self.timeout)
            .field("callback", &self.callback.is_some())
            .field("retry", &self.retry)
            .finish()
    }
}
