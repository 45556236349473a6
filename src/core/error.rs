//! Error types for scheduler operations.

use std::time::Duration;

use thiserror::Error;

/// Errors produced by scheduler components.
///
/// Admission and lifecycle errors are returned to the caller. Task failures
/// (`TaskTimeout`, `TaskPanic`, `TaskError`, `Cancelled`) are handled inside
/// the worker and only surface through events and completion callbacks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// The queue no longer accepts work.
    #[error("queue closed")]
    QueueClosed,
    /// The queue already holds `capacity` tasks.
    #[error("queue full (capacity {capacity})")]
    QueueFull {
        /// Configured queue capacity.
        capacity: usize,
    },
    /// The task ran past its execution timeout.
    #[error("task timed out after {timeout:?}")]
    TaskTimeout {
        /// Timeout that was exceeded.
        timeout: Duration,
    },
    /// The task action panicked.
    #[error("task panicked: {0}")]
    TaskPanic(String),
    /// The task action returned an error.
    #[error("task failed: {0}")]
    TaskError(String),
    /// The queue's cancellation scope fired before the task finished.
    #[error("task cancelled")]
    Cancelled,
    /// Shutdown deadline expired with work still queued.
    #[error("shutdown timed out with {queued} task(s) still queued")]
    ShutdownTimeout {
        /// Tasks still waiting in the queue.
        queued: usize,
    },
    /// Shutdown was requested on a pool whose workers were never started.
    #[error("pool was never started; {queued} task(s) left queued")]
    NotStarted {
        /// Tasks still waiting in the queue.
        queued: usize,
    },
    /// `start` was called more than once.
    #[error("worker pool already started")]
    AlreadyStarted,
    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The action runtime or a worker thread could not be created.
    #[error("runtime error: {0}")]
    Runtime(String),
}

impl SchedulerError {
    /// Whether a task failing with this error is eligible for retry.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::TaskTimeout { .. } | Self::TaskPanic(_) | Self::TaskError(_)
        )
    }
}

/// Application-facing result using anyhow for higher-level contexts.
///
/// Task actions return this type; an `Err` is recorded as
/// [`SchedulerError::TaskError`].
pub type AppResult<T> = Result<T, anyhow::Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(SchedulerError::QueueClosed.to_string(), "queue closed");
        assert_eq!(
            SchedulerError::QueueFull { capacity: 2 }.to_string(),
            "queue full (capacity 2)"
        );
        assert_eq!(
            SchedulerError::ShutdownTimeout { queued: 3 }.to_string(),
            "shutdown timed out with 3 task(s) still queued"
        );
    }

    #[test]
    fn test_retryable_classification() {
        assert!(SchedulerError::TaskTimeout {
            timeout: Duration::from_secs(1)
        }
        .is_retryable());
        assert!(SchedulerError::TaskPanic("boom".into()).is_retryable());
        assert!(SchedulerError::TaskError("bad".into()).is_retryable());
        assert!(!SchedulerError::Cancelled.is_retryable());
        assert!(!SchedulerError::QueueClosed.is_retryable());
        assert!(!SchedulerError::QueueFull { capacity: 1 }.is_retryable());
    }
}
