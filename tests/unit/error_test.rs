//! Tests for error types

use std::time::Duration;

use prometheus_task_queue::core::SchedulerError;

#[test]
fn test_queue_full_error() {
    let err = SchedulerError::QueueFull { capacity: 64 };
    assert_eq!(format!("{err}"), "queue full (capacity 64)");
}

#[test]
fn test_queue_closed_error() {
    assert_eq!(format!("{}", SchedulerError::QueueClosed), "queue closed");
}

#[test]
fn test_shutdown_timeout_reports_queued() {
    let err = SchedulerError::ShutdownTimeout { queued: 3 };
    assert_eq!(
        format!("{err}"),
        "shutdown timed out with 3 task(s) still queued"
    );
}

#[test]
fn test_task_failures_are_retryable() {
    assert!(SchedulerError::TaskTimeout {
        timeout: Duration::from_secs(1)
    }
    .is_retryable());
    assert!(SchedulerError::TaskPanic("boom".into()).is_retryable());
    assert!(SchedulerError::TaskError("io".into()).is_retryable());
}

#[test]
fn test_admission_and_cancellation_not_retryable() {
    assert!(!SchedulerError::QueueClosed.is_retryable());
    assert!(!SchedulerError::QueueFull { capacity: 1 }.is_retryable());
    assert!(!SchedulerError::Cancelled.is_retryable());
}
