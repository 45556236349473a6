//! Worker threads: pop, execute under a deadline, apply the retry policy.
//!
//! Workers are dedicated OS threads. Each one blocks in
//! [`PendingStore::pop`](crate::core::pending::PendingStore::pop) and drives a
//! single attempt at a time on the pool's action runtime.

use std::any::Any;
use std::io;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::PoolShared;
use crate::core::error::SchedulerError;
use crate::core::events::LifecycleEvent;
use crate::core::executor::TaskContext;
use crate::core::task::Task;

/// Fallback horizon for timeouts too large to add to `Instant::now()`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Spawn worker `worker_id`. The thread owns a clone of `exited` and drops
/// it on exit, which is how the pool observes that all workers are gone.
pub(super) fn spawn_worker(
    worker_id: usize,
    shared: Arc<PoolShared>,
    scope: CancellationToken,
    exited: Sender<()>,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("tq-worker-{worker_id}"))
        .spawn(move || {
            debug!(worker_id, "Worker thread started");
            while let Some((task, promotions)) = shared.pending.pop() {
                for promotion in promotions {
                    shared.counters.promoted_tasks.fetch_add(1, Ordering::Relaxed);
                    shared.emit(&LifecycleEvent::Promoted {
                        id: promotion.task_id,
                        from: promotion.from,
                        to: promotion.to,
                    });
                }
                process(&shared, &scope, task);
            }
            debug!(worker_id, "Queue closed and drained, worker exiting");
            drop(exited);
        })
}

/// Run one attempt and route the outcome.
fn process(shared: &PoolShared, scope: &CancellationToken, task: Task) {
    shared.counters.active_tasks.fetch_add(1, Ordering::Relaxed);
    let started = Instant::now();
    let outcome = execute(shared, scope, &task);
    let elapsed = started.elapsed();
    shared.counters.active_tasks.fetch_sub(1, Ordering::Relaxed);

    match outcome {
        Ok(()) => {
            shared.counters.completed_tasks.fetch_add(1, Ordering::Relaxed);
            shared.emit(&LifecycleEvent::Completed {
                id: task.id().to_string(),
                preset: task.preset().to_string(),
                attempt: task.attempts(),
                elapsed,
            });
            notify(shared, &task, None);
        }
        Err(err) => handle_failure(shared, task, err, elapsed),
    }
}

/// Race the action against its timeout and the queue scope.
///
/// The action runs as a spawned task so a panic surfaces at the join handle.
/// On timeout or cancellation the handle is dropped, which detaches the
/// action; its context token is cancelled so a cooperative action can stop.
fn execute(shared: &PoolShared, scope: &CancellationToken, task: &Task) -> Result<(), SchedulerError> {
    if scope.is_cancelled() {
        return Err(SchedulerError::Cancelled);
    }

    let timeout = task.timeout();
    let now = Instant::now();
    let deadline = now
        .checked_add(timeout)
        .unwrap_or_else(|| now + FAR_FUTURE);
    let attempt_token = scope.child_token();
    let ctx = TaskContext::new(
        task.id().to_string(),
        task.attempts() + 1,
        deadline,
        attempt_token.clone(),
    );

    let action = task.action();
    let handle = shared.spawner.spawn(async move { action.run(ctx).await });

    let result = shared.spawner.block_on(async {
        tokio::select! {
            biased;
            joined = handle => classify(joined),
            () = tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)) => {
                Err(SchedulerError::TaskTimeout { timeout })
            }
            () = scope.cancelled() => Err(SchedulerError::Cancelled),
        }
    });

    if result.is_err() {
        attempt_token.cancel();
    }
    result
}

fn classify(joined: Result<anyhow::Result<()>, JoinError>) -> Result<(), SchedulerError> {
    match joined {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(SchedulerError::TaskError(format!("{e:#}"))),
        Err(e) if e.is_panic() => Err(SchedulerError::TaskPanic(panic_message(&*e.into_panic()))),
        Err(e) => Err(SchedulerError::TaskError(e.to_string())),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string())
}

/// Retry transition: re-queue at `Retry` priority while the budget allows,
/// otherwise report the terminal failure.
fn handle_failure(shared: &PoolShared, mut task: Task, err: SchedulerError, elapsed: Duration) {
    let id = task.id().to_string();
    let preset = task.preset().to_string();

    if !err.is_retryable() || !task.retry_enabled() {
        shared.counters.failed_tasks.fetch_add(1, Ordering::Relaxed);
        shared.emit(&LifecycleEvent::Failed {
            id,
            preset,
            error: err.to_string(),
            elapsed,
        });
        notify(shared, &task, Some(err));
        return;
    }

    if !task.can_retry() {
        shared.counters.failed_tasks.fetch_add(1, Ordering::Relaxed);
        shared.emit(&LifecycleEvent::Exhausted {
            id,
            preset,
            attempt: task.attempts(),
            max_attempts: task.max_attempts(),
            error: err.to_string(),
            elapsed,
        });
        notify(shared, &task, Some(err));
        return;
    }

    task.prepare_retry();
    let attempt = task.attempts();
    shared.emit(&LifecycleEvent::Retrying {
        id: id.clone(),
        preset: preset.clone(),
        attempt,
        max_attempts: task.max_attempts(),
        error: err.to_string(),
        elapsed,
    });

    let callback = task.callback();
    match shared.pending.push(task) {
        Ok(()) => {
            shared.counters.retried_tasks.fetch_add(1, Ordering::Relaxed);
        }
        Err(push_err) => {
            shared.counters.failed_tasks.fetch_add(1, Ordering::Relaxed);
            shared.emit(&LifecycleEvent::RetryRejected {
                id: id.clone(),
                preset,
                attempt,
                error: push_err.to_string(),
            });
            if let Some(callback) = callback {
                shared
                    .spawner
                    .spawn_detached_blocking(move || callback(id, Some(push_err)));
            }
        }
    }
}

/// Invoke the completion callback off the worker thread.
fn notify(shared: &PoolShared, task: &Task, err: Option<SchedulerError>) {
    if let Some(callback) = task.callback() {
        let id = task.id().to_string();
        shared
            .spawner
            .spawn_detached_blocking(move || callback(id, err));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_extraction() {
        let static_payload: Box<dyn Any + Send> = Box::new("static boom");
        assert_eq!(panic_message(&*static_payload), "static boom");

        let owned_payload: Box<dyn Any + Send> = Box::new(String::from("owned boom"));
        assert_eq!(panic_message(&*owned_payload), "owned boom");

        let other: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(&*other), "unknown panic payload");
    }

    #[test]
    fn test_classify_error_chain() {
        let err = anyhow::anyhow!("disk full").context("write failed");
        assert_eq!(
            classify(Ok(Err(err))),
            Err(SchedulerError::TaskError("write failed: disk full".into()))
        );
        assert_eq!(classify(Ok(Ok(()))), Ok(()));
    }
}
