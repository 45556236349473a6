//! Task action trait and the per-attempt execution context.

use std::future::Future;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::error::AppResult;
use crate::util::serde::TaskId;

/// Context handed to a task action for a single attempt.
///
/// The cancellation token is a child of the queue's overall scope. It fires
/// when the scope is cancelled or when this attempt's timeout elapses, so
/// cooperative actions can stop early instead of running on in the
/// background after the worker has given up on them.
#[derive(Debug, Clone)]
pub struct TaskContext {
    task_id: TaskId,
    attempt: u32,
    deadline: Instant,
    cancel: CancellationToken,
}

impl TaskContext {
    pub(crate) const fn new(
        task_id: TaskId,
        attempt: u32,
        deadline: Instant,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            task_id,
            attempt,
            deadline,
            cancel,
        }
    }

    /// Identity of the task being executed.
    #[must_use]
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Execution number, starting at 1 for the first run.
    #[must_use]
    pub const fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Instant at which the worker stops waiting for this attempt.
    #[must_use]
    pub const fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Time left before the deadline, zero once it has passed.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Whether the attempt has been cancelled or timed out.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once the attempt is cancelled or timed out.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await;
    }

    /// The underlying token, for handing to nested work.
    #[must_use]
    pub const fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }
}

/// Unit of work executed by the worker pool.
///
/// Actions may run more than once when retries are enabled, hence `&self`.
/// Any async closure `Fn(TaskContext) -> impl Future<Output = AppResult<()>>`
/// implements this trait.
///
/// # Example
///
/// ```rust,ignore
/// use prometheus_task_queue::core::{TaskAction, TaskContext, AppResult};
///
/// struct Reindex { collection: String }
///
/// #[async_trait::async_trait]
/// impl TaskAction for Reindex {
///     async fn run(&self, ctx: TaskContext) -> AppResult<()> {
///         tokio::select! {
///             () = ctx.cancelled() => anyhow::bail!("reindex of {} abandoned", self.collection),
///             () = rebuild(&self.collection) => Ok(()),
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait TaskAction: Send + Sync + 'static {
    /// Run one attempt of the task.
    async fn run(&self, ctx: TaskContext) -> AppResult<()>;
}

#[async_trait]
impl<F, Fut> TaskAction for F
where
    F: Fn(TaskContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = AppResult<()>> + Send + 'static,
{
    async fn run(&self, ctx: TaskContext) -> AppResult<()> {
        (self)(ctx).await
    }
}
