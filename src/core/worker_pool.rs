//! Worker pool: admission, lifecycle and statistics.
//!
//! A `WorkerPool` owns one [`PendingStore`] and a fixed set of dedicated OS
//! worker threads. Each worker blocks in `pop`, runs one task at a time on
//! the pool's tokio runtime under a deadline, and applies the retry policy.
//!
//! # Key Features
//!
//! - **Non-blocking admission**: `enqueue` fails fast when the queue is full or closed
//! - **Lazy aging**: starving `Low`/`Normal` tasks are promoted at pop time
//! - **Failure isolation**: panics and timeouts become ordinary task failures
//! - **Draining shutdown**: queued work finishes before workers exit
//!
//! # Example
//!
//! ```rust,ignore
//! use prometheus_task_queue::config::{PresetConfig, QueueConfig};
//! use prometheus_task_queue::core::{EnqueueOptions, TaskContext, WorkerPool};
//! use prometheus_task_queue::util::Priority;
//! use tokio_util::sync::CancellationToken;
//!
//! let pool = WorkerPool::new(
//!     QueueConfig::new()
//!         .with_workers(4)
//!         .with_preset("bulk", PresetConfig::with_priority(Priority::Low)),
//! )?;
//! pool.start(CancellationToken::new())?;
//!
//! let id = pool.enqueue(
//!     "bulk",
//!     |ctx: TaskContext| async move { reindex(ctx.task_id()).await },
//!     EnqueueOptions::new().with_retry(None),
//! )?;
//!
//! pool.shutdown(None)?;
//! ```

mod worker;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use parking_lot::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::SchedulerError;
use super::events::{EventSink, LifecycleEvent};
use super::executor::TaskAction;
use super::options::EnqueueOptions;
use super::pending::PendingStore;
use super::policy::PresetPolicy;
use super::task::Task;
use crate::config::QueueConfig;
use crate::runtime::TokioSpawner;
use crate::util::serde::TaskId;

/// Statistics about pool utilization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Number of worker threads.
    pub worker_count: usize,
    /// Tasks currently executing.
    pub active_tasks: u64,
    /// Tasks waiting in the queue.
    pub queued_tasks: usize,
    /// Tasks accepted by `enqueue`.
    pub submitted_tasks: u64,
    /// Tasks that finished successfully.
    pub completed_tasks: u64,
    /// Tasks that reached a terminal failure.
    pub failed_tasks: u64,
    /// Failed attempts that were re-queued.
    pub retried_tasks: u64,
    /// Aging promotions applied.
    pub promoted_tasks: u64,
}

/// Internal counters for pool statistics (thread-safe).
#[derive(Debug, Default)]
pub(crate) struct PoolCounters {
    pub active_tasks: AtomicU64,
    pub submitted_tasks: AtomicU64,
    pub completed_tasks: AtomicU64,
    pub failed_tasks: AtomicU64,
    pub retried_tasks: AtomicU64,
    pub promoted_tasks: AtomicU64,
}

impl PoolCounters {
    /// Get a snapshot of current statistics.
    pub fn snapshot(&self, worker_count: usize, queued_tasks: usize) -> PoolStats {
        PoolStats {
            worker_count,
            active_tasks: self.active_tasks.load(Ordering::Relaxed),
            queued_tasks,
            submitted_tasks: self.submitted_tasks.load(Ordering::Relaxed),
            completed_tasks: self.completed_tasks.load(Ordering::Relaxed),
            failed_tasks: self.failed_tasks.load(Ordering::Relaxed),
            retried_tasks: self.retried_tasks.load(Ordering::Relaxed),
            promoted_tasks: self.promoted_tasks.load(Ordering::Relaxed),
        }
    }
}

/// State shared between the pool handle and its workers.
pub(crate) struct PoolShared {
    pub pending: PendingStore,
    pub counters: PoolCounters,
    pub spawner: TokioSpawner,
    pub sink: RwLock<Option<Arc<dyn EventSink>>>,
}

impl PoolShared {
    /// Log an event and forward it to the configured sink.
    pub fn emit(&self, event: &LifecycleEvent) {
        event.log();
        if let Some(sink) = self.sink.read().as_ref() {
            sink.record(event);
        }
    }
}

/// Running worker threads plus the rendezvous used to wait for them.
struct Workers {
    handles: Vec<JoinHandle<()>>,
    /// Never receives a value; disconnects once every worker has exited.
    exited: Receiver<()>,
}

enum Lifecycle {
    Idle,
    Running(Workers),
    Stopped,
}

/// Bounded priority task queue executed by dedicated worker threads.
pub struct WorkerPool {
    config: QueueConfig,
    policy: PresetPolicy,
    shared: Arc<PoolShared>,
    lifecycle: Mutex<Lifecycle>,
}

impl WorkerPool {
    /// Create a pool. Zero configuration values are replaced by their
    /// defaults; no worker runs until [`WorkerPool::start`].
    ///
    /// # Errors
    ///
    /// - `SchedulerError::InvalidConfig` if the configuration is invalid
    /// - `SchedulerError::Runtime` if the action runtime cannot be built
    pub fn new(config: QueueConfig) -> Result<Self, SchedulerError> {
        let config = config.with_defaults();
        config.validate().map_err(SchedulerError::InvalidConfig)?;

        let policy = PresetPolicy::from_config(&config);
        let pending = PendingStore::with_min_heap_capacity(
            config.size,
            config.min_heap_capacity(),
            policy.promotion_rules(),
        );
        let spawner = TokioSpawner::with_worker_threads(config.workers)
            .map_err(|e| SchedulerError::Runtime(format!("failed to build action runtime: {e}")))?;

        info!(
            workers = config.workers,
            size = config.size,
            timeout_secs = config.timeout_secs,
            presets = config.presets.len(),
            "WorkerPool initialized"
        );

        Ok(Self {
            config,
            policy,
            shared: Arc::new(PoolShared {
                pending,
                counters: PoolCounters::default(),
                spawner,
                sink: RwLock::new(None),
            }),
            lifecycle: Mutex::new(Lifecycle::Idle),
        })
    }

    /// Forward lifecycle events to `sink` in addition to the log.
    #[must_use]
    pub fn with_event_sink(self, sink: Arc<dyn EventSink>) -> Self {
        self.set_event_sink(sink);
        self
    }

    /// Replace the event sink.
    pub fn set_event_sink(&self, sink: Arc<dyn EventSink>) {
        *self.shared.sink.write() = Some(sink);
    }

    /// Resolved configuration.
    #[must_use]
    pub const fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Preset policy used for admission.
    #[must_use]
    pub const fn policy(&self) -> &PresetPolicy {
        &self.policy
    }

    /// Spawn the worker threads. `scope` bounds every task deadline;
    /// cancelling it fails in-flight and remaining tasks with
    /// `SchedulerError::Cancelled`.
    ///
    /// # Errors
    ///
    /// - `SchedulerError::AlreadyStarted` on a second call
    /// - `SchedulerError::QueueClosed` after shutdown
    /// - `SchedulerError::Runtime` if a worker thread cannot be spawned; the
    ///   workers spawned before the failure keep running
    pub fn start(&self, scope: CancellationToken) -> Result<(), SchedulerError> {
        let mut lifecycle = self.lifecycle.lock();
        match *lifecycle {
            Lifecycle::Running(_) => return Err(SchedulerError::AlreadyStarted),
            Lifecycle::Stopped => return Err(SchedulerError::QueueClosed),
            Lifecycle::Idle if self.shared.pending.is_closed() => {
                return Err(SchedulerError::QueueClosed)
            }
            Lifecycle::Idle => {}
        }

        let (exited_tx, exited) = crossbeam_channel::bounded::<()>(0);
        let mut handles = Vec::with_capacity(self.config.workers);
        let mut spawn_error = None;
        for worker_id in 0..self.config.workers {
            match worker::spawn_worker(
                worker_id,
                Arc::clone(&self.shared),
                scope.clone(),
                exited_tx.clone(),
            ) {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    spawn_error = Some(SchedulerError::Runtime(format!(
                        "failed to spawn worker {worker_id}: {e}"
                    )));
                    break;
                }
            }
        }
        drop(exited_tx);

        info!(
            worker_count = handles.len(),
            queued = self.shared.pending.len(),
            "WorkerPool started"
        );
        *lifecycle = Lifecycle::Running(Workers { handles, exited });
        spawn_error.map_or(Ok(()), Err)
    }

    /// Admit a task under `preset`.
    ///
    /// Priority and timeout come from the preset policy unless `options`
    /// override them. Never blocks. Tasks admitted before `start` wait in
    /// the queue.
    ///
    /// # Errors
    ///
    /// - `SchedulerError::QueueClosed` once shutdown has begun
    /// - `SchedulerError::QueueFull` when the queue is at capacity
    pub fn enqueue<A>(
        &self,
        preset: &str,
        action: A,
        options: EnqueueOptions,
    ) -> Result<TaskId, SchedulerError>
    where
        A: TaskAction,
    {
        let priority = self.policy.priority(preset);
        let timeout = options
            .timeout
            .unwrap_or_else(|| self.policy.timeout(preset));

        let mut task = Task::new(preset, priority, timeout, action);
        if let Some(id) = options.task_id {
            task = task.with_id(id);
        }
        if let Some(callback) = options.callback {
            task = task.with_callback(callback);
        }
        if let Some(max_attempts) = options.retry {
            task = task.with_retry(max_attempts);
        }
        let id = task.id().to_string();

        match self.shared.pending.push(task) {
            Ok(()) => {
                self.shared
                    .counters
                    .submitted_tasks
                    .fetch_add(1, Ordering::Relaxed);
                debug!(
                    task_id = %id,
                    preset = %preset,
                    priority = %priority,
                    timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                    "Task enqueued"
                );
                Ok(id)
            }
            Err(e) => {
                warn!(task_id = %id, preset = %preset, error = %e, "Task rejected");
                Err(e)
            }
        }
    }

    /// Number of queued (not yet running) tasks.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.shared.pending.len()
    }

    /// Whether shutdown has begun.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.pending.is_closed()
    }

    /// Get current pool statistics.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        self.shared
            .counters
            .snapshot(self.config.workers, self.shared.pending.len())
    }

    /// Stop accepting work, let the workers drain the queue, and wait for
    /// every worker thread to exit.
    ///
    /// With a `deadline`, gives up once it elapses. The workers keep running
    /// in the background in that case and a later call may wait again.
    ///
    /// Blocks the calling thread.
    ///
    /// # Errors
    ///
    /// - `SchedulerError::ShutdownTimeout` if `deadline` elapsed first
    /// - `SchedulerError::NotStarted` if the pool never started and tasks are
    ///   still queued
    pub fn shutdown(&self, deadline: Option<Duration>) -> Result<(), SchedulerError> {
        self.shared.pending.close();

        let mut lifecycle = self.lifecycle.lock();
        let Lifecycle::Running(workers) = &*lifecycle else {
            let queued = self.shared.pending.len();
            *lifecycle = Lifecycle::Stopped;
            return if queued == 0 {
                Ok(())
            } else {
                warn!(queued, "Shutdown of a pool that was never started");
                Err(SchedulerError::NotStarted { queued })
            };
        };

        info!(
            queued = self.shared.pending.len(),
            deadline_ms = deadline.map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
            "Shutting down worker pool"
        );

        // No worker ever sends; the channel disconnects when the last one exits.
        let timed_out = match deadline {
            None => {
                let _ = workers.exited.recv();
                false
            }
            Some(limit) => matches!(
                workers.exited.recv_timeout(limit),
                Err(RecvTimeoutError::Timeout)
            ),
        };

        if timed_out {
            let queued = self.shared.pending.len();
            warn!(queued, "Worker pool shutdown timed out; workers left running");
            return Err(SchedulerError::ShutdownTimeout { queued });
        }

        if let Lifecycle::Running(workers) = std::mem::replace(&mut *lifecycle, Lifecycle::Stopped)
        {
            let worker_count = workers.handles.len();
            for (idx, handle) in workers.handles.into_iter().enumerate() {
                if handle.join().is_err() {
                    warn!(worker_id = idx, "Worker panicked");
                }
            }
            info!(worker_count, "Worker pool shut down complete");
        }
        Ok(())
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Close but DON'T join: workers finish the queue in the background.
        self.shared.pending.close();
        if matches!(*self.lifecycle.lock(), Lifecycle::Running(_)) {
            debug!("WorkerPool dropped without completed shutdown - workers will be detached");
        }
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("config", &self.config)
            .field("pending", &self.shared.pending)
            .finish_non_exhaustive()
    }
}
