//! # Prometheus Task Queue
//!
//! An in-process priority task scheduler for background work.
//!
//! Callers submit units of work (an async action plus scheduling metadata) and
//! a bounded pool of dedicated worker threads executes them under priority
//! ordering, per-task deadlines, anti-starvation aging and optional automatic
//! retry. No external broker is involved: the queue lives in memory and is
//! drained on shutdown.
//!
//! ## Key Features
//!
//! - **Priority Ordering**: `Immediate < High < Retry < Normal < Low`, FIFO within a band
//! - **Lazy Aging**: starving `Low` and `Normal` work is promoted one band at a time
//! - **Bounded Admission**: `enqueue` never blocks; it fails fast when full or closed
//! - **Deadlines**: each attempt is raced against its timeout and the queue's cancellation scope
//! - **Failure Isolation**: panics and timeouts become ordinary, retryable task failures
//! - **Draining Shutdown**: queued work completes before the workers exit
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::time::Duration;
//!
//! use prometheus_task_queue::config::{PresetConfig, QueueConfig};
//! use prometheus_task_queue::core::{EnqueueOptions, TaskContext, WorkerPool};
//! use prometheus_task_queue::util::Priority;
//! use tokio_util::sync::CancellationToken;
//!
//! let pool = WorkerPool::new(
//!     QueueConfig::new()
//!         .with_workers(4)
//!         .with_timeout_secs(30)
//!         .with_preset("alerts", PresetConfig::with_priority(Priority::High)),
//! )?;
//! pool.start(CancellationToken::new())?;
//!
//! pool.enqueue(
//!     "alerts",
//!     |ctx: TaskContext| async move {
//!         send_alert(ctx.task_id()).await?;
//!         Ok(())
//!     },
//!     EnqueueOptions::new()
//!         .with_retry(Some(5))
//!         .with_callback(|id, err| if let Some(err) = err {
//!             eprintln!("alert {id} failed: {err}");
//!         }),
//! )?;
//!
//! pool.shutdown(Some(Duration::from_secs(60)))?;
//! ```
//!
//! Multiple named queues can be described in one JSON document and built
//! with [`builders::build_pools`].

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling: task records, heap, pending store and worker pool.
pub mod core;
/// Configuration models for queues, presets, and timeouts.
pub mod config;
/// Builders to construct worker pools from configuration.
pub mod builders;
/// Runtime adapters for executing task actions.
pub mod runtime;
/// Shared utilities.
pub mod util;
