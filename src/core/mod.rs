//! Core scheduling: task records, the priority heap, the pending store and
//! the worker pool that drains it.

pub mod error;
pub mod events;
pub mod executor;
pub mod heap;
pub mod options;
pub mod pending;
pub mod policy;
pub mod task;
pub mod worker_pool;

pub use error::{AppResult, SchedulerError};
pub use events::{EventSink, InMemoryEventSink, LifecycleEvent};
pub use executor::{TaskAction, TaskContext};
pub use heap::TaskHeap;
pub use options::EnqueueOptions;
pub use pending::{PendingStore, PromotionEvent, PromotionRule, PromotionRules, StoreState};
pub use policy::PresetPolicy;
pub use task::{Task, TaskCallback, DEFAULT_MAX_ATTEMPTS};
pub use worker_pool::{PoolStats, WorkerPool};
