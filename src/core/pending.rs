//! Bounded pending store: the task heap behind one monitor.
//!
//! All heap access goes through `push`, `pop` and `close`. Aging happens
//! lazily inside `pop`, under the same lock, so only the thread about to
//! consume ever observes or applies a promotion.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};

use super::error::SchedulerError;
use super::heap::{TaskHeap, TASK_HEAP_MIN_CAP};
use super::task::Task;
use crate::util::serde::{Priority, TaskId};

/// Open/closed state of the store. `Open → Closed` happens once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreState {
    /// Accepting pushes.
    Open,
    /// Rejecting pushes; queued tasks remain poppable until drained.
    Closed,
}

/// Age threshold after which a task at some priority is promoted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromotionRule {
    /// Queued age at the source priority that must be exceeded.
    pub after: Duration,
    /// Priority assigned once the threshold is exceeded.
    pub target: Priority,
}

/// Promotion rules keyed by source priority.
pub type PromotionRules = HashMap<Priority, PromotionRule>;

/// A promotion applied during a `pop` scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromotionEvent {
    /// Promoted task.
    pub task_id: TaskId,
    /// Priority before promotion.
    pub from: Priority,
    /// Priority after promotion.
    pub to: Priority,
}

struct StoreInner {
    heap: TaskHeap,
    state: StoreState,
    next_seq: u64,
}

/// Bounded, closable priority store shared by the admission path and every
/// worker thread.
pub struct PendingStore {
    inner: Mutex<StoreInner>,
    available: Condvar,
    capacity: usize,
    promotion: PromotionRules,
}

impl PendingStore {
    /// Create an open store holding at most `capacity` tasks.
    #[must_use]
    pub fn new(capacity: usize, promotion: PromotionRules) -> Self {
        Self::with_min_heap_capacity(capacity, TASK_HEAP_MIN_CAP, promotion)
    }

    /// Like [`PendingStore::new`] with an explicit heap shrink floor.
    #[must_use]
    pub fn with_min_heap_capacity(
        capacity: usize,
        min_heap_capacity: usize,
        promotion: PromotionRules,
    ) -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                heap: TaskHeap::new(min_heap_capacity),
                state: StoreState::Open,
                next_seq: 0,
            }),
            available: Condvar::new(),
            capacity,
            promotion,
        }
    }

    /// Insert a task and wake one waiting consumer.
    ///
    /// # Errors
    ///
    /// - `SchedulerError::QueueClosed` once the store is closed
    /// - `SchedulerError::QueueFull` when `capacity` tasks are already queued
    pub fn push(&self, mut task: Task) -> Result<(), SchedulerError> {
        let mut inner = self.inner.lock();
        if inner.state == StoreState::Closed {
            return Err(SchedulerError::QueueClosed);
        }
        if inner.heap.len() >= self.capacity {
            return Err(SchedulerError::QueueFull {
                capacity: self.capacity,
            });
        }
        task.set_seq(inner.next_seq);
        inner.next_seq += 1;
        inner.heap.push(task);
        drop(inner);
        self.available.notify_one();
        Ok(())
    }

    /// Block until a task is available, applying aging first.
    ///
    /// Returns `None` once the store is closed and empty; every waiting
    /// thread observes that terminal signal.
    pub fn pop(&self) -> Option<(Task, Vec<PromotionEvent>)> {
        let mut inner = self.inner.lock();
        loop {
            let events = self.promote_locked(&mut inner.heap);
            if let Some(task) = inner.heap.pop() {
                return Some((task, events));
            }
            if inner.state == StoreState::Closed {
                return None;
            }
            self.available.wait(&mut inner);
        }
    }

    /// Non-blocking variant of [`PendingStore::pop`]. Returns `None` when
    /// nothing is queued, whether or not the store is closed.
    pub fn try_pop(&self) -> Option<(Task, Vec<PromotionEvent>)> {
        let mut inner = self.inner.lock();
        let events = self.promote_locked(&mut inner.heap);
        inner.heap.pop().map(|task| (task, events))
    }

    /// Stop accepting pushes and wake every waiter. Idempotent.
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        inner.state = StoreState::Closed;
        drop(inner);
        self.available.notify_all();
    }

    /// Current queued count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().heap.len()
    }

    /// Whether nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().heap.is_empty()
    }

    /// Maximum number of queued tasks.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current open/closed state.
    #[must_use]
    pub fn state(&self) -> StoreState {
        self.inner.lock().state
    }

    /// Whether `close` has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state() == StoreState::Closed
    }

    /// Promote every task whose age exceeds its rule. Each rewrite and its
    /// heap repair happen together; the age clock restarts at `now`, so a
    /// task climbs at most one band per scan.
    fn promote_locked(&self, heap: &mut TaskHeap) -> Vec<PromotionEvent> {
        let mut events = Vec::new();
        if self.promotion.is_empty() {
            return events;
        }
        let now = Instant::now();
        let mut index = heap.len();
        while index > 0 {
            index -= 1;
            // A sift-up during `fix` pulls the old parent into `index`, so
            // the slot is re-checked until nothing there qualifies.
            while let Some(task) = heap.get(index) {
                let Some(rule) = self.promotion.get(&task.priority()) else {
                    break;
                };
                let aged = now.saturating_duration_since(task.enqueued_at()) > rule.after;
                if !aged || !rule.target.is_more_urgent_than(task.priority()) {
                    break;
                }
                let task_id = task.id().to_string();
                let from = heap.promote_at(index, rule.target, now);
                events.push(PromotionEvent {
                    task_id,
                    from,
                    to: rule.target,
                });
            }
        }
        events
    }
}

impl std::fmt::Debug for PendingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("PendingStore")
            .field("len", &inner.heap.len())
            .field("capacity", &self.capacity)
            .field("state", &inner.state)
            .finish_non_exhaustive()
    }
}
