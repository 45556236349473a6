//! Array-backed binary min-heap of task records.
//!
//! Ordered by priority, then enqueue time, then store sequence number. No
//! synchronization; the pending store owns the only instance and guards it
//! with its lock.

use std::time::Instant;

use super::task::Task;
use crate::util::serde::Priority;

/// Smallest backing capacity the heap will shrink to.
pub const TASK_HEAP_MIN_CAP: usize = 16;

/// Binary min-heap with in-place re-keying and adaptive shrinking.
#[derive(Debug)]
pub struct TaskHeap {
    tasks: Vec<Task>,
    min_cap: usize,
}

impl Default for TaskHeap {
    fn default() -> Self {
        Self::new(TASK_HEAP_MIN_CAP)
    }
}

impl TaskHeap {
    /// Create an empty heap that never shrinks below `min_cap` slots.
    #[must_use]
    pub fn new(min_cap: usize) -> Self {
        let min_cap = min_cap.max(TASK_HEAP_MIN_CAP);
        Self {
            tasks: Vec::with_capacity(min_cap),
            min_cap,
        }
    }

    /// Number of queued tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the heap holds no tasks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Allocated slots in the backing vector.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.tasks.capacity()
    }

    /// Minimum task without removing it.
    #[must_use]
    pub fn peek(&self) -> Option<&Task> {
        self.tasks.first()
    }

    /// Insert a task.
    pub fn push(&mut self, task: Task) {
        self.tasks.push(task);
        let last = self.tasks.len() - 1;
        self.sift_up(last);
    }

    /// Remove and return the minimum task.
    pub fn pop(&mut self) -> Option<Task> {
        if self.tasks.is_empty() {
            return None;
        }
        let last = self.tasks.len() - 1;
        self.tasks.swap(0, last);
        // Vec::pop moves the record out; no stale handle stays in the slot.
        let task = self.tasks.pop();
        if !self.tasks.is_empty() {
            self.sift_down(0);
        }
        self.maybe_shrink();
        task
    }

    /// Restore heap order after the key at `index` changed in place.
    pub fn fix(&mut self, index: usize) {
        if index >= self.tasks.len() {
            return;
        }
        if !self.sift_up(index) {
            self.sift_down(index);
        }
    }

    /// Rewrite the priority of the task at `index` and re-heapify that slot
    /// in the same step. Returns the previous priority.
    pub(crate) fn promote_at(&mut self, index: usize, to: Priority, now: Instant) -> Priority {
        let from = self.tasks[index].priority();
        self.tasks[index].promote(to, now);
        self.fix(index);
        from
    }

    /// Task at `index` in heap order (not sorted order).
    pub(crate) fn get(&self, index: usize) -> Option<&Task> {
        self.tasks.get(index)
    }

    /// Returns `true` if the element moved.
    fn sift_up(&mut self, mut index: usize) -> bool {
        let start = index;
        while index > 0 {
            let parent = (index - 1) / 2;
            if !self.tasks[index].precedes(&self.tasks[parent]) {
                break;
            }
            self.tasks.swap(index, parent);
            index = parent;
        }
        index != start
    }

    fn sift_down(&mut self, mut index: usize) {
        let len = self.tasks.len();
        loop {
            let left = 2 * index + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let mut smallest = left;
            if right < len && self.tasks[right].precedes(&self.tasks[left]) {
                smallest = right;
            }
            if !self.tasks[smallest].precedes(&self.tasks[index]) {
                break;
            }
            self.tasks.swap(index, smallest);
            index = smallest;
        }
    }

    fn maybe_shrink(&mut self) {
        let capacity = self.tasks.capacity();
        if capacity > self.min_cap && self.tasks.len() < capacity / 4 {
            self.tasks.shrink_to((capacity / 2).max(self.min_cap));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::executor::TaskContext;
    use rand::Rng;
    use std::time::Duration;

    fn task(id: &str, priority: Priority, at: Instant) -> Task {
        Task::new("test", priority, Duration::from_secs(1), |_ctx: TaskContext| async {
            Ok(())
        })
        .with_id(id)
        .with_enqueued_at(at)
    }

    fn drain(heap: &mut TaskHeap) -> Vec<String> {
        std::iter::from_fn(|| heap.pop().map(|t| t.id().to_string())).collect()
    }

    #[test]
    fn test_pops_by_priority() {
        let now = Instant::now();
        let mut heap = TaskHeap::default();
        heap.push(task("low", Priority::Low, now));
        heap.push(task("immediate", Priority::Immediate, now));
        heap.push(task("normal", Priority::Normal, now));
        heap.push(task("retry", Priority::Retry, now));
        heap.push(task("high", Priority::High, now));

        assert_eq!(heap.peek().map(Task::id), Some("immediate"));
        assert_eq!(drain(&mut heap), ["immediate", "high", "retry", "normal", "low"]);
        assert!(heap.pop().is_none());
    }

    #[test]
    fn test_fifo_within_priority() {
        let now = Instant::now();
        let mut heap = TaskHeap::default();
        heap.push(task("c", Priority::Normal, now + Duration::from_millis(3)));
        heap.push(task("a", Priority::Normal, now + Duration::from_millis(1)));
        heap.push(task("b", Priority::Normal, now + Duration::from_millis(2)));

        assert_eq!(drain(&mut heap), ["a", "b", "c"]);
    }

    #[test]
    fn test_fix_after_in_place_promotion() {
        let now = Instant::now();
        let mut heap = TaskHeap::default();
        heap.push(task("normal", Priority::Normal, now));
        heap.push(task("low", Priority::Low, now));
        heap.push(task("high", Priority::High, now));

        let index = (0..heap.len())
            .find(|&i| heap.get(i).map(Task::id) == Some("low"))
            .unwrap();
        let from = heap.promote_at(index, Priority::Immediate, now);

        assert_eq!(from, Priority::Low);
        assert_eq!(drain(&mut heap), ["low", "high", "normal"]);
    }

    #[test]
    fn test_random_input_pops_sorted() {
        let base = Instant::now();
        let mut rng = rand::rng();
        let mut heap = TaskHeap::default();
        for i in 0..200u64 {
            let priority = Priority::ALL[rng.random_range(0..Priority::ALL.len())];
            let at = base + Duration::from_micros(rng.random_range(0..1_000));
            heap.push(task(&i.to_string(), priority, at));
        }

        let mut previous: Option<(Priority, Instant)> = None;
        while let Some(t) = heap.pop() {
            let key = (t.priority(), t.enqueued_at());
            if let Some(prev) = previous {
                assert!(prev <= key, "heap order violated: {prev:?} > {key:?}");
            }
            previous = Some(key);
        }
    }

    #[test]
    fn test_shrinks_after_drain() {
        let now = Instant::now();
        let mut heap = TaskHeap::new(16);
        for i in 0..512 {
            heap.push(task(&i.to_string(), Priority::Normal, now));
        }
        let grown = heap.capacity();
        assert!(grown >= 512);

        while heap.len() > 4 {
            heap.pop();
        }
        assert!(heap.capacity() < grown);
        assert!(heap.capacity() >= 16);
    }
}
