//! Configuration models for queues, presets, and timeouts.

pub mod pool;

pub use pool::{PresetConfig, QueueConfig, SchedulerConfig};
