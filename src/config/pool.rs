//! Queue and scheduler configuration structures.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::util::serde::Priority;

/// Base task timeout used when none is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Queue slots per worker used when no size is configured.
pub const DEFAULT_SLOTS_PER_WORKER: usize = 64;

/// Named policy bundle selected at admission time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresetConfig {
    /// Priority override; the queue default applies when absent.
    pub priority: Option<Priority>,
    /// Base timeout override in seconds; 0 keeps the queue default.
    pub timeout_secs: u64,
}

impl PresetConfig {
    /// Preset with a priority override only.
    #[must_use]
    pub const fn with_priority(priority: Priority) -> Self {
        Self {
            priority: Some(priority),
            timeout_secs: 0,
        }
    }

    /// Set the base timeout override.
    #[must_use]
    pub const fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// Configuration for one worker pool and its pending store.
///
/// Zero values mean "use the default"; call [`QueueConfig::with_defaults`]
/// to resolve them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Worker threads. Default: twice the available parallelism.
    pub workers: usize,
    /// Maximum queued tasks. Default: `workers * 64`.
    pub size: usize,
    /// Base task timeout in seconds. Default: 30.
    pub timeout_secs: u64,
    /// Priority for presets without an override.
    pub priority: Priority,
    /// Preset table keyed by preset name.
    pub presets: HashMap<String, PresetConfig>,
}

impl QueueConfig {
    /// Create an empty configuration (all defaults).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the worker count.
    #[must_use]
    pub const fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Set the queue capacity.
    #[must_use]
    pub const fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    /// Set the base timeout in seconds.
    #[must_use]
    pub const fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Set the default priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Register a preset.
    #[must_use]
    pub fn with_preset(mut self, name: impl Into<String>, preset: PresetConfig) -> Self {
        self.presets.insert(name.into(), preset);
        self
    }

    /// Fill every zero value with its default.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        if self.workers == 0 {
            self.workers = num_cpus::get().max(1) * 2;
        }
        if self.size == 0 {
            self.size = self.workers * DEFAULT_SLOTS_PER_WORKER;
        }
        if self.timeout_secs == 0 {
            self.timeout_secs = DEFAULT_TIMEOUT_SECS;
        }
        self
    }

    /// Base timeout as a `Duration`.
    #[must_use]
    pub const fn base_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Heap shrink floor: `max(16, min(size / 8, size / workers))`.
    #[must_use]
    pub fn min_heap_capacity(&self) -> usize {
        let per_worker = self.size / self.workers.max(1);
        (self.size / 8).min(per_worker).max(16)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.workers == 0 {
            return Err("workers must be greater than 0".into());
        }
        if self.size == 0 {
            return Err("size must be greater than 0".into());
        }
        if self.timeout_secs == 0 {
            return Err("timeout_secs must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse a queue configuration from JSON, apply defaults, and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        let cfg = cfg.with_defaults();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from `TASK_QUEUE_*` environment variables, apply defaults, and
    /// validate. Unset variables keep their defaults.
    ///
    /// In local dev, use [`QueueConfig::from_dotenv`] to read a `.env` file first.
    pub fn from_env() -> Result<Self, String> {
        let mut cfg = Self::new();
        if let Some(workers) = env_var("TASK_QUEUE_WORKERS")? {
            cfg.workers = workers;
        }
        if let Some(size) = env_var("TASK_QUEUE_SIZE")? {
            cfg.size = size;
        }
        if let Some(secs) = env_var("TASK_QUEUE_TIMEOUT_SECS")? {
            cfg.timeout_secs = secs;
        }
        if let Some(priority) = env_var("TASK_QUEUE_PRIORITY")? {
            cfg.priority = priority;
        }
        let cfg = cfg.with_defaults();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load a `.env` file from the working directory or its parents, if one
    /// exists, then behave like [`QueueConfig::from_env`]. Variables already
    /// set in the process environment win over the file.
    pub fn from_dotenv() -> Result<Self, String> {
        match dotenvy::dotenv() {
            Ok(_) => {}
            Err(e) if e.not_found() => {}
            Err(e) => return Err(format!("failed to load .env: {e}")),
        }
        Self::from_env()
    }
}

fn env_var<T>(name: &str) -> Result<Option<T>, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|e| format!("environment variable {name} is invalid: {e}")),
        Err(_) => Ok(None),
    }
}

/// Root configuration: one queue per name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Map of queue name to configuration.
    pub queues: HashMap<String, QueueConfig>,
}

impl SchedulerConfig {
    /// Validate all queues and ensure at least one exists.
    pub fn validate(&self) -> Result<(), String> {
        if self.queues.is_empty() {
            return Err("at least one queue must be defined".into());
        }
        for (name, queue) in &self.queues {
            queue
                .validate()
                .map_err(|e| format!("queue `{name}` invalid: {e}"))?;
        }
        Ok(())
    }

    /// Parse scheduler configuration from a JSON string, apply per-queue
    /// defaults, and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let mut cfg: Self =
            serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.queues = cfg
            .queues
            .into_iter()
            .map(|(name, queue)| (name, queue.with_defaults()))
            .collect();
        cfg.validate()?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_zero_values() {
        let cfg = QueueConfig::new().with_workers(3).with_defaults();
        assert_eq!(cfg.workers, 3);
        assert_eq!(cfg.size, 3 * DEFAULT_SLOTS_PER_WORKER);
        assert_eq!(cfg.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(cfg.priority, Priority::Normal);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_default_workers_track_cpus() {
        let cfg = QueueConfig::new().with_defaults();
        assert_eq!(cfg.workers, num_cpus::get().max(1) * 2);
    }

    #[test]
    fn test_min_heap_capacity_floor() {
        let small = QueueConfig::new().with_workers(4).with_size(64);
        assert_eq!(small.min_heap_capacity(), 16);
        let large = QueueConfig::new().with_workers(4).with_size(4096);
        assert_eq!(large.min_heap_capacity(), 512);
    }
}
