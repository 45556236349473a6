//! Builders to construct worker pools from configuration.

use std::collections::HashMap;

use tracing::info;

use crate::config::SchedulerConfig;
use crate::core::{SchedulerError, WorkerPool};

/// Build one worker pool per configured queue.
///
/// Zero values in a queue configuration are replaced by their defaults, as
/// in [`WorkerPool::new`]. Pools are returned unstarted.
///
/// # Errors
///
/// - `SchedulerError::InvalidConfig` if no queue is defined or a queue is
///   invalid; the message names the queue
/// - `SchedulerError::Runtime` if a pool's action runtime cannot be built
pub fn build_pools(cfg: &SchedulerConfig) -> Result<HashMap<String, WorkerPool>, SchedulerError> {
    if cfg.queues.is_empty() {
        return Err(SchedulerError::InvalidConfig(
            "at least one queue must be defined".into(),
        ));
    }

    let mut pools = HashMap::with_capacity(cfg.queues.len());
    for (name, queue_cfg) in &cfg.queues {
        let pool = WorkerPool::new(queue_cfg.clone()).map_err(|e| match e {
            SchedulerError::InvalidConfig(msg) => {
                SchedulerError::InvalidConfig(format!("queue `{name}` invalid: {msg}"))
            }
            other => other,
        })?;
        pools.insert(name.clone(), pool);
    }

    info!(queues = pools.len(), "Worker pools built from configuration");
    Ok(pools)
}
