//! Tests for builder modules

use std::collections::HashMap;

use prometheus_task_queue::builders::build_pools;
use prometheus_task_queue::config::{QueueConfig, SchedulerConfig};
use prometheus_task_queue::core::SchedulerError;
use prometheus_task_queue::util::Priority;

#[test]
fn test_build_pools_one_per_queue() {
    let cfg = SchedulerConfig::from_json_str(
        r#"{
            "queues": {
                "ingest": { "workers": 1, "size": 8 },
                "background": { "workers": 1, "priority": "low" }
            }
        }"#,
    )
    .unwrap();

    let pools = build_pools(&cfg).unwrap();
    assert_eq!(pools.len(), 2);
    assert_eq!(pools["ingest"].config().size, 8);
    assert_eq!(pools["background"].policy().priority("any"), Priority::Low);
    assert_eq!(pools["ingest"].queued(), 0);
}

#[test]
fn test_build_pools_applies_defaults() {
    let mut queues = HashMap::new();
    queues.insert("default".to_string(), QueueConfig::new().with_workers(2));

    let pools = build_pools(&SchedulerConfig { queues }).unwrap();
    assert_eq!(pools["default"].config().size, 128);
    assert_eq!(pools["default"].config().timeout_secs, 30);
}

#[test]
fn test_build_pools_requires_a_queue() {
    assert!(matches!(
        build_pools(&SchedulerConfig::default()),
        Err(SchedulerError::InvalidConfig(_))
    ));
}
