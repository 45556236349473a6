//! Tests for configuration validation

use prometheus_task_queue::config::{PresetConfig, QueueConfig, SchedulerConfig};
use prometheus_task_queue::util::Priority;

#[test]
fn test_queue_config_validation() {
    let valid = QueueConfig::new()
        .with_workers(2)
        .with_size(100)
        .with_timeout_secs(30);
    assert!(valid.validate().is_ok());
}

#[test]
fn test_queue_config_zero_values_invalid_until_defaulted() {
    let cfg = QueueConfig::new();
    assert!(cfg.validate().is_err());
    assert!(cfg.with_defaults().validate().is_ok());
}

#[test]
fn test_queue_config_from_json() {
    let json = r#"{
        "workers": 4,
        "timeout_secs": 20,
        "priority": "low",
        "presets": {
            "alerts": { "priority": "immediate" },
            "reports": { "timeout_secs": 90 }
        }
    }"#;

    let cfg = QueueConfig::from_json_str(json).unwrap();
    assert_eq!(cfg.workers, 4);
    assert_eq!(cfg.size, 256);
    assert_eq!(cfg.timeout_secs, 20);
    assert_eq!(cfg.priority, Priority::Low);
    assert_eq!(
        cfg.presets["alerts"],
        PresetConfig::with_priority(Priority::Immediate)
    );
    assert_eq!(cfg.presets["reports"].priority, None);
    assert_eq!(cfg.presets["reports"].timeout_secs, 90);
}

#[test]
fn test_queue_config_rejects_unknown_priority() {
    let err = QueueConfig::from_json_str(r#"{ "priority": "urgent" }"#).unwrap_err();
    assert!(err.starts_with("parse error"));
}

#[test]
fn test_queue_config_from_env() {
    std::env::set_var("TASK_QUEUE_WORKERS", "3");
    std::env::set_var("TASK_QUEUE_SIZE", "12");
    std::env::set_var("TASK_QUEUE_PRIORITY", "High");
    std::env::remove_var("TASK_QUEUE_TIMEOUT_SECS");

    let cfg = QueueConfig::from_env().unwrap();
    assert_eq!(cfg.workers, 3);
    assert_eq!(cfg.size, 12);
    assert_eq!(cfg.timeout_secs, 30);
    assert_eq!(cfg.priority, Priority::High);

    std::env::set_var("TASK_QUEUE_SIZE", "many");
    let err = QueueConfig::from_env().unwrap_err();
    assert!(err.contains("TASK_QUEUE_SIZE"));

    for name in ["TASK_QUEUE_WORKERS", "TASK_QUEUE_SIZE", "TASK_QUEUE_PRIORITY"] {
        std::env::remove_var(name);
    }
}

#[test]
fn test_scheduler_config_empty_queues() {
    assert!(SchedulerConfig::default().validate().is_err());
}

#[test]
fn test_scheduler_config_from_json() {
    let json = r#"{
        "queues": {
            "ingest": { "workers": 2, "size": 10 },
            "background": { "workers": 1, "priority": "low" }
        }
    }"#;

    let cfg = SchedulerConfig::from_json_str(json).unwrap();
    assert_eq!(cfg.queues.len(), 2);
    assert_eq!(cfg.queues["ingest"].size, 10);
    assert_eq!(cfg.queues["background"].size, 64);
    assert_eq!(cfg.queues["background"].timeout_secs, 30);
}
