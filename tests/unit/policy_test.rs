//! Tests for preset resolution

use std::time::Duration;

use prometheus_task_queue::config::{PresetConfig, QueueConfig};
use prometheus_task_queue::core::policy::{timeout_for_priority, MAX_TASK_TIMEOUT, MIN_TASK_TIMEOUT};
use prometheus_task_queue::core::PresetPolicy;
use prometheus_task_queue::util::Priority;

fn policy() -> PresetPolicy {
    let cfg = QueueConfig::new()
        .with_timeout_secs(40)
        .with_priority(Priority::Normal)
        .with_preset("alerts", PresetConfig::with_priority(Priority::High))
        .with_preset("bulk", PresetConfig::with_priority(Priority::Low).timeout_secs(10))
        .with_defaults();
    PresetPolicy::from_config(&cfg)
}

#[test]
fn test_preset_priority_override() {
    let policy = policy();
    assert_eq!(policy.priority("alerts"), Priority::High);
    assert_eq!(policy.priority("bulk"), Priority::Low);
    assert_eq!(policy.priority("unknown"), Priority::Normal);
}

#[test]
fn test_preset_timeouts_scale_and_clamp() {
    let policy = policy();
    // 40s / 2
    assert_eq!(policy.timeout("alerts"), Duration::from_secs(20));
    // 10s * 2
    assert_eq!(policy.timeout("bulk"), Duration::from_secs(20));
    assert_eq!(policy.timeout("unknown"), Duration::from_secs(40));
}

#[test]
fn test_timeout_bounds() {
    for priority in Priority::ALL {
        for base in [1, 30, 600] {
            let timeout = timeout_for_priority(priority, Duration::from_secs(base));
            assert!(timeout >= MIN_TASK_TIMEOUT && timeout <= MAX_TASK_TIMEOUT);
        }
    }
}

#[test]
fn test_promotion_rules_from_base_timeout() {
    let rules = policy().promotion_rules();
    assert_eq!(rules.len(), 2);
    assert_eq!(rules[&Priority::Low].after, Duration::from_secs(40));
    assert_eq!(rules[&Priority::Low].target, Priority::Normal);
    assert_eq!(rules[&Priority::Normal].after, Duration::from_secs(80));
    assert_eq!(rules[&Priority::Normal].target, Priority::High);
}
