//! Tests for utility types

use prometheus_task_queue::util::Priority;

#[test]
fn test_priority_ordering() {
    assert!(Priority::Immediate < Priority::High);
    assert!(Priority::High < Priority::Retry);
    assert!(Priority::Retry < Priority::Normal);
    assert!(Priority::Normal < Priority::Low);
    assert!(Priority::Retry.is_more_urgent_than(Priority::Normal));
    assert!(!Priority::Retry.is_more_urgent_than(Priority::High));
}

#[test]
fn test_priority_default_is_normal() {
    assert_eq!(Priority::default(), Priority::Normal);
}

#[test]
fn test_priority_parse_and_display() {
    for priority in Priority::ALL {
        assert_eq!(priority.to_string().parse::<Priority>(), Ok(priority));
    }
    assert_eq!("LOW".parse::<Priority>(), Ok(Priority::Low));
    assert!("critical".parse::<Priority>().is_err());
}

#[test]
fn test_priority_serde_lowercase() {
    let json = serde_json::to_string(&Priority::Immediate).unwrap();
    assert_eq!(json, "\"immediate\"");
    let parsed: Priority = serde_json::from_str("\"retry\"").unwrap();
    assert_eq!(parsed, Priority::Retry);
}
