//! Tests for lifecycle events and sinks

use std::sync::Arc;
use std::time::Duration;

use prometheus_task_queue::core::{EventSink, InMemoryEventSink, LifecycleEvent};
use prometheus_task_queue::util::Priority;

fn retrying(id: &str, attempt: u32) -> LifecycleEvent {
    LifecycleEvent::Retrying {
        id: id.into(),
        preset: "default".into(),
        attempt,
        max_attempts: 3,
        error: "task failed: io".into(),
        elapsed: Duration::from_millis(12),
    }
}

#[test]
fn test_in_memory_sink_records_in_order() {
    let sink = InMemoryEventSink::new(10);
    sink.record(&retrying("a", 1));
    sink.record(&LifecycleEvent::Promoted {
        id: "b".into(),
        from: Priority::Low,
        to: Priority::Normal,
    });
    sink.record(&retrying("a", 2));

    let names: Vec<_> = sink.events().iter().map(LifecycleEvent::name).collect();
    assert_eq!(names, ["task.retrying", "task.promoted", "task.retrying"]);
    assert_eq!(sink.named("task.retrying").len(), 2);
    assert!(sink.named("task.completed").is_empty());
}

#[test]
fn test_sink_usable_as_trait_object() {
    let sink = Arc::new(InMemoryEventSink::new(4));
    let dyn_sink: Arc<dyn EventSink> = sink.clone();
    dyn_sink.record(&LifecycleEvent::Failed {
        id: "x".into(),
        preset: "default".into(),
        error: "task cancelled".into(),
        elapsed: Duration::ZERO,
    });
    assert_eq!(sink.events()[0].task_id(), "x");
}

#[test]
fn test_events_log_without_subscriber() {
    prometheus_task_queue::util::init_tracing();
    retrying("c", 1).log();
    LifecycleEvent::RetryRejected {
        id: "c".into(),
        preset: "default".into(),
        attempt: 2,
        error: "queue closed".into(),
    }
    .log();
}
