// tests/event_hub.rs

use std::collections::BTreeMap;
use std::time::Duration;

use squadron::events::{
    format_event_frame, spawn_push_stream, EngineEvent, EventHub, EventPayload, KEEPALIVE_FRAME,
};
use squadron::types::AgentRole;
use squadron_test_utils::builders::{blueprint, orchestrator, vars, TaskBuilder, TemplateBuilder};
use squadron_test_utils::{drain_kinds, init_tracing, with_timeout, TestResult};
use tokio::sync::mpsc;

fn completed_event(id: &str) -> EngineEvent {
    EngineEvent::new(EventPayload::TaskCompleted(TaskBuilder::new(id).build()))
}

#[test]
fn test_every_observer_receives_until_unsubscribed() {
    init_tracing();
    let hub = EventHub::new();
    let mut first = hub.subscribe();
    let mut second = hub.subscribe();

    assert_eq!(hub.publish(completed_event("t1")), 2);
    assert_eq!(first.try_recv().unwrap().task().unwrap().id, "t1");
    assert_eq!(second.try_recv().unwrap().task().unwrap().id, "t1");

    assert!(hub.unsubscribe(first.id()));
    assert!(!hub.unsubscribe(first.id()));

    assert_eq!(hub.publish(completed_event("t2")), 1);
    assert!(first.try_recv().is_none());
    assert_eq!(second.try_recv().unwrap().task().unwrap().id, "t2");
}

#[test]
fn test_dropping_subscription_unsubscribes() {
    let hub = EventHub::new();
    let sub = hub.subscribe();
    let other = hub.subscribe();
    assert_eq!(hub.subscriber_count(), 2);

    drop(sub);
    assert_eq!(hub.subscriber_count(), 1);

    other.unsubscribe();
    assert_eq!(hub.subscriber_count(), 0);
    assert_eq!(hub.publish(completed_event("t")), 0);
}

#[test]
fn test_stalled_observer_keeps_every_event() {
    let hub = EventHub::new();
    let mut fast = hub.subscribe();
    let mut stalled = hub.subscribe();

    for i in 0..1000 {
        assert_eq!(hub.publish(completed_event(&format!("t{i}"))), 2);
        assert!(fast.try_recv().is_some());
    }

    let got = stalled.drain();
    assert_eq!(got.len(), 1000);
    assert_eq!(got[0].task().unwrap().id, "t0");
    assert_eq!(got[999].task().unwrap().id, "t999");
    assert_eq!(hub.subscriber_count(), 2);
}

#[test]
fn test_large_squad_events_all_reach_an_undrained_observer() -> TestResult {
    let mut engine = orchestrator(BTreeMap::new());
    let mut observer = engine.subscribe();

    let subjects: Vec<String> = (0..300).map(|i| format!("T{i}")).collect();
    let template = TemplateBuilder::new("wide")
        .parallel(
            subjects
                .iter()
                .map(|s| blueprint(AgentRole::Backend, s))
                .collect(),
        )
        .build();

    let squad = engine.create_squad(&template, &vars(&[]))?;
    engine.start_squad(&squad.id)?;

    let kinds = drain_kinds(&mut observer);
    let count = |kind: &str| kinds.iter().filter(|k| **k == kind).count();
    assert_eq!(count("task_created"), 300);
    assert_eq!(count("squad_created"), 1);
    assert_eq!(count("squad_started"), 1);
    assert_eq!(count("task_started"), 300);
    assert_eq!(kinds.last(), Some(&"squad_updated"));
    Ok(())
}

#[test]
fn test_event_serializes_as_tagged_union() {
    let event = completed_event("t1");
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["event"]["type"], "task_completed");
    assert_eq!(json["event"]["data"]["id"], "t1");
    assert!(json["timestamp"].is_string());

    let frame = format_event_frame(&event).unwrap();
    assert!(frame.starts_with("event: task_completed\ndata: {"));
    assert!(frame.ends_with("\n\n"));
}

#[tokio::test]
async fn test_subscription_recv_waits_for_publish() {
    let hub = EventHub::new();
    let mut sub = hub.subscribe();

    let publisher = hub.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        publisher.publish(completed_event("later"));
    });

    let event = with_timeout(sub.recv()).await.unwrap();
    assert_eq!(event.kind(), "task_completed");
}

#[tokio::test]
async fn test_push_stream_forwards_frames_and_keepalive() {
    let hub = EventHub::new();
    let (tx, mut rx) = mpsc::channel(16);
    let stream = spawn_push_stream(&hub, tx, Duration::from_millis(50));
    assert_eq!(hub.subscriber_count(), 1);

    hub.publish(completed_event("t1"));
    let frame = with_timeout(rx.recv()).await.unwrap();
    assert!(frame.starts_with("event: task_completed\n"));

    let idle = with_timeout(rx.recv()).await.unwrap();
    assert_eq!(idle, KEEPALIVE_FRAME);

    stream.close();
    assert!(with_timeout(rx.recv()).await.is_none());

    with_timeout(async {
        while hub.subscriber_count() > 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
}

#[tokio::test]
async fn test_push_stream_ends_when_listener_goes_away() {
    let hub = EventHub::new();
    let (tx, rx) = mpsc::channel(1);
    let stream = spawn_push_stream(&hub, tx, Duration::from_secs(30));

    drop(rx);
    hub.publish(completed_event("t1"));

    with_timeout(async {
        while !stream.is_finished() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert_eq!(hub.subscriber_count(), 0);
}
