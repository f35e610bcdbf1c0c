//! End-to-end outbox tests: durability across a simulated crash, the
//! notify-driven sweeper thread, and retry of failed publishes.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use serde_json::json;

use eventicle_streams::{
    sweep_outbox, ColdHotConfig, EventClient, EventClientCodec, EventClientConfig, EventOutbox,
    EventicleEvent, InMemoryOutbox, InMemoryStreamClient, JsonCodec, NoopSender, OutboxEventClient,
    OutboxSweeperThread,
};

fn setup() -> (Arc<EventClientConfig>, InMemoryStreamClient, InMemoryOutbox) {
    let config = Arc::new(EventClientConfig::new().with_source("outbox-test"));
    let delegate = InMemoryStreamClient::new(Arc::clone(&config));
    (config, delegate, InMemoryOutbox::new())
}

fn wait_until(mut predicate: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while !predicate() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn emitted_events_survive_a_crash_before_publication() {
    let (config, delegate, outbox) = setup();
    let client = OutboxEventClient::new(
        Arc::clone(&config),
        outbox.clone(),
        NoopSender,
        delegate.clone(),
    );

    client
        .emit(
            vec![
                EventicleEvent::new("OrderCreated", json!({"order": 1})),
                EventicleEvent::new("OrderPaid", json!({"order": 1})),
                EventicleEvent::new("OrderShipped", json!({"order": 1})),
            ],
            "orders",
        )
        .unwrap();

    // Crash before any sweep: only the raw rows survive.
    let surviving_rows = outbox.snapshot();
    drop(client);
    drop(outbox);

    // Restart. The batch is still there, intact, as one entry.
    let restarted = InMemoryOutbox::from_rows(surviving_rows);
    let entries = restarted.read_outbox().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].list.stream, "orders");
    assert_eq!(entries[0].list.events.len(), 3);

    // A sweep after restart publishes it.
    let result = sweep_outbox(&restarted, &delegate, &JsonCodec::new()).unwrap();
    assert_eq!(result.entries_published, 1);
    assert_eq!(result.events_published, 3);
    assert!(restarted.is_empty());
    assert_eq!(delegate.stream_len("orders"), 3);
}

#[test]
fn sweep_removes_entries_only_after_confirmed_publish() {
    let (config, delegate, outbox) = setup();
    let client = OutboxEventClient::new(
        Arc::clone(&config),
        outbox.clone(),
        NoopSender,
        delegate.clone(),
    );
    client
        .emit(vec![EventicleEvent::new("A", json!({}))], "orders")
        .unwrap();
    client
        .emit(vec![EventicleEvent::new("B", json!({}))], "orders")
        .unwrap();

    // Broker down: both entries stay put.
    delegate.set_offline(true);
    let result = sweep_outbox(&outbox, &delegate, &JsonCodec::new()).unwrap();
    assert_eq!(result.entries_published, 0);
    assert_eq!(result.entries_failed, 2);
    assert_eq!(outbox.len(), 2);
    assert_eq!(delegate.stream_len("orders"), 0);

    // Broker back: both publish, outbox drains.
    delegate.set_offline(false);
    let result = sweep_outbox(&outbox, &delegate, &JsonCodec::new()).unwrap();
    assert_eq!(result.entries_published, 2);
    assert!(outbox.is_empty());
    assert_eq!(delegate.stream_len("orders"), 2);
}

#[test]
fn sweeper_thread_publishes_on_notify() {
    let (config, delegate, outbox) = setup();

    // Long poll interval: only the notify can plausibly trigger the sweep
    // inside the test window.
    let sweeper = OutboxSweeperThread::spawn(
        outbox.clone(),
        delegate.clone(),
        config.codec_arc(),
        Duration::from_secs(30),
    );
    let client = OutboxEventClient::new(
        Arc::clone(&config),
        outbox.clone(),
        sweeper.sender(),
        delegate.clone(),
    );

    client
        .emit(
            vec![
                EventicleEvent::new("A", json!({"n": 1})),
                EventicleEvent::new("B", json!({"n": 2})),
            ],
            "orders",
        )
        .unwrap();

    wait_until(|| delegate.stream_len("orders") == 2 && outbox.is_empty());

    let stats = sweeper.stop();
    assert_eq!(delegate.stream_len("orders"), 2);
    assert!(outbox.is_empty());
    assert_eq!(stats.entries_published, 1);
    assert_eq!(stats.events_published, 2);
}

#[test]
fn subscribers_on_the_delegate_see_swept_events() {
    let (config, delegate, outbox) = setup();
    let sweeper = OutboxSweeperThread::spawn(
        outbox.clone(),
        delegate.clone(),
        config.codec_arc(),
        Duration::from_millis(10),
    );
    let client = OutboxEventClient::new(
        Arc::clone(&config),
        outbox,
        sweeper.sender(),
        delegate.clone(),
    );

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let control = client
        .cold_hot_stream(ColdHotConfig::new(
            "orders",
            Box::new(move |event| {
                sink.lock().unwrap().push(event.event_type);
                Ok(())
            }),
            Box::new(|_| {}),
        ))
        .unwrap();

    client
        .emit(vec![EventicleEvent::new("OrderCreated", json!({}))], "orders")
        .unwrap();
    client
        .emit(vec![EventicleEvent::new("OrderPaid", json!({}))], "orders")
        .unwrap();

    wait_until(|| seen.lock().unwrap().len() >= 2);
    control.close();
    sweeper.stop();

    assert_eq!(*seen.lock().unwrap(), vec!["OrderCreated", "OrderPaid"]);
}

#[test]
fn sweeper_retries_until_the_broker_recovers() {
    let (config, delegate, outbox) = setup();
    delegate.set_offline(true);

    let sweeper = OutboxSweeperThread::spawn(
        outbox.clone(),
        delegate.clone(),
        config.codec_arc(),
        Duration::from_millis(5),
    );
    let client = OutboxEventClient::new(
        Arc::clone(&config),
        outbox.clone(),
        sweeper.sender(),
        delegate.clone(),
    );

    // Emit succeeds even though the broker is down: durability is local.
    client
        .emit(vec![EventicleEvent::new("A", json!({}))], "orders")
        .unwrap();
    thread::sleep(Duration::from_millis(30));
    assert_eq!(outbox.len(), 1);
    assert_eq!(delegate.stream_len("orders"), 0);

    delegate.set_offline(false);
    wait_until(|| outbox.is_empty());
    sweeper.stop();

    assert!(outbox.is_empty());
    assert_eq!(delegate.stream_len("orders"), 1);
}

#[test]
fn outbox_emit_stamps_the_configured_source() {
    let (config, delegate, outbox) = setup();
    let client = OutboxEventClient::new(
        Arc::clone(&config),
        outbox.clone(),
        NoopSender,
        delegate.clone(),
    );

    client
        .emit(vec![EventicleEvent::new("A", json!({}))], "orders")
        .unwrap();
    sweep_outbox(&outbox, &delegate, &JsonCodec::new()).unwrap();

    let events = delegate.stream_events("orders");
    assert_eq!(events.len(), 1);
    let decoded = JsonCodec::new().decode(&events[0]).unwrap();
    assert_eq!(decoded.source.as_deref(), Some("outbox-test"));
}
