//! Broker link against the in-memory transport, on paused time

use std::sync::Arc;
use std::time::Duration;

use puente_client::{
    BrokerLink, BrokerTransport, InboundMessage, LinkHandle, LinkPolicy, LinkState,
    MemoryTransport, RecordingNotifier, TransportEvent,
};
use shared::JOB_TOPIC;
use tokio::sync::mpsc;

fn spawn_link(
    transport: &MemoryTransport,
    events: mpsc::Receiver<TransportEvent>,
    notifier: Arc<RecordingNotifier>,
) -> (LinkHandle, mpsc::Receiver<InboundMessage>) {
    let (link, inbound) = BrokerLink::new(
        Arc::new(transport.clone()),
        events,
        LinkPolicy::bridge(),
        notifier,
    )
    .subscribe_to(JOB_TOPIC);
    (link.spawn(), inbound)
}

#[tokio::test(start_paused = true)]
async fn test_link_disables_printing_after_max_attempts() {
    let (transport, events) = MemoryTransport::new();
    transport.set_reachable(false);
    let notifier = Arc::new(RecordingNotifier::new());
    let (link, _inbound) = spawn_link(&transport, events, notifier.clone());

    let mut status = link.watch_status();
    status
        .wait_for(|s| s.state == LinkState::Exhausted)
        .await
        .unwrap();

    // Initial attempt plus five retries
    assert_eq!(transport.activations(), 6);
    assert!(notifier.has_title("Impresión deshabilitada"));
    assert!(!link.is_connected());

    // Neither the retry timer nor the health check revive it
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(transport.activations(), 6);

    transport.set_reachable(true);
    link.reconnect();
    status
        .wait_for(|s| s.state == LinkState::Connected)
        .await
        .unwrap();

    assert_eq!(link.status().reconnect_attempts, 0);
    assert!(link.status().connected_since.is_some());
    assert_eq!(transport.subscriptions(), vec![JOB_TOPIC.to_string()]);

    link.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_link_resubscribes_after_connection_loss() {
    let (transport, events) = MemoryTransport::new();
    let notifier = Arc::new(RecordingNotifier::new());
    let (link, mut inbound) = spawn_link(&transport, events, notifier.clone());

    link.watch_status()
        .wait_for(|s| s.state == LinkState::Connected)
        .await
        .unwrap();
    assert!(link.is_connected());

    transport.deliver(JOB_TOPIC, "{\"n\":1}").await;
    let message = inbound.recv().await.unwrap();
    assert_eq!(message.body, "{\"n\":1}");

    transport
        .drop_connection(TransportEvent::WebSocketError("reset".into()))
        .await;
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(link.status().state, LinkState::Connected);
    assert_eq!(link.status().reconnect_attempts, 0);
    assert_eq!(transport.activations(), 2);
    assert_eq!(transport.subscriptions(), vec![JOB_TOPIC.to_string()]);
    assert!(notifier.has_title("Conexión perdida"));
    assert!(notifier.has_title("Reconectando"));

    link.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_messages_on_other_destinations_are_not_forwarded() {
    let (transport, events) = MemoryTransport::new();
    let (link, mut inbound) = spawn_link(&transport, events, Arc::new(RecordingNotifier::new()));

    link.watch_status()
        .wait_for(|s| s.state == LinkState::Connected)
        .await
        .unwrap();

    transport.deliver("/topic/other", "ignored").await;
    transport.deliver(JOB_TOPIC, "first").await;
    transport.deliver(JOB_TOPIC, "second").await;

    assert_eq!(inbound.recv().await.unwrap().body, "first");
    assert_eq!(inbound.recv().await.unwrap().body, "second");

    link.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_suppresses_reconnection() {
    let (transport, events) = MemoryTransport::new();
    let notifier = Arc::new(RecordingNotifier::new());
    let (link, _inbound) = spawn_link(&transport, events, notifier.clone());

    link.watch_status()
        .wait_for(|s| s.state == LinkState::Connected)
        .await
        .unwrap();

    link.begin_shutdown();
    link.reconnect();
    link.shutdown().await;

    assert!(!transport.is_connected());
    assert_eq!(link.status().state, LinkState::ShutDown);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(transport.activations(), 1);
    assert!(!notifier.has_title("Reconectando"));
}
