//! Session registry tests
//!
//! Concurrent registration, routing of delivered messages to the right
//! channel, and single removal under racing closes.

use futures::StreamExt;
use pretty_assertions::assert_eq;
use rmcp::model::ClientJsonRpcMessage;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use toolgate_gateway::{ChannelError, SessionRegistry, SseChannel};

fn notification(method: &str) -> ClientJsonRpcMessage {
    serde_json::from_value(serde_json::json!({"jsonrpc": "2.0", "method": method})).unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_registrations_get_distinct_ids() {
    let registry = SessionRegistry::new();

    let tasks = (0..64).map(|_| {
        let registry = registry.clone();
        tokio::spawn(async move {
            let (channel, io, rx) = SseChannel::open(4);
            let id = registry.register(channel);
            (id, io, rx)
        })
    });
    let opened: Vec<_> = futures::future::join_all(tasks)
        .await
        .into_iter()
        .map(Result::unwrap)
        .collect();

    let ids: HashSet<_> = opened.iter().map(|(id, _, _)| id.clone()).collect();
    assert_eq!(ids.len(), 64);
    assert_eq!(registry.len(), 64);
    assert_eq!(registry.session_ids().into_iter().collect::<HashSet<_>>(), ids);
}

#[tokio::test]
async fn test_messages_reach_only_their_channel() {
    let registry = SessionRegistry::new();
    let (first, first_io, _first_rx) = SseChannel::open(4);
    let (second, second_io, _second_rx) = SseChannel::open(4);
    let first_id = registry.register(first);
    let second_id = registry.register(second);

    registry
        .lookup(&second_id)
        .unwrap()
        .deliver(notification("notifications/initialized"))
        .await
        .unwrap();

    let (_, mut second_inbound, _) = second_io.into_parts();
    let (_, mut first_inbound, _) = first_io.into_parts();

    let received = tokio::time::timeout(Duration::from_secs(1), second_inbound.next())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        serde_json::to_value(&received).unwrap()["method"],
        "notifications/initialized"
    );

    let nothing = tokio::time::timeout(Duration::from_millis(100), first_inbound.next()).await;
    assert!(nothing.is_err(), "first channel received a message");
    assert!(registry.lookup(&first_id).is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_closes_remove_once() {
    let registry = SessionRegistry::new();
    let (channel, _io, _rx) = SseChannel::open(4);
    let id = registry.register(channel);
    let session = registry.lookup(&id).unwrap();

    let closes = (0..16).map(|_| {
        let session = session.clone();
        tokio::spawn(async move { session.close() })
    });
    let winners = futures::future::join_all(closes)
        .await
        .into_iter()
        .filter(|closed| *closed.as_ref().unwrap())
        .count();

    assert_eq!(winners, 1);
    assert!(registry.is_empty());
    assert!(matches!(
        session.deliver(notification("notifications/initialized")).await,
        Err(ChannelError::Closed)
    ));
}

#[tokio::test]
async fn test_close_all_ends_engine_streams() {
    let registry = SessionRegistry::new();
    let mut inbounds = Vec::new();
    for _ in 0..3 {
        let (channel, io, _rx) = SseChannel::open(4);
        registry.register(channel);
        let (_, inbound, closer) = io.into_parts();
        inbounds.push((inbound, closer));
    }

    assert_eq!(registry.close_all(), 3);
    assert!(registry.is_empty());

    for (mut inbound, closer) in inbounds {
        assert!(closer.is_closed());
        let end = tokio::time::timeout(Duration::from_secs(1), inbound.next())
            .await
            .unwrap();
        assert!(end.is_none());
    }
}

#[tokio::test]
async fn test_registry_handles_share_state() {
    let registry = SessionRegistry::new();
    let clone = Arc::new(registry.clone());
    let (channel, _io, _rx) = SseChannel::open(4);
    let id = clone.register(channel);

    assert!(registry.lookup(&id).is_some());
    registry.lookup(&id).unwrap().close();
    assert!(clone.is_empty());
}
