//! Control-plane client against the real producer router

use crate::test_utils::{eventually, TestProducer};
use groundlink_control::{ControlError, Retryable};
use groundlink_core::{Destination, SessionToken};
use groundlink_stream::PacketReceiver;
use serde_json::Value;
use std::time::Duration;

async fn health(producer: &TestProducer) -> Value {
    reqwest::get(format!("{}/healthcheck/", producer.base_url))
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_stop_never_created_token_is_not_found() {
    let producer = TestProducer::spawn(2, Duration::from_millis(10)).await;
    let client = producer.client();

    let err = client.request_stop(&SessionToken::new()).await.unwrap_err();
    assert!(matches!(err, ControlError::NotFound { .. }));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn test_second_stop_is_not_found() {
    let producer = TestProducer::spawn(2, Duration::from_millis(10)).await;
    let client = producer.client();
    let receiver = PacketReceiver::bind("127.0.0.1:0").await.unwrap();
    let port = receiver.local_addr().unwrap().port();

    let token = client
        .request_start(&Destination::new("127.0.0.1", port))
        .await
        .unwrap();
    client.request_stop(&token).await.unwrap();
    assert!(
        producer
            .state
            .registry
            .wait_removed(&token, Duration::from_secs(2))
            .await
    );

    let err = client.request_stop(&token).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_saturated_gate_admits_waiter_after_stop() {
    let producer = TestProducer::spawn(2, Duration::from_millis(10)).await;
    let client = producer.client();
    let receiver = PacketReceiver::bind("127.0.0.1:0").await.unwrap();
    let destination = Destination::new("127.0.0.1", receiver.local_addr().unwrap().port());

    let producer = &producer;
    let mut tokens = Vec::new();
    for _ in 0..3 {
        tokens.push(client.request_start(&destination).await.unwrap());
    }

    let saturated = eventually(Duration::from_secs(2), move || async move {
        let body = health(producer).await;
        body["running"] == 2 && body["waiting"] == 1
    })
    .await;
    assert!(saturated, "expected 2 running and 1 waiting: {}", health(producer).await);
    assert_eq!(client.active_sessions().await.unwrap().len(), 3);

    client.request_stop(&tokens[0]).await.unwrap();

    let admitted = eventually(Duration::from_secs(1), move || async move {
        let body = health(producer).await;
        body["running"] == 2 && body["waiting"] == 0
    })
    .await;
    assert!(admitted, "waiter not admitted: {}", health(producer).await);

    for token in &tokens[1..] {
        client.request_stop(token).await.unwrap();
    }
    assert_eq!(producer.state.registry.shutdown(Duration::from_secs(2)).await, 0);
}
