//! Bookings submitted to the data-ingestor service, served by a live producer

use crate::test_utils::{eventually, free_udp_port, TestIngestor, TestProducer};
use chrono::{Duration as ChronoDuration, Utc};
use groundlink_core::TelemetryPacket;
use groundlink_ingest::PacketBuffer;
use serde_json::{json, Value};
use std::time::Duration;

async fn bookings(ingestor: &TestIngestor) -> Value {
    reqwest::get(format!("{}/scheduler/", ingestor.base_url))
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_booked_window_completes_with_buffered_packets() {
    let producer = TestProducer::spawn(10, Duration::from_millis(10)).await;
    let ingestor = TestIngestor::spawn(&producer.base_url, free_udp_port()).await;
    let start = Utc::now() + ChronoDuration::seconds(1);

    let response = reqwest::Client::new()
        .post(format!("{}/scheduler/", ingestor.base_url))
        .json(&json!({
            "ship_name": "Rocinante",
            "start_time": start,
            "duration": 2
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let booking: Value = response.json().await.unwrap();
    assert_eq!(booking["status"]["state"], "scheduled");

    let ingestor = &ingestor;
    let completed = eventually(Duration::from_secs(8), move || async move {
        bookings(ingestor).await[0]["status"]["state"] == "completed"
    })
    .await;
    assert!(
        completed,
        "booking did not complete: {}",
        bookings(ingestor).await
    );

    let listed = bookings(ingestor).await;
    assert_eq!(listed[0]["id"], booking["id"]);
    let stored = listed[0]["status"]["stored"].as_u64().unwrap();
    assert!(stored >= 1, "no packets reported stored");

    assert_eq!(ingestor.buffer.len("Rocinante").await.unwrap() as u64, stored);
    for entry in ingestor.buffer.entries("Rocinante").await {
        TelemetryPacket::decode(&entry).expect("valid telemetry record");
    }

    let registry = &producer.state.registry;
    let released = eventually(Duration::from_secs(2), move || async move {
        registry.is_empty()
    })
    .await;
    assert!(released, "producer session outlived the window");
}

#[tokio::test]
async fn test_healthcheck_follows_producer_availability() {
    let producer = TestProducer::spawn(2, Duration::from_millis(10)).await;
    let healthy = TestIngestor::spawn(&producer.base_url, free_udp_port()).await;

    let response = reqwest::get(format!("{}/healthcheck/", healthy.base_url))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["dependencies"]["spaceship"], "ok");

    let closed = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let dead_url = format!("http://{}", closed.local_addr().unwrap());
    drop(closed);
    let degraded = TestIngestor::spawn(&dead_url, free_udp_port()).await;

    let response = reqwest::get(format!("{}/healthcheck/", degraded.base_url))
        .await
        .unwrap();
    assert_eq!(response.status(), 503);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Service is degraded.");
    assert_eq!(body["dependencies"]["packet_buffer"], "ok");
}
