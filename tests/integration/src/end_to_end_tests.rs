//! Scheduled windows running against a live producer endpoint

use crate::test_utils::{eventually, free_udp_port, loopback_ingest, TestProducer};
use chrono::{Duration as ChronoDuration, Utc};
use groundlink_core::{Destination, IngestionWindow, TelemetryPacket};
use groundlink_ingest::{
    BookingStatus, IngestionLoop, IngestionState, MemoryBuffer, PacketBuffer, StopOutcome,
    WindowScheduler,
};
use groundlink_stream::PacketSender;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_rocinante_window_buffers_packets_and_stops_stream() {
    let producer = TestProducer::spawn(10, Duration::from_millis(10)).await;
    let client = producer.client();
    let buffer = Arc::new(MemoryBuffer::new());
    let ingestion = IngestionLoop::new(
        Arc::new(producer.client()),
        buffer.clone(),
        loopback_ingest(free_udp_port()),
    );
    let scheduler = WindowScheduler::new(ingestion);

    let start = Utc::now() + ChronoDuration::seconds(2);
    let booking = scheduler
        .schedule(IngestionWindow::new("Rocinante", start, 5))
        .expect("window accepted");

    let scheduler = &scheduler;
    let client = &client;
    let id = booking.id;

    // Nothing runs before the window opens.
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(producer.state.registry.is_empty());

    let completed = eventually(Duration::from_secs(12), move || async move {
        matches!(
            scheduler.booking(&id).map(|b| b.status),
            Some(BookingStatus::Completed { .. })
        )
    })
    .await;
    assert!(completed, "booking did not complete: {:?}", scheduler.booking(&id));

    let stored = buffer.len("Rocinante").await.unwrap();
    assert!(stored >= 1, "no packets buffered");
    for entry in buffer.entries("Rocinante").await {
        let packet = TelemetryPacket::decode(&entry).expect("valid telemetry record");
        assert_eq!(packet.description, "Battery Voltage");
        assert_eq!(packet.unit, "V");
    }

    let drained = eventually(Duration::from_secs(2), move || async move {
        client.active_sessions().await.map(|t| t.is_empty()).unwrap_or(false)
    })
    .await;
    assert!(drained, "producer still streaming after the window closed");
}

#[tokio::test]
async fn test_known_record_lands_byte_identical() {
    let producer = TestProducer::spawn(10, Duration::from_millis(50)).await;
    let port = free_udp_port();
    let buffer = Arc::new(MemoryBuffer::new());
    let ingestion = IngestionLoop::new(
        Arc::new(producer.client()),
        buffer.clone(),
        loopback_ingest(port),
    );

    let window = IngestionWindow::new("Rocinante", Utc::now(), 2);
    let run = tokio::spawn(async move { ingestion.run(&window).await });

    let packet = TelemetryPacket {
        timestamp: "2024-01-01T00:00:00Z".to_string(),
        description: "Battery Voltage".to_string(),
        value: 12.into(),
        unit: "V".to_string(),
    };
    let wire = packet.encode().unwrap();
    assert_eq!(
        std::str::from_utf8(&wire).unwrap(),
        concat!(
            r#"{"timestamp":"2024-01-01T00:00:00Z","#,
            r#""description":"Battery Voltage","value":12,"unit":"V"}"#
        )
    );

    tokio::time::sleep(Duration::from_millis(500)).await;
    let sender = PacketSender::open(&Destination::new("127.0.0.1", port))
        .await
        .unwrap();
    sender.send(&packet).await.unwrap();

    let report = run.await.unwrap().unwrap();
    assert_eq!(report.stop, StopOutcome::Stopped);
    assert_eq!(report.states.last(), Some(&IngestionState::Done));
    assert!(buffer
        .entries("Rocinante")
        .await
        .iter()
        .any(|entry| entry.as_ref() == wire.as_slice()));
}

#[tokio::test]
async fn test_stream_stopped_early_reports_already_stopped() {
    let producer = TestProducer::spawn(10, Duration::from_millis(20)).await;
    let client = producer.client();
    let buffer = Arc::new(MemoryBuffer::new());
    let ingestion = IngestionLoop::new(
        Arc::new(producer.client()),
        buffer.clone(),
        loopback_ingest(free_udp_port()),
    );

    let window = IngestionWindow::new("Canterbury", Utc::now(), 2);
    let run = tokio::spawn(async move { ingestion.run(&window).await });

    let registry = &producer.state.registry;
    let started = eventually(Duration::from_secs(2), move || async move {
        !registry.is_empty()
    })
    .await;
    assert!(started);
    for token in client.active_sessions().await.unwrap() {
        client.request_stop(&token).await.unwrap();
    }

    let report = run.await.unwrap().unwrap();
    assert_eq!(report.stop, StopOutcome::AlreadyStopped);
    assert_eq!(report.states.last(), Some(&IngestionState::Done));
    assert_eq!(buffer.len("Canterbury").await.unwrap() as u64, report.stored);
}
