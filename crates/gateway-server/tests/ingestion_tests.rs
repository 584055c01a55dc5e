//! Integration tests for the ingestion pipeline
//!
//! These tests verify:
//! - N data rows publish exactly N messages, in order
//! - The temporary upload is gone after every outcome
//! - Concurrent ingestions share a single bus connect

use gateway_server::{
    bus::{BusClient, BusError, ConnectionManager},
    ingest::{
        DecodeError, DecoderOptions, IngestReport, IngestStage, IngestionError,
        IngestionPipeline, MalformedRowPolicy, UploadedFile,
    },
};
use serde_json::json;
use std::{path::PathBuf, sync::Arc, time::Duration};
use tempfile::TempDir;

mod helpers;
use helpers::RecordingBus;

struct Fixture {
    dir: TempDir,
    bus: Arc<RecordingBus>,
    pipeline: IngestionPipeline,
}

impl Fixture {
    fn new(bus: Arc<RecordingBus>) -> Self {
        Self::with(bus, DecoderOptions::default(), Some(Duration::from_secs(5)))
    }

    fn with(bus: Arc<RecordingBus>, options: DecoderOptions, timeout: Option<Duration>) -> Self {
        let connection = Arc::new(ConnectionManager::new(bus.clone() as Arc<dyn BusClient>));
        Self {
            dir: tempfile::tempdir().unwrap(),
            bus,
            pipeline: IngestionPipeline::new(connection, "total-population", options, timeout),
        }
    }

    fn upload(&self, name: &str, content: &[u8]) -> (UploadedFile, PathBuf) {
        let path = self.dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        (UploadedFile::new(&path), path)
    }
}

#[tokio::test]
async fn test_rows_publish_in_order() {
    let fixture = Fixture::new(RecordingBus::new());
    let (upload, path) = fixture.upload(
        "cities.csv",
        b"name,population\nParis,2000000\nLyon,500000\nMarseille,870000\n",
    );

    let report = fixture.pipeline.ingest(upload).await.unwrap();

    assert_eq!(report, IngestReport { published: 3, skipped: 0 });
    assert_eq!(
        fixture.bus.published_json(),
        vec![
            json!({ "name": "Paris", "population": "2000000" }),
            json!({ "name": "Lyon", "population": "500000" }),
            json!({ "name": "Marseille", "population": "870000" }),
        ]
    );
    assert!(!path.exists());
}

#[tokio::test]
async fn test_messages_keep_header_order() {
    let fixture = Fixture::new(RecordingBus::new());
    let (upload, _) = fixture.upload("order.csv", b"zeta,alpha\n1,2\n");

    fixture.pipeline.ingest(upload).await.unwrap();

    assert_eq!(fixture.bus.payloads(), vec![r#"{"zeta":"1","alpha":"2"}"#.to_string()]);
}

#[tokio::test]
async fn test_header_only_upload_publishes_nothing() {
    let fixture = Fixture::new(RecordingBus::new());
    let (upload, path) = fixture.upload("empty.csv", b"name,population\n");

    let report = fixture.pipeline.ingest(upload).await.unwrap();

    assert_eq!(report.published, 0);
    assert!(fixture.bus.payloads().is_empty());
    assert_eq!(fixture.bus.connect_count(), 1);
    assert!(!path.exists());
}

#[tokio::test]
async fn test_malformed_rows_are_skipped_by_default() {
    let fixture = Fixture::new(RecordingBus::new());
    let (upload, path) =
        fixture.upload("ragged.csv", b"name,population\nParis,2000000\nLyon\nNice,340000\n");

    let report = fixture.pipeline.ingest(upload).await.unwrap();

    assert_eq!(report, IngestReport { published: 2, skipped: 1 });
    assert!(!path.exists());
}

#[tokio::test]
async fn test_strict_policy_fails_without_publishing() {
    let options = DecoderOptions {
        malformed_rows: MalformedRowPolicy::Reject,
        ..DecoderOptions::default()
    };
    let fixture = Fixture::with(RecordingBus::new(), options, None);
    let (upload, path) =
        fixture.upload("ragged.csv", b"name,population\nParis,2000000\nLyon\n");

    let err = fixture.pipeline.ingest(upload).await.unwrap_err();

    assert!(matches!(err, IngestionError::Decode(DecodeError::MalformedRow(_))));
    assert_eq!(err.stage(), Some(IngestStage::Decoding));
    assert!(fixture.bus.payloads().is_empty());
    assert!(!path.exists());
}

#[tokio::test]
async fn test_decode_failure_cleans_up() {
    let fixture = Fixture::new(RecordingBus::new());
    let (upload, path) = fixture.upload("bad.csv", b"\xff\xfe,population\nParis,2000000\n");

    let err = fixture.pipeline.ingest(upload).await.unwrap_err();

    assert!(matches!(err, IngestionError::Decode(DecodeError::Header { column: 0 })));
    assert_eq!(fixture.bus.connect_count(), 0);
    assert!(!path.exists());
}

#[tokio::test]
async fn test_missing_upload_is_a_decode_failure() {
    let fixture = Fixture::new(RecordingBus::new());
    let upload = UploadedFile::new(fixture.dir.path().join("vanished.csv"));

    let err = fixture.pipeline.ingest(upload).await.unwrap_err();

    assert!(matches!(err, IngestionError::Decode(DecodeError::Open(_))));
}

#[tokio::test]
async fn test_connect_failure_cleans_up() {
    let fixture = Fixture::new(RecordingBus::refusing_connections());
    let (upload, path) = fixture.upload("cities.csv", b"name,population\nParis,2000000\n");

    let err = fixture.pipeline.ingest(upload).await.unwrap_err();

    assert!(matches!(err, IngestionError::Connect(BusError::Connect(_))));
    assert_eq!(err.stage(), Some(IngestStage::Connecting));
    assert!(fixture.bus.payloads().is_empty());
    assert!(!path.exists());
}

#[tokio::test]
async fn test_publish_failure_cleans_up() {
    let fixture = Fixture::new(RecordingBus::rejecting_publishes());
    let (upload, path) = fixture.upload("cities.csv", b"name,population\nParis,2000000\n");

    let err = fixture.pipeline.ingest(upload).await.unwrap_err();

    assert!(matches!(err, IngestionError::Publish(BusError::Publish(_))));
    assert_eq!(err.stage(), Some(IngestStage::Publishing));
    assert!(!path.exists());
}

#[tokio::test]
async fn test_timeout_cleans_up() {
    let fixture = Fixture::with(
        RecordingBus::slow_to_connect(Duration::from_secs(2)),
        DecoderOptions::default(),
        Some(Duration::from_millis(50)),
    );
    let (upload, path) = fixture.upload("cities.csv", b"name,population\nParis,2000000\n");

    let err = fixture.pipeline.ingest(upload).await.unwrap_err();

    assert!(matches!(err, IngestionError::Timeout(_)));
    assert_eq!(err.stage(), None);
    assert!(fixture.bus.payloads().is_empty());
    assert!(!path.exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_ingestions_connect_once() {
    let bus = RecordingBus::slow_to_connect(Duration::from_millis(100));
    let fixture = Arc::new(Fixture::new(bus));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let fixture = Arc::clone(&fixture);
            tokio::spawn(async move {
                let (upload, path) = fixture.upload(
                    &format!("upload-{}.csv", i),
                    format!("id,value\n{},row\n", i).as_bytes(),
                );
                let report = fixture.pipeline.ingest(upload).await.unwrap();
                (report, path)
            })
        })
        .collect();

    for handle in handles {
        let (report, path) = handle.await.unwrap();
        assert_eq!(report.published, 1);
        assert!(!path.exists());
    }
    assert_eq!(fixture.bus.connect_count(), 1);
    assert_eq!(fixture.bus.payloads().len(), 8);
}
