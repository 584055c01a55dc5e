//! Test helpers for gateway integration tests
//!
//! - [`RecordingBus`]: an in-process [`BusClient`] that records what it is sent
//! - [`TestGateway`]: a fully wired router over a temporary upload directory
//! - request builders for multipart uploads and JSON bodies

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, Response},
    Router,
};
use gateway_common::MessageBatch;
use gateway_server::{
    api::{create_router, AppState},
    bus::{BusClient, BusError},
    config::Config,
};
use serde_json::Value;
use std::{
    path::Path,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};
use tempfile::TempDir;

pub const BOUNDARY: &str = "gateway-test-boundary";

/// Message bus double
#[derive(Default)]
pub struct RecordingBus {
    pub connects: AtomicUsize,
    pub disconnects: AtomicUsize,
    pub fail_connect: AtomicBool,
    pub fail_publish: AtomicBool,
    pub connect_delay: Mutex<Option<Duration>>,
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingBus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn refusing_connections() -> Arc<Self> {
        let bus = Self::default();
        bus.fail_connect.store(true, Ordering::SeqCst);
        Arc::new(bus)
    }

    pub fn rejecting_publishes() -> Arc<Self> {
        let bus = Self::default();
        bus.fail_publish.store(true, Ordering::SeqCst);
        Arc::new(bus)
    }

    pub fn slow_to_connect(delay: Duration) -> Arc<Self> {
        let bus = Self::default();
        *bus.connect_delay.lock().unwrap() = Some(delay);
        Arc::new(bus)
    }

    /// Payloads published so far, in order
    pub fn payloads(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|(_, payload)| payload.clone()).collect()
    }

    /// Published payloads decoded as JSON
    pub fn published_json(&self) -> Vec<Value> {
        self.payloads()
            .iter()
            .map(|p| serde_json::from_str(p).unwrap())
            .collect()
    }

    pub fn topics(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|(topic, _)| topic.clone()).collect()
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BusClient for RecordingBus {
    async fn connect(&self) -> Result<(), BusError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let delay = *self.connect_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(BusError::Connect("broker unreachable".to_string()));
        }
        Ok(())
    }

    async fn send_batch(&self, topic: &str, batch: &MessageBatch) -> Result<usize, BusError> {
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(BusError::Publish(format!(
                "{} of {} messages were not acknowledged: queue full",
                batch.len(),
                batch.len()
            )));
        }
        let mut sent = self.sent.lock().unwrap();
        for message in batch.messages() {
            sent.push((topic.to_string(), message.payload().to_string()));
        }
        Ok(batch.len())
    }

    async fn disconnect(&self) -> Result<(), BusError> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Configuration pointing at local test doubles
pub fn test_config(upload_dir: &Path, hdfs_url: &str, spark_url: &str) -> Config {
    let mut config = Config::default();
    config.ingest.upload_dir = upload_dir.to_path_buf();
    config.ingest.timeout_secs = 5;
    config.hdfs.url = hdfs_url.to_string();
    config.hdfs.timeout_secs = 5;
    config.spark.master_url = spark_url.to_string();
    config.spark.timeout_secs = 5;
    config
}

/// A wired gateway whose uploads land in a private temporary directory
pub struct TestGateway {
    pub upload_dir: TempDir,
    pub bus: Arc<RecordingBus>,
    pub state: AppState,
    pub config: Config,
}

impl TestGateway {
    pub fn new(bus: Arc<RecordingBus>) -> Self {
        Self::with_upstreams(bus, "http://127.0.0.1:9", "http://127.0.0.1:9")
    }

    pub fn with_upstreams(bus: Arc<RecordingBus>, hdfs_url: &str, spark_url: &str) -> Self {
        let upload_dir = tempfile::tempdir().unwrap();
        let config = test_config(upload_dir.path(), hdfs_url, spark_url);
        let state = AppState::new(&config, bus.clone()).unwrap();
        Self {
            upload_dir,
            bus,
            state,
            config,
        }
    }

    pub fn router(&self) -> Router {
        create_router(self.state.clone(), &self.config)
    }

    /// Number of files left in the upload directory
    pub fn leftover_uploads(&self) -> usize {
        std::fs::read_dir(self.upload_dir.path()).unwrap().count()
    }
}

/// Multipart request carrying `content` in a field called `field`
pub fn multipart_upload(uri: &str, field: &str, content: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"cities.csv\"\r\n",
            field
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: text/csv\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
