//! Upload-to-topic ingestion
//!
//! One call to [`IngestionPipeline::ingest`] decodes an uploaded file into a
//! batch, makes sure the bus connection is up, and publishes the batch. The
//! temporary file is deleted when the call finishes, whatever the outcome.

use gateway_common::MessageBatch;
use serde::Serialize;
use std::{fmt, path::Path, sync::Arc, time::Duration};
use thiserror::Error;
use tokio::fs::File;
use tracing::{debug, info, instrument};

use super::decoder::{DecodeError, DecoderOptions, TabularDecoder};
use super::upload::UploadedFile;
use crate::bus::{BusError, ConnectionManager};

/// Stages an ingestion passes through, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStage {
    Decoding,
    Connecting,
    Publishing,
}

impl fmt::Display for IngestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IngestStage::Decoding => "decoding",
            IngestStage::Connecting => "connecting",
            IngestStage::Publishing => "publishing",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum IngestionError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("Bus connection failed: {0}")]
    Connect(BusError),

    #[error("Publishing failed: {0}")]
    Publish(BusError),

    #[error("Ingestion did not finish within {0:?}")]
    Timeout(Duration),
}

impl IngestionError {
    /// Stage the ingestion was in when it failed. A timeout has no stage.
    pub fn stage(&self) -> Option<IngestStage> {
        match self {
            IngestionError::Decode(_) => Some(IngestStage::Decoding),
            IngestionError::Connect(_) => Some(IngestStage::Connecting),
            IngestionError::Publish(_) => Some(IngestStage::Publishing),
            IngestionError::Timeout(_) => None,
        }
    }
}

/// Outcome of a successful ingestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub published: usize,
    pub skipped: usize,
}

pub struct IngestionPipeline {
    connection: Arc<ConnectionManager>,
    topic: String,
    options: DecoderOptions,
    timeout: Option<Duration>,
}

impl IngestionPipeline {
    pub fn new(
        connection: Arc<ConnectionManager>,
        topic: impl Into<String>,
        options: DecoderOptions,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            connection,
            topic: topic.into(),
            options,
            timeout,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Ingest an uploaded file and delete it afterwards
    #[instrument(skip(self, upload), fields(path = %upload.path().display(), topic = %self.topic))]
    pub async fn ingest(&self, upload: UploadedFile) -> Result<IngestReport, IngestionError> {
        let outcome = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.run(upload.path()))
                .await
                .unwrap_or(Err(IngestionError::Timeout(limit))),
            None => self.run(upload.path()).await,
        };

        upload.cleanup().await;

        if let Ok(report) = &outcome {
            info!(
                published = report.published,
                skipped = report.skipped,
                "Ingestion complete"
            );
        }
        outcome
    }

    async fn run(&self, path: &Path) -> Result<IngestReport, IngestionError> {
        debug!(stage = %IngestStage::Decoding, "Ingestion stage");
        let file = File::open(path).await.map_err(DecodeError::Open)?;
        let mut decoder = TabularDecoder::new(file, self.options);

        let mut batch = MessageBatch::new();
        while let Some(record) = decoder.next_record().await? {
            batch.push_record(&record).map_err(DecodeError::Encode)?;
        }
        let skipped = decoder.issues().len();

        debug!(stage = %IngestStage::Connecting, "Ingestion stage");
        self.connection
            .ensure_connected()
            .await
            .map_err(IngestionError::Connect)?;

        debug!(stage = %IngestStage::Publishing, messages = batch.len(), "Ingestion stage");
        let published = self
            .connection
            .send_batch(&self.topic, &batch)
            .await
            .map_err(IngestionError::Publish)?;

        Ok(IngestReport { published, skipped })
    }
}
