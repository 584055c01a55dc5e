//! HTTP-facing error types
//!
//! Every failure leaves the gateway as `{"error": "<message>"}`. Missing
//! parameters answer 400 and requests rejected by an extractor keep the
//! extractor's status; everything else is a 500. Internal detail is logged
//! here and never sent to the client.

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::QueryRejection,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::features::{hdfs::HdfsError, spark::SparkError};
use crate::ingest::IngestionError;

/// Result type alias for request handlers
pub type AppResult<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    MissingParameter(String),

    #[error("Invalid multipart upload: {0}")]
    InvalidUpload(#[from] MultipartError),

    #[error("Not a multipart upload: {0}")]
    NotMultipart(#[from] MultipartRejection),

    #[error("Invalid query string: {0}")]
    InvalidQuery(#[from] QueryRejection),

    #[error("Failed to store upload: {0}")]
    Upload(#[from] std::io::Error),

    #[error(transparent)]
    Ingestion(#[from] IngestionError),

    #[error("HDFS read failed: {0}")]
    ProxyRead(#[from] HdfsError),

    #[error("Spark metrics fetch failed: {0}")]
    UpstreamFetch(#[from] SparkError),
}

impl AppError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            AppError::MissingParameter(message) => (StatusCode::BAD_REQUEST, message.clone()),
            AppError::InvalidUpload(e) => (e.status(), e.body_text()),
            AppError::NotMultipart(e) => (e.status(), e.body_text()),
            AppError::InvalidQuery(e) => (e.status(), e.body_text()),
            AppError::Upload(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to store uploaded file".to_string(),
            ),
            AppError::Ingestion(e) => {
                let message = match e {
                    IngestionError::Decode(_) => "Failed to process CSV file",
                    IngestionError::Connect(_) => "Failed to connect to Kafka",
                    IngestionError::Publish(_) => "Failed to send CSV data to Kafka",
                    IngestionError::Timeout(_) => "Timed out processing CSV file",
                };
                (StatusCode::INTERNAL_SERVER_ERROR, message.to_string())
            },
            AppError::ProxyRead(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to read file from HDFS".to_string(),
            ),
            AppError::UpstreamFetch(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch Spark metrics".to_string(),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        match &self {
            AppError::Ingestion(e) => {
                let stage = e.stage().map(|s| s.to_string()).unwrap_or_else(|| "timeout".into());
                tracing::error!(stage = %stage, error = %e, "Ingestion failed");
            },
            _ if status.is_server_error() => tracing::error!(error = %self, "Request failed"),
            _ => tracing::debug!(error = %self, "Rejected request"),
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}
