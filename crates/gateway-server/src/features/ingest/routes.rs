use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    routing::post,
    Json, Router,
};
use std::{path::PathBuf, sync::Arc};
use tokio::io::AsyncWriteExt;

use crate::api::response::MessageResponse;
use crate::error::{AppError, AppResult};
use crate::ingest::{IngestionPipeline, UploadedFile};

/// Multipart field carrying the CSV document.
const FILE_FIELD: &str = "file";

#[derive(Clone)]
pub struct IngestState {
    pub pipeline: Arc<IngestionPipeline>,
    pub upload_dir: Arc<PathBuf>,
}

pub fn ingest_routes() -> Router<IngestState> {
    Router::new().route("/send-file-to-kafka", post(send_file_to_kafka))
}

#[tracing::instrument(skip(state, multipart))]
async fn send_file_to_kafka(
    State(state): State<IngestState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<MessageResponse>> {
    let mut multipart = multipart?;
    let mut upload = None;

    while let Some(mut field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) || upload.is_some() {
            continue;
        }

        let (stored, mut file) = UploadedFile::create(&state.upload_dir).await?;
        // From here on `stored` removes the file if the request ends early.
        let mut size = 0usize;
        while let Some(chunk) = field.chunk().await? {
            size += chunk.len();
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        tracing::debug!(
            path = %stored.path().display(),
            file_name = ?field.file_name(),
            size,
            "Stored upload"
        );
        upload = Some(stored);
    }

    let upload = upload.ok_or_else(|| {
        AppError::MissingParameter("Missing file field in multipart upload".into())
    })?;

    let report = state.pipeline.ingest(upload).await?;
    tracing::info!(
        published = report.published,
        skipped = report.skipped,
        "CSV data sent to Kafka"
    );

    Ok(Json(MessageResponse::new("CSV data sent to Kafka successfully")))
}
