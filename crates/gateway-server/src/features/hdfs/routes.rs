use axum::{
    body::Body,
    extract::{rejection::QueryRejection, Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;

use super::HdfsClient;
use crate::error::{AppError, AppResult};

#[derive(Debug, Deserialize)]
pub struct ReadFileParams {
    #[serde(rename = "filePath")]
    pub file_path: Option<String>,
}

pub fn hdfs_routes() -> Router<HdfsClient> {
    Router::new().route("/read-from-hdfs", get(read_file))
}

#[tracing::instrument(skip_all)]
async fn read_file(
    State(hdfs): State<HdfsClient>,
    params: Result<Query<ReadFileParams>, QueryRejection>,
) -> AppResult<Response> {
    let Query(params) = params?;
    let path = params
        .file_path
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| AppError::MissingParameter("Missing filePath query parameter".into()))?;

    tracing::debug!(file_path = %path, "Reading file from HDFS");
    let stream = hdfs.open(&path).await?;

    Ok((
        [(header::CONTENT_TYPE, "application/octet-stream")],
        Body::from_stream(stream),
    )
        .into_response())
}
