//! WebHDFS read client

use axum::body::Bytes;
use futures::Stream;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::HdfsConfig;

/// REST prefix of the WebHDFS API on the namenode.
const WEBHDFS_PREFIX: &str = "/webhdfs/v1";

#[derive(Debug, Error)]
pub enum HdfsError {
    #[error("WebHDFS request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("WebHDFS returned {status} for {path}")]
    Status { status: StatusCode, path: String },
}

/// Streams files out of HDFS through the namenode's WebHDFS endpoint
#[derive(Clone)]
pub struct HdfsClient {
    client: Client,
    base_url: String,
    user: String,
}

impl HdfsClient {
    /// Only the connect phase is bounded; file bodies may take as long as they need.
    pub fn new(config: &HdfsConfig) -> Result<Self, HdfsError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            user: config.user.clone(),
        })
    }

    /// URL of the OPEN operation for `path`.
    ///
    /// Each path segment is percent-encoded, so `?`, `#` and spaces stay part
    /// of the file name.
    pub fn file_url(&self, path: &str) -> String {
        let encoded = path
            .trim()
            .trim_start_matches('/')
            .split('/')
            .map(urlencoding::encode)
            .collect::<Vec<_>>()
            .join("/");
        format!("{}{}/{}", self.base_url, WEBHDFS_PREFIX, encoded)
    }

    /// Open `path` for reading.
    ///
    /// The namenode redirects to a datanode; reqwest follows the redirect.
    pub async fn open(
        &self,
        path: &str,
    ) -> Result<impl Stream<Item = reqwest::Result<Bytes>> + Send + 'static, HdfsError> {
        let url = self.file_url(path);
        debug!(url = %url, "Opening HDFS file");

        let response = self
            .client
            .get(&url)
            .query(&[("op", "OPEN"), ("user.name", self.user.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(HdfsError::Status {
                status,
                path: path.to_string(),
            });
        }

        Ok(response.bytes_stream())
    }
}
