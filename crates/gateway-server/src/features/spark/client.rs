//! Spark master REST client
//!
//! The master lists applications at `/api/v1/applications`. Only the fields
//! needed for the metrics view are decoded; timing values are passed through
//! exactly as Spark reports them.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::SparkConfig;

#[derive(Debug, Error)]
pub enum SparkError {
    #[error("Spark request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Spark master returned status {0}")]
    Status(u16),

    #[error("Unexpected Spark response: {0}")]
    Malformed(String),
}

/// One application as listed by the Spark master
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SparkApplication {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub start_time: Option<Value>,
    #[serde(default)]
    pub duration: Option<Value>,
    #[serde(default)]
    pub attempts: Vec<SparkAttempt>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SparkAttempt {
    #[serde(default)]
    pub start_time: Option<Value>,
    #[serde(default)]
    pub duration: Option<Value>,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ApplicationStatus {
    Completed,
    Running,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationMetrics {
    pub app_id: String,
    pub name: String,
    pub start_time: Value,
    pub duration: Value,
    pub status: ApplicationStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SparkMetricsResponse {
    Applications {
        #[serde(rename = "sparkApplications")]
        spark_applications: Vec<ApplicationMetrics>,
    },
    Empty {
        message: &'static str,
    },
}

/// Reshape the application list into the metrics view
pub fn summarize(applications: &[SparkApplication]) -> Result<SparkMetricsResponse, SparkError> {
    if applications.is_empty() {
        return Ok(SparkMetricsResponse::Empty {
            message: "No active Spark applications found",
        });
    }

    let spark_applications = applications
        .iter()
        .map(|app| {
            let attempt = app.attempts.first().ok_or_else(|| {
                SparkError::Malformed(format!("application {} has no attempts", app.id))
            })?;

            Ok(ApplicationMetrics {
                app_id: app.id.clone(),
                name: app.name.clone(),
                start_time: first_present(&app.start_time, &attempt.start_time),
                duration: first_present(&app.duration, &attempt.duration),
                status: if attempt.completed {
                    ApplicationStatus::Completed
                } else {
                    ApplicationStatus::Running
                },
            })
        })
        .collect::<Result<Vec<_>, SparkError>>()?;

    Ok(SparkMetricsResponse::Applications { spark_applications })
}

fn first_present(primary: &Option<Value>, fallback: &Option<Value>) -> Value {
    primary
        .as_ref()
        .or(fallback.as_ref())
        .cloned()
        .unwrap_or(Value::Null)
}

#[derive(Clone)]
pub struct SparkClient {
    client: Client,
    base_url: String,
}

impl SparkClient {
    pub fn new(config: &SparkConfig) -> Result<Self, SparkError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.master_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn list_applications(&self) -> Result<Vec<SparkApplication>, SparkError> {
        let url = format!("{}/api/v1/applications", self.base_url);
        debug!(url = %url, "Fetching Spark applications");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SparkError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| SparkError::Malformed(e.to_string()))
    }
}
