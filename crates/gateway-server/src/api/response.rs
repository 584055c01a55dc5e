//! API response types

use serde::{Deserialize, Serialize};

/// Body of a successful request that has nothing to return but a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Body of `GET /health`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub kafka: String,
}

impl HealthResponse {
    pub fn new(kafka_connected: bool) -> Self {
        Self {
            status: "ok".to_string(),
            kafka: if kafka_connected { "connected" } else { "disconnected" }.to_string(),
        }
    }
}
