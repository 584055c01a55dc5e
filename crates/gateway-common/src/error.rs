//! Error types shared across the gateway crates

use thiserror::Error;

/// Result type alias for common operations
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Main error type for shared gateway code
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}
