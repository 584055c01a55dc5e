//! Configuration management

use crate::ingest::MalformedRowPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================================================
// Server Configuration Constants
// ============================================================================

/// Default server host binding.
pub const DEFAULT_SERVER_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_SERVER_PORT: u16 = 5000;

/// Default shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Ingestion Constants
// ============================================================================

/// Directory receiving temporary uploads.
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";

/// Default multipart body limit (100 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// Default request-scoped ingestion timeout in seconds.
pub const DEFAULT_INGEST_TIMEOUT_SECS: u64 = 60;

/// Default column delimiter.
pub const DEFAULT_CSV_DELIMITER: u8 = b',';

// ============================================================================
// Upstream Constants
// ============================================================================

pub const DEFAULT_KAFKA_BROKERS: &str = "kafka:9092";
pub const DEFAULT_KAFKA_CLIENT_ID: &str = "api-service";
pub const DEFAULT_KAFKA_TOPIC: &str = "total-population";
pub const DEFAULT_KAFKA_CONNECT_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_KAFKA_MESSAGE_TIMEOUT_MS: u64 = 30_000;

pub const DEFAULT_HDFS_URL: &str = "http://hadoop-namenode:9870";
pub const DEFAULT_HDFS_USER: &str = "root";

pub const DEFAULT_SPARK_MASTER_URL: &str = "http://spark-master:8080";

/// Timeout applied to HDFS and Spark HTTP calls.
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 30;

/// Default CORS allowed origin.
pub const DEFAULT_CORS_ALLOWED_ORIGIN: &str = "*";

/// Gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub ingest: IngestConfig,
    pub kafka: KafkaConfig,
    pub hdfs: HdfsConfig,
    pub spark: SparkConfig,
    pub cors: CorsConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
}

/// Upload handling and CSV decoding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    /// Zero disables the timeout
    pub timeout_secs: u64,
    pub malformed_rows: MalformedRowPolicy,
    pub delimiter: u8,
}

/// Kafka producer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KafkaConfig {
    pub brokers: Vec<String>,
    pub client_id: String,
    pub topic: String,
    pub connect_timeout_ms: u64,
    pub message_timeout_ms: u64,
}

/// WebHDFS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HdfsConfig {
    pub url: String,
    pub user: String,
    pub timeout_secs: u64,
}

/// Spark master REST API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SparkConfig {
    pub master_url: String,
    pub timeout_secs: u64,
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let upstream_timeout = env_parse("UPSTREAM_TIMEOUT_SECS", DEFAULT_UPSTREAM_TIMEOUT_SECS);

        let config = Config {
            server: ServerConfig {
                host: env_string("GATEWAY_HOST", DEFAULT_SERVER_HOST),
                port: env_parse("GATEWAY_PORT", DEFAULT_SERVER_PORT),
                shutdown_timeout_secs: env_parse(
                    "GATEWAY_SHUTDOWN_TIMEOUT",
                    DEFAULT_SHUTDOWN_TIMEOUT_SECS,
                ),
            },
            ingest: IngestConfig {
                upload_dir: PathBuf::from(env_string("GATEWAY_UPLOAD_DIR", DEFAULT_UPLOAD_DIR)),
                max_upload_bytes: env_parse("GATEWAY_MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES),
                timeout_secs: env_parse("GATEWAY_INGEST_TIMEOUT", DEFAULT_INGEST_TIMEOUT_SECS),
                malformed_rows: match std::env::var("GATEWAY_MALFORMED_ROWS") {
                    Ok(value) => value.parse()?,
                    Err(_) => MalformedRowPolicy::default(),
                },
                delimiter: match std::env::var("GATEWAY_CSV_DELIMITER") {
                    Ok(value) => parse_delimiter(&value)?,
                    Err(_) => DEFAULT_CSV_DELIMITER,
                },
            },
            kafka: KafkaConfig {
                brokers: env_list("KAFKA_BROKERS", DEFAULT_KAFKA_BROKERS),
                client_id: env_string("KAFKA_CLIENT_ID", DEFAULT_KAFKA_CLIENT_ID),
                topic: env_string("KAFKA_TOPIC", DEFAULT_KAFKA_TOPIC),
                connect_timeout_ms: env_parse(
                    "KAFKA_CONNECT_TIMEOUT_MS",
                    DEFAULT_KAFKA_CONNECT_TIMEOUT_MS,
                ),
                message_timeout_ms: env_parse(
                    "KAFKA_MESSAGE_TIMEOUT_MS",
                    DEFAULT_KAFKA_MESSAGE_TIMEOUT_MS,
                ),
            },
            hdfs: HdfsConfig {
                url: env_string("HDFS_URL", DEFAULT_HDFS_URL),
                user: env_string("HDFS_USER", DEFAULT_HDFS_USER),
                timeout_secs: upstream_timeout,
            },
            spark: SparkConfig {
                master_url: env_string("SPARK_MASTER_URL", DEFAULT_SPARK_MASTER_URL),
                timeout_secs: upstream_timeout,
            },
            cors: CorsConfig {
                allowed_origins: env_list("CORS_ALLOWED_ORIGINS", DEFAULT_CORS_ALLOWED_ORIGIN),
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port must be greater than 0");
        }

        if self.ingest.max_upload_bytes == 0 {
            anyhow::bail!("Maximum upload size must be greater than 0");
        }

        if self.kafka.brokers.is_empty() {
            anyhow::bail!("At least one Kafka broker must be configured");
        }

        if self.kafka.topic.trim().is_empty() {
            anyhow::bail!("Kafka topic cannot be empty");
        }

        if self.hdfs.url.is_empty() {
            anyhow::bail!("HDFS URL cannot be empty");
        }

        if self.spark.master_url.is_empty() {
            anyhow::bail!("Spark master URL cannot be empty");
        }

        if self.cors.allowed_origins.is_empty() {
            tracing::warn!("No CORS origins configured - all origins will be allowed");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: DEFAULT_SERVER_HOST.to_string(),
                port: DEFAULT_SERVER_PORT,
                shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            },
            ingest: IngestConfig {
                upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
                max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
                timeout_secs: DEFAULT_INGEST_TIMEOUT_SECS,
                malformed_rows: MalformedRowPolicy::default(),
                delimiter: DEFAULT_CSV_DELIMITER,
            },
            kafka: KafkaConfig {
                brokers: vec![DEFAULT_KAFKA_BROKERS.to_string()],
                client_id: DEFAULT_KAFKA_CLIENT_ID.to_string(),
                topic: DEFAULT_KAFKA_TOPIC.to_string(),
                connect_timeout_ms: DEFAULT_KAFKA_CONNECT_TIMEOUT_MS,
                message_timeout_ms: DEFAULT_KAFKA_MESSAGE_TIMEOUT_MS,
            },
            hdfs: HdfsConfig {
                url: DEFAULT_HDFS_URL.to_string(),
                user: DEFAULT_HDFS_USER.to_string(),
                timeout_secs: DEFAULT_UPSTREAM_TIMEOUT_SECS,
            },
            spark: SparkConfig {
                master_url: DEFAULT_SPARK_MASTER_URL.to_string(),
                timeout_secs: DEFAULT_UPSTREAM_TIMEOUT_SECS,
            },
            cors: CorsConfig {
                allowed_origins: vec![DEFAULT_CORS_ALLOWED_ORIGIN.to_string()],
            },
        }
    }
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn env_list(key: &str, default: &str) -> Vec<String> {
    env_string(key, default)
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse a delimiter that must be exactly one byte, e.g. `,` or `;`
pub fn parse_delimiter(value: &str) -> anyhow::Result<u8> {
    match value.as_bytes() {
        [byte] => Ok(*byte),
        _ => anyhow::bail!("CSV delimiter must be a single byte, got '{}'", value),
    }
}
