pub mod response;

use axum::{extract::DefaultBodyLimit, extract::State, routing::get, Json, Router};
use std::{path::PathBuf, sync::Arc, time::Duration};
use tower_http::compression::CompressionLayer;

use crate::bus::{BusClient, ConnectionManager};
use crate::config::Config;
use crate::features::{
    self, hdfs::HdfsClient, ingest::IngestState, spark::SparkClient, FeatureState,
};
use crate::ingest::{DecoderOptions, IngestionPipeline};
use crate::middleware;
use response::HealthResponse;

const WELCOME: &str = "Welcome to the API Service! Use /api/send-file-to-kafka, /api/metrics, \
                       /api/read-from-hdfs, or /api/spark-metrics";

/// Long-lived collaborators shared by every request
#[derive(Clone)]
pub struct AppState {
    pub connection: Arc<ConnectionManager>,
    pub pipeline: Arc<IngestionPipeline>,
    pub hdfs: HdfsClient,
    pub spark: SparkClient,
    pub upload_dir: Arc<PathBuf>,
}

impl AppState {
    /// Wire up the gateway around a message bus client
    pub fn new(config: &Config, bus: Arc<dyn BusClient>) -> anyhow::Result<Self> {
        let connection = Arc::new(ConnectionManager::new(bus));

        let options = DecoderOptions {
            delimiter: config.ingest.delimiter,
            malformed_rows: config.ingest.malformed_rows,
        };
        let timeout = (config.ingest.timeout_secs > 0)
            .then(|| Duration::from_secs(config.ingest.timeout_secs));
        let pipeline = Arc::new(IngestionPipeline::new(
            Arc::clone(&connection),
            config.kafka.topic.clone(),
            options,
            timeout,
        ));

        Ok(Self {
            connection,
            pipeline,
            hdfs: HdfsClient::new(&config.hdfs)?,
            spark: SparkClient::new(&config.spark)?,
            upload_dir: Arc::new(config.ingest.upload_dir.clone()),
        })
    }
}

/// Build the application router with all routes and middleware
pub fn create_router(state: AppState, config: &Config) -> Router {
    let feature_routes = features::router(FeatureState {
        ingest: IngestState {
            pipeline: Arc::clone(&state.pipeline),
            upload_dir: Arc::clone(&state.upload_dir),
        },
        hdfs: state.hdfs.clone(),
        spark: state.spark.clone(),
    });

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .with_state(state)
        .merge(feature_routes)
        // Innermost first
        .layer(DefaultBodyLimit::max(config.ingest.max_upload_bytes))
        .layer(CompressionLayer::new())
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(&config.cors))
        .layer(middleware::panic_layer())
}

async fn root() -> &'static str {
    WELCOME
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::new(state.connection.is_connected().await))
}
