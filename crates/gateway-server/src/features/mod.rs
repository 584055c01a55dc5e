//! Feature slices of the gateway API
//!
//! - **ingest**: CSV upload published to Kafka
//! - **hdfs**: streaming read proxy for HDFS files
//! - **spark**: Spark application status
//! - **metrics**: static population metrics
//!
//! Each slice owns its routes and the state they need. All of them are
//! mounted under `/api`.

pub mod hdfs;
pub mod ingest;
pub mod metrics;
pub mod spark;

use axum::Router;

use hdfs::HdfsClient;
use ingest::IngestState;
use spark::SparkClient;

/// State handed to the feature routers
#[derive(Clone)]
pub struct FeatureState {
    pub ingest: IngestState,
    pub hdfs: HdfsClient,
    pub spark: SparkClient,
}

/// Router with every feature mounted under `/api`
pub fn router(state: FeatureState) -> Router<()> {
    let api = Router::new()
        .merge(ingest::ingest_routes().with_state(state.ingest))
        .merge(hdfs::hdfs_routes().with_state(state.hdfs))
        .merge(spark::spark_routes().with_state(state.spark))
        .merge(metrics::metrics_routes());

    Router::new().nest("/api", api)
}
