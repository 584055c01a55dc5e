//! Static population metrics

use axum::{routing::get, Json, Router};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulationMetrics {
    pub average_income: u64,
    pub population_count: u64,
}

pub const POPULATION_METRICS: PopulationMetrics = PopulationMetrics {
    average_income: 50_000,
    population_count: 1_000_000,
};

pub fn metrics_routes() -> Router {
    Router::new().route("/metrics", get(metrics))
}

async fn metrics() -> Json<PopulationMetrics> {
    Json(POPULATION_METRICS)
}
