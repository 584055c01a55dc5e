use axum::{extract::State, routing::get, Json, Router};

use super::{summarize, SparkClient, SparkMetricsResponse};
use crate::error::AppResult;

pub fn spark_routes() -> Router<SparkClient> {
    Router::new().route("/spark-metrics", get(spark_metrics))
}

#[tracing::instrument(skip(spark))]
async fn spark_metrics(State(spark): State<SparkClient>) -> AppResult<Json<SparkMetricsResponse>> {
    let applications = spark.list_applications().await?;
    tracing::debug!(count = applications.len(), "Fetched Spark applications");
    Ok(Json(summarize(&applications)?))
}
