//! Spark application metrics, reshaped from the master's REST API

pub mod client;
pub mod routes;

pub use client::{
    summarize, ApplicationMetrics, ApplicationStatus, SparkApplication, SparkAttempt, SparkClient,
    SparkError, SparkMetricsResponse,
};
pub use routes::spark_routes;
