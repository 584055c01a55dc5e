//! Population Gateway Server Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]
//!
//! HTTP gateway between uploaders, Kafka, HDFS and a Spark cluster.
//!
//! # Overview
//!
//! - **Ingestion**: CSV uploads are decoded row by row and published to a
//!   Kafka topic as one JSON message per row
//! - **HDFS proxy**: files are streamed out of HDFS through WebHDFS
//! - **Spark metrics**: the Spark master's application list, reshaped
//! - **Static metrics**: a fixed population summary
//!
//! # Architecture
//!
//! - [`bus`]: the [`bus::BusClient`] seam, its Kafka implementation and the
//!   [`bus::ConnectionManager`] that owns the producer's lifecycle
//! - [`ingest`]: decoder, temporary upload files and the ingestion pipeline
//! - [`features`]: one vertical slice per HTTP surface
//! - [`api`]: application state and router assembly
//!
//! # Example
//!
//! ```no_run
//! use gateway_server::{api, bus::KafkaBus, config::Config};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let bus = Arc::new(KafkaBus::new(&config.kafka)?);
//!     let state = api::AppState::new(&config, bus)?;
//!     let app = api::create_router(state, &config);
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:5000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod bus;
pub mod config;
pub mod error;
pub mod features;
pub mod ingest;
pub mod middleware;

pub use error::{AppError, AppResult};
