//! CSV upload endpoint feeding the ingestion pipeline

pub mod routes;

pub use routes::{ingest_routes, IngestState};
