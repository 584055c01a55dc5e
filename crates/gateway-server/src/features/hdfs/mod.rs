//! Read-through proxy for files stored in HDFS

pub mod client;
pub mod routes;

pub use client::{HdfsClient, HdfsError};
pub use routes::hdfs_routes;
