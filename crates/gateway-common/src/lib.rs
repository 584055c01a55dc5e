//! Gateway Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, logging setup, and error handling for the population gateway.
//!
//! # Overview
//!
//! - **Records**: the decoded-row data model and its outbound message encoding
//! - **Logging**: tracing subscriber setup shared by every binary
//! - **Error Handling**: common error and result types
//!
//! # Example
//!
//! ```no_run
//! use gateway_common::record::{MessageBatch, Record};
//!
//! fn batch_one() -> gateway_common::Result<MessageBatch> {
//!     let mut record = Record::new();
//!     record.insert("name", "Paris");
//!     record.insert("population", "2000000");
//!
//!     let mut batch = MessageBatch::new();
//!     batch.push_record(&record)?;
//!     Ok(batch)
//! }
//! ```

pub mod error;
pub mod logging;
pub mod record;

// Re-export commonly used types
pub use error::{GatewayError, Result};
pub use record::{MessageBatch, OutboundMessage, Record};
