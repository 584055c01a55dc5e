//! Message bus access
//!
//! The gateway publishes ingested records to a single topic. Everything that
//! talks to the bus goes through the [`BusClient`] seam:
//!
//! - [`KafkaBus`] is the production client, backed by an rdkafka producer
//! - [`ConnectionManager`] owns the process-wide connection state on top of
//!   a client and is what request handlers receive
//!
//! Failures are surfaced to the caller and never retried here.

pub mod connection;
pub mod kafka;

use async_trait::async_trait;
use gateway_common::MessageBatch;
use thiserror::Error;

pub use connection::ConnectionManager;
pub use kafka::KafkaBus;

/// Errors raised by a message bus client
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    #[error("Invalid message bus configuration: {0}")]
    Config(String),

    #[error("Failed to connect to message bus: {0}")]
    Connect(String),

    #[error("Message bus is not connected")]
    NotConnected,

    #[error("Failed to publish batch: {0}")]
    Publish(String),

    #[error("Failed to disconnect from message bus: {0}")]
    Disconnect(String),
}

/// Connection and publish primitives of a message bus
#[async_trait]
pub trait BusClient: Send + Sync {
    /// Establish (or verify) connectivity with the bus
    async fn connect(&self) -> Result<(), BusError>;

    /// Publish every message of `batch` to `topic`, in order.
    ///
    /// Returns the number of acknowledged messages. Any failed delivery fails
    /// the whole call.
    async fn send_batch(&self, topic: &str, batch: &MessageBatch) -> Result<usize, BusError>;

    /// Flush outstanding messages and release the connection
    async fn disconnect(&self) -> Result<(), BusError>;
}
