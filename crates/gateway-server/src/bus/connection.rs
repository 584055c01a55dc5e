//! Connection lifecycle for the message bus
//!
//! One [`ConnectionManager`] is created at startup and shared by every request.
//! Connecting is idempotent: callers arriving while an attempt is running join
//! that attempt instead of starting their own, so concurrent requests trigger a
//! single underlying connect and all observe its result.

use futures::future::{BoxFuture, FutureExt, Shared};
use gateway_common::MessageBatch;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use super::{BusClient, BusError};

type ConnectAttempt = Shared<BoxFuture<'static, Result<(), BusError>>>;

#[derive(Default)]
struct ConnectionState {
    connected: bool,
    in_flight: Option<ConnectAttempt>,
    last_error: Option<String>,
}

/// Owns the process-wide connection to the message bus
pub struct ConnectionManager {
    client: Arc<dyn BusClient>,
    state: Arc<Mutex<ConnectionState>>,
}

impl ConnectionManager {
    pub fn new(client: Arc<dyn BusClient>) -> Self {
        Self {
            client,
            state: Arc::new(Mutex::new(ConnectionState::default())),
        }
    }

    /// Connect unless already connected.
    ///
    /// Does not retry: a failure leaves the manager disconnected and the next
    /// call starts a fresh attempt.
    pub async fn ensure_connected(&self) -> Result<(), BusError> {
        let attempt = {
            let mut state = self.state.lock().await;
            if state.connected {
                return Ok(());
            }
            match &state.in_flight {
                Some(attempt) => attempt.clone(),
                None => {
                    let attempt = self.start_attempt();
                    state.in_flight = Some(attempt.clone());
                    attempt
                },
            }
        };

        attempt.await
    }

    fn start_attempt(&self) -> ConnectAttempt {
        let client = Arc::clone(&self.client);
        let state = Arc::clone(&self.state);

        async move {
            debug!("Connecting to message bus");
            let result = client.connect().await;

            let mut state = state.lock().await;
            state.in_flight = None;
            match &result {
                Ok(()) => {
                    state.connected = true;
                    state.last_error = None;
                    info!("Kafka producer connected");
                },
                Err(e) => {
                    state.connected = false;
                    state.last_error = Some(e.to_string());
                    warn!(error = %e, "Error connecting Kafka producer");
                },
            }
            result
        }
        .boxed()
        .shared()
    }

    /// Publish a batch over the established connection
    #[instrument(skip(self, batch), fields(messages = batch.len()))]
    pub async fn send_batch(&self, topic: &str, batch: &MessageBatch) -> Result<usize, BusError> {
        if !self.is_connected().await {
            return Err(BusError::NotConnected);
        }
        self.client.send_batch(topic, batch).await
    }

    /// Close the connection if open. Calling it again is a no-op.
    ///
    /// A connect attempt still in flight is awaited first, so it cannot mark
    /// the manager connected after shutdown returns. The manager is
    /// disconnected afterwards even when the client reports a disconnect
    /// error.
    pub async fn shutdown(&self) -> Result<(), BusError> {
        let pending = self.state.lock().await.in_flight.clone();
        if let Some(attempt) = pending {
            debug!("Waiting for in-flight connect before shutdown");
            let _ = attempt.await;
        }

        {
            let mut state = self.state.lock().await;
            if !state.connected {
                debug!("Message bus already disconnected");
                return Ok(());
            }
            state.connected = false;
        }

        // Flushing can take the full message timeout; readers must not wait on it.
        self.client.disconnect().await?;
        info!("Kafka producer disconnected");
        Ok(())
    }

    pub async fn is_connected(&self) -> bool {
        self.state.lock().await.connected
    }

    /// Message of the most recent failed connect, cleared by a successful one
    pub async fn last_error(&self) -> Option<String> {
        self.state.lock().await.last_error.clone()
    }
}
