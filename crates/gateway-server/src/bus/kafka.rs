//! Kafka implementation of [`BusClient`]

use async_trait::async_trait;
use gateway_common::MessageBatch;
use rdkafka::{
    config::ClientConfig,
    producer::{FutureProducer, FutureRecord, Producer},
    util::Timeout,
};
use std::time::Duration;
use tracing::{debug, instrument};

use super::{BusClient, BusError};
use crate::config::KafkaConfig;

/// Kafka producer publishing keyless JSON messages
pub struct KafkaBus {
    producer: FutureProducer,
    topic: String,
    connect_timeout: Duration,
    message_timeout: Duration,
}

impl KafkaBus {
    /// Build the producer. No network traffic happens until [`BusClient::connect`].
    pub fn new(config: &KafkaConfig) -> Result<Self, BusError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", config.brokers.join(","))
            .set("client.id", &config.client_id)
            .set("message.timeout.ms", config.message_timeout_ms.to_string())
            .create()
            .map_err(|e| BusError::Config(e.to_string()))?;

        Ok(Self {
            producer,
            topic: config.topic.clone(),
            connect_timeout: Duration::from_millis(config.connect_timeout_ms),
            message_timeout: Duration::from_millis(config.message_timeout_ms),
        })
    }
}

#[async_trait]
impl BusClient for KafkaBus {
    /// librdkafka connects lazily, so connecting means proving a broker
    /// answers a metadata request for the target topic.
    async fn connect(&self) -> Result<(), BusError> {
        let producer = self.producer.clone();
        let topic = self.topic.clone();
        let timeout = self.connect_timeout;

        let metadata = tokio::task::spawn_blocking(move || {
            producer.client().fetch_metadata(Some(&topic), timeout)
        })
        .await
        .map_err(|e| BusError::Connect(e.to_string()))?
        .map_err(|e| BusError::Connect(e.to_string()))?;

        debug!(
            brokers = metadata.brokers().len(),
            topics = metadata.topics().len(),
            "Fetched Kafka cluster metadata"
        );
        Ok(())
    }

    #[instrument(skip(self, batch), fields(messages = batch.len()))]
    async fn send_batch(&self, topic: &str, batch: &MessageBatch) -> Result<usize, BusError> {
        let deliveries = batch.messages().iter().map(|message| {
            let record = FutureRecord::<(), str>::to(topic).payload(message.payload());
            self.producer
                .send(record, Timeout::After(self.message_timeout))
        });

        let failures: Vec<_> = futures::future::join_all(deliveries)
            .await
            .into_iter()
            .filter_map(|delivery| delivery.err().map(|(error, _message)| error))
            .collect();

        if let Some(first) = failures.first() {
            return Err(BusError::Publish(format!(
                "{} of {} messages were not acknowledged: {}",
                failures.len(),
                batch.len(),
                first
            )));
        }

        debug!(topic = %topic, "Batch acknowledged");
        Ok(batch.len())
    }

    async fn disconnect(&self) -> Result<(), BusError> {
        let producer = self.producer.clone();
        let timeout = self.message_timeout;

        tokio::task::spawn_blocking(move || producer.flush(timeout))
            .await
            .map_err(|e| BusError::Disconnect(e.to_string()))?
            .map_err(|e| BusError::Disconnect(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_new_does_not_touch_the_network() {
        let mut config = Config::default().kafka;
        config.brokers = vec!["127.0.0.1:1".to_string()];

        let bus = KafkaBus::new(&config).unwrap();
        assert_eq!(bus.topic, "total-population");
        assert_eq!(bus.message_timeout, Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_connect_fails_without_reachable_broker() {
        let mut config = Config::default().kafka;
        config.brokers = vec!["127.0.0.1:1".to_string()];
        config.connect_timeout_ms = 200;

        let bus = KafkaBus::new(&config).unwrap();
        assert!(matches!(bus.connect().await, Err(BusError::Connect(_))));
    }

    #[tokio::test]
    async fn test_empty_batch_needs_no_broker() {
        let bus = KafkaBus::new(&Config::default().kafka).unwrap();
        let sent = bus.send_batch("total-population", &MessageBatch::new()).await;
        assert_eq!(sent, Ok(0));
    }
}
