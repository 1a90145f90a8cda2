//! Kafka transport
//!
//! One inbound message is one batch. Offsets are committed manually, only after
//! the batch reached a terminal state (published, or rejected after reporting).
//! A publish failure stops the consumer without committing so the batch is
//! redelivered after restart.

use super::{BatchPublisher, TransportError};
use crate::config::KafkaConfig;
use crate::driver::{BatchDriver, BatchOutcome};
use crate::reporting::BatchOrigin;
use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::Message;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Producer settings for the output topic
pub fn producer_config(config: &KafkaConfig) -> ClientConfig {
    let mut client = ClientConfig::new();
    client
        .set("bootstrap.servers", &config.brokers)
        .set("client.id", &config.client_id)
        .set(
            "message.timeout.ms",
            config.message_timeout.as_millis().to_string(),
        );
    client
}

/// Consumer settings for the input topic (manual commit)
pub fn consumer_config(config: &KafkaConfig) -> ClientConfig {
    let mut client = ClientConfig::new();
    client
        .set("bootstrap.servers", &config.brokers)
        .set("group.id", &config.group_id)
        .set("client.id", &config.client_id)
        .set("enable.auto.commit", "false")
        .set("auto.offset.reset", "earliest");
    client
}

// ============================================================================
// Producer
// ============================================================================

pub struct KafkaPublisher {
    producer: FutureProducer,
    delivery_timeout: Duration,
}

impl KafkaPublisher {
    pub fn new(config: &KafkaConfig) -> Result<Self, TransportError> {
        let producer: FutureProducer = producer_config(config)
            .create()
            .map_err(|e| TransportError::Setup(format!("Kafka producer: {}", e)))?;

        Ok(Self {
            producer,
            delivery_timeout: config.message_timeout,
        })
    }
}

#[async_trait]
impl BatchPublisher for KafkaPublisher {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        let record = FutureRecord::<(), [u8]>::to(topic).payload(payload.as_slice());

        let (partition, offset) = self
            .producer
            .send(record, Timeout::After(self.delivery_timeout))
            .await
            .map_err(|(e, _)| TransportError::Publish(e.to_string()))?;

        debug!(topic, partition, offset, bytes = payload.len(), "Batch delivered");
        Ok(())
    }
}

// ============================================================================
// Consumer
// ============================================================================

pub struct KafkaBatchConsumer {
    consumer: StreamConsumer,
    input_topic: String,
}

impl KafkaBatchConsumer {
    pub fn new(config: &KafkaConfig) -> Result<Self, TransportError> {
        let consumer: StreamConsumer = consumer_config(config)
            .create()
            .map_err(|e| TransportError::Setup(format!("Kafka consumer: {}", e)))?;

        consumer
            .subscribe(&[config.input_topic.as_str()])
            .map_err(|e| TransportError::Setup(format!("Subscribe to '{}': {}", config.input_topic, e)))?;

        Ok(Self {
            consumer,
            input_topic: config.input_topic.clone(),
        })
    }

    /// Consume batches one at a time until `shutdown` resolves
    ///
    /// # Errors
    /// Returns on a receive failure or when a batch's output could not be
    /// published. The failing batch is left uncommitted.
    pub async fn run<S>(&self, driver: &BatchDriver, shutdown: S) -> Result<(), TransportError>
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!(topic = %self.input_topic, "Consuming batches");

        loop {
            let message = tokio::select! {
                _ = &mut shutdown => {
                    info!("Consumer stopped");
                    return Ok(());
                }
                received = self.consumer.recv() => {
                    received.map_err(|e| TransportError::Consume(e.to_string()))?
                }
            };

            let origin = BatchOrigin::new(message.topic(), message.partition(), message.offset());
            let payload = message.payload().unwrap_or_default();

            if let BatchOutcome::Rejected(e) = driver.handle_batch(payload, &origin).await? {
                debug!(%origin, error = %e, "Batch rejected, committing past it");
            }

            if let Err(e) = self.consumer.commit_message(&message, CommitMode::Async) {
                warn!(%origin, error = %e, "Offset commit failed");
            }
        }
    }
}
