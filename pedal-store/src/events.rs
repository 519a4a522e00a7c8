use pedal_shared::RentalResponse;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("Kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),
}

/// Publishes response events back onto the bus.
#[derive(Clone)]
pub struct EventProducer {
    producer: FutureProducer,
}

impl EventProducer {
    pub fn new(brokers: &str) -> Result<Self, rdkafka::error::KafkaError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "5000")
            .create()?;

        Ok(Self { producer })
    }

    /// Encode `response` as JSON and wait for the broker to acknowledge it.
    pub async fn publish_response(
        &self,
        topic: &str,
        key: &str,
        response: &RentalResponse,
    ) -> Result<(), PublishError> {
        let payload = serde_json::to_vec(response)?;
        let record = FutureRecord::to(topic).key(key).payload(&payload);

        let delivery = self
            .producer
            .send(record, Timeout::Never)
            .await
            .map_err(|(e, _)| e)?;

        debug!(
            topic,
            status = %response.status(),
            partition = delivery.partition,
            offset = delivery.offset,
            "response published"
        );
        Ok(())
    }
}
