use pedal_core::RequestRouter;
use pedal_store::app_config::KafkaConfig;
use pedal_store::EventProducer;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::{BorrowedMessage, Message};
use std::str::Utf8Error;
use tracing::{debug, error, info};

use crate::WorkerError;

/// Consume rental requests until ctrl-c, publishing one response per routable event.
pub async fn start_rental_worker(
    kafka: &KafkaConfig,
    router: RequestRouter,
    producer: EventProducer,
) -> Result<(), WorkerError> {
    let consumer: StreamConsumer = ClientConfig::new()
        .set("bootstrap.servers", &kafka.brokers)
        .set("group.id", &kafka.group_id)
        .set("enable.auto.commit", "true")
        .set("auto.offset.reset", "earliest")
        .create()?;

    consumer.subscribe(&[kafka.request_topic.as_str()])?;

    info!("Rental worker started, listening on {}", kafka.request_topic);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received, stopping rental worker");
                return Ok(());
            }
            received = consumer.recv() => {
                match received {
                    Err(e) => error!("Kafka error: {}", e),
                    Ok(m) => handle_message(&m, &router, &producer, &kafka.response_topic).await,
                }
            }
        }
    }
}

async fn handle_message(
    m: &BorrowedMessage<'_>,
    router: &RequestRouter,
    producer: &EventProducer,
    response_topic: &str,
) {
    debug!("Received event at partition {} offset {}", m.partition(), m.offset());

    // Undecodable and unknown events produce no response
    let Some((identity, response)) = router.route_payload(m.payload()).await else {
        return;
    };

    let key = response_key(m.key_view::<str>(), &identity);

    if let Err(e) = producer.publish_response(response_topic, key, &response).await {
        error!("Failed to publish {} response: {}", response.status(), e);
    }
}

/// Responses reuse the inbound key so they land on the same partition. Keyless
/// or non-UTF-8 keyed requests are keyed by the rider instead.
fn response_key<'a>(inbound: Option<Result<&'a str, Utf8Error>>, identity: &'a str) -> &'a str {
    match inbound {
        Some(Ok(key)) if !key.is_empty() => key,
        _ => identity,
    }
}
