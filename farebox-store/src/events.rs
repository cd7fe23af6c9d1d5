use async_trait::async_trait;
use farebox_core::bus::EventPublisher;
use farebox_core::BoxError;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use std::time::Duration;
use tracing::{error, info};

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
}

#[async_trait]
impl EventPublisher for EventProducer {
    async fn publish(&self, topic: &str, key: &str, payload: &str) -> Result<(), BoxError> {
        let record = FutureRecord::to(topic).key(key).payload(payload);

        match self
            .producer
            .send(record, Timeout::After(Duration::from_secs(0)))
            .await
        {
            Ok(delivery) => {
                info!(
                    "Sent message to {}/{}: partition {} offset {}",
                    topic, key, delivery.partition, delivery.offset
                );
                Ok(())
            }
            Err((e, _msg)) => {
                error!("Failed to send message to {}: {}", topic, e);
                Err(Box::new(e))
            }
        }
    }
}
