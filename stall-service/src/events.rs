use anyhow::Result;
use async_trait::async_trait;
use rdkafka::producer::{FutureProducer, FutureRecord};
use shared::{StallEvent, StallEventKind};
use std::time::Duration;
use tracing::info;

#[async_trait]
pub trait StallEventPublisher: Send + Sync {
    async fn publish(&self, kind: StallEventKind, event: &StallEvent) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct StallTopics {
    pub reserved: String,
    pub released: String,
}

impl StallTopics {
    pub fn topic(&self, kind: StallEventKind) -> &str {
        match kind {
            StallEventKind::Reserved => &self.reserved,
            StallEventKind::Released => &self.released,
        }
    }
}

pub struct KafkaStallEventPublisher {
    producer: FutureProducer,
    topics: StallTopics,
}

impl KafkaStallEventPublisher {
    pub fn new(producer: FutureProducer, topics: StallTopics) -> Self {
        Self { producer, topics }
    }
}

#[async_trait]
impl StallEventPublisher for KafkaStallEventPublisher {
    async fn publish(&self, kind: StallEventKind, event: &StallEvent) -> Result<()> {
        let topic = self.topics.topic(kind);
        info!("Publishing stall {:?} event for stall: {}", kind, event.stall_id);

        let json = serde_json::to_string(event)?;
        let key = event.key();
        let record = FutureRecord::to(topic).payload(&json).key(&key);

        self.producer
            .send(record, Duration::from_secs(5))
            .await
            .map_err(|(e, _)| anyhow::anyhow!("Failed to publish to {}: {}", topic, e))?;

        Ok(())
    }
}
