//! Kafka message source.
//!
//! Offsets are never stored or committed automatically. A message is
//! committed only through [`InboundMessage::commit`], which commits
//! `offset + 1` for that one topic/partition.

use crate::config::KafkaConfig;
use async_trait::async_trait;
use orderflow_core::{OrderflowResult, SourceError};
use orderflow_ingest::{Acknowledge, InboundMessage, MessageSource, StreamPosition};
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::Message;
use rdkafka::{Offset, TopicPartitionList};
use std::sync::Arc;
use std::time::Duration;

const METADATA_TIMEOUT: Duration = Duration::from_secs(10);

/// librdkafka settings for a manually committing consumer.
pub fn client_config(config: &KafkaConfig) -> ClientConfig {
    let mut client = ClientConfig::new();
    client
        .set("bootstrap.servers", config.bootstrap_servers())
        .set("group.id", &config.group_id)
        .set("enable.auto.commit", "false")
        .set("enable.auto.offset.store", "false")
        .set("auto.offset.reset", &config.offset_reset);
    client
}

struct KafkaCommitter {
    consumer: Arc<StreamConsumer>,
}

#[async_trait]
impl Acknowledge for KafkaCommitter {
    async fn commit(&self, position: &StreamPosition) -> OrderflowResult<()> {
        let commit_failed = |reason: String| SourceError::CommitFailed {
            position: position.to_string(),
            reason,
        };

        let mut tpl = TopicPartitionList::new();
        tpl.add_partition_offset(
            &position.topic,
            position.partition,
            Offset::Offset(position.offset + 1),
        )
        .map_err(|e| commit_failed(e.to_string()))?;

        let consumer = Arc::clone(&self.consumer);
        tokio::task::spawn_blocking(move || consumer.commit(&tpl, CommitMode::Sync))
            .await
            .map_err(|e| commit_failed(e.to_string()))?
            .map_err(|e| commit_failed(e.to_string()))?;
        Ok(())
    }
}

/// Consumer-group member reading one topic.
pub struct KafkaSource {
    consumer: Arc<StreamConsumer>,
    ack: Arc<dyn Acknowledge>,
    topic: String,
}

impl KafkaSource {
    /// Create the consumer, check the brokers answer, subscribe.
    pub async fn connect(config: &KafkaConfig) -> OrderflowResult<Self> {
        config.validate()?;
        let connect_failed = |reason: String| SourceError::ConnectFailed { reason };

        let consumer: StreamConsumer = client_config(config)
            .create()
            .map_err(|e| connect_failed(e.to_string()))?;
        let consumer = Arc::new(consumer);

        let probe = Arc::clone(&consumer);
        let topic = config.topic.clone();
        tokio::task::spawn_blocking(move || {
            probe
                .fetch_metadata(Some(&topic), METADATA_TIMEOUT)
                .map(|_| ())
        })
        .await
        .map_err(|e| connect_failed(e.to_string()))?
        .map_err(|e| connect_failed(e.to_string()))?;

        consumer
            .subscribe(&[config.topic.as_str()])
            .map_err(|e| connect_failed(e.to_string()))?;

        tracing::info!(
            brokers = %config.bootstrap_servers(),
            topic = %config.topic,
            group_id = %config.group_id,
            offset_reset = %config.offset_reset,
            "subscribed to order topic"
        );

        let ack: Arc<dyn Acknowledge> = Arc::new(KafkaCommitter {
            consumer: Arc::clone(&consumer),
        });
        Ok(Self {
            consumer,
            ack,
            topic: config.topic.clone(),
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}

#[async_trait]
impl MessageSource for KafkaSource {
    async fn recv(&mut self) -> OrderflowResult<Option<InboundMessage>> {
        let message = self
            .consumer
            .recv()
            .await
            .map_err(|e| SourceError::ReceiveFailed {
                reason: e.to_string(),
            })?;

        let position = StreamPosition::new(message.topic(), message.partition(), message.offset());
        // A null payload decodes as malformed downstream.
        let payload = message.payload().map(<[u8]>::to_vec).unwrap_or_default();
        tracing::debug!(
            partition = position.partition,
            offset = position.offset,
            bytes = payload.len(),
            "message received"
        );
        Ok(Some(InboundMessage::new(
            payload,
            position,
            Arc::clone(&self.ack),
        )))
    }
}
