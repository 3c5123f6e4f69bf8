// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Record Consumers
//!
//! This module defines the consumer handle the orchestrator drives. A handle can be
//! subscribed to a set of topics, polled for the next record and asked to commit a
//! handled record. `KafkaRecordConsumer` implements it on top of an rdkafka
//! `StreamConsumer`, whose `recv()` future is dropped as soon as the loop is cancelled.

use crate::{
    client::new_stream_consumer, configs::ClusterConfig, errors::KafkaRetryError,
    record::ConsumedRecord,
};
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use rdkafka::{
    consumer::{CommitMode, Consumer, StreamConsumer},
    error::{KafkaError, RDKafkaErrorCode},
    Offset, TopicPartitionList,
};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Why a poll did not produce a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollError {
    /// The client recovers on its own; keep polling
    Transient(String),
    /// The handle is unusable; the loop must stop
    Fatal(String),
}

/// A subscribed consumer handle.
///
/// Each handle is polled by exactly one loop. The allocator may receive the handle
/// alongside a record in order to commit it, but must never poll it.
#[async_trait]
pub trait RecordConsumer: Send + Sync {
    /// Label used in logs, e.g. `main` or `retry`
    fn name(&self) -> &str;

    fn subscribe(&self, topics: &[&str]) -> Result<(), KafkaRetryError>;

    /// Waits for the next record. Dropping the returned future abandons the wait.
    async fn poll(&self) -> Result<ConsumedRecord, PollError>;

    /// Commits `record.next_offset()` for the record's partition.
    fn commit(&self, record: &ConsumedRecord) -> Result<(), KafkaRetryError>;
}

/// Builds consumer handles from cluster configs.
#[cfg_attr(test, automock)]
pub trait ConsumerFactory: Send + Sync {
    fn create(
        &self,
        name: &str,
        cfg: &ClusterConfig,
    ) -> Result<Arc<dyn RecordConsumer>, KafkaRetryError>;
}

/// rdkafka-backed consumer handle.
pub struct KafkaRecordConsumer {
    name: String,
    consumer: StreamConsumer,
}

impl KafkaRecordConsumer {
    /// Wraps an rdkafka consumer.
    ///
    /// # Parameters
    /// * `name` - Label used in logs
    /// * `consumer` - A consumer created by `client::new_stream_consumer`
    ///
    /// # Returns
    /// A new KafkaRecordConsumer instance
    pub fn new(name: &str, consumer: StreamConsumer) -> KafkaRecordConsumer {
        KafkaRecordConsumer {
            name: name.to_owned(),
            consumer,
        }
    }
}

#[async_trait]
impl RecordConsumer for KafkaRecordConsumer {
    fn name(&self) -> &str {
        &self.name
    }

    fn subscribe(&self, topics: &[&str]) -> Result<(), KafkaRetryError> {
        match self.consumer.subscribe(topics) {
            Ok(_) => {
                info!(consumer = %self.name, topics = ?topics, "subscribed");
                Ok(())
            }
            Err(err) => {
                error!(
                    error = err.to_string(),
                    consumer = %self.name,
                    "failure to subscribe"
                );
                Err(KafkaRetryError::SubscribeError(topics.join(",")))
            }
        }
    }

    async fn poll(&self) -> Result<ConsumedRecord, PollError> {
        match self.consumer.recv().await {
            Ok(msg) => Ok(ConsumedRecord::from(&msg)),
            Err(err) => Err(classify_poll_error(&err)),
        }
    }

    fn commit(&self, record: &ConsumedRecord) -> Result<(), KafkaRetryError> {
        let mut tpl = TopicPartitionList::new();
        let committed = tpl
            .add_partition_offset(
                &record.topic,
                record.partition,
                Offset::Offset(record.next_offset()),
            )
            .and_then(|_| self.consumer.commit(&tpl, CommitMode::Async));

        match committed {
            Ok(_) => {
                debug!(
                    topic = %record.topic,
                    partition = record.partition,
                    offset = record.offset,
                    "offset committed"
                );
                Ok(())
            }
            Err(err) => {
                error!(error = err.to_string(), topic = %record.topic, "failure to commit");
                Err(KafkaRetryError::CommitError(format!(
                    "{}[{}]@{}",
                    record.topic, record.partition, record.offset
                )))
            }
        }
    }
}

/// Splits client errors into the ones librdkafka retries by itself and the ones that
/// leave the consumer unusable.
pub(crate) fn classify_poll_error(err: &KafkaError) -> PollError {
    match err {
        KafkaError::PartitionEOF(_) => PollError::Transient(err.to_string()),
        KafkaError::MessageConsumption(code) if *code != RDKafkaErrorCode::Fatal => {
            PollError::Transient(err.to_string())
        }
        _ => PollError::Fatal(err.to_string()),
    }
}

/// Creates `KafkaRecordConsumer`s.
#[derive(Debug, Clone, Default)]
pub struct KafkaConsumerFactory;

impl ConsumerFactory for KafkaConsumerFactory {
    fn create(
        &self,
        name: &str,
        cfg: &ClusterConfig,
    ) -> Result<Arc<dyn RecordConsumer>, KafkaRetryError> {
        let consumer = new_stream_consumer(cfg)?;
        Ok(Arc::new(KafkaRecordConsumer::new(name, consumer)))
    }
}
