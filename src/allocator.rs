// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Consume Result Allocation
//!
//! The allocator receives every consumed record together with its routing decision
//! and owns everything that happens afterwards: waiting out the retry delay,
//! re-publishing to the next topic and committing the original offset.

use crate::{consumer::RecordConsumer, errors::KafkaRetryError, record::ConsumedRecord};
#[cfg(test)]
use mockall::automock;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::error;

/// Receives consumed records from the consumer loops.
///
/// Implementations are shared by every loop and are called concurrently from up to
/// two tasks, so they must synchronize internally. A call must return promptly: any
/// backoff is scheduled, never awaited, inside `add_consume_result`. An error stops
/// the calling loop.
#[cfg_attr(test, automock)]
pub trait ConsumeResultAllocator: Send + Sync {
    /// Takes ownership of a consumed record.
    ///
    /// # Parameters
    /// * `record` - The record, no longer referenced by the loop
    /// * `consumer` - Handle the record was read from, for committing only
    /// * `retry_group_id` - Group tracking retry-topic consumption
    /// * `next_topic` - Topic the record must be forwarded to
    /// * `retry_index` - Retry attempt already consumed
    fn add_consume_result(
        &self,
        record: ConsumedRecord,
        consumer: Arc<dyn RecordConsumer>,
        retry_group_id: &str,
        next_topic: &str,
        retry_index: usize,
    ) -> Result<(), KafkaRetryError>;
}

/// Everything an allocator was handed for one record.
pub struct RetryAssignment {
    pub record: ConsumedRecord,
    pub consumer: Arc<dyn RecordConsumer>,
    pub retry_group_id: String,
    pub next_topic: String,
    pub retry_index: usize,
}

/// Allocator that queues assignments on an unbounded channel for a downstream
/// scheduler to pick up.
pub struct ChannelAllocator {
    sender: UnboundedSender<RetryAssignment>,
}

impl ChannelAllocator {
    /// Creates the allocator and the receiving end of its queue.
    pub fn new() -> (Arc<ChannelAllocator>, UnboundedReceiver<RetryAssignment>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Arc::new(ChannelAllocator { sender }), receiver)
    }
}

impl ConsumeResultAllocator for ChannelAllocator {
    fn add_consume_result(
        &self,
        record: ConsumedRecord,
        consumer: Arc<dyn RecordConsumer>,
        retry_group_id: &str,
        next_topic: &str,
        retry_index: usize,
    ) -> Result<(), KafkaRetryError> {
        let assignment = RetryAssignment {
            record,
            consumer,
            retry_group_id: retry_group_id.to_owned(),
            next_topic: next_topic.to_owned(),
            retry_index,
        };

        self.sender.send(assignment).map_err(|err| {
            error!(topic = %err.0.record.topic, "allocation queue closed");
            KafkaRetryError::AllocatorError(err.0.next_topic)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consumer::PollError;
    use async_trait::async_trait;

    struct NoopConsumer;

    #[async_trait]
    impl RecordConsumer for NoopConsumer {
        fn name(&self) -> &str {
            "noop"
        }

        fn subscribe(&self, _topics: &[&str]) -> Result<(), KafkaRetryError> {
            Ok(())
        }

        async fn poll(&self) -> Result<ConsumedRecord, PollError> {
            Err(PollError::Fatal("noop".to_owned()))
        }

        fn commit(&self, _record: &ConsumedRecord) -> Result<(), KafkaRetryError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn channel_allocator_queues_assignments() {
        let (allocator, mut receiver) = ChannelAllocator::new();

        allocator
            .add_consume_result(
                ConsumedRecord::new("t", 2, 7),
                Arc::new(NoopConsumer),
                "group",
                "t.retry.0",
                0,
            )
            .unwrap();

        let assignment = receiver.recv().await.unwrap();
        assert_eq!(assignment.record.topic, "t");
        assert_eq!(assignment.record.offset, 7);
        assert_eq!(assignment.consumer.name(), "noop");
        assert_eq!(assignment.retry_group_id, "group");
        assert_eq!(assignment.next_topic, "t.retry.0");
        assert_eq!(assignment.retry_index, 0);
    }

    #[tokio::test]
    async fn channel_allocator_is_shared_across_tasks() {
        let (allocator, mut receiver) = ChannelAllocator::new();

        let tasks = (0..2).map(|n| {
            let allocator = allocator.clone();
            tokio::spawn(async move {
                for offset in 0..50 {
                    allocator
                        .add_consume_result(
                            ConsumedRecord::new(&format!("t{n}"), 0, offset),
                            Arc::new(NoopConsumer),
                            "group",
                            "t.dlq",
                            1,
                        )
                        .unwrap();
                }
            })
        });
        for task in futures_util::future::join_all(tasks).await {
            task.unwrap();
        }
        drop(allocator);

        let mut received = 0;
        while receiver.recv().await.is_some() {
            received += 1;
        }
        assert_eq!(received, 100);
    }

    #[test]
    fn closed_queue_is_an_error() {
        let (allocator, receiver) = ChannelAllocator::new();
        drop(receiver);

        let res = allocator.add_consume_result(
            ConsumedRecord::new("t", 0, 0),
            Arc::new(NoopConsumer),
            "group",
            "t.retry.0",
            0,
        );
        assert_eq!(
            res,
            Err(KafkaRetryError::AllocatorError("t.retry.0".to_owned()))
        );
    }
}
