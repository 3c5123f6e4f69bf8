// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Retry Publisher
//!
//! Forwards a consumed record to the next topic of its chain. The key, value and
//! headers are copied, the retry bookkeeping headers are stamped and the current
//! OpenTelemetry context is propagated. Waiting out the retry delay before calling
//! `forward` is up to the allocator.

use crate::{
    errors::KafkaRetryError,
    otel,
    record::{ConsumedRecord, RecordHeader},
};
use opentelemetry::Context;
use rdkafka::{
    message::{Header, OwnedHeaders},
    producer::{FutureProducer, FutureRecord},
    util::Timeout,
};
use std::{sync::Arc, time::Duration};
use tracing::{debug, error};
use uuid::Uuid;

/// Retry attempt the record has reached
pub const HEADER_RETRY_INDEX: &str = "x-retry-index";
/// Consumer group tracking the retry topics
pub const HEADER_RETRY_GROUP_ID: &str = "x-retry-group-id";
/// Topic the record was first consumed from, kept across hops
pub const HEADER_ORIGIN_TOPIC: &str = "x-retry-origin-topic";
/// Stable identifier of the message across hops
pub const HEADER_MESSAGE_ID: &str = "x-message-id";

const DEFAULT_QUEUE_TIMEOUT: Duration = Duration::from_secs(5);

/// Re-publishes records along their chain.
pub struct RetryPublisher {
    producer: FutureProducer,
    queue_timeout: Duration,
}

impl RetryPublisher {
    /// Creates a new publisher.
    ///
    /// # Parameters
    /// * `producer` - Producer connected to the cluster hosting the next topics
    ///
    /// # Returns
    /// An Arc-wrapped RetryPublisher instance for sharing between allocator workers
    pub fn new(producer: FutureProducer) -> Arc<RetryPublisher> {
        Arc::new(RetryPublisher {
            producer,
            queue_timeout: DEFAULT_QUEUE_TIMEOUT,
        })
    }

    /// Forwards a record to `next_topic`.
    ///
    /// # Parameters
    /// * `ctx` - OpenTelemetry context for tracing
    /// * `record` - The record to forward
    /// * `next_topic` - Destination, as decided by the router
    /// * `retry_group_id` - Group tracking the retry topics
    /// * `retry_index` - Retry attempt the record has reached
    ///
    /// # Returns
    /// Ok(()) once the broker acknowledged the record, or `PublishingError`
    pub async fn forward(
        &self,
        ctx: &Context,
        record: &ConsumedRecord,
        next_topic: &str,
        retry_group_id: &str,
        retry_index: usize,
    ) -> Result<(), KafkaRetryError> {
        let mut headers = forwarded_headers(record, retry_group_id, retry_index);
        otel::inject_context(ctx, &mut headers);

        let owned = headers
            .iter()
            .fold(OwnedHeaders::new_with_capacity(headers.len()), |owned, h| {
                owned.insert(Header {
                    key: &h.key,
                    value: h.value.as_deref(),
                })
            });

        let mut future_record = FutureRecord::<[u8], [u8]>::to(next_topic).headers(owned);
        if let Some(key) = &record.key {
            future_record = future_record.key(key.as_slice());
        }
        if let Some(value) = &record.value {
            future_record = future_record.payload(value.as_slice());
        }

        match self
            .producer
            .send(future_record, Timeout::After(self.queue_timeout))
            .await
        {
            Ok((partition, offset)) => {
                debug!(
                    from = %record.topic,
                    to = next_topic,
                    partition,
                    offset,
                    "record forwarded"
                );
                Ok(())
            }
            Err((err, _)) => {
                error!(error = err.to_string(), to = next_topic, "error forwarding record");
                Err(KafkaRetryError::PublishingError(next_topic.to_owned()))
            }
        }
    }
}

/// Headers of the forwarded record: the original ones minus previous bookkeeping,
/// followed by freshly stamped bookkeeping headers.
pub(crate) fn forwarded_headers(
    record: &ConsumedRecord,
    retry_group_id: &str,
    retry_index: usize,
) -> Vec<RecordHeader> {
    let origin_topic = record
        .header(HEADER_ORIGIN_TOPIC)
        .map(<[u8]>::to_vec)
        .unwrap_or_else(|| record.topic.clone().into_bytes());
    let message_id = record
        .header(HEADER_MESSAGE_ID)
        .map(<[u8]>::to_vec)
        .unwrap_or_else(|| Uuid::new_v4().to_string().into_bytes());

    let stamped = [
        (HEADER_RETRY_INDEX, retry_index.to_string().into_bytes()),
        (HEADER_RETRY_GROUP_ID, retry_group_id.as_bytes().to_vec()),
        (HEADER_ORIGIN_TOPIC, origin_topic),
        (HEADER_MESSAGE_ID, message_id),
    ];

    let mut headers = record
        .headers
        .iter()
        .filter(|h| stamped.iter().all(|(key, _)| h.key != *key))
        .cloned()
        .collect::<Vec<_>>();

    headers.extend(stamped.into_iter().map(|(key, value)| RecordHeader {
        key: key.to_owned(),
        value: Some(value),
    }));

    headers
}
