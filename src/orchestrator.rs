// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Retry Consumer Orchestration
//!
//! This module runs the consumption topology of one topic chain. Depending on the
//! configuration, a single consumer reads the origin and every retry topic, or a main
//! consumer reads the origin while a second consumer, possibly on another cluster,
//! reads the retry topics.
//!
//! Each consumer is driven by its own task. Every record is routed along the chain
//! and handed to the shared allocator. The loops stop when the cancellation token
//! fires; a loop that fails stops its sibling too, without touching the caller's token.

use crate::{
    allocator::ConsumeResultAllocator,
    configs::RetryServiceConfig,
    consumer::{ConsumerFactory, PollError, RecordConsumer},
    errors::KafkaRetryError,
    naming::TopicNaming,
    otel,
    record::ConsumedRecord,
    router::route,
};
use opentelemetry::{
    global::{self, BoxedTracer},
    trace::{Status, TraceContextExt},
    KeyValue,
};
use std::{borrow::Cow, sync::Arc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Name of the consumer reading the origin topic (and the retries in single mode)
pub const MAIN_CONSUMER: &str = "main";
/// Name of the consumer reading the retry topics in dual mode
pub const RETRY_CONSUMER: &str = "retry";

const TRACER_NAME: &str = "kafka retry consumer";

/// Runs the consumer loops of a topic chain.
pub struct ConsumerOrchestrator {
    config: RetryServiceConfig,
    factory: Arc<dyn ConsumerFactory>,
    allocator: Arc<dyn ConsumeResultAllocator>,
}

/// State shared by the loops of one run.
struct LoopContext {
    naming: Arc<TopicNaming>,
    allocator: Arc<dyn ConsumeResultAllocator>,
    retry_group_id: Arc<str>,
    token: CancellationToken,
}

impl ConsumerOrchestrator {
    /// Creates a new orchestrator.
    ///
    /// # Parameters
    /// * `config` - Main cluster and optional retry cluster
    /// * `factory` - Builds a consumer handle per cluster
    /// * `allocator` - Receives every consumed record
    pub fn new(
        config: RetryServiceConfig,
        factory: Arc<dyn ConsumerFactory>,
        allocator: Arc<dyn ConsumeResultAllocator>,
    ) -> ConsumerOrchestrator {
        ConsumerOrchestrator {
            config,
            factory,
            allocator,
        }
    }

    /// Subscribes the consumers and runs their loops until cancellation.
    ///
    /// Without a retry cluster the main consumer reads `{origin} ∪ retries`. With one,
    /// the main consumer reads the origin only and the retry consumer reads the retries.
    ///
    /// # Parameters
    /// * `naming` - Topic chain to consume
    /// * `token` - Stops every loop once cancelled
    ///
    /// # Returns
    /// Ok(()) once every loop exited on cancellation, or the first loop error. A loop
    /// that fails or panics (reported as `InternalError`) stops the other one.
    pub async fn run_consumers(
        &self,
        naming: Arc<TopicNaming>,
        token: CancellationToken,
    ) -> Result<(), KafkaRetryError> {
        let consumers = self.subscribe(&naming)?;
        let retry_group_id: Arc<str> = Arc::from(self.config.retry_group_id());

        info!(
            origin = naming.origin(),
            retry_group_id = %retry_group_id,
            consumers = consumers.len(),
            "starting retry consumers"
        );

        let ctx = Arc::new(LoopContext {
            naming,
            allocator: self.allocator.clone(),
            retry_group_id,
            token: token.child_token(),
        });

        // dropping the run future cancels and aborts every loop
        let _guard = ctx.token.clone().drop_guard();
        let mut tasks = JoinSet::new();
        for consumer in consumers {
            tasks.spawn(consume_loop(consumer, ctx.clone()));
        }

        let mut result = Ok(());
        while let Some(joined) = tasks.join_next().await {
            let res = match joined {
                Ok(res) => res,
                Err(err) => {
                    error!(error = err.to_string(), "consumer task aborted");
                    Err(KafkaRetryError::InternalError)
                }
            };

            if let Err(err) = res {
                ctx.token.cancel();
                if result.is_ok() {
                    result = Err(err);
                }
            }
        }

        debug!("retry consumers stopped");
        result
    }

    fn subscribe(
        &self,
        naming: &TopicNaming,
    ) -> Result<Vec<Arc<dyn RecordConsumer>>, KafkaRetryError> {
        let topic_consumer = self
            .factory
            .create(MAIN_CONSUMER, &self.config.topic_kafka)?;

        let Some(retry_cfg) = &self.config.retry_kafka else {
            // one consumer for all topics
            let mut topics = vec![naming.origin()];
            topics.extend(naming.retries().iter().map(String::as_str));
            topic_consumer.subscribe(&topics)?;

            return Ok(vec![topic_consumer]);
        };

        let retry_consumer = self.factory.create(RETRY_CONSUMER, retry_cfg)?;
        topic_consumer.subscribe(&[naming.origin()])?;

        if naming.retries().is_empty() {
            warn!(
                origin = naming.origin(),
                "no retry topics to consume, retry consumer left idle"
            );
            return Ok(vec![topic_consumer]);
        }

        let retries = naming
            .retries()
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>();
        retry_consumer.subscribe(&retries)?;

        Ok(vec![topic_consumer, retry_consumer])
    }
}

/// Drives one consumer until cancellation or failure. A failure cancels the run so
/// the sibling loop stops as well.
async fn consume_loop(
    consumer: Arc<dyn RecordConsumer>,
    ctx: Arc<LoopContext>,
) -> Result<(), KafkaRetryError> {
    let tracer = global::tracer(TRACER_NAME);

    let res = poll_until_cancelled(&consumer, &ctx, &tracer).await;
    if let Err(err) = &res {
        error!(
            error = err.to_string(),
            consumer = consumer.name(),
            "consumer loop failed"
        );
        ctx.token.cancel();
    }

    res
}

async fn poll_until_cancelled(
    consumer: &Arc<dyn RecordConsumer>,
    ctx: &LoopContext,
    tracer: &BoxedTracer,
) -> Result<(), KafkaRetryError> {
    loop {
        let polled = tokio::select! {
            biased;

            _ = ctx.token.cancelled() => {
                debug!(consumer = consumer.name(), "consumer loop cancelled");
                return Ok(());
            }
            polled = consumer.poll() => polled,
        };

        match polled {
            Ok(record) => hand_off(record, consumer, ctx, tracer)?,
            Err(PollError::Transient(reason)) => {
                warn!(
                    error = %reason,
                    consumer = consumer.name(),
                    "transient poll error"
                );
            }
            Err(PollError::Fatal(reason)) => return Err(KafkaRetryError::PollError(reason)),
        }
    }
}

/// Routes a record and gives it to the allocator. The consumer span stays attached
/// as the current context while the allocator runs.
fn hand_off(
    record: ConsumedRecord,
    consumer: &Arc<dyn RecordConsumer>,
    ctx: &LoopContext,
    tracer: &BoxedTracer,
) -> Result<(), KafkaRetryError> {
    let decision = route(&record.topic, &ctx.naming);
    let (parent, span) = otel::new_span(&record, tracer, &record.topic);
    let cx = parent.with_span(span);
    let span = cx.span();

    span.set_attribute(KeyValue::new(
        "messaging.kafka.next_topic",
        decision.next_topic.clone(),
    ));
    span.set_attribute(KeyValue::new(
        "messaging.kafka.retry_index",
        decision.current_index as i64,
    ));

    debug!(
        topic = %record.topic,
        partition = record.partition,
        offset = record.offset,
        next_topic = %decision.next_topic,
        retry_index = decision.current_index,
        "routing record"
    );

    let _attached = cx.clone().attach();
    match ctx.allocator.add_consume_result(
        record,
        consumer.clone(),
        &ctx.retry_group_id,
        &decision.next_topic,
        decision.current_index,
    ) {
        Ok(_) => {
            span.set_status(Status::Ok);
            Ok(())
        }
        Err(err) => {
            span.record_error(&err);
            span.set_status(Status::Error {
                description: Cow::from("failure to allocate record"),
            });
            Err(err)
        }
    }
}
