// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Retry Runner
//!
//! Entry point tying a naming strategy to the orchestrator: give it the origin topic
//! and it derives the chain, subscribes the consumers and runs them.

use crate::{
    errors::KafkaRetryError, naming::TopicNamingStrategy, orchestrator::ConsumerOrchestrator,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Runs the retry consumers of a chain named after its origin topic.
///
/// The chain is derived by a `TopicNamingStrategy` and consumed by a
/// `ConsumerOrchestrator`.
pub struct RetryRunner {
    naming: Arc<dyn TopicNamingStrategy>,
    orchestrator: ConsumerOrchestrator,
}

impl RetryRunner {
    /// Creates a new runner.
    ///
    /// # Parameters
    /// * `naming` - Derives the topic chain from an origin topic
    /// * `orchestrator` - Runs the consumer loops of the chain
    ///
    /// # Returns
    /// A new RetryRunner instance
    pub fn new(
        naming: Arc<dyn TopicNamingStrategy>,
        orchestrator: ConsumerOrchestrator,
    ) -> RetryRunner {
        RetryRunner {
            naming,
            orchestrator,
        }
    }

    /// Runs the retry consumers of the chain rooted at `origin` until `token` is
    /// cancelled or a loop fails.
    pub async fn run(&self, origin: &str, token: CancellationToken) -> Result<(), KafkaRetryError> {
        let naming = self.naming.topic_naming(origin)?;
        info!(
            origin,
            retries = naming.retries().len(),
            dead_letter = naming.dead_letter(),
            "running retry chain"
        );

        self.orchestrator
            .run_consumers(Arc::new(naming), token)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        allocator::MockConsumeResultAllocator,
        configs::{ClusterConfig, RetryServiceConfig},
        consumer::{MockConsumerFactory, PollError, RecordConsumer},
        naming::{MockTopicNamingStrategy, SuffixTopicNaming},
        record::ConsumedRecord,
    };
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct IdleConsumer {
        subscriptions: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl RecordConsumer for IdleConsumer {
        fn name(&self) -> &str {
            "idle"
        }

        fn subscribe(&self, topics: &[&str]) -> Result<(), KafkaRetryError> {
            let mut subscriptions = self.subscriptions.lock().unwrap();
            subscriptions.extend(topics.iter().map(|t| t.to_string()));
            Ok(())
        }

        async fn poll(&self) -> Result<ConsumedRecord, PollError> {
            std::future::pending().await
        }

        fn commit(&self, _record: &ConsumedRecord) -> Result<(), KafkaRetryError> {
            Ok(())
        }
    }

    fn orchestrator(factory: MockConsumerFactory) -> ConsumerOrchestrator {
        let mut allocator = MockConsumeResultAllocator::new();
        allocator.expect_add_consume_result().never();

        ConsumerOrchestrator::new(
            RetryServiceConfig::new(ClusterConfig::new("localhost:9092", "g")),
            Arc::new(factory),
            Arc::new(allocator),
        )
    }

    #[tokio::test]
    async fn runs_chain_derived_from_origin() {
        let consumer = Arc::new(IdleConsumer::default());
        let handle = consumer.clone();

        let mut factory = MockConsumerFactory::new();
        factory
            .expect_create()
            .times(1)
            .returning(move |_, _| Ok(handle.clone() as Arc<dyn RecordConsumer>));

        let runner = RetryRunner::new(
            Arc::new(SuffixTopicNaming::new().retries(2)),
            orchestrator(factory),
        );

        let token = CancellationToken::new();
        token.cancel();
        assert_eq!(runner.run("orders", token).await, Ok(()));

        assert_eq!(
            *consumer.subscriptions.lock().unwrap(),
            vec!["orders", "orders.retry.0", "orders.retry.1"]
        );
    }

    #[tokio::test]
    async fn naming_failure_skips_consumers() {
        let mut naming = MockTopicNamingStrategy::new();
        naming
            .expect_topic_naming()
            .times(1)
            .returning(|origin| Err(KafkaRetryError::InvalidTopicNaming(origin.to_owned())));

        let mut factory = MockConsumerFactory::new();
        factory.expect_create().never();

        let runner = RetryRunner::new(Arc::new(naming), orchestrator(factory));

        let res = runner.run("orders", CancellationToken::new()).await;
        assert_eq!(
            res,
            Err(KafkaRetryError::InvalidTopicNaming("orders".to_owned()))
        );
    }
}
