// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Topic Chain Provisioning
//!
//! Creates every topic of a chain (origin, retries and dead-letter) on a cluster.
//! Topics that already exist are left untouched, so installing is idempotent.

use crate::{errors::KafkaRetryError, naming::TopicNaming};
use rdkafka::{
    admin::{AdminClient, AdminOptions, NewTopic, TopicReplication, TopicResult},
    client::DefaultClientContext,
    error::RDKafkaErrorCode,
};
use tracing::{debug, error};

/// Creates the topics of a chain through an admin client.
pub struct KafkaTopology {
    admin: AdminClient<DefaultClientContext>,
    partitions: i32,
    replication: i32,
}

impl KafkaTopology {
    /// Creates a new topology installer with one partition and one replica per topic.
    pub fn new(admin: AdminClient<DefaultClientContext>) -> KafkaTopology {
        KafkaTopology {
            admin,
            partitions: 1,
            replication: 1,
        }
    }

    /// Sets the partition count of every created topic.
    ///
    /// # Returns
    /// Self for method chaining
    pub fn partitions(mut self, partitions: i32) -> Self {
        self.partitions = partitions;
        self
    }

    /// Sets the replication factor of every created topic.
    ///
    /// # Returns
    /// Self for method chaining
    pub fn replication(mut self, replication: i32) -> Self {
        self.replication = replication;
        self
    }

    /// Creates the origin, retry and dead-letter topics.
    ///
    /// # Returns
    /// Ok(()) when every topic exists afterwards, or `CreateTopicError` naming the
    /// first topic that could not be created
    pub async fn install(&self, naming: &TopicNaming) -> Result<(), KafkaRetryError> {
        let new_topics = naming
            .all_topics()
            .into_iter()
            .map(|name| {
                NewTopic::new(
                    name,
                    self.partitions,
                    TopicReplication::Fixed(self.replication),
                )
            })
            .collect::<Vec<_>>();

        debug!(topics = ?naming.all_topics(), "creating topics");

        let results = match self
            .admin
            .create_topics(&new_topics, &AdminOptions::new())
            .await
        {
            Ok(results) => results,
            Err(err) => {
                error!(error = err.to_string(), "failure to create topics");
                return Err(KafkaRetryError::CreateTopicError(naming.origin().to_owned()));
            }
        };

        check_results(results)
    }
}

/// Accepts created and already existing topics, fails on anything else.
fn check_results(results: Vec<TopicResult>) -> Result<(), KafkaRetryError> {
    for result in results {
        match result {
            Ok(topic) => debug!(topic = %topic, "topic created"),
            Err((topic, RDKafkaErrorCode::TopicAlreadyExists)) => {
                debug!(topic = %topic, "topic already exists")
            }
            Err((topic, code)) => {
                error!(error = code.to_string(), topic = %topic, "failure to create topic");
                return Err(KafkaRetryError::CreateTopicError(topic));
            }
        }
    }

    Ok(())
}
