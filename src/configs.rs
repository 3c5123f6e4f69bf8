// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Cluster Configuration
//!
//! Typed configuration for the clusters the retry consumers talk to. A deployment
//! has one main cluster, where the origin topic lives, and optionally a separate
//! retry cluster hosting the retry topics.

use crate::errors::KafkaRetryError;
use rdkafka::ClientConfig;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::error;

/// librdkafka key for the bootstrap endpoints
pub const KAFKA_BOOTSTRAP_SERVERS: &str = "bootstrap.servers";
/// librdkafka key for the consumer group
pub const KAFKA_GROUP_ID: &str = "group.id";

/// Connection settings for one cluster.
///
/// `bootstrap_servers` and `group_id` are always applied from the typed fields;
/// any other librdkafka setting goes into `options`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterConfig {
    pub bootstrap_servers: String,
    pub group_id: String,
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl ClusterConfig {
    /// Creates a cluster config without extra options.
    ///
    /// # Parameters
    /// * `bootstrap_servers` - Comma separated broker endpoints
    /// * `group_id` - Consumer group used on this cluster
    ///
    /// # Returns
    /// A new ClusterConfig instance
    pub fn new(bootstrap_servers: &str, group_id: &str) -> ClusterConfig {
        ClusterConfig {
            bootstrap_servers: bootstrap_servers.to_owned(),
            group_id: group_id.to_owned(),
            options: BTreeMap::default(),
        }
    }

    /// Adds an extra librdkafka setting.
    ///
    /// # Returns
    /// Self for method chaining
    pub fn option(mut self, key: &str, value: &str) -> Self {
        self.options.insert(key.to_owned(), value.to_owned());
        self
    }

    /// Builds a config from the raw librdkafka dictionary form.
    ///
    /// # Parameters
    /// * `raw` - key/value settings, which must contain `bootstrap.servers` and `group.id`
    ///
    /// # Returns
    /// The typed config or `MissingConfig` naming the absent key
    pub fn from_map(raw: &HashMap<String, String>) -> Result<ClusterConfig, KafkaRetryError> {
        let bootstrap_servers = raw
            .get(KAFKA_BOOTSTRAP_SERVERS)
            .ok_or_else(|| KafkaRetryError::MissingConfig(KAFKA_BOOTSTRAP_SERVERS.to_owned()))?;
        let group_id = raw
            .get(KAFKA_GROUP_ID)
            .ok_or_else(|| KafkaRetryError::MissingConfig(KAFKA_GROUP_ID.to_owned()))?;

        let options = raw
            .iter()
            .filter(|(key, _)| *key != KAFKA_BOOTSTRAP_SERVERS && *key != KAFKA_GROUP_ID)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Ok(ClusterConfig {
            bootstrap_servers: bootstrap_servers.clone(),
            group_id: group_id.clone(),
            options,
        })
    }

    /// Produces the rdkafka client configuration for this cluster.
    pub fn client_config(&self) -> ClientConfig {
        let mut cfg = ClientConfig::new();
        for (key, value) in &self.options {
            cfg.set(key, value);
        }
        cfg.set(KAFKA_BOOTSTRAP_SERVERS, &self.bootstrap_servers)
            .set(KAFKA_GROUP_ID, &self.group_id);
        cfg
    }
}

/// Main cluster plus the optional dedicated retry cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryServiceConfig {
    pub topic_kafka: ClusterConfig,
    #[serde(default)]
    pub retry_kafka: Option<ClusterConfig>,
}

impl RetryServiceConfig {
    /// Creates a config where the origin and retry topics share one cluster.
    ///
    /// # Parameters
    /// * `topic_kafka` - The main cluster
    ///
    /// # Returns
    /// A new RetryServiceConfig instance without a retry cluster
    pub fn new(topic_kafka: ClusterConfig) -> RetryServiceConfig {
        RetryServiceConfig {
            topic_kafka,
            retry_kafka: None,
        }
    }

    /// Places the retry topics on their own cluster.
    ///
    /// # Returns
    /// Self for method chaining
    pub fn with_retry_kafka(mut self, retry_kafka: ClusterConfig) -> Self {
        self.retry_kafka = Some(retry_kafka);
        self
    }

    /// Group under which retry-topic consumption is tracked: the retry cluster's
    /// group when one is configured, the main cluster's otherwise.
    pub fn retry_group_id(&self) -> &str {
        match &self.retry_kafka {
            Some(retry) => &retry.group_id,
            None => &self.topic_kafka.group_id,
        }
    }

    /// Loads the configuration from its JSON representation.
    pub fn from_json(raw: &str) -> Result<RetryServiceConfig, KafkaRetryError> {
        serde_json::from_str(raw).map_err(|err| {
            error!(error = err.to_string(), "failure to parse retry service config");
            KafkaRetryError::InvalidConfig(err.to_string())
        })
    }
}
