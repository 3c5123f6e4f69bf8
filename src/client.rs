// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Kafka Client Creation
//!
//! This module builds the rdkafka clients (consumers, producers and admin clients)
//! from a `ClusterConfig`, logging and mapping any creation failure.

use crate::{configs::ClusterConfig, errors::KafkaRetryError};
use rdkafka::{
    admin::AdminClient, client::DefaultClientContext, consumer::StreamConsumer,
    producer::FutureProducer,
};
use tracing::{debug, error};

/// Consumer defaults, applied unless the cluster config overrides them.
const CONSUMER_DEFAULTS: [(&str, &str); 3] = [
    ("enable.auto.commit", "false"),
    ("enable.partition.eof", "false"),
    ("auto.offset.reset", "earliest"),
];

/// Creates a stream consumer for the given cluster.
///
/// Offsets are committed explicitly by whoever finishes handling a record, so
/// auto-commit is off unless `cfg.options` turns it back on.
///
/// # Parameters
/// * `cfg` - Cluster connection settings
///
/// # Returns
/// The consumer, or `ConnectionError` when librdkafka refuses the configuration
pub fn new_stream_consumer(cfg: &ClusterConfig) -> Result<StreamConsumer, KafkaRetryError> {
    debug!(
        servers = %cfg.bootstrap_servers,
        group = %cfg.group_id,
        "creating kafka consumer..."
    );

    let mut client_cfg = cfg.client_config();
    for (key, value) in CONSUMER_DEFAULTS {
        if !cfg.options.contains_key(key) {
            client_cfg.set(key, value);
        }
    }

    match client_cfg.create::<StreamConsumer>() {
        Ok(consumer) => {
            debug!("kafka consumer created");
            Ok(consumer)
        }
        Err(err) => {
            error!(error = err.to_string(), "failure to create the consumer");
            Err(KafkaRetryError::ConnectionError(cfg.bootstrap_servers.clone()))
        }
    }
}

/// Creates a producer for the given cluster.
pub fn new_future_producer(cfg: &ClusterConfig) -> Result<FutureProducer, KafkaRetryError> {
    debug!(servers = %cfg.bootstrap_servers, "creating kafka producer...");

    match cfg.client_config().create::<FutureProducer>() {
        Ok(producer) => {
            debug!("kafka producer created");
            Ok(producer)
        }
        Err(err) => {
            error!(error = err.to_string(), "failure to create the producer");
            Err(KafkaRetryError::ConnectionError(cfg.bootstrap_servers.clone()))
        }
    }
}

/// Creates an admin client for the given cluster.
pub fn new_admin_client(
    cfg: &ClusterConfig,
) -> Result<AdminClient<DefaultClientContext>, KafkaRetryError> {
    match cfg
        .client_config()
        .create::<AdminClient<DefaultClientContext>>()
    {
        Ok(admin) => Ok(admin),
        Err(err) => {
            error!(error = err.to_string(), "failure to create the admin client");
            Err(KafkaRetryError::ConnectionError(cfg.bootstrap_servers.clone()))
        }
    }
}
