// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Error Types for the Kafka Retry Consumers
//!
//! This module provides the error type shared by every part of the crate.
//! The `KafkaRetryError` enum covers configuration, topic naming, client creation,
//! subscription, polling, committing, allocation, publishing and topic provisioning.

use thiserror::Error;

/// Represents errors that can occur while running the retry consumers.
///
/// Client errors are logged where they happen and mapped into one of these
/// variants, carrying the context (topic, key or client message) of the failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KafkaRetryError {
    /// Internal errors that don't fit into other categories
    #[error("internal error")]
    InternalError,

    /// Error creating a client for a cluster
    #[error("failure to connect `{0}`")]
    ConnectionError(String),

    /// A required configuration key is absent
    #[error("missing configuration `{0}`")]
    MissingConfig(String),

    /// The configuration could not be parsed
    #[error("invalid configuration `{0}`")]
    InvalidConfig(String),

    /// The topic chain is not usable
    #[error("invalid topic naming `{0}`")]
    InvalidTopicNaming(String),

    /// Error subscribing a consumer to its topics
    #[error("failure to subscribe `{0}`")]
    SubscribeError(String),

    /// Unrecoverable error while polling a consumer
    #[error("failure to poll `{0}`")]
    PollError(String),

    /// Error committing a consumed offset
    #[error("failure to commit `{0}`")]
    CommitError(String),

    /// The allocator refused a consumed record
    #[error("failure to allocate `{0}`")]
    AllocatorError(String),

    /// Error re-publishing a record to its next topic
    #[error("failure to publish `{0}`")]
    PublishingError(String),

    /// Error creating a topic of the retry chain
    #[error("failure to create topic `{0}`")]
    CreateTopicError(String),
}
