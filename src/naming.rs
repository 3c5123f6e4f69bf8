// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Topic Chains
//!
//! This module provides the description of the topic chain a logical message stream
//! travels through: the origin topic, an ordered list of retry topics with growing
//! delay, and the dead-letter topic that receives messages once retries are exhausted.

use crate::errors::KafkaRetryError;
#[cfg(test)]
use mockall::automock;
use std::collections::HashSet;

/// Immutable topic chain for one message stream.
///
/// Index 0 of `retries` is the first retry topic. The list may be empty, in which
/// case messages go from the origin straight to the dead-letter topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicNaming {
    origin: String,
    retries: Vec<String>,
    dead_letter: String,
}

impl TopicNaming {
    /// Creates a topic chain.
    ///
    /// # Parameters
    /// * `origin` - The topic producers write to
    /// * `retries` - Retry topics ordered by ascending delay
    /// * `dead_letter` - Terminal topic
    ///
    /// # Returns
    /// The chain, or `InvalidTopicNaming` when a name is empty or appears twice
    pub fn new(
        origin: &str,
        retries: Vec<String>,
        dead_letter: &str,
    ) -> Result<TopicNaming, KafkaRetryError> {
        let naming = TopicNaming {
            origin: origin.to_owned(),
            retries,
            dead_letter: dead_letter.to_owned(),
        };

        let mut seen = HashSet::new();
        for topic in naming.all_topics() {
            if topic.is_empty() {
                return Err(KafkaRetryError::InvalidTopicNaming(
                    "empty topic name".to_owned(),
                ));
            }
            if !seen.insert(topic) {
                return Err(KafkaRetryError::InvalidTopicNaming(topic.to_owned()));
            }
        }

        Ok(naming)
    }

    /// Topic producers write to.
    ///
    /// # Returns
    /// The origin topic name
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Retry topics of the chain.
    ///
    /// # Returns
    /// The retry topic names, first retry at index 0, possibly empty
    pub fn retries(&self) -> &[String] {
        &self.retries
    }

    /// Terminal topic of the chain.
    ///
    /// # Returns
    /// The dead-letter topic name
    pub fn dead_letter(&self) -> &str {
        &self.dead_letter
    }

    /// Every topic of the chain: origin, retries in order, then dead-letter.
    pub fn all_topics(&self) -> Vec<&str> {
        let mut topics = Vec::with_capacity(self.retries.len() + 2);
        topics.push(self.origin.as_str());
        topics.extend(self.retries.iter().map(String::as_str));
        topics.push(self.dead_letter.as_str());
        topics
    }
}

/// Derives the topic chain of a stream from its origin topic name.
#[cfg_attr(test, automock)]
pub trait TopicNamingStrategy: Send + Sync {
    fn topic_naming(&self, origin: &str) -> Result<TopicNaming, KafkaRetryError>;
}

/// Suffix-based naming: `<origin>.retry.<i>` for each retry and `<origin>.dlq`.
#[derive(Debug, Clone)]
pub struct SuffixTopicNaming {
    separator: String,
    retries: usize,
}

impl Default for SuffixTopicNaming {
    fn default() -> Self {
        SuffixTopicNaming {
            separator: ".".to_owned(),
            retries: 3,
        }
    }
}

impl SuffixTopicNaming {
    pub fn new() -> SuffixTopicNaming {
        SuffixTopicNaming::default()
    }

    /// Sets how many retry topics the chain has.
    ///
    /// # Returns
    /// Self for method chaining
    pub fn retries(mut self, retries: usize) -> Self {
        self.retries = retries;
        self
    }

    /// Sets the separator placed between the origin and the suffixes.
    ///
    /// # Returns
    /// Self for method chaining
    pub fn separator(mut self, separator: &str) -> Self {
        self.separator = separator.to_owned();
        self
    }
}

impl TopicNamingStrategy for SuffixTopicNaming {
    fn topic_naming(&self, origin: &str) -> Result<TopicNaming, KafkaRetryError> {
        let sep = &self.separator;
        let retries = (0..self.retries)
            .map(|i| format!("{origin}{sep}retry{sep}{i}"))
            .collect();

        TopicNaming::new(origin, retries, &format!("{origin}{sep}dlq"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_naming_builds_chain() {
        let naming = SuffixTopicNaming::new()
            .retries(2)
            .topic_naming("orders")
            .unwrap();

        assert_eq!(naming.origin(), "orders");
        assert_eq!(naming.retries(), ["orders.retry.0", "orders.retry.1"]);
        assert_eq!(naming.dead_letter(), "orders.dlq");
    }

    #[test]
    fn suffix_naming_defaults_and_separator() {
        let naming = SuffixTopicNaming::default()
            .separator("-")
            .topic_naming("my.topic")
            .unwrap();

        assert_eq!(
            naming.all_topics(),
            vec![
                "my.topic",
                "my.topic-retry-0",
                "my.topic-retry-1",
                "my.topic-retry-2",
                "my.topic-dlq"
            ]
        );
    }

    #[test]
    fn zero_retries_is_allowed() {
        let naming = SuffixTopicNaming::new().retries(0).topic_naming("t").unwrap();
        assert!(naming.retries().is_empty());
        assert_eq!(naming.all_topics(), vec!["t", "t.dlq"]);
    }

    #[test]
    fn duplicates_are_rejected() {
        let res = TopicNaming::new("t", vec!["t.retry".to_owned(), "t.retry".to_owned()], "t.dlq");
        assert_eq!(
            res,
            Err(KafkaRetryError::InvalidTopicNaming("t.retry".to_owned()))
        );

        let res = TopicNaming::new("t", vec![], "t");
        assert_eq!(res, Err(KafkaRetryError::InvalidTopicNaming("t".to_owned())));
    }

    #[test]
    fn empty_names_are_rejected() {
        let res = TopicNaming::new("", vec![], "t.dlq");
        assert!(matches!(res, Err(KafkaRetryError::InvalidTopicNaming(_))));
    }
}
