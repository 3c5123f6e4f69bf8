// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Retry Routing
//!
//! Decides, from the topic a record was read from, which topic of the chain it
//! must be forwarded to next and which retry index it has reached.

use crate::naming::TopicNaming;

/// Where a consumed record goes next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingDecision {
    /// Retry attempt already consumed
    pub current_index: usize,
    /// Retry topic or dead-letter topic the record is forwarded to
    pub next_topic: String,
}

/// Computes the routing decision for a record read from `topic`.
///
/// Origin records go to the first retry topic (or straight to the dead-letter topic
/// when the chain has no retries). A record from any retry topic but the last moves
/// one step along the chain. Everything else, including topics that are not part of
/// the chain, is dead-lettered with index `max(1, retries)`.
///
/// Never fails: `next_topic` is always a retry topic or the dead-letter topic.
pub fn route(topic: &str, naming: &TopicNaming) -> RoutingDecision {
    let retries = naming.retries();

    if topic == naming.origin() {
        let next_topic = retries
            .first()
            .map(String::as_str)
            .unwrap_or(naming.dead_letter());

        return RoutingDecision {
            current_index: 0,
            next_topic: next_topic.to_owned(),
        };
    }

    // the last retry falls through to the dead-letter path
    for (i, pair) in retries.windows(2).enumerate() {
        if pair[0] == topic {
            return RoutingDecision {
                current_index: i,
                next_topic: pair[1].clone(),
            };
        }
    }

    // with an empty chain this reports 1, while the origin path above reports 0
    RoutingDecision {
        current_index: retries.len().max(1),
        next_topic: naming.dead_letter().to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naming(retries: usize) -> TopicNaming {
        let retries = (0..retries).map(|i| format!("t.retry.{i}")).collect();
        TopicNaming::new("t", retries, "t.dlq").unwrap()
    }

    fn decision(index: usize, topic: &str) -> RoutingDecision {
        RoutingDecision {
            current_index: index,
            next_topic: topic.to_owned(),
        }
    }

    #[test]
    fn origin_goes_to_first_retry() {
        assert_eq!(route("t", &naming(3)), decision(0, "t.retry.0"));
    }

    #[test]
    fn middle_retries_advance() {
        let naming = naming(3);
        assert_eq!(route("t.retry.0", &naming), decision(0, "t.retry.1"));
        assert_eq!(route("t.retry.1", &naming), decision(1, "t.retry.2"));
    }

    #[test]
    fn last_retry_dead_letters() {
        assert_eq!(route("t.retry.2", &naming(3)), decision(3, "t.dlq"));
    }

    #[test]
    fn unknown_topic_dead_letters() {
        assert_eq!(route("unknown.topic", &naming(3)), decision(3, "t.dlq"));
    }

    #[test]
    fn dead_letter_topic_itself_dead_letters() {
        assert_eq!(route("t.dlq", &naming(3)), decision(3, "t.dlq"));
    }

    #[test]
    fn single_retry_chain() {
        let naming = naming(1);
        assert_eq!(route("t", &naming), decision(0, "t.retry.0"));
        assert_eq!(route("t.retry.0", &naming), decision(1, "t.dlq"));
    }

    #[test]
    fn empty_chain_keeps_index_asymmetry() {
        let naming = naming(0);
        assert_eq!(route("t", &naming), decision(0, "t.dlq"));
        assert_eq!(route("other", &naming), decision(1, "t.dlq"));
    }

    #[test]
    fn next_topic_always_in_chain() {
        for len in 0..5 {
            let naming = naming(len);
            let inputs = naming
                .all_topics()
                .into_iter()
                .map(str::to_owned)
                .chain(["".to_owned(), "x".to_owned(), "t.retry.99".to_owned()]);

            for topic in inputs {
                let decision = route(&topic, &naming);
                assert!(
                    decision.next_topic == naming.dead_letter()
                        || naming.retries().contains(&decision.next_topic),
                    "{topic} routed outside the chain"
                );
            }
        }
    }
}
