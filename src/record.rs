// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Consumed Records
//!
//! Owned copies of the messages read by the consumers. A record is detached from the
//! client buffer as soon as it is polled so it can be handed to the allocator, which
//! takes ownership of it.

use rdkafka::message::{BorrowedMessage, Headers, Message};

/// One message header, value passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordHeader {
    pub key: String,
    pub value: Option<Vec<u8>>,
}

/// A message read from a topic of the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumedRecord {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: Option<Vec<u8>>,
    pub value: Option<Vec<u8>>,
    pub headers: Vec<RecordHeader>,
    /// Broker or producer timestamp in epoch millis
    pub timestamp: Option<i64>,
}

impl ConsumedRecord {
    pub fn new(topic: &str, partition: i32, offset: i64) -> ConsumedRecord {
        ConsumedRecord {
            topic: topic.to_owned(),
            partition,
            offset,
            key: None,
            value: None,
            headers: vec![],
            timestamp: None,
        }
    }

    /// Offset to commit once this record is fully handled.
    pub fn next_offset(&self) -> i64 {
        self.offset + 1
    }

    /// First header with the given key.
    pub fn header(&self, key: &str) -> Option<&[u8]> {
        self.headers
            .iter()
            .find(|header| header.key == key)
            .and_then(|header| header.value.as_deref())
    }
}

impl From<&BorrowedMessage<'_>> for ConsumedRecord {
    fn from(msg: &BorrowedMessage<'_>) -> Self {
        let headers = match msg.headers() {
            Some(headers) => headers
                .iter()
                .map(|header| RecordHeader {
                    key: header.key.to_owned(),
                    value: header.value.map(<[u8]>::to_vec),
                })
                .collect(),
            None => vec![],
        };

        ConsumedRecord {
            topic: msg.topic().to_owned(),
            partition: msg.partition(),
            offset: msg.offset(),
            key: msg.key().map(<[u8]>::to_vec),
            value: msg.payload().map(<[u8]>::to_vec),
            headers,
            timestamp: msg.timestamp().to_millis(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_returns_first_match() {
        let mut record = ConsumedRecord::new("t", 0, 41);
        record.headers = vec![
            RecordHeader {
                key: "a".to_owned(),
                value: Some(b"1".to_vec()),
            },
            RecordHeader {
                key: "a".to_owned(),
                value: Some(b"2".to_vec()),
            },
            RecordHeader {
                key: "empty".to_owned(),
                value: None,
            },
        ];

        assert_eq!(record.header("a"), Some(&b"1"[..]));
        assert_eq!(record.header("empty"), None);
        assert_eq!(record.header("missing"), None);
        assert_eq!(record.next_offset(), 42);
    }
}
