// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # OpenTelemetry Integration for Kafka Records
//!
//! Propagates trace context through Kafka record headers: extraction when a record is
//! consumed, injection when it is forwarded to the next topic of the chain.

use crate::record::{ConsumedRecord, RecordHeader};
use opentelemetry::{
    global::{BoxedSpan, BoxedTracer},
    propagation::{Extractor, Injector},
    trace::{SpanKind, Tracer},
    Context,
};
use std::borrow::Cow;
use tracing::error;

/// Adapter exposing record headers to the OpenTelemetry propagators.
pub(crate) struct KafkaTracePropagator<'a> {
    headers: &'a mut Vec<RecordHeader>,
}

impl<'a> KafkaTracePropagator<'a> {
    pub(crate) fn new(headers: &'a mut Vec<RecordHeader>) -> Self {
        Self { headers }
    }
}

impl Injector for KafkaTracePropagator<'_> {
    /// Replaces any previous value so a forwarded record carries a single context.
    fn set(&mut self, key: &str, value: String) {
        let key = key.to_lowercase();
        self.headers.retain(|header| header.key != key);
        self.headers.push(RecordHeader {
            key,
            value: Some(value.into_bytes()),
        });
    }
}

impl Extractor for KafkaTracePropagator<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|header| header.key == key)
            .and_then(|header| header.value.as_deref())
            .and_then(|value| {
                std::str::from_utf8(value)
                    .map_err(|e| error!("Error decoding header value {:?}", e))
                    .ok()
            })
    }

    fn keys(&self) -> Vec<&str> {
        self.headers.iter().map(|header| header.key.as_str()).collect()
    }
}

/// Extracts the producer's trace context from a record's headers.
pub(crate) fn extract_context(record: &ConsumedRecord) -> Context {
    let mut headers = record.headers.clone();
    opentelemetry::global::get_text_map_propagator(|propagator| {
        propagator.extract(&KafkaTracePropagator::new(&mut headers))
    })
}

/// Writes the given trace context into a header list.
pub(crate) fn inject_context(ctx: &Context, headers: &mut Vec<RecordHeader>) {
    opentelemetry::global::get_text_map_propagator(|propagator| {
        propagator.inject_context(ctx, &mut KafkaTracePropagator::new(headers))
    });
}

/// Creates a consumer span for a record, parented on the context it carries.
///
/// # Returns
/// A tuple containing the extracted context and the new span
pub(crate) fn new_span(
    record: &ConsumedRecord,
    tracer: &BoxedTracer,
    name: &str,
) -> (Context, BoxedSpan) {
    let ctx = extract_context(record);

    let span = tracer
        .span_builder(Cow::from(name.to_owned()))
        .with_kind(SpanKind::Consumer)
        .start_with_context(tracer, &ctx);

    (ctx, span)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn injected_values_can_be_extracted() {
        let mut headers = vec![RecordHeader {
            key: "traceparent".to_owned(),
            value: Some(b"old".to_vec()),
        }];

        KafkaTracePropagator::new(&mut headers).set("TraceParent", "new".to_owned());
        assert_eq!(headers.len(), 1);

        let propagator = KafkaTracePropagator::new(&mut headers);
        assert_eq!(propagator.get("traceparent"), Some("new"));
        assert_eq!(propagator.keys(), vec!["traceparent"]);
        assert_eq!(propagator.get("missing"), None);
    }

    #[test]
    fn non_utf8_values_are_skipped() {
        let mut headers = vec![RecordHeader {
            key: "bin".to_owned(),
            value: Some(vec![0xff, 0xfe]),
        }];

        assert_eq!(KafkaTracePropagator::new(&mut headers).get("bin"), None);
    }
}
