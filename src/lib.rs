// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

mod otel;

pub mod allocator;
pub mod client;
pub mod configs;
pub mod consumer;
pub mod errors;
pub mod naming;
pub mod orchestrator;
pub mod publisher;
pub mod record;
pub mod router;
pub mod runner;
pub mod topology;
