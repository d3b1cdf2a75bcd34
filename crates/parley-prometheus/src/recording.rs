// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade so any recorder (Prometheus, statsd, etc.)
//! can collect these metrics. Without an installed recorder every call is a
//! no-op.

use metrics::{describe_counter, describe_histogram};
use parley_core::types::Channel;

/// Register all Parley metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!(
        "parley_webhooks_total",
        "Webhook deliveries by channel and outcome"
    );
    describe_counter!(
        "parley_messages_total",
        "Conversation legs recorded by channel and direction"
    );
    describe_counter!(
        "parley_generation_failures_total",
        "Replies replaced by the fallback text"
    );
    describe_counter!("parley_tokens_total", "Completion tokens consumed");
    describe_counter!(
        "parley_send_total",
        "Platform send attempts by channel and outcome"
    );
    describe_histogram!(
        "parley_retrieval_latency_seconds",
        "Time spent building a retrieval context"
    );
}

/// Record a webhook delivery (`processed`, `dropped`, `invalid`, `failed`).
pub fn record_webhook(channel: Channel, outcome: &'static str) {
    metrics::counter!("parley_webhooks_total", "channel" => channel.slug(), "outcome" => outcome)
        .increment(1);
}

/// Record a stored conversation leg (`inbound` or `outbound`).
pub fn record_message(channel: Channel, direction: &'static str) {
    metrics::counter!("parley_messages_total", "channel" => channel.slug(), "direction" => direction)
        .increment(1);
}

pub fn record_generation_failure() {
    metrics::counter!("parley_generation_failures_total").increment(1);
}

/// Record completion token consumption.
pub fn record_tokens(tokens: u32) {
    metrics::counter!("parley_tokens_total").increment(u64::from(tokens));
}

/// Record a send attempt (`delivered`, `skipped`, `failed`).
pub fn record_send(channel: Channel, outcome: &'static str) {
    metrics::counter!("parley_send_total", "channel" => channel.slug(), "outcome" => outcome)
        .increment(1);
}

pub fn record_retrieval_latency(seconds: f64) {
    metrics::histogram!("parley_retrieval_latency_seconds").record(seconds);
}
