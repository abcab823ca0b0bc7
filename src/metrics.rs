// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for DNS updates, zone transfers and zone listings.
//!
//! All metrics carry the `binder_` prefix and live in [`METRICS_REGISTRY`].
//!
//! # Example
//!
//! ```rust,no_run
//! use binder::metrics::{gather_metrics, record_update};
//!
//! record_update("add", true, std::time::Duration::from_millis(12));
//! println!("{}", gather_metrics().unwrap());
//! ```

use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::sync::LazyLock;
use std::time::Duration;

/// Namespace prefix for all metrics
const METRICS_NAMESPACE: &str = "binder";

/// Global Prometheus metrics registry
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

/// Dynamic update transactions by action and outcome
///
/// Labels:
/// - `action`: `add` or `delete`
/// - `result`: `success` or `failure`
pub static DNS_UPDATES_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_dns_updates_total"),
        "Total number of DNS UPDATE transactions by action and result",
    );
    let counter = CounterVec::new(opts, &["action", "result"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Round trip time of update transactions in seconds
///
/// Labels:
/// - `action`: `add` or `delete`
pub static DNS_UPDATE_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_dns_update_duration_seconds"),
        "Duration of DNS UPDATE transactions in seconds",
    )
    .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0]);
    let histogram = HistogramVec::new(opts, &["action"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

/// Zone transfers by outcome
///
/// Labels:
/// - `result`: `success`, `auth_required`, `unreachable` or `failure`
pub static ZONE_TRANSFERS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_zone_transfers_total"),
        "Total number of AXFR zone transfers by result",
    );
    let counter = CounterVec::new(opts, &["result"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Statistics channel zone listings by outcome
///
/// Labels:
/// - `result`: `success` or `failure`
pub static ZONE_LISTINGS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_zone_listings_total"),
        "Total number of zone listings by result",
    );
    let counter = CounterVec::new(opts, &["result"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

fn outcome(success: bool) -> &'static str {
    if success {
        "success"
    } else {
        "failure"
    }
}

/// Record one update transaction.
pub fn record_update(action: &str, success: bool, duration: Duration) {
    DNS_UPDATES_TOTAL
        .with_label_values(&[action, outcome(success)])
        .inc();
    DNS_UPDATE_DURATION_SECONDS
        .with_label_values(&[action])
        .observe(duration.as_secs_f64());
}

/// Record one zone transfer; `result` is one of the `ZONE_TRANSFERS_TOTAL` labels.
pub fn record_transfer(result: &str) {
    ZONE_TRANSFERS_TOTAL.with_label_values(&[result]).inc();
}

pub fn record_listing(success: bool) {
    ZONE_LISTINGS_TOTAL
        .with_label_values(&[outcome(success)])
        .inc();
}

/// Gather and encode all metrics in Prometheus text format
///
/// # Errors
/// Returns error if encoding fails
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}
