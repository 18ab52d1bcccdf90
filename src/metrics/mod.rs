//! Prometheus metrics, scoped to the
//! trading core's own operations rather than a general perp-specific
//! set (funding/liquidation/ADL are dropped).

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

pub mod names {
    pub const ORDERS_SUBMITTED_TOTAL: &str = "orders_submitted_total";
    pub const ORDERS_VALIDATION_REJECTED_TOTAL: &str = "orders_validation_rejected_total";
    pub const ORDER_SUBMIT_DURATION_SECONDS: &str = "order_submit_duration_seconds";

    pub const TRADES_EXECUTED_TOTAL: &str = "trades_executed_total";
    pub const ORDER_MATCH_DURATION_SECONDS: &str = "order_match_duration_seconds";

    pub const ADMISSION_LOCK_CONTENTION_TOTAL: &str = "admission_lock_contention_total";
    pub const MATCHING_LOCK_WAIT_SECONDS: &str = "matching_lock_wait_seconds";

    pub const AUDIT_APPEND_DURATION_SECONDS: &str = "audit_append_duration_seconds";
    pub const AUDIT_APPEND_FAILURES_TOTAL: &str = "audit_append_failures_total";

    pub const PERSISTENCE_RETRIES_TOTAL: &str = "persistence_retries_total";

    pub const ORDERBOOK_DEPTH: &str = "orderbook_depth";
    pub const ORDERBOOK_SPREAD: &str = "orderbook_spread";
}

pub mod labels {
    pub const SIDE: &str = "side";
    pub const OUTCOME: &str = "outcome";
    pub const MARKET_ID: &str = "market_id";
    pub const REASON: &str = "reason";
}

/// Installs the Prometheus recorder, with buckets sized for this crate's
/// own latency targets
/// (matching loop and audit append are both sub-5ms targets; submit is
/// the only end-to-end path worth a coarser bucket set).
pub fn init_metrics() -> PrometheusHandle {
    let builder = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(names::ORDER_SUBMIT_DURATION_SECONDS.to_string()),
            &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5],
        )
        .unwrap()
        .set_buckets_for_metric(
            Matcher::Full(names::ORDER_MATCH_DURATION_SECONDS.to_string()),
            &[0.0001, 0.0005, 0.001, 0.005, 0.01, 0.025, 0.05],
        )
        .unwrap()
        .set_buckets_for_metric(
            Matcher::Full(names::AUDIT_APPEND_DURATION_SECONDS.to_string()),
            &[0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0],
        )
        .unwrap();

    builder
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

pub fn record_order_submitted(side: &str, outcome: &str) {
    counter!(
        names::ORDERS_SUBMITTED_TOTAL,
        labels::SIDE => side.to_string(),
        labels::OUTCOME => outcome.to_string()
    )
    .increment(1);
}

pub fn record_validation_rejected(reason: &str) {
    counter!(
        names::ORDERS_VALIDATION_REJECTED_TOTAL,
        labels::REASON => reason.to_string()
    )
    .increment(1);
}

pub fn record_submit_duration(duration_secs: f64) {
    histogram!(names::ORDER_SUBMIT_DURATION_SECONDS).record(duration_secs);
}

pub fn record_trades_executed(count: u64) {
    counter!(names::TRADES_EXECUTED_TOTAL).increment(count);
}

pub fn record_match_duration(duration_secs: f64) {
    histogram!(names::ORDER_MATCH_DURATION_SECONDS).record(duration_secs);
}

pub fn record_admission_lock_contention() {
    counter!(names::ADMISSION_LOCK_CONTENTION_TOTAL).increment(1);
}

pub fn record_audit_append_duration(duration_secs: f64) {
    histogram!(names::AUDIT_APPEND_DURATION_SECONDS).record(duration_secs);
}

pub fn record_audit_append_failure() {
    counter!(names::AUDIT_APPEND_FAILURES_TOTAL).increment(1);
}

pub fn record_persistence_retry() {
    counter!(names::PERSISTENCE_RETRIES_TOTAL).increment(1);
}

pub fn record_matching_lock_wait(duration_secs: f64) {
    histogram!(names::MATCHING_LOCK_WAIT_SECONDS).record(duration_secs);
}

pub fn set_orderbook_depth(market_id: &str, side: &str, depth: i64) {
    gauge!(
        names::ORDERBOOK_DEPTH,
        labels::MARKET_ID => market_id.to_string(),
        labels::SIDE => side.to_string()
    )
    .set(depth as f64);
}

pub fn set_orderbook_spread(market_id: &str, spread: f64) {
    gauge!(
        names::ORDERBOOK_SPREAD,
        labels::MARKET_ID => market_id.to_string()
    )
    .set(spread);
}
