//! Prometheus metrics for the market-making worker.
//!
//! Covers the operator-facing rates: submits, cancels, STP triggers, and
//! settlement outcomes, plus ladder occupancy and cycle timing.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. A registration
//! failure means duplicate metric names, which should crash at startup
//! rather than fail silently. These panics only occur during static
//! initialization, never at runtime.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram, register_int_gauge_vec, CounterVec, Histogram,
    IntGaugeVec,
};

/// Total order submissions by side and outcome (ok/error).
pub static SUBMITS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "perpmm_submits_total",
        "Total limit order submissions",
        &["side", "outcome"]
    )
    .unwrap()
});

/// Total order cancels by outcome (ok/gone/error).
pub static CANCELS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "perpmm_cancels_total",
        "Total order cancellations",
        &["outcome"]
    )
    .unwrap()
});

/// Total self-trade-prevention activations by crossing side.
pub static STP_TRIGGERED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "perpmm_stp_triggered_total",
        "Total STP peel activations",
        &["crossing"]
    )
    .unwrap()
});

/// Total settlement attempts by outcome (submitted/skipped/soft_error/error).
pub static SETTLEMENTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "perpmm_settlements_total",
        "Total settlement attempts",
        &["outcome"]
    )
    .unwrap()
});

/// Live orders per side as last reported by the ladder engine.
pub static ACTIVE_LEVELS: Lazy<IntGaugeVec> = Lazy::new(|| {
    register_int_gauge_vec!(
        "perpmm_active_levels",
        "Live orders per ladder side",
        &["side"]
    )
    .unwrap()
});

/// Replacement cycle duration in milliseconds.
pub static CYCLE_DURATION_MS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "perpmm_cycle_duration_ms",
        "Replacement cycle duration in milliseconds",
        vec![10.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0]
    )
    .unwrap()
});

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    /// Record a submit outcome.
    pub fn submit(side: &str, ok: bool) {
        SUBMITS_TOTAL
            .with_label_values(&[side, if ok { "ok" } else { "error" }])
            .inc();
    }

    /// Record a cancel outcome. `gone` covers already-filled/unknown orders.
    pub fn cancel(outcome: &str) {
        CANCELS_TOTAL.with_label_values(&[outcome]).inc();
    }

    /// Record an STP activation.
    pub fn stp_triggered(crossing: &str) {
        STP_TRIGGERED_TOTAL.with_label_values(&[crossing]).inc();
    }

    /// Record a settlement attempt outcome.
    pub fn settlement(outcome: &str) {
        SETTLEMENTS_TOTAL.with_label_values(&[outcome]).inc();
    }

    /// Update ladder occupancy gauges.
    pub fn active_levels(bid_count: usize, ask_count: usize) {
        ACTIVE_LEVELS
            .with_label_values(&["bid"])
            .set(bid_count as i64);
        ACTIVE_LEVELS
            .with_label_values(&["ask"])
            .set(ask_count as i64);
    }

    /// Record a replacement cycle duration.
    pub fn cycle_duration(ms: f64) {
        CYCLE_DURATION_MS.observe(ms);
    }
}
