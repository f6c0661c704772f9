//! Prometheus metrics for coinboard.
//!
//! Covers:
//! - Page fetch outcomes and secondary source failures
//! - Merge misalignments
//! - Live deltas applied and stale batches discarded
//! - Feed connection state and reconnects
//! - Active change signals
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. A failure means duplicate metric
//! names, which is a programming error caught on first use.

use crate::error::TelemetryResult;
use once_cell::sync::Lazy;
use prometheus::{
    register_int_counter, register_int_counter_vec, register_int_gauge, register_int_gauge_vec,
    Encoder, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, TextEncoder,
};

/// Page fetches by outcome (`ok`, `failed`, `superseded`).
pub static PAGE_FETCH_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "coinboard_page_fetch_total",
        "Page fetches by outcome",
        &["outcome"]
    )
    .unwrap()
});

/// Secondary source failures (page shown unenriched).
pub static SECONDARY_FETCH_FAILED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "coinboard_secondary_fetch_failed_total",
        "Secondary enrichment failures"
    )
    .unwrap()
});

/// Positional merge pairs whose identifiers disagreed.
pub static MERGE_MISALIGNED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "coinboard_merge_misaligned_total",
        "Merge pairs with disagreeing identifiers"
    )
    .unwrap()
});

/// Price changes applied from the live feed.
pub static FEED_DELTAS_APPLIED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "coinboard_feed_deltas_applied_total",
        "Live price changes applied to the current page"
    )
    .unwrap()
});

/// Delta batches discarded because their subscription was superseded.
pub static STALE_DELTAS_DISCARDED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "coinboard_stale_deltas_discarded_total",
        "Delta batches discarded for superseded pages"
    )
    .unwrap()
});

/// Feed connection state (1 = active, 0 = inactive) per state label.
pub static FEED_STATE: Lazy<IntGaugeVec> = Lazy::new(|| {
    register_int_gauge_vec!(
        "coinboard_feed_state",
        "Feed connection current state (1=active, 0=inactive)",
        &["state"]
    )
    .unwrap()
});

/// Unexpected feed drops.
pub static FEED_DISCONNECT_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "coinboard_feed_disconnect_total",
        "Unexpected feed drops by follow-up",
        &["action"]
    )
    .unwrap()
});

/// Change signals currently visible.
pub static CHANGE_SIGNALS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "coinboard_change_signals_active",
        "Change signals currently visible"
    )
    .unwrap()
});

const FEED_STATES: [&str; 4] = ["disconnected", "connecting", "open", "closed"];

/// Metrics helper.
pub struct Metrics;

impl Metrics {
    pub fn page_fetched() {
        PAGE_FETCH_TOTAL.with_label_values(&["ok"]).inc();
    }

    pub fn page_failed() {
        PAGE_FETCH_TOTAL.with_label_values(&["failed"]).inc();
    }

    /// A fetch result arrived after a newer navigation started.
    pub fn page_superseded() {
        PAGE_FETCH_TOTAL.with_label_values(&["superseded"]).inc();
    }

    pub fn secondary_failed() {
        SECONDARY_FETCH_FAILED_TOTAL.inc();
    }

    pub fn merge_misaligned(count: usize) {
        MERGE_MISALIGNED_TOTAL.inc_by(count as u64);
    }

    pub fn deltas_applied(count: usize) {
        FEED_DELTAS_APPLIED_TOTAL.inc_by(count as u64);
    }

    pub fn stale_discarded() {
        STALE_DELTAS_DISCARDED_TOTAL.inc();
    }

    /// Set the active feed state; all others are reset to 0.
    pub fn feed_state_set(state: &str) {
        for s in FEED_STATES {
            FEED_STATE.with_label_values(&[s]).set(i64::from(s == state));
        }
    }

    /// Record an unexpected drop; `will_retry` selects the label.
    pub fn feed_disconnected(will_retry: bool) {
        let action = if will_retry { "reconnect" } else { "close" };
        FEED_DISCONNECT_TOTAL.with_label_values(&[action]).inc();
    }

    pub fn change_signals_active(count: usize) {
        CHANGE_SIGNALS_ACTIVE.set(count as i64);
    }
}

/// Render the default registry in the Prometheus text format.
pub fn gather_text() -> TelemetryResult<String> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}
