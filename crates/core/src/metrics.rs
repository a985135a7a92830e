//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Update cycles (outcomes, duration)
//! - Catalog fetching (bytes, parse results)
//! - Catalog contents (size, new entries, merge results)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Update Cycle Metrics
// =============================================================================

/// Update cycles total by outcome.
pub static UPDATE_CYCLES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("filmlist_update_cycles_total", "Total update cycles"),
        &["outcome"], // "updated", "recovered", "not_needed", "cancelled", "already_running"
    )
    .unwrap()
});

/// Update cycle duration in seconds.
pub static UPDATE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "filmlist_update_duration_seconds",
            "Duration of update cycles",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]),
        &["outcome"],
    )
    .unwrap()
});

// =============================================================================
// Fetch Metrics
// =============================================================================

/// Fetches total by kind and result.
pub static FETCHES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("filmlist_fetches_total", "Total catalog fetches"),
        &["kind", "result"], // kind: "full", "diff"; result: "success", "error"
    )
    .unwrap()
});

/// Payload bytes fetched.
pub static FETCHED_BYTES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "filmlist_fetched_bytes_total",
        "Total catalog payload bytes fetched",
    )
    .unwrap()
});

// =============================================================================
// Catalog Metrics
// =============================================================================

/// Entries in the current catalog.
pub static CATALOG_ENTRIES: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("filmlist_catalog_entries", "Entries in the current catalog").unwrap()
});

/// Entries flagged as new.
pub static NEW_ENTRIES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "filmlist_new_entries_total",
        "Total entries flagged as new after an update",
    )
    .unwrap()
});

/// Diff entries applied by result.
pub static MERGED_ENTRIES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("filmlist_merged_entries_total", "Total diff entries applied"),
        &["result"], // "replaced", "appended", "dropped_duplicate"
    )
    .unwrap()
});

/// Persistence attempts by result.
pub static PERSISTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("filmlist_persists_total", "Total catalog writes"),
        &["result"], // "success", "error"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Update cycles
        Box::new(UPDATE_CYCLES.clone()),
        Box::new(UPDATE_DURATION.clone()),
        // Fetching
        Box::new(FETCHES_TOTAL.clone()),
        Box::new(FETCHED_BYTES.clone()),
        // Catalog
        Box::new(CATALOG_ENTRIES.clone()),
        Box::new(NEW_ENTRIES.clone()),
        Box::new(MERGED_ENTRIES.clone()),
        Box::new(PERSISTS_TOTAL.clone()),
    ]
}
