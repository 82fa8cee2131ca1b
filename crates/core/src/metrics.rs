//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Feed readers (items, expired feeds, fetch failures)
//! - Site API crawling (pages, link resolution)
//! - Deduplication history

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Feed Readers
// =============================================================================

/// Records seen by the readers, by source kind and outcome.
pub static FEED_ITEMS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("feedwarden_feed_items_total", "Feed records processed"),
        &["kind", "outcome"], // kind: "xml", "api"; outcome: "accepted", "rejected", "malformed"
    )
    .unwrap()
});

/// Feeds reporting an expired subscription link.
pub static FEEDS_EXPIRED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "feedwarden_feeds_expired_total",
        "Feeds that answered with the expired-link sentinel",
    )
    .unwrap()
});

/// Fetches that produced no usable document.
pub static FETCH_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("feedwarden_fetch_failures_total", "Failed feed fetches"),
        &["kind"],
    )
    .unwrap()
});

// =============================================================================
// Site API
// =============================================================================

/// Search pages requested, by result.
pub static API_PAGES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("feedwarden_api_pages_total", "Search pages requested"),
        &["result"], // "ok", "failed"
    )
    .unwrap()
});

/// Download-link resolutions, by result.
pub static LINK_RESOLUTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "feedwarden_link_resolutions_total",
            "Download link resolutions",
        ),
        &["result"], // "ok", "failed"
    )
    .unwrap()
});

/// Duration of site API calls.
pub static API_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "feedwarden_api_request_duration_seconds",
            "Duration of site API requests",
        )
        .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["endpoint"], // "search", "gen_dl_token", "detail", "sys_role_list"
    )
    .unwrap()
});

// =============================================================================
// History
// =============================================================================

/// Items dropped by the dedup gate.
pub static ITEMS_DEDUPLICATED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "feedwarden_items_deduplicated_total",
        "Items already present in the history",
    )
    .unwrap()
});

/// Items recorded into the history.
pub static ITEMS_RECORDED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("feedwarden_items_recorded_total", "Items recorded as seen").unwrap()
});

/// Get all core metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Feed readers
        Box::new(FEED_ITEMS.clone()),
        Box::new(FEEDS_EXPIRED.clone()),
        Box::new(FETCH_FAILURES.clone()),
        // Site API
        Box::new(API_PAGES.clone()),
        Box::new(LINK_RESOLUTIONS.clone()),
        Box::new(API_REQUEST_DURATION.clone()),
        // History
        Box::new(ITEMS_DEDUPLICATED.clone()),
        Box::new(ITEMS_RECORDED.clone()),
    ]
}
