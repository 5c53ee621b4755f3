//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Reconciliation outcomes (per run and per subscription)
//! - The association waiter
//! - Outbound CRM requests

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts};

// =============================================================================
// Reconciliation Metrics
// =============================================================================

/// Reconciliation runs by final status.
pub static RECONCILIATIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "fieldsync_reconciliations_total",
            "Total reconciliation runs by final status",
        ),
        &["status", "action"],
    )
    .unwrap()
});

/// Reconciliation duration in seconds (includes time spent waiting).
pub static RECONCILIATION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "fieldsync_reconciliation_duration_seconds",
            "Duration of a reconciliation run",
        )
        .buckets(vec![
            0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 600.0, 1200.0, 1800.0, 3600.0,
        ]),
        &["status"],
    )
    .unwrap()
});

/// Per-subscription outcomes.
pub static SUBSCRIPTION_OUTCOMES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "fieldsync_subscription_outcomes_total",
            "Subscriptions processed by outcome",
        ),
        &["outcome"], // "updated", "unchanged", "failed"
    )
    .unwrap()
});

/// Association waiter polls by result.
pub static WAITER_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "fieldsync_association_wait_attempts_total",
            "Association polls made while waiting for subscriptions",
        ),
        &["result"], // "found", "empty", "error"
    )
    .unwrap()
});

// =============================================================================
// CRM Request Metrics
// =============================================================================

/// CRM request duration.
pub static CRM_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "fieldsync_crm_request_duration_seconds",
            "Duration of CRM API calls",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["operation"],
    )
    .unwrap()
});

/// CRM requests total.
pub static CRM_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("fieldsync_crm_requests_total", "Total CRM API requests"),
        &["operation", "status"], // status: "success", "error"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(RECONCILIATIONS_TOTAL.clone()),
        Box::new(RECONCILIATION_DURATION.clone()),
        Box::new(SUBSCRIPTION_OUTCOMES.clone()),
        Box::new(WAITER_ATTEMPTS.clone()),
        Box::new(CRM_REQUEST_DURATION.clone()),
        Box::new(CRM_REQUESTS.clone()),
    ]
}
