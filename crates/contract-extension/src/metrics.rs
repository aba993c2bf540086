//! # Extension Metrics
//!
//! Prometheus counters for the extension watchers.
//!
//! ## Usage
//!
//! Enable with the `metrics` feature:
//! ```toml
//! contract-extension = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `extension_contracts_tracked_total` - Proposals added to the registry
//! - `extension_contracts_cancelled_total` - Proposals removed by cancellation
//! - `extension_self_approvals_total` - Automatic approvals cast by this node
//! - `extension_state_shares_total` - Completed state shares
//! - `extension_state_share_failures_total` - Failed state shares (by step)
//! - `extension_watcher_exits_total` - Watcher loop exits (by watcher, reason)

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};

#[cfg(feature = "metrics")]
lazy_static! {
    /// Proposals added to the registry
    pub static ref CONTRACTS_TRACKED: IntCounter = register_int_counter!(
        "extension_contracts_tracked_total",
        "Total number of extension proposals added to the registry"
    )
    .expect("Failed to create CONTRACTS_TRACKED metric");

    /// Proposals removed by cancellation
    pub static ref CONTRACTS_CANCELLED: IntCounter = register_int_counter!(
        "extension_contracts_cancelled_total",
        "Total number of extension proposals removed by cancellation"
    )
    .expect("Failed to create CONTRACTS_CANCELLED metric");

    /// Automatic approvals
    pub static ref SELF_APPROVALS: IntCounter = register_int_counter!(
        "extension_self_approvals_total",
        "Total number of approval votes cast automatically by the proposal sender"
    )
    .expect("Failed to create SELF_APPROVALS metric");

    /// Completed state shares
    pub static ref STATE_SHARES: IntCounter = register_int_counter!(
        "extension_state_shares_total",
        "Total number of contract states shared with a new party"
    )
    .expect("Failed to create STATE_SHARES metric");

    /// Failed state shares, labeled by step
    pub static ref STATE_SHARE_FAILURES: IntCounterVec = register_int_counter_vec!(
        "extension_state_share_failures_total",
        "Total number of state shares aborted",
        &["step"]
    )
    .expect("Failed to create STATE_SHARE_FAILURES metric");

    /// Watcher exits, labeled by watcher and reason
    pub static ref WATCHER_EXITS: IntCounterVec = register_int_counter_vec!(
        "extension_watcher_exits_total",
        "Total number of watcher loop exits",
        &["watcher", "reason"]
    )
    .expect("Failed to create WATCHER_EXITS metric");
}

// =============================================================================
// METRIC RECORDING FUNCTIONS
// =============================================================================

/// Record a proposal added to the registry
#[cfg(feature = "metrics")]
pub fn record_contract_tracked() {
    CONTRACTS_TRACKED.inc();
}

/// Record a proposal removed by cancellation
#[cfg(feature = "metrics")]
pub fn record_contract_cancelled() {
    CONTRACTS_CANCELLED.inc();
}

/// Record an automatic approval
#[cfg(feature = "metrics")]
pub fn record_self_approval() {
    SELF_APPROVALS.inc();
}

/// Record a completed state share
#[cfg(feature = "metrics")]
pub fn record_state_shared() {
    STATE_SHARES.inc();
}

/// Record a state share aborted at `step`
#[cfg(feature = "metrics")]
pub fn record_state_share_failure(step: &str) {
    STATE_SHARE_FAILURES.with_label_values(&[step]).inc();
}

/// Record a watcher loop exit
#[cfg(feature = "metrics")]
pub fn record_watcher_exit(watcher: &str, reason: &str) {
    WATCHER_EXITS.with_label_values(&[watcher, reason]).inc();
}

// =============================================================================
// NO-OP IMPLEMENTATIONS (when metrics feature disabled)
// =============================================================================

#[cfg(not(feature = "metrics"))]
pub fn record_contract_tracked() {}

#[cfg(not(feature = "metrics"))]
pub fn record_contract_cancelled() {}

#[cfg(not(feature = "metrics"))]
pub fn record_self_approval() {}

#[cfg(not(feature = "metrics"))]
pub fn record_state_shared() {}

#[cfg(not(feature = "metrics"))]
pub fn record_state_share_failure(_step: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_watcher_exit(_watcher: &str, _reason: &str) {}
