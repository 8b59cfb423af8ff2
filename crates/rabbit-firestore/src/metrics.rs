//! Firestore metrics.

use metrics::{counter, histogram};

pub mod names {
    /// Total Firestore requests by operation and status.
    pub const REQUESTS_TOTAL: &str = "firestore_requests_total";

    /// Total retry attempts by operation.
    pub const RETRIES_TOTAL: &str = "firestore_retries_total";

    /// Request latency in seconds by operation.
    pub const LATENCY_SECONDS: &str = "firestore_latency_seconds";

    /// Documents returned by list/query calls, by collection.
    pub const DOCUMENTS_RETURNED_TOTAL: &str = "firestore_documents_returned_total";

    /// Ledger commits by operation type and outcome.
    pub const LEDGER_COMMITS_TOTAL: &str = "firestore_ledger_commits_total";

    /// Ledger plan attempts lost to a concurrent writer.
    pub const LEDGER_CONFLICTS_TOTAL: &str = "firestore_ledger_conflicts_total";
}

/// Record metrics for a completed Firestore request.
pub fn record_request(operation: &str, status: u16, latency_ms: f64) {
    counter!(
        names::REQUESTS_TOTAL,
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        names::LATENCY_SECONDS,
        "operation" => operation.to_string()
    )
    .record(latency_ms / 1000.0);
}

/// Record a retry attempt.
pub fn record_retry(operation: &str) {
    counter!(
        names::RETRIES_TOTAL,
        "operation" => operation.to_string()
    )
    .increment(1);
}

pub fn record_documents_returned(collection: &str, count: usize) {
    counter!(
        names::DOCUMENTS_RETURNED_TOTAL,
        "collection" => collection.to_string()
    )
    .increment(count as u64);
}

/// Record the outcome of a ledger transaction.
pub fn record_ledger_commit(operation: &str, outcome: &'static str) {
    counter!(
        names::LEDGER_COMMITS_TOTAL,
        "operation" => operation.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_ledger_conflict(operation: &str) {
    counter!(
        names::LEDGER_CONFLICTS_TOTAL,
        "operation" => operation.to_string()
    )
    .increment(1);
}
