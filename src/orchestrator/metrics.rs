use metrics::{Counter, Histogram};
use metrics_derive::Metrics;

/// Metrics for an [`Orchestrator`](crate::orchestrator::Orchestrator).
#[derive(Metrics)]
#[metrics(scope = "depositor")]
pub struct OrchestratorMetrics {
    /// Number of submitted lookups.
    pub lookups: Counter,
    /// Number of lookups that found no gift.
    pub not_found: Counter,
    /// Number of lookups that failed.
    pub lookup_errors: Counter,
    /// Number of sent approvals.
    pub approvals: Counter,
    /// Number of sent deposits.
    pub deposits: Counter,
    /// Number of confirmed deposits.
    pub confirmed: Counter,
    /// Number of failed deposits.
    pub failed: Counter,
    /// Time it takes to include deposits, in milliseconds.
    pub confirmation_time: Histogram,
}
