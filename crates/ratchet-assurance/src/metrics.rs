//! Metrics collection for assurance operations

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by the engine and the notification worker
#[derive(Debug, Default)]
pub struct AssuranceMetrics {
    claims_created: AtomicU64,
    evidence_attached: AtomicU64,
    reviews_assigned: AtomicU64,
    decisions_recorded: AtomicU64,
    transitions: AtomicU64,
    rejections: AtomicU64,
    conflicts: AtomicU64,
    integrity_violations: AtomicU64,
    notifications_sent: AtomicU64,
    notifications_failed: AtomicU64,
}

/// Point-in-time copy of [`AssuranceMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Claims created
    pub claims_created: u64,
    /// Evidence items attached
    pub evidence_attached: u64,
    /// Reviews assigned
    pub reviews_assigned: u64,
    /// Review decisions recorded
    pub decisions_recorded: u64,
    /// Lifecycle state changes
    pub transitions: u64,
    /// Claims moved to rejected
    pub rejections: u64,
    /// Operations refused with a conflict
    pub conflicts: u64,
    /// Evidence or ledger integrity failures
    pub integrity_violations: u64,
    /// Reviewer notifications delivered
    pub notifications_sent: u64,
    /// Reviewer notifications dropped or failed
    pub notifications_failed: u64,
}

macro_rules! counter {
    ($($record:ident => $field:ident),* $(,)?) => {
        impl AssuranceMetrics {
            $(
                #[doc = concat!("Increment `", stringify!($field), "`")]
                pub fn $record(&self) {
                    self.$field.fetch_add(1, Ordering::Relaxed);
                }
            )*

            /// Copy the current counter values
            pub fn snapshot(&self) -> MetricsSnapshot {
                MetricsSnapshot {
                    $($field: self.$field.load(Ordering::Relaxed),)*
                }
            }
        }
    };
}

counter! {
    record_claim_created => claims_created,
    record_evidence_attached => evidence_attached,
    record_review_assigned => reviews_assigned,
    record_decision => decisions_recorded,
    record_transition => transitions,
    record_rejection => rejections,
    record_conflict => conflicts,
    record_integrity_violation => integrity_violations,
    record_notification_sent => notifications_sent,
    record_notification_failed => notifications_failed,
}

impl AssuranceMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }
}

impl MetricsSnapshot {
    /// Generate a summary report of metrics
    pub fn summary(&self) -> String {
        [
            "Assurance Metrics Summary".to_string(),
            "=========================".to_string(),
            format!("Claims created: {}", self.claims_created),
            format!("Evidence attached: {}", self.evidence_attached),
            format!("Reviews assigned: {}", self.reviews_assigned),
            format!("Decisions recorded: {}", self.decisions_recorded),
            format!("State transitions: {}", self.transitions),
            format!("Rejections: {}", self.rejections),
            format!("Conflicts: {}", self.conflicts),
            format!("Integrity violations: {}", self.integrity_violations),
            format!(
                "Notifications: {} sent, {} failed",
                self.notifications_sent, self.notifications_failed
            ),
        ]
        .join("\n")
    }
}
