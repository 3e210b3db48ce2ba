//! Units of work: entity writes plus the audit entries that describe them

use ratchet_domain::{Claim, ClaimId, Evidence, Review};
use ratchet_ledger::PendingEntry;

/// A single entity mutation
#[derive(Debug, Clone)]
pub enum EntityWrite {
    /// Insert a new claim
    InsertClaim(Claim),
    /// Replace a claim's stored fields
    UpdateClaim(Claim),
    /// Insert a new evidence item
    InsertEvidence(Evidence),
    /// Insert a pending review
    InsertReview(Review),
    /// Store the decision of a review that is still pending
    ///
    /// Fails with a conflict if the stored review is no longer pending.
    FinalizeReview(Review),
    /// Tombstone a claim and cascade to its evidence and reviews
    Tombstone {
        /// Claim to tombstone
        claim_id: ClaimId,
        /// Modification timestamp
        at: u64,
    },
}

/// Entity writes and ledger entries committed as one transaction
///
/// A unit without ledger entries is refused: every committed write is audited.
#[derive(Debug, Clone, Default)]
pub struct UnitOfWork {
    pub(crate) writes: Vec<EntityWrite>,
    pub(crate) entries: Vec<PendingEntry>,
}

impl UnitOfWork {
    /// Create an empty unit
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity write
    pub fn write(mut self, write: EntityWrite) -> Self {
        self.writes.push(write);
        self
    }

    /// Add an audit entry
    pub fn record(mut self, entry: PendingEntry) -> Self {
        self.entries.push(entry);
        self
    }

    /// Number of audit entries the unit will append
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}
