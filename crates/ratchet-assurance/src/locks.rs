//! Claim-scoped exclusive locks

use dashmap::DashMap;
use parking_lot::Mutex;
use ratchet_domain::ClaimId;
use std::sync::Arc;

/// One mutex per claim, created on first use
///
/// Mutations of a claim (and of its evidence and reviews) hold the claim's
/// mutex from validation through commit. Different claims never contend.
#[derive(Debug, Default)]
pub struct ClaimLocks {
    locks: DashMap<ClaimId, Arc<Mutex<()>>>,
}

impl ClaimLocks {
    /// Create an empty lock table
    pub fn new() -> Self {
        Self::default()
    }

    /// The mutex guarding `claim_id`
    ///
    /// The map shard is released before returning, so locking the mutex
    /// never blocks other claims.
    pub fn for_claim(&self, claim_id: ClaimId) -> Arc<Mutex<()>> {
        Arc::clone(self.locks.entry(claim_id).or_default().value())
    }

    /// Number of claims that have been locked at least once
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Whether no claim has been locked yet
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
