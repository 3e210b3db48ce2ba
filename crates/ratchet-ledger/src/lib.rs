//! Ratchet Integrity Ledger
//!
//! An append-only, hash-chained audit log. Every entry's digest is a function
//! of the previous digest and the entry's content, so recomputing the chain
//! from the genesis seed must reproduce every stored digest; any difference
//! means the ledger has been altered.
//!
//! This crate owns the chaining function and verification. Persistence lives
//! in `ratchet-store`, which seals entries in the same transaction as the
//! entity writes they describe.
//!
//! # Examples
//!
//! ```
//! use ratchet_ledger::{ChainHead, EntityRef, LedgerAction, PendingEntry, StateDelta, verify_entries};
//! use ratchet_domain::{ActorRef, ClaimId};
//!
//! let claim_id = ClaimId::new();
//! let entry = ChainHead::genesis().seal(PendingEntry {
//!     actor: ActorRef::new("user:alice").unwrap(),
//!     action: LedgerAction::ClaimCreated,
//!     entity: EntityRef::claim(claim_id),
//!     claim_id,
//!     delta: StateDelta::created(serde_json::json!({"state": "draft"})),
//!     timestamp: 0,
//! }).unwrap();
//!
//! let report = verify_entries(ChainHead::genesis(), [&entry], 1).unwrap();
//! assert!(report.is_intact());
//! ```

#![warn(missing_docs)]

mod chain;
mod entry;
mod error;
mod verify;

pub use chain::{canonicalize, expected_digest, ChainDigest, ChainHead, GENESIS_LABEL};
pub use entry::{
    AppendReceipt, EntityKind, EntityRef, LedgerAction, LedgerEntry, PendingEntry, StateDelta,
};
pub use error::LedgerError;
pub use verify::{verify_entries, ChainDivergence, ChainReport, DivergenceKind};

/// Read access to a persisted ledger
///
/// Implemented by the infrastructure layer (ratchet-store)
pub trait LedgerReader {
    /// Error type for read operations
    type Error: From<LedgerError>;

    /// Last sealed position
    fn chain_head(&self) -> Result<ChainHead, Self::Error>;

    /// Entry at `seq`
    fn entry(&self, seq: u64) -> Result<Option<LedgerEntry>, Self::Error>;

    /// Entries with `from <= seq <= to`, in order
    fn entries(&self, from: u64, to: u64) -> Result<Vec<LedgerEntry>, Self::Error>;

    /// Every entry about `entity_id`, in order
    fn history_for_entity(&self, entity_id: &str) -> Result<Vec<LedgerEntry>, Self::Error>;

    /// Recompute digests for `from..=to` and report the first divergence
    ///
    /// The range is anchored at the stored digest of `from - 1`; verify from
    /// 1 to trust nothing but the genesis seed. `to` is clamped to the chain
    /// head; a range starting past the head is invalid.
    fn verify_chain(&self, from: u64, to: u64) -> Result<ChainReport, Self::Error> {
        if from == 0 || from > to {
            return Err(LedgerError::InvalidRange { from, to }.into());
        }
        let head = self.chain_head()?;
        if from > head.seq {
            return Err(LedgerError::InvalidRange { from, to }.into());
        }
        let to = to.min(head.seq);
        let anchor = if from == 1 {
            ChainHead::genesis()
        } else {
            match self.entry(from - 1)? {
                Some(prev) => ChainHead::at(&prev),
                None => {
                    return Ok(ChainReport {
                        from_seq: from,
                        to_seq: to,
                        verified: 0,
                        divergence: Some(ChainDivergence {
                            seq: from - 1,
                            kind: DivergenceKind::SequenceGap { expected_seq: from - 1 },
                        }),
                    })
                }
            }
        };
        let entries = self.entries(from, to)?;
        Ok(verify_entries(anchor, &entries, to)?)
    }

    /// Verify the whole chain from the genesis seed
    fn verify_all(&self) -> Result<ChainReport, Self::Error> {
        let head = self.chain_head()?;
        if head.seq == 0 {
            return Ok(ChainReport {
                from_seq: 1,
                to_seq: 0,
                verified: 0,
                divergence: None,
            });
        }
        self.verify_chain(1, head.seq)
    }
}
