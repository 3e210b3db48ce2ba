//! Chain verification
//!
//! Verification recomputes digests and reports the first divergence. It
//! never repairs anything: reconciliation is an administrative matter.

use crate::chain::{expected_digest, ChainDigest, ChainHead};
use crate::entry::LedgerEntry;
use crate::LedgerError;
use serde::Serialize;

/// How the chain diverged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum DivergenceKind {
    /// The stored digest differs from the recomputed one
    DigestMismatch {
        /// Digest recomputed from the predecessor
        expected: ChainDigest,
        /// Digest found in storage
        stored: ChainDigest,
    },
    /// An entry is missing or out of order
    SequenceGap {
        /// Sequence number that should have come next
        expected_seq: u64,
    },
}

/// First point where the chain stops reproducing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChainDivergence {
    /// Sequence number of the offending entry
    pub seq: u64,
    /// What went wrong
    #[serde(flatten)]
    pub kind: DivergenceKind,
}

/// Result of verifying a range of the chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainReport {
    /// First sequence number checked
    pub from_seq: u64,
    /// Last sequence number requested
    pub to_seq: u64,
    /// Number of entries whose digest reproduced
    pub verified: u64,
    /// First divergence, if any
    pub divergence: Option<ChainDivergence>,
}

impl ChainReport {
    /// Whether every entry in the range reproduced
    pub fn is_intact(&self) -> bool {
        self.divergence.is_none()
    }
}

/// Verify `entries` as the continuation of `anchor`
///
/// Entries must be in sequence order starting at `anchor.seq + 1`.
pub fn verify_entries<'a, I>(
    anchor: ChainHead,
    entries: I,
    to_seq: u64,
) -> Result<ChainReport, LedgerError>
where
    I: IntoIterator<Item = &'a LedgerEntry>,
{
    let from_seq = anchor.seq + 1;
    let mut head = anchor;
    let mut verified = 0;

    for entry in entries {
        let expected_seq = head.seq + 1;
        if entry.seq != expected_seq {
            return Ok(ChainReport {
                from_seq,
                to_seq,
                verified,
                divergence: Some(ChainDivergence {
                    seq: entry.seq,
                    kind: DivergenceKind::SequenceGap { expected_seq },
                }),
            });
        }

        let expected = expected_digest(&head.digest, entry)?;
        if expected != entry.digest {
            return Ok(ChainReport {
                from_seq,
                to_seq,
                verified,
                divergence: Some(ChainDivergence {
                    seq: entry.seq,
                    kind: DivergenceKind::DigestMismatch {
                        expected,
                        stored: entry.digest,
                    },
                }),
            });
        }

        head = ChainHead::at(entry);
        verified += 1;
    }

    // Entries missing from the tail of the requested range
    let divergence = if head.seq < to_seq {
        Some(ChainDivergence {
            seq: head.seq + 1,
            kind: DivergenceKind::SequenceGap { expected_seq: head.seq + 1 },
        })
    } else {
        None
    };

    Ok(ChainReport {
        from_seq,
        to_seq,
        verified,
        divergence,
    })
}
