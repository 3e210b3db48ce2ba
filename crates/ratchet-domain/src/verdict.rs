//! Aggregation of peer-level decisions within a review round
//!
//! Assurance is a trust ratchet: a single rejection outweighs any number of
//! approvals, and among approvals the lowest score governs.

use crate::review::{Decision, Review, Score};
use serde::{Deserialize, Serialize};

/// Combined outcome of the peer and expert reviews in one round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "verdict")]
pub enum Verdict {
    /// Reviews are still pending, or none has been decided
    Awaiting,
    /// Every review approved and the lowest score meets the threshold
    Approve {
        /// Lowest approval score in the round
        lowest: Score,
    },
    /// Every review approved but the lowest score is under the threshold
    BelowThreshold {
        /// Lowest approval score in the round
        lowest: Score,
    },
    /// At least one reviewer asked for remediation
    Conditional,
    /// At least one reviewer rejected the claim
    Reject,
}

/// Compute the verdict of a round
///
/// Only peer and expert reviews of `round` are considered. A rejection wins
/// immediately even while other reviews are pending; every other outcome
/// waits until the round has no pending peer-level review.
pub fn round_verdict<'a, I>(reviews: I, round: u32, threshold: Score) -> Verdict
where
    I: IntoIterator<Item = &'a Review>,
{
    let mut pending = false;
    let mut conditional = false;
    let mut lowest: Option<Score> = None;

    for review in reviews {
        if review.round != round || !review.kind.is_peer_level() || review.tombstoned {
            continue;
        }
        match review.decision {
            Decision::Rejected => return Verdict::Reject,
            Decision::Pending => pending = true,
            Decision::Conditional => conditional = true,
            Decision::Approved => {
                if let Some(score) = review.score {
                    lowest = Some(lowest.map_or(score, |l| l.min(score)));
                }
            }
        }
    }

    if pending {
        return Verdict::Awaiting;
    }
    if conditional {
        return Verdict::Conditional;
    }
    match lowest {
        Some(lowest) if lowest >= threshold => Verdict::Approve { lowest },
        Some(lowest) => Verdict::BelowThreshold { lowest },
        None => Verdict::Awaiting,
    }
}
