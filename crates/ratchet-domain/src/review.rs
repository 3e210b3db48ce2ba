//! Reviews - a reviewer's judgment on a claim

use crate::{ActorRef, ClaimId, ReviewId};
use crate::lifecycle::AssuranceState;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewKind {
    /// Review by a peer practitioner
    Peer,
    /// Review by a subject-matter expert
    Expert,
    /// Independent third-party verification
    ThirdParty,
}

impl ReviewKind {
    /// Get the kind name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewKind::Peer => "peer",
            ReviewKind::Expert => "expert",
            ReviewKind::ThirdParty => "third_party",
        }
    }

    /// Parse a kind from a string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "peer" => Some(ReviewKind::Peer),
            "expert" => Some(ReviewKind::Expert),
            "third_party" | "thirdparty" => Some(ReviewKind::ThirdParty),
            _ => None,
        }
    }

    /// Peer and expert reviews both count toward the peer tier
    pub fn is_peer_level(&self) -> bool {
        matches!(self, ReviewKind::Peer | ReviewKind::Expert)
    }
}

impl std::str::FromStr for ReviewKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid review kind: {}", s))
    }
}

/// Decision carried by a review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Assigned, no judgment yet
    Pending,
    /// Claim accepted
    Approved,
    /// Claim refused
    Rejected,
    /// Accepted subject to remediation evidence
    Conditional,
}

impl Decision {
    /// Get the decision name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Pending => "pending",
            Decision::Approved => "approved",
            Decision::Rejected => "rejected",
            Decision::Conditional => "conditional",
        }
    }

    /// Parse a decision from a string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Decision::Pending),
            "approved" | "approve" => Some(Decision::Approved),
            "rejected" | "reject" => Some(Decision::Rejected),
            "conditional" => Some(Decision::Conditional),
            _ => None,
        }
    }

    /// Whether this decision finalizes a review
    pub fn is_final(&self) -> bool {
        !matches!(self, Decision::Pending)
    }
}

impl std::str::FromStr for Decision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid decision: {}", s))
    }
}

/// Review score on a bounded 0..=10 scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Score(u8);

impl Score {
    /// Highest possible score
    pub const MAX: u8 = 10;

    /// Create a score
    ///
    /// # Errors
    /// Returns error if the value exceeds [`Score::MAX`]
    pub fn new(value: u8) -> Result<Self, String> {
        if value > Self::MAX {
            return Err(format!("Score {} is outside [0, {}]", value, Self::MAX));
        }
        Ok(Self(value))
    }

    /// Create a score, capping values above [`Score::MAX`]
    pub fn saturating(value: u8) -> Self {
        Self(value.min(Self::MAX))
    }

    /// Get the raw value
    pub fn value(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Score {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Score> for u8 {
    fn from(score: Score) -> Self {
        score.0
    }
}

/// Errors raised when finalizing a review
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReviewError {
    /// The review already carries a final decision
    #[error("review {0} is already finalized")]
    AlreadyFinalized(ReviewId),

    /// `pending` is not a decision that can be recorded
    #[error("a pending decision cannot be recorded")]
    PendingDecision,
}

/// A reviewer's judgment on a claim at a point in its lifecycle
///
/// A review is immutable once finalized; a correction is a new review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    /// Unique identifier
    pub id: ReviewId,

    /// Claim under review
    pub claim_id: ClaimId,

    /// Reviewer identity (opaque)
    pub reviewer: ActorRef,

    /// Kind of review
    pub kind: ReviewKind,

    /// Current decision
    pub decision: Decision,

    /// Score, present once finalized
    pub score: Option<Score>,

    /// Reviewer comment
    pub comment: Option<String>,

    /// Review round of the claim this review was assigned in
    pub round: u32,

    /// State the claim moved to because of this decision, if any
    pub resulting_state: Option<AssuranceState>,

    /// When the review was assigned
    pub assigned_at: u64,

    /// When the decision was recorded
    pub decided_at: Option<u64>,

    /// Hidden by an audited tombstone of the owning claim
    pub tombstoned: bool,
}

impl Review {
    /// Create a pending review assignment
    pub fn assign(
        claim_id: ClaimId,
        reviewer: ActorRef,
        kind: ReviewKind,
        round: u32,
        assigned_at: u64,
    ) -> Self {
        Self {
            id: ReviewId::new(),
            claim_id,
            reviewer,
            kind,
            decision: Decision::Pending,
            score: None,
            comment: None,
            round,
            resulting_state: None,
            assigned_at,
            decided_at: None,
            tombstoned: false,
        }
    }

    /// Whether a decision has been recorded
    pub fn is_finalized(&self) -> bool {
        self.decision.is_final()
    }

    /// Produce the finalized form of this review
    ///
    /// # Errors
    /// Fails if the review is already finalized or `decision` is pending.
    pub fn finalize(
        &self,
        decision: Decision,
        score: Score,
        comment: Option<String>,
        decided_at: u64,
    ) -> Result<Review, ReviewError> {
        if self.is_finalized() {
            return Err(ReviewError::AlreadyFinalized(self.id));
        }
        if !decision.is_final() {
            return Err(ReviewError::PendingDecision);
        }
        Ok(Review {
            decision,
            score: Some(score),
            comment,
            decided_at: Some(decided_at),
            ..self.clone()
        })
    }
}
