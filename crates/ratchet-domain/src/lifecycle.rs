//! Assurance lifecycle - the claim state machine and its derived tier
//!
//! ```text
//! Draft -> Submitted -> UnderReview -> PeerApproved ----------> ThirdPartyVerified
//!   ^                      |   ^   \-> ConditionallyApproved --/ (remediation) -> UnderReview
//!   |                      v   |
//!   +------ (reopen) --- Rejected
//! ```
//!
//! The tier is never stored independently of the state: it is a pure function
//! of it, so a tier can only move when a state transition is committed.

use crate::review::{Decision, ReviewKind};
use crate::verdict::Verdict;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Assurance tier of a claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Self-declared by the claim owner
    #[serde(rename = "self")]
    SelfDeclared,

    /// Accepted by peer or expert review
    #[serde(rename = "peer")]
    PeerReviewed,

    /// Verified by an independent third party
    Verified,
}

impl Tier {
    /// Get the tier name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::SelfDeclared => "self",
            Tier::PeerReviewed => "peer",
            Tier::Verified => "verified",
        }
    }

    /// Parse a tier from a string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "self" => Some(Tier::SelfDeclared),
            "peer" => Some(Tier::PeerReviewed),
            "verified" => Some(Tier::Verified),
            _ => None,
        }
    }
}

impl std::str::FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid tier: {}", s))
    }
}

/// Lifecycle state of a claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssuranceState {
    /// Being prepared by its owner
    Draft,
    /// Submitted for review, no reviewer assigned yet
    Submitted,
    /// At least one review is in flight
    UnderReview,
    /// Accepted by peer-level review
    PeerApproved,
    /// Accepted subject to remediation evidence
    ConditionallyApproved,
    /// Refused; terminal until reopened
    Rejected,
    /// Verified by a third party; terminal
    ThirdPartyVerified,
}

impl AssuranceState {
    /// Every state, in lifecycle order
    pub const ALL: [AssuranceState; 7] = [
        AssuranceState::Draft,
        AssuranceState::Submitted,
        AssuranceState::UnderReview,
        AssuranceState::PeerApproved,
        AssuranceState::ConditionallyApproved,
        AssuranceState::Rejected,
        AssuranceState::ThirdPartyVerified,
    ];

    /// Get the state name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            AssuranceState::Draft => "draft",
            AssuranceState::Submitted => "submitted",
            AssuranceState::UnderReview => "under_review",
            AssuranceState::PeerApproved => "peer_approved",
            AssuranceState::ConditionallyApproved => "conditionally_approved",
            AssuranceState::Rejected => "rejected",
            AssuranceState::ThirdPartyVerified => "third_party_verified",
        }
    }

    /// Parse a state from a string
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|state| state.as_str() == s)
    }

    /// Tier implied by this state
    pub fn tier(&self) -> Tier {
        match self {
            AssuranceState::Draft | AssuranceState::Submitted | AssuranceState::UnderReview => {
                Tier::SelfDeclared
            }
            AssuranceState::Rejected => Tier::SelfDeclared,
            AssuranceState::PeerApproved | AssuranceState::ConditionallyApproved => {
                Tier::PeerReviewed
            }
            AssuranceState::ThirdPartyVerified => Tier::Verified,
        }
    }

    /// Terminal states accept no further evidence or assignments
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AssuranceState::Rejected | AssuranceState::ThirdPartyVerified
        )
    }

    /// Compute the transition triggered by `event`
    ///
    /// A returned [`Transition`] may leave the state unchanged; callers check
    /// [`Transition::is_change`] before recording a state change.
    ///
    /// # Errors
    /// Returns [`TransitionError`] when the event is not permitted here.
    pub fn apply(self, event: &LifecycleEvent) -> Result<Transition, TransitionError> {
        use AssuranceState::*;

        let to = match (self, event) {
            (Draft, LifecycleEvent::Submit { evidence_count: 0 }) => {
                return Err(TransitionError::MissingEvidence)
            }
            (Draft, LifecycleEvent::Submit { .. }) => Submitted,

            (Submitted, LifecycleEvent::AssignReview { kind }) if kind.is_peer_level() => {
                UnderReview
            }
            (UnderReview | PeerApproved, LifecycleEvent::AssignReview { kind })
                if kind.is_peer_level() =>
            {
                self
            }
            (PeerApproved, LifecycleEvent::AssignReview { kind: ReviewKind::ThirdParty }) => self,

            (Draft | Submitted | Rejected | ThirdPartyVerified, LifecycleEvent::ReviewFinalized { .. }) => {
                self
            }
            (_, LifecycleEvent::ReviewFinalized { decision: Decision::Rejected, .. }) => Rejected,
            (UnderReview, LifecycleEvent::ReviewFinalized { kind, verdict, .. })
                if kind.is_peer_level() =>
            {
                match verdict {
                    Verdict::Awaiting => UnderReview,
                    Verdict::Approve { .. } => PeerApproved,
                    Verdict::Conditional => ConditionallyApproved,
                    // Approvals under the threshold never earn the peer tier
                    Verdict::BelowThreshold { .. } | Verdict::Reject => Rejected,
                }
            }
            (PeerApproved, LifecycleEvent::ReviewFinalized { decision: Decision::Conditional, .. }) => {
                ConditionallyApproved
            }
            (
                PeerApproved,
                LifecycleEvent::ReviewFinalized {
                    kind: ReviewKind::ThirdParty,
                    decision: Decision::Approved,
                    ..
                },
            ) => ThirdPartyVerified,
            (_, LifecycleEvent::ReviewFinalized { .. }) => self,

            (Rejected | ThirdPartyVerified, LifecycleEvent::EvidenceAttached) => {
                return Err(TransitionError::Terminal(self))
            }
            (ConditionallyApproved, LifecycleEvent::EvidenceAttached) => UnderReview,
            (_, LifecycleEvent::EvidenceAttached) => self,

            (Rejected, LifecycleEvent::Reopen) => Draft,

            (_, event) => {
                return Err(TransitionError::NotAllowed {
                    state: self,
                    event: event.name(),
                })
            }
        };

        Ok(Transition { from: self, to })
    }
}

impl std::fmt::Display for AssuranceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AssuranceState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid assurance state: {}", s))
    }
}

/// Something that happened to a claim
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleEvent {
    /// Owner submits the claim for review
    Submit {
        /// Live evidence items attached to the claim
        evidence_count: usize,
    },

    /// A reviewer was assigned
    AssignReview {
        /// Kind of the new review
        kind: ReviewKind,
    },

    /// A review of the current round received its decision
    ReviewFinalized {
        /// Kind of the decided review
        kind: ReviewKind,
        /// The decision just recorded
        decision: Decision,
        /// Verdict of the round's peer-level reviews including this decision
        verdict: Verdict,
    },

    /// New evidence was attached
    EvidenceAttached,

    /// An authorized actor reopened a rejected claim
    Reopen,
}

impl LifecycleEvent {
    /// Short name used in error messages and audit records
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleEvent::Submit { .. } => "submit",
            LifecycleEvent::AssignReview { .. } => "assign_review",
            LifecycleEvent::ReviewFinalized { .. } => "review_finalized",
            LifecycleEvent::EvidenceAttached => "evidence_attached",
            LifecycleEvent::Reopen => "reopen",
        }
    }
}

/// Outcome of applying an event to a state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// State before the event
    pub from: AssuranceState,
    /// State after the event
    pub to: AssuranceState,
}

impl Transition {
    /// Whether the state actually changed
    pub fn is_change(&self) -> bool {
        self.from != self.to
    }

    /// Entering review, or reopening, starts a new review round
    pub fn starts_round(&self) -> bool {
        (self.to == AssuranceState::UnderReview && self.from != AssuranceState::UnderReview)
            || (self.from == AssuranceState::Rejected && self.to == AssuranceState::Draft)
    }
}

/// Reasons a lifecycle event is refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// Submission requires at least one evidence item
    #[error("a claim needs at least one evidence item before submission")]
    MissingEvidence,

    /// The state does not accept this event
    #[error("'{event}' is not allowed while the claim is {state}")]
    NotAllowed {
        /// Current state
        state: AssuranceState,
        /// Event name
        event: &'static str,
    },

    /// The claim is in a terminal state
    #[error("the claim is {0} and accepts no further changes")]
    Terminal(AssuranceState),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::review::Score;
    use AssuranceState::*;

    fn finalized(kind: ReviewKind, decision: Decision, verdict: Verdict) -> LifecycleEvent {
        LifecycleEvent::ReviewFinalized { kind, decision, verdict }
    }

    fn approve(score: u8) -> Verdict {
        Verdict::Approve { lowest: Score::new(score).unwrap() }
    }

    #[test]
    fn test_tier_mapping() {
        assert_eq!(Draft.tier(), Tier::SelfDeclared);
        assert_eq!(Submitted.tier(), Tier::SelfDeclared);
        assert_eq!(UnderReview.tier(), Tier::SelfDeclared);
        assert_eq!(PeerApproved.tier(), Tier::PeerReviewed);
        assert_eq!(ConditionallyApproved.tier(), Tier::PeerReviewed);
        assert_eq!(ThirdPartyVerified.tier(), Tier::Verified);
        assert_eq!(Rejected.tier(), Tier::SelfDeclared);
    }

    #[test]
    fn test_submit_requires_evidence() {
        assert_eq!(
            Draft.apply(&LifecycleEvent::Submit { evidence_count: 0 }),
            Err(TransitionError::MissingEvidence)
        );
        let t = Draft.apply(&LifecycleEvent::Submit { evidence_count: 1 }).unwrap();
        assert_eq!(t.to, Submitted);
    }

    #[test]
    fn test_happy_path() {
        let t = Submitted
            .apply(&LifecycleEvent::AssignReview { kind: ReviewKind::Peer })
            .unwrap();
        assert_eq!(t.to, UnderReview);
        assert!(t.starts_round());

        let t = UnderReview
            .apply(&finalized(ReviewKind::Peer, Decision::Approved, approve(8)))
            .unwrap();
        assert_eq!(t.to, PeerApproved);

        let t = PeerApproved
            .apply(&LifecycleEvent::AssignReview { kind: ReviewKind::ThirdParty })
            .unwrap();
        assert!(!t.is_change());

        let t = PeerApproved
            .apply(&finalized(ReviewKind::ThirdParty, Decision::Approved, Verdict::Awaiting))
            .unwrap();
        assert_eq!(t.to, ThirdPartyVerified);
    }

    #[test]
    fn test_third_party_only_after_peer_approval() {
        assert!(Submitted
            .apply(&LifecycleEvent::AssignReview { kind: ReviewKind::ThirdParty })
            .is_err());
        assert!(UnderReview
            .apply(&LifecycleEvent::AssignReview { kind: ReviewKind::ThirdParty })
            .is_err());
    }

    #[test]
    fn test_rejection_at_any_active_stage() {
        for state in [UnderReview, PeerApproved, ConditionallyApproved] {
            let t = state
                .apply(&finalized(ReviewKind::ThirdParty, Decision::Rejected, Verdict::Reject))
                .unwrap();
            assert_eq!(t.to, Rejected, "from {:?}", state);
        }
    }

    #[test]
    fn test_conditional_loop() {
        let t = UnderReview
            .apply(&finalized(ReviewKind::Expert, Decision::Conditional, Verdict::Conditional))
            .unwrap();
        assert_eq!(t.to, ConditionallyApproved);

        let t = ConditionallyApproved.apply(&LifecycleEvent::EvidenceAttached).unwrap();
        assert_eq!(t.to, UnderReview);
        assert!(t.starts_round());
    }

    #[test]
    fn test_below_threshold_round_is_refused() {
        let low = Verdict::BelowThreshold { lowest: Score::new(0).unwrap() };
        let t = UnderReview
            .apply(&finalized(ReviewKind::Peer, Decision::Approved, low))
            .unwrap();
        assert_eq!(t.to, Rejected);
        assert_eq!(t.to.tier(), Tier::SelfDeclared);
    }

    #[test]
    fn test_terminal_states() {
        assert_eq!(
            Rejected.apply(&LifecycleEvent::EvidenceAttached),
            Err(TransitionError::Terminal(Rejected))
        );
        assert!(Rejected.apply(&LifecycleEvent::Submit { evidence_count: 3 }).is_err());
        assert!(ThirdPartyVerified.apply(&LifecycleEvent::Reopen).is_err());

        let late = ThirdPartyVerified
            .apply(&finalized(ReviewKind::Peer, Decision::Rejected, Verdict::Reject))
            .unwrap();
        assert!(!late.is_change());
    }

    #[test]
    fn test_reopen() {
        let t = Rejected.apply(&LifecycleEvent::Reopen).unwrap();
        assert_eq!(t.to, Draft);
        assert!(t.starts_round());
        assert!(Draft.apply(&LifecycleEvent::Reopen).is_err());
    }

    #[test]
    fn test_state_parse_roundtrip() {
        for state in AssuranceState::ALL {
            assert_eq!(AssuranceState::parse(state.as_str()), Some(state));
        }
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::review::Score;
    use proptest::prelude::*;

    fn kind() -> impl Strategy<Value = ReviewKind> {
        prop_oneof![
            Just(ReviewKind::Peer),
            Just(ReviewKind::Expert),
            Just(ReviewKind::ThirdParty),
        ]
    }

    fn decision() -> impl Strategy<Value = Decision> {
        prop_oneof![
            Just(Decision::Approved),
            Just(Decision::Rejected),
            Just(Decision::Conditional),
        ]
    }

    fn verdict() -> impl Strategy<Value = Verdict> {
        prop_oneof![
            Just(Verdict::Awaiting),
            Just(Verdict::Reject),
            Just(Verdict::Conditional),
            (0u8..=10).prop_map(|s| Verdict::Approve { lowest: Score::new(s).unwrap() }),
            (0u8..=10).prop_map(|s| Verdict::BelowThreshold { lowest: Score::new(s).unwrap() }),
        ]
    }

    fn event() -> impl Strategy<Value = LifecycleEvent> {
        prop_oneof![
            (0usize..3).prop_map(|evidence_count| LifecycleEvent::Submit { evidence_count }),
            kind().prop_map(|kind| LifecycleEvent::AssignReview { kind }),
            (kind(), decision(), verdict()).prop_map(|(kind, decision, verdict)| {
                LifecycleEvent::ReviewFinalized { kind, decision, verdict }
            }),
            Just(LifecycleEvent::EvidenceAttached),
            Just(LifecycleEvent::Reopen),
        ]
    }

    proptest! {
        /// Property: along any accepted event sequence the tier only rises
        /// on a finalized review and only falls on rejection, reopen or the
        /// remediation loop
        #[test]
        fn test_tier_moves_only_with_reviews(events in prop::collection::vec(event(), 0..40)) {
            let mut state = AssuranceState::Draft;
            for event in &events {
                let Ok(t) = state.apply(event) else { continue };
                let (before, after) = (t.from.tier(), t.to.tier());
                if after > before {
                    prop_assert!(
                        matches!(event, LifecycleEvent::ReviewFinalized { .. }),
                        "tier rose on {:?}", event
                    );
                }
                if after < before {
                    prop_assert!(
                        t.to == AssuranceState::Rejected
                            || matches!(event, LifecycleEvent::Reopen | LifecycleEvent::EvidenceAttached),
                        "tier fell on {:?}", event
                    );
                }
                state = t.to;
                prop_assert_eq!(state.tier(), t.to.tier());
            }
        }

        /// Property: a round whose lowest approval misses the threshold never
        /// reaches the peer tier
        #[test]
        fn test_below_threshold_never_peer(
            kind in kind(),
            decision in decision(),
            lowest in 0u8..=10,
        ) {
            let verdict = Verdict::BelowThreshold { lowest: Score::new(lowest).unwrap() };
            if let Ok(t) = AssuranceState::UnderReview
                .apply(&LifecycleEvent::ReviewFinalized { kind, decision, verdict })
            {
                prop_assert_eq!(t.to.tier(), Tier::SelfDeclared);
            }
        }

        /// Property: Submitted is only ever entered with evidence attached
        #[test]
        fn test_submitted_requires_evidence(events in prop::collection::vec(event(), 0..40)) {
            let mut state = AssuranceState::Draft;
            for event in &events {
                let Ok(t) = state.apply(event) else { continue };
                if t.is_change() && t.to == AssuranceState::Submitted {
                    prop_assert!(
                        matches!(event, LifecycleEvent::Submit { evidence_count } if *evidence_count >= 1),
                        "Submitted entered without evidence"
                    );
                }
                state = t.to;
            }
        }

        /// Property: only a third-party approval reaches the verified tier
        #[test]
        fn test_verified_requires_third_party(events in prop::collection::vec(event(), 0..40)) {
            let mut state = AssuranceState::Draft;
            for event in &events {
                let Ok(t) = state.apply(event) else { continue };
                if t.is_change() && t.to == AssuranceState::ThirdPartyVerified {
                    prop_assert!(matches!(
                        event,
                        LifecycleEvent::ReviewFinalized {
                            kind: ReviewKind::ThirdParty,
                            decision: Decision::Approved,
                            ..
                        }
                    ), "ThirdPartyVerified entered without third-party approval");
                }
                state = t.to;
            }
        }
    }
}
