//! Review orchestration
//!
//! Assigns reviewers and records their decisions. A decision and the state
//! transition it drives commit as one unit with their ledger entries; the
//! claim's lock is held from re-reading the review until the commit, so two
//! decisions on the same review can never both succeed.

use crate::engine::{advance, pending, transition_entry, AssuranceEngine};
use crate::notify::ReviewNotice;
use crate::{AssuranceError, Result};
use ratchet_domain::{
    current_timestamp, round_verdict, ActorRef, AssuranceState, Claim, ClaimId, Decision,
    LifecycleEvent, Review, ReviewId, ReviewKind, Score, Transition, Verdict,
};
use ratchet_ledger::{EntityRef, LedgerAction, StateDelta};
use ratchet_store::{EntityWrite, UnitOfWork};
use tracing::{info, warn};

/// What a recorded decision did
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionOutcome {
    /// The finalized review
    pub review: Review,
    /// The claim after the decision
    pub claim: Claim,
    /// Verdict of the review's round
    pub verdict: Verdict,
    /// State change driven by the decision, if any
    pub transition: Option<Transition>,
}

impl AssuranceEngine {
    /// Assign a reviewer to a claim
    ///
    /// Peer and expert reviews may be assigned while the claim is submitted,
    /// under review or peer approved; the first one starts a review round.
    /// Third-party reviews require a peer-approved claim. Each round has at
    /// most one pending review per kind.
    pub fn assign_review(
        &self,
        actor: &ActorRef,
        claim_id: ClaimId,
        reviewer: ActorRef,
        kind: ReviewKind,
    ) -> Result<Review> {
        let lock = self.locks.for_claim(claim_id);
        let _guard = lock.lock();

        let claim = self.live_claim(claim_id)?;
        let event = LifecycleEvent::AssignReview { kind };
        let transition = claim.state.apply(&event)?;

        let now = current_timestamp();
        let updated = advance(&claim, transition, now);

        if let Some(existing) = self.store.pending_review(claim_id, kind, updated.review_round)? {
            self.metrics.record_conflict();
            return Err(AssuranceError::Conflict(format!(
                "claim {} already has pending {} review {} in round {}",
                claim_id,
                kind.as_str(),
                existing.id,
                updated.review_round
            )));
        }

        let review = Review::assign(claim_id, reviewer, kind, updated.review_round, now);

        let mut unit = UnitOfWork::new()
            .write(EntityWrite::InsertReview(review.clone()))
            .record(pending(
                actor,
                LedgerAction::ReviewAssigned,
                EntityRef::review(review.id),
                claim_id,
                StateDelta::created(serde_json::to_value(&review)?),
                now,
            ));
        if transition.is_change() {
            unit = unit
                .write(EntityWrite::UpdateClaim(updated.clone()))
                .record(transition_entry(
                    actor,
                    LedgerAction::StateTransitioned,
                    &updated,
                    transition,
                    &event,
                ));
        }
        self.commit(unit)?;

        self.metrics.record_review_assigned();
        if transition.is_change() {
            self.metrics.record_transition();
        }
        info!(
            claim = %claim_id,
            review = %review.id,
            reviewer = %review.reviewer,
            kind = kind.as_str(),
            round = review.round,
            "Review assigned"
        );

        if let Some(notifier) = &self.notifier {
            let notice = ReviewNotice {
                review_id: review.id,
                claim_id,
                reviewer: review.reviewer.clone(),
                kind,
                round: review.round,
            };
            if let Err(e) = notifier.enqueue(notice) {
                warn!(review = %review.id, error = %e, "Reviewer notice not queued");
            }
        }

        Ok(review)
    }

    /// Record the decision of a pending review
    ///
    /// A rejection moves the claim to rejected at once. Other decisions of a
    /// peer or expert review wait for the round's remaining reviews, then the
    /// lowest approval score decides between peer approval and conditional
    /// approval. Decisions on reviews of an earlier round are recorded but
    /// drive no transition.
    ///
    /// # Errors
    ///
    /// [`AssuranceError::Conflict`] if the review already has a decision.
    pub fn record_decision(
        &self,
        actor: &ActorRef,
        review_id: ReviewId,
        decision: Decision,
        score: u8,
        comment: Option<String>,
    ) -> Result<DecisionOutcome> {
        let score = Score::new(score).map_err(AssuranceError::Validation)?;
        if !decision.is_final() {
            return Err(AssuranceError::Validation(
                "a pending decision cannot be recorded".to_string(),
            ));
        }

        let claim_id = self.live_review(review_id)?.claim_id;
        let lock = self.locks.for_claim(claim_id);
        let _guard = lock.lock();

        // Re-read under the lock: a concurrent decision may have landed
        let review = self.live_review(review_id)?;
        if review.is_finalized() {
            self.metrics.record_conflict();
            warn!(review = %review_id, decision = review.decision.as_str(), "Review already decided");
            return Err(AssuranceError::Conflict(format!(
                "review {} was already decided ({})",
                review_id,
                review.decision.as_str()
            )));
        }

        let claim = self.live_claim(claim_id)?;
        let now = current_timestamp();
        let mut decided = review.finalize(decision, score, comment, now)?;

        let current_round = review.round == claim.review_round;
        let verdict = if current_round && review.kind.is_peer_level() {
            let mut reviews = self.store.reviews_for_claim(claim_id)?;
            for r in reviews.iter_mut().filter(|r| r.id == review_id) {
                *r = decided.clone();
            }
            round_verdict(&reviews, claim.review_round, self.config.threshold())
        } else {
            Verdict::Awaiting
        };

        let event = LifecycleEvent::ReviewFinalized {
            kind: review.kind,
            decision,
            verdict,
        };
        let transition = if current_round {
            claim.state.apply(&event)?
        } else {
            Transition {
                from: claim.state,
                to: claim.state,
            }
        };
        if transition.is_change() {
            decided.resulting_state = Some(transition.to);
        }

        let updated = if transition.is_change() {
            advance(&claim, transition, now)
        } else {
            claim
        };

        let mut unit = UnitOfWork::new()
            .write(EntityWrite::FinalizeReview(decided.clone()))
            .record(pending(
                actor,
                LedgerAction::ReviewDecided,
                EntityRef::review(review_id),
                claim_id,
                StateDelta::changed(
                    serde_json::to_value(&review)?,
                    serde_json::to_value(&decided)?,
                ),
                now,
            ));
        if transition.is_change() {
            unit = unit
                .write(EntityWrite::UpdateClaim(updated.clone()))
                .record(transition_entry(
                    actor,
                    LedgerAction::StateTransitioned,
                    &updated,
                    transition,
                    &event,
                ));
        }
        self.commit(unit)?;

        self.metrics.record_decision();
        if transition.is_change() {
            self.metrics.record_transition();
            if transition.to == AssuranceState::Rejected {
                self.metrics.record_rejection();
            }
        }
        info!(
            claim = %claim_id,
            review = %review_id,
            decision = decision.as_str(),
            score = score.value(),
            state = %updated.state,
            tier = updated.tier().as_str(),
            "Review decision recorded"
        );

        Ok(DecisionOutcome {
            review: decided,
            claim: updated,
            verdict,
            transition: transition.is_change().then_some(transition),
        })
    }

    /// Get a live review
    pub fn get_review(&self, review_id: ReviewId) -> Result<Review> {
        self.live_review(review_id)
    }

    fn live_review(&self, review_id: ReviewId) -> Result<Review> {
        match self.store.get_review(review_id)? {
            Some(review) if !review.tombstoned => Ok(review),
            _ => Err(AssuranceError::NotFound(format!("review {}", review_id))),
        }
    }
}
