//! End-to-end lifecycle scenarios through the assurance engine

mod common;

use common::*;
use ratchet_assurance::{AssuranceConfig, AssuranceEngine, AssuranceError, GraphOptions};
use ratchet_domain::traits::StaticDirectory;
use ratchet_domain::{
    AssuranceState, ClaimUpdate, Decision, EvidenceContent, EvidenceKind, ProjectRef, ReviewKind,
    Tier,
};
use ratchet_graph::EdgeKind;
use ratchet_ledger::LedgerAction;
use ratchet_store::SqliteStore;
use serde_json::json;
use std::sync::Arc;

#[test]
fn test_peer_approval_promotes_to_peer_tier() {
    let engine = engine();
    let claim = submitted_claim(&engine);
    assert_eq!(claim.state, AssuranceState::Submitted);
    assert_eq!(claim.tier(), Tier::SelfDeclared);

    let review = engine
        .assign_review(&owner(), claim.id, actor("reviewer:r1"), ReviewKind::Peer)
        .unwrap();
    assert_eq!(review.round, 1);
    assert_eq!(
        engine.get_claim(claim.id).unwrap().state,
        AssuranceState::UnderReview
    );

    let outcome = engine
        .record_decision(&actor("reviewer:r1"), review.id, Decision::Approved, 8, None)
        .unwrap();
    assert_eq!(outcome.claim.state, AssuranceState::PeerApproved);
    assert_eq!(outcome.claim.tier(), Tier::PeerReviewed);
    assert_eq!(outcome.review.resulting_state, Some(AssuranceState::PeerApproved));

    let stored = engine.get_claim(claim.id).unwrap();
    assert_eq!(stored.tier(), Tier::PeerReviewed);

    let report = engine.ensure_chain_intact().unwrap();
    // create, attach, submit, assign, transition, decide, transition
    assert_eq!(report.verified, 7);

    let history = engine.history_for_entity(&claim.id.to_string()).unwrap();
    let actions: Vec<LedgerAction> = history.iter().map(|e| e.action).collect();
    assert_eq!(
        actions,
        vec![
            LedgerAction::ClaimCreated,
            LedgerAction::ClaimSubmitted,
            LedgerAction::StateTransitioned,
            LedgerAction::StateTransitioned,
        ]
    );
    assert_eq!(history[3].delta.after["tier"], "peer");
}

#[test]
fn test_rejection_requires_audited_reopen() {
    let engine = engine();
    let claim = submitted_claim(&engine);
    let review = engine
        .assign_review(&owner(), claim.id, actor("reviewer:r1"), ReviewKind::Peer)
        .unwrap();

    let outcome = engine
        .record_decision(
            &actor("reviewer:r1"),
            review.id,
            Decision::Rejected,
            2,
            Some("baseline missing".to_string()),
        )
        .unwrap();
    assert_eq!(outcome.claim.state, AssuranceState::Rejected);
    assert_eq!(outcome.claim.tier(), Tier::SelfDeclared);

    let resubmit = engine.submit_claim(&owner(), claim.id);
    assert!(matches!(resubmit, Err(AssuranceError::Prerequisite(_))));

    let by_owner = engine.reopen_claim(&owner(), claim.id);
    assert!(matches!(by_owner, Err(AssuranceError::Unauthorized(_))));

    let reopened = engine.reopen_claim(&actor(ADMIN), claim.id).unwrap();
    assert_eq!(reopened.state, AssuranceState::Draft);
    assert_eq!(reopened.review_round, 2);

    let history = engine.history_for_entity(&claim.id.to_string()).unwrap();
    let reopen = history.last().unwrap();
    assert_eq!(reopen.action, LedgerAction::ClaimReopened);
    assert_eq!(reopen.actor.as_str(), ADMIN);

    let resubmitted = engine.submit_claim(&owner(), claim.id).unwrap();
    assert_eq!(resubmitted.state, AssuranceState::Submitted);
}

#[test]
fn test_rejection_outweighs_high_approval() {
    let engine = engine();
    let claim = submitted_claim(&engine);
    let peer = engine
        .assign_review(&owner(), claim.id, actor("reviewer:peer"), ReviewKind::Peer)
        .unwrap();
    let expert = engine
        .assign_review(&owner(), claim.id, actor("reviewer:expert"), ReviewKind::Expert)
        .unwrap();

    let first = engine
        .record_decision(&actor("reviewer:peer"), peer.id, Decision::Approved, 9, None)
        .unwrap();
    assert_eq!(first.claim.state, AssuranceState::UnderReview);
    assert!(first.transition.is_none());

    let second = engine
        .record_decision(&actor("reviewer:expert"), expert.id, Decision::Rejected, 3, None)
        .unwrap();
    assert_eq!(second.claim.state, AssuranceState::Rejected);
}

#[test]
fn test_rejection_wins_before_round_completes() {
    let engine = engine();
    let claim = submitted_claim(&engine);
    let peer = engine
        .assign_review(&owner(), claim.id, actor("reviewer:peer"), ReviewKind::Peer)
        .unwrap();
    let expert = engine
        .assign_review(&owner(), claim.id, actor("reviewer:expert"), ReviewKind::Expert)
        .unwrap();

    let rejected = engine
        .record_decision(&actor("reviewer:expert"), expert.id, Decision::Rejected, 1, None)
        .unwrap();
    assert_eq!(rejected.claim.state, AssuranceState::Rejected);

    // A late approval is recorded but cannot lift the claim
    let late = engine
        .record_decision(&actor("reviewer:peer"), peer.id, Decision::Approved, 9, None)
        .unwrap();
    assert_eq!(late.claim.state, AssuranceState::Rejected);
    assert_eq!(late.review.decision, Decision::Approved);
    assert!(late.review.resulting_state.is_none());
}

#[test]
fn test_lowest_score_below_threshold_is_refused() {
    let engine = engine();
    let claim = submitted_claim(&engine);
    let peer = engine
        .assign_review(&owner(), claim.id, actor("reviewer:peer"), ReviewKind::Peer)
        .unwrap();
    let expert = engine
        .assign_review(&owner(), claim.id, actor("reviewer:expert"), ReviewKind::Expert)
        .unwrap();

    engine
        .record_decision(&actor("reviewer:peer"), peer.id, Decision::Approved, 9, None)
        .unwrap();
    let outcome = engine
        .record_decision(&actor("reviewer:expert"), expert.id, Decision::Approved, 5, None)
        .unwrap();
    assert_eq!(outcome.claim.state, AssuranceState::Rejected);
    assert_eq!(outcome.claim.tier(), Tier::SelfDeclared);
    assert_eq!(outcome.review.resulting_state, Some(AssuranceState::Rejected));

    // Back through an audited reopen and a fresh round
    let reopened = engine.reopen_claim(&actor(ADMIN), claim.id).unwrap();
    attach(&engine, &reopened, b"corrected tickets");
    engine.submit_claim(&owner(), claim.id).unwrap();
    let again = engine
        .assign_review(&owner(), claim.id, actor("reviewer:peer"), ReviewKind::Peer)
        .unwrap();
    assert_eq!(again.round, 3);
    let outcome = engine
        .record_decision(&actor("reviewer:peer"), again.id, Decision::Approved, 8, None)
        .unwrap();
    assert_eq!(outcome.claim.state, AssuranceState::PeerApproved);
}

#[test]
fn test_zero_score_approval_keeps_self_tier() {
    let engine = engine();
    let claim = submitted_claim(&engine);
    let peer = engine
        .assign_review(&owner(), claim.id, actor("reviewer:peer"), ReviewKind::Peer)
        .unwrap();

    let outcome = engine
        .record_decision(&actor("reviewer:peer"), peer.id, Decision::Approved, 0, None)
        .unwrap();
    assert_eq!(outcome.claim.state, AssuranceState::Rejected);
    assert_eq!(outcome.claim.tier(), Tier::SelfDeclared);
    assert_eq!(engine.metrics().snapshot().rejections, 1);
}

#[test]
fn test_conditional_decision_needs_remediation() {
    let engine = engine();
    let claim = submitted_claim(&engine);
    let expert = engine
        .assign_review(&owner(), claim.id, actor("reviewer:expert"), ReviewKind::Expert)
        .unwrap();

    let outcome = engine
        .record_decision(
            &actor("reviewer:expert"),
            expert.id,
            Decision::Conditional,
            6,
            Some("weighbridge calibration certificate missing".to_string()),
        )
        .unwrap();
    assert_eq!(outcome.claim.state, AssuranceState::ConditionallyApproved);
    assert_eq!(outcome.claim.tier(), Tier::PeerReviewed);

    // Remediation evidence sends the claim back for a fresh round
    attach(&engine, &outcome.claim, b"calibration certificate");
    let claim = engine.get_claim(claim.id).unwrap();
    assert_eq!(claim.state, AssuranceState::UnderReview);
    assert_eq!(claim.review_round, 2);
    assert_eq!(claim.tier(), Tier::SelfDeclared);

    let again = engine
        .assign_review(&owner(), claim.id, actor("reviewer:expert"), ReviewKind::Expert)
        .unwrap();
    assert_eq!(again.round, 2);
    let outcome = engine
        .record_decision(&actor("reviewer:expert"), again.id, Decision::Approved, 8, None)
        .unwrap();
    assert_eq!(outcome.claim.state, AssuranceState::PeerApproved);
}

#[test]
fn test_third_party_verification() {
    let engine = engine();
    let claim = submitted_claim(&engine);

    let early = engine.assign_review(&owner(), claim.id, actor("auditor:x"), ReviewKind::ThirdParty);
    assert!(matches!(early, Err(AssuranceError::Prerequisite(_))));

    let peer = engine
        .assign_review(&owner(), claim.id, actor("reviewer:peer"), ReviewKind::Peer)
        .unwrap();
    engine
        .record_decision(&actor("reviewer:peer"), peer.id, Decision::Approved, 7, None)
        .unwrap();

    let audit = engine
        .assign_review(&owner(), claim.id, actor("auditor:x"), ReviewKind::ThirdParty)
        .unwrap();
    let outcome = engine
        .record_decision(&actor("auditor:x"), audit.id, Decision::Approved, 10, None)
        .unwrap();
    assert_eq!(outcome.claim.state, AssuranceState::ThirdPartyVerified);
    assert_eq!(outcome.claim.tier(), Tier::Verified);

    let late_evidence = engine.attach_evidence(
        &owner(),
        claim.id,
        EvidenceKind::Data,
        "blob://late",
        EvidenceContent::Bytes(b"late".to_vec()),
        json!({}),
    );
    assert!(matches!(late_evidence, Err(AssuranceError::Prerequisite(_))));
}

#[test]
fn test_submit_without_evidence_refused() {
    let engine = engine();
    let claim = engine.create_claim(&owner(), draft("project:p1")).unwrap();

    let result = engine.submit_claim(&owner(), claim.id);
    assert!(matches!(result, Err(AssuranceError::Prerequisite(_))));
    assert_eq!(
        engine.get_claim(claim.id).unwrap().state,
        AssuranceState::Draft
    );
    assert_eq!(engine.chain_head().unwrap().seq, 1);
}

#[test]
fn test_update_only_in_draft() {
    let engine = engine();
    let claim = engine.create_claim(&owner(), draft("project:p1")).unwrap();

    let update = ClaimUpdate {
        value: Some(320.0),
        ..ClaimUpdate::default()
    };
    let updated = engine.update_claim(&owner(), claim.id, update.clone()).unwrap();
    assert_eq!(updated.value, 320.0);
    assert_eq!(updated.state, AssuranceState::Draft);

    let history = engine.history_for_entity(&claim.id.to_string()).unwrap();
    assert_eq!(history[1].delta.before["value"], 310.0);
    assert_eq!(history[1].delta.after["value"], 320.0);

    attach(&engine, &claim, b"evidence");
    engine.submit_claim(&owner(), claim.id).unwrap();
    let refused = engine.update_claim(&owner(), claim.id, update);
    assert!(matches!(refused, Err(AssuranceError::Prerequisite(_))));
}

#[test]
fn test_invalid_input_rejected_before_store() {
    let engine = engine();
    let mut bad = draft("project:p1");
    bad.value = f64::INFINITY;

    let result = engine.create_claim(&owner(), bad);
    assert!(matches!(result, Err(AssuranceError::Validation(_))));
    assert_eq!(engine.chain_head().unwrap().seq, 0);
}

#[test]
fn test_duplicate_pending_review_conflicts() {
    let engine = engine();
    let claim = submitted_claim(&engine);
    engine
        .assign_review(&owner(), claim.id, actor("reviewer:a"), ReviewKind::Peer)
        .unwrap();

    let second = engine.assign_review(&owner(), claim.id, actor("reviewer:b"), ReviewKind::Peer);
    assert!(matches!(second, Err(AssuranceError::Conflict(_))));

    // A different kind is fine
    assert!(engine
        .assign_review(&owner(), claim.id, actor("reviewer:c"), ReviewKind::Expert)
        .is_ok());
}

#[test]
fn test_stale_pending_review_does_not_block_next_round() {
    let engine = engine();
    let claim = submitted_claim(&engine);
    let peer = engine
        .assign_review(&owner(), claim.id, actor("reviewer:peer"), ReviewKind::Peer)
        .unwrap();
    let expert = engine
        .assign_review(&owner(), claim.id, actor("reviewer:expert"), ReviewKind::Expert)
        .unwrap();
    assert_eq!(expert.round, 1);

    let outcome = engine
        .record_decision(&actor("reviewer:peer"), peer.id, Decision::Rejected, 2, None)
        .unwrap();
    assert_eq!(outcome.claim.state, AssuranceState::Rejected);

    // The expert review of round 1 is still pending
    let reopened = engine.reopen_claim(&actor(ADMIN), claim.id).unwrap();
    attach(&engine, &reopened, b"second batch of receipts");
    engine.submit_claim(&owner(), claim.id).unwrap();

    let fresh = engine
        .assign_review(&owner(), claim.id, actor("reviewer:expert2"), ReviewKind::Expert)
        .unwrap();
    assert_eq!(fresh.round, 3);
    assert_eq!(engine.metrics().snapshot().conflicts, 0);

    // Within the new round the rule still holds
    let second = engine.assign_review(&owner(), claim.id, actor("reviewer:expert3"), ReviewKind::Expert);
    assert!(matches!(second, Err(AssuranceError::Conflict(_))));

    let outcome = engine
        .record_decision(&actor("reviewer:expert2"), fresh.id, Decision::Approved, 8, None)
        .unwrap();
    assert_eq!(outcome.claim.state, AssuranceState::PeerApproved);
    engine.ensure_chain_intact().unwrap();
}

#[test]
fn test_redeciding_is_a_conflict() {
    let engine = engine();
    let claim = submitted_claim(&engine);
    let review = engine
        .assign_review(&owner(), claim.id, actor("reviewer:a"), ReviewKind::Peer)
        .unwrap();
    engine
        .record_decision(&actor("reviewer:a"), review.id, Decision::Approved, 8, None)
        .unwrap();

    let again = engine.record_decision(&actor("reviewer:a"), review.id, Decision::Rejected, 0, None);
    assert!(matches!(again, Err(AssuranceError::Conflict(_))));
    assert_eq!(
        engine.get_claim(claim.id).unwrap().state,
        AssuranceState::PeerApproved
    );
    assert_eq!(engine.metrics().snapshot().conflicts, 1);
}

#[test]
fn test_score_out_of_range() {
    let engine = engine();
    let claim = submitted_claim(&engine);
    let review = engine
        .assign_review(&owner(), claim.id, actor("reviewer:a"), ReviewKind::Peer)
        .unwrap();

    let result = engine.record_decision(&actor("reviewer:a"), review.id, Decision::Approved, 11, None);
    assert!(matches!(result, Err(AssuranceError::Validation(_))));
    assert!(!engine.get_review(review.id).unwrap().is_finalized());
}

#[test]
fn test_tampered_evidence_detected_on_retrieval() {
    let engine = engine();
    let claim = engine.create_claim(&owner(), draft("project:p1")).unwrap();
    let evidence = attach(&engine, &claim, b"original report");

    let mut blobs = MemoryBlobs::default();
    blobs.0.insert(evidence.source.clone(), b"original report".to_vec());
    let (_, content) = engine.retrieve_evidence(evidence.id, &blobs).unwrap();
    assert_eq!(content, b"original report");

    blobs.0.insert(evidence.source.clone(), b"doctored report".to_vec());
    let result = engine.retrieve_evidence(evidence.id, &blobs);
    assert!(matches!(result, Err(AssuranceError::Integrity(_))));
    assert_eq!(engine.metrics().snapshot().integrity_violations, 1);
}

#[test]
fn test_digest_must_be_computable() {
    let engine = engine();
    let claim = engine.create_claim(&owner(), draft("project:p1")).unwrap();

    for content in [
        EvidenceContent::Bytes(Vec::new()),
        EvidenceContent::PrecomputedDigest("not-hex".to_string()),
    ] {
        let result = engine.attach_evidence(
            &owner(),
            claim.id,
            EvidenceKind::Document,
            "blob://x",
            content,
            json!({}),
        );
        assert!(matches!(result, Err(AssuranceError::Integrity(_))));
    }

    let digest = "ab".repeat(32);
    let evidence = engine
        .attach_evidence(
            &owner(),
            claim.id,
            EvidenceKind::Video,
            "blob://video",
            EvidenceContent::PrecomputedDigest(digest.clone()),
            json!(null),
        )
        .unwrap();
    assert_eq!(evidence.digest.to_hex(), digest);
}

#[test]
fn test_unknown_project_not_found() {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let engine = AssuranceEngine::new(store, AssuranceConfig::default())
        .with_directory(Arc::new(StaticDirectory::new(["project:known"])));

    let result = engine.create_claim(&owner(), draft("project:unknown"));
    assert!(matches!(result, Err(AssuranceError::NotFound(_))));
    assert!(engine.create_claim(&owner(), draft("project:known")).is_ok());

    let graph = engine.build_evidence_graph(
        &ProjectRef::new("project:unknown").unwrap(),
        GraphOptions::default(),
    );
    assert!(matches!(graph, Err(AssuranceError::NotFound(_))));
}

#[test]
fn test_tombstone_is_audited_and_hides_claim() {
    let engine = engine();
    let claim = submitted_claim(&engine);
    let evidence = engine.evidence_for_claim(claim.id).unwrap();

    let refused = engine.tombstone_claim(&owner(), claim.id);
    assert!(matches!(refused, Err(AssuranceError::Unauthorized(_))));

    engine.tombstone_claim(&actor(ADMIN), claim.id).unwrap();
    assert!(matches!(
        engine.get_claim(claim.id),
        Err(AssuranceError::NotFound(_))
    ));

    let project = ProjectRef::new("project:p1").unwrap();
    assert!(engine.list_claims_by_project(&project, false).unwrap().is_empty());
    assert_eq!(engine.list_claims_by_project(&project, true).unwrap().len(), 1);

    let trail = engine.history_for_entity(&evidence[0].id.to_string()).unwrap();
    assert_eq!(trail.last().unwrap().action, LedgerAction::ClaimTombstoned);
    assert!(engine.ensure_chain_intact().is_ok());
}

#[test]
fn test_graph_links_decisions_to_state_changes() {
    let engine = engine();
    let claim = submitted_claim(&engine);
    let review = engine
        .assign_review(&owner(), claim.id, actor("reviewer:a"), ReviewKind::Peer)
        .unwrap();
    engine
        .record_decision(&actor("reviewer:a"), review.id, Decision::Approved, 9, None)
        .unwrap();

    let project = ProjectRef::new("project:p1").unwrap();
    let graph = engine
        .build_evidence_graph(&project, GraphOptions::default())
        .unwrap();
    assert_eq!(graph.stats.node_count, 3);

    let review_id = review.id.to_string();
    let edge = graph.edges_from(&review_id).next().unwrap();
    assert_eq!(
        edge.kind,
        EdgeKind::ReviewPrecedesStateChange {
            resulting_state: AssuranceState::PeerApproved
        }
    );
}
