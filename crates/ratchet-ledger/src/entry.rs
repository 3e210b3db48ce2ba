//! Audit records

use crate::chain::ChainDigest;
use ratchet_domain::{ActorRef, ClaimId};
use serde::{Deserialize, Serialize};

/// Kind of entity an audit record is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// A claim
    Claim,
    /// An evidence item
    Evidence,
    /// A review
    Review,
}

impl EntityKind {
    /// Get the kind name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Claim => "claim",
            EntityKind::Evidence => "evidence",
            EntityKind::Review => "review",
        }
    }

    /// Parse a kind from a string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "claim" => Some(EntityKind::Claim),
            "evidence" => Some(EntityKind::Evidence),
            "review" => Some(EntityKind::Review),
            _ => None,
        }
    }
}

/// The entity an audit record is about
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    /// Kind of entity
    pub kind: EntityKind,
    /// Identifier in its string form
    pub id: String,
}

impl EntityRef {
    /// Reference to a claim
    pub fn claim(id: ClaimId) -> Self {
        Self { kind: EntityKind::Claim, id: id.to_string() }
    }

    /// Reference to an evidence item
    pub fn evidence(id: ratchet_domain::EvidenceId) -> Self {
        Self { kind: EntityKind::Evidence, id: id.to_string() }
    }

    /// Reference to a review
    pub fn review(id: ratchet_domain::ReviewId) -> Self {
        Self { kind: EntityKind::Review, id: id.to_string() }
    }
}

/// What happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerAction {
    /// Claim created in draft
    ClaimCreated,
    /// Claim metadata changed
    ClaimUpdated,
    /// Claim submitted for review
    ClaimSubmitted,
    /// Evidence attached to a claim
    EvidenceAttached,
    /// Reviewer assigned
    ReviewAssigned,
    /// Review decision recorded
    ReviewDecided,
    /// Claim state changed as a consequence of another action
    StateTransitioned,
    /// Rejected claim reopened to draft
    ClaimReopened,
    /// Claim and its evidence and reviews tombstoned
    ClaimTombstoned,
    /// Entity found without an audit record was recorded after the fact
    EntityReconciled,
}

impl LedgerAction {
    /// Every action
    pub const ALL: [LedgerAction; 10] = [
        LedgerAction::ClaimCreated,
        LedgerAction::ClaimUpdated,
        LedgerAction::ClaimSubmitted,
        LedgerAction::EvidenceAttached,
        LedgerAction::ReviewAssigned,
        LedgerAction::ReviewDecided,
        LedgerAction::StateTransitioned,
        LedgerAction::ClaimReopened,
        LedgerAction::ClaimTombstoned,
        LedgerAction::EntityReconciled,
    ];

    /// Get the action tag as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerAction::ClaimCreated => "claim_created",
            LedgerAction::ClaimUpdated => "claim_updated",
            LedgerAction::ClaimSubmitted => "claim_submitted",
            LedgerAction::EvidenceAttached => "evidence_attached",
            LedgerAction::ReviewAssigned => "review_assigned",
            LedgerAction::ReviewDecided => "review_decided",
            LedgerAction::StateTransitioned => "state_transitioned",
            LedgerAction::ClaimReopened => "claim_reopened",
            LedgerAction::ClaimTombstoned => "claim_tombstoned",
            LedgerAction::EntityReconciled => "entity_reconciled",
        }
    }

    /// Parse an action tag
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.as_str() == s)
    }
}

/// Before/after view of what changed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateDelta {
    /// State before the action (`null` for creations)
    pub before: serde_json::Value,
    /// State after the action
    pub after: serde_json::Value,
}

impl StateDelta {
    /// Delta for a newly created entity
    pub fn created(after: serde_json::Value) -> Self {
        Self { before: serde_json::Value::Null, after }
    }

    /// Delta for a change
    pub fn changed(before: serde_json::Value, after: serde_json::Value) -> Self {
        Self { before, after }
    }
}

/// An audit record that has not been sealed into the chain yet
#[derive(Debug, Clone, PartialEq)]
pub struct PendingEntry {
    /// Who performed the action
    pub actor: ActorRef,
    /// What happened
    pub action: LedgerAction,
    /// Entity affected
    pub entity: EntityRef,
    /// Claim the entity belongs to
    pub claim_id: ClaimId,
    /// What changed
    pub delta: StateDelta,
    /// When it happened
    pub timestamp: u64,
}

/// One sealed audit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Position in the global chain, starting at 1
    pub seq: u64,
    /// Who performed the action
    pub actor: ActorRef,
    /// What happened
    pub action: LedgerAction,
    /// Entity affected
    pub entity: EntityRef,
    /// Claim the entity belongs to
    pub claim_id: ClaimId,
    /// What changed
    pub delta: StateDelta,
    /// When it happened
    pub timestamp: u64,
    /// Chaining digest over the previous digest and this entry's content
    pub digest: ChainDigest,
}

/// The hashed portion of an entry: everything except its own digest
#[derive(Serialize)]
pub(crate) struct EntryContent<'a> {
    pub seq: u64,
    pub actor: &'a ActorRef,
    pub action: LedgerAction,
    pub entity: &'a EntityRef,
    pub claim_id: ClaimId,
    pub delta: &'a StateDelta,
    pub timestamp: u64,
}

impl LedgerEntry {
    pub(crate) fn content(&self) -> EntryContent<'_> {
        EntryContent {
            seq: self.seq,
            actor: &self.actor,
            action: self.action,
            entity: &self.entity,
            claim_id: self.claim_id,
            delta: &self.delta,
            timestamp: self.timestamp,
        }
    }
}

/// Position and digest of an appended entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendReceipt {
    /// Sequence number assigned
    pub seq: u64,
    /// Chaining digest of the entry
    pub digest: ChainDigest,
}
