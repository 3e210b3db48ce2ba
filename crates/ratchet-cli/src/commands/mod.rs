//! Command implementations.

pub mod claim;
pub mod evidence;
pub mod graph;
pub mod ledger;
pub mod review;

pub use self::claim::execute_claim;
pub use self::evidence::execute_evidence;
pub use self::graph::execute_graph;
pub use self::ledger::execute_ledger;
pub use self::review::execute_review;

use crate::error::{CliError, Result};
use ratchet_assurance::AssuranceEngine;
use ratchet_domain::{ActorRef, ClaimId, EvidenceId, ReviewId};

/// An opened engine plus the acting identity.
pub struct Session {
    /// Engine over the configured store
    pub engine: AssuranceEngine,
    actor: Option<ActorRef>,
}

impl Session {
    /// Create a session.
    pub fn new(engine: AssuranceEngine, actor: Option<ActorRef>) -> Self {
        Self { engine, actor }
    }

    /// The acting identity, required for mutations.
    pub fn actor(&self) -> Result<&ActorRef> {
        self.actor.as_ref().ok_or(CliError::NoActor)
    }
}

pub(crate) fn parse_claim_id(input: &str) -> Result<ClaimId> {
    ClaimId::from_string(input)
        .map_err(|e| CliError::InvalidInput(format!("Invalid claim ID '{}': {}", input, e)))
}

pub(crate) fn parse_evidence_id(input: &str) -> Result<EvidenceId> {
    EvidenceId::from_string(input)
        .map_err(|e| CliError::InvalidInput(format!("Invalid evidence ID '{}': {}", input, e)))
}

pub(crate) fn parse_review_id(input: &str) -> Result<ReviewId> {
    ReviewId::from_string(input)
        .map_err(|e| CliError::InvalidInput(format!("Invalid review ID '{}': {}", input, e)))
}

pub(crate) fn parse_json(label: &str, input: &str) -> Result<serde_json::Value> {
    serde_json::from_str(input)
        .map_err(|e| CliError::InvalidInput(format!("Invalid {} JSON: {}", label, e)))
}
