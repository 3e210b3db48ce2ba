//! Shared fixtures for assurance tests

#![allow(dead_code)]

use ratchet_assurance::{AssuranceConfig, AssuranceEngine};
use ratchet_domain::traits::ContentSource;
use ratchet_domain::{
    ActorRef, Claim, ClaimDraft, Evidence, EvidenceContent, EvidenceKind, ProjectRef,
};
use ratchet_store::SqliteStore;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

pub const ADMIN: &str = "user:admin";

pub fn actor(name: &str) -> ActorRef {
    ActorRef::new(name).unwrap()
}

pub fn owner() -> ActorRef {
    actor("user:owner")
}

pub fn engine() -> AssuranceEngine {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    AssuranceEngine::new(store, AssuranceConfig::default().with_administrator(ADMIN))
}

pub fn draft(project: &str) -> ClaimDraft {
    ClaimDraft {
        project: ProjectRef::new(project).unwrap(),
        indicator: "tonnes of waste diverted".to_string(),
        value: 310.0,
        unit: "t".to_string(),
        method: "weighbridge".to_string(),
        calculation: json!({"tickets": 42}),
        sdg_targets: ["12.5".to_string()].into_iter().collect(),
    }
}

pub fn attach(engine: &AssuranceEngine, claim: &Claim, content: &[u8]) -> Evidence {
    engine
        .attach_evidence(
            &owner(),
            claim.id,
            EvidenceKind::Document,
            format!("blob://{}", claim.id),
            EvidenceContent::Bytes(content.to_vec()),
            json!({"filename": "tickets.pdf"}),
        )
        .unwrap()
}

/// Claim with one evidence item, submitted
pub fn submitted_claim(engine: &AssuranceEngine) -> Claim {
    let claim = engine.create_claim(&owner(), draft("project:p1")).unwrap();
    attach(engine, &claim, b"weighbridge tickets");
    engine.submit_claim(&owner(), claim.id).unwrap()
}

/// In-memory blob store keyed by source descriptor
#[derive(Default)]
pub struct MemoryBlobs(pub HashMap<String, Vec<u8>>);

impl ContentSource for MemoryBlobs {
    type Error = String;

    fn fetch(&self, source: &str) -> Result<Vec<u8>, Self::Error> {
        self.0
            .get(source)
            .cloned()
            .ok_or_else(|| format!("no blob at {}", source))
    }
}
