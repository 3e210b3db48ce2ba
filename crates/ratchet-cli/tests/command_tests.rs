//! Commands run against a file-backed store

use ratchet_assurance::{AssuranceConfig, AssuranceEngine};
use ratchet_cli::cli::{AttachArgs, ClaimCommand, EvidenceCommand, EvidenceKindArg, LedgerCommand};
use ratchet_cli::commands::{self, Session};
use ratchet_cli::config::OutputFormat;
use ratchet_cli::{CliError, Formatter};
use ratchet_domain::{ActorRef, AssuranceState, ClaimDraft, ProjectRef};
use ratchet_store::SqliteStore;
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

fn session(dir: &TempDir, actor: Option<&str>) -> Session {
    let store = Arc::new(SqliteStore::new(dir.path().join("ratchet.db")).unwrap());
    let config = AssuranceConfig::default().with_administrator("user:admin");
    Session::new(
        AssuranceEngine::new(store, config),
        actor.map(|a| ActorRef::new(a).unwrap()),
    )
}

fn formatter() -> Formatter {
    Formatter::new(OutputFormat::Quiet, false)
}

fn draft() -> ClaimDraft {
    ClaimDraft {
        project: ProjectRef::new("project:riverbank").unwrap(),
        indicator: "litres treated".to_string(),
        value: 1200.0,
        unit: "L".to_string(),
        method: "flow meter".to_string(),
        calculation: json!({}),
        sdg_targets: Default::default(),
    }
}

#[test]
fn test_attach_then_verify_detects_edit() {
    let dir = TempDir::new().unwrap();
    let session = session(&dir, Some("user:owner"));
    let claim = session
        .engine
        .create_claim(session.actor().unwrap(), draft())
        .unwrap();

    let blob = dir.path().join("readings.csv");
    std::fs::write(&blob, "day,litres\n1,40\n").unwrap();
    let source = format!("file://{}", blob.display());

    commands::execute_evidence(
        EvidenceCommand::Attach(AttachArgs {
            claim: claim.id.to_string(),
            kind: EvidenceKindArg::Data,
            source,
            digest: None,
            metadata: r#"{"rows": 1}"#.to_string(),
        }),
        &session,
        &formatter(),
    )
    .unwrap();

    let evidence = session.engine.evidence_for_claim(claim.id).unwrap();
    assert_eq!(evidence.len(), 1);
    let id = evidence[0].id.to_string();

    commands::execute_evidence(EvidenceCommand::Verify { id: id.clone() }, &session, &formatter())
        .unwrap();

    std::fs::write(&blob, "day,litres\n1,400\n").unwrap();
    let err = commands::execute_evidence(EvidenceCommand::Verify { id }, &session, &formatter())
        .unwrap_err();
    assert_eq!(err.exit_code(), 3);
}

#[test]
fn test_mutation_without_actor_refused() {
    let dir = TempDir::new().unwrap();
    let owner = session(&dir, Some("user:owner"));
    let claim = owner
        .engine
        .create_claim(owner.actor().unwrap(), draft())
        .unwrap();
    drop(owner);

    let anonymous = session(&dir, None);
    let err = commands::execute_claim(
        ClaimCommand::Submit {
            id: claim.id.to_string(),
        },
        &anonymous,
        &formatter(),
    )
    .unwrap_err();
    assert!(matches!(err, CliError::NoActor));

    // Reads need no actor
    commands::execute_claim(
        ClaimCommand::Get {
            id: claim.id.to_string(),
        },
        &anonymous,
        &formatter(),
    )
    .unwrap();
    assert_eq!(
        anonymous.engine.get_claim(claim.id).unwrap().state,
        AssuranceState::Draft
    );
}

#[test]
fn test_ledger_verify_on_fresh_store() {
    let dir = TempDir::new().unwrap();
    let session = session(&dir, None);
    commands::execute_ledger(
        LedgerCommand::Verify {
            from: None,
            to: None,
        },
        &session,
        &formatter(),
    )
    .unwrap();
}

#[test]
fn test_tombstone_requires_administrator() {
    let dir = TempDir::new().unwrap();
    let session = session(&dir, Some("user:owner"));
    let claim = session
        .engine
        .create_claim(session.actor().unwrap(), draft())
        .unwrap();

    let err = commands::execute_claim(
        ClaimCommand::Tombstone {
            id: claim.id.to_string(),
            yes: true,
        },
        &session,
        &formatter(),
    )
    .unwrap_err();
    assert_eq!(err.exit_code(), 2);

    let admin = self::session(&dir, Some("user:admin"));
    commands::execute_claim(
        ClaimCommand::Tombstone {
            id: claim.id.to_string(),
            yes: true,
        },
        &admin,
        &formatter(),
    )
    .unwrap();
    assert!(admin.engine.get_claim(claim.id).is_err());
}
