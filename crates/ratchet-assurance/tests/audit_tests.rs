//! Write-through audit and ledger tamper detection through the engine

mod common;

use common::*;
use proptest::prelude::*;
use ratchet_assurance::{AssuranceConfig, AssuranceEngine, AssuranceError};
use ratchet_domain::ClaimDraft;
use ratchet_ledger::{DivergenceKind, EntityRef, LedgerAction};
use ratchet_store::SqliteStore;
use rusqlite::Connection;
use std::sync::Arc;
use tempfile::TempDir;

fn file_engine() -> (TempDir, std::path::PathBuf, AssuranceEngine) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ratchet.db");
    let store = Arc::new(SqliteStore::new(&path).unwrap());
    let engine = AssuranceEngine::new(store, AssuranceConfig::default().with_administrator(ADMIN));
    (dir, path, engine)
}

#[test]
fn test_out_of_band_write_found_and_reconciled() {
    let (_dir, path, engine) = file_engine();
    engine.create_claim(&owner(), draft("project:p1")).unwrap();
    assert!(engine.find_unaudited().unwrap().is_empty());

    let rogue = ratchet_domain::Claim::new(draft("project:p1"), 0);
    let conn = Connection::open(&path).unwrap();
    conn.execute(
        "INSERT INTO claims (id, project_id, indicator, value, unit, method, calculation,
             sdg_targets, state, tier, review_round, tombstoned, created_at, updated_at)
         VALUES (?1, 'project:p1', 'x', 1.0, 'u', 'm', '{}', '[]', 'draft', 'self', 0, 0, 0, 0)",
        [&rogue.id.to_bytes()[..]],
    )
    .unwrap();

    let unaudited = engine.find_unaudited().unwrap();
    assert_eq!(unaudited.len(), 1);
    assert_eq!(unaudited[0].entity, EntityRef::claim(rogue.id));

    let refused = engine.reconcile_unaudited(&owner());
    assert!(matches!(refused, Err(AssuranceError::Unauthorized(_))));

    let entries = engine.reconcile_unaudited(&actor(ADMIN)).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, LedgerAction::EntityReconciled);
    assert_eq!(entries[0].delta.after["indicator"], "x");

    assert!(engine.find_unaudited().unwrap().is_empty());
    assert!(engine.ensure_chain_intact().is_ok());
}

#[test]
fn test_tampered_ledger_fails_integrity_check() {
    let (_dir, path, engine) = file_engine();
    let claim = submitted_claim(&engine);
    assert!(engine.ensure_chain_intact().is_ok());

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "DROP TRIGGER ledger_no_update;
         UPDATE ledger_entries SET actor = 'user:mallory' WHERE seq = 2;",
    )
    .unwrap();

    let report = engine.verify_all().unwrap();
    let divergence = report.divergence.unwrap();
    assert_eq!(divergence.seq, 2);
    assert!(matches!(divergence.kind, DivergenceKind::DigestMismatch { .. }));

    assert!(matches!(
        engine.ensure_chain_intact(),
        Err(AssuranceError::Integrity(_))
    ));
    // Tail entries still verify against their stored predecessor
    assert!(engine.verify_chain(3, 3).unwrap().is_intact());
    assert!(engine.get_claim(claim.id).is_ok());
}

#[test]
fn test_invalid_range_is_validation_error() {
    let engine = engine();
    engine.create_claim(&owner(), draft("project:p1")).unwrap();

    assert!(matches!(
        engine.verify_chain(0, 1),
        Err(AssuranceError::Validation(_))
    ));
    assert!(matches!(
        engine.verify_chain(3, 2),
        Err(AssuranceError::Validation(_))
    ));
}

#[test]
fn test_verify_range_past_head_is_clamped() {
    let engine = engine();
    submitted_claim(&engine);
    let head = engine.chain_head().unwrap().seq;

    let report = engine.verify_chain(1, head + 5).unwrap();
    assert!(report.is_intact());
    assert_eq!(report.to_seq, head);
    assert_eq!(report.verified, head);
    assert_eq!(engine.metrics().snapshot().integrity_violations, 0);

    assert!(matches!(
        engine.verify_chain(head + 1, head + 5),
        Err(AssuranceError::Validation(_))
    ));
    assert_eq!(engine.metrics().snapshot().integrity_violations, 0);
}

#[test]
fn test_extreme_float_values_keep_chain_intact() {
    let engine = engine();
    for value in [1.2345678901234567e-300, 5e-324, f64::MAX, -0.1 - 0.2, 1.0 / 3.0] {
        let claim = engine
            .create_claim(
                &owner(),
                ClaimDraft {
                    value,
                    calculation: serde_json::json!({"factor": value, "series": [value, -value]}),
                    ..draft("project:p1")
                },
            )
            .unwrap();
        assert_eq!(engine.get_claim(claim.id).unwrap().value, value);
    }
    engine.ensure_chain_intact().unwrap();
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_any_finite_value_keeps_chain_intact(
        value in proptest::num::f64::NORMAL | proptest::num::f64::SUBNORMAL | proptest::num::f64::ZERO,
        factor in proptest::num::f64::NORMAL,
    ) {
        let engine = engine();
        let claim = engine
            .create_claim(
                &owner(),
                ClaimDraft {
                    value,
                    calculation: serde_json::json!({"factor": factor}),
                    ..draft("project:p1")
                },
            )
            .unwrap();
        engine
            .update_claim(
                &owner(),
                claim.id,
                ratchet_domain::ClaimUpdate { value: Some(factor), ..Default::default() },
            )
            .unwrap();
        prop_assert!(engine.ensure_chain_intact().is_ok());
    }
}

#[test]
fn test_calculation_payload_passes_through() {
    let engine = engine();
    let payload = serde_json::json!({
        "model": "ghg-v2",
        "factors": [0.23, 0.41],
        "nested": {"z": 1, "a": [true, null]}
    });
    let claim = engine
        .create_claim(
            &owner(),
            ClaimDraft {
                calculation: payload.clone(),
                ..draft("project:p1")
            },
        )
        .unwrap();

    assert_eq!(engine.get_claim(claim.id).unwrap().calculation, payload);
}
