//! Row mapping between SQLite and domain values

use crate::StoreError;
use ratchet_domain::{
    ActorRef, AssuranceState, Claim, ClaimId, ContentDigest, Decision, Evidence, EvidenceId,
    EvidenceKind, ProjectRef, Review, ReviewId, ReviewKind, Score,
};
use ratchet_ledger::{ChainDigest, EntityKind, EntityRef, LedgerAction, LedgerEntry, StateDelta};
use rusqlite::types::Type;
use rusqlite::Row;
use std::collections::BTreeSet;

pub(crate) const CLAIM_COLUMNS: &str = "id, project_id, indicator, value, unit, method, calculation, \
     sdg_targets, state, review_round, tombstoned, created_at, updated_at";

pub(crate) const EVIDENCE_COLUMNS: &str =
    "id, claim_id, kind, source, digest, metadata, created_at, tombstoned";

pub(crate) const REVIEW_COLUMNS: &str = "id, claim_id, reviewer, kind, decision, score, comment, \
     round, resulting_state, assigned_at, decided_at, tombstoned";

pub(crate) const LEDGER_COLUMNS: &str =
    "seq, actor, action, entity_kind, entity_id, claim_id, delta, timestamp, digest";

/// Wrap a decoding failure as a rusqlite conversion error
fn invalid(column: usize, ty: Type, message: impl Into<String>) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        column,
        ty,
        Box::new(StoreError::InvalidData(message.into())),
    )
}

fn json_column(row: &Row<'_>, column: usize) -> rusqlite::Result<serde_json::Value> {
    let text: String = row.get(column)?;
    serde_json::from_str(&text).map_err(|e| invalid(column, Type::Text, e.to_string()))
}

fn claim_id_column(row: &Row<'_>, column: usize) -> rusqlite::Result<ClaimId> {
    let bytes: Vec<u8> = row.get(column)?;
    ClaimId::from_bytes(&bytes).map_err(|e| invalid(column, Type::Blob, e))
}

fn actor_column(row: &Row<'_>, column: usize) -> rusqlite::Result<ActorRef> {
    let text: String = row.get(column)?;
    ActorRef::new(text).map_err(|e| invalid(column, Type::Text, e))
}

pub(crate) fn claim_from_row(row: &Row<'_>) -> rusqlite::Result<Claim> {
    let id = claim_id_column(row, 0)?;
    let project: String = row.get(1)?;
    let project = ProjectRef::new(project).map_err(|e| invalid(1, Type::Text, e))?;
    let targets = json_column(row, 7)?;
    let sdg_targets: BTreeSet<String> =
        serde_json::from_value(targets).map_err(|e| invalid(7, Type::Text, e.to_string()))?;
    let state: String = row.get(8)?;
    let state = AssuranceState::parse(&state)
        .ok_or_else(|| invalid(8, Type::Text, format!("Unknown state: {}", state)))?;

    Ok(Claim {
        id,
        project,
        indicator: row.get(2)?,
        value: row.get(3)?,
        unit: row.get(4)?,
        method: row.get(5)?,
        calculation: json_column(row, 6)?,
        sdg_targets,
        state,
        review_round: row.get(9)?,
        tombstoned: row.get(10)?,
        created_at: row.get::<_, i64>(11)? as u64,
        updated_at: row.get::<_, i64>(12)? as u64,
    })
}

pub(crate) fn evidence_from_row(row: &Row<'_>) -> rusqlite::Result<Evidence> {
    let id_bytes: Vec<u8> = row.get(0)?;
    let id = EvidenceId::from_bytes(&id_bytes).map_err(|e| invalid(0, Type::Blob, e))?;
    let kind: String = row.get(2)?;
    let kind = EvidenceKind::parse(&kind)
        .ok_or_else(|| invalid(2, Type::Text, format!("Unknown evidence kind: {}", kind)))?;
    let digest: String = row.get(4)?;
    let digest = ContentDigest::from_hex(&digest).map_err(|e| invalid(4, Type::Text, e))?;

    Ok(Evidence {
        id,
        claim_id: claim_id_column(row, 1)?,
        kind,
        source: row.get(3)?,
        digest,
        metadata: json_column(row, 5)?,
        created_at: row.get::<_, i64>(6)? as u64,
        tombstoned: row.get(7)?,
    })
}

pub(crate) fn review_from_row(row: &Row<'_>) -> rusqlite::Result<Review> {
    let id_bytes: Vec<u8> = row.get(0)?;
    let id = ReviewId::from_bytes(&id_bytes).map_err(|e| invalid(0, Type::Blob, e))?;
    let kind: String = row.get(3)?;
    let kind = ReviewKind::parse(&kind)
        .ok_or_else(|| invalid(3, Type::Text, format!("Unknown review kind: {}", kind)))?;
    let decision: String = row.get(4)?;
    let decision = Decision::parse(&decision)
        .ok_or_else(|| invalid(4, Type::Text, format!("Unknown decision: {}", decision)))?;
    let score = row
        .get::<_, Option<u8>>(5)?
        .map(Score::new)
        .transpose()
        .map_err(|e| invalid(5, Type::Integer, e))?;
    let resulting_state = row
        .get::<_, Option<String>>(8)?
        .map(|s| {
            AssuranceState::parse(&s)
                .ok_or_else(|| invalid(8, Type::Text, format!("Unknown state: {}", s)))
        })
        .transpose()?;

    Ok(Review {
        id,
        claim_id: claim_id_column(row, 1)?,
        reviewer: actor_column(row, 2)?,
        kind,
        decision,
        score,
        comment: row.get(6)?,
        round: row.get(7)?,
        resulting_state,
        assigned_at: row.get::<_, i64>(9)? as u64,
        decided_at: row.get::<_, Option<i64>>(10)?.map(|t| t as u64),
        tombstoned: row.get(11)?,
    })
}

pub(crate) fn ledger_entry_from_row(row: &Row<'_>) -> rusqlite::Result<LedgerEntry> {
    let action: String = row.get(2)?;
    let action = LedgerAction::parse(&action)
        .ok_or_else(|| invalid(2, Type::Text, format!("Unknown action: {}", action)))?;
    let kind: String = row.get(3)?;
    let kind = EntityKind::parse(&kind)
        .ok_or_else(|| invalid(3, Type::Text, format!("Unknown entity kind: {}", kind)))?;
    let delta: StateDelta = serde_json::from_value(json_column(row, 6)?)
        .map_err(|e| invalid(6, Type::Text, e.to_string()))?;
    let digest: String = row.get(8)?;
    let digest = ChainDigest::from_hex(&digest).map_err(|e| invalid(8, Type::Text, e.to_string()))?;

    Ok(LedgerEntry {
        seq: row.get::<_, i64>(0)? as u64,
        actor: actor_column(row, 1)?,
        action,
        entity: EntityRef {
            kind,
            id: row.get(4)?,
        },
        claim_id: claim_id_column(row, 5)?,
        delta,
        timestamp: row.get::<_, i64>(7)? as u64,
        digest,
    })
}
