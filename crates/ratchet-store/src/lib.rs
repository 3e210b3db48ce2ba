//! Ratchet Storage Layer
//!
//! Durable records for claims, evidence and reviews, and the persisted
//! Integrity Ledger, all in one SQLite database.
//!
//! # Architecture
//!
//! - Every mutation is a [`UnitOfWork`]: entity writes plus the ledger entries
//!   describing them, applied in a single SQLite transaction. If sealing or
//!   inserting a ledger entry fails the whole transaction rolls back, so the
//!   store never shows a write whose audit record is missing.
//! - The connection sits behind one mutex, which is also the ledger's global
//!   ordering point: sequence numbers and chaining digests never race.
//! - Evidence and reviews are indexed by claim, claims by project, ledger
//!   entries by entity and by claim.
//!
//! # Examples
//!
//! ```no_run
//! use ratchet_store::SqliteStore;
//!
//! let store = SqliteStore::new("ratchet.db").unwrap();
//! // Store is now ready for claim operations
//! ```

#![warn(missing_docs)]

mod rows;
mod unit;

pub use unit::{EntityWrite, UnitOfWork};

use parking_lot::Mutex;
use ratchet_domain::{
    Claim, ClaimId, Decision, Evidence, EvidenceId, ProjectRef, Review, ReviewId, ReviewKind,
};
use ratchet_ledger::{
    ChainDigest, ChainHead, EntityRef, LedgerEntry, LedgerError, LedgerReader,
};
use rows::{
    claim_from_row, evidence_from_row, ledger_entry_from_row, review_from_row, CLAIM_COLUMNS,
    EVIDENCE_COLUMNS, LEDGER_COLUMNS, REVIEW_COLUMNS,
};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(rusqlite::Error),

    /// Entity not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Entity already exists
    #[error("Duplicate entity: {0}")]
    Duplicate(String),

    /// Write conflicts with the stored state
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A unit of work carried no ledger entry
    #[error("Refusing to commit a unit of work without a ledger entry")]
    Unaudited,

    /// Ledger chaining error
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// JSON encoding error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(error: rusqlite::Error) -> Self {
        // Row decoders wrap StoreErrors in conversion failures; unwrap them
        match error {
            rusqlite::Error::FromSqlConversionFailure(_, _, inner) => {
                match inner.downcast::<StoreError>() {
                    Ok(store_error) => *store_error,
                    Err(other) => StoreError::InvalidData(other.to_string()),
                }
            }
            other => StoreError::Database(other),
        }
    }
}

fn is_constraint_violation(error: &rusqlite::Error) -> bool {
    error.sqlite_error_code() == Some(ErrorCode::ConstraintViolation)
}

/// An entity that exists in the store without any ledger entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnauditedEntity {
    /// The entity
    pub entity: EntityRef,
    /// Claim it belongs to
    pub claim_id: ClaimId,
}

/// Everything the graph needs for one project, read in one snapshot
#[derive(Debug, Clone, Default)]
pub struct ProjectSnapshot {
    /// Claims of the project
    pub claims: Vec<Claim>,
    /// Evidence of those claims
    pub evidence: Vec<Evidence>,
    /// Reviews of those claims
    pub reviews: Vec<Review>,
    /// Ledger entries of those claims, only when requested
    pub history: Vec<LedgerEntry>,
}

/// SQLite-based entity store and ledger
///
/// # Thread Safety
///
/// The connection is guarded by a mutex; the store is `Send + Sync` and is
/// shared behind an `Arc`. Every read and every commit holds the lock for its
/// own duration only.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Create a new SqliteStore with the given database path
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::new(":memory:")
    }

    /// Initialize the database schema
    fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
        let schema = include_str!("schema.sql");
        conn.execute_batch(schema)?;
        Ok(())
    }

    /// Apply a unit of work atomically and return the sealed ledger entries
    ///
    /// # Errors
    ///
    /// Any failure, including in the ledger append, rolls back every write
    /// in the unit.
    pub fn commit(&self, unit: UnitOfWork) -> Result<Vec<LedgerEntry>, StoreError> {
        if unit.entries.is_empty() {
            return Err(StoreError::Unaudited);
        }

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        for write in &unit.writes {
            Self::apply_write(&tx, write)?;
        }

        let mut head = Self::read_head(&tx)?;
        let mut sealed = Vec::with_capacity(unit.entries.len());
        for pending in unit.entries {
            let entry = head.seal(pending)?;
            Self::insert_entry(&tx, &entry)?;
            head = ChainHead::at(&entry);
            sealed.push(entry);
        }

        tx.commit()?;

        debug!(
            writes = unit.writes.len(),
            head_seq = head.seq,
            "Committed unit of work"
        );
        Ok(sealed)
    }

    fn apply_write(conn: &Connection, write: &EntityWrite) -> Result<(), StoreError> {
        match write {
            EntityWrite::InsertClaim(claim) => {
                conn.execute(
                    "INSERT INTO claims (id, project_id, indicator, value, unit, method, calculation,
                         sdg_targets, state, tier, review_round, tombstoned, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                    params![
                        &claim.id.to_bytes()[..],
                        claim.project.as_str(),
                        &claim.indicator,
                        claim.value,
                        &claim.unit,
                        &claim.method,
                        serde_json::to_string(&claim.calculation)?,
                        serde_json::to_string(&claim.sdg_targets)?,
                        claim.state.as_str(),
                        claim.tier().as_str(),
                        claim.review_round,
                        claim.tombstoned,
                        claim.created_at as i64,
                        claim.updated_at as i64,
                    ],
                )
                .map_err(|e| {
                    if is_constraint_violation(&e) {
                        StoreError::Duplicate(format!("claim {}", claim.id))
                    } else {
                        e.into()
                    }
                })?;
            }
            EntityWrite::UpdateClaim(claim) => {
                let rows = conn.execute(
                    "UPDATE claims SET indicator = ?2, value = ?3, unit = ?4, method = ?5,
                         calculation = ?6, sdg_targets = ?7, state = ?8, tier = ?9,
                         review_round = ?10, updated_at = ?11
                     WHERE id = ?1 AND tombstoned = 0",
                    params![
                        &claim.id.to_bytes()[..],
                        &claim.indicator,
                        claim.value,
                        &claim.unit,
                        &claim.method,
                        serde_json::to_string(&claim.calculation)?,
                        serde_json::to_string(&claim.sdg_targets)?,
                        claim.state.as_str(),
                        claim.tier().as_str(),
                        claim.review_round,
                        claim.updated_at as i64,
                    ],
                )?;
                if rows == 0 {
                    return Err(StoreError::NotFound(format!("claim {}", claim.id)));
                }
            }
            EntityWrite::InsertEvidence(evidence) => {
                conn.execute(
                    "INSERT INTO evidence (id, claim_id, kind, source, digest, metadata, created_at, tombstoned)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        &evidence.id.to_bytes()[..],
                        &evidence.claim_id.to_bytes()[..],
                        evidence.kind.as_str(),
                        &evidence.source,
                        evidence.digest.to_hex(),
                        serde_json::to_string(&evidence.metadata)?,
                        evidence.created_at as i64,
                        evidence.tombstoned,
                    ],
                )
                .map_err(|e| {
                    if is_constraint_violation(&e) {
                        StoreError::Duplicate(format!("evidence {}", evidence.id))
                    } else {
                        e.into()
                    }
                })?;
            }
            EntityWrite::InsertReview(review) => {
                conn.execute(
                    "INSERT INTO reviews (id, claim_id, reviewer, kind, decision, score, comment,
                         round, resulting_state, assigned_at, decided_at, tombstoned)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                    params![
                        &review.id.to_bytes()[..],
                        &review.claim_id.to_bytes()[..],
                        review.reviewer.as_str(),
                        review.kind.as_str(),
                        review.decision.as_str(),
                        review.score.map(|s| s.value()),
                        &review.comment,
                        review.round,
                        review.resulting_state.map(|s| s.as_str()),
                        review.assigned_at as i64,
                        review.decided_at.map(|t| t as i64),
                        review.tombstoned,
                    ],
                )
                .map_err(|e| {
                    if is_constraint_violation(&e) {
                        StoreError::Conflict(format!(
                            "claim {} already has a pending {} review",
                            review.claim_id,
                            review.kind.as_str()
                        ))
                    } else {
                        e.into()
                    }
                })?;
            }
            EntityWrite::FinalizeReview(review) => {
                let rows = conn.execute(
                    "UPDATE reviews SET decision = ?2, score = ?3, comment = ?4,
                         resulting_state = ?5, decided_at = ?6
                     WHERE id = ?1 AND decision = ?7",
                    params![
                        &review.id.to_bytes()[..],
                        review.decision.as_str(),
                        review.score.map(|s| s.value()),
                        &review.comment,
                        review.resulting_state.map(|s| s.as_str()),
                        review.decided_at.map(|t| t as i64),
                        Decision::Pending.as_str(),
                    ],
                )?;
                if rows == 0 {
                    return Err(StoreError::Conflict(format!(
                        "review {} is not pending",
                        review.id
                    )));
                }
            }
            EntityWrite::Tombstone { claim_id, at } => {
                let key = &claim_id.to_bytes()[..];
                let rows = conn.execute(
                    "UPDATE claims SET tombstoned = 1, updated_at = ?2 WHERE id = ?1 AND tombstoned = 0",
                    params![key, *at as i64],
                )?;
                if rows == 0 {
                    return Err(StoreError::NotFound(format!("live claim {}", claim_id)));
                }
                conn.execute("UPDATE evidence SET tombstoned = 1 WHERE claim_id = ?1", params![key])?;
                conn.execute("UPDATE reviews SET tombstoned = 1 WHERE claim_id = ?1", params![key])?;
            }
        }
        Ok(())
    }

    fn read_head(conn: &Connection) -> Result<ChainHead, StoreError> {
        let head = conn
            .query_row(
                "SELECT seq, digest FROM ledger_entries ORDER BY seq DESC LIMIT 1",
                [],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;

        match head {
            Some((seq, digest)) => Ok(ChainHead {
                seq: seq as u64,
                digest: ChainDigest::from_hex(&digest)?,
            }),
            None => Ok(ChainHead::genesis()),
        }
    }

    fn insert_entry(conn: &Connection, entry: &LedgerEntry) -> Result<(), StoreError> {
        conn.execute(
            "INSERT INTO ledger_entries (seq, actor, action, entity_kind, entity_id, claim_id, delta, timestamp, digest)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                entry.seq as i64,
                entry.actor.as_str(),
                entry.action.as_str(),
                entry.entity.kind.as_str(),
                &entry.entity.id,
                &entry.claim_id.to_bytes()[..],
                serde_json::to_string(&entry.delta)?,
                entry.timestamp as i64,
                entry.digest.to_hex(),
            ],
        )?;
        Ok(())
    }

    /// Get a claim by ID
    pub fn get_claim(&self, id: ClaimId) -> Result<Option<Claim>, StoreError> {
        let conn = self.conn.lock();
        let sql = format!("SELECT {} FROM claims WHERE id = ?1", CLAIM_COLUMNS);
        Ok(conn
            .query_row(&sql, params![&id.to_bytes()[..]], claim_from_row)
            .optional()?)
    }

    /// List a project's claims, oldest first
    pub fn list_claims_by_project(
        &self,
        project: &ProjectRef,
        include_tombstoned: bool,
    ) -> Result<Vec<Claim>, StoreError> {
        let conn = self.conn.lock();
        Self::query_project_claims(&conn, project, include_tombstoned)
    }

    fn query_project_claims(
        conn: &Connection,
        project: &ProjectRef,
        include_tombstoned: bool,
    ) -> Result<Vec<Claim>, StoreError> {
        let sql = format!(
            "SELECT {} FROM claims WHERE project_id = ?1 AND (?2 OR tombstoned = 0) ORDER BY id",
            CLAIM_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let claims = stmt
            .query_map(params![project.as_str(), include_tombstoned], claim_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(claims)
    }

    /// Get an evidence item by ID
    pub fn get_evidence(&self, id: EvidenceId) -> Result<Option<Evidence>, StoreError> {
        let conn = self.conn.lock();
        let sql = format!("SELECT {} FROM evidence WHERE id = ?1", EVIDENCE_COLUMNS);
        Ok(conn
            .query_row(&sql, params![&id.to_bytes()[..]], evidence_from_row)
            .optional()?)
    }

    /// Evidence attached to a claim, oldest first
    pub fn evidence_for_claim(&self, claim_id: ClaimId) -> Result<Vec<Evidence>, StoreError> {
        let conn = self.conn.lock();
        let sql = format!(
            "SELECT {} FROM evidence WHERE claim_id = ?1 ORDER BY id",
            EVIDENCE_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let evidence = stmt
            .query_map(params![&claim_id.to_bytes()[..]], evidence_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(evidence)
    }

    /// Number of live evidence items on a claim
    pub fn count_live_evidence(&self, claim_id: ClaimId) -> Result<usize, StoreError> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM evidence WHERE claim_id = ?1 AND tombstoned = 0",
            params![&claim_id.to_bytes()[..]],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Get a review by ID
    pub fn get_review(&self, id: ReviewId) -> Result<Option<Review>, StoreError> {
        let conn = self.conn.lock();
        let sql = format!("SELECT {} FROM reviews WHERE id = ?1", REVIEW_COLUMNS);
        Ok(conn
            .query_row(&sql, params![&id.to_bytes()[..]], review_from_row)
            .optional()?)
    }

    /// Reviews of a claim, oldest first
    pub fn reviews_for_claim(&self, claim_id: ClaimId) -> Result<Vec<Review>, StoreError> {
        let conn = self.conn.lock();
        let sql = format!(
            "SELECT {} FROM reviews WHERE claim_id = ?1 ORDER BY id",
            REVIEW_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let reviews = stmt
            .query_map(params![&claim_id.to_bytes()[..]], review_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(reviews)
    }

    /// The live pending review of `kind` in `round` of a claim, if any
    ///
    /// Pending reviews left over from earlier rounds do not count.
    pub fn pending_review(
        &self,
        claim_id: ClaimId,
        kind: ReviewKind,
        round: u32,
    ) -> Result<Option<Review>, StoreError> {
        let conn = self.conn.lock();
        let sql = format!(
            "SELECT {} FROM reviews
             WHERE claim_id = ?1 AND kind = ?2 AND round = ?3 AND decision = ?4
               AND tombstoned = 0",
            REVIEW_COLUMNS
        );
        Ok(conn
            .query_row(
                &sql,
                params![
                    &claim_id.to_bytes()[..],
                    kind.as_str(),
                    round,
                    Decision::Pending.as_str()
                ],
                review_from_row,
            )
            .optional()?)
    }

    /// Read a project's claims, evidence and reviews in one snapshot
    ///
    /// Ledger entries are only read when `with_history` is set.
    pub fn project_snapshot(
        &self,
        project: &ProjectRef,
        include_tombstoned: bool,
        with_history: bool,
    ) -> Result<ProjectSnapshot, StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let claims = Self::query_project_claims(&tx, project, include_tombstoned)?;

        let scope = "SELECT id FROM claims WHERE project_id = ?1 AND (?2 OR tombstoned = 0)";
        let sql = format!(
            "SELECT {} FROM evidence WHERE claim_id IN ({}) AND (?2 OR tombstoned = 0) ORDER BY id",
            EVIDENCE_COLUMNS, scope
        );
        let evidence = tx
            .prepare(&sql)?
            .query_map(params![project.as_str(), include_tombstoned], evidence_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        let sql = format!(
            "SELECT {} FROM reviews WHERE claim_id IN ({}) AND (?2 OR tombstoned = 0) ORDER BY id",
            REVIEW_COLUMNS, scope
        );
        let reviews = tx
            .prepare(&sql)?
            .query_map(params![project.as_str(), include_tombstoned], review_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        let history = if with_history {
            let sql = format!(
                "SELECT {} FROM ledger_entries WHERE claim_id IN ({}) ORDER BY seq",
                LEDGER_COLUMNS, scope
            );
            let mut stmt = tx.prepare(&sql)?;
            let entries = stmt
                .query_map(params![project.as_str(), include_tombstoned], ledger_entry_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            entries
        } else {
            Vec::new()
        };

        tx.commit()?;

        Ok(ProjectSnapshot {
            claims,
            evidence,
            reviews,
            history,
        })
    }

    /// Ledger entries about a claim or anything it owns
    pub fn history_for_claim(&self, claim_id: ClaimId) -> Result<Vec<LedgerEntry>, StoreError> {
        let conn = self.conn.lock();
        let sql = format!(
            "SELECT {} FROM ledger_entries WHERE claim_id = ?1 ORDER BY seq",
            LEDGER_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map(params![&claim_id.to_bytes()[..]], ledger_entry_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Entities with no ledger entry at all
    ///
    /// Commits are transactional, so a non-empty result means the database
    /// was written outside this store (or restored from an inconsistent
    /// backup) and needs administrative reconciliation.
    pub fn find_unaudited_entities(&self) -> Result<Vec<UnauditedEntity>, StoreError> {
        let conn = self.conn.lock();

        let audited: HashSet<String> = conn
            .prepare("SELECT DISTINCT entity_id FROM ledger_entries")?
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<_, _>>()?;

        let mut unaudited = Vec::new();
        for (table, make_ref) in [
            ("claims", EntityRefBuilder::Claim),
            ("evidence", EntityRefBuilder::Evidence),
            ("reviews", EntityRefBuilder::Review),
        ] {
            let claim_column = if table == "claims" { "id" } else { "claim_id" };
            let sql = format!("SELECT id, {} FROM {} ORDER BY id", claim_column, table);
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], |row| Ok((row.get::<_, Vec<u8>>(0)?, row.get::<_, Vec<u8>>(1)?)))?
                .collect::<Result<Vec<_>, _>>()?;
            for (id, claim) in rows {
                let entity = make_ref.build(&id)?;
                if !audited.contains(&entity.id) {
                    unaudited.push(UnauditedEntity {
                        entity,
                        claim_id: ClaimId::from_bytes(&claim).map_err(StoreError::InvalidData)?,
                    });
                }
            }
        }
        Ok(unaudited)
    }
}

#[derive(Clone, Copy)]
enum EntityRefBuilder {
    Claim,
    Evidence,
    Review,
}

impl EntityRefBuilder {
    fn build(self, bytes: &[u8]) -> Result<EntityRef, StoreError> {
        Ok(match self {
            EntityRefBuilder::Claim => {
                EntityRef::claim(ClaimId::from_bytes(bytes).map_err(StoreError::InvalidData)?)
            }
            EntityRefBuilder::Evidence => {
                EntityRef::evidence(EvidenceId::from_bytes(bytes).map_err(StoreError::InvalidData)?)
            }
            EntityRefBuilder::Review => {
                EntityRef::review(ReviewId::from_bytes(bytes).map_err(StoreError::InvalidData)?)
            }
        })
    }
}

impl LedgerReader for SqliteStore {
    type Error = StoreError;

    fn chain_head(&self) -> Result<ChainHead, Self::Error> {
        let conn = self.conn.lock();
        Self::read_head(&conn)
    }

    fn entry(&self, seq: u64) -> Result<Option<LedgerEntry>, Self::Error> {
        let conn = self.conn.lock();
        let sql = format!("SELECT {} FROM ledger_entries WHERE seq = ?1", LEDGER_COLUMNS);
        Ok(conn
            .query_row(&sql, params![seq as i64], ledger_entry_from_row)
            .optional()?)
    }

    fn entries(&self, from: u64, to: u64) -> Result<Vec<LedgerEntry>, Self::Error> {
        let conn = self.conn.lock();
        let sql = format!(
            "SELECT {} FROM ledger_entries WHERE seq BETWEEN ?1 AND ?2 ORDER BY seq",
            LEDGER_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map(params![from as i64, to as i64], ledger_entry_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    fn history_for_entity(&self, entity_id: &str) -> Result<Vec<LedgerEntry>, Self::Error> {
        let conn = self.conn.lock();
        let sql = format!(
            "SELECT {} FROM ledger_entries WHERE entity_id = ?1 ORDER BY seq",
            LEDGER_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map(params![entity_id], ledger_entry_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratchet_domain::{ActorRef, ClaimDraft, Score};
    use ratchet_ledger::{LedgerAction, PendingEntry, StateDelta};
    use serde_json::json;

    fn claim() -> Claim {
        Claim::new(
            ClaimDraft {
                project: ProjectRef::new("p1").unwrap(),
                indicator: "jobs created".to_string(),
                value: 12.0,
                unit: "FTE".to_string(),
                method: "pipa".to_string(),
                calculation: json!({}),
                sdg_targets: Default::default(),
            },
            1000,
        )
    }

    fn created(claim: &Claim) -> PendingEntry {
        PendingEntry {
            actor: ActorRef::new("user:alice").unwrap(),
            action: LedgerAction::ClaimCreated,
            entity: EntityRef::claim(claim.id),
            claim_id: claim.id,
            delta: StateDelta::created(json!({"state": "draft"})),
            timestamp: 1000,
        }
    }

    #[test]
    fn test_failed_ledger_append_rolls_back_entity_write() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .conn
            .lock()
            .execute_batch(
                "CREATE TRIGGER ledger_offline BEFORE INSERT ON ledger_entries
                 BEGIN SELECT RAISE(ABORT, 'ledger offline'); END;",
            )
            .unwrap();

        let claim = claim();
        let unit = UnitOfWork::new()
            .write(EntityWrite::InsertClaim(claim.clone()))
            .record(created(&claim));

        assert!(store.commit(unit).is_err());
        assert!(store.get_claim(claim.id).unwrap().is_none());
        assert_eq!(store.chain_head().unwrap().seq, 0);
    }

    #[test]
    fn test_unit_without_entry_refused() {
        let store = SqliteStore::in_memory().unwrap();
        let unit = UnitOfWork::new().write(EntityWrite::InsertClaim(claim()));
        assert!(matches!(store.commit(unit), Err(StoreError::Unaudited)));
    }

    #[test]
    fn test_finalize_only_once() {
        let store = SqliteStore::in_memory().unwrap();
        let claim = claim();
        store
            .commit(
                UnitOfWork::new()
                    .write(EntityWrite::InsertClaim(claim.clone()))
                    .record(created(&claim)),
            )
            .unwrap();

        let review = Review::assign(
            claim.id,
            ActorRef::new("reviewer:r").unwrap(),
            ReviewKind::Peer,
            1,
            2000,
        );
        let mut entry = created(&claim);
        entry.action = LedgerAction::ReviewAssigned;
        store
            .commit(
                UnitOfWork::new()
                    .write(EntityWrite::InsertReview(review.clone()))
                    .record(entry.clone()),
            )
            .unwrap();

        let decided = review
            .finalize(Decision::Approved, Score::new(8).unwrap(), None, 3000)
            .unwrap();
        entry.action = LedgerAction::ReviewDecided;
        store
            .commit(
                UnitOfWork::new()
                    .write(EntityWrite::FinalizeReview(decided.clone()))
                    .record(entry.clone()),
            )
            .unwrap();

        let again = store.commit(
            UnitOfWork::new()
                .write(EntityWrite::FinalizeReview(decided))
                .record(entry),
        );
        assert!(matches!(again, Err(StoreError::Conflict(_))));
        assert_eq!(store.chain_head().unwrap().seq, 3);
    }

    #[test]
    fn test_decoding_error_surfaces_as_invalid_data() {
        let store = SqliteStore::in_memory().unwrap();
        let claim = claim();
        store
            .commit(
                UnitOfWork::new()
                    .write(EntityWrite::InsertClaim(claim.clone()))
                    .record(created(&claim)),
            )
            .unwrap();
        store
            .conn
            .lock()
            .execute("UPDATE claims SET state = 'bogus'", [])
            .unwrap();

        assert!(matches!(
            store.get_claim(claim.id),
            Err(StoreError::InvalidData(_))
        ));
    }
}
