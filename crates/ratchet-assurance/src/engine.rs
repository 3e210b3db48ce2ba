//! The assurance engine: claim lifecycle, evidence and ledger operations
//!
//! Every mutating operation follows the same shape: validate input, take the
//! claim's lock, load the current state, compute the lifecycle transition,
//! and commit entity writes together with their ledger entries as one unit.
//! Review assignment and decisions live in [`crate::orchestrator`].

use crate::locks::ClaimLocks;
use crate::notify::NotificationHandle;
use crate::validator::ClaimValidator;
use crate::{AssuranceConfig, AssuranceError, AssuranceMetrics, Result};
use ratchet_domain::traits::{ContentSource, OpenDirectory, ProjectDirectory};
use ratchet_domain::{
    current_timestamp, ActorRef, AssuranceState, Claim, ClaimDraft, ClaimId, ClaimUpdate,
    Evidence, EvidenceContent, EvidenceId, EvidenceKind, LifecycleEvent, ProjectRef, Review,
    ReviewId, Transition,
};
use ratchet_graph::{EvidenceGraph, GraphOptions, GraphQueryEngine};
use ratchet_ledger::{
    ChainHead, ChainReport, EntityKind, EntityRef, LedgerAction, LedgerEntry, LedgerReader,
    PendingEntry, StateDelta,
};
use ratchet_store::{EntityWrite, SqliteStore, UnauditedEntity, UnitOfWork};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Entry point for every assurance operation
///
/// The engine is `Send + Sync`; share it behind an `Arc`. Operations on
/// different claims run in parallel up to the store commit.
///
/// # Examples
///
/// ```
/// use ratchet_assurance::{AssuranceConfig, AssuranceEngine};
/// use ratchet_domain::{ActorRef, ClaimDraft, ProjectRef};
/// use ratchet_store::SqliteStore;
/// use std::sync::Arc;
///
/// let store = Arc::new(SqliteStore::in_memory().unwrap());
/// let engine = AssuranceEngine::new(store, AssuranceConfig::default());
///
/// let claim = engine
///     .create_claim(
///         &ActorRef::new("user:alice").unwrap(),
///         ClaimDraft {
///             project: ProjectRef::new("project:solar").unwrap(),
///             indicator: "kWh generated".to_string(),
///             value: 1200.0,
///             unit: "kWh".to_string(),
///             method: "metered".to_string(),
///             calculation: serde_json::json!({}),
///             sdg_targets: Default::default(),
///         },
///     )
///     .unwrap();
/// assert_eq!(claim.tier().as_str(), "self");
/// ```
pub struct AssuranceEngine {
    pub(crate) store: Arc<SqliteStore>,
    pub(crate) graph: GraphQueryEngine,
    pub(crate) config: AssuranceConfig,
    pub(crate) directory: Arc<dyn ProjectDirectory>,
    pub(crate) locks: ClaimLocks,
    pub(crate) validator: ClaimValidator,
    pub(crate) metrics: Arc<AssuranceMetrics>,
    pub(crate) notifier: Option<NotificationHandle>,
}

impl AssuranceEngine {
    /// Create an engine accepting every project reference
    pub fn new(store: Arc<SqliteStore>, config: AssuranceConfig) -> Self {
        let graph = GraphQueryEngine::new(Arc::clone(&store), config.graph_latency_budget());
        Self {
            store,
            graph,
            config,
            directory: Arc::new(OpenDirectory),
            locks: ClaimLocks::new(),
            validator: ClaimValidator,
            metrics: Arc::new(AssuranceMetrics::new()),
            notifier: None,
        }
    }

    /// Resolve project references through `directory`
    pub fn with_directory(mut self, directory: Arc<dyn ProjectDirectory>) -> Self {
        self.directory = directory;
        self
    }

    /// Queue reviewer notices on `handle` after assignments commit
    pub fn with_notifications(mut self, handle: NotificationHandle) -> Self {
        self.notifier = Some(handle);
        self
    }

    /// Count into shared metrics (e.g. the notification worker's)
    pub fn with_metrics(mut self, metrics: Arc<AssuranceMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Active configuration
    pub fn config(&self) -> &AssuranceConfig {
        &self.config
    }

    /// Operation counters
    pub fn metrics(&self) -> &Arc<AssuranceMetrics> {
        &self.metrics
    }

    /// Underlying store
    pub fn store(&self) -> &Arc<SqliteStore> {
        &self.store
    }

    // ------------------------------------------------------------------
    // Claims
    // ------------------------------------------------------------------

    /// Create a draft claim in a known project
    pub fn create_claim(&self, actor: &ActorRef, draft: ClaimDraft) -> Result<Claim> {
        self.validator.validate_draft(&draft).into_result()?;
        self.require_project(&draft.project)?;

        let claim = Claim::new(draft, current_timestamp());
        let unit = UnitOfWork::new()
            .write(EntityWrite::InsertClaim(claim.clone()))
            .record(pending(
                actor,
                LedgerAction::ClaimCreated,
                EntityRef::claim(claim.id),
                claim.id,
                StateDelta::created(serde_json::to_value(&claim)?),
                claim.created_at,
            ));
        self.commit(unit)?;

        self.metrics.record_claim_created();
        info!(claim = %claim.id, project = %claim.project, actor = %actor, "Claim created");
        Ok(claim)
    }

    /// Edit the metadata of a draft claim
    ///
    /// State and tier are never touched here.
    pub fn update_claim(
        &self,
        actor: &ActorRef,
        claim_id: ClaimId,
        update: ClaimUpdate,
    ) -> Result<Claim> {
        self.validator.validate_update(&update).into_result()?;

        let lock = self.locks.for_claim(claim_id);
        let _guard = lock.lock();

        let claim = self.live_claim(claim_id)?;
        if claim.state != AssuranceState::Draft {
            return Err(AssuranceError::Prerequisite(format!(
                "claim {} is {}; only drafts can be edited",
                claim_id, claim.state
            )));
        }

        let updated = claim.with_update(&update, current_timestamp());
        let unit = UnitOfWork::new()
            .write(EntityWrite::UpdateClaim(updated.clone()))
            .record(pending(
                actor,
                LedgerAction::ClaimUpdated,
                EntityRef::claim(claim_id),
                claim_id,
                StateDelta::changed(claim.metadata_snapshot(), updated.metadata_snapshot()),
                updated.updated_at,
            ));
        self.commit(unit)?;

        info!(claim = %claim_id, actor = %actor, "Claim updated");
        Ok(updated)
    }

    /// Get a live claim
    pub fn get_claim(&self, claim_id: ClaimId) -> Result<Claim> {
        self.live_claim(claim_id)
    }

    /// Claims of a project, oldest first
    pub fn list_claims_by_project(
        &self,
        project: &ProjectRef,
        include_tombstoned: bool,
    ) -> Result<Vec<Claim>> {
        self.require_project(project)?;
        Ok(self.store.list_claims_by_project(project, include_tombstoned)?)
    }

    /// Submit a draft for review; requires at least one live evidence item
    pub fn submit_claim(&self, actor: &ActorRef, claim_id: ClaimId) -> Result<Claim> {
        let lock = self.locks.for_claim(claim_id);
        let _guard = lock.lock();

        let claim = self.live_claim(claim_id)?;
        let evidence_count = self.store.count_live_evidence(claim_id)?;
        let event = LifecycleEvent::Submit { evidence_count };
        let transition = claim.state.apply(&event)?;

        let updated = advance(&claim, transition, current_timestamp());
        let unit = UnitOfWork::new()
            .write(EntityWrite::UpdateClaim(updated.clone()))
            .record(transition_entry(
                actor,
                LedgerAction::ClaimSubmitted,
                &updated,
                transition,
                &event,
            ));
        self.commit(unit)?;

        self.metrics.record_transition();
        info!(claim = %claim_id, actor = %actor, evidence_count, "Claim submitted");
        Ok(updated)
    }

    /// Return a rejected claim to draft; administrators only
    pub fn reopen_claim(&self, actor: &ActorRef, claim_id: ClaimId) -> Result<Claim> {
        self.require_administrator(actor, "reopen claims")?;

        let lock = self.locks.for_claim(claim_id);
        let _guard = lock.lock();

        let claim = self.live_claim(claim_id)?;
        let event = LifecycleEvent::Reopen;
        let transition = claim.state.apply(&event)?;

        let updated = advance(&claim, transition, current_timestamp());
        let unit = UnitOfWork::new()
            .write(EntityWrite::UpdateClaim(updated.clone()))
            .record(transition_entry(
                actor,
                LedgerAction::ClaimReopened,
                &updated,
                transition,
                &event,
            ));
        self.commit(unit)?;

        self.metrics.record_transition();
        info!(claim = %claim_id, actor = %actor, round = updated.review_round, "Claim reopened");
        Ok(updated)
    }

    /// Hide a claim with its evidence and reviews; administrators only
    ///
    /// Every hidden entity gets its own ledger entry.
    pub fn tombstone_claim(&self, actor: &ActorRef, claim_id: ClaimId) -> Result<Claim> {
        self.require_administrator(actor, "tombstone claims")?;

        let lock = self.locks.for_claim(claim_id);
        let _guard = lock.lock();

        let claim = self.live_claim(claim_id)?;
        let evidence = self.store.evidence_for_claim(claim_id)?;
        let reviews = self.store.reviews_for_claim(claim_id)?;
        let now = current_timestamp();

        let hidden = || StateDelta::changed(json!({"tombstoned": false}), json!({"tombstoned": true}));
        let mut unit = UnitOfWork::new()
            .write(EntityWrite::Tombstone { claim_id, at: now })
            .record(pending(
                actor,
                LedgerAction::ClaimTombstoned,
                EntityRef::claim(claim_id),
                claim_id,
                hidden(),
                now,
            ));
        for item in evidence.iter().filter(|e| !e.tombstoned) {
            unit = unit.record(pending(
                actor,
                LedgerAction::ClaimTombstoned,
                EntityRef::evidence(item.id),
                claim_id,
                hidden(),
                now,
            ));
        }
        for review in reviews.iter().filter(|r| !r.tombstoned) {
            unit = unit.record(pending(
                actor,
                LedgerAction::ClaimTombstoned,
                EntityRef::review(review.id),
                claim_id,
                hidden(),
                now,
            ));
        }
        let entries = unit.entry_count();
        self.commit(unit)?;

        info!(claim = %claim_id, actor = %actor, entries, "Claim tombstoned");
        Ok(Claim {
            tombstoned: true,
            updated_at: now,
            ..claim
        })
    }

    // ------------------------------------------------------------------
    // Evidence
    // ------------------------------------------------------------------

    /// Attach evidence to a claim
    ///
    /// The digest is computed from the supplied bytes, or taken from a
    /// pre-computed hex digest. Attaching to a conditionally approved claim
    /// sends it back to review with a new round.
    pub fn attach_evidence(
        &self,
        actor: &ActorRef,
        claim_id: ClaimId,
        kind: EvidenceKind,
        source: impl Into<String>,
        content: EvidenceContent,
        metadata: Value,
    ) -> Result<Evidence> {
        let source = source.into();
        self.validator.validate_evidence(&source, &metadata).into_result()?;
        let digest = content
            .digest()
            .map_err(|e| AssuranceError::Integrity(format!("cannot establish content digest: {}", e)))?;

        let lock = self.locks.for_claim(claim_id);
        let _guard = lock.lock();

        let claim = self.live_claim(claim_id)?;
        let event = LifecycleEvent::EvidenceAttached;
        let transition = claim.state.apply(&event)?;

        let now = current_timestamp();
        let evidence = Evidence::new(claim_id, kind, source, digest, metadata, now);
        let mut unit = UnitOfWork::new()
            .write(EntityWrite::InsertEvidence(evidence.clone()))
            .record(pending(
                actor,
                LedgerAction::EvidenceAttached,
                EntityRef::evidence(evidence.id),
                claim_id,
                StateDelta::created(serde_json::to_value(&evidence)?),
                now,
            ));
        if transition.is_change() {
            let updated = advance(&claim, transition, now);
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

        self.metrics.record_evidence_attached();
        if transition.is_change() {
            self.metrics.record_transition();
            info!(claim = %claim_id, from = %transition.from, to = %transition.to, "Remediation evidence reopened review");
        }
        info!(claim = %claim_id, evidence = %evidence.id, digest = %evidence.digest.to_hex(), "Evidence attached");
        Ok(evidence)
    }

    /// Get an evidence item
    pub fn get_evidence(&self, evidence_id: EvidenceId) -> Result<Evidence> {
        match self.store.get_evidence(evidence_id)? {
            Some(evidence) if !evidence.tombstoned => Ok(evidence),
            _ => Err(AssuranceError::NotFound(format!("evidence {}", evidence_id))),
        }
    }

    /// Live evidence of a claim
    pub fn evidence_for_claim(&self, claim_id: ClaimId) -> Result<Vec<Evidence>> {
        self.live_claim(claim_id)?;
        let mut evidence = self.store.evidence_for_claim(claim_id)?;
        evidence.retain(|e| !e.tombstoned);
        Ok(evidence)
    }

    /// Fetch evidence content and check it against the stored digest
    ///
    /// # Errors
    ///
    /// [`AssuranceError::Integrity`] if the content no longer matches.
    pub fn retrieve_evidence<S: ContentSource>(
        &self,
        evidence_id: EvidenceId,
        source: &S,
    ) -> Result<(Evidence, Vec<u8>)> {
        let evidence = self.get_evidence(evidence_id)?;
        let content = source.fetch(&evidence.source).map_err(|e| {
            AssuranceError::NotFound(format!(
                "content of evidence {} at '{}': {}",
                evidence_id, evidence.source, e
            ))
        })?;

        if !evidence.digest.matches(&content) {
            self.metrics.record_integrity_violation();
            error!(
                evidence = %evidence_id,
                claim = %evidence.claim_id,
                expected = %evidence.digest.to_hex(),
                "Evidence content does not match its digest"
            );
            return Err(AssuranceError::Integrity(format!(
                "content of evidence {} does not match digest {}",
                evidence_id,
                evidence.digest.to_hex()
            )));
        }

        Ok((evidence, content))
    }

    /// Live reviews of a claim, oldest first
    pub fn reviews_for_claim(&self, claim_id: ClaimId) -> Result<Vec<Review>> {
        self.live_claim(claim_id)?;
        let mut reviews = self.store.reviews_for_claim(claim_id)?;
        reviews.retain(|r| !r.tombstoned);
        Ok(reviews)
    }

    // ------------------------------------------------------------------
    // Ledger
    // ------------------------------------------------------------------

    /// Last sealed ledger position
    pub fn chain_head(&self) -> Result<ChainHead> {
        Ok(self.store.chain_head()?)
    }

    /// Recompute digests for `from..=to`
    ///
    /// A divergence is part of the report, not an error; it is logged and
    /// counted.
    pub fn verify_chain(&self, from: u64, to: u64) -> Result<ChainReport> {
        let report = self.store.verify_chain(from, to)?;
        self.observe_report(&report);
        Ok(report)
    }

    /// Recompute the whole chain from the genesis seed
    pub fn verify_all(&self) -> Result<ChainReport> {
        let report = self.store.verify_all()?;
        self.observe_report(&report);
        Ok(report)
    }

    /// Verify the whole chain and fail on any divergence
    pub fn ensure_chain_intact(&self) -> Result<ChainReport> {
        let report = self.verify_all()?;
        match report.divergence {
            Some(divergence) => Err(AssuranceError::Integrity(format!(
                "ledger diverges at seq {}: {:?}",
                divergence.seq, divergence.kind
            ))),
            None => Ok(report),
        }
    }

    /// Ledger entries about one entity, in order
    pub fn history_for_entity(&self, entity_id: &str) -> Result<Vec<LedgerEntry>> {
        Ok(self.store.history_for_entity(entity_id)?)
    }

    /// Entities that have no ledger entry at all
    pub fn find_unaudited(&self) -> Result<Vec<UnauditedEntity>> {
        let unaudited = self.store.find_unaudited_entities()?;
        if !unaudited.is_empty() {
            self.metrics.record_integrity_violation();
            error!(count = unaudited.len(), "Entities without audit trail found");
        }
        Ok(unaudited)
    }

    /// Record a reconciliation entry for every unaudited entity; administrators only
    ///
    /// Each entry carries the entity's current snapshot as its `after` state.
    pub fn reconcile_unaudited(&self, actor: &ActorRef) -> Result<Vec<LedgerEntry>> {
        self.require_administrator(actor, "reconcile the ledger")?;

        let unaudited = self.store.find_unaudited_entities()?;
        if unaudited.is_empty() {
            return Ok(Vec::new());
        }

        let now = current_timestamp();
        let mut unit = UnitOfWork::new();
        for item in &unaudited {
            let Some(snapshot) = self.entity_snapshot(&item.entity)? else {
                continue;
            };
            unit = unit.record(pending(
                actor,
                LedgerAction::EntityReconciled,
                item.entity.clone(),
                item.claim_id,
                StateDelta::created(snapshot),
                now,
            ));
        }
        if unit.entry_count() == 0 {
            return Ok(Vec::new());
        }

        let entries = self.commit(unit)?;
        warn!(actor = %actor, count = entries.len(), "Reconciled unaudited entities");
        Ok(entries)
    }

    // ------------------------------------------------------------------
    // Graph
    // ------------------------------------------------------------------

    /// Build the evidence graph of a project
    pub fn build_evidence_graph(
        &self,
        project: &ProjectRef,
        options: GraphOptions,
    ) -> Result<EvidenceGraph> {
        self.require_project(project)?;
        Ok(self.graph.build_evidence_graph(project, options)?)
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    pub(crate) fn live_claim(&self, claim_id: ClaimId) -> Result<Claim> {
        match self.store.get_claim(claim_id)? {
            Some(claim) if !claim.tombstoned => Ok(claim),
            _ => Err(AssuranceError::NotFound(format!("claim {}", claim_id))),
        }
    }

    pub(crate) fn commit(&self, unit: UnitOfWork) -> Result<Vec<LedgerEntry>> {
        self.store.commit(unit).map_err(|e| {
            let error = AssuranceError::from(e);
            if matches!(error, AssuranceError::Conflict(_)) {
                self.metrics.record_conflict();
                warn!(error = %error, "Commit refused");
            }
            error
        })
    }

    fn require_project(&self, project: &ProjectRef) -> Result<()> {
        if self.directory.project_exists(project) {
            Ok(())
        } else {
            Err(AssuranceError::NotFound(format!("project {}", project)))
        }
    }

    fn require_administrator(&self, actor: &ActorRef, action: &str) -> Result<()> {
        if self.config.is_administrator(actor) {
            Ok(())
        } else {
            warn!(actor = %actor, action, "Administrative action refused");
            Err(AssuranceError::Unauthorized(format!(
                "{} may not {}",
                actor, action
            )))
        }
    }

    fn observe_report(&self, report: &ChainReport) {
        if let Some(divergence) = &report.divergence {
            self.metrics.record_integrity_violation();
            error!(
                seq = divergence.seq,
                kind = ?divergence.kind,
                verified = report.verified,
                "Ledger chain divergence"
            );
        }
    }

    fn entity_snapshot(&self, entity: &EntityRef) -> Result<Option<Value>> {
        let snapshot = match entity.kind {
            EntityKind::Claim => {
                let id = ClaimId::from_string(&entity.id).map_err(AssuranceError::Integrity)?;
                self.store.get_claim(id)?.map(|c| serde_json::to_value(&c)).transpose()?
            }
            EntityKind::Evidence => {
                let id = EvidenceId::from_string(&entity.id).map_err(AssuranceError::Integrity)?;
                self.store.get_evidence(id)?.map(|e| serde_json::to_value(&e)).transpose()?
            }
            EntityKind::Review => {
                let id = ReviewId::from_string(&entity.id).map_err(AssuranceError::Integrity)?;
                self.store.get_review(id)?.map(|r| serde_json::to_value(&r)).transpose()?
            }
        };
        Ok(snapshot)
    }
}

/// Build a ledger entry owned by `claim_id`
pub(crate) fn pending(
    actor: &ActorRef,
    action: LedgerAction,
    entity: EntityRef,
    claim_id: ClaimId,
    delta: StateDelta,
    timestamp: u64,
) -> PendingEntry {
    PendingEntry {
        actor: actor.clone(),
        action,
        entity,
        claim_id,
        delta,
        timestamp,
    }
}

/// Ledger entry for a lifecycle transition of `claim` (already advanced)
pub(crate) fn transition_entry(
    actor: &ActorRef,
    action: LedgerAction,
    claim: &Claim,
    transition: Transition,
    event: &LifecycleEvent,
) -> PendingEntry {
    pending(
        actor,
        action,
        EntityRef::claim(claim.id),
        claim.id,
        StateDelta::changed(
            json!({
                "state": transition.from.as_str(),
                "tier": transition.from.tier().as_str(),
            }),
            json!({
                "state": transition.to.as_str(),
                "tier": transition.to.tier().as_str(),
                "review_round": claim.review_round,
                "event": event.name(),
            }),
        ),
        claim.updated_at,
    )
}

/// Copy of `claim` after `transition`, bumping the round when one starts
pub(crate) fn advance(claim: &Claim, transition: Transition, at: u64) -> Claim {
    let mut next = claim.clone();
    next.state = transition.to;
    if transition.starts_round() {
        next.review_round += 1;
    }
    next.updated_at = at;
    next
}
