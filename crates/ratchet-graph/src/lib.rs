//! Ratchet Graph Query Engine
//!
//! Builds the evidence graph of a project for visualization: claims, the
//! evidence supporting them, the reviews judging them and, in provenance
//! views, the ledger entries that recorded each change.
//!
//! The graph is assembled from a single read snapshot of the store using
//! claim-indexed queries, so the latency stays proportional to the size of
//! the project rather than of the database.

#![warn(missing_docs)]

mod model;

pub use model::{EdgeKind, EvidenceGraph, GraphEdge, GraphNode, GraphStats, NodeData};

use ratchet_domain::ProjectRef;
use ratchet_store::{ProjectSnapshot, SqliteStore, StoreError};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors raised while building a graph
#[derive(Error, Debug)]
pub enum GraphError {
    /// Reading the snapshot failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// What to include in a graph
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphOptions {
    /// Add audit nodes and recorded-by edges
    pub include_history: bool,
    /// Include tombstoned claims and everything they own
    pub include_tombstoned: bool,
}

impl GraphOptions {
    /// Provenance view: live entities plus their audit trail
    pub fn provenance() -> Self {
        Self {
            include_history: true,
            include_tombstoned: false,
        }
    }
}

/// Builds evidence graphs from the entity store
pub struct GraphQueryEngine {
    store: Arc<SqliteStore>,
    latency_budget: Duration,
}

impl GraphQueryEngine {
    /// Create an engine warning when a build exceeds `latency_budget`
    pub fn new(store: Arc<SqliteStore>, latency_budget: Duration) -> Self {
        Self {
            store,
            latency_budget,
        }
    }

    /// Build the graph of all claims in `project`
    pub fn build_evidence_graph(
        &self,
        project: &ProjectRef,
        options: GraphOptions,
    ) -> Result<EvidenceGraph, GraphError> {
        let started = Instant::now();

        let snapshot = self.store.project_snapshot(
            project,
            options.include_tombstoned,
            options.include_history,
        )?;
        let mut graph = assemble(project, snapshot);

        let elapsed = started.elapsed();
        graph.stats.elapsed_ms = elapsed.as_millis() as u64;
        graph.stats.over_budget = elapsed > self.latency_budget;

        if graph.stats.over_budget {
            warn!(
                project = %project,
                nodes = graph.stats.node_count,
                edges = graph.stats.edge_count,
                elapsed_ms = graph.stats.elapsed_ms,
                budget_ms = self.latency_budget.as_millis() as u64,
                "Evidence graph exceeded latency budget"
            );
        } else {
            debug!(
                project = %project,
                nodes = graph.stats.node_count,
                edges = graph.stats.edge_count,
                elapsed_ms = graph.stats.elapsed_ms,
                "Built evidence graph"
            );
        }

        Ok(graph)
    }
}

/// Turn a project snapshot into nodes and edges
///
/// Edges only connect nodes present in the graph: evidence of a claim that
/// was filtered out is dropped along with it.
pub fn assemble(project: &ProjectRef, snapshot: ProjectSnapshot) -> EvidenceGraph {
    let ProjectSnapshot {
        claims,
        evidence,
        reviews,
        history,
    } = snapshot;

    let mut nodes = Vec::with_capacity(claims.len() + evidence.len() + reviews.len() + history.len());
    let mut edges = Vec::new();
    let mut present: HashSet<String> = HashSet::new();

    for claim in claims {
        let id = claim.id.to_string();
        present.insert(id.clone());
        nodes.push(GraphNode {
            id,
            data: NodeData::Claim {
                tier: claim.tier(),
                indicator: claim.indicator,
                value: claim.value,
                unit: claim.unit,
                state: claim.state,
                tombstoned: claim.tombstoned,
            },
        });
    }

    for item in evidence {
        let claim_id = item.claim_id.to_string();
        if !present.contains(&claim_id) {
            continue;
        }
        let id = item.id.to_string();
        edges.push(GraphEdge {
            source: claim_id,
            target: id.clone(),
            kind: EdgeKind::ClaimHasEvidence,
        });
        present.insert(id.clone());
        nodes.push(GraphNode {
            id,
            data: NodeData::Evidence {
                kind: item.kind,
                digest: item.digest.to_hex(),
                tombstoned: item.tombstoned,
            },
        });
    }

    for review in reviews {
        let claim_id = review.claim_id.to_string();
        if !present.contains(&claim_id) {
            continue;
        }
        let id = review.id.to_string();
        edges.push(GraphEdge {
            source: claim_id.clone(),
            target: id.clone(),
            kind: EdgeKind::ClaimHasReview,
        });
        if let Some(resulting_state) = review.resulting_state {
            edges.push(GraphEdge {
                source: id.clone(),
                target: claim_id,
                kind: EdgeKind::ReviewPrecedesStateChange { resulting_state },
            });
        }
        present.insert(id.clone());
        nodes.push(GraphNode {
            id,
            data: NodeData::Review {
                kind: review.kind,
                decision: review.decision,
                score: review.score,
                round: review.round,
            },
        });
    }

    for entry in history {
        if !present.contains(&entry.entity.id) {
            continue;
        }
        let id = format!("ledger:{}", entry.seq);
        edges.push(GraphEdge {
            source: entry.entity.id,
            target: id.clone(),
            kind: EdgeKind::RecordedBy,
        });
        nodes.push(GraphNode {
            id,
            data: NodeData::Audit {
                seq: entry.seq,
                action: entry.action,
                actor: entry.actor.as_str().to_string(),
                timestamp: entry.timestamp,
            },
        });
    }

    let stats = GraphStats {
        node_count: nodes.len(),
        edge_count: edges.len(),
        ..GraphStats::default()
    };

    EvidenceGraph {
        project: project.clone(),
        nodes,
        edges,
        stats,
    }
}
