//! Evidence graph nodes and edges

use ratchet_domain::{
    AssuranceState, Decision, EvidenceKind, ProjectRef, ReviewKind, Score, Tier,
};
use ratchet_ledger::{EntityKind, LedgerAction};
use serde::Serialize;

/// What a node stands for
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum NodeData {
    /// An impact claim
    Claim {
        /// Indicator name
        indicator: String,
        /// Reported value
        value: f64,
        /// Unit of the value
        unit: String,
        /// Lifecycle state
        state: AssuranceState,
        /// Derived assurance tier
        tier: Tier,
        /// Hidden unless tombstoned entities were requested
        tombstoned: bool,
    },
    /// A supporting artifact
    Evidence {
        /// Artifact kind
        kind: EvidenceKind,
        /// Hex content digest
        digest: String,
        /// Hidden unless tombstoned entities were requested
        tombstoned: bool,
    },
    /// A reviewer's judgment
    Review {
        /// Review kind
        kind: ReviewKind,
        /// Decision so far
        decision: Decision,
        /// Score, once decided
        score: Option<Score>,
        /// Review round of the claim
        round: u32,
    },
    /// A ledger entry, present in provenance views only
    Audit {
        /// Ledger sequence number
        seq: u64,
        /// Recorded action
        action: LedgerAction,
        /// Acting party
        actor: String,
        /// When the action was recorded
        timestamp: u64,
    },
}

/// A graph node, keyed by the entity's identifier
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    /// Entity identifier (`ledger:<seq>` for audit nodes)
    pub id: String,
    /// Node payload
    #[serde(flatten)]
    pub data: NodeData,
}

impl GraphNode {
    /// Entity kind of this node, `None` for audit nodes
    pub fn entity_kind(&self) -> Option<EntityKind> {
        match self.data {
            NodeData::Claim { .. } => Some(EntityKind::Claim),
            NodeData::Evidence { .. } => Some(EntityKind::Evidence),
            NodeData::Review { .. } => Some(EntityKind::Review),
            NodeData::Audit { .. } => None,
        }
    }
}

/// Relation between two nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "relation")]
pub enum EdgeKind {
    /// Claim → evidence it owns
    ClaimHasEvidence,
    /// Claim → review of it
    ClaimHasReview,
    /// Review → claim, when the decision moved the claim
    ReviewPrecedesStateChange {
        /// State the claim moved to
        resulting_state: AssuranceState,
    },
    /// Entity → ledger entry that recorded a change to it
    RecordedBy,
}

/// A directed edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphEdge {
    /// Source node id
    pub source: String,
    /// Target node id
    pub target: String,
    /// Relation
    #[serde(flatten)]
    pub kind: EdgeKind,
}

/// Size and timing of a graph build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct GraphStats {
    /// Number of nodes
    pub node_count: usize,
    /// Number of edges
    pub edge_count: usize,
    /// Wall time spent reading and assembling, in milliseconds
    pub elapsed_ms: u64,
    /// Whether the configured latency budget was exceeded
    pub over_budget: bool,
}

/// Nodes and edges of one project
#[derive(Debug, Clone, Serialize)]
pub struct EvidenceGraph {
    /// Project the graph was built for
    pub project: ProjectRef,
    /// Nodes: claims first, then evidence, reviews and audit entries
    pub nodes: Vec<GraphNode>,
    /// Edges
    pub edges: Vec<GraphEdge>,
    /// Build statistics
    pub stats: GraphStats,
}

impl EvidenceGraph {
    /// Look up a node by id
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Edges leaving `source`
    pub fn edges_from<'a>(
        &'a self,
        source: &'a str,
    ) -> impl Iterator<Item = &'a GraphEdge> + 'a {
        self.edges.iter().filter(move |e| e.source == source)
    }
}
