//! Claim module - an assertion of measured impact

use crate::lifecycle::{AssuranceState, Tier};
use crate::{ClaimId, ProjectRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// An assertion of environmental or social impact that requires verification
///
/// The lifecycle state is only changed by committed transitions; the tier is
/// always derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    /// Unique identifier
    pub id: ClaimId,

    /// Owning project
    pub project: ProjectRef,

    /// Indicator being measured (e.g. "tCO2e avoided")
    pub indicator: String,

    /// Measured value
    pub value: f64,

    /// Unit of the value
    pub unit: String,

    /// Tag of the calculation method that produced the value (opaque)
    pub method: String,

    /// Output of the calculation engine, passed through unchanged
    pub calculation: serde_json::Value,

    /// SDG target tags (e.g. "13.2")
    pub sdg_targets: BTreeSet<String>,

    /// Lifecycle state
    pub state: AssuranceState,

    /// Review round counter; bumps whenever review starts over
    pub review_round: u32,

    /// Hidden by an audited tombstone
    pub tombstoned: bool,

    /// When this claim was created
    pub created_at: u64,

    /// Last modification
    pub updated_at: u64,
}

/// Caller-supplied fields of a claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimDraft {
    /// Owning project
    pub project: ProjectRef,
    /// Indicator being measured
    pub indicator: String,
    /// Measured value
    pub value: f64,
    /// Unit of the value
    pub unit: String,
    /// Calculation method tag
    pub method: String,
    /// Calculation payload
    #[serde(default)]
    pub calculation: serde_json::Value,
    /// SDG target tags
    #[serde(default)]
    pub sdg_targets: BTreeSet<String>,
}

/// Metadata changes to an existing claim
///
/// There is deliberately no field for the state or the tier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClaimUpdate {
    /// New indicator name
    pub indicator: Option<String>,
    /// New value
    pub value: Option<f64>,
    /// New unit
    pub unit: Option<String>,
    /// New method tag
    pub method: Option<String>,
    /// New calculation payload
    pub calculation: Option<serde_json::Value>,
    /// New SDG target set
    pub sdg_targets: Option<BTreeSet<String>>,
}

impl ClaimUpdate {
    /// Whether the update changes nothing
    pub fn is_empty(&self) -> bool {
        self.indicator.is_none()
            && self.value.is_none()
            && self.unit.is_none()
            && self.method.is_none()
            && self.calculation.is_none()
            && self.sdg_targets.is_none()
    }
}

impl Claim {
    /// Create a new draft claim
    pub fn new(draft: ClaimDraft, created_at: u64) -> Self {
        Self {
            id: ClaimId::new(),
            project: draft.project,
            indicator: draft.indicator,
            value: draft.value,
            unit: draft.unit,
            method: draft.method,
            calculation: draft.calculation,
            sdg_targets: draft.sdg_targets,
            state: AssuranceState::Draft,
            review_round: 0,
            tombstoned: false,
            created_at,
            updated_at: created_at,
        }
    }

    /// Assurance tier derived from the state
    pub fn tier(&self) -> Tier {
        self.state.tier()
    }

    /// Copy of this claim with `update` applied
    pub fn with_update(&self, update: &ClaimUpdate, updated_at: u64) -> Claim {
        let mut next = self.clone();
        if let Some(indicator) = &update.indicator {
            next.indicator = indicator.clone();
        }
        if let Some(value) = update.value {
            next.value = value;
        }
        if let Some(unit) = &update.unit {
            next.unit = unit.clone();
        }
        if let Some(method) = &update.method {
            next.method = method.clone();
        }
        if let Some(calculation) = &update.calculation {
            next.calculation = calculation.clone();
        }
        if let Some(targets) = &update.sdg_targets {
            next.sdg_targets = targets.clone();
        }
        next.updated_at = updated_at;
        next
    }

    /// Metadata view used in audit deltas
    pub fn metadata_snapshot(&self) -> serde_json::Value {
        serde_json::json!({
            "indicator": self.indicator,
            "value": self.value,
            "unit": self.unit,
            "method": self.method,
            "calculation": self.calculation,
            "sdg_targets": self.sdg_targets,
        })
    }
}
