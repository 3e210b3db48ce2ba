//! Input validation for claims and evidence
//!
//! Runs before any lock is taken or transaction opened; a rejected input
//! never reaches the store.

use crate::AssuranceError;
use ratchet_domain::{ClaimDraft, ClaimUpdate};
use std::collections::BTreeSet;

/// Highest Sustainable Development Goal number
const SDG_GOALS: u8 = 17;

/// Result of validating an input
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    /// Rejection reasons (empty when accepted)
    pub reasons: Vec<RejectionReason>,
}

impl ValidationResult {
    /// Whether the input passed validation
    pub fn is_accepted(&self) -> bool {
        self.reasons.is_empty()
    }

    /// Convert into an error carrying every reason
    pub fn into_result(self) -> Result<(), AssuranceError> {
        if self.is_accepted() {
            return Ok(());
        }
        let reasons: Vec<String> = self.reasons.iter().map(ToString::to_string).collect();
        Err(AssuranceError::Validation(reasons.join("; ")))
    }
}

/// Reasons for rejection
#[derive(Debug, Clone, PartialEq)]
pub enum RejectionReason {
    /// A required text field is empty
    BlankField(&'static str),

    /// The claimed value is NaN or infinite
    NonFiniteValue(f64),

    /// An SDG target tag is not `<goal>` or `<goal>.<target>`
    InvalidSdgTarget(String),

    /// Evidence metadata must be a JSON object or null
    InvalidMetadata,

    /// The update changes nothing
    EmptyUpdate,
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectionReason::BlankField(field) => write!(f, "{} must not be blank", field),
            RejectionReason::NonFiniteValue(v) => write!(f, "value {} is not finite", v),
            RejectionReason::InvalidSdgTarget(t) => write!(f, "invalid SDG target '{}'", t),
            RejectionReason::InvalidMetadata => {
                write!(f, "metadata must be a JSON object or null")
            }
            RejectionReason::EmptyUpdate => write!(f, "update contains no changes"),
        }
    }
}

/// Validates claim and evidence input
#[derive(Debug, Clone, Copy, Default)]
pub struct ClaimValidator;

impl ClaimValidator {
    /// Validate a new claim
    pub fn validate_draft(&self, draft: &ClaimDraft) -> ValidationResult {
        let mut reasons = Vec::new();

        check_text(&mut reasons, "indicator", &draft.indicator);
        check_text(&mut reasons, "unit", &draft.unit);
        check_text(&mut reasons, "method", &draft.method);
        if !draft.value.is_finite() {
            reasons.push(RejectionReason::NonFiniteValue(draft.value));
        }
        check_sdg_targets(&mut reasons, &draft.sdg_targets);

        ValidationResult { reasons }
    }

    /// Validate a metadata update
    pub fn validate_update(&self, update: &ClaimUpdate) -> ValidationResult {
        let mut reasons = Vec::new();

        if update.is_empty() {
            reasons.push(RejectionReason::EmptyUpdate);
        }
        if let Some(indicator) = &update.indicator {
            check_text(&mut reasons, "indicator", indicator);
        }
        if let Some(unit) = &update.unit {
            check_text(&mut reasons, "unit", unit);
        }
        if let Some(method) = &update.method {
            check_text(&mut reasons, "method", method);
        }
        if let Some(value) = update.value {
            if !value.is_finite() {
                reasons.push(RejectionReason::NonFiniteValue(value));
            }
        }
        if let Some(targets) = &update.sdg_targets {
            check_sdg_targets(&mut reasons, targets);
        }

        ValidationResult { reasons }
    }

    /// Validate evidence descriptors
    pub fn validate_evidence(&self, source: &str, metadata: &serde_json::Value) -> ValidationResult {
        let mut reasons = Vec::new();

        check_text(&mut reasons, "source", source);
        if !(metadata.is_object() || metadata.is_null()) {
            reasons.push(RejectionReason::InvalidMetadata);
        }

        ValidationResult { reasons }
    }
}

fn check_text(reasons: &mut Vec<RejectionReason>, field: &'static str, value: &str) {
    if value.trim().is_empty() {
        reasons.push(RejectionReason::BlankField(field));
    }
}

fn check_sdg_targets(reasons: &mut Vec<RejectionReason>, targets: &BTreeSet<String>) {
    for target in targets {
        if !is_sdg_target(target) {
            reasons.push(RejectionReason::InvalidSdgTarget(target.clone()));
        }
    }
}

/// `13`, `13.2` and `6.a` are valid; goals run from 1 to 17
fn is_sdg_target(tag: &str) -> bool {
    let (goal, target) = match tag.split_once('.') {
        Some((goal, target)) => (goal, Some(target)),
        None => (tag, None),
    };

    let goal_ok = matches!(goal.parse::<u8>(), Ok(g) if (1..=SDG_GOALS).contains(&g));
    let target_ok = target.is_none_or(|t| {
        (1..=2).contains(&t.len())
            && t.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase())
    });

    goal_ok && target_ok
}
