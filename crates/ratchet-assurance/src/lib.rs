//! Ratchet Assurance Engine
//!
//! Drives claims through the progressive assurance lifecycle:
//!
//! ```text
//! Draft → Submitted → UnderReview → PeerApproved → ThirdPartyVerified
//!                          ↓   ↑          ↓
//!                  ConditionallyApproved   Rejected → (reopen) → Draft
//! ```
//!
//! ## Guarantees
//!
//! - Tiers only advance on a finalized review; a single rejection wins
//! - Every mutation commits with its ledger entries or not at all
//! - Mutations of one claim are serialized by a claim-scoped lock
//! - Evidence retrieval re-checks content against its stored digest
//!
//! Validation and prerequisite failures are raised before any transaction
//! opens. Reviewer notification runs on a tokio worker after commit and can
//! never undo an assignment.

#![warn(missing_docs)]

pub mod config;
pub mod engine;
pub mod error;
pub mod locks;
pub mod metrics;
pub mod notify;
pub mod orchestrator;
pub mod validator;

pub use config::{AssuranceConfig, ConfigError};
pub use engine::AssuranceEngine;
pub use error::{AssuranceError, Result, Severity};
pub use metrics::{AssuranceMetrics, MetricsSnapshot};
pub use notify::{
    LogNotifier, NotificationDispatcher, NotificationHandle, NotifyError, ReviewNotice,
    ReviewNotifier,
};
pub use orchestrator::DecisionOutcome;
pub use validator::{ClaimValidator, RejectionReason, ValidationResult};

pub use ratchet_graph::{EvidenceGraph, GraphOptions};
