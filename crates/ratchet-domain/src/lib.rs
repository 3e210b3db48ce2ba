//! Ratchet Domain Layer
//!
//! This crate contains the data model and the assurance lifecycle of Ratchet.
//! It holds no storage or I/O; infrastructure lives in other crates and
//! talks to this one through plain values and the traits in [`traits`].
//!
//! ## Key Concepts
//!
//! - **Claim**: an assertion of measured impact that requires verification
//! - **Evidence**: an artifact supporting a claim, protected by a content digest
//! - **Review**: a reviewer's judgment, immutable once finalized
//! - **Assurance state**: the claim lifecycle (draft → ... → third-party verified)
//! - **Tier**: trust level derived from the state (self → peer → verified)
//!
//! ## Architecture
//!
//! - Pure business logic only
//! - Calculation payloads and metadata are opaque JSON values
//! - Trait definitions for the collaborators the core does not own

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod claim;
pub mod evidence;
pub mod id;
pub mod lifecycle;
pub mod review;
pub mod traits;
pub mod verdict;

use std::time::{SystemTime, UNIX_EPOCH};

// Re-exports for convenience
pub use claim::{Claim, ClaimDraft, ClaimUpdate};
pub use evidence::{ContentDigest, Evidence, EvidenceContent, EvidenceKind};
pub use id::{ActorRef, ClaimId, EvidenceId, ProjectRef, ReviewId};
pub use lifecycle::{AssuranceState, LifecycleEvent, Tier, Transition, TransitionError};
pub use review::{Decision, Review, ReviewError, ReviewKind, Score};
pub use verdict::{round_verdict, Verdict};

/// Current timestamp in milliseconds since the Unix epoch
pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
