//! Ledger error types

use thiserror::Error;

/// Errors that can occur while building or checking the chain
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Entry content could not be serialized for hashing
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored digest is not valid hex of the right length
    #[error("Invalid digest: {0}")]
    InvalidDigest(String),

    /// A stored tag does not name a known action or entity kind
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Requested range is empty or inverted
    #[error("Invalid range {from}..={to}")]
    InvalidRange {
        /// First sequence number
        from: u64,
        /// Last sequence number
        to: u64,
    },
}
