//! The chaining function
//!
//! `digest(n) = SHA-256(DOMAIN_TAG || digest(n-1) || canonical_json(content(n)))`
//!
//! with `digest(0)` the genesis seed, `SHA-256(GENESIS_LABEL)`. Canonical JSON
//! sorts object keys recursively so a delta read back from storage hashes
//! the same as the delta that was written.

use crate::entry::{EntryContent, LedgerEntry, PendingEntry};
use crate::LedgerError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fmt;

/// Label hashed to produce the genesis seed
pub const GENESIS_LABEL: &[u8] = b"ratchet/ledger/genesis/v1";

/// Prefix mixed into every chaining digest
const DOMAIN_TAG: &[u8] = b"ratchet/ledger/entry/v1\0";

/// A 32-byte chaining digest
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChainDigest([u8; 32]);

impl ChainDigest {
    /// The well-known seed the first entry chains from
    pub fn genesis() -> Self {
        Self(Sha256::digest(GENESIS_LABEL).into())
    }

    /// Parse a 64-character hex digest
    pub fn from_hex(s: &str) -> Result<Self, LedgerError> {
        let bytes = hex::decode(s).map_err(|e| LedgerError::InvalidDigest(e.to_string()))?;
        let arr: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| {
            LedgerError::InvalidDigest(format!("expected 32 bytes, got {}", b.len()))
        })?;
        Ok(Self(arr))
    }

    /// Lowercase hex rendering
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for ChainDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChainDigest({})", self.to_hex())
    }
}

impl fmt::Display for ChainDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl TryFrom<String> for ChainDigest {
    type Error = LedgerError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_hex(&s)
    }
}

impl From<ChainDigest> for String {
    fn from(d: ChainDigest) -> Self {
        d.to_hex()
    }
}

/// Recursively sort object keys
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::new();
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

pub(crate) fn chain_digest(
    previous: &ChainDigest,
    content: &EntryContent<'_>,
) -> Result<ChainDigest, LedgerError> {
    let canonical = canonicalize(&serde_json::to_value(content)?);
    let bytes = serde_json::to_vec(&canonical)?;

    let mut hasher = Sha256::new();
    hasher.update(DOMAIN_TAG);
    hasher.update(previous.0);
    hasher.update(&bytes);
    Ok(ChainDigest(hasher.finalize().into()))
}

/// Recompute the digest an entry should carry given its predecessor
pub fn expected_digest(
    previous: &ChainDigest,
    entry: &LedgerEntry,
) -> Result<ChainDigest, LedgerError> {
    chain_digest(previous, &entry.content())
}

/// The last sealed position of the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainHead {
    /// Sequence number of the last entry (0 for an empty ledger)
    pub seq: u64,
    /// Digest of the last entry (genesis seed for an empty ledger)
    pub digest: ChainDigest,
}

impl ChainHead {
    /// Head of an empty ledger
    pub fn genesis() -> Self {
        Self {
            seq: 0,
            digest: ChainDigest::genesis(),
        }
    }

    /// Seal `pending` as the next entry after this head
    pub fn seal(&self, pending: PendingEntry) -> Result<LedgerEntry, LedgerError> {
        let mut entry = LedgerEntry {
            seq: self.seq + 1,
            actor: pending.actor,
            action: pending.action,
            entity: pending.entity,
            claim_id: pending.claim_id,
            delta: pending.delta,
            timestamp: pending.timestamp,
            digest: self.digest,
        };
        entry.digest = chain_digest(&self.digest, &entry.content())?;
        Ok(entry)
    }

    /// Head positioned at `entry`
    pub fn at(entry: &LedgerEntry) -> Self {
        Self {
            seq: entry.seq,
            digest: entry.digest,
        }
    }
}
