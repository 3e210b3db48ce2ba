//! Evidence - integrity-protected artifacts supporting a claim

use crate::{ClaimId, EvidenceId};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Kind of supporting artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceKind {
    /// Report, certificate, contract
    Document,
    /// Dataset or measurement export
    Data,
    /// Photograph or scan
    Image,
    /// Video recording
    Video,
}

impl EvidenceKind {
    /// Get the kind name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            EvidenceKind::Document => "document",
            EvidenceKind::Data => "data",
            EvidenceKind::Image => "image",
            EvidenceKind::Video => "video",
        }
    }

    /// Parse a kind from a string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "document" => Some(EvidenceKind::Document),
            "data" => Some(EvidenceKind::Data),
            "image" => Some(EvidenceKind::Image),
            "video" => Some(EvidenceKind::Video),
            _ => None,
        }
    }
}

impl std::str::FromStr for EvidenceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid evidence kind: {}", s))
    }
}

/// SHA-256 digest of evidence content
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentDigest([u8; 32]);

impl ContentDigest {
    /// Digest raw content
    pub fn compute(content: &[u8]) -> Self {
        Self(Sha256::digest(content).into())
    }

    /// Parse a 64-character hex digest
    pub fn from_hex(s: &str) -> Result<Self, String> {
        let bytes = hex::decode(s.trim()).map_err(|e| format!("Invalid digest hex: {}", e))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| format!("Expected 32-byte digest, got {} bytes", b.len()))?;
        Ok(Self(arr))
    }

    /// Lowercase hex rendering
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Raw digest bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Whether `content` hashes to this digest
    pub fn matches(&self, content: &[u8]) -> bool {
        Self::compute(content) == *self
    }
}

impl fmt::Debug for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentDigest({})", self.to_hex())
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl TryFrom<String> for ContentDigest {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_hex(&s)
    }
}

impl From<ContentDigest> for String {
    fn from(d: ContentDigest) -> Self {
        d.to_hex()
    }
}

/// Content supplied when attaching evidence
#[derive(Debug, Clone, PartialEq)]
pub enum EvidenceContent {
    /// Raw bytes; the digest is computed here
    Bytes(Vec<u8>),
    /// Digest computed upstream, as hex
    PrecomputedDigest(String),
}

impl EvidenceContent {
    /// Produce the content digest
    ///
    /// # Errors
    /// Fails for empty content or a malformed pre-computed digest.
    pub fn digest(&self) -> Result<ContentDigest, String> {
        match self {
            EvidenceContent::Bytes(bytes) if bytes.is_empty() => {
                Err("cannot digest empty evidence content".to_string())
            }
            EvidenceContent::Bytes(bytes) => Ok(ContentDigest::compute(bytes)),
            EvidenceContent::PrecomputedDigest(hex) => ContentDigest::from_hex(hex),
        }
    }
}

/// Supporting artifact for a claim
///
/// The digest is computed once at attachment and never changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    /// Unique identifier
    pub id: EvidenceId,

    /// Owning claim
    pub claim_id: ClaimId,

    /// Kind of artifact
    pub kind: EvidenceKind,

    /// Where the content lives (URI, storage key)
    pub source: String,

    /// Content digest taken at attachment
    pub digest: ContentDigest,

    /// Opaque metadata
    pub metadata: serde_json::Value,

    /// When the evidence was attached
    pub created_at: u64,

    /// Hidden by an audited tombstone of the owning claim
    pub tombstoned: bool,
}

impl Evidence {
    /// Create a new evidence record
    pub fn new(
        claim_id: ClaimId,
        kind: EvidenceKind,
        source: String,
        digest: ContentDigest,
        metadata: serde_json::Value,
        created_at: u64,
    ) -> Self {
        Self {
            id: EvidenceId::new(),
            claim_id,
            kind,
            source,
            digest,
            metadata,
            created_at,
            tombstoned: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_is_sha256() {
        let digest = ContentDigest::compute(b"abc");
        assert_eq!(
            digest.to_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert!(digest.matches(b"abc"));
        assert!(!digest.matches(b"abd"));
    }

    #[test]
    fn test_hex_roundtrip() {
        let digest = ContentDigest::compute(b"report.pdf");
        assert_eq!(ContentDigest::from_hex(&digest.to_hex()).unwrap(), digest);
    }

    #[test]
    fn test_digest_cannot_be_computed() {
        assert!(EvidenceContent::Bytes(Vec::new()).digest().is_err());
        assert!(EvidenceContent::PrecomputedDigest("zz".into()).digest().is_err());
        assert!(EvidenceContent::PrecomputedDigest("abcd".into()).digest().is_err());
    }

    #[test]
    fn test_precomputed_digest_accepted() {
        let hex = ContentDigest::compute(b"x").to_hex();
        let digest = EvidenceContent::PrecomputedDigest(hex.clone()).digest().unwrap();
        assert_eq!(digest.to_hex(), hex);
    }
}
