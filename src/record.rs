//! The canonical on-disk JSON envelope (spec.md §3, `EmbeddedMetadataRecord<T>`)
//! and the small shapes that travel alongside it (`StateDeltaFile`,
//! `IntegrityViolation`, `ConflictInfo`, `ConflictDiff`).

use base64::Engine as _;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// `.gitgov/<kind>/<id>.json`'s envelope. The payload is opaque to the
/// engine (domain-specific, owned by callers); the engine only ever touches
/// `header`, and only via the Identity port during resolve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub header: RecordHeader,
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordHeader {
    pub version: String,
    #[serde(rename = "type")]
    pub kind: RecordKind,
    #[serde(rename = "payloadChecksum")]
    pub payload_checksum: String,
    pub signatures: Vec<Signature>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Task,
    Cycle,
    Actor,
    Feedback,
    Execution,
    Changelog,
    Workflow,
    Config,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    #[serde(rename = "keyId")]
    pub key_id: String,
    pub role: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub signature: String,
    pub timestamp: String,
}

impl Signature {
    /// Whether `signature` looks like a well-formed base64 signature: 86
    /// characters followed by `==` (SPEC_FULL.md §3). Used only by tests and
    /// test-doubles to catch obviously-malformed Identity implementations;
    /// the production engine never rejects a signature on this basis.
    pub fn looks_well_formed(&self) -> bool {
        self.signature.len() == 88
            && self.signature.ends_with("==")
            && self.signature[..86]
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/')
    }
}

/// `hex(sha256(canonical_json(payload)))` (SPEC_FULL.md §3). Canonical here
/// means "round-tripped through `serde_json::Value`", which sorts object
/// keys because this crate doesn't enable serde_json's `preserve_order`
/// feature — a standard stable encoding, not a bespoke scheme.
pub fn payload_checksum(payload: &serde_json::Value) -> String {
    let canonical =
        serde_json::to_vec(payload).expect("serde_json::Value always serializes");
    let digest = Sha256::digest(&canonical);
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

impl Record {
    /// Whether `header.payloadChecksum` matches the payload's actual hash
    /// (the invariant spec.md §3 states for "any record written by the
    /// engine").
    pub fn checksum_matches(&self) -> bool {
        self.header.payload_checksum == payload_checksum(&self.payload)
    }
}

/// A single base64 signature component, used only by test identity doubles
/// that need to mint a plausible-looking (if not cryptographically real)
/// signature value.
pub fn fake_signature_value(seed: &str) -> String {
    let digest = Sha256::digest(seed.as_bytes());
    let mut encoded = base64::engine::general_purpose::STANDARD.encode(digest);
    // Sha256 digest is 32 bytes -> 44 base64 chars; pad out to the 86+"=="
    // shape spec.md/SPEC_FULL.md describe by repeating the digest.
    while encoded.len() < 88 {
        encoded.push_str(&base64::engine::general_purpose::STANDARD.encode(Sha256::digest(encoded.as_bytes())));
    }
    encoded.truncate(86);
    encoded.push_str("==");
    encoded
}

/// `{status: A|M|D, file}` (spec.md §3). Describes a single changed file
/// between two Git refs, scoped to `.gitgov/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateDeltaFile {
    pub status: DeltaStatus,
    pub file: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaStatus {
    Added,
    Modified,
    Deleted,
}

impl DeltaStatus {
    pub fn from_git_status_char(c: char) -> Option<Self> {
        match c {
            'A' => Some(DeltaStatus::Added),
            'M' => Some(DeltaStatus::Modified),
            'D' => Some(DeltaStatus::Deleted),
            // Renames/copies surface as R100/C100 in name-status output;
            // the engine treats them as modifications of the destination
            // path, which callers resolve before constructing this type.
            'R' | 'C' => Some(DeltaStatus::Modified),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            DeltaStatus::Added => 'A',
            DeltaStatus::Modified => 'M',
            DeltaStatus::Deleted => 'D',
        }
    }
}

/// A rebase/pick/conflict commit on the state branch whose immediately
/// following commit is not a `resolution:` commit (spec.md §3/§4.6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityViolation {
    pub rebase_commit_hash: String,
    pub commit_message: String,
    pub timestamp: i64,
    pub author: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictType {
    RebaseConflict,
    MergeConflict,
    IntegrityViolation,
    UnresolvedMarkers,
}

/// Attached to push/pull results when a phase fails with a conflict
/// (spec.md §3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictInfo {
    pub kind: ConflictType,
    pub affected_files: Vec<String>,
    pub message: String,
    pub resolution_steps: Vec<String>,
}

impl ConflictInfo {
    /// The canonical resolution-steps list referenced but never given
    /// content in spec.md §4.3/§4.4 (SPEC_FULL.md's supplemental addition).
    pub fn for_rebase_conflict(affected_files: Vec<String>) -> Self {
        Self {
            kind: ConflictType::RebaseConflict,
            affected_files,
            message: "rebase onto the state branch stopped with conflicts".to_string(),
            resolution_steps: vec![
                "inspect the conflicted files listed in affectedFiles".to_string(),
                "edit them to remove conflict markers".to_string(),
                "run `gitgov sync resolve` to re-sign and continue".to_string(),
            ],
        }
    }

    pub fn for_integrity_violation(affected_files: Vec<String>) -> Self {
        Self {
            kind: ConflictType::IntegrityViolation,
            affected_files,
            message: "state branch has rebase commits without a matching resolution commit"
                .to_string(),
            resolution_steps: vec![
                "run `gitgov sync audit` for the full report".to_string(),
                "re-run `gitgov sync resolve` for the affected commits".to_string(),
            ],
        }
    }

    pub fn for_unresolved_markers(affected_files: Vec<String>) -> Self {
        Self {
            kind: ConflictType::UnresolvedMarkers,
            affected_files,
            message: "conflict markers remain in staged files".to_string(),
            resolution_steps: vec![
                "edit the listed files to remove conflict markers".to_string(),
                "stage the resolved files and re-run `gitgov sync resolve`".to_string(),
            ],
        }
    }
}

/// Per-file conflict detail (spec.md §3). Produced by
/// [`crate::git::conflict`] since it's a pure text operation over a
/// conflicted file's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictDiff {
    pub file_path: String,
    pub local_content: String,
    pub remote_content: String,
    pub base_content: Option<String>,
    pub conflict_markers: Vec<crate::git::conflict::ConflictMarker>,
    pub message: String,
    pub resolution_steps: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_is_order_independent() {
        let a = serde_json::json!({"b": 2, "a": 1});
        let b = serde_json::json!({"a": 1, "b": 2});
        assert_eq!(payload_checksum(&a), payload_checksum(&b));
    }

    #[test]
    fn checksum_changes_with_content() {
        let a = serde_json::json!({"a": 1});
        let b = serde_json::json!({"a": 2});
        assert_ne!(payload_checksum(&a), payload_checksum(&b));
    }

    #[test]
    fn fake_signature_looks_well_formed() {
        let sig = Signature {
            key_id: "human:alice".to_string(),
            role: "resolver".to_string(),
            notes: None,
            signature: fake_signature_value("seed"),
            timestamp: "2026-01-01T00:00:00Z".to_string(),
        };
        assert!(sig.looks_well_formed());
    }

    #[test]
    fn record_checksum_matches_detects_mismatch() {
        let record = Record {
            header: RecordHeader {
                version: "1.0".to_string(),
                kind: RecordKind::Task,
                payload_checksum: "deadbeef".to_string(),
                signatures: vec![],
            },
            payload: serde_json::json!({"title": "x"}),
        };
        assert!(!record.checksum_matches());
    }
}
