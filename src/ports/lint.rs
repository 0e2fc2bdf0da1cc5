use serde::{Deserialize, Serialize};

/// Options passed to the lint subsystem by [`crate::engine::audit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LintOptions {
    pub validate_checksums: bool,
    pub validate_signatures: bool,
    pub validate_references: bool,
    pub concurrent: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LintSummary {
    pub errors: usize,
    pub warnings: usize,
    #[serde(rename = "filesChecked")]
    pub files_checked: usize,
    pub fixable: usize,
    #[serde(rename = "executionTime")]
    pub execution_time_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LintResultEntry {
    pub file: String,
    pub severity: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LintReport {
    pub summary: LintSummary,
    #[serde(default)]
    pub results: Vec<LintResultEntry>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Record validation (signatures, checksums, schema), a black-box port per
/// spec.md §1 — never implemented in this crate.
pub trait Lint: Send + Sync {
    fn lint(&self, options: LintOptions) -> LintReport;
}
