#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexResult {
    pub success: bool,
    pub error: Option<String>,
}

/// Rebuilds derived caches (e.g. `.gitgov/index.json`) after state changes.
/// Failures here are always tolerated by the engine (logged, non-fatal) per
/// spec.md §4.4/§4.5.
pub trait Indexer: Send + Sync {
    fn generate_index(&self) -> IndexResult;
}
