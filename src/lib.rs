//! gitgov-sync-engine: a Git-backed synchronization engine for governance
//! state held under a project's `.gitgov/` directory.
//!
//! This crate is the core sync engine only. It does not parse CLI arguments,
//! format output, sign records, lint records, or rebuild derived indexes —
//! those are external collaborators, consumed through the traits in
//! [`ports`]. Callers construct a [`SyncEngine`] from concrete
//! implementations of those traits (this crate ships [`git::CliGit`] and
//! [`config::JsonConfig`]; Identity/Lint/Indexer implementations are always
//! supplied by the caller).
//!
//! See `SPEC_FULL.md` and `DESIGN.md` in the repository root for the full
//! specification and grounding ledger.

pub mod config;
pub mod delta;
pub mod engine;
pub mod error;
pub mod git;
pub mod ports;
pub mod record;
pub mod scheduler;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod whitelist;

pub use engine::SyncEngine;
pub use error::SyncError;
