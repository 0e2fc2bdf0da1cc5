//! External collaborators the sync engine consumes but does not implement.
//!
//! Every port is a plain trait. The engine is constructed from boxed trait
//! objects so callers can substitute fakes in tests without touching disk or
//! spawning `git`. Production code ships one real adapter for [`Git`]
//! ([`crate::git::CliGit`]) and one for [`Config`] ([`crate::config::JsonConfig`]);
//! `Identity`, `Lint`, and `Indexer` are always supplied by the caller.

pub mod config;
pub mod git;
mod identity;
mod indexer;
mod lint;

pub use config::Config;
pub use git::{CommitInfo, Git, NameStatusEntry, PullRebaseOutcome};
pub use identity::{Actor, Identity};
pub use indexer::{IndexResult, Indexer};
pub use lint::{Lint, LintOptions, LintReport, LintResultEntry, LintSummary};
