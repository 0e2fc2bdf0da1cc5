//! The sync engine (spec.md §2/§4): a thin facade over the five pipelines,
//! constructed from the ports the caller supplies.

pub mod audit;
pub mod bootstrap;
pub mod preserve;
pub mod pull;
pub mod push;
pub mod resolve;
pub mod state_branch;

use std::path::PathBuf;
use std::sync::Arc;

use crate::error::SyncError;
use crate::ports::{Config, Git, Identity, Indexer, Lint};

pub use audit::{AuditOptions, AuditScope, AuditStateReport};
pub use bootstrap::BootstrapResult;
pub use pull::{PullStateOptions, SyncPullResult};
pub use push::{ImplicitPullInfo, PushStateOptions, SyncPushResult};
pub use resolve::{ResolveOptions, SyncResolveResult};

/// Owns the caller-supplied ports for one repository and dispatches to the
/// pipelines in this module. Cheap to construct; holds `Arc<dyn Trait>` so
/// it (and [`crate::scheduler::PullScheduler`], which needs the same
/// handles on its own thread) can be cloned freely.
#[derive(Clone)]
pub struct SyncEngine {
    git: Arc<dyn Git>,
    config: Arc<dyn Config>,
    identity: Arc<dyn Identity>,
    lint: Arc<dyn Lint>,
    indexer: Arc<dyn Indexer>,
    gitgov_dir: PathBuf,
}

impl SyncEngine {
    pub fn new(
        git: Arc<dyn Git>,
        config: Arc<dyn Config>,
        identity: Arc<dyn Identity>,
        lint: Arc<dyn Lint>,
        indexer: Arc<dyn Indexer>,
        gitgov_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            git,
            config,
            identity,
            lint,
            indexer,
            gitgov_dir: gitgov_dir.into(),
        }
    }

    pub fn git(&self) -> &Arc<dyn Git> {
        &self.git
    }

    pub fn config(&self) -> &Arc<dyn Config> {
        &self.config
    }

    pub fn indexer(&self) -> &Arc<dyn Indexer> {
        &self.indexer
    }

    pub fn gitgov_dir(&self) -> &std::path::Path {
        &self.gitgov_dir
    }

    pub fn push_state(&self, options: PushStateOptions) -> Result<SyncPushResult, SyncError> {
        push::push_state(
            self.git.as_ref(),
            self.config.as_ref(),
            self.lint.as_ref(),
            self.indexer.as_ref(),
            &self.gitgov_dir,
            options,
        )
    }

    pub fn pull_state(&self, options: PullStateOptions) -> Result<SyncPullResult, SyncError> {
        pull::pull_state(
            self.git.as_ref(),
            self.config.as_ref(),
            self.indexer.as_ref(),
            &self.gitgov_dir,
            options,
        )
    }

    pub fn resolve_conflict(&self, options: ResolveOptions) -> Result<SyncResolveResult, SyncError> {
        resolve::resolve_conflict(
            self.git.as_ref(),
            self.identity.as_ref(),
            self.indexer.as_ref(),
            &self.gitgov_dir,
            options,
        )
    }

    pub fn audit_state(&self, options: &AuditOptions) -> AuditStateReport {
        let state_branch = state_branch::get_state_branch_name(self.config.as_ref());
        audit::audit_state(self.git.as_ref(), self.lint.as_ref(), &state_branch, options)
    }

    pub fn bootstrap_from_state_branch(&self) -> BootstrapResult {
        let state_branch = state_branch::get_state_branch_name(self.config.as_ref());
        bootstrap::bootstrap_from_state_branch(self.git.as_ref(), &state_branch)
    }

    /// A [`crate::scheduler::PullScheduler`] sharing this engine's `Git`,
    /// `Config`, and `Indexer` handles.
    pub fn pull_scheduler(&self) -> crate::scheduler::PullScheduler {
        crate::scheduler::PullScheduler::new(
            Arc::clone(&self.git),
            Arc::clone(&self.config),
            Arc::clone(&self.indexer),
            self.gitgov_dir.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeConfig, FakeGitBuilder, FakeIdentity, FakeIndexer, FakeLint};

    fn engine_with(git: crate::testing::FakeGit) -> SyncEngine {
        SyncEngine::new(
            Arc::new(git),
            Arc::new(FakeConfig::new(Default::default(), Default::default())),
            Arc::new(FakeIdentity::new("human:alice", "resolver")),
            Arc::new(FakeLint::clean()),
            Arc::new(FakeIndexer::succeeding()),
            "/tmp/does-not-exist/.gitgov",
        )
    }

    #[test]
    fn push_from_state_branch_is_a_hard_error() {
        let engine = engine_with(
            FakeGitBuilder::new()
                .with_current_branch("gitgov-state")
                .build(),
        );
        let err = engine
            .push_state(PushStateOptions {
                source_branch: None,
                actor_id: "human:alice".to_string(),
                dry_run: false,
                force: false,
            })
            .unwrap_err();
        assert!(matches!(err, SyncError::PushFromStateBranch { .. }));
    }

    #[test]
    fn bootstrap_reports_missing_state_branch() {
        let engine = engine_with(FakeGitBuilder::new().build());
        let result = engine.bootstrap_from_state_branch();
        assert!(!result.success);
    }
}
