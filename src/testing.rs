//! In-memory test doubles for the ports this crate never implements in
//! production (`Identity`, `Lint`, `Indexer`) plus a scriptable `Git` fake
//! for unit tests that don't need a real repository.
//!
//! Grounded on the config-driven fake-responder pattern visible in
//! `examples/rxfork-worktrunk/tests/helpers/mock-stub`. Gated behind the
//! `testing` feature (enabled automatically for `cargo test` via the
//! self-dependency trick in `Cargo.toml`) so these never ship to callers.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::git::error::GitError;
use crate::ports::config::{Config as ConfigPort, ProjectConfig, SessionState};
use crate::ports::{Actor, CommitInfo, Git, Identity, IndexResult, Indexer, Lint, LintOptions, LintReport, LintSummary, NameStatusEntry, PullRebaseOutcome};
use crate::record::{payload_checksum, Record, Signature};

/// Appended to a branch's fake HEAD hash once [`FakeGit::pull_rebase`] has
/// returned [`PullRebaseOutcome::Completed`] at least once, so tests can
/// script "the pull actually advanced HEAD" without a real repository.
const POST_PULL_SUFFIX: &str = "-post-pull";

/// A scriptable, in-memory [`Git`] double.
///
/// Everything is a plain `HashMap`/`Vec` behind `RefCell`; construct one via
/// [`FakeGitBuilder`] instead of filling the fields directly.
pub struct FakeGit {
    current_branch: RefCell<Option<String>>,
    local_branches: RefCell<HashSet<String>>,
    remote_branches: RefCell<HashSet<String>>,
    remote_configured: bool,
    commit_history: RefCell<HashMap<String, Vec<CommitInfo>>>,
    staged_files: RefCell<Vec<String>>,
    conflicted_files: RefCell<Vec<String>>,
    rebase_in_progress: RefCell<bool>,
    stash_depth: RefCell<usize>,
    has_uncommitted: RefCell<bool>,
    pull_outcome: RefCell<PullRebaseOutcome>,
    commits_made: RefCell<Vec<String>>,
    changed_files: RefCell<Vec<NameStatusEntry>>,
    head_advanced: RefCell<bool>,
}

impl FakeGit {
    pub fn commits_made(&self) -> Vec<String> {
        self.commits_made.borrow().clone()
    }

    pub fn set_staged_files(&self, files: Vec<String>) {
        *self.staged_files.borrow_mut() = files;
    }

    pub fn set_rebase_in_progress(&self, value: bool) {
        *self.rebase_in_progress.borrow_mut() = value;
    }
}

pub struct FakeGitBuilder {
    current_branch: Option<String>,
    local_branches: HashSet<String>,
    remote_branches: HashSet<String>,
    remote_configured: bool,
    commit_history: HashMap<String, Vec<CommitInfo>>,
    staged_files: Vec<String>,
    conflicted_files: Vec<String>,
    rebase_in_progress: bool,
    pull_outcome: PullRebaseOutcome,
    changed_files: Vec<NameStatusEntry>,
}

impl FakeGitBuilder {
    pub fn new() -> Self {
        Self {
            current_branch: Some("main".to_string()),
            local_branches: HashSet::from(["main".to_string()]),
            remote_branches: HashSet::new(),
            remote_configured: true,
            commit_history: HashMap::new(),
            staged_files: Vec::new(),
            conflicted_files: Vec::new(),
            rebase_in_progress: false,
            pull_outcome: PullRebaseOutcome::UpToDate,
            changed_files: Vec::new(),
        }
    }

    pub fn with_current_branch(mut self, branch: &str) -> Self {
        self.current_branch = Some(branch.to_string());
        self.local_branches.insert(branch.to_string());
        self
    }

    pub fn with_local_branch(mut self, branch: &str) -> Self {
        self.local_branches.insert(branch.to_string());
        self
    }

    pub fn with_remote_branch(mut self, branch: &str) -> Self {
        self.remote_branches.insert(branch.to_string());
        self
    }

    pub fn without_remote(mut self) -> Self {
        self.remote_configured = false;
        self
    }

    pub fn with_commit_history(mut self, branch: &str, history: Vec<CommitInfo>) -> Self {
        self.commit_history.insert(branch.to_string(), history);
        self
    }

    pub fn with_staged_files(mut self, files: Vec<String>) -> Self {
        self.staged_files = files;
        self
    }

    pub fn with_pull_outcome(mut self, outcome: PullRebaseOutcome) -> Self {
        self.pull_outcome = outcome;
        self
    }

    /// The `.gitgov/`-scoped entries [`FakeGit::get_changed_files`] reports,
    /// regardless of which two refs are actually asked about (this double
    /// doesn't model branch history, only a single scripted delta).
    pub fn with_changed_files(mut self, files: Vec<NameStatusEntry>) -> Self {
        self.changed_files = files;
        self
    }

    pub fn build(self) -> FakeGit {
        FakeGit {
            current_branch: RefCell::new(self.current_branch),
            local_branches: RefCell::new(self.local_branches),
            remote_branches: RefCell::new(self.remote_branches),
            remote_configured: self.remote_configured,
            commit_history: RefCell::new(self.commit_history),
            staged_files: RefCell::new(self.staged_files),
            conflicted_files: RefCell::new(self.conflicted_files),
            rebase_in_progress: RefCell::new(self.rebase_in_progress),
            stash_depth: RefCell::new(0),
            has_uncommitted: RefCell::new(false),
            pull_outcome: RefCell::new(self.pull_outcome),
            commits_made: RefCell::new(Vec::new()),
            changed_files: RefCell::new(self.changed_files),
            head_advanced: RefCell::new(false),
        }
    }
}

impl Git for FakeGit {
    fn repo_root(&self) -> Result<std::path::PathBuf, GitError> {
        Ok(std::path::PathBuf::from("/fake/repo"))
    }

    fn current_branch(&self) -> Result<Option<String>, GitError> {
        Ok(self.current_branch.borrow().clone())
    }

    fn branch_exists(&self, branch: &str) -> Result<bool, GitError> {
        Ok(self.local_branch_exists(branch)?
            || (self.remote_configured && self.remote_branches.borrow().contains(branch)))
    }

    fn local_branch_exists(&self, branch: &str) -> Result<bool, GitError> {
        Ok(self.local_branches.borrow().contains(branch))
    }

    fn remote_branch_exists(&self, _remote: &str, branch: &str) -> Result<bool, GitError> {
        Ok(self.remote_configured && self.remote_branches.borrow().contains(branch))
    }

    fn is_remote_configured(&self, _remote: &str) -> Result<bool, GitError> {
        Ok(self.remote_configured)
    }

    fn has_commits(&self, branch: &str) -> Result<bool, GitError> {
        Ok(self.local_branches.borrow().contains(branch))
    }

    fn checkout_orphan_branch(&self, branch: &str) -> Result<(), GitError> {
        self.local_branches.borrow_mut().insert(branch.to_string());
        *self.current_branch.borrow_mut() = Some(branch.to_string());
        Ok(())
    }

    fn checkout_branch(&self, branch: &str) -> Result<(), GitError> {
        if !self.local_branches.borrow().contains(branch) {
            return Err(GitError::CommandFailed(format!("no such branch: {branch}")));
        }
        *self.current_branch.borrow_mut() = Some(branch.to_string());
        Ok(())
    }

    fn checkout_branch_force(&self, branch: &str) -> Result<(), GitError> {
        self.checkout_branch(branch)
    }

    fn create_tracking_branch(&self, branch: &str, _remote: &str) -> Result<(), GitError> {
        self.local_branches.borrow_mut().insert(branch.to_string());
        Ok(())
    }

    fn checkout_files_from_branch(&self, _branch: &str, _path: &str) -> Result<(), GitError> {
        Ok(())
    }

    fn list_remote_branches(&self, _remote: &str) -> Result<Vec<String>, GitError> {
        Ok(self.remote_branches.borrow().iter().cloned().collect())
    }

    fn fetch(&self, _remote: &str) -> Result<(), GitError> {
        if self.remote_configured {
            Ok(())
        } else {
            Err(GitError::CommandFailed("could not read from remote repository".to_string()))
        }
    }

    fn fetch_branch(&self, _remote: &str, _branch: &str) -> Result<(), GitError> {
        Ok(())
    }

    fn pull_rebase(&self, _remote: &str, _branch: &str) -> Result<PullRebaseOutcome, GitError> {
        let outcome = self.pull_outcome.borrow().clone();
        if outcome == PullRebaseOutcome::Completed {
            *self.head_advanced.borrow_mut() = true;
        }
        Ok(outcome)
    }

    fn push(&self, _remote: &str, _branch: &str) -> Result<(), GitError> {
        Ok(())
    }

    fn push_with_upstream(&self, _remote: &str, _branch: &str) -> Result<(), GitError> {
        if !self.remote_configured {
            return Err(GitError::CommandFailed("could not read from remote repository".to_string()));
        }
        Ok(())
    }

    fn set_upstream(&self, _branch: &str, _remote: &str, _remote_branch: &str) -> Result<(), GitError> {
        Ok(())
    }

    fn get_branch_remote(&self, _branch: &str) -> Result<Option<String>, GitError> {
        Ok(self.remote_configured.then(|| "origin".to_string()))
    }

    fn get_commit_history(&self, branch: &str, max_count: usize) -> Result<Vec<CommitInfo>, GitError> {
        let history = self.commit_history.borrow();
        Ok(history
            .get(branch)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .take(max_count)
            .collect())
    }

    fn get_changed_files(
        &self,
        _ref_a: &str,
        _ref_b: &str,
        _path_filter: Option<&str>,
    ) -> Result<Vec<NameStatusEntry>, GitError> {
        Ok(self.changed_files.borrow().clone())
    }

    fn head_commit(&self, branch: &str) -> Result<String, GitError> {
        if *self.head_advanced.borrow() {
            Ok(format!("fake-head-{branch}{POST_PULL_SUFFIX}"))
        } else {
            Ok(format!("fake-head-{branch}"))
        }
    }

    fn add(&self, _paths: &[&Path], _force: bool) -> Result<(), GitError> {
        Ok(())
    }

    fn rm(&self, _path: &Path, _force: bool) -> Result<(), GitError> {
        Ok(())
    }

    fn commit(&self, message: &str) -> Result<String, GitError> {
        self.commits_made.borrow_mut().push(message.to_string());
        Ok(format!("commit-{}", self.commits_made.borrow().len()))
    }

    fn commit_allow_empty(&self, message: &str) -> Result<String, GitError> {
        self.commit(message)
    }

    fn reset_mixed(&self, _path: &str) -> Result<(), GitError> {
        Ok(())
    }

    fn has_uncommitted_changes(&self) -> Result<bool, GitError> {
        Ok(*self.has_uncommitted.borrow())
    }

    fn has_staged_or_modified_changes(&self) -> Result<bool, GitError> {
        Ok(!self.staged_files.borrow().is_empty())
    }

    fn stash(&self, _message: &str) -> Result<Option<String>, GitError> {
        if *self.has_uncommitted.borrow() {
            *self.stash_depth.borrow_mut() += 1;
            *self.has_uncommitted.borrow_mut() = false;
            Ok(Some(format!("stash@{{{}}}", *self.stash_depth.borrow() - 1)))
        } else {
            Ok(None)
        }
    }

    fn stash_pop(&self) -> Result<(), GitError> {
        let mut depth = self.stash_depth.borrow_mut();
        if *depth == 0 {
            return Err(GitError::CommandFailed("no stash entries found".to_string()));
        }
        *depth -= 1;
        Ok(())
    }

    fn is_rebase_in_progress(&self) -> Result<bool, GitError> {
        Ok(*self.rebase_in_progress.borrow())
    }

    fn rebase_continue(&self) -> Result<(), GitError> {
        *self.rebase_in_progress.borrow_mut() = false;
        Ok(())
    }

    fn rebase_abort(&self) -> Result<(), GitError> {
        *self.rebase_in_progress.borrow_mut() = false;
        self.conflicted_files.borrow_mut().clear();
        Ok(())
    }

    fn get_conflicted_files(&self) -> Result<Vec<String>, GitError> {
        Ok(self.conflicted_files.borrow().clone())
    }

    fn get_staged_files(&self) -> Result<Vec<String>, GitError> {
        Ok(self.staged_files.borrow().clone())
    }

    fn ls_tree_dir_exists(&self, _branch: &str, _path: &str) -> Result<bool, GitError> {
        Ok(false)
    }

    fn list_tree_files(&self, _branch: &str, _path: &str) -> Result<Vec<String>, GitError> {
        Ok(Vec::new())
    }

    fn set_config(&self, _key: &str, _value: &str) -> Result<(), GitError> {
        Ok(())
    }
}

/// An [`Identity`] double that mints deterministic, well-formed-looking
/// signatures without any real cryptography.
pub struct FakeIdentity {
    actor: Actor,
}

impl FakeIdentity {
    pub fn new(actor_id: &str, role: &str) -> Self {
        Self {
            actor: Actor {
                id: actor_id.to_string(),
                role: role.to_string(),
            },
        }
    }
}

impl Identity for FakeIdentity {
    fn get_current_actor(&self) -> Result<Actor, crate::error::SyncError> {
        Ok(self.actor.clone())
    }

    fn sign_record(&self, mut record: Record, actor_id: &str, role: &str) -> Result<Record, crate::error::SyncError> {
        record.header.payload_checksum = payload_checksum(&record.payload);
        record.header.signatures.push(Signature {
            key_id: actor_id.to_string(),
            role: role.to_string(),
            notes: None,
            signature: crate::record::fake_signature_value(&format!("{actor_id}:{role}:{}", record.header.signatures.len())),
            timestamp: "2026-01-01T00:00:00Z".to_string(),
        });
        Ok(record)
    }
}

/// A [`Lint`] double with a configurable error/warning count.
pub struct FakeLint {
    summary: LintSummary,
}

impl FakeLint {
    pub fn clean() -> Self {
        Self {
            summary: LintSummary {
                errors: 0,
                warnings: 0,
                files_checked: 0,
                fixable: 0,
                execution_time_ms: 0,
            },
        }
    }

    pub fn with_errors(errors: usize) -> Self {
        Self {
            summary: LintSummary {
                errors,
                warnings: 0,
                files_checked: 0,
                fixable: 0,
                execution_time_ms: 0,
            },
        }
    }
}

impl Lint for FakeLint {
    fn lint(&self, _options: LintOptions) -> LintReport {
        LintReport {
            summary: self.summary.clone(),
            results: Vec::new(),
            metadata: serde_json::Value::Null,
        }
    }
}

/// An [`Indexer`] double that records how many times it was invoked.
pub struct FakeIndexer {
    succeed: bool,
    calls: RefCell<usize>,
}

impl FakeIndexer {
    pub fn succeeding() -> Self {
        Self {
            succeed: true,
            calls: RefCell::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            succeed: false,
            calls: RefCell::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        *self.calls.borrow()
    }
}

impl Indexer for FakeIndexer {
    fn generate_index(&self) -> IndexResult {
        *self.calls.borrow_mut() += 1;
        IndexResult {
            success: self.succeed,
            error: (!self.succeed).then(|| "fake indexer failure".to_string()),
        }
    }
}

/// A [`Config`](ConfigPort) double backed by in-memory values.
pub struct FakeConfig {
    project: ProjectConfig,
    session: SessionState,
}

impl FakeConfig {
    pub fn new(project: ProjectConfig, session: SessionState) -> Self {
        Self { project, session }
    }
}

impl ConfigPort for FakeConfig {
    fn load_project(&self) -> ProjectConfig {
        self.project.clone()
    }

    fn load_session(&self) -> SessionState {
        self.session.clone()
    }
}
