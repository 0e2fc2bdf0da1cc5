use std::path::Path;

use crate::git::error::GitError;

/// A single line of `git diff --name-status` output, already split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameStatusEntry {
    pub status: char,
    pub path: String,
}

/// The git primitives the sync engine needs.
///
/// Method names are the `snake_case` translation of the camelCase list in
/// spec.md §6 (`getStateBranchName` -> n/a, `pullRebase` -> `pull_rebase`,
/// etc). Implementations talk to a single repository; which one is fixed at
/// construction time (see [`crate::git::CliGit::at`]).
pub trait Git: Send + Sync {
    fn repo_root(&self) -> Result<std::path::PathBuf, GitError>;
    fn current_branch(&self) -> Result<Option<String>, GitError>;
    fn branch_exists(&self, branch: &str) -> Result<bool, GitError>;
    fn local_branch_exists(&self, branch: &str) -> Result<bool, GitError>;
    fn remote_branch_exists(&self, remote: &str, branch: &str) -> Result<bool, GitError>;
    fn is_remote_configured(&self, remote: &str) -> Result<bool, GitError>;
    fn has_commits(&self, branch: &str) -> Result<bool, GitError>;

    /// `git checkout -b <branch> --orphan`, followed by clearing the index.
    fn checkout_orphan_branch(&self, branch: &str) -> Result<(), GitError>;
    fn checkout_branch(&self, branch: &str) -> Result<(), GitError>;
    /// `git checkout -f <branch>` — used when an ordinary checkout is blocked
    /// by untracked files that would be overwritten.
    fn checkout_branch_force(&self, branch: &str) -> Result<(), GitError>;
    fn create_tracking_branch(&self, branch: &str, remote: &str) -> Result<(), GitError>;
    /// `git checkout <branch> -- <path>`, tolerating a missing path.
    fn checkout_files_from_branch(&self, branch: &str, path: &str) -> Result<(), GitError>;

    fn list_remote_branches(&self, remote: &str) -> Result<Vec<String>, GitError>;
    fn fetch(&self, remote: &str) -> Result<(), GitError>;
    fn fetch_branch(&self, remote: &str, branch: &str) -> Result<(), GitError>;
    fn pull_rebase(&self, remote: &str, branch: &str) -> Result<PullRebaseOutcome, GitError>;
    fn push(&self, remote: &str, branch: &str) -> Result<(), GitError>;
    fn push_with_upstream(&self, remote: &str, branch: &str) -> Result<(), GitError>;
    fn set_upstream(&self, branch: &str, remote: &str, remote_branch: &str) -> Result<(), GitError>;
    fn get_branch_remote(&self, branch: &str) -> Result<Option<String>, GitError>;

    fn get_commit_history(&self, branch: &str, max_count: usize) -> Result<Vec<CommitInfo>, GitError>;
    fn get_changed_files(
        &self,
        ref_a: &str,
        ref_b: &str,
        path_filter: Option<&str>,
    ) -> Result<Vec<NameStatusEntry>, GitError>;
    fn head_commit(&self, branch: &str) -> Result<String, GitError>;

    fn add(&self, paths: &[&Path], force: bool) -> Result<(), GitError>;
    /// `git rm --ignore-unmatch <path>` — tolerates a path that was never
    /// tracked (the whitelist sweep walks the physical tree, which on a
    /// fresh state branch includes files git has never seen).
    fn rm(&self, path: &Path, force: bool) -> Result<(), GitError>;
    fn commit(&self, message: &str) -> Result<String, GitError>;
    fn commit_allow_empty(&self, message: &str) -> Result<String, GitError>;
    fn reset_mixed(&self, path: &str) -> Result<(), GitError>;

    fn has_uncommitted_changes(&self) -> Result<bool, GitError>;
    fn has_staged_or_modified_changes(&self) -> Result<bool, GitError>;
    fn stash(&self, message: &str) -> Result<Option<String>, GitError>;
    fn stash_pop(&self) -> Result<(), GitError>;

    fn is_rebase_in_progress(&self) -> Result<bool, GitError>;
    fn rebase_continue(&self) -> Result<(), GitError>;
    fn rebase_abort(&self) -> Result<(), GitError>;
    fn get_conflicted_files(&self) -> Result<Vec<String>, GitError>;
    fn get_staged_files(&self) -> Result<Vec<String>, GitError>;

    /// `git ls-tree -d <branch> <path>` — used to detect "first push" (the
    /// state branch has never held a `.gitgov/` tree).
    fn ls_tree_dir_exists(&self, branch: &str, path: &str) -> Result<bool, GitError>;
    /// `git ls-tree -r --name-only <branch> -- <path>` — full file listing
    /// under `path` at `branch`, used when publishing from a source branch
    /// whose `.gitgov/` isn't present on disk (push has no captured temp
    /// directory to read from).
    fn list_tree_files(&self, branch: &str, path: &str) -> Result<Vec<String>, GitError>;

    fn set_config(&self, key: &str, value: &str) -> Result<(), GitError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    pub hash: String,
    pub message: String,
    pub author: String,
    pub timestamp: i64,
}

/// Outcome of an attempted `pull --rebase`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullRebaseOutcome {
    /// Already at the tip of the remote; nothing changed.
    UpToDate,
    /// The rebase completed and `HEAD` may have advanced.
    Completed,
    /// The rebase stopped with conflicted paths; still in progress on disk.
    Conflicted { conflicted_files: Vec<String> },
}
