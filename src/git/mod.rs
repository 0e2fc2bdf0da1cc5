//! The one production [`crate::ports::Git`] adapter: shells out to the real
//! `git` binary, grounded on `examples/prateek-w/src/git.rs`'s `Repository`.

pub mod conflict;
pub mod error;

use std::path::{Path, PathBuf};
use std::process::Command;

use error::GitError;

use crate::ports::git::{CommitInfo, Git, NameStatusEntry, PullRebaseOutcome};

/// Repository context for git operations, bound to a single working tree.
#[derive(Debug, Clone)]
pub struct CliGit {
    path: PathBuf,
}

impl CliGit {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn current() -> Self {
        Self::at(".")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run a git command in this repository's context, returning stdout.
    fn run(&self, args: &[&str]) -> Result<String, GitError> {
        log::debug!("$ git {} [{}]", args.join(" "), self.path.display());

        let output = Command::new("git")
            .args(args)
            .current_dir(&self.path)
            .output()
            .map_err(GitError::Io)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            return Err(GitError::CommandFailed(stderr));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Like [`Self::run`], but returns the raw exit status and both streams
    /// instead of erroring on non-zero, for commands (`pull --rebase`,
    /// `rebase --continue`) whose failure mode needs inspection rather than
    /// a bare `Err`.
    fn run_raw(&self, args: &[&str]) -> Result<(bool, String, String), GitError> {
        log::debug!("$ git {} [{}]", args.join(" "), self.path.display());

        let output = Command::new("git")
            .args(args)
            .current_dir(&self.path)
            .output()
            .map_err(GitError::Io)?;

        Ok((
            output.status.success(),
            String::from_utf8_lossy(&output.stdout).to_string(),
            String::from_utf8_lossy(&output.stderr).to_string(),
        ))
    }
}

impl Git for CliGit {
    fn repo_root(&self) -> Result<PathBuf, GitError> {
        let stdout = self.run(&["rev-parse", "--show-toplevel"])?;
        Ok(PathBuf::from(stdout.trim()))
    }

    fn current_branch(&self) -> Result<Option<String>, GitError> {
        let stdout = self.run(&["branch", "--show-current"])?;
        let branch = stdout.trim();
        Ok((!branch.is_empty()).then(|| branch.to_string()))
    }

    fn branch_exists(&self, branch: &str) -> Result<bool, GitError> {
        if self.local_branch_exists(branch)? {
            return Ok(true);
        }
        self.run(&["rev-parse", "--verify", &format!("refs/remotes/origin/{branch}")])
            .map(|_| true)
            .or(Ok(false))
    }

    fn local_branch_exists(&self, branch: &str) -> Result<bool, GitError> {
        Ok(self
            .run(&["rev-parse", "--verify", &format!("refs/heads/{branch}")])
            .is_ok())
    }

    fn remote_branch_exists(&self, remote: &str, branch: &str) -> Result<bool, GitError> {
        Ok(self
            .run(&["rev-parse", "--verify", &format!("refs/remotes/{remote}/{branch}")])
            .is_ok())
    }

    fn is_remote_configured(&self, remote: &str) -> Result<bool, GitError> {
        let stdout = self.run(&["remote"])?;
        Ok(stdout.lines().any(|line| line.trim() == remote))
    }

    fn has_commits(&self, branch: &str) -> Result<bool, GitError> {
        Ok(self.run(&["rev-parse", "--verify", branch]).is_ok())
    }

    fn checkout_orphan_branch(&self, branch: &str) -> Result<(), GitError> {
        self.run(&["checkout", "--orphan", branch])?;
        // `--orphan` keeps the index/working tree as-is; clear it so the new
        // branch starts genuinely empty (spec.md §4.1, no-local/no-remote row).
        self.run(&["rm", "-rf", "--cached", "."]).ok();
        Ok(())
    }

    fn checkout_branch(&self, branch: &str) -> Result<(), GitError> {
        self.run(&["checkout", branch])?;
        Ok(())
    }

    fn checkout_branch_force(&self, branch: &str) -> Result<(), GitError> {
        self.run(&["checkout", "-f", branch])?;
        Ok(())
    }

    fn create_tracking_branch(&self, branch: &str, remote: &str) -> Result<(), GitError> {
        self.run(&["checkout", "-b", branch, "--track", &format!("{remote}/{branch}")])?;
        Ok(())
    }

    fn checkout_files_from_branch(&self, branch: &str, path: &str) -> Result<(), GitError> {
        match self.run(&["checkout", branch, "--", path]) {
            Ok(_) => Ok(()),
            Err(err) if err.message().contains("did not match any file") => Ok(()),
            Err(err) => Err(err),
        }
    }

    fn list_remote_branches(&self, remote: &str) -> Result<Vec<String>, GitError> {
        let stdout = self.run(&["ls-remote", "--heads", remote])?;
        Ok(stdout
            .lines()
            .filter_map(|line| line.rsplit('\t').next())
            .filter_map(|r| r.strip_prefix("refs/heads/"))
            .map(str::to_string)
            .collect())
    }

    fn fetch(&self, remote: &str) -> Result<(), GitError> {
        self.run(&["fetch", remote])?;
        Ok(())
    }

    fn fetch_branch(&self, remote: &str, branch: &str) -> Result<(), GitError> {
        self.run(&["fetch", remote, branch])?;
        Ok(())
    }

    fn pull_rebase(&self, remote: &str, branch: &str) -> Result<PullRebaseOutcome, GitError> {
        let (ok, stdout, stderr) = self.run_raw(&["pull", "--rebase", remote, branch])?;
        if ok {
            if stdout.to_ascii_lowercase().contains("up to date") {
                return Ok(PullRebaseOutcome::UpToDate);
            }
            return Ok(PullRebaseOutcome::Completed);
        }

        let conflicted = self.get_conflicted_files().unwrap_or_default();
        if !conflicted.is_empty() {
            return Ok(PullRebaseOutcome::Conflicted {
                conflicted_files: conflicted,
            });
        }

        Err(GitError::CommandFailed(stderr))
    }

    fn push(&self, remote: &str, branch: &str) -> Result<(), GitError> {
        self.run(&["push", remote, branch])?;
        Ok(())
    }

    fn push_with_upstream(&self, remote: &str, branch: &str) -> Result<(), GitError> {
        self.run(&["push", "--set-upstream", remote, branch])?;
        Ok(())
    }

    fn set_upstream(&self, branch: &str, remote: &str, remote_branch: &str) -> Result<(), GitError> {
        self.run(&[
            "branch",
            &format!("--set-upstream-to={remote}/{remote_branch}"),
            branch,
        ])?;
        Ok(())
    }

    fn get_branch_remote(&self, branch: &str) -> Result<Option<String>, GitError> {
        let result = self.run(&["rev-parse", "--abbrev-ref", &format!("{branch}@{{u}}")]);
        match result {
            Ok(upstream) => Ok(upstream.trim().split('/').next().map(str::to_string)),
            Err(_) => Ok(None),
        }
    }

    fn get_commit_history(&self, branch: &str, max_count: usize) -> Result<Vec<CommitInfo>, GitError> {
        const SEP: &str = "\x1f";
        let format = format!("--format=%H{SEP}%s{SEP}%an{SEP}%ct");
        let max = format!("-{max_count}");
        let stdout = self.run(&["log", &max, &format, branch])?;
        stdout
            .lines()
            .filter(|line| !line.is_empty())
            .map(|line| {
                let mut parts = line.splitn(4, SEP);
                let hash = parts.next().unwrap_or_default().to_string();
                let message = parts.next().unwrap_or_default().to_string();
                let author = parts.next().unwrap_or_default().to_string();
                let timestamp = parts
                    .next()
                    .unwrap_or("0")
                    .parse()
                    .map_err(|e| GitError::ParseError(format!("bad commit timestamp: {e}")))?;
                Ok(CommitInfo {
                    hash,
                    message,
                    author,
                    timestamp,
                })
            })
            .collect()
    }

    fn get_changed_files(
        &self,
        ref_a: &str,
        ref_b: &str,
        path_filter: Option<&str>,
    ) -> Result<Vec<NameStatusEntry>, GitError> {
        let range = format!("{ref_a}..{ref_b}");
        let mut args = vec!["diff", "--name-status", &range];
        if let Some(path) = path_filter {
            args.push("--");
            args.push(path);
        }
        let stdout = self.run(&args)?;
        stdout
            .lines()
            .filter(|line| !line.is_empty())
            .map(|line| {
                let mut parts = line.splitn(2, '\t');
                let status = parts
                    .next()
                    .and_then(|s| s.chars().next())
                    .ok_or_else(|| GitError::ParseError(format!("bad name-status line: {line}")))?;
                let path = parts
                    .next()
                    .ok_or_else(|| GitError::ParseError(format!("bad name-status line: {line}")))?
                    .to_string();
                Ok(NameStatusEntry { status, path })
            })
            .collect()
    }

    fn head_commit(&self, branch: &str) -> Result<String, GitError> {
        let stdout = self.run(&["rev-parse", branch])?;
        Ok(stdout.trim().to_string())
    }

    fn add(&self, paths: &[&Path], force: bool) -> Result<(), GitError> {
        let mut args = vec!["add".to_string()];
        if force {
            args.push("--force".to_string());
        }
        for path in paths {
            args.push(path.display().to_string());
        }
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        self.run(&arg_refs)?;
        Ok(())
    }

    fn rm(&self, path: &Path, force: bool) -> Result<(), GitError> {
        let path_str = path.display().to_string();
        let mut args = vec!["rm", "--ignore-unmatch"];
        if force {
            args.push("-f");
        }
        args.push(&path_str);
        self.run(&args)?;
        Ok(())
    }

    fn commit(&self, message: &str) -> Result<String, GitError> {
        self.run(&["commit", "-m", message])?;
        self.head_commit("HEAD")
    }

    fn commit_allow_empty(&self, message: &str) -> Result<String, GitError> {
        self.run(&["commit", "--allow-empty", "-m", message])?;
        self.head_commit("HEAD")
    }

    fn reset_mixed(&self, path: &str) -> Result<(), GitError> {
        self.run(&["reset", "HEAD", "--", path])?;
        Ok(())
    }

    fn has_uncommitted_changes(&self) -> Result<bool, GitError> {
        let stdout = self.run(&["status", "--porcelain"])?;
        Ok(!stdout.trim().is_empty())
    }

    fn has_staged_or_modified_changes(&self) -> Result<bool, GitError> {
        let stdout = self.run(&["status", "--porcelain"])?;
        Ok(stdout
            .lines()
            .any(|line| !line.starts_with("??") && !line.trim().is_empty()))
    }

    fn stash(&self, message: &str) -> Result<Option<String>, GitError> {
        if !self.has_uncommitted_changes()? {
            return Ok(None);
        }
        self.run(&["stash", "push", "-m", message])?;
        let stdout = self.run(&["stash", "list", "--format=%gd %s"])?;
        Ok(stdout
            .lines()
            .find(|line| line.contains(message))
            .and_then(|line| line.split_whitespace().next())
            .map(str::to_string))
    }

    fn stash_pop(&self) -> Result<(), GitError> {
        self.run(&["stash", "pop"])?;
        Ok(())
    }

    fn is_rebase_in_progress(&self) -> Result<bool, GitError> {
        let git_dir = self.run(&["rev-parse", "--git-dir"])?;
        let git_dir = PathBuf::from(git_dir.trim());
        Ok(git_dir.join("rebase-merge").exists() || git_dir.join("rebase-apply").exists())
    }

    fn rebase_continue(&self) -> Result<(), GitError> {
        self.run(&["rebase", "--continue"])?;
        Ok(())
    }

    fn rebase_abort(&self) -> Result<(), GitError> {
        self.run(&["rebase", "--abort"])?;
        Ok(())
    }

    fn get_conflicted_files(&self) -> Result<Vec<String>, GitError> {
        let stdout = self.run(&["diff", "--name-only", "--diff-filter=U"])?;
        Ok(stdout.lines().map(str::to_string).collect())
    }

    fn get_staged_files(&self) -> Result<Vec<String>, GitError> {
        let stdout = self.run(&["diff", "--cached", "--name-only"])?;
        Ok(stdout.lines().map(str::to_string).collect())
    }

    fn ls_tree_dir_exists(&self, branch: &str, path: &str) -> Result<bool, GitError> {
        let stdout = self.run(&["ls-tree", "-d", branch, path])?;
        Ok(!stdout.trim().is_empty())
    }

    fn list_tree_files(&self, branch: &str, path: &str) -> Result<Vec<String>, GitError> {
        match self.run(&["ls-tree", "-r", "--name-only", branch, "--", path]) {
            Ok(stdout) => Ok(stdout.lines().map(str::to_string).collect()),
            Err(err) if err.message().contains("not a tree object") => Ok(Vec::new()),
            Err(err) => Err(err),
        }
    }

    fn set_config(&self, key: &str, value: &str) -> Result<(), GitError> {
        self.run(&["config", key, value])?;
        Ok(())
    }
}
