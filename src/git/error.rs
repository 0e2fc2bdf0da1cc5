//! Low-level Git-port failures, in the same manual-`Display` style as the
//! teacher's `GitError` (`examples/prateek-w/src/git.rs`).

use std::fmt;

#[derive(Debug)]
pub enum GitError {
    /// `git` exited non-zero; carries its stderr.
    CommandFailed(String),
    /// Output from a `git` command couldn't be parsed into the expected shape.
    ParseError(String),
    /// The configured path is not inside a Git working tree.
    NotAGitRepository(String),
    /// A command that requires a specific worktree state (e.g. `rebase
    /// --continue` with no rebase in progress) was issued out of turn.
    InvalidState(String),
    /// Spawning `git` itself failed (not found, permissions, etc).
    Io(std::io::Error),
}

impl fmt::Display for GitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GitError::CommandFailed(msg) => write!(f, "git command failed: {msg}"),
            GitError::ParseError(msg) => write!(f, "failed to parse git output: {msg}"),
            GitError::NotAGitRepository(path) => write!(f, "not a git repository: {path}"),
            GitError::InvalidState(msg) => write!(f, "invalid repository state: {msg}"),
            GitError::Io(err) => write!(f, "failed to run git: {err}"),
        }
    }
}

impl std::error::Error for GitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GitError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl GitError {
    /// Whether the failure looks like an unreachable remote, which several
    /// pipeline phases tolerate (spec.md §4.1/§4.3: "remote unreachable").
    pub fn looks_like_unreachable_remote(&self) -> bool {
        let msg = self.message().to_ascii_lowercase();
        msg.contains("could not resolve host")
            || msg.contains("could not read from remote")
            || msg.contains("connection timed out")
            || msg.contains("does not appear to be a git repository")
            || msg.contains("no route to host")
            || msg.contains("network is unreachable")
    }

    /// Whether the failure is git's "nothing to commit" (byte-identical
    /// staging), which push treats as success (spec.md §4.3 step 7).
    pub fn looks_like_nothing_to_commit(&self) -> bool {
        self.message().to_ascii_lowercase().contains("nothing to commit")
    }

    /// Whether the failure is git's "already up to date" for a pull/fetch.
    pub fn looks_like_up_to_date(&self) -> bool {
        let msg = self.message().to_ascii_lowercase();
        msg.contains("already up to date") || msg.contains("up-to-date")
    }

    pub fn message(&self) -> &str {
        match self {
            GitError::CommandFailed(msg) => msg,
            GitError::ParseError(msg) => msg,
            GitError::NotAGitRepository(msg) => msg,
            GitError::InvalidState(msg) => msg,
            GitError::Io(_) => "io error",
        }
    }
}
