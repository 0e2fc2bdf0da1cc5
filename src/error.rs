//! The [`SyncError`] hard-failure taxonomy exported to callers (spec.md §6/§7).
//!
//! These are programmer/workflow violations the caller MUST surface
//! directly, never soft outcomes. Rebase conflicts and integrity violations
//! are modeled as result fields elsewhere (`conflict_detected`/
//! `conflict_info` on the push/pull results; see [`crate::engine::push`] and
//! [`crate::engine::pull`]), not as variants here.

use std::fmt;

use crate::git::error::GitError;
use crate::record::IntegrityViolation;

#[derive(Debug)]
pub enum SyncError {
    /// `pushState` was called while `sourceBranch == stateBranch`.
    PushFromStateBranch { branch: String },
    /// Audit found rebase commits not immediately followed by a resolution
    /// commit.
    IntegrityViolation { violations: Vec<IntegrityViolation> },
    /// `resolveConflict` found unresolved conflict markers in staged files.
    ConflictMarkersPresent { files: Vec<String> },
    /// `resolveConflict` was called with no rebase in progress.
    NoRebaseInProgress,
    /// `pullState` found staged/modified (non-untracked) changes on the
    /// state branch before pulling.
    UncommittedChanges { branch: String },
    /// `ensureStateBranch` could not reconcile local/remote state.
    StateBranchSetup {
        reason: String,
        cause: Option<Box<GitError>>,
    },
    /// The caller's Identity port requires a cryptography backend that
    /// isn't available for the requested operation.
    CryptoModuleRequired { operation: String },
    /// The actor resolved by the Identity port does not match the actor id
    /// the caller supplied.
    ActorIdentityMismatch,
    /// A Git port failure that doesn't fit a more specific variant above.
    Git(GitError),
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::PushFromStateBranch { branch } => {
                write!(f, "cannot push from the state branch ({branch}); switch to a working branch first")
            }
            SyncError::IntegrityViolation { violations } => {
                write!(
                    f,
                    "state branch failed integrity audit: {} rebase commit(s) without a matching resolution commit",
                    violations.len()
                )
            }
            SyncError::ConflictMarkersPresent { files } => {
                write!(
                    f,
                    "conflict markers still present in staged file(s): {}",
                    files.join(", ")
                )
            }
            SyncError::NoRebaseInProgress => {
                write!(f, "no rebase is in progress; nothing to resolve")
            }
            SyncError::UncommittedChanges { branch } => {
                write!(f, "state branch ({branch}) has uncommitted staged or modified changes")
            }
            SyncError::StateBranchSetup { reason, cause } => {
                write!(f, "failed to set up the state branch: {reason}")?;
                if let Some(cause) = cause {
                    write!(f, " (caused by: {cause})")?;
                }
                Ok(())
            }
            SyncError::CryptoModuleRequired { operation } => {
                write!(f, "{operation} requires a cryptography backend that is not available")
            }
            SyncError::ActorIdentityMismatch => {
                write!(f, "resolved actor does not match the requested actor id")
            }
            SyncError::Git(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncError::StateBranchSetup { cause: Some(cause), .. } => Some(cause.as_ref()),
            SyncError::Git(err) => Some(err),
            _ => None,
        }
    }
}

impl From<GitError> for SyncError {
    fn from(err: GitError) -> Self {
        SyncError::Git(err)
    }
}
