//! State-branch manager (spec.md §4.1): `getStateBranchName` /
//! `ensureStateBranch`, grounded on the branch-existence primitives in
//! `examples/prateek-w/src/git/repository/branches.rs`.

use crate::error::SyncError;
use crate::git::error::GitError;
use crate::ports::Git;

pub const ORIGIN: &str = "origin";

/// `getStateBranchName()` (spec.md §4.1).
pub fn get_state_branch_name(config: &dyn crate::ports::Config) -> String {
    crate::config::resolve_state_branch_name(config)
}

/// `ensureStateBranch()`: reconciles the 2x2 local/remote existence matrix
/// (spec.md §4.1), always attempting to return to the branch that was
/// checked out on entry.
pub fn ensure_state_branch(git: &dyn Git, state_branch: &str) -> Result<(), SyncError> {
    let original_branch = git.current_branch().map_err(SyncError::from)?;
    let remote_configured = git.is_remote_configured(ORIGIN).unwrap_or(false);

    if remote_configured {
        if let Err(err) = git.fetch(ORIGIN) {
            if !err.looks_like_unreachable_remote() {
                log::warn!("fetch {ORIGIN} failed while ensuring state branch: {err}");
            }
        }
    }

    let local_exists = git.local_branch_exists(state_branch).map_err(SyncError::from)?;
    let remote_exists =
        remote_configured && git.remote_branch_exists(ORIGIN, state_branch).unwrap_or(false);

    let result = reconcile(git, state_branch, local_exists, remote_exists, remote_configured, original_branch.as_deref());

    if let Some(branch) = &original_branch {
        match git.current_branch() {
            Ok(Some(current)) if &current == branch => {}
            _ => {
                if let Err(err) = git.checkout_branch(branch) {
                    log::warn!("failed to return to {branch} after ensuring state branch: {err}");
                }
            }
        }
    }

    result.map_err(|cause| SyncError::StateBranchSetup {
        reason: cause.to_string(),
        cause: Some(Box::new(cause)),
    })
}

fn reconcile(
    git: &dyn Git,
    state_branch: &str,
    local_exists: bool,
    remote_exists: bool,
    remote_configured: bool,
    original_branch: Option<&str>,
) -> Result<(), GitError> {
    match (local_exists, remote_exists) {
        (false, false) => create_fresh(git, state_branch, remote_configured, original_branch),
        (false, true) => {
            git.create_tracking_branch(state_branch, ORIGIN)?;
            Ok(())
        }
        (true, false) => {
            git.checkout_branch(state_branch)?;
            if remote_configured {
                tolerate_unreachable(git.push_with_upstream(ORIGIN, state_branch))?;
            }
            Ok(())
        }
        (true, true) => {
            let upstream = git.get_branch_remote(state_branch)?;
            if upstream.as_deref() != Some(ORIGIN) {
                git.set_upstream(state_branch, ORIGIN, state_branch)?;
            }
            Ok(())
        }
    }
}

fn create_fresh(
    git: &dyn Git,
    state_branch: &str,
    remote_configured: bool,
    original_branch: Option<&str>,
) -> Result<(), GitError> {
    let current = original_branch.ok_or_else(|| {
        GitError::InvalidState("cannot create the state branch from a detached HEAD".to_string())
    })?;

    if !git.has_commits(current)? {
        return Err(GitError::InvalidState(format!(
            "branch {current} has no commits; cannot create the state branch"
        )));
    }

    git.checkout_orphan_branch(state_branch)?;
    git.commit_allow_empty("Initialize state branch")?;

    if remote_configured {
        tolerate_unreachable(git.push_with_upstream(ORIGIN, state_branch))?;
    }

    Ok(())
}

fn tolerate_unreachable(result: Result<(), GitError>) -> Result<(), GitError> {
    match result {
        Ok(()) => Ok(()),
        Err(err) if err.looks_like_unreachable_remote() => Ok(()),
        Err(err) => Err(err),
    }
}
