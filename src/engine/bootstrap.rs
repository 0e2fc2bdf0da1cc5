//! Bootstrapper (spec.md §4.7): seed `.gitgov/` onto a fresh work branch
//! from a remote's `gitgov-state` branch, without switching off the work
//! branch or leaving the files tracked.

use crate::engine::state_branch::ORIGIN;
use crate::ports::Git;

#[derive(Debug, Clone)]
pub struct BootstrapResult {
    pub success: bool,
    pub error: Option<String>,
}

impl BootstrapResult {
    fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// `bootstrapFromStateBranch(git, stateBranch="gitgov-state")` (spec.md §4.7).
pub fn bootstrap_from_state_branch(git: &dyn Git, state_branch: &str) -> BootstrapResult {
    let local_exists = match git.local_branch_exists(state_branch) {
        Ok(exists) => exists,
        Err(err) => return BootstrapResult::failure(format!("failed to check local branches: {err}")),
    };

    if !local_exists {
        let remote_exists = match git.remote_branch_exists(ORIGIN, state_branch) {
            Ok(exists) => exists,
            Err(err) => return BootstrapResult::failure(format!("failed to check remote branches: {err}")),
        };
        if !remote_exists {
            if let Err(err) = git.fetch(ORIGIN) {
                if !err.looks_like_unreachable_remote() {
                    return BootstrapResult::failure(format!("fetch failed: {err}"));
                }
            }
        }
        let remote_exists = match git.remote_branch_exists(ORIGIN, state_branch) {
            Ok(exists) => exists,
            Err(err) => return BootstrapResult::failure(format!("failed to check remote branches: {err}")),
        };
        if !remote_exists {
            return BootstrapResult::failure(format!(
                "no {state_branch} branch locally or on {ORIGIN}; nothing to bootstrap from"
            ));
        }
        if let Err(err) = git.create_tracking_branch(state_branch, ORIGIN) {
            return BootstrapResult::failure(format!("failed to create tracking branch: {err}"));
        }
    }

    match git.ls_tree_dir_exists(state_branch, ".gitgov") {
        Ok(true) => {}
        Ok(false) => {
            return BootstrapResult::failure(format!(
                "{state_branch} has no .gitgov/ tree; nothing to bootstrap"
            ))
        }
        Err(err) => return BootstrapResult::failure(format!("failed to inspect {state_branch}: {err}")),
    }

    if let Err(err) = git.checkout_files_from_branch(state_branch, ".gitgov") {
        return BootstrapResult::failure(format!(
            "failed to check out .gitgov/ from {state_branch}: {err}"
        ));
    }

    if let Err(err) = git.reset_mixed(".gitgov/") {
        return BootstrapResult::failure(format!("failed to unstage .gitgov/: {err}"));
    }

    BootstrapResult::ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeGitBuilder;

    #[test]
    fn fails_when_state_branch_absent_everywhere() {
        let git = FakeGitBuilder::new().build();
        let result = bootstrap_from_state_branch(&git, "gitgov-state");
        assert!(!result.success);
        assert!(result.error.unwrap().contains("nothing to bootstrap from"));
    }

    #[test]
    fn creates_tracking_branch_from_remote_only_state() {
        let git = FakeGitBuilder::new()
            .with_remote_branch("gitgov-state")
            .build();
        // The fake's `ls_tree_dir_exists` always answers false, so this
        // exercises the tracking-branch path before failing on the tree
        // check - confirming the remote-only branch is created.
        let result = bootstrap_from_state_branch(&git, "gitgov-state");
        assert!(!result.success);
        assert!(git.local_branch_exists("gitgov-state").unwrap());
    }
}
