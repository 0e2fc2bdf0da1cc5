//! Delta calculator (spec.md §4.2): file-level diff of `.gitgov/` between
//! two branches, implemented atop `Git::get_changed_files`.

use crate::git::error::GitError;
use crate::ports::Git;
use crate::record::{DeltaStatus, StateDeltaFile};

const GITGOV_DIR: &str = ".gitgov";

/// `calculateStateDelta(sourceBranch)`: the list of `.gitgov/`-scoped
/// added/modified/deleted files between `state_branch` and `source_branch`.
pub fn calculate_state_delta(
    git: &dyn Git,
    state_branch: &str,
    source_branch: &str,
) -> Result<Vec<StateDeltaFile>, GitError> {
    calculate_delta_between(git, state_branch, source_branch)
}

/// General two-ref `.gitgov/`-scoped delta, used by push's implicit-pull
/// accounting and pull's `filesUpdated` computation alike.
pub fn calculate_delta_between(
    git: &dyn Git,
    ref_a: &str,
    ref_b: &str,
) -> Result<Vec<StateDeltaFile>, GitError> {
    let entries = git.get_changed_files(ref_a, ref_b, Some(GITGOV_DIR))?;

    Ok(entries
        .into_iter()
        .filter(|entry| entry.path.starts_with(&format!("{GITGOV_DIR}/")))
        .filter_map(|entry| {
            // name-status uses Rxxx/Cxxx for renames/copies; the leading
            // letter is all we need to classify add/modify/delete.
            let status_char = entry.status;
            DeltaStatus::from_git_status_char(status_char).map(|status| StateDeltaFile {
                status,
                file: entry.path,
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{CommitInfo, NameStatusEntry, PullRebaseOutcome};
    use std::path::Path;

    struct FakeGit {
        entries: Vec<NameStatusEntry>,
    }

    impl Git for FakeGit {
        fn repo_root(&self) -> Result<std::path::PathBuf, GitError> {
            unimplemented!()
        }
        fn current_branch(&self) -> Result<Option<String>, GitError> {
            unimplemented!()
        }
        fn branch_exists(&self, _branch: &str) -> Result<bool, GitError> {
            unimplemented!()
        }
        fn local_branch_exists(&self, _branch: &str) -> Result<bool, GitError> {
            unimplemented!()
        }
        fn remote_branch_exists(&self, _remote: &str, _branch: &str) -> Result<bool, GitError> {
            unimplemented!()
        }
        fn is_remote_configured(&self, _remote: &str) -> Result<bool, GitError> {
            unimplemented!()
        }
        fn has_commits(&self, _branch: &str) -> Result<bool, GitError> {
            unimplemented!()
        }
        fn checkout_orphan_branch(&self, _branch: &str) -> Result<(), GitError> {
            unimplemented!()
        }
        fn checkout_branch(&self, _branch: &str) -> Result<(), GitError> {
            unimplemented!()
        }
        fn checkout_branch_force(&self, _branch: &str) -> Result<(), GitError> {
            unimplemented!()
        }
        fn create_tracking_branch(&self, _branch: &str, _remote: &str) -> Result<(), GitError> {
            unimplemented!()
        }
        fn checkout_files_from_branch(&self, _branch: &str, _path: &str) -> Result<(), GitError> {
            unimplemented!()
        }
        fn list_remote_branches(&self, _remote: &str) -> Result<Vec<String>, GitError> {
            unimplemented!()
        }
        fn fetch(&self, _remote: &str) -> Result<(), GitError> {
            unimplemented!()
        }
        fn fetch_branch(&self, _remote: &str, _branch: &str) -> Result<(), GitError> {
            unimplemented!()
        }
        fn pull_rebase(&self, _remote: &str, _branch: &str) -> Result<PullRebaseOutcome, GitError> {
            unimplemented!()
        }
        fn push(&self, _remote: &str, _branch: &str) -> Result<(), GitError> {
            unimplemented!()
        }
        fn push_with_upstream(&self, _remote: &str, _branch: &str) -> Result<(), GitError> {
            unimplemented!()
        }
        fn set_upstream(&self, _branch: &str, _remote: &str, _remote_branch: &str) -> Result<(), GitError> {
            unimplemented!()
        }
        fn get_branch_remote(&self, _branch: &str) -> Result<Option<String>, GitError> {
            unimplemented!()
        }
        fn get_commit_history(&self, _branch: &str, _max_count: usize) -> Result<Vec<CommitInfo>, GitError> {
            unimplemented!()
        }
        fn get_changed_files(
            &self,
            _ref_a: &str,
            _ref_b: &str,
            _path_filter: Option<&str>,
        ) -> Result<Vec<NameStatusEntry>, GitError> {
            Ok(self.entries.clone())
        }
        fn head_commit(&self, _branch: &str) -> Result<String, GitError> {
            unimplemented!()
        }
        fn add(&self, _paths: &[&Path], _force: bool) -> Result<(), GitError> {
            unimplemented!()
        }
        fn rm(&self, _path: &Path, _force: bool) -> Result<(), GitError> {
            unimplemented!()
        }
        fn commit(&self, _message: &str) -> Result<String, GitError> {
            unimplemented!()
        }
        fn commit_allow_empty(&self, _message: &str) -> Result<String, GitError> {
            unimplemented!()
        }
        fn reset_mixed(&self, _path: &str) -> Result<(), GitError> {
            unimplemented!()
        }
        fn has_uncommitted_changes(&self) -> Result<bool, GitError> {
            unimplemented!()
        }
        fn has_staged_or_modified_changes(&self) -> Result<bool, GitError> {
            unimplemented!()
        }
        fn stash(&self, _message: &str) -> Result<Option<String>, GitError> {
            unimplemented!()
        }
        fn stash_pop(&self) -> Result<(), GitError> {
            unimplemented!()
        }
        fn is_rebase_in_progress(&self) -> Result<bool, GitError> {
            unimplemented!()
        }
        fn rebase_continue(&self) -> Result<(), GitError> {
            unimplemented!()
        }
        fn rebase_abort(&self) -> Result<(), GitError> {
            unimplemented!()
        }
        fn get_conflicted_files(&self) -> Result<Vec<String>, GitError> {
            unimplemented!()
        }
        fn get_staged_files(&self) -> Result<Vec<String>, GitError> {
            unimplemented!()
        }
        fn ls_tree_dir_exists(&self, _branch: &str, _path: &str) -> Result<bool, GitError> {
            unimplemented!()
        }
        fn list_tree_files(&self, _branch: &str, _path: &str) -> Result<Vec<String>, GitError> {
            unimplemented!()
        }
        fn set_config(&self, _key: &str, _value: &str) -> Result<(), GitError> {
            unimplemented!()
        }
    }

    #[test]
    fn filters_to_gitgov_and_classifies_status() {
        let git = FakeGit {
            entries: vec![
                NameStatusEntry {
                    status: 'A',
                    path: ".gitgov/tasks/1.json".to_string(),
                },
                NameStatusEntry {
                    status: 'D',
                    path: ".gitgov/tasks/2.json".to_string(),
                },
                NameStatusEntry {
                    status: 'M',
                    path: "README.md".to_string(),
                },
            ],
        };

        let delta = calculate_state_delta(&git, "gitgov-state", "main").unwrap();
        assert_eq!(delta.len(), 2);
        assert_eq!(delta[0].file, ".gitgov/tasks/1.json");
        assert_eq!(delta[0].status, DeltaStatus::Added);
        assert_eq!(delta[1].status, DeltaStatus::Deleted);
    }
}
