//! Pull pipeline (spec.md §4.4): pre-flight, save local-only files, checkout
//! state branch, pull-rebase reconciliation (leaving a conflicted rebase
//! paused rather than aborting it), return to the work branch.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::delta;
use crate::engine::state_branch::{self, ORIGIN};
use crate::error::SyncError;
use crate::ports::{Config, Git, Indexer, PullRebaseOutcome};
use crate::record::ConflictInfo;
use crate::whitelist::{is_whitelisted, LOCAL_ONLY_FILES, SYNC_DIRECTORIES, SYNC_ROOT_FILES};

#[derive(Debug, Clone, Default)]
pub struct PullStateOptions {
    pub force_reindex: bool,
    pub force: bool,
}

#[derive(Debug, Clone)]
pub struct SyncPullResult {
    pub success: bool,
    pub has_changes: bool,
    pub files_updated: usize,
    pub reindexed: bool,
    pub conflict_detected: bool,
    pub conflict_info: Option<ConflictInfo>,
    pub error: Option<String>,
}

impl SyncPullResult {
    fn up_to_date() -> Self {
        Self {
            success: true,
            has_changes: false,
            files_updated: 0,
            reindexed: false,
            conflict_detected: false,
            conflict_info: None,
            error: None,
        }
    }

    fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            has_changes: false,
            files_updated: 0,
            reindexed: false,
            conflict_detected: false,
            conflict_info: None,
            error: Some(error.into()),
        }
    }
}

/// `pullState(...)` (spec.md §4.4).
pub fn pull_state(
    git: &dyn Git,
    config: &dyn Config,
    indexer: &dyn Indexer,
    gitgov_dir: &Path,
    options: PullStateOptions,
) -> Result<SyncPullResult, SyncError> {
    let state_branch = state_branch::get_state_branch_name(config);

    // 1. Pre-flight.
    if !git.is_remote_configured(ORIGIN).map_err(SyncError::from)? {
        return Ok(SyncPullResult::failure(
            "no `origin` remote is configured; add one before pulling state",
        ));
    }
    if let Err(err) = git.fetch(ORIGIN) {
        if !err.looks_like_unreachable_remote() {
            return Ok(SyncPullResult::failure(format!("fetch failed: {err}")));
        }
    }
    let remote_exists = git.remote_branch_exists(ORIGIN, &state_branch).unwrap_or(false);
    if !remote_exists {
        if git.local_branch_exists(&state_branch).map_err(SyncError::from)? {
            return Ok(SyncPullResult::up_to_date());
        }
        if gitgov_dir.exists() {
            return Ok(SyncPullResult::failure(
                "no gitgov-state branch on the remote yet; run `gitgov sync push` first",
            ));
        }
        return Ok(SyncPullResult::failure(
            "no local .gitgov/ and no remote state branch; run `gitgov init` first",
        ));
    }

    // 2. Ensure state branch; save current branch.
    state_branch::ensure_state_branch(git, &state_branch)?;
    let original_branch = git.current_branch().map_err(SyncError::from)?;

    // 3. Save local-only files into memory.
    let saved_local_only = read_local_only_files(gitgov_dir);

    // 4. Checkout state branch (retry with force on untracked-overlap).
    if let Err(err) = git.checkout_branch(&state_branch) {
        if let Err(err) = git.checkout_branch_force(&state_branch) {
            return Ok(SyncPullResult::failure(format!(
                "failed to check out {state_branch}: {err}"
            )));
        }
    }

    // 5. Sanity: reject staged/modified changes on the state branch.
    if git.has_staged_or_modified_changes().map_err(SyncError::from)? {
        return_to_branch(git, original_branch.as_deref());
        return Err(SyncError::UncommittedChanges {
            branch: state_branch,
        });
    }

    // 6. Record HEAD before; fetch; pull --rebase.
    let head_before = git.head_commit(&state_branch).map_err(SyncError::from)?;
    if let Err(err) = git.fetch(ORIGIN) {
        if !err.looks_like_unreachable_remote() {
            return_to_branch(git, original_branch.as_deref());
            return Ok(SyncPullResult::failure(format!("fetch failed: {err}")));
        }
    }

    let pull_outcome = git.pull_rebase(ORIGIN, &state_branch);
    let (head_after, conflict) = match pull_outcome {
        Ok(PullRebaseOutcome::Conflicted { conflicted_files }) => {
            // Leave the rebase paused; the operator resolves it explicitly.
            return_to_branch(git, original_branch.as_deref());
            return Ok(SyncPullResult {
                success: false,
                has_changes: false,
                files_updated: 0,
                reindexed: false,
                conflict_detected: true,
                conflict_info: Some(ConflictInfo::for_rebase_conflict(conflicted_files)),
                error: None,
            });
        }
        Ok(PullRebaseOutcome::UpToDate) => (head_before.clone(), false),
        Ok(PullRebaseOutcome::Completed) => {
            let head = git.head_commit(&state_branch).map_err(SyncError::from)?;
            (head, false)
        }
        Err(err) if err.looks_like_up_to_date() || err.looks_like_unreachable_remote() => {
            (head_before.clone(), false)
        }
        Err(err) => {
            return_to_branch(git, original_branch.as_deref());
            return Ok(SyncPullResult::failure(format!(
                "pull --rebase {ORIGIN} {state_branch} failed: {err}"
            )));
        }
    };
    let _ = conflict;

    // 7. Post-pull classification.
    let has_changes = head_after != head_before;
    let should_reindex = has_changes || options.force_reindex;
    let files_updated = if has_changes {
        delta::calculate_delta_between(git, &head_before, &head_after)
            .map(|files| files.len())
            .unwrap_or(0)
    } else {
        0
    };

    // 8. Return to work branch: checkout whitelisted paths, unstage, restore
    // local-only files.
    if let Some(branch) = &original_branch {
        if let Err(err) = git.checkout_branch(branch) {
            return Ok(SyncPullResult::failure(format!(
                "failed to return to {branch} after pulling state: {err}"
            )));
        }
    }
    for path in checkout_candidate_paths(git, &state_branch) {
        if let Err(err) = git.checkout_files_from_branch(&state_branch, &path) {
            log::warn!("failed to checkout {path} from {state_branch}: {err}");
        }
    }
    if let Err(err) = git.reset_mixed(".gitgov/") {
        log::warn!("failed to unstage .gitgov/ after pull: {err}");
    }
    write_local_only_files(gitgov_dir, &saved_local_only);

    // 9. Reindex if needed.
    let reindexed = if should_reindex {
        let result = indexer.generate_index();
        if !result.success {
            log::warn!(
                "reindex after pull failed: {}",
                result.error.unwrap_or_default()
            );
        }
        result.success
    } else {
        false
    };

    Ok(SyncPullResult {
        success: true,
        has_changes,
        files_updated,
        reindexed,
        conflict_detected: false,
        conflict_info: None,
        error: None,
    })
}

fn return_to_branch(git: &dyn Git, branch: Option<&str>) {
    if let Some(branch) = branch {
        if let Err(err) = git.checkout_branch(branch) {
            log::warn!("failed to return to {branch}: {err}");
        }
    }
}

fn read_local_only_files(gitgov_dir: &Path) -> HashMap<String, Vec<u8>> {
    let mut saved = HashMap::new();
    for name in LOCAL_ONLY_FILES {
        let path = gitgov_dir.join(name);
        if let Ok(content) = fs::read(&path) {
            saved.insert((*name).to_string(), content);
        }
    }
    saved
}

fn write_local_only_files(gitgov_dir: &Path, saved: &HashMap<String, Vec<u8>>) {
    if saved.is_empty() {
        return;
    }
    if let Err(err) = fs::create_dir_all(gitgov_dir) {
        log::warn!("failed to recreate {}: {err}", gitgov_dir.display());
        return;
    }
    for (name, content) in saved {
        if let Err(err) = fs::write(gitgov_dir.join(name), content) {
            log::warn!("failed to restore local-only file {name}: {err}");
        }
    }
}

/// The fixed set of whitelisted paths under `.gitgov/` that step 8
/// unconditionally checks out from the state branch (spec.md §4.4 step 8 /
/// Open Questions: intentional even when `hasChanges=false`, to repair
/// drift).
fn checkout_candidate_paths(git: &dyn Git, state_branch: &str) -> Vec<String> {
    let mut paths: Vec<String> = SYNC_ROOT_FILES
        .iter()
        .map(|name| format!(".gitgov/{name}"))
        .collect();

    for dir in SYNC_DIRECTORIES {
        let dir_path = format!(".gitgov/{dir}");
        match git.list_tree_files(state_branch, &dir_path) {
            Ok(files) => {
                for file in files {
                    if let Some(relative) = file.strip_prefix(".gitgov/") {
                        if is_whitelisted(relative) {
                            paths.push(file);
                        }
                    }
                }
            }
            Err(err) => log::warn!("failed to list {dir_path} on {state_branch}: {err}"),
        }
    }

    paths
}
