//! Push pipeline (spec.md §4.3): pre-flight, audit, preserve, checkout state
//! branch, implicit pull-rebase reconciliation, whitelist publication,
//! restoration on every exit path.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::delta;
use crate::engine::audit::{self, AuditOptions};
use crate::engine::preserve::PreservationScope;
use crate::engine::state_branch::{self, ORIGIN};
use crate::error::SyncError;
use crate::git::error::GitError;
use crate::ports::{Config, Git, Indexer, Lint, PullRebaseOutcome};
use crate::record::{ConflictInfo, DeltaStatus, StateDeltaFile};
use crate::whitelist::is_whitelisted;

#[derive(Debug, Clone, Default)]
pub struct PushStateOptions {
    pub source_branch: Option<String>,
    pub actor_id: String,
    pub dry_run: bool,
    pub force: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImplicitPullInfo {
    pub has_changes: bool,
    pub files_updated: usize,
    pub reindexed: bool,
}

#[derive(Debug, Clone)]
pub struct SyncPushResult {
    pub success: bool,
    pub files_synced: usize,
    pub source_branch: String,
    pub commit_hash: Option<String>,
    pub commit_message: Option<String>,
    pub conflict_detected: bool,
    pub conflict_info: Option<ConflictInfo>,
    pub implicit_pull: Option<ImplicitPullInfo>,
    pub error: Option<String>,
}

impl SyncPushResult {
    fn failure(source_branch: &str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            files_synced: 0,
            source_branch: source_branch.to_string(),
            commit_hash: None,
            commit_message: None,
            conflict_detected: false,
            conflict_info: None,
            implicit_pull: None,
            error: Some(error.into()),
        }
    }

    fn conflict(source_branch: &str, info: ConflictInfo) -> Self {
        Self {
            success: false,
            files_synced: 0,
            source_branch: source_branch.to_string(),
            commit_hash: None,
            commit_message: None,
            conflict_detected: true,
            conflict_info: Some(info),
            implicit_pull: None,
            error: None,
        }
    }
}

/// `pushState(...)` (spec.md §4.3).
pub fn push_state(
    git: &dyn Git,
    config: &dyn Config,
    lint: &dyn Lint,
    indexer: &dyn Indexer,
    gitgov_dir: &Path,
    options: PushStateOptions,
) -> Result<SyncPushResult, SyncError> {
    let state_branch = state_branch::get_state_branch_name(config);

    let source_branch = match &options.source_branch {
        Some(branch) => branch.clone(),
        None => git
            .current_branch()
            .map_err(SyncError::from)?
            .ok_or_else(|| SyncError::Git(GitError::InvalidState("not currently on any branch".to_string())))?,
    };

    // 1. Pre-flight.
    if source_branch == state_branch {
        return Err(SyncError::PushFromStateBranch { branch: source_branch });
    }
    if !git.is_remote_configured(ORIGIN).map_err(SyncError::from)? {
        return Ok(SyncPushResult::failure(
            &source_branch,
            "no `origin` remote is configured; add one before pushing state",
        ));
    }
    if !git.has_commits(&source_branch).map_err(SyncError::from)? {
        return Ok(SyncPushResult::failure(
            &source_branch,
            format!("branch {source_branch} has no commits; nothing to push"),
        ));
    }

    // 2. Audit (scope=current).
    let audit_report = audit::audit_state(git, lint, &state_branch, &AuditOptions::for_push_preflight());
    if !audit_report.passed {
        let affected = audit_report
            .integrity_violations
            .iter()
            .map(|v| v.rebase_commit_hash.clone())
            .collect();
        return Ok(SyncPushResult::conflict(
            &source_branch,
            ConflictInfo::for_integrity_violation(affected),
        ));
    }

    // 3. Ensure state branch.
    state_branch::ensure_state_branch(git, &state_branch)?;

    // 4. Preserve local tree.
    let scope = match PreservationScope::capture(git, gitgov_dir) {
        Ok(scope) => scope,
        Err(err) => {
            return Ok(SyncPushResult::failure(
                &source_branch,
                format!("failed to preserve local .gitgov/ state: {err}"),
            ))
        }
    };

    // 5. Checkout state branch.
    if let Err(err) = git.checkout_branch(&state_branch) {
        let _ = scope.pop_stash(git);
        return Ok(SyncPushResult::failure(
            &source_branch,
            format!("failed to check out {state_branch}: {err}"),
        ));
    }

    let head_before_pull = match git.head_commit(&state_branch) {
        Ok(hash) => hash,
        Err(err) => {
            return Ok(restore_and_fail(
                git,
                &state_branch,
                gitgov_dir,
                &source_branch,
                &scope,
                false,
                format!("failed to read {state_branch} HEAD: {err}"),
            ))
        }
    };

    // 6. Implicit reconciliation.
    let implicit_pull = match git.pull_rebase(ORIGIN, &state_branch) {
        Ok(PullRebaseOutcome::Conflicted { conflicted_files }) => {
            if let Err(err) = git.rebase_abort() {
                log::warn!("failed to abort rebase after conflict: {err}");
            }
            let restore_note = restore(git, &state_branch, &source_branch, &scope, gitgov_dir, false);
            return Ok(SyncPushResult {
                error: restore_note,
                ..SyncPushResult::conflict(
                    &source_branch,
                    ConflictInfo::for_rebase_conflict(conflicted_files),
                )
            });
        }
        Ok(PullRebaseOutcome::UpToDate) => None,
        Ok(PullRebaseOutcome::Completed) => {
            let head_after_pull = match git.head_commit(&state_branch) {
                Ok(hash) => hash,
                Err(err) => {
                    return Ok(restore_and_fail(
                        git,
                        &state_branch,
                        gitgov_dir,
                        &source_branch,
                        &scope,
                        false,
                        format!("failed to read {state_branch} HEAD after pull: {err}"),
                    ))
                }
            };
            if head_after_pull == head_before_pull {
                None
            } else {
                let files_updated = delta::calculate_delta_between(git, &head_before_pull, &head_after_pull)
                    .map(|files| files.len())
                    .unwrap_or(0);
                Some((
                    head_after_pull,
                    ImplicitPullInfo {
                        has_changes: true,
                        files_updated,
                        reindexed: false,
                    },
                ))
            }
        }
        Err(err) if err.looks_like_up_to_date() || err.looks_like_unreachable_remote() => None,
        Err(err) => {
            return Ok(restore_and_fail(
                git,
                &state_branch,
                gitgov_dir,
                &source_branch,
                &scope,
                false,
                format!("pull --rebase {ORIGIN} {state_branch} failed: {err}"),
            ))
        }
    };

    let has_implicit_changes = implicit_pull.is_some();

    // 7. Publication.
    let first_push = !git.ls_tree_dir_exists(&state_branch, ".gitgov").unwrap_or(false);

    let changed_files = match publish_whitelisted_files(git, &scope, gitgov_dir, &source_branch) {
        Ok(files) => files,
        Err(err) => {
            return Ok(restore_and_fail(
                git,
                &state_branch,
                gitgov_dir,
                &source_branch,
                &scope,
                has_implicit_changes,
                format!("failed to stage whitelisted files: {err}"),
            ))
        }
    };

    let staged = match git.get_staged_files() {
        Ok(files) => files,
        Err(err) => {
            return Ok(restore_and_fail(
                git,
                &state_branch,
                gitgov_dir,
                &source_branch,
                &scope,
                has_implicit_changes,
                format!("failed to read staged files: {err}"),
            ))
        }
    };

    let mut result = if staged.is_empty() {
        SyncPushResult {
            success: true,
            files_synced: 0,
            source_branch: source_branch.clone(),
            commit_hash: None,
            commit_message: None,
            conflict_detected: false,
            conflict_info: None,
            implicit_pull: None,
            error: None,
        }
    } else {
        let files_count = changed_files.len();
        let commit_message = build_commit_message(&options.actor_id, &source_branch, first_push, &changed_files);

        if options.dry_run {
            SyncPushResult {
                success: true,
                files_synced: files_count,
                source_branch: source_branch.clone(),
                commit_hash: None,
                commit_message: Some(commit_message),
                conflict_detected: false,
                conflict_info: None,
                implicit_pull: None,
                error: None,
            }
        } else {
            match git.commit(&commit_message) {
                Ok(commit_hash) => {
                    if let Err(err) = push_commit(git, &state_branch) {
                        SyncPushResult {
                            success: true,
                            files_synced: files_count,
                            source_branch: source_branch.clone(),
                            commit_hash: Some(commit_hash),
                            commit_message: Some(commit_message),
                            conflict_detected: false,
                            conflict_info: None,
                            implicit_pull: None,
                            error: Some(format!("committed locally but failed to push: {err}")),
                        }
                    } else {
                        SyncPushResult {
                            success: true,
                            files_synced: files_count,
                            source_branch: source_branch.clone(),
                            commit_hash: Some(commit_hash),
                            commit_message: Some(commit_message),
                            conflict_detected: false,
                            conflict_info: None,
                            implicit_pull: None,
                            error: None,
                        }
                    }
                }
                Err(err) if err.looks_like_nothing_to_commit() => SyncPushResult {
                    success: true,
                    files_synced: 0,
                    source_branch: source_branch.clone(),
                    commit_hash: None,
                    commit_message: None,
                    conflict_detected: false,
                    conflict_info: None,
                    implicit_pull: None,
                    error: None,
                },
                Err(err) => {
                    return Ok(restore_and_fail(
                        git,
                        &state_branch,
                        gitgov_dir,
                        &source_branch,
                        &scope,
                        has_implicit_changes,
                        format!("failed to commit state branch changes: {err}"),
                    ))
                }
            }
        }
    };

    // 8. Restoration.
    let restore_note = restore(git, &state_branch, &source_branch, &scope, gitgov_dir, has_implicit_changes);
    if let Some((_, mut info)) = implicit_pull {
        if has_implicit_changes {
            let reindex_result = indexer.generate_index();
            info.reindexed = reindex_result.success;
            if !reindex_result.success {
                log::warn!(
                    "reindex after implicit pull failed: {}",
                    reindex_result.error.unwrap_or_default()
                );
            }
        }
        result.implicit_pull = Some(info);
    }
    if let Some(note) = restore_note {
        result.error = Some(match result.error {
            Some(existing) => format!("{existing}; {note}"),
            None => note,
        });
    }

    Ok(result)
}

fn push_commit(git: &dyn Git, state_branch: &str) -> Result<(), GitError> {
    match git.push(ORIGIN, state_branch) {
        Ok(()) => Ok(()),
        Err(err) if err.looks_like_unreachable_remote() => Ok(()),
        Err(err) => Err(err),
    }
}

fn build_commit_message(
    actor_id: &str,
    source_branch: &str,
    first_push: bool,
    changed_files: &[StateDeltaFile],
) -> String {
    let headline = if first_push { "Initial state" } else { "Publish state" };
    let verb = if first_push { "synced (initial)" } else { "changed" };
    let timestamp = Utc::now().to_rfc3339();
    let files_count = changed_files.len();

    let mut message = format!(
        "sync: {headline} from {source_branch}\n\nActor: {actor_id}\nTimestamp: {timestamp}\nFiles: {files_count} file(s) {verb}\n"
    );
    if !changed_files.is_empty() {
        message.push('\n');
        let body = changed_files
            .iter()
            .map(|file| format!("{} {}", file.status.as_char(), file.file))
            .collect::<Vec<_>>()
            .join("\n");
        message.push_str(&body);
        message.push('\n');
    }
    message
}

/// Copies whitelisted files onto the currently-checked-out state branch's
/// working tree and stages them, then sweeps the tree for anything tracked
/// that fails the whitelist predicate (spec.md §4.3 step 7).
fn publish_whitelisted_files(
    git: &dyn Git,
    scope: &PreservationScope,
    gitgov_dir: &Path,
    source_branch: &str,
) -> Result<Vec<StateDeltaFile>, GitError> {
    let mut changes = Vec::new();

    if let Some(temp) = scope.temp_path() {
        for relative in collect_relative_files(temp).map_err(GitError::Io)? {
            let relative_str = relative.to_string_lossy().replace('\\', "/");
            if !is_whitelisted(&relative_str) {
                continue;
            }
            let src = temp.join(&relative);
            let dst = gitgov_dir.join(&relative);
            let status = if dst.exists() { DeltaStatus::Modified } else { DeltaStatus::Added };
            if let Some(parent) = dst.parent() {
                fs::create_dir_all(parent).map_err(GitError::Io)?;
            }
            fs::copy(&src, &dst).map_err(GitError::Io)?;
            changes.push(StateDeltaFile {
                status,
                file: format!(".gitgov/{relative_str}"),
            });
        }
    } else {
        let gitgov_prefix = ".gitgov/";
        for path in git.list_tree_files(source_branch, ".gitgov")? {
            let Some(relative) = path.strip_prefix(gitgov_prefix) else {
                continue;
            };
            if !is_whitelisted(relative) {
                continue;
            }
            let dst = gitgov_dir.join(relative);
            let status = if dst.exists() { DeltaStatus::Modified } else { DeltaStatus::Added };
            git.checkout_files_from_branch(source_branch, &path)?;
            changes.push(StateDeltaFile { status, file: path });
        }
    }

    for relative in collect_relative_files(gitgov_dir).map_err(GitError::Io)? {
        let relative_str = relative.to_string_lossy().replace('\\', "/");
        let full_path = gitgov_dir.join(&relative);
        if is_whitelisted(&relative_str) {
            git.add(&[full_path.as_path()], true)?;
        } else {
            git.rm(&full_path, true)?;
            changes.push(StateDeltaFile {
                status: DeltaStatus::Deleted,
                file: format!(".gitgov/{relative_str}"),
            });
        }
    }

    Ok(changes)
}

fn collect_relative_files(root: &Path) -> std::io::Result<Vec<PathBuf>> {
    fn walk(base: &Path, dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            let path = entry.path();
            if file_type.is_dir() {
                walk(base, &path, out)?;
            } else if file_type.is_file() {
                if let Ok(relative) = path.strip_prefix(base) {
                    out.push(relative.to_path_buf());
                }
            }
        }
        Ok(())
    }

    let mut out = Vec::new();
    if root.exists() {
        walk(root, root, &mut out)?;
    }
    Ok(out)
}

/// Restoration (spec.md §4.3 step 8). `has_implicit_changes` selects between
/// bringing the newly pulled `.gitgov/` tree onto the work branch (overlaying
/// only local-only files on top) versus restoring the entire preserved tree
/// verbatim when nothing was pulled.
fn restore(
    git: &dyn Git,
    state_branch: &str,
    source_branch: &str,
    scope: &PreservationScope,
    gitgov_dir: &Path,
    has_implicit_changes: bool,
) -> Option<String> {
    let mut notes = Vec::new();

    if let Err(err) = git.checkout_branch(source_branch) {
        notes.push(format!("failed to return to {source_branch}: {err}"));
    }

    let overlay_result = if has_implicit_changes {
        git.checkout_files_from_branch(state_branch, ".gitgov")
            .map_err(std::io::Error::other)
            .and_then(|()| scope.restore_local_only_files(gitgov_dir))
    } else {
        scope.overlay_full_tree(gitgov_dir)
    };
    if let Err(err) = overlay_result {
        notes.push(format!("failed to restore .gitgov/ contents: {err}"));
    }

    if let Err(err) = scope.pop_stash(git) {
        notes.push(format!(
            "failed to restore stashed changes automatically; run `git stash pop` manually: {err}"
        ));
    }

    (!notes.is_empty()).then(|| notes.join("; "))
}

fn restore_and_fail(
    git: &dyn Git,
    state_branch: &str,
    gitgov_dir: &Path,
    source_branch: &str,
    scope: &PreservationScope,
    has_implicit_changes: bool,
    error: impl Into<String>,
) -> SyncPushResult {
    let restore_note = restore(git, state_branch, source_branch, scope, gitgov_dir, has_implicit_changes);
    let mut message = error.into();
    if let Some(note) = restore_note {
        message.push_str("; ");
        message.push_str(&note);
    }
    SyncPushResult::failure(source_branch, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::NameStatusEntry;
    use crate::testing::{FakeGitBuilder, FakeIndexer, FakeLint};
    use tempfile::TempDir;

    fn write_gitgov() -> TempDir {
        let temp = TempDir::new().unwrap();
        let gitgov = temp.path().join(".gitgov");
        fs::create_dir_all(gitgov.join("tasks")).unwrap();
        fs::write(gitgov.join("config.json"), r#"{"state": {"branch": "gitgov-state"}}"#).unwrap();
        fs::write(gitgov.join("tasks/1.json"), r#"{"header": {}, "payload": {}}"#).unwrap();
        temp
    }

    #[test]
    fn implicit_pull_during_push_reports_reindexed_changes() {
        let temp = write_gitgov();
        let gitgov_dir = temp.path().join(".gitgov");

        let git = FakeGitBuilder::new()
            .with_current_branch("main")
            .with_local_branch("gitgov-state")
            .with_pull_outcome(PullRebaseOutcome::Completed)
            .with_changed_files(
                (0..7)
                    .map(|i| NameStatusEntry {
                        status: 'M',
                        path: format!(".gitgov/tasks/{i}.json"),
                    })
                    .collect(),
            )
            .with_staged_files(vec![
                ".gitgov/config.json".to_string(),
                ".gitgov/tasks/1.json".to_string(),
            ])
            .build();
        let config = crate::testing::FakeConfig::new(Default::default(), Default::default());
        let lint = FakeLint::clean();
        let indexer = FakeIndexer::succeeding();

        let result = push_state(
            &git,
            &config,
            &lint,
            &indexer,
            &gitgov_dir,
            PushStateOptions {
                source_branch: None,
                actor_id: "human:alice".to_string(),
                dry_run: false,
                force: false,
            },
        )
        .expect("push_state should not hard-fail");

        assert!(result.success, "push failed: {:?}", result.error);
        assert!(result.commit_hash.is_some());
        assert_eq!(result.files_synced, 2);
        let implicit_pull = result.implicit_pull.expect("expected an implicit pull to be recorded");
        assert!(implicit_pull.has_changes);
        assert_eq!(implicit_pull.files_updated, 7);
        assert!(implicit_pull.reindexed);
        assert_eq!(indexer.call_count(), 1);
    }
}
