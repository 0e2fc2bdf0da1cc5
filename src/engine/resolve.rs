//! Resolve pipeline (spec.md §4.5): re-sign staged records after a rebase
//! stopped on conflicts, continue the rebase, and leave a signed
//! `resolution:` commit behind.

use std::fs;
use std::path::Path;

use chrono::Utc;

use crate::engine::audit::is_resolution_commit;
use crate::error::SyncError;
use crate::git::conflict::has_conflict_markers;
use crate::ports::{Git, Identity, Indexer};
use crate::record::Record;

#[derive(Debug, Clone)]
pub struct ResolveOptions {
    pub actor_id: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct SyncResolveResult {
    pub success: bool,
    pub rebase_commit_hash: Option<String>,
    pub resolution_commit_hash: Option<String>,
    pub conflicts_resolved: usize,
    pub resolved_by: String,
    pub reason: String,
}

/// `resolveConflict(...)` (spec.md §4.5).
pub fn resolve_conflict(
    git: &dyn Git,
    identity: &dyn Identity,
    indexer: &dyn Indexer,
    gitgov_dir: &Path,
    options: ResolveOptions,
) -> Result<SyncResolveResult, SyncError> {
    // 1. A rebase must be in progress.
    if !git.is_rebase_in_progress().map_err(SyncError::from)? {
        return Err(SyncError::NoRebaseInProgress);
    }

    // 2. Enumerate staged files; the resolved-record subset lives under
    // `.gitgov/**/*.json`.
    let staged = git.get_staged_files().map_err(SyncError::from)?;
    let record_files: Vec<&String> = staged
        .iter()
        .filter(|path| is_gitgov_json(path))
        .collect();

    // 3. Scan the candidate record files for leftover conflict markers.
    let mut marker_files = Vec::new();
    for path in &record_files {
        let full_path = repo_path(gitgov_dir, path);
        if let Ok(content) = fs::read_to_string(&full_path) {
            if has_conflict_markers(&content) {
                marker_files.push((*path).clone());
            }
        }
    }
    if !marker_files.is_empty() {
        return Err(SyncError::ConflictMarkersPresent {
            files: marker_files,
        });
    }

    // 4. Re-sign every staged record that parses as `{header, payload}`.
    let actor = identity.get_current_actor()?;
    for path in &record_files {
        let full_path = repo_path(gitgov_dir, path);
        let Ok(content) = fs::read_to_string(&full_path) else {
            continue;
        };
        let Ok(record) = serde_json::from_str::<Record>(&content) else {
            continue;
        };
        let signed = identity.sign_record(record, &actor.id, "resolver")?;
        let pretty = serde_json::to_string_pretty(&signed)
            .map_err(|err| SyncError::Git(crate::git::error::GitError::CommandFailed(err.to_string())))?;
        fs::write(&full_path, format!("{pretty}\n")).map_err(|err| SyncError::Git(crate::git::error::GitError::Io(err)))?;
    }

    // 5. Re-stage.
    git.add(&[gitgov_dir], true).map_err(SyncError::from)?;

    // 6. Continue the rebase; capture the resulting commit.
    git.rebase_continue().map_err(SyncError::from)?;
    let rebase_commit_hash = match git.current_branch().map_err(SyncError::from)? {
        Some(branch) => git.head_commit(&branch).ok(),
        None => None,
    };

    // 7. Signed, allow-empty resolution commit.
    let timestamp = Utc::now().to_rfc3339();
    let conflicts_resolved = record_files.len();
    let actor_id = &options.actor_id;
    let reason = &options.reason;
    let message = format!(
        "resolution: Conflict resolved by {actor_id}\n\nActor: {actor_id}\nTimestamp: {timestamp}\nReason: {reason}\nFiles: {conflicts_resolved} file(s) resolved\n\nSigned-off-by: {actor_id}\n"
    );
    debug_assert!(is_resolution_commit(&message));
    let resolution_commit_hash = git.commit_allow_empty(&message).map_err(SyncError::from)?;

    // 8. Reindex; failures are logged, non-fatal.
    let reindex_result = indexer.generate_index();
    if !reindex_result.success {
        log::warn!(
            "reindex after resolve failed: {}",
            reindex_result.error.unwrap_or_default()
        );
    }

    Ok(SyncResolveResult {
        success: true,
        rebase_commit_hash,
        resolution_commit_hash: Some(resolution_commit_hash),
        conflicts_resolved,
        resolved_by: options.actor_id,
        reason: options.reason,
    })
}

fn is_gitgov_json(path: &str) -> bool {
    path.starts_with(".gitgov/") && path.ends_with(".json")
}

fn repo_path(gitgov_dir: &Path, staged_path: &str) -> std::path::PathBuf {
    let relative = staged_path.strip_prefix(".gitgov/").unwrap_or(staged_path);
    gitgov_dir.join(relative)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeGitBuilder, FakeIdentity, FakeIndexer};

    #[test]
    fn errors_when_no_rebase_in_progress() {
        let git = FakeGitBuilder::new().build();
        let identity = FakeIdentity::new("human:alice", "resolver");
        let indexer = FakeIndexer::succeeding();
        let err = resolve_conflict(
            &git,
            &identity,
            &indexer,
            Path::new("/tmp/does-not-matter/.gitgov"),
            ResolveOptions {
                actor_id: "human:alice".to_string(),
                reason: "picked theirs".to_string(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, SyncError::NoRebaseInProgress));
    }

    #[test]
    fn resolves_with_no_staged_records() {
        let git = FakeGitBuilder::new().build();
        git.set_rebase_in_progress(true);
        let identity = FakeIdentity::new("human:alice", "resolver");
        let indexer = FakeIndexer::succeeding();

        let dir = tempfile::tempdir().unwrap();
        let result = resolve_conflict(
            &git,
            &identity,
            &indexer,
            dir.path(),
            ResolveOptions {
                actor_id: "human:alice".to_string(),
                reason: "picked theirs".to_string(),
            },
        )
        .unwrap();

        assert!(result.success);
        assert_eq!(result.conflicts_resolved, 0);
        assert!(result.resolution_commit_hash.is_some());
        assert_eq!(indexer.call_count(), 1);
        assert!(git.commits_made().iter().any(|m| m.starts_with("resolution:")));
    }

    #[test]
    fn rejects_unresolved_conflict_markers() {
        let git = FakeGitBuilder::new().build();
        git.set_rebase_in_progress(true);
        git.set_staged_files(vec![".gitgov/tasks/1.json".to_string()]);
        let identity = FakeIdentity::new("human:alice", "resolver");
        let indexer = FakeIndexer::succeeding();

        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("tasks")).unwrap();
        fs::write(
            dir.path().join("tasks/1.json"),
            "<<<<<<< HEAD\n{}\n=======\n{}\n>>>>>>> theirs\n",
        )
        .unwrap();

        let err = resolve_conflict(
            &git,
            &identity,
            &indexer,
            dir.path(),
            ResolveOptions {
                actor_id: "human:alice".to_string(),
                reason: "picked theirs".to_string(),
            },
        )
        .unwrap_err();

        assert!(matches!(err, SyncError::ConflictMarkersPresent { .. }));
    }

    #[test]
    fn signs_staged_records_and_preserves_checksums() {
        let git = FakeGitBuilder::new().build();
        git.set_rebase_in_progress(true);
        git.set_staged_files(vec![".gitgov/tasks/1.json".to_string()]);
        let identity = FakeIdentity::new("human:alice", "resolver");
        let indexer = FakeIndexer::succeeding();

        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("tasks")).unwrap();
        let record = Record {
            header: crate::record::RecordHeader {
                version: "1.0".to_string(),
                kind: crate::record::RecordKind::Task,
                payload_checksum: crate::record::payload_checksum(&serde_json::json!({"title": "x"})),
                signatures: vec![],
            },
            payload: serde_json::json!({"title": "x"}),
        };
        fs::write(
            dir.path().join("tasks/1.json"),
            serde_json::to_string_pretty(&record).unwrap(),
        )
        .unwrap();

        let result = resolve_conflict(
            &git,
            &identity,
            &indexer,
            dir.path(),
            ResolveOptions {
                actor_id: "human:alice".to_string(),
                reason: "picked theirs".to_string(),
            },
        )
        .unwrap();

        assert_eq!(result.conflicts_resolved, 1);
        let updated: Record =
            serde_json::from_str(&fs::read_to_string(dir.path().join("tasks/1.json")).unwrap()).unwrap();
        assert_eq!(updated.header.signatures.len(), 1);
        assert!(updated.checksum_matches());
    }

    #[test]
    fn resolution_commit_names_the_resolving_actor_and_reason() {
        let git = FakeGitBuilder::new().build();
        git.set_rebase_in_progress(true);
        let identity = FakeIdentity::new("human:alice", "resolver");
        let indexer = FakeIndexer::succeeding();

        let dir = tempfile::tempdir().unwrap();
        let result = resolve_conflict(
            &git,
            &identity,
            &indexer,
            dir.path(),
            ResolveOptions {
                actor_id: "human:bob".to_string(),
                reason: "kept the remote edit".to_string(),
            },
        )
        .unwrap();

        assert_eq!(result.resolved_by, "human:bob");
        assert_eq!(result.reason, "kept the remote edit");

        let commits = git.commits_made();
        assert_eq!(commits.len(), 1, "expected exactly the resolution commit");
        let message = &commits[0];
        assert!(message.starts_with("resolution:"));
        assert!(message.contains("human:bob"));
        assert!(message.contains("kept the remote edit"));
    }
}
