//! Working-tree preservation scope (SPEC_FULL.md §9 Design Notes): the push
//! pipeline's step 4 ("preserve local tree"). Unlike the teacher's
//! `examples/prateek-w/vendor/worktrunk/src/sync.rs::SemaphoreGuard`, whose
//! `Drop` impl releases its permit on every exit path, this scope has no
//! `Drop` impl: restoring a stash requires the `&dyn Git` handle, which
//! isn't available to drop glue without a stored lifetime-bound reference,
//! so `push.rs` instead calls `pop_stash`/`restore_local_only_files`/
//! `overlay_full_tree` explicitly at every early return (every exit point in
//! `push.rs` has been checked to call `restore` or `pop_stash` directly).
//! The temp directory alone *is* RAII — `TempDir`'s own `Drop` removes it —
//! but the stash pop is manually-invoked cleanup, not scope-guard cleanup.

use std::cell::Cell;
use std::fs;
use std::path::Path;

use tempfile::TempDir;

use crate::git::error::GitError;
use crate::ports::Git;
use crate::whitelist::LOCAL_ONLY_FILES;

/// Captures the entire `.gitgov/` tree to a temp directory and stashes any
/// uncommitted tracked changes, so the publication phase can freely switch
/// branches and overwrite the working tree without losing local-only files,
/// keys, or in-progress edits.
pub struct PreservationScope {
    temp_dir: Option<TempDir>,
    stashed: bool,
    stash_popped: Cell<bool>,
}

impl PreservationScope {
    /// Step 4 of the push pipeline (spec.md §4.3).
    pub fn capture(git: &dyn Git, gitgov_dir: &Path) -> Result<Self, GitError> {
        let temp_dir = if gitgov_dir.exists() {
            let dir = TempDir::new().map_err(GitError::Io)?;
            copy_dir_recursive(gitgov_dir, dir.path()).map_err(GitError::Io)?;
            Some(dir)
        } else {
            None
        };

        let stash_ref = git.stash("gitgov-sync: preserving local changes before publish")?;

        Ok(Self {
            temp_dir,
            stashed: stash_ref.is_some(),
            stash_popped: Cell::new(false),
        })
    }

    pub fn has_captured_tree(&self) -> bool {
        self.temp_dir.is_some()
    }

    pub fn temp_path(&self) -> Option<&Path> {
        self.temp_dir.as_ref().map(TempDir::path)
    }

    /// Restoration step 8, "local-only overlay" branch: copy just the
    /// never-synced files back onto `.gitgov/` after the state branch
    /// already contributed its newly pulled files.
    pub fn restore_local_only_files(&self, gitgov_dir: &Path) -> std::io::Result<()> {
        let Some(temp) = self.temp_path() else {
            return Ok(());
        };
        fs::create_dir_all(gitgov_dir)?;
        for name in LOCAL_ONLY_FILES {
            let src = temp.join(name);
            if src.exists() {
                let dst = gitgov_dir.join(name);
                if src.is_dir() {
                    copy_dir_recursive(&src, &dst)?;
                } else {
                    fs::copy(&src, &dst)?;
                }
            }
        }
        Ok(())
    }

    /// Restoration step 8, "no implicit changes" branch: overlay the
    /// entire preserved tree back onto `.gitgov/`, preserving keys etc.
    pub fn overlay_full_tree(&self, gitgov_dir: &Path) -> std::io::Result<()> {
        let Some(temp) = self.temp_path() else {
            return Ok(());
        };
        fs::create_dir_all(gitgov_dir)?;
        copy_dir_recursive(temp, gitgov_dir)
    }

    /// Pop the stash created in [`Self::capture`], if any. Idempotent:
    /// calling it twice is a no-op on the second call.
    pub fn pop_stash(&self, git: &dyn Git) -> Result<(), GitError> {
        if self.stashed && !self.stash_popped.get() {
            git.stash_pop()?;
            self.stash_popped.set(true);
        }
        Ok(())
    }

    pub fn stash_pending(&self) -> bool {
        self.stashed && !self.stash_popped.get()
    }
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let dst_path = dst.join(entry.file_name());
        if file_type.is_dir() {
            copy_dir_recursive(&entry.path(), &dst_path)?;
        } else if file_type.is_file() {
            fs::copy(entry.path(), &dst_path)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_dir_recursive_preserves_nested_structure() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();

        fs::create_dir_all(src.path().join("tasks")).unwrap();
        fs::write(src.path().join("tasks/1.json"), "{}").unwrap();
        fs::write(src.path().join("index.json"), "{}").unwrap();

        copy_dir_recursive(src.path(), dst.path()).unwrap();

        assert!(dst.path().join("tasks/1.json").exists());
        assert!(dst.path().join("index.json").exists());
    }
}
