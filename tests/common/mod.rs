//! Test harness: hermetic git repositories (with a bare `origin` remote) for
//! this crate's integration tests.
//!
//! Adapted from `examples/prateek-w/tests/common/mod.rs::TestRepo`
//! (deterministic `GIT_AUTHOR_DATE`/`GIT_CONFIG_GLOBAL` environment,
//! temp-dir isolation), extended with a bare remote since push/pull/fetch
//! against a real remote is exactly what this crate's pipelines exercise.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Once;

use tempfile::TempDir;

static LOGGER_INIT: Once = Once::new();

pub struct TestRepo {
    _temp_dir: TempDir,
    root: PathBuf,
    _remote_dir: Option<TempDir>,
}

impl TestRepo {
    /// A repo with one commit on `main` and no remote configured.
    pub fn new() -> Self {
        LOGGER_INIT.call_once(|| {
            let _ = env_logger::builder().is_test(true).try_init();
        });

        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let root = temp_dir.path().join("work");
        fs::create_dir(&root).expect("failed to create work directory");
        let root = root.canonicalize().expect("failed to canonicalize temp path");

        let repo = Self {
            _temp_dir: temp_dir,
            root,
            _remote_dir: None,
        };

        repo.git(&["init", "-b", "main"]);
        repo.git(&["config", "user.name", "Test User"]);
        repo.git(&["config", "user.email", "test@example.com"]);
        repo.write_file("README.md", "hello\n");
        repo.git(&["add", "."]);
        repo.git(&["commit", "-m", "initial commit"]);

        repo
    }

    /// A repo like [`Self::new`], with `origin` pointing at a fresh bare
    /// repository and `main` already pushed.
    pub fn with_remote() -> Self {
        let mut repo = Self::new();
        let remote_dir = TempDir::new().expect("failed to create remote temp directory");
        let remote_path = remote_dir.path().join("origin.git");

        let mut cmd = Command::new("git");
        Self::isolate_env(&mut cmd);
        cmd.args(["init", "--bare", "-b", "main"])
            .arg(&remote_path)
            .output()
            .expect("failed to init bare remote");

        repo.git(&["remote", "add", "origin", remote_path.to_str().unwrap()]);
        repo.git(&["push", "-u", "origin", "main"]);
        repo._remote_dir = Some(remote_dir);
        repo
    }

    fn isolate_env(cmd: &mut Command) {
        cmd.env("GIT_CONFIG_GLOBAL", "/dev/null");
        cmd.env("GIT_CONFIG_SYSTEM", "/dev/null");
        cmd.env("GIT_AUTHOR_NAME", "Test User");
        cmd.env("GIT_AUTHOR_EMAIL", "test@example.com");
        cmd.env("GIT_COMMITTER_NAME", "Test User");
        cmd.env("GIT_COMMITTER_EMAIL", "test@example.com");
        cmd.env("GIT_AUTHOR_DATE", "2026-01-01T00:00:00Z");
        cmd.env("GIT_COMMITTER_DATE", "2026-01-01T00:00:00Z");
        cmd.env("LC_ALL", "C");
        cmd.env("LANG", "C");
    }

    pub fn git(&self, args: &[&str]) -> (bool, String, String) {
        let mut cmd = Command::new("git");
        Self::isolate_env(&mut cmd);
        let output = cmd
            .args(args)
            .current_dir(&self.root)
            .output()
            .unwrap_or_else(|err| panic!("failed to run git {args:?}: {err}"));
        (
            output.status.success(),
            String::from_utf8_lossy(&output.stdout).to_string(),
            String::from_utf8_lossy(&output.stderr).to_string(),
        )
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn gitgov_dir(&self) -> PathBuf {
        self.root.join(".gitgov")
    }

    pub fn write_file(&self, relative: &str, content: &str) {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("failed to create parent directory");
        }
        fs::write(&path, content).expect("failed to write test fixture file");
    }

    pub fn read_file(&self, relative: &str) -> String {
        fs::read_to_string(self.root.join(relative))
            .unwrap_or_else(|_| panic!("failed to read {relative}"))
    }

    pub fn file_exists(&self, relative: &str) -> bool {
        self.root.join(relative).exists()
    }

    pub fn commit_all(&self, message: &str) {
        self.git(&["add", "-A"]);
        self.git(&["commit", "-m", message]);
    }

    /// List every `.gitgov/`-scoped path tracked at `branch`'s tip, as seen
    /// from this working copy's object store (works against the local
    /// clone of `origin/<branch>` without checking it out).
    pub fn ls_tree_gitgov(&self, branch: &str) -> Vec<String> {
        let (ok, stdout, _) = self.git(&["ls-tree", "-r", "--name-only", branch, "--", ".gitgov"]);
        if !ok {
            return Vec::new();
        }
        stdout.lines().map(str::to_string).collect()
    }
}
