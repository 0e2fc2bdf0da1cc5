//! `Config` port adapter: reads the two JSON files spec.md §3 fixes as the
//! on-disk format (`.gitgov/config.json`, `.gitgov/.session.json`), layered
//! over hard defaults the way `examples/prateek-w/src/config.rs` layers its
//! TOML config over `Config::builder().set_default(...)`.

use std::path::{Path, PathBuf};

use config::{Config as ConfigBuilder, File, FileFormat};

use crate::ports::config::{Config, ProjectConfig, SessionState};

pub const DEFAULT_STATE_BRANCH: &str = "gitgov-state";

/// JSON-file-backed [`Config`] rooted at a `.gitgov/` directory.
#[derive(Debug, Clone)]
pub struct JsonConfig {
    gitgov_dir: PathBuf,
}

impl JsonConfig {
    pub fn at(gitgov_dir: impl Into<PathBuf>) -> Self {
        Self {
            gitgov_dir: gitgov_dir.into(),
        }
    }

    fn project_config_path(&self) -> PathBuf {
        self.gitgov_dir.join("config.json")
    }

    fn session_state_path(&self) -> PathBuf {
        self.gitgov_dir.join(".session.json")
    }

    fn load_json<T: Default + serde::de::DeserializeOwned>(path: &Path) -> T {
        if !path.exists() {
            return T::default();
        }

        let builder = ConfigBuilder::builder().add_source(File::new(
            path.to_string_lossy().as_ref(),
            FileFormat::Json,
        ));

        match builder.build().and_then(ConfigBuilder::try_deserialize) {
            Ok(value) => value,
            Err(err) => {
                log::warn!("failed to read {}: {err}; using defaults", path.display());
                T::default()
            }
        }
    }
}

impl Config for JsonConfig {
    fn load_project(&self) -> ProjectConfig {
        Self::load_json(&self.project_config_path())
    }

    fn load_session(&self) -> SessionState {
        Self::load_json(&self.session_state_path())
    }
}

/// `getStateBranchName()` (spec.md §4.1): reads `config.state.branch`;
/// defaults to `"gitgov-state"` if missing or config unreadable.
pub fn resolve_state_branch_name(config: &dyn Config) -> String {
    config
        .load_project()
        .state
        .and_then(|state| state.branch)
        .filter(|branch| !branch.is_empty())
        .unwrap_or_else(|| DEFAULT_STATE_BRANCH.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::config::ProjectConfig;
    use tempfile::TempDir;

    struct FakeConfig(ProjectConfig);

    impl Config for FakeConfig {
        fn load_project(&self) -> ProjectConfig {
            self.0.clone()
        }
        fn load_session(&self) -> SessionState {
            SessionState::default()
        }
    }

    #[test]
    fn defaults_when_branch_missing() {
        let config = FakeConfig(ProjectConfig::default());
        assert_eq!(resolve_state_branch_name(&config), "gitgov-state");
    }

    #[test]
    fn reads_configured_branch() {
        let config = FakeConfig(ProjectConfig {
            state: Some(crate::ports::config::StateConfig {
                branch: Some("custom-state".to_string()),
                defaults: None,
            }),
        });
        assert_eq!(resolve_state_branch_name(&config), "custom-state");
    }

    #[test]
    fn json_config_defaults_when_file_absent() {
        let dir = TempDir::new().unwrap();
        let config = JsonConfig::at(dir.path().join(".gitgov"));
        assert_eq!(resolve_state_branch_name(&config), "gitgov-state");
    }

    #[test]
    fn json_config_reads_written_file() {
        let dir = TempDir::new().unwrap();
        let gitgov = dir.path().join(".gitgov");
        std::fs::create_dir_all(&gitgov).unwrap();
        std::fs::write(
            gitgov.join("config.json"),
            r#"{"state": {"branch": "custom-state"}}"#,
        )
        .unwrap();

        let config = JsonConfig::at(gitgov);
        assert_eq!(resolve_state_branch_name(&config), "custom-state");
    }
}
