use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Scheduler knobs, cascaded session -> project -> hard default (spec.md §4.8).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullSchedulerConfig {
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default, rename = "pullIntervalSeconds")]
    pub pull_interval_seconds: Option<u64>,
    #[serde(default, rename = "continueOnNetworkError")]
    pub continue_on_network_error: Option<bool>,
    #[serde(default, rename = "stopOnConflict")]
    pub stop_on_conflict: Option<bool>,
}

impl Default for PullSchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: None,
            pull_interval_seconds: None,
            continue_on_network_error: None,
            stop_on_conflict: None,
        }
    }
}

/// `.gitgov/config.json` as the engine cares about it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub state: Option<StateConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateConfig {
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub defaults: Option<StateDefaults>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateDefaults {
    #[serde(default, rename = "pullScheduler")]
    pub pull_scheduler: Option<PullSchedulerConfig>,
}

/// Per-actor sync status tracked in `.gitgov/.session.json` (spec.md §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncStatus {
    pub status: SyncStatusKind,
    #[serde(default, rename = "lastSyncPush")]
    pub last_sync_push: Option<String>,
    #[serde(default, rename = "lastSyncPull")]
    pub last_sync_pull: Option<String>,
    #[serde(default, rename = "lastError")]
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatusKind {
    Synced,
    Pending,
    Conflict,
}

/// `.gitgov/.session.json` as the engine cares about it. The engine only
/// ever reads this (the scheduler, to resolve `syncPreferences`); callers
/// own writes (spec.md §5 Shared-resource policy).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionState {
    #[serde(default, rename = "lastSession")]
    pub last_session: Option<LastSession>,
    #[serde(default, rename = "syncPreferences")]
    pub sync_preferences: Option<SyncPreferences>,
    #[serde(default, rename = "syncStatus")]
    pub sync_status: HashMap<String, SyncStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LastSession {
    #[serde(default, rename = "actorId")]
    pub actor_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncPreferences {
    #[serde(default, rename = "pullScheduler")]
    pub pull_scheduler: Option<PullSchedulerConfig>,
}

/// Project config and session state loading, as the engine needs them.
///
/// The engine never persists anything through this port (spec.md §5): it is
/// a read-only collaborator from the engine's point of view, even though the
/// concrete JSON adapter shipped in this crate ([`crate::config::JsonConfig`])
/// is also usable by callers to persist session state themselves.
pub trait Config: Send + Sync {
    fn load_project(&self) -> ProjectConfig;
    fn load_session(&self) -> SessionState;
}
