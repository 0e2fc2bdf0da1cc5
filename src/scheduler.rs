//! Pull scheduler (spec.md §4.8): periodically calls [`crate::engine::pull::pull_state`]
//! on a dedicated background thread, cascading its knobs from session
//! preferences over project defaults over hard defaults.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use chrono::Utc;

use crate::engine::pull::{pull_state, PullStateOptions};
use crate::error::SyncError;
use crate::ports::config::PullSchedulerConfig;
use crate::ports::{Config, Git, Indexer};
use crate::record::ConflictInfo;

const HARD_DEFAULT_ENABLED: bool = false;
const HARD_DEFAULT_INTERVAL_SECONDS: u64 = 30;
const HARD_DEFAULT_CONTINUE_ON_NETWORK_ERROR: bool = true;
const HARD_DEFAULT_STOP_ON_CONFLICT: bool = false;

const NETWORK_ERROR_INDICATORS: [&str; 4] = ["network", "fetch", "timeout", "connection"];

#[derive(Debug, Clone, Copy)]
struct ResolvedSchedulerConfig {
    enabled: bool,
    pull_interval_seconds: u64,
    continue_on_network_error: bool,
    stop_on_conflict: bool,
}

fn resolve_scheduler_config(config: &dyn Config) -> ResolvedSchedulerConfig {
    let session = config.load_session().sync_preferences.and_then(|p| p.pull_scheduler);
    let project = config
        .load_project()
        .state
        .and_then(|s| s.defaults)
        .and_then(|d| d.pull_scheduler);

    let merged = |pick: fn(&PullSchedulerConfig) -> Option<bool>, default: bool| -> bool {
        session
            .as_ref()
            .and_then(pick)
            .or_else(|| project.as_ref().and_then(pick))
            .unwrap_or(default)
    };

    ResolvedSchedulerConfig {
        enabled: merged(|c| c.enabled, HARD_DEFAULT_ENABLED),
        pull_interval_seconds: session
            .as_ref()
            .and_then(|c| c.pull_interval_seconds)
            .or_else(|| project.as_ref().and_then(|c| c.pull_interval_seconds))
            .unwrap_or(HARD_DEFAULT_INTERVAL_SECONDS),
        continue_on_network_error: merged(
            |c| c.continue_on_network_error,
            HARD_DEFAULT_CONTINUE_ON_NETWORK_ERROR,
        ),
        stop_on_conflict: merged(|c| c.stop_on_conflict, HARD_DEFAULT_STOP_ON_CONFLICT),
    }
}

#[derive(Debug, Clone)]
pub struct PullNowResult {
    pub success: bool,
    pub has_changes: bool,
    pub conflict_detected: bool,
    pub conflict_info: Option<ConflictInfo>,
    pub timestamp: String,
    pub error: Option<String>,
}

/// `PullScheduler` (spec.md §4.8). Owns no repository state directly; it
/// holds shared handles to the ports it delegates to so the background
/// timer thread can call `pullState` on its own.
pub struct PullScheduler {
    git: Arc<dyn Git>,
    config: Arc<dyn Config>,
    indexer: Arc<dyn Indexer>,
    gitgov_dir: std::path::PathBuf,
    in_flight: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    handle: Mutex<Option<(mpsc::Sender<()>, thread::JoinHandle<()>)>>,
}

impl PullScheduler {
    pub fn new(
        git: Arc<dyn Git>,
        config: Arc<dyn Config>,
        indexer: Arc<dyn Indexer>,
        gitgov_dir: std::path::PathBuf,
    ) -> Self {
        Self {
            git,
            config,
            indexer,
            gitgov_dir,
            in_flight: Arc::new(AtomicBool::new(false)),
            running: Arc::new(AtomicBool::new(false)),
            handle: Mutex::new(None),
        }
    }

    /// Idempotent: loads config; a no-op if already running or if the
    /// resolved config has `enabled=false`.
    pub fn start(self: &Arc<Self>) {
        let mut handle = self.handle.lock().expect("scheduler lock poisoned");
        if handle.is_some() {
            return;
        }

        let resolved = resolve_scheduler_config(self.config.as_ref());
        if !resolved.enabled {
            return;
        }

        let (tx, rx) = mpsc::channel::<()>();
        let scheduler = Arc::clone(self);
        let interval = Duration::from_secs(resolved.pull_interval_seconds.max(1));
        let stop_on_conflict = resolved.stop_on_conflict;

        self.running.store(true, Ordering::SeqCst);
        let join = thread::spawn(move || loop {
            match rx.recv_timeout(interval) {
                Ok(()) => break,
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
                Err(mpsc::RecvTimeoutError::Timeout) => match scheduler.pull_now() {
                    Ok(tick) => {
                        if tick.conflict_detected && stop_on_conflict {
                            scheduler.running.store(false, Ordering::SeqCst);
                            break;
                        }
                    }
                    Err(err) => log::error!("pull scheduler tick failed: {err}"),
                },
            }
        });

        *handle = Some((tx, join));
    }

    /// Cancels the timer; idempotent. An in-flight `pull_now()` runs to
    /// completion (spec.md §5).
    pub fn stop(&self) {
        let mut handle = self.handle.lock().expect("scheduler lock poisoned");
        if let Some((tx, join)) = handle.take() {
            let _ = tx.send(());
            let _ = join.join();
        }
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// `pullNow()` (spec.md §4.8). Safe to call directly (e.g. from a manual
    /// "sync now" command) even while the timer is armed; the in-flight
    /// flag is shared.
    ///
    /// Per spec.md §4.8/§7: a network-looking failure with
    /// `continueOnNetworkError` set is swallowed into a soft
    /// `PullNowResult { success: false, .. }`; every other hard failure
    /// (e.g. `UncommittedChanges`) is rethrown via `Result::Err` rather than
    /// downgraded to the same shape, so a direct caller can tell the two
    /// apart. The background timer thread (`start`'s loop) is the only
    /// caller with nowhere to rethrow to, and it logs-and-continues instead.
    pub fn pull_now(&self) -> Result<PullNowResult, SyncError> {
        let timestamp = Utc::now().to_rfc3339();

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(PullNowResult {
                success: true,
                has_changes: false,
                conflict_detected: false,
                conflict_info: None,
                timestamp,
                error: Some("Pull already in progress".to_string()),
            });
        }

        let resolved = resolve_scheduler_config(self.config.as_ref());
        let result = pull_state(
            self.git.as_ref(),
            self.config.as_ref(),
            self.indexer.as_ref(),
            &self.gitgov_dir,
            PullStateOptions {
                force_reindex: false,
                force: false,
            },
        );
        self.in_flight.store(false, Ordering::SeqCst);

        match result {
            Ok(outcome) => Ok(PullNowResult {
                success: outcome.success,
                has_changes: outcome.reindexed,
                conflict_detected: outcome.conflict_detected,
                conflict_info: outcome.conflict_info,
                timestamp,
                error: outcome.error,
            }),
            Err(err) => {
                let message = err.to_string();
                let looks_like_network_error = NETWORK_ERROR_INDICATORS
                    .iter()
                    .any(|indicator| message.to_ascii_lowercase().contains(indicator));
                if looks_like_network_error && resolved.continue_on_network_error {
                    Ok(PullNowResult {
                        success: false,
                        has_changes: false,
                        conflict_detected: false,
                        conflict_info: None,
                        timestamp,
                        error: Some(message),
                    })
                } else {
                    Err(err)
                }
            }
        }
    }
}

impl Drop for PullScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::config::{
        LastSession, ProjectConfig, SessionState, StateConfig, StateDefaults, SyncPreferences,
    };
    use crate::testing::{FakeConfig, FakeGitBuilder, FakeIndexer};

    #[test]
    fn hard_defaults_apply_when_config_is_empty() {
        let config = FakeConfig::new(ProjectConfig::default(), SessionState::default());
        let resolved = resolve_scheduler_config(&config);
        assert!(!resolved.enabled);
        assert_eq!(resolved.pull_interval_seconds, HARD_DEFAULT_INTERVAL_SECONDS);
        assert!(resolved.continue_on_network_error);
        assert!(!resolved.stop_on_conflict);
    }

    #[test]
    fn session_preferences_override_project_defaults() {
        let project = ProjectConfig {
            state: Some(StateConfig {
                branch: None,
                defaults: Some(StateDefaults {
                    pull_scheduler: Some(PullSchedulerConfig {
                        enabled: Some(true),
                        pull_interval_seconds: Some(60),
                        continue_on_network_error: None,
                        stop_on_conflict: None,
                    }),
                }),
            }),
        };
        let session = SessionState {
            last_session: Some(LastSession { actor_id: None }),
            sync_preferences: Some(SyncPreferences {
                pull_scheduler: Some(PullSchedulerConfig {
                    enabled: Some(false),
                    pull_interval_seconds: None,
                    continue_on_network_error: Some(false),
                    stop_on_conflict: Some(true),
                }),
            }),
            sync_status: Default::default(),
        };

        let config = FakeConfig::new(project, session);
        let resolved = resolve_scheduler_config(&config);
        assert!(!resolved.enabled);
        assert_eq!(resolved.pull_interval_seconds, 60);
        assert!(!resolved.continue_on_network_error);
        assert!(resolved.stop_on_conflict);
    }

    #[test]
    fn pull_now_still_runs_while_scheduler_itself_is_disabled() {
        let git: Arc<dyn Git> = Arc::new(
            FakeGitBuilder::new()
                .without_remote()
                .build(),
        );
        let config: Arc<dyn Config> =
            Arc::new(FakeConfig::new(ProjectConfig::default(), SessionState::default()));
        let indexer: Arc<dyn Indexer> = Arc::new(FakeIndexer::succeeding());

        let scheduler = PullScheduler::new(git, config, indexer, std::path::PathBuf::from("/tmp/.gitgov"));
        let result = scheduler.pull_now().expect("no remote configured is a soft failure, not a hard error");
        assert!(!result.success);
        assert!(!scheduler.is_running());
    }

    #[test]
    fn pull_now_rethrows_hard_errors_instead_of_downgrading_them() {
        // Staged changes on the state branch trip the step-5 sanity check in
        // `pull_state`, which is a hard `SyncError::UncommittedChanges`, not
        // a network blip `continueOnNetworkError` is meant to swallow.
        let git: Arc<dyn Git> = Arc::new(
            FakeGitBuilder::new()
                .with_current_branch("main")
                .with_local_branch("gitgov-state")
                .with_remote_branch("gitgov-state")
                .with_staged_files(vec![".gitgov/tasks/1.json".to_string()])
                .build(),
        );
        let config: Arc<dyn Config> =
            Arc::new(FakeConfig::new(ProjectConfig::default(), SessionState::default()));
        let indexer: Arc<dyn Indexer> = Arc::new(FakeIndexer::succeeding());

        let scheduler = PullScheduler::new(git, config, indexer, std::path::PathBuf::from("/tmp/.gitgov"));
        let err = scheduler.pull_now().unwrap_err();
        assert!(matches!(err, SyncError::UncommittedChanges { .. }));
    }

    #[test]
    fn start_is_a_no_op_when_disabled() {
        let git: Arc<dyn Git> = Arc::new(FakeGitBuilder::new().build());
        let config: Arc<dyn Config> =
            Arc::new(FakeConfig::new(ProjectConfig::default(), SessionState::default()));
        let indexer: Arc<dyn Indexer> = Arc::new(FakeIndexer::succeeding());

        let scheduler = Arc::new(PullScheduler::new(
            git,
            config,
            indexer,
            std::path::PathBuf::from("/tmp/.gitgov"),
        ));
        scheduler.start();
        assert!(!scheduler.is_running());
        scheduler.stop();
    }
}
