//! Dashboard controller: owns the state and runs one handler per user action.
//!
//! Every handler follows the same shape:
//! 1. Under the state lock, refuse the action if its target is already
//!    running, otherwise mark it running.
//! 2. Release the lock and await the backend stub.
//! 3. Re-acquire the lock and commit the result exactly once.
//!
//! Handlers never return errors. Stub failures become a `failure` status plus
//! a [`Notice`]; nothing propagates past the handler boundary.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::Instrument;

use crate::backend::{Backend, SimulatedBackend};
use crate::config::SimConfig;
use crate::domain::{
    BuildId, DashboardState, Environment, MonitoringView, RunStatus, SimError,
};
use crate::monitor::MonitoringPoller;
use crate::obs;

/// Severity of a user-facing notice.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Message shown to the user after an action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, message)
    }

    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// A user action the view can dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Build { source: String },
    Deploy(Environment),
    Test(Environment),
    Rollback(Environment),
    ToggleMonitoring,
    CreateBranch,
    OpenPullRequest,
    MergePullRequest,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Build { .. } => "build",
            Action::Deploy(_) => "deploy",
            Action::Test(_) => "test",
            Action::Rollback(_) => "rollback",
            Action::ToggleMonitoring => "monitor",
            Action::CreateBranch => "create_branch",
            Action::OpenPullRequest => "open_pull_request",
            Action::MergePullRequest => "merge_pull_request",
        }
    }
}

/// Status slot an async handler marks running while its stub call is in flight.
#[derive(Debug, Clone, Copy)]
enum Slot {
    Build,
    Deploy(Environment),
    Test(Environment),
    Rollback(Environment),
}

impl Slot {
    fn action(self) -> &'static str {
        match self {
            Slot::Build => "build",
            Slot::Deploy(_) => "deploy",
            Slot::Test(_) => "test",
            Slot::Rollback(_) => "rollback",
        }
    }

    fn target(self) -> &'static str {
        match self {
            Slot::Build => "pipeline",
            Slot::Deploy(env) | Slot::Test(env) | Slot::Rollback(env) => env.name(),
        }
    }

    fn status_mut(self, state: &mut DashboardState) -> &mut RunStatus {
        match self {
            Slot::Build => &mut state.build.status,
            Slot::Deploy(env) => &mut state.environment_mut(env).deploy_status,
            Slot::Test(env) => &mut state.environment_mut(env).test_status,
            Slot::Rollback(env) => &mut state.environment_mut(env).rollback_status,
        }
    }
}

/// Releases a running slot if the handler future is dropped mid-flight.
///
/// Handlers call [`InFlight::finish`] before committing; a guard dropped
/// without it marks the slot `failure` so the next dispatch is accepted.
struct InFlight<'a> {
    controller: &'a PipelineController,
    slot: Slot,
    finished: bool,
}

impl<'a> InFlight<'a> {
    fn new(controller: &'a PipelineController, slot: Slot) -> Self {
        Self {
            controller,
            slot,
            finished: false,
        }
    }

    fn finish(&mut self) {
        self.finished = true;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let mut state = self.controller.lock();
        *self.slot.status_mut(&mut state) = RunStatus::Failure;
        if let Slot::Build = self.slot {
            state.build.fail(CANCELLED_MESSAGE.to_string());
        }
        drop(state);
        obs::emit_action_cancelled(self.slot.action(), self.slot.target());
    }
}

/// Recorded as the build log when a build is abandoned before it finishes.
pub const CANCELLED_MESSAGE: &str = "Cancelled before completion.";

/// Single owner of the dashboard state.
pub struct PipelineController {
    config: SimConfig,
    backend: Arc<dyn Backend>,
    state: Mutex<DashboardState>,
    poller: MonitoringPoller,
}

impl PipelineController {
    /// Controller over a [`SimulatedBackend`] built from `config`.
    pub fn new(config: SimConfig) -> Self {
        let backend = Arc::new(SimulatedBackend::from_config(&config));
        Self::with_backend(config, backend)
    }

    /// Controller over an arbitrary backend.
    pub fn with_backend(config: SimConfig, backend: Arc<dyn Backend>) -> Self {
        let state = DashboardState::new(config.versions.initial());
        let poller = MonitoringPoller::new(Arc::clone(&backend), config.poll_interval());
        Self {
            config,
            backend,
            state: Mutex::new(state),
            poller,
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn poller(&self) -> &MonitoringPoller {
        &self.poller
    }

    fn lock(&self) -> MutexGuard<'_, DashboardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the current state, including the monitoring view.
    pub fn snapshot(&self) -> DashboardState {
        let mut snapshot = self.lock().clone();
        snapshot.monitoring = MonitoringView {
            active: self.poller.is_active(),
            latest: self.poller.latest(),
        };
        snapshot
    }

    /// Run any action.
    pub async fn dispatch(&self, action: Action) -> Notice {
        match action {
            Action::Build { source } => self.build(&source).await,
            Action::Deploy(environment) => self.deploy(environment).await,
            Action::Test(environment) => self.test(environment).await,
            Action::Rollback(environment) => self.rollback(environment).await,
            Action::ToggleMonitoring => self.toggle_monitoring(),
            Action::CreateBranch => self.create_branch(),
            Action::OpenPullRequest => self.open_pull_request(),
            Action::MergePullRequest => self.merge_pull_request(),
        }
    }

    fn reject(&self, action: &str, target: &str, error: SimError) -> Notice {
        obs::emit_action_rejected(action, target, &error);
        Notice::warning(error.to_string())
    }

    // -----------------------------------------------------------------------
    // Stub-backed actions
    // -----------------------------------------------------------------------

    /// Build `source`. Clears the previous log before the stub runs.
    pub async fn build(&self, source: &str) -> Notice {
        {
            let mut state = self.lock();
            if state.build.status.is_running() {
                drop(state);
                return self.reject("build", "pipeline", SimError::AlreadyRunning("build".into()));
            }
            state.build.start();
        }
        let mut in_flight = InFlight::new(self, Slot::Build);

        obs::emit_action_started("build", "pipeline");
        let started = Instant::now();
        let result = self
            .backend
            .build(source)
            .instrument(obs::action_span("build", "pipeline"))
            .await;

        let mut state = self.lock();
        in_flight.finish();
        let notice = match result {
            Ok(output) => {
                let build_id = BuildId::from_source(source);
                let notice = Notice::success(format!("Build {build_id} succeeded."));
                state.build.succeed(build_id, output.log);
                notice
            }
            Err(e) => {
                state.build.fail(e.to_string());
                Notice::error(e.to_string())
            }
        };
        obs::emit_action_finished(
            "build",
            "pipeline",
            !notice.is_error(),
            started.elapsed().as_millis() as u64,
        );
        notice
    }

    /// Deploy the last successful build (or the configured default id).
    pub async fn deploy(&self, environment: Environment) -> Notice {
        let target = environment.name();
        let build_id = {
            let mut state = self.lock();
            if state.environment(environment).deploy_status.is_running() {
                drop(state);
                return self.reject(
                    "deploy",
                    target,
                    SimError::AlreadyRunning(format!("deploy to {environment}")),
                );
            }
            state.environment_mut(environment).deploy_status = RunStatus::Running;
            state
                .build
                .build_id
                .clone()
                .unwrap_or_else(|| BuildId::new(self.config.default_build_id.clone()))
        };
        let mut in_flight = InFlight::new(self, Slot::Deploy(environment));

        obs::emit_action_started("deploy", target);
        let started = Instant::now();
        let result = self
            .backend
            .deploy(&build_id, environment)
            .instrument(obs::action_span("deploy", target))
            .await;

        let mut state = self.lock();
        in_flight.finish();
        let env_state = state.environment_mut(environment);
        let notice = match result {
            Ok(output) => {
                env_state.deploy_status = RunStatus::Success;
                Notice::success(output.message)
            }
            Err(e) => {
                env_state.deploy_status = RunStatus::Failure;
                Notice::error(format!("Deployment to {environment} failed: {e}"))
            }
        };
        obs::emit_action_finished(
            "deploy",
            target,
            !notice.is_error(),
            started.elapsed().as_millis() as u64,
        );
        notice
    }

    /// Run the integration tests in `environment`; the report or error text
    /// lands in that environment's `test_output`.
    pub async fn test(&self, environment: Environment) -> Notice {
        let target = environment.name();
        {
            let mut state = self.lock();
            if state.environment(environment).test_status.is_running() {
                drop(state);
                return self.reject(
                    "test",
                    target,
                    SimError::AlreadyRunning(format!("tests in {environment}")),
                );
            }
            state.environment_mut(environment).test_status = RunStatus::Running;
        }
        let mut in_flight = InFlight::new(self, Slot::Test(environment));

        obs::emit_action_started("test", target);
        let started = Instant::now();
        let result = self
            .backend
            .test(environment)
            .instrument(obs::action_span("test", target))
            .await;

        let mut state = self.lock();
        in_flight.finish();
        let env_state = state.environment_mut(environment);
        let notice = match result {
            Ok(output) => {
                env_state.test_status = RunStatus::Success;
                env_state.test_output = output.results;
                Notice::success(format!("Tests passed in {environment}."))
            }
            Err(e) => {
                env_state.test_status = RunStatus::Failure;
                env_state.test_output = e.to_string();
                Notice::error(e.to_string())
            }
        };
        obs::emit_action_finished(
            "test",
            target,
            !notice.is_error(),
            started.elapsed().as_millis() as u64,
        );
        notice
    }

    /// Roll `environment` back to the previous version. On success the
    /// version pointer moves to that version and the configured fallback
    /// becomes the next rollback target.
    pub async fn rollback(&self, environment: Environment) -> Notice {
        let target = environment.name();
        let previous_version = {
            let mut state = self.lock();
            if state.environment(environment).rollback_status.is_running() {
                drop(state);
                return self.reject(
                    "rollback",
                    target,
                    SimError::AlreadyRunning(format!("rollback of {environment}")),
                );
            }
            state.environment_mut(environment).rollback_status = RunStatus::Running;
            state.versions.previous.clone()
        };
        let mut in_flight = InFlight::new(self, Slot::Rollback(environment));

        obs::emit_action_started("rollback", target);
        let started = Instant::now();
        let result = self
            .backend
            .rollback(environment, &previous_version)
            .instrument(obs::action_span("rollback", target))
            .await;

        let mut state = self.lock();
        in_flight.finish();
        let notice = match result {
            Ok(output) => {
                state.environment_mut(environment).rollback_status = RunStatus::Success;
                state
                    .versions
                    .roll_back_to(&previous_version, &self.config.versions.rollback_fallback);
                Notice::success(output.message)
            }
            Err(e) => {
                state.environment_mut(environment).rollback_status = RunStatus::Failure;
                Notice::error(format!("Rollback to {environment} failed: {e}"))
            }
        };
        obs::emit_action_finished(
            "rollback",
            target,
            !notice.is_error(),
            started.elapsed().as_millis() as u64,
        );
        notice
    }

    // -----------------------------------------------------------------------
    // Monitoring
    // -----------------------------------------------------------------------

    pub fn start_monitoring(&self) -> Notice {
        if self.poller.start() {
            Notice::info("Monitoring started.")
        } else {
            Notice::info("Monitoring is already active.")
        }
    }

    pub fn stop_monitoring(&self) -> Notice {
        if self.poller.stop() {
            Notice::info("Monitoring stopped.")
        } else {
            Notice::info("Monitoring is not active.")
        }
    }

    pub fn toggle_monitoring(&self) -> Notice {
        if self.poller.toggle() {
            Notice::info("Monitoring started.")
        } else {
            Notice::info("Monitoring stopped.")
        }
    }

    // -----------------------------------------------------------------------
    // Branch / pull-request workflow
    // -----------------------------------------------------------------------

    pub fn create_branch(&self) -> Notice {
        let feature_branch = &self.config.feature_branch;
        let mut state = self.lock();
        match state.branch.create_branch(feature_branch) {
            Ok(()) => Notice::success(format!("Created new branch: {feature_branch}")),
            Err(e) => {
                drop(state);
                self.reject("create_branch", feature_branch, e.into())
            }
        }
    }

    pub fn open_pull_request(&self) -> Notice {
        let mut state = self.lock();
        match state.branch.open_pull_request() {
            Ok(()) => Notice::success(format!(
                "Opened pull request for {} -> main",
                state.branch.active_branch
            )),
            Err(e) => {
                let branch = state.branch.active_branch.clone();
                drop(state);
                self.reject("open_pull_request", &branch, e.into())
            }
        }
    }

    /// Merge the open pull request and install the merged version.
    pub fn merge_pull_request(&self) -> Notice {
        let mut state = self.lock();
        match state.branch.merge_pull_request() {
            Ok(_) => {
                state.versions.bump(&self.config.versions.merged);
                Notice::success("Merged pull request.  New version deployed!")
            }
            Err(e) => {
                let branch = state.branch.active_branch.clone();
                drop(state);
                self.reject("merge_pull_request", &branch, e.into())
            }
        }
    }
}

impl Drop for PipelineController {
    fn drop(&mut self) {
        self.poller.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PullRequestStatus, VersionState};
    use crate::random::SequenceRandom;

    fn controller(draws: Vec<f64>) -> PipelineController {
        let config = SimConfig::instant();
        let backend = SimulatedBackend::with_random(&config, Box::new(SequenceRandom::new(draws)));
        PipelineController::with_backend(config, Arc::new(backend))
    }

    #[tokio::test]
    async fn test_build_success_updates_run() {
        let ctl = controller(vec![]);
        let notice = ctl.build("// normal code").await;
        assert_eq!(notice.level, NoticeLevel::Success);

        let state = ctl.snapshot();
        assert_eq!(state.build.status, RunStatus::Success);
        assert!(state.build.log.contains("Build successful!"));
        assert_eq!(
            state.build.build_id,
            Some(BuildId::from_source("// normal code"))
        );
    }

    #[tokio::test]
    async fn test_build_failure_sets_log_to_error() {
        let ctl = controller(vec![]);
        let notice = ctl.build("has an error here").await;
        assert!(notice.is_error());
        assert_eq!(notice.message, "Build failed due to code error.");

        let state = ctl.snapshot();
        assert_eq!(state.build.status, RunStatus::Failure);
        assert_eq!(state.build.log, "Build failed due to code error.");
        assert!(state.build.build_id.is_none());
    }

    #[tokio::test]
    async fn test_deploy_uses_default_build_id_before_any_build() {
        let ctl = controller(vec![0.99]);
        let notice = ctl.deploy(Environment::Production).await;
        assert_eq!(
            notice.message,
            "Successfully deployed build 1234 to production environment."
        );
        assert_eq!(
            ctl.snapshot().environment(Environment::Production).deploy_status,
            RunStatus::Success
        );
    }

    #[tokio::test]
    async fn test_deploy_failure_notice() {
        let ctl = controller(vec![0.0]);
        let notice = ctl.deploy(Environment::Production).await;
        assert!(notice.is_error());
        assert_eq!(
            notice.message,
            "Deployment to production failed: Deployment to production failed.  Reason: Critical system overload."
        );
        let state = ctl.snapshot();
        assert_eq!(
            state.environment(Environment::Production).deploy_status,
            RunStatus::Failure
        );
        assert_eq!(
            state.environment(Environment::Staging).deploy_status,
            RunStatus::Idle
        );
    }

    #[tokio::test]
    async fn test_test_output_recorded_per_environment() {
        let ctl = controller(vec![0.01]);
        ctl.test(Environment::Staging).await;
        ctl.test(Environment::Production).await;

        let state = ctl.snapshot();
        let staging = state.environment(Environment::Staging);
        assert_eq!(staging.test_status, RunStatus::Failure);
        assert_eq!(staging.test_output, "Automated tests failed in staging.");

        let production = state.environment(Environment::Production);
        assert_eq!(production.test_status, RunStatus::Success);
        assert!(production.test_output.contains("[PASSED] Test: Database connection"));
    }

    #[tokio::test]
    async fn test_rollback_cascades_versions() {
        let ctl = controller(vec![0.5]);
        let notice = ctl.rollback(Environment::Production).await;
        assert_eq!(
            notice.message,
            "Successfully rolled back production environment to version 0.9.0."
        );
        assert_eq!(ctl.snapshot().versions, VersionState::new("0.9.0", "0.8.0"));
    }

    #[tokio::test]
    async fn test_rollback_failure_keeps_versions() {
        let ctl = controller(vec![0.05]);
        let notice = ctl.rollback(Environment::Production).await;
        assert_eq!(
            notice.message,
            "Rollback to production failed: Rollback failed: Could not restore database state."
        );
        let state = ctl.snapshot();
        assert_eq!(state.versions, VersionState::new("1.0.0", "0.9.0"));
        assert_eq!(
            state.environment(Environment::Production).rollback_status,
            RunStatus::Failure
        );
    }

    #[tokio::test]
    async fn test_branch_flow_via_dispatch() {
        let ctl = controller(vec![]);
        let created = ctl.dispatch(Action::CreateBranch).await;
        assert_eq!(created.message, "Created new branch: feature/new-feature");
        let opened = ctl.dispatch(Action::OpenPullRequest).await;
        assert_eq!(
            opened.message,
            "Opened pull request for feature/new-feature -> main"
        );
        let merged = ctl.dispatch(Action::MergePullRequest).await;
        assert_eq!(merged.message, "Merged pull request.  New version deployed!");

        let state = ctl.snapshot();
        assert_eq!(state.branch.active_branch, "main");
        assert_eq!(state.branch.pull_request_status, PullRequestStatus::Merged);
        assert_eq!(state.versions.current, "1.1.0");
        assert_eq!(state.versions.previous, "0.9.0");
    }

    #[tokio::test]
    async fn test_rejected_branch_actions_surface_notice() {
        let ctl = controller(vec![]);
        let before = ctl.snapshot();

        let notice = ctl.merge_pull_request();
        assert_eq!(notice.level, NoticeLevel::Warning);
        assert_eq!(notice.message, "No open pull request to merge.");

        let notice = ctl.open_pull_request();
        assert_eq!(notice.level, NoticeLevel::Warning);

        assert_eq!(ctl.snapshot(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_toggle_monitoring_reflected_in_snapshot() {
        let ctl = controller(vec![0.5]);
        assert!(!ctl.snapshot().monitoring.active);

        assert_eq!(ctl.toggle_monitoring().message, "Monitoring started.");
        assert!(ctl.snapshot().monitoring.active);
        assert_eq!(ctl.start_monitoring().message, "Monitoring is already active.");

        assert_eq!(ctl.toggle_monitoring().message, "Monitoring stopped.");
        assert!(!ctl.snapshot().monitoring.active);
    }
}
