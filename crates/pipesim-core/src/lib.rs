//! pipesim Core Library
//!
//! Simulated CI/CD pipeline: build, deploy, test and rollback stubs with
//! injected failures, a branch/pull-request workflow, and a cancellable
//! monitoring poller, all driven through a single [`PipelineController`].

pub mod backend;
pub mod config;
pub mod controller;
pub mod domain;
pub mod monitor;
pub mod obs;
pub mod random;
pub mod telemetry;

pub use backend::{
    Backend, BuildOutput, DeployOutput, RollbackOutput, SimulatedBackend, TestOutput,
};
pub use config::{EnvironmentRates, FailureRates, SimConfig, StubDelays, VersionDefaults};
pub use controller::{Action, Notice, NoticeLevel, PipelineController, CANCELLED_MESSAGE};
pub use domain::{
    BranchError, BranchState, BuildId, DashboardState, Environment, EnvironmentState,
    Environments, MonitoringSample, MonitoringView, PipelineRun, PullRequestStatus, Result,
    RunStatus, SimError, VersionState, MAIN_BRANCH,
};
pub use monitor::MonitoringPoller;
pub use random::{RandomSource, SeededRandom, SequenceRandom, ThreadRandom};
pub use telemetry::init_tracing;
