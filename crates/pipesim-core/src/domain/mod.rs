//! Domain models for the simulated pipeline.
//!
//! Canonical definitions for the dashboard entities:
//! - `PipelineRun`: the current build
//! - `EnvironmentState`: deploy/test/rollback status per environment
//! - `VersionState`: current and rollback-target versions
//! - `BranchState`: branch and pull-request workflow
//! - `MonitoringSample`: latest metrics reading

pub mod branch;
pub mod dashboard;
pub mod environment;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod version;

// Re-export main types and errors
pub use branch::{BranchError, BranchState, PullRequestStatus, MAIN_BRANCH};
pub use dashboard::{DashboardState, Environments, MonitoringView};
pub use environment::{Environment, EnvironmentState};
pub use error::{Result, SimError};
pub use metrics::MonitoringSample;
pub use pipeline::{BuildId, PipelineRun, RunStatus};
pub use version::VersionState;
