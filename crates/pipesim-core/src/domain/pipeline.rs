//! Build runs and their status.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Status of a build, deploy, test or rollback target.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    #[default]
    Idle,
    Running,
    Success,
    Failure,
}

impl RunStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, RunStatus::Running)
    }

    pub fn name(&self) -> &'static str {
        match self {
            RunStatus::Idle => "idle",
            RunStatus::Running => "running",
            RunStatus::Success => "success",
            RunStatus::Failure => "failure",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identifier of a successful build, derived from the source it was built from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildId(String);

impl BuildId {
    /// Length of the hex prefix kept from the source digest.
    pub const LEN: usize = 12;

    /// Derive a build id from source text (SHA-256, truncated hex).
    pub fn from_source(source: &str) -> Self {
        let digest = hex::encode(Sha256::digest(source.as_bytes()));
        Self(digest[..Self::LEN].to_string())
    }

    /// Wrap an explicit id, e.g. the configured fallback.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BuildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The most recent build triggered from the dashboard.
///
/// Overwritten each time a new build starts.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PipelineRun {
    /// Identifier of the current (or last) build attempt.
    pub run_id: Option<Uuid>,

    /// Current build status.
    pub status: RunStatus,

    /// Build log on success, error text on failure. Cleared when a build starts.
    pub log: String,

    /// Id of the last build that succeeded. Survives failed builds.
    pub build_id: Option<BuildId>,

    /// When the current attempt started.
    pub started_at: Option<DateTime<Utc>>,

    /// When the current attempt finished (None while running).
    pub finished_at: Option<DateTime<Utc>>,
}

impl PipelineRun {
    /// Reset for a new attempt and mark it running.
    pub fn start(&mut self) -> Uuid {
        let run_id = Uuid::new_v4();
        self.run_id = Some(run_id);
        self.status = RunStatus::Running;
        self.log.clear();
        self.started_at = Some(Utc::now());
        self.finished_at = None;
        run_id
    }

    /// Commit a successful build.
    pub fn succeed(&mut self, build_id: BuildId, log: String) {
        self.status = RunStatus::Success;
        self.log = log;
        self.build_id = Some(build_id);
        self.finished_at = Some(Utc::now());
    }

    /// Commit a failed build.
    pub fn fail(&mut self, error: String) {
        self.status = RunStatus::Failure;
        self.log = error;
        self.finished_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_id_is_stable_and_truncated() {
        let a = BuildId::from_source("fn main() {}");
        let b = BuildId::from_source("fn main() {}");
        let c = BuildId::from_source("fn main() { loop {} }");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.as_str().len(), BuildId::LEN);
        assert!(a.as_str().chars().all(|ch| ch.is_ascii_hexdigit()));
    }

    #[test]
    fn test_pipeline_run_lifecycle() {
        let mut run = PipelineRun::default();
        assert_eq!(run.status, RunStatus::Idle);

        run.log = "stale".to_string();
        let id = run.start();
        assert_eq!(run.run_id, Some(id));
        assert!(run.status.is_running());
        assert!(run.log.is_empty());
        assert!(run.finished_at.is_none());

        run.succeed(BuildId::new("abc"), "ok".to_string());
        assert_eq!(run.status, RunStatus::Success);
        assert_eq!(run.build_id, Some(BuildId::new("abc")));
        assert!(run.finished_at.is_some());
    }

    #[test]
    fn test_failed_build_keeps_last_good_build_id() {
        let mut run = PipelineRun::default();
        run.start();
        run.succeed(BuildId::new("good"), "ok".to_string());
        run.start();
        run.fail("boom".to_string());
        assert_eq!(run.status, RunStatus::Failure);
        assert_eq!(run.log, "boom");
        assert_eq!(run.build_id, Some(BuildId::new("good")));
    }

    #[test]
    fn test_run_status_serde() {
        let json = serde_json::to_string(&RunStatus::Failure).expect("serialize");
        assert_eq!(json, "\"failure\"");
    }
}
