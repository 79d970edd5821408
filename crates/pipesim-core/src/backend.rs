//! Backend operations consumed by the controller, and their simulated stubs.
//!
//! [`Backend`] is the boundary a real build system, deployment target, test
//! runner and metrics source would sit behind. [`SimulatedBackend`] stands in
//! for all of them: each call sleeps for its configured delay, then returns a
//! canned result or a randomly injected failure.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use crate::config::{self, FailureRates, SimConfig, StubDelays};
use crate::domain::{BuildId, Environment, MonitoringSample, Result, SimError};
use crate::random::{self, RandomSource};

/// Substring that makes a build fail.
pub const BUILD_ERROR_MARKER: &str = "error";

pub const BUILD_FAILED_MESSAGE: &str = "Build failed due to code error.";

pub const BUILD_LOG: &str = "Building application...
Compiling code...
Running tests...
Tests passed.
Packaging application...
Build successful!";

pub const TEST_REPORT: &str = "Running integration tests...
[PASSED] Test: User authentication
[PASSED] Test: Data validation
[PASSED] Test: API response time
[PASSED] Test: Database connection
All tests passed.";

pub const ROLLBACK_FAILED_MESSAGE: &str = "Rollback failed: Could not restore database state.";

/// Output of a successful build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutput {
    pub log: String,
}

/// Output of a successful deploy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployOutput {
    pub message: String,
}

/// Output of a successful test run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestOutput {
    pub results: String,
}

/// Output of a successful rollback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollbackOutput {
    pub message: String,
}

/// Operations the dashboard invokes. Failures come back as the matching
/// [`SimError`] variant carrying the user-facing message.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn build(&self, source: &str) -> Result<BuildOutput>;

    async fn deploy(&self, build_id: &BuildId, environment: Environment) -> Result<DeployOutput>;

    async fn test(&self, environment: Environment) -> Result<TestOutput>;

    async fn rollback(
        &self,
        environment: Environment,
        previous_version: &str,
    ) -> Result<RollbackOutput>;

    async fn sample_metrics(&self) -> Result<MonitoringSample>;
}

/// Stub backend with fixed delays and injected failures.
pub struct SimulatedBackend {
    delays: StubDelays,
    time_scale: f64,
    failure_rates: FailureRates,
    rng: Box<dyn RandomSource>,
}

impl SimulatedBackend {
    /// Build from configuration, seeding the random source from `config.seed`.
    pub fn from_config(config: &SimConfig) -> Self {
        Self::with_random(config, random::from_seed(config.seed))
    }

    /// Build from configuration with an explicit random source.
    pub fn with_random(config: &SimConfig, rng: Box<dyn RandomSource>) -> Self {
        Self {
            delays: config.delays.clone(),
            time_scale: config.time_scale,
            failure_rates: config.failure_rates,
            rng,
        }
    }

    async fn pause(&self, ms: u64) {
        let delay = config::scale_millis(ms, self.time_scale).unwrap_or(Duration::MAX);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    /// Draw only when the rate is non-zero so zero-rate targets never consume randomness.
    fn should_fail(&self, rate: f64) -> bool {
        rate > 0.0 && self.rng.next_f64() < rate
    }
}

#[async_trait]
impl Backend for SimulatedBackend {
    async fn build(&self, source: &str) -> Result<BuildOutput> {
        self.pause(self.delays.build_ms).await;
        if source.contains(BUILD_ERROR_MARKER) {
            debug!(source_len = source.len(), "build stub rejected source");
            return Err(SimError::Build {
                message: BUILD_FAILED_MESSAGE.to_string(),
            });
        }
        Ok(BuildOutput {
            log: BUILD_LOG.to_string(),
        })
    }

    async fn deploy(&self, build_id: &BuildId, environment: Environment) -> Result<DeployOutput> {
        self.pause(self.delays.deploy_ms).await;
        if self.should_fail(self.failure_rates.deploy.for_env(environment)) {
            return Err(SimError::Deploy {
                environment,
                message: format!(
                    "Deployment to {environment} failed.  Reason: Critical system overload."
                ),
            });
        }
        Ok(DeployOutput {
            message: format!(
                "Successfully deployed build {build_id} to {environment} environment."
            ),
        })
    }

    async fn test(&self, environment: Environment) -> Result<TestOutput> {
        self.pause(self.delays.test_ms).await;
        if self.should_fail(self.failure_rates.test.for_env(environment)) {
            return Err(SimError::Test {
                environment,
                message: format!("Automated tests failed in {environment}."),
            });
        }
        Ok(TestOutput {
            results: TEST_REPORT.to_string(),
        })
    }

    async fn rollback(
        &self,
        environment: Environment,
        previous_version: &str,
    ) -> Result<RollbackOutput> {
        self.pause(self.delays.rollback_ms).await;
        if self.should_fail(self.failure_rates.rollback.for_env(environment)) {
            return Err(SimError::Rollback {
                environment,
                message: ROLLBACK_FAILED_MESSAGE.to_string(),
            });
        }
        Ok(RollbackOutput {
            message: format!(
                "Successfully rolled back {environment} environment to version {previous_version}."
            ),
        })
    }

    async fn sample_metrics(&self) -> Result<MonitoringSample> {
        self.pause(self.delays.monitor_ms).await;
        Ok(MonitoringSample {
            cpu_usage: self.rng.next_f64() * 80.0,
            memory_usage: self.rng.next_f64() * 90.0,
            response_time_ms: self.rng.next_f64() * 200.0 + 50.0,
            errors_per_minute: (self.rng.next_f64() * 5.0).floor() as u32,
            captured_at: Utc::now(),
        })
    }
}
