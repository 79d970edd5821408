//! Simulation configuration.
//!
//! Layered as: built-in defaults, then an optional TOML file, then
//! `PIPESIM_*` environment overrides. The CLI applies its own flags last.
//!
//! ```toml
//! seed = 7
//! time_scale = 0.1
//! poll_interval_ms = 5000
//!
//! [delays]
//! build_ms = 2000
//!
//! [failure_rates.deploy]
//! production = 0.5
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{Environment, Result, SimError, VersionState};

/// Env var naming a TOML config file.
pub const ENV_CONFIG_PATH: &str = "PIPESIM_CONFIG";
/// Env var overriding the random seed.
pub const ENV_SEED: &str = "PIPESIM_SEED";
/// Env var overriding the delay multiplier.
pub const ENV_TIME_SCALE: &str = "PIPESIM_TIME_SCALE";

/// Fixed stub latencies in milliseconds (before `time_scale`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StubDelays {
    pub build_ms: u64,
    pub deploy_ms: u64,
    pub test_ms: u64,
    pub rollback_ms: u64,
    pub monitor_ms: u64,
}

impl StubDelays {
    fn all(&self) -> [(&'static str, u64); 5] {
        [
            ("build_ms", self.build_ms),
            ("deploy_ms", self.deploy_ms),
            ("test_ms", self.test_ms),
            ("rollback_ms", self.rollback_ms),
            ("monitor_ms", self.monitor_ms),
        ]
    }
}

/// `ms` milliseconds multiplied by `time_scale`, or `None` if the result is
/// negative, not a number or too large for a [`Duration`].
pub fn scale_millis(ms: u64, time_scale: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(Duration::from_millis(ms).as_secs_f64() * time_scale).ok()
}

impl Default for StubDelays {
    fn default() -> Self {
        Self {
            build_ms: 2000,
            deploy_ms: 3000,
            test_ms: 1500,
            rollback_ms: 2500,
            monitor_ms: 1000,
        }
    }
}

/// Failure probability per environment for one stub.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EnvironmentRates {
    pub staging: f64,
    pub production: f64,
}

impl EnvironmentRates {
    pub fn for_env(&self, environment: Environment) -> f64 {
        match environment {
            Environment::Staging => self.staging,
            Environment::Production => self.production,
        }
    }
}

/// Failure probabilities for the randomized stubs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FailureRates {
    pub deploy: EnvironmentRates,
    pub test: EnvironmentRates,
    pub rollback: EnvironmentRates,
}

impl Default for FailureRates {
    fn default() -> Self {
        Self {
            deploy: EnvironmentRates {
                staging: 0.0,
                production: 0.2,
            },
            test: EnvironmentRates {
                staging: 0.1,
                production: 0.0,
            },
            rollback: EnvironmentRates {
                staging: 0.0,
                production: 0.1,
            },
        }
    }
}

impl FailureRates {
    /// Rates that never fail.
    pub fn never() -> Self {
        Self {
            deploy: EnvironmentRates::default(),
            test: EnvironmentRates::default(),
            rollback: EnvironmentRates::default(),
        }
    }

    fn all(&self) -> [(&'static str, f64); 6] {
        [
            ("deploy.staging", self.deploy.staging),
            ("deploy.production", self.deploy.production),
            ("test.staging", self.test.staging),
            ("test.production", self.test.production),
            ("rollback.staging", self.rollback.staging),
            ("rollback.production", self.rollback.production),
        ]
    }
}

/// Version strings used by the rollback and merge flows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct VersionDefaults {
    /// Version deployed at startup.
    pub current: String,
    /// Rollback target at startup.
    pub previous: String,
    /// Rollback target installed after every successful rollback.
    pub rollback_fallback: String,
    /// Version installed when a pull request merges.
    pub merged: String,
}

impl Default for VersionDefaults {
    fn default() -> Self {
        Self {
            current: "1.0.0".to_string(),
            previous: "0.9.0".to_string(),
            rollback_fallback: "0.8.0".to_string(),
            merged: "1.1.0".to_string(),
        }
    }
}

impl VersionDefaults {
    pub fn initial(&self) -> VersionState {
        VersionState::new(self.current.clone(), self.previous.clone())
    }
}

/// Complete simulation configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimConfig {
    pub delays: StubDelays,

    /// Time between monitoring fetches.
    pub poll_interval_ms: u64,

    pub failure_rates: FailureRates,

    /// Seed for reproducible runs. `None` uses non-seeded randomness.
    pub seed: Option<u64>,

    /// Multiplier applied to every delay and the poll interval.
    pub time_scale: f64,

    pub versions: VersionDefaults,

    /// Branch created by the create-branch action.
    pub feature_branch: String,

    /// Build id deployed before any build has succeeded.
    pub default_build_id: String,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            delays: StubDelays::default(),
            poll_interval_ms: 5000,
            failure_rates: FailureRates::default(),
            seed: None,
            time_scale: 1.0,
            versions: VersionDefaults::default(),
            feature_branch: "feature/new-feature".to_string(),
            default_build_id: "1234".to_string(),
        }
    }
}

impl SimConfig {
    /// Default configuration with every stub delay set to zero.
    ///
    /// The poll interval is kept so monitoring still ticks.
    pub fn instant() -> Self {
        Self {
            delays: StubDelays {
                build_ms: 0,
                deploy_ms: 0,
                test_ms: 0,
                rollback_ms: 0,
                monitor_ms: 0,
            },
            ..Self::default()
        }
    }

    /// Parse a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        Ok(toml::from_str(input)?)
    }

    /// Read and parse a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Resolve configuration from an optional file and the process environment.
    ///
    /// An explicit `path` wins over `PIPESIM_CONFIG`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var(ENV_CONFIG_PATH).ok();
        let mut config = match path.or(env_path.as_deref().map(Path::new)) {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `PIPESIM_SEED` / `PIPESIM_TIME_SCALE` using `lookup` to read variables.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(seed) = lookup(ENV_SEED) {
            let seed = seed
                .trim()
                .parse::<u64>()
                .map_err(|e| SimError::Config(format!("{ENV_SEED}={seed}: {e}")))?;
            self.seed = Some(seed);
        }
        if let Some(scale) = lookup(ENV_TIME_SCALE) {
            self.time_scale = scale
                .trim()
                .parse::<f64>()
                .map_err(|e| SimError::Config(format!("{ENV_TIME_SCALE}={scale}: {e}")))?;
        }
        Ok(())
    }

    /// Reject out-of-range rates, a non-positive time scale, a zero poll
    /// interval, or a time scale that pushes any delay past `Duration::MAX`.
    pub fn validate(&self) -> Result<()> {
        for (name, rate) in self.failure_rates.all() {
            if !(0.0..=1.0).contains(&rate) {
                return Err(SimError::Config(format!(
                    "failure rate {name} must be within [0, 1], got {rate}"
                )));
            }
        }
        if !self.time_scale.is_finite() || self.time_scale <= 0.0 {
            return Err(SimError::Config(format!(
                "time_scale must be a positive number, got {}",
                self.time_scale
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(SimError::Config(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        let delays = self.delays.all();
        let timed = delays
            .iter()
            .copied()
            .chain([("poll_interval_ms", self.poll_interval_ms)]);
        for (name, ms) in timed {
            if scale_millis(ms, self.time_scale).is_none() {
                return Err(SimError::Config(format!(
                    "{name} = {ms} scaled by time_scale {} overflows",
                    self.time_scale
                )));
            }
        }
        if self.feature_branch.trim().is_empty() {
            return Err(SimError::Config("feature_branch must not be empty".to_string()));
        }
        Ok(())
    }

    /// Scale a configured delay, saturating at `Duration::MAX` for a config
    /// that skipped [`validate`](Self::validate).
    pub fn scaled(&self, ms: u64) -> Duration {
        scale_millis(ms, self.time_scale).unwrap_or(Duration::MAX)
    }

    pub fn poll_interval(&self) -> Duration {
        self.scaled(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_match_simulation_constants() {
        let config = SimConfig::default();
        assert_eq!(config.delays.build_ms, 2000);
        assert_eq!(config.delays.deploy_ms, 3000);
        assert_eq!(config.delays.test_ms, 1500);
        assert_eq!(config.delays.rollback_ms, 2500);
        assert_eq!(config.delays.monitor_ms, 1000);
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.failure_rates.deploy.for_env(Environment::Production), 0.2);
        assert_eq!(config.failure_rates.deploy.for_env(Environment::Staging), 0.0);
        assert_eq!(config.failure_rates.test.for_env(Environment::Staging), 0.1);
        assert_eq!(config.failure_rates.rollback.for_env(Environment::Production), 0.1);
        assert_eq!(config.versions.initial(), VersionState::new("1.0.0", "0.9.0"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = SimConfig::from_toml_str(
            r#"
            seed = 7
            time_scale = 0.5

            [delays]
            build_ms = 10

            [failure_rates.deploy]
            production = 0.75
            "#,
        )
        .expect("parse");

        assert_eq!(config.seed, Some(7));
        assert_eq!(config.delays.build_ms, 10);
        assert_eq!(config.delays.deploy_ms, 3000);
        assert_eq!(config.failure_rates.deploy.production, 0.75);
        assert_eq!(config.failure_rates.test.staging, 0.1);
        assert_eq!(config.scaled(3000), Duration::from_millis(1500));
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        let err = SimConfig::from_toml_str("seed = \"nope\"").unwrap_err();
        assert!(matches!(err, SimError::ConfigParse(_)));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("pipesim.toml");
        std::fs::write(&path, "feature_branch = \"feature/login\"\n").expect("write");

        let config = SimConfig::from_file(&path).expect("load");
        assert_eq!(config.feature_branch, "feature/login");

        let missing = SimConfig::from_file(&dir.path().join("missing.toml"));
        assert!(matches!(missing, Err(SimError::Io(_))));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [(ENV_SEED, "99"), (ENV_TIME_SCALE, "0.25")].into();
        let mut config = SimConfig::default();
        config
            .apply_env(|key| vars.get(key).map(|v| v.to_string()))
            .expect("apply env");
        assert_eq!(config.seed, Some(99));
        assert_eq!(config.time_scale, 0.25);

        let mut config = SimConfig::default();
        let err = config
            .apply_env(|key| (key == ENV_SEED).then(|| "abc".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_SEED));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = SimConfig::default();
        config.failure_rates.test.staging = 1.5;
        assert!(config.validate().is_err());

        let mut config = SimConfig::default();
        config.time_scale = 0.0;
        assert!(config.validate().is_err());

        let mut config = SimConfig::default();
        config.time_scale = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = SimConfig::default();
        config.poll_interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = SimConfig::default();
        config.time_scale = 1e300;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("overflows"), "{err}");
        assert_eq!(config.poll_interval(), Duration::MAX);

        // Large but representable.
        let mut config = SimConfig::default();
        config.time_scale = 1e6;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_scale_millis_bounds() {
        assert_eq!(scale_millis(2000, 0.5), Some(Duration::from_secs(1)));
        assert_eq!(scale_millis(0, 1e300), Some(Duration::ZERO));
        assert_eq!(scale_millis(1000, 1e300), None);
        assert_eq!(scale_millis(1000, f64::NAN), None);
    }

    #[test]
    fn test_instant_has_zero_delays() {
        let config = SimConfig::instant();
        assert_eq!(config.scaled(config.delays.deploy_ms), Duration::ZERO);
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
    }
}
