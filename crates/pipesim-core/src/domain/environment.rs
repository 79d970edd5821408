//! Deployment environments and their per-environment status.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::SimError;
use super::pipeline::RunStatus;

/// A named deployment target with independent status tracking.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Staging,
    Production,
}

impl Environment {
    /// Every environment, in display order.
    pub const ALL: [Environment; 2] = [Environment::Staging, Environment::Production];

    /// Lowercase name used in messages and on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Environment {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "staging" => Ok(Environment::Staging),
            "production" => Ok(Environment::Production),
            other => Err(SimError::UnknownEnvironment(other.to_string())),
        }
    }
}

/// Status of a single environment.
///
/// Starts idle and empty; each field is mutated only by its own handler.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnvironmentState {
    /// Status of the last deploy to this environment.
    pub deploy_status: RunStatus,

    /// Status of the last test run in this environment.
    pub test_status: RunStatus,

    /// Report or error text from the last test run (empty until tests run).
    pub test_output: String,

    /// Status of the last rollback of this environment.
    pub rollback_status: RunStatus,
}
