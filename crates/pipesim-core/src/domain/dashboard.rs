//! The full dashboard state owned by the controller.

use serde::{Deserialize, Serialize};

use super::branch::BranchState;
use super::environment::{Environment, EnvironmentState};
use super::metrics::MonitoringSample;
use super::pipeline::PipelineRun;
use super::version::VersionState;

/// Per-environment status, one slot per [`Environment`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Environments {
    pub staging: EnvironmentState,
    pub production: EnvironmentState,
}

impl Environments {
    pub fn get(&self, environment: Environment) -> &EnvironmentState {
        match environment {
            Environment::Staging => &self.staging,
            Environment::Production => &self.production,
        }
    }

    pub fn get_mut(&mut self, environment: Environment) -> &mut EnvironmentState {
        match environment {
            Environment::Staging => &mut self.staging,
            Environment::Production => &mut self.production,
        }
    }
}

/// Monitoring toggle and the last sample received.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MonitoringView {
    pub active: bool,
    pub latest: Option<MonitoringSample>,
}

/// Everything the view renders.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DashboardState {
    pub build: PipelineRun,
    pub environments: Environments,
    pub versions: VersionState,
    pub branch: BranchState,
    pub monitoring: MonitoringView,
}

impl DashboardState {
    /// Fresh state with the given starting versions.
    pub fn new(versions: VersionState) -> Self {
        Self {
            versions,
            ..Self::default()
        }
    }

    pub fn environment(&self, environment: Environment) -> &EnvironmentState {
        self.environments.get(environment)
    }

    pub fn environment_mut(&mut self, environment: Environment) -> &mut EnvironmentState {
        self.environments.get_mut(environment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::pipeline::RunStatus;

    #[test]
    fn test_environments_are_independent() {
        let mut state = DashboardState::default();
        state.environment_mut(Environment::Production).deploy_status = RunStatus::Failure;

        assert_eq!(
            state.environment(Environment::Production).deploy_status,
            RunStatus::Failure
        );
        assert_eq!(
            state.environment(Environment::Staging).deploy_status,
            RunStatus::Idle
        );
    }

    #[test]
    fn test_dashboard_serializes_environment_keys() {
        let state = DashboardState::new(VersionState::new("2.0.0", "1.9.0"));
        let json = serde_json::to_value(&state).expect("serialize");

        assert_eq!(json["versions"]["current"], "2.0.0");
        assert_eq!(json["environments"]["staging"]["deploy_status"], "idle");
        assert_eq!(json["environments"]["production"]["test_output"], "");
        assert_eq!(json["branch"]["active_branch"], "main");
        assert_eq!(json["monitoring"]["active"], false);
    }
}
