//! Error taxonomy for the simulated pipeline.

use super::branch::BranchError;
use super::environment::Environment;

/// Pipeline simulation errors.
///
/// The stub failures (`Build`, `Deploy`, `Test`, `Rollback`) carry the exact
/// user-facing text produced by the backend. Controller handlers map every
/// variant into a [`Notice`](crate::controller::Notice); none of them is fatal.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("{message}")]
    Build { message: String },

    #[error("{message}")]
    Deploy {
        environment: Environment,
        message: String,
    },

    #[error("{message}")]
    Test {
        environment: Environment,
        message: String,
    },

    #[error("{message}")]
    Rollback {
        environment: Environment,
        message: String,
    },

    #[error("monitoring fetch failed: {0}")]
    MonitoringFetch(String),

    #[error("{0} is already running")]
    AlreadyRunning(String),

    #[error("unknown environment: {0} (expected staging or production)")]
    UnknownEnvironment(String),

    #[error(transparent)]
    Branch(#[from] BranchError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for pipeline simulation operations.
pub type Result<T> = std::result::Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stub_errors_display_backend_message_verbatim() {
        let err = SimError::Build {
            message: "Build failed due to code error.".to_string(),
        };
        assert_eq!(err.to_string(), "Build failed due to code error.");

        let err = SimError::Deploy {
            environment: Environment::Production,
            message: "Deployment to production failed.  Reason: Critical system overload."
                .to_string(),
        };
        assert!(err.to_string().starts_with("Deployment to production failed."));
    }

    #[test]
    fn test_already_running_display() {
        let err = SimError::AlreadyRunning("deploy to staging".to_string());
        assert_eq!(err.to_string(), "deploy to staging is already running");
    }

    #[test]
    fn test_branch_error_is_transparent() {
        let err: SimError = BranchError::NoOpenPullRequest.into();
        assert_eq!(err.to_string(), "No open pull request to merge.");
    }
}
