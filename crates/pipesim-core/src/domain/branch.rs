//! Simulated git branch and pull-request workflow.
//!
//! State machine over `{active_branch, pull_request_status}`:
//! - `create_branch`: only from `main`
//! - `open_pull_request`: only from a feature branch with no open request
//! - `merge_pull_request`: only with an open request; returns to `main`
//!
//! Rejected transitions return a [`BranchError`] and leave state untouched.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of the integration branch.
pub const MAIN_BRANCH: &str = "main";

/// Lifecycle of the simulated pull request.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PullRequestStatus {
    #[default]
    Idle,
    Open,
    Merged,
}

impl fmt::Display for PullRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PullRequestStatus::Idle => "idle",
            PullRequestStatus::Open => "open",
            PullRequestStatus::Merged => "merged",
        })
    }
}

/// Rejected branch workflow transitions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BranchError {
    #[error("Already on branch {branch}. New branches can only be created from main.")]
    NotOnMain { branch: String },

    #[error("Cannot open a pull request from main. Create a feature branch first.")]
    OpenFromMain,

    #[error("A pull request for {branch} is already open.")]
    PullRequestAlreadyOpen { branch: String },

    #[error("No open pull request to merge.")]
    NoOpenPullRequest,
}

/// Active branch and pull-request status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BranchState {
    pub active_branch: String,
    pub pull_request_status: PullRequestStatus,
}

impl Default for BranchState {
    fn default() -> Self {
        Self {
            active_branch: MAIN_BRANCH.to_string(),
            pull_request_status: PullRequestStatus::Idle,
        }
    }
}

impl BranchState {
    pub fn on_main(&self) -> bool {
        self.active_branch == MAIN_BRANCH
    }

    /// Switch from `main` to `feature_branch`.
    pub fn create_branch(&mut self, feature_branch: &str) -> Result<(), BranchError> {
        if !self.on_main() {
            return Err(BranchError::NotOnMain {
                branch: self.active_branch.clone(),
            });
        }
        self.active_branch = feature_branch.to_string();
        Ok(())
    }

    /// Open a pull request from the active feature branch into `main`.
    pub fn open_pull_request(&mut self) -> Result<(), BranchError> {
        if self.on_main() {
            return Err(BranchError::OpenFromMain);
        }
        if self.pull_request_status == PullRequestStatus::Open {
            return Err(BranchError::PullRequestAlreadyOpen {
                branch: self.active_branch.clone(),
            });
        }
        self.pull_request_status = PullRequestStatus::Open;
        Ok(())
    }

    /// Merge the open pull request and switch back to `main`.
    ///
    /// Returns the name of the branch that was merged.
    pub fn merge_pull_request(&mut self) -> Result<String, BranchError> {
        if self.pull_request_status != PullRequestStatus::Open {
            return Err(BranchError::NoOpenPullRequest);
        }
        self.pull_request_status = PullRequestStatus::Merged;
        Ok(std::mem::replace(
            &mut self.active_branch,
            MAIN_BRANCH.to_string(),
        ))
    }
}
