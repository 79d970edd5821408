//! Current/previous version tracking for rollback and merge.

use serde::{Deserialize, Serialize};

/// Pointer to the current and previous version of the deployed application.
///
/// `previous` is the rollback target. No versioning scheme is enforced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VersionState {
    pub current: String,
    pub previous: String,
}

impl VersionState {
    pub fn new(current: impl Into<String>, previous: impl Into<String>) -> Self {
        Self {
            current: current.into(),
            previous: previous.into(),
        }
    }

    /// Apply a successful rollback: `target` (the version sent to the
    /// backend) becomes current and `fallback` becomes the next rollback target.
    ///
    /// `target` is taken when the rollback is dispatched, so a `previous`
    /// that moved while the rollback was in flight does not change what lands.
    pub fn roll_back_to(&mut self, target: &str, fallback: &str) {
        self.current = target.to_string();
        self.previous = fallback.to_string();
    }

    /// Replace the current version after a merge. `previous` is untouched.
    pub fn bump(&mut self, next: &str) {
        self.current = next.to_string();
    }
}

impl Default for VersionState {
    fn default() -> Self {
        Self::new("1.0.0", "0.9.0")
    }
}
