//! Monitoring samples.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One reading from the simulated metrics source. Replaced on every poll.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonitoringSample {
    /// CPU usage in percent (0-80).
    pub cpu_usage: f64,

    /// Memory usage in percent (0-90).
    pub memory_usage: f64,

    /// Response time in milliseconds (50-250).
    pub response_time_ms: f64,

    /// Errors per minute (0-4).
    pub errors_per_minute: u32,

    pub captured_at: DateTime<Utc>,
}

impl MonitoringSample {
    pub fn has_errors(&self) -> bool {
        self.errors_per_minute > 0
    }
}
