//! Structured observability hooks for dashboard actions and monitoring.
//!
//! This module provides:
//! - An action-scoped tracing span to `.instrument()` handler futures with
//! - Emission functions for action lifecycle and poller events
//!
//! Events are emitted at `info!` level unless noted (filter with `RUST_LOG`).

use tracing::info;

use crate::domain::MonitoringSample;

/// Span tagged with the action and its target.
///
/// Handlers are async, so the span is attached with `Instrument` rather than
/// entered (an entered guard must not be held across `.await`).
///
/// # Example
///
/// ```ignore
/// use tracing::Instrument;
/// backend.deploy(&id, env).instrument(action_span("deploy", "production")).await;
/// // stub logs now carry action=deploy target=production
/// ```
pub fn action_span(action: &str, target: &str) -> tracing::Span {
    tracing::info_span!("pipesim.action", action = %action, target = %target)
}

/// Emit event: an action was dispatched to its stub.
pub fn emit_action_started(action: &str, target: &str) {
    info!(event = "action.started", action = %action, target = %target);
}

/// Emit event: a stub call committed its result.
pub fn emit_action_finished(action: &str, target: &str, success: bool, duration_ms: u64) {
    info!(
        event = "action.finished",
        action = %action,
        target = %target,
        success = success,
        duration_ms = duration_ms,
    );
}

/// Emit event: an action was refused without touching state (warning level).
pub fn emit_action_rejected(action: &str, target: &str, reason: &dyn std::fmt::Display) {
    tracing::warn!(event = "action.rejected", action = %action, target = %target, reason = %reason);
}

/// Emit event: a handler was dropped before its stub call committed (warning level).
pub fn emit_action_cancelled(action: &str, target: &str) {
    tracing::warn!(event = "action.cancelled", action = %action, target = %target);
}

/// Emit event: the monitoring poller started.
pub fn emit_monitor_started(interval_ms: u64) {
    info!(event = "monitor.started", interval_ms = interval_ms);
}

/// Emit event: the monitoring poller stopped.
pub fn emit_monitor_stopped(fetches: u64) {
    info!(event = "monitor.stopped", fetches = fetches);
}

/// Emit event: a monitoring sample replaced the previous one (debug level).
pub fn emit_monitor_sample(sample: &MonitoringSample) {
    tracing::debug!(
        event = "monitor.sample",
        cpu_usage = sample.cpu_usage,
        memory_usage = sample.memory_usage,
        response_time_ms = sample.response_time_ms,
        errors_per_minute = sample.errors_per_minute,
    );
}

/// Emit event: a monitoring fetch failed; the last sample is kept (warning level).
pub fn emit_monitor_fetch_error(error: &dyn std::fmt::Display) {
    tracing::warn!(event = "monitor.fetch_error", error = %error);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_span_create() {
        // Just ensure the span can be created and entered without a subscriber
        let _entered = action_span("build", "pipeline").entered();
        emit_action_started("build", "pipeline");
    }
}
