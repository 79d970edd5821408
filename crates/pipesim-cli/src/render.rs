//! Text rendering of notices, samples and dashboard state.

use std::fmt::Write;

use pipesim_core::{DashboardState, Environment, MonitoringSample, Notice, NoticeLevel};

pub fn render_notice(notice: &Notice) -> String {
    let tag = match notice.level {
        NoticeLevel::Info => "info",
        NoticeLevel::Success => "ok",
        NoticeLevel::Warning => "warn",
        NoticeLevel::Error => "error",
    };
    format!("[{tag}] {}", notice.message)
}

pub fn render_sample(sample: &MonitoringSample) -> String {
    format!(
        "cpu {:.1}%  memory {:.1}%  response {:.0}ms  errors {}/min",
        sample.cpu_usage, sample.memory_usage, sample.response_time_ms, sample.errors_per_minute
    )
}

pub fn render_state(state: &DashboardState) -> String {
    let mut out = String::new();

    let build_id = state
        .build
        .build_id
        .as_ref()
        .map(|id| format!(" (last good build {id})"))
        .unwrap_or_default();
    let _ = writeln!(out, "Build:        {}{}", state.build.status, build_id);
    for line in state.build.log.lines() {
        let _ = writeln!(out, "  | {line}");
    }

    let _ = writeln!(
        out,
        "Versions:     current {}, previous {}",
        state.versions.current, state.versions.previous
    );
    let _ = writeln!(
        out,
        "Branch:       {} (pull request: {})",
        state.branch.active_branch, state.branch.pull_request_status
    );

    let _ = writeln!(out, "Environments:");
    for environment in Environment::ALL {
        let env = state.environment(environment);
        let _ = writeln!(
            out,
            "  {:<11} deploy={:<8} test={:<8} rollback={}",
            environment.name(),
            env.deploy_status.name(),
            env.test_status.name(),
            env.rollback_status.name()
        );
        for line in env.test_output.lines() {
            let _ = writeln!(out, "    | {line}");
        }
    }

    let monitoring = &state.monitoring;
    let status = if monitoring.active { "active" } else { "stopped" };
    match (&monitoring.latest, monitoring.active) {
        (Some(sample), true) => {
            let _ = writeln!(out, "Monitoring:   {status}; {}", render_sample(sample));
        }
        (None, true) => {
            let _ = writeln!(out, "Monitoring:   {status}; fetching metrics...");
        }
        _ => {
            let _ = writeln!(out, "Monitoring:   {status}");
        }
    }

    out
}
