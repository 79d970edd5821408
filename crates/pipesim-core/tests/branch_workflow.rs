//! Branch and pull-request workflow through the controller.

use pipesim_core::{NoticeLevel, PipelineController, PullRequestStatus, SimConfig};

fn controller() -> PipelineController {
    PipelineController::new(SimConfig::instant())
}

#[test]
fn create_open_merge_ends_on_main_with_bumped_version() {
    let ctl = controller();

    assert_eq!(ctl.create_branch().level, NoticeLevel::Success);
    assert_eq!(ctl.snapshot().branch.active_branch, "feature/new-feature");

    assert_eq!(ctl.open_pull_request().level, NoticeLevel::Success);
    assert_eq!(
        ctl.snapshot().branch.pull_request_status,
        PullRequestStatus::Open
    );

    assert_eq!(ctl.merge_pull_request().level, NoticeLevel::Success);

    let state = ctl.snapshot();
    assert_eq!(state.branch.active_branch, "main");
    assert_eq!(state.branch.pull_request_status, PullRequestStatus::Merged);
    assert_eq!(state.versions.current, "1.1.0");
}

#[test]
fn merge_without_open_request_changes_nothing() {
    let ctl = controller();
    let before = ctl.snapshot();

    let notice = ctl.merge_pull_request();
    assert_eq!(notice.level, NoticeLevel::Warning);
    assert_eq!(notice.message, "No open pull request to merge.");
    assert_eq!(ctl.snapshot(), before);

    // Also from a feature branch with no request opened yet.
    ctl.create_branch();
    let before = ctl.snapshot();
    assert_eq!(ctl.merge_pull_request().level, NoticeLevel::Warning);
    assert_eq!(ctl.snapshot(), before);
}

#[test]
fn second_create_branch_is_reported() {
    let ctl = controller();
    ctl.create_branch();
    let before = ctl.snapshot();

    let notice = ctl.create_branch();
    assert_eq!(notice.level, NoticeLevel::Warning);
    assert!(notice.message.contains("feature/new-feature"));
    assert_eq!(ctl.snapshot(), before);
}

#[test]
fn open_twice_is_reported() {
    let ctl = controller();
    ctl.create_branch();
    ctl.open_pull_request();
    let before = ctl.snapshot();

    let notice = ctl.open_pull_request();
    assert_eq!(notice.level, NoticeLevel::Warning);
    assert_eq!(
        notice.message,
        "A pull request for feature/new-feature is already open."
    );
    assert_eq!(ctl.snapshot(), before);
}

#[test]
fn configured_branch_and_merge_version() {
    let mut config = SimConfig::instant();
    config.feature_branch = "feature/login".to_string();
    config.versions.merged = "2.0.0".to_string();
    let ctl = PipelineController::new(config);

    assert_eq!(ctl.create_branch().message, "Created new branch: feature/login");
    assert_eq!(
        ctl.open_pull_request().message,
        "Opened pull request for feature/login -> main"
    );
    ctl.merge_pull_request();
    assert_eq!(ctl.snapshot().versions.current, "2.0.0");
}
