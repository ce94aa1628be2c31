//! Test: failure propagation through dependencies and parallel groups

use crate::helpers::*;
use pstasks::core::{PackError, RunStatus, TaskState};

#[tokio::test]
async fn test_source_copy_failure_stops_packaging() {
    // plugin/ exists, src/ does not
    let project = TestProject::new()
        .with_config(FULL_CONFIG)
        .write("plugin/index.html", "<p>plugin</p>");
    let mocks = Mocks::new();
    let session = project.session(None, mocks.with_local_fs()).unwrap();

    let report = session.run("build-no-img").await;

    let err = report.error.clone().expect("build-src should fail");
    assert_eq!(err.failing_tasks(), vec!["build-src"]);
    assert!(matches!(report.task_state("build-plugin"), TaskState::Completed { .. }));
    assert!(matches!(report.task_state("build-src"), TaskState::Failed { .. }));
    assert_eq!(report.task_state("zip"), TaskState::Pending);
    assert_eq!(report.task_state("clean"), TaskState::Pending);
    assert_eq!(report.state.status, RunStatus::Failed);

    // Nothing archived, nothing cleaned
    assert_eq!(mocks.log.count("archive:plugin->plugin.zip"), 0);
    assert!(project.output().join("plugin/index.html").exists());
}

#[tokio::test]
async fn test_parallel_failure_reports_every_failing_member() {
    let project = TestProject::new().with_config(FULL_CONFIG);
    let mocks = Mocks::builder().fail_styles().fail_scripts().build();
    let session = project.session(None, mocks.collaborators()).unwrap();

    let report = session.run("build").await;

    match report.error.clone() {
        Some(err @ PackError::GroupFailed { .. }) => {
            let message = err.to_string();
            assert!(message.contains("style-stage"), "{}", message);
            assert!(message.contains("script-transform-stage"), "{}", message);
            assert_eq!(
                err.failing_tasks(),
                vec!["style-stage", "script-transform-stage"]
            );
        }
        other => panic!("expected group failure, got {:?}", other),
    }

    // The healthy sibling ran to completion
    assert!(matches!(
        report.task_state("static-asset-stage"),
        TaskState::Completed { .. }
    ));
}

#[tokio::test]
async fn test_group_failure_blocks_deploy() {
    let project = TestProject::new().with_config(FULL_CONFIG);
    let mocks = Mocks::builder().fail_styles().build();
    let session = project.session(None, mocks.collaborators()).unwrap();

    let report = session.run("build-with-img").await;

    assert!(!report.succeeded());
    assert_eq!(mocks.upload_count(), 0);
    assert_eq!(mocks.log.count("archive:plugin->plugin.zip"), 0);
    assert_eq!(report.task_state("deploy"), TaskState::Pending);
    assert!(matches!(report.task_state("build-with-img"), TaskState::Failed { .. }));
}

#[tokio::test]
async fn test_failed_copy_reported_once_per_run() {
    let project = TestProject::new().with_config(FULL_CONFIG);
    let mocks = Mocks::builder().fail_copy_of("plugin").build();
    let session = project.session(None, mocks.collaborators()).unwrap();

    let report = session.run("build-with-img").await;

    assert!(!report.succeeded());
    assert_eq!(mocks.log.count("copy_tree:plugin"), 1);
    assert_eq!(mocks.log.count("copy_tree:src"), 0);
    assert!(report.completion_order().is_empty());
}

#[tokio::test]
async fn test_shared_prerequisite_failure_reported_once() {
    let project = TestProject::new().with_config(FULL_CONFIG);
    let mocks = Mocks::builder().fail_copy_of("src").build();
    let session = project.session(None, mocks.collaborators()).unwrap();

    let report = session.run("build").await;

    let err = report.error.clone().expect("build-src should fail");
    assert!(matches!(err, PackError::GroupFailed { .. }));
    assert_eq!(err.failing_tasks(), vec!["build-src"]);
    assert_eq!(mocks.log.count("copy_tree:src"), 1);
}
