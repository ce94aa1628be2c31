//! Test: deploy and preprocess stages are gated on the active environment

use crate::helpers::*;
use pstasks::collaborators::CollaboratorError;
use pstasks::core::PackError;

const API_ONLY: &str = r#"{
    "default_deploy_target": "qa",
    "qa": { "api_url": "https://qa-api.example.com" }
}"#;

#[tokio::test]
async fn test_unconfigured_environment_never_uploads() {
    let project = TestProject::new().with_config(FULL_CONFIG);
    let mocks = Mocks::new();
    let session = project.session(Some("staging"), mocks.collaborators()).unwrap();

    assert_eq!(session.environment().name, "staging");
    assert!(!session.environment().is_resolved());
    assert!(session.substitution_context().is_none());

    let report = session.run("build-with-img").await;
    assert!(report.succeeded(), "{:?}", report.error);

    assert_eq!(mocks.upload_count(), 0);
    assert_eq!(mocks.log.count("preprocess"), 0);

    // Skipped preprocessing still writes the assets through untouched
    assert_eq!(mocks.log.count("write:web_root"), 1);
}

#[tokio::test]
async fn test_preprocess_context_holds_only_configured_keys() {
    let project = TestProject::new().with_config(API_ONLY);
    let mocks = Mocks::new();
    let session = project.session(None, mocks.collaborators()).unwrap();

    let report = session.run("static-asset-stage").await;
    assert!(report.succeeded(), "{:?}", report.error);

    let contexts = mocks.contexts();
    assert_eq!(contexts.len(), 2, "one preprocess per source tree");
    for context in contexts {
        assert_eq!(context.keys(), vec!["API_URL"]);
        assert_eq!(context.get("API_URL"), Some("https://qa-api.example.com"));
    }
}

#[tokio::test]
async fn test_full_environment_substitutes_every_url() {
    let project = TestProject::new().with_config(FULL_CONFIG);
    let mocks = Mocks::new();
    let session = project.session(None, mocks.collaborators()).unwrap();

    let context = session.substitution_context().unwrap();
    assert_eq!(
        context.keys(),
        vec!["API_URL", "IMAGE_SERVER_URL", "PS_URL", "SAMS_URL"]
    );
}

#[tokio::test]
async fn test_deploy_uses_active_environment_credentials() {
    let project = TestProject::new().with_config(FULL_CONFIG);
    let mocks = Mocks::new();
    let session = project.session(Some("prod"), mocks.collaborators()).unwrap();

    let report = session.run("deploy").await;
    assert!(report.succeeded(), "{:?}", report.error);

    let uploads = mocks.transfer.uploads.lock().unwrap();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].0.field(&["host"]), Some("images.example.com"));
    assert_eq!(uploads[0].1, project.output().join("web_root"));
}

#[tokio::test]
async fn test_deploy_without_credentials_fails() {
    let project = TestProject::new().with_config(API_ONLY);
    let mocks = Mocks::new();
    let session = project.session(None, mocks.collaborators()).unwrap();

    let report = session.run("deploy").await;
    match report.error {
        Some(PackError::TaskExecution { task_id, source }) => {
            assert_eq!(task_id, "deploy");
            assert!(matches!(source, CollaboratorError::MissingCredentials(env) if env == "qa"));
        }
        other => panic!("expected deploy failure, got {:?}", other),
    }
    assert_eq!(mocks.upload_count(), 0);
}
