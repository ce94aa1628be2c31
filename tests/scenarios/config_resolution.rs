//! Test: config source precedence and resolution failures

use crate::helpers::*;
use pstasks::build::{BuildSession, SessionOptions};
use pstasks::core::config::{ConfigResolver, ConfigSource};
use pstasks::core::PackError;

fn config_for(target: &str) -> String {
    format!(r#"{{ "default_deploy_target": "{0}", "{0}": {{ "api_url": "https://{0}" }} }}"#, target)
}

#[test]
fn test_explicit_config_wins_over_every_source() {
    let project = TestProject::new()
        .with_config(&config_for("local"))
        .write("shared/config.json", &config_for("explicit"))
        .write("root/config.json", &config_for("rooted"));
    let mocks = Mocks::new();

    let resolver = ConfigResolver::new(project.root(), Some(project.root().join("root")));
    let options = SessionOptions {
        config_dir: Some(project.root().join("shared")),
        ..project.options(None)
    };
    let session = BuildSession::prepare(&resolver, options, mocks.collaborators()).unwrap();

    assert_eq!(session.environment().name, "explicit");
    assert!(matches!(session.config().source, ConfigSource::Explicit(_)));
}

#[test]
fn test_working_directory_before_root_variable() {
    let project = TestProject::new()
        .with_config(&config_for("local"))
        .write("root/config.json", &config_for("rooted"));
    let mocks = Mocks::new();

    let resolver = ConfigResolver::new(project.root(), Some(project.root().join("root")));
    let session =
        BuildSession::prepare(&resolver, project.options(None), mocks.collaborators()).unwrap();

    assert_eq!(session.environment().name, "local");
    assert!(matches!(session.config().source, ConfigSource::WorkingDirectory(_)));
}

#[test]
fn test_cli_env_overrides_default_target() {
    let project = TestProject::new().with_config(FULL_CONFIG);
    let session = project.session(Some("staging"), Mocks::new().collaborators()).unwrap();
    assert_eq!(session.environment().name, "staging");
}

#[test]
fn test_missing_deploy_target_before_any_write() {
    let project = TestProject::new().with_config(r#"{ "prod": { "api_url": "https://x" } }"#);
    let mocks = Mocks::new();

    let result = project.session(None, mocks.with_local_fs());
    assert!(matches!(result, Err(PackError::MissingDeployTarget)));

    assert!(!project.output().exists());
    assert!(mocks.log.calls().is_empty());
}

#[test]
fn test_no_config_anywhere() {
    let project = TestProject::new();
    let result = project.session(Some("prod"), Mocks::new().collaborators());
    assert!(matches!(result, Err(PackError::ConfigNotFound(_))));
}

#[test]
fn test_malformed_project_config_falls_back_to_root_variable() {
    let project = TestProject::new()
        .with_config("[1, 2")
        .write("root/config.json", FULL_CONFIG);
    let resolver = ConfigResolver::new(project.root(), Some(project.root().join("root")));

    let session =
        BuildSession::prepare(&resolver, project.options(None), Mocks::new().collaborators())
            .unwrap();
    assert!(matches!(session.config().source, ConfigSource::RootVariable(_)));
    assert_eq!(session.environment().name, "prod");
}

#[test]
fn test_malformed_explicit_config_is_fatal() {
    let project = TestProject::new()
        .with_config(FULL_CONFIG)
        .write("shared/config.json", "{ not json");
    let resolver = ConfigResolver::new(project.root(), None);
    let options = SessionOptions {
        config_dir: Some(project.root().join("shared")),
        ..project.options(None)
    };

    let result = BuildSession::prepare(&resolver, options, Mocks::new().collaborators());
    assert!(matches!(result, Err(PackError::ConfigParse { .. })));
}
