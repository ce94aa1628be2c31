//! Test: a build against the real file system and default transformer

use crate::helpers::*;
use pstasks::collaborators::{CommandRunner, Collaborators, ToolchainTransformer};
use std::sync::Arc;

fn project() -> TestProject {
    TestProject::new()
        .with_config(FULL_CONFIG)
        .write("plugin.xml", "<plugin api=\"<!-- @echo API_URL -->\"/>")
        .write("plugin/panel.html", "<img src=\"<!-- @echo IMAGE_SERVER_URL -->/logo.png\">")
        .write("src/index.html", "<a href=\"<!-- @echo PS_URL -->\">home</a>")
        .write("src/config.json.txt", "{ \"sams\": \"/* @echo SAMS_URL */\" }")
        .write("src/js/app.js", "const api = '/* @echo API_URL */';")
        .write("src/ext/vendor.html", "<!-- @echo API_URL -->")
}

fn collaborators(project: &TestProject, mocks: &Mocks) -> Collaborators {
    Collaborators {
        transformer: Arc::new(ToolchainTransformer::new(
            project.root(),
            CommandRunner::default(),
        )),
        ..mocks.with_local_fs()
    }
}

#[tokio::test]
async fn test_build_substitutes_environment_urls() {
    let project = project();
    let mocks = Mocks::new();
    let session = project
        .session(None, collaborators(&project, &mocks))
        .unwrap();

    let report = session.run("build").await;
    assert!(report.succeeded(), "{:?}", report.error);

    let out = project.output();
    let read = |rel: &str| std::fs::read_to_string(out.join(rel)).unwrap();

    assert_eq!(read("plugin/plugin.xml"), "<plugin api=\"https://api.example.com\"/>");
    assert_eq!(
        read("plugin/panel.html"),
        "<img src=\"https://img.example.com/logo.png\">"
    );
    assert_eq!(
        read("web_root/index.html"),
        "<a href=\"https://ps.example.com\">home</a>"
    );
    assert_eq!(
        read("web_root/config.json.txt"),
        "{ \"sams\": \"https://sams.example.com\" }"
    );

    // Scripts and vendored files are copied verbatim
    assert_eq!(read("web_root/js/app.js"), "const api = '/* @echo API_URL */';");
    assert_eq!(read("web_root/ext/vendor.html"), "<!-- @echo API_URL -->");
}

#[tokio::test]
async fn test_build_substitutes_query_definitions() {
    let project = project().write(
        "queries_root/reports/sales.sql",
        "-- endpoint: /* @echo API_URL */\nselect 1",
    );
    let mocks = Mocks::new();
    let session = project
        .session(None, collaborators(&project, &mocks))
        .unwrap();

    let report = session.run("static-asset-stage").await;
    assert!(report.succeeded(), "{:?}", report.error);

    let query =
        std::fs::read_to_string(project.output().join("queries_root/reports/sales.sql")).unwrap();
    assert_eq!(query, "-- endpoint: https://api.example.com\nselect 1");
}

#[tokio::test]
async fn test_missing_query_definitions_are_skipped() {
    let project = project();
    let mocks = Mocks::new();
    let session = project
        .session(None, collaborators(&project, &mocks))
        .unwrap();

    let report = session.run("static-asset-stage").await;
    assert!(report.succeeded(), "{:?}", report.error);
    assert!(!project.output().join("queries_root").exists());
}

#[tokio::test]
async fn test_unresolved_build_copies_sources_verbatim() {
    let project = project();
    let mocks = Mocks::new();
    let session = project
        .session(Some("staging"), collaborators(&project, &mocks))
        .unwrap();

    let report = session.run("build").await;
    assert!(report.succeeded(), "{:?}", report.error);

    let index = std::fs::read_to_string(project.output().join("web_root/index.html")).unwrap();
    assert_eq!(index, "<a href=\"<!-- @echo PS_URL -->\">home</a>");
}

#[tokio::test]
async fn test_package_leaves_only_archive_request() {
    let project = project();
    let mocks = Mocks::new();
    let session = project
        .session(None, collaborators(&project, &mocks))
        .unwrap();

    let report = session.run("build-no-img").await;
    assert!(report.succeeded(), "{:?}", report.error);

    // The recording archiver writes nothing, so clean empties the output
    assert_eq!(mocks.log.count("archive:plugin->plugin.zip"), 1);
    let remaining: Vec<_> = std::fs::read_dir(project.output()).unwrap().collect();
    assert!(remaining.is_empty());
}
