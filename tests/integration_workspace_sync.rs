//! Workspace resolution and reconciliation against an in-memory provider

mod common;

use pretty_assertions::assert_eq;
use std::sync::Arc;

use common::mock_services::{MemoryProvider, MODIFIED_MARKER, VERSION_MARKER};
use common::test_fixtures::{
    conflicting_provider, cyclic_provider, diamond_provider, registry_with, write_manifest,
    WorkspaceFixture,
};
use depsync::application::use_cases::package_set::{ReconcileAction, UpdateOptions};
use depsync::application::use_cases::workspace::{VerifyClass, Workspace, WorkspaceConfig};
use depsync::common::error::DepsyncError;
use depsync::common::reporter::NullReporter;
use depsync::domain::entities::binding_snapshot::SNAPSHOT_FILENAME;
use depsync::domain::entities::dependency::Dependency;
use depsync::domain::entities::workspace_manifest::WorkspaceManifest;
use depsync::infrastructure::filesystem::GITIGNORE_MARKER;

async fn open(fixture: &WorkspaceFixture, provider: Arc<MemoryProvider>) -> Workspace {
    Workspace::open_with_registry(fixture.root(), registry_with(provider), WorkspaceConfig::new())
        .await
        .expect("Failed to open workspace")
}

fn read_version(fixture: &WorkspaceFixture, relative: &str) -> String {
    std::fs::read_to_string(fixture.path(relative).join(VERSION_MARKER)).unwrap()
}

#[tokio::test]
async fn test_diamond_resolves_without_conflicts() {
    let fixture = WorkspaceFixture::new(&["mem:app:master"]);
    let workspace = open(&fixture, Arc::new(diamond_provider())).await;

    let set = workspace.package_set(&NullReporter).await.unwrap();
    assert!(!set.has_conflicts());

    let names: Vec<&str> = set.packages().iter().map(|p| p.name()).collect();
    assert_eq!(names, vec!["app", "core", "net"]);

    let dirs: Vec<_> = set.bindings().iter().map(|b| b.dir().to_path_buf()).collect();
    assert_eq!(
        dirs,
        vec![
            fixture.path("deps/app"),
            fixture.path("deps/core"),
            fixture.path("deps/net"),
        ]
    );
}

#[tokio::test]
async fn test_package_info_is_fetched_once_per_reference() {
    let fixture = WorkspaceFixture::new(&["mem:app:master"]);
    let provider = Arc::new(diamond_provider());
    let workspace = open(&fixture, Arc::clone(&provider)).await;

    workspace.package_set(&NullReporter).await.unwrap();

    // core:v1 is reached twice but read once
    let core_reads = provider
        .history()
        .iter()
        .filter(|call| call.as_str() == "info core:v1")
        .count();
    assert_eq!(core_reads, 1);
}

#[tokio::test]
async fn test_conflicts_refuse_update_unless_forced() {
    let fixture = WorkspaceFixture::new(&["mem:app:master"]);
    let mut workspace = open(&fixture, Arc::new(conflicting_provider())).await;

    let err = workspace
        .update(&UpdateOptions::new(), &NullReporter)
        .await
        .unwrap_err();
    match err {
        DepsyncError::UnresolvedConflicts { names } => assert_eq!(names, vec!["core"]),
        other => panic!("unexpected error: {other}"),
    }
    assert!(!fixture.path("deps").exists());

    let report = workspace
        .update(&UpdateOptions::new().with_force(true), &NullReporter)
        .await
        .unwrap();
    assert_eq!(report.forced, vec![Dependency::new("mem", "core", "v1")]);
    assert_eq!(read_version(&fixture, "deps/core"), "v1");
}

#[tokio::test]
async fn test_depends_reports_conflict_chains() {
    let fixture = WorkspaceFixture::new(&["mem:app:master"]);
    let workspace = open(&fixture, Arc::new(conflicting_provider())).await;

    let report = workspace.depends(&NullReporter).await.unwrap();
    assert_eq!(report.conflict_count, 1);
    assert_eq!(report.projects["core"].len(), 2);
    assert!(report
        .conflicts
        .starts_with("core using branches v1 and v2 due to app:master and net:master"));
    assert_eq!(
        report.tree,
        "mem:app:master\n  mem:core:v1\n  mem:net:master\n    mem:core:v2\n"
    );
}

#[tokio::test]
async fn test_preview_touches_nothing_then_update_applies() {
    let fixture = WorkspaceFixture::new(&["mem:app:master"]);
    let provider = Arc::new(diamond_provider());
    let mut workspace = open(&fixture, Arc::clone(&provider)).await;

    let preview = workspace
        .update(&UpdateOptions::new().with_preview(true), &NullReporter)
        .await
        .unwrap();
    assert!(preview.preview);
    assert_eq!(preview.reconcile.entries.len(), 3);
    assert!(preview
        .reconcile
        .entries
        .iter()
        .all(|e| e.action == ReconcileAction::CheckOut && !e.applied));
    assert!(!fixture.path("deps").exists());
    assert!(!fixture.path(SNAPSHOT_FILENAME).exists());
    assert_eq!(provider.calls_to("checkout"), 0);

    let report = workspace
        .update(&UpdateOptions::new(), &NullReporter)
        .await
        .unwrap();
    assert!(report.reconcile.entries.iter().all(|e| e.applied));
    assert_eq!(read_version(&fixture, "deps/net"), "master");
    assert!(fixture.path(SNAPSHOT_FILENAME).exists());

    let gitignore = std::fs::read_to_string(fixture.path(".gitignore")).unwrap();
    assert!(gitignore.contains(GITIGNORE_MARKER));
    assert!(gitignore.contains("deps/app/"));
    assert!(gitignore.contains("deps/core/"));

    // A second run has nothing left to do
    let again = workspace
        .update(&UpdateOptions::new(), &NullReporter)
        .await
        .unwrap();
    assert!(again
        .reconcile
        .entries
        .iter()
        .all(|e| e.action == ReconcileAction::UpToDate));
}

#[tokio::test]
async fn test_modified_copy_is_refused_then_forced() {
    let fixture = WorkspaceFixture::new(&["mem:core:v1"]);
    let provider = Arc::new(diamond_provider());
    let mut workspace = open(&fixture, Arc::clone(&provider)).await;
    workspace
        .update(&UpdateOptions::new(), &NullReporter)
        .await
        .unwrap();

    std::fs::write(fixture.path("deps/core").join(MODIFIED_MARKER), "local work").unwrap();
    write_manifest(
        fixture.root(),
        &WorkspaceManifest::new()
            .with_dependencies(["mem:core:v2"])
            .with_mapping("deps", "deps"),
    );

    let mut workspace = open(&fixture, Arc::clone(&provider)).await;
    let report = workspace
        .update(&UpdateOptions::new(), &NullReporter)
        .await
        .unwrap();
    assert!(report.reconcile.has_refusals());
    assert_eq!(
        report.reconcile.entries[0].action,
        ReconcileAction::Refuse {
            from: "v1".to_string(),
            to: "v2".to_string()
        }
    );
    assert_eq!(read_version(&fixture, "deps/core"), "v1");

    let report = workspace
        .update(&UpdateOptions::new().with_force(true), &NullReporter)
        .await
        .unwrap();
    assert!(!report.reconcile.has_refusals());
    assert!(report.reconcile.entries[0].applied);
    assert_eq!(read_version(&fixture, "deps/core"), "v2");
}

#[tokio::test]
async fn test_cycle_reports_dependency_chain() {
    let fixture = WorkspaceFixture::new(&["mem:a:master"]);
    let workspace = open(&fixture, Arc::new(cyclic_provider())).await;

    let err = workspace.package_set(&NullReporter).await.unwrap_err();
    assert!(err.is_circular_dependency());
    assert_eq!(
        err.chain().unwrap(),
        &[
            Dependency::new("mem", "a", "master"),
            Dependency::new("mem", "b", "master"),
        ]
    );
}

#[tokio::test]
async fn test_missing_package_info_carries_chain() {
    let fixture = WorkspaceFixture::new(&["mem:app:master"]);
    let provider = MemoryProvider::new("mem")
        .with_package("app", "master", &["mem:ghost:v1"]);
    let workspace = open(&fixture, Arc::new(provider)).await;

    let err = workspace.package_set(&NullReporter).await.unwrap_err();
    assert!(matches!(err.inner(), DepsyncError::Provider(_)));
    assert_eq!(err.chain().unwrap().last().unwrap().name, "ghost");
}

#[tokio::test]
async fn test_verify_classifies_recorded_copies() {
    let fixture = WorkspaceFixture::new(&["mem:app:master"]);
    let provider = Arc::new(diamond_provider());
    let mut workspace = open(&fixture, Arc::clone(&provider)).await;
    workspace
        .update(&UpdateOptions::new(), &NullReporter)
        .await
        .unwrap();

    std::fs::write(fixture.path("deps/core").join(MODIFIED_MARKER), "").unwrap();
    std::fs::write(fixture.path("deps/net").join(VERSION_MARKER), "v9").unwrap();
    std::fs::remove_dir_all(fixture.path("deps/app")).unwrap();

    let workspace = open(&fixture, provider).await;
    let report = workspace.verify().await.unwrap();
    assert!(report.initialized);
    assert!(!report.corrupted);

    let classes: Vec<VerifyClass> = report.entries.iter().map(|e| e.class).collect();
    assert_eq!(
        classes,
        vec![
            VerifyClass::NotInstalled,
            VerifyClass::Modified,
            VerifyClass::IncorrectVersion,
        ]
    );
    assert!(!report.is_ok());
}

#[tokio::test]
async fn test_import_and_available_imports() {
    let fixture = WorkspaceFixture::new(&["mem:core:v1"]);
    let mut workspace = open(&fixture, Arc::new(diamond_provider())).await;

    let candidates = workspace.available_imports().await.unwrap();
    let core = candidates.iter().find(|c| c.project == "mem:core").unwrap();
    assert!(core.imported);
    let net = candidates.iter().find(|c| c.project == "mem:net").unwrap();
    assert!(!net.imported);

    assert!(workspace
        .import(&Dependency::new("mem", "net", "master"))
        .await
        .unwrap());
    assert!(!workspace
        .import(&Dependency::new("mem", "net", "master"))
        .await
        .unwrap());

    let manifest = std::fs::read_to_string(fixture.path("depsync.yaml")).unwrap();
    assert!(manifest.contains("mem:net:master"));

    let err = workspace
        .import(&Dependency::new("nowhere", "net", "master"))
        .await
        .unwrap_err();
    assert!(matches!(err, DepsyncError::Provider(_)));

    assert_eq!(
        workspace.available_versions("mem:core").await.unwrap(),
        vec!["v1", "v2"]
    );
}

#[tokio::test]
async fn test_fetch_checks_out_then_updates() {
    use depsync::application::use_cases::package_set::FetchOutcome;

    let fixture = WorkspaceFixture::new(&["mem:core:v1"]);
    let workspace = open(&fixture, Arc::new(diamond_provider())).await;

    let first = workspace.update_packages(&NullReporter).await.unwrap();
    assert_eq!(first[0].1, FetchOutcome::CheckedOut);

    let second = workspace.update_packages(&NullReporter).await.unwrap();
    assert_eq!(second[0].1, FetchOutcome::Updated);
}
