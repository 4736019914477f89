//! Test fixtures
//!
//! Canned workspaces and provider tables shared by the integration tests.

use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

use depsync::domain::entities::workspace_manifest::{WorkspaceManifest, WORKSPACE_MANIFEST_FILENAME};
use depsync::infrastructure::provider::ProviderRegistry;

use super::mock_services::MemoryProvider;

/// A workspace directory holding only a `depsync.yaml`
pub struct WorkspaceFixture {
    pub temp_dir: TempDir,
}

impl WorkspaceFixture {
    /// Workspace with the given direct dependencies and a `deps` mapping
    pub fn new(dependencies: &[&str]) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let manifest = WorkspaceManifest::new()
            .with_dependencies(dependencies.iter().copied())
            .with_mapping("deps", "deps");
        write_manifest(temp_dir.path(), &manifest);
        Self { temp_dir }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn path(&self, relative: &str) -> std::path::PathBuf {
        self.temp_dir.path().join(relative)
    }
}

pub fn write_manifest(root: &Path, manifest: &WorkspaceManifest) {
    let contents = serde_yaml::to_string(manifest).expect("Failed to serialize manifest");
    std::fs::write(root.join(WORKSPACE_MANIFEST_FILENAME), contents)
        .expect("Failed to write manifest");
}

/// `app` depends on `core` and `net`, `net` depends on `core` as well.
///
/// ```text
/// mem:app:master
/// ├── mem:core:v1
/// └── mem:net:master
///     └── mem:core:v1
/// ```
pub fn diamond_provider() -> MemoryProvider {
    MemoryProvider::new("mem")
        .with_mapped_package("app", "master", "@{deps}", &["mem:core:v1", "mem:net:master"])
        .with_mapped_package("core", "v1", "@{deps}", &[])
        .with_mapped_package("core", "v2", "@{deps}", &[])
        .with_mapped_package("net", "master", "@{deps}", &["mem:core:v1"])
}

/// Like [`diamond_provider`] but `net` wants `core:v2`.
pub fn conflicting_provider() -> MemoryProvider {
    MemoryProvider::new("mem")
        .with_mapped_package("app", "master", "@{deps}", &["mem:core:v1", "mem:net:master"])
        .with_mapped_package("core", "v1", "@{deps}", &[])
        .with_mapped_package("core", "v2", "@{deps}", &[])
        .with_mapped_package("net", "master", "@{deps}", &["mem:core:v2"])
}

/// `a` -> `b` -> `a`
pub fn cyclic_provider() -> MemoryProvider {
    MemoryProvider::new("mem")
        .with_package("a", "master", &["mem:b:master"])
        .with_package("b", "master", &["mem:a:master"])
}

pub fn registry_with(provider: Arc<MemoryProvider>) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();
    registry
        .register(provider)
        .expect("Failed to register provider");
    registry
}
