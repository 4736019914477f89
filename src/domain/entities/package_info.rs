use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tokio::fs as async_fs;

use crate::common::error::DepsyncError;
use crate::common::result::DepsyncResult;
use crate::domain::entities::dependency::{Dependency, DependencyGraph};

/// File name of the per-package metadata file, stored at the package root.
pub const PACKAGE_INFO_FILENAME: &str = "depsync.package.json";

/// Declared metadata of a package.
///
/// ```json
/// {
///     "dependencies": ["git:core:master"],
///     "workspace_mapping": "@{deps}",
///     "options": { "archive_name": "zlib.tar.gz" },
///     "build": { "cmake": { "target": "zlib" } }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageInfo {
    /// Raw `source:name:version` strings, malformed entries are skipped when read
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Relative path template under which the package is mapped into a workspace
    #[serde(default)]
    pub workspace_mapping: String,

    #[serde(default)]
    pub options: BTreeMap<String, Value>,

    /// Opaque per build-system configuration
    #[serde(default, alias = "build_system")]
    pub build: BTreeMap<String, Value>,
}

impl PackageInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dependencies<I, D>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: ToString,
    {
        self.dependencies = dependencies.into_iter().map(|d| d.to_string()).collect();
        self
    }

    pub fn with_workspace_mapping(mut self, mapping: impl Into<String>) -> Self {
        self.workspace_mapping = mapping.into();
        self
    }

    pub fn from_json_str(contents: &str) -> DepsyncResult<Self> {
        serde_json::from_str(contents)
            .map_err(|e| DepsyncError::serialization_error_with_source("Invalid package info", e))
    }

    pub fn to_json_string(&self) -> DepsyncResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub async fn load(path: &Path) -> DepsyncResult<Self> {
        let contents = async_fs::read_to_string(path).await.map_err(|e| {
            DepsyncError::filesystem_error_with_source(
                "Failed to read package info",
                Some(path.to_path_buf()),
                e,
            )
        })?;
        Self::from_json_str(&contents)
    }

    pub async fn save(&self, path: &Path) -> DepsyncResult<()> {
        if let Some(parent) = path.parent() {
            async_fs::create_dir_all(parent).await?;
        }
        async_fs::write(path, self.to_json_string()?)
            .await
            .map_err(|e| {
                DepsyncError::filesystem_error_with_source(
                    "Failed to write package info",
                    Some(path.to_path_buf()),
                    e,
                )
            })
    }

    /// Declared dependencies as a graph with one root child per entry.
    pub fn dependency_graph(&self) -> DependencyGraph {
        DependencyGraph::from_lines(&self.dependencies)
    }

    pub fn dependency_list(&self) -> Vec<Dependency> {
        self.dependency_graph().direct_dependencies()
    }

    pub fn workspace_mapping(&self) -> &str {
        &self.workspace_mapping
    }

    pub fn has_option(&self, key: &str) -> bool {
        self.options.contains_key(key)
    }

    pub fn get_option(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }

    /// String option, `None` when missing or not a string.
    pub fn get_str_option(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(Value::as_str)
    }

    pub fn add_option(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.options.insert(key.into(), value.into());
    }

    pub fn build_system(&self, name: &str) -> Option<&Value> {
        self.build.get(name)
    }
}
