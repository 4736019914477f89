use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::common::templates::WorkspaceMapping;
use crate::domain::entities::dependency::{Dependency, DependencyGraph};
use crate::infrastructure::provider::ProviderConfig;

/// File name of the workspace manifest at the workspace root
pub const WORKSPACE_MANIFEST_FILENAME: &str = "depsync.yaml";

/// Workspace manifest: direct dependencies, path mappings and providers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceManifest {
    /// `source:name:version` references
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Placeholder name -> path template, e.g. `deps: "@{root}/deps"`
    #[serde(default)]
    pub workspace_mappings: BTreeMap<String, String>,

    #[serde(default)]
    pub options: BTreeMap<String, serde_yaml::Value>,

    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
}

impl WorkspaceManifest {
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

    pub fn with_mapping(mut self, name: impl Into<String>, template: impl Into<String>) -> Self {
        self.workspace_mappings.insert(name.into(), template.into());
        self
    }

    pub fn with_provider(mut self, provider: ProviderConfig) -> Self {
        self.providers.push(provider);
        self
    }

    /// Root graph with one child per well formed dependency
    pub fn dependency_graph(&self) -> DependencyGraph {
        DependencyGraph::from_lines(&self.dependencies)
    }

    /// Whether a direct dependency with this package name exists
    pub fn contains_project(&self, name: &str) -> bool {
        self.dependency_graph()
            .direct_dependencies()
            .iter()
            .any(|d| d.name == name)
    }

    /// Append a dependency. Returns false when the exact reference is already listed.
    pub fn add_dependency(&mut self, dependency: &Dependency) -> bool {
        if self
            .dependency_graph()
            .direct_dependencies()
            .contains(dependency)
        {
            return false;
        }
        self.dependencies.push(dependency.to_string());
        true
    }

    /// Path mapping of the workspace rooted at `root`
    pub fn mapping(&self, root: &Path) -> WorkspaceMapping {
        WorkspaceMapping::new(root).with_mappings(self.workspace_mappings.clone())
    }
}
