use std::path::PathBuf;
use thiserror::Error;

use crate::domain::entities::dependency::Dependency;
use crate::infrastructure::cache::CacheError;
use crate::infrastructure::filesystem::workspace_store::WorkspaceStoreError;
use crate::infrastructure::provider::ProviderError;
use crate::infrastructure::scm::ScmError;

#[derive(Error, Debug)]
pub enum DepsyncError {
    #[error("Parse error: {message}")]
    ParseError {
        message: String,
        file_path: Option<PathBuf>,
    },

    #[error("Circular dependency: {parent} depends on {child}, which is already on its dependency path")]
    CircularDependency { parent: Dependency, child: Dependency },

    #[error(transparent)]
    Provider(ProviderError),

    #[error("Local directory already exists: {}", path.display())]
    LocalConflict { path: PathBuf },

    #[error("Refusing to change {package} from '{from}' to '{to}': local modifications present")]
    ChangeVersionRefused {
        package: String,
        from: String,
        to: String,
    },

    #[error("There are conflicted dependencies: {}", names.join(", "))]
    UnresolvedConflicts { names: Vec<String> },

    #[error("File system operation failed: {message}")]
    FileSystemError {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Configuration error: {message}")]
    ConfigError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Serialization error: {message}")]
    SerializationError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Network operation failed: {message}")]
    NetworkError {
        message: String,
        url: Option<String>,
        #[source]
        source: Option<reqwest::Error>,
    },

    #[error("Source control operation failed: {0}")]
    Scm(#[from] ScmError),

    #[error("Internal error: {message}")]
    InternalError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An error raised while a dependency chain was being processed.
    #[error("{inner}")]
    WithChain {
        chain: Vec<Dependency>,
        inner: Box<DepsyncError>,
    },
}

impl DepsyncError {
    pub fn parse_error(message: impl Into<String>, file_path: Option<PathBuf>) -> Self {
        Self::ParseError {
            message: message.into(),
            file_path,
        }
    }

    pub fn circular_dependency(parent: Dependency, child: Dependency) -> Self {
        Self::CircularDependency { parent, child }
    }

    pub fn local_conflict(path: impl Into<PathBuf>) -> Self {
        Self::LocalConflict { path: path.into() }
    }

    pub fn change_version_refused(
        package: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self::ChangeVersionRefused {
            package: package.into(),
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn filesystem_error(message: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self::FileSystemError {
            message: message.into(),
            path,
            source: None,
        }
    }

    pub fn filesystem_error_with_source(
        message: impl Into<String>,
        path: Option<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::FileSystemError {
            message: message.into(),
            path,
            source: Some(source),
        }
    }

    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
            source: None,
        }
    }

    pub fn config_error_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::ConfigError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn serialization_error_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::SerializationError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn network_error_with_source(
        message: impl Into<String>,
        url: Option<String>,
        source: reqwest::Error,
    ) -> Self {
        Self::NetworkError {
            message: message.into(),
            url,
            source: Some(source),
        }
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::InternalError {
            message: message.into(),
            source: None,
        }
    }

    pub fn internal_error_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::InternalError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Attach the dependency chain that was active when this error was raised.
    ///
    /// An error that already carries a chain keeps it: the innermost chain is the one
    /// closest to the failure. An empty chain leaves the error untouched.
    pub fn with_chain(self, chain: Vec<Dependency>) -> Self {
        match self {
            already @ Self::WithChain { .. } => already,
            other if chain.is_empty() => other,
            other => Self::WithChain {
                chain,
                inner: Box::new(other),
            },
        }
    }

    /// The dependency chain (first dependency below the root down to the failing one).
    pub fn chain(&self) -> Option<&[Dependency]> {
        match self {
            Self::WithChain { chain, .. } => Some(chain),
            _ => None,
        }
    }

    /// The underlying error with any chain annotation removed.
    pub fn inner(&self) -> &DepsyncError {
        match self {
            Self::WithChain { inner, .. } => inner.inner(),
            other => other,
        }
    }

    pub fn is_circular_dependency(&self) -> bool {
        matches!(self.inner(), Self::CircularDependency { .. })
    }
}

impl From<ProviderError> for DepsyncError {
    fn from(error: ProviderError) -> Self {
        match error {
            ProviderError::LocalConflict { path } => Self::LocalConflict { path },
            other => Self::Provider(other),
        }
    }
}

impl From<CacheError> for DepsyncError {
    fn from(error: CacheError) -> Self {
        Self::internal_error_with_source("Cache operation failed", error)
    }
}

impl From<WorkspaceStoreError> for DepsyncError {
    fn from(error: WorkspaceStoreError) -> Self {
        match error {
            WorkspaceStoreError::ManifestNotFound(path) => Self::config_error(format!(
                "Workspace manifest not found at {}",
                path
            )),
            WorkspaceStoreError::Io(source) => {
                Self::filesystem_error_with_source("Workspace file operation failed", None, source)
            }
            other => Self::config_error_with_source("Workspace file operation failed", other),
        }
    }
}

impl From<std::io::Error> for DepsyncError {
    fn from(error: std::io::Error) -> Self {
        Self::filesystem_error_with_source("File system operation failed", None, error)
    }
}

impl From<serde_yaml::Error> for DepsyncError {
    fn from(error: serde_yaml::Error) -> Self {
        Self::serialization_error_with_source("YAML serialization failed", error)
    }
}

impl From<serde_json::Error> for DepsyncError {
    fn from(error: serde_json::Error) -> Self {
        Self::serialization_error_with_source("JSON serialization failed", error)
    }
}

impl From<reqwest::Error> for DepsyncError {
    fn from(error: reqwest::Error) -> Self {
        Self::network_error_with_source("Network request failed", None, error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dep(name: &str, version: &str) -> Dependency {
        Dependency::new("git", name, version)
    }

    #[test]
    fn test_circular_dependency_message_names_both_nodes() {
        let error = DepsyncError::circular_dependency(dep("b", "v1"), dep("a", "v1"));
        let message = error.to_string();
        assert!(message.contains("git:b:v1"));
        assert!(message.contains("git:a:v1"));
        assert!(error.is_circular_dependency());
    }

    #[test]
    fn test_with_chain_keeps_innermost_chain() {
        let inner = DepsyncError::internal_error("boom")
            .with_chain(vec![dep("a", "v1"), dep("b", "v1")]);
        let outer = inner.with_chain(vec![dep("a", "v1")]);

        assert_eq!(outer.chain().map(|c| c.len()), Some(2));
        assert_eq!(outer.to_string(), "Internal error: boom");
        assert!(matches!(outer.inner(), DepsyncError::InternalError { .. }));
    }

    #[test]
    fn test_with_empty_chain_is_noop() {
        let error = DepsyncError::config_error("bad").with_chain(Vec::new());
        assert!(error.chain().is_none());
    }

    #[test]
    fn test_provider_local_conflict_maps_to_local_conflict() {
        let error: DepsyncError = ProviderError::LocalConflict {
            path: PathBuf::from("/tmp/x"),
        }
        .into();
        assert!(matches!(error, DepsyncError::LocalConflict { .. }));
    }

    #[test]
    fn test_error_conversion_from_io_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: DepsyncError = io_error.into();
        assert!(matches!(error, DepsyncError::FileSystemError { .. }));
    }
}
