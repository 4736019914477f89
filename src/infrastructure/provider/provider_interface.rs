use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::domain::entities::dependency::Dependency;
use crate::domain::entities::package::PackageStatus;
use crate::domain::entities::package_info::PackageInfo;
use crate::domain::value_objects::provider_kind::ProviderKind;
use crate::infrastructure::cache::{CacheConfig, ExpiringCache};
use crate::infrastructure::filesystem::archive::ArchiveError;
use crate::infrastructure::scm::ScmError;

/// Errors raised by package providers
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Package {name}:{version} not found in provider '{provider}': {reason}")]
    NotFound {
        provider: String,
        name: String,
        version: String,
        reason: String,
    },

    #[error("Package info for {name}:{version} unavailable from provider '{provider}': {reason}")]
    InfoUnavailable {
        provider: String,
        name: String,
        version: String,
        reason: String,
    },

    #[error("Provider '{provider}' is missing required parameter '{param}'")]
    MissingConfigParam { provider: String, param: String },

    #[error("Provider '{provider}' has an invalid '{param}' parameter: {reason}")]
    InvalidConfigParam {
        provider: String,
        param: String,
        reason: String,
    },

    #[error("Provider '{0}' is already registered")]
    DuplicateProvider(String),

    #[error("Unknown provider '{0}'")]
    UnknownProvider(String),

    #[error("Local directory already exists: {}", path.display())]
    LocalConflict { path: PathBuf },

    #[error("Provider '{provider}' failed to initialize: {reason}")]
    Initialization { provider: String, reason: String },

    #[error("Request to {url} failed with HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("Source control error: {0}")]
    Scm(#[from] ScmError),

    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl ProviderError {
    pub fn not_found(
        provider: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::NotFound {
            provider: provider.into(),
            name: name.into(),
            version: version.into(),
            reason: reason.into(),
        }
    }

    pub fn info_unavailable(
        provider: impl Into<String>,
        dependency: &Dependency,
        reason: impl Into<String>,
    ) -> Self {
        Self::InfoUnavailable {
            provider: provider.into(),
            name: dependency.name.clone(),
            version: dependency.version.clone(),
            reason: reason.into(),
        }
    }

    pub fn missing_param(provider: impl Into<String>, param: impl Into<String>) -> Self {
        Self::MissingConfigParam {
            provider: provider.into(),
            param: param.into(),
        }
    }

    pub fn invalid_param(
        provider: impl Into<String>,
        param: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidConfigParam {
            provider: provider.into(),
            param: param.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error means the package or ref does not exist upstream
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// A pluggable source of packages.
///
/// Implementations locate packages, read their declared metadata and reconcile
/// a local working copy of a package with the requested version.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Name used as the `source` part of dependency references
    fn name(&self) -> &str;

    fn kind(&self) -> ProviderKind;

    /// Locate `name` at `version`.
    ///
    /// With `verify` set the ref is confirmed upstream first, otherwise the
    /// reference is returned without a remote round-trip.
    async fn find_package(
        &self,
        name: &str,
        version: &str,
        verify: bool,
        refresh: bool,
    ) -> Result<Dependency, ProviderError>;

    /// Read the declared metadata of `dependency`.
    ///
    /// A valid working copy at `local_dir` is preferred over a remote fetch.
    /// Results are memoized per name and version for the provider's lifetime.
    async fn get_package_info(
        &self,
        dependency: &Dependency,
        local_dir: Option<&Path>,
        refresh: bool,
    ) -> Result<PackageInfo, ProviderError>;

    async fn local_status(
        &self,
        dependency: &Dependency,
        dir: &Path,
    ) -> Result<PackageStatus, ProviderError>;

    /// Fetch `dependency` into `dir`. Fails with `LocalConflict` when `dir` exists.
    async fn checkout(&self, dependency: &Dependency, dir: &Path) -> Result<(), ProviderError>;

    /// Bring an installed copy up to date. Returns false when nothing is installed.
    async fn update(&self, dependency: &Dependency, dir: &Path) -> Result<bool, ProviderError>;

    /// Move the copy at `dir` to the version of `dependency`.
    ///
    /// Returns false, leaving the copy untouched, when local modifications block
    /// the switch and `force` is not set.
    async fn change_version(
        &self,
        dependency: &Dependency,
        dir: &Path,
        force: bool,
    ) -> Result<bool, ProviderError>;

    /// Interactive listing of remote projects, when the provider supports it
    fn query(&self) -> Option<&dyn ProviderQuery> {
        None
    }
}

/// Remote listing used by the import flow
#[async_trait]
pub trait ProviderQuery: Send + Sync {
    async fn list_projects(&self) -> Result<Vec<String>, ProviderError>;

    async fn list_versions(&self, project: &str) -> Result<Vec<String>, ProviderError>;
}

/// Shared resources handed to providers at construction
#[derive(Debug, Clone)]
pub struct ProviderContext {
    cache_dir: PathBuf,
    cache: Arc<ExpiringCache>,
    cache_config: CacheConfig,
}

impl ProviderContext {
    /// Context rooted at `cache_dir`, with the expiring cache stored in its `entries` folder
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        let cache_dir = cache_dir.into();
        let cache = Arc::new(ExpiringCache::new(cache_dir.join("entries")));
        Self {
            cache_dir,
            cache,
            cache_config: CacheConfig::default(),
        }
    }

    pub fn with_cache(mut self, cache: Arc<ExpiringCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_cache_config(mut self, cache_config: CacheConfig) -> Self {
        self.cache_config = cache_config;
        self
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn cache(&self) -> &ExpiringCache {
        &self.cache
    }

    pub fn cache_config(&self) -> CacheConfig {
        self.cache_config
    }

    /// Private working area of one provider
    pub fn provider_dir(&self, provider: &str) -> PathBuf {
        self.cache_dir.join(sanitize_path_component(provider))
    }
}

/// Replace characters that are unsafe in a single path component
pub fn sanitize_path_component(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
