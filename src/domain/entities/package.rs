use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::common::error::DepsyncError;
use crate::common::result::DepsyncResult;
use crate::domain::entities::dependency::Dependency;
use crate::domain::entities::package_info::PackageInfo;
use crate::domain::value_objects::modification::Modification;
use crate::infrastructure::provider::{Provider, ProviderError};

/// State of a package's local directory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageStatus {
    /// The directory exists and carries provider markers
    pub installed: bool,
    /// Installed and the markers are consistent
    pub valid: bool,
    pub modified: bool,
    /// Checked out version, only meaningful when valid
    pub version: Option<String>,
    pub modifications: Vec<Modification>,
    /// Uninterpreted provider output describing the modifications
    pub raw_modifications: String,
}

impl PackageStatus {
    pub fn not_installed() -> Self {
        Self::default()
    }

    /// Installed but corrupted or partial
    pub fn invalid() -> Self {
        Self {
            installed: true,
            ..Self::default()
        }
    }

    /// Installed, valid and clean at `version`
    pub fn clean(version: impl Into<String>) -> Self {
        Self {
            installed: true,
            valid: true,
            version: Some(version.into()),
            ..Self::default()
        }
    }

    /// Record provider status output, marking the status modified when it lists any change
    pub fn with_raw_modifications(mut self, raw: impl Into<String>) -> Self {
        let raw = raw.into();
        self.modifications = Modification::parse_porcelain(&raw);
        self.modified = !raw.trim().is_empty();
        self.raw_modifications = raw;
        self
    }

    pub fn is_installed(&self) -> bool {
        self.installed
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn is_clean(&self) -> bool {
        !self.modified
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn is_version(&self, version: &str) -> bool {
        self.version() == Some(version)
    }
}

/// A provider bound package. Its metadata is fetched once and memoized.
pub struct Package {
    provider: Arc<dyn Provider>,
    dependency: Dependency,
    info: OnceCell<PackageInfo>,
}

impl fmt::Debug for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Package")
            .field("provider", &self.provider.name())
            .field("dependency", &self.dependency)
            .finish()
    }
}

impl Package {
    pub fn new(provider: Arc<dyn Provider>, dependency: Dependency) -> Self {
        Self {
            provider,
            dependency,
            info: OnceCell::new(),
        }
    }

    /// Ask `provider` for `name` at `version` and wrap the result
    pub async fn locate(
        provider: Arc<dyn Provider>,
        name: &str,
        version: &str,
        verify: bool,
        refresh: bool,
    ) -> Result<Self, ProviderError> {
        let dependency = provider
            .find_package(name, version, verify, refresh)
            .await?;
        Ok(Self::new(provider, dependency))
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    pub fn dependency(&self) -> &Dependency {
        &self.dependency
    }

    pub fn name(&self) -> &str {
        &self.dependency.name
    }

    pub fn version(&self) -> &str {
        &self.dependency.version
    }

    pub fn display_name(&self) -> String {
        format!("{}-{}", self.dependency.name, self.dependency.version)
    }

    /// Declared metadata, fetched on first use.
    ///
    /// `local_hint` points at a previously bound directory whose valid working copy
    /// can answer without a remote fetch.
    pub async fn info(
        &self,
        local_hint: Option<&Path>,
        refresh: bool,
    ) -> Result<&PackageInfo, ProviderError> {
        self.info
            .get_or_try_init(|| {
                self.provider
                    .get_package_info(&self.dependency, local_hint, refresh)
            })
            .await
    }

    pub async fn dependencies(
        &self,
        local_hint: Option<&Path>,
        refresh: bool,
    ) -> Result<Vec<Dependency>, ProviderError> {
        Ok(self.info(local_hint, refresh).await?.dependency_list())
    }

    pub async fn local_status(&self, dir: &Path) -> Result<PackageStatus, ProviderError> {
        self.provider.local_status(&self.dependency, dir).await
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dependency)
    }
}

/// A package paired with the absolute directory it lives in
#[derive(Debug, Clone)]
pub struct PackageBinding {
    package: Arc<Package>,
    dir: PathBuf,
}

impl PackageBinding {
    pub fn new(package: Arc<Package>, dir: impl Into<PathBuf>) -> Self {
        Self {
            package,
            dir: dir.into(),
        }
    }

    pub fn package(&self) -> &Arc<Package> {
        &self.package
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn display_name(&self) -> String {
        self.package.display_name()
    }

    pub async fn status(&self) -> Result<PackageStatus, ProviderError> {
        self.package.local_status(&self.dir).await
    }

    pub async fn is_installed(&self) -> Result<bool, ProviderError> {
        Ok(self.status().await?.is_installed())
    }

    pub async fn checkout(&self) -> Result<(), ProviderError> {
        tracing::debug!(
            "Checking out {} -> {}",
            self.display_name(),
            self.dir.display()
        );
        self.package
            .provider()
            .checkout(self.package.dependency(), &self.dir)
            .await
    }

    pub async fn update(&self) -> Result<bool, ProviderError> {
        self.package
            .provider()
            .update(self.package.dependency(), &self.dir)
            .await
    }

    pub async fn change_version(&self, force: bool) -> Result<bool, ProviderError> {
        self.package
            .provider()
            .change_version(self.package.dependency(), &self.dir, force)
            .await
    }

    /// Like `change_version`, but a refused switch is an error
    pub async fn switch_version(&self, force: bool) -> DepsyncResult<()> {
        let from = self.status().await?.version.unwrap_or_default();
        if self.change_version(force).await? {
            Ok(())
        } else {
            Err(DepsyncError::change_version_refused(
                self.package.name(),
                from,
                self.package.version(),
            ))
        }
    }
}
