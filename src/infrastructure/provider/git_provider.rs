use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tokio::fs as async_fs;
use tokio::sync::Mutex;

use super::github_query::GithubQuery;
use super::provider_config::{GitProviderConfig, QueryConfig};
use super::provider_interface::{
    sanitize_path_component, Provider, ProviderContext, ProviderError, ProviderQuery,
};
use crate::domain::entities::dependency::Dependency;
use crate::domain::entities::package::PackageStatus;
use crate::domain::entities::package_info::{PackageInfo, PACKAGE_INFO_FILENAME};
use crate::domain::value_objects::provider_kind::ProviderKind;
use crate::infrastructure::scm::GitScm;

/// Packages hosted as git repositories under a common host url
pub struct GitProvider {
    name: String,
    host: String,
    credentials: Option<(String, String)>,
    scm: GitScm,
    context: ProviderContext,
    github: Option<GithubQuery>,
    info_memo: Mutex<HashMap<String, PackageInfo>>,
    /// Working copies already pulled during this run
    refreshed: Mutex<HashSet<PathBuf>>,
}

impl GitProvider {
    pub fn new(config: &GitProviderConfig, context: ProviderContext) -> Result<Self, ProviderError> {
        Self::with_scm(config, context, GitScm::new())
    }

    pub fn with_scm(
        config: &GitProviderConfig,
        context: ProviderContext,
        scm: GitScm,
    ) -> Result<Self, ProviderError> {
        let host = config.validated_host()?;

        let credentials = match (&config.username, &config.password) {
            (Some(username), Some(password)) if !config.anonymous => {
                Some((username.clone(), password.clone()))
            }
            _ => None,
        };

        let github = match &config.query {
            Some(QueryConfig::Github(github)) => Some(GithubQuery::new(github)?),
            None => None,
        };

        Ok(Self {
            name: config.name.clone(),
            host,
            credentials,
            scm,
            context,
            github,
            info_memo: Mutex::new(HashMap::new()),
            refreshed: Mutex::new(HashSet::new()),
        })
    }

    /// Remote url of a package: `<host>/<name>.git`, with credentials when configured
    pub fn package_url(&self, name: &str) -> String {
        let plain = format!("{}/{}.git", self.host, name);
        let Some((username, password)) = &self.credentials else {
            return plain;
        };

        match url::Url::parse(&plain) {
            Ok(mut url) => {
                if url.set_username(username).is_err() || url.set_password(Some(password)).is_err() {
                    return plain;
                }
                url.to_string()
            }
            Err(_) => plain,
        }
    }

    fn cache_key(&self, name: &str, version: &str) -> String {
        format!("{}-{}-{}", self.name, name, version)
    }

    fn info_cache_key(&self, dependency: &Dependency) -> String {
        format!(
            "{}.info",
            self.cache_key(&dependency.name, &dependency.version)
        )
    }

    /// Private clone used to read metadata of packages that are not checked out
    fn package_cache_dir(&self, dependency: &Dependency) -> PathBuf {
        self.context
            .provider_dir(&self.name)
            .join(format!(
                "{}_{}",
                sanitize_path_component(&dependency.name),
                sanitize_path_component(&dependency.version)
            ))
    }

    async fn is_ref_on_remote(&self, name: &str, version: &str) -> Result<bool, ProviderError> {
        let refs = self
            .scm
            .ls_remote(&self.package_url(name))
            .await
            .map_err(|e| ProviderError::not_found(&self.name, name, version, e.to_string()))?;
        Ok(refs.iter().any(|r| r.short_name() == version))
    }

    /// Pull a working copy once per run
    async fn refresh_once(&self, dir: &Path) {
        let mut refreshed = self.refreshed.lock().await;
        if refreshed.contains(dir) {
            return;
        }
        tracing::debug!("Refreshing {}", dir.display());
        if let Err(e) = self.scm.pull(dir).await {
            tracing::warn!("Failed to refresh {}: {}", dir.display(), e);
        }
        refreshed.insert(dir.to_path_buf());
    }

    /// A valid working copy of `dependency` at `dir`, checked out at its version
    async fn is_usable_copy(&self, dependency: &Dependency, dir: &Path) -> bool {
        if !self.scm.is_working_copy(dir).await {
            return false;
        }
        matches!(
            self.scm.current_version(dir).await,
            Ok(version) if version == dependency.version
        )
    }

    async fn read_info(&self, dependency: &Dependency, dir: &Path) -> Result<PackageInfo, ProviderError> {
        let path = dir.join(PACKAGE_INFO_FILENAME);
        if !path.exists() {
            return Err(ProviderError::info_unavailable(
                &self.name,
                dependency,
                format!("{} is missing", PACKAGE_INFO_FILENAME),
            ));
        }
        PackageInfo::load(&path)
            .await
            .map_err(|e| ProviderError::info_unavailable(&self.name, dependency, e.to_string()))
    }

    /// Package info read from the private clone, kept in the expiring cache.
    ///
    /// A cache miss pulls an existing clone, so branch refs pick up new
    /// dependencies once the cached entry expires.
    async fn fetch_info(
        &self,
        dependency: &Dependency,
        refresh: bool,
    ) -> Result<PackageInfo, ProviderError> {
        let key = self.info_cache_key(dependency);
        if !refresh {
            if let Some(info) = self.context.cache().load::<PackageInfo>(&key).await {
                tracing::debug!("Package info for {} (cached)", dependency);
                return Ok(info);
            }
        }

        let dir = self.package_cache_dir(dependency);
        if self.scm.is_working_copy(&dir).await {
            self.refresh_once(&dir).await;
        } else {
            if dir.exists() {
                async_fs::remove_dir_all(&dir).await?;
            }
            self.clone_into(dependency, &dir).await?;
        }
        let info = self.read_info(dependency, &dir).await?;

        let config = self.context.cache_config();
        if let Err(e) = self
            .context
            .cache()
            .save(&key, &info, config.ttl, Some(config.jitter))
            .await
        {
            tracing::warn!("Failed to cache package info of {}: {}", dependency, e);
        }
        Ok(info)
    }

    async fn clone_into(&self, dependency: &Dependency, dir: &Path) -> Result<(), ProviderError> {
        if let Some(parent) = dir.parent() {
            async_fs::create_dir_all(parent).await?;
        }
        self.scm
            .clone_branch(&self.package_url(&dependency.name), &dependency.version, dir)
            .await
            .map_err(|e| {
                ProviderError::not_found(
                    &self.name,
                    &dependency.name,
                    &dependency.version,
                    format!("Could not be checked out: {}", e),
                )
            })
    }
}

#[async_trait]
impl Provider for GitProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Git
    }

    async fn find_package(
        &self,
        name: &str,
        version: &str,
        verify: bool,
        refresh: bool,
    ) -> Result<Dependency, ProviderError> {
        tracing::debug!("Looking for package {}-{}", name, version);
        let dependency = Dependency::new(&self.name, name, version);
        if !verify {
            return Ok(dependency);
        }

        let key = self.cache_key(name, version);
        if !refresh && self.context.cache().load::<bool>(&key).await == Some(true) {
            tracing::debug!("Found package {}-{} (cached)", name, version);
            return Ok(dependency);
        }

        if !self.is_ref_on_remote(name, version).await? {
            tracing::debug!("Could not find {}-{}", name, version);
            return Err(ProviderError::not_found(
                &self.name,
                name,
                version,
                "Version does not exist",
            ));
        }

        let config = self.context.cache_config();
        if let Err(e) = self
            .context
            .cache()
            .save(&key, &true, config.ttl, Some(config.jitter))
            .await
        {
            tracing::warn!("Failed to cache lookup of {}-{}: {}", name, version, e);
        }
        tracing::debug!("Found package {}-{}", name, version);
        Ok(dependency)
    }

    async fn get_package_info(
        &self,
        dependency: &Dependency,
        local_dir: Option<&Path>,
        refresh: bool,
    ) -> Result<PackageInfo, ProviderError> {
        let key = format!("{}:{}", dependency.name, dependency.version);
        if let Some(info) = self.info_memo.lock().await.get(&key) {
            return Ok(info.clone());
        }

        tracing::debug!(
            "Getting package info for {} (refresh={})",
            dependency,
            refresh
        );

        let info = match local_dir {
            Some(dir) if self.is_usable_copy(dependency, dir).await => {
                if refresh {
                    self.refresh_once(dir).await;
                }
                self.read_info(dependency, dir).await?
            }
            _ => self.fetch_info(dependency, refresh).await?,
        };

        self.info_memo.lock().await.insert(key, info.clone());
        Ok(info)
    }

    async fn local_status(
        &self,
        _dependency: &Dependency,
        dir: &Path,
    ) -> Result<PackageStatus, ProviderError> {
        if !dir.exists() {
            return Ok(PackageStatus::not_installed());
        }
        if !self.scm.is_working_copy(dir).await {
            return Ok(PackageStatus::invalid());
        }

        let version = self.scm.current_version(dir).await?;
        let raw = self.scm.status_porcelain(dir).await?;
        Ok(PackageStatus::clean(version).with_raw_modifications(raw))
    }

    async fn checkout(&self, dependency: &Dependency, dir: &Path) -> Result<(), ProviderError> {
        if dir.exists() {
            return Err(ProviderError::LocalConflict {
                path: dir.to_path_buf(),
            });
        }
        self.clone_into(dependency, dir).await
    }

    async fn update(&self, dependency: &Dependency, dir: &Path) -> Result<bool, ProviderError> {
        let status = self.local_status(dependency, dir).await?;
        if !status.is_installed() {
            return Ok(false);
        }
        if !status.is_valid() {
            tracing::warn!("{} is not a git working copy, not updating it", dir.display());
            return Ok(false);
        }
        self.scm.pull(dir).await?;
        Ok(true)
    }

    async fn change_version(
        &self,
        dependency: &Dependency,
        dir: &Path,
        force: bool,
    ) -> Result<bool, ProviderError> {
        let status = self.local_status(dependency, dir).await?;
        if !status.is_installed() {
            self.checkout(dependency, dir).await?;
            return Ok(true);
        }
        // Git commands in a plain directory would act on any enclosing repository
        if !status.is_valid() {
            return Err(ProviderError::LocalConflict {
                path: dir.to_path_buf(),
            });
        }
        if status.is_version(&dependency.version) {
            return Ok(true);
        }

        if status.is_modified() {
            if !force {
                return Ok(false);
            }
            self.scm.stash(dir).await?;
            tracing::info!("Stashed modifications to {}", dir.display());
        }

        if let Err(e) = self.scm.fetch(dir).await {
            tracing::warn!("Failed to fetch {}: {}", dir.display(), e);
        }
        self.scm.checkout(dir, &dependency.version).await?;
        Ok(true)
    }

    fn query(&self) -> Option<&dyn ProviderQuery> {
        Some(self)
    }
}

#[async_trait]
impl ProviderQuery for GitProvider {
    async fn list_projects(&self) -> Result<Vec<String>, ProviderError> {
        match &self.github {
            Some(github) => github.list_repositories().await,
            None => Ok(Vec::new()),
        }
    }

    async fn list_versions(&self, project: &str) -> Result<Vec<String>, ProviderError> {
        let refs = self.scm.ls_remote(&self.package_url(project)).await?;
        let mut versions: Vec<String> = Vec::new();
        for remote_ref in refs.iter().filter(|r| r.is_branch() || r.is_tag()) {
            let version = remote_ref.short_name().to_string();
            if !versions.contains(&version) {
                versions.push(version);
            }
        }
        Ok(versions)
    }
}
