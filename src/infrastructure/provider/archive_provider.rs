use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs as async_fs;
use tokio::sync::Mutex;

use super::provider_config::ArchiveProviderConfig;
use super::provider_interface::{
    sanitize_path_component, Provider, ProviderContext, ProviderError, ProviderQuery,
};
use crate::domain::entities::dependency::Dependency;
use crate::domain::entities::package::PackageStatus;
use crate::domain::entities::package_info::{PackageInfo, PACKAGE_INFO_FILENAME};
use crate::domain::value_objects::provider_kind::ProviderKind;
use crate::infrastructure::filesystem::archive::{extract_archive, sanitize_relative_path};

const ARCHIVE_NAME_OPTION: &str = "archive_name";
const REMOTE_VERSION_OPTION: &str = "remote_version";
const VERSION_OPTION: &str = "version";
const INDEX_FILENAME: &str = "index.json";

/// Prebuilt packages published as archives under `<host>/<platform>/<name>/<version>/`
pub struct ArchiveProvider {
    name: String,
    base_url: String,
    client: reqwest::Client,
    context: ProviderContext,
    /// Remote url -> downloaded file, per run
    downloads: Mutex<HashMap<String, PathBuf>>,
    info_memo: Mutex<HashMap<String, PackageInfo>>,
}

impl ArchiveProvider {
    pub fn new(config: &ArchiveProviderConfig, context: ProviderContext) -> Result<Self, ProviderError> {
        let host = config.validated_host()?;
        let client = reqwest::Client::builder()
            .user_agent(concat!("depsync/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            name: config.name.clone(),
            base_url: format!("{}/{}", host, config.platform()),
            client,
            context,
            downloads: Mutex::new(HashMap::new()),
            info_memo: Mutex::new(HashMap::new()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn package_url(&self, name: &str, version: &str) -> String {
        format!("{}/{}/{}", self.base_url, name, version)
    }

    fn download_dir(&self, dependency: &Dependency) -> PathBuf {
        self.context
            .provider_dir(&self.name)
            .join("downloads")
            .join(format!(
                "{}_{}",
                sanitize_path_component(&dependency.name),
                sanitize_path_component(&dependency.version)
            ))
    }

    /// Download `<package url>/<rel_path>` into the package's download folder.
    ///
    /// Each url is fetched at most once per run. `rel_path` must stay inside
    /// the download folder.
    async fn cache_package_file(
        &self,
        dependency: &Dependency,
        rel_path: &str,
    ) -> Result<PathBuf, ProviderError> {
        let relative = sanitize_relative_path(Path::new(rel_path))
            .ok()
            .filter(|path| !path.as_os_str().is_empty())
            .ok_or_else(|| {
                ProviderError::info_unavailable(
                    &self.name,
                    dependency,
                    format!("'{}' is not a relative file path", rel_path),
                )
            })?;
        let url = format!(
            "{}/{}",
            self.package_url(&dependency.name, &dependency.version),
            rel_path
        );

        let mut downloads = self.downloads.lock().await;
        if let Some(path) = downloads.get(&url) {
            return Ok(path.clone());
        }

        let dest = self.download_dir(dependency).join(relative);
        tracing::debug!("Download {} -> {}", url, dest.display());
        if let Some(parent) = dest.parent() {
            async_fs::create_dir_all(parent).await?;
        }
        let bytes = self.fetch_bytes(&url).await?;
        async_fs::write(&dest, bytes).await?;

        downloads.insert(url, dest.clone());
        Ok(dest)
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, ProviderError> {
        if url.starts_with("file://") {
            let path = url::Url::parse(url)
                .ok()
                .and_then(|u| u.to_file_path().ok())
                .ok_or_else(|| ProviderError::invalid_param(&self.name, "host", format!("'{}' is not a local path", url)))?;
            return Ok(async_fs::read(path).await?);
        }

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(ProviderError::HttpStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }

    async fn fetch_index(&self, url: &str) -> Result<Vec<String>, ProviderError> {
        let bytes = self.fetch_bytes(url).await?;
        serde_json::from_slice(&bytes).map_err(|e| {
            ProviderError::Initialization {
                provider: self.name.clone(),
                reason: format!("Invalid index at {}: {}", url, e),
            }
        })
    }

    /// Version recorded in a checkout's info file, when it belongs to `dependency`'s package
    async fn installed_version(&self, dependency: &Dependency, dir: &Path) -> Option<String> {
        let info = PackageInfo::load(&dir.join(PACKAGE_INFO_FILENAME)).await.ok()?;
        let recorded = Dependency::parse_one(info.get_str_option(VERSION_OPTION)?).ok()?;
        (recorded.name == dependency.name).then_some(recorded.version)
    }
}

#[async_trait]
impl Provider for ArchiveProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Archive
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
        if verify {
            if let Err(e) = self.get_package_info(&dependency, None, refresh).await {
                tracing::debug!("Could not find {}-{}: {}", name, version, e);
                return Err(ProviderError::not_found(
                    &self.name,
                    name,
                    version,
                    "Package or version does not exist",
                ));
            }
        }
        Ok(dependency)
    }

    async fn get_package_info(
        &self,
        dependency: &Dependency,
        local_dir: Option<&Path>,
        _refresh: bool,
    ) -> Result<PackageInfo, ProviderError> {
        let key = format!("{}:{}", dependency.name, dependency.version);
        if let Some(info) = self.info_memo.lock().await.get(&key) {
            return Ok(info.clone());
        }

        let local = match local_dir {
            Some(dir) if self.installed_version(dependency, dir).await.as_deref()
                == Some(dependency.version.as_str()) =>
            {
                PackageInfo::load(&dir.join(PACKAGE_INFO_FILENAME)).await.ok()
            }
            _ => None,
        };

        let info = match local {
            Some(info) => info,
            None => {
                let path = self
                    .cache_package_file(dependency, PACKAGE_INFO_FILENAME)
                    .await
                    .map_err(|e| ProviderError::info_unavailable(&self.name, dependency, e.to_string()))?;
                PackageInfo::load(&path)
                    .await
                    .map_err(|e| ProviderError::info_unavailable(&self.name, dependency, e.to_string()))?
            }
        };

        self.info_memo.lock().await.insert(key, info.clone());
        Ok(info)
    }

    async fn local_status(
        &self,
        dependency: &Dependency,
        dir: &Path,
    ) -> Result<PackageStatus, ProviderError> {
        if !dir.join(PACKAGE_INFO_FILENAME).exists() {
            return Ok(PackageStatus::not_installed());
        }
        Ok(match self.installed_version(dependency, dir).await {
            Some(version) => PackageStatus::clean(version),
            None => PackageStatus::invalid(),
        })
    }

    async fn checkout(&self, dependency: &Dependency, dir: &Path) -> Result<(), ProviderError> {
        if dir.exists() {
            return Err(ProviderError::LocalConflict {
                path: dir.to_path_buf(),
            });
        }

        let info = self.get_package_info(dependency, None, false).await?;
        let archive_name = info
            .get_str_option(ARCHIVE_NAME_OPTION)
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}.tar.gz", dependency.name));

        let archive = self.cache_package_file(dependency, &archive_name).await?;
        tracing::debug!("Extracting {} -> {}", archive.display(), dir.display());
        extract_archive(&archive, dir).await?;

        let mut local_info = info;
        local_info.add_option(
            REMOTE_VERSION_OPTION,
            self.package_url(&dependency.name, &dependency.version),
        );
        local_info.add_option(VERSION_OPTION, dependency.to_string());
        local_info
            .save(&dir.join(PACKAGE_INFO_FILENAME))
            .await
            .map_err(|e| ProviderError::info_unavailable(&self.name, dependency, e.to_string()))?;
        Ok(())
    }

    /// Archives have no incremental fetch
    async fn update(&self, _dependency: &Dependency, _dir: &Path) -> Result<bool, ProviderError> {
        Ok(false)
    }

    async fn change_version(
        &self,
        dependency: &Dependency,
        dir: &Path,
        _force: bool,
    ) -> Result<bool, ProviderError> {
        let status = self.local_status(dependency, dir).await?;
        if status.is_valid() && status.is_version(&dependency.version) {
            return Ok(true);
        }

        if dir.exists() {
            tracing::info!("Removing {}", dir.display());
            async_fs::remove_dir_all(dir).await?;
        }
        self.checkout(dependency, dir).await?;
        Ok(true)
    }

    fn query(&self) -> Option<&dyn ProviderQuery> {
        Some(self)
    }
}

#[async_trait]
impl ProviderQuery for ArchiveProvider {
    async fn list_projects(&self) -> Result<Vec<String>, ProviderError> {
        self.fetch_index(&format!("{}/{}", self.base_url, INDEX_FILENAME))
            .await
    }

    async fn list_versions(&self, project: &str) -> Result<Vec<String>, ProviderError> {
        self.fetch_index(&format!("{}/{}/{}", self.base_url, project, INDEX_FILENAME))
            .await
    }
}
