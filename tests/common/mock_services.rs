//! Mock services for testing
//!
//! [`MemoryProvider`] serves packages from an in-memory table and keeps its
//! working copies as plain directories holding a `.memory-version` marker.
//! A `.memory-modified` file inside a copy simulates local modifications.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use depsync::domain::entities::dependency::Dependency;
use depsync::domain::entities::package::PackageStatus;
use depsync::domain::entities::package_info::PackageInfo;
use depsync::domain::value_objects::provider_kind::ProviderKind;
use depsync::infrastructure::provider::{Provider, ProviderError, ProviderQuery};

pub const VERSION_MARKER: &str = ".memory-version";
pub const MODIFIED_MARKER: &str = ".memory-modified";

/// In-memory provider with call history
pub struct MemoryProvider {
    name: String,
    packages: HashMap<(String, String), PackageInfo>,
    call_history: Arc<Mutex<Vec<String>>>,
}

impl MemoryProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            packages: HashMap::new(),
            call_history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Register `name:version` declaring `dependencies`
    pub fn with_package(mut self, name: &str, version: &str, dependencies: &[&str]) -> Self {
        self.packages.insert(
            (name.to_string(), version.to_string()),
            PackageInfo::new().with_dependencies(dependencies.iter().copied()),
        );
        self
    }

    /// Register a package together with a workspace mapping
    pub fn with_mapped_package(
        mut self,
        name: &str,
        version: &str,
        mapping: &str,
        dependencies: &[&str],
    ) -> Self {
        self.packages.insert(
            (name.to_string(), version.to_string()),
            PackageInfo::new()
                .with_dependencies(dependencies.iter().copied())
                .with_workspace_mapping(mapping),
        );
        self
    }

    pub fn history(&self) -> Vec<String> {
        self.call_history.lock().unwrap().clone()
    }

    pub fn calls_to(&self, operation: &str) -> usize {
        self.history()
            .iter()
            .filter(|call| call.starts_with(operation))
            .count()
    }

    fn record(&self, call: String) {
        self.call_history.lock().unwrap().push(call);
    }

    fn write_version(dir: &Path, version: &str) -> Result<(), ProviderError> {
        std::fs::create_dir_all(dir)?;
        std::fs::write(dir.join(VERSION_MARKER), version)?;
        Ok(())
    }
}

#[async_trait]
impl Provider for MemoryProvider {
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
        _refresh: bool,
    ) -> Result<Dependency, ProviderError> {
        self.record(format!("find {}:{}", name, version));
        if verify && !self.packages.contains_key(&(name.to_string(), version.to_string())) {
            return Err(ProviderError::not_found(
                &self.name,
                name,
                version,
                "Version does not exist",
            ));
        }
        Ok(Dependency::new(&self.name, name, version))
    }

    async fn get_package_info(
        &self,
        dependency: &Dependency,
        _local_dir: Option<&Path>,
        _refresh: bool,
    ) -> Result<PackageInfo, ProviderError> {
        self.record(format!("info {}:{}", dependency.name, dependency.version));
        self.packages
            .get(&(dependency.name.clone(), dependency.version.clone()))
            .cloned()
            .ok_or_else(|| ProviderError::info_unavailable(&self.name, dependency, "unknown package"))
    }

    async fn local_status(
        &self,
        _dependency: &Dependency,
        dir: &Path,
    ) -> Result<PackageStatus, ProviderError> {
        if !dir.exists() {
            return Ok(PackageStatus::not_installed());
        }
        let version = match std::fs::read_to_string(dir.join(VERSION_MARKER)) {
            Ok(version) => version,
            Err(_) => return Ok(PackageStatus::invalid()),
        };
        let status = PackageStatus::clean(version.trim());
        if dir.join(MODIFIED_MARKER).exists() {
            Ok(status.with_raw_modifications(format!(" M {}\n", MODIFIED_MARKER)))
        } else {
            Ok(status)
        }
    }

    async fn checkout(&self, dependency: &Dependency, dir: &Path) -> Result<(), ProviderError> {
        self.record(format!("checkout {}", dependency));
        if dir.exists() {
            return Err(ProviderError::LocalConflict {
                path: dir.to_path_buf(),
            });
        }
        Self::write_version(dir, &dependency.version)
    }

    async fn update(&self, dependency: &Dependency, dir: &Path) -> Result<bool, ProviderError> {
        self.record(format!("update {}", dependency));
        Ok(dir.join(VERSION_MARKER).exists())
    }

    async fn change_version(
        &self,
        dependency: &Dependency,
        dir: &Path,
        force: bool,
    ) -> Result<bool, ProviderError> {
        self.record(format!("change {}", dependency));
        let modified = dir.join(MODIFIED_MARKER);
        if modified.exists() {
            if !force {
                return Ok(false);
            }
            std::fs::remove_file(&modified)?;
        }
        Self::write_version(dir, &dependency.version)?;
        Ok(true)
    }

    fn query(&self) -> Option<&dyn ProviderQuery> {
        Some(self)
    }
}

#[async_trait]
impl ProviderQuery for MemoryProvider {
    async fn list_projects(&self) -> Result<Vec<String>, ProviderError> {
        let mut projects: Vec<String> = self.packages.keys().map(|(name, _)| name.clone()).collect();
        projects.sort();
        projects.dedup();
        Ok(projects)
    }

    async fn list_versions(&self, project: &str) -> Result<Vec<String>, ProviderError> {
        let mut versions: Vec<String> = self
            .packages
            .keys()
            .filter(|(name, _)| name == project)
            .map(|(_, version)| version.clone())
            .collect();
        versions.sort();
        Ok(versions)
    }
}
