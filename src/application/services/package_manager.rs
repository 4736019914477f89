use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::common::result::DepsyncResult;
use crate::domain::entities::dependency::Dependency;
use crate::domain::entities::package::Package;
use crate::infrastructure::provider::ProviderRegistry;

/// Hands out packages from the registered providers, memoized for the process run.
#[derive(Debug)]
pub struct PackageManager {
    registry: ProviderRegistry,
    verify: bool,
    packages: Mutex<HashMap<String, Arc<Package>>>,
}

impl PackageManager {
    pub fn new(registry: ProviderRegistry) -> Self {
        Self {
            registry,
            verify: false,
            packages: Mutex::new(HashMap::new()),
        }
    }

    /// Confirm every ref upstream when a package is first located
    pub fn with_verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Package `name` at `version` from the provider called `source`.
    ///
    /// The first call locates the package; later calls return the same instance
    /// unless `refresh` asks for it to be located again.
    pub async fn get_package(
        &self,
        source: &str,
        name: &str,
        version: &str,
        refresh: bool,
    ) -> DepsyncResult<Arc<Package>> {
        let key = format!("{}-{}-{}", source, name, version);
        if !refresh {
            if let Some(package) = self.packages.lock().await.get(&key) {
                return Ok(Arc::clone(package));
            }
        }

        let provider = self.registry.get(source)?;
        tracing::debug!("Locating {}:{}:{} (verify: {})", source, name, version, self.verify);
        let package = Arc::new(
            Package::locate(provider, name, version, self.verify, refresh).await?,
        );

        self.packages
            .lock()
            .await
            .insert(key, Arc::clone(&package));
        Ok(package)
    }

    pub async fn get(&self, dependency: &Dependency, refresh: bool) -> DepsyncResult<Arc<Package>> {
        self.get_package(
            &dependency.source,
            &dependency.name,
            &dependency.version,
            refresh,
        )
        .await
    }
}
