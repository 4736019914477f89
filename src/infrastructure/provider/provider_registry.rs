use async_trait::async_trait;
use futures::future::join_all;
use indexmap::IndexMap;
use std::sync::Arc;

use super::archive_provider::ArchiveProvider;
use super::git_provider::GitProvider;
use super::provider_config::ProviderConfig;
use super::provider_interface::{Provider, ProviderContext, ProviderError, ProviderQuery};
use crate::infrastructure::scm::GitScm;

/// Builds providers from their configuration
pub struct ProviderFactory;

impl ProviderFactory {
    pub fn create(
        config: &ProviderConfig,
        context: ProviderContext,
    ) -> Result<Arc<dyn Provider>, ProviderError> {
        let provider: Arc<dyn Provider> = match config {
            ProviderConfig::Git(git) => Arc::new(GitProvider::new(git, context)?),
            ProviderConfig::Archive(archive) => Arc::new(ArchiveProvider::new(archive, context)?),
        };
        Ok(provider)
    }
}

/// Providers by name, in registration order
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: IndexMap<String, Arc<dyn Provider>>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .finish()
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct every configured provider concurrently, then register them.
    ///
    /// Nothing is registered unless every provider was built.
    pub async fn load(
        configs: &[ProviderConfig],
        context: &ProviderContext,
    ) -> Result<Self, ProviderError> {
        if configs.iter().any(|c| matches!(c, ProviderConfig::Git(_))) {
            if let Err(e) = GitScm::new().check_availability().await {
                tracing::warn!("Git providers are configured but {}", e);
            }
        }

        let tasks: Vec<_> = configs
            .iter()
            .map(|config| {
                let config = config.clone();
                let context = context.clone();
                tokio::spawn(async move {
                    tracing::debug!("Initializing provider {} ({})", config.name(), config.kind());
                    ProviderFactory::create(&config, context)
                })
            })
            .collect();

        let mut built = Vec::with_capacity(configs.len());
        for (config, joined) in configs.iter().zip(join_all(tasks).await) {
            let provider = joined.map_err(|e| ProviderError::Initialization {
                provider: config.name().to_string(),
                reason: e.to_string(),
            })??;
            built.push(provider);
        }

        let mut registry = Self::new();
        for provider in built {
            registry.register(provider)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, provider: Arc<dyn Provider>) -> Result<(), ProviderError> {
        let name = provider.name().to_string();
        if self.providers.contains_key(&name) {
            return Err(ProviderError::DuplicateProvider(name));
        }
        self.providers.insert(name, provider);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Provider>, ProviderError> {
        self.providers
            .get(name)
            .cloned()
            .ok_or_else(|| ProviderError::UnknownProvider(name.to_string()))
    }

    pub fn names(&self) -> Vec<&str> {
        self.providers.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn providers(&self) -> impl Iterator<Item = &Arc<dyn Provider>> {
        self.providers.values()
    }

    /// Query over every provider that supports listing
    pub fn aggregated_query(&self) -> AggregatedQuery {
        AggregatedQuery {
            providers: self.providers.values().cloned().collect(),
        }
    }
}

/// Concatenates the listings of several providers.
///
/// Projects are reported as `provider:project`, and `list_versions` expects the same form.
pub struct AggregatedQuery {
    providers: Vec<Arc<dyn Provider>>,
}

impl AggregatedQuery {
    fn split_project<'a>(&self, project: &'a str) -> Result<(&'a str, &'a str), ProviderError> {
        project
            .split_once(':')
            .ok_or_else(|| ProviderError::UnknownProvider(project.to_string()))
    }
}

#[async_trait]
impl ProviderQuery for AggregatedQuery {
    async fn list_projects(&self) -> Result<Vec<String>, ProviderError> {
        let mut projects = Vec::new();
        for provider in &self.providers {
            if let Some(query) = provider.query() {
                projects.extend(
                    query
                        .list_projects()
                        .await?
                        .into_iter()
                        .map(|project| format!("{}:{}", provider.name(), project)),
                );
            }
        }
        Ok(projects)
    }

    async fn list_versions(&self, project: &str) -> Result<Vec<String>, ProviderError> {
        let (provider_name, name) = self.split_project(project)?;
        let provider = self
            .providers
            .iter()
            .find(|p| p.name() == provider_name)
            .ok_or_else(|| ProviderError::UnknownProvider(provider_name.to_string()))?;
        match provider.query() {
            Some(query) => query.list_versions(name).await,
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::provider::provider_config::{
        ArchiveProviderConfig, GitProviderConfig,
    };
    use tempfile::TempDir;

    fn configs() -> Vec<ProviderConfig> {
        vec![
            ProviderConfig::Git(GitProviderConfig::new("hub", "https://git.example.com/libs")),
            ProviderConfig::Archive(ArchiveProviderConfig::new(
                "prebuilt",
                "https://files.example.com",
            )),
        ]
    }

    #[tokio::test]
    async fn test_load_registers_in_config_order() {
        let temp = TempDir::new().unwrap();
        let registry = ProviderRegistry::load(&configs(), &ProviderContext::new(temp.path()))
            .await
            .unwrap();
        assert_eq!(registry.names(), vec!["hub", "prebuilt"]);
        assert!(registry.get("hub").is_ok());
        assert!(matches!(
            registry.get("missing"),
            Err(ProviderError::UnknownProvider(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_names_are_rejected() {
        let temp = TempDir::new().unwrap();
        let mut configs = configs();
        configs.push(ProviderConfig::Git(GitProviderConfig::new(
            "hub",
            "https://other.example.com",
        )));
        let result = ProviderRegistry::load(&configs, &ProviderContext::new(temp.path())).await;
        assert!(matches!(result, Err(ProviderError::DuplicateProvider(name)) if name == "hub"));
    }

    #[tokio::test]
    async fn test_one_bad_config_fails_the_load() {
        let temp = TempDir::new().unwrap();
        let mut configs = configs();
        configs.push(ProviderConfig::Archive(ArchiveProviderConfig {
            name: "broken".to_string(),
            ..Default::default()
        }));
        let result = ProviderRegistry::load(&configs, &ProviderContext::new(temp.path())).await;
        assert!(matches!(result, Err(ProviderError::MissingConfigParam { .. })));
    }
}
