/// Package providers
///
/// A provider locates packages from one remote source, reads their metadata and
/// reconciles local working copies. Git repositories and platform archives are supported.
pub mod archive_provider;
pub mod git_provider;
pub mod github_query;
pub mod provider_config;
pub mod provider_interface;
pub mod provider_registry;

pub use archive_provider::ArchiveProvider;
pub use git_provider::GitProvider;
pub use provider_config::{
    ArchiveProviderConfig, GitProviderConfig, GithubQueryConfig, ProviderConfig, QueryConfig,
};
pub use provider_interface::{
    Provider, ProviderContext, ProviderError, ProviderQuery,
};
pub use provider_registry::{AggregatedQuery, ProviderFactory, ProviderRegistry};
