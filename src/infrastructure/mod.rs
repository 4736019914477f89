/// Infrastructure layer modules
///
/// This layer provides concrete implementations for external system interactions:
/// - Expiring cache shared by providers
/// - Git CLI operations (clone, fetch, checkout, status)
/// - File system operations (workspace manifest, snapshot, archives)
/// - Package providers and their registry
/// - Process execution
pub mod cache;
pub mod filesystem;
pub mod process;
pub mod provider;
pub mod scm;

// Re-export commonly used types
pub use cache::{CacheConfig, ExpiringCache};
pub use filesystem::WorkspaceStore;
pub use process::CommandRunner;
pub use provider::{Provider, ProviderContext, ProviderRegistry};
pub use scm::GitScm;
