pub mod archive;
pub mod workspace_store;

pub use archive::{extract_archive, sanitize_relative_path, ArchiveError};
pub use workspace_store::{StoreConfig, WorkspaceStore, WorkspaceStoreError, GITIGNORE_MARKER};
