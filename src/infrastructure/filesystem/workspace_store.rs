use std::path::Path;
use thiserror::Error;
use tokio::fs as async_fs;

use crate::domain::entities::binding_snapshot::BindingSnapshot;
use crate::domain::entities::workspace_manifest::WorkspaceManifest;

/// Line after which `.gitignore` entries are managed
pub const GITIGNORE_MARKER: &str = "# ignore embedded dependencies";

/// Workspace file store related errors
#[derive(Debug, Error)]
pub enum WorkspaceStoreError {
    #[error("Manifest file not found at path: {0}")]
    ManifestNotFound(String),

    #[error("File read failed: {0}")]
    ReadFailed(String),

    #[error("File write failed: {0}")]
    WriteFailed(String),

    #[error("YAML parsing failed in {path}: {reason}")]
    YamlParsingFailed { path: String, reason: String },

    #[error("Backup operation failed: {0}")]
    BackupFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Backup policy for rewritten files
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Whether to create backup before overwriting the manifest
    pub create_backup: bool,

    /// Maximum number of backup files to keep
    pub max_backups: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            create_backup: true,
            max_backups: 5,
        }
    }
}

/// Reads and writes the workspace manifest, the local snapshot and `.gitignore`
#[derive(Debug, Clone, Default)]
pub struct WorkspaceStore {
    config: StoreConfig,
}

impl WorkspaceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: StoreConfig) -> Self {
        Self { config }
    }

    /// Read and parse the workspace manifest
    pub async fn read_manifest<P: AsRef<Path>>(
        &self,
        manifest_path: P,
    ) -> Result<WorkspaceManifest, WorkspaceStoreError> {
        let manifest_path = manifest_path.as_ref();

        if !manifest_path.exists() {
            return Err(WorkspaceStoreError::ManifestNotFound(
                manifest_path.display().to_string(),
            ));
        }

        let contents = async_fs::read_to_string(manifest_path)
            .await
            .map_err(|e| WorkspaceStoreError::ReadFailed(e.to_string()))?;

        serde_yaml::from_str(&contents).map_err(|e| WorkspaceStoreError::YamlParsingFailed {
            path: manifest_path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Write the workspace manifest, backing up the previous file
    pub async fn write_manifest<P: AsRef<Path>>(
        &self,
        manifest_path: P,
        manifest: &WorkspaceManifest,
    ) -> Result<(), WorkspaceStoreError> {
        let manifest_path = manifest_path.as_ref();

        if self.config.create_backup && manifest_path.exists() {
            self.create_backup(manifest_path).await?;
        }

        self.write_yaml(manifest_path, manifest).await
    }

    /// Read the local snapshot, `None` when no update has run yet
    pub async fn read_snapshot<P: AsRef<Path>>(
        &self,
        snapshot_path: P,
    ) -> Result<Option<BindingSnapshot>, WorkspaceStoreError> {
        let snapshot_path = snapshot_path.as_ref();
        if !snapshot_path.exists() {
            return Ok(None);
        }

        let contents = async_fs::read_to_string(snapshot_path)
            .await
            .map_err(|e| WorkspaceStoreError::ReadFailed(e.to_string()))?;
        if contents.trim().is_empty() {
            return Ok(Some(BindingSnapshot::new()));
        }

        serde_yaml::from_str(&contents)
            .map(Some)
            .map_err(|e| WorkspaceStoreError::YamlParsingFailed {
                path: snapshot_path.display().to_string(),
                reason: e.to_string(),
            })
    }

    pub async fn write_snapshot<P: AsRef<Path>>(
        &self,
        snapshot_path: P,
        snapshot: &BindingSnapshot,
    ) -> Result<(), WorkspaceStoreError> {
        self.write_yaml(snapshot_path.as_ref(), snapshot).await
    }

    /// Rewrite the managed block of a `.gitignore` file.
    ///
    /// Lines before the marker are kept, everything after it is replaced by `entries`.
    pub async fn update_gitignore<P: AsRef<Path>>(
        &self,
        gitignore_path: P,
        entries: &[String],
    ) -> Result<(), WorkspaceStoreError> {
        let gitignore_path = gitignore_path.as_ref();
        let existing = if gitignore_path.exists() {
            async_fs::read_to_string(gitignore_path)
                .await
                .map_err(|e| WorkspaceStoreError::ReadFailed(e.to_string()))?
        } else {
            String::new()
        };

        let mut contents = String::new();
        for line in existing.lines() {
            if line.trim_end() == GITIGNORE_MARKER {
                break;
            }
            contents.push_str(line);
            contents.push('\n');
        }

        contents.push_str(GITIGNORE_MARKER);
        contents.push('\n');
        for entry in entries {
            contents.push_str(entry);
            contents.push('\n');
        }

        async_fs::write(gitignore_path, contents)
            .await
            .map_err(|e| WorkspaceStoreError::WriteFailed(e.to_string()))
    }

    async fn write_yaml<T: serde::Serialize>(
        &self,
        path: &Path,
        value: &T,
    ) -> Result<(), WorkspaceStoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                async_fs::create_dir_all(parent).await?;
            }
        }

        let yaml_content = serde_yaml::to_string(value)?;
        async_fs::write(path, yaml_content)
            .await
            .map_err(|e| WorkspaceStoreError::WriteFailed(e.to_string()))
    }

    /// Create backup of a file
    async fn create_backup(&self, file_path: &Path) -> Result<(), WorkspaceStoreError> {
        let file_name = file_path
            .file_name()
            .ok_or_else(|| WorkspaceStoreError::BackupFailed(file_path.display().to_string()))?
            .to_string_lossy()
            .into_owned();

        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
        let backup_path = file_path.with_file_name(format!("{}.bak_{}", file_name, timestamp));

        async_fs::copy(file_path, &backup_path)
            .await
            .map_err(|e| WorkspaceStoreError::BackupFailed(e.to_string()))?;
        tracing::debug!("Backed up {} to {}", file_path.display(), backup_path.display());

        self.cleanup_old_backups(file_path, &file_name).await;
        Ok(())
    }

    /// Keep only the newest `max_backups` backups of a file
    async fn cleanup_old_backups(&self, file_path: &Path, file_name: &str) {
        let parent = file_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let prefix = format!("{}.bak_", file_name);

        let mut backups = Vec::new();
        if let Ok(mut entries) = async_fs::read_dir(parent).await {
            while let Ok(Some(entry)) = entries.next_entry().await {
                if entry.file_name().to_string_lossy().starts_with(&prefix) {
                    backups.push(entry.path());
                }
            }
        }

        // Timestamped names sort chronologically; newest first
        backups.sort();
        backups.reverse();

        for backup in backups.iter().skip(self.config.max_backups) {
            if let Err(e) = async_fs::remove_file(backup).await {
                tracing::debug!("Failed to remove old backup {}: {}", backup.display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::binding_snapshot::{BindingRecord, BindingState};
    use crate::domain::entities::dependency::Dependency;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_read_nonexistent_manifest() {
        let temp_dir = TempDir::new().unwrap();
        let store = WorkspaceStore::new();
        let result = store.read_manifest(temp_dir.path().join("depsync.yaml")).await;
        assert!(matches!(result, Err(WorkspaceStoreError::ManifestNotFound(_))));
    }

    #[tokio::test]
    async fn test_write_and_read_manifest() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("depsync.yaml");
        let store = WorkspaceStore::new();
        let manifest = WorkspaceManifest::new()
            .with_dependencies(["hub:core:master"])
            .with_mapping("deps", "@{root}/deps");

        store.write_manifest(&path, &manifest).await.unwrap();
        assert_eq!(store.read_manifest(&path).await.unwrap(), manifest);
    }

    #[tokio::test]
    async fn test_backup_functionality() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("depsync.yaml");
        let store = WorkspaceStore::new();
        let manifest = WorkspaceManifest::new().with_dependencies(["hub:core:master"]);

        store.write_manifest(&path, &manifest).await.unwrap();
        let mut modified = manifest.clone();
        modified.add_dependency(&Dependency::new("hub", "zlib", "v1"));
        store.write_manifest(&path, &modified).await.unwrap();

        let mut backup_found = false;
        let mut entries = async_fs::read_dir(temp_dir.path()).await.unwrap();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            if entry.file_name().to_string_lossy().contains("depsync.yaml.bak_") {
                backup_found = true;
            }
        }
        assert!(backup_found);
    }

    #[tokio::test]
    async fn test_invalid_yaml_reports_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("depsync.yaml");
        std::fs::write(&path, "dependencies: [unclosed").unwrap();
        let result = WorkspaceStore::new().read_manifest(&path).await;
        assert!(matches!(result, Err(WorkspaceStoreError::YamlParsingFailed { .. })));
    }

    #[tokio::test]
    async fn test_snapshot_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("depsync.local.yaml");
        let store = WorkspaceStore::new();
        assert_eq!(store.read_snapshot(&path).await.unwrap(), None);

        let mut snapshot = BindingSnapshot::new();
        snapshot.push(BindingRecord::new(
            &Dependency::new("hub", "core", "master"),
            "deps/core",
            BindingState::Pristine,
        ));
        store.write_snapshot(&path, &snapshot).await.unwrap();
        assert_eq!(store.read_snapshot(&path).await.unwrap(), Some(snapshot));
    }

    #[tokio::test]
    async fn test_update_gitignore_replaces_managed_block() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".gitignore");
        std::fs::write(
            &path,
            format!("target/\n*.log\n{}\ndeps/old/\n", GITIGNORE_MARKER),
        )
        .unwrap();

        let store = WorkspaceStore::new();
        store
            .update_gitignore(&path, &["deps/core/".to_string(), "deps/zlib/".to_string()])
            .await
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            format!("target/\n*.log\n{}\ndeps/core/\ndeps/zlib/\n", GITIGNORE_MARKER)
        );
    }

    #[tokio::test]
    async fn test_update_gitignore_creates_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".gitignore");
        WorkspaceStore::new()
            .update_gitignore(&path, &["deps/core/".to_string()])
            .await
            .unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            format!("{}\ndeps/core/\n", GITIGNORE_MARKER)
        );
    }
}
