use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::application::services::package_manager::PackageManager;
use crate::application::use_cases::foreach::{
    ForeachConfig, ForeachError, ForeachResult, ForeachTarget, ForeachUseCase,
};
use crate::application::use_cases::package_set::{
    FetchOutcome, PackageSet, PackageSetConfig, ReconcileReport, UpdateOptions,
};
use crate::common::error::DepsyncError;
use crate::common::reporter::TaskReporter;
use crate::common::result::DepsyncResult;
use crate::common::templates::get_depsync_template;
use crate::domain::entities::binding_snapshot::{
    BindingRecord, BindingSnapshot, BindingState, SNAPSHOT_FILENAME,
};
use crate::domain::entities::dependency::Dependency;
use crate::domain::entities::package::PackageStatus;
use crate::domain::entities::workspace_manifest::{WorkspaceManifest, WORKSPACE_MANIFEST_FILENAME};
use crate::infrastructure::filesystem::WorkspaceStore;
use crate::infrastructure::provider::{ProviderContext, ProviderQuery, ProviderRegistry};

/// Cache location relative to the workspace root
pub const DEFAULT_CACHE_DIR: &str = ".depsync/cache";

const GITIGNORE_FILENAME: &str = ".gitignore";

/// How a workspace is opened and resolved
#[derive(Debug, Clone, Default)]
pub struct WorkspaceConfig {
    /// Overrides `<root>/.depsync/cache`
    pub cache_dir: Option<PathBuf>,

    /// Update existing working copies before reading their dependencies
    pub refresh: bool,

    /// Confirm every ref upstream when a package is first located
    pub verify: bool,
}

impl WorkspaceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache_dir(mut self, cache_dir: Option<PathBuf>) -> Self {
        self.cache_dir = cache_dir;
        self
    }

    pub fn with_refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }

    pub fn with_verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }
}

/// Result of `Workspace::update`
#[derive(Debug, Clone, Default)]
pub struct UpdateReport {
    pub reconcile: ReconcileReport,
    /// Reference each conflicted name was forced to
    pub forced: Vec<Dependency>,
    pub preview: bool,
}

/// Local state of one binding
#[derive(Debug, Clone)]
pub struct StatusEntry {
    pub name: String,
    pub dir: PathBuf,
    pub status: PackageStatus,
    /// Whether the provider can report local modifications at all
    pub tracks_modifications: bool,
}

#[derive(Debug, Clone, Default)]
pub struct StatusReport {
    pub entries: Vec<StatusEntry>,
    pub conflicts: String,
}

/// Verification outcome of one recorded binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyClass {
    Pristine,
    Modified,
    Corrupted,
    NotInstalled,
    IncorrectVersion,
    MissingInProvider,
}

impl VerifyClass {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Pristine | Self::Modified)
    }
}

impl fmt::Display for VerifyClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Pristine => "pristine",
            Self::Modified => "modified",
            Self::Corrupted => "corrupted",
            Self::NotInstalled => "not installed",
            Self::IncorrectVersion => "incorrect version",
            Self::MissingInProvider => "missing in provider",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyEntry {
    pub project: String,
    pub dir: PathBuf,
    pub class: VerifyClass,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    /// False when no update has recorded a snapshot yet
    pub initialized: bool,
    /// The snapshot holds records without a project or directory
    pub corrupted: bool,
    pub entries: Vec<VerifyEntry>,
}

impl VerifyReport {
    pub fn is_ok(&self) -> bool {
        self.initialized && !self.corrupted && self.entries.iter().all(|e| e.class.is_ok())
    }
}

#[derive(Debug, Clone, Default)]
pub struct DependsReport {
    /// Every distinct reference per project, first one wins
    pub projects: IndexMap<String, Vec<Dependency>>,
    pub tree: String,
    pub conflict_count: usize,
    pub conflicts: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionEntry {
    pub name: String,
    pub desired: String,
    /// `None` when nothing is installed
    pub local: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportCandidate {
    /// `provider:project`
    pub project: String,
    pub imported: bool,
}

/// A workspace root with its manifest, providers and previous snapshot.
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    manifest: WorkspaceManifest,
    store: WorkspaceStore,
    context: ProviderContext,
    manager: PackageManager,
    snapshot: Option<BindingSnapshot>,
    config: WorkspaceConfig,
}

impl Workspace {
    /// Write the manifest template into `root`.
    pub async fn init(root: &Path, force: bool) -> DepsyncResult<PathBuf> {
        let path = root.join(WORKSPACE_MANIFEST_FILENAME);
        if path.exists() && !force {
            return Err(DepsyncError::config_error(format!(
                "{} already exists. Use --force to overwrite.",
                path.display()
            )));
        }
        tokio::fs::create_dir_all(root).await?;
        tokio::fs::write(&path, get_depsync_template())
            .await
            .map_err(|e| {
                DepsyncError::filesystem_error_with_source(
                    "Failed to write workspace manifest",
                    Some(path.clone()),
                    e,
                )
            })?;
        Ok(path)
    }

    /// Load `depsync.yaml` under `root` and construct its providers.
    pub async fn open(root: impl Into<PathBuf>, config: WorkspaceConfig) -> DepsyncResult<Self> {
        let root = root.into();
        let store = WorkspaceStore::new();
        let manifest = store
            .read_manifest(root.join(WORKSPACE_MANIFEST_FILENAME))
            .await?;
        let context = Self::context_for(&root, &config);
        let registry = ProviderRegistry::load(&manifest.providers, &context).await?;
        tracing::debug!("Loaded {} providers", registry.len());
        Self::assemble(root, manifest, store, context, registry, config).await
    }

    /// Like `open`, with providers supplied by the caller instead of the manifest.
    pub async fn open_with_registry(
        root: impl Into<PathBuf>,
        registry: ProviderRegistry,
        config: WorkspaceConfig,
    ) -> DepsyncResult<Self> {
        let root = root.into();
        let store = WorkspaceStore::new();
        let manifest = store
            .read_manifest(root.join(WORKSPACE_MANIFEST_FILENAME))
            .await?;
        let context = Self::context_for(&root, &config);
        Self::assemble(root, manifest, store, context, registry, config).await
    }

    fn context_for(root: &Path, config: &WorkspaceConfig) -> ProviderContext {
        let cache_dir = config
            .cache_dir
            .clone()
            .unwrap_or_else(|| root.join(DEFAULT_CACHE_DIR));
        ProviderContext::new(cache_dir)
    }

    async fn assemble(
        root: PathBuf,
        manifest: WorkspaceManifest,
        store: WorkspaceStore,
        context: ProviderContext,
        registry: ProviderRegistry,
        config: WorkspaceConfig,
    ) -> DepsyncResult<Self> {
        let snapshot = store.read_snapshot(root.join(SNAPSHOT_FILENAME)).await?;
        let manager = PackageManager::new(registry).with_verify(config.verify);
        Ok(Self {
            root,
            manifest,
            store,
            context,
            manager,
            snapshot,
            config,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest(&self) -> &WorkspaceManifest {
        &self.manifest
    }

    pub fn snapshot(&self) -> Option<&BindingSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn registry(&self) -> &ProviderRegistry {
        self.manager.registry()
    }

    /// Resolve the manifest's dependencies and bind every package.
    pub async fn package_set(&self, reporter: &dyn TaskReporter) -> DepsyncResult<PackageSet> {
        let hints = self
            .snapshot
            .as_ref()
            .map(|snapshot| snapshot.local_dirs(&self.root))
            .unwrap_or_default();
        let config = PackageSetConfig::new().with_refresh(self.config.refresh);

        let mut set = PackageSet::resolve(
            self.manifest.dependency_graph(),
            &self.manager,
            &hints,
            &config,
            reporter,
        )
        .await?;
        set.bind(&self.manifest.mapping(&self.root)).await?;
        Ok(set)
    }

    /// Reconcile every binding with the resolved graph.
    ///
    /// Conflicts refuse the update unless forced, in which case each conflicted
    /// name uses its first reference. A real run records the snapshot and the
    /// `.gitignore` block afterwards.
    pub async fn update(
        &mut self,
        options: &UpdateOptions,
        reporter: &dyn TaskReporter,
    ) -> DepsyncResult<UpdateReport> {
        let set = self.package_set(reporter).await?;

        let mut forced = Vec::new();
        if set.has_conflicts() {
            if !options.force {
                return Err(DepsyncError::UnresolvedConflicts {
                    names: set.conflict_names(),
                });
            }
            for winner in set.conflict_winners() {
                tracing::info!("{} will use {}", winner.name, winner);
                forced.push(winner);
            }
        }

        let reconcile = set.update_package_versions(options, reporter).await?;

        if !options.preview {
            self.record(&set).await?;
        }

        Ok(UpdateReport {
            reconcile,
            forced,
            preview: options.preview,
        })
    }

    async fn record(&mut self, set: &PackageSet) -> DepsyncResult<()> {
        let mut snapshot = BindingSnapshot::new();
        let mut ignored = Vec::new();
        for binding in set.bindings() {
            let state = match binding.status().await {
                Ok(status) => BindingState::from_status(&status),
                Err(e) => {
                    tracing::warn!("Could not read status of {}: {}", binding.display_name(), e);
                    BindingState::Unknown
                }
            };
            let relative = self.relative_dir(binding.dir());
            if !relative.starts_with("..") && !Path::new(&relative).is_absolute() {
                ignored.push(format!("{}/", relative));
            }
            snapshot.push(BindingRecord::new(
                binding.package().dependency(),
                relative,
                state,
            ));
        }

        self.store
            .write_snapshot(self.root.join(SNAPSHOT_FILENAME), &snapshot)
            .await?;
        self.store
            .update_gitignore(self.root.join(GITIGNORE_FILENAME), &ignored)
            .await?;
        self.snapshot = Some(snapshot);
        Ok(())
    }

    /// `dir` relative to the root with forward slashes, or as-is outside the root
    fn relative_dir(&self, dir: &Path) -> String {
        let relative = pathdiff::diff_paths(dir, &self.root).unwrap_or_else(|| dir.to_path_buf());
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    pub async fn status(&self, reporter: &dyn TaskReporter) -> DepsyncResult<StatusReport> {
        let set = self.package_set(reporter).await?;
        let mut entries = Vec::with_capacity(set.bindings().len());
        for binding in set.bindings() {
            let status = binding.status().await?;
            entries.push(StatusEntry {
                name: binding.package().name().to_string(),
                dir: binding.dir().to_path_buf(),
                status,
                tracks_modifications: binding.package().provider().kind().tracks_modifications(),
            });
        }
        Ok(StatusReport {
            entries,
            conflicts: set.describe_conflicts(),
        })
    }

    /// Classify every binding recorded by the last update.
    pub async fn verify(&self) -> DepsyncResult<VerifyReport> {
        let snapshot = match &self.snapshot {
            Some(snapshot) => snapshot,
            None => return Ok(VerifyReport::default()),
        };

        let mut report = VerifyReport {
            initialized: true,
            ..Default::default()
        };
        for record in &snapshot.bindings {
            let (dependency, local_dir) = match (record.dependency(), &record.local_dir) {
                (Some(dependency), Some(local_dir)) => (dependency, local_dir),
                _ => {
                    tracing::warn!("Incomplete snapshot record: {:?}", record);
                    report.corrupted = true;
                    continue;
                }
            };
            let dir = self.root.join(local_dir);
            let class = self.classify(&dependency, &dir).await?;
            report.entries.push(VerifyEntry {
                project: dependency.to_string(),
                dir,
                class,
            });
        }
        Ok(report)
    }

    async fn classify(&self, dependency: &Dependency, dir: &Path) -> DepsyncResult<VerifyClass> {
        let provider = match self.registry().get(&dependency.source) {
            Ok(provider) => provider,
            Err(_) => return Ok(VerifyClass::MissingInProvider),
        };
        match provider
            .find_package(&dependency.name, &dependency.version, true, false)
            .await
        {
            Ok(_) => {}
            Err(e) if e.is_not_found() => return Ok(VerifyClass::MissingInProvider),
            Err(e) => return Err(e.into()),
        }

        let status = provider.local_status(dependency, dir).await?;
        Ok(if !status.is_installed() {
            VerifyClass::NotInstalled
        } else if !status.is_valid() {
            VerifyClass::Corrupted
        } else if !status.is_version(&dependency.version) {
            VerifyClass::IncorrectVersion
        } else if status.is_modified() {
            VerifyClass::Modified
        } else {
            VerifyClass::Pristine
        })
    }

    pub async fn depends(&self, reporter: &dyn TaskReporter) -> DepsyncResult<DependsReport> {
        let set = self.package_set(reporter).await?;
        let graph = set.graph();
        let projects = graph
            .flatten_by_name()
            .into_iter()
            .map(|(name, refs)| {
                let refs = refs.iter().map(|id| graph.dependency(*id).clone()).collect();
                (name, refs)
            })
            .collect();
        Ok(DependsReport {
            projects,
            tree: graph.render_tree(),
            conflict_count: set.conflicts().len(),
            conflicts: set.describe_conflicts(),
        })
    }

    pub async fn versions(&self, reporter: &dyn TaskReporter) -> DepsyncResult<Vec<VersionEntry>> {
        let set = self.package_set(reporter).await?;
        let mut entries = Vec::with_capacity(set.bindings().len());
        for binding in set.bindings() {
            let status = binding.status().await?;
            entries.push(VersionEntry {
                name: binding.package().name().to_string(),
                desired: binding.package().version().to_string(),
                local: status
                    .is_installed()
                    .then(|| status.version().map(str::to_string))
                    .flatten(),
            });
        }
        Ok(entries)
    }

    /// Add a direct dependency to `depsync.yaml`. Returns false when already listed.
    pub async fn import(&mut self, dependency: &Dependency) -> DepsyncResult<bool> {
        self.registry().get(&dependency.source)?;
        if self.manifest.contains_project(&dependency.name) {
            tracing::warn!(
                "{} is already a dependency of this workspace",
                dependency.name
            );
        }
        if !self.manifest.add_dependency(dependency) {
            return Ok(false);
        }
        self.store
            .write_manifest(self.root.join(WORKSPACE_MANIFEST_FILENAME), &self.manifest)
            .await?;
        tracing::info!("Imported {}", dependency);
        Ok(true)
    }

    /// Remote projects of every provider, marking those already imported
    pub async fn available_imports(&self) -> DepsyncResult<Vec<ImportCandidate>> {
        let projects = self.registry().aggregated_query().list_projects().await?;
        Ok(projects
            .into_iter()
            .map(|project| {
                let imported = match project.split_once(':') {
                    Some((_, name)) => self.manifest.contains_project(name),
                    None => false,
                };
                ImportCandidate { project, imported }
            })
            .collect())
    }

    /// Versions available for `provider:project`
    pub async fn available_versions(&self, project: &str) -> DepsyncResult<Vec<String>> {
        Ok(self
            .registry()
            .aggregated_query()
            .list_versions(project)
            .await?)
    }

    /// Empty the expiring cache. Returns the number of removed entries.
    pub async fn clear_cache(&self) -> DepsyncResult<usize> {
        let removed = self.context.cache().clear().await?;
        tracing::info!("Removed {} cache entries", removed);
        Ok(removed)
    }

    pub async fn update_packages(
        &self,
        reporter: &dyn TaskReporter,
    ) -> DepsyncResult<Vec<(Dependency, FetchOutcome)>> {
        let set = self.package_set(reporter).await?;
        set.update_packages(reporter).await
    }

    pub async fn foreach(
        &self,
        config: ForeachConfig,
        reporter: &dyn TaskReporter,
    ) -> DepsyncResult<ForeachResult> {
        let set = self.package_set(reporter).await?;
        let targets = set.bindings().iter().map(ForeachTarget::from_binding).collect();
        ForeachUseCase::new(config)
            .execute(targets)
            .await
            .map_err(|e| match e {
                ForeachError::InvalidCommand => DepsyncError::config_error(e.to_string()),
                other => DepsyncError::internal_error_with_source("foreach failed", other),
            })
    }

    /// Directories recorded by the previous update, keyed by dependency
    pub fn recorded_dirs(&self) -> HashMap<Dependency, PathBuf> {
        self.snapshot
            .as_ref()
            .map(|snapshot| snapshot.local_dirs(&self.root))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::reporter::NullReporter;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init_refuses_to_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        let path = Workspace::init(temp_dir.path(), false).await.unwrap();
        assert!(path.exists());
        assert!(Workspace::init(temp_dir.path(), false).await.is_err());
        assert!(Workspace::init(temp_dir.path(), true).await.is_ok());
    }

    #[tokio::test]
    async fn test_open_template_workspace() {
        let temp_dir = TempDir::new().unwrap();
        Workspace::init(temp_dir.path(), false).await.unwrap();

        let workspace = Workspace::open(temp_dir.path(), WorkspaceConfig::new())
            .await
            .unwrap();
        assert!(workspace.registry().is_empty());
        assert!(workspace.snapshot().is_none());

        let set = workspace.package_set(&NullReporter).await.unwrap();
        assert!(set.bindings().is_empty());
    }

    #[tokio::test]
    async fn test_open_without_manifest_fails() {
        let temp_dir = TempDir::new().unwrap();
        let result = Workspace::open(temp_dir.path(), WorkspaceConfig::new()).await;
        assert!(matches!(result, Err(DepsyncError::ConfigError { .. })));
    }

    #[tokio::test]
    async fn test_verify_without_snapshot_is_uninitialized() {
        let temp_dir = TempDir::new().unwrap();
        Workspace::init(temp_dir.path(), false).await.unwrap();
        let workspace = Workspace::open(temp_dir.path(), WorkspaceConfig::new())
            .await
            .unwrap();

        let report = workspace.verify().await.unwrap();
        assert!(!report.initialized);
        assert!(!report.is_ok());
    }

    #[tokio::test]
    async fn test_verify_flags_incomplete_records() {
        let temp_dir = TempDir::new().unwrap();
        Workspace::init(temp_dir.path(), false).await.unwrap();
        std::fs::write(
            temp_dir.path().join(SNAPSHOT_FILENAME),
            "bindings:\n  - local_dir: deps/core\n  - project: nowhere:core:master\n    local_dir: deps/core\n",
        )
        .unwrap();

        let workspace = Workspace::open(temp_dir.path(), WorkspaceConfig::new())
            .await
            .unwrap();
        let report = workspace.verify().await.unwrap();
        assert!(report.corrupted);
        assert_eq!(report.entries.len(), 1);
        assert_eq!(report.entries[0].class, VerifyClass::MissingInProvider);
    }

    #[test]
    fn test_verify_class_display() {
        assert_eq!(VerifyClass::IncorrectVersion.to_string(), "incorrect version");
        assert!(VerifyClass::Modified.is_ok());
        assert!(!VerifyClass::NotInstalled.is_ok());
    }
}
