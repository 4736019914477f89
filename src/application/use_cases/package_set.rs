use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::application::services::package_manager::PackageManager;
use crate::common::error::DepsyncError;
use crate::common::reporter::TaskReporter;
use crate::common::result::DepsyncResult;
use crate::common::templates::WorkspaceMapping;
use crate::domain::entities::dependency::{Dependency, DependencyGraph, GraphWalk, NodeId};
use crate::domain::entities::package::{Package, PackageBinding, PackageStatus};
use crate::infrastructure::provider::ProviderError;

/// Resolution options
#[derive(Debug, Clone, Default)]
pub struct PackageSetConfig {
    /// Update existing working copies before reading their declared dependencies
    pub refresh: bool,
}

impl PackageSetConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }
}

/// Reconciliation options
#[derive(Debug, Clone, Default)]
pub struct UpdateOptions {
    /// Switch modified copies, stashing their changes first
    pub force: bool,

    /// Report intended actions without touching the file system
    pub preview: bool,
}

impl UpdateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_preview(mut self, preview: bool) -> Self {
        self.preview = preview;
        self
    }
}

/// What reconciliation does with one binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileAction {
    CheckOut,
    ChangeVersion { from: String, to: String },
    /// Modified copy at the wrong version, left untouched
    Refuse { from: String, to: String },
    UpToDate,
}

impl ReconcileAction {
    /// Decide the action for a binding whose local state is `status`.
    pub fn plan(status: &PackageStatus, desired: &str, force: bool) -> Self {
        if !status.is_installed() {
            return Self::CheckOut;
        }
        if status.is_valid() && status.is_version(desired) {
            return Self::UpToDate;
        }

        let from = status.version().unwrap_or("<unknown>").to_string();
        let to = desired.to_string();
        if status.is_modified() && !force {
            Self::Refuse { from, to }
        } else {
            Self::ChangeVersion { from, to }
        }
    }

    pub fn has_side_effects(&self) -> bool {
        matches!(self, Self::CheckOut | Self::ChangeVersion { .. })
    }
}

impl fmt::Display for ReconcileAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CheckOut => write!(f, "check out"),
            Self::ChangeVersion { from, to } => write!(f, "change version {} -> {}", from, to),
            Self::Refuse { from, to } => {
                write!(f, "refuse {} -> {} (local modifications)", from, to)
            }
            Self::UpToDate => write!(f, "up to date"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileEntry {
    pub dependency: Dependency,
    pub dir: PathBuf,
    pub action: ReconcileAction,
    /// Whether the action was carried out (always false in preview)
    pub applied: bool,
}

/// Outcome of `update_package_versions`, one entry per binding
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub entries: Vec<ReconcileEntry>,
}

impl ReconcileReport {
    pub fn refused(&self) -> impl Iterator<Item = &ReconcileEntry> {
        self.entries
            .iter()
            .filter(|e| matches!(e.action, ReconcileAction::Refuse { .. }))
    }

    pub fn has_refusals(&self) -> bool {
        self.refused().next().is_some()
    }

    /// Entries that change something on disk
    pub fn pending(&self) -> impl Iterator<Item = &ReconcileEntry> {
        self.entries.iter().filter(|e| e.action.has_side_effects())
    }
}

/// Result of `update_packages` for one binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    CheckedOut,
    Updated,
    Unchanged,
}

/// A resolved dependency graph with its distinct packages and their bindings.
#[derive(Debug)]
pub struct PackageSet {
    graph: DependencyGraph,
    packages: Vec<Arc<Package>>,
    conflicts: IndexMap<String, Vec<NodeId>>,
    bindings: Vec<PackageBinding>,
}

impl PackageSet {
    /// Expand `graph` through the providers until every node is resolved.
    ///
    /// `hints` maps dependencies to directories bound by a previous run; a valid
    /// copy there answers for its declared dependencies. Any provider failure
    /// aborts resolution and carries the chain of the node being resolved.
    pub async fn resolve(
        mut graph: DependencyGraph,
        manager: &PackageManager,
        hints: &HashMap<Dependency, PathBuf>,
        config: &PackageSetConfig,
        reporter: &dyn TaskReporter,
    ) -> DepsyncResult<Self> {
        reporter.start("Resolving dependencies");
        let result = Self::build(&mut graph, manager, hints, config, reporter).await;
        reporter.end();
        result?;

        let mut packages = Vec::new();
        for (name, dependency) in graph.flatten_unique() {
            tracing::debug!("Using {} for {}", dependency, name);
            let package = manager.get(&dependency, false).await.map_err(|e| {
                let chain = graph.find(&dependency).map(|id| graph.chain(id));
                e.with_chain(chain.unwrap_or_default())
            })?;
            packages.push(package);
        }

        let conflicts = graph.conflicts();
        if !conflicts.is_empty() {
            tracing::debug!("{} conflicted dependencies", conflicts.len());
        }

        Ok(Self {
            graph,
            packages,
            conflicts,
            bindings: Vec::new(),
        })
    }

    async fn build(
        graph: &mut DependencyGraph,
        manager: &PackageManager,
        hints: &HashMap<Dependency, PathBuf>,
        config: &PackageSetConfig,
        reporter: &dyn TaskReporter,
    ) -> DepsyncResult<()> {
        let mut resolved: HashMap<Dependency, Vec<Dependency>> = HashMap::new();
        let mut walk = GraphWalk::new(graph);

        while let Some(id) = walk.next(graph) {
            graph.begin(id);
            let dependency = graph.dependency(id).clone();
            reporter.update(&dependency.to_string());

            let declared = match resolved.get(&dependency) {
                Some(declared) => declared.clone(),
                None => {
                    let hint = hints.get(&dependency).map(PathBuf::as_path);
                    match Self::declared_dependencies(manager, &dependency, hint, config).await {
                        Ok(declared) => {
                            resolved.insert(dependency, declared.clone());
                            declared
                        }
                        Err(e) => {
                            graph.fail(id);
                            return Err(e.with_chain(graph.chain(id)));
                        }
                    }
                }
            };

            graph
                .complete(id, declared)
                .map_err(|e| e.with_chain(graph.chain(id)))?;
        }
        Ok(())
    }

    async fn declared_dependencies(
        manager: &PackageManager,
        dependency: &Dependency,
        hint: Option<&Path>,
        config: &PackageSetConfig,
    ) -> DepsyncResult<Vec<Dependency>> {
        let package = manager.get(dependency, config.refresh).await?;
        Ok(package.dependencies(hint, config.refresh).await?)
    }

    /// Compute the local directory of every package.
    ///
    /// A package lands in `<workspace_mapping>/<name>`, expanded against `mapping`.
    pub async fn bind(&mut self, mapping: &WorkspaceMapping) -> DepsyncResult<()> {
        let mut bindings = Vec::with_capacity(self.packages.len());
        for package in &self.packages {
            let chain = || {
                self.graph
                    .find(package.dependency())
                    .map(|id| self.graph.chain(id))
                    .unwrap_or_default()
            };
            let info = package.info(None, false).await.map_err(|e| {
                DepsyncError::from(e).with_chain(chain())
            })?;

            let template = match info.workspace_mapping().trim_end_matches('/') {
                "" => package.name().to_string(),
                prefix => format!("{}/{}", prefix, package.name()),
            };
            let dir = mapping.expand(&template).map_err(|e| e.with_chain(chain()))?;
            tracing::debug!("Binding {} -> {}", package.display_name(), dir.display());
            bindings.push(PackageBinding::new(Arc::clone(package), dir));
        }
        self.bindings = bindings;
        Ok(())
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Distinct packages, first reference wins
    pub fn packages(&self) -> &[Arc<Package>] {
        &self.packages
    }

    pub fn bindings(&self) -> &[PackageBinding] {
        &self.bindings
    }

    pub fn conflicts(&self) -> &IndexMap<String, Vec<NodeId>> {
        &self.conflicts
    }

    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }

    pub fn conflict_names(&self) -> Vec<String> {
        self.conflicts.keys().cloned().collect()
    }

    pub fn describe_conflicts(&self) -> String {
        self.graph.describe_conflicts()
    }

    /// The reference each conflicted name resolves to
    pub fn conflict_winners(&self) -> Vec<Dependency> {
        self.conflicts
            .values()
            .filter_map(|refs| refs.first())
            .map(|id| self.graph.dependency(*id).clone())
            .collect()
    }

    fn chain_of(&self, dependency: &Dependency) -> Vec<Dependency> {
        self.graph
            .find(dependency)
            .map(|id| self.graph.chain(id))
            .unwrap_or_default()
    }

    /// Bring every binding to its resolved version.
    ///
    /// With `preview` set nothing is touched and every entry reports what a
    /// real run would do.
    pub async fn update_package_versions(
        &self,
        options: &UpdateOptions,
        reporter: &dyn TaskReporter,
    ) -> DepsyncResult<ReconcileReport> {
        reporter.start("Updating package versions");
        let result = self.reconcile(options, reporter).await;
        reporter.end();
        result
    }

    async fn reconcile(
        &self,
        options: &UpdateOptions,
        reporter: &dyn TaskReporter,
    ) -> DepsyncResult<ReconcileReport> {
        let mut report = ReconcileReport::default();

        for binding in &self.bindings {
            let package = binding.package();
            let dependency = package.dependency().clone();
            reporter.update(&binding.display_name());

            let status = binding
                .status()
                .await
                .map_err(|e| DepsyncError::from(e).with_chain(self.chain_of(&dependency)))?;
            let mut action = ReconcileAction::plan(&status, package.version(), options.force);

            let applied = if options.preview {
                if action.has_side_effects() {
                    tracing::info!("Would {} for {}", action, binding.display_name());
                }
                false
            } else {
                match &action {
                    ReconcileAction::CheckOut => {
                        tracing::info!(
                            "Checking out {} into {}",
                            binding.display_name(),
                            binding.dir().display()
                        );
                        binding.checkout().await.map_err(|e| {
                            DepsyncError::from(e)
                                .with_chain(self.chain_of(&dependency))
                        })?;
                        true
                    }
                    ReconcileAction::ChangeVersion { from, to } => {
                        tracing::info!("Changing {} from {} to {}", package.name(), from, to);
                        let changed = binding.change_version(options.force).await.map_err(|e| {
                            DepsyncError::from(e)
                                .with_chain(self.chain_of(&dependency))
                        })?;
                        if !changed {
                            action = ReconcileAction::Refuse {
                                from: from.clone(),
                                to: to.clone(),
                            };
                        }
                        changed
                    }
                    ReconcileAction::Refuse { .. } | ReconcileAction::UpToDate => false,
                }
            };

            if let ReconcileAction::Refuse { from, to } = &action {
                tracing::warn!(
                    "Not changing {} from {} to {}: local modifications present (use --force)",
                    package.name(),
                    from,
                    to
                );
            }

            report.entries.push(ReconcileEntry {
                dependency,
                dir: binding.dir().to_path_buf(),
                action,
                applied,
            });
        }

        Ok(report)
    }

    async fn fetch(binding: &PackageBinding) -> Result<FetchOutcome, ProviderError> {
        if !binding.is_installed().await? {
            binding.checkout().await?;
            return Ok(FetchOutcome::CheckedOut);
        }
        if binding.update().await? {
            Ok(FetchOutcome::Updated)
        } else {
            Ok(FetchOutcome::Unchanged)
        }
    }

    /// Install missing bindings and update installed ones in place.
    pub async fn update_packages(
        &self,
        reporter: &dyn TaskReporter,
    ) -> DepsyncResult<Vec<(Dependency, FetchOutcome)>> {
        reporter.start("Fetching packages");
        let mut outcomes = Vec::with_capacity(self.bindings.len());
        for binding in &self.bindings {
            let dependency = binding.package().dependency().clone();
            reporter.update(&binding.display_name());

            match Self::fetch(binding).await {
                Ok(outcome) => outcomes.push((dependency, outcome)),
                Err(e) => {
                    reporter.end();
                    return Err(DepsyncError::from(e).with_chain(self.chain_of(&dependency)));
                }
            }
        }
        reporter.end();
        Ok(outcomes)
    }
}
