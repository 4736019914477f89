use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::domain::entities::dependency::Dependency;
use crate::domain::entities::package::PackageStatus;

/// File name of the local snapshot written after each update
pub const SNAPSHOT_FILENAME: &str = "depsync.local.yaml";

/// State of a binding when the snapshot was taken
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingState {
    Pristine,
    Modified,
    Missing,
    Invalid,
    #[default]
    Unknown,
}

impl BindingState {
    pub fn from_status(status: &PackageStatus) -> Self {
        if !status.is_installed() {
            Self::Missing
        } else if !status.is_valid() {
            Self::Invalid
        } else if status.is_modified() {
            Self::Modified
        } else {
            Self::Pristine
        }
    }
}

/// One recorded binding. Fields are optional so damaged snapshots still load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingRecord {
    /// `source:name:version`
    #[serde(default)]
    pub project: Option<String>,

    /// Directory relative to the workspace root
    #[serde(default)]
    pub local_dir: Option<String>,

    #[serde(default)]
    pub status: BindingState,
}

impl BindingRecord {
    pub fn new(project: &Dependency, local_dir: impl Into<String>, status: BindingState) -> Self {
        Self {
            project: Some(project.to_string()),
            local_dir: Some(local_dir.into()),
            status,
        }
    }

    /// The recorded project, when present and well formed
    pub fn dependency(&self) -> Option<Dependency> {
        Dependency::parse_one(self.project.as_deref()?).ok()
    }

    /// Both identifying fields are present
    pub fn is_complete(&self) -> bool {
        self.project.is_some() && self.local_dir.is_some()
    }
}

/// Bindings of the previous update, consulted by the next invocation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingSnapshot {
    #[serde(default)]
    pub bindings: Vec<BindingRecord>,
}

impl BindingSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: BindingRecord) {
        self.bindings.push(record);
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Absolute directories of recorded bindings, keyed by dependency
    pub fn local_dirs(&self, root: &Path) -> HashMap<Dependency, PathBuf> {
        self.bindings
            .iter()
            .filter_map(|record| {
                let dependency = record.dependency()?;
                let dir = root.join(record.local_dir.as_deref()?);
                Some((dependency, dir))
            })
            .collect()
    }
}
