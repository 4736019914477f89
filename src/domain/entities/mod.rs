pub mod binding_snapshot;
pub mod dependency;
pub mod package;
pub mod package_info;
pub mod workspace_manifest;

pub use binding_snapshot::{BindingRecord, BindingSnapshot, BindingState, SNAPSHOT_FILENAME};
pub use dependency::{Dependency, DependencyGraph, GraphWalk, NodeId, ResolveState};
pub use package::{Package, PackageBinding, PackageStatus};
pub use package_info::{PackageInfo, PACKAGE_INFO_FILENAME};
pub use workspace_manifest::{WorkspaceManifest, WORKSPACE_MANIFEST_FILENAME};
