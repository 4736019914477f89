//! # depsync - source dependency resolver
//!
//! `depsync` resolves a graph of source dependencies declared in `depsync.yaml`
//! files and synchronizes the resolved packages into a local workspace.
//!
//! ## Quick Start
//!
//! 1. Create a workspace manifest:
//!
//! ```bash
//! depsync init
//! ```
//!
//! 2. Declare providers and dependencies in `depsync.yaml`:
//!
//! ```yaml
//! providers:
//!   - kind: git
//!     name: hub
//!     host: "https://git.example.com/libs"
//! dependencies:
//!   - hub:core:master
//! ```
//!
//! 3. Check out every dependency at its resolved version:
//!
//! ```bash
//! depsync update
//! ```
//!
//! ## Architecture
//!
//! - [`domain`]: dependency graph, packages, manifests and snapshots
//! - [`application`]: package resolution and workspace use cases
//! - [`infrastructure`]: providers, expiring cache, git and file system access
//! - [`presentation`]: CLI interface and terminal output
//! - [`common`]: errors, result helpers, path templates and task reporting
//!
//! ## Using the Library
//!
//! ```rust,no_run
//! use depsync::application::use_cases::workspace::{Workspace, WorkspaceConfig};
//! use depsync::common::reporter::NullReporter;
//!
//! # async fn example() -> depsync::Result<()> {
//! let workspace = Workspace::open(".", WorkspaceConfig::new()).await?;
//! let report = workspace.depends(&NullReporter).await?;
//!
//! println!("{}", report.tree);
//! println!("{} conflicts", report.conflict_count);
//! # Ok(())
//! # }
//! ```

#![deny(rustdoc::broken_intra_doc_links)]

pub mod application;
pub mod common;
pub mod domain;
pub mod infrastructure;
pub mod presentation;

pub use crate::common::error::DepsyncError;
pub use crate::common::result::DepsyncResult as Result;
