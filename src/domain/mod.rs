//! Domain layer: the dependency graph, package metadata and workspace records.

pub mod entities;
pub mod value_objects;
