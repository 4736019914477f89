//! Dependency triples and the dependency graph.
//!
//! The graph is an arena of nodes addressed by [`NodeId`]. Each node owns an
//! ordered list of child ids and a non-owning parent id used for chain walks and
//! error reporting. Node 0 is always the root sentinel.
//!
//! Traversals are depth-first pre-order with children in insertion order. Every
//! "first encountered" rule ([`DependencyGraph::flatten_unique`],
//! [`DependencyGraph::conflicts`], forced conflict resolution) follows that order.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::common::error::DepsyncError;
use crate::common::result::DepsyncResult;

/// Marker used for every field of the root sentinel.
pub const ROOT_MARKER: &str = "root";

static DEPENDENCY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\w+):(\w[\w\-]*):([\w\.][\w\-\.]*)").expect("dependency pattern is valid")
});

static DEPENDENCY_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\w+):(\w[\w\-]*):([\w\.][\w\-\.]*)$").expect("dependency line pattern is valid")
});

/// A `source:name:version` reference. Names and versions never start with `-`.
/// Equality and hashing use all three fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Dependency {
    pub source: String,
    pub name: String,
    pub version: String,
}

impl Dependency {
    pub fn new(
        source: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            name: name.into(),
            version: version.into(),
        }
    }

    pub fn root() -> Self {
        Self::new(ROOT_MARKER, ROOT_MARKER, ROOT_MARKER)
    }

    pub fn is_root(&self) -> bool {
        self.source == ROOT_MARKER && self.name == ROOT_MARKER && self.version == ROOT_MARKER
    }

    /// Parse exactly one `source:name:version` triple.
    pub fn parse_one(input: &str) -> DepsyncResult<Self> {
        let trimmed = input.trim();
        DEPENDENCY_LINE
            .captures(trimmed)
            .map(|caps| Self::new(&caps[1], &caps[2], &caps[3]))
            .ok_or_else(|| {
                DepsyncError::parse_error(
                    format!("'{}' is not a source:name:version dependency", trimmed),
                    None,
                )
            })
    }

    /// Whether `other` names the same package at the same source and version.
    pub fn same_reference(&self, other: &Dependency) -> bool {
        self.source == other.source && self.version == other.version
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.source, self.name, self.version)
    }
}

impl FromStr for Dependency {
    type Err = DepsyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_one(s)
    }
}

impl TryFrom<String> for Dependency {
    type Error = DepsyncError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse_one(&value)
    }
}

impl From<Dependency> for String {
    fn from(value: Dependency) -> Self {
        value.to_string()
    }
}

/// Handle to a node in a [`DependencyGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Resolution state of a node during graph construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveState {
    Unresolved,
    Resolving,
    Resolved,
    Failed,
}

#[derive(Debug, Clone)]
struct Node {
    dependency: Dependency,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    state: ResolveState,
}

/// Tree of dependencies anchored at a root sentinel.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    nodes: Vec<Node>,
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl DependencyGraph {
    /// A graph holding only the root.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                dependency: Dependency::root(),
                parent: None,
                children: Vec::new(),
                state: ResolveState::Resolved,
            }],
        }
    }

    /// Build a root with one child per well-formed token found anywhere in `text`.
    pub fn parse(text: &str) -> Self {
        let mut graph = Self::new();
        let root = graph.root();
        for caps in DEPENDENCY_PATTERN.captures_iter(text) {
            graph.add_child(root, Dependency::new(&caps[1], &caps[2], &caps[3]));
        }
        graph
    }

    /// Build a root with one child per well-formed line. Malformed lines are skipped.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut graph = Self::new();
        let root = graph.root();
        for line in lines {
            let line = line.as_ref().trim();
            match DEPENDENCY_LINE.captures(line) {
                Some(caps) => {
                    graph.add_child(root, Dependency::new(&caps[1], &caps[2], &caps[3]));
                }
                None if line.is_empty() => {}
                None => tracing::warn!("Skipping malformed dependency '{}'", line),
            }
        }
        graph
    }

    /// Build a root from the direct children listed in a file, one per line.
    pub fn from_file(path: &Path) -> DepsyncResult<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DepsyncError::parse_error(
                    format!("Could not locate file {}", path.display()),
                    Some(path.to_path_buf()),
                ));
            }
            Err(e) => {
                return Err(DepsyncError::filesystem_error_with_source(
                    "Failed to read dependency file",
                    Some(path.to_path_buf()),
                    e,
                ));
            }
        };

        if contents.trim().is_empty() {
            return Err(DepsyncError::parse_error(
                format!("Dependency file {} is empty", path.display()),
                Some(path.to_path_buf()),
            ));
        }

        Ok(Self::from_lines(contents.lines()))
    }

    /// Write the direct children of the root, one per line.
    pub fn save_to_file(&self, path: &Path) -> DepsyncResult<()> {
        let mut contents = String::new();
        for dependency in self.direct_dependencies() {
            contents.push_str(&dependency.to_string());
            contents.push('\n');
        }
        std::fs::write(path, contents).map_err(|e| {
            DepsyncError::filesystem_error_with_source(
                "Failed to write dependency file",
                Some(path.to_path_buf()),
                e,
            )
        })
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes[0].children.is_empty()
    }

    pub fn dependency(&self, id: NodeId) -> &Dependency {
        &self.nodes[id.0].dependency
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn state(&self, id: NodeId) -> ResolveState {
        self.nodes[id.0].state
    }

    /// Dependencies declared directly by the root.
    pub fn direct_dependencies(&self) -> Vec<Dependency> {
        self.children(self.root())
            .iter()
            .map(|id| self.dependency(*id).clone())
            .collect()
    }

    pub fn find_child(&self, parent: NodeId, candidate: &Dependency) -> Option<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|child| self.dependency(*child) == candidate)
    }

    pub fn contains_child(&self, parent: NodeId, candidate: &Dependency) -> bool {
        self.find_child(parent, candidate).is_some()
    }

    /// Append `candidate` under `parent`.
    ///
    /// Idempotent: when an equal child already exists its id is returned and
    /// nothing is reparented.
    pub fn add_child(&mut self, parent: NodeId, candidate: Dependency) -> NodeId {
        if let Some(existing) = self.find_child(parent, &candidate) {
            return existing;
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            dependency: candidate,
            parent: Some(parent),
            children: Vec::new(),
            state: ResolveState::Unresolved,
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Walk from `node` towards the root and return the nearest node (possibly
    /// `node` itself, possibly the root) whose direct children contain `candidate`.
    pub fn ancestor_contains(&self, node: NodeId, candidate: &Dependency) -> Option<NodeId> {
        let mut current = Some(node);
        while let Some(id) = current {
            if self.contains_child(id, candidate) {
                return Some(id);
            }
            current = self.parent(id);
        }
        None
    }

    /// Whether `candidate` equals `node` or any of its ancestors below the root.
    pub fn path_contains(&self, node: NodeId, candidate: &Dependency) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == self.root() {
                return false;
            }
            if self.dependency(id) == candidate {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Attach `candidate` under `parent`, refusing attachments that would close a cycle.
    pub fn attach(&mut self, parent: NodeId, candidate: Dependency) -> DepsyncResult<NodeId> {
        if self.path_contains(parent, &candidate) {
            return Err(DepsyncError::circular_dependency(
                self.dependency(parent).clone(),
                candidate,
            ));
        }
        Ok(self.add_child(parent, candidate))
    }

    /// Node ids from the first node below the root down to `node`.
    pub fn chain_ids(&self, node: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut current = Some(node);
        while let Some(id) = current {
            if id == self.root() {
                break;
            }
            chain.push(id);
            current = self.parent(id);
        }
        chain.reverse();
        chain
    }

    /// Dependencies from the first node below the root down to `node`.
    pub fn chain(&self, node: NodeId) -> Vec<Dependency> {
        self.chain_ids(node)
            .into_iter()
            .map(|id| self.dependency(id).clone())
            .collect()
    }

    /// First node (in traversal order) equal to `dependency`.
    pub fn find(&self, dependency: &Dependency) -> Option<NodeId> {
        self.preorder().into_iter().find(|id| self.dependency(*id) == dependency)
    }

    /// Whether any node in the tree names the project.
    pub fn contains_project(&self, name: &str) -> bool {
        self.preorder()
            .into_iter()
            .any(|id| self.dependency(id).name == name)
    }

    /// Mark a node as being resolved.
    pub fn begin(&mut self, id: NodeId) {
        self.nodes[id.0].state = ResolveState::Resolving;
    }

    /// Attach a node's declared dependencies and mark it resolved.
    ///
    /// A declared dependency that already appears on the node's path to the root
    /// fails the node with a circular dependency error naming both nodes.
    pub fn complete(&mut self, id: NodeId, declared: Vec<Dependency>) -> DepsyncResult<()> {
        for candidate in declared {
            match self.attach(id, candidate) {
                Ok(child) => tracing::debug!(
                    "Adding child({}) to parent({})",
                    self.dependency(child),
                    self.dependency(id)
                ),
                Err(e) => {
                    self.fail(id);
                    return Err(e);
                }
            }
        }
        self.nodes[id.0].state = ResolveState::Resolved;
        Ok(())
    }

    pub fn fail(&mut self, id: NodeId) {
        self.nodes[id.0].state = ResolveState::Failed;
    }

    /// Expand the graph by asking `resolve` for each unresolved node's declared
    /// dependencies. Nodes are visited in pre-order, children in insertion order.
    pub fn build_graph<F, E>(&mut self, mut resolve: F) -> Result<(), E>
    where
        F: FnMut(&Dependency) -> Result<Vec<Dependency>, E>,
        E: From<DepsyncError>,
    {
        let mut walk = GraphWalk::new(self);
        while let Some(id) = walk.next(self) {
            self.begin(id);
            let declared = match resolve(self.dependency(id)) {
                Ok(declared) => declared,
                Err(e) => {
                    self.fail(id);
                    return Err(e);
                }
            };
            self.complete(id, declared)?;
        }
        Ok(())
    }

    /// All nodes below the root in depth-first pre-order.
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len().saturating_sub(1));
        let mut stack: Vec<NodeId> = self.children(self.root()).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        order
    }

    /// Every distinct reference per package name, in first-encountered order.
    pub fn flatten_by_name(&self) -> IndexMap<String, Vec<NodeId>> {
        let mut by_name: IndexMap<String, Vec<NodeId>> = IndexMap::new();
        for id in self.preorder() {
            let dependency = self.dependency(id);
            let refs = by_name.entry(dependency.name.clone()).or_default();
            if !refs.iter().any(|other| self.dependency(*other) == dependency) {
                refs.push(id);
            }
        }
        by_name
    }

    /// One representative per package name: the first one encountered.
    pub fn flatten_unique(&self) -> IndexMap<String, Dependency> {
        self.flatten_by_name()
            .into_iter()
            .filter_map(|(name, refs)| {
                refs.first()
                    .map(|first| (name, self.dependency(*first).clone()))
            })
            .collect()
    }

    /// Names referenced with more than one distinct `(source, version)`, with
    /// every distinct reference. Comparison is against the first reference seen.
    pub fn conflicts(&self) -> IndexMap<String, Vec<NodeId>> {
        self.flatten_by_name()
            .into_iter()
            .filter(|(_, refs)| match refs.split_first() {
                Some((first, rest)) => {
                    let first = self.dependency(*first);
                    rest.iter()
                        .any(|other| !first.same_reference(self.dependency(*other)))
                }
                None => false,
            })
            .collect()
    }

    /// Indented rendering of the tree below the root.
    pub fn render_tree(&self) -> String {
        let mut out = String::new();
        let mut stack: Vec<(NodeId, usize)> = self
            .children(self.root())
            .iter()
            .rev()
            .map(|id| (*id, 0))
            .collect();
        while let Some((id, depth)) = stack.pop() {
            out.push_str(&"  ".repeat(depth));
            out.push_str(&self.dependency(id).to_string());
            out.push('\n');
            stack.extend(self.children(id).iter().rev().map(|child| (*child, depth + 1)));
        }
        out
    }

    /// Human readable explanation of every conflict and the chains that cause it.
    pub fn describe_conflicts(&self) -> String {
        let mut out = String::new();
        for (name, refs) in self.conflicts() {
            let versions: Vec<String> = refs
                .iter()
                .map(|id| self.dependency(*id).version.clone())
                .collect();
            let referrers: Vec<String> = refs
                .iter()
                .map(|id| match self.parent(*id) {
                    Some(parent) if parent != self.root() => {
                        let parent = self.dependency(parent);
                        format!("{}:{}", parent.name, parent.version)
                    }
                    _ => "the workspace".to_string(),
                })
                .collect();
            out.push_str(&format!(
                "{} using branches {} due to {}\n\n",
                name,
                join_with_and(&versions),
                join_with_and(&referrers)
            ));

            for id in &refs {
                out.push_str("  Workspace\n");
                for (depth, link) in self.chain_ids(*id).into_iter().enumerate() {
                    let dependency = self.dependency(link);
                    out.push_str(&"  ".repeat(depth + 2));
                    out.push_str(&format!("{}:{}", dependency.name, dependency.version));
                    if link == *id {
                        out.push_str(&format!("   <---- Using branch {}", dependency.version));
                    }
                    out.push('\n');
                }
                out.push('\n');
            }
        }
        out
    }
}

/// Pre-order cursor over unresolved nodes, used by resolvers that drive graph
/// construction themselves.
///
/// The cursor peeks rather than pops: a node stays on the stack until it has
/// left the `Unresolved` state, so its children (attached meanwhile) are visited next.
#[derive(Debug, Clone)]
pub struct GraphWalk {
    stack: Vec<NodeId>,
}

impl GraphWalk {
    pub fn new(graph: &DependencyGraph) -> Self {
        Self {
            stack: graph.children(graph.root()).iter().rev().copied().collect(),
        }
    }

    pub fn next(&mut self, graph: &DependencyGraph) -> Option<NodeId> {
        while let Some(&id) = self.stack.last() {
            if graph.state(id) == ResolveState::Unresolved {
                return Some(id);
            }
            self.stack.pop();
            self.stack.extend(graph.children(id).iter().rev().copied());
        }
        None
    }
}

fn join_with_and(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [only] => only.clone(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn dep(source: &str, name: &str, version: &str) -> Dependency {
        Dependency::new(source, name, version)
    }

    #[test]
    fn test_parse_text_yields_children_in_order() {
        let graph = DependencyGraph::parse("git:core:v1\nsandbox:build:v2");
        assert_eq!(
            graph.direct_dependencies(),
            vec![dep("git", "core", "v1"), dep("sandbox", "build", "v2")]
        );
    }

    #[test]
    fn test_parse_text_skips_malformed_tokens() {
        let graph = DependencyGraph::parse("  git:core:v1  nonsense  :x: hub:zlib:1.2.13 ");
        assert_eq!(
            graph.direct_dependencies(),
            vec![dep("git", "core", "v1"), dep("hub", "zlib", "1.2.13")]
        );
    }

    #[test]
    fn test_from_lines_skips_malformed_lines() {
        let graph = DependencyGraph::from_lines(["git:core:v1", "", "broken", " hub:zlib:1.2 "]);
        assert_eq!(
            graph.direct_dependencies(),
            vec![dep("git", "core", "v1"), dep("hub", "zlib", "1.2")]
        );
    }

    #[test]
    fn test_parse_one() {
        assert_eq!(
            Dependency::parse_one("git:my-lib:release-1.0").unwrap(),
            dep("git", "my-lib", "release-1.0")
        );
        assert!(Dependency::parse_one("git:core").is_err());
        assert!(Dependency::parse_one("git:core:v1 trailing").is_err());
    }

    #[test]
    fn test_option_like_versions_are_rejected() {
        assert!(Dependency::parse_one("git:core:-f").is_err());
        assert!(Dependency::parse_one("git:--upload-pack:v1").is_err());
        let graph = DependencyGraph::parse("git:core:--orphan hub:zlib:1.2");
        assert_eq!(graph.direct_dependencies(), vec![dep("hub", "zlib", "1.2")]);
    }

    #[test]
    fn test_dependency_serde_as_string() {
        let json = serde_json::to_string(&dep("git", "core", "v1")).unwrap();
        assert_eq!(json, "\"git:core:v1\"");
        let back: Dependency = serde_json::from_str(&json).unwrap();
        assert_eq!(back, dep("git", "core", "v1"));
        assert!(serde_json::from_str::<Dependency>("\"bad\"").is_err());
    }

    #[test]
    fn test_add_child_is_idempotent() {
        let mut graph = DependencyGraph::new();
        let root = graph.root();
        let a = graph.add_child(root, dep("git", "a", "v1"));
        let b = graph.add_child(a, dep("git", "b", "v1"));

        let again = graph.add_child(root, dep("git", "a", "v1"));
        assert_eq!(again, a);
        assert_eq!(graph.children(root).len(), 1);

        let b_again = graph.add_child(a, dep("git", "b", "v1"));
        assert_eq!(b_again, b);
        assert_eq!(graph.parent(b), Some(a));
        assert_eq!(graph.len(), 3);
    }

    #[test]
    fn test_ancestor_contains_returns_nearest_holder() {
        let mut graph = DependencyGraph::new();
        let root = graph.root();
        let a = graph.add_child(root, dep("git", "a", "v1"));
        let b = graph.add_child(a, dep("git", "b", "v1"));

        assert_eq!(graph.ancestor_contains(b, &dep("git", "a", "v1")), Some(root));
        assert_eq!(graph.ancestor_contains(b, &dep("git", "b", "v1")), Some(a));
        assert_eq!(graph.ancestor_contains(b, &dep("git", "z", "v1")), None);
    }

    #[test]
    fn test_self_reference_is_circular() {
        let mut graph = DependencyGraph::parse("git:a:branch1");
        let result = graph.build_graph(|d: &Dependency| -> DepsyncResult<Vec<Dependency>> {
            if d.name == "a" {
                Ok(vec![dep("git", "a", "branch1")])
            } else {
                Ok(Vec::new())
            }
        });

        match result {
            Err(DepsyncError::CircularDependency { parent, child }) => {
                assert_eq!(parent, dep("git", "a", "branch1"));
                assert_eq!(child, dep("git", "a", "branch1"));
            }
            other => panic!("expected circular dependency, got {:?}", other),
        }
    }

    #[test]
    fn test_ancestor_reference_is_circular() {
        let mut graph = DependencyGraph::parse("git:a:v1");
        let result = graph.build_graph(|d: &Dependency| -> DepsyncResult<Vec<Dependency>> {
            Ok(match d.name.as_str() {
                "a" => vec![dep("git", "b", "v1")],
                "b" => vec![dep("git", "a", "v1")],
                _ => Vec::new(),
            })
        });

        match result {
            Err(DepsyncError::CircularDependency { parent, child }) => {
                assert_eq!(parent, dep("git", "b", "v1"));
                assert_eq!(child, dep("git", "a", "v1"));
            }
            other => panic!("expected circular dependency, got {:?}", other),
        }
        let b = graph.find(&dep("git", "b", "v1")).unwrap();
        assert_eq!(graph.state(b), ResolveState::Failed);
    }

    #[test]
    fn test_diamond_is_not_circular() {
        let mut graph = DependencyGraph::parse("git:a:v1 git:b:v1");
        let result = graph.build_graph(|d: &Dependency| -> DepsyncResult<Vec<Dependency>> {
            Ok(match d.name.as_str() {
                "a" | "b" => vec![dep("git", "c", "v1")],
                _ => Vec::new(),
            })
        });
        assert!(result.is_ok());
        assert_eq!(graph.flatten_by_name()["c"].len(), 1);
    }

    #[test]
    fn test_build_graph_visits_in_preorder() {
        let mut graph = DependencyGraph::parse("git:a:v1 git:b:v1");
        let mut visited = Vec::new();
        graph
            .build_graph(|d: &Dependency| -> DepsyncResult<Vec<Dependency>> {
                visited.push(d.name.clone());
                Ok(match d.name.as_str() {
                    "a" => vec![dep("git", "c", "v1"), dep("git", "d", "v1")],
                    "c" => vec![dep("git", "e", "v1")],
                    _ => Vec::new(),
                })
            })
            .unwrap();

        assert_eq!(visited, vec!["a", "c", "e", "d", "b"]);
        assert!(graph
            .preorder()
            .into_iter()
            .all(|id| graph.state(id) == ResolveState::Resolved));
    }

    #[test]
    fn test_resolver_error_stops_construction() {
        let mut graph = DependencyGraph::parse("git:a:v1 git:b:v1");
        let mut calls = 0;
        let result = graph.build_graph(|d: &Dependency| -> DepsyncResult<Vec<Dependency>> {
            calls += 1;
            if d.name == "a" {
                Err(DepsyncError::internal_error("offline"))
            } else {
                Ok(Vec::new())
            }
        });
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    fn conflicted_graph() -> DependencyGraph {
        let mut graph = DependencyGraph::parse("git:a:branch1 git:c:v1");
        let children: HashMap<&str, Vec<Dependency>> =
            HashMap::from([("c", vec![dep("git", "a", "branch2")])]);
        graph
            .build_graph(|d: &Dependency| -> DepsyncResult<Vec<Dependency>> {
                if d.name == "c" {
                    Ok(children["c"].clone())
                } else {
                    Ok(Vec::new())
                }
            })
            .unwrap();
        graph
    }

    #[test]
    fn test_conflicts_and_flatten_unique_agree_on_first() {
        let graph = conflicted_graph();

        let conflicts = graph.conflicts();
        assert_eq!(conflicts.len(), 1);
        let refs: Vec<Dependency> = conflicts["a"]
            .iter()
            .map(|id| graph.dependency(*id).clone())
            .collect();
        assert_eq!(refs, vec![dep("git", "a", "branch1"), dep("git", "a", "branch2")]);

        assert_eq!(graph.flatten_unique()["a"], dep("git", "a", "branch1"));
    }

    #[test]
    fn test_same_reference_twice_is_not_a_conflict() {
        let mut graph = DependencyGraph::parse("git:a:v1 git:c:v1");
        graph
            .build_graph(|d: &Dependency| -> DepsyncResult<Vec<Dependency>> {
                Ok(if d.name == "c" {
                    vec![dep("git", "a", "v1")]
                } else {
                    Vec::new()
                })
            })
            .unwrap();
        assert!(graph.conflicts().is_empty());
        assert_eq!(graph.flatten_unique().len(), 2);
    }

    #[test]
    fn test_chain_excludes_root() {
        let graph = conflicted_graph();
        let nested = graph.find(&dep("git", "a", "branch2")).unwrap();
        assert_eq!(
            graph.chain(nested),
            vec![dep("git", "c", "v1"), dep("git", "a", "branch2")]
        );
        assert!(graph.contains_project("c"));
        assert!(!graph.contains_project("zz"));
    }

    #[test]
    fn test_describe_conflicts() {
        let graph = conflicted_graph();
        let text = graph.describe_conflicts();
        assert!(text.starts_with("a using branches branch1 and branch2 due to the workspace and c:v1"));
        assert!(text.contains("c:v1\n"));
        assert!(text.contains("a:branch2   <---- Using branch branch2"));
    }

    #[test]
    fn test_render_tree() {
        let graph = conflicted_graph();
        assert_eq!(
            graph.render_tree(),
            "git:a:branch1\ngit:c:v1\n  git:a:branch2\n"
        );
    }

    #[test]
    fn test_from_file_distinguishes_missing_and_empty() {
        let dir = tempfile::TempDir::new().unwrap();

        let missing = DependencyGraph::from_file(&dir.path().join("nope.txt")).unwrap_err();
        assert!(missing.to_string().contains("Could not locate file"));

        let empty_path = dir.path().join("empty.txt");
        std::fs::write(&empty_path, "\n  \n").unwrap();
        let empty = DependencyGraph::from_file(&empty_path).unwrap_err();
        assert!(empty.to_string().contains("is empty"));

        let path = dir.path().join("deps.txt");
        let graph = DependencyGraph::parse("git:core:v1 hub:zlib:1.2");
        graph.save_to_file(&path).unwrap();
        let loaded = DependencyGraph::from_file(&path).unwrap();
        assert_eq!(loaded.direct_dependencies(), graph.direct_dependencies());
    }
}
