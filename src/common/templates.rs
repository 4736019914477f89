//! Path templating for workspace bindings and the embedded `init` template.
//!
//! Templates use `@{name}` placeholders. A [`WorkspaceMapping`] holds named
//! placeholder values, expands them against each other until nothing changes,
//! and resolves relative results against the workspace root.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use crate::common::error::DepsyncError;
use crate::common::result::DepsyncResult;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@\{(\w+)\}").expect("placeholder pattern is valid"));

/// Name of the placeholder that always expands to the workspace root.
pub const ROOT_PLACEHOLDER: &str = "root";

/// Get the default depsync.yaml template content
pub fn get_depsync_template() -> &'static str {
    include_str!("../../templates/depsync.yaml")
}

/// Substitute `@{name}` placeholders once. Unknown placeholders are left as-is.
pub fn render_template(template: &str, params: &BTreeMap<String, String>) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| match params.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Named path templates rooted at a workspace directory.
#[derive(Debug, Clone)]
pub struct WorkspaceMapping {
    root_dir: PathBuf,
    params: BTreeMap<String, String>,
}

impl WorkspaceMapping {
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        let root_dir = root_dir.into();
        let mut params = BTreeMap::new();
        params.insert(
            ROOT_PLACEHOLDER.to_string(),
            root_dir.to_string_lossy().into_owned(),
        );
        Self { root_dir, params }
    }

    /// Add or replace placeholders.
    pub fn with_mappings<I, K, V>(mut self, mappings: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in mappings {
            self.params.insert(key.into(), value.into());
        }
        self
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Placeholder values with every placeholder applied to every other one.
    ///
    /// Fails when a value keeps changing after as many passes as there are
    /// placeholders, which only happens for self-referencing mappings.
    pub fn flattened(&self) -> DepsyncResult<BTreeMap<String, String>> {
        let mut result = BTreeMap::new();
        for (key, value) in &self.params {
            let mut current = value.clone();
            let mut passes = 0;
            loop {
                let next = render_template(&current, &self.params);
                if next == current {
                    break;
                }
                passes += 1;
                if passes > self.params.len() {
                    return Err(DepsyncError::config_error(format!(
                        "Workspace mapping '{}' references itself",
                        key
                    )));
                }
                current = next;
            }
            result.insert(key.clone(), current);
        }
        Ok(result)
    }

    /// Expand a path template into an absolute, normalized path.
    pub fn expand(&self, template: &str) -> DepsyncResult<PathBuf> {
        let params = self.flattened()?;
        let rendered = render_template(template, &params);
        let path = Path::new(&rendered);
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root_dir.join(path)
        };
        Ok(normalize(&joined))
    }
}

/// Lexically remove `.` and `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
