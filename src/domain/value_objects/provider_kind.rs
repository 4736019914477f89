use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of remote package source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Packages are git repositories, versions are branches or tags
    Git,
    /// Packages are downloadable archives, versions are directories on a server
    Archive,
}

impl Default for ProviderKind {
    fn default() -> Self {
        Self::Git
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Git => write!(f, "git"),
            ProviderKind::Archive => write!(f, "archive"),
        }
    }
}

impl FromStr for ProviderKind {
    type Err = ProviderKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "git" => Ok(ProviderKind::Git),
            "archive" | "http" => Ok(ProviderKind::Archive),
            _ => Err(ProviderKindError::UnsupportedProviderKind(s.to_string())),
        }
    }
}

impl ProviderKind {
    /// Whether local copies can carry uncommitted modifications
    pub fn tracks_modifications(&self) -> bool {
        match self {
            ProviderKind::Git => true,
            ProviderKind::Archive => false,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ProviderKindError {
    #[error("Unsupported provider kind: {0}")]
    UnsupportedProviderKind(String),
}
