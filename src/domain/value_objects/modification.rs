use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

static PORCELAIN_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([ MADRCU?!])([ MADRCU?!]) (.+)$").expect("porcelain pattern is valid")
});

/// Kind of local change to a path in a working copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModificationKind {
    Unmodified,
    Modified,
    Added,
    Deleted,
    Renamed,
    Copied,
    UpdatedButUnmerged,
    Untracked,
    Ignored,
}

impl ModificationKind {
    /// Map a single porcelain status code.
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            ' ' => Some(Self::Unmodified),
            'M' => Some(Self::Modified),
            'A' => Some(Self::Added),
            'D' => Some(Self::Deleted),
            'R' => Some(Self::Renamed),
            'C' => Some(Self::Copied),
            'U' => Some(Self::UpdatedButUnmerged),
            '?' => Some(Self::Untracked),
            '!' => Some(Self::Ignored),
            _ => None,
        }
    }

    pub fn code(&self) -> char {
        match self {
            Self::Unmodified => ' ',
            Self::Modified => 'M',
            Self::Added => 'A',
            Self::Deleted => 'D',
            Self::Renamed => 'R',
            Self::Copied => 'C',
            Self::UpdatedButUnmerged => 'U',
            Self::Untracked => '?',
            Self::Ignored => '!',
        }
    }

    pub fn pretty_name(&self) -> &'static str {
        match self {
            Self::Unmodified => "Unmodified File",
            Self::Modified => "Modified File",
            Self::Added => "Added File",
            Self::Deleted => "Deleted File",
            Self::Renamed => "Renamed File",
            Self::Copied => "Copied File",
            Self::UpdatedButUnmerged => "File Needs Merging",
            Self::Untracked => "Untracked File",
            Self::Ignored => "Ignored File",
        }
    }
}

impl fmt::Display for ModificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.pretty_name())
    }
}

/// A single modified path in a working copy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modification {
    kind: ModificationKind,
    path: String,
}

impl Modification {
    pub fn new(kind: ModificationKind, path: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }

    pub fn kind(&self) -> ModificationKind {
        self.kind
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Parse `git status --porcelain` output.
    ///
    /// The index code wins when it is set, otherwise the worktree code is used.
    /// Lines that do not look like status entries are ignored.
    pub fn parse_porcelain(output: &str) -> Vec<Modification> {
        output
            .lines()
            .filter_map(|line| {
                let caps = PORCELAIN_LINE.captures(line)?;
                let index = caps[1].chars().next()?;
                let worktree = caps[2].chars().next()?;
                let code = if index != ' ' { index } else { worktree };
                let kind = ModificationKind::from_code(code)?;
                Some(Modification::new(kind, &caps[3]))
            })
            .collect()
    }
}

impl fmt::Display for Modification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} : {}", self.kind.pretty_name(), self.path)
    }
}
