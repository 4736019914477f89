/// Errors that can occur during source control operations
#[derive(Debug, thiserror::Error)]
pub enum ScmError {
    #[error("SCM executable not found: {executable}")]
    ExecutableNotFound { executable: String },

    #[error("IO error: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },

    #[error("Command execution failed: {command}, exit code: {exit_code}, stderr: {stderr}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("Invalid ref name: {name}")]
    InvalidRef { name: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl ScmError {
    /// Create an executable not found error
    pub fn executable_not_found(executable: impl Into<String>) -> Self {
        Self::ExecutableNotFound {
            executable: executable.into(),
        }
    }

    /// Create a command failed error
    pub fn command_failed(
        command: impl Into<String>,
        exit_code: i32,
        stderr: impl Into<String>,
    ) -> Self {
        Self::CommandFailed {
            command: command.into(),
            exit_code,
            stderr: stderr.into(),
        }
    }
}

/// A ref advertised by a remote repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRef {
    pub hash: String,
    /// Full ref name, e.g. `refs/heads/main`
    pub name: String,
}

impl RemoteRef {
    /// Last path segment of the ref name, with any peeled-tag suffix removed.
    pub fn short_name(&self) -> &str {
        let name = self.name.strip_suffix("^{}").unwrap_or(&self.name);
        name.rsplit('/').next().unwrap_or(name)
    }

    pub fn is_branch(&self) -> bool {
        self.name.starts_with("refs/heads/")
    }

    pub fn is_tag(&self) -> bool {
        self.name.starts_with("refs/tags/")
    }

    /// Parse `git ls-remote` output: `<hash>\t<ref>` per line.
    pub fn parse_ls_remote(output: &str) -> Vec<RemoteRef> {
        output
            .lines()
            .filter_map(|line| {
                let mut parts = line.split_whitespace();
                let hash = parts.next()?;
                let name = parts.next()?;
                Some(RemoteRef {
                    hash: hash.to_string(),
                    name: name.to_string(),
                })
            })
            .collect()
    }
}
