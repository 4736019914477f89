use std::path::Path;

use super::scm_interface::{RemoteRef, ScmError};
use crate::infrastructure::process::{CommandOutput, CommandRunner};

/// Git operations performed through the `git` executable
#[derive(Debug, Clone)]
pub struct GitScm {
    runner: CommandRunner,
}

impl Default for GitScm {
    fn default() -> Self {
        Self {
            runner: CommandRunner::new("git"),
        }
    }
}

impl GitScm {
    /// Create a new Git SCM instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new Git SCM instance with custom executable path
    pub fn with_executable(executable: impl Into<String>) -> Self {
        Self {
            runner: CommandRunner::new(executable),
        }
    }

    /// Check if git executable is available
    pub async fn check_availability(&self) -> Result<(), ScmError> {
        match self.runner.run(&["--version"], None).await {
            Ok(output) if output.success() => Ok(()),
            _ => Err(ScmError::executable_not_found(self.runner.program())),
        }
    }

    /// Execute a git command in the given directory
    async fn execute_git_command(
        &self,
        args: &[&str],
        working_dir: Option<&Path>,
    ) -> Result<CommandOutput, ScmError> {
        Ok(self.runner.run(args, working_dir).await?)
    }

    /// Execute a git command and return its untrimmed stdout on success
    async fn execute_git_command_raw(
        &self,
        args: &[&str],
        working_dir: Option<&Path>,
    ) -> Result<String, ScmError> {
        let output = self.execute_git_command(args, working_dir).await?;

        if !output.success() {
            return Err(ScmError::command_failed(
                self.runner.describe(args),
                output.exit_code.unwrap_or(-1),
                output.stderr.trim(),
            ));
        }

        Ok(output.stdout)
    }

    /// Execute a git command and check for success
    async fn execute_git_command_checked(
        &self,
        args: &[&str],
        working_dir: Option<&Path>,
    ) -> Result<String, ScmError> {
        Ok(self
            .execute_git_command_raw(args, working_dir)
            .await?
            .trim()
            .to_string())
    }

    /// `git clone -b <branch> -- <url> <dest>`
    pub async fn clone_branch(&self, url: &str, branch: &str, dest: &Path) -> Result<(), ScmError> {
        ensure_ref(branch)?;
        let dest = dest.to_str().ok_or_else(|| ScmError::Internal {
            message: format!("Invalid destination path: {}", dest.display()),
        })?;
        self.execute_git_command_checked(&["clone", "-b", branch, "--", url, dest], None)
            .await?;
        Ok(())
    }

    pub async fn pull(&self, repo_path: &Path) -> Result<(), ScmError> {
        self.execute_git_command_checked(&["pull"], Some(repo_path))
            .await?;
        Ok(())
    }

    /// Fetch branches and tags from `origin`
    pub async fn fetch(&self, repo_path: &Path) -> Result<(), ScmError> {
        self.execute_git_command_checked(&["fetch", "--tags", "origin"], Some(repo_path))
            .await?;
        Ok(())
    }

    /// Switch the working copy to another branch or tag
    pub async fn checkout(&self, repo_path: &Path, version: &str) -> Result<(), ScmError> {
        ensure_ref(version)?;
        self.execute_git_command_checked(&["checkout", version], Some(repo_path))
            .await?;
        Ok(())
    }

    /// Stash local changes, untracked files included
    pub async fn stash(&self, repo_path: &Path) -> Result<(), ScmError> {
        self.execute_git_command_checked(&["stash", "--include-untracked"], Some(repo_path))
            .await?;
        Ok(())
    }

    /// Whether `path` is the top level of its own git working copy.
    ///
    /// A plain directory nested inside another repository is not one.
    pub async fn is_working_copy(&self, path: &Path) -> bool {
        if !path.join(".git").exists() {
            return false;
        }
        let toplevel = match self
            .execute_git_command_checked(&["rev-parse", "--show-toplevel"], Some(path))
            .await
        {
            Ok(toplevel) => toplevel,
            Err(_) => return false,
        };
        match (
            tokio::fs::canonicalize(&toplevel).await,
            tokio::fs::canonicalize(path).await,
        ) {
            (Ok(toplevel), Ok(path)) => toplevel == path,
            _ => false,
        }
    }

    /// Branch name of HEAD, or the exact tag when HEAD is detached on one
    pub async fn current_version(&self, repo_path: &Path) -> Result<String, ScmError> {
        let branch = self
            .execute_git_command_checked(&["rev-parse", "--abbrev-ref", "HEAD"], Some(repo_path))
            .await?;
        if branch != "HEAD" {
            return Ok(branch);
        }

        match self
            .execute_git_command_checked(&["describe", "--tags", "--exact-match"], Some(repo_path))
            .await
        {
            Ok(tag) if !tag.is_empty() => Ok(tag),
            _ => Ok(branch),
        }
    }

    /// Raw `git status --porcelain` output
    pub async fn status_porcelain(&self, repo_path: &Path) -> Result<String, ScmError> {
        self.execute_git_command_raw(&["status", "--porcelain"], Some(repo_path))
            .await
    }

    /// Branches and tags advertised by `url`
    pub async fn ls_remote(&self, url: &str) -> Result<Vec<RemoteRef>, ScmError> {
        let output = self
            .execute_git_command_checked(&["ls-remote", "--heads", "--tags", url], None)
            .await?;
        Ok(RemoteRef::parse_ls_remote(&output))
    }
}

/// Refs are passed positionally, so one that looks like an option is refused.
fn ensure_ref(name: &str) -> Result<(), ScmError> {
    if name.is_empty() || name.starts_with('-') {
        return Err(ScmError::InvalidRef {
            name: name.to_string(),
        });
    }
    Ok(())
}
