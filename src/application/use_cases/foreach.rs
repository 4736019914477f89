use futures::future::join_all;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;

use crate::domain::entities::package::PackageBinding;
use crate::infrastructure::process::CommandRunner;

#[derive(Debug, Error)]
pub enum ForeachError {
    #[error("Command is empty or invalid")]
    InvalidCommand,

    #[error("Parallel execution failed: {0}")]
    ParallelExecutionFailed(String),
}

/// Settings of a foreach run
#[derive(Debug, Clone, Default)]
pub struct ForeachConfig {
    /// Program followed by its arguments
    pub command: Vec<String>,

    /// Only run for bindings of this provider
    pub provider: Option<String>,

    /// Maximum concurrent commands (defaults to the CPU count)
    pub max_parallel: Option<usize>,

    pub environment_variables: BTreeMap<String, String>,
}

impl ForeachConfig {
    pub fn new<I, S>(command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command: command.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_provider(mut self, provider: Option<String>) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = Some(max_parallel);
        self
    }

    pub fn with_environment_variable(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.environment_variables.insert(key.into(), value.into());
        self
    }
}

/// One directory to run the command in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeachTarget {
    pub name: String,
    pub version: String,
    pub provider: String,
    pub dir: PathBuf,
}

impl ForeachTarget {
    pub fn from_binding(binding: &PackageBinding) -> Self {
        let package = binding.package();
        Self {
            name: package.name().to_string(),
            version: package.version().to_string(),
            provider: package.dependency().source.clone(),
            dir: binding.dir().to_path_buf(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    Success,
    Failed,
    /// Binding directory does not exist
    Skipped,
}

/// Outcome of the command in one binding directory
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub name: String,
    pub status: CommandStatus,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub error_message: Option<String>,
}

impl CommandResult {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: CommandStatus::Skipped,
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            error_message: None,
        }
    }

    fn with_skip(mut self, reason: impl Into<String>) -> Self {
        self.status = CommandStatus::Skipped;
        self.error_message = Some(reason.into());
        self
    }

    fn with_failure(mut self, error: impl Into<String>) -> Self {
        self.status = CommandStatus::Failed;
        self.error_message = Some(error.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == CommandStatus::Success
    }
}

#[derive(Debug, Clone, Default)]
pub struct ForeachResult {
    pub results: Vec<CommandResult>,
    pub success_count: usize,
    pub failure_count: usize,
    pub skipped_count: usize,
}

impl ForeachResult {
    fn add_result(&mut self, result: CommandResult) {
        match result.status {
            CommandStatus::Success => self.success_count += 1,
            CommandStatus::Failed => self.failure_count += 1,
            CommandStatus::Skipped => self.skipped_count += 1,
        }
        self.results.push(result);
    }

    pub fn is_success(&self) -> bool {
        self.failure_count == 0
    }

    pub fn failed_results(&self) -> Vec<&CommandResult> {
        self.results
            .iter()
            .filter(|r| r.status == CommandStatus::Failed)
            .collect()
    }
}

/// Runs one external command inside every binding directory
pub struct ForeachUseCase {
    config: ForeachConfig,
}

impl ForeachUseCase {
    pub fn new(config: ForeachConfig) -> Self {
        Self { config }
    }

    /// Run the command for each target, in target order in the result.
    pub async fn execute(&self, targets: Vec<ForeachTarget>) -> Result<ForeachResult, ForeachError> {
        let (program, args) = self
            .config
            .command
            .split_first()
            .filter(|(program, _)| !program.trim().is_empty())
            .ok_or(ForeachError::InvalidCommand)?;

        let targets: Vec<ForeachTarget> = targets
            .into_iter()
            .filter(|t| match &self.config.provider {
                Some(provider) => &t.provider == provider,
                None => true,
            })
            .collect();

        let max_parallel = self
            .config
            .max_parallel
            .unwrap_or_else(|| std::cmp::min(targets.len(), num_cpus::get()))
            .max(1);
        let semaphore = Arc::new(Semaphore::new(max_parallel));
        tracing::debug!(
            "Running '{}' in {} directories ({} at a time)",
            self.config.command.join(" "),
            targets.len(),
            max_parallel
        );

        let tasks: Vec<_> = targets
            .iter()
            .map(|target| {
                let target = target.clone();
                let semaphore = Arc::clone(&semaphore);
                let runner = self.runner_for(program, &target);
                let args = args.to_vec();

                tokio::spawn(async move {
                    let _permit = semaphore.acquire_owned().await.map_err(|e| {
                        ForeachError::ParallelExecutionFailed(format!(
                            "Failed to acquire semaphore: {}",
                            e
                        ))
                    })?;
                    Ok::<_, ForeachError>(run_in_target(&runner, &args, &target).await)
                })
            })
            .collect();

        let mut result = ForeachResult::default();
        for (target, joined) in targets.iter().zip(join_all(tasks).await) {
            let command_result = match joined {
                Ok(task_result) => task_result?,
                Err(join_err) => CommandResult::new(target.name.clone())
                    .with_failure(format!("Task join error: {}", join_err)),
            };
            result.add_result(command_result);
        }
        Ok(result)
    }

    fn runner_for(&self, program: &str, target: &ForeachTarget) -> CommandRunner {
        let mut runner = CommandRunner::new(program)
            .with_env("DEPSYNC_PACKAGE_NAME", &target.name)
            .with_env("DEPSYNC_PACKAGE_VERSION", &target.version)
            .with_env("DEPSYNC_PACKAGE_SOURCE", &target.provider)
            .with_env("DEPSYNC_PACKAGE_DIR", target.dir.display().to_string());
        for (key, value) in &self.config.environment_variables {
            runner = runner.with_env(key, value);
        }
        runner
    }
}

async fn run_in_target(runner: &CommandRunner, args: &[String], target: &ForeachTarget) -> CommandResult {
    let result = CommandResult::new(target.name.clone());
    if !target.dir.is_dir() {
        return result.with_skip("Package directory does not exist");
    }

    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    match runner.run(&args, Some(&target.dir)).await {
        Ok(output) => CommandResult {
            status: if output.success() {
                CommandStatus::Success
            } else {
                CommandStatus::Failed
            },
            exit_code: output.exit_code,
            stdout: output.stdout,
            stderr: output.stderr,
            ..result
        },
        Err(e) => result.with_failure(format!("{}: {}", runner.describe(&args), e)),
    }
}
