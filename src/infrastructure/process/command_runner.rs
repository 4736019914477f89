use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

/// Captured result of an external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when the process was killed by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs one external program with captured output
#[derive(Debug, Clone)]
pub struct CommandRunner {
    program: String,
    envs: Vec<(String, String)>,
}

impl CommandRunner {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            envs: Vec::new(),
        }
    }

    /// Set an environment variable for every run
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Run with `args`, optionally inside `working_dir`.
    pub async fn run(
        &self,
        args: &[&str],
        working_dir: Option<&Path>,
    ) -> Result<CommandOutput, std::io::Error> {
        let mut cmd = Command::new(&self.program);
        cmd.args(args)
            .envs(self.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(dir) = working_dir {
            cmd.current_dir(dir);
        }

        tracing::debug!("Running {} {}", self.program, args.join(" "));
        let output = cmd.output().await?;

        Ok(CommandOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    /// Render a command line for diagnostics.
    pub fn describe(&self, args: &[&str]) -> String {
        format!("{} {}", self.program, args.join(" "))
    }
}
