use anyhow::{bail, Result};

use super::CommandContext;
use crate::application::use_cases::foreach::{CommandStatus, ForeachConfig};

/// Run a command in every dependency directory
pub struct ForeachCommand {
    pub command: Vec<String>,
    pub provider: Option<String>,
    pub jobs: Option<usize>,
}

impl ForeachCommand {
    pub fn new(command: Vec<String>, provider: Option<String>, jobs: Option<usize>) -> Self {
        Self {
            command,
            provider,
            jobs,
        }
    }

    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let display = ctx.display();
        let workspace = ctx.open_workspace().await?;

        let mut config = ForeachConfig::new(self.command.clone())
            .with_provider(self.provider.clone())
            .with_environment_variable(
                "DEPSYNC_WORKSPACE_ROOT",
                ctx.root().display().to_string(),
            );
        if let Some(jobs) = self.jobs {
            config = config.with_max_parallel(jobs);
        }

        let result = workspace.foreach(config, ctx.reporter().as_ref()).await?;
        for command_result in &result.results {
            display.section_header(&command_result.name);
            match command_result.status {
                CommandStatus::Skipped => display.warning(
                    command_result
                        .error_message
                        .as_deref()
                        .unwrap_or("skipped"),
                ),
                _ => {
                    print!("{}", command_result.stdout);
                    eprint!("{}", command_result.stderr);
                    if let Some(message) = &command_result.error_message {
                        display.error(message);
                    }
                }
            }
        }

        if result.is_success() {
            display.success(&format!(
                "Command succeeded in {} directories",
                result.success_count
            ));
            Ok(())
        } else {
            let failed: Vec<String> = result
                .failed_results()
                .iter()
                .map(|r| match r.exit_code {
                    Some(code) => format!("{} (exit {})", r.name, code),
                    None => r.name.clone(),
                })
                .collect();
            bail!("Command failed in: {}", failed.join(", "))
        }
    }
}
