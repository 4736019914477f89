use anyhow::{bail, Result};

use super::CommandContext;

/// Check every copy recorded by the last update
pub struct VerifyCommand;

impl VerifyCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let display = ctx.display();
        let workspace = ctx.open_workspace().await?;
        let report = workspace.verify().await?;

        if !report.initialized {
            bail!("Workspace has not been updated yet. Run 'depsync update' first.");
        }
        if report.corrupted {
            display.warning("Workspace snapshot is corrupted: some records lack a project or directory");
        }

        for entry in &report.entries {
            let line = format!(
                "{:<32} {:<20} {}",
                entry.project,
                entry.class.to_string(),
                ctx.relative(&entry.dir)
            );
            if entry.class.is_ok() {
                println!("  {}", line);
            } else {
                display.warning(&line);
            }
        }

        if report.is_ok() {
            display.success("Workspace verified");
            Ok(())
        } else {
            bail!("Workspace verification failed")
        }
    }
}
