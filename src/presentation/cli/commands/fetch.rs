use anyhow::Result;

use super::CommandContext;
use crate::application::use_cases::package_set::FetchOutcome;

/// Install missing dependencies and update installed ones
pub struct FetchCommand;

impl FetchCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let display = ctx.display();
        let workspace = ctx.open_workspace().await?;
        let outcomes = workspace.update_packages(ctx.reporter().as_ref()).await?;

        for (dependency, outcome) in &outcomes {
            let verb = match outcome {
                FetchOutcome::CheckedOut => "checked out",
                FetchOutcome::Updated => "updated",
                FetchOutcome::Unchanged => "unchanged",
            };
            println!("  {:<16} {}", display.format_package(&dependency.name), verb);
        }
        display.success(&format!("Fetched {} dependencies", outcomes.len()));
        Ok(())
    }
}

/// Empty the provider cache
pub struct ClearCacheCommand;

impl ClearCacheCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let workspace = ctx.open_workspace().await?;
        let removed = workspace.clear_cache().await?;
        ctx.display()
            .success(&format!("Removed {} cache entries", removed));
        Ok(())
    }
}
