use anyhow::Result;

use super::CommandContext;
use crate::domain::entities::dependency::Dependency;

/// Add one dependency to depsync.yaml
pub struct ImportCommand {
    /// `source:name:version`
    pub dependency: String,
}

impl ImportCommand {
    pub fn new(dependency: String) -> Self {
        Self { dependency }
    }

    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let dependency = Dependency::parse_one(&self.dependency)?;
        let mut workspace = ctx.open_workspace().await?;

        if workspace.import(&dependency).await? {
            ctx.display()
                .success(&format!("Added {} to depsync.yaml", dependency));
        } else {
            ctx.display()
                .info(&format!("{} is already imported", dependency));
        }
        Ok(())
    }
}

/// Projects the providers can list
pub struct ImportsCommand;

impl ImportsCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let display = ctx.display();
        let workspace = ctx.open_workspace().await?;
        let candidates = workspace.available_imports().await?;

        if candidates.is_empty() {
            display.info("No provider lists importable projects");
            return Ok(());
        }
        for candidate in candidates {
            let marker = if candidate.imported { "*" } else { " " };
            println!("{} {}", marker, candidate.project);
        }
        Ok(())
    }
}
