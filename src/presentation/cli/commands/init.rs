use anyhow::Result;

use super::CommandContext;
use crate::application::use_cases::workspace::Workspace;

/// Create a depsync.yaml template
pub struct InitCommand {
    /// Overwrite an existing file
    pub force: bool,
}

impl InitCommand {
    pub fn new(force: bool) -> Self {
        Self { force }
    }

    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let path = Workspace::init(ctx.root(), self.force).await?;
        let display = ctx.display();

        display.success(&format!(
            "Created {}",
            display.format_path(&path.display().to_string())
        ));
        println!();
        println!("Next steps:");
        println!("   1. Add providers and dependencies to depsync.yaml");
        println!("   2. Run 'depsync update' to check out every dependency");
        println!("   3. Use 'depsync status' to inspect local copies");
        Ok(())
    }
}
