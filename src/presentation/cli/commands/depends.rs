use anyhow::Result;

use super::CommandContext;

/// Dependency tree, distinct references per project and conflicts
pub struct DependsCommand;

impl DependsCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let display = ctx.display();
        let workspace = ctx.open_workspace().await?;
        let report = workspace.depends(ctx.reporter().as_ref()).await?;

        display.section_header("Dependent projects");
        for (name, refs) in &report.projects {
            let refs: Vec<String> = refs.iter().map(ToString::to_string).collect();
            println!("  {:<16} {}", display.format_package(name), refs.join(", "));
        }

        display.section_header("Dependency tree");
        display.print_indented(&report.tree, 1);

        println!();
        if report.conflict_count == 0 {
            display.success("OK - Conflict free dependencies");
        } else {
            display.warning(&format!(
                "NOT OK - {} conflicted dependencies",
                report.conflict_count
            ));
            print!("{}", report.conflicts);
        }
        Ok(())
    }
}
