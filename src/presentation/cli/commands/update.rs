use anyhow::Result;

use super::CommandContext;
use crate::application::use_cases::package_set::{ReconcileAction, UpdateOptions};

/// Reconcile every dependency with its resolved version
pub struct UpdateCommand {
    pub force: bool,
    pub preview: bool,
}

impl UpdateCommand {
    pub fn new(force: bool, preview: bool) -> Self {
        Self { force, preview }
    }

    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let display = ctx.display();
        let mut workspace = ctx.open_workspace().await?;
        let options = UpdateOptions::new()
            .with_force(self.force)
            .with_preview(self.preview);

        let report = workspace.update(&options, ctx.reporter().as_ref()).await?;

        for winner in &report.forced {
            display.warning(&format!("{} will use {}", winner.name, winner));
        }

        for entry in &report.reconcile.entries {
            let name = display.format_package(&entry.dependency.name);
            let dir = display.format_path(&ctx.relative(&entry.dir));
            match &entry.action {
                ReconcileAction::UpToDate => {
                    if self.preview {
                        println!("  {} is up to date", name);
                    }
                }
                ReconcileAction::Refuse { from, to } => display.warning(&format!(
                    "{} has local modifications, not changing {} -> {} (use --force)",
                    name, from, to
                )),
                action if self.preview => println!("  would {} {} in {}", action, name, dir),
                action => display.success(&format!("{} {} in {}", action, name, dir)),
            }
        }

        if self.preview {
            display.info(&format!(
                "{} of {} dependencies would change",
                report.reconcile.pending().count(),
                report.reconcile.entries.len()
            ));
        } else if report.reconcile.has_refusals() {
            display.warning("Some dependencies were left at their current version");
        } else {
            display.success("Workspace is up to date");
        }
        Ok(())
    }
}
