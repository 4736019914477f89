use anyhow::Result;

use super::CommandContext;
use crate::application::use_cases::workspace::StatusEntry;

const MISSING: &str = "<missing>";

/// Local state of every dependency
pub struct StatusCommand {
    /// List modified files
    pub detailed: bool,
    /// Print the provider's raw status output
    pub raw: bool,
}

impl StatusCommand {
    pub fn new(detailed: bool, raw: bool) -> Self {
        Self { detailed, raw }
    }

    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let display = ctx.display();
        let workspace = ctx.open_workspace().await?;
        let report = workspace.status(ctx.reporter().as_ref()).await?;

        for entry in &report.entries {
            println!("{}", status_line(entry));
            if self.detailed {
                for modification in &entry.status.modifications {
                    display.print_indented(
                        &format!("{}: {}", modification.kind().pretty_name(), modification.path()),
                        2,
                    );
                }
            }
            if self.raw && !entry.status.raw_modifications.trim().is_empty() {
                display.print_indented(&entry.status.raw_modifications, 2);
            }
        }

        if !report.conflicts.is_empty() {
            display.section_header("Conflicts");
            print!("{}", report.conflicts);
        }
        Ok(())
    }
}

/// `name -> version : state`
pub fn status_line(entry: &StatusEntry) -> String {
    let status = &entry.status;
    let (version, state) = if !status.is_installed() {
        (MISSING, "not installed")
    } else if !status.is_valid() {
        (status.version().unwrap_or(MISSING), "invalid")
    } else if !entry.tracks_modifications {
        (status.version().unwrap_or(MISSING), "installed")
    } else if status.is_modified() {
        (status.version().unwrap_or(MISSING), "modified")
    } else {
        (status.version().unwrap_or(MISSING), "unmodified")
    };
    format!("{:<16} -> {:<10} : {}", entry.name, version, state)
}

/// Resolved versus local version of every dependency
pub struct VersionsCommand;

impl VersionsCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let display = ctx.display();
        let workspace = ctx.open_workspace().await?;
        let versions = workspace.versions(ctx.reporter().as_ref()).await?;

        for entry in versions {
            let local = entry.local.as_deref().unwrap_or(MISSING);
            let marker = if local == entry.desired { " " } else { "*" };
            println!(
                "{} {:<16} {:<16} {}",
                marker,
                entry.name,
                display.format_version(&entry.desired),
                local
            );
        }
        Ok(())
    }
}
