pub mod commands;

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::env;
use std::path::PathBuf;
use std::process::exit;

use crate::application::use_cases::workspace::WorkspaceConfig;
use crate::common::error::DepsyncError;
use crate::presentation::ui::display::DisplayHelper;
use commands::{
    ClearCacheCommand, CommandContext, DependsCommand, FetchCommand, ForeachCommand,
    ImportCommand, ImportsCommand, InitCommand, StatusCommand, UpdateCommand, VerifyCommand,
    VersionsCommand,
};

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("DEPSYNC_GIT_HASH"),
    " ",
    env!("DEPSYNC_BUILD_DATE"),
    ", ",
    env!("DEPSYNC_BUILD_TARGET"),
    ")"
);

/// depsync - resolve source dependencies and synchronize them into a workspace
#[derive(Parser)]
#[command(name = "depsync")]
#[command(about = "Resolve source dependencies and synchronize them into a workspace")]
#[command(version, long_version = LONG_VERSION)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Workspace directory (defaults to current directory)
    #[arg(short = 'C', long, global = true)]
    pub directory: Option<String>,

    /// Cache directory (defaults to <workspace>/.depsync/cache)
    #[arg(long, global = true, env = "DEPSYNC_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options of every command that resolves the dependency graph
#[derive(Debug, Clone, Copy, Default, Args)]
pub struct ResolveArgs {
    /// Update existing working copies before reading their dependencies
    #[arg(short, long)]
    pub refresh: bool,

    /// Confirm every referenced branch or tag exists upstream
    #[arg(long)]
    pub validate: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a depsync.yaml template in the workspace
    Init {
        /// Overwrite an existing depsync.yaml
        #[arg(short, long)]
        force: bool,
    },

    /// Check out every dependency at its resolved version
    Update {
        /// Switch modified copies (stashing changes) and pick the first reference on conflicts
        #[arg(short, long)]
        force: bool,

        /// Show what would be done without touching anything
        #[arg(short, long)]
        preview: bool,

        #[command(flatten)]
        resolve: ResolveArgs,
    },

    /// Show the local state of every dependency
    Status {
        /// List modified files
        #[arg(short, long)]
        detailed: bool,

        /// Show raw provider status output
        #[arg(long)]
        raw: bool,

        #[command(flatten)]
        resolve: ResolveArgs,
    },

    /// Show the dependency tree and its conflicts
    Depends {
        #[command(flatten)]
        resolve: ResolveArgs,
    },

    /// Compare resolved versions with local copies
    Versions {
        #[command(flatten)]
        resolve: ResolveArgs,
    },

    /// Check the copies recorded by the last update
    Verify,

    /// List projects available for import
    Imports,

    /// Add a dependency to depsync.yaml
    Import {
        /// Dependency as source:name:version
        dependency: String,
    },

    /// Install missing dependencies and update installed ones
    Fetch {
        #[command(flatten)]
        resolve: ResolveArgs,
    },

    /// Run a command in every dependency directory
    Foreach {
        /// Only run for dependencies of this provider
        #[arg(long)]
        provider: Option<String>,

        /// Maximum number of parallel jobs
        #[arg(short, long)]
        jobs: Option<usize>,

        #[command(flatten)]
        resolve: ResolveArgs,

        /// Command and its arguments
        #[arg(last = true, required = true)]
        command: Vec<String>,
    },

    /// Remove every cached provider lookup
    ClearCache,
}

/// CLI application runner
pub struct CliApp {
    cli: Cli,
}

impl Default for CliApp {
    fn default() -> Self {
        Self::new()
    }
}

impl CliApp {
    pub fn new() -> Self {
        Self { cli: Cli::parse() }
    }

    pub fn verbose(&self) -> bool {
        self.cli.verbose
    }

    pub async fn run(self) -> anyhow::Result<()> {
        colored::control::set_override(!self.cli.no_color);
        let display = DisplayHelper::auto(self.cli.no_color);

        match self.handle_command(display).await {
            Ok(()) => Ok(()),
            Err(e) => {
                eprintln!("{} {}", "Error:".red().bold(), e);
                if let Some(chain) = e.downcast_ref::<DepsyncError>().and_then(|e| e.chain()) {
                    eprintln!("While processing:");
                    for (depth, dependency) in chain.iter().enumerate() {
                        eprintln!("{}{}", "  ".repeat(depth + 1), dependency);
                    }
                }
                exit(1);
            }
        }
    }

    fn context(&self, resolve: ResolveArgs, display: DisplayHelper) -> anyhow::Result<CommandContext> {
        let root = match &self.cli.directory {
            Some(dir) => PathBuf::from(dir),
            None => env::current_dir()?,
        };
        let config = WorkspaceConfig::new()
            .with_cache_dir(self.cli.cache_dir.clone())
            .with_refresh(resolve.refresh)
            .with_verify(resolve.validate);
        Ok(CommandContext::new(root, config, display))
    }

    async fn handle_command(&self, display: DisplayHelper) -> anyhow::Result<()> {
        let none = ResolveArgs::default();
        match &self.cli.command {
            Commands::Init { force } => {
                InitCommand::new(*force)
                    .execute(&self.context(none, display)?)
                    .await
            }
            Commands::Update {
                force,
                preview,
                resolve,
            } => {
                UpdateCommand::new(*force, *preview)
                    .execute(&self.context(*resolve, display)?)
                    .await
            }
            Commands::Status {
                detailed,
                raw,
                resolve,
            } => {
                StatusCommand::new(*detailed, *raw)
                    .execute(&self.context(*resolve, display)?)
                    .await
            }
            Commands::Depends { resolve } => {
                DependsCommand
                    .execute(&self.context(*resolve, display)?)
                    .await
            }
            Commands::Versions { resolve } => {
                VersionsCommand
                    .execute(&self.context(*resolve, display)?)
                    .await
            }
            Commands::Verify => VerifyCommand.execute(&self.context(none, display)?).await,
            Commands::Imports => ImportsCommand.execute(&self.context(none, display)?).await,
            Commands::Import { dependency } => {
                ImportCommand::new(dependency.clone())
                    .execute(&self.context(none, display)?)
                    .await
            }
            Commands::Fetch { resolve } => {
                FetchCommand
                    .execute(&self.context(*resolve, display)?)
                    .await
            }
            Commands::Foreach {
                provider,
                jobs,
                resolve,
                command,
            } => {
                ForeachCommand::new(command.clone(), provider.clone(), *jobs)
                    .execute(&self.context(*resolve, display)?)
                    .await
            }
            Commands::ClearCache => {
                ClearCacheCommand
                    .execute(&self.context(none, display)?)
                    .await
            }
        }
    }
}
