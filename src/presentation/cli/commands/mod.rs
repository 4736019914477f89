pub mod depends;
pub mod fetch;
pub mod foreach;
pub mod import;
pub mod init;
pub mod status;
pub mod update;
pub mod verify;

pub use depends::*;
pub use fetch::*;
pub use foreach::*;
pub use import::*;
pub use init::*;
pub use status::*;
pub use update::*;
pub use verify::*;

use std::path::{Path, PathBuf};

use crate::application::use_cases::workspace::{Workspace, WorkspaceConfig};
use crate::common::reporter::{TaskReporter, TracingReporter};
use crate::presentation::ui::display::{DisplayHelper, SpinnerReporter};

/// What every command needs: the workspace root, how to open it, and the display
pub struct CommandContext {
    root: PathBuf,
    config: WorkspaceConfig,
    display: DisplayHelper,
}

impl CommandContext {
    pub fn new(root: PathBuf, config: WorkspaceConfig, display: DisplayHelper) -> Self {
        Self {
            root,
            config,
            display,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn display(&self) -> &DisplayHelper {
        &self.display
    }

    pub async fn open_workspace(&self) -> anyhow::Result<Workspace> {
        Ok(Workspace::open(&self.root, self.config.clone()).await?)
    }

    /// Spinners on a color terminal, log lines otherwise
    pub fn reporter(&self) -> Box<dyn TaskReporter> {
        if self.display.use_color {
            Box::new(SpinnerReporter::new(self.display))
        } else {
            Box::new(TracingReporter)
        }
    }

    /// `dir` relative to the workspace root, for display
    pub fn relative(&self, dir: &Path) -> String {
        pathdiff::diff_paths(dir, &self.root)
            .unwrap_or_else(|| dir.to_path_buf())
            .display()
            .to_string()
    }
}
