/// Source control operations
///
/// Git is driven through its command line; remote refs and errors are shared types.
pub mod git_scm;
pub mod scm_interface;

pub use git_scm::GitScm;
pub use scm_interface::{RemoteRef, ScmError};
