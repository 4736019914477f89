//! Shared utilities: errors, result helpers, path templating and task reporting.

pub mod error;
pub mod reporter;
pub mod result;
pub mod templates;
