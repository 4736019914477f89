//! Application layer: resolution and workspace workflows built on the providers.

pub mod services;
pub mod use_cases;
