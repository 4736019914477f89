//! Common test utilities and helpers
//!
//! Shared fixtures, an in-memory provider and git repository helpers used by
//! the integration tests.

#![allow(dead_code)]

pub mod mock_services;
pub mod test_fixtures;
pub mod test_helpers;
