//! Preview session tests
//!
//! Tests for:
//! - End-to-end editor scenarios
//! - Navigation from input back to grammar text
//! - Concurrent events and queries

pub mod tests_concurrency;
pub mod tests_navigation;
pub mod tests_scenarios;
