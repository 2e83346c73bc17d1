//! Interpreter tests
//!
//! Tests for:
//! - Determinism of repeated runs
//! - Token lookup over the whole input
//! - Error lookup by offset
//! - Operator precedence in left-recursive rules

pub mod tests_properties;
