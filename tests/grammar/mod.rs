//! Grammar loading tests
//!
//! Tests for:
//! - Combined and split grammar composition
//! - Recognizer naming
//! - Load failures reported as diagnostics

pub mod tests_composition;
