//! Shared fixtures and setup for the integration tests.

#![allow(dead_code)]

pub mod grammar_fixtures;
pub mod session_helpers;
