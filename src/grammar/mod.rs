//! Grammar compilation: from `.g4` files to lexer/parser automata.
//!
//! ```text
//! GrammarFile (CST) → lower → model::Rule tables
//!                          → checks, left-recursion rewrite
//!                          → atn::build → GrammarDefinition
//! ```
//!
//! [`GrammarCompiler::load`] is the entry point; it always produces a
//! [`LoadOutcome`], never a panic, for any input file.

pub mod checks;
mod compiler;
pub mod diagnostics;
pub mod left_recursion;
mod lower;
pub mod model;
mod vocabulary;

pub use compiler::{
    Composition, GrammarCompiler, GrammarDefinition, GrammarPair, LoadError, LoadOutcome,
    counterpart_path,
};
pub use diagnostics::{DiagnosticCollector, GrammarDiagnostic, Severity, codes};
pub use lower::{GrammarFileModel, lower};
pub use model::{Alternative, Assoc, Element, ElementKind, GrammarKind, Rule};
pub use vocabulary::{DEFAULT_CHANNEL, HIDDEN_CHANNEL, MIN_USER_TOKEN_TYPE, Vocabulary};
