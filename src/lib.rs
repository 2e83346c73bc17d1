//! # g4-preview
//!
//! Live preview engine for ANTLR v4 grammars: compiles a grammar under edit
//! into automata, interprets sample input against it, and maps tokens, errors
//! and tree nodes back to the grammar text that produced them.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! ide       → PreviewSession, cursor queries, RegionIndex
//!   ↓
//! interp    → Lexer/parser interpreters, ParseTree, SyntaxError
//!   ↓
//! atn       → Automaton states, construction, lookahead analysis
//!   ↓
//! grammar   → GrammarCompiler, vocabulary, checks, left-recursion rewrite
//!   ↓
//! parser    → Logos lexer, rowan CST and typed AST for .g4 files
//!   ↓
//! base      → TextRange/TextSize, LineIndex
//! ```

// ============================================================================
// MODULES (dependency order: base → parser → grammar → atn → interp → ide)
// ============================================================================

/// Foundation types: TextRange, LineIndex
pub mod base;

/// Grammar file front end: Logos lexer, rowan CST, AST wrappers
pub mod parser;

/// Grammar compilation into lexer/parser definitions
pub mod grammar;

/// Automata built from compiled grammars
pub mod atn;

/// Runtime interpretation of input against a compiled grammar
pub mod interp;

/// Preview session and navigation queries
pub mod ide;

/// Session and interpreter options
pub mod config;

pub use base::{LineCol, LineIndex, TextRange, TextSize};
pub use config::{InterpreterOptions, SessionConfig};
pub use grammar::{GrammarCompiler, GrammarDefinition, GrammarPair, LoadOutcome};
pub use ide::{PreviewSession, PreviewView, RegionIndex, SessionEvent};
pub use interp::{Interpreter, ParseResult, RunError, SyntaxError, TokenStream};
