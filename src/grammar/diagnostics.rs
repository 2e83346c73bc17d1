//! Diagnostics for grammar loading and compilation.
//!
//! Every problem found while reading, parsing or analysing a grammar file is
//! reported as a [`GrammarDiagnostic`]. Error-severity diagnostics make the
//! whole load invalid; warnings are kept for display only.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::base::{LineIndex, TextRange};

// ============================================================================
// DIAGNOSTIC TYPES
// ============================================================================

/// Severity level of a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
}

/// A grammar problem with its location in the grammar source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrammarDiagnostic {
    /// The grammar file containing this diagnostic.
    pub file: PathBuf,
    /// Byte range in the grammar source.
    pub range: TextRange,
    /// Line (1-based).
    pub line: u32,
    /// Column (0-based).
    pub column: u32,
    pub severity: Severity,
    /// Error/warning code (e.g., "G0001").
    pub code: Arc<str>,
    pub message: Arc<str>,
}

impl GrammarDiagnostic {
    pub fn error(file: &Path, range: TextRange, code: &str, message: impl Into<Arc<str>>) -> Self {
        Self {
            file: file.to_path_buf(),
            range,
            line: 1,
            column: 0,
            severity: Severity::Error,
            code: Arc::from(code),
            message: message.into(),
        }
    }

    pub fn warning(file: &Path, range: TextRange, code: &str, message: impl Into<Arc<str>>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(file, range, code, message)
        }
    }

    /// Fill in line/column from the source the range points into.
    pub fn located(mut self, index: &LineIndex) -> Self {
        let pos = index.line_col(self.range.start());
        self.line = pos.line;
        self.column = pos.column;
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for GrammarDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(
            f,
            "{level}({}): {}:{}:{}: {}",
            self.code,
            self.file.display(),
            self.line,
            self.column,
            self.message
        )
    }
}

// ============================================================================
// DIAGNOSTIC CODES
// ============================================================================

/// Diagnostic codes for grammar problems.
///
/// ## Code Ranges
///
/// - **G0001-G0019**: Loading and composition (I/O, counterpart files)
/// - **G0020-G0039**: Grammar syntax
/// - **G0040-G0099**: Semantic analysis
/// - **W0001-W0099**: Warnings
#[allow(dead_code)]
pub mod codes {
    // ========================================================================
    // LOADING (G0001-G0019)
    // ========================================================================

    /// Grammar file could not be read.
    pub const IO_ERROR: &str = "G0001";
    /// Split grammar counterpart could not be derived from the file name.
    pub const NO_COUNTERPART_NAME: &str = "G0002";
    /// Split grammar counterpart file missing on disk.
    pub const MISSING_COUNTERPART: &str = "G0003";
    /// Split grammar counterpart has the wrong grammar type.
    pub const WRONG_COUNTERPART_KIND: &str = "G0004";

    // ========================================================================
    // SYNTAX (G0020-G0039)
    // ========================================================================

    /// Grammar source failed to parse.
    pub const SYNTAX_ERROR: &str = "G0020";

    // ========================================================================
    // SEMANTIC (G0040-G0099)
    // ========================================================================

    /// Grammar name differs from the file name.
    pub const NAME_MISMATCH: &str = "G0040";
    /// Rule declared twice.
    pub const DUPLICATE_RULE: &str = "G0041";
    /// Parser rule in a lexer grammar.
    pub const PARSER_RULE_IN_LEXER: &str = "G0042";
    /// Lexer rule in a parser grammar.
    pub const LEXER_RULE_IN_PARSER: &str = "G0043";
    /// Reference to an undefined rule.
    pub const UNDEFINED_RULE: &str = "G0044";
    /// Reference to an undefined token inside a lexer rule.
    pub const UNDEFINED_TOKEN: &str = "G0045";
    /// Fragment rule referenced from a parser rule.
    pub const FRAGMENT_IN_PARSER: &str = "G0046";
    /// String literal with no matching lexer token.
    pub const UNDEFINED_LITERAL: &str = "G0047";
    /// Empty string literal.
    pub const EMPTY_LITERAL: &str = "G0048";
    /// Non-fragment lexer rule that can match the empty string.
    pub const EPSILON_TOKEN: &str = "G0049";
    /// Unknown or malformed lexer command.
    pub const INVALID_COMMAND: &str = "G0050";
    /// Construct the interpreter does not support.
    pub const UNSUPPORTED: &str = "G0051";
    /// Left recursion that cannot be rewritten.
    pub const LEFT_RECURSION: &str = "G0052";
    /// Malformed literal, range or character set.
    pub const INVALID_LITERAL: &str = "G0053";
    /// Construct not allowed in this kind of rule.
    pub const INVALID_ELEMENT: &str = "G0054";
    /// Grammar declares no rules.
    pub const NO_RULES: &str = "G0055";
    /// Loop body that can match the empty string.
    pub const EPSILON_CLOSURE: &str = "G0056";

    // ========================================================================
    // WARNINGS (W0001-W0099)
    // ========================================================================

    /// Token referenced in a parser rule with no lexer definition.
    pub const IMPLICIT_TOKEN: &str = "W0001";
    /// Option the interpreter ignores.
    pub const IGNORED_OPTION: &str = "W0002";
}

// ============================================================================
// DIAGNOSTIC COLLECTOR
// ============================================================================

/// Collects diagnostics for a single grammar file.
#[derive(Clone, Debug)]
pub struct DiagnosticCollector {
    file: PathBuf,
    line_index: LineIndex,
    diagnostics: Vec<GrammarDiagnostic>,
}

impl DiagnosticCollector {
    pub fn new(file: &Path, source: &str) -> Self {
        Self {
            file: file.to_path_buf(),
            line_index: LineIndex::new(source),
            diagnostics: Vec::new(),
        }
    }

    pub fn error(&mut self, range: TextRange, code: &str, message: impl Into<Arc<str>>) {
        let diag = GrammarDiagnostic::error(&self.file, range, code, message);
        self.add(diag);
    }

    pub fn warning(&mut self, range: TextRange, code: &str, message: impl Into<Arc<str>>) {
        let diag = GrammarDiagnostic::warning(&self.file, range, code, message);
        self.add(diag);
    }

    pub fn add(&mut self, diagnostic: GrammarDiagnostic) {
        tracing::debug!(%diagnostic, "grammar diagnostic");
        self.diagnostics.push(diagnostic.located(&self.line_index));
    }

    pub fn diagnostics(&self) -> &[GrammarDiagnostic] {
        &self.diagnostics
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(GrammarDiagnostic::is_error)
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }

    pub fn into_diagnostics(self) -> Vec<GrammarDiagnostic> {
        self.diagnostics
    }
}
