//! Input errors reported while interpreting.
//!
//! Every error carries its input span, computed once when it is collected:
//! a lexical error covers the one character where recognition failed, every
//! other error covers its offending token.

use std::fmt;

use text_size::{TextRange, TextSize};

use super::token::Token;
use crate::base::LineIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyntaxErrorKind {
    /// No lexer rule matches at this character
    Lexical,
    /// `mismatched input ...`
    InputMismatch,
    /// `no viable alternative at input ...`
    NoViableAlt,
    /// Precedence predicate of a left-recursive rule failed
    FailedPredicate,
    /// `extraneous input ...`
    ExtraneousInput,
    /// `missing ... at ...`
    MissingToken,
    /// The configured rule-invocation depth was exceeded
    RecursionLimit,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SyntaxError {
    pub kind: SyntaxErrorKind,
    pub range: TextRange,
    /// 1-based
    pub line: u32,
    /// 0-based
    pub column: u32,
    pub message: String,
    /// Stream index of the offending token; lexical errors have none
    pub token: Option<usize>,
}

impl SyntaxError {
    pub fn is_lexical(&self) -> bool {
        self.kind == SyntaxErrorKind::Lexical
    }

    pub fn contains(&self, offset: TextSize) -> bool {
        self.range.contains(offset)
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}:{} {}", self.line, self.column, self.message)
    }
}

/// Error sink shared by the lexer and parser of one run
#[derive(Debug, Default)]
pub struct ErrorCollector {
    errors: Vec<SyntaxError>,
}

impl ErrorCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a lexical error at `start`. The span is the single character
    /// found there.
    pub fn lexical(&mut self, input: &str, lines: &LineIndex, start: TextSize, message: String) {
        let width = input
            .get(usize::from(start)..)
            .and_then(|rest| rest.chars().next())
            .map_or(TextSize::new(0), TextSize::of);
        let pos = lines.line_col(start);
        tracing::trace!(line = pos.line, column = pos.column, %message, "lexical error");
        self.errors.push(SyntaxError {
            kind: SyntaxErrorKind::Lexical,
            range: TextRange::at(start, width),
            line: pos.line,
            column: pos.column,
            message,
            token: None,
        });
    }

    /// Record a parse error against its offending token
    pub fn syntax(&mut self, kind: SyntaxErrorKind, offending: &Token, message: String) {
        tracing::trace!(line = offending.line, column = offending.column, %message, "syntax error");
        self.errors.push(SyntaxError {
            kind,
            range: offending.range,
            line: offending.line,
            column: offending.column,
            message,
            token: Some(offending.index),
        });
    }

    pub fn errors(&self) -> &[SyntaxError] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_errors(self) -> Vec<SyntaxError> {
        self.errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::token::Channel;
    use smol_str::SmolStr;

    #[test]
    fn test_lexical_span_is_one_char() {
        let input = "a\né!";
        let lines = LineIndex::new(input);
        let mut errors = ErrorCollector::new();
        errors.lexical(input, &lines, TextSize::new(2), "token recognition error at: 'é'".into());
        let err = &errors.errors()[0];
        assert!(err.is_lexical());
        assert_eq!(err.range, TextRange::new(TextSize::new(2), TextSize::new(4)));
        assert_eq!(err.to_string(), "line 2:0 token recognition error at: 'é'");
    }

    #[test]
    fn test_syntax_span_is_offending_token() {
        let token = Token {
            index: 3,
            ty: 2,
            channel: Channel::Default,
            range: TextRange::new(TextSize::new(4), TextSize::new(5)),
            line: 1,
            column: 4,
            text: SmolStr::new(";"),
        };
        let mut errors = ErrorCollector::new();
        errors.syntax(SyntaxErrorKind::InputMismatch, &token, "mismatched input ';'".into());
        let err = &errors.errors()[0];
        assert!(err.contains(TextSize::new(4)));
        assert!(!err.contains(TextSize::new(5)));
        assert_eq!(err.token, Some(3));
    }
}
