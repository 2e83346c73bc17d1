//! Runtime interpretation of a compiled grammar pair.
//!
//! [`Interpreter::run`] tokenizes an input with the lexer automaton, parses
//! the tokens from a chosen start rule with the parser automaton, and
//! returns everything the preview layer needs: tree, tokens, errors and the
//! token→state provenance map. Each call builds its own interpreter values;
//! nothing carries over between runs.

mod errors;
mod lexer;
mod parser;
mod prediction;
mod token;
mod tree;

pub use errors::{ErrorCollector, SyntaxError, SyntaxErrorKind};
pub use lexer::LexerInterpreter;
pub use token::{Channel, Scan, Token, TokenStream};
pub use tree::{ErrorLeaf, Node, NodeId, NodeKind, ParseTree};

use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use text_size::TextSize;
use thiserror::Error;

use self::parser::ParserInterpreter;
use crate::atn::StateId;
use crate::base::LineIndex;
use crate::config::InterpreterOptions;
use crate::grammar::{GrammarDefinition, GrammarPair, LoadOutcome};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError {
    #[error("grammar is invalid")]
    GrammarInvalid,
    #[error("no such start rule: {0}")]
    NoSuchStartRule(SmolStr),
}

/// Everything one run produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseResult {
    pub start_rule: usize,
    pub tree: ParseTree,
    pub tokens: TokenStream,
    /// Lexical and syntactic errors in order of occurrence
    pub errors: Vec<SyntaxError>,
    /// Stream index of each matched token → state it was matched from
    pub token_states: FxHashMap<usize, StateId>,
}

impl ParseResult {
    /// First error whose span contains `offset`
    pub fn error_at(&self, offset: TextSize) -> Option<&SyntaxError> {
        self.errors.iter().find(|e| e.contains(offset))
    }

    pub fn state_of_token(&self, token: usize) -> Option<StateId> {
        self.token_states.get(&token).copied()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Tree in LISP form, rule names taken from `parser`
    pub fn to_sexpr(&self, parser: &GrammarDefinition) -> String {
        self.tree.to_sexpr(
            |rule| {
                parser
                    .rule_by_index(rule)
                    .map_or_else(|| format!("<rule {rule}>"), |r| r.name.to_string())
            },
            &self.tokens,
        )
    }
}

/// Runs sample input through a compiled lexer/parser pair.
#[derive(Debug, Clone, Default)]
pub struct Interpreter {
    options: InterpreterOptions,
}

impl Interpreter {
    pub fn new(options: InterpreterOptions) -> Self {
        Self { options }
    }

    /// Limits applied to every run
    pub fn options(&self) -> &InterpreterOptions {
        &self.options
    }

    /// Run over a load result; an invalid grammar fails fast
    pub fn run(
        &self,
        grammar: &LoadOutcome,
        start_rule: &str,
        input: &str,
    ) -> Result<ParseResult, RunError> {
        match grammar {
            LoadOutcome::Ready(pair) => self.run_pair(pair, start_rule, input),
            LoadOutcome::Invalid(_) => Err(RunError::GrammarInvalid),
        }
    }

    /// Tokenize `input` with the pair's lexer and parse it from
    /// `start_rule`. Syntax errors end up in the result, not in `Err`.
    pub fn run_pair(
        &self,
        pair: &GrammarPair,
        start_rule: &str,
        input: &str,
    ) -> Result<ParseResult, RunError> {
        let parser = &pair.parser;
        let Some(rule) = parser.rule(start_rule).filter(|r| !r.is_lexer) else {
            return Err(RunError::NoSuchStartRule(SmolStr::new(start_rule)));
        };
        let start = rule.index;

        let lines = LineIndex::new(input);
        let mut errors = ErrorCollector::new();
        let tokens = LexerInterpreter::new(&pair.lexer.atn, input, &lines).tokenize(&mut errors);
        let tokens = TokenStream::new(tokens);

        let output = ParserInterpreter::new(parser, &tokens, &self.options, errors).parse(start);
        tracing::debug!(
            grammar = %parser.name,
            start_rule,
            tokens = tokens.len(),
            errors = output.errors.len(),
            "interpreted input"
        );
        Ok(ParseResult {
            start_rule: start,
            tree: output.tree,
            tokens,
            errors: output.errors.into_errors(),
            token_states: output.token_states,
        })
    }
}
