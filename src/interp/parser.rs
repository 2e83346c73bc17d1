//! Parser interpreter: walks the parser automaton over a token stream and
//! builds a parse tree, recovering from errors the way generated ANTLR
//! parsers do.
//!
//! Recovery in brief:
//! - before each decision, `sync` drops one extraneous token or bails out
//!   of the rule, and at loop back-edges skips to something that can follow
//! - a failed match first tries deleting one token, then pretends the
//!   expected token was there
//! - otherwise the rule is abandoned and tokens are skipped until one that
//!   can follow some active rule invocation
//!
//! After reporting an error the parser stays quiet until it matches a token
//! again, so one mistake yields one message.

use std::rc::Rc;

use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use super::errors::{ErrorCollector, SyntaxErrorKind};
use super::prediction::{Predictor, Stack, StackNode};
use super::token::{Channel, Token, TokenStream, escape_ws};
use super::tree::{ErrorLeaf, NodeId, ParseTree};
use crate::atn::{Atn, EOF, EPSILON, IntervalSet, StateId, StateKind, Transition};
use crate::config::InterpreterOptions;
use crate::grammar::GrammarDefinition;

/// One active rule invocation
#[derive(Debug, Clone)]
struct Frame {
    node: NodeId,
    rule: usize,
    /// Where to continue once the rule returns; `None` for the start rule
    follow: Option<StateId>,
    precedence: u32,
}

#[derive(Debug, Clone)]
enum Recognition {
    InputMismatch { expected: IntervalSet },
    /// `start` is the parser position where prediction began
    NoViableAlt { start: usize },
    FailedPredicate { rule: usize, precedence: u32 },
}

#[derive(Debug, Clone)]
struct RecognitionError {
    kind: Recognition,
    /// Parser position of the offending token
    offending: usize,
}

pub(crate) struct ParseOutput {
    pub tree: ParseTree,
    pub token_states: FxHashMap<usize, StateId>,
    pub errors: ErrorCollector,
}

pub(crate) struct ParserInterpreter<'a> {
    grammar: &'a GrammarDefinition,
    atn: &'a Atn,
    tokens: &'a TokenStream,
    options: &'a InterpreterOptions,
    /// Stream indexes of the tokens the parser sees; ends with EOF
    real: Vec<usize>,
    types: Vec<i32>,
    /// Position in `real`
    p: usize,
    state: StateId,
    tree: ParseTree,
    frames: Vec<Frame>,
    token_states: FxHashMap<usize, StateId>,
    errors: ErrorCollector,
    recovering: bool,
    last_error_index: Option<usize>,
    last_error_states: Vec<StateId>,
    halted: bool,
}

impl<'a> ParserInterpreter<'a> {
    /// `tokens` must end with an EOF token, as the lexer interpreter's
    /// output always does.
    pub fn new(
        grammar: &'a GrammarDefinition,
        tokens: &'a TokenStream,
        options: &'a InterpreterOptions,
        errors: ErrorCollector,
    ) -> Self {
        let real: Vec<usize> = tokens.real_tokens().map(|t| t.index).collect();
        let types = real.iter().map(|&i| tokens.as_slice()[i].ty).collect();
        Self {
            grammar,
            atn: &grammar.atn,
            tokens,
            options,
            real,
            types,
            p: 0,
            state: StateId::new(0),
            tree: ParseTree::new(),
            frames: Vec::new(),
            token_states: FxHashMap::default(),
            errors,
            recovering: false,
            last_error_index: None,
            last_error_states: Vec::new(),
            halted: false,
        }
    }

    pub fn parse(mut self, start_rule: usize) -> ParseOutput {
        let atn = self.atn;
        let root = self.tree.add_rule(start_rule, None);
        self.frames.push(Frame {
            node: root,
            rule: start_rule,
            follow: None,
            precedence: 0,
        });
        self.state = atn.rule_start[start_rule];

        while !self.halted {
            let state = atn.state(self.state);
            if state.kind == StateKind::RuleStop {
                if self.frames.len() <= 1 {
                    break;
                }
                match self.frames.pop().and_then(|frame| frame.follow) {
                    Some(follow) => self.state = follow,
                    None => break,
                }
                continue;
            }
            if let Err(e) = self.visit_state(self.state) {
                self.state = atn.rule_stop[state.rule];
                self.report_error(&e);
                self.recover(&e);
            }
        }

        self.tree.compute_spans(self.tokens);
        tracing::debug!(
            nodes = self.tree.len(),
            errors = self.errors.len(),
            "parsed input"
        );
        ParseOutput {
            tree: self.tree,
            token_states: self.token_states,
            errors: self.errors,
        }
    }

    fn visit_state(&mut self, id: StateId) -> Result<(), RecognitionError> {
        let atn = self.atn;
        let state = atn.state(id);
        let mut alt = 1;
        if state.is_decision() && state.transitions.len() > 1 {
            self.sync(id)?;
            alt = self.predict(id)?;
        }
        let Some(transition) = state.transitions.get(alt - 1) else {
            tracing::warn!(state = %id, "automaton state has no transition to follow");
            self.halted = true;
            return Ok(());
        };

        match transition {
            Transition::Epsilon { target } => {
                if state.kind == StateKind::StarLoopEntry
                    && state.precedence_decision
                    && atn.state(*target).kind != StateKind::LoopEnd
                {
                    self.push_recursion_context();
                }
            }
            Transition::Rule {
                rule,
                follow,
                precedence,
                ..
            } => {
                if self.frames.len() >= self.options.max_rule_depth {
                    self.report_depth_limit();
                    return Ok(());
                }
                let parent = self.current_node();
                let node = self.tree.add_rule(*rule, Some(parent));
                self.frames.push(Frame {
                    node,
                    rule: *rule,
                    follow: Some(*follow),
                    precedence: *precedence,
                });
            }
            Transition::Precedence { precedence, .. } => {
                if *precedence < self.precedence() {
                    return Err(RecognitionError {
                        kind: Recognition::FailedPredicate {
                            rule: state.rule,
                            precedence: *precedence,
                        },
                        offending: self.p,
                    });
                }
            }
            Transition::Predicate { .. } | Transition::Action { .. } => {}
            t => self.match_symbol(t, id)?,
        }
        self.state = transition.target();
        Ok(())
    }

    fn match_symbol(&mut self, transition: &Transition, id: StateId) -> Result<(), RecognitionError> {
        let (min, max) = self.atn.symbol_bounds();
        let la = self.la(1);
        let matched = match transition {
            Transition::Wildcard { .. } => la != EOF,
            t => t.matches(la, min, max),
        };
        if matched {
            self.report_match();
            let index = self.consume();
            self.token_states.insert(index, id);
            return Ok(());
        }
        self.recover_inline(id)
    }

    fn predict(&mut self, id: StateId) -> Result<usize, RecognitionError> {
        let predictor = Predictor::new(self.atn, self.options.max_prediction_lookahead);
        let stack = self.prediction_stack();
        predictor
            .predict(id, &stack, self.precedence(), &self.types[self.p..])
            .map_err(|e| RecognitionError {
                kind: Recognition::NoViableAlt { start: self.p },
                offending: (self.p + e.offending).min(self.real.len().saturating_sub(1)),
            })
    }

    /// The invocation stack as prediction sees it, outermost frame deepest
    fn prediction_stack(&self) -> Stack {
        let mut stack: Stack = None;
        for pair in self.frames.windows(2) {
            let (caller, callee) = (&pair[0], &pair[1]);
            if let Some(follow) = callee.follow {
                stack = Some(Rc::new(StackNode {
                    return_state: follow,
                    precedence: caller.precedence,
                    parent: stack,
                }));
            }
        }
        stack
    }

    fn precedence(&self) -> u32 {
        self.frames.last().map_or(0, |f| f.precedence)
    }

    fn current_node(&self) -> NodeId {
        self.frames.last().map_or(NodeId::new(0), |f| f.node)
    }

    fn push_recursion_context(&mut self) {
        let Some(frame) = self.frames.last_mut() else {
            return;
        };
        frame.node = self.tree.wrap(frame.node, frame.rule);
    }

    fn la(&self, i: usize) -> i32 {
        let at = (self.p + i - 1).min(self.types.len().saturating_sub(1));
        self.types.get(at).copied().unwrap_or(EOF)
    }

    fn token(&self, position: usize) -> &'a Token {
        let tokens: &'a TokenStream = self.tokens;
        let index = self.real[position.min(self.real.len() - 1)];
        &tokens.as_slice()[index]
    }

    /// Consume the current token into the tree; EOF is never stepped past
    fn consume(&mut self) -> usize {
        let token = self.token(self.p);
        if !token.is_eof() && self.p + 1 < self.real.len() {
            self.p += 1;
        }
        let node = self.current_node();
        if self.recovering {
            self.tree.add_error(node, ErrorLeaf::Consumed(token.index));
        } else {
            self.tree.add_token(node, token.index);
        }
        token.index
    }

    fn consume_until(&mut self, set: &IntervalSet) {
        loop {
            let la = self.la(1);
            if la == EOF || set.contains(la) {
                break;
            }
            self.consume();
        }
    }

    fn follows(&self) -> Vec<StateId> {
        self.frames.iter().rev().filter_map(|f| f.follow).collect()
    }

    fn expected(&self, id: StateId) -> IntervalSet {
        self.atn.expected_tokens(id, self.follows())
    }

    /// Union of what can follow each active invocation
    fn recovery_set(&self) -> IntervalSet {
        let mut set = IntervalSet::new();
        for follow in self.follows() {
            set.add_all(&self.atn.next_tokens(follow));
        }
        set.remove(EPSILON);
        set
    }

    fn report_match(&mut self) {
        self.recovering = false;
        self.last_error_index = None;
        self.last_error_states.clear();
    }

    fn sync(&mut self, id: StateId) -> Result<(), RecognitionError> {
        if self.recovering {
            return Ok(());
        }
        let next = self.atn.next_tokens(id);
        if next.contains(self.la(1)) || next.contains(EPSILON) {
            return Ok(());
        }
        match self.atn.state(id).kind {
            StateKind::BlockStart | StateKind::PlusBlockStart | StateKind::StarLoopEntry => {
                if self.single_token_deletion(id) {
                    return Ok(());
                }
                Err(self.input_mismatch(id))
            }
            StateKind::PlusLoopBack | StateKind::StarLoopBack => {
                self.report_unwanted_token(id);
                let mut resume = self.expected(id);
                resume.add_all(&self.recovery_set());
                self.consume_until(&resume);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn recover_inline(&mut self, id: StateId) -> Result<(), RecognitionError> {
        if self.single_token_deletion(id) {
            let index = self.consume();
            self.token_states.insert(index, id);
            return Ok(());
        }
        if self.single_token_insertion(id) {
            let ty = self.expected(id).min_element().unwrap_or(0);
            let text = if ty == EOF {
                SmolStr::new_static("<missing EOF>")
            } else {
                SmolStr::new(format!("<missing {}>", self.grammar.vocabulary.display_name(ty)))
            };
            let at = self.token(self.p).index;
            let node = self.current_node();
            self.tree.add_error(node, ErrorLeaf::Conjured { ty, at, text });
            return Ok(());
        }
        Err(self.input_mismatch(id))
    }

    /// Drop the current token if the one after it is what we expect
    fn single_token_deletion(&mut self, id: StateId) -> bool {
        if !self.expected(id).contains(self.la(2)) {
            return false;
        }
        self.report_unwanted_token(id);
        self.consume();
        self.report_match();
        true
    }

    /// Whether the current token could follow the one we expect
    fn single_token_insertion(&mut self, id: StateId) -> bool {
        let Some(next) = self.atn.state(id).transitions.first().map(Transition::target) else {
            return false;
        };
        let expecting = self.atn.expected_tokens(next, self.follows());
        if !expecting.contains(self.la(1)) {
            return false;
        }
        self.report_missing_token(id);
        true
    }

    fn input_mismatch(&self, id: StateId) -> RecognitionError {
        RecognitionError {
            kind: Recognition::InputMismatch {
                expected: self.expected(id),
            },
            offending: self.p,
        }
    }

    fn report_unwanted_token(&mut self, id: StateId) {
        if self.recovering {
            return;
        }
        self.recovering = true;
        let token = self.token(self.p);
        let message = format!(
            "extraneous input {} expecting {}",
            token.display_text(),
            self.expected(id).to_string_with(&self.grammar.vocabulary)
        );
        self.errors
            .syntax(SyntaxErrorKind::ExtraneousInput, token, message);
    }

    fn report_missing_token(&mut self, id: StateId) {
        if self.recovering {
            return;
        }
        self.recovering = true;
        let token = self.token(self.p);
        let message = format!(
            "missing {} at {}",
            self.expected(id).to_string_with(&self.grammar.vocabulary),
            token.display_text()
        );
        self.errors.syntax(SyntaxErrorKind::MissingToken, token, message);
    }

    fn report_depth_limit(&mut self) {
        let token = self.token(self.p);
        tracing::warn!(
            limit = self.options.max_rule_depth,
            "rule invocation depth limit reached"
        );
        self.errors.syntax(
            SyntaxErrorKind::RecursionLimit,
            token,
            format!(
                "rule invocation depth exceeds {}",
                self.options.max_rule_depth
            ),
        );
        self.halted = true;
    }

    fn report_error(&mut self, e: &RecognitionError) {
        if self.recovering {
            return;
        }
        self.recovering = true;
        let token = self.token(e.offending);
        let (kind, message) = match &e.kind {
            Recognition::InputMismatch { expected } => (
                SyntaxErrorKind::InputMismatch,
                format!(
                    "mismatched input {} expecting {}",
                    token.display_text(),
                    expected.to_string_with(&self.grammar.vocabulary)
                ),
            ),
            Recognition::NoViableAlt { start } => (
                SyntaxErrorKind::NoViableAlt,
                format!(
                    "no viable alternative at input {}",
                    self.input_text(*start, e.offending)
                ),
            ),
            Recognition::FailedPredicate { rule, precedence } => {
                let name = self
                    .grammar
                    .rule_by_index(*rule)
                    .map_or("<unknown>", |r| r.name.as_str());
                (
                    SyntaxErrorKind::FailedPredicate,
                    format!("rule {name} failed predicate: {{precpred(_ctx, {precedence})}}?"),
                )
            }
        };
        self.errors.syntax(kind, token, message);
    }

    /// Quoted input text from parser position `start` through `stop`,
    /// hidden-channel text included
    fn input_text(&self, start: usize, stop: usize) -> String {
        let first = self.token(start);
        if first.is_eof() {
            return "<EOF>".to_string();
        }
        let last = self.token(stop).index;
        let text: String = self.tokens.as_slice()[first.index..=last]
            .iter()
            .filter(|t| !t.is_eof() && t.channel != Channel::Skip)
            .map(|t| t.text.as_str())
            .collect();
        format!("'{}'", escape_ws(&text))
    }

    fn recover(&mut self, e: &RecognitionError) {
        let before = self.p;
        if self.last_error_index == Some(self.p) && self.last_error_states.contains(&self.state) {
            self.consume();
        }
        self.last_error_index = Some(self.p);
        self.last_error_states.push(self.state);
        let resume = self.recovery_set();
        self.consume_until(&resume);

        if self.p == before {
            let offending = self.token(e.offending);
            let ty = match &e.kind {
                Recognition::InputMismatch { expected } => expected.min_element().unwrap_or(0),
                _ => 0,
            };
            let node = self.current_node();
            self.tree.add_error(
                node,
                ErrorLeaf::Conjured {
                    ty,
                    at: offending.index,
                    text: offending.text.clone(),
                },
            );
        }
    }
}
