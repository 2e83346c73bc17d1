//! Augmented transition network: the state-machine form of a compiled
//! grammar that the interpreters walk directly.
//!
//! - [`builder`] turns the compiled element tree into states and transitions
//! - [`analysis`] computes LL(1) lookahead sets for error recovery
//! - [`IntervalSet`] is the symbol-set type shared by both

mod analysis;
mod builder;
mod interval_set;
mod state;

pub use analysis::{expected_tokens, next_tokens};
pub use builder::build;
pub use interval_set::{EOF, EPSILON, Interval, IntervalSet, MAX_CHAR};
pub use state::{AtnState, LexerAction, StateId, StateKind, Transition};

/// Which recognizer an automaton drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtnKind {
    Lexer,
    Parser,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Atn {
    pub kind: AtnKind,
    pub states: Vec<AtnState>,
    /// Indexed by rule index
    pub rule_start: Vec<StateId>,
    pub rule_stop: Vec<StateId>,
    /// Rules rewritten from direct left recursion
    pub precedence_rule: Vec<bool>,
    /// Lexer only: token type emitted by each rule, 0 for fragments
    pub rule_token_type: Vec<i32>,
    /// Lexer only: actions referenced by [`Transition::Action`]
    pub lexer_actions: Vec<LexerAction>,
    /// Decision states in creation order
    pub decisions: Vec<StateId>,
    /// Lexer only: entry state choosing between all non-fragment rules
    pub tokens_start: Option<StateId>,
    pub max_token_type: i32,
}

impl Atn {
    pub fn new(kind: AtnKind, max_token_type: i32) -> Self {
        Self {
            kind,
            states: Vec::new(),
            rule_start: Vec::new(),
            rule_stop: Vec::new(),
            precedence_rule: Vec::new(),
            rule_token_type: Vec::new(),
            lexer_actions: Vec::new(),
            decisions: Vec::new(),
            tokens_start: None,
            max_token_type,
        }
    }

    pub fn state(&self, id: StateId) -> &AtnState {
        &self.states[id.index()]
    }

    pub fn state_mut(&mut self, id: StateId) -> &mut AtnState {
        &mut self.states[id.index()]
    }

    pub fn add_state(&mut self, kind: StateKind, rule: usize) -> StateId {
        let id = StateId::new(self.states.len());
        self.states.push(AtnState {
            id,
            kind,
            rule,
            transitions: Vec::new(),
            decision: None,
            non_greedy: false,
            precedence_decision: false,
            terminal: None,
        });
        id
    }

    pub fn add_transition(&mut self, from: StateId, transition: Transition) {
        self.state_mut(from).transitions.push(transition);
    }

    pub fn define_decision(&mut self, state: StateId) -> usize {
        if let Some(decision) = self.state(state).decision {
            return decision;
        }
        let decision = self.decisions.len();
        self.decisions.push(state);
        self.state_mut(state).decision = Some(decision);
        decision
    }

    pub fn rule_count(&self) -> usize {
        self.rule_start.len()
    }

    /// Inclusive range of symbols the recognizer consumes. Characters for a
    /// lexer, user token types for a parser.
    pub fn symbol_bounds(&self) -> (i32, i32) {
        match self.kind {
            AtnKind::Lexer => (0, MAX_CHAR),
            AtnKind::Parser => (1, self.max_token_type.max(1)),
        }
    }

    pub fn next_tokens(&self, state: StateId) -> IntervalSet {
        next_tokens(self, state)
    }

    pub fn expected_tokens(
        &self,
        state: StateId,
        follows: impl IntoIterator<Item = StateId>,
    ) -> IntervalSet {
        expected_tokens(self, state, follows)
    }
}
