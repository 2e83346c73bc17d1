//! Lexer interpreter: tokenizes input by simulating the lexer automaton.
//!
//! At each position every non-fragment rule is run in parallel; the longest
//! match wins and ties go to the rule declared first. Non-greedy loops stop
//! at the first accept reached through them.

use rustc_hash::FxHashSet;
use smol_str::SmolStr;
use text_size::{TextRange, TextSize};

use super::errors::ErrorCollector;
use super::token::{Channel, Token, escape_ws};
use crate::atn::{Atn, EOF, LexerAction, StateId, StateKind, Transition};
use crate::base::LineIndex;
use crate::grammar::DEFAULT_CHANNEL;

/// One thread of the simulation
#[derive(Debug, Clone)]
struct LexerConfig {
    state: StateId,
    /// Top-level rule this thread is matching
    rule: usize,
    /// Follow states of fragment calls in progress
    stack: Vec<StateId>,
    passed_non_greedy: bool,
    /// Indexes into [`Atn::lexer_actions`], in execution order
    actions: Vec<usize>,
}

#[derive(Debug, Default)]
struct ConfigSet {
    configs: Vec<LexerConfig>,
    visited: FxHashSet<(StateId, usize, Vec<StateId>)>,
}

impl ConfigSet {
    fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}

#[derive(Debug)]
struct Accept {
    /// Char position just past the match
    end: usize,
    rule: usize,
    actions: Vec<usize>,
}

pub struct LexerInterpreter<'a> {
    atn: &'a Atn,
    input: &'a str,
    chars: Vec<char>,
    /// Byte offset of each char, plus the input length
    offsets: Vec<TextSize>,
    lines: &'a LineIndex,
}

impl<'a> LexerInterpreter<'a> {
    pub fn new(atn: &'a Atn, input: &'a str, lines: &'a LineIndex) -> Self {
        let (offsets, chars): (Vec<TextSize>, Vec<char>) = input
            .char_indices()
            .map(|(i, c)| (TextSize::new(i as u32), c))
            .unzip();
        let mut offsets = offsets;
        offsets.push(TextSize::of(input));
        Self {
            atn,
            input,
            chars,
            offsets,
            lines,
        }
    }

    /// Tokenize the whole input. The result always ends with an EOF token.
    pub fn tokenize(&self, errors: &mut ErrorCollector) -> Vec<Token> {
        let mut tokens: Vec<Token> = Vec::new();
        let mut pos = 0;

        'tokens: while pos < self.chars.len() {
            let start = pos;
            let mut channel = Channel::from_number(DEFAULT_CHANNEL);

            loop {
                let accept = match self.match_at(pos) {
                    Ok(accept) => accept,
                    Err(fail) => {
                        let stop = (fail + 1).min(self.chars.len());
                        let text = self.text(start, stop);
                        errors.lexical(
                            self.input,
                            self.lines,
                            self.offsets[start],
                            format!("token recognition error at: '{}'", escape_ws(text)),
                        );
                        pos = stop;
                        continue 'tokens;
                    }
                };
                pos = accept.end;

                let mut ty = self.atn.rule_token_type[accept.rule];
                let mut skip = false;
                let mut more = false;
                for &index in &accept.actions {
                    match self.atn.lexer_actions[index] {
                        LexerAction::Skip => skip = true,
                        LexerAction::More => more = true,
                        LexerAction::Channel(n) => channel = Channel::from_number(n),
                        LexerAction::Type(t) => ty = t,
                    }
                }

                if skip || (more && pos >= self.chars.len()) {
                    self.push(&mut tokens, ty, Channel::Skip, start, pos);
                    continue 'tokens;
                }
                if !more {
                    self.push(&mut tokens, ty, channel, start, pos);
                    continue 'tokens;
                }
            }
        }

        let end = TextSize::of(self.input);
        let at = self.lines.line_col(end);
        tokens.push(Token {
            index: tokens.len(),
            ty: EOF,
            channel: Channel::Default,
            range: TextRange::empty(end),
            line: at.line,
            column: at.column,
            text: SmolStr::new_static("<EOF>"),
        });
        tracing::trace!(count = tokens.len(), "tokenized input");
        tokens
    }

    fn push(&self, tokens: &mut Vec<Token>, ty: i32, channel: Channel, start: usize, end: usize) {
        let at = self.lines.line_col(self.offsets[start]);
        tokens.push(Token {
            index: tokens.len(),
            ty,
            channel,
            range: TextRange::new(self.offsets[start], self.offsets[end]),
            line: at.line,
            column: at.column,
            text: SmolStr::new(self.text(start, end)),
        });
    }

    fn text(&self, start: usize, end: usize) -> &'a str {
        let from = usize::from(self.offsets[start]);
        let to = usize::from(self.offsets[end]);
        &self.input[from..to]
    }

    /// Longest match starting at char `start`. On failure returns the char
    /// position where no thread could continue.
    fn match_at(&self, start: usize) -> Result<Accept, usize> {
        let mut closure = self.start_configs();
        let mut pos = start;
        let mut accept = None;

        while let Some(&c) = self.chars.get(pos) {
            let reach = self.reach(&closure, c as i32);
            if reach.is_empty() {
                break;
            }
            pos += 1;
            if let Some(stop) = reach
                .configs
                .iter()
                .find(|config| self.atn.state(config.state).kind == StateKind::RuleStop)
            {
                accept = Some(Accept {
                    end: pos,
                    rule: stop.rule,
                    actions: stop.actions.clone(),
                });
            }
            closure = reach;
        }

        accept.ok_or(pos)
    }

    fn start_configs(&self) -> ConfigSet {
        let mut set = ConfigSet::default();
        let Some(tokens_start) = self.atn.tokens_start else {
            return set;
        };
        for t in &self.atn.state(tokens_start).transitions {
            let target = t.target();
            let config = LexerConfig {
                state: target,
                rule: self.atn.state(target).rule,
                stack: Vec::new(),
                passed_non_greedy: false,
                actions: Vec::new(),
            };
            self.closure(config, &mut set, false);
        }
        set
    }

    fn reach(&self, closure: &ConfigSet, symbol: i32) -> ConfigSet {
        let (min, max) = self.atn.symbol_bounds();
        let mut reach = ConfigSet::default();
        let mut skip_rule = None;

        for config in &closure.configs {
            let rule_accepted = skip_rule == Some(config.rule);
            if rule_accepted && config.passed_non_greedy {
                continue;
            }
            for t in &self.atn.state(config.state).transitions {
                if !t.matches(symbol, min, max) {
                    continue;
                }
                let next = LexerConfig {
                    state: t.target(),
                    ..config.clone()
                };
                if self.closure(next, &mut reach, rule_accepted) {
                    skip_rule = Some(config.rule);
                    break;
                }
            }
        }
        reach
    }

    /// Follow epsilon edges from `config`, adding every state that consumes
    /// input (or accepts) to `set`. Returns whether an accept was reached.
    fn closure(&self, config: LexerConfig, set: &mut ConfigSet, mut accepted: bool) -> bool {
        if !set
            .visited
            .insert((config.state, config.rule, config.stack.clone()))
        {
            return accepted;
        }

        let state = self.atn.state(config.state);
        if state.kind == StateKind::RuleStop {
            let mut config = config;
            return match config.stack.pop() {
                None => {
                    set.configs.push(config);
                    true
                }
                Some(follow) => {
                    config.state = follow;
                    self.closure(config, set, accepted)
                }
            };
        }

        if !state.only_epsilon() && (!accepted || !config.passed_non_greedy) {
            set.configs.push(config.clone());
        }

        for t in &state.transitions {
            let mut next = config.clone();
            match t {
                Transition::Rule { target, follow, .. } => {
                    next.stack.push(*follow);
                    next.state = *target;
                }
                Transition::Action {
                    target,
                    lexer_action,
                } => {
                    // Commands only count in the rule being matched, not in fragments it calls
                    if let (Some(index), true) = (lexer_action, config.stack.is_empty()) {
                        next.actions.push(*index);
                    }
                    next.state = *target;
                }
                Transition::Epsilon { target }
                | Transition::Predicate { target, .. }
                | Transition::Precedence { target, .. } => next.state = *target,
                _ => continue,
            }
            let target = self.atn.state(next.state);
            next.passed_non_greedy =
                config.passed_non_greedy || (target.non_greedy && target.is_decision());
            accepted = self.closure(next, set, accepted);
        }
        accepted
    }
}
