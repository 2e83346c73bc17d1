//! Element tree to automaton.
//!
//! Every sub-structure is built as a [`Handle`]: a left state where matching
//! starts and a right state where it ends. Blocks with several alternatives
//! open with a block-start decision; loops follow the usual shapes:
//!
//! ```text
//! (x)?   block-start -> x -> block-end, plus a bypass edge to block-end
//! (x)*   loop-entry -> block-start -> x -> block-end -> loop-back -> loop-entry
//!        loop-entry -> loop-end
//! (x)+   plus-start -> x -> block-end -> plus-loop-back -> {plus-start, loop-end}
//! ```
//!
//! Terminal elements record the state their match transition leaves from,
//! which is what the region index and the token provenance map key on.

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use super::interval_set::IntervalSet;
use super::state::{StateId, StateKind, Transition};
use super::{Atn, AtnKind};
use crate::grammar::model::{Alternative, Element, ElementKind, Rule};
use crate::grammar::Vocabulary;

#[derive(Debug, Clone, Copy)]
struct Handle {
    left: StateId,
    right: StateId,
}

struct Builder<'a> {
    atn: Atn,
    rule_index: FxHashMap<SmolStr, usize>,
    vocabulary: &'a Vocabulary,
    current_rule: usize,
}

/// Build the automaton for a rule table. Rules are expected to have passed
/// semantic checks; unresolved names degrade to epsilon edges.
pub fn build(kind: AtnKind, rules: &mut IndexMap<SmolStr, Rule>, vocabulary: &Vocabulary) -> Atn {
    let mut builder = Builder {
        atn: Atn::new(kind, vocabulary.max_token_type()),
        rule_index: rules
            .values()
            .map(|rule| (rule.name.clone(), rule.index))
            .collect(),
        vocabulary,
        current_rule: 0,
    };

    for rule in rules.values() {
        let start = builder.atn.add_state(StateKind::RuleStart, rule.index);
        let stop = builder.atn.add_state(StateKind::RuleStop, rule.index);
        builder.atn.rule_start.push(start);
        builder.atn.rule_stop.push(stop);
        builder.atn.precedence_rule.push(rule.precedence_rule);
        let token_type = if kind == AtnKind::Lexer && !rule.fragment {
            vocabulary.token_type(&rule.name).unwrap_or(0)
        } else {
            0
        };
        builder.atn.rule_token_type.push(token_type);
    }

    for rule in rules.values_mut() {
        builder.rule(rule);
    }

    if kind == AtnKind::Lexer {
        let tokens_start = builder.atn.add_state(StateKind::TokensStart, 0);
        for rule in rules.values().filter(|rule| !rule.fragment) {
            let target = builder.atn.rule_start[rule.index];
            builder
                .atn
                .add_transition(tokens_start, Transition::Epsilon { target });
        }
        builder.atn.tokens_start = Some(tokens_start);
        builder.atn.define_decision(tokens_start);
    }

    tracing::debug!(
        kind = ?kind,
        states = builder.atn.states.len(),
        decisions = builder.atn.decisions.len(),
        "built automaton"
    );
    builder.atn
}

impl Builder<'_> {
    fn rule(&mut self, rule: &mut Rule) {
        self.current_rule = rule.index;
        let start = self.atn.rule_start[rule.index];
        let stop = self.atn.rule_stop[rule.index];
        let body = self.block(&mut rule.alts);
        self.epsilon(start, body.left);
        self.epsilon(body.right, stop);
    }

    fn new_state(&mut self, kind: StateKind) -> StateId {
        self.atn.add_state(kind, self.current_rule)
    }

    fn epsilon(&mut self, from: StateId, to: StateId) {
        self.atn
            .add_transition(from, Transition::Epsilon { target: to });
    }

    /// A plain block: one alternative needs no decision
    fn block(&mut self, alts: &mut [Alternative]) -> Handle {
        if alts.len() == 1 {
            return self.alternative(&mut alts[0]);
        }
        let start = self.new_state(StateKind::BlockStart);
        self.atn.define_decision(start);
        self.make_block(start, alts)
    }

    fn make_block(&mut self, start: StateId, alts: &mut [Alternative]) -> Handle {
        let end = self.new_state(StateKind::BlockEnd);
        for alt in alts {
            let handle = self.alternative(alt);
            self.epsilon(start, handle.left);
            self.epsilon(handle.right, end);
        }
        Handle { left: start, right: end }
    }

    fn alternative(&mut self, alt: &mut Alternative) -> Handle {
        let mut handles: Vec<Handle> = alt
            .elements
            .iter_mut()
            .map(|element| self.element(element))
            .collect();

        for &action in &alt.lexer_actions {
            let index = self.atn.lexer_actions.len();
            self.atn.lexer_actions.push(action);
            let left = self.new_state(StateKind::Basic);
            let right = self.new_state(StateKind::Basic);
            self.atn.add_transition(
                left,
                Transition::Action {
                    target: right,
                    lexer_action: Some(index),
                },
            );
            handles.push(Handle { left, right });
        }

        let Some(first) = handles.first().copied() else {
            return self.empty();
        };
        let mut last = first;
        for handle in handles.into_iter().skip(1) {
            self.epsilon(last.right, handle.left);
            last = handle;
        }
        Handle {
            left: first.left,
            right: last.right,
        }
    }

    fn empty(&mut self) -> Handle {
        let left = self.new_state(StateKind::Basic);
        let right = self.new_state(StateKind::Basic);
        self.epsilon(left, right);
        Handle { left, right }
    }

    /// Two basic states joined by one transition built from the right state
    fn single(&mut self, transition: impl FnOnce(StateId) -> Transition) -> Handle {
        let left = self.new_state(StateKind::Basic);
        let right = self.new_state(StateKind::Basic);
        self.atn.add_transition(left, transition(right));
        Handle { left, right }
    }

    fn element(&mut self, element: &mut Element) -> Handle {
        let range = element.range;
        let handle = match &mut element.kind {
            ElementKind::StringLiteral { raw, chars } => {
                if self.atn.kind == AtnKind::Lexer {
                    let chars = chars.clone();
                    self.char_chain(&chars)
                } else {
                    let label = self.vocabulary.literal_type(raw).unwrap_or(0);
                    self.single(|target| Transition::Atom { target, label })
                }
            }
            ElementKind::TokenRef { name } => {
                let label = self.vocabulary.token_type(name).unwrap_or(0);
                self.single(|target| Transition::Atom { target, label })
            }
            ElementKind::RuleRef { name, precedence } => {
                let precedence = *precedence;
                match self.rule_index.get(name.as_str()).copied() {
                    Some(rule) => {
                        let rule_start = self.atn.rule_start[rule];
                        self.single(|follow| Transition::Rule {
                            target: rule_start,
                            rule,
                            follow,
                            precedence,
                        })
                    }
                    None => {
                        tracing::warn!(rule = %name, "reference to unknown rule left unresolved");
                        self.empty()
                    }
                }
            }
            ElementKind::Set { members, negated } => {
                let set = self.member_set(members);
                if *negated {
                    self.single(|target| Transition::NotSet { target, set })
                } else {
                    self.single(|target| Transition::Set { target, set })
                }
            }
            ElementKind::CharSet { set } => {
                let set = set.clone();
                self.single(|target| Transition::Set { target, set })
            }
            ElementKind::Range { from, to } => {
                let (from, to) = (*from as i32, *to as i32);
                self.single(|target| Transition::Range { target, from, to })
            }
            ElementKind::Wildcard => self.single(|target| Transition::Wildcard { target }),
            ElementKind::Predicate => {
                let rule = self.current_rule;
                self.single(|target| Transition::Predicate { target, rule })
            }
            ElementKind::Action => self.single(|target| Transition::Action {
                target,
                lexer_action: None,
            }),
            ElementKind::PrecedencePredicate { precedence } => {
                let precedence = *precedence;
                self.single(|target| Transition::Precedence { target, precedence })
            }
            ElementKind::Block { alts } => self.block(alts),
            ElementKind::Optional { alts, greedy } => {
                let greedy = *greedy;
                let start = self.new_state(StateKind::BlockStart);
                self.atn.define_decision(start);
                let block = self.make_block(start, alts);
                let state = self.atn.state_mut(start);
                state.non_greedy = !greedy;
                let bypass = Transition::Epsilon {
                    target: block.right,
                };
                if greedy {
                    state.transitions.push(bypass);
                } else {
                    state.transitions.insert(0, bypass);
                }
                block
            }
            ElementKind::Star {
                alts,
                greedy,
                precedence_loop,
            } => {
                let (greedy, precedence_loop) = (*greedy, *precedence_loop);
                let start = self.new_state(StateKind::BlockStart);
                if alts.len() > 1 {
                    self.atn.define_decision(start);
                }
                let block = self.make_block(start, alts);
                self.star(block, greedy, precedence_loop)
            }
            ElementKind::Plus { alts, greedy } => {
                let greedy = *greedy;
                let start = self.new_state(StateKind::PlusBlockStart);
                if alts.len() > 1 {
                    self.atn.define_decision(start);
                }
                let block = self.make_block(start, alts);
                self.plus(block, greedy)
            }
        };

        if element.is_terminal() {
            element.atn_state = Some(handle.left);
            self.atn.state_mut(handle.left).terminal = Some(range);
        }
        handle
    }

    fn star(&mut self, block: Handle, greedy: bool, precedence_loop: bool) -> Handle {
        let entry = self.new_state(StateKind::StarLoopEntry);
        self.atn.define_decision(entry);
        let end = self.new_state(StateKind::LoopEnd);
        let loop_back = self.new_state(StateKind::StarLoopBack);
        {
            let state = self.atn.state_mut(entry);
            state.non_greedy = !greedy;
            state.precedence_decision = precedence_loop;
        }
        if greedy {
            self.epsilon(entry, block.left);
            self.epsilon(entry, end);
        } else {
            self.epsilon(entry, end);
            self.epsilon(entry, block.left);
        }
        self.epsilon(block.right, loop_back);
        self.epsilon(loop_back, entry);
        Handle {
            left: entry,
            right: end,
        }
    }

    fn plus(&mut self, block: Handle, greedy: bool) -> Handle {
        let loop_back = self.new_state(StateKind::PlusLoopBack);
        self.atn.define_decision(loop_back);
        self.atn.state_mut(loop_back).non_greedy = !greedy;
        let end = self.new_state(StateKind::LoopEnd);
        self.epsilon(block.right, loop_back);
        if greedy {
            self.epsilon(loop_back, block.left);
            self.epsilon(loop_back, end);
        } else {
            self.epsilon(loop_back, end);
            self.epsilon(loop_back, block.left);
        }
        Handle {
            left: block.left,
            right: end,
        }
    }

    /// One atom per character
    fn char_chain(&mut self, chars: &[u32]) -> Handle {
        let left = self.new_state(StateKind::Basic);
        let mut current = left;
        for &c in chars {
            let next = self.new_state(StateKind::Basic);
            self.atn.add_transition(
                current,
                Transition::Atom {
                    target: next,
                    label: c as i32,
                },
            );
            current = next;
        }
        if current == left {
            let right = self.new_state(StateKind::Basic);
            self.epsilon(left, right);
            current = right;
        }
        Handle {
            left,
            right: current,
        }
    }

    fn member_set(&self, members: &[Element]) -> IntervalSet {
        let lexer = self.atn.kind == AtnKind::Lexer;
        let mut set = IntervalSet::new();
        for member in members {
            match &member.kind {
                ElementKind::StringLiteral { chars, .. } if lexer => {
                    if let [c] = chars.as_slice() {
                        set.add(*c as i32);
                    }
                }
                ElementKind::StringLiteral { raw, .. } => {
                    if let Some(ty) = self.vocabulary.literal_type(raw) {
                        set.add(ty);
                    }
                }
                ElementKind::TokenRef { name } => {
                    if let Some(ty) = self.vocabulary.token_type(name) {
                        set.add(ty);
                    }
                }
                ElementKind::Range { from, to } => set.add_range(*from as i32, *to as i32),
                ElementKind::CharSet { set: chars } => set.add_all(chars),
                _ => {}
            }
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use text_size::{TextRange, TextSize};

    fn range(start: u32, end: u32) -> TextRange {
        TextRange::new(TextSize::new(start), TextSize::new(end))
    }

    fn el(kind: ElementKind, at: u32) -> Element {
        Element::new(kind, range(at, at + 1))
    }

    fn token(name: &str, at: u32) -> Element {
        el(
            ElementKind::TokenRef {
                name: SmolStr::new(name),
            },
            at,
        )
    }

    fn parser_rule(index: usize, name: &str, alts: Vec<Alternative>) -> Rule {
        Rule {
            index,
            name: SmolStr::new(name),
            is_lexer: false,
            fragment: false,
            range: TextRange::default(),
            name_range: TextRange::default(),
            alts,
            precedence_rule: false,
        }
    }

    fn table(rules: Vec<Rule>) -> IndexMap<SmolStr, Rule> {
        rules.into_iter().map(|r| (r.name.clone(), r)).collect()
    }

    fn vocabulary() -> Vocabulary {
        let mut vocab = Vocabulary::new();
        vocab.define_token("A");
        vocab.define_token("B");
        vocab
    }

    #[test]
    fn test_terminals_record_match_state() {
        let mut rules = table(vec![parser_rule(
            0,
            "s",
            vec![Alternative::new(
                vec![token("A", 0), token("B", 2)],
                TextRange::default(),
            )],
        )]);
        let atn = build(AtnKind::Parser, &mut rules, &vocabulary());
        let s = &rules["s"];
        let a = s.alts[0].elements[0].atn_state.unwrap();
        let b = s.alts[0].elements[1].atn_state.unwrap();
        assert_eq!(atn.state(a).terminal, Some(range(0, 1)));
        assert_eq!(
            atn.state(a).transitions,
            vec![Transition::Atom {
                target: StateId::new(a.index() + 1),
                label: 1
            }]
        );
        assert!(matches!(atn.state(b).transitions[0], Transition::Atom { label: 2, .. }));
        assert_eq!(atn.next_tokens(atn.rule_start[0]), IntervalSet::of(1));
    }

    #[test]
    fn test_star_loop_shape() {
        let star = el(
            ElementKind::Star {
                alts: vec![Alternative::new(vec![token("A", 0)], TextRange::default())],
                greedy: true,
                precedence_loop: false,
            },
            0,
        );
        let mut rules = table(vec![parser_rule(
            0,
            "s",
            vec![Alternative::new(vec![star, token("B", 3)], TextRange::default())],
        )]);
        let atn = build(AtnKind::Parser, &mut rules, &vocabulary());
        let entry = atn
            .states
            .iter()
            .find(|s| s.kind == StateKind::StarLoopEntry)
            .unwrap();
        assert!(entry.is_decision());
        assert_eq!(entry.transitions.len(), 2);
        assert_eq!(
            atn.state(entry.transitions[1].target()).kind,
            StateKind::LoopEnd
        );
        // A* B can start with either token
        let first = atn.next_tokens(atn.rule_start[0]);
        assert!(first.contains(1) && first.contains(2));
    }

    #[test]
    fn test_set_members_have_no_state() {
        let set = el(
            ElementKind::Set {
                members: vec![token("A", 1), token("B", 3)],
                negated: false,
            },
            0,
        );
        let mut rules = table(vec![parser_rule(
            0,
            "s",
            vec![Alternative::new(vec![set], TextRange::default())],
        )]);
        let atn = build(AtnKind::Parser, &mut rules, &vocabulary());
        let set = &rules["s"].alts[0].elements[0];
        assert!(set.atn_state.is_some());
        assert!(set.children().all(|m| m.atn_state.is_none()));
        let state = atn.state(set.atn_state.unwrap());
        assert!(matches!(&state.transitions[0], Transition::Set { set, .. } if set.size() == 2));
    }

    #[test]
    fn test_lexer_tokens_start_skips_fragments() {
        let mut vocab = Vocabulary::new();
        vocab.define_token("ID");
        let lit = |c: char| {
            el(
                ElementKind::StringLiteral {
                    raw: SmolStr::new(format!("'{c}'")),
                    chars: vec![c as u32],
                },
                0,
            )
        };
        let mut id = parser_rule(
            0,
            "ID",
            vec![Alternative::new(
                vec![el(
                    ElementKind::RuleRef {
                        name: SmolStr::new("LETTER"),
                        precedence: 0,
                    },
                    0,
                )],
                TextRange::default(),
            )],
        );
        id.is_lexer = true;
        let mut letter = parser_rule(1, "LETTER", vec![Alternative::new(vec![lit('a')], TextRange::default())]);
        letter.is_lexer = true;
        letter.fragment = true;
        let mut rules = table(vec![id, letter]);
        let atn = build(AtnKind::Lexer, &mut rules, &vocab);
        let tokens_start = atn.state(atn.tokens_start.unwrap());
        assert_eq!(tokens_start.transitions.len(), 1);
        assert_eq!(atn.rule_token_type, vec![1, 0]);
        assert_eq!(atn.next_tokens(atn.rule_start[0]), IntervalSet::of('a' as i32));
    }
}
