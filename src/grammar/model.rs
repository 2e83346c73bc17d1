//! Compiled grammar model: rules, alternatives and elements.
//!
//! This is the tree the automaton builder walks. Every element keeps the
//! grammar-source range it was declared at, and terminal elements receive
//! the automaton state that matches them once the automaton is built.

use smol_str::SmolStr;
use text_size::TextRange;

use crate::atn::{IntervalSet, LexerAction, StateId};

/// Declared type of a grammar file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GrammarKind {
    Lexer,
    Parser,
    Combined,
}

impl GrammarKind {
    pub fn as_str(self) -> &'static str {
        match self {
            GrammarKind::Lexer => "lexer",
            GrammarKind::Parser => "parser",
            GrammarKind::Combined => "combined",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Assoc {
    #[default]
    Left,
    Right,
}

/// A raw `-> name(arg)` lexer command as written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub name: SmolStr,
    pub arg: Option<SmolStr>,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub index: usize,
    pub name: SmolStr,
    pub is_lexer: bool,
    pub fragment: bool,
    /// Range of the whole rule declaration
    pub range: TextRange,
    /// Range of the rule's name token
    pub name_range: TextRange,
    pub alts: Vec<Alternative>,
    /// Set once direct left recursion has been rewritten
    pub precedence_rule: bool,
}

impl Rule {
    /// All elements of the rule, depth first
    pub fn elements(&self) -> impl Iterator<Item = &Element> + '_ {
        let mut stack: Vec<&Element> = self
            .alts
            .iter()
            .rev()
            .flat_map(|alt| alt.elements.iter().rev())
            .collect();
        std::iter::from_fn(move || {
            let element = stack.pop()?;
            stack.extend(element.children().rev());
            Some(element)
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alternative {
    pub elements: Vec<Element>,
    pub range: TextRange,
    pub assoc: Assoc,
    pub commands: Vec<CommandSpec>,
    /// Resolved commands, filled in for lexer rules by the compiler
    pub lexer_actions: Vec<LexerAction>,
}

impl Alternative {
    pub fn new(elements: Vec<Element>, range: TextRange) -> Self {
        Self {
            elements,
            range,
            assoc: Assoc::Left,
            commands: Vec::new(),
            lexer_actions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub kind: ElementKind,
    pub range: TextRange,
    /// State whose outgoing transition matches this terminal
    pub atn_state: Option<StateId>,
}

impl Element {
    pub fn new(kind: ElementKind, range: TextRange) -> Self {
        Self {
            kind,
            range,
            atn_state: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.kind,
            ElementKind::StringLiteral { .. } | ElementKind::TokenRef { .. } | ElementKind::Set { .. }
        )
    }

    /// Nested elements, including set members
    pub fn children(&self) -> impl DoubleEndedIterator<Item = &Element> + '_ {
        let (alts, members): (&[Alternative], &[Element]) = match &self.kind {
            ElementKind::Block { alts }
            | ElementKind::Optional { alts, .. }
            | ElementKind::Star { alts, .. }
            | ElementKind::Plus { alts, .. } => (alts.as_slice(), &[]),
            ElementKind::Set { members, .. } => (&[], members.as_slice()),
            _ => (&[], &[]),
        };
        alts.iter()
            .flat_map(|alt| alt.elements.iter())
            .chain(members.iter())
    }

    pub fn children_mut(&mut self) -> Vec<&mut Element> {
        match &mut self.kind {
            ElementKind::Block { alts }
            | ElementKind::Optional { alts, .. }
            | ElementKind::Star { alts, .. }
            | ElementKind::Plus { alts, .. } => alts
                .iter_mut()
                .flat_map(|alt| alt.elements.iter_mut())
                .collect(),
            ElementKind::Set { members, .. } => members.iter_mut().collect(),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementKind {
    /// `'abc'`: `raw` keeps the quotes, `chars` holds the unescaped code points
    StringLiteral { raw: SmolStr, chars: Vec<u32> },
    TokenRef { name: SmolStr },
    /// Rule call; in lexer rules this is a reference to another lexer rule
    RuleRef { name: SmolStr, precedence: u32 },
    /// Alternatives of single terminals collapsed into one match
    Set { members: Vec<Element>, negated: bool },
    /// `[a-z]` lexer character set
    CharSet { set: IntervalSet },
    /// `'a'..'z'`
    Range { from: u32, to: u32 },
    Wildcard,
    Block { alts: Vec<Alternative> },
    Optional { alts: Vec<Alternative>, greedy: bool },
    Star {
        alts: Vec<Alternative>,
        greedy: bool,
        precedence_loop: bool,
    },
    Plus { alts: Vec<Alternative>, greedy: bool },
    Predicate,
    Action,
    PrecedencePredicate { precedence: u32 },
}
