//! Typed AST wrappers over the untyped rowan CST.
//!
//! This module provides strongly-typed accessors for grammar syntax nodes.
//! Each struct wraps a SyntaxNode and provides methods to access children.

use super::syntax_kind::SyntaxKind;
use super::{SyntaxNode, SyntaxToken};

/// Trait for AST nodes that wrap a SyntaxNode
pub trait AstNode: Sized {
    fn can_cast(kind: SyntaxKind) -> bool;
    fn cast(node: SyntaxNode) -> Option<Self>;
    fn syntax(&self) -> &SyntaxNode;
}

// ============================================================================
// Helper utilities
// ============================================================================

#[inline]
fn has_token(node: &SyntaxNode, kind: SyntaxKind) -> bool {
    node.children_with_tokens()
        .filter_map(|e| e.into_token())
        .any(|t| t.kind() == kind)
}

#[inline]
fn first_token(node: &SyntaxNode, pred: impl Fn(SyntaxKind) -> bool) -> Option<SyntaxToken> {
    node.children_with_tokens()
        .filter_map(|e| e.into_token())
        .find(|t| pred(t.kind()))
}

#[inline]
fn tokens(node: &SyntaxNode, pred: impl Fn(SyntaxKind) -> bool) -> impl Iterator<Item = SyntaxToken> {
    node.children_with_tokens()
        .filter_map(|e| e.into_token())
        .filter(move |t| pred(t.kind()))
}

#[inline]
fn child<N: AstNode>(node: &SyntaxNode) -> Option<N> {
    node.children().find_map(N::cast)
}

macro_rules! ast_node {
    ($name:ident, $kind:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $name(SyntaxNode);

        impl AstNode for $name {
            fn can_cast(kind: SyntaxKind) -> bool {
                kind == SyntaxKind::$kind
            }

            fn cast(node: SyntaxNode) -> Option<Self> {
                if Self::can_cast(node.kind()) {
                    Some(Self(node))
                } else {
                    None
                }
            }

            fn syntax(&self) -> &SyntaxNode {
                &self.0
            }
        }
    };
}

// ============================================================================
// Root
// ============================================================================

ast_node!(GrammarFile, GRAMMAR_FILE);

impl GrammarFile {
    pub fn decl(&self) -> Option<GrammarDecl> {
        child(&self.0)
    }

    pub fn options(&self) -> impl Iterator<Item = OptionsSpec> + '_ {
        self.0.children().filter_map(OptionsSpec::cast)
    }

    pub fn tokens_specs(&self) -> impl Iterator<Item = TokensSpec> + '_ {
        self.0.children().filter_map(TokensSpec::cast)
    }

    pub fn channels_specs(&self) -> impl Iterator<Item = ChannelsSpec> + '_ {
        self.0.children().filter_map(ChannelsSpec::cast)
    }

    pub fn imports(&self) -> impl Iterator<Item = ImportDecl> + '_ {
        self.0.children().filter_map(ImportDecl::cast)
    }

    pub fn modes(&self) -> impl Iterator<Item = ModeDecl> + '_ {
        self.0.children().filter_map(ModeDecl::cast)
    }

    /// Rules declared at the top level, in source order
    pub fn rules(&self) -> impl Iterator<Item = Rule> + '_ {
        self.0.children().filter_map(Rule::cast)
    }
}

// ============================================================================
// Prequel
// ============================================================================

ast_node!(GrammarDecl, GRAMMAR_DECL);

impl GrammarDecl {
    pub fn is_lexer(&self) -> bool {
        has_token(&self.0, SyntaxKind::LEXER_KW)
    }

    pub fn is_parser(&self) -> bool {
        has_token(&self.0, SyntaxKind::PARSER_KW)
    }

    pub fn name(&self) -> Option<SyntaxToken> {
        first_token(&self.0, SyntaxKind::is_ident)
    }
}

ast_node!(OptionsSpec, OPTIONS_SPEC);

impl OptionsSpec {
    pub fn options(&self) -> impl Iterator<Item = OptionNode> + '_ {
        self.0.children().filter_map(OptionNode::cast)
    }
}

ast_node!(OptionNode, OPTION);

impl OptionNode {
    pub fn name(&self) -> Option<SyntaxToken> {
        first_token(&self.0, SyntaxKind::is_ident)
    }

    /// Raw text of the value, e.g. `ExprLexer` or `'x'`
    pub fn value(&self) -> Option<String> {
        let text = self.0.text().to_string();
        let (_, value) = text.split_once('=')?;
        Some(value.trim().trim_end_matches(';').trim().to_string())
    }
}

ast_node!(TokensSpec, TOKENS_SPEC);

impl TokensSpec {
    pub fn names(&self) -> impl Iterator<Item = SyntaxToken> + '_ {
        tokens(&self.0, SyntaxKind::is_ident)
    }
}

ast_node!(ChannelsSpec, CHANNELS_SPEC);

impl ChannelsSpec {
    pub fn names(&self) -> impl Iterator<Item = SyntaxToken> + '_ {
        tokens(&self.0, SyntaxKind::is_ident)
    }
}

ast_node!(ImportDecl, IMPORT_DECL);
ast_node!(ModeDecl, MODE_DECL);

impl ModeDecl {
    pub fn name(&self) -> Option<SyntaxToken> {
        first_token(&self.0, SyntaxKind::is_ident)
    }

    pub fn rules(&self) -> impl Iterator<Item = LexerRule> + '_ {
        self.0.children().filter_map(LexerRule::cast)
    }
}

// ============================================================================
// Rules
// ============================================================================

/// A parser or lexer rule
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Rule {
    Parser(ParserRule),
    Lexer(LexerRule),
}

impl AstNode for Rule {
    fn can_cast(kind: SyntaxKind) -> bool {
        matches!(kind, SyntaxKind::PARSER_RULE | SyntaxKind::LEXER_RULE)
    }

    fn cast(node: SyntaxNode) -> Option<Self> {
        match node.kind() {
            SyntaxKind::PARSER_RULE => Some(Self::Parser(ParserRule(node))),
            SyntaxKind::LEXER_RULE => Some(Self::Lexer(LexerRule(node))),
            _ => None,
        }
    }

    fn syntax(&self) -> &SyntaxNode {
        match self {
            Self::Parser(n) => n.syntax(),
            Self::Lexer(n) => n.syntax(),
        }
    }
}

impl Rule {
    pub fn name(&self) -> Option<SyntaxToken> {
        match self {
            Self::Parser(r) => r.name(),
            Self::Lexer(r) => r.name(),
        }
    }

    pub fn alt_list(&self) -> Option<AltList> {
        child(self.syntax())
    }

    pub fn is_lexer(&self) -> bool {
        matches!(self, Self::Lexer(_))
    }
}

ast_node!(ParserRule, PARSER_RULE);

impl ParserRule {
    pub fn name(&self) -> Option<SyntaxToken> {
        first_token(&self.0, |k| k == SyntaxKind::RULE_REF)
    }
}

ast_node!(LexerRule, LEXER_RULE);

impl LexerRule {
    pub fn name(&self) -> Option<SyntaxToken> {
        first_token(&self.0, |k| k == SyntaxKind::TOKEN_REF)
    }

    pub fn is_fragment(&self) -> bool {
        has_token(&self.0, SyntaxKind::FRAGMENT_KW)
    }
}

// ============================================================================
// Alternatives
// ============================================================================

ast_node!(AltList, ALT_LIST);

impl AltList {
    pub fn alternatives(&self) -> impl Iterator<Item = Alternative> + '_ {
        self.0.children().filter_map(Alternative::cast)
    }
}

ast_node!(Alternative, ALTERNATIVE);

impl Alternative {
    pub fn elements(&self) -> impl Iterator<Item = Element> + '_ {
        self.0.children().filter_map(Element::cast)
    }

    pub fn element_options(&self) -> Option<ElementOptions> {
        child(&self.0)
    }

    pub fn lexer_commands(&self) -> Option<LexerCommands> {
        child(&self.0)
    }

    pub fn label(&self) -> Option<SyntaxToken> {
        let label = self.0.children().find(|n| n.kind() == SyntaxKind::ALT_LABEL)?;
        first_token(&label, SyntaxKind::is_ident)
    }
}

ast_node!(ElementOptions, ELEMENT_OPTIONS);

impl ElementOptions {
    /// `(name, value)` pairs; a bare option has no value
    pub fn options(&self) -> impl Iterator<Item = (String, Option<String>)> + '_ {
        self.0
            .children()
            .filter(|n| n.kind() == SyntaxKind::ELEMENT_OPTION)
            .filter_map(|opt| {
                let mut parts = opt
                    .children_with_tokens()
                    .filter_map(|e| e.into_token())
                    .filter(|t| !t.kind().is_trivia() && t.kind() != SyntaxKind::EQ);
                let name = parts.next()?.text().to_string();
                let value = parts.next().map(|t| t.text().to_string());
                Some((name, value))
            })
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.options()
            .find(|(n, _)| n == name)
            .and_then(|(_, v)| v)
    }
}

ast_node!(LexerCommands, LEXER_COMMANDS);

impl LexerCommands {
    pub fn commands(&self) -> impl Iterator<Item = LexerCommand> + '_ {
        self.0.children().filter_map(LexerCommand::cast)
    }
}

ast_node!(LexerCommand, LEXER_COMMAND);

impl LexerCommand {
    pub fn name(&self) -> Option<SyntaxToken> {
        first_token(&self.0, |k| k.is_ident() || k == SyntaxKind::MODE_KW)
    }

    /// Argument inside parentheses, e.g. `HIDDEN` in `channel(HIDDEN)`
    pub fn argument(&self) -> Option<SyntaxToken> {
        self.0
            .children_with_tokens()
            .filter_map(|e| e.into_token())
            .skip_while(|t| t.kind() != SyntaxKind::L_PAREN)
            .find(|t| t.kind().is_ident() || t.kind() == SyntaxKind::INT)
    }
}

// ============================================================================
// Elements
// ============================================================================

/// Any element that may appear in an alternative
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Element {
    Labeled(LabeledElement),
    Ebnf(Ebnf),
    Terminal(Terminal),
    RuleCall(RuleCall),
    Literal(Literal),
    CharRange(CharRange),
    CharSet(LexerCharSet),
    Wildcard(Wildcard),
    NotSet(NotSet),
    Block(Block),
    Action(Action),
    Predicate(Predicate),
}

impl AstNode for Element {
    fn can_cast(kind: SyntaxKind) -> bool {
        kind.is_element()
    }

    fn cast(node: SyntaxNode) -> Option<Self> {
        match node.kind() {
            SyntaxKind::LABELED_ELEMENT => Some(Self::Labeled(LabeledElement(node))),
            SyntaxKind::EBNF => Some(Self::Ebnf(Ebnf(node))),
            SyntaxKind::TERMINAL => Some(Self::Terminal(Terminal(node))),
            SyntaxKind::RULE_CALL => Some(Self::RuleCall(RuleCall(node))),
            SyntaxKind::LITERAL => Some(Self::Literal(Literal(node))),
            SyntaxKind::CHAR_RANGE => Some(Self::CharRange(CharRange(node))),
            SyntaxKind::LEXER_CHAR_SET => Some(Self::CharSet(LexerCharSet(node))),
            SyntaxKind::WILDCARD => Some(Self::Wildcard(Wildcard(node))),
            SyntaxKind::NOT_SET => Some(Self::NotSet(NotSet(node))),
            SyntaxKind::BLOCK => Some(Self::Block(Block(node))),
            SyntaxKind::ACTION => Some(Self::Action(Action(node))),
            SyntaxKind::PREDICATE => Some(Self::Predicate(Predicate(node))),
            _ => None,
        }
    }

    fn syntax(&self) -> &SyntaxNode {
        match self {
            Self::Labeled(n) => n.syntax(),
            Self::Ebnf(n) => n.syntax(),
            Self::Terminal(n) => n.syntax(),
            Self::RuleCall(n) => n.syntax(),
            Self::Literal(n) => n.syntax(),
            Self::CharRange(n) => n.syntax(),
            Self::CharSet(n) => n.syntax(),
            Self::Wildcard(n) => n.syntax(),
            Self::NotSet(n) => n.syntax(),
            Self::Block(n) => n.syntax(),
            Self::Action(n) => n.syntax(),
            Self::Predicate(n) => n.syntax(),
        }
    }
}

ast_node!(LabeledElement, LABELED_ELEMENT);

impl LabeledElement {
    pub fn label(&self) -> Option<SyntaxToken> {
        first_token(&self.0, SyntaxKind::is_ident)
    }

    pub fn element(&self) -> Option<Element> {
        child(&self.0)
    }
}

ast_node!(Ebnf, EBNF);

/// The operator of an ebnf suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EbnfOp {
    Optional,
    Star,
    Plus,
}

impl Ebnf {
    pub fn element(&self) -> Option<Element> {
        child(&self.0)
    }

    fn suffix(&self) -> Option<SyntaxNode> {
        self.0.children().find(|n| n.kind() == SyntaxKind::EBNF_SUFFIX)
    }

    pub fn op(&self) -> Option<EbnfOp> {
        let suffix = self.suffix()?;
        let token = first_token(&suffix, |k| {
            matches!(k, SyntaxKind::QUESTION | SyntaxKind::STAR | SyntaxKind::PLUS)
        })?;
        match token.kind() {
            SyntaxKind::QUESTION => Some(EbnfOp::Optional),
            SyntaxKind::STAR => Some(EbnfOp::Star),
            _ => Some(EbnfOp::Plus),
        }
    }

    /// `??`, `*?` and `+?` are non-greedy
    pub fn is_greedy(&self) -> bool {
        self.suffix()
            .map(|s| tokens(&s, |k| !k.is_trivia()).count() < 2)
            .unwrap_or(true)
    }
}

ast_node!(Terminal, TERMINAL);

impl Terminal {
    pub fn token(&self) -> Option<SyntaxToken> {
        first_token(&self.0, |k| k == SyntaxKind::TOKEN_REF)
    }

    pub fn element_options(&self) -> Option<ElementOptions> {
        child(&self.0)
    }
}

ast_node!(RuleCall, RULE_CALL);

impl RuleCall {
    pub fn token(&self) -> Option<SyntaxToken> {
        first_token(&self.0, |k| k == SyntaxKind::RULE_REF)
    }
}

ast_node!(Literal, LITERAL);

impl Literal {
    pub fn token(&self) -> Option<SyntaxToken> {
        first_token(&self.0, |k| k == SyntaxKind::STRING_LITERAL)
    }
}

ast_node!(CharRange, CHAR_RANGE);

impl CharRange {
    pub fn bounds(&self) -> Option<(SyntaxToken, SyntaxToken)> {
        let mut literals = tokens(&self.0, |k| k == SyntaxKind::STRING_LITERAL);
        Some((literals.next()?, literals.next()?))
    }
}

ast_node!(LexerCharSet, LEXER_CHAR_SET);

impl LexerCharSet {
    pub fn token(&self) -> Option<SyntaxToken> {
        first_token(&self.0, |k| k == SyntaxKind::CHAR_SET)
    }
}

ast_node!(Wildcard, WILDCARD);
ast_node!(NotSet, NOT_SET);

impl NotSet {
    pub fn element(&self) -> Option<Element> {
        child(&self.0)
    }
}

ast_node!(Block, BLOCK);

impl Block {
    pub fn alt_list(&self) -> Option<AltList> {
        child(&self.0)
    }
}

ast_node!(Action, ACTION);
ast_node!(Predicate, PREDICATE);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn file(src: &str) -> GrammarFile {
        let parse = parse(src);
        assert!(parse.ok(), "errors: {:?}", parse.errors);
        GrammarFile::cast(parse.syntax()).unwrap()
    }

    #[test]
    fn test_grammar_decl_kind_and_name() {
        let f = file("lexer grammar ExprLexer; A: 'a';");
        let decl = f.decl().unwrap();
        assert!(decl.is_lexer());
        assert!(!decl.is_parser());
        assert_eq!(decl.name().unwrap().text(), "ExprLexer");
    }

    #[test]
    fn test_rules_in_order() {
        let f = file("grammar G; s: A b; b: B; fragment D: [0-9]; A: 'a';");
        let names: Vec<_> = f
            .rules()
            .map(|r| r.name().unwrap().text().to_string())
            .collect();
        assert_eq!(names, vec!["s", "b", "D", "A"]);
        let Rule::Lexer(d) = f.rules().nth(2).unwrap() else {
            panic!("expected lexer rule");
        };
        assert!(d.is_fragment());
    }

    #[test]
    fn test_alternative_contents() {
        let f = file("grammar G; e: <assoc=right> e '^' e # Pow | INT;");
        let rule = f.rules().next().unwrap();
        let alts: Vec<_> = rule.alt_list().unwrap().alternatives().collect();
        assert_eq!(alts.len(), 2);
        assert_eq!(alts[0].elements().count(), 3);
        assert_eq!(alts[0].label().unwrap().text(), "Pow");
        assert_eq!(
            alts[0].element_options().unwrap().get("assoc").as_deref(),
            Some("right")
        );
    }

    #[test]
    fn test_ebnf_suffix() {
        let f = file("grammar G; s: A* B+? C?;");
        let rule = f.rules().next().unwrap();
        let alt = rule.alt_list().unwrap().alternatives().next().unwrap();
        let ops: Vec<_> = alt
            .elements()
            .filter_map(|e| match e {
                Element::Ebnf(e) => Some((e.op().unwrap(), e.is_greedy())),
                _ => None,
            })
            .collect();
        assert_eq!(
            ops,
            vec![
                (EbnfOp::Star, true),
                (EbnfOp::Plus, false),
                (EbnfOp::Optional, true)
            ]
        );
    }

    #[test]
    fn test_lexer_commands() {
        let f = file("lexer grammar L; WS: ' ' -> channel(HIDDEN), type(X);");
        let rule = f.rules().next().unwrap();
        let alt = rule.alt_list().unwrap().alternatives().next().unwrap();
        let commands: Vec<_> = alt.lexer_commands().unwrap().commands().collect();
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0].name().unwrap().text(), "channel");
        assert_eq!(commands[0].argument().unwrap().text(), "HIDDEN");
        assert_eq!(commands[1].argument().unwrap().text(), "X");
    }

    #[test]
    fn test_option_value() {
        let f = file("parser grammar P; options { tokenVocab = PLexer; } s: A;");
        let opt = f.options().next().unwrap().options().next().unwrap();
        assert_eq!(opt.name().unwrap().text(), "tokenVocab");
        assert_eq!(opt.value().as_deref(), Some("PLexer"));
    }
}
