//! Recursive descent parser for ANTLR v4 grammar files
//!
//! Builds a rowan GreenNode tree from tokens.
//! Supports error recovery and produces a lossless CST.

use super::lexer::{Lexer, Token};
use super::syntax_kind::SyntaxKind;
use rowan::{GreenNode, GreenNodeBuilder, TextRange, TextSize};

/// Parse result containing the green tree and any errors
#[derive(Debug, Clone)]
pub struct Parse {
    pub green: GreenNode,
    pub errors: Vec<ParseError>,
}

impl Parse {
    /// Get the root syntax node
    pub fn syntax(&self) -> super::SyntaxNode {
        super::SyntaxNode::new_root(self.green.clone())
    }

    /// Check if parsing succeeded without errors
    pub fn ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A grammar syntax error with location and message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub range: TextRange,
}

impl ParseError {
    pub fn new(message: impl Into<String>, range: TextRange) -> Self {
        Self {
            message: message.into(),
            range,
        }
    }
}

/// Parse `.g4` source text into a CST
pub fn parse(input: &str) -> Parse {
    let tokens: Vec<_> = Lexer::new(input).collect();
    let mut parser = Parser::new(&tokens, input.len());
    parser.parse_grammar_file();
    parser.finish()
}

/// Tokens that can begin an element inside an alternative
const ELEMENT_START: &[SyntaxKind] = &[
    SyntaxKind::TOKEN_REF,
    SyntaxKind::RULE_REF,
    SyntaxKind::STRING_LITERAL,
    SyntaxKind::CHAR_SET,
    SyntaxKind::DOT,
    SyntaxKind::TILDE,
    SyntaxKind::L_PAREN,
    SyntaxKind::L_BRACE,
];

/// Tokens that end an alternative
const ALT_END: &[SyntaxKind] = &[
    SyntaxKind::PIPE,
    SyntaxKind::R_PAREN,
    SyntaxKind::SEMICOLON,
    SyntaxKind::HASH,
    SyntaxKind::ARROW,
    SyntaxKind::EOF,
];

/// The parser state
struct Parser<'a> {
    tokens: &'a [Token<'a>],
    pos: usize,
    len: usize,
    builder: GreenNodeBuilder<'static>,
    errors: Vec<ParseError>,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token<'a>], len: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            len,
            builder: GreenNodeBuilder::new(),
            errors: Vec::new(),
        }
    }

    fn finish(self) -> Parse {
        Parse {
            green: self.builder.finish(),
            errors: self.errors,
        }
    }

    // =========================================================================
    // Token inspection (trivia is transparent)
    // =========================================================================

    fn nth_token(&self, n: usize) -> Option<&Token<'a>> {
        self.tokens[self.pos.min(self.tokens.len())..]
            .iter()
            .filter(|t| !t.kind.is_trivia())
            .nth(n)
    }

    fn nth(&self, n: usize) -> SyntaxKind {
        self.nth_token(n).map(|t| t.kind).unwrap_or(SyntaxKind::EOF)
    }

    fn current_kind(&self) -> SyntaxKind {
        self.nth(0)
    }

    fn at(&self, kind: SyntaxKind) -> bool {
        self.current_kind() == kind
    }

    fn at_any(&self, kinds: &[SyntaxKind]) -> bool {
        kinds.contains(&self.current_kind())
    }

    fn at_eof(&self) -> bool {
        self.at(SyntaxKind::EOF)
    }

    fn at_ident(&self) -> bool {
        self.current_kind().is_ident()
    }

    // =========================================================================
    // Token consumption
    // =========================================================================

    /// Attach pending trivia to the currently open node
    fn skip_trivia(&mut self) {
        while let Some(token) = self.tokens.get(self.pos) {
            if !token.kind.is_trivia() {
                break;
            }
            self.builder.token(token.kind.into(), token.text);
            self.pos += 1;
        }
    }

    fn bump(&mut self) {
        self.skip_trivia();
        if let Some(token) = self.tokens.get(self.pos) {
            self.builder.token(token.kind.into(), token.text);
            self.pos += 1;
        }
    }

    fn eat(&mut self, kind: SyntaxKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: SyntaxKind, what: &str) -> bool {
        if self.eat(kind) {
            true
        } else {
            self.error(format!("expected {what}"));
            false
        }
    }

    fn expect_ident(&mut self) -> bool {
        if self.at_ident() {
            self.bump();
            true
        } else {
            self.error("expected identifier");
            false
        }
    }

    // =========================================================================
    // Error handling
    // =========================================================================

    fn error(&mut self, message: impl Into<String>) {
        let range = self
            .nth_token(0)
            .map(|t| TextRange::at(t.offset, TextSize::of(t.text)))
            .unwrap_or_else(|| TextRange::empty(TextSize::new(self.len as u32)));
        self.errors.push(ParseError::new(message, range));
    }

    fn error_recover(&mut self, message: impl Into<String>, recovery: &[SyntaxKind]) {
        self.error(message);
        self.start_node(SyntaxKind::ERROR);
        let mut consumed = false;
        while !self.at_eof() && !self.at_any(recovery) {
            self.bump();
            consumed = true;
        }
        // Always make progress
        if !consumed && !self.at_eof() {
            self.bump();
        }
        self.finish_node();
    }

    // =========================================================================
    // Node building helpers
    // =========================================================================

    fn start_node(&mut self, kind: SyntaxKind) {
        self.skip_trivia();
        self.builder.start_node(kind.into());
    }

    fn finish_node(&mut self) {
        self.builder.finish_node();
    }

    fn checkpoint(&mut self) -> rowan::Checkpoint {
        self.skip_trivia();
        self.builder.checkpoint()
    }

    fn start_node_at(&mut self, checkpoint: rowan::Checkpoint, kind: SyntaxKind) {
        self.builder.start_node_at(checkpoint, kind.into());
    }

    // =========================================================================
    // Grammar file structure
    // =========================================================================

    /// GrammarFile = GrammarDecl Prequel* (Rule | ModeDecl)*
    fn parse_grammar_file(&mut self) {
        self.builder.start_node(SyntaxKind::GRAMMAR_FILE.into());

        if self.at_any(&[
            SyntaxKind::LEXER_KW,
            SyntaxKind::PARSER_KW,
            SyntaxKind::GRAMMAR_KW,
        ]) {
            self.parse_grammar_decl();
        } else {
            self.error("expected grammar declaration");
        }

        while !self.at_eof() {
            let pos_before = self.pos;
            match self.current_kind() {
                SyntaxKind::OPTIONS_KW => self.parse_options_spec(),
                SyntaxKind::TOKENS_KW => self.parse_id_list_spec(SyntaxKind::TOKENS_SPEC),
                SyntaxKind::CHANNELS_KW => self.parse_id_list_spec(SyntaxKind::CHANNELS_SPEC),
                SyntaxKind::IMPORT_KW => self.parse_import(),
                SyntaxKind::AT => self.parse_named_action(),
                SyntaxKind::MODE_KW => self.parse_mode(),
                SyntaxKind::TOKEN_REF | SyntaxKind::FRAGMENT_KW => self.parse_lexer_rule(),
                SyntaxKind::RULE_REF => self.parse_parser_rule(),
                kind => {
                    self.error_recover(
                        format!("unexpected {} at top level", describe(kind)),
                        &[SyntaxKind::SEMICOLON],
                    );
                    self.eat(SyntaxKind::SEMICOLON);
                }
            }
            if self.pos == pos_before && !self.at_eof() {
                self.error(format!("stuck on token: {:?}", self.current_kind()));
                self.bump();
            }
        }

        // Trailing trivia
        self.skip_trivia();
        self.finish_node();
    }

    /// GrammarDecl = ('lexer' | 'parser')? 'grammar' Ident ';'
    fn parse_grammar_decl(&mut self) {
        self.start_node(SyntaxKind::GRAMMAR_DECL);
        if !self.eat(SyntaxKind::LEXER_KW) {
            self.eat(SyntaxKind::PARSER_KW);
        }
        self.expect(SyntaxKind::GRAMMAR_KW, "'grammar'");
        self.expect_ident();
        self.expect(SyntaxKind::SEMICOLON, "';'");
        self.finish_node();
    }

    /// OptionsSpec = 'options' '{' (Option ';')* '}'
    fn parse_options_spec(&mut self) {
        self.start_node(SyntaxKind::OPTIONS_SPEC);
        self.bump();
        if self.expect(SyntaxKind::L_BRACE, "'{'") {
            while !self.at_eof() && !self.at(SyntaxKind::R_BRACE) {
                if self.at_ident() {
                    self.parse_option();
                } else {
                    self.error_recover(
                        "expected option name",
                        &[SyntaxKind::SEMICOLON, SyntaxKind::R_BRACE],
                    );
                    self.eat(SyntaxKind::SEMICOLON);
                }
            }
            self.expect(SyntaxKind::R_BRACE, "'}'");
        }
        self.finish_node();
    }

    /// Option = Ident '=' OptionValue ';'
    fn parse_option(&mut self) {
        self.start_node(SyntaxKind::OPTION);
        self.bump();
        if self.expect(SyntaxKind::EQ, "'='") {
            match self.current_kind() {
                SyntaxKind::STRING_LITERAL | SyntaxKind::INT => self.bump(),
                SyntaxKind::L_BRACE => self.parse_action_block(),
                _ if self.at_ident() => {
                    self.bump();
                    while self.at(SyntaxKind::DOT) && self.nth(1).is_ident() {
                        self.bump();
                        self.bump();
                    }
                }
                _ => self.error("expected option value"),
            }
        }
        if !self.eat(SyntaxKind::SEMICOLON) {
            self.error_recover("expected ';'", &[SyntaxKind::SEMICOLON, SyntaxKind::R_BRACE]);
            self.eat(SyntaxKind::SEMICOLON);
        }
        self.finish_node();
    }

    /// TokensSpec / ChannelsSpec = kw '{' (Ident (',' Ident)* ','?)? '}'
    fn parse_id_list_spec(&mut self, kind: SyntaxKind) {
        self.start_node(kind);
        self.bump();
        if self.expect(SyntaxKind::L_BRACE, "'{'") {
            while self.at_ident() {
                self.bump();
                if !self.eat(SyntaxKind::COMMA) {
                    break;
                }
            }
            if !self.eat(SyntaxKind::R_BRACE) {
                self.error_recover("expected '}'", &[SyntaxKind::R_BRACE]);
                self.eat(SyntaxKind::R_BRACE);
            }
        }
        self.finish_node();
    }

    /// Import = 'import' Ident ('=' Ident)? (',' Ident ('=' Ident)?)* ';'
    fn parse_import(&mut self) {
        self.start_node(SyntaxKind::IMPORT_DECL);
        self.bump();
        loop {
            if !self.expect_ident() {
                break;
            }
            if self.eat(SyntaxKind::EQ) {
                self.expect_ident();
            }
            if !self.eat(SyntaxKind::COMMA) {
                break;
            }
        }
        self.expect(SyntaxKind::SEMICOLON, "';'");
        self.finish_node();
    }

    /// NamedAction = '@' (Ident '::')? Ident ActionBlock
    fn parse_named_action(&mut self) {
        self.start_node(SyntaxKind::NAMED_ACTION);
        self.bump();
        if self.at_any(&[SyntaxKind::LEXER_KW, SyntaxKind::PARSER_KW]) || self.at_ident() {
            self.bump();
        } else {
            self.error("expected action scope or name");
        }
        if self.eat(SyntaxKind::COLON_COLON) {
            self.expect_ident();
        }
        if self.at(SyntaxKind::L_BRACE) {
            self.parse_action_block();
        } else {
            self.error("expected action block");
        }
        self.finish_node();
    }

    /// ActionBlock = '{' balanced-tokens '}'
    fn parse_action_block(&mut self) {
        self.start_node(SyntaxKind::ACTION);
        self.bump();
        let mut depth = 1usize;
        while depth > 0 {
            match self.current_kind() {
                SyntaxKind::EOF => {
                    self.error("unterminated action block");
                    break;
                }
                SyntaxKind::L_BRACE => depth += 1,
                SyntaxKind::R_BRACE => depth -= 1,
                _ => {}
            }
            self.bump();
        }
        self.finish_node();
    }

    /// ModeDecl = 'mode' Ident ';' LexerRule*
    fn parse_mode(&mut self) {
        self.start_node(SyntaxKind::MODE_DECL);
        self.bump();
        self.expect_ident();
        self.expect(SyntaxKind::SEMICOLON, "';'");
        while self.at_any(&[SyntaxKind::TOKEN_REF, SyntaxKind::FRAGMENT_KW]) {
            self.parse_lexer_rule();
        }
        self.finish_node();
    }

    // =========================================================================
    // Rules
    // =========================================================================

    /// ParserRule = RULE_REF RulePrequel? ':' AltList ';' ExceptionHandler*
    fn parse_parser_rule(&mut self) {
        self.start_node(SyntaxKind::PARSER_RULE);
        self.bump();

        if self.at_any(&[
            SyntaxKind::CHAR_SET,
            SyntaxKind::RETURNS_KW,
            SyntaxKind::LOCALS_KW,
            SyntaxKind::THROWS_KW,
            SyntaxKind::OPTIONS_KW,
            SyntaxKind::AT,
        ]) {
            self.parse_rule_prequel();
        }

        self.parse_rule_body();

        while self.at_any(&[SyntaxKind::CATCH_KW, SyntaxKind::FINALLY_KW]) {
            self.start_node(SyntaxKind::EXCEPTION_HANDLER);
            self.bump();
            self.eat(SyntaxKind::CHAR_SET);
            if self.at(SyntaxKind::L_BRACE) {
                self.parse_action_block();
            } else {
                self.error("expected action block");
            }
            self.finish_node();
        }
        self.finish_node();
    }

    /// RulePrequel = ArgBlock? ('returns' ArgBlock)? ('throws' Ident (',' Ident)*)?
    ///               ('locals' ArgBlock)? (OptionsSpec | '@' Ident ActionBlock)*
    fn parse_rule_prequel(&mut self) {
        self.start_node(SyntaxKind::RULE_PREQUEL);
        loop {
            match self.current_kind() {
                SyntaxKind::CHAR_SET => self.bump(),
                SyntaxKind::RETURNS_KW | SyntaxKind::LOCALS_KW => {
                    self.bump();
                    self.expect(SyntaxKind::CHAR_SET, "argument block");
                }
                SyntaxKind::THROWS_KW => {
                    self.bump();
                    self.expect_ident();
                    while self.eat(SyntaxKind::COMMA) {
                        self.expect_ident();
                    }
                }
                SyntaxKind::OPTIONS_KW => self.parse_options_spec(),
                SyntaxKind::AT => self.parse_named_action(),
                _ => break,
            }
        }
        self.finish_node();
    }

    /// LexerRule = 'fragment'? TOKEN_REF OptionsSpec? ':' AltList ';'
    fn parse_lexer_rule(&mut self) {
        self.start_node(SyntaxKind::LEXER_RULE);
        self.eat(SyntaxKind::FRAGMENT_KW);
        if !self.eat(SyntaxKind::TOKEN_REF) {
            self.error("expected lexer rule name");
        }
        if self.at(SyntaxKind::OPTIONS_KW) {
            self.parse_options_spec();
        }
        self.parse_rule_body();
        self.finish_node();
    }

    /// ':' AltList ';' shared by both rule flavors
    fn parse_rule_body(&mut self) {
        if !self.expect(SyntaxKind::COLON, "':'") {
            self.error_recover("invalid rule header", &[SyntaxKind::COLON, SyntaxKind::SEMICOLON]);
            if !self.eat(SyntaxKind::COLON) {
                self.eat(SyntaxKind::SEMICOLON);
                return;
            }
        }
        self.parse_alt_list();
        if !self.eat(SyntaxKind::SEMICOLON) {
            self.error_recover("expected ';' at end of rule", &[SyntaxKind::SEMICOLON]);
            self.eat(SyntaxKind::SEMICOLON);
        }
    }

    // =========================================================================
    // Alternatives
    // =========================================================================

    /// AltList = Alternative ('|' Alternative)*
    fn parse_alt_list(&mut self) {
        self.start_node(SyntaxKind::ALT_LIST);
        self.parse_alternative();
        while self.eat(SyntaxKind::PIPE) {
            self.parse_alternative();
        }
        self.finish_node();
    }

    /// Alternative = ElementOptions? Element* (AltLabel | LexerCommands)?
    fn parse_alternative(&mut self) {
        self.start_node(SyntaxKind::ALTERNATIVE);
        if self.at(SyntaxKind::LT) {
            self.parse_element_options();
        }
        loop {
            if self.at_any(ELEMENT_START) {
                self.parse_element();
            } else if self.at_any(ALT_END) {
                break;
            } else {
                self.error_recover(
                    format!("unexpected {} in alternative", describe(self.current_kind())),
                    &[
                        SyntaxKind::PIPE,
                        SyntaxKind::R_PAREN,
                        SyntaxKind::SEMICOLON,
                    ],
                );
            }
        }
        if self.at(SyntaxKind::HASH) {
            self.start_node(SyntaxKind::ALT_LABEL);
            self.bump();
            self.expect_ident();
            self.finish_node();
        }
        if self.at(SyntaxKind::ARROW) {
            self.parse_lexer_commands();
        }
        self.finish_node();
    }

    /// ElementOptions = '<' ElementOption (',' ElementOption)* '>'
    fn parse_element_options(&mut self) {
        self.start_node(SyntaxKind::ELEMENT_OPTIONS);
        self.bump();
        loop {
            self.start_node(SyntaxKind::ELEMENT_OPTION);
            self.expect_ident();
            if self.eat(SyntaxKind::EQ) {
                if self.at_any(&[SyntaxKind::STRING_LITERAL, SyntaxKind::INT]) || self.at_ident() {
                    self.bump();
                } else {
                    self.error("expected option value");
                }
            }
            self.finish_node();
            if !self.eat(SyntaxKind::COMMA) {
                break;
            }
        }
        self.expect(SyntaxKind::GT, "'>'");
        self.finish_node();
    }

    /// LexerCommands = '->' LexerCommand (',' LexerCommand)*
    fn parse_lexer_commands(&mut self) {
        self.start_node(SyntaxKind::LEXER_COMMANDS);
        self.bump();
        loop {
            self.start_node(SyntaxKind::LEXER_COMMAND);
            // `mode` is a keyword but also a command name
            if self.at_ident() || self.at(SyntaxKind::MODE_KW) {
                self.bump();
            } else {
                self.error("expected lexer command");
            }
            if self.eat(SyntaxKind::L_PAREN) {
                if self.at(SyntaxKind::INT) || self.at_ident() {
                    self.bump();
                } else {
                    self.error("expected command argument");
                }
                self.expect(SyntaxKind::R_PAREN, "')'");
            }
            self.finish_node();
            if !self.eat(SyntaxKind::COMMA) {
                break;
            }
        }
        self.finish_node();
    }

    // =========================================================================
    // Elements
    // =========================================================================

    /// Element = LabeledElement EbnfSuffix? | Atom EbnfSuffix? | Block EbnfSuffix?
    ///         | ActionBlock '?'?
    fn parse_element(&mut self) {
        let checkpoint = self.checkpoint();

        if self.at(SyntaxKind::L_BRACE) {
            self.parse_action_block();
            if self.at(SyntaxKind::QUESTION) {
                self.start_node_at(checkpoint, SyntaxKind::PREDICATE);
                self.bump();
                self.finish_node();
            }
            return;
        }

        if self.at_ident() && matches!(self.nth(1), SyntaxKind::EQ | SyntaxKind::PLUS_EQ) {
            self.start_node(SyntaxKind::LABELED_ELEMENT);
            self.bump();
            self.bump();
            match self.current_kind() {
                SyntaxKind::L_PAREN => self.parse_block(),
                SyntaxKind::TOKEN_REF
                | SyntaxKind::RULE_REF
                | SyntaxKind::STRING_LITERAL
                | SyntaxKind::DOT
                | SyntaxKind::TILDE => self.parse_atom(),
                _ => self.error("expected element after label"),
            }
            self.finish_node();
        } else if self.at(SyntaxKind::L_PAREN) {
            self.parse_block();
        } else {
            self.parse_atom();
        }

        if self.at_any(&[SyntaxKind::QUESTION, SyntaxKind::STAR, SyntaxKind::PLUS]) {
            self.start_node_at(checkpoint, SyntaxKind::EBNF);
            self.start_node(SyntaxKind::EBNF_SUFFIX);
            self.bump();
            // Non-greedy marker
            self.eat(SyntaxKind::QUESTION);
            self.finish_node();
            self.finish_node();
        }
    }

    /// Atom = Terminal | RuleCall | Literal | CharRange | LexerCharSet | Wildcard | NotSet
    fn parse_atom(&mut self) {
        match self.current_kind() {
            SyntaxKind::TOKEN_REF => {
                self.start_node(SyntaxKind::TERMINAL);
                self.bump();
                self.parse_opt_element_options();
                self.finish_node();
            }
            SyntaxKind::RULE_REF => {
                self.start_node(SyntaxKind::RULE_CALL);
                self.bump();
                self.eat(SyntaxKind::CHAR_SET);
                self.parse_opt_element_options();
                self.finish_node();
            }
            SyntaxKind::STRING_LITERAL => self.parse_literal_or_range(),
            SyntaxKind::CHAR_SET => {
                self.start_node(SyntaxKind::LEXER_CHAR_SET);
                self.bump();
                self.finish_node();
            }
            SyntaxKind::DOT => {
                self.start_node(SyntaxKind::WILDCARD);
                self.bump();
                self.parse_opt_element_options();
                self.finish_node();
            }
            SyntaxKind::TILDE => {
                self.start_node(SyntaxKind::NOT_SET);
                self.bump();
                match self.current_kind() {
                    SyntaxKind::L_PAREN => self.parse_block(),
                    SyntaxKind::STRING_LITERAL => self.parse_literal_or_range(),
                    SyntaxKind::TOKEN_REF => {
                        self.start_node(SyntaxKind::TERMINAL);
                        self.bump();
                        self.finish_node();
                    }
                    SyntaxKind::CHAR_SET => {
                        self.start_node(SyntaxKind::LEXER_CHAR_SET);
                        self.bump();
                        self.finish_node();
                    }
                    _ => self.error("expected set element after '~'"),
                }
                self.finish_node();
            }
            kind => self.error(format!("expected element, found {}", describe(kind))),
        }
    }

    /// Literal = STRING_LITERAL ElementOptions? | STRING_LITERAL '..' STRING_LITERAL
    fn parse_literal_or_range(&mut self) {
        if self.nth(1) == SyntaxKind::DOT_DOT {
            self.start_node(SyntaxKind::CHAR_RANGE);
            self.bump();
            self.bump();
            self.expect(SyntaxKind::STRING_LITERAL, "range end literal");
            self.finish_node();
        } else {
            self.start_node(SyntaxKind::LITERAL);
            self.bump();
            self.parse_opt_element_options();
            self.finish_node();
        }
    }

    fn parse_opt_element_options(&mut self) {
        if self.at(SyntaxKind::LT) {
            self.parse_element_options();
        }
    }

    /// Block = '(' (OptionsSpec ':')? AltList ')'
    fn parse_block(&mut self) {
        self.start_node(SyntaxKind::BLOCK);
        self.bump();
        if self.at(SyntaxKind::OPTIONS_KW) {
            self.parse_options_spec();
            self.expect(SyntaxKind::COLON, "':'");
        }
        self.parse_alt_list();
        self.expect(SyntaxKind::R_PAREN, "')'");
        self.finish_node();
    }
}

fn describe(kind: SyntaxKind) -> String {
    match kind {
        SyntaxKind::EOF => "end of file".to_string(),
        kind => format!("{kind:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::SyntaxNode;

    fn kinds_of(node: &SyntaxNode) -> Vec<SyntaxKind> {
        node.descendants().map(|n| n.kind()).collect()
    }

    #[test]
    fn test_parse_empty() {
        let result = parse("");
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.syntax().kind(), SyntaxKind::GRAMMAR_FILE);
    }

    #[test]
    fn test_parse_grammar_decl() {
        let result = parse("lexer grammar L;");
        assert!(result.ok(), "errors: {:?}", result.errors);
        assert!(kinds_of(&result.syntax()).contains(&SyntaxKind::GRAMMAR_DECL));
    }

    #[test]
    fn test_parse_combined_grammar() {
        let src = "grammar Expr;\nstat: ID '=' expr ';' ;\nexpr: INT | ID ;\nID: [a-z]+ ;\nINT: [0-9]+ ;\nWS: [ \\t\\r\\n]+ -> skip ;\n";
        let result = parse(src);
        assert!(result.ok(), "errors: {:?}", result.errors);
        let kinds = kinds_of(&result.syntax());
        assert_eq!(kinds.iter().filter(|k| **k == SyntaxKind::PARSER_RULE).count(), 2);
        assert_eq!(kinds.iter().filter(|k| **k == SyntaxKind::LEXER_RULE).count(), 3);
        assert!(kinds.contains(&SyntaxKind::LEXER_COMMANDS));
    }

    #[test]
    fn test_parse_is_lossless() {
        let src = "grammar G; // trailing\n/* c */ a : 'x' ( b | c )* ; b: B ; c: C;";
        let result = parse(src);
        assert_eq!(result.syntax().text().to_string(), src);
    }

    #[test]
    fn test_parse_ebnf_and_non_greedy() {
        let result = parse("lexer grammar L; CMT: '/*' .*? '*/' -> skip ;");
        assert!(result.ok(), "errors: {:?}", result.errors);
        let root = result.syntax();
        let suffix = root
            .descendants()
            .find(|n| n.kind() == SyntaxKind::EBNF_SUFFIX)
            .unwrap();
        assert_eq!(suffix.text().to_string(), "*?");
    }

    #[test]
    fn test_parse_labels_predicates_and_options() {
        let src = "grammar G; e : <assoc=right> l=e '^' r+=e # Pow | {true}? INT {act();} ;";
        let result = parse(src);
        assert!(result.ok(), "errors: {:?}", result.errors);
        let kinds = kinds_of(&result.syntax());
        assert!(kinds.contains(&SyntaxKind::ELEMENT_OPTIONS));
        assert!(kinds.contains(&SyntaxKind::LABELED_ELEMENT));
        assert!(kinds.contains(&SyntaxKind::ALT_LABEL));
        assert!(kinds.contains(&SyntaxKind::PREDICATE));
        assert!(kinds.contains(&SyntaxKind::ACTION));
    }

    #[test]
    fn test_parse_not_set_and_range() {
        let result = parse("lexer grammar L; A: ~('a'..'f' | 'x') ;");
        assert!(result.ok(), "errors: {:?}", result.errors);
        let kinds = kinds_of(&result.syntax());
        assert!(kinds.contains(&SyntaxKind::NOT_SET));
        assert!(kinds.contains(&SyntaxKind::CHAR_RANGE));
    }

    #[test]
    fn test_parse_prequel_sections() {
        let src = "parser grammar P;\noptions { tokenVocab=L; }\ntokens { A, B }\n@header { import x; }\ns: A ;";
        let result = parse(src);
        assert!(result.ok(), "errors: {:?}", result.errors);
        let kinds = kinds_of(&result.syntax());
        assert!(kinds.contains(&SyntaxKind::OPTIONS_SPEC));
        assert!(kinds.contains(&SyntaxKind::TOKENS_SPEC));
        assert!(kinds.contains(&SyntaxKind::NAMED_ACTION));
    }

    #[test]
    fn test_parse_recovers_at_semicolon() {
        let result = parse("grammar G; a : 'x' ) ; b : 'y' ;");
        assert!(!result.ok());
        let rules = result
            .syntax()
            .descendants()
            .filter(|n| n.kind() == SyntaxKind::PARSER_RULE)
            .count();
        assert_eq!(rules, 2);
    }

    #[test]
    fn test_parse_missing_semicolon_reports_error() {
        let result = parse("grammar G; a : 'x'");
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].range, TextRange::empty(TextSize::new(18)));
    }
}
