//! Logos-based lexer for ANTLR v4 grammar files
//!
//! Fast tokenization using the logos crate. Every byte of the input ends up
//! in exactly one token, so the CST built on top is lossless.

use super::syntax_kind::SyntaxKind;
use logos::Logos;
use rowan::TextSize;

/// A token with its kind, text, and position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: SyntaxKind,
    pub text: &'a str,
    pub offset: TextSize,
}

/// Lexer wrapping the logos-generated tokenizer
pub struct Lexer<'a> {
    inner: logos::Lexer<'a, LogosToken>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            inner: LogosToken::lexer(input),
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let logos_token = self.inner.next()?;
        let text = self.inner.slice();
        let offset = TextSize::new(self.inner.span().start as u32);

        let kind = match logos_token {
            Ok(t) => t.into(),
            Err(()) => SyntaxKind::ERROR,
        };

        Some(Token { kind, text, offset })
    }
}

/// Tokenize an entire string into a Vec
pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    Lexer::new(input).collect()
}

/// Logos token enum - maps to SyntaxKind
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
pub enum LogosToken {
    // =========================================================================
    // TRIVIA
    // =========================================================================
    #[regex(r"[ \t\r\n\f]+")]
    Whitespace,

    #[regex(r"//[^\n]*")]
    LineComment,

    #[regex(r"/\*([^*]|\*+[^*/])*\*+/")]
    BlockComment,

    // =========================================================================
    // LITERALS
    // =========================================================================
    #[regex(r"[A-Z][a-zA-Z0-9_]*")]
    TokenRef,

    #[regex(r"[a-z][a-zA-Z0-9_]*")]
    RuleRef,

    #[regex(r"'([^'\\\r\n]|\\.)*'")]
    StringLiteral,

    #[regex(r#""([^"\\\r\n]|\\.)*""#)]
    DqString,

    #[regex(r"\[([^\]\\]|\\.)*\]")]
    CharSet,

    #[regex(r"[0-9]+")]
    Int,

    // =========================================================================
    // MULTI-CHARACTER PUNCTUATION (must come before single-char)
    // =========================================================================
    #[token("::")]
    ColonColon,

    #[token("..")]
    DotDot,

    #[token("->")]
    Arrow,

    #[token("+=")]
    PlusEq,

    // =========================================================================
    // SINGLE-CHARACTER PUNCTUATION
    // =========================================================================
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(":")]
    Colon,
    #[token(";")]
    Semicolon,
    #[token("|")]
    Pipe,
    #[token("?")]
    Question,
    #[token("*")]
    Star,
    #[token("+")]
    Plus,
    #[token("~")]
    Tilde,
    #[token(".")]
    Dot,
    #[token("=")]
    Eq,
    #[token(",")]
    Comma,
    #[token("#")]
    Hash,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("@")]
    At,
    #[token("$")]
    Dollar,
    #[regex(r"[!%^&/\-\\`\[\]]")]
    Punct,

    // =========================================================================
    // KEYWORDS
    // =========================================================================
    #[token("grammar")]
    GrammarKw,
    #[token("lexer")]
    LexerKw,
    #[token("parser")]
    ParserKw,
    #[token("fragment")]
    FragmentKw,
    #[token("options")]
    OptionsKw,
    #[token("tokens")]
    TokensKw,
    #[token("channels")]
    ChannelsKw,
    #[token("import")]
    ImportKw,
    #[token("mode")]
    ModeKw,
    #[token("returns")]
    ReturnsKw,
    #[token("locals")]
    LocalsKw,
    #[token("throws")]
    ThrowsKw,
    #[token("catch")]
    CatchKw,
    #[token("finally")]
    FinallyKw,
}

impl From<LogosToken> for SyntaxKind {
    fn from(token: LogosToken) -> Self {
        use LogosToken::*;
        match token {
            Whitespace => SyntaxKind::WHITESPACE,
            LineComment => SyntaxKind::LINE_COMMENT,
            BlockComment => SyntaxKind::BLOCK_COMMENT,

            TokenRef => SyntaxKind::TOKEN_REF,
            RuleRef => SyntaxKind::RULE_REF,
            StringLiteral => SyntaxKind::STRING_LITERAL,
            DqString => SyntaxKind::DQ_STRING,
            CharSet => SyntaxKind::CHAR_SET,
            Int => SyntaxKind::INT,

            ColonColon => SyntaxKind::COLON_COLON,
            DotDot => SyntaxKind::DOT_DOT,
            Arrow => SyntaxKind::ARROW,
            PlusEq => SyntaxKind::PLUS_EQ,

            LBrace => SyntaxKind::L_BRACE,
            RBrace => SyntaxKind::R_BRACE,
            LParen => SyntaxKind::L_PAREN,
            RParen => SyntaxKind::R_PAREN,
            Colon => SyntaxKind::COLON,
            Semicolon => SyntaxKind::SEMICOLON,
            Pipe => SyntaxKind::PIPE,
            Question => SyntaxKind::QUESTION,
            Star => SyntaxKind::STAR,
            Plus => SyntaxKind::PLUS,
            Tilde => SyntaxKind::TILDE,
            Dot => SyntaxKind::DOT,
            Eq => SyntaxKind::EQ,
            Comma => SyntaxKind::COMMA,
            Hash => SyntaxKind::HASH,
            Lt => SyntaxKind::LT,
            Gt => SyntaxKind::GT,
            At => SyntaxKind::AT,
            Dollar => SyntaxKind::DOLLAR,
            Punct => SyntaxKind::PUNCT,

            GrammarKw => SyntaxKind::GRAMMAR_KW,
            LexerKw => SyntaxKind::LEXER_KW,
            ParserKw => SyntaxKind::PARSER_KW,
            FragmentKw => SyntaxKind::FRAGMENT_KW,
            OptionsKw => SyntaxKind::OPTIONS_KW,
            TokensKw => SyntaxKind::TOKENS_KW,
            ChannelsKw => SyntaxKind::CHANNELS_KW,
            ImportKw => SyntaxKind::IMPORT_KW,
            ModeKw => SyntaxKind::MODE_KW,
            ReturnsKw => SyntaxKind::RETURNS_KW,
            LocalsKw => SyntaxKind::LOCALS_KW,
            ThrowsKw => SyntaxKind::THROWS_KW,
            CatchKw => SyntaxKind::CATCH_KW,
            FinallyKw => SyntaxKind::FINALLY_KW,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lex_grammar_decl() {
        let tokens: Vec<_> = Lexer::new("grammar Expr;").collect();
        assert_eq!(tokens.len(), 4); // grammar, whitespace, Expr, ;
        assert_eq!(tokens[0].kind, SyntaxKind::GRAMMAR_KW);
        assert_eq!(tokens[1].kind, SyntaxKind::WHITESPACE);
        assert_eq!(tokens[2].kind, SyntaxKind::TOKEN_REF);
        assert_eq!(tokens[3].kind, SyntaxKind::SEMICOLON);
    }

    #[test]
    fn test_lex_rule_and_token_refs() {
        let tokens: Vec<_> = Lexer::new("stat: ID '=' expr ;").collect();
        let kinds: Vec<_> = tokens
            .iter()
            .map(|t| t.kind)
            .filter(|k| !k.is_trivia())
            .collect();
        assert_eq!(
            kinds,
            vec![
                SyntaxKind::RULE_REF,
                SyntaxKind::COLON,
                SyntaxKind::TOKEN_REF,
                SyntaxKind::STRING_LITERAL,
                SyntaxKind::RULE_REF,
                SyntaxKind::SEMICOLON,
            ]
        );
    }

    #[test]
    fn test_lex_keyword_prefix_is_identifier() {
        let tokens: Vec<_> = Lexer::new("grammarRule").collect();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, SyntaxKind::RULE_REF);
    }

    #[test]
    fn test_lex_escaped_literal_and_char_set() {
        let tokens: Vec<_> = Lexer::new(r"'\'' [a-z\]]").collect();
        assert_eq!(tokens[0].kind, SyntaxKind::STRING_LITERAL);
        assert_eq!(tokens[0].text, r"'\''");
        assert_eq!(tokens[2].kind, SyntaxKind::CHAR_SET);
        assert_eq!(tokens[2].text, r"[a-z\]]");
    }

    #[test]
    fn test_lex_offsets_are_contiguous() {
        let text = "WS : [ \\t]+ -> skip ; /* c */";
        let tokens = tokenize(text);
        let mut expected = 0u32;
        for token in &tokens {
            assert_eq!(u32::from(token.offset), expected);
            expected += token.text.len() as u32;
        }
        assert_eq!(expected as usize, text.len());
    }

    #[test]
    fn test_lex_block_comment_with_stars() {
        let tokens: Vec<_> = Lexer::new("/** doc **/x").collect();
        assert_eq!(tokens[0].kind, SyntaxKind::BLOCK_COMMENT);
        assert_eq!(tokens[1].kind, SyntaxKind::RULE_REF);
    }
}
