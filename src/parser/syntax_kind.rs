//! Syntax kinds for the Rowan-based grammar CST
//!
//! This enum defines all possible node and token kinds in the syntax tree
//! of an ANTLR v4 grammar file.

/// All syntax kinds (tokens and nodes) of a `.g4` grammar file
///
/// Tokens are leaf nodes (identifiers, keywords, literals, punctuation).
/// Nodes are composite (rules, alternatives, elements).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u16)]
#[allow(non_camel_case_types)]
pub enum SyntaxKind {
    // =========================================================================
    // TRIVIA (whitespace and comments - preserved but not semantically meaningful)
    // =========================================================================
    WHITESPACE = 0,
    LINE_COMMENT,
    BLOCK_COMMENT,

    // =========================================================================
    // LITERALS
    // =========================================================================
    TOKEN_REF,      // ID, WS (uppercase initial)
    RULE_REF,       // stat, expr (lowercase initial)
    STRING_LITERAL, // 'abc'
    DQ_STRING,      // "abc" (only meaningful inside actions)
    CHAR_SET,       // [a-z] in lexer rules, [int x] argument blocks in parser rules
    INT,            // 42

    // =========================================================================
    // PUNCTUATION
    // =========================================================================
    L_BRACE,     // {
    R_BRACE,     // }
    L_PAREN,     // (
    R_PAREN,     // )
    COLON,       // :
    COLON_COLON, // ::
    SEMICOLON,   // ;
    PIPE,        // |
    QUESTION,    // ?
    STAR,        // *
    PLUS,        // +
    PLUS_EQ,     // +=
    TILDE,       // ~
    DOT,         // .
    DOT_DOT,     // ..
    ARROW,       // ->
    EQ,          // =
    COMMA,       // ,
    HASH,        // #
    LT,          // <
    GT,          // >
    AT,          // @
    DOLLAR,      // $
    PUNCT,       // any other character inside actions

    // =========================================================================
    // KEYWORDS
    // =========================================================================
    GRAMMAR_KW,
    LEXER_KW,
    PARSER_KW,
    FRAGMENT_KW,
    OPTIONS_KW,
    TOKENS_KW,
    CHANNELS_KW,
    IMPORT_KW,
    MODE_KW,
    RETURNS_KW,
    LOCALS_KW,
    THROWS_KW,
    CATCH_KW,
    FINALLY_KW,

    // =========================================================================
    // SPECIAL
    // =========================================================================
    ERROR,
    EOF, // end of input marker, never stored in the tree

    // =========================================================================
    // NODES
    // =========================================================================
    GRAMMAR_FILE,
    GRAMMAR_DECL,
    OPTIONS_SPEC,
    OPTION,
    TOKENS_SPEC,
    CHANNELS_SPEC,
    IMPORT_DECL,
    NAMED_ACTION,
    MODE_DECL,

    // Rules
    PARSER_RULE,
    LEXER_RULE,
    RULE_PREQUEL, // arguments, returns, locals, throws, rule options and actions
    EXCEPTION_HANDLER,

    // Alternatives
    ALT_LIST,
    ALTERNATIVE,
    ALT_LABEL,
    ELEMENT_OPTIONS,
    ELEMENT_OPTION,
    LEXER_COMMANDS,
    LEXER_COMMAND,

    // Elements
    LABELED_ELEMENT,
    EBNF, // element + suffix
    EBNF_SUFFIX,
    TERMINAL,      // TOKEN_REF
    RULE_CALL,     // RULE_REF
    LITERAL,       // STRING_LITERAL
    CHAR_RANGE,    // 'a'..'z'
    LEXER_CHAR_SET,
    WILDCARD,
    NOT_SET,
    BLOCK,
    ACTION,
    PREDICATE,

    __LAST,
}

impl SyntaxKind {
    /// Check if this is a trivia token (whitespace or comment)
    pub fn is_trivia(self) -> bool {
        matches!(
            self,
            Self::WHITESPACE | Self::LINE_COMMENT | Self::BLOCK_COMMENT
        )
    }

    /// Check if this is a keyword
    pub fn is_keyword(self) -> bool {
        (self as u16) >= (Self::GRAMMAR_KW as u16) && (self as u16) <= (Self::FINALLY_KW as u16)
    }

    /// Check if this is an identifier token (token or rule name)
    pub fn is_ident(self) -> bool {
        matches!(self, Self::TOKEN_REF | Self::RULE_REF)
    }

    /// Check if this kind is an element node that can appear in an alternative
    pub fn is_element(self) -> bool {
        matches!(
            self,
            Self::LABELED_ELEMENT
                | Self::EBNF
                | Self::TERMINAL
                | Self::RULE_CALL
                | Self::LITERAL
                | Self::CHAR_RANGE
                | Self::LEXER_CHAR_SET
                | Self::WILDCARD
                | Self::NOT_SET
                | Self::BLOCK
                | Self::ACTION
                | Self::PREDICATE
        )
    }
}

impl From<SyntaxKind> for rowan::SyntaxKind {
    fn from(kind: SyntaxKind) -> Self {
        Self(kind as u16)
    }
}

impl From<rowan::SyntaxKind> for SyntaxKind {
    fn from(raw: rowan::SyntaxKind) -> Self {
        assert!(raw.0 < SyntaxKind::__LAST as u16);
        // Safety: we control all syntax kinds and check bounds above
        unsafe { std::mem::transmute::<u16, SyntaxKind>(raw.0) }
    }
}

/// Language definition for Rowan
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GrammarLanguage {}

impl rowan::Language for GrammarLanguage {
    type Kind = SyntaxKind;

    fn kind_from_raw(raw: rowan::SyntaxKind) -> Self::Kind {
        raw.into()
    }

    fn kind_to_raw(kind: Self::Kind) -> rowan::SyntaxKind {
        kind.into()
    }
}

/// Type aliases for convenience
pub type SyntaxNode = rowan::SyntaxNode<GrammarLanguage>;
pub type SyntaxToken = rowan::SyntaxToken<GrammarLanguage>;
pub type SyntaxElement = rowan::SyntaxElement<GrammarLanguage>;
