//! Tokens produced by the lexer interpreter.

use std::fmt;

use smol_str::SmolStr;
use text_size::{TextRange, TextSize};

use crate::atn::EOF;
use crate::grammar::{DEFAULT_CHANNEL, HIDDEN_CHANNEL, Vocabulary};

/// Channel a token was emitted on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Default,
    Hidden,
    Custom(i32),
    /// Text matched by a `skip` rule; kept for lookup, never parsed
    Skip,
}

impl Channel {
    pub fn from_number(channel: i32) -> Self {
        match channel {
            DEFAULT_CHANNEL => Channel::Default,
            HIDDEN_CHANNEL => Channel::Hidden,
            n => Channel::Custom(n),
        }
    }

    /// Channel number as the grammar declares it; skipped text has none
    pub fn number(self) -> Option<i32> {
        match self {
            Channel::Default => Some(DEFAULT_CHANNEL),
            Channel::Hidden => Some(HIDDEN_CHANNEL),
            Channel::Custom(n) => Some(n),
            Channel::Skip => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token {
    /// Position in the token stream, skipped tokens included
    pub index: usize,
    pub ty: i32,
    pub channel: Channel,
    /// Half-open byte span in the input
    pub range: TextRange,
    /// 1-based
    pub line: u32,
    /// 0-based
    pub column: u32,
    pub text: SmolStr,
}

impl Token {
    pub fn is_eof(&self) -> bool {
        self.ty == EOF
    }

    /// On the default channel, i.e. seen by the parser
    pub fn is_real(&self) -> bool {
        self.channel == Channel::Default
    }

    pub fn start(&self) -> TextSize {
        self.range.start()
    }

    pub fn stop(&self) -> TextSize {
        self.range.end()
    }

    /// Text for error messages: quoted, with control characters escaped
    pub fn display_text(&self) -> String {
        if self.is_eof() {
            return "<EOF>".to_string();
        }
        format!("'{}'", escape_ws(&self.text))
    }

    /// `#i Type NAME, Line L:C[, Channel c]`, or `Skipped`
    pub fn info(&self, vocabulary: &Vocabulary) -> String {
        let channel = match self.channel {
            Channel::Default => String::new(),
            Channel::Hidden => ", Channel hidden".to_string(),
            Channel::Custom(n) => format!(", Channel {n}"),
            Channel::Skip => return "Skipped".to_string(),
        };
        format!(
            "#{} Type {}, Line {}:{}{}",
            self.index,
            vocabulary.display_name(self.ty),
            self.line,
            self.column,
            channel
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let channel = match self.channel.number() {
            Some(DEFAULT_CHANNEL) => String::new(),
            Some(n) => format!(",channel={n}"),
            None => ",skipped".to_string(),
        };
        write!(
            f,
            "[@{},{}:{}='{}',<{}>{},{}:{}]",
            self.index,
            u32::from(self.start()),
            u32::from(self.stop()) as i64 - 1,
            escape_ws(&self.text),
            self.ty,
            channel,
            self.line,
            self.column
        )
    }
}

pub(crate) fn escape_ws(text: &str) -> String {
    text.replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}

/// Which way [`TokenStream::token_near`] looks when the offset is not on a
/// parser-visible token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scan {
    Exact,
    Forward,
    Backward,
}

/// All tokens of one input, in offset order, ending with EOF
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TokenStream {
    tokens: Vec<Token>,
}

impl TokenStream {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Token> {
        self.tokens.iter()
    }

    pub fn as_slice(&self) -> &[Token] {
        &self.tokens
    }

    pub fn eof(&self) -> Option<&Token> {
        self.tokens.last().filter(|t| t.is_eof())
    }

    /// Tokens the parser sees
    pub fn real_tokens(&self) -> impl Iterator<Item = &Token> + '_ {
        self.tokens.iter().filter(|t| t.is_real())
    }

    /// Token whose span contains `offset`, on any channel
    pub fn token_at(&self, offset: TextSize) -> Option<&Token> {
        let i = self.tokens.partition_point(|t| t.stop() <= offset);
        self.tokens.get(i).filter(|t| t.range.contains(offset))
    }

    /// Token at `offset`, or the nearest parser-visible token in the scan
    /// direction when the offset is off-channel or between tokens
    pub fn token_near(&self, offset: TextSize, scan: Scan) -> Option<Token> {
        let exact = self.token_at(offset);
        match (scan, exact) {
            (Scan::Exact, t) => t.cloned(),
            (_, Some(t)) if t.is_real() => Some(t.clone()),
            (Scan::Forward, Some(t)) => self.next_real_token(t.index),
            (Scan::Backward, Some(t)) => self.previous_real_token(t.index).cloned(),
            (Scan::Forward, None) => {
                let i = self.tokens.partition_point(|t| t.stop() <= offset);
                match self.tokens.get(i) {
                    Some(t) if t.is_real() => Some(t.clone()),
                    Some(t) => self.next_real_token(t.index),
                    None => Some(self.synthetic_eof()),
                }
            }
            (Scan::Backward, None) => {
                let i = self.tokens.partition_point(|t| t.start() <= offset);
                let t = self.tokens.get(i.checked_sub(1)?)?;
                if t.is_real() && !t.is_eof() {
                    Some(t.clone())
                } else {
                    self.previous_real_token(t.index).cloned()
                }
            }
        }
    }

    /// First parser-visible token after `index`. Running off the end yields
    /// an EOF token even if the stream has none. Nothing follows EOF itself.
    pub fn next_real_token(&self, index: usize) -> Option<Token> {
        match self.tokens.get(index) {
            None => return None,
            Some(t) if t.is_eof() => return None,
            Some(_) => {}
        }
        match self.tokens[index + 1..].iter().find(|t| t.is_real()) {
            Some(t) => Some(t.clone()),
            None => Some(self.synthetic_eof()),
        }
    }

    /// Last parser-visible token before `index`
    pub fn previous_real_token(&self, index: usize) -> Option<&Token> {
        self.tokens
            .get(..index.min(self.tokens.len()))?
            .iter()
            .rev()
            .find(|t| t.is_real())
    }

    fn synthetic_eof(&self) -> Token {
        if let Some(eof) = self.eof() {
            return eof.clone();
        }
        let (end, line, column) = self
            .tokens
            .last()
            .map(|t| (t.stop(), t.line, t.column + t.text.len() as u32))
            .unwrap_or((TextSize::new(0), 1, 0));
        Token {
            index: self.tokens.len(),
            ty: EOF,
            channel: Channel::Default,
            range: TextRange::empty(end),
            line,
            column,
            text: SmolStr::new_static("<EOF>"),
        }
    }
}

impl<'a> IntoIterator for &'a TokenStream {
    type Item = &'a Token;
    type IntoIter = std::slice::Iter<'a, Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.iter()
    }
}
