//! Token vocabulary: token types, symbolic names, literal aliases and
//! channels.

use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use crate::atn::EOF;

/// First token type assigned to user tokens
pub const MIN_USER_TOKEN_TYPE: i32 = 1;
pub const DEFAULT_CHANNEL: i32 = 0;
pub const HIDDEN_CHANNEL: i32 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    /// Indexed by token type; slot 0 is the invalid type
    symbolic: Vec<Option<SmolStr>>,
    literal: Vec<Option<SmolStr>>,
    by_name: FxHashMap<SmolStr, i32>,
    by_literal: FxHashMap<SmolStr, i32>,
    channels: FxHashMap<SmolStr, i32>,
    next_channel: i32,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::new()
    }
}

impl Vocabulary {
    pub fn new() -> Self {
        let mut channels = FxHashMap::default();
        channels.insert(SmolStr::new("DEFAULT_TOKEN_CHANNEL"), DEFAULT_CHANNEL);
        channels.insert(SmolStr::new("HIDDEN"), HIDDEN_CHANNEL);
        Self {
            symbolic: vec![None],
            literal: vec![None],
            by_name: FxHashMap::default(),
            by_literal: FxHashMap::default(),
            channels,
            next_channel: HIDDEN_CHANNEL + 1,
        }
    }

    /// Define a token name, returning its type. Redefinitions keep the
    /// original type.
    pub fn define_token(&mut self, name: &str) -> i32 {
        if let Some(&ty) = self.by_name.get(name) {
            return ty;
        }
        let ty = self.symbolic.len() as i32;
        self.symbolic.push(Some(SmolStr::new(name)));
        self.literal.push(None);
        self.by_name.insert(SmolStr::new(name), ty);
        ty
    }

    /// Alias a quoted literal (e.g. `'='`) to an existing type. The first
    /// alias of a literal wins.
    pub fn alias_literal(&mut self, literal: &str, ty: i32) {
        if self.by_literal.contains_key(literal) {
            return;
        }
        if let Some(slot) = self.literal.get_mut(ty as usize) {
            if slot.is_none() {
                *slot = Some(SmolStr::new(literal));
            }
        }
        self.by_literal.insert(SmolStr::new(literal), ty);
    }

    pub fn define_channel(&mut self, name: &str) -> i32 {
        if let Some(&ch) = self.channels.get(name) {
            return ch;
        }
        let ch = self.next_channel;
        self.next_channel += 1;
        self.channels.insert(SmolStr::new(name), ch);
        ch
    }

    pub fn token_type(&self, name: &str) -> Option<i32> {
        if name == "EOF" {
            return Some(EOF);
        }
        self.by_name.get(name).copied()
    }

    pub fn literal_type(&self, literal: &str) -> Option<i32> {
        self.by_literal.get(literal).copied()
    }

    pub fn channel(&self, name: &str) -> Option<i32> {
        self.channels.get(name).copied()
    }

    /// Name of a channel number, if it was declared
    pub fn channel_name(&self, channel: i32) -> Option<&str> {
        self.channels
            .iter()
            .filter(|(_, ch)| **ch == channel)
            .map(|(name, _)| name.as_str())
            .min_by_key(|name| name.len())
    }

    pub fn symbolic_name(&self, ty: i32) -> Option<&str> {
        if ty == EOF {
            return Some("EOF");
        }
        self.symbolic
            .get(usize::try_from(ty).ok()?)
            .and_then(|n| n.as_deref())
    }

    pub fn literal_name(&self, ty: i32) -> Option<&str> {
        self.literal
            .get(usize::try_from(ty).ok()?)
            .and_then(|n| n.as_deref())
    }

    /// Literal name if there is one, else the symbolic name, else the number
    pub fn display_name(&self, ty: i32) -> String {
        if ty == EOF {
            return "<EOF>".to_string();
        }
        self.literal_name(ty)
            .or_else(|| self.symbolic_name(ty))
            .map(str::to_string)
            .unwrap_or_else(|| ty.to_string())
    }

    pub fn max_token_type(&self) -> i32 {
        self.symbolic.len() as i32 - 1
    }
}
