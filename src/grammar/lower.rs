//! Lowering from the grammar CST to the rule model.
//!
//! Lowering resolves escapes in literals and character sets, collapses
//! blocks of single terminals into sets, drops labels, and reports
//! constructs the interpreter cannot run.

use rustc_hash::FxHashSet;
use smol_str::SmolStr;
use text_size::TextRange;

use super::diagnostics::{DiagnosticCollector, codes};
use super::model::{Alternative, Assoc, CommandSpec, Element, ElementKind, GrammarKind, Rule};
use crate::atn::{IntervalSet, MAX_CHAR};
use crate::parser::{self, AstNode, EbnfOp, GrammarFile};

/// A lowered grammar file
#[derive(Debug, Clone)]
pub struct GrammarFileModel {
    pub kind: GrammarKind,
    pub name: SmolStr,
    pub name_range: TextRange,
    /// Rules in declaration order, both kinds
    pub rules: Vec<Rule>,
    /// Names declared in `tokens { ... }`
    pub tokens: Vec<(SmolStr, TextRange)>,
    /// Names declared in `channels { ... }`
    pub channels: Vec<(SmolStr, TextRange)>,
}

impl GrammarFileModel {
    pub fn lexer_rules(&self) -> impl Iterator<Item = &Rule> + '_ {
        self.rules.iter().filter(|r| r.is_lexer)
    }

    pub fn parser_rules(&self) -> impl Iterator<Item = &Rule> + '_ {
        self.rules.iter().filter(|r| !r.is_lexer)
    }
}

/// Lower a parsed grammar file. Returns `None` when there is no grammar
/// declaration to lower.
pub fn lower(file: &GrammarFile, diags: &mut DiagnosticCollector) -> Option<GrammarFileModel> {
    let decl = file.decl()?;
    let name_token = decl.name()?;
    let kind = if decl.is_lexer() {
        GrammarKind::Lexer
    } else if decl.is_parser() {
        GrammarKind::Parser
    } else {
        GrammarKind::Combined
    };

    for import in file.imports() {
        diags.error(
            import.syntax().text_range(),
            codes::UNSUPPORTED,
            "grammar imports are not supported",
        );
    }
    for mode in file.modes() {
        diags.error(
            mode.syntax().text_range(),
            codes::UNSUPPORTED,
            "lexer modes are not supported",
        );
    }
    if kind == GrammarKind::Parser {
        for spec in file.channels_specs() {
            diags.error(
                spec.syntax().text_range(),
                codes::INVALID_ELEMENT,
                "custom channels are only allowed in lexer grammars",
            );
        }
    }

    let tokens = file
        .tokens_specs()
        .flat_map(|spec| spec.names().collect::<Vec<_>>())
        .map(|t| (SmolStr::new(t.text()), t.text_range()))
        .collect();
    let channels = file
        .channels_specs()
        .flat_map(|spec| spec.names().collect::<Vec<_>>())
        .map(|t| (SmolStr::new(t.text()), t.text_range()))
        .collect();

    let mut rules: Vec<Rule> = Vec::new();
    let mut seen: FxHashSet<SmolStr> = FxHashSet::default();
    for rule in file.rules() {
        let Some(name) = rule.name() else {
            continue;
        };
        let is_lexer = rule.is_lexer();
        let name_text = SmolStr::new(name.text());

        if !seen.insert(name_text.clone()) {
            diags.error(
                name.text_range(),
                codes::DUPLICATE_RULE,
                format!("rule {name_text} redefinition"),
            );
            continue;
        }
        match (kind, is_lexer) {
            (GrammarKind::Lexer, false) => diags.error(
                name.text_range(),
                codes::PARSER_RULE_IN_LEXER,
                format!("parser rule {name_text} not allowed in lexer"),
            ),
            (GrammarKind::Parser, true) => diags.error(
                name.text_range(),
                codes::LEXER_RULE_IN_PARSER,
                format!("lexer rule {name_text} not allowed in parser"),
            ),
            _ => {}
        }

        let fragment = match &rule {
            parser::Rule::Lexer(lexer_rule) => lexer_rule.is_fragment(),
            parser::Rule::Parser(_) => false,
        };
        let mut lowerer = Lowerer {
            diags: &mut *diags,
            in_lexer: is_lexer,
        };
        let alts = match rule.alt_list() {
            Some(list) => list
                .alternatives()
                .map(|alt| lowerer.alternative(&alt, true))
                .collect(),
            None => Vec::new(),
        };

        rules.push(Rule {
            index: rules.len(),
            name: name_text,
            is_lexer,
            fragment,
            range: rule.syntax().text_range(),
            name_range: name.text_range(),
            alts,
            precedence_rule: false,
        });
    }

    if rules.is_empty() {
        diags.error(
            name_token.text_range(),
            codes::NO_RULES,
            format!("grammar {} has no rules", name_token.text()),
        );
    }

    Some(GrammarFileModel {
        kind,
        name: SmolStr::new(name_token.text()),
        name_range: name_token.text_range(),
        rules,
        tokens,
        channels,
    })
}

struct Lowerer<'d> {
    diags: &'d mut DiagnosticCollector,
    in_lexer: bool,
}

impl Lowerer<'_> {
    fn alternative(&mut self, alt: &parser::Alternative, outermost: bool) -> Alternative {
        let elements = alt.elements().filter_map(|e| self.element(&e)).collect();
        let mut result = Alternative::new(elements, alt.syntax().text_range());

        if let Some(options) = alt.element_options() {
            if options.get("assoc").as_deref() == Some("right") {
                result.assoc = Assoc::Right;
            }
        }

        if let Some(commands) = alt.lexer_commands() {
            let range = commands.syntax().text_range();
            if !self.in_lexer {
                self.diags.error(
                    range,
                    codes::INVALID_COMMAND,
                    "lexer commands are not allowed in parser rules",
                );
            } else if !outermost {
                self.diags.error(
                    range,
                    codes::INVALID_COMMAND,
                    "lexer commands are only allowed on outermost alternatives",
                );
            } else {
                result.commands = commands
                    .commands()
                    .filter_map(|cmd| {
                        Some(CommandSpec {
                            name: SmolStr::new(cmd.name()?.text()),
                            arg: cmd.argument().map(|a| SmolStr::new(a.text())),
                            range: cmd.syntax().text_range(),
                        })
                    })
                    .collect();
            }
        }
        result
    }

    fn alternatives(&mut self, block: &parser::Block) -> Vec<Alternative> {
        match block.alt_list() {
            Some(list) => list
                .alternatives()
                .map(|alt| self.alternative(&alt, false))
                .collect(),
            None => Vec::new(),
        }
    }

    fn element(&mut self, element: &parser::Element) -> Option<Element> {
        let range = element.syntax().text_range();
        match element {
            parser::Element::Labeled(labeled) => self.element(&labeled.element()?),
            parser::Element::Ebnf(ebnf) => {
                let inner = ebnf.element()?;
                let alts = match &inner {
                    parser::Element::Block(block) => {
                        let alts = self.alternatives(block);
                        match self.as_set(&alts) {
                            Some(members) => {
                                let set = Element::new(
                                    ElementKind::Set {
                                        members,
                                        negated: false,
                                    },
                                    block.syntax().text_range(),
                                );
                                vec![Alternative::new(vec![set], block.syntax().text_range())]
                            }
                            None => alts,
                        }
                    }
                    other => {
                        let el = self.element(other)?;
                        let el_range = el.range;
                        vec![Alternative::new(vec![el], el_range)]
                    }
                };
                let greedy = ebnf.is_greedy();
                let kind = match ebnf.op()? {
                    EbnfOp::Optional => ElementKind::Optional { alts, greedy },
                    EbnfOp::Star => ElementKind::Star {
                        alts,
                        greedy,
                        precedence_loop: false,
                    },
                    EbnfOp::Plus => ElementKind::Plus { alts, greedy },
                };
                Some(Element::new(kind, range))
            }
            parser::Element::Block(block) => {
                let alts = self.alternatives(block);
                let kind = match self.as_set(&alts) {
                    Some(members) => ElementKind::Set {
                        members,
                        negated: false,
                    },
                    None => ElementKind::Block { alts },
                };
                Some(Element::new(kind, range))
            }
            parser::Element::Terminal(terminal) => {
                let name = SmolStr::new(terminal.token()?.text());
                let kind = if self.in_lexer {
                    ElementKind::RuleRef {
                        name,
                        precedence: 0,
                    }
                } else {
                    ElementKind::TokenRef { name }
                };
                Some(Element::new(kind, range))
            }
            parser::Element::RuleCall(call) => {
                let name = SmolStr::new(call.token()?.text());
                if self.in_lexer {
                    self.diags.error(
                        range,
                        codes::INVALID_ELEMENT,
                        format!("parser rule {name} not allowed in lexer rule"),
                    );
                    return None;
                }
                Some(Element::new(
                    ElementKind::RuleRef {
                        name,
                        precedence: 0,
                    },
                    range,
                ))
            }
            parser::Element::Literal(literal) => {
                let token = literal.token()?;
                let chars = self.literal_chars(token.text(), token.text_range())?;
                Some(Element::new(
                    ElementKind::StringLiteral {
                        raw: SmolStr::new(token.text()),
                        chars,
                    },
                    range,
                ))
            }
            parser::Element::CharRange(char_range) => {
                if !self.lexer_only(range, "character ranges") {
                    return None;
                }
                let (from, to) = char_range.bounds()?;
                let from = self.single_char(from.text(), from.text_range())?;
                let to = self.single_char(to.text(), to.text_range())?;
                if from > to {
                    self.diags.error(
                        range,
                        codes::INVALID_LITERAL,
                        "character range is empty",
                    );
                    return None;
                }
                Some(Element::new(ElementKind::Range { from, to }, range))
            }
            parser::Element::CharSet(char_set) => {
                if !self.lexer_only(range, "character sets") {
                    return None;
                }
                let token = char_set.token()?;
                let set = self.char_set(token.text(), token.text_range())?;
                Some(Element::new(ElementKind::CharSet { set }, range))
            }
            parser::Element::Wildcard(_) => Some(Element::new(ElementKind::Wildcard, range)),
            parser::Element::NotSet(not_set) => {
                let inner = not_set.element()?;
                let members = match &inner {
                    parser::Element::Block(block) => {
                        let alts = self.alternatives(block);
                        self.as_set_members(&alts)
                    }
                    other => {
                        let el = self.element(other)?;
                        self.is_set_member(&el).then(|| vec![el])
                    }
                };
                match members {
                    Some(members) => Some(Element::new(
                        ElementKind::Set {
                            members,
                            negated: true,
                        },
                        range,
                    )),
                    None => {
                        self.diags.error(
                            range,
                            codes::INVALID_ELEMENT,
                            "'~' can only be applied to a set of single tokens or characters",
                        );
                        None
                    }
                }
            }
            parser::Element::Action(_) => Some(Element::new(ElementKind::Action, range)),
            parser::Element::Predicate(_) => Some(Element::new(ElementKind::Predicate, range)),
        }
    }

    fn lexer_only(&mut self, range: TextRange, what: &str) -> bool {
        if !self.in_lexer {
            self.diags.error(
                range,
                codes::INVALID_ELEMENT,
                format!("{what} are only allowed in lexer rules"),
            );
        }
        self.in_lexer
    }

    /// Members of a block that collapses into a set, if it does
    fn as_set(&self, alts: &[Alternative]) -> Option<Vec<Element>> {
        if alts.len() < 2 {
            return None;
        }
        self.as_set_members(alts)
    }

    fn as_set_members(&self, alts: &[Alternative]) -> Option<Vec<Element>> {
        alts.iter()
            .map(|alt| match alt.elements.as_slice() {
                [el] if alt.commands.is_empty() && self.is_set_member(el) => Some(el.clone()),
                _ => None,
            })
            .collect()
    }

    fn is_set_member(&self, element: &Element) -> bool {
        match &element.kind {
            ElementKind::StringLiteral { chars, .. } => !self.in_lexer || chars.len() == 1,
            ElementKind::TokenRef { .. } => !self.in_lexer,
            ElementKind::Range { .. } | ElementKind::CharSet { .. } => self.in_lexer,
            _ => false,
        }
    }

    fn literal_chars(&mut self, raw: &str, range: TextRange) -> Option<Vec<u32>> {
        let inner = raw
            .strip_prefix('\'')
            .and_then(|s| s.strip_suffix('\''))
            .unwrap_or(raw);
        match unescape(inner, false) {
            Ok(chars) if chars.is_empty() => {
                self.diags.error(
                    range,
                    codes::EMPTY_LITERAL,
                    "string literals cannot be empty",
                );
                None
            }
            Ok(chars) => Some(chars.into_iter().map(|c| c.code_point()).collect()),
            Err(message) => {
                self.report_escape(range, message);
                None
            }
        }
    }

    fn single_char(&mut self, raw: &str, range: TextRange) -> Option<u32> {
        let chars = self.literal_chars(raw, range)?;
        match chars.as_slice() {
            [c] => Some(*c),
            _ => {
                self.diags.error(
                    range,
                    codes::INVALID_LITERAL,
                    format!("range bound {raw} must be a single character"),
                );
                None
            }
        }
    }

    fn char_set(&mut self, raw: &str, range: TextRange) -> Option<IntervalSet> {
        let inner = raw
            .strip_prefix('[')
            .and_then(|s| s.strip_suffix(']'))
            .unwrap_or(raw);
        let items = match unescape(inner, true) {
            Ok(items) => items,
            Err(message) => {
                self.report_escape(range, message);
                return None;
            }
        };
        if items.is_empty() {
            self.diags.error(
                range,
                codes::EMPTY_LITERAL,
                "character sets cannot be empty",
            );
            return None;
        }

        let mut set = IntervalSet::new();
        let mut i = 0;
        while i < items.len() {
            match (items[i], items.get(i + 1), items.get(i + 2)) {
                (SetItem::Char(from), Some(SetItem::Dash), Some(SetItem::Char(to))) => {
                    if from > *to {
                        self.diags.error(
                            range,
                            codes::INVALID_LITERAL,
                            format!("character set range {raw} is reversed"),
                        );
                        return None;
                    }
                    set.add_range(from as i32, *to as i32);
                    i += 3;
                }
                (item, _, _) => {
                    set.add(item.code_point() as i32);
                    i += 1;
                }
            }
        }
        Some(set)
    }

    fn report_escape(&mut self, range: TextRange, message: EscapeError) {
        let code = match message {
            EscapeError::UnicodeProperty => codes::UNSUPPORTED,
            _ => codes::INVALID_LITERAL,
        };
        self.diags.error(range, code, message.to_string());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SetItem {
    Char(u32),
    /// Unescaped `-` inside a character set
    Dash,
}

impl SetItem {
    fn code_point(self) -> u32 {
        match self {
            SetItem::Char(c) => c,
            SetItem::Dash => '-' as u32,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
enum EscapeError {
    #[error("invalid escape sequence \\{0}")]
    Invalid(char),
    #[error("invalid unicode escape")]
    BadUnicode,
    #[error("unicode property escapes are not supported")]
    UnicodeProperty,
    #[error("unterminated escape sequence")]
    Unterminated,
}

fn unescape(text: &str, in_set: bool) -> Result<Vec<SetItem>, EscapeError> {
    let mut out = Vec::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '-' && in_set {
            out.push(SetItem::Dash);
            continue;
        }
        if c != '\\' {
            out.push(SetItem::Char(c as u32));
            continue;
        }
        let escaped = chars.next().ok_or(EscapeError::Unterminated)?;
        let value = match escaped {
            'n' => '\n' as u32,
            'r' => '\r' as u32,
            't' => '\t' as u32,
            'b' => '\u{8}' as u32,
            'f' => '\u{c}' as u32,
            '\\' | '\'' | '"' => escaped as u32,
            ']' | '-' | '[' if in_set => escaped as u32,
            'p' | 'P' => return Err(EscapeError::UnicodeProperty),
            'u' => {
                let digits: String = if chars.peek() == Some(&'{') {
                    chars.next();
                    let digits: String = chars.by_ref().take_while(|c| *c != '}').collect();
                    digits
                } else {
                    chars.by_ref().take(4).collect()
                };
                let value =
                    u32::from_str_radix(&digits, 16).map_err(|_| EscapeError::BadUnicode)?;
                if digits.is_empty() || value > MAX_CHAR as u32 {
                    return Err(EscapeError::BadUnicode);
                }
                value
            }
            other => return Err(EscapeError::Invalid(other)),
        };
        out.push(SetItem::Char(value));
    }
    Ok(out)
}
