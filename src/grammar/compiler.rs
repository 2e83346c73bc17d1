//! Grammar loading: file composition, vocabulary, checks and automata.
//!
//! A combined grammar `X.g4` yields an implicit lexer `XLexer` and a parser
//! `XParser` from the same source. A split grammar is completed with the
//! counterpart file derived from its name (`XParser.g4` <-> `XLexer.g4`).
//! The lexer side is always compiled first and its vocabulary becomes the
//! starting vocabulary of the parser side.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use smol_str::SmolStr;
use text_size::TextRange;
use thiserror::Error;

use super::checks::{self, RuleTable};
use super::diagnostics::{DiagnosticCollector, GrammarDiagnostic, codes};
use super::left_recursion;
use super::lower::{GrammarFileModel, lower};
use super::model::{Alternative, Element, ElementKind, GrammarKind, Rule};
use super::vocabulary::Vocabulary;
use crate::atn::{self, Atn, AtnKind};
use crate::parser::{self as syntax, AstNode, GrammarFile};

/// How the lexer and parser of a pair were obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Composition {
    /// Both halves come from one combined grammar file
    Combined,
    /// Separate `XLexer.g4` and `XParser.g4` files
    Split,
}

/// One compiled recognizer: either the lexer or the parser half of a pair
#[derive(Debug, Clone)]
pub struct GrammarDefinition {
    pub path: PathBuf,
    /// Recognizer name, e.g. `ExprLexer`
    pub name: SmolStr,
    /// Declared type of the file this definition was compiled from
    pub kind: GrammarKind,
    pub rules: IndexMap<SmolStr, Rule>,
    pub vocabulary: Vocabulary,
    pub atn: Atn,
    pub source: Arc<str>,
}

impl GrammarDefinition {
    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.rules.get(name)
    }

    pub fn rule_by_index(&self, index: usize) -> Option<&Rule> {
        self.rules.get_index(index).map(|(_, rule)| rule)
    }

    pub fn rule_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.rules.keys().map(SmolStr::as_str)
    }
}

/// Lexer and parser compiled together; always replaced as a unit
#[derive(Debug, Clone)]
pub struct GrammarPair {
    pub lexer: Arc<GrammarDefinition>,
    pub parser: Arc<GrammarDefinition>,
    pub composition: Composition,
    pub warnings: Vec<GrammarDiagnostic>,
}

/// Result of loading one grammar file
#[derive(Debug, Clone)]
pub enum LoadOutcome {
    Ready(GrammarPair),
    Invalid(Vec<GrammarDiagnostic>),
}

impl LoadOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, LoadOutcome::Ready(_))
    }

    pub fn pair(&self) -> Option<&GrammarPair> {
        match self {
            LoadOutcome::Ready(pair) => Some(pair),
            LoadOutcome::Invalid(_) => None,
        }
    }

    /// Errors of an invalid load, or warnings of a successful one
    pub fn diagnostics(&self) -> &[GrammarDiagnostic] {
        match self {
            LoadOutcome::Ready(pair) => &pair.warnings,
            LoadOutcome::Invalid(diagnostics) => diagnostics,
        }
    }
}

/// Failures that stop a load before any grammar is compiled
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read grammar {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot derive the counterpart of {} from its file name", .0.display())]
    NoCounterpartName(PathBuf),
    #[error("counterpart grammar {} does not exist", .0.display())]
    MissingCounterpart(PathBuf),
    #[error(
        "{} declares a {} grammar, expected a {} grammar",
        .path.display(),
        .found.as_str(),
        .expected.as_str()
    )]
    WrongCounterpartKind {
        path: PathBuf,
        found: GrammarKind,
        expected: GrammarKind,
    },
}

impl LoadError {
    pub fn code(&self) -> &'static str {
        match self {
            LoadError::Io { .. } => codes::IO_ERROR,
            LoadError::NoCounterpartName(_) => codes::NO_COUNTERPART_NAME,
            LoadError::MissingCounterpart(_) => codes::MISSING_COUNTERPART,
            LoadError::WrongCounterpartKind { .. } => codes::WRONG_COUNTERPART_KIND,
        }
    }

    /// Report against the file the load was requested for
    pub fn to_diagnostic(&self, file: &Path) -> GrammarDiagnostic {
        GrammarDiagnostic::error(file, TextRange::default(), self.code(), self.to_string())
    }
}

/// A grammar file read from disk, parsed and lowered
struct SourceFile {
    path: PathBuf,
    text: Arc<str>,
    kind: Option<GrammarKind>,
    model: Option<GrammarFileModel>,
    diags: DiagnosticCollector,
}

impl SourceFile {
    fn read(path: &Path) -> Result<Self, LoadError> {
        let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::parse(path, Arc::from(text)))
    }

    fn parse(path: &Path, text: Arc<str>) -> Self {
        let mut diags = DiagnosticCollector::new(path, &text);
        let parse = syntax::parse(&text);
        for error in &parse.errors {
            diags.error(error.range, codes::SYNTAX_ERROR, error.message.clone());
        }
        let model = GrammarFile::cast(parse.syntax()).and_then(|file| {
            warn_ignored_options(&file, &mut diags);
            lower(&file, &mut diags)
        });
        if model.is_none() && !diags.has_errors() {
            diags.error(
                TextRange::default(),
                codes::SYNTAX_ERROR,
                "missing grammar declaration",
            );
        }
        if let Some(model) = &model {
            check_file_name(path, model, &mut diags);
        }
        Self {
            path: path.to_path_buf(),
            text,
            kind: model.as_ref().map(|m| m.kind),
            model,
            diags,
        }
    }
}

fn warn_ignored_options(file: &GrammarFile, diags: &mut DiagnosticCollector) {
    for option in file.options().flat_map(|spec| spec.options().collect::<Vec<_>>()) {
        let Some(name) = option.name() else {
            continue;
        };
        if name.text() == "caseInsensitive" {
            diags.warning(
                option.syntax().text_range(),
                codes::IGNORED_OPTION,
                "option caseInsensitive is ignored by the interpreter",
            );
        }
    }
}

fn check_file_name(path: &Path, model: &GrammarFileModel, diags: &mut DiagnosticCollector) {
    let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
        return;
    };
    if stem != model.name {
        diags.error(
            model.name_range,
            codes::NAME_MISMATCH,
            format!("grammar name {} and file name {stem} differ", model.name),
        );
    }
}

/// Derive the other half of a split grammar by swapping the first
/// `Parser`/`Lexer` in the file name
pub fn counterpart_path(path: &Path, kind: GrammarKind) -> Option<PathBuf> {
    let file_name = path.file_name()?.to_str()?;
    let (from, to) = match kind {
        GrammarKind::Parser => ("Parser", "Lexer"),
        GrammarKind::Lexer => ("Lexer", "Parser"),
        GrammarKind::Combined => return None,
    };
    if !file_name.contains(from) {
        return None;
    }
    Some(path.with_file_name(file_name.replacen(from, to, 1)))
}

/// Compiles grammar files into [`GrammarPair`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct GrammarCompiler;

impl GrammarCompiler {
    pub fn new() -> Self {
        Self
    }

    /// Load the grammar at `path` together with its counterpart, if split
    pub fn load(&self, path: &Path) -> LoadOutcome {
        tracing::info!(path = %path.display(), "loading grammar");
        let outcome = match SourceFile::read(path) {
            Ok(primary) => self.load_file(primary),
            Err(err) => LoadOutcome::Invalid(vec![err.to_diagnostic(path)]),
        };
        match &outcome {
            LoadOutcome::Ready(pair) => tracing::info!(
                lexer = %pair.lexer.name,
                parser = %pair.parser.name,
                warnings = pair.warnings.len(),
                "grammar ready"
            ),
            LoadOutcome::Invalid(diags) => {
                tracing::info!(errors = diags.len(), "grammar invalid")
            }
        }
        outcome
    }

    /// Compile grammar text that is not (necessarily) on disk. Split
    /// grammars still read their counterpart relative to `path`.
    pub fn load_source(&self, path: &Path, text: &str) -> LoadOutcome {
        self.load_file(SourceFile::parse(path, Arc::from(text)))
    }

    fn load_file(&self, primary: SourceFile) -> LoadOutcome {
        match primary.kind {
            None => LoadOutcome::Invalid(primary.diags.into_diagnostics()),
            Some(GrammarKind::Combined) => compile_combined(primary),
            Some(kind) => match Self::counterpart(&primary.path, kind) {
                Ok(counterpart) => {
                    let (lexer, parser) = if kind == GrammarKind::Lexer {
                        (primary, counterpart)
                    } else {
                        (counterpart, primary)
                    };
                    compile_split(lexer, parser)
                }
                Err(err) => {
                    let mut diagnostics = primary.diags.into_diagnostics();
                    diagnostics.push(err.to_diagnostic(&primary.path));
                    LoadOutcome::Invalid(diagnostics)
                }
            },
        }
    }

    fn counterpart(path: &Path, kind: GrammarKind) -> Result<SourceFile, LoadError> {
        let other = counterpart_path(path, kind)
            .ok_or_else(|| LoadError::NoCounterpartName(path.to_path_buf()))?;
        if !other.is_file() {
            return Err(LoadError::MissingCounterpart(other));
        }
        let file = SourceFile::read(&other)?;
        let expected = match kind {
            GrammarKind::Lexer => GrammarKind::Parser,
            _ => GrammarKind::Lexer,
        };
        match file.kind {
            Some(found) if found != expected => Err(LoadError::WrongCounterpartKind {
                path: other,
                found,
                expected,
            }),
            _ => Ok(file),
        }
    }
}

// ============================================================================
// COMPILATION
// ============================================================================

fn rule_table(rules: impl IntoIterator<Item = Rule>) -> RuleTable {
    rules
        .into_iter()
        .enumerate()
        .map(|(index, mut rule)| {
            rule.index = index;
            (rule.name.clone(), rule)
        })
        .collect()
}

/// A non-fragment lexer rule that is exactly one literal, e.g. `EQ : '=' ;`
fn literal_alias(rule: &Rule) -> Option<&SmolStr> {
    if rule.fragment {
        return None;
    }
    match rule.alts.as_slice() {
        [alt] => match alt.elements.as_slice() {
            [Element {
                kind: ElementKind::StringLiteral { raw, .. },
                ..
            }] => Some(raw),
            _ => None,
        },
        _ => None,
    }
}

/// Literals used in parser rules, first occurrence of each
fn parser_literals<'a>(rules: impl Iterator<Item = &'a Rule>) -> Vec<&'a Element> {
    let mut seen: FxHashSet<&str> = FxHashSet::default();
    let mut literals = Vec::new();
    for rule in rules {
        for element in rule.elements() {
            if let ElementKind::StringLiteral { raw, .. } = &element.kind {
                if seen.insert(raw.as_str()) {
                    literals.push(element);
                }
            }
        }
    }
    literals
}

/// Build the lexer half. `implicit` holds parser literals of a combined
/// grammar that need `T__n` rules.
fn compile_lexer(
    model: &GrammarFileModel,
    implicit: &[&Element],
    diags: &mut DiagnosticCollector,
) -> (RuleTable, Vocabulary) {
    let explicit: Vec<Rule> = model.lexer_rules().cloned().collect();
    let aliased: FxHashSet<SmolStr> = explicit.iter().filter_map(literal_alias).cloned().collect();

    let mut rules: Vec<Rule> = Vec::new();
    for element in implicit {
        let ElementKind::StringLiteral { raw, .. } = &element.kind else {
            continue;
        };
        if aliased.contains(raw) {
            continue;
        }
        let name = SmolStr::new(format!("T__{}", rules.len()));
        rules.push(Rule {
            index: 0,
            name,
            is_lexer: true,
            fragment: false,
            range: element.range,
            name_range: element.range,
            alts: vec![Alternative::new(vec![(*element).clone()], element.range)],
            precedence_rule: false,
        });
    }
    rules.extend(explicit);
    let mut rules = rule_table(rules);

    let mut vocabulary = Vocabulary::new();
    for (name, _) in &model.tokens {
        vocabulary.define_token(name);
    }
    for rule in rules.values().filter(|rule| !rule.fragment) {
        let ty = vocabulary.define_token(&rule.name);
        if let Some(raw) = literal_alias(rule) {
            vocabulary.alias_literal(raw, ty);
        }
    }
    for (name, _) in &model.channels {
        vocabulary.define_channel(name);
    }

    checks::check_references(&rules, diags);
    checks::resolve_commands(&mut rules, &vocabulary, diags);
    checks::check_empty_matches(&rules, diags);
    checks::check_left_recursion(&rules, diags);
    (rules, vocabulary)
}

/// Build the parser half on top of the lexer vocabulary
fn compile_parser(
    model: &GrammarFileModel,
    mut vocabulary: Vocabulary,
    fragments: &FxHashSet<SmolStr>,
    composition: Composition,
    diags: &mut DiagnosticCollector,
) -> (RuleTable, Vocabulary) {
    let mut rules = rule_table(model.parser_rules().cloned());

    if composition == Composition::Split {
        for (name, _) in &model.tokens {
            vocabulary.define_token(name);
        }
    }

    for rule in rules.values() {
        for element in rule.elements() {
            match &element.kind {
                ElementKind::TokenRef { name } if fragments.contains(name) => diags.error(
                    element.range,
                    codes::FRAGMENT_IN_PARSER,
                    format!("fragment rule {name} cannot be referenced from a parser rule"),
                ),
                ElementKind::TokenRef { name } if vocabulary.token_type(name).is_none() => {
                    vocabulary.define_token(name);
                    diags.warning(
                        element.range,
                        codes::IMPLICIT_TOKEN,
                        format!("implicit definition of token {name} in parser"),
                    );
                }
                ElementKind::StringLiteral { raw, .. }
                    if vocabulary.literal_type(raw).is_none() =>
                {
                    diags.error(
                        element.range,
                        codes::UNDEFINED_LITERAL,
                        format!(
                            "cannot create implicit token for string literal {raw} in non-combined grammar"
                        ),
                    )
                }
                _ => {}
            }
        }
    }

    for rule in rules.values_mut() {
        left_recursion::rewrite(rule);
    }

    checks::check_references(&rules, diags);
    checks::check_empty_matches(&rules, diags);
    checks::check_left_recursion(&rules, diags);
    (rules, vocabulary)
}

fn fragment_names(rules: &RuleTable) -> FxHashSet<SmolStr> {
    rules
        .values()
        .filter(|rule| rule.fragment)
        .map(|rule| rule.name.clone())
        .collect()
}

fn definition(
    file: &SourceFile,
    name: SmolStr,
    kind: AtnKind,
    mut rules: RuleTable,
    vocabulary: Vocabulary,
) -> GrammarDefinition {
    let atn = atn::build(kind, &mut rules, &vocabulary);
    GrammarDefinition {
        path: file.path.clone(),
        name,
        kind: file.kind.unwrap_or(GrammarKind::Combined),
        rules,
        vocabulary,
        atn,
        source: file.text.clone(),
    }
}

fn finish(
    diagnostics: Vec<GrammarDiagnostic>,
    build: impl FnOnce() -> (GrammarDefinition, GrammarDefinition),
    composition: Composition,
) -> LoadOutcome {
    if diagnostics.iter().any(GrammarDiagnostic::is_error) {
        return LoadOutcome::Invalid(diagnostics);
    }
    let (lexer, parser) = build();
    LoadOutcome::Ready(GrammarPair {
        lexer: Arc::new(lexer),
        parser: Arc::new(parser),
        composition,
        warnings: diagnostics,
    })
}

fn compile_combined(mut file: SourceFile) -> LoadOutcome {
    let Some(model) = file.model.take() else {
        return LoadOutcome::Invalid(file.diags.into_diagnostics());
    };
    let literals = parser_literals(model.parser_rules());
    let (lexer_rules, lexer_vocab) = compile_lexer(&model, &literals, &mut file.diags);
    let fragments = fragment_names(&lexer_rules);
    let (parser_rules, parser_vocab) = compile_parser(
        &model,
        lexer_vocab.clone(),
        &fragments,
        Composition::Combined,
        &mut file.diags,
    );
    let diagnostics = file.diags.diagnostics().to_vec();
    finish(
        diagnostics,
        || {
            (
                definition(
                    &file,
                    SmolStr::new(format!("{}Lexer", model.name)),
                    AtnKind::Lexer,
                    lexer_rules,
                    lexer_vocab,
                ),
                definition(
                    &file,
                    SmolStr::new(format!("{}Parser", model.name)),
                    AtnKind::Parser,
                    parser_rules,
                    parser_vocab,
                ),
            )
        },
        Composition::Combined,
    )
}

fn compile_split(mut lexer_file: SourceFile, mut parser_file: SourceFile) -> LoadOutcome {
    let (Some(lexer_model), Some(parser_model)) = (lexer_file.model.take(), parser_file.model.take())
    else {
        let mut diagnostics = lexer_file.diags.into_diagnostics();
        diagnostics.extend(parser_file.diags.into_diagnostics());
        return LoadOutcome::Invalid(diagnostics);
    };
    let (lexer_rules, lexer_vocab) = compile_lexer(&lexer_model, &[], &mut lexer_file.diags);
    let fragments = fragment_names(&lexer_rules);
    let (parser_rules, parser_vocab) = compile_parser(
        &parser_model,
        lexer_vocab.clone(),
        &fragments,
        Composition::Split,
        &mut parser_file.diags,
    );
    let mut diagnostics = lexer_file.diags.diagnostics().to_vec();
    diagnostics.extend_from_slice(parser_file.diags.diagnostics());
    finish(
        diagnostics,
        || {
            (
                definition(
                    &lexer_file,
                    lexer_model.name.clone(),
                    AtnKind::Lexer,
                    lexer_rules,
                    lexer_vocab,
                ),
                definition(
                    &parser_file,
                    parser_model.name.clone(),
                    AtnKind::Parser,
                    parser_rules,
                    parser_vocab,
                ),
            )
        },
        Composition::Split,
    )
}
