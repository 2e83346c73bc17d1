//! PreviewSession: one grammar file, its current compile, and the latest
//! parse of the sample input.
//!
//! The session owns the mutable request state (input text, start rule) and
//! publishes immutable snapshots. Queries go through [`PreviewView`], a
//! cheap handle on one snapshot, so every answer a caller gets from one view
//! comes from the same grammar and the same parse.
//!
//! ```ignore
//! let session = PreviewSession::new("Expr.g4", SessionConfig::default());
//! session.handle(SessionEvent::GrammarChanged);
//! session.handle(SessionEvent::StartRuleChanged("stat".into()));
//! session.handle(SessionEvent::InputChanged("x = 1 ;".into()));
//!
//! let view = session.view();
//! let token = view.token_at(0.into());
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use smol_str::SmolStr;
use text_size::{TextRange, TextSize};

use super::region_index::RegionIndex;
use crate::config::SessionConfig;
use crate::grammar::{
    GrammarCompiler, GrammarDefinition, GrammarDiagnostic, GrammarPair, LoadOutcome,
};
use crate::interp::{Interpreter, NodeId, ParseResult, RunError, Scan, SyntaxError, Token};

/// Something the editor changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The grammar file (or its counterpart) changed on disk
    GrammarChanged,
    InputChanged(String),
    StartRuleChanged(SmolStr),
}

/// Where the grammar half of the session stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GrammarStatus {
    /// Nothing loaded yet
    Unbound,
    Loading,
    Ready,
    Invalid,
}

/// Where the parse half of the session stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseStatus {
    /// No parse requested since the grammar was (re)loaded
    Idle,
    Parsing,
    Parsed,
    Failed(RunError),
}

/// A compiled pair and the index that maps its states back to source
#[derive(Debug)]
pub struct LoadedGrammar {
    pub pair: GrammarPair,
    pub regions: RegionIndex,
}

impl LoadedGrammar {
    fn new(pair: GrammarPair) -> Self {
        let regions = RegionIndex::build(&pair.parser);
        Self { pair, regions }
    }

    /// The definition holding the parser rules (the combined grammar itself,
    /// or the parser half of a split pair)
    pub fn parser(&self) -> &GrammarDefinition {
        &self.pair.parser
    }
}

/// Everything published by the last completed compile and parse
#[derive(Debug, Clone)]
struct Snapshot {
    /// Compile request this grammar state belongs to
    grammar_generation: u64,
    grammar_status: GrammarStatus,
    grammar: Option<Arc<LoadedGrammar>>,
    diagnostics: Arc<[GrammarDiagnostic]>,
    parse_status: ParseStatus,
    result: Option<Arc<ParseResult>>,
}

impl Snapshot {
    fn unbound() -> Self {
        Self {
            grammar_generation: 0,
            grammar_status: GrammarStatus::Unbound,
            grammar: None,
            diagnostics: Arc::from([]),
            parse_status: ParseStatus::Idle,
            result: None,
        }
    }
}

/// Where in a grammar file something was declared
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GrammarLocation {
    pub path: PathBuf,
    pub offset: TextSize,
}

/// A token's leaf and the rule node holding it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnclosingNode {
    pub leaf: NodeId,
    pub parent: Option<NodeId>,
}

/// Input covered by the rule around the cursor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRegion {
    pub rule: usize,
    pub span: TextRange,
    /// Rule names from the start rule down to `rule`
    pub breadcrumb: Vec<SmolStr>,
}

#[derive(Debug, Default)]
struct Request {
    input: Arc<str>,
    start_rule: Option<SmolStr>,
}

struct ParseRequest {
    generation: u64,
    input: Arc<str>,
    start_rule: Option<SmolStr>,
}

/// Owns the compile and parse state for one grammar file and publishes
/// immutable snapshots of it.
pub struct PreviewSession {
    path: PathBuf,
    config: SessionConfig,
    compiler: GrammarCompiler,
    request: Mutex<Request>,
    compile_lock: Mutex<()>,
    parse_lock: Mutex<()>,
    grammar_generation: AtomicU64,
    parse_generation: AtomicU64,
    compiles: AtomicU64,
    snapshot: RwLock<Arc<Snapshot>>,
}

impl PreviewSession {
    /// A session for the grammar at `path`. Nothing is read until the first
    /// [`SessionEvent::GrammarChanged`].
    pub fn new(path: impl Into<PathBuf>, config: SessionConfig) -> Self {
        Self {
            path: path.into(),
            config,
            compiler: GrammarCompiler::new(),
            request: Mutex::new(Request::default()),
            compile_lock: Mutex::new(()),
            parse_lock: Mutex::new(()),
            grammar_generation: AtomicU64::new(0),
            parse_generation: AtomicU64::new(0),
            compiles: AtomicU64::new(0),
            snapshot: RwLock::new(Arc::new(Snapshot::unbound())),
        }
    }

    /// Grammar file this session watches
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Options the session was created with
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Number of times the compiler actually ran
    pub fn compile_count(&self) -> u64 {
        self.compiles.load(Ordering::SeqCst)
    }

    /// React to an editor change. Blocks until the resulting compile or
    /// parse has finished (or was superseded).
    pub fn handle(&self, event: SessionEvent) {
        match event {
            SessionEvent::GrammarChanged => self.reload(),
            SessionEvent::InputChanged(text) => {
                let request = self.next_parse(|r| r.input = Arc::from(text));
                self.parse(request);
            }
            SessionEvent::StartRuleChanged(rule) => {
                let request = self.next_parse(|r| r.start_rule = Some(rule));
                self.parse(request);
            }
        }
    }

    /// The last published snapshot. Later events never change a view that
    /// was already handed out.
    pub fn view(&self) -> PreviewView {
        PreviewView {
            snapshot: Arc::clone(&self.snapshot.read()),
        }
    }

    fn reload(&self) {
        let generation = self.grammar_generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.publish_grammar(generation, GrammarStatus::Loading, None, Arc::from([]));

        let outcome = {
            let _compiling = self.compile_lock.lock();
            if self.grammar_generation.load(Ordering::SeqCst) != generation {
                tracing::debug!(generation, "compile superseded before it started");
                return;
            }
            self.compiles.fetch_add(1, Ordering::SeqCst);
            self.compiler.load(&self.path)
        };

        let ready = match outcome {
            LoadOutcome::Ready(pair) => {
                let diagnostics = Arc::from(pair.warnings.as_slice());
                let grammar = Arc::new(LoadedGrammar::new(pair));
                self.publish_grammar(generation, GrammarStatus::Ready, Some(grammar), diagnostics)
            }
            LoadOutcome::Invalid(diagnostics) => {
                self.publish_grammar(
                    generation,
                    GrammarStatus::Invalid,
                    None,
                    Arc::from(diagnostics),
                );
                false
            }
        };
        if ready && self.config.reparse_on_grammar_change {
            let request = self.next_parse(|_| {});
            self.parse(request);
        }
    }

    /// Replace the grammar half of the snapshot. Any parse is dropped with
    /// the grammar it was made from.
    fn publish_grammar(
        &self,
        generation: u64,
        status: GrammarStatus,
        grammar: Option<Arc<LoadedGrammar>>,
        diagnostics: Arc<[GrammarDiagnostic]>,
    ) -> bool {
        let mut current = self.snapshot.write();
        if self.grammar_generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(generation, ?status, "discarding stale grammar");
            return false;
        }
        tracing::debug!(path = %self.path.display(), generation, ?status, "grammar published");
        *current = Arc::new(Snapshot {
            grammar_generation: generation,
            grammar_status: status,
            grammar,
            diagnostics,
            parse_status: ParseStatus::Idle,
            result: None,
        });
        true
    }

    fn next_parse(&self, update: impl FnOnce(&mut Request)) -> ParseRequest {
        let mut request = self.request.lock();
        update(&mut request);
        ParseRequest {
            generation: self.parse_generation.fetch_add(1, Ordering::SeqCst) + 1,
            input: Arc::clone(&request.input),
            start_rule: request.start_rule.clone(),
        }
    }

    fn parse(&self, request: ParseRequest) {
        let snapshot = Arc::clone(&self.snapshot.read());
        let grammar_generation = snapshot.grammar_generation;
        let grammar = match snapshot.grammar_status {
            GrammarStatus::Ready => match &snapshot.grammar {
                Some(grammar) => Arc::clone(grammar),
                None => return,
            },
            GrammarStatus::Invalid => {
                tracing::debug!("grammar invalid, parse short-circuited");
                self.publish_parse(
                    &request,
                    grammar_generation,
                    ParseStatus::Failed(RunError::GrammarInvalid),
                    None,
                );
                return;
            }
            GrammarStatus::Unbound | GrammarStatus::Loading => return,
        };
        let start_rule = match &request.start_rule {
            Some(rule) => rule.clone(),
            None => match grammar.parser().rule_names().next() {
                Some(first) => SmolStr::new(first),
                None => return,
            },
        };

        let _parsing = self.parse_lock.lock();
        if self.parse_generation.load(Ordering::SeqCst) != request.generation {
            tracing::trace!(generation = request.generation, "parse superseded before it started");
            return;
        }
        self.update_parse(&request, grammar_generation, |next| {
            next.parse_status = ParseStatus::Parsing;
        });

        let interpreter = Interpreter::new(self.config.interpreter.clone());
        match interpreter.run_pair(&grammar.pair, &start_rule, &request.input) {
            Ok(result) => {
                self.publish_parse(
                    &request,
                    grammar_generation,
                    ParseStatus::Parsed,
                    Some(Arc::new(result)),
                );
            }
            Err(err) => {
                tracing::info!(%err, "parse failed");
                self.publish_parse(&request, grammar_generation, ParseStatus::Failed(err), None);
            }
        }
    }

    fn publish_parse(
        &self,
        request: &ParseRequest,
        grammar_generation: u64,
        status: ParseStatus,
        result: Option<Arc<ParseResult>>,
    ) {
        self.update_parse(request, grammar_generation, |next| {
            next.parse_status = status;
            next.result = result;
        });
    }

    /// Apply `update` unless a newer parse or a different grammar has been
    /// requested since `request` was made
    fn update_parse(
        &self,
        request: &ParseRequest,
        grammar_generation: u64,
        update: impl FnOnce(&mut Snapshot),
    ) {
        let mut current = self.snapshot.write();
        if self.parse_generation.load(Ordering::SeqCst) != request.generation
            || current.grammar_generation != grammar_generation
        {
            tracing::trace!(generation = request.generation, "discarding stale parse");
            return;
        }
        let mut next = Snapshot::clone(&current);
        update(&mut next);
        *current = Arc::new(next);
    }
}

/// Read-only queries over one snapshot
#[derive(Debug, Clone)]
pub struct PreviewView {
    snapshot: Arc<Snapshot>,
}

impl PreviewView {
    /// Status of the grammar this view was taken from
    pub fn grammar_status(&self) -> GrammarStatus {
        self.snapshot.grammar_status
    }

    pub fn parse_status(&self) -> &ParseStatus {
        &self.snapshot.parse_status
    }

    /// Errors of an invalid grammar, or warnings of a loaded one
    pub fn diagnostics(&self) -> &[GrammarDiagnostic] {
        &self.snapshot.diagnostics
    }

    /// Compiled grammar, present only while the status is `Ready`
    pub fn grammar(&self) -> Option<&LoadedGrammar> {
        self.snapshot.grammar.as_deref()
    }

    /// Last completed parse against the current grammar
    pub fn result(&self) -> Option<&ParseResult> {
        self.snapshot.result.as_deref()
    }

    /// Token whose span contains `offset`, on any channel
    pub fn token_at(&self, offset: TextSize) -> Option<&Token> {
        self.result()?.tokens.token_at(offset)
    }

    /// Token at `offset`, falling back to the nearest parser-visible token
    /// in the direction of `scan`
    pub fn token_near(&self, offset: TextSize, scan: Scan) -> Option<Token> {
        self.result()?.tokens.token_near(offset, scan)
    }

    /// First syntax error whose span contains `offset`
    pub fn error_at(&self, offset: TextSize) -> Option<&SyntaxError> {
        self.result()?.error_at(offset)
    }

    /// Tree leaf for `token` and its parent rule node
    pub fn enclosing_node(&self, token: &Token) -> Option<EnclosingNode> {
        let tree = &self.result()?.tree;
        let leaf = tree.leaf_for_token(token.index)?;
        Some(EnclosingNode {
            leaf,
            parent: tree.parent(leaf),
        })
    }

    /// Names of the rules active when `token` was matched, innermost first
    pub fn rule_invocation_stack(&self, token: &Token) -> Vec<SmolStr> {
        let Some(node) = self.enclosing_node(token) else {
            return Vec::new();
        };
        self.rule_names(node.leaf)
    }

    /// Rule node around `offset` with its input span and rule breadcrumb
    pub fn parse_region(&self, offset: TextSize) -> Option<ParseRegion> {
        let result = self.result()?;
        let token = result.tokens.token_at(offset)?;
        let leaf = result.tree.leaf_for_token(token.index)?;
        let rule_node = result.tree.enclosing_rule(leaf)?;
        let node = result.tree.node(rule_node);
        let mut breadcrumb = self.rule_names(leaf);
        breadcrumb.reverse();
        Some(ParseRegion {
            rule: node.rule()?,
            span: node.span?,
            breadcrumb,
        })
    }

    /// One-line description of the token under the cursor
    pub fn token_info(&self, offset: TextSize) -> Option<String> {
        let token = self.token_at(offset)?;
        Some(token.info(&self.grammar()?.parser().vocabulary))
    }

    /// Grammar text the parser matched `token` with
    pub fn grammar_location_of(&self, token: &Token) -> Option<GrammarLocation> {
        let grammar = self.grammar()?;
        let state = self.result()?.state_of_token(token.index)?;
        let region = grammar.regions.get(state)?;
        Some(GrammarLocation {
            path: grammar.parser().path.clone(),
            offset: region.offset(),
        })
    }

    /// Name of the rule with index `rule` in the parser grammar
    pub fn grammar_location_of_rule(&self, rule: usize) -> Option<GrammarLocation> {
        let parser = self.grammar()?.parser();
        let rule = parser.rule_by_index(rule)?;
        Some(GrammarLocation {
            path: parser.path.clone(),
            offset: rule.name_range.start(),
        })
    }

    /// Declaration of the rule whose node encloses `offset`
    pub fn grammar_location_of_enclosing_rule(&self, offset: TextSize) -> Option<GrammarLocation> {
        let region = self.parse_region(offset)?;
        self.grammar_location_of_rule(region.rule)
    }

    fn rule_names(&self, node: NodeId) -> Vec<SmolStr> {
        let (Some(result), Some(grammar)) = (self.result(), self.grammar()) else {
            return Vec::new();
        };
        result
            .tree
            .rule_invocation_stack(node)
            .into_iter()
            .filter_map(|rule| grammar.parser().rule_by_index(rule))
            .map(|rule| rule.name.clone())
            .collect()
    }
}
