//! Temp-dir grammar files and ready-to-query sessions.

use std::fs;
use std::path::PathBuf;

use g4preview::grammar::{GrammarCompiler, LoadOutcome};
use g4preview::{Interpreter, ParseResult, PreviewSession, SessionConfig, SessionEvent};
use tempfile::TempDir;

/// A temporary directory holding grammar files
pub struct GrammarDir {
    dir: TempDir,
}

impl GrammarDir {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create temp dir"),
        }
    }

    /// Write (or overwrite) `name` and return its path
    pub fn write(&self, name: &str, text: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, text).expect("write grammar file");
        path
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn load(&self, name: &str) -> LoadOutcome {
        GrammarCompiler::new().load(&self.path(name))
    }

    /// Load `name` and run `input` from `start`, expecting a result
    pub fn run(&self, name: &str, start: &str, input: &str) -> ParseResult {
        Interpreter::default()
            .run(&self.load(name), start, input)
            .expect("grammar loads and start rule exists")
    }

    /// Session over `name` with the grammar loaded, `start` chosen and
    /// `input` parsed
    pub fn session(&self, name: &str, start: &str, input: &str) -> PreviewSession {
        let session = PreviewSession::new(self.path(name), SessionConfig::default());
        session.handle(SessionEvent::GrammarChanged);
        session.handle(SessionEvent::StartRuleChanged(start.into()));
        session.handle(SessionEvent::InputChanged(input.to_string()));
        session
    }
}

/// Tree of `result` in LISP form, rule names from the grammar in `outcome`
pub fn sexpr(outcome: &LoadOutcome, result: &ParseResult) -> String {
    let pair = outcome.pair().expect("grammar loads");
    result.to_sexpr(&pair.parser)
}
