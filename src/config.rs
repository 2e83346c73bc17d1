//! Session and interpreter options

/// Limits applied to one interpreter run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterpreterOptions {
    /// Deepest rule-invocation stack before the parse stops with an error
    pub max_rule_depth: usize,
    /// Most tokens a single prediction may look ahead before settling on
    /// the lowest remaining alternative
    pub max_prediction_lookahead: usize,
}

impl Default for InterpreterOptions {
    fn default() -> Self {
        Self {
            max_rule_depth: 1000,
            max_prediction_lookahead: 10_000,
        }
    }
}

impl InterpreterOptions {
    pub fn with_max_rule_depth(mut self, depth: usize) -> Self {
        self.max_rule_depth = depth;
        self
    }

    pub fn with_max_prediction_lookahead(mut self, tokens: usize) -> Self {
        self.max_prediction_lookahead = tokens.max(1);
        self
    }
}

/// Options for a [`PreviewSession`](crate::ide::PreviewSession)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Parse the current input again after a successful grammar reload
    pub reparse_on_grammar_change: bool,
    pub interpreter: InterpreterOptions,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reparse_on_grammar_change: true,
            interpreter: InterpreterOptions::default(),
        }
    }
}

impl SessionConfig {
    pub fn with_reparse_on_grammar_change(mut self, reparse: bool) -> Self {
        self.reparse_on_grammar_change = reparse;
        self
    }

    pub fn with_interpreter(mut self, interpreter: InterpreterOptions) -> Self {
        self.interpreter = interpreter;
        self
    }
}
