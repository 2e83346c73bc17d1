//! Parse tree built by the parser interpreter.
//!
//! Nodes live in an arena and link to their parent, so the preview layer can
//! walk from a token leaf up to the start rule without re-parsing.

use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use text_size::TextRange;

use super::token::{TokenStream, escape_ws};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Leaf created by error recovery
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorLeaf {
    /// Input token consumed while resynchronizing
    Consumed(usize),
    /// Token the parser pretended to see. `at` is the stream index of the
    /// token it was conjured in front of.
    Conjured { ty: i32, at: usize, text: SmolStr },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Rule { rule: usize },
    Token(usize),
    Error(ErrorLeaf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Input covered by the node's tokens; `None` for a rule that matched
    /// nothing
    pub span: Option<TextRange>,
}

impl Node {
    pub fn rule(&self) -> Option<usize> {
        match self.kind {
            NodeKind::Rule { rule } => Some(rule),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.kind, NodeKind::Error(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParseTree {
    nodes: Vec<Node>,
    root: Option<NodeId>,
    /// First leaf created for each consumed token
    leaves: FxHashMap<usize, NodeId>,
}

impl ParseTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// Leaf holding the token with stream index `token`
    pub fn leaf_for_token(&self, token: usize) -> Option<NodeId> {
        self.leaves.get(&token).copied()
    }

    /// `id` and its ancestors, innermost first
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(id), |&n| self.parent(n))
    }

    /// Nearest rule node at or above `id`
    pub fn enclosing_rule(&self, id: NodeId) -> Option<NodeId> {
        self.ancestors(id).find(|&n| self.node(n).rule().is_some())
    }

    /// Rule indexes from the rule enclosing `id` up to the start rule
    pub fn rule_invocation_stack(&self, id: NodeId) -> Vec<usize> {
        self.ancestors(id)
            .filter_map(|n| self.node(n).rule())
            .collect()
    }

    pub(crate) fn add_rule(&mut self, rule: usize, parent: Option<NodeId>) -> NodeId {
        let id = self.push(NodeKind::Rule { rule }, parent);
        if parent.is_none() {
            self.root = Some(id);
        }
        id
    }

    pub(crate) fn add_token(&mut self, parent: NodeId, token: usize) -> NodeId {
        let id = self.push(NodeKind::Token(token), Some(parent));
        self.leaves.entry(token).or_insert(id);
        id
    }

    pub(crate) fn add_error(&mut self, parent: NodeId, leaf: ErrorLeaf) -> NodeId {
        let consumed = match leaf {
            ErrorLeaf::Consumed(token) => Some(token),
            ErrorLeaf::Conjured { .. } => None,
        };
        let id = self.push(NodeKind::Error(leaf), Some(parent));
        if let Some(token) = consumed {
            self.leaves.entry(token).or_insert(id);
        }
        id
    }

    /// Put a new `rule` node in place of `child`, with `child` as its only
    /// child. Used when a left-recursive rule grows its operand.
    pub(crate) fn wrap(&mut self, child: NodeId, rule: usize) -> NodeId {
        let parent = self.node(child).parent;
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind: NodeKind::Rule { rule },
            parent,
            children: vec![child],
            span: None,
        });
        self.nodes[child.index()].parent = Some(id);
        match parent {
            Some(p) => {
                for slot in &mut self.nodes[p.index()].children {
                    if *slot == child {
                        *slot = id;
                    }
                }
            }
            None => self.root = Some(id),
        }
        id
    }

    fn push(&mut self, kind: NodeKind, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind,
            parent,
            children: Vec::new(),
            span: None,
        });
        if let Some(p) = parent {
            self.nodes[p.index()].children.push(id);
        }
        id
    }

    /// Compute node spans bottom-up once the tree is complete
    pub(crate) fn compute_spans(&mut self, tokens: &TokenStream) {
        let Some(root) = self.root else {
            return;
        };
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.node(id).children.iter().copied());
        }
        for &id in order.iter().rev() {
            let span = match &self.node(id).kind {
                NodeKind::Token(t) | NodeKind::Error(ErrorLeaf::Consumed(t)) => {
                    tokens.get(*t).map(|tok| tok.range)
                }
                NodeKind::Error(ErrorLeaf::Conjured { at, .. }) => {
                    tokens.get(*at).map(|tok| TextRange::empty(tok.start()))
                }
                NodeKind::Rule { .. } => self
                    .node(id)
                    .children
                    .iter()
                    .filter_map(|c| self.node(*c).span)
                    .reduce(|a, b| a.cover(b)),
            };
            self.nodes[id.index()].span = span;
        }
    }

    /// Text of a leaf as it appears in a printed tree
    pub fn leaf_text(&self, id: NodeId, tokens: &TokenStream) -> Option<String> {
        match &self.node(id).kind {
            NodeKind::Rule { .. } => None,
            NodeKind::Token(t) | NodeKind::Error(ErrorLeaf::Consumed(t)) => {
                tokens.get(*t).map(|tok| escape_ws(&tok.text))
            }
            NodeKind::Error(ErrorLeaf::Conjured { text, .. }) => Some(escape_ws(text)),
        }
    }

    /// LISP-style rendering: `(rule child child ...)`, leaves as their text
    pub fn to_sexpr(&self, rule_name: impl Fn(usize) -> String, tokens: &TokenStream) -> String {
        let Some(root) = self.root else {
            return String::new();
        };
        let mut out = String::new();
        self.write_sexpr(root, &rule_name, tokens, &mut out);
        out
    }

    fn write_sexpr(
        &self,
        id: NodeId,
        rule_name: &impl Fn(usize) -> String,
        tokens: &TokenStream,
        out: &mut String,
    ) {
        let node = self.node(id);
        let NodeKind::Rule { rule } = node.kind else {
            out.push_str(&self.leaf_text(id, tokens).unwrap_or_default());
            return;
        };
        if node.children.is_empty() {
            out.push_str(&rule_name(rule));
            return;
        }
        out.push('(');
        out.push_str(&rule_name(rule));
        for &child in &node.children {
            out.push(' ');
            self.write_sexpr(child, rule_name, tokens, out);
        }
        out.push(')');
    }
}
