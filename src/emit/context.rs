//! Traversal state of the emitter.

use rustc_hash::FxHashSet;

use crate::{
    emit::ast::{Block, Statement},
    utils::graph::NodeId,
};

/// State threaded through one method traversal.
///
/// Each follow stack holds the node where the innermost enclosing construct
/// of that sort continues; reaching the top of any stack ends the current
/// branch. The stacks start with a `None` sentinel so `top` never fails.
#[derive(Debug)]
pub struct EmitContext {
    /// Nodes already emitted; return nodes may repeat
    pub visited: FxHashSet<NodeId>,
    /// Follows of the enclosing conditionals
    pub if_follow: Vec<Option<NodeId>>,
    /// Follows of the enclosing switches
    pub switch_follow: Vec<Option<NodeId>>,
    /// Follows of the enclosing loops
    pub loop_follow: Vec<Option<NodeId>>,
    /// Latches of the enclosing post-tested loops
    pub latch: Vec<Option<NodeId>>,
    /// Follows of the enclosing try statements
    pub try_follow: Vec<Option<NodeId>>,
    /// Where `continue` leads in the enclosing loops: the header, or the
    /// latch of a post-tested loop
    pub loop_continue: Vec<Option<NodeId>>,
    /// Already emitted nodes reached again outside any construct
    pub goto_targets: FxHashSet<NodeId>,
    /// Nodes printed with a label in front
    pub labels: FxHashSet<NodeId>,
    /// The case emitted after the current one
    pub next_case: Option<NodeId>,
    /// Whether the current case needs a closing `break`
    pub need_break: bool,
    /// Statement lists under construction, innermost last
    blocks: Vec<Vec<Statement>>,
}

impl Default for EmitContext {
    fn default() -> Self {
        EmitContext {
            visited: FxHashSet::default(),
            if_follow: vec![None],
            switch_follow: vec![None],
            loop_follow: vec![None],
            latch: vec![None],
            try_follow: vec![None],
            loop_continue: vec![None],
            goto_targets: FxHashSet::default(),
            labels: FxHashSet::default(),
            next_case: None,
            need_break: true,
            blocks: Vec::new(),
        }
    }
}

fn top(stack: &[Option<NodeId>]) -> Option<NodeId> {
    stack.last().copied().flatten()
}

impl EmitContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Innermost loop follow.
    #[must_use]
    pub fn loop_follow(&self) -> Option<NodeId> {
        top(&self.loop_follow)
    }

    /// Returns `true` when reaching `node` means `continue` in the innermost
    /// loop, rather than ending a construct nested inside it.
    #[must_use]
    pub fn is_continue(&self, node: NodeId) -> bool {
        top(&self.loop_continue) == Some(node)
            && [&self.if_follow, &self.switch_follow, &self.try_follow]
                .iter()
                .all(|stack| top(stack) != Some(node))
    }

    /// Returns `true` when `node` is where an enclosing construct continues.
    #[must_use]
    pub fn is_sentinel(&self, node: NodeId) -> bool {
        [
            &self.if_follow,
            &self.switch_follow,
            &self.loop_follow,
            &self.latch,
            &self.try_follow,
        ]
        .iter()
        .any(|stack| top(stack) == Some(node))
    }

    /// Opens a statement list.
    pub fn open(&mut self) {
        self.blocks.push(Vec::new());
    }

    /// Closes the innermost statement list.
    pub fn close(&mut self) -> Block {
        Block {
            statements: self.blocks.pop().unwrap_or_default(),
        }
    }

    /// Appends to the innermost statement list.
    pub fn add(&mut self, stmt: Statement) {
        if let Some(block) = self.blocks.last_mut() {
            block.push(stmt);
        }
    }
}
