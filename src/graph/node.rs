//! Graph nodes: a shared header plus a kind payload.

use crate::{
    ir::{Instruction, VarId},
    utils::graph::NodeId,
};

/// Global instruction location. Parameters are defined at negative locations.
pub type Loc = isize;

/// The two targets of a two-way branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Branches {
    /// Taken when the condition holds
    pub on_true: NodeId,
    /// Taken otherwise
    pub on_false: NodeId,
}

impl Branches {
    /// Returns `true` when `node` is one of the targets.
    #[must_use]
    pub fn contains(&self, node: NodeId) -> bool {
        self.on_true == node || self.on_false == node
    }
}

/// Case table of a switch node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SwitchCases {
    /// Literal keys of the payload, in payload order
    pub keys: Vec<i32>,
    /// Targets in successor order; ordered and deduplicated by structuring
    pub cases: Vec<NodeId>,
    /// The fallthrough target taken when no key matches
    pub default: Option<NodeId>,
    /// Keys leading to each distinct target
    pub node_to_case: Vec<(NodeId, Vec<i32>)>,
}

impl SwitchCases {
    /// Keys that lead to `node`.
    #[must_use]
    pub fn keys_of(&self, node: NodeId) -> &[i32] {
        self.node_to_case
            .iter()
            .find(|(n, _)| *n == node)
            .map_or(&[], |(_, keys)| keys.as_slice())
    }

    /// Pairs keys with targets and moves the default out of the case list.
    ///
    /// The successor list starts with the fallthrough target whenever there
    /// are fewer keys than successors; that target is the default. Keys are
    /// then zipped onto the remaining targets and duplicate targets collapse
    /// into one case with several labels.
    pub fn order_cases(&mut self) {
        let mut cases = std::mem::take(&mut self.cases);
        if self.keys.len() < cases.len() && !cases.is_empty() {
            self.default = Some(cases.remove(0));
        }
        self.node_to_case.clear();
        for (key, node) in self.keys.iter().zip(cases.iter()) {
            match self.node_to_case.iter_mut().find(|(n, _)| n == node) {
                Some((_, keys)) => keys.push(*key),
                None => self.node_to_case.push((*node, vec![*key])),
            }
        }
        let mut unique = Vec::with_capacity(cases.len());
        for node in cases {
            if !unique.contains(&node) {
                unique.push(node);
            }
        }
        self.cases = unique;
    }

    fn remap(&mut self, f: &impl Fn(NodeId) -> NodeId) {
        for case in &mut self.cases {
            *case = f(*case);
        }
        self.default = self.default.map(f);
        for (node, _) in &mut self.node_to_case {
            *node = f(*node);
        }
    }
}

/// Two merged conditions (`a && b`, `!a || b`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShortCircuit {
    /// First condition node (removed from the graph, kept in the arena)
    pub first: NodeId,
    /// Second condition node (removed from the graph, kept in the arena)
    pub second: NodeId,
    /// `&&` when set, `||` otherwise
    pub is_and: bool,
    /// Negates the first operand
    pub is_not: bool,
    /// Targets of the combined condition
    pub branches: Branches,
}

/// Loop shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display)]
pub enum LoopType {
    /// `while (c) { ... }`
    #[strum(serialize = "pretest")]
    PreTest,
    /// `do { ... } while (c)`
    #[strum(serialize = "posttest")]
    PostTest,
    /// `while (true) { ... }`
    #[default]
    #[strum(serialize = "endless")]
    Endless,
}

/// Payload of a graph node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Straight-line code with at most one successor
    Statement,
    /// Ends with a `return`
    Return,
    /// Ends with a `throw`
    Throw,
    /// Ends with a two-way branch
    Conditional(Branches),
    /// Ends with a multi-way branch
    Switch(SwitchCases),
    /// Two merged conditionals
    ShortCircuit(ShortCircuit),
    /// Loop header wrapping its original payload
    Loop {
        /// The header's payload before wrapping
        inner: Box<NodeKind>,
        /// Shape of the loop
        loop_type: LoopType,
    },
    /// Protected region starting at `try_start`
    Try {
        /// First node of the protected code
        try_start: NodeId,
        /// Catch nodes in handler order
        catches: Vec<NodeId>,
        /// Node emitted after the whole statement
        follow: Option<NodeId>,
    },
    /// One handler of a try region
    Catch {
        /// First node of the handler code
        catch_start: NodeId,
        /// Variable bound by a leading `move-exception`
        binding: Option<VarId>,
        /// Caught type descriptor
        ty: Option<String>,
    },
}

impl NodeKind {
    /// The payload a loop header wraps, or `self`.
    #[must_use]
    pub fn base(&self) -> &NodeKind {
        match self {
            NodeKind::Loop { inner, .. } => inner.base(),
            kind => kind,
        }
    }

    fn base_mut(&mut self) -> &mut NodeKind {
        match self {
            NodeKind::Loop { inner, .. } => inner.base_mut(),
            kind => kind,
        }
    }

    /// Targets of a two-way branch (plain or short-circuit).
    #[must_use]
    pub fn branches(&self) -> Option<Branches> {
        match self.base() {
            NodeKind::Conditional(b) => Some(*b),
            NodeKind::ShortCircuit(sc) => Some(sc.branches),
            _ => None,
        }
    }

    /// Mutable branch targets.
    pub fn branches_mut(&mut self) -> Option<&mut Branches> {
        match self.base_mut() {
            NodeKind::Conditional(b) => Some(b),
            NodeKind::ShortCircuit(sc) => Some(&mut sc.branches),
            _ => None,
        }
    }

    /// Switch table, also through a loop wrapper.
    #[must_use]
    pub fn switch(&self) -> Option<&SwitchCases> {
        match self.base() {
            NodeKind::Switch(cases) => Some(cases),
            _ => None,
        }
    }

    /// Mutable switch table.
    pub fn switch_mut(&mut self) -> Option<&mut SwitchCases> {
        match self.base_mut() {
            NodeKind::Switch(cases) => Some(cases),
            _ => None,
        }
    }

    /// Conditional or short-circuit, possibly wrapped by a loop.
    #[must_use]
    pub fn is_cond(&self) -> bool {
        self.branches().is_some()
    }

    /// Statement, possibly wrapped by a loop.
    #[must_use]
    pub fn is_stmt(&self) -> bool {
        matches!(self.base(), NodeKind::Statement)
    }

    /// Switch, possibly wrapped by a loop.
    #[must_use]
    pub fn is_switch(&self) -> bool {
        self.switch().is_some()
    }

    /// Return node.
    #[must_use]
    pub fn is_return(&self) -> bool {
        matches!(self.base(), NodeKind::Return)
    }

    /// Loop header wrapper.
    #[must_use]
    pub fn is_loop(&self) -> bool {
        matches!(self, NodeKind::Loop { .. })
    }

    /// Short name used in logs and graph dumps.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Statement => "statement",
            NodeKind::Return => "return",
            NodeKind::Throw => "throw",
            NodeKind::Conditional(_) => "cond",
            NodeKind::Switch(_) => "switch",
            NodeKind::ShortCircuit(_) => "short-circuit",
            NodeKind::Loop { .. } => "loop",
            NodeKind::Try { .. } => "try",
            NodeKind::Catch { .. } => "catch",
        }
    }

    fn remap(&mut self, f: &impl Fn(NodeId) -> NodeId) {
        match self {
            NodeKind::Statement | NodeKind::Return | NodeKind::Throw => {}
            NodeKind::Conditional(b) => {
                b.on_true = f(b.on_true);
                b.on_false = f(b.on_false);
            }
            NodeKind::ShortCircuit(sc) => {
                sc.branches.on_true = f(sc.branches.on_true);
                sc.branches.on_false = f(sc.branches.on_false);
            }
            NodeKind::Switch(cases) => cases.remap(f),
            NodeKind::Loop { inner, .. } => inner.remap(f),
            NodeKind::Try {
                try_start, follow, ..
            } => {
                *try_start = f(*try_start);
                *follow = follow.map(f);
            }
            NodeKind::Catch { catch_start, .. } => *catch_start = f(*catch_start),
        }
    }
}

/// A node of the method graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Display name, derived from the basic block name
    pub name: String,
    /// Payload
    pub kind: NodeKind,
    /// Instructions in execution order
    pub ins: Vec<Instruction>,
    /// Global location of each instruction, parallel to `ins`
    pub locs: Vec<Loc>,
    /// Code offset of the originating block
    pub start: u32,
    /// RPO number, 1-based; 0 when unreachable
    pub num: usize,
    /// Variables whose declaration is printed when the node is entered
    pub var_to_declare: Vec<VarId>,
    /// Follow of the conditional this node heads
    pub if_follow: Option<NodeId>,
    /// Follow of the switch this node heads
    pub switch_follow: Option<NodeId>,
    /// Follow of the innermost loop containing this node
    pub loop_follow: Option<NodeId>,
    /// Set on loop headers
    pub startloop: bool,
    /// Latch of the loop this node heads
    pub latch: Option<NodeId>,
    /// Body of the loop this node heads
    pub loop_nodes: Vec<NodeId>,
    /// Inside exception handler code
    pub in_catch: bool,
    /// Caught type of a handler entry node
    pub catch_type: Option<String>,
}

impl Node {
    /// Creates a node without instructions.
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Node {
            name: name.into(),
            kind,
            ins: Vec::new(),
            locs: Vec::new(),
            start: 0,
            num: 0,
            var_to_declare: Vec::new(),
            if_follow: None,
            switch_follow: None,
            loop_follow: None,
            startloop: false,
            latch: None,
            loop_nodes: Vec::new(),
            in_catch: false,
            catch_type: None,
        }
    }

    /// Creates a node with the header attributes of `other` and a new payload.
    #[must_use]
    pub fn derived_from(other: &Node, name: impl Into<String>, kind: NodeKind) -> Self {
        Node {
            name: name.into(),
            kind,
            ins: Vec::new(),
            locs: Vec::new(),
            var_to_declare: Vec::new(),
            loop_nodes: other.loop_nodes.clone(),
            catch_type: other.catch_type.clone(),
            ..*other
        }
    }

    /// Adds a declaration unless already present.
    pub fn declare(&mut self, var: VarId) {
        if !self.var_to_declare.contains(&var) {
            self.var_to_declare.push(var);
        }
    }

    /// The last instruction.
    #[must_use]
    pub fn last_ins(&self) -> Option<&Instruction> {
        self.ins.last()
    }

    /// Rewrites every node reference of the header and payload through `f`.
    pub fn remap(&mut self, f: &impl Fn(NodeId) -> NodeId) {
        self.kind.remap(f);
        self.if_follow = self.if_follow.map(f);
        self.switch_follow = self.switch_follow.map(f);
        self.loop_follow = self.loop_follow.map(f);
        self.latch = self.latch.map(f);
        let mut nodes: Vec<NodeId> = Vec::with_capacity(self.loop_nodes.len());
        for node in self.loop_nodes.iter().map(|n| f(*n)) {
            if !nodes.contains(&node) {
                nodes.push(node);
            }
        }
        self.loop_nodes = nodes;
    }

    /// Replaces references to `old` with `new`.
    pub fn replace_ref(&mut self, old: NodeId, new: NodeId) {
        self.remap(&|n| if n == old { new } else { n });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: usize) -> NodeId {
        NodeId::new(n)
    }

    #[test]
    fn test_order_cases_moves_default_and_dedupes() {
        let mut cases = SwitchCases {
            keys: vec![1, 2, 3],
            cases: vec![id(9), id(4), id(5), id(4)],
            ..SwitchCases::default()
        };
        cases.order_cases();

        assert_eq!(cases.default, Some(id(9)));
        assert_eq!(cases.cases, vec![id(4), id(5)]);
        assert_eq!(cases.keys_of(id(4)), &[1, 3]);
        assert_eq!(cases.keys_of(id(5)), &[2]);
        assert!(cases.keys_of(id(9)).is_empty());
    }

    #[test]
    fn test_remap_reaches_wrapped_payload() {
        let mut node = Node::new(
            "n",
            NodeKind::Loop {
                inner: Box::new(NodeKind::Conditional(Branches {
                    on_true: id(1),
                    on_false: id(2),
                })),
                loop_type: LoopType::PreTest,
            },
        );
        node.loop_follow = Some(id(2));
        node.loop_nodes = vec![id(1), id(3)];
        node.remap(&|n| if n == id(1) || n == id(3) { id(7) } else { n });

        assert_eq!(
            node.kind.branches(),
            Some(Branches {
                on_true: id(7),
                on_false: id(2)
            })
        );
        assert_eq!(node.loop_nodes, vec![id(7)]);
        assert!(node.kind.is_cond());
        assert!(node.kind.is_loop());
        assert_eq!(node.kind.label(), "loop");
    }

    #[test]
    fn test_derived_node_copies_header() {
        let mut node = Node::new("a", NodeKind::Statement);
        node.num = 4;
        node.in_catch = true;
        node.catch_type = Some("Ljava/lang/Exception;".into());
        node.loop_follow = Some(id(3));
        node.declare(VarId::new(1));

        let derived = Node::derived_from(&node, "b", NodeKind::Return);
        assert_eq!(derived.num, 4);
        assert!(derived.in_catch);
        assert_eq!(derived.loop_follow, Some(id(3)));
        assert_eq!(derived.catch_type.as_deref(), Some("Ljava/lang/Exception;"));
        assert!(derived.var_to_declare.is_empty());
        assert!(derived.ins.is_empty());
    }
}
