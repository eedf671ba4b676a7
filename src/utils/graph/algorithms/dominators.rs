//! Immediate dominators via common-dominator walks over RPO numbers.
//!
//! A node `d` **dominates** a node `n` if every path from the entry node to `n`
//! must pass through `d`. The **immediate dominator** of `n` (idom(n)) is the
//! unique node that strictly dominates `n` but does not strictly dominate any
//! other dominator of `n`.
//!
//! # Algorithm
//!
//! Nodes are processed in reverse postorder. The immediate dominator of a node is
//! the common dominator of its already-processed predecessors, found by walking
//! both candidates up the partially built tree, always advancing the one with the
//! larger RPO number (Cooper, Harvey and Kennedy). On reducible graphs the first
//! sweep, which only looks at predecessors with a smaller RPO number, is already
//! final; further sweeps over all predecessors only run until nothing changes,
//! which covers irreducible regions.
//!
//! The tree is mutable: the structuring engine replaces nodes (merged
//! short-circuit conditions, try wrappers) and keeps the tree in sync through
//! [`DominatorTree::replace`] and [`DominatorTree::set_immediate_dominator`].

use crate::utils::graph::{NodeId, RootedGraph};

/// Result of dominator tree computation.
///
/// # Examples
///
/// ```rust
/// use dexscope::utils::graph::{algorithms::{compute_dominators, reverse_postorder}, DirectedGraph};
///
/// let mut graph: DirectedGraph<&str> = DirectedGraph::new();
/// let entry = graph.add_node("entry");
/// let a = graph.add_node("a");
/// let b = graph.add_node("b");
/// graph.add_edge(entry, a);
/// graph.add_edge(a, b);
///
/// let rpo = reverse_postorder(&graph, entry);
/// let tree = compute_dominators(&graph, &rpo);
///
/// assert!(tree.dominates(entry, b));
/// assert_eq!(tree.immediate_dominator(b), Some(a));
/// ```
#[derive(Debug, Clone)]
pub struct DominatorTree {
    entry: NodeId,
    idom: Vec<Option<NodeId>>,
    /// RPO number per slot, 1-based; 0 marks nodes that were not reachable.
    number: Vec<usize>,
}

impl DominatorTree {
    /// Returns the entry node, root of the tree.
    #[must_use]
    pub fn entry(&self) -> NodeId {
        self.entry
    }

    /// Returns the immediate dominator of `node`, `None` for the entry and for
    /// nodes that were not reachable.
    #[must_use]
    pub fn immediate_dominator(&self, node: NodeId) -> Option<NodeId> {
        self.idom.get(node.index()).copied().flatten()
    }

    /// Returns the RPO number the tree was built with (0 when unknown).
    #[must_use]
    pub fn number(&self, node: NodeId) -> usize {
        self.number.get(node.index()).copied().unwrap_or(0)
    }

    /// Checks whether `a` dominates `b`. Every node dominates itself.
    #[must_use]
    pub fn dominates(&self, a: NodeId, b: NodeId) -> bool {
        self.dominators(b).any(|d| d == a)
    }

    /// Checks whether `a` strictly dominates `b`.
    #[must_use]
    pub fn strictly_dominates(&self, a: NodeId, b: NodeId) -> bool {
        a != b && self.dominates(a, b)
    }

    /// Iterates over the dominators of `node`, from `node` up to the entry.
    #[must_use]
    pub fn dominators(&self, node: NodeId) -> DominatorIterator<'_> {
        DominatorIterator {
            tree: self,
            current: Some(node),
            steps: 0,
        }
    }

    /// Depth of `node` in the tree; the entry has depth 0.
    #[must_use]
    pub fn depth(&self, node: NodeId) -> usize {
        self.dominators(node).count().saturating_sub(1)
    }

    /// Returns the nodes whose immediate dominator is `node`, by ascending slot.
    #[must_use]
    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.idom
            .iter()
            .enumerate()
            .filter(|(_, idom)| **idom == Some(node))
            .map(|(index, _)| NodeId::new(index))
            .collect()
    }

    /// Finds the nearest common dominator of `a` and `b`.
    ///
    /// Walks both nodes towards the entry, always moving the one with the larger
    /// RPO number. Returns the entry when a walk leaves the tree.
    #[must_use]
    pub fn common_dominator(&self, a: NodeId, b: NodeId) -> NodeId {
        let mut cur = a;
        let mut other = b;
        while cur != other {
            if self.number(cur) == self.number(other) {
                return self.entry;
            }
            while self.number(cur) < self.number(other) {
                match self.immediate_dominator(other) {
                    Some(up) => other = up,
                    None => return self.entry,
                }
            }
            while self.number(cur) > self.number(other) {
                match self.immediate_dominator(cur) {
                    Some(up) => cur = up,
                    None => return self.entry,
                }
            }
        }
        cur
    }

    /// Overrides the immediate dominator of `node`.
    pub fn set_immediate_dominator(&mut self, node: NodeId, idom: Option<NodeId>) {
        self.ensure_slot(node);
        self.idom[node.index()] = idom;
    }

    /// Overrides the RPO number of `node`.
    pub fn set_number(&mut self, node: NodeId, number: usize) {
        self.ensure_slot(node);
        self.number[node.index()] = number;
    }

    /// Drops `node` from the tree. Its former children keep pointing at it
    /// until they are remapped with [`DominatorTree::replace`].
    pub fn remove(&mut self, node: NodeId) {
        if let Some(slot) = self.idom.get_mut(node.index()) {
            *slot = None;
        }
    }

    /// Makes every node immediately dominated by `old` immediately dominated by
    /// `new` instead.
    pub fn replace(&mut self, old: NodeId, new: NodeId) {
        for idom in &mut self.idom {
            if *idom == Some(old) {
                *idom = Some(new);
            }
        }
        if self.entry == old {
            self.entry = new;
        }
    }

    /// Returns the number of slots covered by the tree.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.idom.len()
    }

    fn ensure_slot(&mut self, node: NodeId) {
        if node.index() >= self.idom.len() {
            self.idom.resize(node.index() + 1, None);
            self.number.resize(node.index() + 1, 0);
        }
    }
}

/// Iterator over dominators of a node, from the node up to the entry.
pub struct DominatorIterator<'a> {
    tree: &'a DominatorTree,
    current: Option<NodeId>,
    steps: usize,
}

impl Iterator for DominatorIterator<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.current?;
        // a remapped tree may transiently contain a cycle; never walk forever
        self.steps += 1;
        if self.steps > self.tree.idom.len() + 1 {
            self.current = None;
            return None;
        }
        self.current = self.tree.immediate_dominator(node);
        Some(node)
    }
}

/// Computes the immediate dominators of every node in `rpo`.
///
/// # Arguments
///
/// * `graph` - The graph to analyze
/// * `rpo` - Reverse postorder of the graph starting at its entry
///
/// # Returns
///
/// A `DominatorTree` that also remembers the RPO numbers used to build it.
pub fn compute_dominators<G: RootedGraph>(graph: &G, rpo: &[NodeId]) -> DominatorTree {
    let slots = graph.node_count();
    let mut tree = DominatorTree {
        entry: graph.entry(),
        idom: vec![None; slots],
        number: vec![0; slots],
    };
    for (position, node) in rpo.iter().enumerate() {
        tree.set_number(*node, position + 1);
    }

    // first sweep: forward predecessors only
    for &node in rpo {
        let mut idom: Option<NodeId> = None;
        for pred in graph.predecessors(node) {
            let pred_number = tree.number(pred);
            if pred_number == 0 || pred_number >= tree.number(node) {
                continue;
            }
            idom = Some(match idom {
                None => pred,
                Some(current) => tree.common_dominator(current, pred),
            });
        }
        if node != tree.entry {
            tree.idom[node.index()] = idom;
        }
    }

    let mut changed = true;
    while changed {
        changed = false;
        for &node in rpo.iter().skip(1) {
            let mut idom: Option<NodeId> = None;
            for pred in graph.predecessors(node) {
                if tree.number(pred) == 0 {
                    continue;
                }
                if pred != tree.entry && tree.immediate_dominator(pred).is_none() {
                    continue;
                }
                idom = Some(match idom {
                    None => pred,
                    Some(current) => tree.common_dominator(current, pred),
                });
            }
            if idom.is_some() && idom != tree.immediate_dominator(node) {
                tree.idom[node.index()] = idom;
                changed = true;
            }
        }
    }

    tree
}
