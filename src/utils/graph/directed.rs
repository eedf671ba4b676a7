//! Compact directed graph with node payloads.
//!
//! Used for the reduced graphs of the derived sequence, where every node stands
//! for an interval of the previous level. Edges carry no data and parallel edges
//! are collapsed.

use crate::utils::graph::{GraphBase, NodeId, Predecessors, RootedGraph, Successors};

/// A directed graph storing a payload per node and adjacency lists in both
/// directions.
///
/// # Examples
///
/// ```rust
/// use dexscope::utils::graph::{DirectedGraph, Successors};
///
/// let mut graph: DirectedGraph<&str> = DirectedGraph::new();
/// let a = graph.add_node("a");
/// let b = graph.add_node("b");
/// graph.add_edge(a, b);
/// graph.add_edge(a, b);
///
/// assert_eq!(graph.successors(a).count(), 1);
/// assert_eq!(graph.node(b), Some(&"b"));
/// ```
#[derive(Debug, Clone)]
pub struct DirectedGraph<N> {
    nodes: Vec<N>,
    succs: Vec<Vec<NodeId>>,
    preds: Vec<Vec<NodeId>>,
    entry: NodeId,
}

impl<N> Default for DirectedGraph<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N> DirectedGraph<N> {
    /// Creates an empty graph. The entry defaults to the first added node.
    #[must_use]
    pub fn new() -> Self {
        DirectedGraph {
            nodes: Vec::new(),
            succs: Vec::new(),
            preds: Vec::new(),
            entry: NodeId::new(0),
        }
    }

    /// Adds a node and returns its handle.
    pub fn add_node(&mut self, data: N) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(data);
        self.succs.push(Vec::new());
        self.preds.push(Vec::new());
        id
    }

    /// Adds the edge `source -> target` unless it already exists.
    ///
    /// Edges to or from unknown handles are ignored.
    pub fn add_edge(&mut self, source: NodeId, target: NodeId) {
        if source.index() >= self.nodes.len() || target.index() >= self.nodes.len() {
            return;
        }
        if !self.succs[source.index()].contains(&target) {
            self.succs[source.index()].push(target);
            self.preds[target.index()].push(source);
        }
    }

    /// Sets the entry node.
    pub fn set_entry(&mut self, entry: NodeId) {
        self.entry = entry;
    }

    /// Returns the payload of a node.
    #[must_use]
    pub fn node(&self, node: NodeId) -> Option<&N> {
        self.nodes.get(node.index())
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true when the graph has no node.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterates over `(handle, payload)` pairs.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &N)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, data)| (NodeId::new(index), data))
    }
}

impl<N> GraphBase for DirectedGraph<N> {
    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId::new)
    }
}

impl<N> Successors for DirectedGraph<N> {
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        self.succs
            .get(node.index())
            .map(|s| s.as_slice())
            .unwrap_or(&[])
            .iter()
            .copied()
    }
}

impl<N> Predecessors for DirectedGraph<N> {
    fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        self.preds
            .get(node.index())
            .map(|p| p.as_slice())
            .unwrap_or(&[])
            .iter()
            .copied()
    }
}

impl<N> RootedGraph for DirectedGraph<N> {
    fn entry(&self) -> NodeId {
        self.entry
    }
}
