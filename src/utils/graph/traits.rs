//! Trait definitions for graph abstractions.
//!
//! The dominator, traversal and interval algorithms are written against these
//! traits so that they run unchanged on the method CFG and on the reduced graphs
//! produced by the derived sequence.
//!
//! - [`GraphBase`] - Slot count and live node iteration
//! - [`Successors`] - Forward edge traversal
//! - [`Predecessors`] - Backward edge traversal
//! - [`RootedGraph`] - Graphs with a designated entry node

use crate::utils::graph::NodeId;

/// Base trait providing core graph properties.
pub trait GraphBase {
    /// Returns the number of node slots in the graph.
    ///
    /// For arena graphs this is an upper bound on [`NodeId::index`] and includes
    /// slots of removed nodes, so algorithms can size per-node tables with it.
    fn node_count(&self) -> usize;

    /// Returns an iterator over the live node identifiers, by ascending slot.
    fn node_ids(&self) -> impl Iterator<Item = NodeId>;
}

/// Trait for graphs that support forward edge traversal.
pub trait Successors: GraphBase {
    /// Returns an iterator over the successor nodes of the given node.
    ///
    /// For the method CFG this includes exception handler edges, since a
    /// handler is reachable from every block of its protected range.
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId>;
}

/// Trait for graphs that support backward edge traversal.
pub trait Predecessors: GraphBase {
    /// Returns an iterator over the predecessor nodes of the given node.
    fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId>;
}

/// Trait for graphs with a designated entry (root) node.
pub trait RootedGraph: Successors + Predecessors {
    /// Returns the entry node of the graph.
    fn entry(&self) -> NodeId;
}
