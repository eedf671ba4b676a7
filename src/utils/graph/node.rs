//! Node handles for arena-backed graphs.
//!
//! Every graph in the crate (the method CFG as well as the reduced graphs of the
//! derived sequence) stores its nodes in a vector and hands out [`NodeId`]
//! handles. Handles stay valid when nodes are removed: removal only marks the
//! slot as dead, so side tables indexed by [`NodeId::index`] never shift.

use std::fmt;

/// A strongly-typed handle to a node stored in a graph arena.
///
/// `NodeId` wraps the slot index of the node. Handles are assigned sequentially
/// starting from 0 and are never reused within one graph, which makes them
/// suitable as keys for per-node analysis results (`Vec<T>` indexed by
/// [`NodeId::index`] or hash maps).
///
/// # Examples
///
/// ```rust
/// use dexscope::utils::graph::NodeId;
///
/// let header = NodeId::new(3);
/// let latch = NodeId::new(7);
///
/// assert!(header < latch);
/// assert_eq!(latch.index(), 7);
/// assert_eq!(format!("{latch}"), "n7");
/// ```
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Creates a `NodeId` from a raw arena slot.
    ///
    /// Normal code obtains handles from [`Graph::add_node`](crate::graph::Graph::add_node);
    /// this constructor exists for tests and for side tables that are rebuilt
    /// from indices.
    ///
    /// # Arguments
    ///
    /// * `index` - The arena slot (0-based)
    #[must_use]
    #[inline]
    pub const fn new(index: usize) -> Self {
        NodeId(index)
    }

    /// Returns the arena slot of this node.
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl From<usize> for NodeId {
    #[inline]
    fn from(index: usize) -> Self {
        NodeId(index)
    }
}

impl From<NodeId> for usize {
    #[inline]
    fn from(node: NodeId) -> Self {
        node.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashMap;

    #[test]
    fn test_node_id_roundtrip_index() {
        let node = NodeId::new(42);
        assert_eq!(node.index(), 42);
        assert_eq!(usize::from(node), 42);
        assert_eq!(NodeId::from(42usize), node);
    }

    #[test]
    fn test_node_id_ordering_follows_slots() {
        let mut nodes = vec![NodeId::new(9), NodeId::new(1), NodeId::new(4)];
        nodes.sort();
        assert_eq!(nodes, vec![NodeId::new(1), NodeId::new(4), NodeId::new(9)]);
    }

    #[test]
    fn test_node_id_formatting() {
        let node = NodeId::new(12);
        assert_eq!(format!("{node:?}"), "NodeId(12)");
        assert_eq!(format!("{node}"), "n12");
    }

    #[test]
    fn test_node_id_as_side_table_key() {
        let mut follows: FxHashMap<NodeId, NodeId> = FxHashMap::default();
        follows.insert(NodeId::new(2), NodeId::new(5));
        follows.insert(NodeId::new(2), NodeId::new(6));

        assert_eq!(follows.len(), 1);
        assert_eq!(follows.get(&NodeId::new(2)), Some(&NodeId::new(6)));
    }
}
