//! Shared fixtures for unit tests.

use crate::{
    graph::{Branches, Graph, Node, NodeKind},
    utils::graph::NodeId,
};

// Helper function to create a graph of statement nodes `n0..nk` from an edge list.
// `n0` is the entry and RPO is computed.
pub fn graph_shape(edges: &[(usize, usize)]) -> (Graph, Vec<NodeId>) {
    let count = edges
        .iter()
        .map(|(a, b)| (*a).max(*b) + 1)
        .max()
        .unwrap_or(1);
    let mut graph = Graph::new();
    let ids: Vec<NodeId> = (0..count)
        .map(|i| {
            let mut node = Node::new(format!("n{i}"), NodeKind::Statement);
            node.start = i as u32 * 2;
            graph.add_node(node)
        })
        .collect();
    for (a, b) in edges {
        graph.add_edge(ids[*a], ids[*b]);
    }
    graph.set_entry(ids[0]);
    graph.compute_rpo();
    (graph, ids)
}

// Helper function to turn a node into a two-way branch.
pub fn make_cond(graph: &mut Graph, node: NodeId, on_true: NodeId, on_false: NodeId) {
    graph[node].kind = NodeKind::Conditional(Branches { on_true, on_false });
}

// Helper function to turn a node into a return.
pub fn make_return(graph: &mut Graph, node: NodeId) {
    graph[node].kind = NodeKind::Return;
}
