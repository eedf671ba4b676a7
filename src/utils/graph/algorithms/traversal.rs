//! Depth-first orderings.

use crate::utils::graph::{NodeId, Successors};

/// Computes the postorder of all nodes reachable from `start`.
///
/// Children are explored in successor order, exactly like a recursive
/// depth-first search, so the result is stable for a given edge insertion
/// order. The structuring passes depend on that stability.
///
/// # Arguments
///
/// * `graph` - The graph to traverse
/// * `start` - The starting node for traversal
///
/// # Returns
///
/// A vector of `NodeId`, every node after all of its DFS descendants.
#[allow(clippy::items_after_statements)]
pub fn postorder<G: Successors>(graph: &G, start: NodeId) -> Vec<NodeId> {
    let node_count = graph.node_count();
    if start.index() >= node_count {
        return Vec::new();
    }

    let mut visited = vec![false; node_count];
    let mut result = Vec::with_capacity(node_count);

    #[derive(Clone, Copy)]
    enum State {
        Enter,
        Exit,
    }

    let mut stack = vec![(start, State::Enter)];
    while let Some((node, state)) = stack.pop() {
        match state {
            State::Enter => {
                if visited[node.index()] {
                    continue;
                }
                visited[node.index()] = true;
                stack.push((node, State::Exit));

                let successors: Vec<NodeId> = graph.successors(node).collect();
                for &succ in successors.iter().rev() {
                    if succ.index() < node_count && !visited[succ.index()] {
                        stack.push((succ, State::Enter));
                    }
                }
            }
            State::Exit => result.push(node),
        }
    }

    result
}

/// Computes the reverse postorder of all nodes reachable from `start`.
///
/// Every node comes before its successors except along back edges. The
/// position of a node in this order (starting at 1) is its RPO number.
pub fn reverse_postorder<G: Successors>(graph: &G, start: NodeId) -> Vec<NodeId> {
    let mut result = postorder(graph, start);
    result.reverse();
    result
}

#[cfg(test)]
mod tests {
    use crate::utils::graph::{
        algorithms::traversal::{postorder, reverse_postorder},
        DirectedGraph, NodeId,
    };

    fn diamond() -> (DirectedGraph<()>, [NodeId; 4]) {
        let mut graph = DirectedGraph::new();
        let a = graph.add_node(());
        let b = graph.add_node(());
        let c = graph.add_node(());
        let d = graph.add_node(());
        graph.add_edge(a, b);
        graph.add_edge(a, c);
        graph.add_edge(b, d);
        graph.add_edge(c, d);
        (graph, [a, b, c, d])
    }

    #[test]
    fn test_postorder_diamond_follows_successor_order() {
        let (graph, [a, b, c, d]) = diamond();
        assert_eq!(postorder(&graph, a), vec![d, b, c, a]);
    }

    #[test]
    fn test_reverse_postorder_diamond() {
        let (graph, [a, b, c, d]) = diamond();
        assert_eq!(reverse_postorder(&graph, a), vec![a, c, b, d]);
    }

    #[test]
    fn test_reverse_postorder_loop_header_first() {
        let mut graph: DirectedGraph<()> = DirectedGraph::new();
        let entry = graph.add_node(());
        let header = graph.add_node(());
        let body = graph.add_node(());
        let exit = graph.add_node(());
        graph.add_edge(entry, header);
        graph.add_edge(header, body);
        graph.add_edge(header, exit);
        graph.add_edge(body, header);

        let rpo = reverse_postorder(&graph, entry);
        assert_eq!(rpo[0], entry);
        assert_eq!(rpo[1], header);
        assert_eq!(rpo.len(), 4);
    }

    #[test]
    fn test_unreachable_nodes_skipped() {
        let mut graph: DirectedGraph<()> = DirectedGraph::new();
        let a = graph.add_node(());
        let _orphan = graph.add_node(());
        assert_eq!(reverse_postorder(&graph, a), vec![a]);
        assert!(postorder(&graph, NodeId::new(99)).is_empty());
    }
}
