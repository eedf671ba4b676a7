//! Allen-Cocke intervals and the derived sequence of graphs.
//!
//! An interval `I(h)` is the maximal single-entry subgraph headed by `h`: it is
//! grown by repeatedly adding nodes whose predecessors all lie inside it. Every
//! node outside the interval that has a predecessor inside becomes the header of
//! another interval. Collapsing each interval into one node yields the next graph
//! of the derived sequence; the sequence ends when a single node remains. A graph
//! whose sequence stops shrinking before that point is irreducible.
//!
//! Every level remembers which nodes of the base graph it stands for, so loop
//! detection can map a back edge found at any level down to concrete nodes.

use crate::utils::graph::{algorithms::reverse_postorder, DirectedGraph, NodeId, RootedGraph};

/// One interval of a level graph.
#[derive(Debug, Clone)]
pub struct Interval {
    /// Header node (a node of the level graph).
    pub head: NodeId,
    /// Members in insertion order, header first.
    pub members: Vec<NodeId>,
    /// Last member that has a successor outside the interval.
    pub end: Option<NodeId>,
}

impl Interval {
    /// Checks whether `node` (a node of the level graph) belongs to the interval.
    #[must_use]
    pub fn contains(&self, node: NodeId) -> bool {
        self.members.contains(&node)
    }
}

/// Partition of a graph into intervals, plus the reduced graph they form.
#[derive(Debug, Clone)]
pub struct IntervalPartition {
    /// Intervals in discovery order; the first one is headed by the entry.
    pub intervals: Vec<Interval>,
    /// Interval index of every node slot, `None` for unreachable nodes.
    pub interval_of: Vec<Option<usize>>,
    /// Graph whose node `i` is interval `i`.
    pub reduced: DirectedGraph<usize>,
}

/// Partitions the nodes reachable from the entry into intervals.
///
/// # Arguments
///
/// * `graph` - The graph to partition
/// * `rpo` - Reverse postorder of `graph`, entry first
pub fn intervals<G: RootedGraph>(graph: &G, rpo: &[NodeId]) -> IntervalPartition {
    let slots = graph.node_count();
    let mut interval_of: Vec<Option<usize>> = vec![None; slots];
    let mut intervals: Vec<Interval> = Vec::new();
    let mut exits: Vec<(usize, NodeId)> = Vec::new();

    let mut queued = vec![false; slots];
    let mut heads = std::collections::VecDeque::new();
    if let Some(&entry) = rpo.first() {
        heads.push_back(entry);
        queued[entry.index()] = true;
    }

    while let Some(head) = heads.pop_front() {
        queued[head.index()] = false;
        if interval_of[head.index()].is_some() {
            continue;
        }
        let index = intervals.len();
        interval_of[head.index()] = Some(index);
        let mut interval = Interval {
            head,
            members: vec![head],
            end: None,
        };

        let mut change = true;
        while change {
            change = false;
            for &node in rpo.iter().skip(1) {
                if interval_of[node.index()].is_some() {
                    continue;
                }
                let mut preds = graph.predecessors(node).peekable();
                if preds.peek().is_none() {
                    continue;
                }
                if preds.all(|p| interval_of[p.index()] == Some(index)) {
                    interval_of[node.index()] = Some(index);
                    interval.members.push(node);
                    change = true;
                }
            }
        }

        for node in graph.node_ids() {
            if interval_of[node.index()] == Some(index) {
                continue;
            }
            if graph
                .predecessors(node)
                .any(|p| interval_of[p.index()] == Some(index))
            {
                exits.push((index, node));
                if interval_of[node.index()].is_none() && !queued[node.index()] {
                    heads.push_back(node);
                    queued[node.index()] = true;
                }
            }
        }

        for &member in &interval.members {
            if graph
                .successors(member)
                .any(|s| interval_of[s.index()] != Some(index))
            {
                interval.end = Some(member);
            }
        }
        intervals.push(interval);
    }

    let mut reduced = DirectedGraph::new();
    for index in 0..intervals.len() {
        reduced.add_node(index);
    }
    for (source, head) in exits {
        if let Some(target) = interval_of[head.index()] {
            reduced.add_edge(NodeId::new(source), NodeId::new(target));
        }
    }
    reduced.set_entry(NodeId::new(0));

    IntervalPartition {
        intervals,
        interval_of,
        reduced,
    }
}

/// One graph of the derived sequence together with its interval partition.
#[derive(Debug, Clone)]
pub struct DerivedLevel {
    preds: Vec<Vec<NodeId>>,
    number: Vec<usize>,
    base_head: Vec<NodeId>,
    base_end: Vec<NodeId>,
    base_nodes: Vec<Vec<NodeId>>,
    interval_base: Vec<Vec<NodeId>>,
    partition: IntervalPartition,
}

impl DerivedLevel {
    fn new<G: RootedGraph>(
        graph: &G,
        rpo: &[NodeId],
        base_head: Vec<NodeId>,
        base_end: Vec<NodeId>,
        base_nodes: Vec<Vec<NodeId>>,
    ) -> Self {
        let slots = graph.node_count();
        let mut number = vec![0; slots];
        for (position, node) in rpo.iter().enumerate() {
            number[node.index()] = position + 1;
        }
        let preds = (0..slots)
            .map(|index| graph.predecessors(NodeId::new(index)).collect())
            .collect();
        let partition = intervals(graph, rpo);
        let interval_base = partition
            .intervals
            .iter()
            .map(|interval| {
                let mut nodes: Vec<NodeId> = interval
                    .members
                    .iter()
                    .flat_map(|m| base_nodes[m.index()].iter().copied())
                    .collect();
                nodes.sort_unstable();
                nodes
            })
            .collect();

        DerivedLevel {
            preds,
            number,
            base_head,
            base_end,
            base_nodes,
            interval_base,
            partition,
        }
    }

    /// Number of node slots in this level's graph.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.preds.len()
    }

    /// Predecessors of a node of this level.
    #[must_use]
    pub fn predecessors(&self, node: NodeId) -> &[NodeId] {
        self.preds.get(node.index()).map_or(&[], Vec::as_slice)
    }

    /// RPO number of a node within this level (1-based, 0 if unreachable).
    #[must_use]
    pub fn number(&self, node: NodeId) -> usize {
        self.number.get(node.index()).copied().unwrap_or(0)
    }

    /// Base-graph node heading the region a level node stands for.
    #[must_use]
    pub fn base_head(&self, node: NodeId) -> NodeId {
        self.base_head[node.index()]
    }

    /// Base-graph node ending the region a level node stands for.
    #[must_use]
    pub fn base_end(&self, node: NodeId) -> NodeId {
        self.base_end[node.index()]
    }

    /// Base-graph nodes collapsed into a level node.
    #[must_use]
    pub fn base_nodes(&self, node: NodeId) -> &[NodeId] {
        &self.base_nodes[node.index()]
    }

    /// The interval partition of this level.
    #[must_use]
    pub fn partition(&self) -> &IntervalPartition {
        &self.partition
    }

    /// Interval index of a level node.
    #[must_use]
    pub fn interval_of(&self, node: NodeId) -> Option<usize> {
        self.partition.interval_of.get(node.index()).copied().flatten()
    }

    /// Sorted base-graph nodes covered by an interval of this level.
    #[must_use]
    pub fn interval_base_nodes(&self, interval: usize) -> &[NodeId] {
        self.interval_base.get(interval).map_or(&[], Vec::as_slice)
    }

    /// Checks whether a base-graph node lies in an interval of this level.
    #[must_use]
    pub fn interval_contains_base(&self, interval: usize, base: NodeId) -> bool {
        self.interval_base_nodes(interval).binary_search(&base).is_ok()
    }
}

/// The derived sequence `G0, G1, ...` of a rooted graph.
#[derive(Debug, Clone)]
pub struct DerivedSequence {
    /// Levels from the base graph upwards.
    pub levels: Vec<DerivedLevel>,
    /// True when the sequence stopped shrinking before reaching one node.
    pub irreducible: bool,
}

/// Computes the derived sequence of `graph`.
///
/// # Arguments
///
/// * `graph` - The base graph
/// * `rpo` - Reverse postorder of the base graph
///
/// # Examples
///
/// ```rust
/// use dexscope::utils::graph::{algorithms::{derived_sequence, reverse_postorder}, DirectedGraph};
///
/// let mut graph: DirectedGraph<()> = DirectedGraph::new();
/// let entry = graph.add_node(());
/// let header = graph.add_node(());
/// let exit = graph.add_node(());
/// graph.add_edge(entry, header);
/// graph.add_edge(header, header);
/// graph.add_edge(header, exit);
///
/// let rpo = reverse_postorder(&graph, entry);
/// let sequence = derived_sequence(&graph, &rpo);
/// assert!(!sequence.irreducible);
/// assert_eq!(sequence.levels.len(), 2);
/// ```
pub fn derived_sequence<G: RootedGraph>(graph: &G, rpo: &[NodeId]) -> DerivedSequence {
    let slots = graph.node_count();
    let identity: Vec<NodeId> = (0..slots).map(NodeId::new).collect();
    let base_nodes = identity.iter().map(|n| vec![*n]).collect();
    let mut level = DerivedLevel::new(graph, rpo, identity.clone(), identity, base_nodes);

    let mut levels = Vec::new();
    let mut irreducible = false;
    loop {
        let partition = level.partition();
        let interval_count = partition.intervals.len();
        let reachable = level.number.iter().filter(|n| **n != 0).count();
        if interval_count <= 1 {
            levels.push(level);
            break;
        }
        if interval_count >= reachable {
            irreducible = true;
            levels.push(level);
            break;
        }

        let mut heads = Vec::with_capacity(interval_count);
        let mut ends = Vec::with_capacity(interval_count);
        let mut nodes = Vec::with_capacity(interval_count);
        for (index, interval) in partition.intervals.iter().enumerate() {
            heads.push(level.base_head(interval.head));
            let end = interval
                .end
                .or_else(|| interval.members.last().copied())
                .unwrap_or(interval.head);
            ends.push(level.base_end(end));
            nodes.push(level.interval_base_nodes(index).to_vec());
        }
        let reduced = partition.reduced.clone();
        let reduced_rpo = reverse_postorder(&reduced, NodeId::new(0));
        let next = DerivedLevel::new(&reduced, &reduced_rpo, heads, ends, nodes);
        levels.push(level);
        level = next;
    }

    DerivedSequence {
        levels,
        irreducible,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::graph::Successors;

    fn build(edges: &[(usize, usize)], nodes: usize) -> DirectedGraph<()> {
        let mut graph = DirectedGraph::new();
        for _ in 0..nodes {
            graph.add_node(());
        }
        for &(from, to) in edges {
            graph.add_edge(NodeId::new(from), NodeId::new(to));
        }
        graph
    }

    fn n(index: usize) -> NodeId {
        NodeId::new(index)
    }

    #[test]
    fn test_acyclic_graph_is_one_interval() {
        let graph = build(&[(0, 1), (0, 2), (1, 3), (2, 3)], 4);
        let rpo = reverse_postorder(&graph, n(0));
        let partition = intervals(&graph, &rpo);

        assert_eq!(partition.intervals.len(), 1);
        assert_eq!(partition.intervals[0].members.len(), 4);
        assert_eq!(partition.intervals[0].end, None);
    }

    #[test]
    fn test_loop_header_starts_new_interval() {
        // 0 -> 1 -> 2 -> 1, 1 -> 3
        let graph = build(&[(0, 1), (1, 2), (2, 1), (1, 3)], 4);
        let rpo = reverse_postorder(&graph, n(0));
        let partition = intervals(&graph, &rpo);

        assert_eq!(partition.intervals.len(), 2);
        assert_eq!(partition.intervals[0].members, vec![n(0)]);
        assert_eq!(partition.intervals[0].end, Some(n(0)));
        assert_eq!(partition.intervals[1].head, n(1));
        assert!(partition.intervals[1].contains(n(2)));
        assert!(partition.intervals[1].contains(n(3)));
        assert_eq!(partition.interval_of[2], Some(1));

        let reduced_succs: Vec<NodeId> = partition.reduced.successors(n(0)).collect();
        assert_eq!(reduced_succs, vec![n(1)]);
    }

    #[test]
    fn test_nested_loops_need_two_levels() {
        // outer: 1 -> 2 -> 3 -> 2 (inner), 3 -> 4 -> 1, 1 -> 5
        let graph = build(&[(0, 1), (1, 2), (2, 3), (3, 2), (3, 4), (4, 1), (1, 5)], 6);
        let rpo = reverse_postorder(&graph, n(0));
        let sequence = derived_sequence(&graph, &rpo);

        assert!(!sequence.irreducible);
        assert!(sequence.levels.len() >= 2);

        let base = &sequence.levels[0];
        let inner = base.interval_of(n(2)).unwrap_or(usize::MAX);
        assert_eq!(base.partition().intervals[inner].head, n(2));
        assert!(base.interval_contains_base(inner, n(3)));

        let top = sequence.levels.last().unwrap();
        assert_eq!(top.partition().intervals.len(), 1);
    }

    #[test]
    fn test_irreducible_graph_stalls() {
        let graph = build(&[(0, 1), (0, 2), (1, 2), (2, 1)], 3);
        let rpo = reverse_postorder(&graph, n(0));
        let sequence = derived_sequence(&graph, &rpo);

        assert!(sequence.irreducible);
        assert_eq!(sequence.levels.len(), 1);
    }

    #[test]
    fn test_level_maps_back_to_base_nodes() {
        let graph = build(&[(0, 1), (1, 2), (2, 1), (1, 3)], 4);
        let rpo = reverse_postorder(&graph, n(0));
        let sequence = derived_sequence(&graph, &rpo);

        let upper = &sequence.levels[1];
        assert_eq!(upper.base_head(n(1)), n(1));
        assert_eq!(upper.base_nodes(n(1)), &[n(1), n(2), n(3)]);
        assert_eq!(upper.base_end(n(0)), n(0));
    }
}
