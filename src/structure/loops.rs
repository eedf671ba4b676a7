//! Loop detection, typing and follows.
//!
//! Loops are found on every level of the derived sequence: a predecessor of an
//! interval header that lies in the same interval closes a loop. The back edge
//! found at level `i` is mapped down to base graph nodes (header of the header
//! region, end of the latch region) and the body is collected walking
//! predecessors backwards from the latch.

use log::debug;

use crate::{
    graph::{Graph, LoopType, NodeKind},
    utils::graph::{
        algorithms::{DerivedLevel, DerivedSequence},
        NodeId,
    },
};

/// Marks loop headers, latches and bodies. Returns the number of loops found.
pub(super) fn loop_struct(graph: &mut Graph, sequence: &DerivedSequence) -> usize {
    let mut found = 0;
    for level in &sequence.levels {
        let intervals = &level.partition().intervals;
        let mut order: Vec<usize> = (0..intervals.len()).collect();
        order.sort_by_key(|index| level.number(intervals[*index].head));

        for index in order {
            let head = intervals[index].head;
            let mut body: Vec<NodeId> = Vec::new();
            let mut latches = Vec::new();
            for &pred in level.predecessors(head) {
                if level.interval_of(pred) == Some(index) {
                    latches.push(level.base_end(pred));
                }
            }
            if latches.is_empty() {
                continue;
            }

            let base_head = level.base_head(head);
            for &latch in &latches {
                for node in mark_loop(graph, level, index, base_head, latch) {
                    if !body.contains(&node) {
                        body.push(node);
                    }
                }
                graph[base_head].latch = Some(latch);
            }
            body.sort_by_key(|n| graph[*n].num);
            debug!(
                "loop at {} (latch {:?}, {} nodes)",
                graph[base_head].name,
                graph[base_head].latch,
                body.len()
            );
            let header = &mut graph[base_head];
            header.startloop = true;
            header.loop_nodes = body;
            found += 1;
        }
    }
    found
}

/// Collects the nodes between `head` and `latch`.
///
/// Walks predecessors backwards from the latch, keeping nodes numbered in
/// `(head, latch]` that belong to the given interval of `level`.
fn mark_loop(
    graph: &Graph,
    level: &DerivedLevel,
    interval: usize,
    head: NodeId,
    latch: NodeId,
) -> Vec<NodeId> {
    let head_num = graph[head].num;
    let latch_num = graph[latch].num;
    let mut nodes = vec![head];
    let mut stack = vec![latch];
    while let Some(node) = stack.pop() {
        if nodes.contains(&node) {
            continue;
        }
        nodes.push(node);
        for pred in graph.all_preds(node) {
            let num = graph[pred].num;
            if head_num < num && num <= latch_num && level.interval_contains_base(interval, pred)
            {
                stack.push(pred);
            }
        }
    }
    nodes
}

/// Wraps the payload of every loop header into a [`NodeKind::Loop`].
pub(super) fn wrap_loops(graph: &mut Graph) {
    for node in graph.rpo().to_vec() {
        let header = &mut graph[node];
        if header.startloop && !header.kind.is_loop() {
            let inner = std::mem::replace(&mut header.kind, NodeKind::Statement);
            header.kind = NodeKind::Loop {
                inner: Box::new(inner),
                loop_type: LoopType::default(),
            };
        }
    }
}

/// Classifies the loop headed by `head` from the shapes of header and latch.
pub(super) fn loop_type(graph: &mut Graph, head: NodeId) {
    let Some(latch) = graph[head].latch else {
        return;
    };
    let body = &graph[head].loop_nodes;
    let header_exits = graph[head]
        .kind
        .branches()
        .map(|b| !(body.contains(&b.on_true) && body.contains(&b.on_false)));

    let shape = match (graph[latch].kind.is_cond(), header_exits) {
        (_, Some(true)) => LoopType::PreTest,
        (true, _) => LoopType::PostTest,
        (false, _) => LoopType::Endless,
    };
    if let NodeKind::Loop { loop_type, .. } = &mut graph[head].kind {
        *loop_type = shape;
    }
}

/// Computes the follow of the loop headed by `head` and hands it to every
/// node of the body.
///
/// - pretest: the header branch leaving the body
/// - posttest: the latch branch leaving the body
/// - endless: the smallest numbered branch target outside the body, over the
///   body conditionals in RPO order, true branch first
pub(super) fn loop_follow(graph: &mut Graph, head: NodeId) {
    let body = graph[head].loop_nodes.clone();
    let outside = |n: NodeId| !body.contains(&n);
    let exit_of = |node: NodeId| {
        graph[node]
            .kind
            .branches()
            .map(|b| if outside(b.on_true) { b.on_true } else { b.on_false })
    };

    let follow = match &graph[head].kind {
        NodeKind::Loop {
            loop_type: LoopType::PreTest,
            ..
        } => exit_of(head),
        NodeKind::Loop {
            loop_type: LoopType::PostTest,
            ..
        } => graph[head].latch.and_then(exit_of),
        _ => {
            let mut follow = None;
            let mut next = usize::MAX;
            for &node in &body {
                if let Some(b) = graph[node].kind.branches() {
                    if graph[b.on_true].num < next && outside(b.on_true) {
                        follow = Some(b.on_true);
                        next = graph[b.on_true].num;
                    } else if graph[b.on_false].num < next && outside(b.on_false) {
                        follow = Some(b.on_false);
                        next = graph[b.on_false].num;
                    }
                }
            }
            follow
        }
    };

    debug!(
        "loop {} follow {:?}",
        graph[head].name,
        follow.map(|f| graph[f].name.as_str())
    );
    graph[head].loop_follow = follow;
    for node in body {
        graph[node].loop_follow = follow;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        test::{graph_shape, make_cond, make_return},
        utils::graph::algorithms::derived_sequence,
    };

    fn structure(graph: &mut Graph) -> usize {
        let sequence = derived_sequence(&*graph, graph.rpo());
        let found = loop_struct(graph, &sequence);
        wrap_loops(graph);
        for node in graph.rpo().to_vec() {
            if graph[node].startloop {
                loop_type(graph, node);
                loop_follow(graph, node);
            }
        }
        found
    }

    fn shape_of(graph: &Graph, node: NodeId) -> Option<LoopType> {
        match graph[node].kind {
            NodeKind::Loop { loop_type, .. } => Some(loop_type),
            _ => None,
        }
    }

    #[test]
    fn test_pretest_loop() {
        let (mut graph, ids) = graph_shape(&[(0, 1), (1, 2), (2, 1), (1, 3)]);
        make_cond(&mut graph, ids[1], ids[2], ids[3]);
        make_return(&mut graph, ids[3]);

        assert_eq!(structure(&mut graph), 1);
        assert!(graph[ids[1]].startloop);
        assert_eq!(graph[ids[1]].latch, Some(ids[2]));
        assert_eq!(graph[ids[1]].loop_nodes, vec![ids[1], ids[2]]);
        assert_eq!(shape_of(&graph, ids[1]), Some(LoopType::PreTest));
        assert_eq!(graph[ids[1]].loop_follow, Some(ids[3]));
        assert_eq!(graph[ids[2]].loop_follow, Some(ids[3]));
        assert!(graph[ids[1]].kind.is_cond());
    }

    #[test]
    fn test_posttest_loop() {
        let (mut graph, ids) = graph_shape(&[(0, 1), (1, 2), (2, 1), (2, 3)]);
        make_cond(&mut graph, ids[2], ids[1], ids[3]);
        make_return(&mut graph, ids[3]);

        structure(&mut graph);
        assert_eq!(shape_of(&graph, ids[1]), Some(LoopType::PostTest));
        assert_eq!(graph[ids[1]].loop_follow, Some(ids[3]));
    }

    #[test]
    fn test_endless_loop_follow_from_body_exit() {
        let (mut graph, ids) = graph_shape(&[(0, 1), (1, 2), (2, 3), (2, 4), (4, 1)]);
        make_cond(&mut graph, ids[2], ids[3], ids[4]);
        make_return(&mut graph, ids[3]);

        structure(&mut graph);
        assert_eq!(shape_of(&graph, ids[1]), Some(LoopType::Endless));
        assert_eq!(graph[ids[1]].latch, Some(ids[4]));
        assert_eq!(graph[ids[1]].loop_follow, Some(ids[3]));
    }

    #[test]
    fn test_self_loop() {
        let (mut graph, ids) = graph_shape(&[(0, 1), (1, 1), (1, 2)]);
        make_cond(&mut graph, ids[1], ids[1], ids[2]);
        make_return(&mut graph, ids[2]);

        structure(&mut graph);
        assert_eq!(graph[ids[1]].latch, Some(ids[1]));
        assert_eq!(graph[ids[1]].loop_nodes, vec![ids[1]]);
        // the latch is the conditional header itself, with one branch outside
        assert_eq!(shape_of(&graph, ids[1]), Some(LoopType::PreTest));
        assert_eq!(graph[ids[1]].loop_follow, Some(ids[2]));
    }

    #[test]
    fn test_nested_loops_inner_follow_wins() {
        // 1: outer header, 2: inner header, 3: inner latch, 4: outer latch
        let (mut graph, ids) = graph_shape(&[
            (0, 1),
            (1, 2),
            (1, 5),
            (2, 3),
            (2, 4),
            (3, 2),
            (4, 1),
        ]);
        make_cond(&mut graph, ids[1], ids[2], ids[5]);
        make_cond(&mut graph, ids[2], ids[3], ids[4]);
        make_return(&mut graph, ids[5]);

        assert_eq!(structure(&mut graph), 2);
        assert_eq!(graph[ids[1]].loop_follow, Some(ids[5]));
        assert_eq!(graph[ids[2]].loop_follow, Some(ids[4]));
        assert_eq!(graph[ids[3]].loop_follow, Some(ids[4]));
        assert_eq!(graph[ids[4]].loop_follow, Some(ids[5]));
    }
}
