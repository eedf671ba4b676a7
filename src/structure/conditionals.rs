//! Two-way branches: follows and short-circuit merging.

use log::debug;
use rustc_hash::FxHashSet;

use crate::{
    graph::{Branches, Graph, Node, NodeKind, ShortCircuit},
    utils::graph::{algorithms::DominatorTree, NodeId},
};

/// Largest-numbered live node immediately dominated by `dom` that joins
/// several normal paths.
pub(super) fn dominated_join(graph: &Graph, tree: &DominatorTree, dom: NodeId) -> Option<NodeId> {
    tree.children(dom)
        .into_iter()
        .filter(|n| graph.is_live(*n) && graph.preds(*n).len() > 1)
        .max_by_key(|n| graph[*n].num)
}

/// Sets the follow of every conditional, innermost first.
///
/// Conditionals without a join node are handed the follow of the next
/// resolved conditional that encloses them by number; the ones still
/// unresolved are returned.
pub(super) fn if_struct(graph: &mut Graph, tree: &DominatorTree) -> Vec<NodeId> {
    let mut unresolved: Vec<NodeId> = Vec::new();
    for node in graph.rpo().iter().rev().copied().collect::<Vec<_>>() {
        if !graph[node].kind.is_cond() {
            continue;
        }
        match dominated_join(graph, tree, node) {
            Some(follow) => {
                graph[node].if_follow = Some(follow);
                let (low, high) = (graph[node].num, graph[follow].num);
                unresolved.retain(|x| {
                    let num = graph[*x].num;
                    if low < num && num < high {
                        graph[*x].if_follow = Some(follow);
                        false
                    } else {
                        true
                    }
                });
            }
            None => unresolved.push(node),
        }
    }
    unresolved
}

/// Plan for merging a conditional with one of its branch targets.
struct Merge {
    second: NodeId,
    is_and: bool,
    is_not: bool,
    branches: Branches,
}

/// Branches of `node` when it can be folded into its single predecessor
/// `pred`.
fn foldable(graph: &Graph, node: NodeId, pred: NodeId) -> Option<Branches> {
    let branches = graph[node].kind.branches()?;
    (graph.preds(node).len() == 1 && !branches.contains(pred) && !branches.contains(node))
        .then_some(branches)
}

fn plan(graph: &Graph, node: NodeId, then: NodeId, els: NodeId) -> Option<Merge> {
    if let Some(t) = foldable(graph, then, node) {
        if t.on_false == els {
            // node && then
            return Some(Merge {
                second: then,
                is_and: true,
                is_not: false,
                branches: Branches { on_true: t.on_true, on_false: els },
            });
        }
        if t.on_true == els {
            // !node || then
            return Some(Merge {
                second: then,
                is_and: false,
                is_not: true,
                branches: Branches { on_true: els, on_false: t.on_false },
            });
        }
        None
    } else if let Some(e) = foldable(graph, els, node) {
        if e.on_false == then {
            // !node && els
            return Some(Merge {
                second: els,
                is_and: true,
                is_not: true,
                branches: Branches { on_true: e.on_true, on_false: then },
            });
        }
        if e.on_true == then {
            // node || els
            return Some(Merge {
                second: els,
                is_and: false,
                is_not: false,
                branches: Branches { on_true: then, on_false: e.on_false },
            });
        }
        None
    } else {
        None
    }
}

/// Replaces `first` and `merge.second` by one short-circuit node.
///
/// The new node inherits the header attributes and the immediate dominator
/// of `first`; edges, branch targets and follows pointing at either node are
/// redirected to it.
fn merge_nodes(graph: &mut Graph, tree: &mut DominatorTree, first: NodeId, merge: &Merge) -> NodeId {
    let second = merge.second;
    let kind = NodeKind::ShortCircuit(ShortCircuit {
        first,
        second,
        is_and: merge.is_and,
        is_not: merge.is_not,
        branches: merge.branches,
    });
    let mut node = Node::derived_from(
        &graph[first],
        format!("{}+{}", graph[first].name, graph[second].name),
        kind,
    );
    for var in graph[first].var_to_declare.iter().chain(&graph[second].var_to_declare) {
        node.declare(*var);
    }
    let merged = graph.add_node(node);

    graph.redirect_incoming(first, merged);
    graph.redirect_outgoing(first, merged);
    graph.redirect_outgoing(second, merged);
    graph.remove_node(second);
    graph.remove_node(first);
    graph.replace_references(first, merged);
    graph.replace_references(second, merged);

    tree.set_immediate_dominator(merged, tree.immediate_dominator(first));
    tree.remove(first);
    tree.remove(second);
    tree.replace(first, merged);
    tree.replace(second, merged);
    merged
}

/// Outcome of [`short_circuit_struct`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(super) struct ShortCircuitStats {
    pub merged: usize,
    pub bounded: bool,
}

/// Merges chained conditionals into `&&` / `||` nodes, to a fixed point or
/// until `max_passes` passes ran.
pub(super) fn short_circuit_struct(
    graph: &mut Graph,
    tree: &mut DominatorTree,
    max_passes: usize,
) -> ShortCircuitStats {
    let mut stats = ShortCircuitStats::default();
    for _ in 0..max_passes {
        let mut change = false;
        let mut done: FxHashSet<NodeId> = FxHashSet::default();
        for node in graph.post_order() {
            if done.contains(&node) || !graph.is_live(node) {
                continue;
            }
            let Some(branches) = graph[node].kind.branches() else {
                done.insert(node);
                continue;
            };
            let (then, els) = (branches.on_true, branches.on_false);
            if node == then || node == els {
                continue;
            }
            if let Some(merge) = plan(graph, node, then, els) {
                let merged = merge_nodes(graph, tree, node, &merge);
                debug!("short-circuit {}", graph[merged].name);
                done.insert(merge.second);
                stats.merged += 1;
                change = true;
            }
            done.insert(node);
        }
        if change {
            graph.compute_rpo();
        } else {
            return stats;
        }
    }
    stats.bounded = true;
    stats
}
