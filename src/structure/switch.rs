//! Switch follows and case tables.

use log::debug;

use crate::{
    graph::Graph,
    structure::conditionals::dominated_join,
    utils::graph::{algorithms::DominatorTree, NodeId},
};

/// Sets switch follows and orders case tables, innermost switch first.
///
/// The follow is searched below `m`, the common dominator of the switch and
/// its last successor that the switch does not immediately dominate (the
/// switch itself when it dominates all of them). Switches without a follow
/// take the next one found. Returns the number of switches.
pub(super) fn switch_struct(graph: &mut Graph, tree: &DominatorTree) -> usize {
    let mut unresolved: Vec<NodeId> = Vec::new();
    let mut count = 0;
    for node in graph.post_order() {
        if !graph[node].kind.is_switch() {
            continue;
        }
        count += 1;
        let mut m = node;
        for &suc in graph.sucs(node) {
            if tree.immediate_dominator(suc) != Some(node) {
                m = tree.common_dominator(node, suc);
            }
        }
        match dominated_join(graph, tree, m) {
            Some(follow) => {
                debug!("switch {} follow {}", graph[node].name, graph[follow].name);
                graph[node].switch_follow = Some(follow);
                for x in unresolved.drain(..) {
                    graph[x].switch_follow = Some(follow);
                }
            }
            None => unresolved.push(node),
        }
        if let Some(cases) = graph[node].kind.switch_mut() {
            cases.order_cases();
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        graph::{Branches, NodeKind, SwitchCases},
        test::{graph_shape, make_return},
    };

    fn make_switch(graph: &mut Graph, node: NodeId, keys: Vec<i32>, cases: Vec<NodeId>) {
        graph[node].kind = NodeKind::Switch(SwitchCases {
            keys,
            cases,
            ..SwitchCases::default()
        });
    }

    #[test]
    fn test_shared_follow_and_default() {
        // switch with default 1, cases 2 and 3, all joining at 4
        let (mut graph, ids) =
            graph_shape(&[(0, 1), (0, 2), (0, 3), (1, 4), (2, 4), (3, 4)]);
        make_switch(&mut graph, ids[0], vec![5, 6], vec![ids[1], ids[2], ids[3]]);
        make_return(&mut graph, ids[4]);
        let tree = graph.immediate_dominators();

        assert_eq!(switch_struct(&mut graph, &tree), 1);
        assert_eq!(graph[ids[0]].switch_follow, Some(ids[4]));
        let cases = graph[ids[0]].kind.switch().unwrap();
        assert_eq!(cases.default, Some(ids[1]));
        assert_eq!(cases.cases, vec![ids[2], ids[3]]);
        assert_eq!(cases.keys_of(ids[3]), &[6]);
    }

    #[test]
    fn test_follow_searched_below_common_dominator() {
        // case 3 is also reached from the entry, so the switch does not dominate it
        let (mut graph, ids) = graph_shape(&[(0, 1), (0, 3), (1, 2), (1, 3), (2, 4), (3, 4)]);
        graph[ids[0]].kind = NodeKind::Conditional(Branches {
            on_true: ids[1],
            on_false: ids[3],
        });
        make_switch(&mut graph, ids[1], vec![1], vec![ids[2], ids[3]]);
        make_return(&mut graph, ids[4]);
        let tree = graph.immediate_dominators();
        assert_eq!(tree.immediate_dominator(ids[3]), Some(ids[0]));

        switch_struct(&mut graph, &tree);
        assert_eq!(graph[ids[1]].switch_follow, Some(ids[4]));
    }

    #[test]
    fn test_switch_without_join() {
        let (mut graph, ids) = graph_shape(&[(0, 1), (0, 2)]);
        make_switch(&mut graph, ids[0], vec![1], vec![ids[1], ids[2]]);
        make_return(&mut graph, ids[1]);
        make_return(&mut graph, ids[2]);
        let tree = graph.immediate_dominators();

        switch_struct(&mut graph, &tree);
        assert!(graph[ids[0]].switch_follow.is_none());
        let cases = graph[ids[0]].kind.switch().unwrap();
        assert_eq!(cases.default, Some(ids[1]));
        assert_eq!(cases.cases, vec![ids[2]]);
    }
}
