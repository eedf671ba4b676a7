//! Try/catch regions.

use log::debug;
use rustc_hash::FxHashMap;

use crate::{
    graph::{Graph, Node, NodeKind},
    ir::Instruction,
    utils::graph::{algorithms::DominatorTree, NodeId},
};

/// Builds one try node per protected region and one catch node per handler.
///
/// Handlers are the nodes entered through exception edges that are not
/// protected themselves. The immediate dominator of a handler starts the
/// protected region; a try node takes its place for every predecessor and
/// node attribute. Returns the number of try nodes created.
pub(super) fn catch_struct(graph: &mut Graph, tree: &DominatorTree) -> usize {
    let handlers: Vec<NodeId> = graph
        .rpo()
        .iter()
        .copied()
        .filter(|n| !graph.catch_preds(*n).is_empty() && graph.catch_sucs(*n).is_empty())
        .collect();

    let mut tries: FxHashMap<NodeId, NodeId> = FxHashMap::default();
    for handler in handlers {
        let Some(try_start) = tree.immediate_dominator(handler) else {
            continue;
        };
        let try_node = match tries.get(&try_start) {
            Some(node) => *node,
            None => {
                let node = make_try(graph, try_start);
                tries.insert(try_start, node);
                node
            }
        };
        let catch = make_catch(graph, handler);
        if let NodeKind::Try { catches, .. } = &mut graph[try_node].kind {
            catches.push(catch);
        }
    }
    tries.len()
}

/// Follow of a try region, read off the node starting it.
fn try_follow(graph: &Graph, try_start: NodeId) -> Option<NodeId> {
    let node = &graph[try_start];
    match &node.kind {
        NodeKind::Loop { .. } => node.loop_follow,
        kind if kind.is_cond() => node.loop_follow.or(node.if_follow),
        NodeKind::Statement => graph.sucs(try_start).first().copied(),
        NodeKind::Switch(_) => node.switch_follow,
        _ => None,
    }
}

fn make_try(graph: &mut Graph, try_start: NodeId) -> NodeId {
    let follow = try_follow(graph, try_start);
    let mut node = Node::derived_from(
        &graph[try_start],
        format!("{}-try", graph[try_start].name),
        NodeKind::Statement,
    );
    node.startloop = false;
    node.latch = None;
    node.loop_nodes.clear();
    let try_node = graph.add_node(node);

    graph.replace_references(try_start, try_node);
    graph[try_node].kind = NodeKind::Try {
        try_start,
        catches: Vec::new(),
        follow,
    };
    graph.redirect_incoming(try_start, try_node);
    graph.add_edge(try_node, try_start);
    debug!(
        "try {} follow {:?}",
        graph[try_start].name,
        follow.map(|f| graph[f].name.as_str())
    );
    try_node
}

/// Creates the catch node of `handler`, moving a leading `move-exception`
/// into the catch binding.
fn make_catch(graph: &mut Graph, handler: NodeId) -> NodeId {
    let binding = match graph[handler].ins.first() {
        Some(Instruction::MoveException(var)) => {
            let var = *var;
            match graph[handler].locs.first().copied() {
                Some(loc) => {
                    graph.remove_ins(loc);
                }
                None => {
                    graph[handler].ins.remove(0);
                }
            }
            Some(var)
        }
        _ => None,
    };
    let ty = graph[handler].catch_type.clone();
    let node = Node::derived_from(
        &graph[handler],
        format!("{}-catch", graph[handler].name),
        NodeKind::Catch {
            catch_start: handler,
            binding,
            ty,
        },
    );
    graph.add_node(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ir::{Expr, VarId},
        test::{graph_shape, make_return},
    };

    fn protected_statement() -> (Graph, Vec<NodeId>) {
        // 1 is protected by handler 3; both continue at 2
        let (mut graph, ids) = graph_shape(&[(0, 1), (1, 2), (3, 2)]);
        make_return(&mut graph, ids[2]);
        graph.add_catch_edge(ids[1], ids[3]);
        graph[ids[3]].catch_type = Some("Ljava/io/IOException;".into());
        graph[ids[3]].in_catch = true;
        graph[ids[3]].ins = vec![
            Instruction::MoveException(VarId::new(5)),
            Instruction::Assign {
                lhs: None,
                rhs: Expr::Var(VarId::new(5)),
            },
        ];
        graph.compute_rpo();
        graph.number_ins();
        (graph, ids)
    }

    #[test]
    fn test_try_replaces_protected_start() {
        let (mut graph, ids) = protected_statement();
        let tree = graph.immediate_dominators();
        assert_eq!(tree.immediate_dominator(ids[3]), Some(ids[1]));

        assert_eq!(catch_struct(&mut graph, &tree), 1);
        let try_node = graph.sucs(ids[0])[0];
        assert_eq!(graph[try_node].name, "n1-try");
        assert_eq!(graph.sucs(try_node), &[ids[1]]);

        let NodeKind::Try {
            try_start,
            catches,
            follow,
        } = graph[try_node].kind.clone()
        else {
            panic!("not a try node");
        };
        assert_eq!(try_start, ids[1]);
        assert_eq!(follow, Some(ids[2]));
        assert_eq!(catches.len(), 1);

        let NodeKind::Catch {
            catch_start,
            binding,
            ty,
        } = graph[catches[0]].kind.clone()
        else {
            panic!("not a catch node");
        };
        assert_eq!(catch_start, ids[3]);
        assert_eq!(binding, Some(VarId::new(5)));
        assert_eq!(ty.as_deref(), Some("Ljava/io/IOException;"));
        assert_eq!(graph[ids[3]].ins.len(), 1);
    }

    #[test]
    fn test_handlers_of_one_region_share_the_try() {
        let (mut graph, ids) = protected_statement();
        let second = graph.add_node(Node::new("h2", NodeKind::Return));
        graph.add_catch_edge(ids[1], second);
        graph.compute_rpo();
        let tree = graph.immediate_dominators();

        assert_eq!(catch_struct(&mut graph, &tree), 1);
        let try_node = graph.sucs(ids[0])[0];
        match &graph[try_node].kind {
            NodeKind::Try { catches, .. } => assert_eq!(catches.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_entry_try_becomes_entry() {
        let (mut graph, ids) = graph_shape(&[(0, 1), (2, 1)]);
        make_return(&mut graph, ids[1]);
        graph.add_catch_edge(ids[0], ids[2]);
        graph.compute_rpo();
        let tree = graph.immediate_dominators();

        catch_struct(&mut graph, &tree);
        let entry = graph.entry();
        assert_ne!(entry, ids[0]);
        assert!(matches!(graph[entry].kind, NodeKind::Try { .. }));
        assert_eq!(graph.sucs(entry), &[ids[0]]);
    }

    #[test]
    fn test_protected_handler_is_not_a_catch_root() {
        let (mut graph, ids) = protected_statement();
        let outer = graph.add_node(Node::new("outer", NodeKind::Return));
        graph.add_catch_edge(ids[3], outer);
        graph.compute_rpo();
        let tree = graph.immediate_dominators();

        // only `outer` starts a catch, protecting handler 3
        assert_eq!(catch_struct(&mut graph, &tree), 1);
        let catches: Vec<NodeId> = graph
            .nodes()
            .filter(|(_, n)| matches!(n.kind, NodeKind::Catch { .. }))
            .map(|(id, _)| id)
            .collect();
        assert_eq!(catches.len(), 1);
        assert_eq!(graph[ids[3]].ins.len(), 2);
    }
}
