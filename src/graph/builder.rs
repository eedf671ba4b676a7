//! Basic blocks to method graph.

use std::collections::VecDeque;

use log::debug;

use crate::{
    decompiler::{Event, EventKind, EventLog},
    graph::{Branches, Graph, Node, NodeKind, SwitchCases},
    input::{BasicBlock, MethodInfo, Opcode},
    ir::{Lifter, VariableTable},
    utils::graph::NodeId,
    Error, Result,
};

/// Builds the graph of `method`, lifting every instruction into `vars`.
///
/// Blocks are visited breadth first from the entry block over their children
/// and then over the handlers protecting them, so handler code only enters the
/// graph through the traversal. Nodes are created lazily in visit order, which
/// fixes the numbering of invoke result temporaries.
///
/// After construction the graph is RPO numbered, its instructions carry global
/// locations, and an exit node is chosen: the single return node, the last
/// node in RPO when there are several ([`EventKind::MultipleExits`]), or none
/// ([`EventKind::NoExit`]).
///
/// # Errors
///
/// - [`Error::Empty`] when the method has no block
/// - [`Error::Malformed`] for dangling child or handler indices and operands
///   that do not fit their opcode
/// - [`Error::Invariant`] for a conditional block without a successor
pub fn construct(method: &MethodInfo, vars: &mut VariableTable, events: &EventLog) -> Result<Graph> {
    let blocks = &method.blocks;
    if blocks.is_empty() {
        return Err(Error::Empty);
    }
    validate(method)?;

    let full_name = method.full_name();
    let mut graph = Graph::new();
    let mut lifter = Lifter::new(vars);
    let mut block_to_node: Vec<Option<NodeId>> = vec![None; blocks.len()];
    let mut seen = vec![false; blocks.len()];
    let mut queue = VecDeque::from([0usize]);
    seen[0] = true;

    while let Some(index) = queue.pop_front() {
        let block = &blocks[index];
        let node = node_for(index, blocks, &mut block_to_node, &mut graph, &mut lifter, events, &full_name)?;

        let mut on_true = None;
        let mut on_false = None;
        let mut cases = Vec::new();
        let branch_target = block.last().and_then(|ins| ins.branch_target());
        let opcode = block.last().map_or(Opcode::Nop, |ins| ins.opcode);

        for &(_, child_index) in &block.children {
            let child = node_for(child_index, blocks, &mut block_to_node, &mut graph, &mut lifter, events, &full_name)?;
            graph.add_edge(node, child);
            if opcode.is_switch() {
                cases.push(child);
            } else if opcode.is_conditional() {
                if branch_target == Some(blocks[child_index].start) {
                    on_true = Some(child);
                } else {
                    on_false = Some(child);
                }
            }
            if !seen[child_index] {
                seen[child_index] = true;
                queue.push_back(child_index);
            }
        }

        for handler in method.exceptions.handlers_at(block.start) {
            let catch = node_for(handler.block, blocks, &mut block_to_node, &mut graph, &mut lifter, events, &full_name)?;
            graph.add_catch_edge(node, catch);
            let catch_node = &mut graph[catch];
            catch_node.in_catch = true;
            if catch_node.catch_type.is_none() {
                catch_node.catch_type = handler.exception_type.clone();
            }
            if !seen[handler.block] {
                seen[handler.block] = true;
                queue.push_back(handler.block);
            }
        }

        graph[node].kind = if opcode.is_return() {
            NodeKind::Return
        } else if opcode.is_throw() {
            NodeKind::Throw
        } else if opcode.is_switch() {
            let keys = block
                .last()
                .and_then(|ins| ins.switch_keys())
                .map(<[i32]>::to_vec)
                .unwrap_or_default();
            NodeKind::Switch(SwitchCases {
                keys,
                cases,
                ..SwitchCases::default()
            })
        } else if opcode.is_conditional() {
            // Both branches reach the same block when only one child exists
            match (on_true, on_false) {
                (Some(t), Some(f)) => NodeKind::Conditional(Branches { on_true: t, on_false: f }),
                (Some(b), None) | (None, Some(b)) => NodeKind::Conditional(Branches { on_true: b, on_false: b }),
                (None, None) => {
                    return Err(invariant_error!("conditional block {} has no successor", block.name))
                }
            }
        } else {
            NodeKind::Statement
        };
    }

    let entry = block_to_node[0].ok_or_else(|| invariant_error!("entry block was not visited"))?;
    graph.set_entry(entry);
    graph.compute_rpo();
    propagate_in_catch(&mut graph);
    graph.number_ins();
    select_exit(&mut graph, events, &full_name);

    debug!(
        "{}: built {} nodes from {} blocks",
        full_name,
        graph.len(),
        blocks.len()
    );
    Ok(graph)
}

fn validate(method: &MethodInfo) -> Result<()> {
    let count = method.blocks.len();
    for block in &method.blocks {
        if let Some((_, child)) = block.children.iter().find(|(_, c)| *c >= count) {
            return Err(malformed_error!(
                "block {} references missing child {}",
                block.name,
                child
            ));
        }
    }
    for range in &method.exceptions.ranges {
        if let Some(handler) = range.handlers.iter().find(|h| h.block >= count) {
            return Err(malformed_error!(
                "try range {:#x}..{:#x} references missing handler block {}",
                range.start,
                range.end,
                handler.block
            ));
        }
    }
    Ok(())
}

fn node_for(
    index: usize,
    blocks: &[BasicBlock],
    block_to_node: &mut [Option<NodeId>],
    graph: &mut Graph,
    lifter: &mut Lifter<'_>,
    events: &EventLog,
    method: &str,
) -> Result<NodeId> {
    if let Some(node) = block_to_node[index] {
        return Ok(node);
    }
    let block = &blocks[index];
    let mut node = Node::new(block.name.clone(), NodeKind::Statement);
    node.start = block.start;
    for ins in &block.instructions {
        if ins.opcode == Opcode::Unknown {
            events.record(
                Event::new(EventKind::UnknownOpcode, "instruction replaced by nop")
                    .in_method(method)
                    .at(ins.offset),
            );
        }
        if let Some(lifted) = lifter.lift(ins)? {
            node.ins.push(lifted);
        }
    }
    let id = graph.add_node(node);
    block_to_node[index] = Some(id);
    Ok(id)
}

/// Marks nodes whose earlier predecessors all lie in handler code.
fn propagate_in_catch(graph: &mut Graph) {
    for node in graph.rpo().to_vec() {
        if graph[node].in_catch {
            continue;
        }
        let num = graph[node].num;
        let mut earlier = graph
            .preds(node)
            .iter()
            .filter(|p| graph[**p].num < num)
            .peekable();
        if earlier.peek().is_some() && earlier.all(|p| graph[*p].in_catch) {
            graph[node].in_catch = true;
        }
    }
}

fn select_exit(graph: &mut Graph, events: &EventLog, method: &str) {
    let returns: Vec<NodeId> = graph
        .nodes()
        .filter(|(_, node)| node.kind.is_return())
        .map(|(id, _)| id)
        .collect();
    match returns.as_slice() {
        [exit] => graph.set_exit(Some(*exit)),
        [] => {
            events.record(
                Event::new(EventKind::NoExit, "no return node").in_method(method),
            );
            graph.set_exit(None);
        }
        _ => {
            events.record(
                Event::new(
                    EventKind::MultipleExits,
                    format!("{} return nodes", returns.len()),
                )
                .in_method(method),
            );
            graph.set_exit(graph.rpo().last().copied());
        }
    }
}
