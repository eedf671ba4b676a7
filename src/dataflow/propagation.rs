//! Register propagation.
//!
//! Replaces a variable read by the expression assigned to it, so that
//! `v0 = a + b; return v0` becomes `return a + b`. Constants travel to every
//! use; any other value only to its single use, and only along paths where
//! it would compute the same result.

use log::debug;
use rustc_hash::FxHashSet;

use crate::{
    dataflow::DefUse,
    graph::{Graph, Loc},
    ir::{Expr, Instruction, VarId},
    utils::graph::NodeId,
};

/// Propagates definitions into their uses until nothing changes.
///
/// A use is rewritten when exactly one definition reaches it, that definition
/// is an instruction of the method (not a parameter) and its right-hand side
/// is propagable. Non-constant values additionally need:
/// - a single use, reading the variable once
/// - no redefinition of their operands between definition and use
/// - no side effect between definition and use when they read variables,
///   call a method or read the heap
/// - no call or heap read evaluated before the variable inside the use that
///   the value could observe or disturb
///
/// The definition is deleted once its last use was rewritten. Returns the
/// number of rewritten uses.
pub fn register_propagation(graph: &mut Graph, chains: &mut DefUse) -> usize {
    let mut propagated = 0;
    let mut change = true;
    while change {
        change = false;
        for node in graph.rpo().to_vec() {
            for loc in graph[node].locs.clone() {
                if propagate_into(graph, chains, loc) {
                    propagated += 1;
                    change = true;
                }
            }
        }
    }
    if propagated > 0 {
        debug!("propagated {propagated} definitions");
    }
    propagated
}

/// Tries the variables read at `use_loc` in order; rewrites at most one.
fn propagate_into(graph: &mut Graph, chains: &mut DefUse, use_loc: Loc) -> bool {
    let Some(ins) = graph.ins_at(use_loc) else {
        return false;
    };
    for var in ins.used_vars() {
        let &[def] = chains.defs(var, use_loc) else {
            continue;
        };
        if def < 0 || def == use_loc {
            continue;
        }
        let Some(rhs) = graph
            .ins_at(def)
            .filter(|orig| orig.is_propagable() && orig.lhs() == Some(var))
            .and_then(Instruction::rhs)
            .cloned()
        else {
            continue;
        };
        if !rhs.is_const() {
            if chains.uses(var, def).len() > 1 || occurrences(ins, var) > 1 {
                continue;
            }
            if !path_is_clear(graph, &rhs, def, use_loc) || !keeps_order(ins, var, &rhs) {
                continue;
            }
        }

        if let Some(target) = graph.ins_at_mut(use_loc) {
            target.replace_var(var, &rhs);
        }
        chains.unlink(var, def, use_loc);
        let operands = distinct(rhs.used_vars());
        for operand in &operands {
            for operand_def in chains.defs(*operand, def).to_vec() {
                chains.link(*operand, operand_def, use_loc);
            }
        }
        if !chains.is_used(var, def) {
            for operand in &operands {
                chains.remove_use(*operand, def);
            }
            graph.remove_ins(def);
        }
        return true;
    }
    false
}

fn occurrences(ins: &Instruction, var: VarId) -> usize {
    let mut all = Vec::new();
    for expr in ins.exprs() {
        expr.collect_vars(&mut all);
    }
    all.into_iter().filter(|v| *v == var).count()
}

/// Checks that nothing evaluated before `var` inside `ins` conflicts with
/// `rhs` once `rhs` is evaluated at the position of `var`.
///
/// A call may not move after an earlier call or heap read; a heap read may
/// not move after an earlier call.
fn keeps_order(ins: &Instruction, var: VarId, rhs: &Expr) -> bool {
    let hazard = |expr: &Expr| {
        if rhs.has_side_effect() {
            expr.has_side_effect() || expr.reads_memory()
        } else if rhs.reads_memory() {
            expr.has_side_effect()
        } else {
            false
        }
    };
    let mut blocked = false;
    for expr in ins.exprs() {
        if let Some(found) = earlier_hazard(expr, var, &hazard) {
            return !(blocked || found);
        }
        blocked |= hazard(expr);
    }
    true
}

/// `Some(conflict)` when `var` occurs in `expr`, `None` otherwise. Operands
/// are evaluated left to right, before their parent.
fn earlier_hazard(expr: &Expr, var: VarId, hazard: &impl Fn(&Expr) -> bool) -> Option<bool> {
    if *expr == Expr::Var(var) {
        return Some(false);
    }
    let mut blocked = false;
    for child in expr.children() {
        if let Some(found) = earlier_hazard(child, var, hazard) {
            return Some(blocked || found);
        }
        blocked |= hazard(child);
    }
    None
}

fn distinct(vars: Vec<VarId>) -> Vec<VarId> {
    let mut out: Vec<VarId> = Vec::with_capacity(vars.len());
    for var in vars {
        if !out.contains(&var) {
            out.push(var);
        }
    }
    out
}

fn position(graph: &Graph, node: NodeId, loc: Loc) -> Option<usize> {
    graph[node].locs.iter().position(|l| *l == loc)
}

/// Nodes lying on a path from `from` to `to`, both excluded, walking
/// predecessors back from `to`. The flag is set when `to` itself lies on a
/// cycle avoiding `from`.
fn nodes_between(graph: &Graph, from: NodeId, to: NodeId) -> (Vec<NodeId>, bool) {
    let mut seen: FxHashSet<NodeId> = FxHashSet::default();
    let mut between = Vec::new();
    let mut reentered = false;
    let mut stack: Vec<NodeId> = graph.all_preds(to).collect();
    while let Some(node) = stack.pop() {
        if node == from {
            continue;
        }
        if node == to {
            reentered = true;
            continue;
        }
        if seen.insert(node) {
            between.push(node);
            stack.extend(graph.all_preds(node));
        }
    }
    (between, reentered)
}

/// Checks that moving `rhs` from `def` to `use_loc` keeps its value.
///
/// Blocking instructions are redefinitions of an operand of `rhs` and, when
/// `rhs` reads variables or memory or has a side effect, any side effect.
/// Values with effects or heap reads are never moved into a loop that does
/// not contain their definition.
fn path_is_clear(graph: &Graph, rhs: &Expr, def: Loc, use_loc: Loc) -> bool {
    let operands = rhs.used_vars();
    let effects = rhs.has_side_effect() || rhs.reads_memory();
    let strict = effects || !operands.is_empty();
    let blocks = |ins: &Instruction| {
        ins.lhs().is_some_and(|v| operands.contains(&v)) || (strict && ins.has_side_effect())
    };

    let (Some(def_node), Some(use_node)) = (graph.node_of_loc(def), graph.node_of_loc(use_loc))
    else {
        return false;
    };
    let (Some(def_pos), Some(use_pos)) = (
        position(graph, def_node, def),
        position(graph, use_node, use_loc),
    ) else {
        return false;
    };

    if def_node == use_node && def_pos < use_pos {
        return !graph[def_node].ins[def_pos + 1..use_pos].iter().any(blocks);
    }
    if graph[def_node].ins[def_pos + 1..].iter().any(blocks) {
        return false;
    }
    let (between, reentered) = nodes_between(graph, def_node, use_node);
    if reentered && effects {
        return false;
    }
    if between.iter().any(|n| graph[*n].ins.iter().any(blocks)) {
        return false;
    }
    let head = if reentered {
        &graph[use_node].ins[..]
    } else {
        &graph[use_node].ins[..use_pos]
    };
    !head.iter().any(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        input::{FieldRef, MethodRef},
        ir::{BinaryOp, Constant, InvokeKind},
        test::graph_shape,
    };

    fn set(var: VarId, rhs: Expr) -> Instruction {
        Instruction::Assign { lhs: Some(var), rhs }
    }

    fn add(a: VarId, b: VarId) -> Expr {
        Expr::Binary {
            op: BinaryOp::Add,
            lhs: Expr::var(a),
            rhs: Expr::var(b),
            ty: "I".into(),
        }
    }

    fn call() -> Expr {
        Expr::Invoke {
            kind: InvokeKind::Static,
            method: MethodRef::new("LFoo;", "tick", "()I"),
            receiver: None,
            args: vec![],
        }
    }

    fn v(n: usize) -> VarId {
        VarId::new(n)
    }

    #[test]
    fn test_single_use_expression_is_folded() {
        let (mut graph, ids) = graph_shape(&[]);
        graph[ids[0]].ins = vec![
            set(v(2), add(v(0), v(1))),
            Instruction::Return(Some(Expr::Var(v(2)))),
        ];
        graph.number_ins();
        let mut chains = DefUse::build(&graph, &[v(0), v(1)]);

        assert_eq!(register_propagation(&mut graph, &mut chains), 1);
        assert_eq!(graph[ids[0]].ins, vec![Instruction::Return(Some(add(v(0), v(1))))]);
        assert_eq!(chains.defs(v(0), 1), &[-1]);
        assert_eq!(chains.uses(v(1), -2), &[1]);
    }

    #[test]
    fn test_constants_reach_every_use() {
        let (mut graph, ids) = graph_shape(&[(0, 1)]);
        graph[ids[0]].ins = vec![
            set(v(0), Expr::Const(Constant::Int(3))),
            set(v(1), add(v(0), v(0))),
        ];
        graph[ids[1]].ins = vec![Instruction::Return(Some(Expr::Var(v(0))))];
        graph.number_ins();
        let mut chains = DefUse::build(&graph, &[]);

        register_propagation(&mut graph, &mut chains);
        let three = || Box::new(Expr::Const(Constant::Int(3)));
        assert_eq!(
            graph[ids[1]].ins,
            vec![Instruction::Return(Some(Expr::Const(Constant::Int(3))))]
        );
        assert_eq!(
            graph[ids[0]].ins,
            vec![set(
                v(1),
                Expr::Binary {
                    op: BinaryOp::Add,
                    lhs: three(),
                    rhs: three(),
                    ty: "I".into()
                }
            )]
        );
    }

    #[test]
    fn test_redefined_operand_blocks() {
        let (mut graph, ids) = graph_shape(&[]);
        graph[ids[0]].ins = vec![
            set(v(2), add(v(0), v(1))),
            set(v(0), Expr::Const(Constant::Int(0))),
            Instruction::Return(Some(Expr::Var(v(2)))),
        ];
        graph.number_ins();
        let mut chains = DefUse::build(&graph, &[v(1)]);

        register_propagation(&mut graph, &mut chains);
        assert_eq!(graph[ids[0]].ins.len(), 3);
        assert!(matches!(graph[ids[0]].ins[2], Instruction::Return(Some(Expr::Var(_)))));
    }

    #[test]
    fn test_call_does_not_cross_side_effect() {
        let (mut graph, ids) = graph_shape(&[]);
        let write = Instruction::StaticFieldWrite {
            field: FieldRef::new("LFoo;", "n", "I"),
            value: Expr::Const(Constant::Int(1)),
        };
        graph[ids[0]].ins = vec![
            set(v(0), call()),
            write.clone(),
            Instruction::Return(Some(Expr::Var(v(0)))),
        ];
        graph.number_ins();
        let mut chains = DefUse::build(&graph, &[]);

        assert_eq!(register_propagation(&mut graph, &mut chains), 0);
        assert_eq!(graph[ids[0]].ins[1], write);
    }

    #[test]
    fn test_call_not_moved_past_earlier_heap_read() {
        // v0 = tick(); v1 = Foo.x; v2 = v1 + v0; return v2
        let (mut graph, ids) = graph_shape(&[]);
        let x = || Expr::StaticFieldRead(FieldRef::new("LFoo;", "x", "I"));
        graph[ids[0]].ins = vec![
            set(v(0), call()),
            set(v(1), x()),
            set(v(2), add(v(1), v(0))),
            Instruction::Return(Some(Expr::Var(v(2)))),
        ];
        graph.number_ins();
        let mut chains = DefUse::build(&graph, &[]);

        register_propagation(&mut graph, &mut chains);
        let read_then_var = Expr::Binary {
            op: BinaryOp::Add,
            lhs: Box::new(x()),
            rhs: Expr::var(v(0)),
            ty: "I".into(),
        };
        assert_eq!(
            graph[ids[0]].ins,
            vec![set(v(0), call()), Instruction::Return(Some(read_then_var))]
        );
    }

    #[test]
    fn test_call_moves_before_later_heap_read() {
        // v0 = tick(); v2 = v0 + Foo.x; return v2
        let (mut graph, ids) = graph_shape(&[]);
        let x = || Expr::StaticFieldRead(FieldRef::new("LFoo;", "x", "I"));
        graph[ids[0]].ins = vec![
            set(v(0), call()),
            set(
                v(2),
                Expr::Binary {
                    op: BinaryOp::Add,
                    lhs: Expr::var(v(0)),
                    rhs: Box::new(x()),
                    ty: "I".into(),
                },
            ),
            Instruction::Return(Some(Expr::Var(v(2)))),
        ];
        graph.number_ins();
        let mut chains = DefUse::build(&graph, &[]);

        register_propagation(&mut graph, &mut chains);
        assert_eq!(graph[ids[0]].ins.len(), 1);
    }

    #[test]
    fn test_call_result_moves_through_move_result() {
        let (mut graph, ids) = graph_shape(&[]);
        graph[ids[0]].ins = vec![
            set(v(5), call()),
            Instruction::MoveResult {
                lhs: v(0),
                rhs: Expr::Var(v(5)),
            },
            Instruction::Return(Some(Expr::Var(v(0)))),
        ];
        graph.number_ins();
        let mut chains = DefUse::build(&graph, &[]);

        assert_eq!(register_propagation(&mut graph, &mut chains), 2);
        assert_eq!(graph[ids[0]].ins, vec![Instruction::Return(Some(call()))]);
    }

    #[test]
    fn test_call_not_moved_into_loop() {
        // 0: v0 = tick(); 1: loop reading v0 once per iteration; 2: exit
        let (mut graph, ids) = graph_shape(&[(0, 1), (1, 1), (1, 2)]);
        graph[ids[0]].ins = vec![set(v(0), call())];
        graph[ids[1]].ins = vec![set(v(1), add(v(0), v(1)))];
        graph[ids[2]].ins = vec![Instruction::Return(Some(Expr::Var(v(1))))];
        graph.number_ins();
        let mut chains = DefUse::build(&graph, &[v(1)]);

        register_propagation(&mut graph, &mut chains);
        assert_eq!(graph[ids[0]].ins, vec![set(v(0), call())]);
    }
}
