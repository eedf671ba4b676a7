//! Dead code elimination.

use log::debug;

use crate::{
    dataflow::DefUse,
    graph::{Graph, Loc},
};

/// Removes definitions nobody reads.
///
/// For an unused definition:
/// - a call keeps running, only its result binding is dropped
/// - another side effect keeps the instruction
/// - anything else is deleted, and the definitions it read are examined in
///   turn once this was their last use
///
/// Returns the number of instructions deleted.
pub fn dead_code_elimination(graph: &mut Graph, chains: &mut DefUse) -> usize {
    let mut removed = 0;
    for node in graph.rpo().to_vec() {
        for loc in graph[node].locs.clone() {
            let Some(ins) = graph.ins_at(loc) else {
                continue;
            };
            let Some(var) = ins.lhs() else {
                continue;
            };
            if !chains.is_used(var, loc) {
                removed += discard(graph, chains, loc);
            }
        }
    }
    if removed > 0 {
        debug!("removed {removed} dead instructions");
    }
    removed
}

/// Handles the unused definition at `loc`; returns the number of deleted
/// instructions.
fn discard(graph: &mut Graph, chains: &mut DefUse, loc: Loc) -> usize {
    let Some(ins) = graph.ins_at_mut(loc) else {
        return 0;
    };
    if ins.is_call() {
        ins.remove_defined_var();
        return 0;
    }
    if ins.has_side_effect() {
        return 0;
    }

    let used = ins.used_vars();
    graph.remove_ins(loc);
    let mut removed = 1;
    for var in used {
        for def in chains.remove_use(var, loc) {
            if def >= 0 && !chains.is_used(var, def) {
                removed += discard(graph, chains, def);
            }
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        input::MethodRef,
        ir::{Constant, Expr, Instruction, InvokeKind, VarId},
        test::graph_shape,
    };

    fn set(var: usize, rhs: Expr) -> Instruction {
        Instruction::Assign {
            lhs: Some(VarId::new(var)),
            rhs,
        }
    }

    fn call() -> Expr {
        Expr::Invoke {
            kind: InvokeKind::Static,
            method: MethodRef::new("LFoo;", "next", "()I"),
            receiver: None,
            args: vec![],
        }
    }

    #[test]
    fn test_dead_store_and_its_inputs_are_removed() {
        let (mut graph, ids) = graph_shape(&[(0, 1)]);
        graph[ids[0]].ins = vec![
            set(0, Expr::Const(Constant::Int(1))),
            set(1, Expr::Var(VarId::new(0))),
            set(2, Expr::Const(Constant::Int(5))),
        ];
        graph[ids[1]].ins = vec![Instruction::Return(Some(Expr::Var(VarId::new(2))))];
        graph.number_ins();
        let mut chains = DefUse::build(&graph, &[]);

        assert_eq!(dead_code_elimination(&mut graph, &mut chains), 2);
        assert_eq!(graph[ids[0]].ins.len(), 1);
        assert_eq!(graph[ids[0]].locs, vec![2]);
        // every remaining definition is read
        for (_, node) in graph.nodes() {
            for (ins, loc) in node.ins.iter().zip(&node.locs) {
                if let Some(var) = ins.lhs() {
                    assert!(chains.is_used(var, *loc) || ins.has_side_effect());
                }
            }
        }
    }

    #[test]
    fn test_unused_call_result_keeps_call() {
        let (mut graph, ids) = graph_shape(&[(0, 1)]);
        graph[ids[0]].ins = vec![
            set(5, call()),
            Instruction::MoveResult {
                lhs: VarId::new(0),
                rhs: Expr::Var(VarId::new(5)),
            },
        ];
        graph[ids[1]].ins = vec![Instruction::Return(None)];
        graph.number_ins();
        let mut chains = DefUse::build(&graph, &[]);

        assert_eq!(dead_code_elimination(&mut graph, &mut chains), 1);
        assert_eq!(graph[ids[0]].ins.len(), 1);
        assert!(graph[ids[0]].ins[0].is_call());
        assert_eq!(graph[ids[0]].ins[0].lhs(), None);
    }

    #[test]
    fn test_side_effect_definition_stays() {
        let (mut graph, ids) = graph_shape(&[(0, 1)]);
        let write = Instruction::ArrayWrite {
            array: Expr::Var(VarId::new(1)),
            index: Expr::Const(Constant::Int(0)),
            value: Expr::Const(Constant::Int(0)),
        };
        graph[ids[0]].ins = vec![write.clone()];
        graph[ids[1]].ins = vec![Instruction::Return(None)];
        graph.number_ins();
        let mut chains = DefUse::build(&graph, &[]);

        assert_eq!(dead_code_elimination(&mut graph, &mut chains), 0);
        assert_eq!(graph[ids[0]].ins, vec![write]);
    }
}
