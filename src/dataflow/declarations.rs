//! Type hints and declaration sites of local variables.

use log::debug;
use rustc_hash::FxHashMap;

use crate::{
    dataflow::DefUse,
    graph::Graph,
    input::{descriptor, MethodInfo},
    ir::{BinaryOp, Constant, Expr, Instruction, VarId, VariableTable},
    utils::graph::{algorithms::DominatorTree, NodeId},
};

const THROWABLE: &str = "Ljava/lang/Throwable;";

fn hint(vars: &mut VariableTable, var: VarId, ty: &str) -> bool {
    if vars.get(var).is_none_or(|v| v.ty.is_some()) || ty == "V" {
        return false;
    }
    vars.hint_type(var, ty);
    true
}

/// Hints `ty` to `expr` when it is a plain variable.
fn hint_expr(vars: &mut VariableTable, expr: &Expr, ty: &str) -> bool {
    match expr {
        Expr::Var(var) => hint(vars, *var, ty),
        _ => false,
    }
}

/// Use-site hints inside an expression tree.
fn hint_operands(vars: &mut VariableTable, expr: &Expr) -> bool {
    let mut changed = false;
    match expr {
        Expr::Invoke {
            method,
            receiver,
            args,
            ..
        } => {
            if let Some(receiver) = receiver {
                changed |= hint_expr(vars, receiver, &method.class);
            }
            for (arg, ty) in args.iter().zip(method.params()) {
                changed |= hint_expr(vars, arg, &ty);
            }
        }
        Expr::Binary { op, lhs, rhs, ty } => {
            changed |= hint_expr(vars, lhs, ty);
            let rhs_ty = match op {
                BinaryOp::Shl | BinaryOp::Shr | BinaryOp::Ushr => "I",
                _ => ty,
            };
            changed |= hint_expr(vars, rhs, rhs_ty);
        }
        Expr::Unary { operand, ty, .. } => changed |= hint_expr(vars, operand, ty),
        Expr::Compare { ty, lhs, rhs } => {
            changed |= hint_expr(vars, lhs, ty);
            changed |= hint_expr(vars, rhs, ty);
        }
        Expr::FieldRead { object, field } => changed |= hint_expr(vars, object, &field.class),
        Expr::ArrayRead { index, .. } | Expr::NewArray { size: index, .. } => {
            changed |= hint_expr(vars, index, "I");
        }
        Expr::FilledArray { ty, elements } => {
            let element = ty.strip_prefix('[').unwrap_or(ty);
            for e in elements {
                changed |= hint_expr(vars, e, element);
            }
        }
        _ => {}
    }
    for child in expr.children() {
        changed |= hint_operands(vars, child);
    }
    changed
}

/// Attaches type descriptors to the variables of a method.
///
/// Types flow forward from definitions (`v = expr` takes the type of `expr`)
/// and backward from typed use sites: returned values, call arguments and
/// receivers, stored field values and array elements, operands of typed
/// arithmetic. Both directions are iterated to a fixed point; integer
/// literals without other evidence end up as `int`.
pub fn infer_types(graph: &Graph, vars: &mut VariableTable, method: &MethodInfo) {
    let ret = method.return_type().to_string();
    let mut changed = true;
    while changed {
        changed = false;
        for &node in graph.rpo() {
            let n = &graph[node];
            for ins in &n.ins {
                changed |= hint_instruction(vars, ins, &ret, n.catch_type.as_deref());
            }
        }
    }

    for &node in graph.rpo() {
        for ins in &graph[node].ins {
            if let (Some(var), Some(Expr::Const(Constant::Int(_)))) = (ins.lhs(), ins.rhs()) {
                hint(vars, var, "I");
            }
        }
    }
}

fn hint_instruction(
    vars: &mut VariableTable,
    ins: &Instruction,
    ret: &str,
    catch_type: Option<&str>,
) -> bool {
    let mut changed = false;
    if let (Some(var), Some(rhs)) = (ins.lhs(), ins.rhs()) {
        if let Some(ty) = rhs.type_hint(vars) {
            changed |= hint(vars, var, &ty);
        } else if let Some(ty) = vars.ty(var).map(str::to_string) {
            // a copy learns its type from its destination
            changed |= hint_expr(vars, rhs, &ty);
        }
    }
    match ins {
        Instruction::MoveException(var) => {
            changed |= hint(vars, *var, catch_type.unwrap_or(THROWABLE));
        }
        Instruction::Return(Some(value)) => changed |= hint_expr(vars, value, ret),
        Instruction::FieldWrite {
            object,
            field,
            value,
        } => {
            changed |= hint_expr(vars, object, &field.class);
            changed |= hint_expr(vars, value, &field.ty);
        }
        Instruction::StaticFieldWrite { field, value } => {
            changed |= hint_expr(vars, value, &field.ty);
        }
        Instruction::ArrayWrite {
            array,
            index,
            value,
        } => {
            changed |= hint_expr(vars, index, "I");
            let element = array
                .type_hint(vars)
                .and_then(|t| t.strip_prefix('[').map(str::to_string));
            if let Some(element) = element {
                changed |= hint_expr(vars, value, &element);
            }
        }
        Instruction::IfCompare { lhs, rhs, .. } => {
            if let Some(ty) = lhs.type_hint(vars) {
                changed |= hint_expr(vars, rhs, &ty);
            } else if let Some(ty) = rhs.type_hint(vars) {
                changed |= hint_expr(vars, lhs, &ty);
            }
        }
        Instruction::Throw(value) => changed |= hint_expr(vars, value, THROWABLE),
        _ => {}
    }
    for expr in ins.exprs() {
        changed |= hint_operands(vars, expr);
    }
    changed
}

/// Chooses where locals that are assigned in several places get declared.
///
/// The declaration of a variable goes to the nearest common dominator of its
/// definition nodes, unless one of the definitions sits in that node (the
/// first assignment then declares it). Definitions in handler code are
/// ignored; parameters are never declared. Returns the number of
/// declarations placed.
pub fn place_declarations(
    graph: &mut Graph,
    vars: &VariableTable,
    chains: &DefUse,
    tree: &DominatorTree,
) -> usize {
    let mut def_nodes: FxHashMap<VarId, Vec<NodeId>> = FxHashMap::default();
    for (var, def) in chains.used_defs() {
        if def < 0 || vars.is_param(var) {
            continue;
        }
        let Some(node) = graph.node_of_loc(def) else {
            continue;
        };
        if graph[node].in_catch {
            continue;
        }
        let nodes = def_nodes.entry(var).or_default();
        if !nodes.contains(&node) {
            nodes.push(node);
        }
    }

    let mut order: Vec<VarId> = def_nodes.keys().copied().collect();
    order.sort_unstable();

    let mut placed = 0;
    for var in order {
        let nodes = &def_nodes[&var];
        let Some((&first, rest)) = nodes.split_first() else {
            continue;
        };
        let dom = rest
            .iter()
            .fold(first, |acc, n| tree.common_dominator(acc, *n));
        if nodes.contains(&dom) {
            continue;
        }
        graph[dom].declare(var);
        placed += 1;
        debug!(
            "declaring {} {} in {}",
            vars.ty(var).map_or_else(|| "?".to_string(), descriptor::java_type),
            vars.name(var),
            graph[dom].name
        );
    }
    placed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        input::{AccessFlags, FieldRef, MethodRef},
        ir::InvokeKind,
        test::{graph_shape, make_cond},
    };

    fn set(var: VarId, rhs: Expr) -> Instruction {
        Instruction::Assign { lhs: Some(var), rhs }
    }

    #[test]
    fn test_types_flow_from_definitions_and_uses() {
        let method = MethodInfo::new("LFoo;", "f", "()Ljava/lang/String;", AccessFlags::STATIC);
        let mut vars = VariableTable::new();
        let (s, n, f, c) = (vars.register(0), vars.register(1), vars.register(2), vars.register(3));
        let (mut graph, ids) = graph_shape(&[]);
        graph[ids[0]].ins = vec![
            set(n, Expr::Const(Constant::Int(0x3f80_0000))),
            set(c, Expr::Const(Constant::Int(2))),
            Instruction::StaticFieldWrite {
                field: FieldRef::new("LFoo;", "ratio", "F"),
                value: Expr::Var(n),
            },
            set(
                f,
                Expr::Invoke {
                    kind: InvokeKind::Static,
                    method: MethodRef::new("LFoo;", "g", "(I)Ljava/lang/Object;"),
                    receiver: None,
                    args: vec![Expr::Var(c)],
                },
            ),
            Instruction::Return(Some(Expr::Var(s))),
        ];
        graph.number_ins();

        infer_types(&graph, &mut vars, &method);
        assert_eq!(vars.ty(n), Some("F"));
        assert_eq!(vars.ty(c), Some("I"));
        assert_eq!(vars.ty(f), Some("Ljava/lang/Object;"));
        assert_eq!(vars.ty(s), Some("Ljava/lang/String;"));
    }

    #[test]
    fn test_exception_binding_takes_catch_type() {
        let method = MethodInfo::new("LFoo;", "f", "()V", AccessFlags::STATIC);
        let mut vars = VariableTable::new();
        let (e, t) = (vars.register(0), vars.register(1));
        let (mut graph, ids) = graph_shape(&[(0, 1)]);
        graph[ids[0]].ins = vec![Instruction::MoveException(e)];
        graph[ids[0]].catch_type = Some("Ljava/io/IOException;".into());
        graph[ids[1]].ins = vec![Instruction::MoveException(t)];
        graph.number_ins();

        infer_types(&graph, &mut vars, &method);
        assert_eq!(vars.ty(e), Some("Ljava/io/IOException;"));
        assert_eq!(vars.ty(t), Some(THROWABLE));
    }

    #[test]
    fn test_declaration_hoisted_above_branches() {
        let mut vars = VariableTable::new();
        let v0 = vars.register(0);
        let (mut graph, ids) = graph_shape(&[(0, 1), (0, 2), (1, 3), (2, 3)]);
        make_cond(&mut graph, ids[0], ids[1], ids[2]);
        graph[ids[1]].ins = vec![set(v0, Expr::Const(Constant::Int(1)))];
        graph[ids[2]].ins = vec![set(v0, Expr::Const(Constant::Int(2)))];
        graph[ids[3]].ins = vec![Instruction::Return(Some(Expr::Var(v0)))];
        graph.number_ins();
        let chains = DefUse::build(&graph, &[]);
        let tree = graph.immediate_dominators();

        assert_eq!(place_declarations(&mut graph, &vars, &chains, &tree), 1);
        assert_eq!(graph[ids[0]].var_to_declare, vec![v0]);
        assert!(graph[ids[1]].var_to_declare.is_empty());
    }

    #[test]
    fn test_single_definition_declares_itself() {
        let mut vars = VariableTable::new();
        let v0 = vars.register(0);
        let (mut graph, ids) = graph_shape(&[(0, 1)]);
        graph[ids[0]].ins = vec![set(v0, Expr::Const(Constant::Int(1)))];
        graph[ids[1]].ins = vec![Instruction::Return(Some(Expr::Var(v0)))];
        graph.number_ins();
        let chains = DefUse::build(&graph, &[]);
        let tree = graph.immediate_dominators();

        assert_eq!(place_declarations(&mut graph, &vars, &chains, &tree), 0);
        assert!(graph.nodes().all(|(_, n)| n.var_to_declare.is_empty()));
    }
}
