//! Statement level IR instructions.

use crate::{
    input::{descriptor, FieldRef},
    ir::{CondOp, Constant, Expr, VarId, VariableTable},
};

/// One lifted instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// No operation, also the lifting of unknown opcodes
    Nop,
    /// Register copy `lhs = rhs`
    Move {
        /// Destination
        lhs: VarId,
        /// Source, a variable until propagation rewrites it
        rhs: Expr,
    },
    /// `move-result*`, binding the pending invoke temporary
    MoveResult {
        /// Destination
        lhs: VarId,
        /// The temporary, or the call once propagated
        rhs: Expr,
    },
    /// `lhs = rhs`; without `lhs` the value is discarded (expression statement)
    Assign {
        /// Destination
        lhs: Option<VarId>,
        /// Computed value
        rhs: Expr,
    },
    /// `return` or `return value`
    Return(Option<Expr>),
    /// `throw value`
    Throw(Expr),
    /// Switch on a value; cases live on the graph node
    Switch(Expr),
    /// Two operand conditional branch
    IfCompare {
        /// Relation for the taken branch
        op: CondOp,
        /// Left operand
        lhs: Expr,
        /// Right operand
        rhs: Expr,
    },
    /// Conditional branch comparing against zero or `null`
    IfCompareZero {
        /// Relation for the taken branch
        op: CondOp,
        /// Tested value
        operand: Expr,
    },
    /// `fill-array-data`
    FillArrayData {
        /// Filled array
        array: Expr,
        /// Element width in bytes
        width: u16,
        /// Raw little-endian payload
        data: Vec<u8>,
    },
    /// `object.field = value`
    FieldWrite {
        /// Object reference
        object: Expr,
        /// Field
        field: FieldRef,
        /// Stored value
        value: Expr,
    },
    /// `Class.field = value`
    StaticFieldWrite {
        /// Field
        field: FieldRef,
        /// Stored value
        value: Expr,
    },
    /// `array[index] = value`
    ArrayWrite {
        /// Array reference
        array: Expr,
        /// Element index
        index: Expr,
        /// Stored value
        value: Expr,
    },
    /// `monitor-enter`
    MonitorEnter(Expr),
    /// `monitor-exit`
    MonitorExit(Expr),
    /// Binds the in-flight exception of a handler
    MoveException(VarId),
}

impl Instruction {
    /// Operand trees in evaluation order.
    #[must_use]
    pub fn exprs(&self) -> Vec<&Expr> {
        match self {
            Instruction::Nop | Instruction::MoveException(_) | Instruction::Return(None) => {
                Vec::new()
            }
            Instruction::Move { rhs, .. }
            | Instruction::MoveResult { rhs, .. }
            | Instruction::Assign { rhs, .. }
            | Instruction::Return(Some(rhs))
            | Instruction::Throw(rhs)
            | Instruction::Switch(rhs)
            | Instruction::IfCompareZero { operand: rhs, .. }
            | Instruction::FillArrayData { array: rhs, .. }
            | Instruction::StaticFieldWrite { value: rhs, .. }
            | Instruction::MonitorEnter(rhs)
            | Instruction::MonitorExit(rhs) => vec![rhs],
            Instruction::IfCompare { lhs, rhs, .. } => vec![lhs, rhs],
            Instruction::FieldWrite { object, value, .. } => vec![object, value],
            Instruction::ArrayWrite {
                array,
                index,
                value,
            } => vec![array, index, value],
        }
    }

    /// Operand trees, mutable.
    pub fn exprs_mut(&mut self) -> Vec<&mut Expr> {
        match self {
            Instruction::Nop | Instruction::MoveException(_) | Instruction::Return(None) => {
                Vec::new()
            }
            Instruction::Move { rhs, .. }
            | Instruction::MoveResult { rhs, .. }
            | Instruction::Assign { rhs, .. }
            | Instruction::Return(Some(rhs))
            | Instruction::Throw(rhs)
            | Instruction::Switch(rhs)
            | Instruction::IfCompareZero { operand: rhs, .. }
            | Instruction::FillArrayData { array: rhs, .. }
            | Instruction::StaticFieldWrite { value: rhs, .. }
            | Instruction::MonitorEnter(rhs)
            | Instruction::MonitorExit(rhs) => vec![rhs],
            Instruction::IfCompare { lhs, rhs, .. } => vec![lhs, rhs],
            Instruction::FieldWrite { object, value, .. } => vec![object, value],
            Instruction::ArrayWrite {
                array,
                index,
                value,
            } => vec![array, index, value],
        }
    }

    /// Distinct variables read, in first-use order.
    #[must_use]
    pub fn used_vars(&self) -> Vec<VarId> {
        let mut all = Vec::new();
        for expr in self.exprs() {
            expr.collect_vars(&mut all);
        }
        let mut seen = Vec::with_capacity(all.len());
        for var in all {
            if !seen.contains(&var) {
                seen.push(var);
            }
        }
        seen
    }

    /// The variable this instruction defines.
    #[must_use]
    pub fn lhs(&self) -> Option<VarId> {
        match self {
            Instruction::Move { lhs, .. }
            | Instruction::MoveResult { lhs, .. }
            | Instruction::MoveException(lhs) => Some(*lhs),
            Instruction::Assign { lhs, .. } => *lhs,
            _ => None,
        }
    }

    /// Value assigned to [`Instruction::lhs`].
    #[must_use]
    pub fn rhs(&self) -> Option<&Expr> {
        match self {
            Instruction::Move { rhs, .. }
            | Instruction::MoveResult { rhs, .. }
            | Instruction::Assign { rhs, .. } => Some(rhs),
            _ => None,
        }
    }

    /// Returns `true` when removing the instruction changes observable state.
    #[must_use]
    pub fn has_side_effect(&self) -> bool {
        match self {
            Instruction::Nop | Instruction::MoveException(_) => false,
            Instruction::Move { rhs, .. }
            | Instruction::MoveResult { rhs, .. }
            | Instruction::Assign { rhs, .. } => rhs.has_side_effect(),
            Instruction::IfCompare { .. }
            | Instruction::IfCompareZero { .. }
            | Instruction::Switch(_) => self.exprs().iter().any(|e| e.has_side_effect()),
            Instruction::Return(_)
            | Instruction::Throw(_)
            | Instruction::FillArrayData { .. }
            | Instruction::FieldWrite { .. }
            | Instruction::StaticFieldWrite { .. }
            | Instruction::ArrayWrite { .. }
            | Instruction::MonitorEnter(_)
            | Instruction::MonitorExit(_) => true,
        }
    }

    /// Returns `true` when the instruction writes heap state.
    #[must_use]
    pub fn writes_memory(&self) -> bool {
        matches!(
            self,
            Instruction::FillArrayData { .. }
                | Instruction::FieldWrite { .. }
                | Instruction::StaticFieldWrite { .. }
                | Instruction::ArrayWrite { .. }
                | Instruction::MonitorEnter(_)
                | Instruction::MonitorExit(_)
        )
    }

    /// Returns `true` when the defined value comes straight from a call.
    #[must_use]
    pub fn is_call(&self) -> bool {
        self.rhs().is_some_and(Expr::is_call)
    }

    /// Returns `true` when uses of the defined variable may be replaced by the
    /// right-hand side.
    #[must_use]
    pub fn is_propagable(&self) -> bool {
        self.lhs().is_some()
            && !matches!(self, Instruction::MoveException(_))
            && self.rhs().is_some_and(Expr::is_propagable)
    }

    /// Returns `true` for constant assignments.
    #[must_use]
    pub fn is_const(&self) -> bool {
        self.rhs().is_some_and(Expr::is_const)
    }

    /// Returns `true` for `if-*` instructions.
    #[must_use]
    pub fn is_conditional(&self) -> bool {
        matches!(
            self,
            Instruction::IfCompare { .. } | Instruction::IfCompareZero { .. }
        )
    }

    /// Replaces every read of `var` by `with`; returns the number of
    /// replacements.
    pub fn replace_var(&mut self, var: VarId, with: &Expr) -> usize {
        self.exprs_mut()
            .into_iter()
            .map(|expr| expr.replace_var(var, with))
            .sum()
    }

    /// Rebinds the defined variable.
    pub fn replace_lhs(&mut self, new: VarId) {
        match self {
            Instruction::Move { lhs, .. }
            | Instruction::MoveResult { lhs, .. }
            | Instruction::MoveException(lhs) => *lhs = new,
            Instruction::Assign { lhs, .. } => *lhs = Some(new),
            _ => {}
        }
    }

    /// Drops the result binding of a call while keeping the call itself.
    pub fn remove_defined_var(&mut self) {
        let rhs = match self {
            Instruction::Move { rhs, .. }
            | Instruction::MoveResult { rhs, .. }
            | Instruction::Assign { rhs, .. } => std::mem::replace(rhs, Expr::Const(Constant::Int(0))),
            _ => return,
        };
        *self = Instruction::Assign { lhs: None, rhs };
    }

    /// Compact one-line rendering used in graph dumps and logs.
    #[must_use]
    pub fn describe(&self, vars: &VariableTable) -> String {
        let e = |expr: &Expr| describe_expr(expr, vars);
        match self {
            Instruction::Nop => "nop".to_string(),
            Instruction::Move { lhs, rhs } | Instruction::MoveResult { lhs, rhs } => {
                format!("{} = {}", vars.name(*lhs), e(rhs))
            }
            Instruction::Assign { lhs: Some(lhs), rhs } => format!("{} = {}", vars.name(*lhs), e(rhs)),
            Instruction::Assign { lhs: None, rhs } => e(rhs),
            Instruction::Return(None) => "return".to_string(),
            Instruction::Return(Some(value)) => format!("return {}", e(value)),
            Instruction::Throw(value) => format!("throw {}", e(value)),
            Instruction::Switch(value) => format!("switch({})", e(value)),
            Instruction::IfCompare { op, lhs, rhs } => {
                format!("if ({} {} {})", e(lhs), op.symbol(), e(rhs))
            }
            Instruction::IfCompareZero { op, operand } => {
                format!("if ({} {} 0)", e(operand), op.symbol())
            }
            Instruction::FillArrayData { array, data, width } => {
                format!("{} = fill[{}x{}]", e(array), data.len() / usize::from((*width).max(1)), width)
            }
            Instruction::FieldWrite {
                object,
                field,
                value,
            } => format!("{}.{} = {}", e(object), field.name, e(value)),
            Instruction::StaticFieldWrite { field, value } => format!(
                "{}.{} = {}",
                descriptor::java_type(&field.class),
                field.name,
                e(value)
            ),
            Instruction::ArrayWrite {
                array,
                index,
                value,
            } => format!("{}[{}] = {}", e(array), e(index), e(value)),
            Instruction::MonitorEnter(value) => format!("monitor-enter({})", e(value)),
            Instruction::MonitorExit(value) => format!("monitor-exit({})", e(value)),
            Instruction::MoveException(lhs) => format!("{} = move-exception", vars.name(*lhs)),
        }
    }
}

fn describe_expr(expr: &Expr, vars: &VariableTable) -> String {
    let e = |expr: &Expr| describe_expr(expr, vars);
    match expr {
        Expr::Var(id) => vars.name(*id),
        Expr::Const(Constant::Int(v)) => v.to_string(),
        Expr::Const(Constant::Wide(v)) => format!("{v}L"),
        Expr::Const(Constant::String(s)) => crate::input::quote_string(s),
        Expr::Const(Constant::Class(t)) => format!("{}.class", descriptor::java_type(t)),
        Expr::Unary { op, operand, .. } => format!("{}{}", op.symbol(), e(operand)),
        Expr::Binary { op, lhs, rhs, .. } => format!("({} {} {})", e(lhs), op.symbol(), e(rhs)),
        Expr::Compare { ty, lhs, rhs } => format!("cmp{}({}, {})", ty, e(lhs), e(rhs)),
        Expr::Cast { ty, operand } | Expr::CheckCast { ty, operand } => {
            format!("(({}) {})", descriptor::java_type(ty), e(operand))
        }
        Expr::InstanceOf { ty, operand } => {
            format!("{} instanceof {}", e(operand), descriptor::java_type(ty))
        }
        Expr::ArrayLength(array) => format!("{}.length", e(array)),
        Expr::NewInstance(ty) => format!("new {}", descriptor::java_type(ty)),
        Expr::NewArray { ty, size } => {
            let element = ty.strip_prefix('[').unwrap_or(ty);
            format!("new {}[{}]", descriptor::java_type(element), e(size))
        }
        Expr::FilledArray { elements, .. } => {
            let items: Vec<String> = elements.iter().map(e).collect();
            format!("{{{}}}", items.join(", "))
        }
        Expr::FieldRead { object, field } => format!("{}.{}", e(object), field.name),
        Expr::StaticFieldRead(field) => {
            format!("{}.{}", descriptor::java_type(&field.class), field.name)
        }
        Expr::ArrayRead { array, index, .. } => format!("{}[{}]", e(array), e(index)),
        Expr::Invoke {
            method,
            receiver,
            args,
            ..
        } => {
            let args: Vec<String> = args.iter().map(e).collect();
            let target = match receiver {
                Some(receiver) => e(receiver),
                None => descriptor::java_type(&method.class),
            };
            format!("{}.{}({})", target, method.name, args.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        input::MethodRef,
        ir::{BinaryOp, InvokeKind},
    };

    fn call(receiver: VarId) -> Expr {
        Expr::Invoke {
            kind: InvokeKind::Virtual,
            method: MethodRef::new("LFoo;", "size", "()I"),
            receiver: Some(Expr::var(receiver)),
            args: vec![],
        }
    }

    #[test]
    fn test_remove_defined_var_keeps_call() {
        let mut vars = VariableTable::new();
        let obj = vars.register(1);
        let tmp = vars.new_temp(Some("I".into()));
        let mut ins = Instruction::Assign {
            lhs: Some(tmp),
            rhs: call(obj),
        };
        assert!(ins.is_call());
        assert!(ins.has_side_effect());
        assert_eq!(ins.lhs(), Some(tmp));

        ins.remove_defined_var();
        assert_eq!(ins.lhs(), None);
        assert!(ins.is_call());
        assert_eq!(ins.used_vars(), vec![obj]);
        assert_eq!(ins.describe(&vars), "v1.size()");
    }

    #[test]
    fn test_used_vars_are_distinct() {
        let mut vars = VariableTable::new();
        let a = vars.register(0);
        let b = vars.register(1);
        let ins = Instruction::ArrayWrite {
            array: Expr::Var(a),
            index: Expr::Var(b),
            value: Expr::Var(a),
        };
        assert_eq!(ins.used_vars(), vec![a, b]);
        assert!(ins.has_side_effect());
        assert!(ins.lhs().is_none());
    }

    #[test]
    fn test_replace_and_rebind() {
        let mut vars = VariableTable::new();
        let a = vars.register(0);
        let b = vars.register(1);
        let c = vars.register(2);
        let mut ins = Instruction::Assign {
            lhs: Some(c),
            rhs: Expr::Binary {
                op: BinaryOp::Add,
                lhs: Expr::var(a),
                rhs: Expr::var(b),
                ty: "I".into(),
            },
        };
        assert!(ins.is_propagable());
        assert!(!ins.has_side_effect());

        assert_eq!(ins.replace_var(b, &Expr::Const(Constant::Int(1))), 1);
        let fresh = vars.new_split(c, 0);
        ins.replace_lhs(fresh);
        assert_eq!(ins.describe(&vars), "v2_0 = (v0 + 1)");
    }

    #[test]
    fn test_conditionals_and_moves() {
        let mut vars = VariableTable::new();
        let a = vars.register(0);
        let cond = Instruction::IfCompareZero {
            op: CondOp::Eq,
            operand: Expr::Var(a),
        };
        assert!(cond.is_conditional());
        assert!(!cond.has_side_effect());
        assert_eq!(cond.describe(&vars), "if (v0 == 0)");

        let ex = Instruction::MoveException(a);
        assert_eq!(ex.lhs(), Some(a));
        assert!(!ex.is_propagable());
        assert!(!ex.has_side_effect());

        let arr = Instruction::Assign {
            lhs: Some(a),
            rhs: Expr::NewArray {
                ty: "[I".into(),
                size: Box::new(Expr::Const(Constant::Int(3))),
            },
        };
        assert!(!arr.is_propagable());
        assert_eq!(arr.describe(&vars), "v0 = new int[3]");
    }
}
