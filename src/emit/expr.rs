//! IR instructions and expressions to syntax tree nodes.

use crate::{
    emit::{
        ast::{Expression, Statement, Triple, TypeName, VarDecl},
        type_name,
        writer::Writer,
    },
    input::{descriptor, quote_string, MethodRef},
    ir::{BinaryOp, CondOp, Constant, Expr, Instruction, InvokeKind, VarId, VarKind},
};

const OBJECT: &str = "Ljava/lang/Object;";

/// `digits` is the shortest round-trip spelling of `value` in its own width.
fn float_spelling(value: f64, digits: String, class: &str, suffix: &str) -> String {
    if value.is_nan() {
        format!("{class}.NaN")
    } else if value.is_infinite() {
        let sign = if value > 0.0 { "POSITIVE" } else { "NEGATIVE" };
        format!("{class}.{sign}_INFINITY")
    } else {
        format!("{digits}{suffix}")
    }
}

fn boxed_class(ty: &str) -> &'static str {
    match ty {
        "J" => "Ljava/lang/Long;",
        "F" => "Ljava/lang/Float;",
        _ => "Ljava/lang/Double;",
    }
}

/// Element values of a `fill-array-data` payload.
fn array_data(width: u16, data: &[u8]) -> Vec<Constant> {
    let width = usize::from(width.max(1));
    data.chunks_exact(width)
        .map(|chunk| match chunk {
            [a] => Constant::Int(i32::from(*a as i8)),
            [a, b] => Constant::Int(i32::from(i16::from_le_bytes([*a, *b]))),
            [a, b, c, d] => Constant::Int(i32::from_le_bytes([*a, *b, *c, *d])),
            [a, b, c, d, e, f, g, h] => {
                Constant::Wide(i64::from_le_bytes([*a, *b, *c, *d, *e, *f, *g, *h]))
            }
            _ => Constant::Int(0),
        })
        .collect()
}

/// `x + -c` as `x - c` and `x - -c` as `x + c`, for integral literals.
fn fold_negative_literal(op: BinaryOp, right: &Expr, ty: &str) -> (BinaryOp, Option<Expr>) {
    let flipped = match op {
        BinaryOp::Add => BinaryOp::Sub,
        BinaryOp::Sub => BinaryOp::Add,
        _ => return (op, None),
    };
    let negated = match (right, ty) {
        (Expr::Const(Constant::Int(v)), "I" | "S" | "B" | "C") if *v < 0 => {
            v.checked_neg().map(Constant::Int)
        }
        (Expr::Const(Constant::Wide(v)), "J") if *v < 0 => v.checked_neg().map(Constant::Wide),
        _ => None,
    };
    match negated {
        Some(c) => (flipped, Some(Expr::Const(c))),
        None => (op, None),
    }
}

impl Writer<'_> {
    /// Source type of a descriptor.
    pub(super) fn type_name(&self, desc: &str) -> TypeName {
        type_name(self.types, desc)
    }

    fn literal(&self, value: String, ty: &str) -> Expression {
        Expression::Literal {
            value,
            ty: self.type_name(ty),
        }
    }

    pub(super) fn bool_literal(&self, value: bool) -> Expression {
        self.literal(value.to_string(), "Z")
    }

    pub(super) fn dummy(&self, label: &str) -> Expression {
        Expression::Dummy {
            label: label.to_string(),
            args: Vec::new(),
        }
    }

    pub(super) fn decl(&self, var: VarId) -> VarDecl {
        VarDecl {
            ty: self.type_name(self.vars.ty(var).unwrap_or(OBJECT)),
            name: self.vars.name(var),
        }
    }

    fn is_this(&self, expr: &Expr) -> bool {
        match expr {
            Expr::Var(var) => self.vars.get(*var).is_some_and(|v| v.kind == VarKind::This),
            _ => false,
        }
    }

    /// A literal printed for the type the surrounding code expects.
    fn constant(&self, constant: &Constant, expected: Option<&str>) -> Expression {
        match constant {
            Constant::String(s) => self.literal(quote_string(s), "Ljava/lang/String;"),
            Constant::Class(ty) => self.literal(
                format!("{}.class", self.type_name(ty).spelling()),
                "Ljava/lang/Class;",
            ),
            Constant::Int(value) => match expected.unwrap_or("I") {
                "Z" => self.bool_literal(*value != 0),
                "F" => {
                    let float = f32::from_bits(*value as u32);
                    let spelling =
                        float_spelling(f64::from(float), format!("{float:?}"), "Float", "f");
                    self.literal(spelling, "F")
                }
                "J" => self.literal(format!("{value}L"), "J"),
                ty if descriptor::is_reference(ty) && *value == 0 => {
                    self.literal("null".to_string(), ty)
                }
                _ => self.literal(value.to_string(), "I"),
            },
            Constant::Wide(value) => match expected {
                Some("D") => {
                    let double = f64::from_bits(*value as u64);
                    self.literal(float_spelling(double, format!("{double:?}"), "Double", ""), "D")
                }
                _ => self.literal(format!("{value}L"), "J"),
            },
        }
    }

    /// Converts an expression tree; `expected` is the type its context
    /// needs, used to pick the spelling of literals.
    pub(super) fn expr(&self, expr: &Expr, expected: Option<&str>) -> Expression {
        match expr {
            Expr::Var(var) => Expression::local(self.vars.name(*var)),
            Expr::Const(constant) => self.constant(constant, expected),
            Expr::Unary { op, operand, ty } => {
                Expression::prefix(op.symbol(), self.expr(operand, Some(ty))).paren()
            }
            Expr::Binary { op, lhs, rhs, ty } => {
                let rhs_ty = match op {
                    BinaryOp::Shl | BinaryOp::Shr | BinaryOp::Ushr => "I",
                    _ => ty.as_str(),
                };
                Expression::binary(
                    op.symbol(),
                    self.expr(lhs, Some(ty)),
                    self.expr(rhs, Some(rhs_ty)),
                )
                .paren()
            }
            Expr::Compare { ty, lhs, rhs } => {
                let owner = boxed_class(ty);
                Expression::MethodInvocation {
                    triple: Triple::new(owner, "compare", format!("({ty}{ty})I")),
                    name: "compare".to_string(),
                    receiver: Some(Box::new(Expression::TypeName(self.type_name(owner)))),
                    args: vec![self.expr(lhs, Some(ty)), self.expr(rhs, Some(ty))],
                }
            }
            Expr::Cast { ty, operand } | Expr::CheckCast { ty, operand } => Expression::Cast {
                ty: self.type_name(ty),
                operand: Box::new(self.expr(operand, None)),
            }
            .paren(),
            Expr::InstanceOf { ty, operand } => Expression::binary(
                "instanceof",
                self.expr(operand, None),
                Expression::TypeName(self.type_name(ty)),
            )
            .paren(),
            Expr::ArrayLength(array) => Expression::FieldAccess {
                triple: None,
                name: "length".to_string(),
                object: Box::new(self.expr(array, None)),
            },
            Expr::NewInstance(ty) => {
                self.dummy(&format!("new {}", self.type_name(ty).spelling()))
            }
            Expr::NewArray { ty, size } => Expression::ArrayCreation {
                ty: self.type_name(ty.strip_prefix('[').unwrap_or(ty)),
                dims: vec![self.expr(size, Some("I"))],
            },
            Expr::FilledArray { ty, elements } => {
                let element = ty.strip_prefix('[').unwrap_or(ty);
                Expression::ArrayInitializer {
                    ty: Some(self.type_name(ty)),
                    elements: elements
                        .iter()
                        .map(|e| self.expr(e, Some(element)))
                        .collect(),
                }
            }
            Expr::FieldRead { object, field } => Expression::FieldAccess {
                triple: Some(Triple::new(&field.class, &field.name, &field.ty)),
                name: field.name.clone(),
                object: Box::new(self.expr(object, None)),
            },
            Expr::StaticFieldRead(field) => Expression::FieldAccess {
                triple: Some(Triple::new(&field.class, &field.name, &field.ty)),
                name: field.name.clone(),
                object: Box::new(Expression::TypeName(self.type_name(&field.class))),
            },
            Expr::ArrayRead { array, index, .. } => Expression::ArrayAccess {
                array: Box::new(self.expr(array, None)),
                index: Box::new(self.expr(index, Some("I"))),
            },
            Expr::Invoke {
                kind,
                method,
                receiver,
                args,
            } => self.invoke(*kind, method, receiver.as_deref(), args),
        }
    }

    fn invoke(
        &self,
        kind: InvokeKind,
        method: &MethodRef,
        receiver: Option<&Expr>,
        args: &[Expr],
    ) -> Expression {
        let params = method.params();
        let args: Vec<Expression> = args
            .iter()
            .enumerate()
            .map(|(i, arg)| self.expr(arg, params.get(i).map(String::as_str)))
            .collect();
        let triple = Triple::new(&method.class, &method.name, &method.descriptor);

        if method.is_constructor() {
            match receiver {
                Some(r) if self.is_this(r) => {
                    let keyword = if method.class == self.method.class {
                        "this"
                    } else {
                        "super"
                    };
                    return Expression::MethodInvocation {
                        triple,
                        name: keyword.to_string(),
                        receiver: None,
                        args,
                    };
                }
                Some(Expr::NewInstance(ty)) => {
                    return Expression::ClassInstanceCreation {
                        triple,
                        ty: self.type_name(ty),
                        args,
                    };
                }
                _ => {}
            }
        }

        let receiver = match receiver {
            None => Expression::TypeName(self.type_name(&method.class)),
            Some(r) if kind == InvokeKind::Super && self.is_this(r) => Expression::local("super"),
            Some(r) => self.expr(r, None),
        };
        Expression::MethodInvocation {
            triple,
            name: method.name.clone(),
            receiver: Some(Box::new(receiver)),
            args,
        }
    }

    /// Condition of a branch instruction, optionally negated.
    pub(super) fn condition(&self, ins: &Instruction, negate: bool) -> Expression {
        let relation = |op: CondOp| if negate { op.negate() } else { op };
        match ins {
            Instruction::IfCompare { op, lhs, rhs } => {
                let ty = lhs.type_hint(self.vars).or_else(|| rhs.type_hint(self.vars));
                Expression::binary(
                    relation(*op).symbol(),
                    self.expr(lhs, ty.as_deref()),
                    self.expr(rhs, ty.as_deref()),
                )
            }
            Instruction::IfCompareZero { op, operand } => {
                let op = relation(*op);
                if let Expr::Compare { ty, lhs, rhs } = operand {
                    return Expression::binary(
                        op.symbol(),
                        self.expr(lhs, Some(ty)),
                        self.expr(rhs, Some(ty)),
                    );
                }
                let value = self.expr(operand, None);
                match operand.type_hint(self.vars).as_deref() {
                    Some("Z") if op == CondOp::Eq => Expression::prefix("!", value),
                    Some("Z") if op == CondOp::Ne => value,
                    Some(ty) if descriptor::is_reference(ty) => {
                        Expression::binary(op.symbol(), value, self.literal("null".into(), ty))
                    }
                    _ => Expression::binary(op.symbol(), value, self.literal("0".into(), "I")),
                }
            }
            other => self.dummy(&other.describe(self.vars)),
        }
    }

    /// `lhs = rhs`, a declaration on first assignment, or a compound form.
    fn assignment(&mut self, lhs: VarId, rhs: &Expr) -> Statement {
        let ty = self.vars.ty(lhs).map(str::to_string);
        let first = !self.vars.is_param(lhs)
            && self.vars.get(lhs).is_some_and(|v| !v.declared);
        if first {
            let decl = self.decl(lhs);
            let init = self.expr(rhs, ty.as_deref());
            if let Some(v) = self.vars.get_mut(lhs) {
                v.declared = true;
            }
            return Statement::LocalDeclarationStatement {
                decl,
                init: Some(init),
            };
        }

        let target = Expression::local(self.vars.name(lhs));
        let expression = match rhs {
            Expr::Binary {
                op,
                lhs: left,
                rhs: right,
                ty: op_ty,
            } if **left == Expr::Var(lhs) => {
                let (op, negated) = fold_negative_literal(*op, right, op_ty);
                let right = negated.as_ref().unwrap_or(right.as_ref());
                let one = matches!(
                    (right, op_ty.as_str()),
                    (Expr::Const(Constant::Int(1)), "I" | "S" | "B" | "C")
                        | (Expr::Const(Constant::Wide(1)), "J")
                );
                match op {
                    BinaryOp::Add | BinaryOp::Sub if one => Expression::Unary {
                        op: format!("{0}{0}", op.symbol()),
                        operand: Box::new(target),
                        postfix: true,
                    },
                    _ => {
                        let right_ty = match op {
                            BinaryOp::Shl | BinaryOp::Shr | BinaryOp::Ushr => "I",
                            _ => op_ty.as_str(),
                        };
                        Expression::Assignment {
                            lhs: Box::new(target),
                            rhs: Box::new(self.expr(right, Some(right_ty))),
                            op: Some(op.symbol().to_string()),
                        }
                    }
                }
            }
            _ => Expression::assign(target, self.expr(rhs, ty.as_deref())),
        };
        Statement::ExpressionStatement { expression }
    }

    /// `this.<init>()` / `super.<init>()` without arguments.
    fn is_implicit_super_call(&self, rhs: &Expr) -> bool {
        match rhs {
            Expr::Invoke {
                method,
                receiver: Some(receiver),
                args,
                ..
            } => method.is_constructor() && args.is_empty() && self.is_this(receiver),
            _ => false,
        }
    }

    /// The statement an instruction prints as, if any.
    pub(super) fn statement(&mut self, ins: &Instruction) -> Option<Statement> {
        let expression = match ins {
            Instruction::Nop | Instruction::Switch(_) => return None,
            Instruction::Return(value) => {
                let ret = self.method.return_type().to_string();
                return Some(Statement::ReturnStatement {
                    value: value.as_ref().map(|v| self.expr(v, Some(&ret))),
                });
            }
            Instruction::Throw(value) => {
                return Some(Statement::ThrowStatement {
                    value: self.expr(value, None),
                });
            }
            Instruction::Move { lhs, rhs } if *rhs == Expr::Var(*lhs) => return None,
            Instruction::Move { lhs, rhs }
            | Instruction::MoveResult { lhs, rhs }
            | Instruction::Assign {
                lhs: Some(lhs),
                rhs,
            } => return Some(self.assignment(*lhs, rhs)),
            Instruction::Assign { lhs: None, rhs } => {
                if self.options.skip_constructor_super_call
                    && self.method.is_constructor()
                    && self.is_implicit_super_call(rhs)
                {
                    return None;
                }
                self.expr(rhs, None)
            }
            Instruction::IfCompare { .. } | Instruction::IfCompareZero { .. } => {
                self.condition(ins, false)
            }
            Instruction::FillArrayData { array, width, data } => {
                let element = array
                    .type_hint(self.vars)
                    .and_then(|t| t.strip_prefix('[').map(str::to_string));
                let elements = array_data(*width, data)
                    .iter()
                    .map(|c| self.constant(c, element.as_deref()))
                    .collect();
                Expression::assign(
                    self.expr(array, None),
                    Expression::ArrayInitializer { ty: None, elements },
                )
            }
            Instruction::FieldWrite {
                object,
                field,
                value,
            } => Expression::assign(
                Expression::FieldAccess {
                    triple: Some(Triple::new(&field.class, &field.name, &field.ty)),
                    name: field.name.clone(),
                    object: Box::new(self.expr(object, None)),
                },
                self.expr(value, Some(&field.ty)),
            ),
            Instruction::StaticFieldWrite { field, value } => Expression::assign(
                Expression::FieldAccess {
                    triple: Some(Triple::new(&field.class, &field.name, &field.ty)),
                    name: field.name.clone(),
                    object: Box::new(Expression::TypeName(self.type_name(&field.class))),
                },
                self.expr(value, Some(&field.ty)),
            ),
            Instruction::ArrayWrite {
                array,
                index,
                value,
            } => {
                let element = array
                    .type_hint(self.vars)
                    .and_then(|t| t.strip_prefix('[').map(str::to_string));
                Expression::assign(
                    Expression::ArrayAccess {
                        array: Box::new(self.expr(array, None)),
                        index: Box::new(self.expr(index, Some("I"))),
                    },
                    self.expr(value, element.as_deref()),
                )
            }
            Instruction::MonitorEnter(value) | Instruction::MonitorExit(value) => {
                let label = if matches!(ins, Instruction::MonitorEnter(_)) {
                    "monitor enter"
                } else {
                    "monitor exit"
                };
                Expression::Dummy {
                    label: label.to_string(),
                    args: vec![self.expr(value, None)],
                }
            }
            Instruction::MoveException(var) => {
                let caught = self.dummy("move-exception");
                if self.vars.get(*var).is_some_and(|v| !v.declared) {
                    let decl = self.decl(*var);
                    if let Some(v) = self.vars.get_mut(*var) {
                        v.declared = true;
                    }
                    return Some(Statement::LocalDeclarationStatement {
                        decl,
                        init: Some(caught),
                    });
                }
                Expression::assign(Expression::local(self.vars.name(*var)), caught)
            }
        };
        Some(Statement::ExpressionStatement { expression })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        emit::EmitOptions,
        graph::Graph,
        input::{AccessFlags, DescriptorInterner, FieldRef, MethodInfo},
        ir::VariableTable,
    };

    fn with_writer<R>(
        method: &MethodInfo,
        vars: &mut VariableTable,
        f: impl FnOnce(&mut Writer<'_>) -> R,
    ) -> R {
        let graph = Graph::new();
        let types = DescriptorInterner::new();
        let mut writer = Writer::new(&graph, vars, method, &types, EmitOptions::default());
        f(&mut writer)
    }

    #[test]
    fn test_literals_follow_expected_type() {
        let method = MethodInfo::new("LFoo;", "f", "()V", AccessFlags::STATIC);
        let mut vars = VariableTable::new();
        with_writer(&method, &mut vars, |w| {
            let one = Constant::Int(0x3f80_0000);
            let spell = |e: Expression| match e {
                Expression::Literal { value, .. } => value,
                other => panic!("not a literal: {other:?}"),
            };
            assert_eq!(spell(w.constant(&one, Some("F"))), "1.0f");
            assert_eq!(spell(w.constant(&Constant::Int(1), Some("Z"))), "true");
            assert_eq!(spell(w.constant(&Constant::Int(0), Some("Ljava/lang/String;"))), "null");
            assert_eq!(spell(w.constant(&Constant::Int(-3), None)), "-3");
            assert_eq!(
                spell(w.constant(&Constant::Wide(0x3ff0_0000_0000_0000), Some("D"))),
                "1.0"
            );
            assert_eq!(spell(w.constant(&Constant::Wide(7), Some("J"))), "7L");
        });
    }

    #[test]
    fn test_first_assignment_declares() {
        let method = MethodInfo::new("LFoo;", "f", "()V", AccessFlags::STATIC);
        let mut vars = VariableTable::new();
        let v0 = vars.register(0);
        vars.hint_type(v0, "I");
        with_writer(&method, &mut vars, |w| {
            let first = w.statement(&Instruction::Assign {
                lhs: Some(v0),
                rhs: Expr::Const(Constant::Int(0)),
            });
            assert!(matches!(
                first,
                Some(Statement::LocalDeclarationStatement { init: Some(_), .. })
            ));
            let bump = w.statement(&Instruction::Assign {
                lhs: Some(v0),
                rhs: Expr::Binary {
                    op: BinaryOp::Add,
                    lhs: Expr::var(v0),
                    rhs: Box::new(Expr::Const(Constant::Int(1))),
                    ty: "I".into(),
                },
            });
            match bump {
                Some(Statement::ExpressionStatement {
                    expression: Expression::Unary { op, postfix, .. },
                }) => {
                    assert_eq!(op, "++");
                    assert!(postfix);
                }
                other => panic!("unexpected {other:?}"),
            }
            assert_eq!(
                w.statement(&Instruction::Move {
                    lhs: v0,
                    rhs: Expr::Var(v0)
                }),
                None
            );
        });
    }

    #[test]
    fn test_negative_literal_folds_into_subtraction() {
        let method = MethodInfo::new("LFoo;", "f", "(I)V", AccessFlags::STATIC);
        let mut vars = VariableTable::for_method(&method);
        let p0 = vars.params()[0];
        let step = |op, by| Instruction::Assign {
            lhs: Some(p0),
            rhs: Expr::Binary {
                op,
                lhs: Expr::var(p0),
                rhs: Box::new(Expr::Const(Constant::Int(by))),
                ty: "I".into(),
            },
        };
        with_writer(&method, &mut vars, |w| {
            match w.statement(&step(BinaryOp::Add, -1)) {
                Some(Statement::ExpressionStatement {
                    expression: Expression::Unary { op, .. },
                }) => assert_eq!(op, "--"),
                other => panic!("unexpected {other:?}"),
            }
            match w.statement(&step(BinaryOp::Add, -5)) {
                Some(Statement::ExpressionStatement {
                    expression: Expression::Assignment { op, rhs, .. },
                }) => {
                    assert_eq!(op.as_deref(), Some("-"));
                    assert!(matches!(*rhs, Expression::Literal { ref value, .. } if value == "5"));
                }
                other => panic!("unexpected {other:?}"),
            }
            match w.statement(&step(BinaryOp::Sub, -1)) {
                Some(Statement::ExpressionStatement {
                    expression: Expression::Unary { op, .. },
                }) => assert_eq!(op, "++"),
                other => panic!("unexpected {other:?}"),
            }
        });
    }

    #[test]
    fn test_constructor_forms() {
        let method = MethodInfo::new("LFoo;", "<init>", "()V", AccessFlags::CONSTRUCTOR);
        let mut vars = VariableTable::for_method(&method);
        let this = vars.params()[0];
        with_writer(&method, &mut vars, |w| {
            let super_call = Instruction::Assign {
                lhs: None,
                rhs: Expr::Invoke {
                    kind: InvokeKind::Direct,
                    method: MethodRef::new("Ljava/lang/Object;", "<init>", "()V"),
                    receiver: Some(Expr::var(this)),
                    args: vec![],
                },
            };
            assert_eq!(w.statement(&super_call), None);

            let creation = w.expr(
                &Expr::Invoke {
                    kind: InvokeKind::Direct,
                    method: MethodRef::new("LBar;", "<init>", "(I)V"),
                    receiver: Some(Box::new(Expr::NewInstance("LBar;".into()))),
                    args: vec![Expr::Const(Constant::Int(2))],
                },
                None,
            );
            assert!(matches!(creation, Expression::ClassInstanceCreation { .. }));
        });
    }

    #[test]
    fn test_zero_compare_forms() {
        let method = MethodInfo::new("LFoo;", "f", "()V", AccessFlags::STATIC);
        let mut vars = VariableTable::new();
        let flag = vars.register(0);
        vars.hint_type(flag, "Z");
        let obj = vars.register(1);
        vars.hint_type(obj, "Ljava/lang/Object;");
        with_writer(&method, &mut vars, |w| {
            let is_false = Instruction::IfCompareZero {
                op: CondOp::Eq,
                operand: Expr::Var(flag),
            };
            assert!(matches!(
                w.condition(&is_false, false),
                Expression::Unary { ref op, .. } if op == "!"
            ));
            assert_eq!(w.condition(&is_false, true), Expression::local("v0"));

            let is_null = Instruction::IfCompareZero {
                op: CondOp::Eq,
                operand: Expr::Var(obj),
            };
            match w.condition(&is_null, true) {
                Expression::BinaryInfix { op, rhs, .. } => {
                    assert_eq!(op, "!=");
                    assert!(matches!(*rhs, Expression::Literal { ref value, .. } if value == "null"));
                }
                other => panic!("unexpected {other:?}"),
            }

            let write = w.statement(&Instruction::StaticFieldWrite {
                field: FieldRef::new("LFoo;", "on", "Z"),
                value: Expr::Const(Constant::Int(0)),
            });
            let Some(Statement::ExpressionStatement {
                expression: Expression::Assignment { rhs, .. },
            }) = write
            else {
                panic!("not an assignment");
            };
            assert!(matches!(*rhs, Expression::Literal { ref value, .. } if value == "false"));
        });
    }

    #[test]
    fn test_array_payload_decoding() {
        assert_eq!(
            array_data(2, &[1, 0, 0xff, 0xff]),
            vec![Constant::Int(1), Constant::Int(-1)]
        );
        assert_eq!(array_data(1, &[0x80]), vec![Constant::Int(-128)]);
    }
}
