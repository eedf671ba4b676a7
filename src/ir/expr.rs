//! Expression operands of IR instructions.
//!
//! Lifting produces flat expressions whose operands are [`Expr::Var`] leaves.
//! Register propagation later substitutes whole right-hand sides into those
//! leaves, so after the dataflow passes an [`Expr`] is an arbitrary tree.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use crate::{
    input::{descriptor, FieldRef, MethodRef},
    ir::{VarId, VariableTable},
};

/// Binary arithmetic and bitwise operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum BinaryOp {
    /// `+`
    #[strum(serialize = "+")]
    Add,
    /// `-`
    #[strum(serialize = "-")]
    Sub,
    /// `*`
    #[strum(serialize = "*")]
    Mul,
    /// `/`
    #[strum(serialize = "/")]
    Div,
    /// `%`
    #[strum(serialize = "%")]
    Rem,
    /// `&`
    #[strum(serialize = "&")]
    And,
    /// `|`
    #[strum(serialize = "|")]
    Or,
    /// `^`
    #[strum(serialize = "^")]
    Xor,
    /// `<<`
    #[strum(serialize = "<<")]
    Shl,
    /// `>>`
    #[strum(serialize = ">>")]
    Shr,
    /// `>>>`
    #[strum(serialize = ">>>")]
    Ushr,
}

impl BinaryOp {
    /// Java operator symbol.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::Xor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Ushr => ">>>",
        }
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// Arithmetic negation `-`
    Neg,
    /// Bitwise complement `~`
    Not,
}

impl UnaryOp {
    /// Java operator symbol.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "~",
        }
    }
}

/// Relational operators of conditional branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter)]
pub enum CondOp {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `>=`
    Ge,
    /// `>`
    Gt,
    /// `<=`
    Le,
}

impl CondOp {
    /// The operator testing the opposite outcome.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dexscope::ir::CondOp;
    ///
    /// assert_eq!(CondOp::Lt.negate(), CondOp::Ge);
    /// assert_eq!(CondOp::Lt.negate().negate(), CondOp::Lt);
    /// ```
    #[must_use]
    pub fn negate(self) -> CondOp {
        match self {
            CondOp::Eq => CondOp::Ne,
            CondOp::Ne => CondOp::Eq,
            CondOp::Lt => CondOp::Ge,
            CondOp::Ge => CondOp::Lt,
            CondOp::Gt => CondOp::Le,
            CondOp::Le => CondOp::Gt,
        }
    }

    /// Java operator symbol.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            CondOp::Eq => "==",
            CondOp::Ne => "!=",
            CondOp::Lt => "<",
            CondOp::Ge => ">=",
            CondOp::Gt => ">",
            CondOp::Le => "<=",
        }
    }
}

/// A literal as encoded in the bytecode.
///
/// Narrow and wide literals are raw bit patterns; whether `0x3f800000` is the
/// integer 1065353216 or the float `1.0` is decided when the literal is
/// printed in a typed position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constant {
    /// 32-bit pattern from the `const`, `const/4`, `const/16`, `const/high16` family
    Int(i32),
    /// 64-bit pattern from the `const-wide` family
    Wide(i64),
    /// String literal
    String(String),
    /// Class literal, as a type descriptor
    Class(String),
}

/// Dispatch kind of a method invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum InvokeKind {
    /// `invoke-virtual`
    Virtual,
    /// `invoke-super`
    Super,
    /// `invoke-direct`
    Direct,
    /// `invoke-static`
    Static,
    /// `invoke-interface`
    Interface,
}

/// An expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Variable read
    Var(VarId),
    /// Literal
    Const(Constant),
    /// `op operand`, computed in type `ty`
    Unary {
        /// Operator
        op: UnaryOp,
        /// Operand
        operand: Box<Expr>,
        /// Primitive type descriptor of the operation
        ty: String,
    },
    /// `lhs op rhs`, computed in type `ty`
    Binary {
        /// Operator
        op: BinaryOp,
        /// Left operand
        lhs: Box<Expr>,
        /// Right operand
        rhs: Box<Expr>,
        /// Primitive type descriptor of the operation
        ty: String,
    },
    /// Three-way comparison (`cmp-long`, `cmpl-float`, ...)
    Compare {
        /// Operand type descriptor (`J`, `F` or `D`)
        ty: String,
        /// Left operand
        lhs: Box<Expr>,
        /// Right operand
        rhs: Box<Expr>,
    },
    /// Primitive conversion
    Cast {
        /// Target type descriptor
        ty: String,
        /// Converted value
        operand: Box<Expr>,
    },
    /// Reference cast (`check-cast`)
    CheckCast {
        /// Target type descriptor
        ty: String,
        /// Checked value
        operand: Box<Expr>,
    },
    /// `operand instanceof ty`
    InstanceOf {
        /// Tested type descriptor
        ty: String,
        /// Tested value
        operand: Box<Expr>,
    },
    /// `array.length`
    ArrayLength(Box<Expr>),
    /// Uninitialized object of a class (`new-instance`)
    NewInstance(String),
    /// `new T[size]`
    NewArray {
        /// Array type descriptor
        ty: String,
        /// Length
        size: Box<Expr>,
    },
    /// `new T[] { elements }`
    FilledArray {
        /// Array type descriptor
        ty: String,
        /// Element values
        elements: Vec<Expr>,
    },
    /// `object.field`
    FieldRead {
        /// Object reference
        object: Box<Expr>,
        /// Field
        field: FieldRef,
    },
    /// `Class.field`
    StaticFieldRead(FieldRef),
    /// `array[index]`
    ArrayRead {
        /// Array reference
        array: Box<Expr>,
        /// Element index
        index: Box<Expr>,
        /// Element type, when the opcode pins it down
        ty: Option<String>,
    },
    /// Method invocation
    Invoke {
        /// Dispatch kind
        kind: InvokeKind,
        /// Called method
        method: MethodRef,
        /// Receiver, absent for static calls
        receiver: Option<Box<Expr>>,
        /// Arguments, receiver excluded
        args: Vec<Expr>,
    },
}

impl Expr {
    /// Shorthand for a boxed variable leaf.
    #[must_use]
    pub fn var(id: VarId) -> Box<Expr> {
        Box::new(Expr::Var(id))
    }

    /// Direct subexpressions.
    #[must_use]
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Var(_) | Expr::Const(_) | Expr::NewInstance(_) | Expr::StaticFieldRead(_) => {
                Vec::new()
            }
            Expr::Unary { operand, .. }
            | Expr::Cast { operand, .. }
            | Expr::CheckCast { operand, .. }
            | Expr::InstanceOf { operand, .. }
            | Expr::ArrayLength(operand)
            | Expr::NewArray { size: operand, .. }
            | Expr::FieldRead {
                object: operand, ..
            } => vec![operand],
            Expr::Binary { lhs, rhs, .. } | Expr::Compare { lhs, rhs, .. } => vec![lhs, rhs],
            Expr::ArrayRead { array, index, .. } => vec![array, index],
            Expr::FilledArray { elements, .. } => elements.iter().collect(),
            Expr::Invoke { receiver, args, .. } => {
                receiver.iter().map(AsRef::as_ref).chain(args.iter()).collect()
            }
        }
    }

    /// Direct subexpressions, mutable.
    pub fn children_mut(&mut self) -> Vec<&mut Expr> {
        match self {
            Expr::Var(_) | Expr::Const(_) | Expr::NewInstance(_) | Expr::StaticFieldRead(_) => {
                Vec::new()
            }
            Expr::Unary { operand, .. }
            | Expr::Cast { operand, .. }
            | Expr::CheckCast { operand, .. }
            | Expr::InstanceOf { operand, .. }
            | Expr::ArrayLength(operand)
            | Expr::NewArray { size: operand, .. }
            | Expr::FieldRead {
                object: operand, ..
            } => vec![operand],
            Expr::Binary { lhs, rhs, .. } | Expr::Compare { lhs, rhs, .. } => vec![lhs, rhs],
            Expr::ArrayRead { array, index, .. } => vec![array, index],
            Expr::FilledArray { elements, .. } => elements.iter_mut().collect(),
            Expr::Invoke { receiver, args, .. } => receiver
                .iter_mut()
                .map(AsMut::as_mut)
                .chain(args.iter_mut())
                .collect(),
        }
    }

    /// Appends every variable read by the tree, in evaluation order.
    pub fn collect_vars(&self, out: &mut Vec<VarId>) {
        if let Expr::Var(id) = self {
            out.push(*id);
        }
        for child in self.children() {
            child.collect_vars(out);
        }
    }

    /// Variables read by the tree, in evaluation order, with repetitions.
    #[must_use]
    pub fn used_vars(&self) -> Vec<VarId> {
        let mut out = Vec::new();
        self.collect_vars(&mut out);
        out
    }

    /// Replaces every read of `var` by `with`; returns the number of
    /// replacements.
    pub fn replace_var(&mut self, var: VarId, with: &Expr) -> usize {
        if *self == Expr::Var(var) {
            *self = with.clone();
            return 1;
        }
        self.children_mut()
            .into_iter()
            .map(|child| child.replace_var(var, with))
            .sum()
    }

    /// Returns `true` when evaluating the tree calls a method.
    #[must_use]
    pub fn has_side_effect(&self) -> bool {
        matches!(self, Expr::Invoke { .. }) || self.children().iter().any(|c| c.has_side_effect())
    }

    /// Returns `true` when the tree reads heap state (fields or array elements).
    ///
    /// Such trees may not move across a write either.
    #[must_use]
    pub fn reads_memory(&self) -> bool {
        matches!(
            self,
            Expr::FieldRead { .. } | Expr::StaticFieldRead(_) | Expr::ArrayRead { .. }
        ) || self.children().iter().any(|c| c.reads_memory())
    }

    /// Returns `true` for top-level calls.
    #[must_use]
    pub fn is_call(&self) -> bool {
        matches!(self, Expr::Invoke { .. })
    }

    /// Returns `true` for literals.
    #[must_use]
    pub fn is_const(&self) -> bool {
        matches!(self, Expr::Const(_))
    }

    /// Returns `false` for values whose identity matters (fresh arrays).
    #[must_use]
    pub fn is_propagable(&self) -> bool {
        !matches!(self, Expr::NewArray { .. } | Expr::FilledArray { .. })
    }

    /// Best known type descriptor of the value.
    #[must_use]
    pub fn type_hint(&self, vars: &VariableTable) -> Option<String> {
        match self {
            Expr::Var(id) => vars.ty(*id).map(str::to_string),
            Expr::Const(Constant::String(_)) => Some("Ljava/lang/String;".to_string()),
            Expr::Const(Constant::Class(_)) => Some("Ljava/lang/Class;".to_string()),
            Expr::Const(Constant::Wide(_)) => Some("J".to_string()),
            Expr::Const(Constant::Int(_)) => None,
            Expr::Unary { ty, .. }
            | Expr::Binary { ty, .. }
            | Expr::Cast { ty, .. }
            | Expr::CheckCast { ty, .. }
            | Expr::NewInstance(ty)
            | Expr::NewArray { ty, .. }
            | Expr::FilledArray { ty, .. } => Some(ty.clone()),
            Expr::Compare { .. } | Expr::ArrayLength(_) => Some("I".to_string()),
            Expr::InstanceOf { .. } => Some("Z".to_string()),
            Expr::FieldRead { field, .. } | Expr::StaticFieldRead(field) => Some(field.ty.clone()),
            Expr::ArrayRead { array, ty, .. } => ty.clone().or_else(|| {
                array
                    .type_hint(vars)
                    .and_then(|t| t.strip_prefix('[').map(str::to_string))
            }),
            Expr::Invoke { method, .. } => match method.return_type() {
                "V" => None,
                ret => Some(ret.to_string()),
            },
        }
    }

    /// Returns `true` when the value is statically a reference.
    #[must_use]
    pub fn is_reference(&self, vars: &VariableTable) -> bool {
        self.type_hint(vars)
            .is_some_and(|t| descriptor::is_reference(&t))
    }
}
