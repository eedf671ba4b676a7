//! Intermediate representation of method bodies.
//!
//! Decoded Dalvik instructions are lifted into a small tree IR: statement
//! level [`Instruction`]s whose operands are [`Expr`] trees over [`VarId`]
//! handles. The same IR is carried through the dataflow passes (which rewrite
//! the trees in place) and read by the emitter.
//!
//! # Key Components
//!
//! - [`VariableTable`] / [`Variable`] / [`VarId`] - Storage locations and their names
//! - [`Instruction`] - Statement level operations
//! - [`Expr`] - Expression trees with [`BinaryOp`], [`UnaryOp`], [`CondOp`], [`Constant`]
//! - [`Lifter`] - Opcode family to IR mapping
//!
//! # Examples
//!
//! ```rust
//! use dexscope::input::{DecodedInstruction, Opcode, Operand};
//! use dexscope::ir::{Lifter, VariableTable};
//!
//! let mut vars = VariableTable::new();
//! let mut lifter = Lifter::new(&mut vars);
//! let add = DecodedInstruction::new(
//!     Opcode::AddInt,
//!     vec![Operand::Register(0), Operand::Register(1), Operand::Register(2)],
//!     0,
//!     2,
//! );
//! let ins = lifter.lift(&add).unwrap().unwrap();
//! assert_eq!(ins.describe(&vars), "v0 = (v1 + v2)");
//! ```

mod expr;
mod instruction;
mod lift;
mod variable;

pub use expr::{BinaryOp, CondOp, Constant, Expr, InvokeKind, UnaryOp};
pub use instruction::Instruction;
pub use lift::Lifter;
pub use variable::{VarId, VarKind, Variable, VariableTable};
