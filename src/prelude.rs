//! # dexscope Prelude
//!
//! The types needed to assemble or import a method, decompile it and inspect
//! the result. Import this module to get them in one line.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all dexscope operations
pub use crate::Error;

/// The result type used throughout dexscope
pub use crate::Result;

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// Pipeline driver and its configuration
pub use crate::decompiler::{Decompiler, DecompilerConfig};

/// Per-method and per-class results
pub use crate::decompiler::{DecompiledClass, DecompiledMethod, MethodOutput};

/// Recoverable events recorded during a run
pub use crate::decompiler::{Event, EventKind, EventLog};

// ================================================================================================
// Input Model
// ================================================================================================

/// Methods, classes and their code
pub use crate::input::{
    AccessFlags, BasicBlock, ClassInfo, DecodedInstruction, ExceptionTable, FieldInfo,
    FieldRef, FieldValue, MethodInfo, MethodRef, Opcode, Operand,
};

/// Assembler for synthesized methods
pub use crate::input::{CodeBuilder, MethodBuilder};

// ================================================================================================
// Output
// ================================================================================================

/// Syntax tree of decompiled code
pub use crate::emit::ast::{ClassAst, Expression, MethodAst, Statement};
