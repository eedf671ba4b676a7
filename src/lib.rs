// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(dead_code)]
#![deny(unsafe_code)]

//! # dexscope
//!
//! A decompiler engine for Dalvik bytecode. Given the basic blocks and
//! exception table of a method (as produced by any DEX container parser),
//! `dexscope` recovers structured Java-like source: loops, conditionals,
//! short-circuit conditions, switches and try/catch regions, with named and
//! typed local variables.
//!
//! ## Features
//!
//! - **Control flow recovery** - CFG construction, dominators, derived sequence of intervals
//! - **Structuring** - Pre-tested, post-tested and endless loops, `if`/`else`, `&&`/`||`, `switch`, `try`
//! - **Dataflow** - Reaching definitions, def-use chains, variable splitting, dead code elimination,
//!   register propagation, declaration placement
//! - **Two outputs** - Java-like text and a JSON syntax tree, rendered from the same traversal
//! - **Isolation** - Per-method deadlines, errors and panics never take down a whole class
//!
//! ## Quick Start
//!
//! ```rust
//! use dexscope::prelude::*;
//!
//! // static int abs(int x) { if (x >= 0) return x; return -x; }
//! let method = MethodBuilder::new("LMath;", "abs", "(I)I")
//!     .access(AccessFlags::PUBLIC | AccessFlags::STATIC)
//!     .registers(2)
//!     .code(|c| {
//!         c.if_zero(Opcode::IfLtz, 1, "negative")
//!             .ret(Opcode::Return, 1)
//!             .label("negative")
//!             .op(Opcode::NegInt, &[0, 1])
//!             .ret(Opcode::Return, 0);
//!     })
//!     .build()?;
//!
//! let decompiler = Decompiler::new(DecompilerConfig::sequential());
//! let output = decompiler.decompile_method(&method)?;
//! assert!(output.source().starts_with("public static int abs(int p1) {"));
//! # Ok::<(), dexscope::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`input`] - Method and class model handed over by the container parser
//! - [`ir`] - Lifted instructions and expression trees
//! - [`graph`] - The method graph and its construction
//! - [`dataflow`] - Passes over the unstructured graph
//! - [`structure`] - Loop, conditional, switch and try recovery
//! - [`emit`] - Syntax tree and text rendering
//! - [`decompiler`] - Pipeline driver, configuration and event log
//! - [`utils`] - Generic graph algorithms and DOT output
//! - [`Error`] and [`Result`] - Error handling

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types.
///
/// ```rust
/// use dexscope::prelude::*;
///
/// let decompiler = Decompiler::new(DecompilerConfig::default());
/// assert!(decompiler.events().is_empty());
/// ```
pub mod prelude;

pub mod dataflow;
pub mod decompiler;
pub mod emit;
pub mod graph;
pub mod input;
pub mod ir;
pub mod structure;
pub mod utils;

pub use decompiler::{Decompiler, DecompilerConfig};
pub use error::{Error, Result};
pub use input::{ClassInfo, MethodInfo};
