//! Structured method graph to syntax tree and source text.
//!
//! [`emit_method`] walks a structured [`Graph`] once and produces a
//! [`MethodAst`]; [`text::render_method`] prints that tree, so the JSON and the
//! text output always agree on every structural decision.
//!
//! # Key Components
//!
//! - [`ast`] - Serializable statement and expression tree
//! - [`EmitContext`] - Follow stacks and visited set of one traversal
//! - [`text`] - Java-like rendering of the tree
//!
//! # Examples
//!
//! ```rust,ignore
//! use dexscope::emit::{emit_method, text, EmitOptions};
//!
//! let emission = emit_method(&graph, &mut vars, &method, &types, EmitOptions::default());
//! println!("{}", text::render_method(&emission.ast, 0));
//! ```

pub mod ast;
mod context;
mod expr;
pub mod text;
mod writer;

pub use context::EmitContext;

use log::debug;
use rustc_hash::FxHashSet;

use crate::{
    emit::ast::{MethodAst, Triple, TypeName, VarDecl},
    graph::Graph,
    input::{DescriptorInterner, MethodInfo},
    ir::VariableTable,
    utils::graph::NodeId,
};

/// Emitter switches.
#[derive(Debug, Clone, Copy)]
pub struct EmitOptions {
    /// Omit `super()` / `this()` calls without arguments in constructors
    pub skip_constructor_super_call: bool,
}

impl Default for EmitOptions {
    fn default() -> Self {
        EmitOptions {
            skip_constructor_super_call: true,
        }
    }
}

/// Result of emitting one method.
#[derive(Debug)]
pub struct Emission {
    /// Method envelope with its body
    pub ast: MethodAst,
    /// Nodes the traversal reached
    pub visited: FxHashSet<NodeId>,
}

pub(crate) fn type_name(types: &DescriptorInterner, desc: &str) -> TypeName {
    let element = desc.trim_start_matches('[');
    TypeName {
        name: types.java_type(element).to_string(),
        dim: desc.len() - element.len(),
    }
}

/// Signature part of a method envelope; the body is left empty.
///
/// Parameters are named after their first register (`p3`), the receiver is
/// not listed.
pub fn method_header(method: &MethodInfo, types: &DescriptorInterner) -> MethodAst {
    let params = method
        .param_registers()
        .into_iter()
        .filter_map(|(register, ty)| {
            ty.map(|ty| VarDecl {
                ty: type_name(types, &ty),
                name: format!("p{register}"),
            })
        })
        .collect();
    MethodAst {
        triple: Triple::new(&method.class, &method.name, &method.descriptor),
        flags: method
            .access
            .method_keywords()
            .into_iter()
            .map(str::to_string)
            .collect(),
        ret: type_name(types, method.return_type()),
        params,
        comments: Vec::new(),
        body: None,
    }
}

/// Emits a structured method graph.
///
/// Variables are marked declared as their declarations are printed, so the
/// table should not be reused for a second emission. Flow that no construct
/// covers is printed with `goto`; the method is then written a second time
/// with labels on the jump targets.
pub fn emit_method(
    graph: &Graph,
    vars: &mut VariableTable,
    method: &MethodInfo,
    types: &DescriptorInterner,
    options: EmitOptions,
) -> Emission {
    let mut ast = method_header(method, types);
    let pristine = vars.clone();
    let (mut body, mut ctx) = write(graph, vars, method, types, options, FxHashSet::default());
    if !ctx.goto_targets.is_empty() {
        debug!(
            "{}->{}: {} goto targets",
            method.class,
            method.name,
            ctx.goto_targets.len()
        );
        *vars = pristine;
        let labels = std::mem::take(&mut ctx.goto_targets);
        (body, ctx) = write(graph, vars, method, types, options, labels);
        ast.comments
            .push("Unstructured control flow kept as goto".to_string());
    }
    ast.body = Some(body);
    Emission {
        ast,
        visited: ctx.visited,
    }
}

fn write(
    graph: &Graph,
    vars: &mut VariableTable,
    method: &MethodInfo,
    types: &DescriptorInterner,
    options: EmitOptions,
    labels: FxHashSet<NodeId>,
) -> (ast::Block, EmitContext) {
    let mut writer = writer::Writer::new(graph, vars, method, types, options);
    let body = writer.write_body(labels);
    (body, writer.ctx)
}
