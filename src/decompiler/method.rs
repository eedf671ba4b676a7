//! The per-method pipeline.

use std::time::{Duration, Instant};

use log::debug;

use crate::{
    dataflow::{
        dead_code_elimination, infer_types, place_declarations, register_propagation,
        split_variables, DefUse,
    },
    decompiler::{DecompilerConfig, EventLog},
    emit::{ast::MethodAst, emit_method, text},
    graph::{construct, Graph},
    input::{DescriptorInterner, MethodInfo},
    ir::VariableTable,
    structure::{identify_structures, StructureSummary},
    utils::graph::algorithms::DominatorTree,
    Error, Result,
};

/// Deadline of one method, checked between stages.
struct Deadline {
    started: Instant,
    limit: Option<Duration>,
    method: String,
}

impl Deadline {
    fn new(limit: Option<Duration>, method: &MethodInfo) -> Self {
        Deadline {
            started: Instant::now(),
            limit,
            method: method.full_name(),
        }
    }

    fn check(&self, stage: &'static str) -> Result<()> {
        match self.limit {
            Some(limit) if self.started.elapsed() > limit => Err(Error::Timeout {
                method: self.method.clone(),
                stage,
            }),
            _ => Ok(()),
        }
    }
}

/// A method graph after dataflow and structuring, ready for emission.
#[derive(Debug)]
pub struct AnalyzedMethod {
    /// The structured graph
    pub graph: Graph,
    /// Variables of the method, declarations not yet emitted
    pub vars: VariableTable,
    /// Dominator tree of the structured graph
    pub dominators: DominatorTree,
    /// Constructs found by structuring
    pub summary: StructureSummary,
}

/// Runs everything up to emission.
///
/// Stage order: graph construction, def-use chains, variable splitting, dead
/// code elimination, register propagation, type inference, declaration
/// placement, if-node splitting and simplification, dominators, structuring.
///
/// # Errors
///
/// Construction errors, [`Error::Timeout`] when the deadline passes between
/// two stages.
pub(crate) fn analyze(
    method: &MethodInfo,
    config: &DecompilerConfig,
    events: &EventLog,
) -> Result<AnalyzedMethod> {
    let deadline = Deadline::new(config.method_timeout, method);
    let name = method.full_name();

    let mut vars = VariableTable::for_method(method);
    let mut graph = construct(method, &mut vars, events)?;
    deadline.check("construction")?;
    debug!("{name}: {} nodes", graph.len());

    let mut chains = DefUse::build(&graph, vars.params());
    let split = split_variables(&mut graph, &mut vars, &mut chains);
    deadline.check("variable splitting")?;
    let dead = dead_code_elimination(&mut graph, &mut chains);
    deadline.check("dead code elimination")?;
    let propagated = register_propagation(&mut graph, &mut chains);
    deadline.check("register propagation")?;
    debug!("{name}: {split} splits, {dead} dead definitions, {propagated} propagations");

    infer_types(&graph, &mut vars, method);
    let tree = graph.immediate_dominators();
    place_declarations(&mut graph, &vars, &chains, &tree);
    deadline.check("declaration placement")?;

    graph.split_if_nodes();
    graph.simplify();
    graph.compute_rpo();
    let mut dominators = graph.immediate_dominators();
    deadline.check("simplification")?;

    let summary = identify_structures(
        &mut graph,
        &mut dominators,
        config.max_structuring_passes,
        events,
        &name,
    );
    deadline.check("structuring")?;
    debug!("{name}: {summary:?}");

    Ok(AnalyzedMethod {
        graph,
        vars,
        dominators,
        summary,
    })
}

/// One decompiled method.
#[derive(Debug, Clone)]
pub struct DecompiledMethod {
    /// `Lclass;->name(desc)`
    pub descriptor: String,
    /// Syntax tree, when enabled
    pub ast: Option<MethodAst>,
    /// Source text, when enabled
    pub text: Option<String>,
    /// Constructs found by structuring
    pub summary: StructureSummary,
}

impl DecompiledMethod {
    /// Source text, empty when text output is disabled.
    #[must_use]
    pub fn source(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }

    /// Syntax tree as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// [`Error::Json`] when serialization fails; `Ok(None)` without a tree.
    pub fn to_json(&self) -> Result<Option<String>> {
        self.ast
            .as_ref()
            .map(|ast| serde_json::to_string_pretty(ast).map_err(Error::from))
            .transpose()
    }
}

pub(crate) fn decompile(
    method: &MethodInfo,
    config: &DecompilerConfig,
    types: &DescriptorInterner,
    events: &EventLog,
) -> Result<DecompiledMethod> {
    let AnalyzedMethod {
        graph,
        mut vars,
        summary,
        ..
    } = analyze(method, config, events)?;
    let emission = emit_method(&graph, &mut vars, method, types, config.emit_options());
    debug!(
        "{}: emitted {} of {} nodes",
        method.full_name(),
        emission.visited.len(),
        graph.len()
    );

    let text = config
        .emit_text
        .then(|| text::render_method(&emission.ast, 0));
    Ok(DecompiledMethod {
        descriptor: method.full_name(),
        ast: config.emit_ast.then_some(emission.ast),
        text,
        summary,
    })
}

/// Outcome of one method of a class.
#[derive(Debug)]
pub enum MethodOutput {
    /// The method was decompiled
    Decompiled(DecompiledMethod),
    /// Native or abstract method; only its signature
    NoCode(MethodAst),
    /// The pipeline failed; the class output carries a marker instead
    Failed {
        /// `Lclass;->name(desc)`
        descriptor: String,
        /// What went wrong
        error: Error,
    },
}

impl MethodOutput {
    /// Returns `true` for [`MethodOutput::Failed`].
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, MethodOutput::Failed { .. })
    }

    /// The decompiled method, if any.
    #[must_use]
    pub fn decompiled(&self) -> Option<&DecompiledMethod> {
        match self {
            MethodOutput::Decompiled(method) => Some(method),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deadline() {
        let method = MethodInfo::new("LFoo;", "f", "()V", crate::input::AccessFlags::STATIC);
        let open = Deadline::new(None, &method);
        assert!(open.check("construction").is_ok());

        let expired = Deadline::new(Some(Duration::ZERO), &method);
        std::thread::sleep(Duration::from_millis(2));
        match expired.check("structuring") {
            Err(Error::Timeout { method, stage }) => {
                assert_eq!(method, "LFoo;->f()V");
                assert_eq!(stage, "structuring");
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }
}
