//! Control flow structuring.
//!
//! Annotates and rewrites a method [`Graph`] so the emitter can walk it as
//! nested source constructs. Every construct is identified on the graph
//! itself: loops from the derived sequence of intervals, conditionals and
//! switches from the dominator tree, try regions from exception edges.
//!
//! # Pass Order
//!
//! 1. Derived sequence of the graph ([`EventKind::IrreducibleFlow`] when it
//!    does not reduce)
//! 2. Switch follows and case tables
//! 3. Loop headers, latches and bodies
//! 4. Short-circuit merging, bounded by the configured pass count
//! 5. RPO renumbering, mirrored into the dominator tree
//! 6. Conditional follows
//! 7. Loop wrapping, loop types and loop follows
//! 8. Conditionals left without follow take the nearest loop or switch follow
//! 9. Try and catch nodes
//!
//! The follows computed here are final; the emitter falls back to nesting
//! wherever one is missing.

mod conditionals;
mod exceptions;
mod loops;
mod switch;

use log::debug;

use crate::{
    decompiler::{Event, EventKind, EventLog},
    graph::Graph,
    utils::graph::algorithms::{derived_sequence, DominatorTree},
};

/// Counts of the constructs found in one method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StructureSummary {
    /// Loop headers
    pub loops: usize,
    /// Switch nodes
    pub switches: usize,
    /// Conditionals merged into short-circuit nodes
    pub short_circuits: usize,
    /// Try regions
    pub tries: usize,
    /// Set when the derived sequence did not reduce to one node
    pub irreducible: bool,
}

/// Identifies loops, conditionals, switches and try regions of `graph`.
///
/// `tree` must be the dominator tree of the graph in its current shape; it is
/// kept up to date through the short-circuit merges. `max_passes` bounds the
/// short-circuit fixed point. Events are recorded under `method`.
pub fn identify_structures(
    graph: &mut Graph,
    tree: &mut DominatorTree,
    max_passes: usize,
    events: &EventLog,
    method: &str,
) -> StructureSummary {
    let mut summary = StructureSummary::default();

    let sequence = derived_sequence(&*graph, graph.rpo());
    if sequence.irreducible {
        summary.irreducible = true;
        events.record(
            Event::new(
                EventKind::IrreducibleFlow,
                format!("derived sequence stopped after {} levels", sequence.levels.len()),
            )
            .in_method(method),
        );
    }

    summary.switches = switch::switch_struct(graph, tree);
    summary.loops = loops::loop_struct(graph, &sequence);

    let stats = conditionals::short_circuit_struct(graph, tree, max_passes);
    summary.short_circuits = stats.merged;
    if stats.bounded {
        events.record(
            Event::new(
                EventKind::StructuringBound,
                format!("short-circuit merging stopped after {max_passes} passes"),
            )
            .in_method(method),
        );
    }

    graph.compute_rpo();
    for node in graph.rpo().to_vec() {
        tree.set_number(node, graph[node].num);
    }

    let unresolved = conditionals::if_struct(graph, tree);
    loops::wrap_loops(graph);
    for node in graph.rpo().to_vec() {
        if graph[node].startloop {
            loops::loop_type(graph, node);
            loops::loop_follow(graph, node);
        }
    }

    for node in unresolved {
        let candidates = [graph[node].loop_follow, graph[node].switch_follow];
        let follow = candidates
            .into_iter()
            .flatten()
            .filter(|f| graph.is_live(*f))
            .min_by_key(|f| graph[*f].num);
        if follow.is_some() {
            graph[node].if_follow = follow;
        }
    }

    summary.tries = exceptions::catch_struct(graph, tree);

    debug!(
        "{}: {} loops, {} switches, {} short-circuits, {} tries",
        method, summary.loops, summary.switches, summary.short_circuits, summary.tries
    );
    summary
}
