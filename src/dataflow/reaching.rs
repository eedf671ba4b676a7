//! Reaching definitions over the method graph.
//!
//! A definition is identified by its global location; the parameters of the
//! method are defined before the entry at negative locations (see
//! [`param_loc`]).
//!
//! # Algorithm
//!
//! For each node N:
//! - `GEN[N]` = the last definition of every variable defined in N
//! - `KILL[N]` = every other definition of those variables
//! - `IN[N]` = ∪{OUT[P] | P is a normal or exception predecessor of N}
//! - `OUT[N]` = GEN[N] ∪ (IN[N] - KILL[N])
//!
//! The parameter definitions are added to `IN` of the entry. Nodes are
//! processed in RPO until no `OUT` set changes.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::{
    graph::{Graph, Loc},
    ir::VarId,
    utils::graph::{GraphBase, NodeId},
};

/// Location of the definition of the `index`-th parameter.
#[must_use]
pub fn param_loc(index: usize) -> Loc {
    -(index as Loc) - 1
}

/// Definitions reaching each node of a graph.
#[derive(Debug, Clone)]
pub struct ReachingDefinitions {
    /// Every definition site of each variable
    def_to_loc: FxHashMap<VarId, FxHashSet<Loc>>,
    /// Definitions live on entry of each node, by node slot
    reach_in: Vec<FxHashSet<Loc>>,
}

impl ReachingDefinitions {
    /// Solves reaching definitions for `graph`, with `params` defined before
    /// the entry.
    #[must_use]
    pub fn compute(graph: &Graph, params: &[VarId]) -> Self {
        let slots = graph.node_count();
        let mut def_to_loc: FxHashMap<VarId, FxHashSet<Loc>> = FxHashMap::default();
        for (index, param) in params.iter().enumerate() {
            def_to_loc.entry(*param).or_default().insert(param_loc(index));
        }

        // Last definition of each variable per node
        let mut gen: Vec<FxHashMap<VarId, Loc>> = vec![FxHashMap::default(); slots];
        for &node in graph.rpo() {
            let n = &graph[node];
            for (ins, loc) in n.ins.iter().zip(&n.locs) {
                if let Some(var) = ins.lhs() {
                    def_to_loc.entry(var).or_default().insert(*loc);
                    gen[node.index()].insert(var, *loc);
                }
            }
        }

        let entry_defs: FxHashSet<Loc> = (0..params.len()).map(param_loc).collect();
        let mut reach_in: Vec<FxHashSet<Loc>> = vec![FxHashSet::default(); slots];
        let mut reach_out: Vec<FxHashSet<Loc>> = vec![FxHashSet::default(); slots];

        let mut changed = true;
        while changed {
            changed = false;
            for &node in graph.rpo() {
                let mut inputs: FxHashSet<Loc> = if node == graph.entry() {
                    entry_defs.clone()
                } else {
                    FxHashSet::default()
                };
                for pred in graph.all_preds(node) {
                    inputs.extend(reach_out[pred.index()].iter().copied());
                }

                let defined = &gen[node.index()];
                let mut out: FxHashSet<Loc> = inputs
                    .iter()
                    .copied()
                    .filter(|loc| {
                        !defined
                            .keys()
                            .any(|var| def_to_loc.get(var).is_some_and(|d| d.contains(loc)))
                    })
                    .collect();
                out.extend(defined.values().copied());

                reach_in[node.index()] = inputs;
                if out != reach_out[node.index()] {
                    reach_out[node.index()] = out;
                    changed = true;
                }
            }
        }

        ReachingDefinitions {
            def_to_loc,
            reach_in,
        }
    }

    /// Definitions reaching the entry of `node`.
    #[must_use]
    pub fn reaching_in(&self, node: NodeId) -> Option<&FxHashSet<Loc>> {
        self.reach_in.get(node.index())
    }

    /// Every definition site of `var`.
    #[must_use]
    pub fn defs_of(&self, var: VarId) -> Option<&FxHashSet<Loc>> {
        self.def_to_loc.get(&var)
    }

    /// Definitions of `var` reaching the instruction at position `pos` of
    /// `node`, sorted by location.
    ///
    /// An earlier definition inside the node hides everything reaching the
    /// node entry.
    #[must_use]
    pub fn reaching_use(&self, graph: &Graph, var: VarId, node: NodeId, pos: usize) -> Vec<Loc> {
        let n = &graph[node];
        let local = n.ins[..pos.min(n.ins.len())]
            .iter()
            .zip(&n.locs)
            .filter(|(ins, _)| ins.lhs() == Some(var))
            .map(|(_, loc)| *loc)
            .last();
        if let Some(loc) = local {
            return vec![loc];
        }
        let (Some(defs), Some(reaching)) = (self.defs_of(var), self.reaching_in(node)) else {
            return Vec::new();
        };
        let mut found: Vec<Loc> = defs.intersection(reaching).copied().collect();
        found.sort_unstable();
        found
    }
}
