//! Use-definition and definition-use chains.
//!
//! Both directions are keyed by `(variable, location)`:
//!
//! - `ud[(v, use)]` lists the definitions of `v` reaching the instruction at
//!   `use`
//! - `du[(v, def)]` lists the instructions reading the value `v` gets at `def`
//!
//! A definition without entry in `du` is unused. The passes keep both maps in
//! sync through the mutators below instead of rebuilding them.

use rustc_hash::FxHashMap;

use crate::{
    dataflow::ReachingDefinitions,
    graph::{Graph, Loc},
    ir::VarId,
};

/// Def-use and use-def chains of one method.
#[derive(Debug, Clone, Default)]
pub struct DefUse {
    ud: FxHashMap<(VarId, Loc), Vec<Loc>>,
    du: FxHashMap<(VarId, Loc), Vec<Loc>>,
}

impl DefUse {
    /// Builds the chains of `graph` from reaching definitions.
    ///
    /// `params` are the method parameters in declaration order; they are
    /// defined at negative locations.
    #[must_use]
    pub fn build(graph: &Graph, params: &[VarId]) -> Self {
        let reaching = ReachingDefinitions::compute(graph, params);
        let mut chains = DefUse::default();
        for &node in graph.rpo() {
            let n = &graph[node];
            for (pos, (ins, loc)) in n.ins.iter().zip(&n.locs).enumerate() {
                for var in ins.used_vars() {
                    for def in reaching.reaching_use(graph, var, node, pos) {
                        chains.link(var, def, *loc);
                    }
                }
            }
        }
        chains
    }

    /// Definitions of `var` reaching the instruction at `use_loc`.
    #[must_use]
    pub fn defs(&self, var: VarId, use_loc: Loc) -> &[Loc] {
        self.ud.get(&(var, use_loc)).map_or(&[], Vec::as_slice)
    }

    /// Instructions reading the value `var` gets at `def`.
    #[must_use]
    pub fn uses(&self, var: VarId, def: Loc) -> &[Loc] {
        self.du.get(&(var, def)).map_or(&[], Vec::as_slice)
    }

    /// Returns `true` when the definition of `var` at `def` is read.
    #[must_use]
    pub fn is_used(&self, var: VarId, def: Loc) -> bool {
        !self.uses(var, def).is_empty()
    }

    /// Records that the instruction at `use_loc` reads `var` as defined at
    /// `def`.
    pub fn link(&mut self, var: VarId, def: Loc, use_loc: Loc) {
        let defs = self.ud.entry((var, use_loc)).or_default();
        if !defs.contains(&def) {
            defs.push(def);
        }
        let uses = self.du.entry((var, def)).or_default();
        if !uses.contains(&use_loc) {
            uses.push(use_loc);
        }
    }

    /// Drops one link, removing entries that become empty.
    pub fn unlink(&mut self, var: VarId, def: Loc, use_loc: Loc) {
        if let Some(defs) = self.ud.get_mut(&(var, use_loc)) {
            defs.retain(|d| *d != def);
            if defs.is_empty() {
                self.ud.remove(&(var, use_loc));
            }
        }
        if let Some(uses) = self.du.get_mut(&(var, def)) {
            uses.retain(|u| *u != use_loc);
            if uses.is_empty() {
                self.du.remove(&(var, def));
            }
        }
    }

    /// Forgets that the instruction at `use_loc` reads `var` and returns the
    /// definitions it was linked to.
    pub fn remove_use(&mut self, var: VarId, use_loc: Loc) -> Vec<Loc> {
        let defs = self.defs(var, use_loc).to_vec();
        for def in &defs {
            self.unlink(var, *def, use_loc);
        }
        defs
    }

    /// Moves the chains of the definition `(old, def)` to `new`.
    pub fn rename_def(&mut self, old: VarId, def: Loc, new: VarId) {
        let Some(uses) = self.du.remove(&(old, def)) else {
            return;
        };
        for use_loc in &uses {
            if let Some(defs) = self.ud.get_mut(&(old, *use_loc)) {
                defs.retain(|d| *d != def);
                if defs.is_empty() {
                    self.ud.remove(&(old, *use_loc));
                }
            }
            self.ud.entry((new, *use_loc)).or_default().push(def);
        }
        self.du.insert((new, def), uses);
    }

    /// Definition sites with at least one use, sorted by variable then
    /// location.
    #[must_use]
    pub fn used_defs(&self) -> Vec<(VarId, Loc)> {
        let mut sites: Vec<(VarId, Loc)> = self.du.keys().copied().collect();
        sites.sort_unstable();
        sites
    }

    /// Number of `(variable, use)` entries.
    #[must_use]
    pub fn use_count(&self) -> usize {
        self.ud.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ir::{BinaryOp, Constant, Expr, Instruction},
        test::graph_shape,
    };

    #[test]
    fn test_build_links_both_directions() {
        let (mut graph, ids) = graph_shape(&[(0, 1)]);
        let (a, b) = (VarId::new(0), VarId::new(1));
        graph[ids[0]].ins = vec![Instruction::Assign {
            lhs: Some(a),
            rhs: Expr::Const(Constant::Int(4)),
        }];
        graph[ids[1]].ins = vec![
            Instruction::Assign {
                lhs: Some(a),
                rhs: Expr::Binary {
                    op: BinaryOp::Add,
                    lhs: Expr::var(a),
                    rhs: Expr::var(b),
                    ty: "I".into(),
                },
            },
            Instruction::Return(Some(Expr::Var(a))),
        ];
        graph.number_ins();

        let chains = DefUse::build(&graph, &[b]);
        assert_eq!(chains.defs(a, 1), &[0]);
        assert_eq!(chains.defs(b, 1), &[-1]);
        assert_eq!(chains.defs(a, 2), &[1]);
        assert_eq!(chains.uses(a, 0), &[1]);
        assert_eq!(chains.uses(b, -1), &[1]);
        assert!(chains.is_used(a, 1));
        assert_eq!(chains.used_defs(), vec![(a, 0), (a, 1), (b, -1)]);
    }

    #[test]
    fn test_mutators_keep_maps_in_sync() {
        let mut chains = DefUse::default();
        let (a, b) = (VarId::new(0), VarId::new(1));
        chains.link(a, 0, 3);
        chains.link(a, 1, 3);
        chains.link(a, 0, 4);

        assert_eq!(chains.remove_use(a, 3), vec![0, 1]);
        assert!(!chains.is_used(a, 1));
        assert_eq!(chains.uses(a, 0), &[4]);

        chains.rename_def(a, 0, b);
        assert!(!chains.is_used(a, 0));
        assert_eq!(chains.uses(b, 0), &[4]);
        assert_eq!(chains.defs(b, 4), &[0]);
        assert!(chains.defs(a, 4).is_empty());
        assert_eq!(chains.use_count(), 1);
    }
}
