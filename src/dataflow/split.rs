//! Live range splitting.
//!
//! Dalvik code reuses registers freely: `v0` may hold a counter in one place
//! and a string a few instructions later. Each register is broken into webs,
//! sets of definitions and uses connected through the chains, and every web
//! of a register with several webs becomes a variable of its own.

use log::debug;

use crate::{
    dataflow::DefUse,
    graph::{Graph, Loc},
    ir::{Expr, VarId, Variable, VariableTable},
};

/// Definitions and uses of one web.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Web {
    defs: Vec<Loc>,
    uses: Vec<Loc>,
}

/// Groups the used definitions of each register into webs, in definition
/// order.
fn group_webs(chains: &DefUse, vars: &VariableTable) -> Vec<(VarId, Vec<Web>)> {
    let mut grouped: Vec<(VarId, Vec<Web>)> = Vec::new();
    for (var, def) in chains.used_defs() {
        if !vars.get(var).is_some_and(Variable::is_register) {
            continue;
        }
        let index = match grouped.iter().position(|(v, _)| *v == var) {
            Some(index) => index,
            None => {
                grouped.push((var, Vec::new()));
                grouped.len() - 1
            }
        };
        if grouped[index].1.iter().any(|web| web.defs.contains(&def)) {
            continue;
        }

        let mut web = Web {
            defs: vec![def],
            uses: Vec::new(),
        };
        let mut pending = vec![def];
        while let Some(d) = pending.pop() {
            for &use_loc in chains.uses(var, d) {
                if web.uses.contains(&use_loc) {
                    continue;
                }
                web.uses.push(use_loc);
                for &other in chains.defs(var, use_loc) {
                    if !web.defs.contains(&other) {
                        web.defs.push(other);
                        pending.push(other);
                    }
                }
            }
        }
        grouped[index].1.push(web);
    }
    grouped
}

/// Gives every web of a multiply-used register its own variable.
///
/// Versions are named after the register (`v3_0`, `v3_1`, ...). A web that
/// contains a parameter definition keeps the parameter variable. Returns the
/// number of registers split.
pub fn split_variables(graph: &mut Graph, vars: &mut VariableTable, chains: &mut DefUse) -> usize {
    let mut split = 0;
    for (var, webs) in group_webs(chains, vars) {
        if webs.len() < 2 {
            continue;
        }
        split += 1;
        for (version, web) in webs.iter().enumerate() {
            if web.defs.iter().any(|d| *d < 0) {
                continue;
            }
            let fresh = vars.new_split(var, version as u32);
            if let Some(v) = vars.get_mut(fresh) {
                v.ty = None;
            }
            for &def in &web.defs {
                if let Some(ins) = graph.ins_at_mut(def) {
                    ins.replace_lhs(fresh);
                }
                chains.rename_def(var, def, fresh);
            }
            let read = Expr::Var(fresh);
            for &use_loc in &web.uses {
                if let Some(ins) = graph.ins_at_mut(use_loc) {
                    ins.replace_var(var, &read);
                }
            }
        }
        debug!("split {} into {} webs", vars.name(var), webs.len());
    }
    split
}
