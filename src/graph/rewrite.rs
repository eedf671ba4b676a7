//! Graph cleanup run between the dataflow passes and structuring.

use log::debug;

use crate::{
    graph::{Graph, Node, NodeKind},
    utils::graph::{GraphBase, NodeId},
};

impl Graph {
    /// Splits conditional nodes holding more than their comparison.
    ///
    /// Every conditional with several instructions becomes a statement node
    /// `<name>-pre` with all but the last instruction, followed by a
    /// conditional `<name>-cond` holding only the comparison. The pre node takes
    /// over the incoming edges, the declarations, and every reference to the
    /// original node. Returns the number of nodes split.
    pub fn split_if_nodes(&mut self) -> usize {
        let candidates: Vec<NodeId> = self
            .node_ids()
            .filter(|id| {
                let node = &self[*id];
                matches!(node.kind, NodeKind::Conditional(_)) && node.ins.len() > 1
            })
            .collect();

        for &node in &candidates {
            let (pre, cond) = {
                let original = &self[node];
                let split_at = original.ins.len() - 1;

                let mut pre = Node::derived_from(
                    original,
                    format!("{}-pre", original.name),
                    NodeKind::Statement,
                );
                pre.ins = original.ins[..split_at].to_vec();
                pre.locs = original.locs.iter().take(split_at).copied().collect();
                pre.var_to_declare = original.var_to_declare.clone();

                let mut cond = Node::derived_from(
                    original,
                    format!("{}-cond", original.name),
                    original.kind.clone(),
                );
                cond.ins = original.ins[split_at..].to_vec();
                cond.locs = original.locs.iter().skip(split_at).copied().collect();
                cond.catch_type = None;
                (pre, cond)
            };
            let handlers = self.catch_sucs(node).to_vec();
            let pre = self.add_node(pre);
            let cond = self.add_node(cond);

            self.redirect_incoming(node, pre);
            self.redirect_outgoing(node, cond);
            for handler in handlers {
                self.add_catch_edge(pre, handler);
            }
            self.add_edge(pre, cond);
            self.replace_references(node, pre);
            self.remove_node(node);
        }

        if !candidates.is_empty() {
            self.reindex_locs();
            debug!("split {} conditional nodes", candidates.len());
        }
        candidates.len()
    }

    /// Removes empty statements and merges statement chains, to a fixed point.
    ///
    /// An empty statement is bypassed: its predecessors, branch targets, switch
    /// cases and follows are redirected to its single successor, which also
    /// inherits its declarations. A statement is merged with its successor when
    /// that successor is a statement with no other predecessor, is neither the
    /// node itself nor the entry, and is protected by the same handlers.
    /// Handler entry nodes are never removed. Returns true when anything
    /// changed.
    pub fn simplify(&mut self) -> bool {
        let mut changed = false;
        let mut redo = true;
        while redo {
            redo = false;
            let ids: Vec<NodeId> = self.node_ids().collect();
            for node in ids {
                if !self.is_live(node) || self[node].kind != NodeKind::Statement {
                    continue;
                }
                let Some(&suc) = self.sucs(node).first() else {
                    continue;
                };
                if self[node].ins.is_empty() {
                    if suc == node || !self.catch_preds(node).is_empty() {
                        continue;
                    }
                    for var in self[node].var_to_declare.clone() {
                        self[suc].declare(var);
                    }
                    self.redirect_incoming(node, suc);
                    self.replace_references(node, suc);
                    self.remove_node(node);
                    redo = true;
                } else if self[suc].kind == NodeKind::Statement
                    && self.preds(suc).len() == 1
                    && suc != node
                    && suc != self.entry()
                    && self.catch_preds(suc).is_empty()
                    && self.catch_sucs(node) == self.catch_sucs(suc)
                {
                    let merged = std::mem::take(&mut self[suc].ins);
                    let locs = std::mem::take(&mut self[suc].locs);
                    let declarations = std::mem::take(&mut self[suc].var_to_declare);
                    let target = &mut self[node];
                    target.ins.extend(merged);
                    target.locs.extend(locs);
                    for var in declarations {
                        target.declare(var);
                    }
                    self.remove_edge(node, suc);
                    self.redirect_outgoing(suc, node);
                    self.replace_references(suc, node);
                    self.remove_node(suc);
                    redo = true;
                }
            }
            changed |= redo;
        }
        if changed {
            self.reindex_locs();
        }
        changed
    }
}
