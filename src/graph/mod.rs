//! The method graph.
//!
//! One [`Graph`] is built per method by [`construct`] and then rewritten in
//! place: the dataflow passes edit node instructions, [`Graph::split_if_nodes`]
//! and [`Graph::simplify`] reshape it, and the structuring engine annotates
//! and merges nodes until the emitter walks it.
//!
//! Nodes live in an arena and are addressed by [`NodeId`]. Removing a node only
//! marks its slot dead, so handles kept by merged nodes (a short-circuit keeps
//! both of its conditions) stay readable through indexing.
//!
//! # Key Components
//!
//! - [`Graph`] - Arena with normal and exception edges, RPO and locations
//! - [`Node`] / [`NodeKind`] - Shared header and kind payload
//! - [`construct`] - Basic blocks to graph

mod builder;
mod node;
mod rewrite;

pub use builder::construct;
pub use node::{Branches, Loc, LoopType, Node, NodeKind, ShortCircuit, SwitchCases};

use std::ops::{Index, IndexMut};

use rustc_hash::FxHashMap;

use crate::{
    ir::{Instruction, VariableTable},
    utils::{
        graph::{
            algorithms::{self, DominatorTree},
            GraphBase, NodeId, Predecessors, RootedGraph, Successors,
        },
        DotBuilder, EdgeStyle,
    },
    Error, Result,
};

/// Control flow graph of one method.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    live: Vec<bool>,
    sucs: Vec<Vec<NodeId>>,
    preds: Vec<Vec<NodeId>>,
    catch_sucs: Vec<Vec<NodeId>>,
    catch_preds: Vec<Vec<NodeId>>,
    entry: NodeId,
    exit: Option<NodeId>,
    rpo: Vec<NodeId>,
    loc_to_node: FxHashMap<Loc, NodeId>,
}

impl Graph {
    /// Creates an empty graph. The entry defaults to the first added node.
    #[must_use]
    pub fn new() -> Self {
        Graph::default()
    }

    /// Adds a node and returns its handle.
    pub fn add_node(&mut self, node: Node) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(node);
        self.live.push(true);
        self.sucs.push(Vec::new());
        self.preds.push(Vec::new());
        self.catch_sucs.push(Vec::new());
        self.catch_preds.push(Vec::new());
        id
    }

    /// Checked node access.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GraphError`] for a handle of another graph or a removed
    /// node.
    pub fn node(&self, id: NodeId) -> Result<&Node> {
        match self.nodes.get(id.index()) {
            Some(node) if self.is_live(id) => Ok(node),
            _ => Err(Error::GraphError(format!("{id} is not part of the graph"))),
        }
    }

    /// Returns true while `id` has not been removed.
    #[must_use]
    pub fn is_live(&self, id: NodeId) -> bool {
        self.live.get(id.index()).copied().unwrap_or(false)
    }

    /// Number of live nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live.iter().filter(|l| **l).count()
    }

    /// Returns true when no node is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over live nodes by ascending slot.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(index, _)| self.live[*index])
            .map(|(index, node)| (NodeId::new(index), node))
    }

    /// Adds the normal edge `from -> to` unless it exists.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId) {
        if !self.sucs[from.index()].contains(&to) {
            self.sucs[from.index()].push(to);
            self.preds[to.index()].push(from);
        }
    }

    /// Adds the exception edge `from -> handler` unless it exists.
    pub fn add_catch_edge(&mut self, from: NodeId, handler: NodeId) {
        if !self.catch_sucs[from.index()].contains(&handler) {
            self.catch_sucs[from.index()].push(handler);
            self.catch_preds[handler.index()].push(from);
        }
    }

    /// Removes the normal edge `from -> to`.
    pub fn remove_edge(&mut self, from: NodeId, to: NodeId) {
        self.sucs[from.index()].retain(|n| *n != to);
        self.preds[to.index()].retain(|n| *n != from);
    }

    /// Removes the exception edge `from -> handler`.
    pub fn remove_catch_edge(&mut self, from: NodeId, handler: NodeId) {
        self.catch_sucs[from.index()].retain(|n| *n != handler);
        self.catch_preds[handler.index()].retain(|n| *n != from);
    }

    /// Normal successors in insertion order.
    #[must_use]
    pub fn sucs(&self, id: NodeId) -> &[NodeId] {
        self.sucs.get(id.index()).map_or(&[], Vec::as_slice)
    }

    /// Normal predecessors in insertion order.
    #[must_use]
    pub fn preds(&self, id: NodeId) -> &[NodeId] {
        self.preds.get(id.index()).map_or(&[], Vec::as_slice)
    }

    /// Handlers protecting `id`.
    #[must_use]
    pub fn catch_sucs(&self, id: NodeId) -> &[NodeId] {
        self.catch_sucs.get(id.index()).map_or(&[], Vec::as_slice)
    }

    /// Nodes protected by the handler `id`.
    #[must_use]
    pub fn catch_preds(&self, id: NodeId) -> &[NodeId] {
        self.catch_preds.get(id.index()).map_or(&[], Vec::as_slice)
    }

    /// Normal then exception successors.
    pub fn all_sucs(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.sucs(id).iter().chain(self.catch_sucs(id)).copied()
    }

    /// Normal then exception predecessors.
    pub fn all_preds(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.preds(id).iter().chain(self.catch_preds(id)).copied()
    }

    /// Detaches `id` from every edge and marks it removed.
    ///
    /// The node stays readable through indexing.
    pub fn remove_node(&mut self, id: NodeId) {
        for suc in std::mem::take(&mut self.sucs[id.index()]) {
            self.preds[suc.index()].retain(|n| *n != id);
        }
        for pred in std::mem::take(&mut self.preds[id.index()]) {
            self.sucs[pred.index()].retain(|n| *n != id);
        }
        for suc in std::mem::take(&mut self.catch_sucs[id.index()]) {
            self.catch_preds[suc.index()].retain(|n| *n != id);
        }
        for pred in std::mem::take(&mut self.catch_preds[id.index()]) {
            self.catch_sucs[pred.index()].retain(|n| *n != id);
        }
        self.live[id.index()] = false;
        self.rpo.retain(|n| *n != id);
        self.loc_to_node.retain(|_, n| *n != id);
        if self.exit == Some(id) {
            self.exit = None;
        }
    }

    /// Moves every incoming edge of `old` onto `new`.
    ///
    /// Each predecessor keeps `new` at the position `old` had in its successor
    /// list. A self loop on `old` becomes an edge from `old` to `new`.
    pub fn redirect_incoming(&mut self, old: NodeId, new: NodeId) {
        for pred in std::mem::take(&mut self.preds[old.index()]) {
            let sucs = &mut self.sucs[pred.index()];
            if sucs.contains(&new) {
                sucs.retain(|n| *n != old);
            } else if let Some(slot) = sucs.iter_mut().find(|n| **n == old) {
                *slot = new;
            }
            if !self.preds[new.index()].contains(&pred) {
                self.preds[new.index()].push(pred);
            }
        }
        for pred in std::mem::take(&mut self.catch_preds[old.index()]) {
            self.catch_sucs[pred.index()].retain(|n| *n != old);
            self.add_catch_edge(pred, new);
        }
    }

    /// Moves every outgoing edge of `old` onto `new`.
    pub fn redirect_outgoing(&mut self, old: NodeId, new: NodeId) {
        for suc in std::mem::take(&mut self.sucs[old.index()]) {
            self.preds[suc.index()].retain(|n| *n != old);
            self.add_edge(new, if suc == old { new } else { suc });
        }
        for suc in std::mem::take(&mut self.catch_sucs[old.index()]) {
            self.catch_preds[suc.index()].retain(|n| *n != old);
            self.add_catch_edge(new, suc);
        }
    }

    /// Rewrites references to `old` held by node attributes of the live nodes.
    pub fn replace_references(&mut self, old: NodeId, new: NodeId) {
        for (index, node) in self.nodes.iter_mut().enumerate() {
            if self.live[index] {
                node.replace_ref(old, new);
            }
        }
        if self.entry == old {
            self.entry = new;
        }
        if self.exit == Some(old) {
            self.exit = Some(new);
        }
    }

    /// The entry node.
    #[must_use]
    pub fn entry(&self) -> NodeId {
        self.entry
    }

    /// Sets the entry node.
    pub fn set_entry(&mut self, entry: NodeId) {
        self.entry = entry;
    }

    /// The exit node, when one could be chosen.
    #[must_use]
    pub fn exit(&self) -> Option<NodeId> {
        self.exit
    }

    /// Sets the exit node.
    pub fn set_exit(&mut self, exit: Option<NodeId>) {
        self.exit = exit;
    }

    /// Numbers the live nodes in reverse post order from the entry.
    ///
    /// Traversal follows normal successors before handlers. Numbers start at 1;
    /// unreachable nodes get 0 and are left out of [`Graph::rpo`].
    pub fn compute_rpo(&mut self) {
        let rpo = algorithms::reverse_postorder(&*self, self.entry);
        for node in &mut self.nodes {
            node.num = 0;
        }
        for (i, id) in rpo.iter().enumerate() {
            self.nodes[id.index()].num = i + 1;
        }
        self.rpo = rpo;
    }

    /// Reachable nodes in reverse post order, as of the last
    /// [`Graph::compute_rpo`].
    #[must_use]
    pub fn rpo(&self) -> &[NodeId] {
        &self.rpo
    }

    /// Reachable nodes in post order from the entry.
    #[must_use]
    pub fn post_order(&self) -> Vec<NodeId> {
        algorithms::postorder(self, self.entry)
    }

    /// Assigns consecutive global locations to instructions, in RPO.
    pub fn number_ins(&mut self) {
        self.loc_to_node.clear();
        let mut loc: Loc = 0;
        for id in self.rpo.clone() {
            let node = &mut self.nodes[id.index()];
            node.locs.clear();
            for _ in &node.ins {
                node.locs.push(loc);
                self.loc_to_node.insert(loc, id);
                loc += 1;
            }
        }
    }

    fn reindex_locs(&mut self) {
        self.loc_to_node.clear();
        for (index, node) in self.nodes.iter().enumerate() {
            if self.live[index] {
                for loc in &node.locs {
                    self.loc_to_node.insert(*loc, NodeId::new(index));
                }
            }
        }
    }

    /// The node holding the instruction at `loc`.
    #[must_use]
    pub fn node_of_loc(&self, loc: Loc) -> Option<NodeId> {
        self.loc_to_node.get(&loc).copied()
    }

    /// The instruction at `loc`.
    #[must_use]
    pub fn ins_at(&self, loc: Loc) -> Option<&Instruction> {
        let node = &self.nodes[self.node_of_loc(loc)?.index()];
        let pos = node.locs.iter().position(|l| *l == loc)?;
        node.ins.get(pos)
    }

    /// Mutable instruction at `loc`.
    pub fn ins_at_mut(&mut self, loc: Loc) -> Option<&mut Instruction> {
        let index = self.node_of_loc(loc)?.index();
        let node = &mut self.nodes[index];
        let pos = node.locs.iter().position(|l| *l == loc)?;
        node.ins.get_mut(pos)
    }

    /// Deletes the instruction at `loc` and returns it.
    pub fn remove_ins(&mut self, loc: Loc) -> Option<Instruction> {
        let id = self.loc_to_node.remove(&loc)?;
        let node = &mut self.nodes[id.index()];
        let pos = node.locs.iter().position(|l| *l == loc)?;
        node.locs.remove(pos);
        Some(node.ins.remove(pos))
    }

    /// Immediate dominators over normal and exception edges, using the
    /// current RPO.
    #[must_use]
    pub fn immediate_dominators(&self) -> DominatorTree {
        algorithms::compute_dominators(self, &self.rpo)
    }

    /// Renders the graph in DOT, one box per live node.
    #[must_use]
    pub fn to_dot(&self, name: &str, vars: &VariableTable) -> String {
        let mut dot = DotBuilder::new(name);
        let id_of = |id: NodeId| format!("{}-{}", id.index(), self.nodes[id.index()].name);
        for (id, node) in self.nodes() {
            let mut lines = vec![format!("{}. {} ({})", node.num, node.name, node.kind.label())];
            lines.extend(node.ins.iter().map(|ins| ins.describe(vars)));
            dot.node(&id_of(id), lines);
        }
        for (id, node) in self.nodes() {
            let branches = node.kind.branches();
            for &suc in self.sucs(id) {
                let style = match branches {
                    Some(b) if b.on_true == suc => EdgeStyle::True,
                    Some(b) if b.on_false == suc => EdgeStyle::False,
                    _ => EdgeStyle::Normal,
                };
                dot.edge(&id_of(id), &id_of(suc), style);
            }
            for &handler in self.catch_sucs(id) {
                dot.edge(&id_of(id), &id_of(handler), EdgeStyle::Exceptional);
            }
        }
        dot.finish()
    }
}

impl Index<NodeId> for Graph {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }
}

impl IndexMut<NodeId> for Graph {
    fn index_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }
}

impl GraphBase for Graph {
    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        self.live
            .iter()
            .enumerate()
            .filter(|(_, live)| **live)
            .map(|(index, _)| NodeId::new(index))
    }
}

impl Successors for Graph {
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        self.all_sucs(node)
    }
}

impl Predecessors for Graph {
    fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        self.all_preds(node)
    }
}

impl RootedGraph for Graph {
    fn entry(&self) -> NodeId {
        self.entry
    }
}
