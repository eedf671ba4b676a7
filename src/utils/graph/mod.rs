//! Generic directed graph infrastructure for control flow recovery.
//!
//! The method CFG ([`crate::graph::Graph`]) and the reduced graphs of the
//! derived sequence ([`DirectedGraph`]) both implement the traits defined here,
//! so dominators, traversals and intervals are written once.
//!
//! # Key Components
//!
//! - [`NodeId`] - Strongly-typed node handle
//! - [`DirectedGraph`] - Payload-carrying adjacency-list graph
//! - [`GraphBase`], [`Successors`], [`Predecessors`], [`RootedGraph`] - Abstractions
//!   the algorithms are generic over
//! - [`algorithms`] - Traversal, dominators, intervals
//!
//! # Usage Examples
//!
//! ```rust
//! use dexscope::utils::graph::{algorithms, DirectedGraph};
//!
//! let mut graph: DirectedGraph<&str> = DirectedGraph::new();
//! let entry = graph.add_node("entry");
//! let a = graph.add_node("A");
//! let b = graph.add_node("B");
//! let exit = graph.add_node("exit");
//! graph.add_edge(entry, a);
//! graph.add_edge(entry, b);
//! graph.add_edge(a, exit);
//! graph.add_edge(b, exit);
//!
//! let rpo = algorithms::reverse_postorder(&graph, entry);
//! let dominators = algorithms::compute_dominators(&graph, &rpo);
//! assert!(dominators.dominates(entry, exit));
//! assert_eq!(dominators.immediate_dominator(exit), Some(entry));
//! ```

mod directed;
mod node;
mod traits;

pub mod algorithms;

pub use directed::DirectedGraph;
pub use node::NodeId;
pub use traits::{GraphBase, Predecessors, RootedGraph, Successors};
