//! Graph algorithms used by control flow recovery.
//!
//! # Available Algorithms
//!
//! ## Traversal
//!
//! - [`postorder`] - Depth-first postorder in successor order
//! - [`reverse_postorder`] - Reverse postorder, the numbering every pass relies on
//!
//! ## Dominator Analysis
//!
//! - [`compute_dominators`] - Immediate dominators through common-dominator walks
//! - [`DominatorTree`] - Result of dominator computation, mutable for rewrites
//!
//! ## Intervals
//!
//! - [`intervals`] - Allen-Cocke interval partition of a graph
//! - [`derived_sequence`] - Repeated interval reduction down to a single node
//!
//! # Algorithm Selection
//!
//! | Algorithm | Time Complexity | Use Case |
//! |-----------|-----------------|----------|
//! | Postorder/RPO | O(V + E) | Node numbering, dataflow iteration order |
//! | Dominators | O(V · E) worst case, near linear in practice | Follow nodes, declarations |
//! | Derived sequence | O(V · E) per level | Loop detection, reducibility |

mod dominators;
mod intervals;
mod traversal;

pub use dominators::{compute_dominators, DominatorIterator, DominatorTree};
pub use intervals::{
    derived_sequence, intervals, DerivedLevel, DerivedSequence, Interval, IntervalPartition,
};
pub use traversal::{postorder, reverse_postorder};
