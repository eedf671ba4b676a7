//! Dataflow passes over the unstructured method graph.
//!
//! The passes run in a fixed order, all sharing one [`DefUse`] instance that
//! every rewrite keeps up to date:
//!
//! 1. [`DefUse::build`] - chains from [`ReachingDefinitions`]
//! 2. [`split_variables`] - one variable per live range of a register
//! 3. [`dead_code_elimination`] - drop definitions nobody reads
//! 4. [`register_propagation`] - fold single-use values into their use
//! 5. [`infer_types`] / [`place_declarations`] - prepare local declarations
//!
//! Locations are the global instruction numbers assigned by
//! [`Graph::number_ins`](crate::graph::Graph::number_ins); parameters are
//! defined at [`param_loc`].

mod dce;
mod declarations;
mod defuse;
mod propagation;
mod reaching;
mod split;

pub use dce::dead_code_elimination;
pub use declarations::{infer_types, place_declarations};
pub use defuse::DefUse;
pub use propagation::register_propagation;
pub use reaching::{param_loc, ReachingDefinitions};
pub use split::split_variables;
