//! Shared infrastructure: generic graph algorithms and DOT rendering.

mod dot;
pub mod graph;

pub use dot::{escape_dot, DotBuilder, EdgeStyle};
