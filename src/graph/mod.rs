//! Graph construction and traversal.

pub mod builder;
pub mod traversal;

pub use builder::build_graph;
pub use traversal::{traverse, Direction, GraphAccess, Seed, TraversalOutcome};
