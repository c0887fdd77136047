//! Retrieval: strategy resolution and context assembly.

pub mod context;
pub mod strategy;

pub use context::{assemble, render_context};
pub use strategy::{resolve, Strategy, TraversalConfig, TraversalOverrides};
