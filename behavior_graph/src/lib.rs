//! # Behavior Graph
//!
//! The static half of a reaction graph: nodes, transitions, nested state
//! machines and their blackboards. This crate holds authored data only and
//! does not execute anything; the runtime lives in `graph_reactions`.

pub mod blackboard;
pub mod graph;
pub mod ids;
pub mod node;

pub use blackboard::*;
pub use graph::*;
pub use ids::*;
pub use node::*;
