//! # Graph Reactions
//!
//! Runtime half of a reaction graph. A [`GraphController`] pairs a static
//! [`behavior_graph::Graph`] with a live [`ReactionInstance`] that hosts the
//! executable behaviours (action lists, condition lists, triggers) keyed by
//! node and transition id.
//!
//! ## Core Components
//!
//! - **capability**: the shapes of executable components and the [`Reaction`] trait
//! - **registry**: id-keyed component container with lazy creation and orphan sweeps
//! - **instance**: reaction instances, their templates and per-instance graph state
//! - **runtime**: enter/exit propagation, transition evaluation, ticking and ignition
//! - **variables**: observable variable stores and the controller/instance bridge
//! - **controller**: the entry point game code drives
//!
//! Everything here runs on a single update thread. Failures in configuration
//! or bindings are logged through `tracing` and turned into no-ops so a
//! broken graph never aborts the host's frame.

pub mod capability;
pub mod controller;
pub mod instance;
pub mod registry;
pub mod runtime;
pub mod variables;

pub use capability::*;
pub use controller::*;
pub use instance::*;
pub use registry::*;
pub use runtime::*;
pub use variables::*;
