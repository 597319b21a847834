//! Graph vertices and edges.

mod state_machine;
mod transition;

pub use state_machine::*;
pub use transition::*;

use serde::{Deserialize, Serialize};

use crate::ids::{NodeId, TransitionId};

/// How a node's outgoing transitions are evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransitionMode {
    /// Every passing transition fires.
    Parallel,
    /// The first passing transition, in declaration order, fires.
    #[default]
    Selective,
}

/// What a node does when it is entered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    /// A plain state; runs its bound action list on enter.
    State,
    /// Armed while its state machine is entered; reacts to external ignition
    /// instead of being polled.
    TriggerState,
    /// A nested state machine.
    StateMachine(StateMachineData),
}

/// A vertex in a behavior graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,

    /// Display name, used to look nodes up from game code.
    pub name: String,

    pub kind: NodeKind,

    #[serde(default)]
    pub transition_mode: TransitionMode,

    /// Outgoing transitions in declaration order.
    #[serde(default)]
    pub transitions: Vec<TransitionId>,

    /// Owning state machine. Only the root has none.
    #[serde(default)]
    pub parent: Option<NodeId>,

    #[serde(default)]
    pub is_start_node: bool,
}

impl Node {
    /// Create a detached node with a fresh id.
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: NodeId::new(),
            name: name.into(),
            kind,
            transition_mode: TransitionMode::default(),
            transitions: Vec::new(),
            parent: None,
            is_start_node: false,
        }
    }

    /// Create a plain state.
    pub fn state(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::State)
    }

    /// Create a trigger state.
    pub fn trigger_state(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::TriggerState)
    }

    /// Create an empty state machine.
    pub fn state_machine(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::StateMachine(StateMachineData::default()))
    }

    /// Set the transition mode.
    pub fn with_mode(mut self, mode: TransitionMode) -> Self {
        self.transition_mode = mode;
        self
    }

    /// Whether this node is a state machine.
    pub fn is_state_machine(&self) -> bool {
        matches!(self.kind, NodeKind::StateMachine(_))
    }

    /// Whether this node is a trigger state.
    pub fn is_trigger_state(&self) -> bool {
        matches!(self.kind, NodeKind::TriggerState)
    }

    /// State machine data, if this node is one.
    pub fn as_state_machine(&self) -> Option<&StateMachineData> {
        match &self.kind {
            NodeKind::StateMachine(data) => Some(data),
            _ => None,
        }
    }

    /// Mutable state machine data, if this node is one.
    pub fn as_state_machine_mut(&mut self) -> Option<&mut StateMachineData> {
        match &mut self.kind {
            NodeKind::StateMachine(data) => Some(data),
            _ => None,
        }
    }

    /// Direct children; empty for anything but a state machine.
    pub fn children(&self) -> &[NodeId] {
        self.as_state_machine()
            .map(|sm| sm.nodes.as_slice())
            .unwrap_or(&[])
    }
}
