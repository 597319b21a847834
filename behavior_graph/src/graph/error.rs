//! Errors raised while authoring, loading or validating a graph.

use thiserror::Error;

use crate::ids::{NodeId, TransitionId};

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    #[error("unknown transition {0}")]
    UnknownTransition(TransitionId),

    #[error("{0} is not a state machine")]
    NotAStateMachine(NodeId),

    #[error("id {0} is already used in this graph")]
    DuplicateId(i64),

    #[error("id {0} is unassigned")]
    UnassignedId(i64),

    #[error("the root state machine cannot be removed")]
    RootRemoval,

    #[error("{0} has no parent state machine")]
    NoParent(NodeId),

    #[error("root {0} must be a state machine without a parent")]
    InvalidRoot(NodeId),

    #[error("{state_machine} has {count} start nodes")]
    MultipleStartNodes { state_machine: NodeId, count: usize },

    #[error("{node} start flag disagrees with the start node of {state_machine}")]
    StartNodeMismatch { state_machine: NodeId, node: NodeId },

    #[error("{node} is listed by {state_machine} but names {found:?} as its parent")]
    ParentMismatch {
        node: NodeId,
        state_machine: NodeId,
        found: Option<NodeId>,
    },

    #[error("{0} is not reachable from the root")]
    Detached(NodeId),

    #[error("parent chain of {0} contains a cycle")]
    CyclicParentChain(NodeId),

    #[error("{transition} points at missing {node}")]
    DanglingTransition {
        transition: TransitionId,
        node: NodeId,
    },

    #[error("{transition} is not listed on its source {node}")]
    UnlistedTransition {
        transition: TransitionId,
        node: NodeId,
    },

    #[error("failed to decode graph: {0}")]
    Json(#[from] serde_json::Error),
}
