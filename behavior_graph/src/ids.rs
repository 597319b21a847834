//! Identifiers for graph elements and the entities that drive them.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};
use uuid::Uuid;

/// Next id handed out by [`GraphId::next`]. Ids start at 1; anything `<= 0`
/// is treated as unassigned.
static NEXT_GRAPH_ID: AtomicI64 = AtomicI64::new(1);

/// Process-wide id shared by nodes and transitions.
///
/// Nodes and transitions draw from the same counter, so a reaction registry
/// can key both kinds of element by a single integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GraphId(pub i64);

impl GraphId {
    /// The id of an element that was never registered.
    pub const UNASSIGNED: GraphId = GraphId(0);

    /// Allocate a fresh id.
    pub fn next() -> Self {
        Self(NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Make sure ids handed out later never collide with `id`.
    ///
    /// Called when a graph is loaded from storage with ids already baked in.
    pub fn reserve(id: GraphId) {
        NEXT_GRAPH_ID.fetch_max(id.0.saturating_add(1), Ordering::Relaxed);
    }

    /// Whether this id can be bound to a reaction.
    pub fn is_assigned(&self) -> bool {
        self.0 > 0
    }
}

impl std::fmt::Display for GraphId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a node (state, trigger state or state machine).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub i64);

impl NodeId {
    /// Allocate a new node id.
    pub fn new() -> Self {
        Self(GraphId::next().0)
    }

    /// The registry key for this node.
    pub fn graph_id(&self) -> GraphId {
        GraphId(self.0)
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<NodeId> for GraphId {
    fn from(id: NodeId) -> Self {
        id.graph_id()
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Identifier of a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransitionId(pub i64);

impl TransitionId {
    /// Allocate a new transition id.
    pub fn new() -> Self {
        Self(GraphId::next().0)
    }

    /// The registry key for this transition.
    pub fn graph_id(&self) -> GraphId {
        GraphId(self.0)
    }
}

impl Default for TransitionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<TransitionId> for GraphId {
    fn from(id: TransitionId) -> Self {
        id.graph_id()
    }
}

impl std::fmt::Display for TransitionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "transition#{}", self.0)
    }
}

/// Identifier of the entity a graph runs for (a character, a trap, a quest step).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    /// Create a new random entity ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a nil/empty entity ID.
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
