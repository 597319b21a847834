//! State machine payload of a composite node.

use serde::{Deserialize, Serialize};

use crate::blackboard::Blackboard;
use crate::ids::NodeId;

/// Children, start node and blackboard of a state machine node.
///
/// Children are owned by the [`Graph`](crate::Graph) arena; this only lists
/// their ids. Keep it consistent through the graph's authoring methods so
/// the start-node flags stay in step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateMachineData {
    /// Direct children in authoring order.
    #[serde(default)]
    pub nodes: Vec<NodeId>,

    #[serde(default)]
    pub start_node: Option<NodeId>,

    #[serde(default)]
    pub blackboard: Blackboard,
}

impl StateMachineData {
    /// Whether `node` is a direct child.
    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains(&node)
    }

    /// Whether the state machine has no children.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
