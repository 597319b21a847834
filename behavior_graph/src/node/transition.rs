//! Transitions - directed, optionally conditioned edges between nodes.

use serde::{Deserialize, Serialize};

use crate::ids::{NodeId, TransitionId};

/// A directed edge from one node to another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub id: TransitionId,

    /// Node this transition leaves.
    pub from_node: NodeId,

    /// Node this transition enters.
    pub to_node: NodeId,

    /// Evaluate the bound condition list; otherwise the transition always passes.
    #[serde(default)]
    pub use_conditions: bool,

    /// Fire when the conditions fail instead of when they pass.
    #[serde(default)]
    pub is_negative: bool,

    /// Never fire.
    #[serde(default)]
    pub mute: bool,
}

impl Transition {
    /// Create an unconditioned transition with a fresh id.
    pub fn new(from_node: NodeId, to_node: NodeId) -> Self {
        Self {
            id: TransitionId::new(),
            from_node,
            to_node,
            use_conditions: false,
            is_negative: false,
            mute: false,
        }
    }

    /// Gate the transition on its bound condition list.
    pub fn with_conditions(mut self) -> Self {
        self.use_conditions = true;
        self
    }

    /// Invert the condition result.
    pub fn negated(mut self) -> Self {
        self.is_negative = true;
        self
    }

    /// Mute or unmute the transition.
    pub fn with_mute(mut self, mute: bool) -> Self {
        self.mute = mute;
        self
    }

    /// Whether a condition outcome lets this transition fire.
    ///
    /// Muted transitions never fire. A negative transition fires on a
    /// failing condition, a normal one on a passing condition.
    pub fn accepts(&self, condition_passed: bool) -> bool {
        !self.mute && (condition_passed != self.is_negative)
    }
}
