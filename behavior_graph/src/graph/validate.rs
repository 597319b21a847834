//! Structural checks for authored graphs.
//!
//! The runtime assumes these hold and never checks them itself; loaders and
//! authoring tools call [`Graph::validate`] before handing a graph over.

use std::collections::HashSet;

use super::{Graph, GraphError};
use crate::ids::NodeId;
use crate::node::Node;

impl Graph {
    /// Check every structural precondition and report all violations.
    ///
    /// An empty result means the graph is safe to run: one root state
    /// machine, one start node per state machine with matching flags,
    /// consistent parent links, no parent cycles and no dangling transitions.
    pub fn validate(&self) -> Vec<GraphError> {
        let mut errors = Vec::new();

        match self.node(self.root) {
            Some(root) if root.is_state_machine() && root.parent.is_none() => {}
            _ => errors.push(GraphError::InvalidRoot(self.root)),
        }

        let mut nodes: Vec<&Node> = self.nodes.values().collect();
        nodes.sort_by_key(|n| n.id);

        for node in &nodes {
            if !node.id.graph_id().is_assigned() {
                errors.push(GraphError::UnassignedId(node.id.0));
            }
            if let Some(data) = node.as_state_machine() {
                self.check_state_machine(node.id, &data.nodes, data.start_node, &mut errors);
            }
            if node.id != self.root {
                self.check_parent_chain(node, &mut errors);
            }
            for transition in &node.transitions {
                if !self.transitions.contains_key(transition) {
                    errors.push(GraphError::UnknownTransition(*transition));
                }
            }
        }

        let mut transitions: Vec<_> = self.transitions.values().collect();
        transitions.sort_by_key(|t| t.id);
        for transition in transitions {
            if !transition.id.graph_id().is_assigned() {
                errors.push(GraphError::UnassignedId(transition.id.0));
            }
            for endpoint in [transition.from_node, transition.to_node] {
                if !self.nodes.contains_key(&endpoint) {
                    errors.push(GraphError::DanglingTransition {
                        transition: transition.id,
                        node: endpoint,
                    });
                }
            }
            if let Some(from) = self.node(transition.from_node) {
                if !from.transitions.contains(&transition.id) {
                    errors.push(GraphError::UnlistedTransition {
                        transition: transition.id,
                        node: from.id,
                    });
                }
            }
        }

        errors
    }

    fn check_state_machine(
        &self,
        state_machine: NodeId,
        children: &[NodeId],
        start_node: Option<NodeId>,
        errors: &mut Vec<GraphError>,
    ) {
        let mut flagged = 0;
        for child in children {
            let Some(node) = self.node(*child) else {
                errors.push(GraphError::UnknownNode(*child));
                continue;
            };
            if node.parent != Some(state_machine) {
                errors.push(GraphError::ParentMismatch {
                    node: *child,
                    state_machine,
                    found: node.parent,
                });
            }
            if node.is_start_node {
                flagged += 1;
            }
            if node.is_start_node != (start_node == Some(*child)) {
                errors.push(GraphError::StartNodeMismatch {
                    state_machine,
                    node: *child,
                });
            }
        }

        if flagged > 1 {
            errors.push(GraphError::MultipleStartNodes {
                state_machine,
                count: flagged,
            });
        }
        if let Some(start) = start_node {
            if !children.contains(&start) {
                errors.push(GraphError::StartNodeMismatch {
                    state_machine,
                    node: start,
                });
            }
        }
    }

    fn check_parent_chain(&self, node: &Node, errors: &mut Vec<GraphError>) {
        let mut seen = HashSet::from([node.id]);
        let mut current = node.parent;
        loop {
            match current {
                None => {
                    errors.push(GraphError::Detached(node.id));
                    return;
                }
                Some(parent) if parent == self.root => return,
                Some(parent) if !seen.insert(parent) => {
                    errors.push(GraphError::CyclicParentChain(node.id));
                    return;
                }
                Some(parent) => match self.node(parent) {
                    Some(p) => current = p.parent,
                    None => {
                        errors.push(GraphError::UnknownNode(parent));
                        return;
                    }
                },
            }
        }
    }
}
