//! Graph arena - owns every node and transition of one behavior graph.
//!
//! Nodes refer to each other by id: a state machine lists its children, a
//! child names its parent. The arena keeps both directions consistent while
//! the graph is authored through its methods.

mod error;
mod validate;

pub use error::*;

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::blackboard::{Blackboard, BlackboardItem};
use crate::ids::{GraphId, NodeId, TransitionId};
use crate::node::{Node, NodeKind, Transition, TransitionMode};

/// A behavior graph: a root state machine and everything beneath it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "GraphRecord", into = "GraphRecord")]
pub struct Graph {
    name: String,
    root: NodeId,
    nodes: HashMap<NodeId, Node>,
    transitions: HashMap<TransitionId, Transition>,
}

/// Flat, serializable form of a [`Graph`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphRecord {
    pub name: String,
    pub root: NodeId,
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub transitions: Vec<Transition>,
}

impl Graph {
    /// Create a graph holding only an empty root state machine.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let root = Node::state_machine(name.clone());
        let root_id = root.id;

        let mut nodes = HashMap::new();
        nodes.insert(root_id, root);

        Self {
            name,
            root: root_id,
            nodes,
            transitions: HashMap::new(),
        }
    }

    /// Name of the graph, shared with its root.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The outermost state machine.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Node by id.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Transition by id.
    pub fn transition(&self, id: TransitionId) -> Option<&Transition> {
        self.transitions.get(&id)
    }

    /// Whether the graph holds this node.
    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Whether the graph holds this transition.
    pub fn contains_transition(&self, id: TransitionId) -> bool {
        self.transitions.contains_key(&id)
    }

    /// Number of nodes, root included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of transitions.
    pub fn transition_count(&self) -> usize {
        self.transitions.len()
    }

    /// Whether `id` names a live node or transition.
    pub fn contains_id(&self, id: GraphId) -> bool {
        self.nodes.contains_key(&NodeId(id.0)) || self.transitions.contains_key(&TransitionId(id.0))
    }

    /// Add `node` as the last child of state machine `parent`.
    ///
    /// The node arrives detached: its transition list is cleared and, if it
    /// is a state machine, so are its children (its blackboard is kept).
    /// The first child of a state machine becomes its start node.
    pub fn add_node(&mut self, parent: NodeId, mut node: Node) -> Result<NodeId, GraphError> {
        let id = node.id;
        if !id.graph_id().is_assigned() {
            return Err(GraphError::UnassignedId(id.0));
        }
        if self.contains_id(id.graph_id()) {
            return Err(GraphError::DuplicateId(id.0));
        }

        let parent_data = self
            .nodes
            .get_mut(&parent)
            .ok_or(GraphError::UnknownNode(parent))?
            .as_state_machine_mut()
            .ok_or(GraphError::NotAStateMachine(parent))?;

        let becomes_start = parent_data.start_node.is_none();
        parent_data.nodes.push(id);
        if becomes_start {
            parent_data.start_node = Some(id);
        }

        node.parent = Some(parent);
        node.is_start_node = becomes_start;
        node.transitions.clear();
        if let Some(data) = node.as_state_machine_mut() {
            data.nodes.clear();
            data.start_node = None;
        }

        self.nodes.insert(id, node);
        Ok(id)
    }

    /// Add a plain state under `parent`.
    pub fn add_state(&mut self, parent: NodeId, name: impl Into<String>) -> Result<NodeId, GraphError> {
        self.add_node(parent, Node::state(name))
    }

    /// Add a trigger state under `parent`.
    pub fn add_trigger_state(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
    ) -> Result<NodeId, GraphError> {
        self.add_node(parent, Node::trigger_state(name))
    }

    /// Add an empty nested state machine under `parent`.
    pub fn add_state_machine(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
    ) -> Result<NodeId, GraphError> {
        self.add_node(parent, Node::state_machine(name))
    }

    /// Make `node` the start node of its state machine.
    ///
    /// Clears the flag on every sibling, so a state machine never ends up
    /// with two start nodes.
    pub fn set_start_node(&mut self, node: NodeId) -> Result<(), GraphError> {
        let parent = self
            .nodes
            .get(&node)
            .ok_or(GraphError::UnknownNode(node))?
            .parent
            .ok_or(GraphError::NoParent(node))?;

        let siblings = self.children(parent).to_vec();
        for sibling in siblings {
            if let Some(n) = self.nodes.get_mut(&sibling) {
                n.is_start_node = sibling == node;
            }
        }

        if let Some(data) = self.nodes.get_mut(&parent).and_then(Node::as_state_machine_mut) {
            data.start_node = Some(node);
        }
        tracing::debug!(%node, state_machine = %parent, "start node changed");
        Ok(())
    }

    /// Start node of a state machine.
    pub fn start_node(&self, state_machine: NodeId) -> Option<NodeId> {
        self.node(state_machine)?.as_state_machine()?.start_node
    }

    /// Direct children of a state machine; empty for anything else.
    pub fn children(&self, state_machine: NodeId) -> &[NodeId] {
        self.node(state_machine).map(Node::children).unwrap_or(&[])
    }

    /// Set how a node evaluates its outgoing transitions.
    pub fn set_transition_mode(&mut self, node: NodeId, mode: TransitionMode) -> Result<(), GraphError> {
        self.nodes
            .get_mut(&node)
            .ok_or(GraphError::UnknownNode(node))?
            .transition_mode = mode;
        Ok(())
    }

    /// Rename a node. Errors if it is not in the graph.
    pub fn rename_node(&mut self, node: NodeId, name: impl Into<String>) -> Result<(), GraphError> {
        self.nodes
            .get_mut(&node)
            .ok_or(GraphError::UnknownNode(node))?
            .name = name.into();
        Ok(())
    }

    /// Add a transition and append it to its source node's list.
    pub fn add_transition(&mut self, transition: Transition) -> Result<TransitionId, GraphError> {
        let id = transition.id;
        if !id.graph_id().is_assigned() {
            return Err(GraphError::UnassignedId(id.0));
        }
        if self.contains_id(id.graph_id()) {
            return Err(GraphError::DuplicateId(id.0));
        }
        if !self.nodes.contains_key(&transition.to_node) {
            return Err(GraphError::UnknownNode(transition.to_node));
        }

        let from = self
            .nodes
            .get_mut(&transition.from_node)
            .ok_or(GraphError::UnknownNode(transition.from_node))?;
        from.transitions.push(id);

        self.transitions.insert(id, transition);
        Ok(id)
    }

    /// Add an unconditioned transition from `from` to `to`.
    pub fn connect(&mut self, from: NodeId, to: NodeId) -> Result<TransitionId, GraphError> {
        self.add_transition(Transition::new(from, to))
    }

    /// Mute or unmute a transition.
    pub fn set_mute(&mut self, transition: TransitionId, mute: bool) -> Result<(), GraphError> {
        self.transitions
            .get_mut(&transition)
            .ok_or(GraphError::UnknownTransition(transition))?
            .mute = mute;
        Ok(())
    }

    /// Remove a transition and unlink it from its source node.
    pub fn remove_transition(&mut self, id: TransitionId) -> Option<Transition> {
        let transition = self.transitions.remove(&id)?;
        if let Some(from) = self.nodes.get_mut(&transition.from_node) {
            from.transitions.retain(|t| *t != id);
        }
        Some(transition)
    }

    /// Remove a node, its whole subtree and every transition touching them.
    ///
    /// If the node was its state machine's start node, the first remaining
    /// sibling takes over. Returns the ids of every removed node.
    pub fn remove_node(&mut self, id: NodeId) -> Result<Vec<NodeId>, GraphError> {
        if id == self.root {
            return Err(GraphError::RootRemoval);
        }
        let parent = self.node(id).ok_or(GraphError::UnknownNode(id))?.parent;

        let mut removed = vec![id];
        removed.extend(self.nodes_recursive(id));
        let removed_set: HashSet<NodeId> = removed.iter().copied().collect();

        let dead_transitions: Vec<TransitionId> = self
            .transitions
            .values()
            .filter(|t| removed_set.contains(&t.from_node) || removed_set.contains(&t.to_node))
            .map(|t| t.id)
            .collect();
        for transition in dead_transitions {
            self.remove_transition(transition);
        }

        for node in &removed {
            self.nodes.remove(node);
        }

        if let Some(parent) = parent {
            let mut promoted = None;
            if let Some(data) = self.nodes.get_mut(&parent).and_then(Node::as_state_machine_mut) {
                data.nodes.retain(|n| *n != id);
                if data.start_node == Some(id) {
                    data.start_node = data.nodes.first().copied();
                    promoted = data.start_node;
                }
            }
            if let Some(next) = promoted.and_then(|n| self.nodes.get_mut(&n)) {
                next.is_start_node = true;
            }
        }

        tracing::debug!(node = %id, count = removed.len(), "removed nodes");
        Ok(removed)
    }

    /// Every node beneath a state machine, depth first.
    ///
    /// Computed on each call. Returns nothing for a leaf or an unknown id.
    pub fn nodes_recursive(&self, state_machine: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        self.collect_nodes(state_machine, &mut out, &mut seen);
        out
    }

    fn collect_nodes(&self, state_machine: NodeId, out: &mut Vec<NodeId>, seen: &mut HashSet<NodeId>) {
        for child in self.children(state_machine) {
            if !seen.insert(*child) {
                continue;
            }
            out.push(*child);
            if self.node(*child).is_some_and(Node::is_state_machine) {
                self.collect_nodes(*child, out, seen);
            }
        }
    }

    /// Transitions leaving any node beneath a state machine, in node order.
    pub fn transitions_recursive(&self, state_machine: NodeId) -> Vec<TransitionId> {
        self.nodes_recursive(state_machine)
            .into_iter()
            .filter_map(|n| self.node(n))
            .flat_map(|n| n.transitions.iter().copied())
            .collect()
    }

    /// Find the first node with this name, searching the root and then its
    /// descendants depth first.
    pub fn find_node_by_name(&self, name: &str) -> Option<NodeId> {
        std::iter::once(self.root)
            .chain(self.nodes_recursive(self.root))
            .find(|id| self.node(*id).is_some_and(|n| n.name == name))
    }

    /// Parent, grandparent and so on up to the root.
    ///
    /// Stops early if the chain loops back on itself.
    pub fn ancestors(&self, node: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut current = self.node(node).and_then(|n| n.parent);
        while let Some(parent) = current {
            if parent == node || chain.contains(&parent) {
                break;
            }
            chain.push(parent);
            current = self.node(parent).and_then(|n| n.parent);
        }
        chain
    }

    /// Blackboard of a state machine node.
    pub fn blackboard(&self, state_machine: NodeId) -> Option<&Blackboard> {
        Some(&self.node(state_machine)?.as_state_machine()?.blackboard)
    }

    /// Mutable blackboard of a state machine node.
    pub fn blackboard_mut(&mut self, state_machine: NodeId) -> Option<&mut Blackboard> {
        Some(&mut self.nodes.get_mut(&state_machine)?.as_state_machine_mut()?.blackboard)
    }

    /// Blackboard items of a state machine followed by those of every nested
    /// state machine, depth first. Duplicate names are kept.
    pub fn blackboard_items(&self, state_machine: NodeId) -> Vec<&BlackboardItem> {
        let mut items = Vec::new();
        let mut seen = HashSet::new();
        self.collect_blackboard(state_machine, &mut items, &mut seen);
        items
    }

    fn collect_blackboard<'a>(
        &'a self,
        state_machine: NodeId,
        items: &mut Vec<&'a BlackboardItem>,
        seen: &mut HashSet<NodeId>,
    ) {
        if !seen.insert(state_machine) {
            return;
        }
        let Some(data) = self.node(state_machine).and_then(Node::as_state_machine) else {
            return;
        };
        items.extend(data.blackboard.items());
        for child in &data.nodes {
            if self.node(*child).is_some_and(Node::is_state_machine) {
                self.collect_blackboard(*child, items, seen);
            }
        }
    }

    /// Iterate over all nodes in no particular order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Iterate over all transitions in no particular order.
    pub fn transitions(&self) -> impl Iterator<Item = &Transition> {
        self.transitions.values()
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, GraphError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a graph from JSON.
    ///
    /// Ids stored in the document are reserved so that nodes added later do
    /// not collide with them.
    pub fn from_json(json: &str) -> Result<Self, GraphError> {
        Ok(serde_json::from_str(json)?)
    }
}

impl From<Graph> for GraphRecord {
    fn from(graph: Graph) -> Self {
        let mut nodes: Vec<Node> = graph.nodes.into_values().collect();
        nodes.sort_by_key(|n| n.id);
        let mut transitions: Vec<Transition> = graph.transitions.into_values().collect();
        transitions.sort_by_key(|t| t.id);

        GraphRecord {
            name: graph.name,
            root: graph.root,
            nodes,
            transitions,
        }
    }
}

impl TryFrom<GraphRecord> for Graph {
    type Error = GraphError;

    fn try_from(record: GraphRecord) -> Result<Self, Self::Error> {
        let mut nodes = HashMap::with_capacity(record.nodes.len());
        let mut transitions = HashMap::with_capacity(record.transitions.len());
        let mut highest = GraphId::UNASSIGNED;

        for node in record.nodes {
            let id = node.id;
            highest = highest.max(id.graph_id());
            if nodes.insert(id, node).is_some() {
                return Err(GraphError::DuplicateId(id.0));
            }
        }
        for transition in record.transitions {
            let id = transition.id;
            highest = highest.max(id.graph_id());
            if nodes.contains_key(&NodeId(id.0)) || transitions.insert(id, transition).is_some() {
                return Err(GraphError::DuplicateId(id.0));
            }
        }

        match nodes.get(&record.root) {
            Some(root) if matches!(root.kind, NodeKind::StateMachine(_)) && root.parent.is_none() => {}
            Some(_) => return Err(GraphError::InvalidRoot(record.root)),
            None => return Err(GraphError::UnknownNode(record.root)),
        }

        GraphId::reserve(highest);
        Ok(Graph {
            name: record.name,
            root: record.root,
            nodes,
            transitions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blackboard::VariableValue;

    /// Root -> [Idle, Alert, Combat -> [Attack, Retreat]]
    fn setup_test_graph() -> (Graph, NodeId, NodeId, NodeId, NodeId, NodeId) {
        let mut graph = Graph::new("Guard");
        let root = graph.root();
        let idle = graph.add_state(root, "Idle").unwrap();
        let alert = graph.add_state(root, "Alert").unwrap();
        let combat = graph.add_state_machine(root, "Combat").unwrap();
        let attack = graph.add_state(combat, "Attack").unwrap();
        let retreat = graph.add_state(combat, "Retreat").unwrap();
        (graph, idle, alert, combat, attack, retreat)
    }

    #[test]
    fn test_first_child_becomes_start() {
        let (graph, idle, alert, combat, attack, _) = setup_test_graph();

        assert_eq!(graph.start_node(graph.root()), Some(idle));
        assert!(graph.node(idle).unwrap().is_start_node);
        assert!(!graph.node(alert).unwrap().is_start_node);
        assert_eq!(graph.start_node(combat), Some(attack));
    }

    #[test]
    fn test_single_start_node() {
        let (mut graph, idle, alert, _, _, _) = setup_test_graph();
        let root = graph.root();

        graph.set_start_node(alert).unwrap();

        let flagged: Vec<_> = graph
            .children(root)
            .iter()
            .filter(|n| graph.node(**n).unwrap().is_start_node)
            .copied()
            .collect();
        assert_eq!(flagged, vec![alert]);
        assert_eq!(graph.start_node(root), Some(alert));
        assert!(!graph.node(idle).unwrap().is_start_node);
    }

    #[test]
    fn test_add_to_leaf_fails() {
        let (mut graph, idle, ..) = setup_test_graph();
        assert!(matches!(
            graph.add_state(idle, "Nested"),
            Err(GraphError::NotAStateMachine(_))
        ));
    }

    #[test]
    fn test_nodes_recursive_depth_first() {
        let (graph, idle, alert, combat, attack, retreat) = setup_test_graph();

        assert_eq!(
            graph.nodes_recursive(graph.root()),
            vec![idle, alert, combat, attack, retreat]
        );
        assert!(graph.nodes_recursive(idle).is_empty());
    }

    #[test]
    fn test_empty_state_machine_queries() {
        let mut graph = Graph::new("Empty");
        let root = graph.root();
        let nested = graph.add_state_machine(root, "Nothing").unwrap();

        assert!(graph.nodes_recursive(nested).is_empty());
        assert!(graph.transitions_recursive(nested).is_empty());
        assert!(graph.blackboard_items(nested).is_empty());
        assert_eq!(graph.start_node(nested), None);
    }

    #[test]
    fn test_find_node_by_name() {
        let (graph, _, _, _, _, retreat) = setup_test_graph();

        assert_eq!(graph.find_node_by_name("Retreat"), Some(retreat));
        assert_eq!(graph.find_node_by_name("Guard"), Some(graph.root()));
        assert_eq!(graph.find_node_by_name("Missing"), None);
    }

    #[test]
    fn test_ancestors() {
        let (graph, _, _, combat, attack, _) = setup_test_graph();

        assert_eq!(graph.ancestors(attack), vec![combat, graph.root()]);
        assert!(graph.ancestors(graph.root()).is_empty());
    }

    #[test]
    fn test_transitions() {
        let (mut graph, idle, alert, combat, ..) = setup_test_graph();

        let t1 = graph.connect(idle, alert).unwrap();
        let t2 = graph
            .add_transition(Transition::new(idle, combat).with_conditions())
            .unwrap();

        assert_eq!(graph.node(idle).unwrap().transitions, vec![t1, t2]);
        assert!(graph.transition(t2).unwrap().use_conditions);

        let removed = graph.remove_transition(t1).unwrap();
        assert_eq!(removed.to_node, alert);
        assert_eq!(graph.node(idle).unwrap().transitions, vec![t2]);
    }

    #[test]
    fn test_rename_node() {
        let (mut graph, idle, ..) = setup_test_graph();

        graph.rename_node(idle, "Patrol").unwrap();

        assert_eq!(graph.find_node_by_name("Patrol"), Some(idle));
        assert_eq!(graph.find_node_by_name("Idle"), None);
        assert!(matches!(
            graph.rename_node(NodeId::new(), "Ghost"),
            Err(GraphError::UnknownNode(_))
        ));
    }

    #[test]
    fn test_set_mute() {
        let (mut graph, idle, alert, ..) = setup_test_graph();
        let t = graph.connect(idle, alert).unwrap();

        graph.set_mute(t, true).unwrap();
        assert!(!graph.transition(t).unwrap().accepts(true));

        graph.set_mute(t, false).unwrap();
        assert!(graph.transition(t).unwrap().accepts(true));

        assert!(matches!(
            graph.set_mute(TransitionId::new(), true),
            Err(GraphError::UnknownTransition(_))
        ));
    }

    #[test]
    fn test_transition_to_unknown_node() {
        let (mut graph, idle, ..) = setup_test_graph();
        let result = graph.connect(idle, NodeId::new());
        assert!(matches!(result, Err(GraphError::UnknownNode(_))));
        assert!(graph.node(idle).unwrap().transitions.is_empty());
    }

    #[test]
    fn test_remove_subtree() {
        let (mut graph, idle, alert, combat, attack, retreat) = setup_test_graph();
        let into_combat = graph.connect(idle, combat).unwrap();
        let out_of_combat = graph.connect(attack, alert).unwrap();
        let kept = graph.connect(idle, alert).unwrap();

        let removed = graph.remove_node(combat).unwrap();

        assert_eq!(removed, vec![combat, attack, retreat]);
        assert!(!graph.contains_node(attack));
        assert!(!graph.contains_transition(into_combat));
        assert!(!graph.contains_transition(out_of_combat));
        assert!(graph.contains_transition(kept));
        assert_eq!(graph.node(idle).unwrap().transitions, vec![kept]);
    }

    #[test]
    fn test_remove_start_node_promotes_sibling() {
        let (mut graph, idle, alert, ..) = setup_test_graph();

        graph.remove_node(idle).unwrap();

        assert_eq!(graph.start_node(graph.root()), Some(alert));
        assert!(graph.node(alert).unwrap().is_start_node);
        assert!(matches!(graph.remove_node(graph.root()), Err(GraphError::RootRemoval)));
    }

    #[test]
    fn test_blackboard_aggregation_keeps_duplicates() {
        let (mut graph, _, _, combat, ..) = setup_test_graph();
        let root = graph.root();
        let inner = graph.add_state_machine(combat, "Inner").unwrap();

        graph.blackboard_mut(root).unwrap().insert(BlackboardItem::new("target", "none"));
        graph.blackboard_mut(combat).unwrap().insert(BlackboardItem::new("ammo", 12i64));
        graph.blackboard_mut(inner).unwrap().insert(BlackboardItem::new("target", "player"));

        let names: Vec<_> = graph
            .blackboard_items(root)
            .iter()
            .map(|i| i.name.as_str())
            .collect();
        assert_eq!(names, vec!["target", "ammo", "target"]);

        let combat_items = graph.blackboard_items(combat);
        assert_eq!(combat_items.len(), 2);
        assert_eq!(combat_items[1].default, VariableValue::from("player"));
    }

    #[test]
    fn test_json_round_trip_reserves_ids() {
        let (mut graph, idle, alert, ..) = setup_test_graph();
        graph.connect(idle, alert).unwrap();

        let json = graph.to_json().unwrap();
        let loaded = Graph::from_json(&json).unwrap();

        assert_eq!(loaded.node_count(), graph.node_count());
        assert_eq!(loaded.transition_count(), 1);
        assert_eq!(loaded.find_node_by_name("Alert"), Some(alert));

        let fresh = NodeId::new();
        assert!(!loaded.contains_node(fresh));
    }

    #[test]
    fn test_json_rejects_bad_root() {
        let (graph, idle, ..) = setup_test_graph();
        let mut record = GraphRecord::from(graph);
        record.root = idle;

        let json = serde_json::to_string(&record).unwrap();
        assert!(Graph::from_json(&json).is_err());
    }
}
