//! Reaction instances - the live half of a graph.
//!
//! A [`ReactionInstance`] owns the components bound to node and transition
//! ids, the instance-side variables, and the runtime [`GraphState`]. It is
//! built from a [`ReactionTemplate`], which is the part of a [`GraphAsset`]
//! that knows which component goes with which id.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::rc::Rc;
use uuid::Uuid;

use behavior_graph::{BlackboardItem, Graph, GraphId, NodeId, TransitionId, VariableValue};

use crate::capability::Reaction;
use crate::registry::ReactionRegistry;
use crate::variables::VariableStore;

/// Unique identifier for a reaction instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceId(pub Uuid);

impl InstanceId {
    /// A random instance id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Runtime flags of one instance: which nodes are entered, which trigger
/// states are armed, which transitions have fired since their source was
/// entered.
#[derive(Debug, Clone, Default)]
pub struct GraphState {
    entered: Vec<NodeId>,
    armed: Vec<NodeId>,
    entered_transitions: HashSet<TransitionId>,
}

impl GraphState {
    /// No flags set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a node entered. Returns `false` if it already was.
    pub fn enter(&mut self, node: NodeId) -> bool {
        if self.entered.contains(&node) {
            return false;
        }
        self.entered.push(node);
        true
    }

    /// Clear a node's entered flag. Returns `false` if it was not set.
    pub fn exit(&mut self, node: NodeId) -> bool {
        let before = self.entered.len();
        self.entered.retain(|n| *n != node);
        self.entered.len() != before
    }

    /// Whether the node is entered.
    pub fn is_entered(&self, node: NodeId) -> bool {
        self.entered.contains(&node)
    }

    /// Entered nodes, in the order they were entered.
    pub fn entered(&self) -> &[NodeId] {
        &self.entered
    }

    /// Arm a trigger state so it can be ignited.
    pub fn arm(&mut self, trigger: NodeId) {
        if !self.armed.contains(&trigger) {
            self.armed.push(trigger);
        }
    }

    /// Disarm a trigger state. Returns `false` if it was not armed.
    pub fn disarm(&mut self, trigger: NodeId) -> bool {
        let before = self.armed.len();
        self.armed.retain(|n| *n != trigger);
        self.armed.len() != before
    }

    /// Whether the trigger state is armed.
    pub fn is_armed(&self, trigger: NodeId) -> bool {
        self.armed.contains(&trigger)
    }

    /// Armed trigger states, in arming order.
    pub fn armed(&self) -> &[NodeId] {
        &self.armed
    }

    /// Record that a transition fired.
    pub fn mark_transition(&mut self, transition: TransitionId) {
        self.entered_transitions.insert(transition);
    }

    /// Whether the transition fired since its source was entered.
    pub fn is_transition_entered(&self, transition: TransitionId) -> bool {
        self.entered_transitions.contains(&transition)
    }

    /// Forget the fired flag of each transition in `transitions`.
    pub fn clear_transitions(&mut self, transitions: &[TransitionId]) {
        for transition in transitions {
            self.entered_transitions.remove(transition);
        }
    }

    /// Drop every flag.
    pub fn reset(&mut self) {
        self.entered.clear();
        self.armed.clear();
        self.entered_transitions.clear();
    }
}

/// A list-typed variable container carried over from the controller.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ListVariable {
    pub name: String,
    pub values: Vec<VariableValue>,
}

impl ListVariable {
    /// An empty list variable.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: Vec::new(),
        }
    }

    /// Append a value, builder style.
    pub fn with_value(mut self, value: impl Into<VariableValue>) -> Self {
        self.values.push(value.into());
        self
    }
}

/// Opaque handle to a physics collider owned by the host engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColliderHandle(pub u64);

/// The live components and state paired with one graph.
#[derive(Debug)]
pub struct ReactionInstance {
    id: InstanceId,
    pub(crate) registry: ReactionRegistry,
    variables: VariableStore,
    pub(crate) state: GraphState,
    list_variables: Vec<ListVariable>,
    collider: Option<ColliderHandle>,
}

impl ReactionInstance {
    /// An empty instance with its own variable store.
    pub fn new() -> Self {
        Self::with_variables(VariableStore::new())
    }

    /// An empty instance over an existing variable store.
    pub fn with_variables(variables: VariableStore) -> Self {
        Self {
            id: InstanceId::new(),
            registry: ReactionRegistry::new(),
            variables,
            state: GraphState::new(),
            list_variables: Vec::new(),
            collider: None,
        }
    }

    /// Unique id of this instance.
    pub fn id(&self) -> InstanceId {
        self.id
    }

    /// Components bound to graph ids.
    pub fn registry(&self) -> &ReactionRegistry {
        &self.registry
    }

    /// Mutable access to the registry.
    pub fn registry_mut(&mut self) -> &mut ReactionRegistry {
        &mut self.registry
    }

    /// Instance-side variables.
    pub fn variables(&self) -> &VariableStore {
        &self.variables
    }

    /// Runtime flags.
    pub fn state(&self) -> &GraphState {
        &self.state
    }

    /// Mutable runtime flags.
    pub fn state_mut(&mut self) -> &mut GraphState {
        &mut self.state
    }

    /// List variables, in insertion order.
    pub fn list_variables(&self) -> &[ListVariable] {
        &self.list_variables
    }

    /// List variable by name.
    pub fn list_variable(&self, name: &str) -> Option<&ListVariable> {
        self.list_variables.iter().find(|l| l.name == name)
    }

    /// Add list variables, replacing any with the same name.
    pub fn extend_list_variables(&mut self, lists: impl IntoIterator<Item = ListVariable>) {
        for list in lists {
            match self.list_variables.iter_mut().find(|l| l.name == list.name) {
                Some(existing) => *existing = list,
                None => self.list_variables.push(list),
            }
        }
    }

    /// Collider handle given by the host, if any.
    pub fn collider(&self) -> Option<ColliderHandle> {
        self.collider
    }

    /// Replace the collider handle.
    pub fn set_collider(&mut self, collider: Option<ColliderHandle>) {
        self.collider = collider;
    }
}

impl Default for ReactionInstance {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds one component for a bound id.
pub type ReactionFactory = Rc<dyn Fn() -> Box<dyn Reaction>>;

/// Which components to build for which ids, and the extra variables an
/// instance starts with.
#[derive(Clone, Default)]
pub struct ReactionTemplate {
    bindings: Vec<(GraphId, ReactionFactory)>,
    variables: Vec<BlackboardItem>,
    list_variables: Vec<ListVariable>,
}

impl ReactionTemplate {
    /// A template with no bindings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a component factory to a node or transition id.
    pub fn with_reaction<F>(mut self, id: impl Into<GraphId>, factory: F) -> Self
    where
        F: Fn() -> Box<dyn Reaction> + 'static,
    {
        self.bindings.push((id.into(), Rc::new(factory)));
        self
    }

    /// Add a variable on top of the graph's blackboards.
    pub fn with_variable(mut self, name: impl Into<String>, default: impl Into<VariableValue>) -> Self {
        self.variables.push(BlackboardItem::new(name, default));
        self
    }

    /// Add a list variable every instance starts with.
    pub fn with_list_variable(mut self, list: ListVariable) -> Self {
        self.list_variables.push(list);
        self
    }

    /// Number of factory bindings.
    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }

    /// Build a fresh instance for `graph`.
    ///
    /// Variables come from every blackboard under the root, then the
    /// template's own; the first declaration of a name wins. Each bound
    /// factory runs once, and a second binding for the same id is rejected.
    pub fn instantiate(&self, graph: &Graph) -> ReactionInstance {
        let items = graph
            .blackboard_items(graph.root())
            .into_iter()
            .chain(self.variables.iter());
        let mut instance = ReactionInstance::with_variables(VariableStore::from_items(items));

        for (id, factory) in &self.bindings {
            if !graph.contains_id(*id) {
                tracing::debug!(%id, graph = graph.name(), "binding for an id the graph does not contain");
            }
            instance.registry.register(*id, factory());
        }
        instance.extend_list_variables(self.list_variables.iter().cloned());

        tracing::debug!(
            instance = %instance.id,
            graph = graph.name(),
            components = instance.registry.len(),
            variables = instance.variables.len(),
            "instantiated reaction instance"
        );
        instance
    }
}

impl std::fmt::Debug for ReactionTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReactionTemplate")
            .field("bindings", &self.bindings.iter().map(|(id, _)| *id).collect::<Vec<_>>())
            .field("variables", &self.variables)
            .field("list_variables", &self.list_variables)
            .finish()
    }
}

/// A graph together with the template that brings it to life.
#[derive(Debug, Clone)]
pub struct GraphAsset {
    pub graph: Rc<Graph>,
    pub template: Option<ReactionTemplate>,
}

impl GraphAsset {
    /// An asset with no template.
    pub fn new(graph: Graph) -> Self {
        Self {
            graph: Rc::new(graph),
            template: None,
        }
    }

    /// Attach the template used to instantiate the graph.
    pub fn with_template(mut self, template: ReactionTemplate) -> Self {
        self.template = Some(template);
        self
    }

    /// The static graph.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// The template, if one is attached.
    pub fn template(&self) -> Option<&ReactionTemplate> {
        self.template.as_ref()
    }
}
