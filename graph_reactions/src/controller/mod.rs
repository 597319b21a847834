//! Graph controller - the handle game code holds for one entity's graph.
//!
//! The controller owns the asset, the reaction instance built from it, and
//! the controller-side variables. [`GraphController::execute`] brings the
//! graph to life; after that the host drives it with `tick` and `ignite`.

mod config;

pub use config::*;

use std::rc::Rc;

use behavior_graph::{Graph, NodeId, VariableValue};

use crate::capability::{ActionList, Invoker};
use crate::instance::{ColliderHandle, GraphAsset, ListVariable, ReactionInstance};
use crate::registry::{ComponentKey, SweepReport};
use crate::runtime;
use crate::variables::{VariableBridge, VariableRef, VariableStore};

/// Lifecycle of a [`GraphController`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControllerState {
    /// No instance yet.
    #[default]
    Uninitialized,
    /// Instance built and variables bound, root not entered.
    Bound,
    /// Root entered; the graph is live.
    Running,
}

/// Drives one graph for one invoker.
#[derive(Debug)]
pub struct GraphController {
    invoker: Invoker,
    asset: Option<GraphAsset>,
    config: RuntimeConfig,
    state: ControllerState,
    instance: Option<ReactionInstance>,
    variables: VariableStore,
    slots: Vec<VariableRef>,
    bridge: VariableBridge,
    list_variables: Vec<ListVariable>,
    collider: Option<ColliderHandle>,
}

impl GraphController {
    /// A controller with no asset and default config.
    pub fn new(invoker: Invoker) -> Self {
        Self {
            invoker,
            asset: None,
            config: RuntimeConfig::default(),
            state: ControllerState::Uninitialized,
            instance: None,
            variables: VariableStore::new(),
            slots: Vec::new(),
            bridge: VariableBridge::new(),
            list_variables: Vec::new(),
            collider: None,
        }
    }

    /// Builder form of [`set_asset`](Self::set_asset).
    pub fn with_asset(mut self, asset: GraphAsset) -> Self {
        self.set_asset(asset);
        self
    }

    /// Replace the runtime config.
    pub fn with_config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Swap the asset. Any existing instance is dropped along with its
    /// variable pairings, and every slot is unbound.
    pub fn set_asset(&mut self, asset: GraphAsset) {
        if let Some(instance) = self.instance.take() {
            self.bridge.unbind_all(&self.variables, instance.variables());
            tracing::debug!(instance = %instance.id(), "dropped reaction instance for new asset");
        }
        for slot in &mut self.slots {
            slot.unbind();
        }
        self.asset = Some(asset);
        self.state = ControllerState::Uninitialized;
    }

    /// Declare a controller variable and a slot binding it by name.
    /// Redeclaring a paired variable writes through to the instance.
    pub fn add_variable(&mut self, name: impl Into<String>, value: impl Into<VariableValue>) {
        let name = name.into();
        self.variables.declare(name.clone(), value);
        if !self.slots.iter().any(|s| s.name == name) {
            self.slots.push(VariableRef::new(name));
        }
    }

    /// Add a slot to bind on the next [`bind_variables`](Self::bind_variables).
    pub fn add_variable_ref(&mut self, slot: VariableRef) {
        self.slots.retain(|s| s.name != slot.name);
        self.slots.push(slot);
    }

    /// Slot for a controller variable, by name.
    pub fn variable_ref(&self, name: &str) -> Option<&VariableRef> {
        self.slots.iter().find(|s| s.name == name)
    }

    /// Add a list variable handed to the instance when it is built.
    pub fn add_list_variable(&mut self, list: ListVariable) {
        self.list_variables.retain(|l| l.name != list.name);
        self.list_variables.push(list);
    }

    /// Set the collider handed to the instance when it is built.
    pub fn set_collider(&mut self, collider: ColliderHandle) {
        self.collider = Some(collider);
    }

    /// Build the reaction instance if needed, bind variables, and enter the
    /// root state machine.
    ///
    /// Returns `false`, with a warning, when there is no asset or the asset
    /// has no template. Calling it again reuses the existing instance.
    pub fn execute(&mut self) -> bool {
        let Some(asset) = self.asset.as_ref() else {
            tracing::warn!(invoker = %self.invoker.name, "execute called without a graph asset");
            return false;
        };
        let Some(template) = asset.template() else {
            tracing::warn!(graph = asset.graph().name(), "graph asset has no reaction template");
            return false;
        };
        let graph = Rc::clone(&asset.graph);

        if self.instance.is_none() {
            let mut instance = template.instantiate(&graph);
            instance.extend_list_variables(self.list_variables.iter().cloned());
            instance.set_collider(self.collider);
            self.instance = Some(instance);
        }

        if self.config.bind_variables {
            self.bind_variables();
        }
        self.state = ControllerState::Bound;

        if self.config.sweep_on_execute {
            self.cleanup();
        }

        if self.config.enter_on_execute {
            if let Some(instance) = self.instance.as_mut() {
                runtime::on_enter(&graph, instance, graph.root(), &self.invoker);
            }
            self.state = ControllerState::Running;
        }

        tracing::debug!(graph = graph.name(), invoker = %self.invoker.name, state = ?self.state, "executed");
        true
    }

    /// Bind controller slots to the instance's variables. Returns how many
    /// slots were bound.
    pub fn bind_variables(&mut self) -> usize {
        let Some(instance) = self.instance.as_ref() else {
            tracing::warn!(invoker = %self.invoker.name, "no reaction instance to bind variables to");
            return 0;
        };
        let bound = self.bridge.bind(&mut self.slots, &self.variables, instance.variables());
        tracing::debug!(bound, paired = self.bridge.len(), "bound variables");
        bound
    }

    /// Enter the named node directly, bypassing transitions.
    pub fn execute_node(&mut self, name: &str) -> bool {
        let Some((graph, instance)) = runtime_parts(&self.asset, &mut self.instance, "execute_node") else {
            return false;
        };
        let Some(node) = graph.find_node_by_name(name) else {
            tracing::warn!(node = name, "no node with this name");
            return false;
        };
        runtime::on_enter(&graph, instance, node, &self.invoker);
        self.state = ControllerState::Running;
        true
    }

    /// Action list bound to the named node, created empty if none is bound.
    pub fn get_actions(&mut self, name: &str) -> Option<&mut ActionList> {
        let (graph, instance) = runtime_parts(&self.asset, &mut self.instance, "get_actions")?;
        let Some(node) = graph.find_node_by_name(name).and_then(|id| graph.node(id)) else {
            tracing::warn!(node = name, "no node with this name");
            return None;
        };
        instance.registry_mut().get_reaction::<ActionList>(node)
    }

    /// Stop the action list bound to the named node.
    pub fn stop_actions(&mut self, name: &str) -> bool {
        let Some((graph, instance)) = runtime_parts(&self.asset, &mut self.instance, "stop_actions") else {
            return false;
        };
        let Some(node) = graph.find_node_by_name(name) else {
            tracing::warn!(node = name, "no node with this name");
            return false;
        };
        match instance.registry_mut().find_mut::<ActionList>(node) {
            Some(actions) => {
                actions.stop();
                true
            }
            None => {
                tracing::debug!(node = name, "no action list to stop");
                false
            }
        }
    }

    /// Evaluate the active nodes once. Returns the nodes entered.
    pub fn tick(&mut self) -> Vec<NodeId> {
        let Some((graph, instance)) = runtime_parts(&self.asset, &mut self.instance, "tick") else {
            return Vec::new();
        };
        runtime::tick(&graph, instance, &self.invoker)
    }

    /// Ignite the named trigger state. Returns the nodes entered.
    pub fn ignite(&mut self, name: &str) -> Vec<NodeId> {
        let Some((graph, instance)) = runtime_parts(&self.asset, &mut self.instance, "ignite") else {
            return Vec::new();
        };
        let Some(node) = graph.find_node_by_name(name) else {
            tracing::warn!(node = name, "no node with this name");
            return Vec::new();
        };
        runtime::ignite(&graph, instance, node, &self.invoker)
    }

    /// Fire an igniter attached to the instance.
    pub fn ignite_igniter(&mut self, igniter: ComponentKey) -> Vec<NodeId> {
        let Some((graph, instance)) = runtime_parts(&self.asset, &mut self.instance, "ignite_igniter") else {
            return Vec::new();
        };
        runtime::ignite_igniter(&graph, instance, igniter, &self.invoker)
    }

    /// Sweep the instance's registry against the current graph.
    pub fn cleanup(&mut self) -> Option<SweepReport> {
        let instance = self.instance.as_mut()?;
        let graph = self.asset.as_ref().map(GraphAsset::graph);
        Some(instance.registry_mut().cleanup(graph))
    }

    /// Write a variable, controller side first, and let the bridge mirror it.
    pub fn set_variable(&self, name: &str, value: impl Into<VariableValue>) -> bool {
        if self.variables.contains(name) {
            return self.variables.set(name, value);
        }
        match &self.instance {
            Some(instance) if instance.variables().contains(name) => instance.variables().set(name, value),
            _ => {
                tracing::warn!(variable = name, "no such variable on the controller or its instance");
                false
            }
        }
    }

    /// Read a variable, controller side first.
    pub fn variable(&self, name: &str) -> Option<VariableValue> {
        self.variables
            .get(name)
            .or_else(|| self.instance.as_ref()?.variables().get(name))
    }

    /// Entered nodes, in the order they were entered.
    pub fn active_nodes(&self) -> Vec<NodeId> {
        match (&self.asset, &self.instance) {
            (Some(asset), Some(instance)) => runtime::active_nodes(asset.graph(), instance),
            _ => Vec::new(),
        }
    }

    /// Names of the entered nodes, in the order they were entered.
    pub fn active_node_names(&self) -> Vec<String> {
        let Some(graph) = self.graph() else {
            return Vec::new();
        };
        self.active_nodes()
            .into_iter()
            .filter_map(|id| graph.node(id))
            .map(|node| node.name.clone())
            .collect()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Who the graph runs for.
    pub fn invoker(&self) -> &Invoker {
        &self.invoker
    }

    /// Runtime config in use.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Current asset.
    pub fn asset(&self) -> Option<&GraphAsset> {
        self.asset.as_ref()
    }

    /// Graph of the current asset.
    pub fn graph(&self) -> Option<&Graph> {
        self.asset.as_ref().map(GraphAsset::graph)
    }

    /// Reaction instance, once executed.
    pub fn instance(&self) -> Option<&ReactionInstance> {
        self.instance.as_ref()
    }

    /// Mutable reaction instance, once executed.
    pub fn instance_mut(&mut self) -> Option<&mut ReactionInstance> {
        self.instance.as_mut()
    }

    /// Controller-side variables.
    pub fn variables(&self) -> &VariableStore {
        &self.variables
    }
}

impl Default for GraphController {
    fn default() -> Self {
        Self::new(Invoker::default())
    }
}

fn runtime_parts<'a>(
    asset: &Option<GraphAsset>,
    instance: &'a mut Option<ReactionInstance>,
    operation: &'static str,
) -> Option<(Rc<Graph>, &'a mut ReactionInstance)> {
    let Some(asset) = asset else {
        tracing::warn!(operation, "controller has no graph asset");
        return None;
    };
    let Some(instance) = instance.as_mut() else {
        tracing::warn!(operation, "controller has not been executed");
        return None;
    };
    Some((Rc::clone(&asset.graph), instance))
}
