//! Reaction registry - the id-keyed component container of a reaction instance.
//!
//! Components are attached to the registry (the `components` table) and
//! indexed by the node or transition id they serve (the `entries` table).
//! The graph is the source of truth: anything attached that the graph no
//! longer reaches is garbage, and [`ReactionRegistry::cleanup`] collects it.

use std::collections::{HashMap, HashSet};

use behavior_graph::{Graph, GraphId, Node, Transition};

use crate::capability::{Igniter, Reaction, Trigger};

/// Handle of an attached component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentKey(u64);

impl std::fmt::Display for ComponentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "component#{}", self.0)
    }
}

/// What one [`ReactionRegistry::cleanup`] pass removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Entries whose component had already been destroyed.
    pub dangling_entries: usize,
    /// Attached components the graph no longer reaches.
    pub orphan_components: usize,
    /// Entries dropped together with those components.
    pub orphan_entries: usize,
}

impl SweepReport {
    /// Whether the pass found nothing to remove.
    pub fn is_clean(&self) -> bool {
        self.dangling_entries == 0 && self.orphan_components == 0 && self.orphan_entries == 0
    }
}

/// Maps node and transition ids to one executable component each.
#[derive(Default)]
pub struct ReactionRegistry {
    next_key: u64,
    components: HashMap<ComponentKey, Box<dyn Reaction>>,
    entries: HashMap<GraphId, ComponentKey>,
}

impl ReactionRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reaction bound to `node`, created on first access.
    ///
    /// Returns `None` for unassigned ids, and when the bound component is of
    /// a different type than `T` (logged, never an error).
    pub fn get_reaction<T: Reaction + Default>(&mut self, node: &Node) -> Option<&mut T> {
        self.get_or_create(node.id.graph_id())
    }

    /// Condition component bound to `transition`, created on first access.
    pub fn get_condition<T: Reaction + Default>(&mut self, transition: &Transition) -> Option<&mut T> {
        self.get_or_create(transition.id.graph_id())
    }

    fn get_or_create<T: Reaction + Default>(&mut self, id: GraphId) -> Option<&mut T> {
        if !id.is_assigned() {
            return None;
        }

        let key = match self.entries.get(&id) {
            Some(key) => *key,
            None => {
                let key = self.attach(Box::new(T::default()));
                self.entries.insert(id, key);
                tracing::debug!(%id, component = std::any::type_name::<T>(), "created reaction");
                key
            }
        };

        let Some(component) = self.components.get_mut(&key).map(|c| c.as_mut()) else {
            tracing::warn!(%id, %key, "bound component was destroyed; awaiting cleanup");
            return None;
        };

        let found = component.type_name();
        let typed = component.as_any_mut().downcast_mut::<T>();
        if typed.is_none() {
            tracing::warn!(
                %id,
                expected = std::any::type_name::<T>(),
                found,
                "reaction type mismatch, treating as unbound"
            );
        }
        typed
    }

    /// Existing component bound to `id`, without creating one.
    pub fn find<T: Reaction>(&self, id: impl Into<GraphId>) -> Option<&T> {
        let key = self.entries.get(&id.into())?;
        self.components.get(key)?.as_any().downcast_ref::<T>()
    }

    /// Mutable form of [`find`](Self::find).
    pub fn find_mut<T: Reaction>(&mut self, id: impl Into<GraphId>) -> Option<&mut T> {
        let key = self.entries.get(&id.into())?;
        self.components.get_mut(key)?.as_any_mut().downcast_mut::<T>()
    }

    /// Whether a component is bound to the node.
    pub fn has_reaction(&self, node: &Node) -> bool {
        self.contains(node.id.graph_id())
    }

    /// Whether a component is bound to the transition.
    pub fn has_conditions(&self, transition: &Transition) -> bool {
        self.contains(transition.id.graph_id())
    }

    /// Whether any entry exists for `id`.
    pub fn contains(&self, id: GraphId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Bind an already-built component to `id`.
    ///
    /// Rejects unassigned ids and ids that are already bound.
    pub fn register(&mut self, id: GraphId, component: Box<dyn Reaction>) -> Option<ComponentKey> {
        if !id.is_assigned() {
            tracing::warn!(%id, "refusing to bind a reaction to an unassigned id");
            return None;
        }
        if let Some(existing) = self.entries.get(&id) {
            tracing::warn!(%id, %existing, "duplicate reaction registration rejected");
            return None;
        }

        let key = self.attach(component);
        self.entries.insert(id, key);
        Some(key)
    }

    /// Remove and release the reaction bound to `node`.
    pub fn remove_reaction(&mut self, node: &Node) -> bool {
        self.remove(node.id.graph_id())
    }

    /// Remove and release the condition component bound to `transition`.
    pub fn remove_condition(&mut self, transition: &Transition) -> bool {
        self.remove(transition.id.graph_id())
    }

    /// Remove the entry for `id` and release its component and everything
    /// the component owns. No-op if nothing is bound.
    pub fn remove(&mut self, id: GraphId) -> bool {
        let Some(key) = self.entries.remove(&id) else {
            return false;
        };
        self.release(key);
        true
    }

    /// Attach an igniter to the trigger bound to `trigger_node`, creating the
    /// trigger if needed.
    pub fn attach_igniter(&mut self, trigger_node: &Node, mut igniter: Igniter) -> Option<ComponentKey> {
        let id = trigger_node.id.graph_id();
        self.get_reaction::<Trigger>(trigger_node)?;

        igniter.bind(id);
        let key = self.attach(Box::new(igniter));
        if let Some(trigger) = self.find_mut::<Trigger>(id) {
            trigger.add_igniter(key);
        }
        Some(key)
    }

    /// Igniter attached under `key`.
    pub fn igniter_mut(&mut self, key: ComponentKey) -> Option<&mut Igniter> {
        self.components.get_mut(&key)?.as_any_mut().downcast_mut::<Igniter>()
    }

    /// Destroy a component without touching the entries that point at it,
    /// the way an external owner tearing it down would.
    pub fn destroy_component(&mut self, key: ComponentKey) -> bool {
        match self.components.remove(&key) {
            Some(mut component) => {
                component.release();
                true
            }
            None => false,
        }
    }

    /// Key of the component bound to `id`.
    pub fn key_of(&self, id: GraphId) -> Option<ComponentKey> {
        self.entries.get(&id).copied()
    }

    /// Component by key, bound or not.
    pub fn component(&self, key: ComponentKey) -> Option<&dyn Reaction> {
        self.components.get(&key).map(|c| c.as_ref())
    }

    /// Number of bound ids.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no id is bound.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of attached components, bound or not.
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Bound ids in no particular order.
    pub fn ids(&self) -> impl Iterator<Item = GraphId> + '_ {
        self.entries.keys().copied()
    }

    /// Garbage-collect the registry against `graph`.
    ///
    /// First drops entries whose component has been destroyed. Then releases
    /// every attached component that is not reachable by walking the graph
    /// (node reactions, transition conditions, and the igniters their
    /// triggers own), together with the entries pointing at it.
    ///
    /// Without a graph nothing is considered unreachable. Running the sweep
    /// twice in a row removes nothing the second time.
    pub fn cleanup(&mut self, graph: Option<&Graph>) -> SweepReport {
        let mut report = SweepReport::default();

        let components = &self.components;
        let before = self.entries.len();
        self.entries.retain(|id, key| {
            let alive = components.contains_key(key);
            if !alive {
                tracing::debug!(%id, %key, "dropping entry for destroyed component");
            }
            alive
        });
        report.dangling_entries = before - self.entries.len();

        let Some(graph) = graph else {
            return report;
        };

        let reachable = self.reachable(graph);
        let orphans: HashSet<ComponentKey> = self
            .components
            .keys()
            .filter(|key| !reachable.contains(key))
            .copied()
            .collect();

        for key in &orphans {
            if let Some(mut component) = self.components.remove(key) {
                tracing::debug!(%key, component = component.type_name(), "releasing orphan");
                component.release();
            }
        }
        report.orphan_components = orphans.len();

        let before = self.entries.len();
        self.entries.retain(|_, key| !orphans.contains(key));
        report.orphan_entries = before - self.entries.len();

        if !report.is_clean() {
            tracing::debug!(?report, graph = graph.name(), "reaction sweep finished");
        }
        report
    }

    fn reachable(&self, graph: &Graph) -> HashSet<ComponentKey> {
        let mut reachable = HashSet::new();
        let root = graph.root();

        for node_id in std::iter::once(root).chain(graph.nodes_recursive(root)) {
            let Some(node) = graph.node(node_id) else {
                continue;
            };
            self.mark(node.id.graph_id(), &mut reachable);
            for transition in &node.transitions {
                if graph.contains_transition(*transition) {
                    self.mark(transition.graph_id(), &mut reachable);
                }
            }
        }
        reachable
    }

    fn mark(&self, id: GraphId, reachable: &mut HashSet<ComponentKey>) {
        let Some(key) = self.entries.get(&id) else {
            return;
        };
        reachable.insert(*key);
        if let Some(component) = self.components.get(key) {
            reachable.extend(component.owned_components().iter().copied());
        }
    }

    fn attach(&mut self, component: Box<dyn Reaction>) -> ComponentKey {
        self.next_key += 1;
        let key = ComponentKey(self.next_key);
        self.components.insert(key, component);
        key
    }

    fn release(&mut self, key: ComponentKey) {
        let Some(mut component) = self.components.remove(&key) else {
            return;
        };
        let owned = component.owned_components().to_vec();
        component.release();
        for child in owned {
            if let Some(mut child) = self.components.remove(&child) {
                child.release();
            }
        }
    }
}

impl std::fmt::Debug for ReactionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReactionRegistry")
            .field("entries", &self.entries.len())
            .field("components", &self.components.len())
            .finish()
    }
}
