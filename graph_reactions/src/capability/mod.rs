//! Executable components a reaction instance can host.
//!
//! The engine never looks inside actions or conditions. It only needs the
//! container shapes defined here: an [`ActionList`] it can run and stop, a
//! [`ConditionList`] it can check, and [`Trigger`]s with their igniters.
//! Concrete [`Action`] and [`Condition`] implementations come from game code.

mod trigger;

pub use trigger::*;

use std::any::Any;

use behavior_graph::EntityId;

use crate::registry::ComponentKey;

/// The entity a graph is being evaluated for.
#[derive(Debug, Clone, PartialEq)]
pub struct Invoker {
    pub entity: EntityId,
    pub name: String,
}

impl Invoker {
    /// An invoker for a fresh entity.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            entity: EntityId::new(),
            name: name.into(),
        }
    }
}

impl Default for Invoker {
    fn default() -> Self {
        Self::new("invoker")
    }
}

/// Which capability a component provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReactionKind {
    Actions,
    Conditions,
    Trigger,
    Igniter,
    /// Anything game code attaches that the sweep should still track.
    Custom,
}

/// A component that can live in a [`ReactionRegistry`](crate::ReactionRegistry).
///
/// Lookups are by exact concrete type, so implementations only need to hand
/// out `Any` views of themselves.
pub trait Reaction: Any {
    fn kind(&self) -> ReactionKind;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Concrete type name, for log messages.
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Components this one owns and keeps alive (a trigger's igniters).
    fn owned_components(&self) -> &[ComponentKey] {
        &[]
    }

    /// Called once when the registry drops the component.
    fn release(&mut self) {}
}

/// One executable step, provided by game code.
pub trait Action {
    fn run(&mut self, invoker: &Invoker);

    fn stop(&mut self) {}
}

/// One boolean check, provided by game code.
pub trait Condition {
    fn check(&mut self, invoker: &Invoker) -> bool;
}

/// Ordered actions run when a state is entered.
#[derive(Default)]
pub struct ActionList {
    pub actions: Vec<Box<dyn Action>>,
    running: bool,
}

impl ActionList {
    /// An empty, stopped list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an action, builder style.
    pub fn with_action(mut self, action: impl Action + 'static) -> Self {
        self.actions.push(Box::new(action));
        self
    }

    /// Add an action.
    pub fn push(&mut self, action: impl Action + 'static) {
        self.actions.push(Box::new(action));
    }

    /// Run every action in order.
    pub fn run(&mut self, invoker: &Invoker) {
        self.running = true;
        for action in &mut self.actions {
            action.run(invoker);
        }
    }

    /// Stop every action. Does nothing if the list is not running.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        for action in &mut self.actions {
            action.stop();
        }
    }

    /// Whether the list has run and not been stopped since.
    pub fn is_running(&self) -> bool {
        self.running
    }
}

impl std::fmt::Debug for ActionList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionList")
            .field("actions", &self.actions.len())
            .field("running", &self.running)
            .finish()
    }
}

impl Reaction for ActionList {
    fn kind(&self) -> ReactionKind {
        ReactionKind::Actions
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn release(&mut self) {
        self.stop();
    }
}

/// Conditions gating a transition. Passes when every condition passes.
#[derive(Default)]
pub struct ConditionList {
    pub conditions: Vec<Box<dyn Condition>>,
}

impl ConditionList {
    /// An empty list, which always passes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a condition, builder style.
    pub fn with_condition(mut self, condition: impl Condition + 'static) -> Self {
        self.conditions.push(Box::new(condition));
        self
    }

    /// Add a condition.
    pub fn push(&mut self, condition: impl Condition + 'static) {
        self.conditions.push(Box::new(condition));
    }

    /// Check conditions in order, stopping at the first failure.
    /// An empty list passes.
    pub fn check(&mut self, invoker: &Invoker) -> bool {
        self.conditions.iter_mut().all(|c| c.check(invoker))
    }
}

impl std::fmt::Debug for ConditionList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConditionList")
            .field("conditions", &self.conditions.len())
            .finish()
    }
}

impl Reaction for ConditionList {
    fn kind(&self) -> ReactionKind {
        ReactionKind::Conditions
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl<F> Condition for F
where
    F: FnMut(&Invoker) -> bool,
{
    fn check(&mut self, invoker: &Invoker) -> bool {
        self(invoker)
    }
}
