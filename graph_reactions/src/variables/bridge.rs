//! Bridge between a controller's variables and its reaction instance's.
//!
//! Binding does two things. Controller slots ([`VariableRef`]) whose name
//! matches an instance variable are re-pointed at that variable object, so
//! both sides read the same value. And the first time a name is paired, two
//! listeners are installed that mirror writes from either store into the
//! other. Each listener only writes when the destination differs from the
//! new value, which is what stops a mirrored write from bouncing back.

use std::collections::HashMap;

use behavior_graph::VariableValue;

use super::{ListenerId, SharedVariable, VariableChange, VariableStore, WeakVariableStore};

/// A controller-side variable slot.
///
/// Unbound, it holds a cached value. Bound, it shares the instance's
/// variable object.
#[derive(Debug, Clone)]
pub struct VariableRef {
    pub name: String,
    cached: Option<VariableValue>,
    target: Option<SharedVariable>,
}

impl VariableRef {
    /// An unbound slot with no cached value.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cached: None,
            target: None,
        }
    }

    /// A slot carrying a value to push into the instance when first bound.
    pub fn with_value(name: impl Into<String>, value: impl Into<VariableValue>) -> Self {
        Self {
            name: name.into(),
            cached: Some(value.into()),
            target: None,
        }
    }

    /// Whether the slot shares an instance variable.
    pub fn is_bound(&self) -> bool {
        self.target.is_some()
    }

    /// The instance variable this slot points at, once bound.
    pub fn target(&self) -> Option<&SharedVariable> {
        self.target.as_ref()
    }

    /// Drop the binding, keeping the last bound value as the cached one.
    pub fn unbind(&mut self) {
        if let Some(target) = self.target.take() {
            self.cached = Some(target.borrow().value().clone());
        }
    }

    /// Bound value, or the cached one before binding.
    pub fn value(&self) -> Option<VariableValue> {
        match &self.target {
            Some(target) => Some(target.borrow().value().clone()),
            None => self.cached.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Pairing {
    controller_listener: ListenerId,
    reaction_listener: ListenerId,
}

/// Tracks which variable names already have mirroring listeners.
#[derive(Debug, Default)]
pub struct VariableBridge {
    pairings: HashMap<String, Pairing>,
}

impl VariableBridge {
    /// A bridge with no pairings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `slots` against the instance store and pair the two stores.
    ///
    /// Slots with no matching instance variable are left alone. Safe to call
    /// repeatedly: listeners are only installed for names seen the first
    /// time. Returns the number of slots bound by this call.
    pub fn bind(
        &mut self,
        slots: &mut [VariableRef],
        controller: &VariableStore,
        reaction: &VariableStore,
    ) -> usize {
        let mut bound = 0;

        for slot in slots.iter_mut() {
            let Some(shared) = reaction.variable(&slot.name) else {
                tracing::trace!(variable = %slot.name, "no instance variable to bind");
                continue;
            };
            let name = slot.name.clone();
            slot.target = Some(shared);
            bound += 1;

            let seed = slot.cached.take().or_else(|| controller.get(&name));
            if let Some(value) = seed {
                if reaction.get(&name).as_ref() != Some(&value) {
                    reaction.set(&name, value);
                }
            }

            if let Some(current) = reaction.get(&name) {
                if !controller.contains(&name) {
                    controller.declare(name.clone(), current);
                } else if controller.get(&name).as_ref() != Some(&current) {
                    controller.write_quiet(&name, current);
                }
            }

            if !self.pairings.contains_key(&name) {
                let pairing = Pairing {
                    reaction_listener: reaction.subscribe(mirror(name.clone(), controller.downgrade())),
                    controller_listener: controller.subscribe(mirror(name.clone(), reaction.downgrade())),
                };
                tracing::debug!(variable = %name, "paired controller and instance variable");
                self.pairings.insert(name, pairing);
            }
        }

        bound
    }

    /// Remove every mirroring listener from both stores.
    pub fn unbind_all(&mut self, controller: &VariableStore, reaction: &VariableStore) {
        for (_, pairing) in self.pairings.drain() {
            controller.unsubscribe(pairing.controller_listener);
            reaction.unsubscribe(pairing.reaction_listener);
        }
    }

    /// Whether mirroring listeners exist for `name`.
    pub fn is_paired(&self, name: &str) -> bool {
        self.pairings.contains_key(name)
    }

    /// Number of paired names.
    pub fn len(&self) -> usize {
        self.pairings.len()
    }

    /// Whether nothing is paired.
    pub fn is_empty(&self) -> bool {
        self.pairings.is_empty()
    }
}

/// Listener copying changes of `name` into `destination`, guarded by equality.
fn mirror(name: String, destination: WeakVariableStore) -> impl Fn(&VariableChange) {
    move |change| {
        if change.name != name {
            return;
        }
        let Some(destination) = destination.upgrade() else {
            return;
        };
        if destination.get(&name).as_ref() == Some(&change.value) {
            return;
        }
        if destination.write_quiet(&name, change.value.clone()) {
            tracing::trace!(variable = %name, value = %change.value, "mirrored variable");
            destination.notify(&name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn counter(store: &VariableStore, name: &'static str) -> Rc<Cell<u32>> {
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        store.subscribe(move |change| {
            if change.name == name {
                c.set(c.get() + 1);
            }
        });
        count
    }

    #[test]
    fn test_bind_shares_variable_object() {
        let controller = VariableStore::new();
        let reaction = VariableStore::new();
        reaction.declare("alerted", false);
        let mut slots = vec![VariableRef::new("alerted"), VariableRef::new("unknown")];
        let mut bridge = VariableBridge::new();

        let bound = bridge.bind(&mut slots, &controller, &reaction);

        assert_eq!(bound, 1);
        assert!(slots[0].is_bound());
        assert!(!slots[1].is_bound());
        assert!(Rc::ptr_eq(
            slots[0].target().unwrap(),
            &reaction.variable("alerted").unwrap()
        ));

        reaction.set("alerted", true);
        assert_eq!(slots[0].value(), Some(VariableValue::Bool(true)));
    }

    #[test]
    fn test_cached_value_written_once() {
        let controller = VariableStore::new();
        let reaction = VariableStore::new();
        reaction.declare("hp", 10i64);
        let mut slots = vec![VariableRef::with_value("hp", 25i64)];
        let mut bridge = VariableBridge::new();

        bridge.bind(&mut slots, &controller, &reaction);
        assert_eq!(reaction.get("hp"), Some(VariableValue::Int(25)));
        assert_eq!(controller.get("hp"), Some(VariableValue::Int(25)));

        reaction.set("hp", 7i64);
        bridge.bind(&mut slots, &controller, &reaction);
        assert_eq!(reaction.get("hp"), Some(VariableValue::Int(7)));
    }

    #[test]
    fn test_sync_both_directions() {
        let controller = VariableStore::new();
        let reaction = VariableStore::new();
        reaction.declare("state", "idle");
        let mut slots = vec![VariableRef::new("state")];
        let mut bridge = VariableBridge::new();
        bridge.bind(&mut slots, &controller, &reaction);

        controller.set("state", "chase");
        assert_eq!(reaction.get("state"), Some(VariableValue::from("chase")));

        reaction.set("state", "flee");
        assert_eq!(controller.get("state"), Some(VariableValue::from("flee")));
    }

    #[test]
    fn test_sync_loop_terminates() {
        let controller = VariableStore::new();
        let reaction = VariableStore::new();
        controller.declare("v", 1i64);
        reaction.declare("v", 1i64);
        let mut slots = vec![VariableRef::new("v")];
        let mut bridge = VariableBridge::new();
        bridge.bind(&mut slots, &controller, &reaction);

        let controller_changes = counter(&controller, "v");
        let reaction_changes = counter(&reaction, "v");

        controller.set("v", 2i64);

        assert_eq!(reaction.get("v"), Some(VariableValue::Int(2)));
        assert_eq!(controller_changes.get(), 1);
        assert_eq!(reaction_changes.get(), 1);
    }

    #[test]
    fn test_rebind_does_not_stack_listeners() {
        let controller = VariableStore::new();
        let reaction = VariableStore::new();
        reaction.declare("v", 0i64);
        let mut slots = vec![VariableRef::new("v")];
        let mut bridge = VariableBridge::new();

        bridge.bind(&mut slots, &controller, &reaction);
        bridge.bind(&mut slots, &controller, &reaction);
        bridge.bind(&mut slots, &controller, &reaction);

        assert_eq!(bridge.len(), 1);
        assert_eq!(controller.listener_count(), 1);
        assert_eq!(reaction.listener_count(), 1);
    }

    #[test]
    fn test_unbind_all() {
        let controller = VariableStore::new();
        let reaction = VariableStore::new();
        reaction.declare("v", 0i64);
        let mut slots = vec![VariableRef::new("v")];
        let mut bridge = VariableBridge::new();
        bridge.bind(&mut slots, &controller, &reaction);

        bridge.unbind_all(&controller, &reaction);
        controller.set("v", 9i64);

        assert!(bridge.is_empty());
        assert!(!bridge.is_paired("v"));
        assert_eq!(reaction.get("v"), Some(VariableValue::Int(0)));
    }

    #[test]
    fn test_unbind_keeps_last_value() {
        let controller = VariableStore::new();
        let reaction = VariableStore::new();
        reaction.declare("v", 3i64);
        let mut slots = vec![VariableRef::new("v")];
        VariableBridge::new().bind(&mut slots, &controller, &reaction);

        slots[0].unbind();
        reaction.set("v", 4i64);

        assert!(!slots[0].is_bound());
        assert!(slots[0].target().is_none());
        assert_eq!(slots[0].value(), Some(VariableValue::Int(3)));
    }
}
