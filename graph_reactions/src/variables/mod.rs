//! Observable variable stores.
//!
//! A [`VariableStore`] is a cheap-to-clone handle. Its variables are shared
//! objects, so a controller can hold a reference to the very variable an
//! instance owns. Every write that should be seen goes through
//! [`VariableStore::set`], which notifies listeners after the value is
//! committed.

mod bridge;

pub use bridge::*;

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use behavior_graph::{BlackboardItem, VariableValue};

/// A named variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    value: VariableValue,
}

impl Variable {
    /// Current value.
    pub fn value(&self) -> &VariableValue {
        &self.value
    }
}

/// A variable shared between its store and anything bound to it.
pub type SharedVariable = Rc<RefCell<Variable>>;

/// Payload passed to change listeners.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableChange {
    pub name: String,
    pub value: VariableValue,
}

/// Handle returned by [`VariableStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Rc<dyn Fn(&VariableChange)>;

#[derive(Default)]
struct StoreInner {
    variables: Vec<SharedVariable>,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener: u64,
}

impl StoreInner {
    fn find(&self, name: &str) -> Option<&SharedVariable> {
        self.variables.iter().find(|v| v.borrow().name == name)
    }
}

/// Named variables plus change listeners.
#[derive(Clone, Default)]
pub struct VariableStore {
    inner: Rc<RefCell<StoreInner>>,
}

/// Non-owning handle to a [`VariableStore`].
#[derive(Clone, Default)]
pub struct WeakVariableStore {
    inner: Weak<RefCell<StoreInner>>,
}

impl WeakVariableStore {
    /// The store, if any handle to it is still alive.
    pub fn upgrade(&self) -> Option<VariableStore> {
        self.inner.upgrade().map(|inner| VariableStore { inner })
    }
}

impl VariableStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store seeded with blackboard defaults. The first declaration of a
    /// name wins.
    pub fn from_items<'a>(items: impl IntoIterator<Item = &'a BlackboardItem>) -> Self {
        let store = Self::new();
        for item in items {
            if !store.contains(&item.name) {
                store.declare(item.name.clone(), item.default.clone());
            }
        }
        store
    }

    /// Declare a variable. Declaring an existing name writes the new value
    /// through [`set`](Self::set), so listeners see it.
    pub fn declare(&self, name: impl Into<String>, value: impl Into<VariableValue>) -> SharedVariable {
        let name = name.into();
        let value = value.into();
        if let Some(existing) = self.variable(&name) {
            self.set(&name, value);
            return existing;
        }
        let variable = Rc::new(RefCell::new(Variable { name, value }));
        self.inner.borrow_mut().variables.push(variable.clone());
        variable
    }

    /// Current value of a variable.
    pub fn get(&self, name: &str) -> Option<VariableValue> {
        self.inner
            .borrow()
            .find(name)
            .map(|v| v.borrow().value.clone())
    }

    /// The shared variable object itself.
    pub fn variable(&self, name: &str) -> Option<SharedVariable> {
        self.inner.borrow().find(name).cloned()
    }

    /// Whether a variable with this name is declared.
    pub fn contains(&self, name: &str) -> bool {
        self.inner.borrow().find(name).is_some()
    }

    /// Variable names in declaration order.
    pub fn names(&self) -> Vec<String> {
        self.inner
            .borrow()
            .variables
            .iter()
            .map(|v| v.borrow().name.clone())
            .collect()
    }

    /// Number of declared variables.
    pub fn len(&self) -> usize {
        self.inner.borrow().variables.len()
    }

    /// Whether no variable is declared.
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().variables.is_empty()
    }

    /// Write a value and notify listeners. Returns `false` for an unknown name.
    pub fn set(&self, name: &str, value: impl Into<VariableValue>) -> bool {
        if !self.write_quiet(name, value) {
            tracing::warn!(variable = name, "write to undeclared variable ignored");
            return false;
        }
        self.notify(name);
        true
    }

    /// Write a value without notifying anyone.
    pub(crate) fn write_quiet(&self, name: &str, value: impl Into<VariableValue>) -> bool {
        let inner = self.inner.borrow();
        match inner.find(name) {
            Some(variable) => {
                variable.borrow_mut().value = value.into();
                true
            }
            None => false,
        }
    }

    /// Tell listeners the current value of `name`.
    ///
    /// Listeners run after every borrow of the store is released, so they
    /// may read and write this store freely.
    pub fn notify(&self, name: &str) {
        let (change, listeners) = {
            let inner = self.inner.borrow();
            let Some(variable) = inner.find(name) else {
                return;
            };
            let change = VariableChange {
                name: name.to_string(),
                value: variable.borrow().value.clone(),
            };
            let listeners: Vec<Listener> = inner.listeners.iter().map(|(_, l)| l.clone()).collect();
            (change, listeners)
        };

        for listener in listeners {
            listener(&change);
        }
    }

    /// Register a change listener.
    pub fn subscribe(&self, listener: impl Fn(&VariableChange) + 'static) -> ListenerId {
        let mut inner = self.inner.borrow_mut();
        inner.next_listener += 1;
        let id = ListenerId(inner.next_listener);
        inner.listeners.push((id, Rc::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let before = inner.listeners.len();
        inner.listeners.retain(|(l, _)| *l != id);
        inner.listeners.len() != before
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }

    /// A handle that does not keep the store alive.
    pub fn downgrade(&self) -> WeakVariableStore {
        WeakVariableStore {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Whether two handles point at the same store.
    pub fn ptr_eq(&self, other: &VariableStore) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for VariableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        let mut map = f.debug_map();
        for variable in &inner.variables {
            let variable = variable.borrow();
            map.entry(&variable.name, &variable.value);
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_declare_and_get() {
        let store = VariableStore::new();
        store.declare("health", 10i64);

        assert_eq!(store.get("health"), Some(VariableValue::Int(10)));
        assert_eq!(store.get("missing"), None);
        assert_eq!(store.names(), vec!["health".to_string()]);
    }

    #[test]
    fn test_set_notifies_after_commit() {
        let store = VariableStore::new();
        store.declare("open", false);

        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        let reader = store.clone();
        store.subscribe(move |change| {
            // The store is readable from inside a listener.
            log.borrow_mut().push((change.value.clone(), reader.get(&change.name)));
        });

        assert!(store.set("open", true));
        assert_eq!(
            *seen.borrow(),
            vec![(VariableValue::Bool(true), Some(VariableValue::Bool(true)))]
        );
    }

    #[test]
    fn test_set_unknown_variable() {
        let store = VariableStore::new();
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        store.subscribe(move |_| counter.set(counter.get() + 1));

        assert!(!store.set("ghost", 1i64));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_write_quiet_does_not_notify() {
        let store = VariableStore::new();
        store.declare("x", 0i64);
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        store.subscribe(move |_| counter.set(counter.get() + 1));

        store.write_quiet("x", 5i64);

        assert_eq!(calls.get(), 0);
        assert_eq!(store.get("x"), Some(VariableValue::Int(5)));
    }

    #[test]
    fn test_shared_variable_object() {
        let store = VariableStore::new();
        let variable = store.declare("name", "guard");

        store.set("name", "captain");

        assert_eq!(variable.borrow().value(), &VariableValue::from("captain"));
        assert!(Rc::ptr_eq(&variable, &store.variable("name").unwrap()));
    }

    #[test]
    fn test_redeclare_notifies() {
        let store = VariableStore::new();
        let first = store.declare("ammo", 3i64);
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        store.subscribe(move |_| counter.set(counter.get() + 1));

        let second = store.declare("ammo", 8i64);

        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("ammo"), Some(VariableValue::Int(8)));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_unsubscribe() {
        let store = VariableStore::new();
        let id = store.subscribe(|_| {});

        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn test_from_items_first_declaration_wins() {
        let items = [
            BlackboardItem::new("target", "none"),
            BlackboardItem::new("target", "player"),
            BlackboardItem::new("ammo", 3i64),
        ];
        let store = VariableStore::from_items(items.iter());

        assert_eq!(store.len(), 2);
        assert_eq!(store.get("target"), Some(VariableValue::from("none")));
    }

    #[test]
    fn test_weak_handle() {
        let store = VariableStore::new();
        let weak = store.downgrade();
        assert!(weak.upgrade().unwrap().ptr_eq(&store));

        drop(store);
        assert!(weak.upgrade().is_none());
    }
}
