//! Blackboards - named variable descriptors owned by a state machine.

mod value;

pub use value::*;

use serde::{Deserialize, Serialize};

/// One declared variable: a name, its type and the value it starts with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlackboardItem {
    pub name: String,
    pub kind: VariableType,
    pub default: VariableValue,
}

impl BlackboardItem {
    /// Declare a variable; the type is taken from the default value.
    pub fn new(name: impl Into<String>, default: impl Into<VariableValue>) -> Self {
        let default = default.into();
        Self {
            name: name.into(),
            kind: default.kind(),
            default,
        }
    }

    /// Declare a variable holding the zero value of `kind`.
    pub fn of_type(name: impl Into<String>, kind: VariableType) -> Self {
        Self {
            name: name.into(),
            kind,
            default: kind.default_value(),
        }
    }

    /// Whether the default value agrees with the declared type.
    pub fn is_well_typed(&self) -> bool {
        self.default.kind() == self.kind
    }
}

/// The variables declared on one state machine.
///
/// Items are kept in declaration order. Names are not required to be unique
/// across nested state machines; aggregation keeps every declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Blackboard {
    items: Vec<BlackboardItem>,
}

impl Blackboard {
    /// Create an empty blackboard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with_item(mut self, item: BlackboardItem) -> Self {
        self.insert(item);
        self
    }

    /// Add an item. A second item with the same name replaces the first.
    pub fn insert(&mut self, item: BlackboardItem) {
        if let Some(existing) = self.items.iter_mut().find(|i| i.name == item.name) {
            *existing = item;
        } else {
            self.items.push(item);
        }
    }

    /// Remove an item by name.
    pub fn remove(&mut self, name: &str) -> Option<BlackboardItem> {
        let index = self.items.iter().position(|i| i.name == name)?;
        Some(self.items.remove(index))
    }

    /// Look up an item by name.
    pub fn get(&self, name: &str) -> Option<&BlackboardItem> {
        self.items.iter().find(|i| i.name == name)
    }

    /// Items in declaration order.
    pub fn items(&self) -> &[BlackboardItem] {
        &self.items
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the blackboard has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
