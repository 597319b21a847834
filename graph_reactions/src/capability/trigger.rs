//! Triggers and igniters.
//!
//! A [`Trigger`] is bound to a trigger-state node. Igniters are the sources
//! that fire it (a collider overlap, a timer, a message); each one is a
//! component of its own, owned by the trigger it feeds.

use std::any::Any;

use behavior_graph::GraphId;

use super::{Reaction, ReactionKind};
use crate::registry::ComponentKey;

/// Component bound to a trigger-state node.
#[derive(Debug)]
pub struct Trigger {
    /// A disabled trigger ignores ignition.
    pub enabled: bool,
    igniters: Vec<ComponentKey>,
}

impl Trigger {
    /// An enabled trigger with no igniters.
    pub fn new() -> Self {
        Self {
            enabled: true,
            igniters: Vec::new(),
        }
    }

    /// Keys of the igniters feeding this trigger.
    pub fn igniters(&self) -> &[ComponentKey] {
        &self.igniters
    }

    pub(crate) fn add_igniter(&mut self, key: ComponentKey) {
        if !self.igniters.contains(&key) {
            self.igniters.push(key);
        }
    }
}

impl Default for Trigger {
    fn default() -> Self {
        Self::new()
    }
}

impl Reaction for Trigger {
    fn kind(&self) -> ReactionKind {
        ReactionKind::Trigger
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn owned_components(&self) -> &[ComponentKey] {
        &self.igniters
    }
}

/// An ignition source attached to a trigger.
#[derive(Debug)]
pub struct Igniter {
    pub enabled: bool,

    /// Optional label so game code can tell its igniters apart.
    pub label: String,

    trigger: GraphId,
    fired: u32,
}

impl Igniter {
    /// An enabled igniter not yet attached to a trigger.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            enabled: true,
            label: label.into(),
            trigger: GraphId::UNASSIGNED,
            fired: 0,
        }
    }

    /// Id of the trigger-state node this igniter feeds.
    pub fn trigger(&self) -> GraphId {
        self.trigger
    }

    /// How many times this igniter has fired.
    pub fn fired(&self) -> u32 {
        self.fired
    }

    pub(crate) fn bind(&mut self, trigger: GraphId) {
        self.trigger = trigger;
    }

    /// Record a firing. Returns the trigger to ignite, or `None` when the
    /// igniter is disabled or unbound.
    pub(crate) fn fire(&mut self) -> Option<GraphId> {
        if !self.enabled || !self.trigger.is_assigned() {
            return None;
        }
        self.fired += 1;
        Some(self.trigger)
    }
}

impl Default for Igniter {
    fn default() -> Self {
        Self::new("igniter")
    }
}

impl Reaction for Igniter {
    fn kind(&self) -> ReactionKind {
        ReactionKind::Igniter
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
