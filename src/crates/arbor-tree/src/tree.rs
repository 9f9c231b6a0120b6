//! Tree: owns a root node, a blackboard, and an event bus.

use crate::node::{BoxNode, Node};
use crate::status::{NodeState, Status};
use arbor_runtime::{Blackboard, EventBus};
use std::sync::Arc;
use uuid::Uuid;

/// A tickable behaviour tree.
///
/// The tree owns its root exclusively and re-arms a halted root by
/// resetting it before the next tick, so callers can `halt()` and keep
/// ticking without manual bookkeeping.
pub struct Tree {
    id: Uuid,
    root: BoxNode,
    blackboard: Blackboard,
    events: Arc<EventBus>,
}

impl Tree {
    pub fn new(root: BoxNode) -> Self {
        Self {
            id: Uuid::new_v4(),
            root,
            blackboard: Blackboard::new(),
            events: Arc::new(EventBus::new()),
        }
    }

    /// Stable identity for this tree instance, used in trace output.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Run one cooperative pass over the tree.
    pub fn tick(&mut self) -> Status {
        if self.root.state() == NodeState::Halted {
            tracing::debug!(tree = %self.id, "re-arming halted root before tick");
            self.root.reset();
        }
        let status = self.root.tick(&self.blackboard);
        tracing::trace!(tree = %self.id, %status, "tree ticked");
        status
    }

    pub fn reset(&mut self) {
        self.root.reset();
    }

    pub fn halt(&mut self) {
        tracing::debug!(tree = %self.id, "halting tree");
        self.root.halt();
    }

    pub fn blackboard(&self) -> &Blackboard {
        &self.blackboard
    }

    /// The tree's event bus, shareable with leaves and outside observers.
    pub fn events(&self) -> Arc<EventBus> {
        Arc::clone(&self.events)
    }

    pub fn root(&self) -> &BoxNode {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut BoxNode {
        &mut self.root
    }
}
