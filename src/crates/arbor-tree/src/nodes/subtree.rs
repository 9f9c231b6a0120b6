//! Subtree reference: tick an externally-owned node through a handle.

use crate::node::{BoxNode, Node};
use crate::status::{NodeState, Status};
use arbor_runtime::Blackboard;
use parking_lot::Mutex;
use std::sync::Arc;

/// Shared handle to a swappable subtree root.
///
/// The tree's ownership model is single-owner; a subtree is the one
/// deliberate exception, modelled as an explicit handle rather than shared
/// node ownership. The handle may be empty, and the node it designates may
/// be swapped at runtime.
#[derive(Clone, Default)]
pub struct SubtreeHandle {
    inner: Arc<Mutex<Option<BoxNode>>>,
}

impl SubtreeHandle {
    pub fn new(root: BoxNode) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(root))),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Replace the designated subtree, returning the previous one.
    pub fn swap(&self, root: BoxNode) -> Option<BoxNode> {
        self.inner.lock().replace(root)
    }

    pub fn take(&self) -> Option<BoxNode> {
        self.inner.lock().take()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_none()
    }
}

/// Node that delegates to whatever the handle currently designates.
/// An empty handle fails the tick.
pub struct Subtree {
    handle: SubtreeHandle,
    state: NodeState,
}

impl Subtree {
    pub fn new(handle: SubtreeHandle) -> Self {
        Self {
            handle,
            state: NodeState::Idle,
        }
    }

    pub fn handle(&self) -> SubtreeHandle {
        self.handle.clone()
    }
}

impl Node for Subtree {
    fn tick(&mut self, bb: &Blackboard) -> Status {
        if self.state == NodeState::Halted {
            return Status::Failure;
        }
        let status = match self.handle.inner.lock().as_mut() {
            Some(root) => root.tick(bb),
            None => Status::Failure,
        };
        self.state = if status == Status::Running {
            NodeState::Running
        } else {
            NodeState::Idle
        };
        status
    }

    fn reset(&mut self) {
        self.state = NodeState::Idle;
        if let Some(root) = self.handle.inner.lock().as_mut() {
            root.reset();
        }
    }

    fn halt(&mut self) {
        self.state = NodeState::Halted;
        if let Some(root) = self.handle.inner.lock().as_mut() {
            root.halt();
        }
    }

    fn state(&self) -> NodeState {
        self.state
    }
}
