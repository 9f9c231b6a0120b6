//! Selector composite: first succeeding child wins.

use crate::node::{BoxNode, Node};
use crate::status::{NodeState, Status};
use arbor_runtime::Blackboard;

/// Ticks children in order until one succeeds.
///
/// The mirror image of [`crate::nodes::Sequence`]: a child `Success`
/// succeeds the selector, `Failure` advances to the next child, `Running`
/// suspends with the progress index retained. All children failing yields
/// `Failure`. An empty selector fails immediately.
#[derive(Default)]
pub struct Selector {
    children: Vec<BoxNode>,
    current: usize,
    state: NodeState,
}

impl Selector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_child(&mut self, child: BoxNode) {
        self.children.push(child);
    }

    pub fn with_child(mut self, child: BoxNode) -> Self {
        self.add_child(child);
        self
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl Node for Selector {
    fn tick(&mut self, bb: &Blackboard) -> Status {
        if self.state == NodeState::Halted {
            return Status::Failure;
        }
        self.state = NodeState::Running;

        while self.current < self.children.len() {
            match self.children[self.current].tick(bb) {
                Status::Running => return Status::Running,
                Status::Success => {
                    self.reset();
                    return Status::Success;
                }
                _ => self.current += 1,
            }
        }
        self.reset();
        Status::Failure
    }

    fn reset(&mut self) {
        self.state = NodeState::Idle;
        let entered = (self.current + 1).min(self.children.len());
        for child in &mut self.children[..entered] {
            child.reset();
        }
        self.current = 0;
    }

    fn halt(&mut self) {
        self.state = NodeState::Halted;
        for child in &mut self.children {
            child.halt();
        }
    }

    fn state(&self) -> NodeState {
        self.state
    }
}
