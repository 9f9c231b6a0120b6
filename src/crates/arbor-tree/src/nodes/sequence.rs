//! Sequence composite: all children must succeed, in order.

use crate::node::{BoxNode, Node};
use crate::status::{NodeState, Status};
use arbor_runtime::Blackboard;

/// Ticks children in declaration order.
///
/// A child `Failure` fails the sequence and resets progress; `Running`
/// suspends it, remembering the progress index so a later tick resumes at
/// the same child without re-executing the ones that already passed. All
/// children succeeding yields `Success` and resets. An empty sequence
/// succeeds immediately.
#[derive(Default)]
pub struct Sequence {
    children: Vec<BoxNode>,
    current: usize,
    state: NodeState,
}

impl Sequence {
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

impl Node for Sequence {
    fn tick(&mut self, bb: &Blackboard) -> Status {
        if self.state == NodeState::Halted {
            return Status::Failure;
        }
        self.state = NodeState::Running;

        while self.current < self.children.len() {
            match self.children[self.current].tick(bb) {
                Status::Running => return Status::Running,
                Status::Failure => {
                    self.reset();
                    return Status::Failure;
                }
                _ => self.current += 1,
            }
        }
        self.reset();
        Status::Success
    }

    fn reset(&mut self) {
        self.state = NodeState::Idle;
        // Only children this episode actually entered need resetting.
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::testing::{CountingAction, StaticAction};

    #[test]
    fn empty_sequence_succeeds() {
        let mut seq = Sequence::new();
        assert_eq!(seq.tick(&Blackboard::new()), Status::Success);
    }

    #[test]
    fn all_success_yields_success() {
        let mut seq = Sequence::new();
        seq.add_child(Box::new(StaticAction::new(Status::Success)));
        seq.add_child(Box::new(StaticAction::new(Status::Success)));
        assert_eq!(seq.tick(&Blackboard::new()), Status::Success);
        assert_eq!(seq.state(), NodeState::Idle);
    }

    #[test]
    fn failure_short_circuits_later_children() {
        let (third, third_count) = CountingAction::new(Status::Success);
        let mut seq = Sequence::new();
        seq.add_child(Box::new(StaticAction::new(Status::Success)));
        seq.add_child(Box::new(StaticAction::new(Status::Failure)));
        seq.add_child(Box::new(third));

        assert_eq!(seq.tick(&Blackboard::new()), Status::Failure);
        assert_eq!(third_count.get(), 0);
    }

    #[test]
    fn running_child_resumes_without_reexecuting_passed_children() {
        let (first, first_count) = CountingAction::new(Status::Success);
        let (second, second_count) = CountingAction::running_for(2, Status::Success);
        let mut seq = Sequence::new();
        seq.add_child(Box::new(first));
        seq.add_child(Box::new(second));

        let bb = Blackboard::new();
        assert_eq!(seq.tick(&bb), Status::Running);
        assert_eq!(seq.tick(&bb), Status::Running);
        assert_eq!(seq.tick(&bb), Status::Success);
        // First child ran once even though the sequence ticked three times.
        assert_eq!(first_count.get(), 1);
        assert_eq!(second_count.get(), 3);
    }

    #[test]
    fn halted_sequence_fails_until_reset() {
        let mut seq = Sequence::new();
        seq.add_child(Box::new(StaticAction::new(Status::Success)));
        seq.halt();
        assert_eq!(seq.tick(&Blackboard::new()), Status::Failure);
        seq.reset();
        assert_eq!(seq.tick(&Blackboard::new()), Status::Success);
    }
}
