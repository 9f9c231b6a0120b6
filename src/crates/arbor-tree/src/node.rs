//! The node capability every tree unit implements.

use crate::status::{NodeState, Status};
use arbor_runtime::Blackboard;

/// A tickable unit of behaviour.
///
/// The contract, shared by every composite, decorator, and leaf:
///
/// - `tick` performs exactly one downward pass. A node returning
///   [`Status::Running`] must accept another `tick` and resume where it
///   left off.
/// - `reset` returns the node (and, where applicable, its children) to
///   `Idle`, discarding episode state.
/// - `halt` cancels cooperatively: it marks the node `Halted`, propagates to
///   children, and drops any in-flight asynchronous work. Halting is
///   idempotent; ticking a halted node reports `Failure` without executing.
pub trait Node: Send {
    fn tick(&mut self, bb: &Blackboard) -> Status;

    fn reset(&mut self);

    fn halt(&mut self);

    /// Current lifecycle value.
    fn state(&self) -> NodeState;
}

/// Owned node — children are held exclusively by their parent.
pub type BoxNode = Box<dyn Node>;

/// Boolean predicate over the blackboard, used by control-flow nodes.
pub type ConditionFn = Box<dyn Fn(&Blackboard) -> bool + Send>;

impl Node for BoxNode {
    fn tick(&mut self, bb: &Blackboard) -> Status {
        (**self).tick(bb)
    }

    fn reset(&mut self) {
        (**self).reset()
    }

    fn halt(&mut self) {
        (**self).halt()
    }

    fn state(&self) -> NodeState {
        (**self).state()
    }
}
