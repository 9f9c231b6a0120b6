//! Shared fakes for node unit tests.

use crate::node::Node;
use crate::status::{NodeState, Status};
use arbor_runtime::Blackboard;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Tick counter handle shared with a [`CountingAction`].
#[derive(Clone)]
pub(crate) struct Counter(Arc<AtomicUsize>);

impl Counter {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Leaf returning a fixed status on every tick.
pub(crate) struct StaticAction {
    result: Status,
    state: NodeState,
}

impl StaticAction {
    pub fn new(result: Status) -> Self {
        Self {
            result,
            state: NodeState::Idle,
        }
    }
}

impl Node for StaticAction {
    fn tick(&mut self, _bb: &Blackboard) -> Status {
        if self.state == NodeState::Halted {
            return Status::Failure;
        }
        self.state = if self.result == Status::Running {
            NodeState::Running
        } else {
            NodeState::Idle
        };
        self.result
    }

    fn reset(&mut self) {
        self.state = NodeState::Idle;
    }

    fn halt(&mut self) {
        self.state = NodeState::Halted;
    }

    fn state(&self) -> NodeState {
        self.state
    }
}

/// Leaf that counts its ticks, optionally running for a few ticks before
/// finishing with a fixed status.
pub(crate) struct CountingAction {
    result: Status,
    running_for: usize,
    ticks_this_episode: usize,
    count: Arc<AtomicUsize>,
    halts: Arc<AtomicUsize>,
    state: NodeState,
}

impl CountingAction {
    pub fn new(result: Status) -> (Self, Counter) {
        Self::running_for(0, result)
    }

    pub fn running_for(running: usize, result: Status) -> (Self, Counter) {
        let count = Arc::new(AtomicUsize::new(0));
        (
            Self {
                result,
                running_for: running,
                ticks_this_episode: 0,
                count: Arc::clone(&count),
                halts: Arc::new(AtomicUsize::new(0)),
                state: NodeState::Idle,
            },
            Counter(count),
        )
    }

    /// Handle observing how many times this node was halted.
    pub fn halt_counter(&self) -> Counter {
        Counter(Arc::clone(&self.halts))
    }
}

impl Node for CountingAction {
    fn tick(&mut self, _bb: &Blackboard) -> Status {
        if self.state == NodeState::Halted {
            return Status::Failure;
        }
        self.count.fetch_add(1, Ordering::SeqCst);
        if self.ticks_this_episode < self.running_for {
            self.ticks_this_episode += 1;
            self.state = NodeState::Running;
            return Status::Running;
        }
        self.ticks_this_episode = 0;
        self.state = NodeState::Idle;
        self.result
    }

    fn reset(&mut self) {
        self.ticks_this_episode = 0;
        self.state = NodeState::Idle;
    }

    fn halt(&mut self) {
        self.halts.fetch_add(1, Ordering::SeqCst);
        self.state = NodeState::Halted;
    }

    fn state(&self) -> NodeState {
        self.state
    }
}
