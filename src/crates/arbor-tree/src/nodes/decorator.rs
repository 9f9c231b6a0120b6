//! Single-child decorators: status transforms, repetition, retry, and the
//! wall-clock family (Timeout / Cooldown / Debounce).
//!
//! Every decorator is a node instance with explicit fields; nothing hides
//! mutable episode state inside a closure. The wall-clock decorators read
//! time through [`Clock`] so tests can drive them with a
//! [`arbor_runtime::ManualClock`].

use crate::node::{BoxNode, Node};
use crate::status::{NodeState, Status};
use arbor_runtime::{clock, Blackboard, Clock};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Swaps `Success` and `Failure`; `Running` passes through.
pub struct Inverter {
    child: BoxNode,
    state: NodeState,
}

impl Inverter {
    pub fn new(child: BoxNode) -> Self {
        Self {
            child,
            state: NodeState::Idle,
        }
    }
}

impl Node for Inverter {
    fn tick(&mut self, bb: &Blackboard) -> Status {
        if self.state == NodeState::Halted {
            return Status::Failure;
        }
        let status = match self.child.tick(bb) {
            Status::Success => Status::Failure,
            Status::Failure => Status::Success,
            other => other,
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
        self.child.reset();
    }

    fn halt(&mut self) {
        self.state = NodeState::Halted;
        self.child.halt();
    }

    fn state(&self) -> NodeState {
        self.state
    }
}

/// Maps any terminal child status to `Success`.
pub struct Succeeder {
    child: BoxNode,
    state: NodeState,
}

impl Succeeder {
    pub fn new(child: BoxNode) -> Self {
        Self {
            child,
            state: NodeState::Idle,
        }
    }
}

impl Node for Succeeder {
    fn tick(&mut self, bb: &Blackboard) -> Status {
        if self.state == NodeState::Halted {
            return Status::Failure;
        }
        let status = self.child.tick(bb);
        if status == Status::Running {
            self.state = NodeState::Running;
            return Status::Running;
        }
        self.state = NodeState::Idle;
        Status::Success
    }

    fn reset(&mut self) {
        self.state = NodeState::Idle;
        self.child.reset();
    }

    fn halt(&mut self) {
        self.state = NodeState::Halted;
        self.child.halt();
    }

    fn state(&self) -> NodeState {
        self.state
    }
}

/// Maps any terminal child status to `Failure`.
pub struct Failer {
    child: BoxNode,
    state: NodeState,
}

impl Failer {
    pub fn new(child: BoxNode) -> Self {
        Self {
            child,
            state: NodeState::Idle,
        }
    }
}

impl Node for Failer {
    fn tick(&mut self, bb: &Blackboard) -> Status {
        if self.state == NodeState::Halted {
            return Status::Failure;
        }
        let status = self.child.tick(bb);
        if status == Status::Running {
            self.state = NodeState::Running;
            return Status::Running;
        }
        self.state = NodeState::Idle;
        Status::Failure
    }

    fn reset(&mut self) {
        self.state = NodeState::Idle;
        self.child.reset();
    }

    fn halt(&mut self) {
        self.state = NodeState::Halted;
        self.child.halt();
    }

    fn state(&self) -> NodeState {
        self.state
    }
}

/// Applies an arbitrary status transform to the child's result.
pub struct MapStatus {
    func: Box<dyn Fn(Status) -> Status + Send>,
    child: BoxNode,
    state: NodeState,
}

impl MapStatus {
    pub fn new<F>(func: F, child: BoxNode) -> Self
    where
        F: Fn(Status) -> Status + Send + 'static,
    {
        Self {
            func: Box::new(func),
            child,
            state: NodeState::Idle,
        }
    }
}

impl Node for MapStatus {
    fn tick(&mut self, bb: &Blackboard) -> Status {
        if self.state == NodeState::Halted {
            return Status::Failure;
        }
        let status = (self.func)(self.child.tick(bb));
        self.state = if status == Status::Running {
            NodeState::Running
        } else {
            NodeState::Idle
        };
        status
    }

    fn reset(&mut self) {
        self.state = NodeState::Idle;
        self.child.reset();
    }

    fn halt(&mut self) {
        self.state = NodeState::Halted;
        self.child.halt();
    }

    fn state(&self) -> NodeState {
        self.state
    }
}

/// Re-ticks the child on each `Success`, finishing with `Success` on the
/// n-th. `Failure` propagates immediately. `Repeat::times(0)` succeeds
/// without ever ticking the child; [`Repeat::forever`] never finishes on
/// its own.
pub struct Repeat {
    limit: Option<usize>,
    completed: usize,
    child: BoxNode,
    state: NodeState,
}

impl Repeat {
    pub fn times(limit: usize, child: BoxNode) -> Self {
        Self {
            limit: Some(limit),
            completed: 0,
            child,
            state: NodeState::Idle,
        }
    }

    pub fn forever(child: BoxNode) -> Self {
        Self {
            limit: None,
            completed: 0,
            child,
            state: NodeState::Idle,
        }
    }
}

impl Node for Repeat {
    fn tick(&mut self, bb: &Blackboard) -> Status {
        if self.state == NodeState::Halted {
            return Status::Failure;
        }
        if self.limit == Some(0) {
            return Status::Success;
        }
        self.state = NodeState::Running;

        match self.child.tick(bb) {
            Status::Running => Status::Running,
            Status::Failure => {
                self.completed = 0;
                self.state = NodeState::Idle;
                Status::Failure
            }
            _ => {
                self.completed += 1;
                if let Some(limit) = self.limit {
                    if self.completed >= limit {
                        self.completed = 0;
                        self.state = NodeState::Idle;
                        return Status::Success;
                    }
                }
                self.child.reset();
                Status::Running
            }
        }
    }

    fn reset(&mut self) {
        self.state = NodeState::Idle;
        self.completed = 0;
        self.child.reset();
    }

    fn halt(&mut self) {
        self.state = NodeState::Halted;
        self.child.halt();
    }

    fn state(&self) -> NodeState {
        self.state
    }
}

/// Re-ticks the child on each `Failure`, finishing with `Failure` on the
/// n-th. `Success` propagates immediately. `Retry::times(0)` fails without
/// ever ticking the child.
pub struct Retry {
    limit: Option<usize>,
    attempts: usize,
    child: BoxNode,
    state: NodeState,
}

impl Retry {
    pub fn times(limit: usize, child: BoxNode) -> Self {
        Self {
            limit: Some(limit),
            attempts: 0,
            child,
            state: NodeState::Idle,
        }
    }

    pub fn forever(child: BoxNode) -> Self {
        Self {
            limit: None,
            attempts: 0,
            child,
            state: NodeState::Idle,
        }
    }
}

impl Node for Retry {
    fn tick(&mut self, bb: &Blackboard) -> Status {
        if self.state == NodeState::Halted {
            return Status::Failure;
        }
        if self.limit == Some(0) {
            return Status::Failure;
        }
        self.state = NodeState::Running;

        match self.child.tick(bb) {
            Status::Running => Status::Running,
            Status::Failure => {
                self.attempts += 1;
                if let Some(limit) = self.limit {
                    if self.attempts >= limit {
                        self.attempts = 0;
                        self.state = NodeState::Idle;
                        return Status::Failure;
                    }
                }
                self.child.reset();
                Status::Running
            }
            _ => {
                self.attempts = 0;
                self.state = NodeState::Idle;
                Status::Success
            }
        }
    }

    fn reset(&mut self) {
        self.state = NodeState::Idle;
        self.attempts = 0;
        self.child.reset();
    }

    fn halt(&mut self) {
        self.state = NodeState::Halted;
        self.child.halt();
    }

    fn state(&self) -> NodeState {
        self.state
    }
}

/// Fails (and halts the child) once an episode has run longer than the
/// allowed duration. The clock starts on the first tick of an episode and
/// clears on any terminal child result. A zero duration fails on the first
/// tick, before the child runs.
pub struct Timeout {
    duration: Duration,
    clock: Arc<dyn Clock>,
    started: Option<Instant>,
    child: BoxNode,
    state: NodeState,
}

impl Timeout {
    pub fn new(duration: Duration, child: BoxNode) -> Self {
        Self::with_clock(duration, child, clock::monotonic())
    }

    pub fn with_clock(duration: Duration, child: BoxNode, clock: Arc<dyn Clock>) -> Self {
        Self {
            duration,
            clock,
            started: None,
            child,
            state: NodeState::Idle,
        }
    }
}

impl Node for Timeout {
    fn tick(&mut self, bb: &Blackboard) -> Status {
        if self.state == NodeState::Halted {
            return Status::Failure;
        }
        let now = self.clock.now();
        let started = *self.started.get_or_insert(now);
        if now.duration_since(started) >= self.duration {
            tracing::debug!(elapsed = ?now.duration_since(started), "timeout elapsed, halting child");
            self.child.halt();
            self.child.reset();
            self.started = None;
            self.state = NodeState::Idle;
            return Status::Failure;
        }
        self.state = NodeState::Running;

        let status = self.child.tick(bb);
        if status.is_terminal() {
            self.started = None;
            self.state = NodeState::Idle;
        }
        status
    }

    fn reset(&mut self) {
        self.state = NodeState::Idle;
        self.started = None;
        self.child.reset();
    }

    fn halt(&mut self) {
        self.state = NodeState::Halted;
        self.started = None;
        self.child.halt();
    }

    fn state(&self) -> NodeState {
        self.state
    }
}

/// After a child `Success`, short-circuits to `Failure` for the length of
/// the cooldown window without ticking the child.
pub struct Cooldown {
    duration: Duration,
    clock: Arc<dyn Clock>,
    last_success: Option<Instant>,
    child: BoxNode,
    state: NodeState,
}

impl Cooldown {
    pub fn new(duration: Duration, child: BoxNode) -> Self {
        Self::with_clock(duration, child, clock::monotonic())
    }

    pub fn with_clock(duration: Duration, child: BoxNode, clock: Arc<dyn Clock>) -> Self {
        Self {
            duration,
            clock,
            last_success: None,
            child,
            state: NodeState::Idle,
        }
    }
}

impl Node for Cooldown {
    fn tick(&mut self, bb: &Blackboard) -> Status {
        if self.state == NodeState::Halted {
            return Status::Failure;
        }
        let now = self.clock.now();
        if let Some(last) = self.last_success {
            if now.duration_since(last) < self.duration {
                return Status::Failure;
            }
        }
        self.state = NodeState::Running;

        let status = self.child.tick(bb);
        if status == Status::Success {
            self.last_success = Some(now);
        }
        if status.is_terminal() {
            self.state = NodeState::Idle;
        }
        status
    }

    fn reset(&mut self) {
        self.state = NodeState::Idle;
        self.last_success = None;
        self.child.reset();
    }

    fn halt(&mut self) {
        self.state = NodeState::Halted;
        self.child.halt();
    }

    fn state(&self) -> NodeState {
        self.state
    }
}

/// Which child results a [`Memory`] decorator caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryPolicy {
    RememberSuccess,
    RememberFailure,
    RememberFinished,
    RememberAll,
}

impl MemoryPolicy {
    fn admits(self, status: Status) -> bool {
        match self {
            MemoryPolicy::RememberSuccess => status == Status::Success,
            MemoryPolicy::RememberFailure => status == Status::Failure,
            MemoryPolicy::RememberFinished => status.is_terminal(),
            MemoryPolicy::RememberAll => true,
        }
    }
}

/// Caches the child's status once the policy admits it; later ticks return
/// the cached value without re-ticking the child. `reset` clears the cache.
pub struct Memory {
    policy: MemoryPolicy,
    remembered: Option<Status>,
    child: BoxNode,
    state: NodeState,
}

impl Memory {
    pub fn new(policy: MemoryPolicy, child: BoxNode) -> Self {
        Self {
            policy,
            remembered: None,
            child,
            state: NodeState::Idle,
        }
    }

    pub fn clear_memory(&mut self) {
        self.remembered = None;
    }
}

impl Node for Memory {
    fn tick(&mut self, bb: &Blackboard) -> Status {
        if self.state == NodeState::Halted {
            return Status::Failure;
        }
        if let Some(remembered) = self.remembered {
            return remembered;
        }
        let status = self.child.tick(bb);
        if self.policy.admits(status) {
            self.remembered = Some(status);
        }
        self.state = if status == Status::Running {
            NodeState::Running
        } else {
            NodeState::Idle
        };
        status
    }

    fn reset(&mut self) {
        self.state = NodeState::Idle;
        self.remembered = None;
        self.child.reset();
    }

    fn halt(&mut self) {
        self.state = NodeState::Halted;
        self.child.halt();
    }

    fn state(&self) -> NodeState {
        self.state
    }
}

/// Reports the child's status only once it has been observed unchanged for
/// the debounce window.
///
/// Until the window elapses the decorator reports `Running`, not the last
/// observed status — parents therefore treat an unstable child as
/// still-working rather than reacting to a value that may flap.
pub struct Debounce {
    duration: Duration,
    clock: Arc<dyn Clock>,
    last_status: Option<Status>,
    stable_since: Option<Instant>,
    child: BoxNode,
    state: NodeState,
}

impl Debounce {
    pub fn new(duration: Duration, child: BoxNode) -> Self {
        Self::with_clock(duration, child, clock::monotonic())
    }

    pub fn with_clock(duration: Duration, child: BoxNode, clock: Arc<dyn Clock>) -> Self {
        Self {
            duration,
            clock,
            last_status: None,
            stable_since: None,
            child,
            state: NodeState::Idle,
        }
    }
}

impl Node for Debounce {
    fn tick(&mut self, bb: &Blackboard) -> Status {
        if self.state == NodeState::Halted {
            return Status::Failure;
        }
        self.state = NodeState::Running;
        let now = self.clock.now();
        let status = self.child.tick(bb);

        if self.last_status != Some(status) {
            self.last_status = Some(status);
            self.stable_since = Some(now);
        }
        let since = *self.stable_since.get_or_insert(now);
        if now.duration_since(since) >= self.duration {
            if status.is_terminal() {
                self.state = NodeState::Idle;
            }
            status
        } else {
            Status::Running
        }
    }

    fn reset(&mut self) {
        self.state = NodeState::Idle;
        self.last_status = None;
        self.stable_since = None;
        self.child.reset();
    }

    fn halt(&mut self) {
        self.state = NodeState::Halted;
        self.child.halt();
    }

    fn state(&self) -> NodeState {
        self.state
    }
}
