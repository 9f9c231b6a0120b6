//! Fluent tree construction.
//!
//! The builder is a stack machine: composite methods push an open frame,
//! [`Builder::end`] pops it and attaches the finished composite to its
//! parent. Decorators and the repeat/retry modifiers are *pending*: they
//! attach to the next node emitted (leaf or composite) and wrap it in
//! reverse registration order, so the most recently registered decorator is
//! innermost. Per-child modifiers (`case`, `precondition`, `priority`,
//! `probability`, `weight`) tag the next child added to the matching
//! composite.
//!
//! Misuse is surfaced as [`BuildError`]: unbalanced `end`/`build`, a pending
//! decorator that never wrapped a node, zero parallel thresholds, or a
//! modifier under the wrong composite.
//!
//! ```rust
//! use arbor_tree::{Builder, Status};
//! use arbor_runtime::Blackboard;
//!
//! let mut tree = Builder::new()
//!     .sequence()
//!     .action(|_bb: &Blackboard| Status::Success)
//!     .inverter()
//!     .action(|_bb: &Blackboard| Status::Failure)
//!     .end()
//!     .expect("balanced")
//!     .build()
//!     .expect("valid tree");
//! assert_eq!(tree.tick(), Status::Success);
//! ```

use crate::action::Action;
use crate::error::BuildError;
use crate::node::{BoxNode, ConditionFn, Node};
use crate::nodes::{
    Conditional, ConditionalSequence, Cooldown, Debounce, DynamicSelector, Failer, For, Inverter,
    MapStatus, Memory, MemoryPolicy, OneShotSequence, Parallel, ParallelPolicy, PriorityFn,
    ProbabilitySelector, RandomSelector, ReactiveSequence, Repeat, Retry, Selector, Sequence,
    Subtree, SubtreeHandle, Succeeder, Switch, Timeout, UtilityFn, UtilitySelector,
    WeightedRandomSelector, While,
};
use crate::status::Status;
use crate::tree::Tree;
use arbor_runtime::Blackboard;
use futures::future::BoxFuture;
use std::time::Duration;

enum Pending {
    Map(Box<dyn Fn(Status) -> Status + Send>),
    Inverter,
    Succeeder,
    Failer,
    Repeat(Option<usize>),
    Retry(Option<usize>),
    Memory(MemoryPolicy),
    Timeout(Duration),
    Cooldown(Duration),
    Debounce(Duration),
}

impl Pending {
    fn wrap(self, node: BoxNode) -> BoxNode {
        match self {
            Pending::Map(func) => Box::new(MapStatus::new(func, node)),
            Pending::Inverter => Box::new(Inverter::new(node)),
            Pending::Succeeder => Box::new(Succeeder::new(node)),
            Pending::Failer => Box::new(Failer::new(node)),
            Pending::Repeat(Some(n)) => Box::new(Repeat::times(n, node)),
            Pending::Repeat(None) => Box::new(Repeat::forever(node)),
            Pending::Retry(Some(n)) => Box::new(Retry::times(n, node)),
            Pending::Retry(None) => Box::new(Retry::forever(node)),
            Pending::Memory(policy) => Box::new(Memory::new(policy, node)),
            Pending::Timeout(duration) => Box::new(Timeout::new(duration, node)),
            Pending::Cooldown(duration) => Box::new(Cooldown::new(duration, node)),
            Pending::Debounce(duration) => Box::new(Debounce::new(duration, node)),
        }
    }
}

enum FrameKind {
    Sequence(Sequence),
    Selector(Selector),
    Parallel(Parallel),
    Random(RandomSelector),
    Probability(ProbabilitySelector),
    Utility(UtilitySelector),
    WeightedRandom(WeightedRandomSelector),
    OneShot(OneShotSequence),
    ConditionalSeq(ConditionalSequence),
    Reactive(ReactiveSequence),
    Dynamic(DynamicSelector),
    Switch(Switch),
}

impl FrameKind {
    fn name(&self) -> &'static str {
        match self {
            FrameKind::Sequence(_) => "sequence",
            FrameKind::Selector(_) => "selector",
            FrameKind::Parallel(_) => "parallel",
            FrameKind::Random(_) => "random_selector",
            FrameKind::Probability(_) => "probability_selector",
            FrameKind::Utility(_) => "utility_selector",
            FrameKind::WeightedRandom(_) => "weighted_random_selector",
            FrameKind::OneShot(_) => "one_shot_sequence",
            FrameKind::ConditionalSeq(_) => "conditional_sequence",
            FrameKind::Reactive(_) => "reactive_sequence",
            FrameKind::Dynamic(_) => "dynamic_selector",
            FrameKind::Switch(_) => "switch",
        }
    }

    fn into_node(self) -> BoxNode {
        match self {
            FrameKind::Sequence(node) => Box::new(node),
            FrameKind::Selector(node) => Box::new(node),
            FrameKind::Parallel(node) => Box::new(node),
            FrameKind::Random(node) => Box::new(node),
            FrameKind::Probability(node) => Box::new(node),
            FrameKind::Utility(node) => Box::new(node),
            FrameKind::WeightedRandom(node) => Box::new(node),
            FrameKind::OneShot(node) => Box::new(node),
            FrameKind::ConditionalSeq(node) => Box::new(node),
            FrameKind::Reactive(node) => Box::new(node),
            FrameKind::Dynamic(node) => Box::new(node),
            FrameKind::Switch(node) => Box::new(node),
        }
    }
}

struct Frame {
    kind: FrameKind,
    // Decorators registered before this composite was opened; applied when
    // the finished composite is attached at end().
    wrappers: Vec<Pending>,
}

enum CaseSlot {
    Case(String),
    Default,
}

/// Stack-machine builder for behaviour trees.
#[derive(Default)]
pub struct Builder {
    stack: Vec<Frame>,
    root: Option<BoxNode>,
    pending: Vec<Pending>,
    pending_case: Option<CaseSlot>,
    pending_precondition: Option<ConditionFn>,
    pending_priority: Option<PriorityFn>,
    pending_probability: Option<f64>,
    pending_weight: Option<UtilityFn>,
    error: Option<BuildError>,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    fn fail(&mut self, error: BuildError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    fn has_pending(&self) -> bool {
        !self.pending.is_empty()
            || self.pending_case.is_some()
            || self.pending_precondition.is_some()
            || self.pending_priority.is_some()
            || self.pending_probability.is_some()
            || self.pending_weight.is_some()
    }

    fn take_wrappers(&mut self) -> Vec<Pending> {
        std::mem::take(&mut self.pending)
    }

    fn apply_wrappers(node: BoxNode, wrappers: Vec<Pending>) -> BoxNode {
        // Most recently registered decorator is innermost.
        let mut node = node;
        for wrapper in wrappers.into_iter().rev() {
            node = wrapper.wrap(node);
        }
        node
    }

    fn push_frame(mut self, kind: FrameKind) -> Self {
        let wrappers = self.take_wrappers();
        self.stack.push(Frame { kind, wrappers });
        self
    }

    fn attach(&mut self, node: BoxNode) {
        let node = Self::apply_wrappers(node, self.take_wrappers());
        let misplaced = |modifier: &'static str, composite: &'static str| {
            BuildError::MisplacedModifier {
                modifier,
                composite,
            }
        };

        let frame = match self.stack.last_mut() {
            Some(frame) => frame,
            None => {
                if self.has_pending() {
                    self.fail(BuildError::PendingDecorator);
                    return;
                }
                if self.root.is_some() {
                    self.fail(BuildError::RootAlreadySet);
                    return;
                }
                self.root = Some(node);
                return;
            }
        };

        match &mut frame.kind {
            FrameKind::Sequence(composite) => composite.add_child(node),
            FrameKind::Selector(composite) => composite.add_child(node),
            FrameKind::Parallel(composite) => composite.add_child(node),
            FrameKind::Random(composite) => composite.add_child(node),
            FrameKind::OneShot(composite) => composite.add_child(node),
            FrameKind::Probability(composite) => {
                let probability = self.pending_probability.take().unwrap_or(1.0);
                composite.add_child(probability, node);
            }
            FrameKind::Utility(composite) => {
                let utility = self
                    .pending_weight
                    .take()
                    .unwrap_or_else(|| Box::new(|_: &Blackboard| 0.0));
                composite.add_child(utility, node);
            }
            FrameKind::WeightedRandom(composite) => {
                let weight = self
                    .pending_weight
                    .take()
                    .unwrap_or_else(|| Box::new(|_: &Blackboard| 1.0));
                composite.add_child(weight, node);
            }
            FrameKind::ConditionalSeq(composite) => {
                composite.add_child(self.pending_precondition.take(), node);
            }
            FrameKind::Reactive(composite) => {
                composite.add_child(self.pending_precondition.take(), node);
            }
            FrameKind::Dynamic(composite) => {
                let priority = self
                    .pending_priority
                    .take()
                    .unwrap_or_else(|| Box::new(|_: &Blackboard| 0.0));
                composite.add_child(priority, node);
            }
            FrameKind::Switch(composite) => match self.pending_case.take() {
                Some(CaseSlot::Case(value)) => composite.add_case(value, node),
                Some(CaseSlot::Default) => composite.set_default(node),
                None => {
                    self.fail(BuildError::SwitchChildWithoutCase);
                    return;
                }
            },
        }

        // A per-child modifier left over here was aimed at the wrong frame.
        if self.pending_case.is_some() {
            self.fail(misplaced("case", frame_name(&self.stack)));
        } else if self.pending_precondition.is_some() {
            self.fail(misplaced("precondition", frame_name(&self.stack)));
        } else if self.pending_priority.is_some() {
            self.fail(misplaced("priority", frame_name(&self.stack)));
        } else if self.pending_probability.is_some() {
            self.fail(misplaced("probability", frame_name(&self.stack)));
        } else if self.pending_weight.is_some() {
            self.fail(misplaced("weight", frame_name(&self.stack)));
        }
    }

    // ---- composites -----------------------------------------------------

    pub fn sequence(self) -> Self {
        self.push_frame(FrameKind::Sequence(Sequence::new()))
    }

    pub fn selector(self) -> Self {
        self.push_frame(FrameKind::Selector(Selector::new()))
    }

    /// Parallel in policy form.
    pub fn parallel(self, success: ParallelPolicy, failure: ParallelPolicy) -> Self {
        self.push_frame(FrameKind::Parallel(Parallel::with_policies(
            success, failure,
        )))
    }

    /// Parallel in threshold form; zero thresholds are rejected.
    pub fn parallel_threshold(mut self, success: usize, failure: Option<usize>) -> Self {
        match Parallel::with_thresholds(success, failure) {
            Ok(parallel) => self.push_frame(FrameKind::Parallel(parallel)),
            Err(error) => {
                self.fail(error);
                self
            }
        }
    }

    pub fn random_selector(self) -> Self {
        self.push_frame(FrameKind::Random(RandomSelector::new()))
    }

    pub fn random_selector_seeded(self, seed: u64) -> Self {
        self.push_frame(FrameKind::Random(RandomSelector::with_seed(seed)))
    }

    pub fn probability_selector(self) -> Self {
        self.push_frame(FrameKind::Probability(ProbabilitySelector::new()))
    }

    pub fn probability_selector_seeded(self, seed: u64) -> Self {
        self.push_frame(FrameKind::Probability(ProbabilitySelector::with_seed(seed)))
    }

    pub fn utility_selector(self) -> Self {
        self.push_frame(FrameKind::Utility(UtilitySelector::new()))
    }

    pub fn weighted_random_selector(self) -> Self {
        self.push_frame(FrameKind::WeightedRandom(WeightedRandomSelector::new()))
    }

    pub fn weighted_random_selector_seeded(self, seed: u64) -> Self {
        self.push_frame(FrameKind::WeightedRandom(WeightedRandomSelector::with_seed(
            seed,
        )))
    }

    pub fn one_shot_sequence(self) -> Self {
        self.push_frame(FrameKind::OneShot(OneShotSequence::new()))
    }

    pub fn conditional_sequence(self) -> Self {
        self.push_frame(FrameKind::ConditionalSeq(ConditionalSequence::new()))
    }

    pub fn reactive_sequence(self) -> Self {
        self.push_frame(FrameKind::Reactive(ReactiveSequence::new()))
    }

    pub fn dynamic_selector(self) -> Self {
        self.push_frame(FrameKind::Dynamic(DynamicSelector::new()))
    }

    pub fn switch<S>(self, selector: S) -> Self
    where
        S: Fn(&Blackboard) -> String + Send + 'static,
    {
        self.push_frame(FrameKind::Switch(Switch::new(selector)))
    }

    // ---- leaves ---------------------------------------------------------

    pub fn action<F>(mut self, func: F) -> Self
    where
        F: FnMut(&Blackboard) -> Status + Send + 'static,
    {
        self.attach(Box::new(Action::new(func)));
        self
    }

    pub fn action_spawned<F>(mut self, factory: F) -> Self
    where
        F: FnMut(&Blackboard) -> BoxFuture<'static, Status> + Send + 'static,
    {
        self.attach(Box::new(Action::spawned(factory)));
        self
    }

    pub fn action_task<F>(mut self, factory: F) -> Self
    where
        F: FnMut(&Blackboard) -> BoxFuture<'static, Status> + Send + 'static,
    {
        self.attach(Box::new(Action::task(factory)));
        self
    }

    /// Emit a pre-built node (anything implementing [`Node`]).
    pub fn node<N: Node + 'static>(mut self, node: N) -> Self {
        self.attach(Box::new(node));
        self
    }

    pub fn condition<C>(mut self, condition: C, then_branch: BoxNode, else_branch: Option<BoxNode>) -> Self
    where
        C: Fn(&Blackboard) -> bool + Send + 'static,
    {
        self.attach(Box::new(Conditional::new(condition, then_branch, else_branch)));
        self
    }

    pub fn while_loop<C>(mut self, condition: C, child: BoxNode, max_iterations: Option<usize>) -> Self
    where
        C: Fn(&Blackboard) -> bool + Send + 'static,
    {
        self.attach(Box::new(While::new(condition, child, max_iterations)));
        self
    }

    pub fn for_loop(mut self, count: usize, child: BoxNode) -> Self {
        self.attach(Box::new(For::new(count, child)));
        self
    }

    pub fn subtree(mut self, handle: SubtreeHandle) -> Self {
        self.attach(Box::new(Subtree::new(handle)));
        self
    }

    // ---- pending decorators --------------------------------------------

    /// Custom status-transform decorator for the next node.
    pub fn decorator<F>(mut self, func: F) -> Self
    where
        F: Fn(Status) -> Status + Send + 'static,
    {
        self.pending.push(Pending::Map(Box::new(func)));
        self
    }

    pub fn inverter(mut self) -> Self {
        self.pending.push(Pending::Inverter);
        self
    }

    pub fn succeeder(mut self) -> Self {
        self.pending.push(Pending::Succeeder);
        self
    }

    pub fn failer(mut self) -> Self {
        self.pending.push(Pending::Failer);
        self
    }

    pub fn repeat(mut self, times: usize) -> Self {
        self.pending.push(Pending::Repeat(Some(times)));
        self
    }

    pub fn repeat_forever(mut self) -> Self {
        self.pending.push(Pending::Repeat(None));
        self
    }

    pub fn retry(mut self, times: usize) -> Self {
        self.pending.push(Pending::Retry(Some(times)));
        self
    }

    pub fn retry_forever(mut self) -> Self {
        self.pending.push(Pending::Retry(None));
        self
    }

    pub fn memory(mut self, policy: MemoryPolicy) -> Self {
        self.pending.push(Pending::Memory(policy));
        self
    }

    pub fn timeout(mut self, duration: Duration) -> Self {
        self.pending.push(Pending::Timeout(duration));
        self
    }

    pub fn cooldown(mut self, duration: Duration) -> Self {
        self.pending.push(Pending::Cooldown(duration));
        self
    }

    pub fn debounce(mut self, duration: Duration) -> Self {
        self.pending.push(Pending::Debounce(duration));
        self
    }

    // ---- per-child modifiers -------------------------------------------

    /// Label the next child of the enclosing switch.
    pub fn case(mut self, value: impl Into<String>) -> Self {
        self.pending_case = Some(CaseSlot::Case(value.into()));
        self
    }

    /// Mark the next child as the enclosing switch's default branch.
    pub fn default_case(mut self) -> Self {
        self.pending_case = Some(CaseSlot::Default);
        self
    }

    /// Precondition for the next child of a conditional or reactive
    /// sequence.
    pub fn precondition<C>(mut self, condition: C) -> Self
    where
        C: Fn(&Blackboard) -> bool + Send + 'static,
    {
        self.pending_precondition = Some(Box::new(condition));
        self
    }

    /// Priority function for the next child of a dynamic selector.
    pub fn priority<P>(mut self, priority: P) -> Self
    where
        P: Fn(&Blackboard) -> f64 + Send + 'static,
    {
        self.pending_priority = Some(Box::new(priority));
        self
    }

    /// Selection probability for the next child of a probability selector.
    pub fn probability(mut self, probability: f64) -> Self {
        self.pending_probability = Some(probability);
        self
    }

    /// Weight/utility function for the next child of a utility or weighted
    /// random selector.
    pub fn weight<W>(mut self, weight: W) -> Self
    where
        W: Fn(&Blackboard) -> f64 + Send + 'static,
    {
        self.pending_weight = Some(Box::new(weight));
        self
    }

    // ---- finishing ------------------------------------------------------

    /// Close the innermost open composite.
    pub fn end(mut self) -> Result<Self, BuildError> {
        if let Some(error) = self.error.take() {
            return Err(error);
        }
        if self.has_pending() {
            return Err(BuildError::PendingDecorator);
        }
        let frame = self.stack.pop().ok_or(BuildError::UnbalancedEnd)?;
        let node = Self::apply_wrappers(frame.kind.into_node(), frame.wrappers);
        self.attach_finished(node)?;
        Ok(self)
    }

    fn attach_finished(&mut self, node: BoxNode) -> Result<(), BuildError> {
        self.attach(node);
        match self.error.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Finish and return a [`Tree`] owning the root.
    pub fn build(self) -> Result<Tree, BuildError> {
        Ok(Tree::new(self.build_node()?))
    }

    /// Finish and return the bare root node, for embedding in a larger
    /// tree or a [`SubtreeHandle`].
    pub fn build_node(mut self) -> Result<BoxNode, BuildError> {
        if let Some(error) = self.error.take() {
            return Err(error);
        }
        if self.has_pending() {
            return Err(BuildError::PendingDecorator);
        }
        if !self.stack.is_empty() {
            return Err(BuildError::UnbalancedBuild {
                depth: self.stack.len(),
            });
        }
        self.root.take().ok_or(BuildError::EmptyTree)
    }
}

fn frame_name(stack: &[Frame]) -> &'static str {
    stack.last().map_or("root", |frame| frame.kind.name())
}
