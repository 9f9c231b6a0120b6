//! Structured control flow: branches, loops, switches, and the reactive
//! sequence variants.

use crate::node::{BoxNode, ConditionFn, Node};
use crate::status::{NodeState, Status};
use arbor_runtime::Blackboard;
use std::collections::HashMap;

/// If/else branch node.
///
/// The condition is evaluated when the node is entered; the chosen branch
/// then runs to a terminal status before the condition is consulted again.
/// A false condition with no else branch succeeds immediately.
pub struct Conditional {
    condition: ConditionFn,
    then_branch: BoxNode,
    else_branch: Option<BoxNode>,
    active: Option<Branch>,
    state: NodeState,
}

#[derive(Clone, Copy, PartialEq)]
enum Branch {
    Then,
    Else,
}

impl Conditional {
    pub fn new<C>(condition: C, then_branch: BoxNode, else_branch: Option<BoxNode>) -> Self
    where
        C: Fn(&Blackboard) -> bool + Send + 'static,
    {
        Self {
            condition: Box::new(condition),
            then_branch,
            else_branch,
            active: None,
            state: NodeState::Idle,
        }
    }

    fn active_node(&mut self) -> Option<&mut BoxNode> {
        match self.active {
            Some(Branch::Then) => Some(&mut self.then_branch),
            Some(Branch::Else) => self.else_branch.as_mut(),
            None => None,
        }
    }
}

impl Node for Conditional {
    fn tick(&mut self, bb: &Blackboard) -> Status {
        if self.state == NodeState::Halted {
            return Status::Failure;
        }
        if self.active.is_none() {
            if (self.condition)(bb) {
                self.active = Some(Branch::Then);
            } else if self.else_branch.is_some() {
                self.active = Some(Branch::Else);
            } else {
                return Status::Success;
            }
        }
        self.state = NodeState::Running;

        let status = match self.active_node() {
            Some(node) => node.tick(bb),
            None => Status::Success,
        };
        if status != Status::Running {
            self.active = None;
            self.state = NodeState::Idle;
        }
        status
    }

    fn reset(&mut self) {
        self.state = NodeState::Idle;
        self.active = None;
        self.then_branch.reset();
        if let Some(else_branch) = &mut self.else_branch {
            else_branch.reset();
        }
    }

    fn halt(&mut self) {
        self.state = NodeState::Halted;
        if let Some(node) = self.active_node() {
            node.halt();
        }
        self.active = None;
    }

    fn state(&self) -> NodeState {
        self.state
    }
}

/// Repeats the child while the condition holds, looping *within* one tick.
///
/// The in-tick loop terminates on a `Running` or `Failure` child, on the
/// condition turning false, or on the optional iteration cap — so a tick
/// never dead-loops on a well-behaved child.
pub struct While {
    condition: ConditionFn,
    child: BoxNode,
    max_iterations: Option<usize>,
    completed: usize,
    in_episode: bool,
    state: NodeState,
}

impl While {
    pub fn new<C>(condition: C, child: BoxNode, max_iterations: Option<usize>) -> Self
    where
        C: Fn(&Blackboard) -> bool + Send + 'static,
    {
        Self {
            condition: Box::new(condition),
            child,
            max_iterations,
            completed: 0,
            in_episode: false,
            state: NodeState::Idle,
        }
    }
}

impl Node for While {
    fn tick(&mut self, bb: &Blackboard) -> Status {
        if self.state == NodeState::Halted {
            return Status::Failure;
        }
        if !self.in_episode {
            self.completed = 0;
            self.in_episode = true;
        }
        self.state = NodeState::Running;

        while (self.condition)(bb) {
            if let Some(max) = self.max_iterations {
                if self.completed >= max {
                    break;
                }
            }
            match self.child.tick(bb) {
                Status::Running => return Status::Running,
                Status::Failure => {
                    self.in_episode = false;
                    self.state = NodeState::Idle;
                    self.child.reset();
                    return Status::Failure;
                }
                _ => {
                    self.child.reset();
                    self.completed += 1;
                }
            }
        }
        self.in_episode = false;
        self.state = NodeState::Idle;
        Status::Success
    }

    fn reset(&mut self) {
        self.state = NodeState::Idle;
        self.completed = 0;
        self.in_episode = false;
        self.child.reset();
    }

    fn halt(&mut self) {
        self.state = NodeState::Halted;
        self.in_episode = false;
        self.child.halt();
    }

    fn state(&self) -> NodeState {
        self.state
    }
}

/// Runs the child a fixed number of times; the count may be static or read
/// from the blackboard at episode start.
pub struct For {
    count_fn: Box<dyn Fn(&Blackboard) -> usize + Send>,
    child: BoxNode,
    target: usize,
    completed: usize,
    in_episode: bool,
    state: NodeState,
}

impl For {
    pub fn new(count: usize, child: BoxNode) -> Self {
        Self::with_count_fn(move |_| count, child)
    }

    pub fn with_count_fn<C>(count_fn: C, child: BoxNode) -> Self
    where
        C: Fn(&Blackboard) -> usize + Send + 'static,
    {
        Self {
            count_fn: Box::new(count_fn),
            child,
            target: 0,
            completed: 0,
            in_episode: false,
            state: NodeState::Idle,
        }
    }
}

impl Node for For {
    fn tick(&mut self, bb: &Blackboard) -> Status {
        if self.state == NodeState::Halted {
            return Status::Failure;
        }
        if !self.in_episode {
            self.target = (self.count_fn)(bb);
            self.completed = 0;
            self.in_episode = true;
        }
        self.state = NodeState::Running;

        while self.completed < self.target {
            match self.child.tick(bb) {
                Status::Running => return Status::Running,
                Status::Failure => {
                    self.in_episode = false;
                    self.state = NodeState::Idle;
                    self.child.reset();
                    return Status::Failure;
                }
                _ => {
                    self.child.reset();
                    self.completed += 1;
                }
            }
        }
        self.in_episode = false;
        self.state = NodeState::Idle;
        Status::Success
    }

    fn reset(&mut self) {
        self.state = NodeState::Idle;
        self.completed = 0;
        self.in_episode = false;
        self.child.reset();
    }

    fn halt(&mut self) {
        self.state = NodeState::Halted;
        self.in_episode = false;
        self.child.halt();
    }

    fn state(&self) -> NodeState {
        self.state
    }
}

/// String-keyed branch selection.
///
/// The selector function picks a case when the node is entered; the chosen
/// branch runs to completion before the selector is consulted again. No
/// matching case and no default fails the node.
pub struct Switch {
    selector: Box<dyn Fn(&Blackboard) -> String + Send>,
    cases: HashMap<String, BoxNode>,
    default: Option<BoxNode>,
    active: Option<ActiveCase>,
    state: NodeState,
}

enum ActiveCase {
    Case(String),
    Default,
}

impl Switch {
    pub fn new<S>(selector: S) -> Self
    where
        S: Fn(&Blackboard) -> String + Send + 'static,
    {
        Self {
            selector: Box::new(selector),
            cases: HashMap::new(),
            default: None,
            active: None,
            state: NodeState::Idle,
        }
    }

    pub fn add_case(&mut self, value: impl Into<String>, node: BoxNode) {
        self.cases.insert(value.into(), node);
    }

    pub fn set_default(&mut self, node: BoxNode) {
        self.default = Some(node);
    }

    fn active_node(&mut self) -> Option<&mut BoxNode> {
        match &self.active {
            Some(ActiveCase::Case(name)) => self.cases.get_mut(name),
            Some(ActiveCase::Default) => self.default.as_mut(),
            None => None,
        }
    }
}

impl Node for Switch {
    fn tick(&mut self, bb: &Blackboard) -> Status {
        if self.state == NodeState::Halted {
            return Status::Failure;
        }
        if self.active.is_none() {
            let selected = (self.selector)(bb);
            if self.cases.contains_key(&selected) {
                self.active = Some(ActiveCase::Case(selected));
            } else if self.default.is_some() {
                self.active = Some(ActiveCase::Default);
            } else {
                return Status::Failure;
            }
        }
        self.state = NodeState::Running;

        let status = match self.active_node() {
            Some(node) => node.tick(bb),
            None => Status::Failure,
        };
        if status != Status::Running {
            self.active = None;
            self.state = NodeState::Idle;
        }
        status
    }

    fn reset(&mut self) {
        self.state = NodeState::Idle;
        self.active = None;
        for node in self.cases.values_mut() {
            node.reset();
        }
        if let Some(default) = &mut self.default {
            default.reset();
        }
    }

    fn halt(&mut self) {
        self.state = NodeState::Halted;
        if let Some(node) = self.active_node() {
            node.halt();
        }
        self.active = None;
    }

    fn state(&self) -> NodeState {
        self.state
    }
}

/// Sequence whose children carry optional preconditions; a false
/// precondition fails the whole node immediately.
#[derive(Default)]
pub struct ConditionalSequence {
    children: Vec<(Option<ConditionFn>, BoxNode)>,
    current: usize,
    state: NodeState,
}

impl ConditionalSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_child(&mut self, precondition: Option<ConditionFn>, child: BoxNode) {
        self.children.push((precondition, child));
    }
}

impl Node for ConditionalSequence {
    fn tick(&mut self, bb: &Blackboard) -> Status {
        if self.state == NodeState::Halted {
            return Status::Failure;
        }
        self.state = NodeState::Running;

        while self.current < self.children.len() {
            let (precondition, child) = &mut self.children[self.current];
            if let Some(precondition) = precondition {
                if !precondition(bb) {
                    self.current = 0;
                    self.state = NodeState::Idle;
                    return Status::Failure;
                }
            }
            match child.tick(bb) {
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
        for (_, child) in &mut self.children {
            child.reset();
        }
        self.current = 0;
    }

    fn halt(&mut self) {
        self.state = NodeState::Halted;
        for (_, child) in &mut self.children {
            child.halt();
        }
        self.current = 0;
    }

    fn state(&self) -> NodeState {
        self.state
    }
}

/// Sequence that re-evaluates every condition up to the running child on
/// every tick; any condition turning false halts the running child and
/// fails the node.
#[derive(Default)]
pub struct ReactiveSequence {
    children: Vec<(Option<ConditionFn>, BoxNode)>,
    current: usize,
    state: NodeState,
}

impl ReactiveSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_child(&mut self, condition: Option<ConditionFn>, child: BoxNode) {
        self.children.push((condition, child));
    }
}

impl Node for ReactiveSequence {
    fn tick(&mut self, bb: &Blackboard) -> Status {
        if self.state == NodeState::Halted {
            return Status::Failure;
        }
        self.state = NodeState::Running;

        for index in 0..self.children.len() {
            if let Some(condition) = &self.children[index].0 {
                if !condition(bb) {
                    // A guarding condition went false: the in-flight child is
                    // cancelled, not merely suspended.
                    if index <= self.current && self.current < self.children.len() {
                        self.children[self.current].1.halt();
                        self.children[self.current].1.reset();
                    }
                    self.current = 0;
                    self.state = NodeState::Idle;
                    return Status::Failure;
                }
            }
            if index == self.current {
                match self.children[index].1.tick(bb) {
                    Status::Running => return Status::Running,
                    Status::Failure => {
                        self.current = 0;
                        self.state = NodeState::Idle;
                        return Status::Failure;
                    }
                    _ => {
                        self.current += 1;
                        if self.current >= self.children.len() {
                            self.current = 0;
                            self.state = NodeState::Idle;
                            return Status::Success;
                        }
                    }
                }
            }
        }
        // Every child already completed (or there were none).
        self.current = 0;
        self.state = NodeState::Idle;
        Status::Success
    }

    fn reset(&mut self) {
        self.state = NodeState::Idle;
        for (_, child) in &mut self.children {
            child.reset();
        }
        self.current = 0;
    }

    fn halt(&mut self) {
        self.state = NodeState::Halted;
        if self.current < self.children.len() {
            self.children[self.current].1.halt();
        }
        self.current = 0;
    }

    fn state(&self) -> NodeState {
        self.state
    }
}

/// Priority function evaluated per child on every tick.
pub type PriorityFn = Box<dyn Fn(&Blackboard) -> f64 + Send>;

/// Re-evaluates child priorities every tick and runs the winner; when the
/// winner changes mid-run, the previously running child is halted and reset
/// before the new one is ticked.
#[derive(Default)]
pub struct DynamicSelector {
    children: Vec<(PriorityFn, BoxNode)>,
    current: Option<usize>,
    state: NodeState,
}

impl DynamicSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_child(&mut self, priority: PriorityFn, child: BoxNode) {
        self.children.push((priority, child));
    }
}

impl Node for DynamicSelector {
    fn tick(&mut self, bb: &Blackboard) -> Status {
        if self.state == NodeState::Halted {
            return Status::Failure;
        }
        if self.children.is_empty() {
            return Status::Failure;
        }

        let mut best = 0;
        let mut best_priority = f64::NEG_INFINITY;
        for (index, (priority, _)) in self.children.iter().enumerate() {
            let value = priority(bb);
            if value > best_priority {
                best_priority = value;
                best = index;
            }
        }

        if let Some(current) = self.current {
            if current != best {
                tracing::trace!(from = current, to = best, "dynamic selector preempting child");
                self.children[current].1.halt();
                self.children[current].1.reset();
            }
        }
        self.current = Some(best);
        self.state = NodeState::Running;

        let status = self.children[best].1.tick(bb);
        if status != Status::Running {
            self.current = None;
            self.state = NodeState::Idle;
        }
        status
    }

    fn reset(&mut self) {
        self.state = NodeState::Idle;
        for (_, child) in &mut self.children {
            child.reset();
        }
        self.current = None;
    }

    fn halt(&mut self) {
        self.state = NodeState::Halted;
        if let Some(current) = self.current {
            self.children[current].1.halt();
        }
        self.current = None;
    }

    fn state(&self) -> NodeState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::testing::{CountingAction, StaticAction};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn conditional_picks_then_branch() {
        let (then_branch, then_count) = CountingAction::new(Status::Success);
        let (else_branch, else_count) = CountingAction::new(Status::Success);
        let mut cond = Conditional::new(
            |bb: &Blackboard| bb.get::<bool>("go").unwrap_or(false),
            Box::new(then_branch),
            Some(Box::new(else_branch)),
        );

        let bb = Blackboard::new();
        bb.set("go", true);
        assert_eq!(cond.tick(&bb), Status::Success);
        assert_eq!(then_count.get(), 1);
        assert_eq!(else_count.get(), 0);

        bb.set("go", false);
        assert_eq!(cond.tick(&bb), Status::Success);
        assert_eq!(else_count.get(), 1);
    }

    #[test]
    fn conditional_without_else_succeeds_on_false() {
        let mut cond = Conditional::new(
            |_: &Blackboard| false,
            Box::new(StaticAction::new(Status::Failure)),
            None,
        );
        assert_eq!(cond.tick(&Blackboard::new()), Status::Success);
    }

    #[test]
    fn conditional_holds_branch_while_running() {
        let (then_branch, _) = CountingAction::running_for(1, Status::Success);
        let mut cond = Conditional::new(
            |bb: &Blackboard| bb.get::<bool>("go").unwrap_or(false),
            Box::new(then_branch),
            Some(Box::new(StaticAction::new(Status::Failure))),
        );
        let bb = Blackboard::new();
        bb.set("go", true);
        assert_eq!(cond.tick(&bb), Status::Running);
        // Condition flips mid-run; the committed branch still finishes.
        bb.set("go", false);
        assert_eq!(cond.tick(&bb), Status::Success);
    }

    #[test]
    fn while_loops_until_condition_false() {
        let bb = Blackboard::new();
        bb.set("n", 0_i64);
        let (child, count) = CountingAction::new(Status::Success);
        // Condition reads the loop counter the child increments.
        let mut node = While::new(
            |bb: &Blackboard| bb.get::<i64>("n").unwrap_or(0) < 3,
            Box::new(Probe(Box::new(child))),
            None,
        );

        struct Probe(Box<dyn Node>);
        impl Node for Probe {
            fn tick(&mut self, bb: &Blackboard) -> Status {
                let n = bb.get::<i64>("n").unwrap_or(0);
                bb.set("n", n + 1);
                self.0.tick(bb)
            }
            fn reset(&mut self) {
                self.0.reset();
            }
            fn halt(&mut self) {
                self.0.halt();
            }
            fn state(&self) -> NodeState {
                self.0.state()
            }
        }

        assert_eq!(node.tick(&bb), Status::Success);
        assert_eq!(count.get(), 3);
    }

    #[test]
    fn while_respects_iteration_cap() {
        let (child, count) = CountingAction::new(Status::Success);
        let mut node = While::new(|_: &Blackboard| true, Box::new(child), Some(4));
        assert_eq!(node.tick(&Blackboard::new()), Status::Success);
        assert_eq!(count.get(), 4);
    }

    #[test]
    fn while_propagates_failure() {
        let mut node = While::new(
            |_: &Blackboard| true,
            Box::new(StaticAction::new(Status::Failure)),
            Some(10),
        );
        assert_eq!(node.tick(&Blackboard::new()), Status::Failure);
    }

    #[test]
    fn while_preserves_loop_state_across_running() {
        let (child, count) = CountingAction::running_for(1, Status::Success);
        let mut node = While::new(|_: &Blackboard| true, Box::new(child), Some(2));
        let bb = Blackboard::new();
        assert_eq!(node.tick(&bb), Status::Running); // iter 0 suspended
        assert_eq!(node.tick(&bb), Status::Running); // iter 0 done, iter 1 suspended
        assert_eq!(node.tick(&bb), Status::Success); // iter 1 done, cap reached
        assert_eq!(count.get(), 4);
    }

    #[test]
    fn for_runs_child_count_times() {
        let (child, count) = CountingAction::new(Status::Success);
        let mut node = For::new(5, Box::new(child));
        assert_eq!(node.tick(&Blackboard::new()), Status::Success);
        assert_eq!(count.get(), 5);
    }

    #[test]
    fn for_with_dynamic_count() {
        let (child, count) = CountingAction::new(Status::Success);
        let mut node = For::with_count_fn(
            |bb: &Blackboard| bb.get::<i64>("times").unwrap_or(0) as usize,
            Box::new(child),
        );
        let bb = Blackboard::new();
        bb.set("times", 2_i64);
        assert_eq!(node.tick(&bb), Status::Success);
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn switch_selects_matching_case() {
        let (case_a, count_a) = CountingAction::new(Status::Success);
        let (fallback, fallback_count) = CountingAction::new(Status::Failure);
        let mut node = Switch::new(|bb: &Blackboard| {
            bb.get::<String>("mode").unwrap_or_default()
        });
        node.add_case("attack", Box::new(case_a));
        node.set_default(Box::new(fallback));

        let bb = Blackboard::new();
        bb.set("mode", "attack".to_string());
        assert_eq!(node.tick(&bb), Status::Success);
        assert_eq!(count_a.get(), 1);

        bb.set("mode", "unknown".to_string());
        assert_eq!(node.tick(&bb), Status::Failure);
        assert_eq!(fallback_count.get(), 1);
    }

    #[test]
    fn switch_without_match_or_default_fails() {
        let mut node = Switch::new(|_: &Blackboard| "missing".to_string());
        node.add_case("present", Box::new(StaticAction::new(Status::Success)));
        assert_eq!(node.tick(&Blackboard::new()), Status::Failure);
    }

    #[test]
    fn conditional_sequence_fails_on_false_precondition() {
        let (second, second_count) = CountingAction::new(Status::Success);
        let mut node = ConditionalSequence::new();
        node.add_child(None, Box::new(StaticAction::new(Status::Success)));
        node.add_child(
            Some(Box::new(|_: &Blackboard| false)),
            Box::new(second),
        );
        assert_eq!(node.tick(&Blackboard::new()), Status::Failure);
        assert_eq!(second_count.get(), 0);
    }

    #[test]
    fn reactive_sequence_recheck_halts_running_child() {
        let (slow, _) = CountingAction::running_for(10, Status::Success);
        let halts = slow.halt_counter();
        let mut node = ReactiveSequence::new();
        node.add_child(
            Some(Box::new(|bb: &Blackboard| {
                bb.get::<bool>("safe").unwrap_or(true)
            })),
            Box::new(StaticAction::new(Status::Success)),
        );
        node.add_child(None, Box::new(slow));

        let bb = Blackboard::new();
        assert_eq!(node.tick(&bb), Status::Running);
        bb.set("safe", false);
        assert_eq!(node.tick(&bb), Status::Failure);
        assert_eq!(halts.get(), 1);
    }

    #[test]
    fn dynamic_selector_preempts_on_priority_change() {
        let (low, _) = CountingAction::running_for(10, Status::Success);
        let low_halts = low.halt_counter();
        let (high, high_count) = CountingAction::new(Status::Success);

        let mut node = DynamicSelector::new();
        node.add_child(
            Box::new(|bb: &Blackboard| bb.get::<f64>("low").unwrap_or(1.0)),
            Box::new(low),
        );
        node.add_child(
            Box::new(|bb: &Blackboard| bb.get::<f64>("high").unwrap_or(0.0)),
            Box::new(high),
        );

        let bb = Blackboard::new();
        assert_eq!(node.tick(&bb), Status::Running);
        bb.set("high", 5.0_f64);
        assert_eq!(node.tick(&bb), Status::Success);
        assert_eq!(low_halts.get(), 1);
        assert_eq!(high_count.get(), 1);
    }

    #[test]
    fn empty_dynamic_selector_fails() {
        let mut node = DynamicSelector::new();
        assert_eq!(node.tick(&Blackboard::new()), Status::Failure);
    }

    #[test]
    fn conditional_sequence_resumes_running_child() {
        let checks = Arc::new(AtomicUsize::new(0));
        let probe = Arc::clone(&checks);
        let (slow, _) = CountingAction::running_for(1, Status::Success);
        let mut node = ConditionalSequence::new();
        node.add_child(
            Some(Box::new(move |_: &Blackboard| {
                probe.fetch_add(1, Ordering::SeqCst);
                true
            })),
            Box::new(slow),
        );

        let bb = Blackboard::new();
        assert_eq!(node.tick(&bb), Status::Running);
        assert_eq!(node.tick(&bb), Status::Success);
        // Precondition re-checked each tick while its own child is current.
        assert_eq!(checks.load(Ordering::SeqCst), 2);
    }
}
