//! Parallel composite with policy or threshold aggregation.

use crate::error::BuildError;
use crate::node::{BoxNode, Node};
use crate::status::{NodeState, Status};
use arbor_runtime::{Blackboard, Executor, InlineExecutor};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Aggregation policy for [`Parallel`] in policy form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParallelPolicy {
    RequireAll,
    RequireOne,
}

enum Mode {
    Policies {
        success: ParallelPolicy,
        failure: ParallelPolicy,
    },
    Thresholds {
        success: usize,
        failure: Option<usize>,
    },
}

/// Ticks every non-terminal child each tick and aggregates.
///
/// Constructed either with a `(success, failure)` policy pair or with an
/// explicit success threshold `k` (plus optional failure threshold); the two
/// forms are mutually exclusive by construction. Terminal child results are
/// memoised, so a finished child is not re-ticked while its siblings catch
/// up. Children run through the injected [`Executor`]
/// ([`InlineExecutor`] by default); early-stop halts children that are still
/// running once the aggregate outcome is decided.
///
/// Sibling blackboard writes within one parent tick carry no ordering
/// guarantee.
pub struct Parallel {
    children: Vec<Mutex<BoxNode>>,
    results: Vec<Mutex<Status>>,
    mode: Mode,
    executor: Arc<dyn Executor>,
    state: NodeState,
}

impl Parallel {
    /// Policy form: success and failure each require one or all children.
    pub fn with_policies(success: ParallelPolicy, failure: ParallelPolicy) -> Self {
        Self {
            children: Vec::new(),
            results: Vec::new(),
            mode: Mode::Policies { success, failure },
            executor: Arc::new(InlineExecutor),
            state: NodeState::Idle,
        }
    }

    /// Threshold form: succeed at `success` successes, fail at `failure`
    /// failures (all children, when absent). Zero thresholds are rejected.
    pub fn with_thresholds(success: usize, failure: Option<usize>) -> Result<Self, BuildError> {
        if success == 0 {
            return Err(BuildError::ZeroThreshold { kind: "success" });
        }
        if failure == Some(0) {
            return Err(BuildError::ZeroThreshold { kind: "failure" });
        }
        Ok(Self {
            children: Vec::new(),
            results: Vec::new(),
            mode: Mode::Thresholds { success, failure },
            executor: Arc::new(InlineExecutor),
            state: NodeState::Idle,
        })
    }

    pub fn add_child(&mut self, child: BoxNode) {
        self.children.push(Mutex::new(child));
        self.results.push(Mutex::new(Status::Idle));
    }

    pub fn set_executor(&mut self, executor: Arc<dyn Executor>) {
        self.executor = executor;
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    fn success_satisfied(&self, successes: usize) -> bool {
        match &self.mode {
            Mode::Policies { success, .. } => match success {
                ParallelPolicy::RequireAll => successes == self.children.len(),
                ParallelPolicy::RequireOne => successes > 0,
            },
            Mode::Thresholds { success, .. } => successes >= *success,
        }
    }

    fn failure_satisfied(&self, failures: usize) -> bool {
        match &self.mode {
            Mode::Policies { failure, .. } => match failure {
                ParallelPolicy::RequireAll => failures == self.children.len(),
                ParallelPolicy::RequireOne => failures > 0,
            },
            Mode::Thresholds { failure, .. } => match failure {
                Some(m) => failures >= *m,
                None => failures == self.children.len(),
            },
        }
    }

    fn success_still_possible(&self, successes: usize, unresolved: usize) -> bool {
        match &self.mode {
            Mode::Policies { .. } => true,
            Mode::Thresholds { success, .. } => successes + unresolved >= *success,
        }
    }

    fn halt_running_children(&mut self) {
        for (child, result) in self.children.iter_mut().zip(self.results.iter_mut()) {
            let slot = result.get_mut();
            if *slot == Status::Running {
                child.get_mut().halt();
                *slot = Status::Idle;
            }
        }
    }

    fn finish(&mut self, outcome: Status) -> Status {
        tracing::debug!(?outcome, "parallel composite resolved, halting stragglers");
        self.halt_running_children();
        self.reset();
        outcome
    }
}

impl Node for Parallel {
    fn tick(&mut self, bb: &Blackboard) -> Status {
        if self.state == NodeState::Halted {
            return Status::Failure;
        }
        if self.children.is_empty() {
            return Status::Success;
        }
        self.state = NodeState::Running;

        let total = self.children.len();
        // Seed counters with results memoised from earlier ticks.
        let (seed_succ, seed_fail) =
            self.results
                .iter_mut()
                .fold((0usize, 0usize), |(s, f), slot| match *slot.get_mut() {
                    Status::Success => (s + 1, f),
                    Status::Failure => (s, f + 1),
                    _ => (s, f),
                });
        let successes = AtomicUsize::new(seed_succ);
        let failures = AtomicUsize::new(seed_fail);
        let stop = AtomicBool::new(false);

        {
            let children = &self.children;
            let results = &self.results;
            let mode = &self.mode;
            self.executor.bulk_early_stop(total, &stop, &|i| {
                if results[i].lock().is_terminal() {
                    return true;
                }
                let status = children[i].lock().tick(bb);
                *results[i].lock() = status;
                match status {
                    Status::Success => {
                        successes.fetch_add(1, Ordering::SeqCst);
                    }
                    Status::Failure => {
                        failures.fetch_add(1, Ordering::SeqCst);
                    }
                    _ => {}
                }

                let s = successes.load(Ordering::SeqCst);
                let f = failures.load(Ordering::SeqCst);
                match mode {
                    Mode::Policies { success, failure } => {
                        if *success == ParallelPolicy::RequireOne && status == Status::Success {
                            return false;
                        }
                        // One failure makes an all-success outcome impossible.
                        if *success == ParallelPolicy::RequireAll && status == Status::Failure {
                            return false;
                        }
                        if *failure == ParallelPolicy::RequireOne && status == Status::Failure {
                            return false;
                        }
                    }
                    Mode::Thresholds { success, failure } => {
                        let unresolved = total - (s + f);
                        if s >= *success || s + unresolved < *success {
                            return false;
                        }
                        if let Some(m) = failure {
                            if f >= *m {
                                return false;
                            }
                        }
                    }
                }
                true
            });
        }

        let mut succ = 0;
        let mut fail = 0;
        for slot in self.results.iter_mut() {
            match *slot.get_mut() {
                Status::Success => succ += 1,
                Status::Failure => fail += 1,
                _ => {}
            }
        }

        if self.success_satisfied(succ) {
            return self.finish(Status::Success);
        }
        if self.failure_satisfied(fail) {
            return self.finish(Status::Failure);
        }
        let unresolved = self.children.len() - succ - fail;
        if !self.success_still_possible(succ, unresolved) {
            return self.finish(Status::Failure);
        }
        Status::Running
    }

    fn reset(&mut self) {
        self.state = NodeState::Idle;
        for (child, result) in self.children.iter_mut().zip(self.results.iter_mut()) {
            child.get_mut().reset();
            *result.get_mut() = Status::Idle;
        }
    }

    fn halt(&mut self) {
        self.state = NodeState::Halted;
        for (child, result) in self.children.iter_mut().zip(self.results.iter_mut()) {
            child.get_mut().halt();
            *result.get_mut() = Status::Idle;
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
    fn empty_parallel_succeeds() {
        let mut par =
            Parallel::with_policies(ParallelPolicy::RequireAll, ParallelPolicy::RequireOne);
        assert_eq!(par.tick(&Blackboard::new()), Status::Success);
    }

    #[test]
    fn zero_thresholds_are_rejected() {
        assert!(matches!(
            Parallel::with_thresholds(0, None),
            Err(BuildError::ZeroThreshold { kind: "success" })
        ));
        assert!(matches!(
            Parallel::with_thresholds(1, Some(0)),
            Err(BuildError::ZeroThreshold { kind: "failure" })
        ));
    }

    #[test]
    fn require_one_success_halts_running_siblings() {
        let (slow, _) = CountingAction::running_for(10, Status::Failure);
        let halts = slow.halt_counter();
        let mut par =
            Parallel::with_policies(ParallelPolicy::RequireOne, ParallelPolicy::RequireAll);
        par.add_child(Box::new(slow));
        par.add_child(Box::new(StaticAction::new(Status::Success)));

        assert_eq!(par.tick(&Blackboard::new()), Status::Success);
        assert_eq!(halts.get(), 1);
    }

    #[test]
    fn require_all_failure_needs_every_child() {
        let mut par =
            Parallel::with_policies(ParallelPolicy::RequireOne, ParallelPolicy::RequireAll);
        par.add_child(Box::new(StaticAction::new(Status::Failure)));
        par.add_child(Box::new(StaticAction::new(Status::Failure)));
        assert_eq!(par.tick(&Blackboard::new()), Status::Failure);
    }

    #[test]
    fn threshold_success_on_kth_success() {
        let (slow, _) = CountingAction::running_for(5, Status::Success);
        let mut par = Parallel::with_thresholds(2, None).unwrap();
        par.add_child(Box::new(StaticAction::new(Status::Success)));
        par.add_child(Box::new(slow));
        par.add_child(Box::new(StaticAction::new(Status::Success)));

        assert_eq!(par.tick(&Blackboard::new()), Status::Success);
    }

    #[test]
    fn threshold_fails_once_success_is_impossible() {
        // k = 3 with only two children can never succeed.
        let (a, _) = CountingAction::running_for(10, Status::Success);
        let (b, _) = CountingAction::running_for(10, Status::Success);
        let mut par = Parallel::with_thresholds(3, None).unwrap();
        par.add_child(Box::new(a));
        par.add_child(Box::new(b));

        assert_eq!(par.tick(&Blackboard::new()), Status::Failure);
    }

    #[test]
    fn terminal_children_are_not_reticked() {
        let (fast, fast_count) = CountingAction::new(Status::Success);
        let (slow, _) = CountingAction::running_for(2, Status::Success);
        let mut par = Parallel::with_policies(
            ParallelPolicy::RequireAll,
            ParallelPolicy::RequireOne,
        );
        par.add_child(Box::new(fast));
        par.add_child(Box::new(slow));

        let bb = Blackboard::new();
        assert_eq!(par.tick(&bb), Status::Running);
        assert_eq!(par.tick(&bb), Status::Running);
        assert_eq!(par.tick(&bb), Status::Success);
        assert_eq!(fast_count.get(), 1);
    }

    #[test]
    fn explicit_failure_threshold() {
        let (slow, _) = CountingAction::running_for(10, Status::Success);
        let mut par = Parallel::with_thresholds(3, Some(1)).unwrap();
        par.add_child(Box::new(slow));
        par.add_child(Box::new(StaticAction::new(Status::Failure)));
        par.add_child(Box::new(StaticAction::new(Status::Success)));

        assert_eq!(par.tick(&Blackboard::new()), Status::Failure);
    }
}
