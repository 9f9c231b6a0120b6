//! Stochastic and utility-driven composites.
//!
//! All randomness flows through a seedable RNG (`StdRng`) so tests can pin
//! outcomes with [`with_seed`](RandomSelector::with_seed)-style
//! constructors.

use crate::node::{BoxNode, Node};
use crate::status::{NodeState, Status};
use arbor_runtime::Blackboard;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Utility (or weight) function evaluated against the blackboard.
pub type UtilityFn = Box<dyn Fn(&Blackboard) -> f64 + Send>;

/// Picks a child uniformly at random when entered and runs it to a
/// terminal status.
pub struct RandomSelector {
    children: Vec<BoxNode>,
    current: Option<usize>,
    rng: StdRng,
    state: NodeState,
}

impl Default for RandomSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomSelector {
    pub fn new() -> Self {
        Self {
            children: Vec::new(),
            current: None,
            rng: StdRng::from_entropy(),
            state: NodeState::Idle,
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            ..Self::new()
        }
    }

    pub fn add_child(&mut self, child: BoxNode) {
        self.children.push(child);
    }
}

impl Node for RandomSelector {
    fn tick(&mut self, bb: &Blackboard) -> Status {
        if self.state == NodeState::Halted {
            return Status::Failure;
        }
        if self.children.is_empty() {
            return Status::Failure;
        }
        let index = match self.current {
            Some(index) => index,
            None => {
                let index = self.rng.gen_range(0..self.children.len());
                self.current = Some(index);
                index
            }
        };
        self.state = NodeState::Running;

        let status = self.children[index].tick(bb);
        if status != Status::Running {
            self.current = None;
            self.state = NodeState::Idle;
        }
        status
    }

    fn reset(&mut self) {
        self.state = NodeState::Idle;
        for child in &mut self.children {
            child.reset();
        }
        self.current = None;
    }

    fn halt(&mut self) {
        self.state = NodeState::Halted;
        for child in &mut self.children {
            child.halt();
        }
        self.current = None;
    }

    fn state(&self) -> NodeState {
        self.state
    }
}

/// Each child carries a fixed selection probability; a draw proportional to
/// those probabilities picks the child when the node is entered. Zero total
/// probability fails the tick.
pub struct ProbabilitySelector {
    children: Vec<(f64, BoxNode)>,
    current: Option<usize>,
    rng: StdRng,
    state: NodeState,
}

impl Default for ProbabilitySelector {
    fn default() -> Self {
        Self::new()
    }
}

impl ProbabilitySelector {
    pub fn new() -> Self {
        Self {
            children: Vec::new(),
            current: None,
            rng: StdRng::from_entropy(),
            state: NodeState::Idle,
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            ..Self::new()
        }
    }

    pub fn add_child(&mut self, probability: f64, child: BoxNode) {
        self.children.push((probability.max(0.0), child));
    }

    fn draw(&mut self) -> Option<usize> {
        let total: f64 = self.children.iter().map(|(p, _)| *p).sum();
        if total <= 0.0 {
            return None;
        }
        let roll = self.rng.gen::<f64>() * total;
        let mut acc = 0.0;
        for (index, (probability, _)) in self.children.iter().enumerate() {
            acc += probability;
            if roll <= acc {
                return Some(index);
            }
        }
        Some(self.children.len() - 1)
    }
}

impl Node for ProbabilitySelector {
    fn tick(&mut self, bb: &Blackboard) -> Status {
        if self.state == NodeState::Halted {
            return Status::Failure;
        }
        if self.children.is_empty() {
            return Status::Failure;
        }
        let index = match self.current {
            Some(index) => index,
            None => match self.draw() {
                Some(index) => {
                    self.current = Some(index);
                    index
                }
                None => return Status::Failure,
            },
        };
        self.state = NodeState::Running;

        let status = self.children[index].1.tick(bb);
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
        for (_, child) in &mut self.children {
            child.halt();
        }
        self.current = None;
    }

    fn state(&self) -> NodeState {
        self.state
    }
}

/// Evaluates every child's utility each tick and runs the highest scorer,
/// halting the previously running child when the winner changes.
#[derive(Default)]
pub struct UtilitySelector {
    children: Vec<(UtilityFn, BoxNode)>,
    current: Option<usize>,
    state: NodeState,
}

impl UtilitySelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_child(&mut self, utility: UtilityFn, child: BoxNode) {
        self.children.push((utility, child));
    }
}

impl Node for UtilitySelector {
    fn tick(&mut self, bb: &Blackboard) -> Status {
        if self.state == NodeState::Halted {
            return Status::Failure;
        }
        if self.children.is_empty() {
            return Status::Failure;
        }

        let mut best = 0;
        let mut best_utility = f64::NEG_INFINITY;
        for (index, (utility, _)) in self.children.iter().enumerate() {
            let value = utility(bb);
            if value > best_utility {
                best_utility = value;
                best = index;
            }
        }

        if let Some(current) = self.current {
            if current != best {
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
        for (_, child) in &mut self.children {
            child.halt();
        }
        self.current = None;
    }

    fn state(&self) -> NodeState {
        self.state
    }
}

/// Draws a child with probability proportional to its weight function when
/// entered, then runs it to a terminal status. Non-positive total weight
/// fails the tick.
pub struct WeightedRandomSelector {
    children: Vec<(UtilityFn, BoxNode)>,
    current: Option<usize>,
    rng: StdRng,
    state: NodeState,
}

impl Default for WeightedRandomSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl WeightedRandomSelector {
    pub fn new() -> Self {
        Self {
            children: Vec::new(),
            current: None,
            rng: StdRng::from_entropy(),
            state: NodeState::Idle,
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            ..Self::new()
        }
    }

    pub fn add_child(&mut self, weight: UtilityFn, child: BoxNode) {
        self.children.push((weight, child));
    }
}

impl Node for WeightedRandomSelector {
    fn tick(&mut self, bb: &Blackboard) -> Status {
        if self.state == NodeState::Halted {
            return Status::Failure;
        }
        if self.children.is_empty() {
            return Status::Failure;
        }
        let index = match self.current {
            Some(index) => index,
            None => {
                let weights: Vec<f64> = self
                    .children
                    .iter()
                    .map(|(weight, _)| weight(bb).max(0.0))
                    .collect();
                let total: f64 = weights.iter().sum();
                if total <= 0.0 {
                    return Status::Failure;
                }
                let roll = self.rng.gen::<f64>() * total;
                let mut acc = 0.0;
                let mut chosen = self.children.len() - 1;
                for (i, weight) in weights.iter().enumerate() {
                    acc += weight;
                    if roll <= acc {
                        chosen = i;
                        break;
                    }
                }
                self.current = Some(chosen);
                chosen
            }
        };
        self.state = NodeState::Running;

        let status = self.children[index].1.tick(bb);
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
        for (_, child) in &mut self.children {
            child.halt();
        }
        self.current = None;
    }

    fn state(&self) -> NodeState {
        self.state
    }
}

/// Sequence in which every child runs to a terminal status exactly once
/// over the node's lifetime; completed children are skipped on later ticks.
///
/// `reset` clears episode state but deliberately keeps the executed set;
/// [`clear_execution_history`](OneShotSequence::clear_execution_history)
/// re-arms the children.
#[derive(Default)]
pub struct OneShotSequence {
    children: Vec<BoxNode>,
    executed: Vec<bool>,
    state: NodeState,
}

impl OneShotSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_child(&mut self, child: BoxNode) {
        self.children.push(child);
        self.executed.push(false);
    }

    pub fn clear_execution_history(&mut self) {
        for flag in &mut self.executed {
            *flag = false;
        }
        for child in &mut self.children {
            child.reset();
        }
    }
}

impl Node for OneShotSequence {
    fn tick(&mut self, bb: &Blackboard) -> Status {
        if self.state == NodeState::Halted {
            return Status::Failure;
        }
        self.state = NodeState::Running;

        for index in 0..self.children.len() {
            if self.executed[index] {
                continue;
            }
            match self.children[index].tick(bb) {
                Status::Running => return Status::Running,
                Status::Failure => {
                    self.executed[index] = true;
                    self.state = NodeState::Idle;
                    return Status::Failure;
                }
                _ => self.executed[index] = true,
            }
        }
        self.state = NodeState::Idle;
        Status::Success
    }

    fn reset(&mut self) {
        self.state = NodeState::Idle;
        for child in &mut self.children {
            child.reset();
        }
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
    fn random_selector_runs_exactly_one_child() {
        let (a, count_a) = CountingAction::new(Status::Success);
        let (b, count_b) = CountingAction::new(Status::Success);
        let mut node = RandomSelector::with_seed(7);
        node.add_child(Box::new(a));
        node.add_child(Box::new(b));

        assert_eq!(node.tick(&Blackboard::new()), Status::Success);
        assert_eq!(count_a.get() + count_b.get(), 1);
    }

    #[test]
    fn probability_selector_zero_total_fails() {
        let mut node = ProbabilitySelector::with_seed(1);
        node.add_child(0.0, Box::new(StaticAction::new(Status::Success)));
        assert_eq!(node.tick(&Blackboard::new()), Status::Failure);
    }

    #[test]
    fn probability_selector_respects_weights_roughly() {
        let mut heavy = 0;
        for seed in 0..200 {
            let (a, count_a) = CountingAction::new(Status::Success);
            let (b, _) = CountingAction::new(Status::Success);
            let mut node = ProbabilitySelector::with_seed(seed);
            node.add_child(0.9, Box::new(a));
            node.add_child(0.1, Box::new(b));
            node.tick(&Blackboard::new());
            if count_a.get() == 1 {
                heavy += 1;
            }
        }
        // ~90% of draws should land on the heavy child.
        assert!(heavy > 150, "heavy child picked only {heavy}/200 times");
    }

    #[test]
    fn utility_selector_runs_highest_utility() {
        let (low, low_count) = CountingAction::new(Status::Success);
        let (high, high_count) = CountingAction::new(Status::Success);
        let mut node = UtilitySelector::new();
        node.add_child(Box::new(|_: &Blackboard| 0.2), Box::new(low));
        node.add_child(Box::new(|_: &Blackboard| 0.8), Box::new(high));

        assert_eq!(node.tick(&Blackboard::new()), Status::Success);
        assert_eq!(low_count.get(), 0);
        assert_eq!(high_count.get(), 1);
    }

    #[test]
    fn weighted_random_selector_zero_weight_fails() {
        let mut node = WeightedRandomSelector::with_seed(3);
        node.add_child(
            Box::new(|_: &Blackboard| 0.0),
            Box::new(StaticAction::new(Status::Success)),
        );
        assert_eq!(node.tick(&Blackboard::new()), Status::Failure);
    }

    #[test]
    fn one_shot_children_run_once_across_ticks() {
        let (a, count_a) = CountingAction::new(Status::Success);
        let (b, count_b) = CountingAction::new(Status::Success);
        let mut node = OneShotSequence::new();
        node.add_child(Box::new(a));
        node.add_child(Box::new(b));

        let bb = Blackboard::new();
        assert_eq!(node.tick(&bb), Status::Success);
        assert_eq!(node.tick(&bb), Status::Success);
        assert_eq!(count_a.get(), 1);
        assert_eq!(count_b.get(), 1);

        node.clear_execution_history();
        assert_eq!(node.tick(&bb), Status::Success);
        assert_eq!(count_a.get(), 2);
    }
}
