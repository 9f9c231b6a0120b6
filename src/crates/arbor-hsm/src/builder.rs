//! Fluent machine construction.
//!
//! States are created on first mention; lifecycle callbacks apply to the
//! most recently named state, and `with_*` modifiers to the most recently
//! added transition. Validation failures (bad probability/weight, modifier
//! with nothing to modify) are remembered and surfaced at
//! [`MachineBuilder::build`], which also rejects a machine without an
//! initial state.
//!
//! ```rust
//! use arbor_hsm::MachineBuilder;
//! use arbor_runtime::Blackboard;
//!
//! let mut machine = MachineBuilder::new()
//!     .initial("patrol")
//!     .state("patrol")
//!     .transition_to("chase", |bb: &Blackboard| {
//!         bb.get::<bool>("enemy_visible").unwrap_or(false)
//!     })
//!     .state("chase")
//!     .build()
//!     .expect("valid machine");
//!
//! machine.tick().unwrap();
//! assert_eq!(machine.current_state_name(), Some("patrol"));
//! ```

use crate::composite::CompositeState;
use crate::error::MachineError;
use crate::machine::{StateMachine, StateNode};
use crate::state::State;
use crate::transition::Transition;
use arbor_runtime::{Blackboard, Clock};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Fluent builder for [`StateMachine`].
#[derive(Default)]
pub struct MachineBuilder {
    states: HashMap<String, StateNode>,
    // Insertion order, so machines assemble deterministically.
    order: Vec<String>,
    transitions: Vec<Transition>,
    initial: Option<String>,
    cursor: Option<String>,
    error: Option<MachineError>,
    rng_seed: Option<u64>,
    clock: Option<Arc<dyn Clock>>,
}

impl MachineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn fail(&mut self, error: MachineError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    fn ensure_state(&mut self, name: &str) {
        if !self.states.contains_key(name) {
            self.states
                .insert(name.to_string(), StateNode::Simple(State::new(name)));
            self.order.push(name.to_string());
        }
    }

    fn misuse(&mut self, what: &str) {
        self.fail(MachineError::BuilderMisuse(what.to_string()));
    }

    fn cursor_state(&mut self) -> Option<&mut StateNode> {
        let cursor = self.cursor.clone()?;
        self.states.get_mut(&cursor)
    }

    fn modify_last_transition(
        &mut self,
        what: &str,
        apply: impl FnOnce(Transition) -> Result<Transition, MachineError>,
    ) {
        match self.transitions.pop() {
            Some(transition) => match apply(transition) {
                Ok(transition) => self.transitions.push(transition),
                Err(error) => self.fail(error),
            },
            None => self.misuse(&format!("{what} requires a preceding transition")),
        }
    }

    // ---- states ----------------------------------------------------------

    /// Name (and create, if new) a state and make it the cursor for
    /// subsequent callbacks and transitions.
    pub fn state(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.ensure_state(&name);
        self.cursor = Some(name);
        self
    }

    /// Add a fully built composite state and make it the cursor.
    pub fn composite_state(mut self, composite: CompositeState) -> Self {
        let name = composite.name().to_string();
        if !self.states.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.states
            .insert(name.clone(), StateNode::Composite(composite));
        self.cursor = Some(name);
        self
    }

    pub fn initial(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.ensure_state(&name);
        self.initial = Some(name);
        self
    }

    // ---- lifecycle callbacks ---------------------------------------------

    pub fn on_enter<F>(mut self, enter: F) -> Self
    where
        F: FnMut(&Blackboard) + Send + 'static,
    {
        match self.cursor_state() {
            Some(node) => node.base_mut().set_enter(Box::new(enter)),
            None => self.misuse("on_enter requires a current state"),
        }
        self
    }

    pub fn on_update<F>(mut self, update: F) -> Self
    where
        F: FnMut(&Blackboard) + Send + 'static,
    {
        match self.cursor_state() {
            Some(node) => node.base_mut().set_update(Box::new(update)),
            None => self.misuse("on_update requires a current state"),
        }
        self
    }

    pub fn on_exit<F>(mut self, exit: F) -> Self
    where
        F: FnMut(&Blackboard) + Send + 'static,
    {
        match self.cursor_state() {
            Some(node) => node.base_mut().set_exit(Box::new(exit)),
            None => self.misuse("on_exit requires a current state"),
        }
        self
    }

    pub fn on_guard<F>(mut self, guard: F) -> Self
    where
        F: FnMut(&Blackboard) -> bool + Send + 'static,
    {
        match self.cursor_state() {
            Some(node) => node.base_mut().set_guard(Box::new(guard)),
            None => self.misuse("on_guard requires a current state"),
        }
        self
    }

    // ---- transitions -----------------------------------------------------

    /// Conditional transition from the cursor state.
    pub fn transition_to<F>(mut self, target: impl Into<String>, condition: F) -> Self
    where
        F: FnMut(&Blackboard) -> bool + Send + 'static,
    {
        let target = target.into();
        let Some(from) = self.cursor.clone() else {
            self.misuse("transition_to requires a current state");
            return self;
        };
        self.ensure_state(&target);
        self.transitions
            .push(Transition::new(from, target, Some(Box::new(condition))));
        self
    }

    /// Unconditional transition from the cursor state. Useful as the base
    /// of weighted/probabilistic edges, where the draw is the filter.
    pub fn transition_always(mut self, target: impl Into<String>) -> Self {
        let target = target.into();
        let Some(from) = self.cursor.clone() else {
            self.misuse("transition_always requires a current state");
            return self;
        };
        self.ensure_state(&target);
        self.transitions.push(Transition::new(from, target, None));
        self
    }

    /// Timed transition: fires once the cursor state has been active for
    /// `duration`.
    pub fn transition_to_after(mut self, target: impl Into<String>, duration: Duration) -> Self {
        let target = target.into();
        let Some(from) = self.cursor.clone() else {
            self.misuse("transition_to_after requires a current state");
            return self;
        };
        self.ensure_state(&target);
        self.transitions
            .push(Transition::new(from, target, None).after(duration));
        self
    }

    /// Timed transition that additionally requires `condition` once the
    /// window has elapsed.
    pub fn transition_to_after_if<F>(
        mut self,
        target: impl Into<String>,
        duration: Duration,
        condition: F,
    ) -> Self
    where
        F: FnMut(&Blackboard) -> bool + Send + 'static,
    {
        let target = target.into();
        let Some(from) = self.cursor.clone() else {
            self.misuse("transition_to_after_if requires a current state");
            return self;
        };
        self.ensure_state(&target);
        self.transitions.push(
            Transition::new(from, target, Some(Box::new(condition))).after(duration),
        );
        self
    }

    /// Document a deliberately ignored event on the cursor state.
    pub fn ignore_event(mut self) -> Self {
        let Some(from) = self.cursor.clone() else {
            self.misuse("ignore_event requires a current state");
            return self;
        };
        self.transitions.push(Transition::ignored(from));
        self
    }

    /// Assert that the cursor state is unreachable at tick time: ticking a
    /// machine sitting in it is a defect.
    pub fn cannot_happen(mut self) -> Self {
        let Some(from) = self.cursor.clone() else {
            self.misuse("cannot_happen requires a current state");
            return self;
        };
        self.transitions.push(Transition::cannot_happen(from, None));
        self
    }

    /// Assert that the cursor state should never see `condition` hold.
    pub fn cannot_happen_when<F>(mut self, condition: F) -> Self
    where
        F: FnMut(&Blackboard) -> bool + Send + 'static,
    {
        let Some(from) = self.cursor.clone() else {
            self.misuse("cannot_happen_when requires a current state");
            return self;
        };
        self.transitions
            .push(Transition::cannot_happen(from, Some(Box::new(condition))));
        self
    }

    // ---- transition modifiers --------------------------------------------

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.modify_last_transition("with_priority", |t| Ok(t.with_priority(priority)));
        self
    }

    pub fn with_action<F>(mut self, action: F) -> Self
    where
        F: FnMut(&Blackboard) + Send + 'static,
    {
        self.modify_last_transition("with_action", |t| Ok(t.with_action(action)));
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.modify_last_transition("with_weight", |t| t.with_weight(weight));
        self
    }

    pub fn with_probability(mut self, probability: f64) -> Self {
        self.modify_last_transition("with_probability", |t| t.with_probability(probability));
        self
    }

    // ---- composite conveniences ------------------------------------------

    /// Add an orthogonal region to the cursor composite state.
    pub fn region(mut self, name: impl Into<String>, machine: StateMachine) -> Self {
        match self.cursor_state() {
            Some(StateNode::Composite(composite)) => composite.add_region(name, machine),
            Some(_) => self.misuse("region requires a composite cursor state"),
            None => self.misuse("region requires a current state"),
        }
        self
    }

    /// Name an entry point on the cursor composite state.
    pub fn entry_point(
        mut self,
        name: impl Into<String>,
        target_substate: impl Into<String>,
    ) -> Self {
        match self.cursor_state() {
            Some(StateNode::Composite(composite)) => {
                composite.add_entry_point(name, target_substate)
            }
            Some(_) => self.misuse("entry_point requires a composite cursor state"),
            None => self.misuse("entry_point requires a current state"),
        }
        self
    }

    /// Name an exit point on the cursor composite state.
    pub fn exit_point(mut self, name: impl Into<String>) -> Self {
        match self.cursor_state() {
            Some(StateNode::Composite(composite)) => composite.add_exit_point(name),
            Some(_) => self.misuse("exit_point requires a composite cursor state"),
            None => self.misuse("exit_point requires a current state"),
        }
        self
    }

    // ---- machine knobs ---------------------------------------------------

    pub fn rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    // ---- finish ----------------------------------------------------------

    pub fn build(mut self) -> Result<StateMachine, MachineError> {
        if let Some(error) = self.error.take() {
            return Err(error);
        }
        let initial = self.initial.take().ok_or(MachineError::NoInitialState)?;

        let mut machine = StateMachine::new();
        if let Some(seed) = self.rng_seed {
            machine.set_rng_seed(seed);
        }
        if let Some(clock) = self.clock.take() {
            machine.set_clock(clock);
        }
        for name in self.order.drain(..) {
            if let Some(node) = self.states.remove(&name) {
                match node {
                    StateNode::Simple(state) => machine.add_state(state),
                    StateNode::Composite(composite) => machine.add_composite_state(composite),
                }
            }
        }
        for transition in self.transitions.drain(..) {
            machine.add_transition(transition)?;
        }
        machine.set_initial_state(&initial)?;
        Ok(machine)
    }
}
