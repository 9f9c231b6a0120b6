//! The state machine: dispatch, transition selection, history, debugging.

use crate::composite::CompositeState;
use crate::debug::{DebugCallback, DebugEvent, DebugInfo, TransitionRecord};
use crate::error::MachineError;
use crate::state::State;
use crate::transition::{Transition, TransitionKind};
use arbor_runtime::{clock, Blackboard, Clock};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use uuid::Uuid;

const MAX_STATE_HISTORY: usize = 100;
const MAX_TRANSITION_HISTORY: usize = 1000;

/// A state slot: either a leaf state or a composite with inner machinery.
pub(crate) enum StateNode {
    Simple(State),
    Composite(CompositeState),
}

impl StateNode {
    pub(crate) fn name(&self) -> &str {
        match self {
            StateNode::Simple(state) => state.name(),
            StateNode::Composite(composite) => composite.name(),
        }
    }

    pub(crate) fn base_mut(&mut self) -> &mut State {
        match self {
            StateNode::Simple(state) => state,
            StateNode::Composite(composite) => composite.base_mut(),
        }
    }

    pub(crate) fn check_guard(&mut self, bb: &Blackboard) -> bool {
        match self {
            StateNode::Simple(state) => state.check_guard(bb),
            StateNode::Composite(composite) => composite.check_guard(bb),
        }
    }

    pub(crate) fn enter(&mut self, bb: &Blackboard) -> Result<(), MachineError> {
        match self {
            StateNode::Simple(state) => {
                state.run_enter(bb);
                Ok(())
            }
            StateNode::Composite(composite) => composite.handle_enter(bb),
        }
    }

    pub(crate) fn update(&mut self, bb: &Blackboard) -> Result<(), MachineError> {
        match self {
            StateNode::Simple(state) => {
                state.run_update(bb);
                Ok(())
            }
            StateNode::Composite(composite) => composite.handle_update(bb),
        }
    }

    pub(crate) fn exit(&mut self, bb: &Blackboard) {
        match self {
            StateNode::Simple(state) => state.run_exit(bb),
            StateNode::Composite(composite) => composite.handle_exit(bb),
        }
    }
}

/// Hierarchical state machine.
///
/// States are name-keyed and owned by the machine; transitions reference
/// them by name. One [`tick`](StateMachine::tick) runs the current state's
/// update, walks outgoing transitions in descending priority, and fires at
/// most one of them. Plain conditional transitions beat the
/// weighted/probabilistic pool; the pool resolves by a Bernoulli filter on
/// each candidate's probability followed by a single weight-proportional
/// draw.
///
/// The target's guard runs *before* the source's exit: a rejected guard
/// cancels the whole transition and the machine stays where it was.
pub struct StateMachine {
    id: Uuid,
    states: HashMap<String, StateNode>,
    transitions: Vec<Transition>,
    initial: Option<String>,
    current: Option<String>,
    previous: Option<String>,
    blackboard: Blackboard,
    state_history: VecDeque<String>,
    transition_history: VecDeque<TransitionRecord>,
    track_transitions: bool,
    debug: Option<DebugCallback>,
    clock: Arc<dyn Clock>,
    rng: StdRng,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            states: HashMap::new(),
            transitions: Vec::new(),
            initial: None,
            current: None,
            previous: None,
            blackboard: Blackboard::new(),
            state_history: VecDeque::new(),
            transition_history: VecDeque::new(),
            track_transitions: false,
            debug: None,
            clock: clock::monotonic(),
            rng: StdRng::from_entropy(),
        }
    }

    // ---- construction ---------------------------------------------------

    pub fn add_state(&mut self, state: State) {
        self.states
            .insert(state.name().to_string(), StateNode::Simple(state));
    }

    pub fn add_composite_state(&mut self, composite: CompositeState) {
        self.states
            .insert(composite.name().to_string(), StateNode::Composite(composite));
    }

    /// Register a transition; both endpoints must already exist.
    pub fn add_transition(&mut self, transition: Transition) -> Result<(), MachineError> {
        if !self.states.contains_key(transition.from()) {
            return Err(MachineError::UnknownState(transition.from().to_string()));
        }
        if let Some(to) = transition.to() {
            if !self.states.contains_key(to) {
                return Err(MachineError::UnknownState(to.to_string()));
            }
        }
        self.transitions.push(transition);
        Ok(())
    }

    pub fn set_initial_state(&mut self, name: &str) -> Result<(), MachineError> {
        if !self.states.contains_key(name) {
            return Err(MachineError::UnknownState(name.to_string()));
        }
        self.initial = Some(name.to_string());
        Ok(())
    }

    /// Seed the RNG behind weighted/probabilistic selection (tests).
    pub fn set_rng_seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Replace the clock behind timed transitions (tests use
    /// [`arbor_runtime::ManualClock`]).
    pub fn set_clock(&mut self, clock: Arc<dyn Clock>) {
        self.clock = clock;
    }

    // ---- accessors ------------------------------------------------------

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn blackboard(&self) -> &Blackboard {
        &self.blackboard
    }

    pub fn current_state_name(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn previous_state_name(&self) -> Option<&str> {
        self.previous.as_deref()
    }

    /// Bounded (≤ 100) record of state names entered, oldest first.
    pub fn state_history(&self) -> &VecDeque<String> {
        &self.state_history
    }

    pub fn clear_state_history(&mut self) {
        self.state_history.clear();
    }

    /// Bounded (≤ 1000) transition records; empty unless enabled.
    pub fn transition_history(&self) -> &VecDeque<TransitionRecord> {
        &self.transition_history
    }

    pub fn clear_transition_history(&mut self) {
        self.transition_history.clear();
    }

    pub fn enable_transition_history(&mut self, enable: bool) {
        self.track_transitions = enable;
    }

    pub fn set_debug_callback<F>(&mut self, callback: F)
    where
        F: FnMut(&DebugInfo) + Send + 'static,
    {
        self.debug = Some(Box::new(callback));
    }

    pub fn clear_debug_callback(&mut self) {
        self.debug = None;
    }

    /// Dotted path through composite states to the innermost active state.
    pub fn qualified_current_state(&self) -> Option<String> {
        let current = self.current.as_deref()?;
        match self.states.get(current) {
            Some(StateNode::Composite(composite)) => Some(composite.qualified_name()),
            Some(StateNode::Simple(state)) => Some(state.name().to_string()),
            None => None,
        }
    }

    // ---- composite introspection ---------------------------------------

    fn composite(&self, name: &str) -> Result<&CompositeState, MachineError> {
        match self.states.get(name) {
            Some(StateNode::Composite(composite)) => Ok(composite),
            Some(_) => Err(MachineError::NotComposite(name.to_string())),
            None => Err(MachineError::UnknownState(name.to_string())),
        }
    }

    pub fn current_substate(&self, composite: &str) -> Result<Option<String>, MachineError> {
        Ok(self.composite(composite)?.current_substate())
    }

    pub fn is_in_substate(&self, composite: &str, substate: &str) -> Result<bool, MachineError> {
        Ok(self.composite(composite)?.current_substate().as_deref() == Some(substate))
    }

    pub fn region_names(&self, composite: &str) -> Result<Vec<String>, MachineError> {
        Ok(self.composite(composite)?.region_names())
    }

    pub fn region_current_state(
        &self,
        composite: &str,
        region: &str,
    ) -> Result<Option<String>, MachineError> {
        self.composite(composite)?.region_current_state(region)
    }

    // ---- ticking --------------------------------------------------------

    /// Run one step: update the current state, then evaluate and (maybe)
    /// fire one outgoing transition.
    pub fn tick(&mut self) -> Result<(), MachineError> {
        let bb = self.blackboard.clone();

        let current = match self.current.clone() {
            Some(current) => current,
            None => {
                // Entry transition into the initial state.
                let initial = self.initial.clone().ok_or(MachineError::NoInitialState)?;
                self.perform_transition(None, &initial, "condition", None, 0)?;
                return Ok(());
            }
        };

        {
            let node = self
                .states
                .get_mut(&current)
                .ok_or_else(|| MachineError::UnknownState(current.clone()))?;
            node.update(&bb)?;
        }
        self.emit(DebugEvent::StateUpdated, &current, "", "", true, 0);

        let mut order: Vec<usize> = (0..self.transitions.len())
            .filter(|&i| self.transitions[i].from() == current)
            .collect();
        order.sort_by_key(|&i| std::cmp::Reverse(self.transitions[i].priority()));

        let now = self.clock.now();
        let mut chosen: Option<usize> = None;
        let mut pool: Vec<usize> = Vec::new();

        for i in order {
            match self.transitions[i].kind() {
                TransitionKind::Ignored => continue,
                TransitionKind::CannotHappen => {
                    if self.transitions[i].triggered(&bb) {
                        return Err(MachineError::CannotHappen {
                            from: current.clone(),
                        });
                    }
                    continue;
                }
                TransitionKind::Valid => {}
            }

            let (to, priority, reason) = {
                let transition = &self.transitions[i];
                (
                    transition.to().unwrap_or("").to_string(),
                    transition.priority(),
                    transition.fire_reason(),
                )
            };
            self.emit(
                DebugEvent::TransitionEvaluated,
                &current,
                &to,
                reason,
                true,
                priority,
            );

            if self.transitions[i].should_fire(&bb, now) {
                if self.transitions[i].is_stochastic() {
                    pool.push(i);
                } else {
                    // A plain fireable conditional beats the stochastic
                    // pool outright.
                    chosen = Some(i);
                    break;
                }
            }
        }

        if chosen.is_none() && !pool.is_empty() {
            chosen = self.draw_from_pool(&pool);
        }

        if let Some(i) = chosen {
            if let Some(to) = self.transitions[i].to().map(String::from) {
                let reason = self.transitions[i].fire_reason();
                let priority = self.transitions[i].priority();
                self.perform_transition(Some(&current), &to, reason, Some(i), priority)?;
            }
        }
        Ok(())
    }

    /// Bernoulli-filter the fireable stochastic candidates, then draw one
    /// winner proportionally to weight (default 1).
    fn draw_from_pool(&mut self, pool: &[usize]) -> Option<usize> {
        let mut survivors: Vec<usize> = Vec::new();
        for &i in pool {
            if let Some(probability) = self.transitions[i].probability() {
                if !self.rng.gen_bool(probability) {
                    continue;
                }
            }
            survivors.push(i);
        }
        if survivors.is_empty() {
            return None;
        }
        let total: f64 = survivors
            .iter()
            .map(|&i| self.transitions[i].weight().unwrap_or(1.0))
            .sum();
        if total <= 0.0 {
            return None;
        }
        let roll = self.rng.gen::<f64>() * total;
        let mut acc = 0.0;
        for &i in &survivors {
            acc += self.transitions[i].weight().unwrap_or(1.0);
            if roll <= acc {
                return Some(i);
            }
        }
        survivors.last().copied()
    }

    /// The transition procedure: target guard first, then exit / action /
    /// enter / timers / history. A rejected guard cancels everything and
    /// the current tick ends.
    fn perform_transition(
        &mut self,
        source: Option<&str>,
        to: &str,
        reason: &'static str,
        transition_idx: Option<usize>,
        priority: i32,
    ) -> Result<(), MachineError> {
        let bb = self.blackboard.clone();
        let from_label = source.unwrap_or("").to_string();

        let guard_ok = {
            let node = self
                .states
                .get_mut(to)
                .ok_or_else(|| MachineError::UnknownState(to.to_string()))?;
            node.check_guard(&bb)
        };
        if !guard_ok {
            tracing::debug!(machine = %self.id, from = %from_label, to, "transition rejected by target guard");
            self.emit(
                DebugEvent::TransitionRejected,
                &from_label,
                to,
                reason,
                false,
                priority,
            );
            return Ok(());
        }

        if let Some(from) = source {
            if let Some(node) = self.states.get_mut(from) {
                node.exit(&bb);
            }
            self.emit(DebugEvent::StateExited, from, "", "", true, 0);
            self.clear_timers_from(from);
            self.previous = Some(from.to_string());
        }

        if let Some(idx) = transition_idx {
            self.transitions[idx].run_action(&bb);
        }

        self.current = Some(to.to_string());
        {
            let node = self
                .states
                .get_mut(to)
                .ok_or_else(|| MachineError::UnknownState(to.to_string()))?;
            node.enter(&bb)?;
        }
        self.emit(DebugEvent::StateEntered, to, "", "", true, 0);

        let now = self.clock.now();
        self.start_timers_from(to);
        self.push_state_history(to);
        if self.track_transitions {
            if self.transition_history.len() >= MAX_TRANSITION_HISTORY {
                self.transition_history.pop_front();
            }
            self.transition_history.push_back(TransitionRecord {
                from: from_label.clone(),
                to: to.to_string(),
                reason: reason.to_string(),
                recorded_at: Utc::now(),
                at: now,
            });
        }
        self.emit(
            DebugEvent::TransitionTaken,
            &from_label,
            to,
            reason,
            true,
            priority,
        );
        tracing::debug!(machine = %self.id, from = %from_label, to, reason, "transition taken");
        Ok(())
    }

    /// Exit the current state (if any), wipe the blackboard and timers,
    /// and re-enter the initial state.
    pub fn reset(&mut self) {
        let bb = self.blackboard.clone();
        if let Some(current) = self.current.take() {
            if let Some(node) = self.states.get_mut(&current) {
                node.exit(&bb);
            }
        }
        self.previous = None;
        self.blackboard.clear();
        for transition in &mut self.transitions {
            transition.clear_timer();
        }
        if let Some(initial) = self.initial.clone() {
            if let Err(error) = self.perform_transition(None, &initial, "condition", None, 0) {
                tracing::warn!(machine = %self.id, %error, "reset failed to enter initial state");
            }
        }
    }

    /// Transition back to the previously active state (guard applies).
    pub fn transition_to_previous(&mut self) -> Result<(), MachineError> {
        let Some(previous) = self.previous.clone() else {
            return Ok(());
        };
        let current = self.current.clone();
        self.perform_transition(current.as_deref(), &previous, "condition", None, 0)
    }

    /// Enter `composite` through one of its named entry points: the
    /// composite is entered normally, then forced onto the named substate.
    pub fn enter_via(&mut self, composite: &str, entry_point: &str) -> Result<(), MachineError> {
        let target = {
            match self.states.get(composite) {
                Some(StateNode::Composite(node)) => node
                    .entry_target(entry_point)
                    .ok_or_else(|| MachineError::UnknownEntryPoint(entry_point.to_string()))?
                    .to_string(),
                Some(_) => return Err(MachineError::NotComposite(composite.to_string())),
                None => return Err(MachineError::UnknownState(composite.to_string())),
            }
        };
        let current = self.current.clone();
        self.perform_transition(current.as_deref(), composite, "condition", None, 0)?;

        if self.current.as_deref() == Some(composite) {
            if let Some(StateNode::Composite(node)) = self.states.get_mut(composite) {
                node.force_substate(&target)?;
            }
        }
        Ok(())
    }

    // ---- internals shared with composite states -------------------------

    /// Guard-checked transition used by history restore and entry points.
    pub(crate) fn force_transition_to(&mut self, to: &str) -> Result<(), MachineError> {
        let current = self.current.clone();
        if current.as_deref() == Some(to) {
            return Ok(());
        }
        self.perform_transition(current.as_deref(), to, "condition", None, 0)
    }

    /// Run the current state's exit callback and leave the machine
    /// stateless (used when a composite parent exits).
    pub(crate) fn exit_current(&mut self) {
        let bb = self.blackboard.clone();
        if let Some(current) = self.current.take() {
            if let Some(node) = self.states.get_mut(&current) {
                node.exit(&bb);
            }
            self.clear_timers_from(&current);
            self.previous = Some(current);
        }
    }

    /// Re-enter the initial state without wiping the blackboard (history
    /// `None` dispatch on composite entry).
    pub(crate) fn dispatch_initial(&mut self) -> Result<(), MachineError> {
        if self.current.is_some() {
            self.exit_current();
        }
        let initial = self.initial.clone().ok_or(MachineError::NoInitialState)?;
        self.perform_transition(None, &initial, "condition", None, 0)
    }

    /// Adopt a shared blackboard handle (composite substate trees observe
    /// their parent machine's context).
    pub(crate) fn share_blackboard(&mut self, bb: Blackboard) {
        self.blackboard = bb;
    }

    pub(crate) fn state_names(&self) -> Vec<String> {
        self.states.keys().cloned().collect()
    }

    pub(crate) fn node_mut(&mut self, name: &str) -> Option<&mut StateNode> {
        self.states.get_mut(name)
    }

    pub(crate) fn node(&self, name: &str) -> Option<&StateNode> {
        self.states.get(name)
    }

    pub(crate) fn current_node_mut(&mut self) -> Option<&mut StateNode> {
        let name = self.current.clone()?;
        self.states.get_mut(&name)
    }

    // ---- helpers --------------------------------------------------------

    fn start_timers_from(&mut self, state: &str) {
        let now = self.clock.now();
        for transition in &mut self.transitions {
            if transition.from() == state {
                transition.start_timer(now);
            }
        }
    }

    fn clear_timers_from(&mut self, state: &str) {
        for transition in &mut self.transitions {
            if transition.from() == state {
                transition.clear_timer();
            }
        }
    }

    fn push_state_history(&mut self, state: &str) {
        if self.state_history.len() >= MAX_STATE_HISTORY {
            self.state_history.pop_front();
        }
        self.state_history.push_back(state.to_string());
    }

    fn emit(
        &mut self,
        event: DebugEvent,
        from: &str,
        to: &str,
        info: &str,
        guard_passed: bool,
        priority: i32,
    ) {
        let timestamp = self.clock.now();
        if let Some(callback) = &mut self.debug {
            let info = DebugInfo {
                event,
                from_state: from.to_string(),
                to_state: to.to_string(),
                transition_info: info.to_string(),
                timestamp,
                guard_passed,
                priority,
            };
            callback(&info);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transition::TransitionCondition;

    fn always() -> Option<TransitionCondition> {
        Some(Box::new(|_: &Blackboard| true))
    }

    fn flag(key: &'static str) -> Option<TransitionCondition> {
        Some(Box::new(move |bb: &Blackboard| {
            bb.get::<bool>(key).unwrap_or(false)
        }))
    }

    fn two_state_machine() -> StateMachine {
        let mut machine = StateMachine::new();
        machine.add_state(State::new("a"));
        machine.add_state(State::new("b"));
        machine.set_initial_state("a").unwrap();
        machine
            .add_transition(Transition::new("a", "b", flag("go")))
            .unwrap();
        machine
    }

    #[test]
    fn first_tick_enters_the_initial_state() {
        let mut machine = two_state_machine();
        assert_eq!(machine.current_state_name(), None);
        machine.tick().unwrap();
        assert_eq!(machine.current_state_name(), Some("a"));
    }

    #[test]
    fn missing_initial_state_errors() {
        let mut machine = StateMachine::new();
        machine.add_state(State::new("lonely"));
        assert_eq!(machine.tick(), Err(MachineError::NoInitialState));
    }

    #[test]
    fn conditional_transition_fires_when_condition_holds() {
        let mut machine = two_state_machine();
        machine.tick().unwrap();
        machine.tick().unwrap();
        assert_eq!(machine.current_state_name(), Some("a"));

        machine.blackboard().set("go", true);
        machine.tick().unwrap();
        assert_eq!(machine.current_state_name(), Some("b"));
        assert_eq!(machine.previous_state_name(), Some("a"));
    }

    #[test]
    fn priority_orders_candidates() {
        let mut machine = StateMachine::new();
        machine.add_state(State::new("start"));
        machine.add_state(State::new("low"));
        machine.add_state(State::new("high"));
        machine.set_initial_state("start").unwrap();
        machine
            .add_transition(Transition::new("start", "low", always()).with_priority(1))
            .unwrap();
        machine
            .add_transition(Transition::new("start", "high", always()).with_priority(10))
            .unwrap();

        machine.tick().unwrap();
        machine.tick().unwrap();
        assert_eq!(machine.current_state_name(), Some("high"));
    }

    #[test]
    fn guard_rejection_keeps_current_state_and_skips_callbacks() {
        let mut machine = StateMachine::new();
        machine.add_state(State::new("a").on_exit(|bb| bb.set("a_exited", true)));
        machine.add_state(
            State::new("b")
                .on_guard(|_| false)
                .on_enter(|bb| bb.set("b_entered", true)),
        );
        machine.set_initial_state("a").unwrap();
        machine
            .add_transition(Transition::new("a", "b", always()))
            .unwrap();

        machine.tick().unwrap();
        machine.tick().unwrap();
        assert_eq!(machine.current_state_name(), Some("a"));
        assert_eq!(machine.blackboard().get::<bool>("a_exited"), None);
        assert_eq!(machine.blackboard().get::<bool>("b_entered"), None);
    }

    #[test]
    fn ignored_transitions_are_skipped() {
        let mut machine = two_state_machine();
        machine.add_transition(Transition::ignored("a")).unwrap();
        machine.tick().unwrap();
        machine.tick().unwrap();
        assert_eq!(machine.current_state_name(), Some("a"));
    }

    #[test]
    fn cannot_happen_surfaces_as_an_error() {
        let mut machine = StateMachine::new();
        machine.add_state(State::new("a"));
        machine.set_initial_state("a").unwrap();
        machine
            .add_transition(Transition::cannot_happen("a", None))
            .unwrap();

        machine.tick().unwrap();
        assert_eq!(
            machine.tick(),
            Err(MachineError::CannotHappen {
                from: "a".to_string()
            })
        );
    }

    #[test]
    fn transition_action_runs_between_exit_and_enter() {
        let mut machine = StateMachine::new();
        machine.add_state(State::new("a").on_exit(|bb| bb.set("order", "exit".to_string())));
        machine.add_state(State::new("b").on_enter(|bb| {
            let so_far = bb.get::<String>("order").unwrap_or_default();
            bb.set("order", format!("{so_far},enter"));
        }));
        machine.set_initial_state("a").unwrap();
        machine
            .add_transition(Transition::new("a", "b", always()).with_action(|bb| {
                let so_far = bb.get::<String>("order").unwrap_or_default();
                bb.set("order", format!("{so_far},action"));
            }))
            .unwrap();

        machine.tick().unwrap();
        machine.tick().unwrap();
        assert_eq!(
            machine.blackboard().get::<String>("order").as_deref(),
            Some("exit,action,enter")
        );
    }

    #[test]
    fn unknown_transition_endpoints_are_rejected() {
        let mut machine = StateMachine::new();
        machine.add_state(State::new("a"));
        assert_eq!(
            machine.add_transition(Transition::new("a", "ghost", always())),
            Err(MachineError::UnknownState("ghost".to_string()))
        );
        assert_eq!(
            machine.add_transition(Transition::new("ghost", "a", always())),
            Err(MachineError::UnknownState("ghost".to_string()))
        );
    }

    #[test]
    fn state_history_is_bounded() {
        let mut machine = StateMachine::new();
        machine.add_state(State::new("ping"));
        machine.add_state(State::new("pong"));
        machine.set_initial_state("ping").unwrap();
        machine
            .add_transition(Transition::new("ping", "pong", always()))
            .unwrap();
        machine
            .add_transition(Transition::new("pong", "ping", always()))
            .unwrap();

        for _ in 0..250 {
            machine.tick().unwrap();
        }
        assert_eq!(machine.state_history().len(), 100);
    }

    #[test]
    fn transition_history_is_opt_in_and_records_reasons() {
        let mut machine = two_state_machine();
        machine.enable_transition_history(true);
        machine.blackboard().set("go", true);
        machine.tick().unwrap();
        machine.tick().unwrap();

        let records = machine.transition_history();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].to, "a");
        assert_eq!(records[1].from, "a");
        assert_eq!(records[1].to, "b");
        assert_eq!(records[1].reason, "condition");
    }

    #[test]
    fn transition_to_previous_round_trips() {
        let mut machine = two_state_machine();
        machine.blackboard().set("go", true);
        machine.tick().unwrap();
        machine.tick().unwrap();
        assert_eq!(machine.current_state_name(), Some("b"));

        machine.transition_to_previous().unwrap();
        assert_eq!(machine.current_state_name(), Some("a"));
        assert_eq!(machine.previous_state_name(), Some("b"));
    }

    #[test]
    fn reset_reenters_initial_and_clears_blackboard() {
        let mut machine = two_state_machine();
        machine.blackboard().set("go", true);
        machine.tick().unwrap();
        machine.tick().unwrap();
        assert_eq!(machine.current_state_name(), Some("b"));

        machine.reset();
        assert_eq!(machine.current_state_name(), Some("a"));
        assert_eq!(machine.blackboard().get::<bool>("go"), None);
    }

    #[test]
    fn debug_callback_sees_the_transition_lifecycle() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let taken = Arc::new(AtomicUsize::new(0));
        let rejected = Arc::new(AtomicUsize::new(0));
        let taken_probe = Arc::clone(&taken);
        let rejected_probe = Arc::clone(&rejected);

        let mut machine = two_state_machine();
        machine.add_state(State::new("locked").on_guard(|_| false));
        machine
            .add_transition(Transition::new("b", "locked", always()))
            .unwrap();
        machine.set_debug_callback(move |info| match info.event {
            DebugEvent::TransitionTaken => {
                taken_probe.fetch_add(1, Ordering::SeqCst);
            }
            DebugEvent::TransitionRejected => {
                assert!(!info.guard_passed);
                rejected_probe.fetch_add(1, Ordering::SeqCst);
            }
            _ => {}
        });

        machine.blackboard().set("go", true);
        machine.tick().unwrap(); // enter a
        machine.tick().unwrap(); // a -> b
        machine.tick().unwrap(); // b -> locked rejected by guard
        assert_eq!(taken.load(Ordering::SeqCst), 2);
        assert_eq!(rejected.load(Ordering::SeqCst), 1);
    }
}
