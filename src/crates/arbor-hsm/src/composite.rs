//! Composite states: nested machines, orthogonal regions, history, and
//! entry/exit points.

use crate::error::MachineError;
use crate::machine::{StateMachine, StateNode};
use crate::state::State;
use arbor_runtime::Blackboard;
use std::collections::{HashMap, HashSet};

/// How a composite state restores its substate on re-entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryKind {
    /// Always dispatch to the inner machine's initial state.
    None,
    /// Restore the most recent direct substate.
    Shallow,
    /// Restore the substate recursively through nested composites.
    Deep,
}

struct Region {
    name: String,
    machine: StateMachine,
}

/// A state that owns an inner machine (its substate tree) and any number of
/// orthogonal regions.
///
/// The inner machine shares the parent machine's blackboard, so substate
/// conditions and callbacks see the same context as the rest of the
/// machine. Regions keep their own private blackboards: they are ticked in
/// declaration order but are otherwise fully isolated.
pub struct CompositeState {
    base: State,
    inner: Option<StateMachine>,
    regions: Vec<Region>,
    history: HistoryKind,
    last_active: Option<String>,
    entry_points: HashMap<String, String>,
    exit_points: HashSet<String>,
}

impl CompositeState {
    pub fn new(name: impl Into<String>, history: HistoryKind) -> Self {
        Self {
            base: State::new(name),
            inner: None,
            regions: Vec::new(),
            history,
            last_active: None,
            entry_points: HashMap::new(),
            exit_points: HashSet::new(),
        }
    }

    /// Attach the substate tree.
    pub fn with_inner(mut self, machine: StateMachine) -> Self {
        self.inner = Some(machine);
        self
    }

    /// Add an orthogonal region (independent machine, private blackboard).
    pub fn with_region(mut self, name: impl Into<String>, machine: StateMachine) -> Self {
        self.regions.push(Region {
            name: name.into(),
            machine,
        });
        self
    }

    /// Name a substate as a targeted entry point.
    pub fn with_entry_point(
        mut self,
        name: impl Into<String>,
        target_substate: impl Into<String>,
    ) -> Self {
        self.entry_points.insert(name.into(), target_substate.into());
        self
    }

    pub fn with_exit_point(mut self, name: impl Into<String>) -> Self {
        self.exit_points.insert(name.into());
        self
    }

    pub fn on_guard<F>(mut self, guard: F) -> Self
    where
        F: FnMut(&Blackboard) -> bool + Send + 'static,
    {
        self.base = self.base.on_guard(guard);
        self
    }

    pub fn on_enter<F>(mut self, enter: F) -> Self
    where
        F: FnMut(&Blackboard) + Send + 'static,
    {
        self.base = self.base.on_enter(enter);
        self
    }

    pub fn on_update<F>(mut self, update: F) -> Self
    where
        F: FnMut(&Blackboard) + Send + 'static,
    {
        self.base = self.base.on_update(update);
        self
    }

    pub fn on_exit<F>(mut self, exit: F) -> Self
    where
        F: FnMut(&Blackboard) + Send + 'static,
    {
        self.base = self.base.on_exit(exit);
        self
    }

    pub fn set_inner(&mut self, machine: StateMachine) {
        self.inner = Some(machine);
    }

    pub fn add_region(&mut self, name: impl Into<String>, machine: StateMachine) {
        self.regions.push(Region {
            name: name.into(),
            machine,
        });
    }

    pub fn add_entry_point(
        &mut self,
        name: impl Into<String>,
        target_substate: impl Into<String>,
    ) {
        self.entry_points.insert(name.into(), target_substate.into());
    }

    pub fn add_exit_point(&mut self, name: impl Into<String>) {
        self.exit_points.insert(name.into());
    }

    // ---- accessors ------------------------------------------------------

    pub fn name(&self) -> &str {
        self.base.name()
    }

    pub fn history_kind(&self) -> HistoryKind {
        self.history
    }

    pub fn clear_history(&mut self) {
        self.last_active = None;
        if let Some(inner) = &mut self.inner {
            for name in inner.state_names() {
                if let Some(StateNode::Composite(child)) = inner.node_mut(&name) {
                    child.clear_history();
                }
            }
        }
    }

    pub fn current_substate(&self) -> Option<String> {
        self.inner
            .as_ref()
            .and_then(|inner| inner.current_state_name().map(String::from))
    }

    pub fn region_names(&self) -> Vec<String> {
        self.regions.iter().map(|region| region.name.clone()).collect()
    }

    pub fn region_current_state(&self, name: &str) -> Result<Option<String>, MachineError> {
        self.regions
            .iter()
            .find(|region| region.name == name)
            .map(|region| region.machine.current_state_name().map(String::from))
            .ok_or_else(|| MachineError::UnknownRegion(name.to_string()))
    }

    pub fn entry_target(&self, entry_point: &str) -> Option<&str> {
        self.entry_points.get(entry_point).map(String::as_str)
    }

    pub fn has_exit_point(&self, name: &str) -> bool {
        self.exit_points.contains(name)
    }

    /// Dotted path down through the active substates.
    pub fn qualified_name(&self) -> String {
        let mut qualified = self.name().to_string();
        if let Some(inner) = &self.inner {
            if let Some(current) = inner.current_state_name() {
                match inner.node(current) {
                    Some(StateNode::Composite(child)) => {
                        qualified.push('.');
                        qualified.push_str(&child.qualified_name());
                    }
                    _ => {
                        qualified.push('.');
                        qualified.push_str(current);
                    }
                }
            }
        }
        qualified
    }

    pub(crate) fn base_mut(&mut self) -> &mut State {
        &mut self.base
    }

    // ---- lifecycle (driven by the owning machine) ------------------------

    /// Own guard AND the active substate's guard, when one is active.
    pub(crate) fn check_guard(&mut self, bb: &Blackboard) -> bool {
        if !self.base.check_guard(bb) {
            return false;
        }
        if let Some(inner) = &mut self.inner {
            if let Some(node) = inner.current_node_mut() {
                return node.check_guard(bb);
            }
        }
        true
    }

    pub(crate) fn handle_enter(&mut self, bb: &Blackboard) -> Result<(), MachineError> {
        self.base.run_enter(bb);
        if let Some(inner) = &mut self.inner {
            // Substates observe the same context as the parent machine.
            inner.share_blackboard(bb.clone());
            let restore = self.history != HistoryKind::None && self.last_active.is_some();
            if restore {
                self.restore_history()?;
            } else {
                inner.dispatch_initial()?;
            }
        }
        Ok(())
    }

    pub(crate) fn handle_update(&mut self, bb: &Blackboard) -> Result<(), MachineError> {
        self.base.run_update(bb);
        if let Some(inner) = &mut self.inner {
            inner.share_blackboard(bb.clone());
            inner.tick()?;
        }
        for region in &mut self.regions {
            region.machine.tick()?;
        }
        Ok(())
    }

    pub(crate) fn handle_exit(&mut self, bb: &Blackboard) {
        if self.history != HistoryKind::None {
            self.save_history();
        }
        if let Some(inner) = &mut self.inner {
            inner.exit_current();
        }
        for region in &mut self.regions {
            region.machine.exit_current();
        }
        self.base.run_exit(bb);
    }

    /// Force the inner machine onto a named substate (entry points,
    /// history restore).
    pub(crate) fn force_substate(&mut self, target: &str) -> Result<(), MachineError> {
        match &mut self.inner {
            Some(inner) => inner.force_transition_to(target),
            None => Err(MachineError::UnknownState(target.to_string())),
        }
    }

    // ---- history ---------------------------------------------------------

    fn save_history(&mut self) {
        let Some(inner) = &mut self.inner else {
            return;
        };
        self.last_active = inner.current_state_name().map(String::from);
        if self.history == HistoryKind::Deep {
            if let Some(saved) = self.last_active.clone() {
                if let Some(StateNode::Composite(child)) = inner.node_mut(&saved) {
                    child.save_substate_chain();
                }
            }
        }
    }

    /// Record the active substate chain regardless of the child's own
    /// history kind; a deep parent restores through it on re-entry.
    fn save_substate_chain(&mut self) {
        let Some(inner) = &mut self.inner else {
            return;
        };
        self.last_active = inner.current_state_name().map(String::from);
        if let Some(saved) = self.last_active.clone() {
            if let Some(StateNode::Composite(child)) = inner.node_mut(&saved) {
                child.save_substate_chain();
            }
        }
    }

    fn restore_history(&mut self) -> Result<(), MachineError> {
        let Some(saved) = self.last_active.clone() else {
            return Ok(());
        };
        let deep = self.history == HistoryKind::Deep;
        let Some(inner) = &mut self.inner else {
            return Ok(());
        };
        inner.force_transition_to(&saved)?;
        if deep {
            if let Some(StateNode::Composite(child)) = inner.node_mut(&saved) {
                child.restore_substate_chain()?;
            }
        }
        Ok(())
    }

    /// Deep-restore helper: descend through the recorded chain even when
    /// the child's own history kind would not.
    fn restore_substate_chain(&mut self) -> Result<(), MachineError> {
        let Some(saved) = self.last_active.clone() else {
            return Ok(());
        };
        let Some(inner) = &mut self.inner else {
            return Ok(());
        };
        inner.force_transition_to(&saved)?;
        if let Some(StateNode::Composite(child)) = inner.node_mut(&saved) {
            child.restore_substate_chain()?;
        }
        Ok(())
    }
}
