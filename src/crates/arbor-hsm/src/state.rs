//! Named states with guard/enter/update/exit callbacks.

use arbor_runtime::Blackboard;

/// Lifecycle callback reading and mutating the blackboard.
pub type StateCallback = Box<dyn FnMut(&Blackboard) + Send>;

/// Pre-entry veto. Returning `false` cancels the transition into this
/// state; the machine stays where it was.
pub type GuardFn = Box<dyn FnMut(&Blackboard) -> bool + Send>;

/// A leaf state: a name plus four optional callbacks.
///
/// The guard defaults to allowing entry; the other callbacks default to
/// no-ops.
pub struct State {
    name: String,
    guard: Option<GuardFn>,
    enter: Option<StateCallback>,
    update: Option<StateCallback>,
    exit: Option<StateCallback>,
}

impl State {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            guard: None,
            enter: None,
            update: None,
            exit: None,
        }
    }

    pub fn on_guard<F>(mut self, guard: F) -> Self
    where
        F: FnMut(&Blackboard) -> bool + Send + 'static,
    {
        self.guard = Some(Box::new(guard));
        self
    }

    pub fn on_enter<F>(mut self, enter: F) -> Self
    where
        F: FnMut(&Blackboard) + Send + 'static,
    {
        self.enter = Some(Box::new(enter));
        self
    }

    pub fn on_update<F>(mut self, update: F) -> Self
    where
        F: FnMut(&Blackboard) + Send + 'static,
    {
        self.update = Some(Box::new(update));
        self
    }

    pub fn on_exit<F>(mut self, exit: F) -> Self
    where
        F: FnMut(&Blackboard) + Send + 'static,
    {
        self.exit = Some(Box::new(exit));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_guard(&mut self, guard: GuardFn) {
        self.guard = Some(guard);
    }

    pub(crate) fn set_enter(&mut self, enter: StateCallback) {
        self.enter = Some(enter);
    }

    pub(crate) fn set_update(&mut self, update: StateCallback) {
        self.update = Some(update);
    }

    pub(crate) fn set_exit(&mut self, exit: StateCallback) {
        self.exit = Some(exit);
    }

    pub(crate) fn check_guard(&mut self, bb: &Blackboard) -> bool {
        match &mut self.guard {
            Some(guard) => guard(bb),
            None => true,
        }
    }

    pub(crate) fn run_enter(&mut self, bb: &Blackboard) {
        if let Some(enter) = &mut self.enter {
            enter(bb);
        }
    }

    pub(crate) fn run_update(&mut self, bb: &Blackboard) {
        if let Some(update) = &mut self.update {
            update(bb);
        }
    }

    pub(crate) fn run_exit(&mut self, bb: &Blackboard) {
        if let Some(exit) = &mut self.exit {
            exit(bb);
        }
    }
}
