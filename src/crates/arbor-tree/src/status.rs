//! Tick result and node lifecycle values.

use std::fmt;

/// Result of ticking a node.
///
/// A node goes `Idle` → `Running` on its first tick after a reset and
/// finishes an invocation with `Success` or `Failure`. Terminal results
/// imply an internal reset unless a node documents otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Idle,
    Running,
    Success,
    Failure,
}

impl Status {
    /// True for `Success` and `Failure`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Success | Status::Failure)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Idle => "idle",
            Status::Running => "running",
            Status::Success => "success",
            Status::Failure => "failure",
        };
        f.write_str(name)
    }
}

/// Per-node lifecycle value.
///
/// `Halted` is sticky: a halted node refuses to tick until it is reset
/// ([`crate::Tree`] re-arms a halted root automatically).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeState {
    #[default]
    Idle,
    Running,
    Halted,
}
