//! Debug hook payloads and transition history records.

use chrono::{DateTime, Utc};
use std::time::Instant;

/// Which lifecycle moment a [`DebugInfo`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugEvent {
    StateEntered,
    StateUpdated,
    StateExited,
    TransitionEvaluated,
    TransitionTaken,
    TransitionRejected,
}

/// Snapshot delivered to the machine's debug callback.
///
/// Timestamps are monotonic. `transition_info` is one of `"condition"`,
/// `"timed"`, `"weighted"`, `"probabilistic"` for transition events and
/// empty for state events. `guard_passed` is `false` only on
/// [`DebugEvent::TransitionRejected`].
#[derive(Debug, Clone)]
pub struct DebugInfo {
    pub event: DebugEvent,
    pub from_state: String,
    pub to_state: String,
    pub transition_info: String,
    pub timestamp: Instant,
    pub guard_passed: bool,
    pub priority: i32,
}

/// Callback receiving every debug event.
pub type DebugCallback = Box<dyn FnMut(&DebugInfo) + Send>;

/// One entry of the opt-in transition history.
#[derive(Debug, Clone)]
pub struct TransitionRecord {
    pub from: String,
    pub to: String,
    /// `"condition"`, `"timed"`, `"weighted"`, or `"probabilistic"`.
    pub reason: String,
    /// Wall-clock stamp for logs and dashboards.
    pub recorded_at: DateTime<Utc>,
    /// Monotonic stamp for ordering and latency measurements.
    pub at: Instant,
}
