//! Transitions: conditional, timed, weighted, probabilistic, plus the
//! ignored / cannot-happen documentation kinds.

use crate::error::MachineError;
use arbor_runtime::Blackboard;
use std::time::{Duration, Instant};

/// Condition deciding whether a transition is fireable this tick.
pub type TransitionCondition = Box<dyn FnMut(&Blackboard) -> bool + Send>;

/// Side effect run between the source's exit and the target's enter.
pub type TransitionAction = Box<dyn FnMut(&Blackboard) + Send>;

/// What kind of transition this is.
///
/// `Ignored` documents a deliberately suppressed event and is never a
/// candidate. `CannotHappen` is an assertion: reaching one while it is
/// armed is a defect surfaced as [`MachineError::CannotHappen`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    Valid,
    Ignored,
    CannotHappen,
}

/// An edge between two named states.
pub struct Transition {
    from: String,
    to: Option<String>,
    kind: TransitionKind,
    condition: Option<TransitionCondition>,
    priority: i32,
    action: Option<TransitionAction>,
    duration: Option<Duration>,
    timer_start: Option<Instant>,
    probability: Option<f64>,
    weight: Option<f64>,
}

impl Transition {
    /// Plain conditional transition. A `None` condition always fires (used
    /// by weighted/probabilistic transitions whose draw is the filter).
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        condition: Option<TransitionCondition>,
    ) -> Self {
        Self {
            from: from.into(),
            to: Some(to.into()),
            kind: TransitionKind::Valid,
            condition,
            priority: 0,
            action: None,
            duration: None,
            timer_start: None,
            probability: None,
            weight: None,
        }
    }

    /// Documented, deliberately suppressed event.
    pub fn ignored(from: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: None,
            kind: TransitionKind::Ignored,
            condition: None,
            priority: 0,
            action: None,
            duration: None,
            timer_start: None,
            probability: None,
            weight: None,
        }
    }

    /// Assertion that this situation is unreachable. With a condition, the
    /// assertion is armed only while the condition holds; without one it is
    /// always armed.
    pub fn cannot_happen(
        from: impl Into<String>,
        condition: Option<TransitionCondition>,
    ) -> Self {
        Self {
            from: from.into(),
            to: None,
            kind: TransitionKind::CannotHappen,
            condition,
            priority: 0,
            action: None,
            duration: None,
            timer_start: None,
            probability: None,
            weight: None,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_action<F>(mut self, action: F) -> Self
    where
        F: FnMut(&Blackboard) + Send + 'static,
    {
        self.action = Some(Box::new(action));
        self
    }

    /// Make this a timed transition: it fires once the source state has
    /// been active for `duration` (and the condition, if any, holds).
    pub fn after(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Bernoulli filter applied before the weighted draw.
    pub fn with_probability(mut self, probability: f64) -> Result<Self, MachineError> {
        if !(0.0..=1.0).contains(&probability) || probability.is_nan() {
            return Err(MachineError::InvalidProbability(probability));
        }
        self.probability = Some(probability);
        Ok(self)
    }

    /// Weight used in the draw across simultaneously fireable stochastic
    /// transitions (defaults to 1 when unset).
    pub fn with_weight(mut self, weight: f64) -> Result<Self, MachineError> {
        if weight < 0.0 || weight.is_nan() {
            return Err(MachineError::InvalidWeight(weight));
        }
        self.weight = Some(weight);
        Ok(self)
    }

    // ---- accessors ------------------------------------------------------

    pub fn from(&self) -> &str {
        &self.from
    }

    pub fn to(&self) -> Option<&str> {
        self.to.as_deref()
    }

    pub fn kind(&self) -> TransitionKind {
        self.kind
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    pub fn probability(&self) -> Option<f64> {
        self.probability
    }

    pub fn weight(&self) -> Option<f64> {
        self.weight
    }

    /// True when this transition participates in the weighted/probabilistic
    /// draw instead of firing directly.
    pub(crate) fn is_stochastic(&self) -> bool {
        self.probability.is_some() || self.weight.is_some()
    }

    /// Label reported in debug events and transition records.
    pub(crate) fn fire_reason(&self) -> &'static str {
        if self.duration.is_some() {
            "timed"
        } else if self.weight.is_some() {
            "weighted"
        } else if self.probability.is_some() {
            "probabilistic"
        } else {
            "condition"
        }
    }

    /// Timed window + user condition. The stochastic draw is the machine's
    /// job, not this method's.
    pub(crate) fn should_fire(&mut self, bb: &Blackboard, now: Instant) -> bool {
        if self.kind != TransitionKind::Valid {
            return false;
        }
        if let Some(duration) = self.duration {
            match self.timer_start {
                Some(started) if now.duration_since(started) >= duration => {}
                // Timer not started or not yet elapsed.
                _ => return false,
            }
        }
        match &mut self.condition {
            Some(condition) => condition(bb),
            None => true,
        }
    }

    /// Whether a cannot-happen assertion is armed right now.
    pub(crate) fn triggered(&mut self, bb: &Blackboard) -> bool {
        match &mut self.condition {
            Some(condition) => condition(bb),
            None => true,
        }
    }

    pub(crate) fn run_action(&mut self, bb: &Blackboard) {
        if let Some(action) = &mut self.action {
            action(bb);
        }
    }

    pub(crate) fn start_timer(&mut self, now: Instant) {
        if self.duration.is_some() {
            self.timer_start = Some(now);
        }
    }

    pub(crate) fn clear_timer(&mut self) {
        self.timer_start = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probability_bounds_are_enforced() {
        assert!(matches!(
            Transition::new("a", "b", None).with_probability(1.5),
            Err(MachineError::InvalidProbability(_))
        ));
        assert!(matches!(
            Transition::new("a", "b", None).with_probability(-0.1),
            Err(MachineError::InvalidProbability(_))
        ));
        assert!(Transition::new("a", "b", None).with_probability(0.5).is_ok());
    }

    #[test]
    fn negative_weight_is_rejected() {
        assert!(matches!(
            Transition::new("a", "b", None).with_weight(-1.0),
            Err(MachineError::InvalidWeight(_))
        ));
        assert!(Transition::new("a", "b", None).with_weight(0.0).is_ok());
    }

    #[test]
    fn timed_transition_waits_for_its_window() {
        let bb = Blackboard::new();
        let start = Instant::now();
        let mut transition =
            Transition::new("a", "b", None).after(Duration::from_millis(100));

        // Timer never started: not fireable.
        assert!(!transition.should_fire(&bb, start));

        transition.start_timer(start);
        assert!(!transition.should_fire(&bb, start + Duration::from_millis(50)));
        assert!(transition.should_fire(&bb, start + Duration::from_millis(150)));

        transition.clear_timer();
        assert!(!transition.should_fire(&bb, start + Duration::from_secs(10)));
    }

    #[test]
    fn timed_transition_still_honours_its_condition() {
        let bb = Blackboard::new();
        let start = Instant::now();
        let mut transition = Transition::new(
            "a",
            "b",
            Some(Box::new(|bb: &Blackboard| {
                bb.get::<bool>("go").unwrap_or(false)
            }) as TransitionCondition),
        )
        .after(Duration::from_millis(10));
        transition.start_timer(start);

        let later = start + Duration::from_millis(50);
        assert!(!transition.should_fire(&bb, later));
        bb.set("go", true);
        assert!(transition.should_fire(&bb, later));
    }

    #[test]
    fn ignored_transitions_never_fire() {
        let bb = Blackboard::new();
        let mut transition = Transition::ignored("a");
        assert!(!transition.should_fire(&bb, Instant::now()));
    }
}
