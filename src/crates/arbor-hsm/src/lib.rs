//! # arbor-hsm - Hierarchical state machine
//!
//! A [`StateMachine`] owns named states, transitions between them, and a
//! shared [`Blackboard`](arbor_runtime::Blackboard). One
//! [`tick`](StateMachine::tick) updates the current state, then walks its
//! outgoing transitions in descending priority and fires at most one.
//!
//! Transitions come in several kinds:
//!
//! - **Conditional** - fires when its predicate holds.
//! - **Timed** - armed when the source state is entered, fires once the
//!   configured duration has elapsed (and any predicate holds).
//! - **Weighted / probabilistic** - simultaneously fireable stochastic
//!   transitions resolve by a Bernoulli filter on each probability followed
//!   by one weight-proportional draw; a plain fireable conditional always
//!   beats the pool.
//! - **Ignored** - documented suppression, never a candidate.
//! - **CannotHappen** - an assertion; reaching one while armed is an error.
//!
//! States carry guard/enter/update/exit callbacks. A target's guard runs
//! *before* the source exits: rejection cancels the transition entirely.
//!
//! [`CompositeState`]s nest a full inner machine (sharing the parent's
//! blackboard), any number of orthogonal regions (each with a private
//! blackboard), shallow or deep history, and named entry/exit points.
//!
//! # Example
//!
//! ```rust
//! use arbor_hsm::MachineBuilder;
//! use arbor_runtime::Blackboard;
//!
//! let mut machine = MachineBuilder::new()
//!     .initial("idle")
//!     .state("idle")
//!     .transition_to("working", |bb: &Blackboard| {
//!         bb.get::<bool>("job_queued").unwrap_or(false)
//!     })
//!     .state("working")
//!     .on_enter(|bb| bb.set("started", true))
//!     .build()
//!     .expect("valid machine");
//!
//! machine.tick().unwrap(); // enters "idle"
//! machine.blackboard().set("job_queued", true);
//! machine.tick().unwrap(); // idle -> working
//! assert_eq!(machine.current_state_name(), Some("working"));
//! ```

pub mod builder;
pub mod composite;
pub mod debug;
pub mod error;
pub mod machine;
pub mod state;
pub mod transition;

pub use builder::MachineBuilder;
pub use composite::{CompositeState, HistoryKind};
pub use debug::{DebugCallback, DebugEvent, DebugInfo, TransitionRecord};
pub use error::MachineError;
pub use machine::StateMachine;
pub use state::{GuardFn, State, StateCallback};
pub use transition::{Transition, TransitionAction, TransitionCondition, TransitionKind};
