//! # arbor-runtime - Shared substrate for the arbor behaviour runtime
//!
//! This crate carries the pieces every other arbor crate leans on:
//!
//! - [`Blackboard`] - typed, scoped key/value context threaded through every
//!   tick. Values are type-erased; a read with the wrong type is simply
//!   absent, never a panic.
//! - [`EventBus`] - name-keyed publish/subscribe with JSON payloads, used by
//!   tree leaves to decouple producers from consumers.
//! - [`Executor`] - the fan-out capability consumed by the parallel
//!   composite and the Datalog operators. The runtime never constructs
//!   threads itself; callers inject a pool (or rely on [`InlineExecutor`]).
//! - [`Clock`] - monotonic time as a capability, so every wall-clock
//!   sensitive component can run against virtual time in tests.
//!
//! # Example
//!
//! ```rust
//! use arbor_runtime::Blackboard;
//!
//! let bb = Blackboard::new();
//! bb.set("health", 75_i64);
//! assert_eq!(bb.get::<i64>("health"), Some(75));
//! // Mismatched type reads are absent, not errors.
//! assert_eq!(bb.get::<String>("health"), None);
//! ```

pub mod blackboard;
pub mod clock;
pub mod events;
pub mod executor;

pub use blackboard::{Blackboard, BlackboardEvent, ScopeGuard};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use events::{EventBus, SubscriptionId};
pub use executor::{Executor, InlineExecutor};
