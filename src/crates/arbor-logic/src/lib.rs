//! # arbor-logic - Semi-naive Datalog over sorted relations
//!
//! A self-contained deductive engine driven programmatically (there is no
//! query language): user code builds [`Relation`]s, allocates
//! [`Variable`]s inside an [`Iteration`], and runs joins and extensions in
//! a fixpoint loop.
//!
//! - [`Relation`] - immutable, sorted, deduplicated tuple sets behind a
//!   reference count; O(1) clones, two-pointer merges, and a fixed binary
//!   wire format for [`Storable`] tuples.
//! - [`Variable`] - the semi-naive delta holder (stable / recent / to-add
//!   layers); [`Variable::changed`] promotes only genuinely new facts.
//! - [`join_into`] / [`join_anti`] - gallop-accelerated sort-merge joins
//!   over the recent/stable split.
//! - [`Leaper`] / [`extend_into`] - leapfrog trie joins with pluggable
//!   constraints ([`ExtendWith`], [`FilterAnti`], [`ExtendAnti`]).
//! - [`aggregate`] - group-by folds in key order.
//! - [`SecondaryIndex`] - ordered key -> bucket lookups and range scans.
//!
//! Operators accept an [`ExecutionContext`]; give it an
//! [`Executor`](arbor_runtime::Executor) to fan passes and chunks out onto
//! a pool, or leave it empty for sequential execution with identical
//! results.
//!
//! # Transitive closure
//!
//! ```rust
//! use arbor_logic::{join_into, ExecutionContext, Iteration};
//!
//! let ctx = ExecutionContext::new();
//! let edges = [(1u32, 2u32), (2, 3), (3, 4)];
//!
//! let mut iteration = Iteration::new();
//! let edge = iteration.variable();
//! let reachable = iteration.variable();
//! edge.insert_slice(&edges);
//! reachable.insert_slice(&edges);
//!
//! while iteration.changed() {
//!     join_into(
//!         &reachable,
//!         &edge,
//!         &reachable,
//!         |&(_, b)| b,
//!         |&(b, _)| b,
//!         |&(a, _), &(_, c)| (a, c),
//!         &ctx,
//!     );
//! }
//!
//! let closure = reachable.complete();
//! assert_eq!(
//!     closure.elements(),
//!     &[(1, 2), (1, 3), (1, 4), (2, 3), (2, 4), (3, 4)]
//! );
//! ```

pub mod aggregate;
pub mod context;
pub mod error;
pub mod extend;
pub mod gallop;
pub mod index;
pub mod iteration;
pub mod join;
pub mod relation;
pub mod storable;
pub mod variable;

pub use aggregate::aggregate;
pub use context::ExecutionContext;
pub use error::StoreError;
pub use extend::{extend_into, ExtendAnti, ExtendWith, FilterAnti, Leaper};
pub use gallop::{find_key_range, gallop, gallop_from};
pub use index::SecondaryIndex;
pub use iteration::{Iteration, DEFAULT_MAX_ITERATIONS};
pub use join::{join_anti, join_into};
pub use relation::{Relation, Tuple};
pub use storable::Storable;
pub use variable::Variable;
