//! # arbor-tree - Behaviour-tree tick engine
//!
//! A behaviour tree composes small reactive units into a single tickable
//! structure. One [`Tree::tick`] call descends the tree exactly once:
//! composites choose children, decorators transform child results, and
//! leaves observe or mutate the shared [`Blackboard`](arbor_runtime::Blackboard)
//! (or publish on the tree's event bus). The call returns a terminal
//! [`Status`], or [`Status::Running`] when the tree suspended mid-work.
//!
//! # Node taxonomy
//!
//! - **Composites** coordinate several children:
//!   [`Sequence`](nodes::Sequence), [`Selector`](nodes::Selector),
//!   [`Parallel`](nodes::Parallel) (policy or threshold aggregation), plus
//!   the stochastic and utility-driven selectors in [`nodes::advanced`].
//! - **Decorators** wrap one child and transform its status:
//!   inverter/succeeder/failer, repeat/retry, and the wall-clock family
//!   (timeout/cooldown/debounce) driven by an injectable clock.
//! - **Control flow**: if/while/for/switch, conditional and reactive
//!   sequences, dynamic (priority-preempting) selection, and swappable
//!   [`Subtree`](nodes::Subtree) references.
//! - **Leaves**: synchronous closures, futures spawned on the tokio
//!   runtime, and stepped tasks advanced one suspension boundary per tick
//!   ([`Action`]).
//!
//! # Example
//!
//! ```rust
//! use arbor_tree::{Builder, Status};
//! use arbor_runtime::Blackboard;
//!
//! let mut tree = Builder::new()
//!     .selector()
//!     .action(|bb: &Blackboard| {
//!         if bb.get::<bool>("door_open").unwrap_or(false) {
//!             Status::Success
//!         } else {
//!             Status::Failure
//!         }
//!     })
//!     .action(|bb: &Blackboard| {
//!         bb.set("door_open", true);
//!         Status::Success
//!     })
//!     .end()?
//!     .build()?;
//!
//! assert_eq!(tree.tick(), Status::Success);
//! assert_eq!(tree.blackboard().get::<bool>("door_open"), Some(true));
//! # Ok::<(), arbor_tree::BuildError>(())
//! ```

pub mod action;
pub mod builder;
pub mod error;
pub mod node;
pub mod nodes;
pub mod status;
pub mod tree;

pub use action::{yield_now, Action, YieldNow};
pub use builder::Builder;
pub use error::BuildError;
pub use node::{BoxNode, ConditionFn, Node};
pub use nodes::{MemoryPolicy, ParallelPolicy, SubtreeHandle};
pub use status::{NodeState, Status};
pub use tree::Tree;
