//! Node implementations: composites, decorators, control flow, and the
//! stochastic selectors.

pub mod advanced;
pub mod control_flow;
pub mod decorator;
pub mod parallel;
pub mod selector;
pub mod sequence;
pub mod subtree;

#[cfg(test)]
pub(crate) mod testing;

pub use advanced::{
    OneShotSequence, ProbabilitySelector, RandomSelector, UtilityFn, UtilitySelector,
    WeightedRandomSelector,
};
pub use control_flow::{
    Conditional, ConditionalSequence, DynamicSelector, For, PriorityFn, ReactiveSequence, Switch,
    While,
};
pub use decorator::{
    Cooldown, Debounce, Failer, Inverter, MapStatus, Memory, MemoryPolicy, Repeat, Retry,
    Succeeder, Timeout,
};
pub use parallel::{Parallel, ParallelPolicy};
pub use selector::Selector;
pub use sequence::Sequence;
pub use subtree::{Subtree, SubtreeHandle};
