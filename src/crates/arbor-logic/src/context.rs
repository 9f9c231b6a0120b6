//! Execution context: optional fan-out capability for the operators.

use arbor_runtime::Executor;
use std::sync::Arc;

/// Carries the optional [`Executor`] the join/extend/aggregate operators
/// fan out on. Without one, every operator runs sequentially on the
/// caller's thread with identical results.
#[derive(Clone, Default)]
pub struct ExecutionContext {
    executor: Option<Arc<dyn Executor>>,
}

impl ExecutionContext {
    /// Sequential context.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_executor(executor: Arc<dyn Executor>) -> Self {
        Self {
            executor: Some(executor),
        }
    }

    pub fn has_parallel(&self) -> bool {
        self.executor.is_some()
    }

    pub fn executor(&self) -> Option<&Arc<dyn Executor>> {
        self.executor.as_ref()
    }
}
