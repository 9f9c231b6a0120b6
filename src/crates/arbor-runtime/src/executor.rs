//! Fan-out capability consumed by the parallel composite and the Datalog
//! operators.
//!
//! The core never spawns threads. Components that can fan out take an
//! `Arc<dyn Executor>`; a real thread pool is a consumer-provided
//! implementation, and [`InlineExecutor`] degrades everything to sequential
//! execution with identical observable semantics.

use std::sync::atomic::{AtomicBool, Ordering};

/// A task sink supporting bulk dispatch with synchronous completion.
///
/// Both methods return only once every dispatched index has finished (or
/// been skipped by early-stop), so callers observe the fan-out as a
/// synchronous operation.
pub trait Executor: Send + Sync {
    /// Run `task(i)` for every `i in 0..n` and wait for all of them.
    fn bulk(&self, n: usize, task: &(dyn Fn(usize) + Sync));

    /// Like [`Executor::bulk`], but cancellable: a task returning `false`
    /// sets `stop`, and indices that have not started when `stop` is set
    /// are skipped.
    fn bulk_early_stop(
        &self,
        n: usize,
        stop: &AtomicBool,
        task: &(dyn Fn(usize) -> bool + Sync),
    );
}

/// Sequential executor: runs every task on the caller's thread.
///
/// This is the default wherever an executor is optional.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineExecutor;

impl Executor for InlineExecutor {
    fn bulk(&self, n: usize, task: &(dyn Fn(usize) + Sync)) {
        for i in 0..n {
            task(i);
        }
    }

    fn bulk_early_stop(
        &self,
        n: usize,
        stop: &AtomicBool,
        task: &(dyn Fn(usize) -> bool + Sync),
    ) {
        for i in 0..n {
            if stop.load(Ordering::Relaxed) {
                break;
            }
            if !task(i) {
                stop.store(true, Ordering::Relaxed);
            }
        }
    }
}
