//! Leaf actions: synchronous closures, runtime-spawned futures, and
//! in-place stepped tasks.
//!
//! All three variants share the node contract; they differ in where the
//! work runs:
//!
//! - [`Action::new`] runs a closure synchronously inside the tick.
//! - [`Action::spawned`] hands a future to the ambient tokio runtime on the
//!   first tick and then polls the join handle without blocking. Halting
//!   aborts the spawned task.
//! - [`Action::task`] keeps the future inside the node and polls it exactly
//!   once per tick; every `yield_now().await` inside the future is a
//!   suspension boundary. Halting drops the future.

use crate::node::Node;
use crate::status::{NodeState, Status};
use arbor_runtime::Blackboard;
use futures::future::BoxFuture;
use futures::task::noop_waker;
use futures::FutureExt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::task::JoinHandle;

type SyncFn = Box<dyn FnMut(&Blackboard) -> Status + Send>;
type FutureFactory = Box<dyn FnMut(&Blackboard) -> BoxFuture<'static, Status> + Send>;

enum Mode {
    Sync(SyncFn),
    Spawned {
        factory: FutureFactory,
        handle: Option<JoinHandle<Status>>,
    },
    Task {
        factory: FutureFactory,
        future: Option<BoxFuture<'static, Status>>,
    },
}

/// Leaf node executing user behaviour against the blackboard.
pub struct Action {
    mode: Mode,
    state: NodeState,
}

impl Action {
    /// Synchronous leaf: the closure runs to completion inside the tick.
    pub fn new<F>(func: F) -> Self
    where
        F: FnMut(&Blackboard) -> Status + Send + 'static,
    {
        Self {
            mode: Mode::Sync(Box::new(func)),
            state: NodeState::Idle,
        }
    }

    /// Future-backed leaf: the first tick spawns the future onto the
    /// current tokio runtime; later ticks poll the handle without blocking.
    ///
    /// Ticking outside a runtime context fails the action (with a warning)
    /// rather than panicking.
    pub fn spawned<F>(factory: F) -> Self
    where
        F: FnMut(&Blackboard) -> BoxFuture<'static, Status> + Send + 'static,
    {
        Self {
            mode: Mode::Spawned {
                factory: Box::new(factory),
                handle: None,
            },
            state: NodeState::Idle,
        }
    }

    /// Stepped-task leaf: the future is stored in the node and advanced one
    /// suspension boundary per tick.
    pub fn task<F>(factory: F) -> Self
    where
        F: FnMut(&Blackboard) -> BoxFuture<'static, Status> + Send + 'static,
    {
        Self {
            mode: Mode::Task {
                factory: Box::new(factory),
                future: None,
            },
            state: NodeState::Idle,
        }
    }

    fn finish(&mut self, status: Status) -> Status {
        self.state = if status == Status::Running {
            NodeState::Running
        } else {
            NodeState::Idle
        };
        status
    }
}

impl Node for Action {
    fn tick(&mut self, bb: &Blackboard) -> Status {
        if self.state == NodeState::Halted {
            return Status::Failure;
        }
        match &mut self.mode {
            Mode::Sync(func) => {
                let status = func(bb);
                self.finish(status)
            }
            Mode::Spawned { factory, handle } => {
                let join = match handle {
                    Some(join) => join,
                    None => match tokio::runtime::Handle::try_current() {
                        Ok(runtime) => handle.insert(runtime.spawn(factory(bb))),
                        Err(_) => {
                            tracing::warn!("spawned action ticked outside a tokio runtime");
                            return self.finish(Status::Failure);
                        }
                    },
                };
                if !join.is_finished() {
                    self.state = NodeState::Running;
                    return Status::Running;
                }
                let status = match (&mut *join).now_or_never() {
                    Some(Ok(status)) => status,
                    Some(Err(err)) => {
                        tracing::warn!(error = %err, "spawned action task failed");
                        Status::Failure
                    }
                    // Finished but not yet observable; try again next tick.
                    None => {
                        self.state = NodeState::Running;
                        return Status::Running;
                    }
                };
                *handle = None;
                self.finish(status)
            }
            Mode::Task { factory, future } => {
                let task = match future {
                    Some(task) => task,
                    None => future.insert(factory(bb)),
                };
                let waker = noop_waker();
                let mut cx = Context::from_waker(&waker);
                match task.as_mut().poll(&mut cx) {
                    Poll::Ready(status) => {
                        *future = None;
                        self.finish(status)
                    }
                    Poll::Pending => {
                        self.state = NodeState::Running;
                        Status::Running
                    }
                }
            }
        }
    }

    fn reset(&mut self) {
        self.state = NodeState::Idle;
        match &mut self.mode {
            Mode::Sync(_) => {}
            Mode::Spawned { handle, .. } => {
                if let Some(join) = handle.take() {
                    join.abort();
                }
            }
            Mode::Task { future, .. } => {
                *future = None;
            }
        }
    }

    fn halt(&mut self) {
        match &mut self.mode {
            Mode::Sync(_) => {}
            Mode::Spawned { handle, .. } => {
                if let Some(join) = handle.take() {
                    join.abort();
                }
            }
            Mode::Task { future, .. } => {
                *future = None;
            }
        }
        self.state = NodeState::Halted;
    }

    fn state(&self) -> NodeState {
        self.state
    }
}

/// Future that suspends exactly once; the suspension boundary for
/// [`Action::task`] leaves.
pub fn yield_now() -> YieldNow {
    YieldNow { yielded: false }
}

pub struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            Poll::Ready(())
        } else {
            self.yielded = true;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }
}
