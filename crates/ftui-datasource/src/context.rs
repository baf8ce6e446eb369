#![forbid(unsafe_code)]

//! Execution contexts for delivering batches to the UI.
//!
//! List surfaces are affinitized to one context (usually the UI thread).
//! Backends that notify from worker threads hand each finished batch to a
//! [`UiContext`] as a single task, so a batch is never split across contexts
//! and never interleaved with another batch.
//!
//! # Invariants
//!
//! 1. A context runs tasks in dispatch order (FIFO).
//! 2. A task runs to completion before the next one starts.
//!
//! [`QueuedContext`] follows the same channel-and-drain shape as the runtime's
//! stdio capture: any thread may send, the owner drains on its own loop.

use std::sync::mpsc;
use std::sync::Arc;

/// Unit of work marshalled onto a UI context.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// A serial execution context that list surfaces live on.
pub trait UiContext: Send + Sync {
    /// Schedule `task` to run on this context after every task dispatched
    /// before it.
    fn dispatch(&self, task: Task);
}

impl<C: UiContext + ?Sized> UiContext for Arc<C> {
    fn dispatch(&self, task: Task) {
        (**self).dispatch(task);
    }
}

/// Runs every task inline on the dispatching thread.
///
/// Only correct when all notifications already arrive on the UI context.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateContext;

impl UiContext for ImmediateContext {
    fn dispatch(&self, task: Task) {
        task();
    }
}

/// Channel-backed context drained explicitly by its owner.
///
/// Create the pair with [`QueuedContext::new`]; give the context to data
/// sources and call [`TaskQueue::run_pending`] from the UI loop.
///
/// ```
/// use ftui_datasource::context::{QueuedContext, UiContext};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// let (ctx, queue) = QueuedContext::new();
/// let hits = Arc::new(AtomicUsize::new(0));
/// let h = Arc::clone(&hits);
/// ctx.dispatch(Box::new(move || {
///     h.fetch_add(1, Ordering::SeqCst);
/// }));
/// assert_eq!(hits.load(Ordering::SeqCst), 0);
/// assert_eq!(queue.run_pending(), 1);
/// assert_eq!(hits.load(Ordering::SeqCst), 1);
/// ```
#[derive(Debug, Clone)]
pub struct QueuedContext {
    tx: mpsc::Sender<Task>,
}

/// Receiving side of a [`QueuedContext`].
pub struct TaskQueue {
    rx: mpsc::Receiver<Task>,
}

impl QueuedContext {
    /// Create a context and the queue its tasks land in.
    #[must_use]
    pub fn new() -> (Self, TaskQueue) {
        let (tx, rx) = mpsc::channel();
        (Self { tx }, TaskQueue { rx })
    }
}

impl UiContext for QueuedContext {
    fn dispatch(&self, task: Task) {
        if self.tx.send(task).is_err() {
            tracing::trace!("task queue closed; dropping dispatched task");
        }
    }
}

impl TaskQueue {
    /// Run every task currently queued, in order. Non-blocking.
    ///
    /// Returns the number of tasks run. Tasks dispatched while draining are
    /// run in the same call.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.rx.try_recv() {
            task();
            ran += 1;
        }
        ran
    }

    /// Run at most one queued task. Returns whether one ran.
    pub fn run_one(&self) -> bool {
        match self.rx.try_recv() {
            Ok(task) => {
                task();
                true
            }
            Err(_) => false,
        }
    }
}

impl std::fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskQueue").finish_non_exhaustive()
    }
}
