//! Owner-thread task queue and worker offloading.
//!
//! Every scene node is bound to one [`Executor`]. Continuations that touch
//! node caches are posted there and run when the owner thread drains its
//! [`TaskQueue`], which serializes all cache writes without locking the
//! evaluation itself. Heavy computation goes to the tokio blocking pool via
//! [`spawn_worker`].

use super::future::{Promise, SharedFuture};
use crate::error::{Result, VisFlowError};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::thread::ThreadId;
use std::time::{Duration, Instant};

/// A unit of work posted to an executor.
pub type Task = Box<dyn FnOnce() + Send>;

/// Cloneable handle for posting tasks to a [`TaskQueue`].
#[derive(Clone)]
pub struct Executor {
    tx: Sender<Task>,
}

impl Executor {
    /// Queues `task`. If the queue is gone the task is dropped, which cancels
    /// any promise it owns.
    pub fn post(&self, task: impl FnOnce() + Send + 'static) {
        if self.tx.send(Box::new(task)).is_err() {
            tracing::debug!("Task queue closed; dropping posted task");
        }
    }
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("queued", &self.tx.len())
            .finish()
    }
}

/// Receiving end of an executor, driven by its owner thread.
pub struct TaskQueue {
    tx: Sender<Task>,
    rx: Receiver<Task>,
    owner: ThreadId,
}

impl TaskQueue {
    /// Creates a queue owned by the calling thread.
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            tx,
            rx,
            owner: std::thread::current().id(),
        }
    }

    pub fn executor(&self) -> Executor {
        Executor {
            tx: self.tx.clone(),
        }
    }

    /// Runs every task queued so far, including tasks those tasks post.
    /// Returns the number of tasks run.
    pub fn run_pending(&self) -> usize {
        debug_assert!(self.is_owner_thread(), "task queue drained off its owner thread");
        let mut count = 0;
        while let Ok(task) = self.rx.try_recv() {
            task();
            count += 1;
        }
        count
    }

    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Runs queued tasks until `future` resolves or `timeout` elapses.
    pub fn block_on<T>(&self, future: &SharedFuture<T>, timeout: Duration) -> Result<std::sync::Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        // Wake the loop when the future completes on another thread.
        let waker = self.executor();
        future.on_complete(move |_| waker.post(|| {}));

        let deadline = Instant::now() + timeout;
        loop {
            self.run_pending();
            if future.is_finished() {
                return future.result().ok_or_else(|| {
                    VisFlowError::Canceled("the awaited evaluation was canceled".into())
                });
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(task) => task(),
                Err(RecvTimeoutError::Timeout) => {
                    return Err(VisFlowError::Timeout(format!(
                        "evaluation did not finish within {} ms",
                        timeout.as_millis()
                    )));
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(VisFlowError::Canceled("task queue disconnected".into()));
                }
            }
        }
    }

    pub fn is_owner_thread(&self) -> bool {
        std::thread::current().id() == self.owner
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs `f` on the tokio blocking pool and resolves the returned future with
/// its result. A panic in `f` cancels the future.
pub fn spawn_worker<T, F>(handle: &tokio::runtime::Handle, f: F) -> SharedFuture<T>
where
    T: Send + Sync + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (promise, future) = Promise::new();
    handle.spawn_blocking(move || promise.fulfill(f()));
    future
}
