//! Single-assignment shared results with executor-bound continuations.
//!
//! A [`Promise`] is the write end, a [`SharedFuture`] any number of read
//! ends. Continuations registered with [`SharedFuture::then`] are posted to
//! an [`Executor`] and never run on the thread that fulfils the promise, so
//! everything a continuation touches stays on the executor's owner thread.
//!
//! Dropping a promise that was never fulfilled cancels its future.

use super::executor::Executor;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type Callback<T> = Box<dyn FnOnce(Option<Arc<T>>) + Send>;

enum Slot<T> {
    Pending(Vec<Callback<T>>),
    Ready(Arc<T>),
    Canceled,
}

struct Shared<T> {
    slot: Mutex<Slot<T>>,
}

impl<T> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, Slot<T>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Moves the slot out of `Pending` and runs the callbacks outside the lock.
    fn complete(&self, value: Option<T>) {
        let (callbacks, value) = {
            let mut slot = self.lock();
            let callbacks = match &mut *slot {
                Slot::Pending(callbacks) => std::mem::take(callbacks),
                _ => return,
            };
            let value = value.map(Arc::new);
            *slot = match &value {
                Some(v) => Slot::Ready(v.clone()),
                None => Slot::Canceled,
            };
            (callbacks, value)
        };
        for cb in callbacks {
            cb(value.clone());
        }
    }

    /// Registers `f`, or runs it right away if the result is already known.
    fn subscribe(&self, f: Callback<T>) {
        let ready = {
            let mut slot = self.lock();
            match &mut *slot {
                Slot::Pending(callbacks) => {
                    callbacks.push(f);
                    return;
                }
                Slot::Ready(v) => Some(v.clone()),
                Slot::Canceled => None,
            }
        };
        f(ready);
    }
}

/// Write end of a [`SharedFuture`].
pub struct Promise<T> {
    shared: Option<Arc<Shared<T>>>,
}

impl<T: Send + Sync + 'static> Promise<T> {
    pub fn new() -> (Promise<T>, SharedFuture<T>) {
        let shared = Arc::new(Shared {
            slot: Mutex::new(Slot::Pending(Vec::new())),
        });
        (
            Promise {
                shared: Some(shared.clone()),
            },
            SharedFuture { shared },
        )
    }

    pub fn fulfill(mut self, value: T) {
        if let Some(shared) = self.shared.take() {
            shared.complete(Some(value));
        }
    }

    /// Resolves the future with the outcome of `future` once it completes.
    /// Cancellation is forwarded.
    pub fn fulfill_from(self, future: &SharedFuture<T>)
    where
        T: Clone,
    {
        future.on_complete(move |result| {
            if let Some(value) = result {
                self.fulfill(value.clone());
            }
        });
    }
}

impl<T> Drop for Promise<T> {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.take() {
            shared.complete(None);
        }
    }
}

/// Read end of a single-assignment result. Cloning yields another handle on
/// the same result.
pub struct SharedFuture<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for SharedFuture<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T> fmt::Debug for SharedFuture<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.shared.lock() {
            Slot::Pending(_) => "pending",
            Slot::Ready(_) => "ready",
            Slot::Canceled => "canceled",
        };
        f.debug_struct("SharedFuture").field("state", &state).finish()
    }
}

impl<T: Send + Sync + 'static> SharedFuture<T> {
    /// An already resolved future.
    pub fn ready(value: T) -> Self {
        Self {
            shared: Arc::new(Shared {
                slot: Mutex::new(Slot::Ready(Arc::new(value))),
            }),
        }
    }

    /// An already canceled future.
    pub fn canceled() -> Self {
        Self {
            shared: Arc::new(Shared {
                slot: Mutex::new(Slot::Canceled),
            }),
        }
    }

    pub fn is_finished(&self) -> bool {
        !matches!(&*self.shared.lock(), Slot::Pending(_))
    }

    pub fn is_canceled(&self) -> bool {
        matches!(&*self.shared.lock(), Slot::Canceled)
    }

    /// The value, once resolved.
    pub fn result(&self) -> Option<Arc<T>> {
        match &*self.shared.lock() {
            Slot::Ready(v) => Some(v.clone()),
            _ => None,
        }
    }

    /// True if both handles refer to the same result.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    /// Calls `f` with the value (or `None` if canceled) as soon as the future
    /// completes, on whichever thread completes it. Runs `f` immediately if
    /// the future is already finished.
    pub fn on_complete(&self, f: impl FnOnce(Option<&T>) + Send + 'static) {
        self.shared
            .subscribe(Box::new(move |value: Option<Arc<T>>| f(value.as_deref())));
    }

    /// Runs `f` on `executor` with the resolved value and returns a future of
    /// its result. Cancellation propagates without calling `f`.
    pub fn then<U, F>(&self, executor: &Executor, f: F) -> SharedFuture<U>
    where
        U: Send + Sync + 'static,
        F: FnOnce(&T) -> U + Send + 'static,
    {
        let (promise, future) = Promise::new();
        let executor = executor.clone();
        self.shared.subscribe(Box::new(move |value: Option<Arc<T>>| {
            if let Some(value) = value {
                executor.post(move || promise.fulfill(f(&value)));
            }
        }));
        future
    }

    /// Like [`then`](Self::then) but `f` returns another future, which the
    /// result follows.
    pub fn then_future<U, F>(&self, executor: &Executor, f: F) -> SharedFuture<U>
    where
        U: Clone + Send + Sync + 'static,
        F: FnOnce(&T) -> SharedFuture<U> + Send + 'static,
    {
        let (promise, future) = Promise::new();
        let executor = executor.clone();
        self.shared.subscribe(Box::new(move |value: Option<Arc<T>>| {
            if let Some(value) = value {
                executor.post(move || promise.fulfill_from(&f(&value)));
            }
        }));
        future
    }
}
