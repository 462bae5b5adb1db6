//! Undo-recording state as seen by the pipeline core.
//!
//! Evaluation-time copy-on-write is not a user-visible edit, so the data
//! model refuses structural mutation while an undo transaction is recording
//! on the current thread. Pipeline continuations wrap their work in an
//! [`UndoSuspender`] so that nothing they do can be recorded.
//!
//! Recording and suspension are tracked per thread because all cache writes
//! happen on the owner thread of a scene node.

use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

thread_local! {
    static RECORDING_DEPTH: Cell<u32> = const { Cell::new(0) };
    static SUSPEND_DEPTH: Cell<u32> = const { Cell::new(0) };
}

/// Returns true if an undo transaction is recording on this thread and
/// recording has not been suspended.
pub fn is_recording() -> bool {
    RECORDING_DEPTH.with(|r| r.get() > 0) && SUSPEND_DEPTH.with(|s| s.get() == 0)
}

/// Suspends undo recording on the current thread for its lifetime.
#[must_use = "recording resumes as soon as the suspender is dropped"]
pub struct UndoSuspender {
    _not_send: std::marker::PhantomData<*const ()>,
}

impl UndoSuspender {
    pub fn new() -> Self {
        SUSPEND_DEPTH.with(|s| s.set(s.get() + 1));
        Self {
            _not_send: std::marker::PhantomData,
        }
    }
}

impl Default for UndoSuspender {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for UndoSuspender {
    fn drop(&mut self) {
        SUSPEND_DEPTH.with(|s| s.set(s.get().saturating_sub(1)));
    }
}

/// Guard returned by [`UndoStack::begin_recording`].
#[must_use = "the transaction ends when the guard is dropped"]
pub struct RecordingGuard {
    _not_send: std::marker::PhantomData<*const ()>,
}

impl Drop for RecordingGuard {
    fn drop(&mut self) {
        RECORDING_DEPTH.with(|r| r.set(r.get().saturating_sub(1)));
    }
}

/// Guard returned by [`UndoStack::begin_undo_redo`].
#[must_use = "the undo/redo phase ends when the guard is dropped"]
pub struct UndoRedoGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for UndoRedoGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Minimal handle on the application's undo stack.
#[derive(Debug, Clone, Default)]
pub struct UndoStack {
    undoing_or_redoing: Arc<AtomicBool>,
}

impl UndoStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a recording transaction on the current thread.
    pub fn begin_recording(&self) -> RecordingGuard {
        RECORDING_DEPTH.with(|r| r.set(r.get() + 1));
        RecordingGuard {
            _not_send: std::marker::PhantomData,
        }
    }

    /// Marks the stack as replaying an undo or redo operation.
    pub fn begin_undo_redo(&self) -> UndoRedoGuard {
        self.undoing_or_redoing.store(true, Ordering::Release);
        UndoRedoGuard {
            flag: self.undoing_or_redoing.clone(),
        }
    }

    pub fn is_undoing_or_redoing(&self) -> bool {
        self.undoing_or_redoing.load(Ordering::Acquire)
    }

    pub fn is_recording(&self) -> bool {
        is_recording()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_and_suspension() {
        let stack = UndoStack::new();
        assert!(!is_recording());
        {
            let _rec = stack.begin_recording();
            assert!(is_recording());
            {
                let _noundo = UndoSuspender::new();
                assert!(!is_recording());
            }
            assert!(is_recording());
        }
        assert!(!is_recording());
    }

    #[test]
    fn test_undo_redo_flag() {
        let stack = UndoStack::new();
        let other = stack.clone();
        assert!(!stack.is_undoing_or_redoing());
        {
            let _guard = stack.begin_undo_redo();
            assert!(other.is_undoing_or_redoing());
        }
        assert!(!other.is_undoing_or_redoing());
    }
}
