//! Animation time model
//!
//! - [`TimeInterval`] - closed validity range of a computed result
//! - [`AnimationSettings`] - the shared "current time" of a scene

pub mod interval;

pub use interval::*;

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

/// Default number of ticks between two animation frames.
pub const DEFAULT_TICKS_PER_FRAME: TimePoint = TICKS_PER_SECOND / 10;

/// Shared animation state of a scene. Cloning yields another handle on the
/// same current time.
#[derive(Debug, Clone)]
pub struct AnimationSettings {
    time: Arc<AtomicI32>,
    ticks_per_frame: TimePoint,
}

impl AnimationSettings {
    pub fn new(ticks_per_frame: TimePoint) -> Self {
        Self {
            time: Arc::new(AtomicI32::new(0)),
            ticks_per_frame: ticks_per_frame.max(1),
        }
    }

    /// The current animation time.
    pub fn time(&self) -> TimePoint {
        self.time.load(Ordering::Acquire)
    }

    pub fn set_time(&self, time: TimePoint) {
        self.time.store(time, Ordering::Release);
    }

    pub fn ticks_per_frame(&self) -> TimePoint {
        self.ticks_per_frame
    }

    pub fn frame_to_time(&self, frame: i32) -> TimePoint {
        frame.saturating_mul(self.ticks_per_frame)
    }

    /// Converts a time to a frame number, rounding towards negative infinity.
    pub fn time_to_frame(&self, time: TimePoint) -> i32 {
        time.div_euclid(self.ticks_per_frame)
    }

    /// Jumps to the given animation frame.
    pub fn set_current_frame(&self, frame: i32) {
        self.set_time(self.frame_to_time(frame));
    }
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self::new(DEFAULT_TICKS_PER_FRAME)
    }
}
