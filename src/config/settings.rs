//! Settings sections of the engine configuration
//!
//! - [`LoggingSettings`] - log filter and optional rolling log directory
//! - [`EvaluationSettings`] - pipeline evaluation behaviour
//! - [`AnimationDefaults`] - time base of newly created scenes

use crate::animation::{TimePoint, DEFAULT_TICKS_PER_FRAME};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default tracing filter when `RUST_LOG` is not set
pub const DEFAULT_LOG_FILTER: &str = "info,visflow_rs=debug";

/// Default time to wait for an evaluation to finish
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 30_000;

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `EnvFilter` directive string
    pub filter: String,

    /// Directory for daily rolling log files (no file logging if unset)
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
            log_dir: None,
        }
    }
}

/// Pipeline evaluation behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationSettings {
    /// Stop evaluating at the first pipeline step that reports an error
    pub break_on_error: bool,

    /// How long synchronous waiters block on an evaluation
    pub wait_timeout_ms: u64,

    /// Keep transformed rendering results across invalidation so that
    /// asynchronous vis elements can reuse them
    pub keep_stale_rendering_results: bool,
}

impl EvaluationSettings {
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        Self {
            break_on_error: false,
            wait_timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            keep_stale_rendering_results: true,
        }
    }
}

/// Animation time base
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationDefaults {
    pub ticks_per_frame: TimePoint,
    pub start_frame: i32,
}

impl Default for AnimationDefaults {
    fn default() -> Self {
        Self {
            ticks_per_frame: DEFAULT_TICKS_PER_FRAME,
            start_frame: 0,
        }
    }
}
