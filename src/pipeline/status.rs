//! Outcome of a pipeline evaluation step.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StatusKind {
    #[default]
    Success,
    Warning,
    Error,
}

/// Status attached to a flow state or reported by a modifier.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PipelineStatus {
    pub kind: StatusKind,
    pub text: String,
}

impl PipelineStatus {
    pub fn success() -> Self {
        Self::default()
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Warning,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Error,
            text: text.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == StatusKind::Error
    }
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            StatusKind::Success if self.text.is_empty() => write!(f, "ok"),
            StatusKind::Success => write!(f, "{}", self.text),
            StatusKind::Warning => write!(f, "warning: {}", self.text),
            StatusKind::Error => write!(f, "error: {}", self.text),
        }
    }
}
