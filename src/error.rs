//! Error handling for visflow-rs
//!
//! This module defines the crate error type and a Result alias for use
//! throughout the library.
//!
//! Evaluation failures of pipeline steps are *not* errors in this sense:
//! they travel inside a [`PipelineFlowState`](crate::pipeline::PipelineFlowState)
//! as an error status so the caches can store them like any other result.

use thiserror::Error;

/// Main error type for visflow-rs operations
#[derive(Error, Debug)]
pub enum VisFlowError {
    /// An expected data object, type or path is absent from a collection
    #[error("Missing data: {0}")]
    MissingData(String),

    /// A caller broke a precondition of the data model
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// A modifier failed while computing its output
    #[error("Modifier error: {0}")]
    Modifier(String),

    /// A promise was dropped before it delivered a value
    #[error("Canceled: {0}")]
    Canceled(String),

    /// Timeout errors
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<VisFlowError>,
    },
}

impl VisFlowError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        VisFlowError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Returns true if this error, or the error it wraps, is a missing-data error.
    pub fn is_missing_data(&self) -> bool {
        match self {
            VisFlowError::MissingData(_) => true,
            VisFlowError::WithContext { source, .. } => source.is_missing_data(),
            _ => false,
        }
    }

    /// The innermost message without any context prefixes.
    pub fn root_message(&self) -> String {
        match self {
            VisFlowError::WithContext { source, .. } => source.root_message(),
            VisFlowError::MissingData(msg)
            | VisFlowError::InvariantViolation(msg)
            | VisFlowError::Modifier(msg)
            | VisFlowError::Canceled(msg)
            | VisFlowError::Timeout(msg)
            | VisFlowError::Config(msg)
            | VisFlowError::Serialization(msg) => msg.clone(),
            VisFlowError::Io(e) => e.to_string(),
        }
    }
}

impl From<serde_json::Error> for VisFlowError {
    fn from(err: serde_json::Error) -> Self {
        VisFlowError::Serialization(err.to_string())
    }
}

/// Result type alias for visflow-rs operations
pub type Result<T> = std::result::Result<T, VisFlowError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}
