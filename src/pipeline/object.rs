//! Evaluation contract of pipeline steps.

use super::flow_state::PipelineFlowState;
use super::future::SharedFuture;
use super::modifier::ModifierApplication;
use crate::animation::TimePoint;
use std::sync::Arc;

/// Parameters of one pipeline evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineEvaluationRequest {
    time: TimePoint,
    break_on_error: bool,
}

impl PipelineEvaluationRequest {
    pub fn new(time: TimePoint) -> Self {
        Self {
            time,
            break_on_error: false,
        }
    }

    /// Stop at the first step that reports an error instead of letting later
    /// steps run on the error state.
    pub fn with_break_on_error(mut self, break_on_error: bool) -> Self {
        self.break_on_error = break_on_error;
        self
    }

    pub fn time(&self) -> TimePoint {
        self.time
    }

    pub fn break_on_error(&self) -> bool {
        self.break_on_error
    }
}

/// A step of a pipeline: a data source or a modifier application.
///
/// `evaluate` must resolve to a state whose validity contains the requested
/// time. `evaluate_preliminary` returns whatever can be produced right away.
pub trait PipelineObject: Send + Sync {
    fn evaluate(&self, request: &PipelineEvaluationRequest) -> SharedFuture<PipelineFlowState>;

    fn evaluate_preliminary(&self) -> PipelineFlowState;

    fn object_title(&self) -> String;

    /// Number of animation frames this step can produce.
    fn number_of_frames(&self) -> i32 {
        1
    }

    fn as_modifier_application(&self) -> Option<&ModifierApplication> {
        None
    }
}

/// Shared handle on a pipeline step.
pub type PipelineObjectRef = Arc<dyn PipelineObject>;

/// Address comparison of two pipeline steps.
#[inline]
pub fn same_pipeline_object(a: &PipelineObjectRef, b: &PipelineObjectRef) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
