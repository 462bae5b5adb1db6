//! Collaborators shared by the scene nodes of one scene.

use crate::animation::{AnimationSettings, TimePoint};
use crate::config::EngineConfig;
use crate::pipeline::{Executor, PipelineEvaluationRequest};
use crate::undo::UndoStack;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct SceneContext {
    executor: Executor,
    undo_stack: UndoStack,
    animation: AnimationSettings,
    config: Arc<EngineConfig>,
}

impl SceneContext {
    /// Context with the default configuration.
    pub fn new(executor: Executor) -> Self {
        Self::with_config(executor, Arc::new(EngineConfig::default()))
    }

    pub fn with_config(executor: Executor, config: Arc<EngineConfig>) -> Self {
        let animation = AnimationSettings::new(config.animation.ticks_per_frame);
        animation.set_current_frame(config.animation.start_frame);
        Self {
            executor,
            undo_stack: UndoStack::new(),
            animation,
            config,
        }
    }

    /// The executor all node continuations run on.
    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    pub fn undo_stack(&self) -> &UndoStack {
        &self.undo_stack
    }

    pub fn animation(&self) -> &AnimationSettings {
        &self.animation
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// An evaluation request for `time` honouring the configured
    /// break-on-error policy.
    pub fn request_at(&self, time: TimePoint) -> PipelineEvaluationRequest {
        PipelineEvaluationRequest::new(time)
            .with_break_on_error(self.config.evaluation.break_on_error)
    }

    pub fn wait_timeout(&self) -> Duration {
        self.config.evaluation.wait_timeout()
    }
}
