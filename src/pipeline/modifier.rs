//! Modifiers and their insertion into a pipeline.
//!
//! A [`Modifier`] is pure computation on a flow state. A
//! [`ModifierApplication`] binds one modifier to its upstream input and is
//! itself a [`PipelineObject`], so applications chain into a pipeline.

use super::executor::{spawn_worker, Executor};
use super::flow_state::PipelineFlowState;
use super::future::SharedFuture;
use super::object::{PipelineEvaluationRequest, PipelineObject, PipelineObjectRef};
use super::status::PipelineStatus;
use crate::animation::{AnimationSettings, TimeInterval, TimePoint};
use crate::error::Result;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Computation applied to the data flowing through a pipeline.
pub trait Modifier: Send + Sync {
    fn title(&self) -> String;

    fn is_enabled(&self) -> bool {
        true
    }

    /// Time range over which the modifier's own parameters are constant.
    fn validity(&self, _time: TimePoint) -> TimeInterval {
        TimeInterval::infinite()
    }

    /// Modifies `state` in place. An `Err` becomes an error status of the
    /// output state.
    fn modify(&self, request: &PipelineEvaluationRequest, state: &mut PipelineFlowState) -> Result<()>;

    /// Fast variant for interactive feedback. Defaults to [`modify`](Self::modify).
    fn modify_preliminary(
        &self,
        request: &PipelineEvaluationRequest,
        state: &mut PipelineFlowState,
    ) -> Result<()> {
        self.modify(request, state)
    }
}

pub struct ModifierApplication {
    modifier: Arc<dyn Modifier>,
    input: RwLock<Option<PipelineObjectRef>>,
    executor: Executor,
    animation: AnimationSettings,
    status: Arc<Mutex<PipelineStatus>>,
    worker: Option<tokio::runtime::Handle>,
}

impl ModifierApplication {
    pub fn new(
        modifier: Arc<dyn Modifier>,
        input: Option<PipelineObjectRef>,
        executor: Executor,
        animation: AnimationSettings,
    ) -> Self {
        Self {
            modifier,
            input: RwLock::new(input),
            executor,
            animation,
            status: Arc::new(Mutex::new(PipelineStatus::success())),
            worker: None,
        }
    }

    /// Runs the modifier on the tokio blocking pool of `handle` instead of
    /// the executor's thread.
    pub fn with_worker(mut self, handle: tokio::runtime::Handle) -> Self {
        self.worker = Some(handle);
        self
    }

    pub fn modifier(&self) -> &Arc<dyn Modifier> {
        &self.modifier
    }

    pub fn input(&self) -> Option<PipelineObjectRef> {
        self.input
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_input(&self, input: Option<PipelineObjectRef>) {
        *self.input.write().unwrap_or_else(PoisonError::into_inner) = input;
    }

    /// Status reported by the most recent evaluation.
    pub fn status(&self) -> PipelineStatus {
        self.status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The data source at the upstream end of the modifier chain.
    pub fn pipeline_source(&self) -> Option<PipelineObjectRef> {
        let mut current = self.input();
        while let Some(obj) = current {
            if obj.as_modifier_application().is_none() {
                return Some(obj);
            }
            current = obj.as_modifier_application().and_then(|app| app.input());
        }
        None
    }

    fn missing_input(time: TimePoint) -> PipelineFlowState {
        PipelineFlowState::from_status(
            PipelineStatus::error("Modifier has no input."),
            TimeInterval::instant(time),
        )
    }
}

/// Prepares the input for the modifier. `Err` carries a state that is
/// passed through without running the modifier.
fn prepare_input(
    modifier: &dyn Modifier,
    request: &PipelineEvaluationRequest,
    input: &PipelineFlowState,
) -> std::result::Result<PipelineFlowState, PipelineFlowState> {
    let mut state = input.clone();
    if state.status().is_error() {
        if request.break_on_error() {
            return Err(state);
        }
    } else {
        state.set_status(PipelineStatus::success());
    }
    if !modifier.is_enabled() || state.is_empty() {
        return Err(state);
    }
    Ok(state)
}

/// Runs the modifier and folds its outcome into the state. A failing
/// modifier yields its unmodified input with an error status.
fn apply(
    modifier: &dyn Modifier,
    request: &PipelineEvaluationRequest,
    input: PipelineFlowState,
    preliminary: bool,
    status_slot: &Mutex<PipelineStatus>,
) -> PipelineFlowState {
    let validity = modifier.validity(request.time());
    // Objects stay shared with `input`, so writes below copy them first.
    let mut state = input.clone();
    let outcome = if preliminary {
        modifier.modify_preliminary(request, &mut state)
    } else {
        modifier.modify(request, &mut state)
    };
    let state = match outcome {
        Ok(()) => {
            state.intersect_state_validity(&validity);
            state
        }
        Err(e) => {
            tracing::warn!("Modifier '{}' failed: {}", modifier.title(), e);
            drop(state);
            let mut state = input;
            state.set_status(PipelineStatus::error(format!(
                "Modifier '{}' reported: {}",
                modifier.title(),
                e.root_message()
            )));
            state
        }
    };
    *status_slot.lock().unwrap_or_else(PoisonError::into_inner) = state.status().clone();
    state
}

impl PipelineObject for ModifierApplication {
    fn evaluate(&self, request: &PipelineEvaluationRequest) -> SharedFuture<PipelineFlowState> {
        let Some(input) = self.input() else {
            return SharedFuture::ready(Self::missing_input(request.time()));
        };
        let request = *request;
        let modifier = self.modifier.clone();
        let status = self.status.clone();
        let worker = self.worker.clone();
        input
            .evaluate(&request)
            .then_future(&self.executor, move |input_state| {
                let state = match prepare_input(modifier.as_ref(), &request, input_state) {
                    Ok(state) => state,
                    Err(passthrough) => return SharedFuture::ready(passthrough),
                };
                match worker {
                    Some(handle) => spawn_worker(&handle, move || {
                        apply(modifier.as_ref(), &request, state, false, &status)
                    }),
                    None => SharedFuture::ready(apply(
                        modifier.as_ref(),
                        &request,
                        state,
                        false,
                        &status,
                    )),
                }
            })
    }

    fn evaluate_preliminary(&self) -> PipelineFlowState {
        let request = PipelineEvaluationRequest::new(self.animation.time());
        let Some(input) = self.input() else {
            return Self::missing_input(request.time());
        };
        let input_state = input.evaluate_preliminary();
        if input_state.is_empty() {
            let mut state = input_state;
            state.set_status(PipelineStatus::error("Modifier input is empty."));
            return state;
        }
        match prepare_input(self.modifier.as_ref(), &request, &input_state) {
            Ok(state) => apply(self.modifier.as_ref(), &request, state, true, &self.status),
            Err(passthrough) => passthrough,
        }
    }

    fn object_title(&self) -> String {
        self.modifier.title()
    }

    fn number_of_frames(&self) -> i32 {
        self.input().map_or(1, |input| input.number_of_frames())
    }

    fn as_modifier_application(&self) -> Option<&ModifierApplication> {
        Some(self)
    }
}
