//! Mock pipeline objects and vis elements

use mockall::mock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use visflow_rs::{
    animation::{TimeInterval, TimePoint},
    data::{Box3, DataObjectRef, DataVis, TransformingDataVis},
    pipeline::{
        PipelineEvaluationRequest, PipelineFlowState, PipelineObject, PipelineStatus,
        SharedFuture,
    },
};

mock! {
    pub Source {}

    impl PipelineObject for Source {
        fn evaluate(&self, request: &PipelineEvaluationRequest) -> SharedFuture<PipelineFlowState>;
        fn evaluate_preliminary(&self) -> PipelineFlowState;
        fn object_title(&self) -> String;
    }
}

/// A data source serving clones of a fixed state, counting evaluations.
pub struct StaticSource {
    state: Mutex<PipelineFlowState>,
    evaluations: AtomicUsize,
}

impl StaticSource {
    pub fn new(state: PipelineFlowState) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(state),
            evaluations: AtomicUsize::new(0),
        })
    }

    pub fn set_state(&self, state: PipelineFlowState) {
        *self.state.lock().unwrap() = state;
    }

    pub fn evaluations(&self) -> usize {
        self.evaluations.load(Ordering::SeqCst)
    }
}

impl PipelineObject for StaticSource {
    fn evaluate(&self, _request: &PipelineEvaluationRequest) -> SharedFuture<PipelineFlowState> {
        self.evaluations.fetch_add(1, Ordering::SeqCst);
        SharedFuture::ready(self.state.lock().unwrap().clone())
    }

    fn evaluate_preliminary(&self) -> PipelineFlowState {
        self.state.lock().unwrap().clone()
    }

    fn object_title(&self) -> String {
        "Static source".into()
    }
}

/// A plain vis element with a fixed bounding box and a switchable enabled flag.
#[derive(Debug)]
pub struct TestVis {
    pub name: String,
    pub enabled: AtomicBool,
    pub extent: Box3,
}

impl TestVis {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            enabled: AtomicBool::new(true),
            extent: Box3::new([0.0; 3], [1.0; 3]),
        })
    }
}

impl DataVis for TestVis {
    fn title(&self) -> String {
        self.name.clone()
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn clone_vis(&self) -> Box<dyn DataVis> {
        Box::new(TestVis {
            name: self.name.clone(),
            enabled: AtomicBool::new(self.is_enabled()),
            extent: self.extent,
        })
    }

    fn bounding_box(
        &self,
        _time: TimePoint,
        _object_stack: &[DataObjectRef],
        _state: &PipelineFlowState,
    ) -> Box3 {
        self.extent
    }
}

/// A transforming vis element that tags the state with an attribute naming
/// itself and counts its invocations.
#[derive(Debug)]
pub struct TestTransformingVis {
    pub name: String,
    pub calls: Arc<AtomicUsize>,
}

impl TestTransformingVis {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            calls: Arc::new(AtomicUsize::new(0)),
        })
    }
}

impl DataVis for TestTransformingVis {
    fn title(&self) -> String {
        self.name.clone()
    }

    fn clone_vis(&self) -> Box<dyn DataVis> {
        Box::new(TestTransformingVis {
            name: self.name.clone(),
            calls: self.calls.clone(),
        })
    }

    fn as_transforming(&self) -> Option<&dyn TransformingDataVis> {
        Some(self)
    }
}

impl TransformingDataVis for TestTransformingVis {
    fn transform_data(
        &self,
        _request: &PipelineEvaluationRequest,
        _data_object: &DataObjectRef,
        mut state: PipelineFlowState,
        _stale: &PipelineFlowState,
    ) -> SharedFuture<PipelineFlowState> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        state
            .add_attribute("TransformedBy", self.name.as_str(), None)
            .expect("attribute insertion");
        SharedFuture::ready(state)
    }
}

/// A ready state without data carrying `status` over `validity`.
pub fn status_state(status: PipelineStatus, validity: TimeInterval) -> PipelineFlowState {
    PipelineFlowState::from_status(status, validity)
}
