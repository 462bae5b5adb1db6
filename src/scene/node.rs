//! A scene node owning a pipeline and caching its output.
//!
//! # Caches
//!
//! - **pipeline cache**: the evaluated output for the last requested time,
//!   after vis-element substitution
//! - **rendering cache**: the pipeline output after asynchronous vis-element
//!   transforms; invalidated softly so transforms can reuse stale output
//! - **preliminary cache**: a synchronous best-effort state with infinite
//!   validity, cleared on every upstream change
//!
//! All cache writes happen in continuations posted to the scene's
//! [`Executor`](crate::pipeline::Executor). The node's mutex is only held for
//! short bookkeeping sections and never across a call into a pipeline step
//! or vis element.

use super::context::SceneContext;
use super::event::{Dependents, EventSource, ReferenceEvent};
use super::vis_replacement::{substitute_vis_elements, VisReplacementTable};
use crate::animation::{TimeInterval, TimePoint};
use crate::data::{same_vis, visit_recursive, Box3, DataObjectRef, DataVisRef};
use crate::pipeline::{
    same_pipeline_object, Modifier, ModifierApplication, PipelineCache, PipelineEvaluationRequest,
    PipelineFlowState, PipelineObjectRef, PipelineStatus, SharedFuture,
};
use crate::undo::UndoSuspender;
use crossbeam_channel::Receiver;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

struct NodeState {
    node_name: String,
    data_provider: Option<PipelineObjectRef>,
    pipeline_cache: PipelineCache,
    rendering_cache: PipelineCache,
    preliminary_cache: PipelineFlowState,
    vis_elements: Vec<DataVisRef>,
    replacements: VisReplacementTable,
    bounding_box: Option<(TimePoint, Box3)>,
    being_loaded: bool,
    deleted: bool,
}

struct NodeInner {
    context: SceneContext,
    state: Mutex<NodeState>,
    dependents: Dependents,
}

/// Cloning yields another handle on the same node.
#[derive(Clone)]
pub struct PipelineSceneNode {
    inner: Arc<NodeInner>,
}

impl PipelineSceneNode {
    pub fn new(context: SceneContext) -> Self {
        Self {
            inner: Arc::new(NodeInner {
                context,
                state: Mutex::new(NodeState {
                    node_name: String::new(),
                    data_provider: None,
                    pipeline_cache: PipelineCache::new(),
                    rendering_cache: PipelineCache::new(),
                    preliminary_cache: PipelineFlowState::default(),
                    vis_elements: Vec::new(),
                    replacements: VisReplacementTable::new(),
                    bounding_box: None,
                    being_loaded: false,
                    deleted: false,
                }),
                dependents: Dependents::default(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, NodeState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn downgrade(&self) -> Weak<NodeInner> {
        Arc::downgrade(&self.inner)
    }

    fn upgrade(weak: &Weak<NodeInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    pub fn context(&self) -> &SceneContext {
        &self.inner.context
    }

    /// Receives the node's outgoing events.
    pub fn subscribe(&self) -> Receiver<ReferenceEvent> {
        self.inner.dependents.subscribe()
    }

    fn notify(&self, event: ReferenceEvent) {
        self.inner.dependents.notify(event);
    }

    // ── Structure ──

    pub fn node_name(&self) -> String {
        self.state().node_name.clone()
    }

    pub fn set_node_name(&self, name: impl Into<String>) {
        self.state().node_name = name.into();
        self.notify(ReferenceEvent::TitleChanged);
    }

    /// The node name, else the title of the pipeline source, else
    /// `"Pipeline"`.
    pub fn object_title(&self) -> String {
        let name = self.node_name();
        if !name.is_empty() {
            return name;
        }
        self.pipeline_source()
            .map(|source| source.object_title())
            .filter(|title| !title.is_empty())
            .unwrap_or_else(|| "Pipeline".to_string())
    }

    /// The head of the pipeline.
    pub fn data_provider(&self) -> Option<PipelineObjectRef> {
        self.state().data_provider.clone()
    }

    pub fn set_data_provider(&self, provider: Option<PipelineObjectRef>) {
        let being_loaded = {
            let mut st = self.state();
            st.data_provider = provider;
            st.being_loaded
        };
        self.invalidate_pipeline_cache();
        self.notify(ReferenceEvent::PipelineChanged);
        if !being_loaded {
            self.notify(ReferenceEvent::AnimationFramesChanged);
        }
    }

    /// The data source at the upstream end of the pipeline.
    pub fn pipeline_source(&self) -> Option<PipelineObjectRef> {
        let provider = self.data_provider()?;
        match provider.as_modifier_application() {
            Some(app) => app.pipeline_source(),
            None => Some(provider),
        }
    }

    /// Replaces the data source at the upstream end of the modifier chain,
    /// keeping the modifiers.
    pub fn set_pipeline_source(&self, source: Option<PipelineObjectRef>) {
        let mut current = self.data_provider();
        let mut last_application: Option<PipelineObjectRef> = None;
        while let Some(obj) = current {
            let Some(app) = obj.as_modifier_application() else {
                break;
            };
            current = app.input();
            last_application = Some(obj.clone());
        }
        match last_application {
            Some(obj) => {
                if let Some(app) = obj.as_modifier_application() {
                    app.set_input(source);
                }
                self.invalidate_pipeline_cache();
                self.notify(ReferenceEvent::PipelineChanged);
            }
            None => self.set_data_provider(source),
        }
    }

    /// Inserts `modifier` at the downstream end of the pipeline and returns
    /// its application. With `worker` set, the modifier runs on that
    /// runtime's blocking pool.
    pub fn apply_modifier(
        &self,
        modifier: Arc<dyn Modifier>,
        worker: Option<tokio::runtime::Handle>,
    ) -> PipelineObjectRef {
        let mut app = ModifierApplication::new(
            modifier,
            self.data_provider(),
            self.context().executor().clone(),
            self.context().animation().clone(),
        );
        if let Some(handle) = worker {
            app = app.with_worker(handle);
        }
        let app: PipelineObjectRef = Arc::new(app);
        tracing::debug!("Applied modifier '{}'", app.object_title());
        self.set_data_provider(Some(app.clone()));
        app
    }

    /// Vis elements found in the most recent pipeline output.
    pub fn vis_elements(&self) -> Vec<DataVisRef> {
        self.state().vis_elements.clone()
    }

    pub fn replacement_vis_elements(&self) -> Vec<DataVisRef> {
        self.state().replacements.replacements().to_vec()
    }

    pub fn is_deleted(&self) -> bool {
        self.state().deleted
    }

    /// Detaches the pipeline and tells dependents the node is gone.
    pub fn delete_node(&self) {
        {
            let mut st = self.state();
            if st.deleted {
                return;
            }
            st.deleted = true;
            st.data_provider = None;
            st.vis_elements.clear();
            st.replacements = VisReplacementTable::new();
        }
        self.invalidate_pipeline_cache();
        tracing::debug!("Scene node deleted");
        self.notify(ReferenceEvent::TargetDeleted);
    }

    // ── Evaluation ──

    /// True if the pipeline cache holds a state valid at `time`.
    pub fn is_pipeline_cached(&self, time: TimePoint) -> bool {
        self.state().pipeline_cache.contains(time)
    }

    pub fn is_rendering_cached(&self, time: TimePoint) -> bool {
        self.state().rendering_cache.contains(time)
    }

    /// Evaluates the pipeline at the request time. Served from the cache when
    /// possible; concurrent requests for the same time share one upstream
    /// evaluation.
    pub fn evaluate_pipeline(
        &self,
        request: &PipelineEvaluationRequest,
    ) -> SharedFuture<PipelineFlowState> {
        let time = request.time();
        let (provider, generation) = {
            let st = self.state();
            if let Some(cached) = st.pipeline_cache.get_at(time) {
                tracing::trace!("Pipeline cache hit at t={}", time);
                return cached;
            }
            if let Some(pending) = st.pipeline_cache.in_flight(time) {
                return pending;
            }
            match &st.data_provider {
                Some(provider) => (provider.clone(), st.pipeline_cache.generation()),
                None => {
                    return SharedFuture::ready(PipelineFlowState::from_status(
                        PipelineStatus::success(),
                        TimeInterval::infinite(),
                    ));
                }
            }
        };

        tracing::debug!("Pipeline cache miss at t={}, evaluating upstream", time);
        let weak = self.downgrade();
        let future = provider
            .evaluate(request)
            .then(self.context().executor(), move |state| {
                match Self::upgrade(&weak) {
                    Some(node) => node.finish_pipeline_evaluation(time, generation, state.clone()),
                    None => state.clone(),
                }
            });

        let mut st = self.state();
        if st.pipeline_cache.generation() == generation {
            st.pipeline_cache.insert_future(time, future.clone());
        }
        future
    }

    fn finish_pipeline_evaluation(
        &self,
        time: TimePoint,
        generation: u64,
        mut state: PipelineFlowState,
    ) -> PipelineFlowState {
        let _noundo = UndoSuspender::new();

        let validity = state.state_validity();
        let contains = !validity.is_empty() && validity.contains(time);
        debug_assert!(
            contains,
            "pipeline returned validity {:?} not containing t={}",
            validity, time
        );
        if !contains {
            tracing::error!(
                "Pipeline result validity {:?} does not contain requested time {}; not caching",
                validity,
                time
            );
            return state;
        }

        self.replace_visual_elements(&mut state);

        let changed = self.state().pipeline_cache.insert(state.clone(), generation);
        if changed {
            self.update_vis_element_list(&state);
        }
        state
    }

    /// Evaluates the pipeline and then runs the asynchronous transforms of
    /// the vis elements attached to top-level objects, one after another.
    pub fn evaluate_rendering_pipeline(
        &self,
        request: &PipelineEvaluationRequest,
    ) -> SharedFuture<PipelineFlowState> {
        let time = request.time();
        let generation = {
            let st = self.state();
            if let Some(cached) = st.rendering_cache.get_at(time) {
                tracing::trace!("Rendering cache hit at t={}", time);
                return cached;
            }
            if let Some(pending) = st.rendering_cache.in_flight(time) {
                return pending;
            }
            st.rendering_cache.generation()
        };

        let request = *request;
        let weak = self.downgrade();
        let future = self.evaluate_pipeline(&request).then_future(
            self.context().executor(),
            move |state| match Self::upgrade(&weak) {
                Some(node) => node.run_vis_transforms(request, generation, state.clone()),
                None => SharedFuture::ready(state.clone()),
            },
        );

        let mut st = self.state();
        if st.rendering_cache.generation() == generation {
            st.rendering_cache.insert_future(time, future.clone());
        }
        future
    }

    fn run_vis_transforms(
        &self,
        request: PipelineEvaluationRequest,
        generation: u64,
        state: PipelineFlowState,
    ) -> SharedFuture<PipelineFlowState> {
        let jobs: Vec<(DataObjectRef, DataVisRef)> = state
            .data()
            .map(|data| {
                data.objects()
                    .iter()
                    .flat_map(|obj| {
                        obj.vis_elements()
                            .iter()
                            .filter(|vis| vis.is_enabled() && vis.as_transforming().is_some())
                            .map(move |vis| (obj.clone(), vis.clone()))
                    })
                    .collect()
            })
            .unwrap_or_default();

        if jobs.is_empty() {
            self.state().rendering_cache.insert(state.clone(), generation);
            return SharedFuture::ready(state);
        }

        tracing::debug!("Running {} asynchronous vis transforms", jobs.len());
        let executor = self.context().executor().clone();
        let stale = self.state().rendering_cache.stale_contents().clone();
        let mut chain = SharedFuture::ready(state);
        for (obj, vis) in jobs {
            let stale = stale.clone();
            chain = chain.then_future(&executor, move |input| match vis.as_transforming() {
                Some(transform) => transform.transform_data(&request, &obj, input.clone(), &stale),
                None => SharedFuture::ready(input.clone()),
            });
        }

        let weak = self.downgrade();
        chain.then(&executor, move |output| {
            if let Some(node) = Self::upgrade(&weak) {
                node.state().rendering_cache.insert(output.clone(), generation);
            }
            output.clone()
        })
    }

    /// Synchronous best-effort evaluation at the current animation time.
    pub fn evaluate_pipeline_preliminary(&self, include_vis_elements: bool) -> PipelineFlowState {
        let time = self.context().animation().time();
        let provider = {
            let st = self.state();
            // Untransformed output never stands in for the rendering state.
            let cached = if include_vis_elements {
                st.rendering_cache.state_at(time)
            } else {
                st.pipeline_cache.state_at(time)
            };
            if let Some(state) = cached {
                return state.clone();
            }
            if !st.preliminary_cache.state_validity().is_empty() {
                return st.preliminary_cache.clone();
            }
            st.data_provider.clone()
        };
        let Some(provider) = provider else {
            return PipelineFlowState::default();
        };

        let mut state = provider.evaluate_preliminary();
        {
            let _noundo = UndoSuspender::new();
            self.replace_visual_elements(&mut state);
        }
        state.set_state_validity(TimeInterval::infinite());
        self.state().preliminary_cache = state.clone();
        state
    }

    // ── Vis elements ──

    /// Substitutes the node's private vis elements in `state`.
    pub fn replace_visual_elements(&self, state: &mut PipelineFlowState) {
        let pairs = {
            let st = self.state();
            if st.replacements.is_empty() {
                return;
            }
            st.replacements.live_pairs()
        };
        if state.is_empty() {
            return;
        }
        match substitute_vis_elements(state.mutable_data(), &pairs) {
            Ok(0) => {}
            Ok(n) => tracing::trace!("Substituted vis elements in {} objects", n),
            Err(e) => tracing::warn!("Vis element substitution failed: {}", e),
        }
    }

    /// Every vis element attached to an object in `state`, each listed
    /// once, in traversal order.
    pub fn collect_vis_elements(state: &PipelineFlowState) -> Vec<DataVisRef> {
        let mut found: Vec<DataVisRef> = Vec::new();
        if let Some(data) = state.data() {
            for root in data.objects() {
                visit_recursive(root, &mut |_, obj| {
                    for vis in obj.vis_elements() {
                        if !found.iter().any(|f| same_vis(f, vis)) {
                            found.push(vis.clone());
                        }
                    }
                    false
                });
            }
        }
        found
    }

    /// Syncs the node's vis-element list with `state`: vanished elements
    /// are removed, new ones appended, the rest keep their order.
    pub fn update_vis_element_list(&self, state: &PipelineFlowState) {
        let found = Self::collect_vis_elements(state);
        let mut st = self.state();
        st.vis_elements
            .retain(|v| found.iter().any(|f| same_vis(f, v)));
        for vis in found {
            if !st.vis_elements.iter().any(|v| same_vis(v, &vis)) {
                st.vis_elements.push(vis);
            }
        }
    }

    /// Gives the node a private deep copy of `vis`. Subsequent evaluations
    /// show the copy wherever `vis` appears in the pipeline output.
    pub fn make_vis_element_independent(&self, vis: &DataVisRef) -> DataVisRef {
        let clone: DataVisRef = Arc::from(vis.clone_vis());
        self.state().replacements.adopt(vis, clone.clone());
        tracing::info!("Scene node adopted a private copy of vis element '{}'", vis.title());
        self.invalidate_pipeline_cache();
        self.notify(ReferenceEvent::TargetChanged);
        clone
    }

    /// The node's replacement for `vis`, or `vis` itself.
    pub fn get_replacement_vis_element(&self, vis: &DataVisRef) -> DataVisRef {
        self.state().replacements.get_replacement(vis)
    }

    /// Removes the replacement pair at `index`. While an undo or redo is
    /// replaying, the pair is left for the undo system to restore.
    pub fn remove_replaced_vis_element(&self, index: usize) -> Option<DataVisRef> {
        let removed = if self.context().undo_stack().is_undoing_or_redoing() {
            None
        } else {
            self.state().replacements.remove_at(index)
        };
        self.invalidate_pipeline_cache();
        self.notify(ReferenceEvent::TargetChanged);
        removed
    }

    /// Extent of the node's output at `time`, computed from the preliminary
    /// state through its enabled vis elements.
    pub fn local_bounding_box(&self, time: TimePoint) -> Box3 {
        if let Some((cached_time, bb)) = self.state().bounding_box {
            if cached_time == time {
                return bb;
            }
        }
        let state = self.evaluate_pipeline_preliminary(true);
        let mut bb = Box3::empty();
        if let Some(data) = state.data() {
            for root in data.objects() {
                visit_recursive(root, &mut |ancestors, obj| {
                    for vis in obj.vis_elements() {
                        let vis = self.get_replacement_vis_element(vis);
                        if vis.is_enabled() {
                            let mut stack = ancestors.to_vec();
                            stack.push(obj.clone());
                            bb.add_box(&vis.bounding_box(time, &stack, &state));
                        }
                    }
                    false
                });
            }
        }
        self.state().bounding_box = Some((time, bb));
        bb
    }

    // ── Invalidation and events ──

    /// Drops the pipeline and preliminary caches and softly invalidates the
    /// rendering cache.
    pub fn invalidate_pipeline_cache(&self) {
        let keep_stale = self
            .context()
            .config()
            .evaluation
            .keep_stale_rendering_results;
        let mut st = self.state();
        st.pipeline_cache.invalidate(false);
        st.rendering_cache.invalidate(keep_stale);
        st.preliminary_cache.reset();
        st.bounding_box = None;
        tracing::debug!("Pipeline caches invalidated");
    }

    /// Reacts to an event sent by the pipeline head or by one of the node's
    /// vis elements. Events from other senders are ignored.
    pub fn reference_event(&self, source: EventSource<'_>, event: ReferenceEvent) {
        match source {
            EventSource::PipelineObject(obj) => {
                let is_head = self
                    .data_provider()
                    .is_some_and(|head| same_pipeline_object(&head, obj));
                if !is_head {
                    return;
                }
                match event {
                    ReferenceEvent::TargetChanged | ReferenceEvent::PipelineChanged => {
                        self.invalidate_pipeline_cache();
                        self.notify(event);
                    }
                    ReferenceEvent::TargetDeleted => {
                        if self.context().undo_stack().is_undoing_or_redoing() {
                            self.set_data_provider(None);
                        } else {
                            self.delete_node();
                        }
                    }
                    ReferenceEvent::PreliminaryStateAvailable => {
                        {
                            let mut st = self.state();
                            st.preliminary_cache.reset();
                            st.bounding_box = None;
                        }
                        self.notify(event);
                    }
                    ReferenceEvent::TitleChanged | ReferenceEvent::AnimationFramesChanged => {
                        self.notify(event);
                    }
                }
            }
            EventSource::VisElement(vis) => {
                let known = {
                    let st = self.state();
                    st.vis_elements.iter().any(|v| same_vis(v, vis))
                        || st.replacements.is_replacement(vis)
                };
                if !known || event != ReferenceEvent::TargetChanged {
                    return;
                }
                if vis.as_transforming().is_some() {
                    self.invalidate_pipeline_cache();
                    self.notify(ReferenceEvent::TargetChanged);
                } else {
                    self.state().bounding_box = None;
                    self.notify(ReferenceEvent::PreliminaryStateAvailable);
                }
            }
        }
    }

    // ── Loading ──

    pub fn begin_load(&self) {
        self.state().being_loaded = true;
    }

    /// Ends loading and drops replacement pairs whose original no longer
    /// exists.
    pub fn load_from_stream_complete(&self) {
        let pruned = {
            let mut st = self.state();
            st.being_loaded = false;
            st.replacements.prune_expired()
        };
        if pruned > 0 {
            tracing::debug!("Pruned {} dangling vis element replacements", pruned);
        }
    }
}

impl std::fmt::Debug for PipelineSceneNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let st = self.state();
        f.debug_struct("PipelineSceneNode")
            .field("node_name", &st.node_name)
            .field("has_provider", &st.data_provider.is_some())
            .field("vis_elements", &st.vis_elements.len())
            .field("replacements", &st.replacements.len())
            .field("deleted", &st.deleted)
            .finish()
    }
}
