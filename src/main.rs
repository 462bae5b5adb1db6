//! visflow-rs demonstration
//!
//! Builds a small particle pipeline (a frame source and two modifiers),
//! evaluates it for a number of animation frames on worker threads and
//! prints the global attributes of each frame as JSON.

use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use visflow_rs::{
    animation::{AnimationSettings, TimeInterval},
    config::EngineConfig,
    data::{
        into_ref, AttributeValue, Box3, DataCollection, DataObject, DataObjectRef, DataVis, DataVisRef,
        PropertyContainer, PropertyObject, SimulationCellObject, PARTICLES_CLASS, PROPERTY_CLASS,
        SIMULATION_CELL_CLASS, SOURCE_FRAME_ATTRIBUTE,
    },
    error::VisFlowError,
    pipeline::{
        spawn_worker, Modifier, PipelineEvaluationRequest, PipelineFlowState, PipelineObject,
        PipelineStatus, SharedFuture, TaskQueue,
    },
    scene::{PipelineSceneNode, SceneContext},
};

const USAGE: &str = "Usage: visflow-rs [--config PATH] [--frames N]";

struct Args {
    config: Option<PathBuf>,
    frames: i32,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args = Args {
        config: None,
        frames: 5,
    };
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let path = iter.next().context("--config requires a path")?;
                args.config = Some(PathBuf::from(path));
            }
            "--frames" => {
                let n = iter.next().context("--frames requires a number")?;
                args.frames = n.parse().with_context(|| format!("invalid frame count '{}'", n))?;
            }
            "-h" | "--help" => {
                println!("{}", USAGE);
                std::process::exit(0);
            }
            other => anyhow::bail!("unknown argument '{}'\n{}", other, USAGE),
        }
    }
    Ok(args)
}

/// Stand-in for a trajectory file reader: particles drifting along x.
struct TrajectorySource {
    animation: AnimationSettings,
    particle_count: usize,
    worker: tokio::runtime::Handle,
    vis: DataVisRef,
}

impl TrajectorySource {
    fn load_frame(frame: i32, particle_count: usize, vis: DataVisRef) -> DataCollection {
        let positions: Vec<f64> = (0..particle_count)
            .flat_map(|i| [i as f64 + 0.1 * frame as f64, (i % 3) as f64, 0.0])
            .collect();
        let mut particles = PropertyContainer::new(&PARTICLES_CLASS, "particles");
        particles.add_property(into_ref(PropertyObject::with_components(
            "Position", 3, positions,
        )));
        particles.base_mut().add_vis_element(vis);

        let mut collection = DataCollection::new();
        let objects = [
            into_ref(particles),
            into_ref(SimulationCellObject::orthogonal(
                particle_count as f64 + 1.0,
                3.0,
                1.0,
            )),
        ];
        for obj in objects {
            if let Err(e) = collection.add_object(obj) {
                tracing::error!("Failed to assemble frame {}: {}", frame, e);
            }
        }
        let attributes = [
            ("Temperature", AttributeValue::Float(300.0 + frame as f64)),
            (SOURCE_FRAME_ATTRIBUTE, AttributeValue::Int(i64::from(frame))),
        ];
        for (name, value) in attributes {
            if let Err(e) = collection.add_attribute(name, value, None) {
                tracing::error!("Failed to assemble frame {}: {}", frame, e);
            }
        }
        collection
    }
}

impl PipelineObject for TrajectorySource {
    fn evaluate(&self, request: &PipelineEvaluationRequest) -> SharedFuture<PipelineFlowState> {
        let frame = self.animation.time_to_frame(request.time());
        let start = self.animation.frame_to_time(frame);
        let validity = TimeInterval::new(start, start + self.animation.ticks_per_frame() - 1);
        let (count, vis) = (self.particle_count, self.vis.clone());
        spawn_worker(&self.worker, move || {
            tracing::debug!("Loading frame {}", frame);
            PipelineFlowState::with_shared_data(
                Self::load_frame(frame, count, vis),
                PipelineStatus::success(),
                validity,
            )
        })
    }

    fn evaluate_preliminary(&self) -> PipelineFlowState {
        let frame = self.animation.time_to_frame(self.animation.time());
        PipelineFlowState::with_shared_data(
            Self::load_frame(frame, self.particle_count, self.vis.clone()),
            PipelineStatus::success(),
            TimeInterval::infinite(),
        )
    }

    fn object_title(&self) -> String {
        "Trajectory".into()
    }

    fn number_of_frames(&self) -> i32 {
        i32::MAX
    }
}

/// Stores the mean x coordinate of all particles as an attribute.
struct CenterOfMass;

impl Modifier for CenterOfMass {
    fn title(&self) -> String {
        "Center of mass".into()
    }

    fn modify(&self, _request: &PipelineEvaluationRequest, state: &mut PipelineFlowState) -> visflow_rs::Result<()> {
        let positions = state.expect_leaf_object(&PROPERTY_CLASS, "particles/Position")?;
        let positions = positions
            .downcast_ref::<PropertyObject>()
            .ok_or_else(|| VisFlowError::Modifier("Position is not a property".into()))?;
        let n = positions.len().max(1) as f64;
        let x: f64 = (0..positions.len()).filter_map(|i| positions.get(i, 0)).sum();
        state.add_attribute("CenterOfMass.X", x / n, None)?;
        Ok(())
    }
}

/// Reports the cell volume.
struct CellVolume;

impl Modifier for CellVolume {
    fn title(&self) -> String {
        "Cell volume".into()
    }

    fn modify(&self, _request: &PipelineEvaluationRequest, state: &mut PipelineFlowState) -> visflow_rs::Result<()> {
        let volume = state
            .expect_object(&SIMULATION_CELL_CLASS)?
            .downcast_ref::<SimulationCellObject>()
            .map(SimulationCellObject::volume)
            .ok_or_else(|| VisFlowError::Modifier("unexpected cell type".into()))?;
        state.add_attribute("CellVolume", volume, None)?;
        Ok(())
    }
}

/// Renders particles as spheres of a fixed radius.
#[derive(Debug, Clone)]
struct ParticlesVis {
    radius: f64,
}

impl DataVis for ParticlesVis {
    fn title(&self) -> String {
        "Particles".into()
    }

    fn clone_vis(&self) -> Box<dyn DataVis> {
        Box::new(self.clone())
    }

    fn bounding_box(
        &self,
        _time: visflow_rs::TimePoint,
        object_stack: &[DataObjectRef],
        _state: &PipelineFlowState,
    ) -> Box3 {
        let mut bb = Box3::empty();
        let Some(container) = object_stack
            .last()
            .and_then(|o| o.downcast_ref::<PropertyContainer>())
        else {
            return bb;
        };
        if let Some(pos) = container
            .get_property("Position")
            .and_then(|p| p.downcast_ref::<PropertyObject>())
        {
            for i in 0..pos.len() {
                let p = [
                    pos.get(i, 0).unwrap_or(0.0),
                    pos.get(i, 1).unwrap_or(0.0),
                    pos.get(i, 2).unwrap_or(0.0),
                ];
                bb.add_point([p[0] - self.radius, p[1] - self.radius, p[2] - self.radius]);
                bb.add_point([p[0] + self.radius, p[1] + self.radius, p[2] + self.radius]);
            }
        }
        bb
    }
}

fn main() -> anyhow::Result<()> {
    let args = parse_args()?;

    let config_path = args.config.clone().or_else(EngineConfig::default_path);
    let config = match &config_path {
        Some(path) => EngineConfig::load_or_default(path),
        None => EngineConfig::default(),
    };

    // Initialize logging
    let (file_layer, _log_guard) = match &config.logging.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "visflow.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    tracing::info!("Starting visflow-rs demo ({} frames)", args.frames);
    if let Some(path) = &config_path {
        tracing::debug!("Engine config: {:?}", path);
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("visflow-worker")
        .build()
        .context("failed to start worker runtime")?;

    let queue = TaskQueue::new();
    let context = SceneContext::with_config(queue.executor(), Arc::new(config));
    let node = PipelineSceneNode::new(context.clone());
    node.set_node_name("Demo pipeline");

    let vis: DataVisRef = Arc::new(ParticlesVis { radius: 0.5 });
    let source = Arc::new(TrajectorySource {
        animation: context.animation().clone(),
        particle_count: 8,
        worker: runtime.handle().clone(),
        vis: vis.clone(),
    });
    node.set_data_provider(Some(source));
    node.apply_modifier(Arc::new(CenterOfMass), Some(runtime.handle().clone()));
    node.apply_modifier(Arc::new(CellVolume), Some(runtime.handle().clone()));

    // The node renders through its own copy of the particle vis element.
    let private = node.make_vis_element_independent(&vis);
    tracing::info!("Using private vis element '{}'", private.title());

    for frame in 0..args.frames {
        let time = context.animation().frame_to_time(frame);
        context.animation().set_time(time);
        let request = context.request_at(time);
        let state = queue
            .block_on(&node.evaluate_rendering_pipeline(&request), context.wait_timeout())
            .with_context(|| format!("evaluation of frame {} failed", frame))?;

        let bb = node.local_bounding_box(time);
        let report = serde_json::json!({
            "frame": frame,
            "evaluated_at": chrono::Local::now().to_rfc3339(),
            "status": state.status().to_string(),
            "attributes": state.build_attributes_map(),
            "bounding_box": { "min": bb.min, "max": bb.max },
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    tracing::info!("Shutting down...");
    drop(node);
    runtime.shutdown_background();
    Ok(())
}
