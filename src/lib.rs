//! # visflow-rs: cached pipeline evaluation for scientific visualization
//!
//! A data pipeline turns simulation data into renderable output. This crate
//! provides the two pieces at its core: a copy-on-write data model whose
//! objects are shared between pipeline outputs, and scene nodes that
//! evaluate a pipeline asynchronously and cache the result by animation
//! time.
//!
//! ## Architecture
//!
//! - **Data**: [`DataCollection`] of shared [`DataObject`]s; any mutation
//!   goes through copy-on-write so other snapshots never observe it
//! - **Pipeline**: a chain of [`PipelineObject`]s producing
//!   [`PipelineFlowState`]s with a validity interval and status
//! - **Scene**: [`PipelineSceneNode`] caches pipeline, rendering and
//!   preliminary output and substitutes node-private vis elements
//! - **Communication**: continuations are posted over crossbeam channels to
//!   the owner thread's [`TaskQueue`]
//!
//! ## Configuration
//!
//! Engine settings are stored as TOML under the platform config directory
//! in `dev.visflow.visflow-rs/engine.toml`; see [`config`].
//!
//! ## Example
//!
//! ```ignore
//! use visflow_rs::{pipeline::TaskQueue, scene::{PipelineSceneNode, SceneContext}};
//!
//! let queue = TaskQueue::new();
//! let node = PipelineSceneNode::new(SceneContext::new(queue.executor()));
//! node.set_data_provider(Some(source));
//!
//! let request = node.context().request_at(0);
//! let state = queue.block_on(&node.evaluate_pipeline(&request), node.context().wait_timeout())?;
//! println!("{:?}", state.build_attributes_map());
//! ```

pub mod animation;
pub mod config;
pub mod data;
pub mod error;
pub mod pipeline;
pub mod scene;
pub mod undo;

// Re-export commonly used types
pub use animation::{TimeInterval, TimePoint};
pub use config::EngineConfig;
pub use data::{DataCollection, DataObject, DataObjectRef, DataVis, DataVisRef};
pub use error::{Result, VisFlowError};
pub use pipeline::{
    PipelineEvaluationRequest, PipelineFlowState, PipelineObject, PipelineObjectRef,
    PipelineStatus, SharedFuture, TaskQueue,
};
pub use scene::{PipelineSceneNode, SceneContext};
