//! Scene layer: nodes that own a pipeline and cache its output.
//!
//! - [`PipelineSceneNode`] - cached asynchronous evaluation and vis-element
//!   substitution
//! - [`SceneContext`] - executor, undo stack, animation and configuration
//!   shared by the nodes of a scene
//! - [`ReferenceEvent`] - change notifications in and out of a node

pub mod context;
pub mod event;
pub mod node;
pub mod vis_replacement;

pub use context::SceneContext;
pub use event::{Dependents, EventSource, ReferenceEvent};
pub use node::PipelineSceneNode;
pub use vis_replacement::{substitute_vis_elements, VisReplacementTable};
