//! Pipeline evaluation layer.
//!
//! A pipeline is a chain of [`PipelineObject`]s: a data source at the
//! upstream end followed by [`ModifierApplication`]s. Each step turns the
//! [`PipelineFlowState`] of its input into a new one, possibly with a
//! narrower validity interval.
//!
//! # Architecture
//!
//! ```text
//! [Source] ──► [ModifierApplication] ──► [ModifierApplication] ──► PipelineSceneNode
//!                                                                   ├─ pipeline cache
//!                                                                   ├─ rendering cache
//!                                                                   └─ preliminary cache
//! ```
//!
//! # Design
//!
//! - **Futures with executor affinity**: continuations are posted to the
//!   owner's [`Executor`], never run on the completing thread.
//! - **Errors as data**: a failing step yields a state with an error
//!   [`PipelineStatus`]; the caches store it like any other result.
//! - **Generations**: [`PipelineCache`] drops results of superseded
//!   evaluations.

pub mod cache;
pub mod executor;
pub mod flow_state;
pub mod future;
pub mod modifier;
pub mod object;
pub mod status;

pub use cache::PipelineCache;
pub use executor::{spawn_worker, Executor, Task, TaskQueue};
pub use flow_state::PipelineFlowState;
pub use future::{Promise, SharedFuture};
pub use modifier::{Modifier, ModifierApplication};
pub use object::{
    same_pipeline_object, PipelineEvaluationRequest, PipelineObject, PipelineObjectRef,
};
pub use status::{PipelineStatus, StatusKind};
