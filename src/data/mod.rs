//! Data model of the pipeline
//!
//! - [`DataObject`] - shared, copy-on-write unit of pipeline output
//! - [`DataCollection`] - ordered set of top-level objects
//! - [`DataObjectPath`] - objects from a root down to a nested object
//! - [`DataVis`] - visualization elements attached to objects
//! - [`CloneHelper`] - identity-preserving cloning

pub mod attribute;
pub mod clone_helper;
pub mod collection;
pub mod id;
pub mod object;
pub mod objects;
pub mod path;
pub mod vis;

/// Sub-object nesting deeper than this is treated as malformed and not
/// traversed.
pub const MAX_OBJECT_DEPTH: usize = 64;

pub use attribute::{AttributeDataObject, AttributeValue, ATTRIBUTE_CLASS, SOURCE_FRAME_ATTRIBUTE};
pub use clone_helper::CloneHelper;
pub use collection::{DataCollection, ReplaceMode};
pub use id::{DataObjectClass, ObjectKey, DATA_OBJECT_CLASS};
pub use object::{
    is_safe_to_modify, make_sub_object_mutable, visit_recursive,
    DataObject, DataObjectBase, DataObjectRef,
};
pub use objects::{
    into_ref, PropertyContainer, PropertyObject, SimulationCellObject, PARTICLES_CLASS,
    PROPERTY_CLASS, PROPERTY_CONTAINER_CLASS, SIMULATION_CELL_CLASS,
};
pub use path::DataObjectPath;
pub use vis::{same_vis, Box3, DataVis, DataVisRef, TransformingDataVis};
