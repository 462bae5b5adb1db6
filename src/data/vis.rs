//! Visualization elements attached to data objects.
//!
//! A vis element describes how a data object is turned into renderable
//! form. Elements are shared by reference between every pipeline output that
//! carries the object; a scene node that wants a private variant adopts a
//! deep copy instead of mutating the shared one.

use super::object::DataObjectRef;
use crate::animation::TimePoint;
use crate::pipeline::{PipelineEvaluationRequest, PipelineFlowState, SharedFuture};
use std::fmt;
use std::sync::Arc;

/// Shared handle on a vis element.
pub type DataVisRef = Arc<dyn DataVis>;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Box3 {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl Box3 {
    pub const fn empty() -> Self {
        Self {
            min: [f64::INFINITY; 3],
            max: [f64::NEG_INFINITY; 3],
        }
    }

    pub fn new(min: [f64; 3], max: [f64; 3]) -> Self {
        Self { min, max }
    }

    pub fn is_empty(&self) -> bool {
        (0..3).any(|i| self.min[i] > self.max[i])
    }

    pub fn add_point(&mut self, p: [f64; 3]) {
        for i in 0..3 {
            self.min[i] = self.min[i].min(p[i]);
            self.max[i] = self.max[i].max(p[i]);
        }
    }

    pub fn add_box(&mut self, other: &Box3) {
        if other.is_empty() {
            return;
        }
        self.add_point(other.min);
        self.add_point(other.max);
    }

    pub fn size(&self) -> [f64; 3] {
        if self.is_empty() {
            return [0.0; 3];
        }
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }
}

impl Default for Box3 {
    fn default() -> Self {
        Self::empty()
    }
}

/// A data-driven visualization descriptor.
pub trait DataVis: Send + Sync + fmt::Debug {
    fn title(&self) -> String;

    fn is_enabled(&self) -> bool {
        true
    }

    /// Deep copy used when a scene node adopts a private version.
    fn clone_vis(&self) -> Box<dyn DataVis>;

    /// Extent of the rendered object. `object_stack` lists the object and
    /// its ancestors, root first.
    fn bounding_box(
        &self,
        _time: TimePoint,
        _object_stack: &[DataObjectRef],
        _state: &PipelineFlowState,
    ) -> Box3 {
        Box3::empty()
    }

    /// Returns the asynchronous transform capability, if any.
    fn as_transforming(&self) -> Option<&dyn TransformingDataVis> {
        None
    }
}

/// A vis element that turns raw data into renderable data asynchronously
/// before rendering.
pub trait TransformingDataVis: DataVis {
    /// Transforms `data_object` within `state`. `stale` holds the previous
    /// transform output kept across a soft cache invalidation, which the
    /// implementation may reuse.
    fn transform_data(
        &self,
        request: &PipelineEvaluationRequest,
        data_object: &DataObjectRef,
        state: PipelineFlowState,
        stale: &PipelineFlowState,
    ) -> SharedFuture<PipelineFlowState>;
}

/// Address comparison of two vis handles.
#[inline]
pub fn same_vis(a: &DataVisRef, b: &DataVisRef) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_accumulation() {
        let mut bb = Box3::empty();
        assert!(bb.is_empty());
        bb.add_box(&Box3::empty());
        assert!(bb.is_empty());

        bb.add_point([1.0, 2.0, 3.0]);
        bb.add_box(&Box3::new([-1.0, 0.0, 0.0], [0.0, 4.0, 1.0]));
        assert_eq!(bb.min, [-1.0, 0.0, 0.0]);
        assert_eq!(bb.max, [1.0, 4.0, 3.0]);
        assert_eq!(bb.size(), [2.0, 4.0, 3.0]);
    }
}
