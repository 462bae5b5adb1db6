//! The shared data object model.
//!
//! A data object is an immutable-by-convention unit of pipeline output held
//! through [`DataObjectRef`] (an `Arc`). The strong count of that `Arc` is the
//! object's reference count: an object with more than one holder must be
//! cloned before it is modified. Composite objects expose their children
//! through [`DataObject::visit_sub_objects`] and
//! [`DataObject::sub_object_slots_mut`].

use super::clone_helper::CloneHelper;
use super::id::{DataObjectClass, ObjectKey};
use super::vis::DataVisRef;
use crate::animation::TimeInterval;
use crate::pipeline::{PipelineObject, PipelineObjectRef};
use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

/// Shared handle on a data object.
pub type DataObjectRef = Arc<dyn DataObject>;

/// State common to every data object.
#[derive(Clone, Default)]
pub struct DataObjectBase {
    identifier: String,
    data_source: Option<Weak<dyn PipelineObject>>,
    vis_elements: Vec<DataVisRef>,
}

impl DataObjectBase {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            ..Default::default()
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn set_identifier(&mut self, identifier: impl Into<String>) {
        self.identifier = identifier.into();
    }

    /// The pipeline step that produced the object, if it is still alive.
    pub fn data_source(&self) -> Option<PipelineObjectRef> {
        self.data_source.as_ref().and_then(Weak::upgrade)
    }

    pub fn set_data_source(&mut self, source: Option<&PipelineObjectRef>) {
        self.data_source = source.map(Arc::downgrade);
    }

    /// Tests whether the object was produced by `source`.
    pub fn is_from_source(&self, source: &PipelineObjectRef) -> bool {
        self.data_source
            .as_ref()
            .is_some_and(|weak| Weak::ptr_eq(weak, &Arc::downgrade(source)))
    }

    pub fn vis_elements(&self) -> &[DataVisRef] {
        &self.vis_elements
    }

    pub fn add_vis_element(&mut self, vis: DataVisRef) {
        self.vis_elements.push(vis);
    }

    pub fn set_vis_elements(&mut self, vis_elements: Vec<DataVisRef>) {
        self.vis_elements = vis_elements;
    }
}

impl fmt::Debug for DataObjectBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataObjectBase")
            .field("identifier", &self.identifier)
            .field("has_data_source", &self.data_source().is_some())
            .field("vis_elements", &self.vis_elements.len())
            .finish()
    }
}

/// A unit of pipeline data.
///
/// Implementors are plain `Clone` structs embedding a [`DataObjectBase`];
/// the [`data_object_common!`](crate::data_object_common) macro supplies the
/// boilerplate methods.
pub trait DataObject: Send + Sync + fmt::Debug + 'static {
    fn class(&self) -> &'static DataObjectClass;

    fn base(&self) -> &DataObjectBase;

    fn base_mut(&mut self) -> &mut DataObjectBase;

    /// Shallow copy. Sub-objects stay shared with the original.
    fn clone_object(&self) -> Box<dyn DataObject>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn identifier(&self) -> &str {
        self.base().identifier()
    }

    fn vis_elements(&self) -> &[DataVisRef] {
        self.base().vis_elements()
    }

    fn object_title(&self) -> String {
        if self.identifier().is_empty() {
            self.class().display_name().to_string()
        } else {
            self.identifier().to_string()
        }
    }

    /// Time range over which the object's contents are valid.
    fn object_validity(&self, _time: crate::animation::TimePoint) -> TimeInterval {
        TimeInterval::infinite()
    }

    /// Calls `visitor` for each direct sub-object until it returns true.
    /// Returns true if the visitor stopped the traversal.
    fn visit_sub_objects(&self, _visitor: &mut dyn FnMut(&DataObjectRef) -> bool) -> bool {
        false
    }

    /// Mutable access to the slots holding direct sub-objects.
    fn sub_object_slots_mut(&mut self) -> Vec<&mut DataObjectRef> {
        Vec::new()
    }
}

impl dyn DataObject {
    pub fn downcast_ref<T: DataObject>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: DataObject>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }

    pub fn is<T: DataObject>(&self) -> bool {
        self.as_any().is::<T>()
    }
}

/// True if `obj` is held by exactly one owner and may be written in place.
#[inline]
pub fn is_safe_to_modify(obj: &DataObjectRef) -> bool {
    Arc::strong_count(obj) == 1
}

/// Implements the mechanical [`DataObject`] methods for a `Clone` struct
/// with a `base: DataObjectBase` field.
#[macro_export]
macro_rules! data_object_common {
    ($class:expr) => {
        fn class(&self) -> &'static $crate::data::DataObjectClass {
            $class
        }

        fn base(&self) -> &$crate::data::DataObjectBase {
            &self.base
        }

        fn base_mut(&mut self) -> &mut $crate::data::DataObjectBase {
            &mut self.base
        }

        fn clone_object(&self) -> Box<dyn $crate::data::DataObject> {
            Box::new(self.clone())
        }

        fn as_any(&self) -> &dyn std::any::Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
            self
        }
    };
}

/// Makes the direct sub-object `key` of `parent` exclusively owned, cloning
/// it if shared, and returns it.
pub fn make_sub_object_mutable(
    parent: &mut dyn DataObject,
    key: ObjectKey,
) -> Option<&mut dyn DataObject> {
    let slot = parent
        .sub_object_slots_mut()
        .into_iter()
        .find(|slot| ObjectKey::of(slot) == key)?;
    if Arc::strong_count(slot) > 1 {
        *slot = CloneHelper::new().clone_object(slot, false);
    }
    match Arc::get_mut(slot) {
        Some(obj) => Some(obj),
        None => {
            tracing::warn!("Sub-object {:?} is still shared after cloning", key);
            None
        }
    }
}

/// Walks `obj` and its sub-objects depth first. The visitor receives the
/// ancestors (excluding the visited object) and returns true to stop.
pub fn visit_recursive(
    obj: &DataObjectRef,
    visitor: &mut dyn FnMut(&[DataObjectRef], &DataObjectRef) -> bool,
) -> bool {
    fn walk(
        obj: &DataObjectRef,
        ancestors: &mut Vec<DataObjectRef>,
        visitor: &mut dyn FnMut(&[DataObjectRef], &DataObjectRef) -> bool,
        depth: usize,
    ) -> bool {
        if depth > super::MAX_OBJECT_DEPTH {
            tracing::warn!(
                "Object hierarchy below '{}' exceeds depth {}; not descending",
                obj.object_title(),
                super::MAX_OBJECT_DEPTH
            );
            return false;
        }
        if visitor(ancestors, obj) {
            return true;
        }
        ancestors.push(obj.clone());
        let stopped = obj.visit_sub_objects(&mut |sub| walk(sub, ancestors, visitor, depth + 1));
        ancestors.pop();
        stopped
    }
    walk(obj, &mut Vec::new(), visitor, 0)
}
