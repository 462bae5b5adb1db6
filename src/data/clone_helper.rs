//! Object cloning with identity caching.
//!
//! A single helper is used across one logical copy operation so an object
//! reached through several parents is cloned only once and the copies keep
//! sharing it.

use super::id::ObjectKey;
use super::object::DataObjectRef;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Default)]
pub struct CloneHelper {
    /// Original object key -> its clone.
    clones: HashMap<ObjectKey, DataObjectRef>,
    /// Keys of objects this helper produced.
    produced: HashSet<ObjectKey>,
}

impl CloneHelper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the clone of `obj`, creating it on first request. With `deep`
    /// set, sub-objects are cloned recursively through the same helper.
    pub fn clone_object(&mut self, obj: &DataObjectRef, deep: bool) -> DataObjectRef {
        let key = ObjectKey::of(obj);
        if let Some(existing) = self.clones.get(&key) {
            return existing.clone();
        }
        let mut copy = obj.clone_object();
        if deep {
            for slot in copy.sub_object_slots_mut() {
                *slot = self.clone_object(slot, true);
            }
        }
        self.register(key, copy)
    }

    /// Records `copy` as the clone of the object identified by `original`.
    pub(crate) fn register(
        &mut self,
        original: ObjectKey,
        copy: Box<dyn super::object::DataObject>,
    ) -> DataObjectRef {
        let copy: DataObjectRef = Arc::from(copy);
        self.produced.insert(ObjectKey::of(&copy));
        self.clones.insert(original, copy.clone());
        copy
    }

    /// The clone already made for `obj`, if any.
    pub fn existing_clone(&self, obj: &DataObjectRef) -> Option<DataObjectRef> {
        self.clones.get(&ObjectKey::of(obj)).cloned()
    }

    /// True if `obj` is one of the copies made by this helper.
    pub fn is_clone(&self, obj: &DataObjectRef) -> bool {
        self.produced.contains(&ObjectKey::of(obj))
    }

    pub fn clone_count(&self) -> usize {
        self.produced.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::objects::{PropertyContainer, PropertyObject};

    #[test]
    fn test_shallow_clone_shares_children() {
        let prop: DataObjectRef = Arc::new(PropertyObject::new("Position", vec![1.0, 2.0]));
        let mut container = PropertyContainer::particles();
        container.add_property(prop.clone());
        let container: DataObjectRef = Arc::new(container);

        let mut helper = CloneHelper::new();
        let copy = helper.clone_object(&container, false);
        assert!(!Arc::ptr_eq(&copy, &container));

        let copy_children = copy
            .downcast_ref::<PropertyContainer>()
            .map(|c| c.properties().to_vec())
            .unwrap_or_default();
        assert!(Arc::ptr_eq(&copy_children[0], &prop));
    }

    #[test]
    fn test_deep_clone_reuses_shared_child() {
        let prop: DataObjectRef = Arc::new(PropertyObject::new("Color", vec![0.5]));
        let mut a = PropertyContainer::particles();
        a.add_property(prop.clone());
        let mut b = PropertyContainer::particles();
        b.add_property(prop.clone());
        let a: DataObjectRef = Arc::new(a);
        let b: DataObjectRef = Arc::new(b);

        let mut helper = CloneHelper::new();
        let a2 = helper.clone_object(&a, true);
        let b2 = helper.clone_object(&b, true);
        assert_eq!(helper.clone_count(), 3);

        let child = |obj: &DataObjectRef| obj.downcast_ref::<PropertyContainer>().unwrap().properties()[0].clone();
        assert!(!Arc::ptr_eq(&child(&a2), &prop));
        assert!(Arc::ptr_eq(&child(&a2), &child(&b2)));
        assert!(helper.is_clone(&a2));
        assert!(!helper.is_clone(&a));
    }
}
