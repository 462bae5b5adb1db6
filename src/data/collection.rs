//! Ordered, copy-on-write set of data objects forming one pipeline output.
//!
//! # Ownership
//!
//! The collection holds [`DataObjectRef`]s. Cloning a collection is cheap and
//! shares every object; the strong count of each `Arc` then exceeds one and
//! any mutation through [`DataCollection::make_mutable`] first clones the
//! object and swaps the clone into the slot. Other snapshots keep seeing the
//! original.
//!
//! Objects are named by [`ObjectKey`] in the mutating API so callers never
//! need to hold an extra strong reference, which would itself count as a
//! sharer.

use super::clone_helper::CloneHelper;
use super::id::{DataObjectClass, ObjectKey};
use super::object::{make_sub_object_mutable, DataObject, DataObjectRef};
use super::path::{find_all_paths, find_path, DataObjectPath};
use super::MAX_OBJECT_DEPTH;
use crate::error::{Result, VisFlowError};
use crate::pipeline::PipelineObjectRef;
use crate::undo;
use std::collections::HashSet;
use std::sync::Arc;

/// How [`DataCollection::replace_object_with`] rewires references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplaceMode {
    /// Only the top-level slot holding the old object is rewritten.
    Flat,
    /// Additionally, every sub-object slot inside the collection that refers
    /// to the old object is pointed at the new one. Parents are made mutable
    /// (copy-on-write) as needed.
    #[default]
    ReferenceGraph,
}

#[derive(Debug, Clone, Default)]
pub struct DataCollection {
    objects: Vec<DataObjectRef>,
}

impl DataCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_objects(objects: impl IntoIterator<Item = DataObjectRef>) -> Result<Self> {
        let mut collection = Self::new();
        for obj in objects {
            collection.add_object(obj)?;
        }
        Ok(collection)
    }

    pub fn objects(&self) -> &[DataObjectRef] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    // ── Membership ──

    /// Identity membership test of a top-level object.
    pub fn contains(&self, obj: &DataObjectRef) -> bool {
        self.contains_key(ObjectKey::of(obj))
    }

    pub fn contains_key(&self, key: ObjectKey) -> bool {
        self.index_of(key).is_some()
    }

    pub fn index_of(&self, key: ObjectKey) -> Option<usize> {
        self.objects.iter().position(|o| ObjectKey::of(o) == key)
    }

    pub fn add_object(&mut self, obj: DataObjectRef) -> Result<()> {
        if self.contains(&obj) {
            return Err(VisFlowError::InvariantViolation(format!(
                "Object '{}' is already part of the data collection",
                obj.object_title()
            )));
        }
        self.objects.push(obj);
        Ok(())
    }

    pub fn insert_object(&mut self, index: usize, obj: DataObjectRef) -> Result<()> {
        if undo::is_recording() {
            return Err(VisFlowError::InvariantViolation(
                "Cannot insert into a data collection while undo recording is active".to_string(),
            ));
        }
        if self.contains(&obj) {
            return Err(VisFlowError::InvariantViolation(format!(
                "Object '{}' is already part of the data collection",
                obj.object_title()
            )));
        }
        if index > self.objects.len() {
            return Err(VisFlowError::InvariantViolation(format!(
                "Insertion index {} out of range (len {})",
                index,
                self.objects.len()
            )));
        }
        self.objects.insert(index, obj);
        Ok(())
    }

    pub fn remove_object_by_index(&mut self, index: usize) -> Option<DataObjectRef> {
        (index < self.objects.len()).then(|| self.objects.remove(index))
    }

    /// Replaces `old` by `new`, or removes it when `new` is `None`.
    pub fn replace_object(&mut self, old: ObjectKey, new: Option<DataObjectRef>) -> Result<()> {
        self.replace_object_with(old, new, ReplaceMode::default())
    }

    pub fn replace_object_with(
        &mut self,
        old: ObjectKey,
        new: Option<DataObjectRef>,
        mode: ReplaceMode,
    ) -> Result<()> {
        let index = self.index_of(old).ok_or_else(|| {
            VisFlowError::InvariantViolation(format!(
                "Object {:?} to be replaced is not part of the data collection",
                old
            ))
        })?;
        match new {
            Some(new) => {
                if mode == ReplaceMode::ReferenceGraph {
                    self.rewire_sub_references(old, &new);
                }
                self.objects[index] = new;
            }
            None => {
                self.objects.remove(index);
            }
        }
        Ok(())
    }

    /// Points every sub-object slot that refers to `old` at `new`.
    fn rewire_sub_references(&mut self, old: ObjectKey, new: &DataObjectRef) {
        fn refers_to(obj: &DataObjectRef, old: ObjectKey) -> bool {
            let mut found = false;
            super::object::visit_recursive(obj, &mut |ancestors, o| {
                found = !ancestors.is_empty() && ObjectKey::of(o) == old;
                found
            });
            found
        }
        fn rewire(obj: &mut dyn DataObject, old: ObjectKey, new: &DataObjectRef, depth: usize) {
            if depth > MAX_OBJECT_DEPTH {
                return;
            }
            for slot in obj.sub_object_slots_mut() {
                if ObjectKey::of(slot) == old {
                    *slot = new.clone();
                } else if refers_to(slot, old) {
                    if Arc::strong_count(slot) > 1 {
                        *slot = CloneHelper::new().clone_object(slot, false);
                    }
                    if let Some(child) = Arc::get_mut(slot) {
                        rewire(child, old, new, depth + 1);
                    }
                }
            }
        }

        for i in 0..self.objects.len() {
            if ObjectKey::of(&self.objects[i]) == old || !refers_to(&self.objects[i], old) {
                continue;
            }
            if let Ok(parent) = self.make_mutable_at(i, false) {
                rewire(parent, old, new, 0);
            }
        }
    }

    // ── Copy-on-write ──

    /// Ensures every object reachable from the collection is exclusively
    /// owned by it, cloning shared objects and rewiring their parents.
    pub fn make_all_mutable_recursive(&mut self) {
        let mut helper = CloneHelper::new();
        for slot in self.objects.iter_mut() {
            make_slot_exclusive(slot, &mut helper, 0);
        }
        if helper.clone_count() > 0 {
            tracing::trace!("Cloned {} shared data objects", helper.clone_count());
        }
    }

    /// Returns exclusive access to `key`, cloning and replacing it first if
    /// it is shared.
    pub fn make_mutable(&mut self, key: ObjectKey, deep_copy: bool) -> Result<&mut dyn DataObject> {
        let index = self.index_of(key).ok_or_else(|| {
            VisFlowError::InvariantViolation(format!(
                "Object {:?} is not part of the data collection",
                key
            ))
        })?;
        self.make_mutable_at(index, deep_copy)
    }

    fn make_mutable_at(&mut self, index: usize, deep_copy: bool) -> Result<&mut dyn DataObject> {
        if Arc::strong_count(&self.objects[index]) > 1 {
            let old = ObjectKey::of(&self.objects[index]);
            let copy = CloneHelper::new().clone_object(&self.objects[index], deep_copy);
            self.replace_object_with(old, Some(copy), ReplaceMode::Flat)?;
        }
        match Arc::get_mut(&mut self.objects[index]) {
            Some(obj) => Ok(obj),
            None => Err(VisFlowError::InvariantViolation(format!(
                "Object at index {} is still shared after cloning",
                index
            ))),
        }
    }

    /// Makes each object along `keys` (root first) mutable, each one as a
    /// child of the already mutable parent, and returns the last.
    pub fn make_mutable_path(&mut self, keys: &[ObjectKey]) -> Result<&mut dyn DataObject> {
        let (root, rest) = keys.split_first().ok_or_else(|| {
            VisFlowError::InvariantViolation("Cannot make an empty object path mutable".into())
        })?;
        let mut current = self.make_mutable(*root, false)?;
        for key in rest {
            current = make_sub_object_mutable(current, *key).ok_or_else(|| {
                VisFlowError::InvariantViolation(format!(
                    "Object {:?} is not a sub-object of its path parent",
                    key
                ))
            })?;
        }
        Ok(current)
    }

    // ── Lookup ──

    /// First top-level object of `class`.
    pub fn get_object(&self, class: &DataObjectClass) -> Option<&DataObjectRef> {
        self.objects.iter().find(|o| class.is_member(o.as_ref()))
    }

    pub fn expect_object(&self, class: &DataObjectClass) -> Result<&DataObjectRef> {
        self.get_object(class).ok_or_else(|| missing_object(class, None))
    }

    /// First top-level object of `class` produced by `data_source` whose
    /// identifier is `identifier` or `identifier` plus a `.N` suffix.
    pub fn get_object_by(
        &self,
        class: &DataObjectClass,
        data_source: Option<&PipelineObjectRef>,
        identifier: &str,
    ) -> Option<&DataObjectRef> {
        let prefix = format!("{}.", identifier);
        self.objects.iter().find(|o| {
            class.is_member(o.as_ref())
                && data_source.map_or(true, |src| o.base().is_from_source(src))
                && (o.identifier() == identifier || o.identifier().starts_with(&prefix))
        })
    }

    /// Full path from a top-level object to the first match of `class` at
    /// `path`.
    pub fn get_object_path(&self, class: &DataObjectClass, path: &str) -> Option<DataObjectPath> {
        find_path(&self.objects, class, path)
    }

    pub fn expect_object_path(&self, class: &DataObjectClass, path: &str) -> Result<DataObjectPath> {
        self.get_object_path(class, path)
            .ok_or_else(|| missing_object(class, Some(path)))
    }

    /// Terminal object of [`get_object_path`](Self::get_object_path).
    pub fn get_leaf_object(&self, class: &DataObjectClass, path: &str) -> Option<DataObjectRef> {
        self.get_object_path(class, path)
            .and_then(|p| p.last().cloned())
    }

    pub fn expect_leaf_object(&self, class: &DataObjectClass, path: &str) -> Result<DataObjectRef> {
        self.get_leaf_object(class, path)
            .ok_or_else(|| missing_object(class, Some(path)))
    }

    /// Looks up `path` and makes every object along it mutable. Returns the
    /// matched object.
    pub fn get_mutable_object(
        &mut self,
        class: &DataObjectClass,
        path: &str,
    ) -> Option<&mut dyn DataObject> {
        let keys = self.get_object_path(class, path)?.keys();
        match self.make_mutable_path(&keys) {
            Ok(obj) => Some(obj),
            Err(e) => {
                tracing::warn!("Failed to make '{}' mutable: {}", path, e);
                None
            }
        }
    }

    pub fn expect_mutable_object(
        &mut self,
        class: &DataObjectClass,
        path: &str,
    ) -> Result<&mut dyn DataObject> {
        let keys = self
            .get_object_path(class, path)
            .ok_or_else(|| missing_object(class, Some(path)))?
            .keys();
        self.make_mutable_path(&keys)
    }

    /// Typed variant of [`get_mutable_object`](Self::get_mutable_object).
    pub fn get_mutable_leaf_object<T: DataObject>(
        &mut self,
        class: &DataObjectClass,
        path: &str,
    ) -> Option<&mut T> {
        self.get_mutable_object(class, path)?.downcast_mut::<T>()
    }

    pub fn expect_mutable_leaf_object<T: DataObject>(
        &mut self,
        class: &DataObjectClass,
        path: &str,
    ) -> Result<&mut T> {
        self.expect_mutable_object(class, path)?
            .downcast_mut::<T>()
            .ok_or_else(|| missing_object(class, Some(path)))
    }

    /// True if any object or sub-object is a member of `class`.
    pub fn contains_object_recursive(&self, class: &DataObjectClass) -> bool {
        self.objects.iter().any(|root| {
            super::object::visit_recursive(root, &mut |_, obj| class.is_member(obj.as_ref()))
        })
    }

    /// Paths to every object or sub-object of `class`.
    pub fn get_objects_recursive(&self, class: &DataObjectClass) -> Vec<DataObjectPath> {
        find_all_paths(&self.objects, class)
    }

    /// Returns `base_name` if no top-level object of `class` uses it,
    /// otherwise the first free `base_name.N` with N >= 2.
    pub fn generate_unique_identifier(&self, base_name: &str, class: &DataObjectClass) -> String {
        let taken: HashSet<&str> = self
            .objects
            .iter()
            .filter(|o| class.is_member(o.as_ref()))
            .map(|o| o.identifier())
            .collect();
        if !taken.contains(base_name) {
            return base_name.to_string();
        }
        let mut n: u64 = 2;
        loop {
            let candidate = format!("{}.{}", base_name, n);
            if !taken.contains(candidate.as_str()) {
                return candidate;
            }
            n += 1;
        }
    }
}

fn missing_object(class: &DataObjectClass, path: Option<&str>) -> VisFlowError {
    match path {
        Some(path) if !path.is_empty() => VisFlowError::MissingData(format!(
            "The data collection contains no {} data object for the key '{}'.",
            class.display_name(),
            path
        )),
        _ => VisFlowError::MissingData(format!(
            "The data collection contains no {} data object.",
            class.display_name()
        )),
    }
}

/// Makes the object in `slot` and everything below it exclusively owned.
fn make_slot_exclusive(slot: &mut DataObjectRef, helper: &mut CloneHelper, depth: usize) {
    if depth > MAX_OBJECT_DEPTH || helper.is_clone(slot) {
        return;
    }
    if let Some(obj) = Arc::get_mut(slot) {
        for sub in obj.sub_object_slots_mut() {
            make_slot_exclusive(sub, helper, depth + 1);
        }
        return;
    }
    if let Some(existing) = helper.existing_clone(slot) {
        *slot = existing;
        return;
    }
    let original = ObjectKey::of(slot);
    let mut copy = slot.clone_object();
    for sub in copy.sub_object_slots_mut() {
        make_slot_exclusive(sub, helper, depth + 1);
    }
    *slot = helper.register(original, copy);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::objects::{
        into_ref, PropertyContainer, PropertyObject, PARTICLES_CLASS, PROPERTY_CLASS,
        SIMULATION_CELL_CLASS, SimulationCellObject,
    };
    use crate::undo::{UndoStack, UndoSuspender};

    fn particles_with(names: &[&str]) -> PropertyContainer {
        let mut particles = PropertyContainer::particles();
        for name in names {
            particles.add_property(into_ref(PropertyObject::new(*name, vec![0.0; 4])));
        }
        particles
    }

    #[test]
    fn test_add_rejects_duplicate() {
        let cell = into_ref(SimulationCellObject::orthogonal(1.0, 1.0, 1.0));
        let mut coll = DataCollection::new();
        coll.add_object(cell.clone()).unwrap();
        let err = coll.add_object(cell.clone()).unwrap_err();
        assert!(matches!(err, VisFlowError::InvariantViolation(_)));
        assert_eq!(coll.len(), 1);
    }

    #[test]
    fn test_insert_requires_no_undo_recording() {
        let mut coll = DataCollection::new();
        let stack = UndoStack::new();
        let _rec = stack.begin_recording();
        let cell = into_ref(SimulationCellObject::orthogonal(1.0, 1.0, 1.0));
        assert!(coll.insert_object(0, cell.clone()).is_err());

        let _noundo = UndoSuspender::new();
        coll.insert_object(0, cell).unwrap();
        assert_eq!(coll.len(), 1);
    }

    #[test]
    fn test_insert_index_out_of_range() {
        let mut coll = DataCollection::new();
        let cell = into_ref(SimulationCellObject::orthogonal(1.0, 1.0, 1.0));
        assert!(coll.insert_object(1, cell).is_err());
    }

    #[test]
    fn test_replace_and_remove() {
        let a = into_ref(PropertyObject::new("A", vec![]));
        let b = into_ref(PropertyObject::new("B", vec![]));
        let mut coll = DataCollection::from_objects([a.clone()]).unwrap();

        coll.replace_object(ObjectKey::of(&a), Some(b.clone())).unwrap();
        assert!(coll.contains(&b));
        assert!(!coll.contains(&a));

        assert!(coll.replace_object(ObjectKey::of(&a), None).is_err());
        coll.replace_object(ObjectKey::of(&b), None).unwrap();
        assert!(coll.is_empty());
    }

    #[test]
    fn test_reference_graph_replace_rewires_children() {
        let shared = into_ref(PropertyObject::new("Color", vec![1.0]));
        let mut particles = PropertyContainer::particles();
        particles.add_property(shared.clone());
        let particles = into_ref(particles);
        let mut coll = DataCollection::from_objects([particles.clone(), shared.clone()]).unwrap();

        let replacement = into_ref(PropertyObject::new("Color", vec![2.0]));
        coll.replace_object(ObjectKey::of(&shared), Some(replacement.clone()))
            .unwrap();

        let container = coll.get_object(&PARTICLES_CLASS).unwrap();
        let child = container
            .downcast_ref::<PropertyContainer>()
            .unwrap()
            .properties()[0]
            .clone();
        assert!(Arc::ptr_eq(&child, &replacement));
        // The externally held original container was not touched.
        let original_child = particles.downcast_ref::<PropertyContainer>().unwrap().properties()[0].clone();
        assert!(Arc::ptr_eq(&original_child, &shared));
    }

    #[test]
    fn test_flat_replace_leaves_children() {
        let shared = into_ref(PropertyObject::new("Color", vec![1.0]));
        let mut particles = PropertyContainer::particles();
        particles.add_property(shared.clone());
        let mut coll = DataCollection::from_objects([into_ref(particles), shared.clone()]).unwrap();

        let replacement = into_ref(PropertyObject::new("Color", vec![2.0]));
        coll.replace_object_with(ObjectKey::of(&shared), Some(replacement), ReplaceMode::Flat)
            .unwrap();
        let child = coll.get_leaf_object(&PROPERTY_CLASS, "").unwrap();
        assert!(Arc::ptr_eq(&child, &shared));
    }

    #[test]
    fn test_make_mutable_clones_shared_only() {
        let cell = into_ref(SimulationCellObject::orthogonal(1.0, 1.0, 1.0));
        let mut coll = DataCollection::from_objects([cell.clone()]).unwrap();

        // Shared with `cell`: a clone replaces it.
        let key = ObjectKey::of(&cell);
        let new_key = ObjectKey::of_object(coll.make_mutable(key, false).unwrap());
        assert_ne!(new_key, key);
        assert!(!coll.contains(&cell));

        // Exclusive now: the same object comes back.
        let again = ObjectKey::of_object(coll.make_mutable(new_key, false).unwrap());
        assert_eq!(again, new_key);
    }

    #[test]
    fn test_make_all_mutable_recursive() {
        let particles = into_ref(particles_with(&["Position", "Color"]));
        let cell = into_ref(SimulationCellObject::orthogonal(1.0, 1.0, 1.0));
        let snapshot = DataCollection::from_objects([particles.clone(), cell.clone()]).unwrap();
        let mut coll = snapshot.clone();
        drop(particles);
        drop(cell);

        coll.make_all_mutable_recursive();
        for root in coll.objects() {
            assert_eq!(Arc::strong_count(root), 1);
            root.visit_sub_objects(&mut |sub| {
                assert_eq!(Arc::strong_count(sub), 1);
                false
            });
        }
        // The snapshot is untouched.
        for (a, b) in snapshot.objects().iter().zip(coll.objects()) {
            assert!(!Arc::ptr_eq(a, b));
        }
    }

    #[test]
    fn test_get_mutable_object_cascades_along_path() {
        let mut particles = PropertyContainer::new(&PARTICLES_CLASS, "particles");
        particles.add_property(into_ref(PropertyObject::new("Position", vec![0.0])));
        particles.add_property(into_ref(PropertyObject::new("Color", vec![0.0])));
        let original = DataCollection::from_objects([into_ref(particles)]).unwrap();
        let mut coll = original.clone();

        let color = coll
            .get_mutable_leaf_object::<PropertyObject>(&PROPERTY_CLASS, "particles/Color")
            .unwrap();
        color.values_mut()[0] = 7.0;

        let before = original.get_object(&PARTICLES_CLASS).unwrap();
        let after = coll.get_object(&PARTICLES_CLASS).unwrap();
        assert!(!Arc::ptr_eq(before, after));
        let props = |o: &DataObjectRef| o.downcast_ref::<PropertyContainer>().unwrap().properties().to_vec();
        let (b, a) = (props(before), props(after));
        // Sibling stays shared, the modified property diverged.
        assert!(Arc::ptr_eq(&b[0], &a[0]));
        assert!(!Arc::ptr_eq(&b[1], &a[1]));
        assert_eq!(a[1].downcast_ref::<PropertyObject>().unwrap().values()[0], 7.0);
        assert_eq!(b[1].downcast_ref::<PropertyObject>().unwrap().values()[0], 0.0);
    }

    #[test]
    fn test_expect_messages() {
        let coll = DataCollection::new();
        let err = coll.expect_object(&SIMULATION_CELL_CLASS).unwrap_err();
        assert_eq!(
            err.root_message(),
            "The data collection contains no Simulation cell data object."
        );
        let err = coll.expect_leaf_object(&PROPERTY_CLASS, "Color").unwrap_err();
        assert_eq!(
            err.root_message(),
            "The data collection contains no Property data object for the key 'Color'."
        );
    }

    #[test]
    fn test_recursive_queries() {
        let coll = DataCollection::from_objects([into_ref(particles_with(&["A", "B"]))]).unwrap();
        assert!(coll.contains_object_recursive(&PROPERTY_CLASS));
        assert!(!coll.contains_object_recursive(&SIMULATION_CELL_CLASS));
        assert_eq!(coll.get_objects_recursive(&PROPERTY_CLASS).len(), 2);
    }

    #[test]
    fn test_generate_unique_identifier() {
        let mut coll = DataCollection::new();
        assert_eq!(coll.generate_unique_identifier("X", &PROPERTY_CLASS), "X");
        coll.add_object(into_ref(PropertyObject::new("X", vec![]))).unwrap();
        assert_eq!(coll.generate_unique_identifier("X", &PROPERTY_CLASS), "X.2");
        // Other classes do not collide.
        assert_eq!(coll.generate_unique_identifier("X", &SIMULATION_CELL_CLASS), "X");
    }
}
