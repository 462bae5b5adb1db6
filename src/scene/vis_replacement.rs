//! Node-private substitutes for shared vis elements.
//!
//! The table keeps two lists in lock-step: weak handles on the upstream
//! originals and the owned clones that replace them. A weak entry dies when
//! the upstream element is destroyed; [`VisReplacementTable::prune_expired`]
//! removes such pairs.

use crate::data::{same_vis, visit_recursive, DataCollection, DataVis, DataVisRef, ObjectKey};
use crate::error::Result;
use std::sync::{Arc, Weak};

#[derive(Default)]
pub struct VisReplacementTable {
    replaced: Vec<Weak<dyn DataVis>>,
    replacements: Vec<DataVisRef>,
}

impl VisReplacementTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        debug_assert_eq!(self.replaced.len(), self.replacements.len());
        self.replacements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn index_of_original(&self, vis: &DataVisRef) -> Option<usize> {
        self.replaced
            .iter()
            .position(|w| std::ptr::addr_eq(w.as_ptr(), Arc::as_ptr(vis)))
    }

    fn index_of_replacement(&self, vis: &DataVisRef) -> Option<usize> {
        self.replacements.iter().position(|r| same_vis(r, vis))
    }

    /// Records `clone` as the substitute for `vis`. If `vis` already is a
    /// replacement or an adopted original, the existing entry's clone is
    /// overwritten instead of adding a second entry.
    pub fn adopt(&mut self, vis: &DataVisRef, clone: DataVisRef) {
        if let Some(i) = self
            .index_of_replacement(vis)
            .or_else(|| self.index_of_original(vis))
        {
            self.replacements[i] = clone;
            return;
        }
        self.replaced.push(Arc::downgrade(vis));
        self.replacements.push(clone);
    }

    /// The clone standing in for `vis`, if it was adopted.
    pub fn replacement_for(&self, vis: &DataVisRef) -> Option<&DataVisRef> {
        self.index_of_original(vis).map(|i| &self.replacements[i])
    }

    /// `vis` itself, or its replacement if one exists.
    pub fn get_replacement(&self, vis: &DataVisRef) -> DataVisRef {
        self.replacement_for(vis).unwrap_or(vis).clone()
    }

    pub fn is_replacement(&self, vis: &DataVisRef) -> bool {
        self.index_of_replacement(vis).is_some()
    }

    pub fn replacements(&self) -> &[DataVisRef] {
        &self.replacements
    }

    /// `(original, replacement)` for every pair whose original is alive.
    pub fn live_pairs(&self) -> Vec<(DataVisRef, DataVisRef)> {
        self.replaced
            .iter()
            .zip(&self.replacements)
            .filter_map(|(w, r)| w.upgrade().map(|o| (o, r.clone())))
            .collect()
    }

    /// Drops pairs whose original no longer exists. Returns how many were
    /// removed.
    pub fn prune_expired(&mut self) -> usize {
        let before = self.replaced.len();
        let mut i = 0;
        while i < self.replaced.len() {
            if self.replaced[i].strong_count() == 0 {
                self.replaced.remove(i);
                self.replacements.remove(i);
            } else {
                i += 1;
            }
        }
        before - self.replaced.len()
    }

    /// Removes the pair at `index`.
    pub fn remove_at(&mut self, index: usize) -> Option<DataVisRef> {
        if index >= self.replaced.len() {
            return None;
        }
        self.replaced.remove(index);
        Some(self.replacements.remove(index))
    }
}

/// Key path (root first) to the first object in `data` that lists one of
/// the originals among its vis elements.
fn find_object_with_original(
    data: &DataCollection,
    pairs: &[(DataVisRef, DataVisRef)],
) -> Option<Vec<ObjectKey>> {
    let mut found = None;
    for root in data.objects() {
        let stopped = visit_recursive(root, &mut |ancestors, obj| {
            let hit = obj
                .vis_elements()
                .iter()
                .any(|v| pairs.iter().any(|(original, _)| same_vis(original, v)));
            if hit {
                let mut keys: Vec<ObjectKey> = ancestors.iter().map(ObjectKey::of).collect();
                keys.push(ObjectKey::of(obj));
                found = Some(keys);
            }
            hit
        });
        if stopped {
            break;
        }
    }
    found
}

/// Rewrites the vis-element lists of every object in `data` that refers to
/// an original of `pairs`, substituting the replacement. Objects are made
/// mutable first, so holders of the same objects elsewhere are unaffected.
/// Returns the number of objects rewritten.
pub fn substitute_vis_elements(
    data: &mut DataCollection,
    pairs: &[(DataVisRef, DataVisRef)],
) -> Result<usize> {
    if pairs.is_empty() {
        return Ok(0);
    }
    let mut rewritten = 0;
    while let Some(keys) = find_object_with_original(data, pairs) {
        let obj = data.make_mutable_path(&keys)?;
        let substituted: Vec<DataVisRef> = obj
            .vis_elements()
            .iter()
            .map(|v| {
                pairs
                    .iter()
                    .find(|(original, _)| same_vis(original, v))
                    .map_or_else(|| v.clone(), |(_, replacement)| replacement.clone())
            })
            .collect();
        obj.base_mut().set_vis_elements(substituted);
        rewritten += 1;
    }
    Ok(rewritten)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{into_ref, PropertyContainer, PropertyObject, SimulationCellObject, DataObject};

    #[derive(Debug)]
    struct Vis(&'static str);

    impl DataVis for Vis {
        fn title(&self) -> String {
            self.0.to_string()
        }

        fn clone_vis(&self) -> Box<dyn DataVis> {
            Box::new(Vis(self.0))
        }
    }

    fn vis(name: &'static str) -> DataVisRef {
        Arc::new(Vis(name))
    }

    #[test]
    fn test_adopt_and_lookup() {
        let mut table = VisReplacementTable::new();
        let original = vis("particles");
        let clone: DataVisRef = Arc::from(original.clone_vis());
        table.adopt(&original, clone.clone());

        assert!(same_vis(table.replacement_for(&original).unwrap(), &clone));
        assert!(same_vis(&table.get_replacement(&clone), &clone));
        assert!(table.is_replacement(&clone));
    }

    #[test]
    fn test_readopting_overwrites() {
        let mut table = VisReplacementTable::new();
        let original = vis("bonds");
        let first: DataVisRef = Arc::from(original.clone_vis());
        table.adopt(&original, first.clone());

        let second: DataVisRef = Arc::from(first.clone_vis());
        table.adopt(&first, second.clone());
        assert_eq!(table.len(), 1);
        assert!(same_vis(table.replacement_for(&original).unwrap(), &second));
    }

    #[test]
    fn test_prune_keeps_lists_in_step() {
        let mut table = VisReplacementTable::new();
        let keep = vis("keep");
        let gone = vis("gone");
        table.adopt(&gone, vis("gone-clone"));
        table.adopt(&keep, vis("keep-clone"));
        drop(gone);

        assert_eq!(table.prune_expired(), 1);
        assert_eq!(table.len(), 1);
        assert_eq!(table.replacements()[0].title(), "keep-clone");
        assert_eq!(table.live_pairs().len(), 1);
    }

    #[test]
    fn test_substitution_clones_only_affected_objects() {
        let original = vis("particles");
        let replacement = vis("particles-private");
        let mut particles = PropertyContainer::particles();
        particles.add_property(into_ref(PropertyObject::new("Position", vec![0.0])));
        particles.base_mut().add_vis_element(original.clone());
        let particles = into_ref(particles);
        let cell = into_ref(SimulationCellObject::orthogonal(1.0, 1.0, 1.0));

        let shared = DataCollection::from_objects([particles.clone(), cell.clone()]).unwrap();
        let mut private = shared.clone();
        let pairs = vec![(original.clone(), replacement.clone())];
        assert_eq!(substitute_vis_elements(&mut private, &pairs).unwrap(), 1);

        let rewritten = &private.objects()[0];
        assert!(!Arc::ptr_eq(rewritten, &particles));
        assert!(same_vis(&rewritten.vis_elements()[0], &replacement));
        assert!(same_vis(&particles.vis_elements()[0], &original));
        assert!(Arc::ptr_eq(&private.objects()[1], &cell));
    }

    #[test]
    fn test_substitution_without_pairs_is_noop() {
        let mut coll = DataCollection::new();
        assert_eq!(substitute_vis_elements(&mut coll, &[]).unwrap(), 0);
    }
}
