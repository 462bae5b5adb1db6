//! Hierarchical object paths.
//!
//! A path string such as `"particles/Color"` is split at `/`; each segment
//! must equal the identifier of the object at that depth. Matching rules:
//!
//! - With no residual path, any member of the requested class matches,
//!   whatever its identifier. Non-members are only descended into when their
//!   identifier is empty (anonymous containers).
//! - With a single residual segment, the object's identifier must equal it;
//!   the object then matches if it is a member, otherwise the search
//!   continues into its sub-objects with an empty path.
//! - With more segments, the identifier must equal the first segment and the
//!   search continues into the sub-objects with the remainder.
//!
//! Full-path and leaf lookups share these rules; a leaf lookup returns the
//! last element of the full path.

use super::id::{DataObjectClass, ObjectKey};
use super::object::DataObjectRef;
use super::MAX_OBJECT_DEPTH;
use std::fmt;

/// Objects from a collection root down to a matched object.
#[derive(Clone, Default)]
pub struct DataObjectPath(Vec<DataObjectRef>);

impl DataObjectPath {
    pub fn new(objects: Vec<DataObjectRef>) -> Self {
        Self(objects)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The matched object.
    pub fn last(&self) -> Option<&DataObjectRef> {
        self.0.last()
    }

    /// The top-level object in the collection.
    pub fn first(&self) -> Option<&DataObjectRef> {
        self.0.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DataObjectRef> {
        self.0.iter()
    }

    pub fn keys(&self) -> Vec<ObjectKey> {
        self.0.iter().map(ObjectKey::of).collect()
    }

    /// Identifiers joined by `/`, skipping anonymous levels.
    pub fn to_path_string(&self) -> String {
        self.0
            .iter()
            .map(|o| o.identifier())
            .filter(|id| !id.is_empty())
            .collect::<Vec<_>>()
            .join("/")
    }
}

impl fmt::Debug for DataObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.0.iter().map(|o| o.object_title()))
            .finish()
    }
}

/// Searches `roots` for the first object of `class` reachable via `path`.
pub(crate) fn find_path(
    roots: &[DataObjectRef],
    class: &DataObjectClass,
    path: &str,
) -> Option<DataObjectPath> {
    let mut stack = Vec::new();
    let found = roots
        .iter()
        .any(|root| match_object(root, class, path, &mut stack, 0));
    found.then(|| DataObjectPath(stack))
}

fn match_object(
    obj: &DataObjectRef,
    class: &DataObjectClass,
    path: &str,
    stack: &mut Vec<DataObjectRef>,
    depth: usize,
) -> bool {
    if depth > MAX_OBJECT_DEPTH {
        tracing::warn!(
            "Path search aborted below '{}': hierarchy deeper than {}",
            obj.object_title(),
            MAX_OBJECT_DEPTH
        );
        return false;
    }
    stack.push(obj.clone());
    let matched = if path.is_empty() {
        if class.is_member(obj.as_ref()) {
            true
        } else if !obj.identifier().is_empty() {
            false
        } else {
            obj.visit_sub_objects(&mut |sub| match_object(sub, class, "", stack, depth + 1))
        }
    } else {
        match path.split_once('/') {
            None => {
                obj.identifier() == path
                    && (class.is_member(obj.as_ref())
                        || obj.visit_sub_objects(&mut |sub| {
                            match_object(sub, class, "", stack, depth + 1)
                        }))
            }
            Some((head, rest)) => {
                obj.identifier() == head
                    && obj.visit_sub_objects(&mut |sub| {
                        match_object(sub, class, rest, stack, depth + 1)
                    })
            }
        }
    };
    if !matched {
        stack.pop();
    }
    matched
}

/// Every path whose last element is a member of `class`, in depth-first
/// order.
pub(crate) fn find_all_paths(roots: &[DataObjectRef], class: &DataObjectClass) -> Vec<DataObjectPath> {
    let mut found = Vec::new();
    for root in roots {
        super::object::visit_recursive(root, &mut |ancestors, obj| {
            if class.is_member(obj.as_ref()) {
                let mut objects = ancestors.to_vec();
                objects.push(obj.clone());
                found.push(DataObjectPath(objects));
            }
            false
        });
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::objects::{
        into_ref, PropertyContainer, PropertyObject, PARTICLES_CLASS, PROPERTY_CLASS,
        SIMULATION_CELL_CLASS,
    };
    use std::sync::Arc;

    fn sample() -> Vec<DataObjectRef> {
        let mut named = PropertyContainer::new(&PARTICLES_CLASS, "particles");
        named.add_property(into_ref(PropertyObject::new("Color", vec![1.0])));
        let mut anonymous = PropertyContainer::particles();
        anonymous.add_property(into_ref(PropertyObject::new("Mass", vec![2.0])));
        vec![into_ref(named), into_ref(anonymous)]
    }

    #[test]
    fn test_nested_path() {
        let roots = sample();
        let path = find_path(&roots, &PROPERTY_CLASS, "particles/Color").unwrap();
        assert_eq!(path.len(), 2);
        assert!(Arc::ptr_eq(path.first().unwrap(), &roots[0]));
        assert_eq!(path.last().unwrap().identifier(), "Color");
        assert_eq!(path.to_path_string(), "particles/Color");
    }

    #[test]
    fn test_empty_path_descends_only_anonymous_containers() {
        let roots = sample();
        // "Color" lives in a named container and is not reachable without a path.
        let path = find_path(&roots, &PROPERTY_CLASS, "").unwrap();
        assert_eq!(path.last().unwrap().identifier(), "Mass");
        assert!(find_path(&roots, &SIMULATION_CELL_CLASS, "").is_none());
    }

    #[test]
    fn test_single_segment_matches_member_or_descends() {
        let roots = sample();
        let container = find_path(&roots, &PARTICLES_CLASS, "particles").unwrap();
        assert_eq!(container.len(), 1);
        let inside = find_path(&roots, &PROPERTY_CLASS, "particles").unwrap();
        assert_eq!(inside.last().unwrap().identifier(), "Color");
        assert!(find_path(&roots, &PROPERTY_CLASS, "particles/Mass").is_none());
    }

    #[test]
    fn test_find_all_paths() {
        let roots = sample();
        let all = find_all_paths(&roots, &PROPERTY_CLASS);
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].len(), 2);
    }
}
