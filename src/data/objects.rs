//! Concrete data object kinds used by pipeline sources and modifiers.

use super::id::{DataObjectClass, DATA_OBJECT_CLASS};
use super::object::{DataObjectBase, DataObjectRef};
use crate::data_object_common;
use crate::data::DataObject;
use std::sync::Arc;

pub static PROPERTY_CLASS: DataObjectClass =
    DataObjectClass::new("Property", "Property", Some(&DATA_OBJECT_CLASS));

pub static PROPERTY_CONTAINER_CLASS: DataObjectClass = DataObjectClass::new(
    "PropertyContainer",
    "Property container",
    Some(&DATA_OBJECT_CLASS),
);

pub static PARTICLES_CLASS: DataObjectClass =
    DataObjectClass::new("Particles", "Particles", Some(&PROPERTY_CONTAINER_CLASS));

pub static SIMULATION_CELL_CLASS: DataObjectClass = DataObjectClass::new(
    "SimulationCell",
    "Simulation cell",
    Some(&DATA_OBJECT_CLASS),
);

/// A per-element array of values, e.g. particle positions.
#[derive(Debug, Clone)]
pub struct PropertyObject {
    base: DataObjectBase,
    components: usize,
    values: Vec<f64>,
}

impl PropertyObject {
    /// Scalar property. The identifier doubles as the property name.
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self::with_components(name, 1, values)
    }

    pub fn with_components(name: impl Into<String>, components: usize, values: Vec<f64>) -> Self {
        Self {
            base: DataObjectBase::new(name),
            components: components.max(1),
            values,
        }
    }

    pub fn name(&self) -> &str {
        self.base.identifier()
    }

    pub fn components(&self) -> usize {
        self.components
    }

    /// Number of elements (values / components).
    pub fn len(&self) -> usize {
        self.values.len() / self.components
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut Vec<f64> {
        &mut self.values
    }

    /// Component `c` of element `i`.
    pub fn get(&self, i: usize, c: usize) -> Option<f64> {
        if c >= self.components {
            return None;
        }
        self.values.get(i * self.components + c).copied()
    }
}

impl DataObject for PropertyObject {
    data_object_common!(&PROPERTY_CLASS);
}

/// A composite object holding properties of equal length.
#[derive(Debug, Clone)]
pub struct PropertyContainer {
    base: DataObjectBase,
    class: &'static DataObjectClass,
    properties: Vec<DataObjectRef>,
}

impl PropertyContainer {
    pub fn new(class: &'static DataObjectClass, identifier: impl Into<String>) -> Self {
        debug_assert!(class.is_derived_from(&PROPERTY_CONTAINER_CLASS));
        Self {
            base: DataObjectBase::new(identifier),
            class,
            properties: Vec::new(),
        }
    }

    /// An anonymous particle container.
    pub fn particles() -> Self {
        Self::new(&PARTICLES_CLASS, "")
    }

    pub fn add_property(&mut self, property: DataObjectRef) {
        self.properties.push(property);
    }

    pub fn properties(&self) -> &[DataObjectRef] {
        &self.properties
    }

    pub fn get_property(&self, name: &str) -> Option<&DataObjectRef> {
        self.properties.iter().find(|p| p.identifier() == name)
    }

    pub fn remove_property(&mut self, name: &str) -> Option<DataObjectRef> {
        let index = self.properties.iter().position(|p| p.identifier() == name)?;
        Some(self.properties.remove(index))
    }

    /// Element count taken from the first property.
    pub fn element_count(&self) -> usize {
        self.properties
            .first()
            .and_then(|p| p.downcast_ref::<PropertyObject>())
            .map_or(0, PropertyObject::len)
    }
}

impl DataObject for PropertyContainer {
    fn class(&self) -> &'static DataObjectClass {
        self.class
    }

    fn base(&self) -> &DataObjectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut DataObjectBase {
        &mut self.base
    }

    fn clone_object(&self) -> Box<dyn DataObject> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }

    fn visit_sub_objects(&self, visitor: &mut dyn FnMut(&DataObjectRef) -> bool) -> bool {
        self.properties.iter().any(|p| visitor(p))
    }

    fn sub_object_slots_mut(&mut self) -> Vec<&mut DataObjectRef> {
        self.properties.iter_mut().collect()
    }
}

/// Periodic simulation cell: three cell vectors plus an origin.
#[derive(Debug, Clone)]
pub struct SimulationCellObject {
    base: DataObjectBase,
    matrix: [[f64; 4]; 3],
    pbc: [bool; 3],
}

impl SimulationCellObject {
    /// Orthogonal box with edge lengths `a`, `b`, `c` at the origin.
    pub fn orthogonal(a: f64, b: f64, c: f64) -> Self {
        Self {
            base: DataObjectBase::new(""),
            matrix: [[a, 0.0, 0.0, 0.0], [0.0, b, 0.0, 0.0], [0.0, 0.0, c, 0.0]],
            pbc: [true; 3],
        }
    }

    pub fn matrix(&self) -> &[[f64; 4]; 3] {
        &self.matrix
    }

    pub fn set_matrix(&mut self, matrix: [[f64; 4]; 3]) {
        self.matrix = matrix;
    }

    pub fn pbc(&self) -> [bool; 3] {
        self.pbc
    }

    pub fn set_pbc(&mut self, pbc: [bool; 3]) {
        self.pbc = pbc;
    }

    /// Cell volume from the determinant of the three cell vectors.
    pub fn volume(&self) -> f64 {
        let m = &self.matrix;
        let col = |j: usize| [m[0][j], m[1][j], m[2][j]];
        let (a, b, c) = (col(0), col(1), col(2));
        let cross = [
            b[1] * c[2] - b[2] * c[1],
            b[2] * c[0] - b[0] * c[2],
            b[0] * c[1] - b[1] * c[0],
        ];
        (a[0] * cross[0] + a[1] * cross[1] + a[2] * cross[2]).abs()
    }
}

impl DataObject for SimulationCellObject {
    data_object_common!(&SIMULATION_CELL_CLASS);
}

/// Convenience for wrapping a freshly built object.
pub fn into_ref<T: DataObject>(obj: T) -> DataObjectRef {
    Arc::new(obj)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_access() {
        let prop = PropertyObject::with_components("Position", 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(prop.len(), 2);
        assert_eq!(prop.get(1, 2), Some(6.0));
        assert_eq!(prop.get(0, 3), None);
        assert_eq!(prop.object_title(), "Position");
    }

    #[test]
    fn test_container_element_count() {
        let mut particles = PropertyContainer::particles();
        assert_eq!(particles.element_count(), 0);
        particles.add_property(into_ref(PropertyObject::new("Mass", vec![1.0, 1.0, 2.0])));
        assert_eq!(particles.element_count(), 3);
        assert!(particles.get_property("Mass").is_some());
        assert_eq!(particles.object_title(), "Particles");
    }

    #[test]
    fn test_cell_volume() {
        let cell = SimulationCellObject::orthogonal(2.0, 3.0, 4.0);
        assert!((cell.volume() - 24.0).abs() < 1e-12);
    }
}
