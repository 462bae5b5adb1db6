//! Test data builders for creating collections and pipeline states

use visflow_rs::{
    animation::TimeInterval,
    data::{
        into_ref, AttributeValue, DataCollection, DataObject, DataObjectRef, DataVisRef,
        PropertyContainer, PropertyObject, SimulationCellObject, PARTICLES_CLASS,
    },
    pipeline::{PipelineFlowState, PipelineStatus},
};

/// Builder for particle containers
pub struct ParticlesBuilder {
    identifier: String,
    properties: Vec<(String, Vec<f64>)>,
    vis: Vec<DataVisRef>,
}

impl ParticlesBuilder {
    pub fn new() -> Self {
        Self {
            identifier: String::new(),
            properties: Vec::new(),
            vis: Vec::new(),
        }
    }

    pub fn identifier(mut self, identifier: &str) -> Self {
        self.identifier = identifier.to_string();
        self
    }

    pub fn property(mut self, name: &str, values: Vec<f64>) -> Self {
        self.properties.push((name.to_string(), values));
        self
    }

    pub fn vis(mut self, vis: DataVisRef) -> Self {
        self.vis.push(vis);
        self
    }

    pub fn build(self) -> DataObjectRef {
        let mut particles = PropertyContainer::new(&PARTICLES_CLASS, self.identifier);
        for (name, values) in self.properties {
            particles.add_property(into_ref(PropertyObject::new(name, values)));
        }
        for vis in self.vis {
            particles.base_mut().add_vis_element(vis);
        }
        into_ref(particles)
    }
}

/// Builder for data collections
pub struct CollectionBuilder {
    objects: Vec<DataObjectRef>,
    attributes: Vec<(String, AttributeValue)>,
}

impl CollectionBuilder {
    pub fn new() -> Self {
        Self {
            objects: Vec::new(),
            attributes: Vec::new(),
        }
    }

    pub fn object(mut self, obj: DataObjectRef) -> Self {
        self.objects.push(obj);
        self
    }

    pub fn cell(self, a: f64, b: f64, c: f64) -> Self {
        self.object(into_ref(SimulationCellObject::orthogonal(a, b, c)))
    }

    pub fn attribute(mut self, name: &str, value: impl Into<AttributeValue>) -> Self {
        self.attributes.push((name.to_string(), value.into()));
        self
    }

    pub fn build(self) -> DataCollection {
        let mut collection =
            DataCollection::from_objects(self.objects).expect("objects must be distinct");
        for (name, value) in self.attributes {
            collection
                .add_attribute(&name, value, None)
                .expect("attribute insertion");
        }
        collection
    }

    /// A state sharing the built objects, valid over `validity`.
    pub fn into_state(self, validity: TimeInterval) -> PipelineFlowState {
        PipelineFlowState::with_shared_data(self.build(), PipelineStatus::success(), validity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_builder() {
        let coll = CollectionBuilder::new()
            .object(ParticlesBuilder::new().property("Mass", vec![1.0, 2.0]).build())
            .cell(1.0, 1.0, 1.0)
            .attribute("Timestep", 10i64)
            .build();

        assert_eq!(coll.len(), 3);
    }
}
