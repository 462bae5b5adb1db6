//! Snapshot of pipeline output: a data collection, its validity interval
//! and a status.

use super::object::PipelineObjectRef;
use super::status::PipelineStatus;
use crate::animation::{TimeInterval, TimePoint};
use crate::data::{
    AttributeDataObject, AttributeValue, DataCollection, DataObject, DataObjectClass,
    DataObjectPath, DataObjectRef, ObjectKey,
};
use crate::error::{Result, VisFlowError};
use std::collections::BTreeMap;

const NO_DATA: &str = "The pipeline state contains no data collection.";

#[derive(Debug, Clone, Default)]
pub struct PipelineFlowState {
    data: Option<DataCollection>,
    validity: TimeInterval,
    status: PipelineStatus,
}

impl PipelineFlowState {
    /// Wraps `collection` and makes every object in it exclusively owned.
    pub fn new(collection: DataCollection, status: PipelineStatus, validity: TimeInterval) -> Self {
        let mut collection = collection;
        collection.make_all_mutable_recursive();
        Self::with_shared_data(collection, status, validity)
    }

    /// Wraps `collection` without touching object ownership.
    pub fn with_shared_data(
        collection: DataCollection,
        status: PipelineStatus,
        validity: TimeInterval,
    ) -> Self {
        Self {
            data: Some(collection),
            validity,
            status,
        }
    }

    /// A state without data carrying only `status`, valid at `time`.
    pub fn from_status(status: PipelineStatus, validity: TimeInterval) -> Self {
        Self {
            data: None,
            validity,
            status,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// True if the state carries no data collection.
    pub fn is_empty(&self) -> bool {
        self.data.is_none()
    }

    pub fn data(&self) -> Option<&DataCollection> {
        self.data.as_ref()
    }

    /// The collection, created empty if absent.
    pub fn mutable_data(&mut self) -> &mut DataCollection {
        self.data.get_or_insert_with(DataCollection::new)
    }

    pub fn set_data(&mut self, data: Option<DataCollection>) {
        self.data = data;
    }

    pub fn take_data(&mut self) -> Option<DataCollection> {
        self.data.take()
    }

    pub fn state_validity(&self) -> TimeInterval {
        self.validity
    }

    pub fn set_state_validity(&mut self, validity: TimeInterval) {
        self.validity = validity;
    }

    /// Narrows the validity. Widening is never done implicitly.
    pub fn intersect_state_validity(&mut self, other: &TimeInterval) {
        self.validity.intersect(other);
    }

    pub fn status(&self) -> &PipelineStatus {
        &self.status
    }

    pub fn set_status(&mut self, status: PipelineStatus) {
        self.status = status;
    }

    /// Identity list of the top-level objects, used to detect changed
    /// cache contents.
    pub fn object_keys(&self) -> Vec<ObjectKey> {
        self.data
            .as_ref()
            .map(|d| d.objects().iter().map(ObjectKey::of).collect())
            .unwrap_or_default()
    }

    fn expect_data(&self) -> Result<&DataCollection> {
        self.data
            .as_ref()
            .ok_or_else(|| VisFlowError::MissingData(NO_DATA.into()))
    }

    fn expect_data_mut(&mut self) -> Result<&mut DataCollection> {
        self.data
            .as_mut()
            .ok_or_else(|| VisFlowError::MissingData(NO_DATA.into()))
    }

    // ── Collection forwarders ──

    pub fn get_object(&self, class: &DataObjectClass) -> Option<&DataObjectRef> {
        self.data.as_ref()?.get_object(class)
    }

    pub fn expect_object(&self, class: &DataObjectClass) -> Result<&DataObjectRef> {
        self.expect_data()?.expect_object(class)
    }

    pub fn get_object_path(&self, class: &DataObjectClass, path: &str) -> Option<DataObjectPath> {
        self.data.as_ref()?.get_object_path(class, path)
    }

    pub fn get_leaf_object(&self, class: &DataObjectClass, path: &str) -> Option<DataObjectRef> {
        self.data.as_ref()?.get_leaf_object(class, path)
    }

    pub fn expect_leaf_object(&self, class: &DataObjectClass, path: &str) -> Result<DataObjectRef> {
        self.expect_data()?.expect_leaf_object(class, path)
    }

    pub fn get_mutable_object(
        &mut self,
        class: &DataObjectClass,
        path: &str,
    ) -> Option<&mut dyn DataObject> {
        self.data.as_mut()?.get_mutable_object(class, path)
    }

    pub fn expect_mutable_object(
        &mut self,
        class: &DataObjectClass,
        path: &str,
    ) -> Result<&mut dyn DataObject> {
        self.expect_data_mut()?.expect_mutable_object(class, path)
    }

    pub fn add_object(&mut self, obj: DataObjectRef) -> Result<()> {
        self.mutable_data().add_object(obj)
    }

    pub fn make_mutable(&mut self, key: ObjectKey) -> Result<&mut dyn DataObject> {
        self.expect_data_mut()?.make_mutable(key, false)
    }

    pub fn build_attributes_map(&self) -> BTreeMap<String, AttributeValue> {
        self.data
            .as_ref()
            .map(DataCollection::build_attributes_map)
            .unwrap_or_default()
    }

    pub fn get_attribute_value(&self, name: &str, default: AttributeValue) -> AttributeValue {
        match &self.data {
            Some(d) => d.get_attribute_value(name, default),
            None => default,
        }
    }

    pub fn add_attribute(
        &mut self,
        name: &str,
        value: impl Into<AttributeValue>,
        data_source: Option<&PipelineObjectRef>,
    ) -> Result<&AttributeDataObject> {
        self.mutable_data().add_attribute(name, value, data_source)
    }

    pub fn generate_unique_identifier(&self, base_name: &str, class: &DataObjectClass) -> String {
        match &self.data {
            Some(d) => d.generate_unique_identifier(base_name, class),
            None => base_name.to_string(),
        }
    }

    /// True if the validity contains `time`.
    pub fn is_valid_at(&self, time: TimePoint) -> bool {
        self.validity.contains(time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{into_ref, SimulationCellObject, SIMULATION_CELL_CLASS};

    #[test]
    fn test_default_state_is_empty() {
        let state = PipelineFlowState::default();
        assert!(state.is_empty());
        assert!(state.state_validity().is_empty());
        assert!(!state.status().is_error());
        let err = state.expect_object(&SIMULATION_CELL_CLASS).unwrap_err();
        assert_eq!(err.root_message(), NO_DATA);
    }

    #[test]
    fn test_new_makes_objects_exclusive() {
        let cell = into_ref(SimulationCellObject::orthogonal(1.0, 1.0, 1.0));
        let coll = DataCollection::from_objects([cell.clone()]).unwrap();
        let state = PipelineFlowState::new(coll, PipelineStatus::success(), TimeInterval::infinite());
        let held = state.get_object(&SIMULATION_CELL_CLASS).unwrap();
        assert!(!std::sync::Arc::ptr_eq(held, &cell));
        assert_eq!(std::sync::Arc::strong_count(held), 1);
    }

    #[test]
    fn test_validity_only_narrows() {
        let mut state = PipelineFlowState::default();
        state.set_state_validity(TimeInterval::new(0, 100));
        state.intersect_state_validity(&TimeInterval::new(50, 200));
        assert_eq!(state.state_validity(), TimeInterval::new(50, 100));
        assert!(state.is_valid_at(75));
        assert!(!state.is_valid_at(10));
    }

    #[test]
    fn test_add_attribute_creates_collection() {
        let mut state = PipelineFlowState::default();
        state.add_attribute("Frame", 3i64, None).unwrap();
        assert!(!state.is_empty());
        assert_eq!(
            state.get_attribute_value("Frame", AttributeValue::Int(0)),
            AttributeValue::Int(3)
        );
    }
}
