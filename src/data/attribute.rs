//! Global attributes: named scalar values attached to a data collection.

use super::collection::DataCollection;
use super::id::{DataObjectClass, DATA_OBJECT_CLASS};
use super::object::DataObjectBase;
use crate::data::DataObject;
use crate::data_object_common;
use crate::error::{Result, VisFlowError};
use crate::pipeline::PipelineObjectRef;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

pub static ATTRIBUTE_CLASS: DataObjectClass =
    DataObjectClass::new("Attribute", "Global attribute", Some(&DATA_OBJECT_CLASS));

/// Name of the attribute a file source sets to the frame it loaded.
pub const SOURCE_FRAME_ATTRIBUTE: &str = "SourceFrame";

/// Value carried by a global attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl AttributeValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttributeValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric value, widening integers.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            AttributeValue::Float(v) => Some(*v),
            AttributeValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Bool(v) => write!(f, "{}", v),
            AttributeValue::Int(v) => write!(f, "{}", v),
            AttributeValue::Float(v) => write!(f, "{}", v),
            AttributeValue::String(v) => f.write_str(v),
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        AttributeValue::Bool(v)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        AttributeValue::Int(v)
    }
}

impl From<i32> for AttributeValue {
    fn from(v: i32) -> Self {
        AttributeValue::Int(v.into())
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::Float(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::String(v.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        AttributeValue::String(v)
    }
}

/// A data object holding one global attribute. The identifier is the
/// attribute name.
#[derive(Debug, Clone)]
pub struct AttributeDataObject {
    base: DataObjectBase,
    value: AttributeValue,
}

impl AttributeDataObject {
    pub fn new(name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Self {
            base: DataObjectBase::new(name),
            value: value.into(),
        }
    }

    pub fn value(&self) -> &AttributeValue {
        &self.value
    }

    pub fn set_value(&mut self, value: impl Into<AttributeValue>) {
        self.value = value.into();
    }
}

impl DataObject for AttributeDataObject {
    data_object_common!(&ATTRIBUTE_CLASS);
}

impl DataCollection {
    fn attributes(&self) -> impl Iterator<Item = &AttributeDataObject> {
        self.objects()
            .iter()
            .filter_map(|o| o.downcast_ref::<AttributeDataObject>())
    }

    /// All attributes by name. A repeated name gets a `.N` suffix so no
    /// value is lost.
    pub fn build_attributes_map(&self) -> BTreeMap<String, AttributeValue> {
        let mut map = BTreeMap::new();
        for attr in self.attributes() {
            let mut key = attr.identifier().to_string();
            let mut n = 2;
            while map.contains_key(&key) {
                key = format!("{}.{}", attr.identifier(), n);
                n += 1;
            }
            map.insert(key, attr.value().clone());
        }
        map
    }

    /// Value of the attribute named `name`, or `default`.
    pub fn get_attribute_value(&self, name: &str, default: AttributeValue) -> AttributeValue {
        self.attributes()
            .find(|a| a.identifier() == name)
            .map_or(default, |a| a.value().clone())
    }

    /// Value of the attribute produced by `data_source` under `base_name`,
    /// allowing for a uniqueness suffix, or `default`.
    pub fn get_attribute_value_by(
        &self,
        data_source: Option<&PipelineObjectRef>,
        base_name: &str,
        default: AttributeValue,
    ) -> AttributeValue {
        self.get_object_by(&ATTRIBUTE_CLASS, data_source, base_name)
            .and_then(|o| o.downcast_ref::<AttributeDataObject>())
            .map_or(default, |a| a.value().clone())
    }

    /// Adds a new attribute. If `name` is taken, the attribute receives the
    /// first free `name.N` identifier.
    pub fn add_attribute(
        &mut self,
        name: &str,
        value: impl Into<AttributeValue>,
        data_source: Option<&PipelineObjectRef>,
    ) -> Result<&AttributeDataObject> {
        let identifier = self.generate_unique_identifier(name, &ATTRIBUTE_CLASS);
        let mut attr = AttributeDataObject::new(identifier, value);
        attr.base_mut().set_data_source(data_source);
        self.add_object(Arc::new(attr))?;
        self.objects()
            .last()
            .and_then(|o| o.downcast_ref::<AttributeDataObject>())
            .ok_or_else(|| VisFlowError::InvariantViolation("attribute was not stored".into()))
    }

    /// Animation frame the data was loaded from, or -1 if unknown.
    pub fn source_frame(&self) -> i64 {
        match self.get_attribute_value(SOURCE_FRAME_ATTRIBUTE, AttributeValue::Int(-1)) {
            AttributeValue::Int(v) => v,
            AttributeValue::Float(v) => v as i64,
            _ => -1,
        }
    }
}
