//! Observable objects: string-keyed records of [`ObservableValue`]s.

use std::fmt;

use serde_json::{Map, Value};

use crate::error::Result;
use crate::reactive::Runtime;

use super::map::ObservableMap;
use super::value::ObservableValue;

/// A record whose fields are individually observable.
///
/// Field reads track that field only. Adding or removing a field changes
/// the key set, which is what [`keys`](Self::keys) and reads of absent
/// fields track.
#[derive(Clone, PartialEq)]
pub struct ObservableObject {
    fields: ObservableMap<String, ObservableValue>,
}

impl ObservableObject {
    pub fn new(runtime: &Runtime) -> Self {
        Self {
            fields: ObservableMap::new(runtime),
        }
    }

    pub(crate) fn from_fields(
        runtime: &Runtime,
        fields: impl IntoIterator<Item = (String, ObservableValue)>,
    ) -> Self {
        Self {
            fields: ObservableMap::from_iter_in(runtime, fields),
        }
    }

    pub fn runtime(&self) -> &Runtime {
        self.fields.runtime()
    }

    pub fn get(&self, field: &str) -> Option<ObservableValue> {
        self.fields.get(field)
    }

    pub fn get_f64(&self, field: &str) -> Option<f64> {
        self.get(field).and_then(|value| value.as_f64())
    }

    pub fn get_string(&self, field: &str) -> Option<String> {
        self.get(field).and_then(|value| value.as_str().map(str::to_owned))
    }

    /// Set a field. Returns whether anything changed.
    pub fn set(&self, field: impl Into<String>, value: impl Into<ObservableValue>) -> Result<bool> {
        self.fields.insert(field.into(), value.into())
    }

    /// Set a field from plain JSON, wrapping nested objects and arrays.
    pub fn set_json(&self, field: impl Into<String>, value: Value) -> Result<bool> {
        let value = ObservableValue::from_json(self.runtime(), value);
        self.fields.insert(field.into(), value)
    }

    pub fn remove(&self, field: &str) -> Result<Option<ObservableValue>> {
        self.fields.remove(field)
    }

    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn keys(&self) -> Vec<String> {
        self.fields.keys()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Plain JSON copy of the whole record.
    pub fn to_json(&self) -> Value {
        let fields: Map<String, Value> = self
            .fields
            .snapshot()
            .into_iter()
            .map(|(name, value)| (name, value.to_json()))
            .collect();
        Value::Object(fields)
    }
}

impl fmt::Debug for ObservableObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.fields, f)
    }
}
