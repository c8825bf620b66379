//! Dynamically shaped observable data.
//!
//! [`ObservableValue`] lets plain JSON-like data be made observable deeply:
//! objects become [`ObservableObject`]s, arrays become lists, and everything
//! else stays a primitive stored in its parent's cell.

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::reactive::Runtime;

use super::list::ObservableList;
use super::object::ObservableObject;

/// A primitive or an observable container.
///
/// Primitives compare by value, with numbers compared numerically so `100`
/// and `100.0` are equal. Containers compare by identity, so putting the
/// same object back into a field is not a change, while a structurally equal
/// copy is.
#[derive(Clone)]
pub enum ObservableValue {
    Primitive(Value),
    Object(ObservableObject),
    List(ObservableList<ObservableValue>),
}

impl PartialEq for ObservableValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Primitive(Value::Number(a)), Self::Primitive(Value::Number(b))) => {
                // Two integers compare exactly; a float on either side compares as f64.
                if a.is_f64() || b.is_f64() {
                    a.as_f64() == b.as_f64()
                } else {
                    a == b
                }
            }
            (Self::Primitive(a), Self::Primitive(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            _ => false,
        }
    }
}

impl ObservableValue {
    /// Wrap `value`, turning nested objects and arrays into containers.
    pub fn from_json(runtime: &Runtime, value: Value) -> Self {
        match value {
            Value::Object(fields) => {
                let fields = fields
                    .into_iter()
                    .map(|(name, value)| (name, Self::from_json(runtime, value)));
                Self::Object(ObservableObject::from_fields(runtime, fields))
            }
            Value::Array(items) => {
                let items = items
                    .into_iter()
                    .map(|item| Self::from_json(runtime, item));
                Self::List(ObservableList::from_iter_in(runtime, items))
            }
            primitive => Self::Primitive(primitive),
        }
    }

    /// Plain JSON copy. Tracks everything it visits.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Primitive(value) => value.clone(),
            Self::Object(object) => object.to_json(),
            Self::List(list) => Value::Array(list.snapshot().iter().map(Self::to_json).collect()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Primitive(Value::Null))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Primitive(value) => value.as_f64(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Primitive(value) => value.as_i64(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Primitive(value) => value.as_bool(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Primitive(value) => value.as_str(),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObservableObject> {
        match self {
            Self::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&ObservableList<ObservableValue>> {
        match self {
            Self::List(list) => Some(list),
            _ => None,
        }
    }
}

impl Serialize for ObservableValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl fmt::Debug for ObservableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(value) => write!(f, "{value}"),
            Self::Object(object) => fmt::Debug::fmt(object, f),
            Self::List(list) => fmt::Debug::fmt(list, f),
        }
    }
}

impl From<bool> for ObservableValue {
    fn from(value: bool) -> Self {
        Self::Primitive(Value::Bool(value))
    }
}

impl From<i64> for ObservableValue {
    fn from(value: i64) -> Self {
        Self::Primitive(Value::from(value))
    }
}

impl From<f64> for ObservableValue {
    fn from(value: f64) -> Self {
        Self::Primitive(Value::from(value))
    }
}

impl From<&str> for ObservableValue {
    fn from(value: &str) -> Self {
        Self::Primitive(Value::from(value))
    }
}

impl From<String> for ObservableValue {
    fn from(value: String) -> Self {
        Self::Primitive(Value::String(value))
    }
}

impl From<ObservableObject> for ObservableValue {
    fn from(object: ObservableObject) -> Self {
        Self::Object(object)
    }
}

impl From<ObservableList<ObservableValue>> for ObservableValue {
    fn from(list: ObservableList<ObservableValue>) -> Self {
        Self::List(list)
    }
}
