//! Rule attribute values and the marshalling layer between host and engine.
//!
//! - [`AttributeValue`] / [`AttributeMap`]: engine-side typed key/value data.
//! - [`from_host`]: host primitive attributes into an [`AttributeMapBuilder`].
//! - [`to_host`]: engine attribute maps into blocked host attribute writes.
//! - [`names`]: key conversion between the two naming schemes.
//! - [`cache`]: bounded LRU caches for name and string conversion.
use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub mod cache;
pub mod from_host;
pub mod names;
pub mod to_host;

/// Type tag of an [`AttributeValue`].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueType {
    Bool,
    Int,
    Float,
    String,
    BoolArray,
    IntArray,
    FloatArray,
    StringArray,
}

impl ValueType {
    pub fn is_array(self) -> bool {
        matches!(
            self,
            ValueType::BoolArray | ValueType::IntArray | ValueType::FloatArray | ValueType::StringArray
        )
    }

    /// Scalar element type; identity for scalars.
    pub fn element(self) -> ValueType {
        match self {
            ValueType::BoolArray => ValueType::Bool,
            ValueType::IntArray => ValueType::Int,
            ValueType::FloatArray => ValueType::Float,
            ValueType::StringArray => ValueType::String,
            scalar => scalar,
        }
    }
}

/// A typed rule attribute value.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub enum AttributeValue {
    Bool(bool),
    Int(i32),
    Float(f64),
    String(String),
    BoolArray(Vec<bool>),
    IntArray(Vec<i32>),
    FloatArray(Vec<f64>),
    StringArray(Vec<String>),
}

impl AttributeValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            AttributeValue::Bool(_) => ValueType::Bool,
            AttributeValue::Int(_) => ValueType::Int,
            AttributeValue::Float(_) => ValueType::Float,
            AttributeValue::String(_) => ValueType::String,
            AttributeValue::BoolArray(_) => ValueType::BoolArray,
            AttributeValue::IntArray(_) => ValueType::IntArray,
            AttributeValue::FloatArray(_) => ValueType::FloatArray,
            AttributeValue::StringArray(_) => ValueType::StringArray,
        }
    }

    pub fn is_array(&self) -> bool {
        self.value_type().is_array()
    }

    /// Number of elements; `1` for scalars.
    pub fn len(&self) -> usize {
        match self {
            AttributeValue::BoolArray(v) => v.len(),
            AttributeValue::IntArray(v) => v.len(),
            AttributeValue::FloatArray(v) => v.len(),
            AttributeValue::StringArray(v) => v.len(),
            _ => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True for the zero value of the type: `false`, `0`, `0.0`, `""` or an empty array.
    pub fn is_default(&self) -> bool {
        match self {
            AttributeValue::Bool(v) => !v,
            AttributeValue::Int(v) => *v == 0,
            AttributeValue::Float(v) => *v == 0.0,
            AttributeValue::String(v) => v.is_empty(),
            array => array.is_empty(),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            AttributeValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            AttributeValue::Float(v) => Some(*v),
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

/// Immutable ordered attribute map handed to and received from the engine.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AttributeMap {
    entries: BTreeMap<String, AttributeValue>,
}

impl AttributeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn value_type(&self, key: &str) -> Option<ValueType> {
        self.get(key).map(AttributeValue::value_type)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, AttributeValue)> for AttributeMap {
    fn from_iter<I: IntoIterator<Item = (K, AttributeValue)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Mutable accumulator producing [`AttributeMap`]s. Later sets overwrite earlier ones.
#[derive(Clone, Debug, Default)]
pub struct AttributeMapBuilder {
    entries: BTreeMap<String, AttributeValue>,
}

impl AttributeMapBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: AttributeValue) {
        self.entries.insert(key.into(), value);
    }

    pub fn set_bool(&mut self, key: impl Into<String>, value: bool) {
        self.set(key, AttributeValue::Bool(value));
    }

    pub fn set_int(&mut self, key: impl Into<String>, value: i32) {
        self.set(key, AttributeValue::Int(value));
    }

    pub fn set_float(&mut self, key: impl Into<String>, value: f64) {
        self.set(key, AttributeValue::Float(value));
    }

    pub fn set_string(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.set(key, AttributeValue::String(value.into()));
    }

    pub fn set_bool_array(&mut self, key: impl Into<String>, values: impl IntoIterator<Item = bool>) {
        self.set(key, AttributeValue::BoolArray(values.into_iter().collect()));
    }

    pub fn set_int_array(&mut self, key: impl Into<String>, values: impl IntoIterator<Item = i32>) {
        self.set(key, AttributeValue::IntArray(values.into_iter().collect()));
    }

    pub fn set_float_array(&mut self, key: impl Into<String>, values: impl IntoIterator<Item = f64>) {
        self.set(key, AttributeValue::FloatArray(values.into_iter().collect()));
    }

    pub fn set_string_array<S: Into<String>>(
        &mut self,
        key: impl Into<String>,
        values: impl IntoIterator<Item = S>,
    ) {
        self.set(
            key,
            AttributeValue::StringArray(values.into_iter().map(Into::into).collect()),
        );
    }

    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of the current entries.
    pub fn build(&self) -> AttributeMap {
        AttributeMap {
            entries: self.entries.clone(),
        }
    }

    /// Moves the entries out, leaving the builder empty.
    pub fn build_and_reset(&mut self) -> AttributeMap {
        AttributeMap {
            entries: std::mem::take(&mut self.entries),
        }
    }
}
