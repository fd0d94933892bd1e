//! Typed primitive attribute storage for the host mesh.
//!
//! Attributes are stored column-wise: one [`AttributeData`] per attribute holds
//! the values of every primitive. Tuple attributes store `len * tuple_size`
//! components back to back; array attributes store one vector per primitive.
use std::ops::Range;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Element storage of a host attribute.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Storage {
    Int8,
    Int32,
    Real32,
    Real64,
    String,
    /// Dictionary storage. Present on host meshes but never converted.
    Dict,
}

/// Coarse storage class of a host attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StorageClass {
    Integer,
    Real,
    String,
    Other,
}

impl Storage {
    pub fn class(self) -> StorageClass {
        match self {
            Storage::Int8 | Storage::Int32 => StorageClass::Integer,
            Storage::Real32 | Storage::Real64 => StorageClass::Real,
            Storage::String => StorageClass::String,
            Storage::Dict => StorageClass::Other,
        }
    }
}

/// Layout of a host attribute: fixed-size tuple or variable-length array.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Layout {
    Tuple(usize),
    Array,
}

/// Column data of a primitive attribute.
#[derive(Clone, Debug, PartialEq)]
pub enum AttributeData {
    Int8 { tuple_size: usize, values: Vec<i8> },
    Int32 { tuple_size: usize, values: Vec<i32> },
    Real32 { tuple_size: usize, values: Vec<f32> },
    Real64 { tuple_size: usize, values: Vec<f64> },
    String { tuple_size: usize, values: Vec<Arc<str>> },
    Int8Array(Vec<Vec<i8>>),
    Int32Array(Vec<Vec<i32>>),
    Real64Array(Vec<Vec<f64>>),
    StringArray(Vec<Vec<Arc<str>>>),
    /// Unsupported storage; only the element count is tracked.
    Dict(usize),
}

/// Borrowed view of one primitive's value: the tuple components or the array items.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum HostElement<'a> {
    Int8(&'a [i8]),
    Int32(&'a [i32]),
    Real32(&'a [f32]),
    Real64(&'a [f64]),
    String(&'a [Arc<str>]),
    Unsupported,
}

/// A single value broadcast over a block of primitives by [`Attribute::set_block`].
#[derive(Clone, Debug, PartialEq)]
pub enum BlockValue<'a> {
    Int8(i8),
    Int32(i32),
    Real32(f32),
    Real64(f64),
    String(Arc<str>),
    Int8Array(&'a [i8]),
    Int32Array(&'a [i32]),
    Real64Array(&'a [f64]),
    StringArray(&'a [Arc<str>]),
}

/// A named primitive attribute.
#[derive(Clone, Debug, PartialEq)]
pub struct Attribute {
    name: String,
    data: AttributeData,
}

fn empty_str() -> Arc<str> {
    Arc::from("")
}

impl Attribute {
    /// Creates an attribute holding `len` default values.
    pub fn new(name: impl Into<String>, storage: Storage, layout: Layout, len: usize) -> Self {
        let data = match (storage, layout) {
            (Storage::Int8, Layout::Tuple(n)) => AttributeData::Int8 {
                tuple_size: n.max(1),
                values: vec![0; len * n.max(1)],
            },
            (Storage::Int32, Layout::Tuple(n)) => AttributeData::Int32 {
                tuple_size: n.max(1),
                values: vec![0; len * n.max(1)],
            },
            (Storage::Real32, Layout::Tuple(n)) => AttributeData::Real32 {
                tuple_size: n.max(1),
                values: vec![0.0; len * n.max(1)],
            },
            (Storage::Real64, Layout::Tuple(n)) => AttributeData::Real64 {
                tuple_size: n.max(1),
                values: vec![0.0; len * n.max(1)],
            },
            (Storage::String, Layout::Tuple(n)) => AttributeData::String {
                tuple_size: n.max(1),
                values: vec![empty_str(); len * n.max(1)],
            },
            (Storage::Int8, Layout::Array) => AttributeData::Int8Array(vec![Vec::new(); len]),
            (Storage::Int32, Layout::Array) => AttributeData::Int32Array(vec![Vec::new(); len]),
            (Storage::Real32 | Storage::Real64, Layout::Array) => {
                AttributeData::Real64Array(vec![Vec::new(); len])
            }
            (Storage::String, Layout::Array) => AttributeData::StringArray(vec![Vec::new(); len]),
            (Storage::Dict, _) => AttributeData::Dict(len),
        };
        Self {
            name: name.into(),
            data,
        }
    }

    /// Wraps existing column data.
    pub fn from_data(name: impl Into<String>, data: AttributeData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &AttributeData {
        &self.data
    }

    pub fn storage(&self) -> Storage {
        match &self.data {
            AttributeData::Int8 { .. } | AttributeData::Int8Array(_) => Storage::Int8,
            AttributeData::Int32 { .. } | AttributeData::Int32Array(_) => Storage::Int32,
            AttributeData::Real32 { .. } => Storage::Real32,
            AttributeData::Real64 { .. } | AttributeData::Real64Array(_) => Storage::Real64,
            AttributeData::String { .. } | AttributeData::StringArray(_) => Storage::String,
            AttributeData::Dict(_) => Storage::Dict,
        }
    }

    pub fn layout(&self) -> Layout {
        match &self.data {
            AttributeData::Int8 { tuple_size, .. }
            | AttributeData::Int32 { tuple_size, .. }
            | AttributeData::Real32 { tuple_size, .. }
            | AttributeData::Real64 { tuple_size, .. }
            | AttributeData::String { tuple_size, .. } => Layout::Tuple(*tuple_size),
            AttributeData::Dict(_) => Layout::Tuple(1),
            _ => Layout::Array,
        }
    }

    pub fn is_array(&self) -> bool {
        self.layout() == Layout::Array
    }

    /// Tuple size, or `1` for array attributes.
    pub fn tuple_size(&self) -> usize {
        match self.layout() {
            Layout::Tuple(n) => n,
            Layout::Array => 1,
        }
    }

    /// Number of primitives covered by this attribute.
    pub fn len(&self) -> usize {
        match &self.data {
            AttributeData::Int8 { tuple_size, values } => values.len() / tuple_size,
            AttributeData::Int32 { tuple_size, values } => values.len() / tuple_size,
            AttributeData::Real32 { tuple_size, values } => values.len() / tuple_size,
            AttributeData::Real64 { tuple_size, values } => values.len() / tuple_size,
            AttributeData::String { tuple_size, values } => values.len() / tuple_size,
            AttributeData::Int8Array(v) => v.len(),
            AttributeData::Int32Array(v) => v.len(),
            AttributeData::Real64Array(v) => v.len(),
            AttributeData::StringArray(v) => v.len(),
            AttributeData::Dict(n) => *n,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Grows (or shrinks) the column to `len` primitives, filling with defaults.
    pub fn resize(&mut self, len: usize) {
        match &mut self.data {
            AttributeData::Int8 { tuple_size, values } => values.resize(len * *tuple_size, 0),
            AttributeData::Int32 { tuple_size, values } => values.resize(len * *tuple_size, 0),
            AttributeData::Real32 { tuple_size, values } => values.resize(len * *tuple_size, 0.0),
            AttributeData::Real64 { tuple_size, values } => values.resize(len * *tuple_size, 0.0),
            AttributeData::String { tuple_size, values } => {
                values.resize(len * *tuple_size, empty_str())
            }
            AttributeData::Int8Array(v) => v.resize(len, Vec::new()),
            AttributeData::Int32Array(v) => v.resize(len, Vec::new()),
            AttributeData::Real64Array(v) => v.resize(len, Vec::new()),
            AttributeData::StringArray(v) => v.resize(len, Vec::new()),
            AttributeData::Dict(n) => *n = len,
        }
    }

    /// Returns the value stored for the primitive at `offset`.
    pub fn element(&self, offset: usize) -> Option<HostElement<'_>> {
        if offset >= self.len() {
            return None;
        }
        let element = match &self.data {
            AttributeData::Int8 { tuple_size, values } => {
                HostElement::Int8(&values[offset * tuple_size..(offset + 1) * tuple_size])
            }
            AttributeData::Int32 { tuple_size, values } => {
                HostElement::Int32(&values[offset * tuple_size..(offset + 1) * tuple_size])
            }
            AttributeData::Real32 { tuple_size, values } => {
                HostElement::Real32(&values[offset * tuple_size..(offset + 1) * tuple_size])
            }
            AttributeData::Real64 { tuple_size, values } => {
                HostElement::Real64(&values[offset * tuple_size..(offset + 1) * tuple_size])
            }
            AttributeData::String { tuple_size, values } => {
                HostElement::String(&values[offset * tuple_size..(offset + 1) * tuple_size])
            }
            AttributeData::Int8Array(v) => HostElement::Int8(&v[offset]),
            AttributeData::Int32Array(v) => HostElement::Int32(&v[offset]),
            AttributeData::Real64Array(v) => HostElement::Real64(&v[offset]),
            AttributeData::StringArray(v) => HostElement::String(&v[offset]),
            AttributeData::Dict(_) => HostElement::Unsupported,
        };
        Some(element)
    }

    /// Writes `value` into `component` of every primitive in `range` in one blocked write.
    ///
    /// Returns `false` and leaves the column untouched when the value does not match the
    /// attribute storage, the component is out of bounds, or the range exceeds the column.
    pub fn set_block(&mut self, range: Range<usize>, component: usize, value: BlockValue<'_>) -> bool {
        if range.end > self.len() {
            return false;
        }
        match (&mut self.data, value) {
            (AttributeData::Int8 { tuple_size, values }, BlockValue::Int8(v)) => {
                fill_tuple(values, *tuple_size, range, component, v)
            }
            (AttributeData::Int32 { tuple_size, values }, BlockValue::Int32(v)) => {
                fill_tuple(values, *tuple_size, range, component, v)
            }
            (AttributeData::Real32 { tuple_size, values }, BlockValue::Real32(v)) => {
                fill_tuple(values, *tuple_size, range, component, v)
            }
            (AttributeData::Real64 { tuple_size, values }, BlockValue::Real64(v)) => {
                fill_tuple(values, *tuple_size, range, component, v)
            }
            (AttributeData::String { tuple_size, values }, BlockValue::String(v)) => {
                fill_tuple(values, *tuple_size, range, component, v)
            }
            (AttributeData::Int8Array(values), BlockValue::Int8Array(v)) => {
                fill_array(values, range, v)
            }
            (AttributeData::Int32Array(values), BlockValue::Int32Array(v)) => {
                fill_array(values, range, v)
            }
            (AttributeData::Real64Array(values), BlockValue::Real64Array(v)) => {
                fill_array(values, range, v)
            }
            (AttributeData::StringArray(values), BlockValue::StringArray(v)) => {
                fill_array(values, range, v)
            }
            _ => false,
        }
    }

    /// Writes a single primitive value. Shorthand for a one-element [`Attribute::set_block`].
    pub fn set(&mut self, offset: usize, component: usize, value: BlockValue<'_>) -> bool {
        self.set_block(offset..offset + 1, component, value)
    }
}

fn fill_tuple<T: Clone>(
    values: &mut [T],
    tuple_size: usize,
    range: Range<usize>,
    component: usize,
    value: T,
) -> bool {
    if component >= tuple_size {
        return false;
    }
    for offset in range {
        values[offset * tuple_size + component] = value.clone();
    }
    true
}

fn fill_array<T: Clone>(values: &mut [Vec<T>], range: Range<usize>, value: &[T]) -> bool {
    for slot in &mut values[range] {
        slot.clear();
        slot.extend_from_slice(value);
    }
    true
}
