//! Engine attribute maps into host primitive attributes.
//!
//! Every value of a map is broadcast over a contiguous primitive range with a
//! single blocked write. Host attribute handles are created on first sight of
//! a key and reused for the lifetime of the [`ToHost`] instance, so the tuple
//! size of an array written as a tuple is fixed by the first value seen.
use std::collections::{BTreeMap, HashMap};
use std::ops::Range;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::attributes::cache::StringCaches;
use crate::attributes::names::GROUP_SEPARATOR;
use crate::attributes::{AttributeMap, AttributeValue, ValueType};
use crate::mesh::{BlockValue, Layout, Mesh, Storage};

/// How array-typed values become host attributes.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ArrayHandling {
    /// Fixed-size tuple; cardinality taken from the first value seen.
    #[default]
    Tuple,
    /// Variable-length host array attribute.
    Array,
}

/// Whether default-valued entries are written.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DefaultWritePolicy {
    /// Write every value.
    #[default]
    Always,
    /// Skip values equal to the zero value of their type; the host default stays in place.
    SkipIfDefault,
}

const COLOR_SUFFIXES: [&str; 3] = ["r", "g", "b"];

#[derive(Clone, Debug)]
enum Handle {
    Ready {
        name: Arc<str>,
        value_type: ValueType,
        layout: Layout,
    },
    Skipped,
}

/// Writes engine attribute maps into a host mesh.
pub struct ToHost<'m, 'c> {
    mesh: &'m mut Mesh,
    caches: &'c StringCaches,
    policy: DefaultWritePolicy,
    handles: HashMap<String, Handle>,
}

fn storage_for(value_type: ValueType, arrays: ArrayHandling) -> Storage {
    match value_type.element() {
        ValueType::Bool => Storage::Int8,
        ValueType::Int => Storage::Int32,
        ValueType::Float if value_type.is_array() && arrays == ArrayHandling::Array => Storage::Real64,
        ValueType::Float => Storage::Real32,
        _ => Storage::String,
    }
}

fn color_component(key: &str) -> Option<(&str, usize)> {
    let (primary, suffix) = key.rsplit_once(GROUP_SEPARATOR)?;
    let component = COLOR_SUFFIXES.iter().position(|s| *s == suffix)?;
    Some((primary, component))
}

impl<'m, 'c> ToHost<'m, 'c> {
    pub fn new(mesh: &'m mut Mesh, caches: &'c StringCaches) -> Self {
        Self {
            mesh,
            caches,
            policy: DefaultWritePolicy::Always,
            handles: HashMap::new(),
        }
    }

    pub fn with_policy(mut self, policy: DefaultWritePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Broadcasts every entry of `map` over the primitives in `prims`.
    ///
    /// Float keys ending in `.r`, `.g` and `.b` that share a prefix are grouped
    /// into one 3-component attribute named after the prefix.
    pub fn convert(&mut self, map: &AttributeMap, prims: Range<usize>, arrays: ArrayHandling) {
        if prims.is_empty() {
            return;
        }
        let mut colors: BTreeMap<&str, [Option<f64>; 3]> = BTreeMap::new();
        for (key, value) in map.iter() {
            if let (Some((primary, c)), AttributeValue::Float(v)) = (color_component(key), value) {
                colors.entry(primary).or_default()[c] = Some(*v);
                continue;
            }
            self.write_value(key, value, prims.clone(), arrays);
        }
        for (primary, components) in colors {
            if let [Some(r), Some(g), Some(b)] = components {
                self.write_color(primary, [r, g, b], prims.clone());
            } else {
                for (c, v) in components.iter().enumerate() {
                    if let Some(v) = v {
                        let key = format!("{primary}{GROUP_SEPARATOR}{}", COLOR_SUFFIXES[c]);
                        self.write_value(&key, &AttributeValue::Float(*v), prims.clone(), arrays);
                    }
                }
            }
        }
    }

    fn handle(&mut self, key: &str, storage: Storage, layout: Layout, value_type: ValueType) -> Handle {
        if let Some(handle) = self.handles.get(key) {
            return handle.clone();
        }
        let name = self.caches.host_name(key);
        let handle = match self.mesh.ensure_prim_attribute(&name, storage, layout) {
            Ok(_) => Handle::Ready {
                name,
                value_type,
                layout,
            },
            Err((existing, existing_layout)) => {
                warn!(
                    "cannot write '{}' as {:?}/{:?}: host attribute '{}' already exists as {:?}/{:?}",
                    key, storage, layout, name, existing, existing_layout
                );
                Handle::Skipped
            }
        };
        self.handles.insert(key.to_owned(), handle.clone());
        handle
    }

    fn write_color(&mut self, primary: &str, rgb: [f64; 3], prims: Range<usize>) {
        let Handle::Ready { name, value_type, .. } =
            self.handle(primary, Storage::Real32, Layout::Tuple(3), ValueType::Float)
        else {
            return;
        };
        if value_type != ValueType::Float {
            return;
        }
        let Some(attr) = self.mesh.prim_attribute_mut(&name) else {
            return;
        };
        for (c, v) in rgb.into_iter().enumerate() {
            if self.policy == DefaultWritePolicy::SkipIfDefault && v == 0.0 {
                continue;
            }
            attr.set_block(prims.clone(), c, BlockValue::Real32(v as f32));
        }
    }

    fn write_value(&mut self, key: &str, value: &AttributeValue, prims: Range<usize>, arrays: ArrayHandling) {
        if self.policy == DefaultWritePolicy::SkipIfDefault && value.is_default() {
            return;
        }
        let value_type = value.value_type();
        let layout = match (value.is_array(), arrays) {
            (false, _) => Layout::Tuple(1),
            (true, ArrayHandling::Tuple) => Layout::Tuple(value.len().max(1)),
            (true, ArrayHandling::Array) => Layout::Array,
        };
        let storage = storage_for(value_type, arrays);
        let Handle::Ready {
            name,
            value_type: expected,
            layout,
        } = self.handle(key, storage, layout, value_type)
        else {
            return;
        };
        if expected != value_type {
            debug!(
                "skipping '{}': value type {:?} differs from first seen {:?}",
                key, value_type, expected
            );
            return;
        }
        let caches = self.caches;
        let Some(attr) = self.mesh.prim_attribute_mut(&name) else {
            return;
        };

        match (value, layout) {
            (AttributeValue::Bool(v), _) => {
                attr.set_block(prims, 0, BlockValue::Int8(i8::from(*v)));
            }
            (AttributeValue::Int(v), _) => {
                attr.set_block(prims, 0, BlockValue::Int32(*v));
            }
            (AttributeValue::Float(v), _) => {
                attr.set_block(prims, 0, BlockValue::Real32(*v as f32));
            }
            (AttributeValue::String(v), _) => {
                attr.set_block(prims, 0, BlockValue::String(caches.host_string(v)));
            }
            (AttributeValue::BoolArray(v), Layout::Array) => {
                let values: Vec<i8> = v.iter().map(|&b| i8::from(b)).collect();
                attr.set_block(prims, 0, BlockValue::Int8Array(&values));
            }
            (AttributeValue::IntArray(v), Layout::Array) => {
                attr.set_block(prims, 0, BlockValue::Int32Array(v));
            }
            (AttributeValue::FloatArray(v), Layout::Array) => {
                attr.set_block(prims, 0, BlockValue::Real64Array(v));
            }
            (AttributeValue::StringArray(v), Layout::Array) => {
                let values: Vec<Arc<str>> = v.iter().map(|s| caches.host_string(s)).collect();
                attr.set_block(prims, 0, BlockValue::StringArray(&values));
            }
            (array, Layout::Tuple(n)) => {
                if array.len() > n {
                    debug!(
                        "'{}' has {} elements, host tuple holds {}; extra elements dropped",
                        key,
                        array.len(),
                        n
                    );
                }
                let components: Vec<BlockValue<'_>> = match array {
                    AttributeValue::BoolArray(v) => {
                        v.iter().map(|&b| BlockValue::Int8(i8::from(b))).collect()
                    }
                    AttributeValue::IntArray(v) => v.iter().map(|&i| BlockValue::Int32(i)).collect(),
                    AttributeValue::FloatArray(v) => {
                        v.iter().map(|&f| BlockValue::Real32(f as f32)).collect()
                    }
                    AttributeValue::StringArray(v) => v
                        .iter()
                        .map(|s| BlockValue::String(caches.host_string(s)))
                        .collect(),
                    _ => Vec::new(),
                };
                for (c, component) in components.into_iter().take(n).enumerate() {
                    attr.set_block(prims.clone(), c, component);
                }
            }
        }
    }
}
