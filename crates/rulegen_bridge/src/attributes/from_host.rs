//! Host primitive attributes into engine attribute maps.
use tracing::warn;

use crate::attributes::AttributeMapBuilder;
use crate::mesh::{Attribute, HostElement};

/// Writes host attribute values into an [`AttributeMapBuilder`].
///
/// Storage maps as follows: 8-bit integers become booleans (`v > 0`), 32-bit
/// integers become ints, both real storages become doubles and strings stay
/// strings. Array attributes produce the matching array type. Tuple attributes
/// contribute their first component.
pub struct FromHost<'a> {
    builder: &'a mut AttributeMapBuilder,
}

impl<'a> FromHost<'a> {
    pub fn new(builder: &'a mut AttributeMapBuilder) -> Self {
        Self { builder }
    }

    /// Converts the value of `attr` at primitive `offset` into `key`.
    ///
    /// Returns `false` and leaves the builder untouched for unsupported storage.
    pub fn convert(&mut self, attr: &Attribute, offset: usize, key: &str) -> bool {
        let Some(element) = attr.element(offset) else {
            warn!(
                "attribute '{}' has no value for primitive {}",
                attr.name(),
                offset
            );
            return false;
        };
        let is_array = attr.is_array();
        match element {
            HostElement::Int8(v) if is_array => {
                self.builder.set_bool_array(key, v.iter().map(|&x| x > 0))
            }
            HostElement::Int32(v) if is_array => self.builder.set_int_array(key, v.iter().copied()),
            HostElement::Real32(v) if is_array => {
                self.builder.set_float_array(key, v.iter().map(|&x| f64::from(x)))
            }
            HostElement::Real64(v) if is_array => {
                self.builder.set_float_array(key, v.iter().copied())
            }
            HostElement::String(v) if is_array => {
                self.builder.set_string_array(key, v.iter().map(|s| s.to_string()))
            }
            HostElement::Int8(&[x, ..]) => self.builder.set_bool(key, x > 0),
            HostElement::Int32(&[x, ..]) => self.builder.set_int(key, x),
            HostElement::Real32(&[x, ..]) => self.builder.set_float(key, f64::from(x)),
            HostElement::Real64(&[x, ..]) => self.builder.set_float(key, x),
            HostElement::String([s, ..]) => self.builder.set_string(key, s.to_string()),
            _ => {
                warn!(
                    "attribute '{}' has unsupported storage {:?}, not passed to the engine",
                    attr.name(),
                    attr.storage()
                );
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::attributes::AttributeValue;
    use crate::mesh::{BlockValue, Layout, Storage};

    fn convert_one(attr: &Attribute, offset: usize) -> (bool, Option<AttributeValue>) {
        let mut builder = AttributeMapBuilder::new();
        let ok = FromHost::new(&mut builder).convert(attr, offset, "s$k");
        (ok, builder.get("s$k").cloned())
    }

    #[test]
    fn scalar_storages_map_to_engine_types() {
        let mut flag = Attribute::new("flag", Storage::Int8, Layout::Tuple(1), 2);
        flag.set(1, 0, BlockValue::Int8(3));
        assert_eq!(convert_one(&flag, 0).1, Some(AttributeValue::Bool(false)));
        assert_eq!(convert_one(&flag, 1).1, Some(AttributeValue::Bool(true)));

        let mut count = Attribute::new("count", Storage::Int32, Layout::Tuple(1), 1);
        count.set(0, 0, BlockValue::Int32(-7));
        assert_eq!(convert_one(&count, 0).1, Some(AttributeValue::Int(-7)));

        let mut height = Attribute::new("height", Storage::Real32, Layout::Tuple(1), 1);
        height.set(0, 0, BlockValue::Real32(2.5));
        assert_eq!(convert_one(&height, 0).1, Some(AttributeValue::Float(2.5)));

        let mut name = Attribute::new("name", Storage::String, Layout::Tuple(1), 1);
        name.set(0, 0, BlockValue::String(Arc::from("lot")));
        assert_eq!(
            convert_one(&name, 0).1,
            Some(AttributeValue::String("lot".into()))
        );
    }

    #[test]
    fn tuple_attributes_use_first_component() {
        let mut cd = Attribute::new("cd", Storage::Real64, Layout::Tuple(3), 1);
        cd.set(0, 0, BlockValue::Real64(0.25));
        cd.set(0, 1, BlockValue::Real64(0.5));
        assert_eq!(convert_one(&cd, 0).1, Some(AttributeValue::Float(0.25)));
    }

    #[test]
    fn array_storages_map_to_array_types() {
        let mut flags = Attribute::new("flags", Storage::Int8, Layout::Array, 1);
        flags.set(0, 0, BlockValue::Int8Array(&[0, 1, 2]));
        assert_eq!(
            convert_one(&flags, 0).1,
            Some(AttributeValue::BoolArray(vec![false, true, true]))
        );

        let mut heights = Attribute::new("heights", Storage::Real64, Layout::Array, 1);
        heights.set(0, 0, BlockValue::Real64Array(&[1.0, 2.0]));
        assert_eq!(
            convert_one(&heights, 0).1,
            Some(AttributeValue::FloatArray(vec![1.0, 2.0]))
        );

        let empty = Attribute::new("tags", Storage::String, Layout::Array, 1);
        assert_eq!(
            convert_one(&empty, 0).1,
            Some(AttributeValue::StringArray(vec![]))
        );
    }

    #[test]
    fn unsupported_storage_is_skipped() {
        let dict = Attribute::new("meta", Storage::Dict, Layout::Tuple(1), 1);
        assert_eq!(convert_one(&dict, 0), (false, None));

        let ints = Attribute::new("ints", Storage::Int32, Layout::Tuple(1), 1);
        assert_eq!(convert_one(&ints, 5), (false, None));
    }
}
