//! Grouping primitives by classifier value.
//!
//! Each primitive is classified by reading its classifier attribute. The
//! attribute name and expected type come from the invocation-level
//! [`Classifier`] unless the primitive overrides them through the reserved
//! classifier attributes. Primitives that cannot be classified land in the
//! [`ClassifierValue::Invalid`] group.
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::mesh::{HostElement, Mesh};
use crate::shape::reserved;

/// Expected type of classifier values.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ClassifierType {
    #[default]
    String,
    Integer,
    Real,
}

impl ClassifierType {
    /// Parses `"string"`, `"int"`/`"integer"` or `"float"`/`"real"`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "string" | "str" => Some(ClassifierType::String),
            "int" | "integer" => Some(ClassifierType::Integer),
            "float" | "real" => Some(ClassifierType::Real),
            _ => None,
        }
    }

    /// Parses the numeric code `0` (string), `1` (integer) or `2` (real).
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(ClassifierType::String),
            1 => Some(ClassifierType::Integer),
            2 => Some(ClassifierType::Real),
            _ => None,
        }
    }
}

/// Name and expected type of the classifier attribute.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Classifier {
    pub name: String,
    pub value_type: ClassifierType,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new("primCls", ClassifierType::Integer)
    }
}

impl Classifier {
    pub fn new(name: impl Into<String>, value_type: ClassifierType) -> Self {
        Self {
            name: name.into(),
            value_type,
        }
    }

    /// The classifier effective for `prim`, honouring the reserved per-primitive overrides.
    pub fn for_primitive(&self, mesh: &Mesh, prim: usize) -> Classifier {
        let mut out = self.clone();
        if let Some(HostElement::String([name, ..])) = mesh
            .find_prim_attribute(reserved::CLASSIFIER_NAME)
            .and_then(|a| a.element(prim))
        {
            if !name.is_empty() {
                out.name = name.to_string();
            }
        }
        let value_type = match mesh
            .find_prim_attribute(reserved::CLASSIFIER_TYPE)
            .and_then(|a| a.element(prim))
        {
            Some(HostElement::String([s, ..])) if !s.is_empty() => ClassifierType::from_name(s),
            Some(HostElement::Int32([c, ..])) => ClassifierType::from_code(*c),
            Some(HostElement::Int8([c, ..])) => ClassifierType::from_code(i32::from(*c)),
            _ => None,
        };
        if let Some(value_type) = value_type {
            out.value_type = value_type;
        }
        out
    }
}

/// Value of a primitive's classifier attribute.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug)]
pub enum ClassifierValue {
    /// Missing, empty or wrongly typed classifier.
    Invalid,
    Text(String),
    Integer(i32),
    Real(f64),
}

impl ClassifierValue {
    /// Real classifier value with -0.0 folded into 0.0.
    pub fn real(v: f64) -> Self {
        ClassifierValue::Real(if v == 0.0 { 0.0 } else { v })
    }

    fn rank(&self) -> u8 {
        match self {
            ClassifierValue::Invalid => 0,
            ClassifierValue::Text(_) => 1,
            ClassifierValue::Integer(_) => 2,
            ClassifierValue::Real(_) => 3,
        }
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self, ClassifierValue::Invalid)
    }
}

impl Ord for ClassifierValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (ClassifierValue::Text(a), ClassifierValue::Text(b)) => a.cmp(b),
            (ClassifierValue::Integer(a), ClassifierValue::Integer(b)) => a.cmp(b),
            (ClassifierValue::Real(a), ClassifierValue::Real(b)) => a.total_cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for ClassifierValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ClassifierValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ClassifierValue {}

/// Reads the classifier value of `prim`.
pub fn classify(mesh: &Mesh, classifier: &Classifier, prim: usize) -> ClassifierValue {
    let cls = classifier.for_primitive(mesh, prim);
    if cls.name.is_empty() {
        return ClassifierValue::Invalid;
    }
    let Some(attr) = mesh.find_prim_attribute(&cls.name) else {
        debug!("primitive {prim} has no classifier attribute '{}'", cls.name);
        return ClassifierValue::Invalid;
    };
    if attr.is_array() {
        warn!(
            "classifier attribute '{}' is an array attribute, primitive {prim} left unclassified",
            cls.name
        );
        return ClassifierValue::Invalid;
    }
    match (cls.value_type, attr.element(prim)) {
        (ClassifierType::String, Some(HostElement::String([s, ..]))) => {
            if s.is_empty() {
                warn!(
                    "primitive {prim} has an empty '{}' classifier value, using the invalid group",
                    cls.name
                );
                ClassifierValue::Invalid
            } else {
                ClassifierValue::Text(s.to_string())
            }
        }
        (ClassifierType::Integer, Some(HostElement::Int32([v, ..]))) => ClassifierValue::Integer(*v),
        (ClassifierType::Integer, Some(HostElement::Int8([v, ..]))) => {
            ClassifierValue::Integer(i32::from(*v))
        }
        (ClassifierType::Real, Some(HostElement::Real32([v, ..]))) => {
            ClassifierValue::real(f64::from(*v))
        }
        (ClassifierType::Real, Some(HostElement::Real64([v, ..]))) => ClassifierValue::real(*v),
        _ => {
            warn!(
                "classifier attribute '{}' has storage {:?}, expected {:?} values; primitive {prim} left unclassified",
                cls.name,
                attr.storage(),
                cls.value_type
            );
            ClassifierValue::Invalid
        }
    }
}

/// Primitives grouped by classifier value, ordered by value.
///
/// Every primitive appears in exactly one group and each group lists its
/// primitives in ascending order.
#[derive(Clone, Debug, Default)]
pub struct PrimitivePartition {
    partitions: BTreeMap<ClassifierValue, Vec<usize>>,
    classifier_names: BTreeSet<String>,
}

impl PrimitivePartition {
    /// Partitions every primitive of `mesh`.
    pub fn new(mesh: &Mesh, classifier: &Classifier) -> Self {
        let mut partition = Self::default();
        for prim in 0..mesh.primitive_count() {
            partition.add(mesh, classifier, prim);
        }
        partition
    }

    pub fn add(&mut self, mesh: &Mesh, classifier: &Classifier, prim: usize) {
        let effective = classifier.for_primitive(mesh, prim);
        if !effective.name.is_empty() {
            self.classifier_names.insert(effective.name);
        }
        let value = classify(mesh, classifier, prim);
        self.partitions.entry(value).or_default().push(prim);
    }

    pub fn get(&self) -> &BTreeMap<ClassifierValue, Vec<usize>> {
        &self.partitions
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ClassifierValue, &[usize])> {
        self.partitions.iter().map(|(k, v)| (k, v.as_slice()))
    }

    /// Attribute names used as classifiers by at least one primitive.
    pub fn classifier_names(&self) -> &BTreeSet<String> {
        &self.classifier_names
    }

    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }
}
