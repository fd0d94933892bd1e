//! Turning host primitives into engine initial shapes.
//!
//! - [`partition`]: groups primitives by classifier value.
//! - [`builder`]: flattens groups into geometry, resolves main and rule attributes, creates shapes.
//! - [`data`]: the per-invocation [`ShapeData`] container.
//! - [`evaluate`]: asks the engine for the default rule attribute values of created shapes.
//! - [`assign`]: writes resolved main attributes and default rule attributes back onto primitives.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::attributes::names;
use crate::error::{Error, Result};
use crate::mesh::{HostElement, Mesh};
use crate::shape::partition::ClassifierValue;

pub mod assign;
pub mod builder;
pub mod data;
pub mod evaluate;
pub mod partition;

pub use assign::{assign_main_attributes, assign_rule_attributes};
pub use builder::{centroid_seed, flatten_primitives, uv_set_name, ShapeBuilder, MAX_UV_SETS};
pub use data::{InitialShapeBuilder, ShapeData};
pub use evaluate::evaluate_default_rule_attributes;
pub use partition::{Classifier, ClassifierType, PrimitivePartition};

/// Reserved primitive attribute names read and written by the bridge.
pub mod reserved {
    /// Per-primitive override of the classifier attribute name.
    pub const CLASSIFIER_NAME: &str = "shapeClassifierName";
    /// Per-primitive override of the classifier type (`"string"`, `"int"`, `"float"` or 0/1/2).
    pub const CLASSIFIER_TYPE: &str = "shapeClassifierType";
    pub const PACKAGE: &str = "rulePackage";
    pub const RULE_FILE: &str = "ruleFile";
    pub const START_RULE: &str = "startRule";
    pub const STYLE: &str = "ruleStyle";
    pub const RANDOM_SEED: &str = "randomSeed";

    /// Reserved names never forwarded to the engine as rule attributes.
    pub const ALL: [&str; 7] = [
        CLASSIFIER_NAME,
        CLASSIFIER_TYPE,
        PACKAGE,
        RULE_FILE,
        START_RULE,
        STYLE,
        RANDOM_SEED,
    ];

    pub fn is_reserved(name: &str) -> bool {
        ALL.contains(&name)
    }
}

/// Name given to every shape when groups are not named by classifier.
pub const DEFAULT_SHAPE_NAME: &str = "shape";
/// Name used for the group of primitives without a valid classifier value.
pub const INVALID_SHAPE_NAME: &str = "_invalid_";

/// Caller-level fallbacks for [`MainAttributes`].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShapeDefaults {
    pub package: PathBuf,
    pub rule_file: String,
    pub start_rule: String,
    pub style: String,
}

impl Default for ShapeDefaults {
    fn default() -> Self {
        Self {
            package: PathBuf::new(),
            rule_file: String::new(),
            start_rule: "Lot".to_string(),
            style: "Default".to_string(),
        }
    }
}

impl ShapeDefaults {
    pub fn new(package: impl Into<PathBuf>, rule_file: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            rule_file: rule_file.into(),
            ..Self::default()
        }
    }

    pub fn with_start_rule(mut self, start_rule: impl Into<String>) -> Self {
        self.start_rule = start_rule.into();
        self
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = style.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.style.contains(names::STYLE_SEPARATOR) {
            return Err(Error::InvalidConfig(format!(
                "style '{}' must not contain '{}'",
                self.style,
                names::STYLE_SEPARATOR
            )));
        }
        Ok(())
    }
}

/// Rule selection of one primitive group.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MainAttributes {
    pub package: PathBuf,
    pub rule_file: String,
    pub start_rule: String,
    pub style: String,
    pub random_seed: i32,
}

fn string_override(mesh: &Mesh, name: &str, prim: usize) -> Option<String> {
    match mesh.find_prim_attribute(name)?.element(prim)? {
        HostElement::String([s, ..]) if !s.is_empty() => Some(s.to_string()),
        _ => None,
    }
}

impl MainAttributes {
    /// Resolves main attributes from the reserved attributes of `prim`, falling
    /// back to `defaults` where absent or empty. `random_seed` is set by the caller.
    pub fn resolve(mesh: &Mesh, prim: usize, defaults: &ShapeDefaults) -> Self {
        Self {
            package: string_override(mesh, reserved::PACKAGE, prim)
                .map(PathBuf::from)
                .unwrap_or_else(|| defaults.package.clone()),
            rule_file: string_override(mesh, reserved::RULE_FILE, prim)
                .unwrap_or_else(|| defaults.rule_file.clone()),
            start_rule: string_override(mesh, reserved::START_RULE, prim)
                .unwrap_or_else(|| defaults.start_rule.clone()),
            style: string_override(mesh, reserved::STYLE, prim)
                .unwrap_or_else(|| defaults.style.clone()),
            random_seed: 0,
        }
    }

    pub fn fully_qualified_start_rule(&self) -> String {
        names::fully_qualified_start_rule(&self.style, &self.start_rule)
    }
}

/// How generated shapes (and their host groups) are named.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GroupNaming {
    /// Every shape is named [`DEFAULT_SHAPE_NAME`]; no host groups are created.
    #[default]
    Fixed,
    /// Shapes are named after their classifier value; one host group per shape.
    ByClassifier,
}

impl GroupNaming {
    pub fn creates_groups(self) -> bool {
        self == GroupNaming::ByClassifier
    }

    /// Shape name for a classifier value.
    ///
    /// Text values are legalized to `[A-Za-z0-9_]`, numeric values become
    /// `prefix_value`, and invalid or empty values map to [`INVALID_SHAPE_NAME`].
    pub fn name_for(self, value: &ClassifierValue, prefix: &str) -> String {
        if self == GroupNaming::Fixed {
            return DEFAULT_SHAPE_NAME.to_string();
        }
        let raw = match value {
            ClassifierValue::Invalid => return INVALID_SHAPE_NAME.to_string(),
            ClassifierValue::Text(s) => s.clone(),
            ClassifierValue::Integer(i) => format!("{prefix}_{i}"),
            ClassifierValue::Real(r) => format!("{prefix}_{r}"),
        };
        let name = names::legalize(&raw);
        if name.is_empty() {
            INVALID_SHAPE_NAME.to_string()
        } else {
            name
        }
    }
}
