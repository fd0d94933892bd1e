//! Configuration of a generate run.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::attributes::to_host::{ArrayHandling, DefaultWritePolicy};
use crate::error::{Error, Result};
use crate::shape::{Classifier, GroupNaming, ShapeDefaults};

/// Settings for [`crate::generate::generate_mesh`] and [`crate::generate::BatchGenerator`].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct GenerateConfig {
    /// Classifier used to partition input primitives.
    pub classifier: Classifier,
    /// Main attribute fallbacks.
    pub defaults: ShapeDefaults,
    /// Naming of generated shapes and host groups.
    pub group_naming: GroupNaming,
    /// Prefix for names derived from numeric classifier values.
    pub name_prefix: String,
    /// Ask the engine for generic shape attributes.
    pub emit_attributes: bool,
    /// Ask the engine for per-range material maps.
    pub emit_materials: bool,
    /// Ask the engine for per-range report maps.
    pub emit_reports: bool,
    /// Run the occluder pre-pass and generate with occlusion.
    pub occlusion: bool,
    /// Upper bound on worker threads; `None` uses every available worker.
    pub max_threads: Option<usize>,
    pub material_arrays: ArrayHandling,
    pub shape_attribute_arrays: ArrayHandling,
    pub default_write_policy: DefaultWritePolicy,
    /// Add the rule error encoder.
    pub error_encoder: bool,
    /// Add the rule print encoder.
    pub print_encoder: bool,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            classifier: Classifier::default(),
            defaults: ShapeDefaults::default(),
            group_naming: GroupNaming::ByClassifier,
            name_prefix: "shape".to_string(),
            emit_attributes: false,
            emit_materials: false,
            emit_reports: false,
            occlusion: true,
            max_threads: None,
            material_arrays: ArrayHandling::Tuple,
            shape_attribute_arrays: ArrayHandling::Array,
            default_write_policy: DefaultWritePolicy::Always,
            error_encoder: true,
            print_encoder: true,
        }
    }
}

impl GenerateConfig {
    pub fn new(defaults: ShapeDefaults) -> Self {
        Self {
            defaults,
            ..Default::default()
        }
    }

    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_group_naming(mut self, naming: GroupNaming, prefix: impl Into<String>) -> Self {
        self.group_naming = naming;
        self.name_prefix = prefix.into();
        self
    }

    /// Sets the three host encoder emit switches.
    pub fn with_emit(mut self, attributes: bool, materials: bool, reports: bool) -> Self {
        self.emit_attributes = attributes;
        self.emit_materials = materials;
        self.emit_reports = reports;
        self
    }

    pub fn with_occlusion(mut self, occlusion: bool) -> Self {
        self.occlusion = occlusion;
        self
    }

    pub fn with_max_threads(mut self, max_threads: usize) -> Self {
        self.max_threads = Some(max_threads);
        self
    }

    pub fn with_array_handling(mut self, materials: ArrayHandling, shape_attributes: ArrayHandling) -> Self {
        self.material_arrays = materials;
        self.shape_attribute_arrays = shape_attributes;
        self
    }

    pub fn with_default_write_policy(mut self, policy: DefaultWritePolicy) -> Self {
        self.default_write_policy = policy;
        self
    }

    pub fn with_message_encoders(mut self, errors: bool, prints: bool) -> Self {
        self.error_encoder = errors;
        self.print_encoder = prints;
        self
    }

    /// Worker threads for `shapes` initial shapes given `available` workers.
    pub fn thread_count(&self, available: usize, shapes: usize) -> usize {
        let cap = self.max_threads.unwrap_or(available).min(available);
        cap.min(shapes).max(1)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_threads == Some(0) {
            return Err(Error::InvalidConfig("max_threads must be > 0".into()));
        }
        if self.classifier.name.is_empty() {
            return Err(Error::InvalidConfig("classifier name must not be empty".into()));
        }
        self.defaults.validate()
    }
}
