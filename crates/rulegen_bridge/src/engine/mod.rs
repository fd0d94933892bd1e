//! Boundary to the procedural rule engine.
//!
//! The engine is an external collaborator reached through [`RuleEngine`].
//! Engine-owned objects are wrapped in owned handles that release them on drop:
//! [`InitialShape`] for initial shapes and [`OcclusionSet`] for occlusion data.
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::attributes::{AttributeMap, AttributeMapBuilder};

mod callbacks;
mod geometry;
mod status;

pub use callbacks::{Continuation, ErrorLevel, GenerateCallbacks};
pub use geometry::{GeneratedShape, GeneratedUvSet, GeometryDescriptor, UvSet};
pub use status::Status;

/// Identifier of the host mesh encoder.
pub const HOST_ENCODER_ID: &str = "com.rulegen.bridge.HostMeshEncoder";
/// Identifier of the encoder forwarding rule errors to [`GenerateCallbacks::cga_error`].
pub const ERROR_ENCODER_ID: &str = "com.rulegen.core.ErrorEncoder";
/// Identifier of the encoder forwarding rule prints to [`GenerateCallbacks::cga_print`].
pub const PRINT_ENCODER_ID: &str = "com.rulegen.core.PrintEncoder";
/// Identifier of the encoder that only reports each shape's default rule
/// attribute values through [`GenerateCallbacks::attribute`], without geometry.
pub const EVAL_ATTRIBUTES_ENCODER_ID: &str = "com.rulegen.core.AttributeEvalEncoder";

/// Host encoder option: report generic shape attributes.
pub const EMIT_ATTRIBUTES: &str = "emitAttributes";
/// Host encoder option: report per-range material maps.
pub const EMIT_MATERIALS: &str = "emitMaterials";
/// Host encoder option: report per-range report maps.
pub const EMIT_REPORTS: &str = "emitReports";

/// Asset lookup table of a rule package.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolveMap {
    package: PathBuf,
    entries: BTreeMap<String, String>,
}

impl ResolveMap {
    pub fn new(package: impl Into<PathBuf>) -> Self {
        Self {
            package: package.into(),
            entries: BTreeMap::new(),
        }
    }

    pub fn with_entry(mut self, key: impl Into<String>, uri: impl Into<String>) -> Self {
        self.entries.insert(key.into(), uri.into());
        self
    }

    pub fn package(&self) -> &Path {
        &self.package
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Everything the engine needs to construct one initial shape.
#[derive(Clone, Copy, Debug)]
pub struct InitialShapeSpec<'a> {
    pub name: &'a str,
    pub geometry: &'a GeometryDescriptor,
    pub attributes: &'a AttributeMap,
    pub rule_file: &'a str,
    /// Style-qualified start rule.
    pub start_rule: &'a str,
    pub random_seed: i32,
    pub resolve_map: &'a ResolveMap,
}

/// Engine-side identifier of an initial shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeToken(pub u64);

/// Engine-side identifier of a shape registered for occlusion queries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct OcclusionHandle(pub u64);

/// An engine encoder and its options.
#[derive(Clone, Debug, PartialEq)]
pub struct EncoderSpec {
    pub id: String,
    pub options: AttributeMap,
}

impl EncoderSpec {
    pub fn new(id: impl Into<String>, options: AttributeMap) -> Self {
        Self {
            id: id.into(),
            options,
        }
    }

    /// Host encoder with the three emit switches.
    pub fn host(emit_attributes: bool, emit_materials: bool, emit_reports: bool) -> Self {
        let mut options = AttributeMapBuilder::new();
        options.set_bool(EMIT_ATTRIBUTES, emit_attributes);
        options.set_bool(EMIT_MATERIALS, emit_materials);
        options.set_bool(EMIT_REPORTS, emit_reports);
        Self::new(HOST_ENCODER_ID, options.build_and_reset())
    }

    pub fn option_bool(&self, key: &str) -> bool {
        self.options
            .get(key)
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }
}

/// Options applying to a whole generate call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GenerateOptions {
    /// Hint for the engine's internal worker pool.
    pub worker_threads: usize,
}

/// Engine-side occlusion storage. Released when dropped.
pub trait OcclusionStore: Send + Sync {
    /// Releases the occlusion entries behind `handles`.
    fn dispose(&self, handles: &[OcclusionHandle]);

    fn as_any(&self) -> &dyn Any;
}

/// Owned occlusion set shared by all workers of a batch.
pub struct OcclusionSet {
    store: Box<dyn OcclusionStore>,
}

impl OcclusionSet {
    pub fn new(store: Box<dyn OcclusionStore>) -> Self {
        Self { store }
    }

    pub fn dispose(&self, handles: &[OcclusionHandle]) {
        self.store.dispose(handles);
    }

    /// Engine implementations use this to recover their concrete store.
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.store.as_any().downcast_ref::<T>()
    }
}

impl fmt::Debug for OcclusionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OcclusionSet").finish_non_exhaustive()
    }
}

/// Procedural rule engine.
pub trait RuleEngine: Send + Sync {
    fn resolve_package(&self, package: &Path) -> Result<Arc<ResolveMap>, Status>;

    fn create_initial_shape(&self, spec: &InitialShapeSpec<'_>) -> Result<ShapeToken, Status>;

    /// Called exactly once per token obtained from [`RuleEngine::create_initial_shape`].
    fn release_initial_shape(&self, token: ShapeToken);

    fn create_occlusion_set(&self) -> Result<Box<dyn OcclusionStore>, Status>;

    /// Registers occluder geometry for `shapes`, writing one handle per shape into `handles`.
    fn generate_occluders(
        &self,
        shapes: &[InitialShape],
        handles: &mut [OcclusionHandle],
        callbacks: &mut dyn GenerateCallbacks,
        occlusion: &OcclusionSet,
        options: &GenerateOptions,
    ) -> Status;

    fn generate(
        &self,
        shapes: &[InitialShape],
        occlusion_handles: Option<&[OcclusionHandle]>,
        encoders: &[EncoderSpec],
        callbacks: &mut dyn GenerateCallbacks,
        occlusion: Option<&OcclusionSet>,
        options: &GenerateOptions,
    ) -> Status;
}

/// Owned initial shape handle, released on drop.
pub struct InitialShape {
    engine: Arc<dyn RuleEngine>,
    token: ShapeToken,
    group: usize,
    name: String,
}

impl InitialShape {
    /// Wraps a token freshly returned by `engine`.
    pub fn new(engine: Arc<dyn RuleEngine>, token: ShapeToken, group: usize, name: impl Into<String>) -> Self {
        Self {
            engine,
            token,
            group,
            name: name.into(),
        }
    }

    pub fn token(&self) -> ShapeToken {
        self.token
    }

    /// Index of the builder (primitive group) this shape was created from.
    pub fn group(&self) -> usize {
        self.group
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for InitialShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InitialShape")
            .field("token", &self.token)
            .field("group", &self.group)
            .field("name", &self.name)
            .finish()
    }
}

impl Drop for InitialShape {
    fn drop(&mut self) {
        self.engine.release_initial_shape(self.token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeEngine;

    #[test]
    fn host_encoder_carries_emit_switches() {
        let spec = EncoderSpec::host(true, false, true);
        assert_eq!(spec.id, HOST_ENCODER_ID);
        assert!(spec.option_bool(EMIT_ATTRIBUTES));
        assert!(!spec.option_bool(EMIT_MATERIALS));
        assert!(spec.option_bool(EMIT_REPORTS));
    }

    #[test]
    fn dropping_initial_shape_releases_token() {
        let fake = Arc::new(FakeEngine::new());
        let engine: Arc<dyn RuleEngine> = fake.clone();
        let shape = InitialShape::new(engine, ShapeToken(9), 0, "lot");
        assert_eq!(fake.released(), 0);
        drop(shape);
        assert_eq!(fake.released(), 1);
    }

    #[test]
    fn resolve_map_lookup() {
        let map = ResolveMap::new("city.rpk").with_entry("rules/lot.cgb", "file:/tmp/lot.cgb");
        assert_eq!(map.get("rules/lot.cgb"), Some("file:/tmp/lot.cgb"));
        assert_eq!(map.package(), Path::new("city.rpk"));
    }
}
