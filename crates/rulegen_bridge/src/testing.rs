//! In-crate fake engine and mesh fixtures for unit tests.
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::attributes::{AttributeMap, AttributeValue};
use crate::engine::{
    Continuation, EncoderSpec, ErrorLevel, GenerateCallbacks, GenerateOptions, GeneratedShape,
    GeneratedUvSet, GeometryDescriptor, InitialShape, InitialShapeSpec, OcclusionHandle,
    OcclusionSet, OcclusionStore, ResolveMap, RuleEngine, ShapeToken, Status, EMIT_ATTRIBUTES,
    EMIT_MATERIALS, EMIT_REPORTS, EVAL_ATTRIBUTES_ENCODER_ID, HOST_ENCODER_ID, PRINT_ENCODER_ID,
};
use crate::mesh::{BlockValue, Layout, Mesh, Storage};

/// Behaviour of the fake engine for one rule file.
#[derive(Clone, Debug, Default)]
pub(crate) struct FakeRule {
    pub uv_sets: usize,
    pub materials: bool,
    pub reports: bool,
    pub echo_attributes: bool,
    pub print: bool,
    pub first_shape_id: i32,
    /// Initial shape creation fails.
    pub reject: bool,
    /// Generation fails for every shape.
    pub fail_all: bool,
    /// Generation fails for shapes built from these groups.
    pub fail_groups: Vec<usize>,
    /// Status returned by `generate` after every shape was handled.
    pub final_status: Option<Status>,
    /// Default rule attribute values reported by the evaluation encoder.
    pub defaults: Vec<(String, AttributeValue)>,
}

/// What the engine received for one initial shape.
#[derive(Clone, Debug)]
pub(crate) struct ShapeRecord {
    pub name: String,
    pub rule_file: String,
    pub start_rule: String,
    pub seed: i32,
    pub attributes: AttributeMap,
    pub geometry: GeometryDescriptor,
}

impl ShapeRecord {
    fn generated(&self, rule: &FakeRule, materials: bool, reports: bool) -> GeneratedShape {
        let g = &self.geometry;
        let faces = g.face_count();
        let shape_ids: Vec<i32> = (0..faces as i32).map(|f| rule.first_shape_id + f).collect();
        let uv_coords: Vec<f64> = g.coords.chunks_exact(3).flat_map(|c| [c[0], c[2]]).collect();
        GeneratedShape {
            name: self.name.clone(),
            coords: g.coords.clone(),
            normals: [0.0, 1.0, 0.0].repeat(g.vertex_count()),
            face_counts: g.face_counts.clone(),
            indices: g.indices.clone(),
            uv_sets: (0..rule.uv_sets)
                .map(|_| GeneratedUvSet {
                    coords: uv_coords.clone(),
                    counts: g.face_counts.clone(),
                    indices: g.indices.clone(),
                })
                .collect(),
            face_ranges: (0..=faces as u32).collect(),
            materials: (rule.materials && materials).then(|| {
                shape_ids
                    .iter()
                    .map(|id| {
                        [(
                            "material.name",
                            AttributeValue::String(format!("mat_{id}")),
                        )]
                        .into_iter()
                        .collect()
                    })
                    .collect()
            }),
            reports: (rule.reports && reports).then(|| {
                (0..faces)
                    .map(|f| {
                        [("faceIndex", AttributeValue::Float(f as f64))]
                            .into_iter()
                            .collect()
                    })
                    .collect()
            }),
            shape_ids,
        }
    }
}

struct FakeOcclusion {
    disposed: Arc<AtomicUsize>,
}

impl OcclusionStore for FakeOcclusion {
    fn dispose(&self, handles: &[OcclusionHandle]) {
        self.disposed.fetch_add(handles.len(), Ordering::SeqCst);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Echoing engine: output geometry equals input geometry, one shape id per face.
#[derive(Default)]
pub(crate) struct FakeEngine {
    rules: HashMap<String, FakeRule>,
    missing_packages: HashSet<PathBuf>,
    records: Mutex<HashMap<ShapeToken, ShapeRecord>>,
    next_token: AtomicU64,
    released: AtomicUsize,
    resolves: AtomicUsize,
    disposed: Arc<AtomicUsize>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rule(mut self, rule_file: &str, configure: impl FnOnce(&mut FakeRule)) -> Self {
        configure(self.rules.entry(rule_file.to_owned()).or_default());
        self
    }

    pub fn with_missing_package(mut self, package: &str) -> Self {
        self.missing_packages.insert(PathBuf::from(package));
        self
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn resolves(&self) -> usize {
        self.resolves.load(Ordering::SeqCst)
    }

    pub fn disposed_handles(&self) -> usize {
        self.disposed.load(Ordering::SeqCst)
    }

    pub fn live_shapes(&self) -> usize {
        self.records.lock().len()
    }

    pub fn shape_record(&self, token: ShapeToken) -> Option<ShapeRecord> {
        self.records.lock().get(&token).cloned()
    }

    fn rule(&self, rule_file: &str) -> FakeRule {
        self.rules.get(rule_file).cloned().unwrap_or_default()
    }
}

impl RuleEngine for FakeEngine {
    fn resolve_package(&self, package: &Path) -> Result<Arc<ResolveMap>, Status> {
        self.resolves.fetch_add(1, Ordering::SeqCst);
        if self.missing_packages.contains(package) {
            return Err(Status::ResolveMapError);
        }
        Ok(Arc::new(ResolveMap::new(package)))
    }

    fn create_initial_shape(&self, spec: &InitialShapeSpec<'_>) -> Result<ShapeToken, Status> {
        if spec.geometry.is_empty() {
            return Err(Status::InvalidArgument);
        }
        if self.rule(spec.rule_file).reject {
            return Err(Status::InitialShapeError);
        }
        let token = ShapeToken(self.next_token.fetch_add(1, Ordering::SeqCst) + 1);
        self.records.lock().insert(
            token,
            ShapeRecord {
                name: spec.name.to_owned(),
                rule_file: spec.rule_file.to_owned(),
                start_rule: spec.start_rule.to_owned(),
                seed: spec.random_seed,
                attributes: spec.attributes.clone(),
                geometry: spec.geometry.clone(),
            },
        );
        Ok(token)
    }

    fn release_initial_shape(&self, token: ShapeToken) {
        self.records.lock().remove(&token);
        self.released.fetch_add(1, Ordering::SeqCst);
    }

    fn create_occlusion_set(&self) -> Result<Box<dyn OcclusionStore>, Status> {
        Ok(Box::new(FakeOcclusion {
            disposed: self.disposed.clone(),
        }))
    }

    fn generate_occluders(
        &self,
        shapes: &[InitialShape],
        handles: &mut [OcclusionHandle],
        _callbacks: &mut dyn GenerateCallbacks,
        occlusion: &OcclusionSet,
        _options: &GenerateOptions,
    ) -> Status {
        if occlusion.downcast_ref::<FakeOcclusion>().is_none() {
            return Status::InvalidArgument;
        }
        for (handle, shape) in handles.iter_mut().zip(shapes) {
            *handle = OcclusionHandle(shape.token().0);
        }
        Status::Ok
    }

    fn generate(
        &self,
        shapes: &[InitialShape],
        _occlusion_handles: Option<&[OcclusionHandle]>,
        encoders: &[EncoderSpec],
        callbacks: &mut dyn GenerateCallbacks,
        _occlusion: Option<&OcclusionSet>,
        _options: &GenerateOptions,
    ) -> Status {
        if encoders.iter().any(|e| e.id == EVAL_ATTRIBUTES_ENCODER_ID) {
            for (i, shape) in shapes.iter().enumerate() {
                let Some(record) = self.shape_record(shape.token()) else {
                    continue;
                };
                for (key, value) in &self.rule(&record.rule_file).defaults {
                    callbacks.attribute(i, 0, key, value.clone());
                }
            }
            return Status::Ok;
        }

        let host = encoders.iter().find(|e| e.id == HOST_ENCODER_ID);
        let emit = |key| host.is_some_and(|e| e.option_bool(key));
        let (attributes, materials, reports) =
            (emit(EMIT_ATTRIBUTES), emit(EMIT_MATERIALS), emit(EMIT_REPORTS));
        let prints = encoders.iter().any(|e| e.id == PRINT_ENCODER_ID);

        for (i, shape) in shapes.iter().enumerate() {
            if callbacks.progress(i as f32 / shapes.len() as f32) == Continuation::CancelAndFinish {
                return Status::Cancelled;
            }
            let Some(record) = self.shape_record(shape.token()) else {
                callbacks.generate_error(i, Status::InvalidArgument, "unknown initial shape");
                continue;
            };
            let rule = self.rule(&record.rule_file);
            if rule.fail_all || rule.fail_groups.contains(&shape.group()) {
                callbacks.generate_error(i, Status::GenerateFailed, "rule evaluation failed");
                callbacks.cga_error(i, rule.first_shape_id, ErrorLevel::Error, "rule evaluation failed");
                continue;
            }
            let out = record.generated(&rule, materials, reports);
            if attributes && rule.echo_attributes {
                for &id in &out.shape_ids {
                    for (key, value) in record.attributes.iter() {
                        callbacks.attribute(i, id, key, value.clone());
                    }
                }
            }
            if prints && rule.print {
                callbacks.cga_print(i, rule.first_shape_id, &format!("generated {}", record.name));
            }
            let status = callbacks.add(i, &out);
            if !status.is_ok() {
                return status;
            }
        }
        shapes
            .iter()
            .filter_map(|s| self.shape_record(s.token()))
            .find_map(|r| self.rule(&r.rule_file).final_status)
            .unwrap_or(Status::Ok)
    }
}

/// Records every added shape.
#[derive(Default)]
pub(crate) struct RecordingCallbacks {
    pub added: Vec<GeneratedShape>,
    pub failures: Vec<(usize, Status)>,
    pub attributes: Vec<(i32, String, AttributeValue)>,
}

impl GenerateCallbacks for RecordingCallbacks {
    fn add(&mut self, _shape_index: usize, shape: &GeneratedShape) -> Status {
        self.added.push(shape.clone());
        Status::Ok
    }

    fn generate_error(&mut self, shape_index: usize, status: Status, _message: &str) -> Status {
        self.failures.push((shape_index, status));
        Status::Ok
    }

    fn asset_error(&mut self, _: usize, _: ErrorLevel, _: &str, _: &str, _: &str) -> Status {
        Status::Ok
    }

    fn cga_error(&mut self, _: usize, _: i32, _: ErrorLevel, _: &str) -> Status {
        Status::Ok
    }

    fn cga_print(&mut self, _: usize, _: i32, _: &str) -> Status {
        Status::Ok
    }

    fn attribute(&mut self, _: usize, shape_id: i32, key: &str, value: AttributeValue) -> Status {
        self.attributes.push((shape_id, key.to_owned(), value));
        Status::Ok
    }
}

/// `nx * nz` unit quads in the XZ plane, row-major, sharing corner points.
pub(crate) fn quad_grid(nx: usize, nz: usize) -> Mesh {
    let mut mesh = Mesh::new();
    let mut ids = Vec::with_capacity((nx + 1) * (nz + 1));
    for z in 0..=nz {
        for x in 0..=nx {
            ids.push(mesh.add_point([x as f32, 0.0, z as f32]));
        }
    }
    let at = |x: usize, z: usize| ids[z * (nx + 1) + x];
    for z in 0..nz {
        for x in 0..nx {
            mesh.add_polygon(&[at(x, z), at(x + 1, z), at(x + 1, z + 1), at(x, z + 1)]);
        }
    }
    mesh
}

/// A row of `groups * per_group` quads with an int `lot` attribute of `prim / per_group`.
pub(crate) fn classified_quad_grid(groups: usize, per_group: usize) -> Mesh {
    let mut mesh = quad_grid(groups * per_group, 1);
    let lot = mesh
        .ensure_prim_attribute("lot", Storage::Int32, Layout::Tuple(1))
        .expect("lot attribute");
    for g in 0..groups {
        lot.set_block(g * per_group..(g + 1) * per_group, 0, BlockValue::Int32(g as i32));
    }
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EngineContext;
    use crate::shape::{reserved, Classifier, ClassifierType, ShapeBuilder, ShapeDefaults};

    #[test]
    fn two_rule_files_produce_one_add_each_with_their_uv_sets() {
        let fake = Arc::new(
            FakeEngine::new()
                .with_rule("rules/one.cgb", |r| r.uv_sets = 1)
                .with_rule("rules/three.cgb", |r| r.uv_sets = 3),
        );
        let ctx = EngineContext::new(fake.clone());
        let mut mesh = classified_quad_grid(2, 2);
        mesh.ensure_prim_attribute(reserved::RULE_FILE, Storage::String, Layout::Tuple(1))
            .expect("rule file")
            .set(2, 0, BlockValue::String(Arc::from("rules/three.cgb")));
        let data = ShapeBuilder::new(&ctx)
            .with_classifier(Classifier::new("lot", ClassifierType::Integer))
            .with_defaults(ShapeDefaults::new("city.rpk", "rules/one.cgb"))
            .build(&mesh);
        assert_eq!(data.shape_count(), 2);

        let mut callbacks = RecordingCallbacks::default();
        let status = fake.generate(
            data.shapes(),
            None,
            &[EncoderSpec::host(false, false, false)],
            &mut callbacks,
            None,
            &GenerateOptions { worker_threads: 1 },
        );
        assert!(status.is_ok());
        assert_eq!(callbacks.added.len(), 2);
        assert_eq!(callbacks.added[0].uv_sets.len(), 1);
        assert_eq!(callbacks.added[1].uv_sets.len(), 3);
        for shape in &callbacks.added {
            assert_eq!(shape.face_ranges.len(), shape.face_counts.len() + 1);
            assert!(shape.validate().is_ok());
        }
    }

    #[test]
    fn flattened_counts_match_input_corners() {
        let fake = Arc::new(FakeEngine::new());
        let ctx = EngineContext::new(fake.clone());
        let data = ShapeBuilder::new(&ctx).build(&quad_grid(3, 2));
        let record = fake.shape_record(data.shapes()[0].token()).expect("record");
        let corners: u32 = record.geometry.face_counts.iter().sum();
        assert_eq!(record.geometry.face_count(), 6);
        assert_eq!(record.geometry.coords.len(), 3 * corners as usize);
        assert_eq!(record.geometry.indices.len(), corners as usize);
    }
}
