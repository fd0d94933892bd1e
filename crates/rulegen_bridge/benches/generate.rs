mod common;

use std::any::Any;
use std::collections::HashMap;
use std::hint::black_box;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use parking_lot::Mutex;
use rulegen_bridge::prelude::*;

const LOT_COUNTS: [u32; 3] = [4, 32, 256];
const GRID_SIDE: usize = 64;

struct NoOcclusion;

impl OcclusionStore for NoOcclusion {
    fn dispose(&self, _handles: &[OcclusionHandle]) {}

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Returns each initial shape unchanged, one face range per input face.
#[derive(Default)]
struct EchoEngine {
    shapes: Mutex<HashMap<ShapeToken, GeometryDescriptor>>,
    next: AtomicU64,
}

impl RuleEngine for EchoEngine {
    fn resolve_package(&self, package: &Path) -> std::result::Result<Arc<ResolveMap>, Status> {
        Ok(Arc::new(ResolveMap::new(package)))
    }

    fn create_initial_shape(&self, spec: &InitialShapeSpec<'_>) -> std::result::Result<ShapeToken, Status> {
        let token = ShapeToken(self.next.fetch_add(1, Ordering::Relaxed));
        self.shapes.lock().insert(token, spec.geometry.clone());
        Ok(token)
    }

    fn release_initial_shape(&self, token: ShapeToken) {
        self.shapes.lock().remove(&token);
    }

    fn create_occlusion_set(&self) -> std::result::Result<Box<dyn OcclusionStore>, Status> {
        Ok(Box::new(NoOcclusion))
    }

    fn generate_occluders(
        &self,
        _shapes: &[InitialShape],
        _handles: &mut [OcclusionHandle],
        _callbacks: &mut dyn GenerateCallbacks,
        _occlusion: &OcclusionSet,
        _options: &GenerateOptions,
    ) -> Status {
        Status::Ok
    }

    fn generate(
        &self,
        shapes: &[InitialShape],
        _occlusion_handles: Option<&[OcclusionHandle]>,
        _encoders: &[EncoderSpec],
        callbacks: &mut dyn GenerateCallbacks,
        _occlusion: Option<&OcclusionSet>,
        _options: &GenerateOptions,
    ) -> Status {
        for (i, shape) in shapes.iter().enumerate() {
            let Some(geometry) = self.shapes.lock().get(&shape.token()).cloned() else {
                callbacks.generate_error(i, Status::InvalidArgument, "unknown shape");
                continue;
            };
            let faces = geometry.face_count() as u32;
            let out = GeneratedShape {
                name: shape.name().to_owned(),
                normals: [0.0, 1.0, 0.0].repeat(geometry.vertex_count()),
                coords: geometry.coords,
                face_counts: geometry.face_counts,
                indices: geometry.indices,
                face_ranges: (0..=faces).collect(),
                shape_ids: (0..faces as i32).collect(),
                ..GeneratedShape::default()
            };
            let status = callbacks.add(i, &out);
            if !status.is_ok() {
                return status;
            }
        }
        Status::Ok
    }
}

fn bench_generate_mesh(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate_mesh");
    let ctx = EngineContext::new(Arc::new(EchoEngine::default()));
    let config = GenerateConfig::new(ShapeDefaults::new("city.rpk", "rules/lot.cgb"))
        .with_classifier(Classifier::new("lot", ClassifierType::Integer))
        .with_group_naming(GroupNaming::ByClassifier, "lot");
    let interrupt = InterruptFlag::new();

    for &lots in &LOT_COUNTS {
        let mesh = common::lot_grid(GRID_SIDE, lots, 5);
        group.throughput(common::elements_throughput(mesh.primitive_count()));
        group.bench_with_input(BenchmarkId::from_parameter(lots), &mesh, |b, mesh| {
            b.iter_batched(
                || mesh.clone(),
                |mut mesh| {
                    let report = generate_mesh(&ctx, &mut mesh, &config, &interrupt, &mut ())
                        .expect("generate");
                    black_box(report.primitives)
                },
                BatchSize::LargeInput,
            )
        });
    }

    group.finish();
}

criterion_group! {
    name = benches;
    config = common::default_criterion();
    targets = bench_generate_mesh
}
criterion_main!(benches);
