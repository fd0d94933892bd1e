use std::any::Any;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use glam::Vec3;
use parking_lot::Mutex;
use rulegen_bridge::attributes::names::separate;
use rulegen_bridge::engine::{
    EMIT_ATTRIBUTES, EMIT_MATERIALS, EMIT_REPORTS, EVAL_ATTRIBUTES_ENCODER_ID, HOST_ENCODER_ID,
    PRINT_ENCODER_ID,
};
use rulegen_bridge::prelude::*;
use tracing::debug;

/// Rule attribute name (without style) read as the extrusion height.
pub const HEIGHT_KEY: &str = "height";
const ZONE_KEY: &str = "zone";
const FLOOR_HEIGHT: f64 = 3.5;

#[derive(Clone, Debug)]
struct Lot {
    name: String,
    geometry: GeometryDescriptor,
    height: f64,
    zone: String,
}

impl Lot {
    fn from_spec(spec: &InitialShapeSpec<'_>) -> Self {
        let mut height = 10.0;
        let mut zone = String::from("residential");
        for (key, value) in spec.attributes.iter() {
            match separate(key).1 {
                HEIGHT_KEY => height = value.as_float().unwrap_or(height),
                ZONE_KEY => {
                    if let Some(z) = value.as_str() {
                        zone = z.to_owned();
                    }
                }
                _ => {}
            }
        }
        Self {
            name: spec.name.to_owned(),
            geometry: spec.geometry.clone(),
            height,
            zone,
        }
    }

    fn floors(&self) -> i32 {
        (self.height / FLOOR_HEIGHT).floor().max(1.0) as i32
    }
}

#[derive(Default)]
struct Output {
    coords: Vec<f64>,
    normals: Vec<f64>,
    face_counts: Vec<u32>,
    indices: Vec<u32>,
    uvs: Vec<f64>,
}

impl Output {
    fn push_face(&mut self, corners: &[Vec3]) {
        let normal = match corners {
            [a, b, c, ..] => (*b - *a).cross(*c - *a).normalize_or_zero(),
            _ => Vec3::ZERO,
        };
        for p in corners {
            self.indices.push((self.coords.len() / 3) as u32);
            self.coords.extend([p.x, p.y, p.z].map(f64::from));
            self.normals.extend([normal.x, normal.y, normal.z].map(f64::from));
            self.uvs.extend([f64::from(p.x + p.z), f64::from(p.y)]);
        }
        self.face_counts.push(corners.len() as u32);
    }
}

struct CountingOcclusion {
    disposed: Arc<AtomicUsize>,
}

impl OcclusionStore for CountingOcclusion {
    fn dispose(&self, handles: &[OcclusionHandle]) {
        self.disposed.fetch_add(handles.len(), Ordering::Relaxed);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Toy rule engine: extrudes every input face by the `height` attribute.
///
/// Each input face becomes one face range (roof plus walls) with a material
/// derived from the `zone` attribute and a report holding the footprint area.
#[derive(Default)]
pub struct ExtrusionEngine {
    lots: Mutex<HashMap<ShapeToken, Lot>>,
    next: AtomicU64,
    disposed: Arc<AtomicUsize>,
}

impl ExtrusionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initial shapes not yet released.
    pub fn live_shapes(&self) -> usize {
        self.lots.lock().len()
    }

    pub fn disposed_occluders(&self) -> usize {
        self.disposed.load(Ordering::Relaxed)
    }

    fn extrude(&self, lot: &Lot, materials: bool, reports: bool) -> GeneratedShape {
        let g = &lot.geometry;
        let up = Vec3::Y * lot.height as f32;
        let mut out = Output::default();
        let mut face_ranges = vec![0];
        let mut areas = Vec::with_capacity(g.face_count());

        let mut start = 0;
        for &count in &g.face_counts {
            let corners: Vec<Vec3> = g.indices[start..start + count as usize]
                .iter()
                .map(|&i| {
                    let c = &g.coords[i as usize * 3..i as usize * 3 + 3];
                    Vec3::new(c[0] as f32, c[1] as f32, c[2] as f32)
                })
                .collect();
            start += count as usize;

            let roof: Vec<Vec3> = corners.iter().map(|&p| p + up).collect();
            out.push_face(&roof);
            for (i, &a) in corners.iter().enumerate() {
                let b = corners[(i + 1) % corners.len()];
                out.push_face(&[b, a, a + up, b + up]);
            }
            face_ranges.push(out.face_counts.len() as u32);
            areas.push(polygon_area(&corners));
        }

        let ranges = areas.len();
        let color = if lot.zone == "commercial" {
            [0.35, 0.45, 0.6]
        } else {
            [0.75, 0.55, 0.4]
        };
        GeneratedShape {
            name: lot.name.clone(),
            uv_sets: vec![GeneratedUvSet {
                coords: out.uvs,
                counts: out.face_counts.clone(),
                indices: out.indices.clone(),
            }],
            coords: out.coords,
            normals: out.normals,
            face_counts: out.face_counts,
            indices: out.indices,
            face_ranges,
            materials: materials.then(|| {
                (0..ranges)
                    .map(|_| {
                        [
                            ("material.name", AttributeValue::String(format!("{}_facade", lot.zone))),
                            ("material.color.r", AttributeValue::Float(color[0])),
                            ("material.color.g", AttributeValue::Float(color[1])),
                            ("material.color.b", AttributeValue::Float(color[2])),
                        ]
                        .into_iter()
                        .collect()
                    })
                    .collect()
            }),
            reports: reports.then(|| {
                areas
                    .iter()
                    .map(|&area| {
                        [
                            ("footprintArea", AttributeValue::Float(area)),
                            ("floors", AttributeValue::Float(f64::from(lot.floors()))),
                        ]
                        .into_iter()
                        .collect()
                    })
                    .collect()
            }),
            shape_ids: (0..ranges as i32).collect(),
        }
    }
}

fn polygon_area(corners: &[Vec3]) -> f64 {
    let twice: f32 = corners
        .iter()
        .zip(corners.iter().cycle().skip(1))
        .map(|(a, b)| a.x * b.z - b.x * a.z)
        .sum();
    f64::from(twice.abs() * 0.5)
}

impl RuleEngine for ExtrusionEngine {
    fn resolve_package(&self, package: &Path) -> std::result::Result<Arc<ResolveMap>, Status> {
        if package.extension().is_some_and(|e| e == "rpk") {
            Ok(Arc::new(ResolveMap::new(package).with_entry("rules/lot.cgb", "memory://extrude")))
        } else {
            Err(Status::FileNotFound)
        }
    }

    fn create_initial_shape(&self, spec: &InitialShapeSpec<'_>) -> std::result::Result<ShapeToken, Status> {
        if spec.resolve_map.get(spec.rule_file).is_none() {
            return Err(Status::InvalidArgument);
        }
        if spec.geometry.is_empty() {
            return Err(Status::InitialShapeError);
        }
        let token = ShapeToken(self.next.fetch_add(1, Ordering::Relaxed));
        self.lots.lock().insert(token, Lot::from_spec(spec));
        Ok(token)
    }

    fn release_initial_shape(&self, token: ShapeToken) {
        self.lots.lock().remove(&token);
    }

    fn create_occlusion_set(&self) -> std::result::Result<Box<dyn OcclusionStore>, Status> {
        Ok(Box::new(CountingOcclusion {
            disposed: self.disposed.clone(),
        }))
    }

    fn generate_occluders(
        &self,
        shapes: &[InitialShape],
        handles: &mut [OcclusionHandle],
        _callbacks: &mut dyn GenerateCallbacks,
        _occlusion: &OcclusionSet,
        _options: &GenerateOptions,
    ) -> Status {
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
                let lot = self.lots.lock().get(&shape.token()).cloned();
                if let Some(lot) = lot {
                    callbacks.attribute(i, 0, "Default$floors", AttributeValue::Int(lot.floors()));
                    callbacks.attribute(i, 0, "Default$zone", AttributeValue::String(lot.zone));
                }
            }
            return Status::Ok;
        }

        let host = encoders.iter().find(|e| e.id == HOST_ENCODER_ID);
        let emit = |key| host.is_some_and(|e| e.option_bool(key));
        let prints = encoders.iter().any(|e| e.id == PRINT_ENCODER_ID);

        for (i, shape) in shapes.iter().enumerate() {
            if callbacks.progress(i as f32 / shapes.len() as f32) == Continuation::CancelAndFinish {
                return Status::Cancelled;
            }
            let Some(lot) = self.lots.lock().get(&shape.token()).cloned() else {
                callbacks.generate_error(i, Status::InvalidArgument, "unknown initial shape");
                continue;
            };
            if lot.height <= 0.0 {
                callbacks.cga_error(i, 0, ErrorLevel::Error, "height must be positive");
                callbacks.generate_error(i, Status::GenerateFailed, "extrusion failed");
                continue;
            }

            let out = self.extrude(&lot, emit(EMIT_MATERIALS), emit(EMIT_REPORTS));
            if emit(EMIT_ATTRIBUTES) {
                for &id in &out.shape_ids {
                    callbacks.attribute(i, id, "Default$height", AttributeValue::Float(lot.height));
                    callbacks.attribute(i, id, "Default$floors", AttributeValue::Int(lot.floors()));
                }
            }
            if prints {
                callbacks.cga_print(i, 0, &format!("{}: {} floors", lot.name, lot.floors()));
            }
            debug!("extruded {} into {} faces", lot.name, out.face_counts.len());
            let status = callbacks.add(i, &out);
            if !status.is_ok() {
                return status;
            }
        }
        Status::Ok
    }
}
