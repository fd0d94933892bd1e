//! Building engine initial shapes from partitioned primitives.
//!
//! Construction runs in two phases. First every classifier group is flattened
//! into a [`GeometryDescriptor`] and its main attributes and seed are resolved.
//! Then each group's rule package is resolved, its rule attributes are read
//! from the host and the engine shape is created. Groups failing the second
//! phase are logged and dropped.
use std::borrow::Cow;

use glam::DVec3;
use tracing::{debug, warn};

use crate::attributes::from_host::FromHost;
use crate::attributes::{names, AttributeMapBuilder};
use crate::context::EngineContext;
use crate::engine::{GeometryDescriptor, InitialShapeSpec, UvSet};
use crate::mesh::{HostElement, Mesh, VertexAttribute};
use crate::shape::data::{InitialShapeBuilder, ShapeData};
use crate::shape::partition::{Classifier, PrimitivePartition};
use crate::shape::{reserved, GroupNaming, MainAttributes, ShapeDefaults};

/// Number of UV set slots exchanged with the engine.
pub const MAX_UV_SETS: usize = 10;

/// Host vertex attribute name of UV slot `slot`: `uv`, `uv1`, `uv2`, ...
pub fn uv_set_name(slot: usize) -> Cow<'static, str> {
    if slot == 0 {
        Cow::Borrowed("uv")
    } else {
        Cow::Owned(format!("uv{slot}"))
    }
}

/// Flattens `prims` into one descriptor.
///
/// Every face vertex gets its own coordinate entry (no sharing), face winding
/// is reversed to match the engine convention, and each present UV slot gets
/// one `(u, v)` pair per face vertex with indices equal to the geometry indices.
pub fn flatten_primitives(mesh: &Mesh, prims: &[usize]) -> GeometryDescriptor {
    let uv_attrs: Vec<Option<&VertexAttribute>> = (0..MAX_UV_SETS)
        .map(|slot| mesh.find_vertex_attribute(&uv_set_name(slot)))
        .collect();
    let uv_slots = uv_attrs.iter().rposition(Option::is_some).map_or(0, |p| p + 1);

    let mut geometry = GeometryDescriptor {
        uv_sets: vec![UvSet::default(); uv_slots],
        ..Default::default()
    };
    for &prim in prims {
        let Some(primitive) = mesh.primitive(prim) else {
            debug!("primitive {prim} does not exist, skipped");
            continue;
        };
        primitive.for_each_polygon(|vertices| {
            let base = geometry.vertex_count() as u32;
            geometry.face_counts.push(vertices.len() as u32);
            for &vertex in vertices {
                let p = mesh.vertex_position(vertex).unwrap_or_default();
                geometry
                    .coords
                    .extend([f64::from(p.x), f64::from(p.y), f64::from(p.z)]);
                for (slot, attr) in uv_attrs[..uv_slots].iter().enumerate() {
                    if let Some(attr) = attr {
                        let uv = attr.get(vertex as usize).unwrap_or(&[]);
                        let u = uv.first().copied().unwrap_or(0.0);
                        let v = uv.get(1).copied().unwrap_or(0.0);
                        geometry.uv_sets[slot]
                            .coords
                            .extend([f64::from(u), f64::from(v)]);
                    }
                }
            }
            let reversed = (0..vertices.len() as u32).rev().map(|i| base + i);
            geometry.indices.extend(reversed);
        });
    }
    for (slot, attr) in uv_attrs[..uv_slots].iter().enumerate() {
        if attr.is_some() {
            geometry.uv_sets[slot].indices = geometry.indices.clone();
        }
    }
    geometry
}

fn hash_combine(seed: u64, value: u64) -> u64 {
    seed ^ value
        .wrapping_add(0x9E37_79B9_7F4A_7C15)
        .wrapping_add(seed << 6)
        .wrapping_add(seed >> 2)
}

fn hash_f64(v: f64) -> u64 {
    if v == 0.0 {
        return 0;
    }
    let mut z = v.to_bits();
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Deterministic seed from the centroid of all face vertices.
///
/// The hash is stable across runs and platforms so that identical input
/// geometry always yields the same generated variation.
pub fn centroid_seed(geometry: &GeometryDescriptor) -> i32 {
    if geometry.indices.is_empty() {
        return 0;
    }
    let sum = geometry
        .indices
        .iter()
        .map(|&i| DVec3::from_slice(&geometry.coords[3 * i as usize..3 * i as usize + 3]))
        .fold(DVec3::ZERO, |acc, p| acc + p);
    let centroid = sum / geometry.indices.len() as f64;
    let hash = [centroid.x, centroid.y, centroid.z]
        .into_iter()
        .fold(0u64, |h, c| hash_combine(h, hash_f64(c)));
    hash as i32
}

fn explicit_seed(mesh: &Mesh, prim: usize) -> Option<i32> {
    match mesh.find_prim_attribute(reserved::RANDOM_SEED)?.element(prim)? {
        HostElement::Int32([seed, ..]) => Some(*seed),
        _ => None,
    }
}

/// Creates [`ShapeData`] from a host mesh.
pub struct ShapeBuilder<'a> {
    ctx: &'a EngineContext,
    classifier: Classifier,
    defaults: ShapeDefaults,
    naming: GroupNaming,
    name_prefix: String,
}

impl<'a> ShapeBuilder<'a> {
    pub fn new(ctx: &'a EngineContext) -> Self {
        Self {
            ctx,
            classifier: Classifier::default(),
            defaults: ShapeDefaults::default(),
            naming: GroupNaming::default(),
            name_prefix: String::new(),
        }
    }

    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_defaults(mut self, defaults: ShapeDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn with_naming(mut self, naming: GroupNaming, prefix: impl Into<String>) -> Self {
        self.naming = naming;
        self.name_prefix = prefix.into();
        self
    }

    /// Partitions `mesh`, flattens each group and creates one engine shape per group.
    pub fn build(&self, mesh: &Mesh) -> ShapeData {
        let partition = PrimitivePartition::new(mesh, &self.classifier);
        let mut data = ShapeData::new();

        for (value, prims) in partition.iter() {
            let geometry = flatten_primitives(mesh, prims);
            if geometry.is_empty() {
                debug!("classifier group {value:?} has no faces, skipped");
                continue;
            }
            let first = prims[0];
            let mut main = MainAttributes::resolve(mesh, first, &self.defaults);
            main.random_seed = explicit_seed(mesh, first).unwrap_or_else(|| centroid_seed(&geometry));
            let name = self.naming.name_for(value, &self.name_prefix);
            data.add_builder(
                InitialShapeBuilder {
                    geometry,
                    main,
                    classifier: value.clone(),
                },
                prims.to_vec(),
                name,
            );
        }

        let rule_attributes: Vec<&str> = mesh
            .prim_attributes()
            .map(|a| a.name())
            .filter(|n| !reserved::is_reserved(n) && !partition.classifier_names().contains(*n))
            .collect();

        for group in 0..data.builder_count() {
            self.create_shape(mesh, &mut data, group, &rule_attributes);
        }
        debug_assert!(data.is_valid());
        debug!(
            "built {} initial shapes from {} primitive groups",
            data.shape_count(),
            data.builder_count()
        );
        data
    }

    fn create_shape(&self, mesh: &Mesh, data: &mut ShapeData, group: usize, rule_attributes: &[&str]) {
        let builder = data.builder(group);
        let name = data.name(group).to_owned();
        let first = data.primitive_mapping(group)[0];

        let resolve_map = match self.ctx.resolve_package(&builder.main.package) {
            Ok(map) => map,
            Err(status) => {
                warn!(
                    "shape '{}': could not resolve rule package '{}': {}",
                    name,
                    builder.main.package.display(),
                    status
                );
                return;
            }
        };

        let mut attributes = AttributeMapBuilder::new();
        {
            let mut from_host = FromHost::new(&mut attributes);
            for &attr_name in rule_attributes {
                if let Some(attr) = mesh.find_prim_attribute(attr_name) {
                    let key = names::to_rule_key(&builder.main.style, attr_name);
                    from_host.convert(attr, first, &key);
                }
            }
        }
        let rule_attributes = attributes.build();
        let start_rule = builder.main.fully_qualified_start_rule();
        let spec = InitialShapeSpec {
            name: &name,
            geometry: &builder.geometry,
            attributes: &rule_attributes,
            rule_file: &builder.main.rule_file,
            start_rule: &start_rule,
            random_seed: builder.main.random_seed,
            resolve_map: &resolve_map,
        };

        match self.ctx.create_initial_shape(&spec, group) {
            Ok(shape) => data.add_shape(shape, attributes, rule_attributes),
            Err(status) => warn!("failed to create initial shape '{name}': {status}"),
        }
    }
}
