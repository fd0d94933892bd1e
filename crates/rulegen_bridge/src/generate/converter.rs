//! Engine output into the destination host mesh.
//!
//! One [`ResultConverter`] lives on each worker thread. Data is prepared
//! without the mesh lock; only the commit (primitive creation, vertex and
//! primitive attribute writes, group creation) runs under it.
use std::collections::BTreeMap;

use glam::Vec3;
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::attributes::cache::StringCaches;
use crate::attributes::to_host::{ArrayHandling, DefaultWritePolicy, ToHost};
use crate::attributes::{AttributeMap, AttributeMapBuilder, AttributeValue};
use crate::context::InterruptFlag;
use crate::engine::{
    Continuation, ErrorLevel, GenerateCallbacks, GeneratedShape, Status,
};
use crate::generate::config::GenerateConfig;
use crate::generate::events::GenerateEvent;
use crate::mesh::Mesh;
use crate::shape::uv_set_name;

/// Host vertex attribute receiving generated normals.
pub const NORMAL_ATTRIBUTE: &str = "N";

/// How generated data is written to the host.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConversionOptions {
    /// Create one primitive group per generated shape, named after it.
    pub create_groups: bool,
    pub material_arrays: ArrayHandling,
    pub shape_attribute_arrays: ArrayHandling,
    pub write_policy: DefaultWritePolicy,
}

impl From<&GenerateConfig> for ConversionOptions {
    fn from(config: &GenerateConfig) -> Self {
        Self {
            create_groups: config.group_naming.creates_groups(),
            material_arrays: config.material_arrays,
            shape_attribute_arrays: config.shape_attribute_arrays,
            write_policy: config.default_write_policy,
        }
    }
}

/// [`GenerateCallbacks`] implementation writing into a shared destination mesh.
pub struct ResultConverter<'a> {
    mesh: &'a Mutex<Mesh>,
    caches: &'a StringCaches,
    options: ConversionOptions,
    interrupt: &'a InterruptFlag,
    statuses: &'a mut [Status],
    committed: Vec<bool>,
    range_start: usize,
    shape_attributes: BTreeMap<i32, AttributeMapBuilder>,
    events: Vec<GenerateEvent>,
    added: usize,
}

impl<'a> ResultConverter<'a> {
    /// `statuses` holds the entries of the shapes handled by this converter; the
    /// first one belongs to global shape index `range_start`.
    pub fn new(
        mesh: &'a Mutex<Mesh>,
        caches: &'a StringCaches,
        options: ConversionOptions,
        interrupt: &'a InterruptFlag,
        statuses: &'a mut [Status],
        range_start: usize,
    ) -> Self {
        Self {
            mesh,
            caches,
            options,
            interrupt,
            committed: vec![false; statuses.len()],
            statuses,
            range_start,
            shape_attributes: BTreeMap::new(),
            events: Vec::new(),
            added: 0,
        }
    }

    /// Number of shapes committed so far.
    pub fn added(&self) -> usize {
        self.added
    }

    /// Marks every shape of this converter that was neither committed nor
    /// already failed with `status`.
    pub fn fail_remaining(&mut self, status: Status) {
        for (s, committed) in self.statuses.iter_mut().zip(&self.committed) {
            if s.is_ok() && !committed {
                *s = status;
            }
        }
    }

    pub fn into_events(self) -> Vec<GenerateEvent> {
        self.events
    }

    fn shape_maps(&self, shape: &GeneratedShape) -> Vec<Option<AttributeMap>> {
        shape
            .shape_ids
            .iter()
            .map(|id| self.shape_attributes.get(id).map(AttributeMapBuilder::build))
            .collect()
    }

    fn commit(&self, mesh: &mut Mesh, shape: &GeneratedShape, positions: &[Vec3], shape_maps: &[Option<AttributeMap>]) {
        let block = mesh.build_block(positions, &shape.face_counts, &shape.indices);
        write_normals(mesh, block.vertex_start, shape);
        write_uv_sets(mesh, block.vertex_start, shape);
        if self.options.create_groups {
            mesh.add_to_group(&shape.name, block.prims());
        }

        let mut to_host = ToHost::new(mesh, self.caches).with_policy(self.options.write_policy);
        for r in 0..shape.range_count() {
            let faces = shape.range(r);
            let prims = block.prim_start + faces.start..block.prim_start + faces.end;
            if let Some(materials) = &shape.materials {
                to_host.convert(&materials[r], prims.clone(), self.options.material_arrays);
            }
            if let Some(reports) = &shape.reports {
                to_host.convert(&reports[r], prims.clone(), self.options.material_arrays);
            }
            if let Some(map) = &shape_maps[r] {
                to_host.convert(map, prims, self.options.shape_attribute_arrays);
            }
        }
    }

    fn set_status(&mut self, shape_index: usize, status: Status) {
        match self.statuses.get_mut(shape_index) {
            Some(slot) => *slot = status,
            None => warn!(
                "status for shape {} outside of range starting at {}",
                shape_index, self.range_start
            ),
        }
    }
}

fn write_normals(mesh: &mut Mesh, vertex_start: usize, shape: &GeneratedShape) {
    if shape.normals.is_empty() {
        return;
    }
    let attr = mesh.ensure_vertex_attribute(NORMAL_ATTRIBUTE, 3);
    for (vi, &index) in shape.indices.iter().enumerate() {
        let i = index as usize * 3;
        let Some(n) = shape.normals.get(i..i + 3) else {
            debug!("shape '{}' has no normal for vertex {}", shape.name, index);
            continue;
        };
        attr.set(vertex_start + vi, &[n[0] as f32, n[1] as f32, n[2] as f32]);
    }
}

fn write_uv_sets(mesh: &mut Mesh, vertex_start: usize, shape: &GeneratedShape) {
    for (slot, uvs) in shape.uv_sets.iter().enumerate() {
        if uvs.is_empty() {
            continue;
        }
        let attr = mesh.ensure_vertex_attribute(&uv_set_name(slot), 3);
        let mut uvi = 0usize;
        let mut vertex = vertex_start;
        for (face, &count) in shape.face_counts.iter().enumerate() {
            if uvs.counts.get(face).copied().unwrap_or(0) > 0 {
                for corner in 0..count as usize {
                    let Some(&index) = uvs.indices.get(uvi) else {
                        break;
                    };
                    uvi += 1;
                    let i = index as usize * 2;
                    if let Some(uv) = uvs.coords.get(i..i + 2) {
                        attr.set(vertex + corner, &[uv[0] as f32, uv[1] as f32, 0.0]);
                    }
                }
            }
            vertex += count as usize;
        }
    }
}

impl GenerateCallbacks for ResultConverter<'_> {
    fn add(&mut self, shape_index: usize, shape: &GeneratedShape) -> Status {
        if let Err(reason) = shape.validate() {
            error!("rejecting generated shape '{}': {}", shape.name, reason);
            return Status::ArgumentsMismatch;
        }
        let positions: Vec<Vec3> = shape
            .coords
            .chunks_exact(3)
            .map(|c| Vec3::new(c[0] as f32, c[1] as f32, c[2] as f32))
            .collect();
        let shape_maps = self.shape_maps(shape);
        {
            let mut mesh = self.mesh.lock();
            self.commit(&mut mesh, shape, &positions, &shape_maps);
        }
        for id in &shape.shape_ids {
            self.shape_attributes.remove(id);
        }
        match self.committed.get_mut(shape_index) {
            Some(slot) => *slot = true,
            None => warn!(
                "committed shape {} outside of range starting at {}",
                shape_index, self.range_start
            ),
        }
        self.added += 1;
        Status::Ok
    }

    fn generate_error(&mut self, shape_index: usize, status: Status, message: &str) -> Status {
        let index = self.range_start + shape_index;
        error!("generation failed for shape {index}: {message} ({status})");
        self.set_status(shape_index, status);
        self.events.push(GenerateEvent::ShapeFailed {
            shape_index: index,
            status,
            message: message.to_owned(),
        });
        Status::Ok
    }

    fn asset_error(
        &mut self,
        shape_index: usize,
        level: ErrorLevel,
        key: &str,
        uri: &str,
        message: &str,
    ) -> Status {
        let index = self.range_start + shape_index;
        warn!("asset error on shape {index} ({level:?}): '{key}' at '{uri}': {message}");
        self.events.push(GenerateEvent::AssetError {
            shape_index: index,
            level,
            key: key.to_owned(),
            uri: uri.to_owned(),
            message: message.to_owned(),
        });
        Status::Ok
    }

    fn cga_error(&mut self, shape_index: usize, shape_id: i32, level: ErrorLevel, message: &str) -> Status {
        let index = self.range_start + shape_index;
        warn!("rule error on shape {index}/{shape_id} ({level:?}): {message}");
        self.events.push(GenerateEvent::CgaError {
            shape_index: index,
            shape_id,
            level,
            message: message.to_owned(),
        });
        Status::Ok
    }

    fn cga_print(&mut self, shape_index: usize, shape_id: i32, text: &str) -> Status {
        let index = self.range_start + shape_index;
        info!("shape {index}/{shape_id}: {text}");
        self.events.push(GenerateEvent::CgaPrint {
            shape_index: index,
            shape_id,
            text: text.to_owned(),
        });
        Status::Ok
    }

    fn attribute(&mut self, _shape_index: usize, shape_id: i32, key: &str, value: AttributeValue) -> Status {
        self.shape_attributes
            .entry(shape_id)
            .or_default()
            .set(key, value);
        Status::Ok
    }

    fn progress(&mut self, _percent: f32) -> Continuation {
        if self.interrupt.is_interrupted() {
            Continuation::CancelAndFinish
        } else {
            Continuation::Continue
        }
    }
}
