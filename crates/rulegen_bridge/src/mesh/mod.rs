//! Host polygon mesh model.
//!
//! A [`Mesh`] owns points, vertices (each referencing a point), primitives
//! (single polygons or polygon soups), named primitive attributes, per-vertex
//! float tuple attributes and named primitive groups.
use std::collections::BTreeMap;
use std::ops::Range;

use glam::Vec3;

pub mod attribute;

pub use attribute::{
    Attribute, AttributeData, BlockValue, HostElement, Layout, Storage, StorageClass,
};

/// A host primitive. Vertex offsets index into the mesh vertex list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Primitive {
    Polygon(Vec<u32>),
    PolySoup(Vec<Vec<u32>>),
}

impl Primitive {
    /// Calls `f` with the vertex offsets of every polygon of this primitive.
    pub fn for_each_polygon(&self, mut f: impl FnMut(&[u32])) {
        match self {
            Primitive::Polygon(vertices) => f(vertices),
            Primitive::PolySoup(polygons) => polygons.iter().for_each(|p| f(p)),
        }
    }

    pub fn polygon_count(&self) -> usize {
        match self {
            Primitive::Polygon(_) => 1,
            Primitive::PolySoup(polygons) => polygons.len(),
        }
    }

    pub fn vertex_count(&self) -> usize {
        match self {
            Primitive::Polygon(vertices) => vertices.len(),
            Primitive::PolySoup(polygons) => polygons.iter().map(Vec::len).sum(),
        }
    }
}

/// Per-vertex float tuple attribute (`uv`, `uv1`, `N`, ...).
#[derive(Clone, Debug, PartialEq)]
pub struct VertexAttribute {
    tuple_size: usize,
    values: Vec<f32>,
}

impl VertexAttribute {
    fn new(tuple_size: usize, len: usize) -> Self {
        let tuple_size = tuple_size.max(1);
        Self {
            tuple_size,
            values: vec![0.0; len * tuple_size],
        }
    }

    pub fn tuple_size(&self) -> usize {
        self.tuple_size
    }

    pub fn len(&self) -> usize {
        self.values.len() / self.tuple_size
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, vertex: usize) -> Option<&[f32]> {
        let start = vertex * self.tuple_size;
        self.values.get(start..start + self.tuple_size)
    }

    /// Writes up to `tuple_size` components for `vertex`. Returns `false` if out of range.
    pub fn set(&mut self, vertex: usize, value: &[f32]) -> bool {
        let start = vertex * self.tuple_size;
        let Some(slot) = self.values.get_mut(start..start + self.tuple_size) else {
            return false;
        };
        let n = value.len().min(slot.len());
        slot[..n].copy_from_slice(&value[..n]);
        true
    }

    fn resize(&mut self, len: usize) {
        self.values.resize(len * self.tuple_size, 0.0);
    }
}

/// Offsets of the first point, vertex and primitive created by [`Mesh::build_block`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Block {
    pub point_start: usize,
    pub vertex_start: usize,
    pub prim_start: usize,
    pub prim_count: usize,
}

impl Block {
    pub fn prims(&self) -> Range<usize> {
        self.prim_start..self.prim_start + self.prim_count
    }
}

/// Host polygon mesh.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    points: Vec<Vec3>,
    vertex_points: Vec<u32>,
    primitives: Vec<Primitive>,
    prim_attributes: BTreeMap<String, Attribute>,
    vertex_attributes: BTreeMap<String, VertexAttribute>,
    groups: BTreeMap<String, Vec<usize>>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a point and returns its offset.
    pub fn add_point(&mut self, position: impl Into<mint::Vector3<f32>>) -> u32 {
        let p: mint::Vector3<f32> = position.into();
        self.points.push(Vec3::from(p));
        (self.points.len() - 1) as u32
    }

    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    pub fn point(&self, offset: usize) -> Option<Vec3> {
        self.points.get(offset).copied()
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_points.len()
    }

    /// Point referenced by the vertex at `vertex`.
    pub fn vertex_point(&self, vertex: u32) -> Option<u32> {
        self.vertex_points.get(vertex as usize).copied()
    }

    /// Position of the point referenced by `vertex`.
    pub fn vertex_position(&self, vertex: u32) -> Option<Vec3> {
        self.vertex_point(vertex)
            .and_then(|p| self.point(p as usize))
    }

    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    pub fn primitive(&self, offset: usize) -> Option<&Primitive> {
        self.primitives.get(offset)
    }

    pub fn primitive_count(&self) -> usize {
        self.primitives.len()
    }

    /// Adds a polygon over existing points; one new vertex per corner.
    pub fn add_polygon(&mut self, points: &[u32]) -> usize {
        let vertices = self.push_vertices(points);
        self.push_primitive(Primitive::Polygon(vertices))
    }

    /// Adds a polygon soup primitive over existing points.
    pub fn add_poly_soup(&mut self, polygons: &[Vec<u32>]) -> usize {
        let polygons = polygons.iter().map(|p| self.push_vertices(p)).collect();
        self.push_primitive(Primitive::PolySoup(polygons))
    }

    /// Appends a block of polygons in one pass.
    ///
    /// `counts[f]` corners are consumed from `indices` per face; each index refers
    /// into `positions`. Vertices are created in `indices` order so vertex
    /// `block.vertex_start + k` corresponds to `indices[k]`.
    pub fn build_block(&mut self, positions: &[Vec3], counts: &[u32], indices: &[u32]) -> Block {
        let block = Block {
            point_start: self.points.len(),
            vertex_start: self.vertex_points.len(),
            prim_start: self.primitives.len(),
            prim_count: counts.len(),
        };
        self.points.extend_from_slice(positions);
        self.primitives.reserve(counts.len());
        let mut cursor = 0usize;
        for &count in counts {
            let end = (cursor + count as usize).min(indices.len());
            let corners: Vec<u32> = indices[cursor..end]
                .iter()
                .map(|&i| (block.point_start + i as usize) as u32)
                .collect();
            let vertices = self.push_vertices_unchecked(&corners);
            self.primitives.push(Primitive::Polygon(vertices));
            cursor = end;
        }
        self.grow_attributes();
        block
    }

    fn push_vertices(&mut self, points: &[u32]) -> Vec<u32> {
        let vertices = self.push_vertices_unchecked(points);
        self.grow_vertex_attributes();
        vertices
    }

    fn push_vertices_unchecked(&mut self, points: &[u32]) -> Vec<u32> {
        let start = self.vertex_points.len() as u32;
        self.vertex_points.extend_from_slice(points);
        (start..start + points.len() as u32).collect()
    }

    fn push_primitive(&mut self, primitive: Primitive) -> usize {
        self.primitives.push(primitive);
        self.grow_prim_attributes();
        self.primitives.len() - 1
    }

    fn grow_attributes(&mut self) {
        self.grow_prim_attributes();
        self.grow_vertex_attributes();
    }

    fn grow_prim_attributes(&mut self) {
        let n = self.primitives.len();
        for attr in self.prim_attributes.values_mut() {
            attr.resize(n);
        }
    }

    fn grow_vertex_attributes(&mut self) {
        let n = self.vertex_points.len();
        for attr in self.vertex_attributes.values_mut() {
            attr.resize(n);
        }
    }

    pub fn find_prim_attribute(&self, name: &str) -> Option<&Attribute> {
        self.prim_attributes.get(name)
    }

    pub fn prim_attribute_mut(&mut self, name: &str) -> Option<&mut Attribute> {
        self.prim_attributes.get_mut(name)
    }

    pub fn prim_attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.prim_attributes.values()
    }

    /// Returns the primitive attribute `name`, creating it when absent.
    ///
    /// Fails with the existing attribute's storage and layout when it already
    /// exists with a different shape.
    pub fn ensure_prim_attribute(
        &mut self,
        name: &str,
        storage: Storage,
        layout: Layout,
    ) -> Result<&mut Attribute, (Storage, Layout)> {
        let n = self.primitives.len();
        let attr = self
            .prim_attributes
            .entry(name.to_owned())
            .or_insert_with(|| Attribute::new(name, storage, layout, n));
        if attr.storage() == storage && attr.layout() == layout {
            Ok(attr)
        } else {
            Err((attr.storage(), attr.layout()))
        }
    }

    /// Inserts (or replaces) a primitive attribute, sized to the primitive count.
    pub fn insert_prim_attribute(&mut self, mut attribute: Attribute) {
        attribute.resize(self.primitives.len());
        self.prim_attributes
            .insert(attribute.name().to_owned(), attribute);
    }

    pub fn find_vertex_attribute(&self, name: &str) -> Option<&VertexAttribute> {
        self.vertex_attributes.get(name)
    }

    /// Returns the vertex attribute `name`, creating it with `tuple_size` when absent.
    pub fn ensure_vertex_attribute(&mut self, name: &str, tuple_size: usize) -> &mut VertexAttribute {
        let n = self.vertex_points.len();
        self.vertex_attributes
            .entry(name.to_owned())
            .or_insert_with(|| VertexAttribute::new(tuple_size, n))
    }

    /// Adds the primitives in `prims` to the named group.
    pub fn add_to_group(&mut self, name: &str, prims: Range<usize>) {
        self.groups.entry(name.to_owned()).or_default().extend(prims);
    }

    pub fn group(&self, name: &str) -> Option<&[usize]> {
        self.groups.get(name).map(Vec::as_slice)
    }

    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Removes all geometry, attributes and groups.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }
}
