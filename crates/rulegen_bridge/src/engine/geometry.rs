//! Geometry exchanged with the engine: flattened input descriptors and generated output.
use crate::attributes::AttributeMap;

/// One UV set of an input descriptor. `indices` parallels the geometry indices.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UvSet {
    /// `(u, v)` pairs, flat.
    pub coords: Vec<f64>,
    pub indices: Vec<u32>,
}

impl UvSet {
    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }
}

/// Flattened polygon geometry of one initial shape.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GeometryDescriptor {
    /// `(x, y, z)` triples, flat.
    pub coords: Vec<f64>,
    pub face_counts: Vec<u32>,
    pub indices: Vec<u32>,
    /// Slot `k` holds the host's `k`-th UV set; absent slots are empty.
    pub uv_sets: Vec<UvSet>,
}

impl GeometryDescriptor {
    pub fn vertex_count(&self) -> usize {
        self.coords.len() / 3
    }

    pub fn face_count(&self) -> usize {
        self.face_counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.face_counts.is_empty()
    }
}

/// One UV set of a generated shape: per-face counts index into `indices`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GeneratedUvSet {
    pub coords: Vec<f64>,
    pub counts: Vec<u32>,
    pub indices: Vec<u32>,
}

impl GeneratedUvSet {
    pub fn is_empty(&self) -> bool {
        self.coords.is_empty() || self.counts.is_empty() || self.indices.is_empty()
    }
}

/// Geometry and per-face-range data produced for one initial shape.
///
/// `face_ranges` has `R + 1` boundaries for `R` ranges; range `r` covers faces
/// `face_ranges[r]..face_ranges[r + 1]`. `materials`, `reports` and `shape_ids`
/// hold one entry per range.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GeneratedShape {
    pub name: String,
    pub coords: Vec<f64>,
    pub normals: Vec<f64>,
    pub face_counts: Vec<u32>,
    pub indices: Vec<u32>,
    pub uv_sets: Vec<GeneratedUvSet>,
    pub face_ranges: Vec<u32>,
    pub materials: Option<Vec<AttributeMap>>,
    pub reports: Option<Vec<AttributeMap>>,
    pub shape_ids: Vec<i32>,
}

impl GeneratedShape {
    pub fn range_count(&self) -> usize {
        self.face_ranges.len().saturating_sub(1)
    }

    pub fn range(&self, r: usize) -> std::ops::Range<usize> {
        self.face_ranges[r] as usize..self.face_ranges[r + 1] as usize
    }

    /// Checks the cross-array length relations; returns a description of the first violation.
    pub fn validate(&self) -> Result<(), String> {
        let ranges = self.range_count();
        let corners: u64 = self.face_counts.iter().map(|&c| u64::from(c)).sum();
        if corners != self.indices.len() as u64 {
            return Err(format!(
                "face counts sum to {corners}, but {} indices were provided",
                self.indices.len()
            ));
        }
        let vertices = self.coords.len() / 3;
        if let Some(bad) = self.indices.iter().find(|&&i| i as usize >= vertices) {
            return Err(format!("index {bad} exceeds {vertices} vertices"));
        }
        if self.face_ranges.windows(2).any(|w| w[0] > w[1])
            || self
                .face_ranges
                .last()
                .is_some_and(|&l| l as usize > self.face_counts.len())
        {
            return Err("face ranges are not ascending within the face count".into());
        }
        if self.shape_ids.len() != ranges {
            return Err(format!(
                "{} shape ids for {ranges} face ranges",
                self.shape_ids.len()
            ));
        }
        for (what, maps) in [("materials", &self.materials), ("reports", &self.reports)] {
            if let Some(maps) = maps {
                if maps.len() != ranges {
                    return Err(format!("{} {what} for {ranges} face ranges", maps.len()));
                }
            }
        }
        Ok(())
    }
}
