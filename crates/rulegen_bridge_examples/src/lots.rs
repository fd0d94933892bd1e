use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rulegen_bridge::prelude::{BlockValue, Layout, Mesh, Storage};

/// A rectangular block of city lots, each split into `cells_per_lot` quads.
#[derive(Clone, Copy, Debug)]
pub struct LotLayout {
    pub lots_x: usize,
    pub lots_z: usize,
    pub cells_per_lot: usize,
    pub cell_size: f32,
    pub min_height: f32,
    pub max_height: f32,
}

impl Default for LotLayout {
    fn default() -> Self {
        Self {
            lots_x: 4,
            lots_z: 3,
            cells_per_lot: 2,
            cell_size: 10.0,
            min_height: 8.0,
            max_height: 40.0,
        }
    }
}

fn unit(rng: &mut StdRng) -> f32 {
    (rng.next_u32() as f32) / ((u32::MAX as f32) + 1.0)
}

/// Builds the lot block in the XZ plane.
///
/// Every quad carries an int `lot` id, a float `height` drawn per lot and a
/// string `zone` (`"residential"` or `"commercial"`).
pub fn lot_mesh(layout: &LotLayout, seed: u64) -> Mesh {
    let mut rng = StdRng::seed_from_u64(seed);
    let cells_x = layout.lots_x * layout.cells_per_lot;
    let cells_z = layout.lots_z;
    let mut mesh = Mesh::new();

    let mut ids = Vec::with_capacity((cells_x + 1) * (cells_z + 1));
    for z in 0..=cells_z {
        for x in 0..=cells_x {
            ids.push(mesh.add_point([x as f32 * layout.cell_size, 0.0, z as f32 * layout.cell_size]));
        }
    }
    let at = |x: usize, z: usize| ids[z * (cells_x + 1) + x];

    let mut lots = Vec::new();
    for z in 0..cells_z {
        for x in 0..cells_x {
            mesh.add_polygon(&[at(x, z), at(x, z + 1), at(x + 1, z + 1), at(x + 1, z)]);
            lots.push((z * layout.lots_x + x / layout.cells_per_lot) as i32);
        }
    }

    let lot_count = layout.lots_x * layout.lots_z;
    let heights: Vec<f64> = (0..lot_count)
        .map(|_| f64::from(layout.min_height + unit(&mut rng) * (layout.max_height - layout.min_height)))
        .collect();
    let zones: Vec<&str> = (0..lot_count)
        .map(|_| if rng.next_u32() % 3 == 0 { "commercial" } else { "residential" })
        .collect();

    if let Ok(attr) = mesh.ensure_prim_attribute("lot", Storage::Int32, Layout::Tuple(1)) {
        for (prim, &lot) in lots.iter().enumerate() {
            attr.set_block(prim..prim + 1, 0, BlockValue::Int32(lot));
        }
    }
    if let Ok(attr) = mesh.ensure_prim_attribute("height", Storage::Real64, Layout::Tuple(1)) {
        for (prim, &lot) in lots.iter().enumerate() {
            attr.set_block(prim..prim + 1, 0, BlockValue::Real64(heights[lot as usize]));
        }
    }
    if let Ok(attr) = mesh.ensure_prim_attribute("zone", Storage::String, Layout::Tuple(1)) {
        for (prim, &lot) in lots.iter().enumerate() {
            attr.set_block(prim..prim + 1, 0, BlockValue::String(zones[lot as usize].into()));
        }
    }
    mesh
}
