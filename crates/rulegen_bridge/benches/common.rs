use std::time::Duration;

use criterion::{Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use rulegen_bridge::prelude::{BlockValue, Layout, Mesh, Storage};

pub const SAMPLE_SIZE: usize = 20;
pub const WARM_UP: Duration = Duration::from_secs(1);
pub const MEASUREMENT_TIME: Duration = Duration::from_secs(2);

pub fn default_criterion() -> Criterion {
    Criterion::default()
        .configure_from_args()
        .sample_size(SAMPLE_SIZE)
        .warm_up_time(WARM_UP)
        .measurement_time(MEASUREMENT_TIME)
}

pub fn elements_throughput(elements: usize) -> Throughput {
    Throughput::Elements(elements.max(1) as u64)
}

/// Unit quads in a square grid, each tagged with a random `lot` id below `lots`
/// and a random `height`.
pub fn lot_grid(side: usize, lots: u32, seed: u64) -> Mesh {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut mesh = Mesh::new();
    let mut ids = Vec::with_capacity((side + 1) * (side + 1));
    for z in 0..=side {
        for x in 0..=side {
            ids.push(mesh.add_point([x as f32, 0.0, z as f32]));
        }
    }
    let at = |x: usize, z: usize| ids[z * (side + 1) + x];
    for z in 0..side {
        for x in 0..side {
            mesh.add_polygon(&[at(x, z), at(x + 1, z), at(x + 1, z + 1), at(x, z + 1)]);
        }
    }

    let count = mesh.primitive_count();
    let lot_ids: Vec<i32> = (0..count)
        .map(|_| (rng.next_u32() % lots.max(1)) as i32)
        .collect();
    let heights: Vec<f64> = (0..count)
        .map(|_| 5.0 + (rng.next_u32() as f64 / u32::MAX as f64) * 20.0)
        .collect();
    if let Ok(lot) = mesh.ensure_prim_attribute("lot", Storage::Int32, Layout::Tuple(1)) {
        for (prim, id) in lot_ids.into_iter().enumerate() {
            lot.set_block(prim..prim + 1, 0, BlockValue::Int32(id));
        }
    }
    if let Ok(height) = mesh.ensure_prim_attribute("height", Storage::Real64, Layout::Tuple(1)) {
        for (prim, h) in heights.into_iter().enumerate() {
            height.set_block(prim..prim + 1, 0, BlockValue::Real64(h));
        }
    }
    mesh
}
