#![forbid(unsafe_code)]
//! Shared pieces of the rulegen_bridge examples: a toy extrusion engine, lot
//! mesh fixtures and logging setup.

mod extrude;
mod lots;

pub use extrude::{ExtrusionEngine, HEIGHT_KEY};
pub use lots::{lot_mesh, LotLayout};

/// Installs a `fmt` subscriber honouring `RUST_LOG`, defaulting to `info`.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
