//! Parallel generation, result conversion and the assign pass.
pub mod batch;
pub mod config;
pub mod converter;
pub mod events;
pub mod pipeline;

pub use batch::{thread_ranges, BatchGenerator, BatchReport};
pub use config::GenerateConfig;
pub use converter::{ConversionOptions, ResultConverter};
pub use events::{EventSink, FnSink, GenerateEvent, GenerateEventKind, MultiSink, VecSink};
pub use pipeline::{assign_mesh, generate_mesh, AssignReport, GenerateReport, MeshGenerator};
