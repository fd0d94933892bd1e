use std::sync::Arc;

use rulegen_bridge::prelude::*;
use rulegen_bridge_examples::{init_tracing, lot_mesh, ExtrusionEngine, LotLayout};
use tracing::{info, warn};

fn config() -> GenerateConfig {
    GenerateConfig::new(ShapeDefaults::new("city.rpk", "rules/lot.cgb"))
        .with_classifier(Classifier::new("lot", ClassifierType::Integer))
        .with_group_naming(GroupNaming::ByClassifier, "lot")
        .with_max_threads(3)
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let layout = LotLayout::default();
    let ctx = EngineContext::new(Arc::new(ExtrusionEngine::new()));

    // Lot 0 gets an invalid height; its shape fails, the rest still convert.
    let mut mesh = lot_mesh(&layout, 7);
    if let Some(height) = mesh.prim_attribute_mut("height") {
        height.set_block(0..layout.cells_per_lot, 0, BlockValue::Real64(-1.0));
    }
    let generator = MeshGenerator::try_new(&ctx, config())?;
    let mut log_failures = FnSink::new(|event| match event {
        GenerateEvent::ShapeFailed {
            shape_index,
            status,
            message,
        } => warn!("shape {shape_index} failed ({status}): {message}"),
        GenerateEvent::RangeAssigned { thread, range } => info!("thread {thread} -> shapes {range:?}"),
        _ => {}
    });
    let report = generator.generate_with_events(&mut mesh, &mut log_failures)?;
    info!(
        "partial run: {} succeeded, {} failed, {} primitives",
        report.batch.succeeded(),
        report.batch.failed(),
        report.primitives
    );

    // Cancel as soon as the batch starts.
    let mut mesh = lot_mesh(&layout, 7);
    let interrupt = generator.interrupt_flag();
    let mut cancel = FnSink::new(|event| {
        if let GenerateEvent::BatchStarted { .. } = event {
            interrupt.interrupt();
        }
    });
    match generator.generate_with_events(&mut mesh, &mut cancel) {
        Ok(report) => info!(
            "cancelled run kept {} primitives (interrupted: {})",
            report.primitives, report.batch.interrupted
        ),
        Err(err) => warn!("cancelled run produced nothing: {err}"),
    }
    Ok(())
}
