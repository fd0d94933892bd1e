use std::sync::Arc;

use rulegen_bridge::prelude::*;
use rulegen_bridge_examples::{init_tracing, lot_mesh, ExtrusionEngine, LotLayout};
use tracing::info;

fn main() -> anyhow::Result<()> {
    init_tracing();

    let layout = LotLayout::default();
    let mut mesh = lot_mesh(&layout, 42);
    info!(
        "input: {} lots, {} primitives",
        layout.lots_x * layout.lots_z,
        mesh.primitive_count()
    );

    let engine = Arc::new(ExtrusionEngine::new());
    let ctx = EngineContext::new(engine.clone());
    let config = GenerateConfig::new(ShapeDefaults::new("city.rpk", "rules/lot.cgb"))
        .with_classifier(Classifier::new("lot", ClassifierType::Integer))
        .with_group_naming(GroupNaming::ByClassifier, "lot")
        .with_emit(true, true, true);

    let generator = MeshGenerator::try_new(&ctx, config)?;
    let assigned = generator.assign(&mut mesh)?;
    info!(
        "assigned main and default rule attributes to {} lots (defaults written: {})",
        assigned.groups, assigned.defaults_written
    );

    let mut events = VecSink::new();
    let report = generator.generate_with_events(&mut mesh, &mut events)?;

    info!(
        "generated {} primitives from {} shapes on {} threads",
        report.primitives, report.shapes, report.batch.threads
    );
    for attr in mesh.prim_attributes() {
        info!("  {:<24} {:?} {:?}", attr.name(), attr.storage(), attr.layout());
    }
    let mut groups: Vec<&str> = mesh.group_names().collect();
    groups.sort_unstable();
    info!("groups: {}", groups.join(", "));
    for event in events.as_slice() {
        if let GenerateEvent::CgaPrint { text, .. } = event {
            info!("rule print: {text}");
        }
    }
    info!(
        "live shapes after run: {}, occluders disposed: {}",
        engine.live_shapes(),
        engine.disposed_occluders()
    );
    Ok(())
}
