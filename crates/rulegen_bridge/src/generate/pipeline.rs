//! End-to-end generation (partition, build shapes, batch generate, convert)
//! and the attribute-only assign pass.
use parking_lot::Mutex;
use tracing::{error, info, warn};

use crate::context::{EngineContext, InterruptFlag};
use crate::error::{Error, Result};
use crate::generate::batch::{BatchGenerator, BatchReport};
use crate::generate::config::GenerateConfig;
use crate::generate::events::EventSink;
use crate::mesh::Mesh;
use crate::shape::{
    assign_main_attributes, assign_rule_attributes, evaluate_default_rule_attributes, ShapeBuilder,
};

/// Summary of a [`generate_mesh`] run.
#[non_exhaustive]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GenerateReport {
    /// Primitive groups found by the classifier.
    pub groups: usize,
    /// Initial shapes handed to the engine.
    pub shapes: usize,
    /// Primitives in the destination mesh after conversion.
    pub primitives: usize,
    pub batch: BatchReport,
}

/// Replaces `mesh` with the geometry generated from its primitives.
///
/// The input primitives are partitioned by `config.classifier`, one initial
/// shape is created per group and all shapes are generated in parallel. The
/// mesh is cleared only after at least one initial shape was created; on
/// [`Error::NoShapes`] it is left untouched.
pub fn generate_mesh(
    ctx: &EngineContext,
    mesh: &mut Mesh,
    config: &GenerateConfig,
    interrupt: &InterruptFlag,
    sink: &mut dyn EventSink,
) -> Result<GenerateReport> {
    config.validate()?;
    let shape_data = ShapeBuilder::new(ctx)
        .with_classifier(config.classifier.clone())
        .with_defaults(config.defaults.clone())
        .with_naming(config.group_naming, config.name_prefix.clone())
        .build(mesh);
    shape_data.check()?;

    if shape_data.shape_count() == 0 {
        error!(
            "no initial shapes created from {} primitives",
            mesh.primitive_count()
        );
        return Err(Error::NoShapes);
    }
    if interrupt.is_interrupted() {
        return Err(Error::Interrupted);
    }

    mesh.clear();
    let destination = Mutex::new(std::mem::take(mesh));
    let result = BatchGenerator::new(ctx, config).generate(
        shape_data.shapes(),
        &destination,
        interrupt,
        sink,
    );
    *mesh = destination.into_inner();
    let batch = result?;

    let report = GenerateReport {
        groups: shape_data.builder_count(),
        shapes: shape_data.shape_count(),
        primitives: mesh.primitive_count(),
        batch,
    };
    info!(
        "generated {} primitives from {} shapes ({} failed)",
        report.primitives,
        report.shapes,
        report.batch.failed()
    );
    Ok(report)
}

/// Summary of an [`assign_mesh`] run.
#[non_exhaustive]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AssignReport {
    /// Primitive groups found by the classifier.
    pub groups: usize,
    /// Initial shapes created to evaluate default rule attributes.
    pub shapes: usize,
    /// Whether default rule attribute values were written.
    pub defaults_written: bool,
}

/// Stores the resolved main attributes and the default rule attribute values
/// of every primitive group on the primitives of `mesh`. No geometry is generated.
///
/// Main attributes are written even when no initial shape could be created.
/// Default rule attributes are written only when the engine evaluated them successfully.
pub fn assign_mesh(ctx: &EngineContext, mesh: &mut Mesh, config: &GenerateConfig) -> Result<AssignReport> {
    config.validate()?;
    let mut shape_data = ShapeBuilder::new(ctx)
        .with_classifier(config.classifier.clone())
        .with_defaults(config.defaults.clone())
        .with_naming(config.group_naming, config.name_prefix.clone())
        .build(mesh);
    shape_data.check()?;

    assign_main_attributes(mesh, &shape_data, &config.classifier);
    let status = evaluate_default_rule_attributes(ctx, &mut shape_data);
    let defaults_written = status.is_ok() && shape_data.shape_count() > 0;
    if defaults_written {
        assign_rule_attributes(
            mesh,
            &shape_data,
            ctx.caches(),
            config.shape_attribute_arrays,
            config.default_write_policy,
        );
    } else if !status.is_ok() {
        warn!("default rule attributes not assigned: {status}");
    }

    let report = AssignReport {
        groups: shape_data.builder_count(),
        shapes: shape_data.shape_count(),
        defaults_written,
    };
    info!(
        "assigned attributes to {} groups ({} shapes evaluated)",
        report.groups, report.shapes
    );
    Ok(report)
}

/// Reusable entry point bundling an [`EngineContext`] and a [`GenerateConfig`].
pub struct MeshGenerator<'a> {
    ctx: &'a EngineContext,
    config: GenerateConfig,
    interrupt: InterruptFlag,
}

impl<'a> MeshGenerator<'a> {
    /// Validates `config` before accepting it.
    pub fn try_new(ctx: &'a EngineContext, config: GenerateConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            ctx,
            config,
            interrupt: InterruptFlag::new(),
        })
    }

    /// Handle to cancel running and future generations of this generator.
    pub fn interrupt_flag(&self) -> InterruptFlag {
        self.interrupt.clone()
    }

    pub fn config(&self) -> &GenerateConfig {
        &self.config
    }

    pub fn generate(&self, mesh: &mut Mesh) -> Result<GenerateReport> {
        self.generate_with_events(mesh, &mut ())
    }

    pub fn generate_with_events(&self, mesh: &mut Mesh, sink: &mut dyn EventSink) -> Result<GenerateReport> {
        generate_mesh(self.ctx, mesh, &self.config, &self.interrupt, sink)
    }

    pub fn assign(&self, mesh: &mut Mesh) -> Result<AssignReport> {
        assign_mesh(self.ctx, mesh, &self.config)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::attributes::to_host::DefaultWritePolicy;
    use crate::attributes::AttributeValue;
    use crate::engine::Status;
    use crate::generate::events::{GenerateEvent, GenerateEventKind, VecSink};
    use crate::mesh::{BlockValue, HostElement, Layout, Storage};
    use crate::shape::{reserved, Classifier, ClassifierType, GroupNaming, ShapeDefaults};
    use crate::testing::{classified_quad_grid, quad_grid, FakeEngine};

    fn config(rule_file: &str) -> GenerateConfig {
        GenerateConfig::new(ShapeDefaults::new("city.rpk", rule_file))
            .with_classifier(Classifier::new("lot", ClassifierType::Integer))
            .with_group_naming(GroupNaming::ByClassifier, "lot")
    }

    #[test]
    fn replaces_mesh_with_generated_geometry() {
        let fake = Arc::new(FakeEngine::new().with_rule("rules/lot.cgb", |r| r.materials = true));
        let ctx = EngineContext::new(fake.clone()).with_workers(2);
        let mut mesh = classified_quad_grid(3, 2);
        let mut sink = VecSink::new();
        let report = generate_mesh(
            &ctx,
            &mut mesh,
            &config("rules/lot.cgb").with_emit(false, true, false),
            &InterruptFlag::new(),
            &mut sink,
        )
        .expect("generate");

        assert_eq!(report.groups, 3);
        assert_eq!(report.shapes, 3);
        assert_eq!(report.primitives, 6);
        assert_eq!(mesh.primitive_count(), 6);
        assert!(mesh.find_prim_attribute("lot").is_none());
        assert!(mesh.find_prim_attribute("material__name").is_some());
        let mut groups: Vec<&str> = mesh.group_names().collect();
        groups.sort_unstable();
        assert_eq!(groups, vec!["lot_0", "lot_1", "lot_2"]);
        assert_eq!(sink.count(GenerateEventKind::BatchFinished), 1);
        assert_eq!(fake.live_shapes(), 0);
    }

    #[test]
    fn no_shapes_leaves_mesh_untouched() {
        let fake = Arc::new(FakeEngine::new().with_rule("rules/bad.cgb", |r| r.reject = true));
        let ctx = EngineContext::new(fake);
        let mut mesh = classified_quad_grid(2, 1);
        let before = mesh.clone();
        let err = generate_mesh(
            &ctx,
            &mut mesh,
            &config("rules/bad.cgb"),
            &InterruptFlag::new(),
            &mut (),
        )
        .expect_err("nothing to generate");
        assert!(matches!(err, Error::NoShapes));
        assert_eq!(mesh, before);
    }

    #[test]
    fn invalid_config_is_rejected_before_work() {
        let ctx = EngineContext::new(Arc::new(FakeEngine::new()));
        let bad = GenerateConfig::default().with_max_threads(0);
        assert!(matches!(
            MeshGenerator::try_new(&ctx, bad),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn generator_reports_partial_failures() {
        let fake = Arc::new(FakeEngine::new().with_rule("rules/lot.cgb", |r| r.fail_groups = vec![0]));
        let ctx = EngineContext::new(fake).with_workers(4);
        let generator = MeshGenerator::try_new(&ctx, config("rules/lot.cgb")).expect("config");
        let mut mesh = classified_quad_grid(4, 1);
        let report = generator.generate(&mut mesh).expect("partial");
        assert_eq!(report.batch.statuses[0], Status::GenerateFailed);
        assert_eq!(report.batch.succeeded(), 3);
        assert_eq!(mesh.primitive_count(), 3);
    }

    #[test]
    fn shape_attributes_survive_the_round_trip() {
        let fake = Arc::new(FakeEngine::new().with_rule("rules/lot.cgb", |r| {
            r.echo_attributes = true;
        }));
        let ctx = EngineContext::new(fake);
        let mut mesh = quad_grid(2, 1);
        mesh.ensure_prim_attribute("lot", crate::mesh::Storage::Int32, crate::mesh::Layout::Tuple(1))
            .expect("lot");
        mesh.ensure_prim_attribute("height", crate::mesh::Storage::Real64, crate::mesh::Layout::Tuple(1))
            .expect("height")
            .set_block(0..2, 0, crate::mesh::BlockValue::Real64(0.1));
        generate_mesh(
            &ctx,
            &mut mesh,
            &config("rules/lot.cgb").with_emit(true, false, false),
            &InterruptFlag::new(),
            &mut (),
        )
        .expect("generate");
        match mesh.find_prim_attribute("height").and_then(|a| a.element(1)) {
            Some(HostElement::Real32([h, ..])) => {
                approx::assert_relative_eq!(f64::from(*h), 0.1, max_relative = 1e-6)
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn interrupted_before_generation() {
        let ctx = EngineContext::new(Arc::new(FakeEngine::new()));
        let generator = MeshGenerator::try_new(&ctx, config("rules/lot.cgb")).expect("config");
        generator.interrupt_flag().interrupt();
        let mut mesh = classified_quad_grid(1, 1);
        let before = mesh.clone();
        assert!(matches!(generator.generate(&mut mesh), Err(Error::Interrupted)));
        assert_eq!(mesh, before);
    }

    #[test]
    fn reports_and_prints_carry_their_shape_ids() {
        let fake = Arc::new(FakeEngine::new().with_rule("rules/lot.cgb", |r| {
            r.reports = true;
            r.print = true;
            r.first_shape_id = 7;
        }));
        let ctx = EngineContext::new(fake).with_workers(2);
        let mut mesh = classified_quad_grid(2, 2);
        let mut sink = VecSink::new();
        let report = generate_mesh(
            &ctx,
            &mut mesh,
            &config("rules/lot.cgb")
                .with_emit(false, false, true)
                .with_message_encoders(false, true),
            &InterruptFlag::new(),
            &mut sink,
        )
        .expect("generate");
        assert_eq!(report.primitives, 4);

        let mut prints: Vec<(usize, i32, &str)> = sink
            .as_slice()
            .iter()
            .filter_map(|e| match e {
                GenerateEvent::CgaPrint {
                    shape_index,
                    shape_id,
                    text,
                } => Some((*shape_index, *shape_id, text.as_str())),
                _ => None,
            })
            .collect();
        prints.sort_unstable();
        assert_eq!(prints, vec![(0, 7, "generated lot_0"), (1, 7, "generated lot_1")]);

        let face_index = mesh.find_prim_attribute("faceIndex").expect("report attribute");
        let values: Vec<f32> = (0..4)
            .map(|p| match face_index.element(p) {
                Some(HostElement::Real32([v, ..])) => *v,
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(values, vec![0.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn assign_writes_evaluated_defaults_per_group() {
        let fake = Arc::new(
            FakeEngine::new()
                .with_rule("rules/lot.cgb", |r| {
                    r.defaults = vec![
                        ("Default$roofAngle".into(), AttributeValue::Float(30.0)),
                        ("Default$roof.type".into(), AttributeValue::String("gable".into())),
                    ]
                })
                .with_rule("rules/park.cgb", |r| {
                    r.defaults = vec![("Default$trees".into(), AttributeValue::Int(12))]
                }),
        );
        let ctx = EngineContext::new(fake.clone());
        let mut mesh = classified_quad_grid(2, 2);
        mesh.ensure_prim_attribute(reserved::RULE_FILE, Storage::String, Layout::Tuple(1))
            .expect("rule file")
            .set_block(2..4, 0, BlockValue::String(Arc::from("rules/park.cgb")));
        let report = assign_mesh(&ctx, &mut mesh, &config("rules/lot.cgb")).expect("assign");
        assert_eq!(report.shapes, 2);
        assert!(report.defaults_written);
        assert_eq!(mesh.primitive_count(), 4);

        for prim in 0..2 {
            match mesh.find_prim_attribute("roofAngle").and_then(|a| a.element(prim)) {
                Some(HostElement::Real32([v, ..])) => assert_eq!(*v, 30.0),
                other => panic!("unexpected {other:?}"),
            }
            match mesh.find_prim_attribute("roof__type").and_then(|a| a.element(prim)) {
                Some(HostElement::String([s, ..])) => assert_eq!(&**s, "gable"),
                other => panic!("unexpected {other:?}"),
            }
        }
        for prim in 2..4 {
            match mesh.find_prim_attribute("trees").and_then(|a| a.element(prim)) {
                Some(HostElement::Int32([v, ..])) => assert_eq!(*v, 12),
                other => panic!("unexpected {other:?}"),
            }
            match mesh.find_prim_attribute("roof__type").and_then(|a| a.element(prim)) {
                Some(HostElement::String([s, ..])) => assert_eq!(&**s, ""),
                other => panic!("unexpected {other:?}"),
            }
        }
        match mesh.find_prim_attribute(reserved::RULE_FILE).and_then(|a| a.element(0)) {
            Some(HostElement::String([s, ..])) => assert_eq!(&**s, "rules/lot.cgb"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(fake.live_shapes(), 0);
    }

    #[test]
    fn assign_skip_if_default_keeps_existing_values() {
        let fake = Arc::new(FakeEngine::new().with_rule("rules/lot.cgb", |r| {
            r.defaults = vec![("Default$levels".into(), AttributeValue::Int(0))]
        }));
        let ctx = EngineContext::new(fake);
        let mut mesh = classified_quad_grid(1, 2);
        mesh.ensure_prim_attribute("levels", Storage::Int32, Layout::Tuple(1))
            .expect("levels")
            .set_block(0..2, 0, BlockValue::Int32(4));

        let mut skipping = mesh.clone();
        let cfg = config("rules/lot.cgb");
        assign_mesh(
            &ctx,
            &mut skipping,
            &cfg.clone().with_default_write_policy(DefaultWritePolicy::SkipIfDefault),
        )
        .expect("assign");
        assign_mesh(&ctx, &mut mesh, &cfg).expect("assign");

        let level = |m: &Mesh| match m.find_prim_attribute("levels").and_then(|a| a.element(1)) {
            Some(HostElement::Int32([v, ..])) => *v,
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(level(&skipping), 4);
        assert_eq!(level(&mesh), 0);
    }
}
