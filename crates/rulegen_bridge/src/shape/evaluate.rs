//! Evaluation of default rule attribute values for created shapes.
use tracing::{debug, error, warn};

use crate::attributes::{AttributeMap, AttributeMapBuilder, AttributeValue};
use crate::context::EngineContext;
use crate::engine::{
    EncoderSpec, ErrorLevel, GenerateCallbacks, GenerateOptions, GeneratedShape, Status,
    EVAL_ATTRIBUTES_ENCODER_ID,
};
use crate::shape::data::ShapeData;

/// Collects reported attribute values into one builder per shape index.
struct DefaultAttributeCollector<'a> {
    builders: &'a mut [AttributeMapBuilder],
}

impl GenerateCallbacks for DefaultAttributeCollector<'_> {
    fn add(&mut self, shape_index: usize, _shape: &GeneratedShape) -> Status {
        debug!("ignoring geometry for shape {shape_index} during attribute evaluation");
        Status::Ok
    }

    fn generate_error(&mut self, shape_index: usize, status: Status, message: &str) -> Status {
        warn!("attribute evaluation of shape {shape_index} failed ({status}): {message}");
        Status::Ok
    }

    fn asset_error(&mut self, shape_index: usize, level: ErrorLevel, key: &str, uri: &str, message: &str) -> Status {
        debug!("asset {level:?} for shape {shape_index} ({key} -> {uri}): {message}");
        Status::Ok
    }

    fn cga_error(&mut self, shape_index: usize, shape_id: i32, level: ErrorLevel, message: &str) -> Status {
        debug!("rule {level:?} in shape {shape_index}/{shape_id}: {message}");
        Status::Ok
    }

    fn cga_print(&mut self, _shape_index: usize, _shape_id: i32, _text: &str) -> Status {
        Status::Ok
    }

    fn attribute(&mut self, shape_index: usize, _shape_id: i32, key: &str, value: AttributeValue) -> Status {
        match self.builders.get_mut(shape_index) {
            Some(builder) => builder.set(key, value),
            None => warn!("attribute '{key}' reported for unknown shape {shape_index}"),
        }
        Status::Ok
    }
}

/// Asks the engine for the default rule attribute values of every shape in
/// `shape_data` and stores them in the per-shape attribute builders.
///
/// The builders are emptied first, so afterwards each holds exactly the
/// values the engine reported for its shape.
pub fn evaluate_default_rule_attributes(ctx: &EngineContext, shape_data: &mut ShapeData) -> Status {
    let (shapes, builders) = shape_data.shapes_and_attribute_builders_mut();
    if shapes.is_empty() {
        return Status::Ok;
    }
    for builder in builders.iter_mut() {
        *builder = AttributeMapBuilder::new();
    }

    let encoders = [EncoderSpec::new(EVAL_ATTRIBUTES_ENCODER_ID, AttributeMap::new())];
    let mut collector = DefaultAttributeCollector { builders };
    let status = ctx.engine().generate(
        shapes,
        None,
        &encoders,
        &mut collector,
        None,
        &GenerateOptions {
            worker_threads: ctx.workers(),
        },
    );
    if status.is_ok() {
        debug!("evaluated default rule attributes of {} shapes", shapes.len());
    } else {
        error!("default rule attribute evaluation failed: {status}");
    }
    status
}
