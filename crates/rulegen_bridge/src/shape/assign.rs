//! Writing resolved main attributes and default rule attributes back onto host primitives.
use std::ops::Range;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::attributes::cache::StringCaches;
use crate::attributes::to_host::{ArrayHandling, DefaultWritePolicy, ToHost};
use crate::mesh::{BlockValue, Layout, Mesh, Storage};
use crate::shape::data::ShapeData;
use crate::shape::partition::Classifier;
use crate::shape::reserved;

fn write_string(mesh: &mut Mesh, name: &str, prims: &[usize], value: &str) {
    match mesh.ensure_prim_attribute(name, Storage::String, Layout::Tuple(1)) {
        Ok(attr) => {
            let value: Arc<str> = Arc::from(value);
            for &p in prims {
                attr.set(p, 0, BlockValue::String(value.clone()));
            }
        }
        Err((storage, layout)) => {
            warn!("cannot assign '{name}': existing attribute is {storage:?}/{layout:?}")
        }
    }
}

/// Stores each group's classifier name, package, rule file, start rule, style
/// and seed in the reserved primitive attributes of its primitives.
///
/// A later build over the same mesh resolves the same main attributes and seeds.
pub fn assign_main_attributes(mesh: &mut Mesh, shape_data: &ShapeData, classifier: &Classifier) {
    for (group, builder) in shape_data.builders().iter().enumerate() {
        let prims = shape_data.primitive_mapping(group);
        let Some(&first) = prims.first() else {
            continue;
        };
        let main = &builder.main;
        let classifier_name = classifier.for_primitive(mesh, first).name;
        write_string(mesh, reserved::CLASSIFIER_NAME, prims, &classifier_name);
        write_string(mesh, reserved::PACKAGE, prims, &main.package.to_string_lossy());
        write_string(mesh, reserved::RULE_FILE, prims, &main.rule_file);
        write_string(mesh, reserved::START_RULE, prims, &main.start_rule);
        write_string(mesh, reserved::STYLE, prims, &main.style);
        match mesh.ensure_prim_attribute(reserved::RANDOM_SEED, Storage::Int32, Layout::Tuple(1)) {
            Ok(attr) => {
                for &p in prims {
                    attr.set(p, 0, BlockValue::Int32(main.random_seed));
                }
            }
            Err((storage, layout)) => warn!(
                "cannot assign '{}': existing attribute is {storage:?}/{layout:?}",
                reserved::RANDOM_SEED
            ),
        }
    }
}

/// Splits sorted primitive indices into maximal contiguous ranges.
fn contiguous_runs(prims: &[usize]) -> Vec<Range<usize>> {
    let mut runs: Vec<Range<usize>> = Vec::new();
    for &p in prims {
        match runs.last_mut() {
            Some(run) if run.end == p => run.end += 1,
            _ => runs.push(p..p + 1),
        }
    }
    runs
}

/// Writes each shape's attribute builder (usually filled by
/// [`crate::shape::evaluate_default_rule_attributes`]) onto the primitives of
/// its group, one typed primitive attribute per key.
pub fn assign_rule_attributes(
    mesh: &mut Mesh,
    shape_data: &ShapeData,
    caches: &StringCaches,
    arrays: ArrayHandling,
    policy: DefaultWritePolicy,
) {
    let mut to_host = ToHost::new(mesh, caches).with_policy(policy);
    for (index, shape) in shape_data.shapes().iter().enumerate() {
        let values = shape_data.attribute_builder(index).build();
        if values.is_empty() {
            continue;
        }
        let runs = contiguous_runs(shape_data.primitive_mapping(shape.group()));
        debug!(
            "assigning {} rule attributes of '{}' over {} primitive runs",
            values.len(),
            shape.name(),
            runs.len()
        );
        for run in runs {
            to_host.convert(&values, run, arrays);
        }
    }
}
