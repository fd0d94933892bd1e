//! Parallel batch generation over contiguous shape ranges.
//!
//! The initial shapes are split into at most `threads` contiguous ranges of
//! equal size (the last range may be shorter). Each range is handled by one
//! task on a dedicated rayon pool with its own [`ResultConverter`]. Tasks write
//! only to their own slice of the status and occlusion-handle vectors; the
//! destination mesh is shared behind a mutex.
use std::ops::Range;

use parking_lot::Mutex;
use rayon::ThreadPoolBuilder;
use tracing::{debug, error, info, warn};

use crate::context::{EngineContext, InterruptFlag};
use crate::engine::{
    EncoderSpec, GenerateOptions, InitialShape, OcclusionHandle, Status, ERROR_ENCODER_ID,
    PRINT_ENCODER_ID,
};
use crate::attributes::AttributeMap;
use crate::error::{Error, Result};
use crate::generate::config::GenerateConfig;
use crate::generate::converter::{ConversionOptions, ResultConverter};
use crate::generate::events::{EventSink, GenerateEvent, GenerateEventKind};
use crate::mesh::Mesh;

/// Per-shape outcome of a batch.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchReport {
    /// One status per initial shape, in input order.
    pub statuses: Vec<Status>,
    /// Worker threads used.
    pub threads: usize,
    /// Whether the run was cancelled through the interrupt flag.
    pub interrupted: bool,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.statuses.iter().filter(|s| s.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.statuses.len() - self.succeeded()
    }

    /// Some, but not all, shapes failed.
    pub fn is_partial(&self) -> bool {
        self.failed() > 0 && self.succeeded() > 0
    }
}

/// Splits `shape_count` shapes into contiguous ranges for at most `threads` workers.
///
/// Every range except possibly the last holds `ceil(shape_count / threads)`
/// shapes; no range is empty and the ranges cover `0..shape_count` exactly once.
pub fn thread_ranges(shape_count: usize, threads: usize) -> Vec<Range<usize>> {
    if shape_count == 0 {
        return Vec::new();
    }
    let threads = threads.clamp(1, shape_count);
    let size = shape_count.div_ceil(threads);
    (0..shape_count)
        .step_by(size)
        .map(|start| start..(start + size).min(shape_count))
        .collect()
}

/// Runs the engine over initial shapes in parallel and converts the results.
pub struct BatchGenerator<'a> {
    ctx: &'a EngineContext,
    config: &'a GenerateConfig,
}

impl<'a> BatchGenerator<'a> {
    pub fn new(ctx: &'a EngineContext, config: &'a GenerateConfig) -> Self {
        Self { ctx, config }
    }

    /// Encoders requested for every generate call.
    pub fn encoders(&self) -> Vec<EncoderSpec> {
        let mut encoders = vec![EncoderSpec::host(
            self.config.emit_attributes,
            self.config.emit_materials,
            self.config.emit_reports,
        )];
        if self.config.error_encoder {
            encoders.push(EncoderSpec::new(ERROR_ENCODER_ID, AttributeMap::new()));
        }
        if self.config.print_encoder {
            encoders.push(EncoderSpec::new(PRINT_ENCODER_ID, AttributeMap::new()));
        }
        encoders
    }

    /// Generates all `shapes` into `mesh`.
    ///
    /// Fails only if there is nothing to generate, the worker pool cannot be
    /// built, or every shape failed. Partial failures are reported through the
    /// returned [`BatchReport`].
    pub fn generate(
        &self,
        shapes: &[InitialShape],
        mesh: &Mutex<Mesh>,
        interrupt: &InterruptFlag,
        sink: &mut dyn EventSink,
    ) -> Result<BatchReport> {
        if shapes.is_empty() {
            return Err(Error::NoShapes);
        }
        let threads = self.config.thread_count(self.ctx.workers(), shapes.len());
        let ranges = thread_ranges(shapes.len(), threads);
        let range_size = ranges[0].len();
        info!(
            "generating {} shapes on {} threads ({} per thread)",
            shapes.len(),
            ranges.len(),
            range_size
        );
        if sink.wants(GenerateEventKind::BatchStarted) {
            sink.send(GenerateEvent::BatchStarted {
                shapes: shapes.len(),
                threads: ranges.len(),
            });
        }
        if sink.wants(GenerateEventKind::RangeAssigned) {
            for (thread, range) in ranges.iter().enumerate() {
                sink.send(GenerateEvent::RangeAssigned {
                    thread,
                    range: range.clone(),
                });
            }
        }

        let occlusion = if self.config.occlusion {
            match self.ctx.create_occlusion_set() {
                Ok(set) => Some(set),
                Err(status) => {
                    warn!("occlusion set unavailable, generating without occlusion: {status}");
                    None
                }
            }
        } else {
            None
        };

        let encoders = self.encoders();
        let options = GenerateOptions {
            worker_threads: self.ctx.workers(),
        };
        let conversion = ConversionOptions::from(self.config);
        let engine = self.ctx.engine().as_ref();
        let caches = self.ctx.caches();

        let mut statuses = vec![Status::Ok; shapes.len()];
        let mut handles = vec![OcclusionHandle::default(); shapes.len()];
        let mut thread_events: Vec<Vec<GenerateEvent>> = vec![Vec::new(); ranges.len()];

        let pool = ThreadPoolBuilder::new()
            .num_threads(ranges.len())
            .thread_name(|i| format!("rulegen-worker-{i}"))
            .build()?;

        pool.scope(|scope| {
            let tasks = ranges
                .iter()
                .cloned()
                .zip(statuses.chunks_mut(range_size))
                .zip(handles.chunks_mut(range_size))
                .zip(thread_events.iter_mut());
            for (((range, statuses), handles), events) in tasks {
                let occlusion = occlusion.as_ref();
                let encoders = &encoders;
                let options = &options;
                scope.spawn(move |_| {
                    let shapes = &shapes[range.clone()];
                    let mut converter =
                        ResultConverter::new(mesh, caches, conversion, interrupt, statuses, range.start);

                    if let Some(set) = occlusion {
                        let status =
                            engine.generate_occluders(shapes, handles, &mut converter, set, options);
                        if !status.is_ok() {
                            warn!("occluder pass for shapes {range:?} returned: {status}");
                        }
                    }

                    let occlusion_handles = occlusion.map(|_| &*handles);
                    let status = engine.generate(
                        shapes,
                        occlusion_handles,
                        encoders,
                        &mut converter,
                        occlusion,
                        options,
                    );
                    if !status.is_ok() {
                        error!("generate for shapes {range:?} returned: {status}");
                        converter.fail_remaining(status);
                    }
                    debug!(
                        "thread for shapes {range:?} committed {} shapes",
                        converter.added()
                    );

                    if let Some(set) = occlusion {
                        set.dispose(handles);
                    }
                    *events = converter.into_events();
                });
            }
        });
        drop(occlusion);

        for event in thread_events.into_iter().flatten() {
            if sink.wants(event.kind()) {
                sink.send(event);
            }
        }

        let report = BatchReport {
            statuses,
            threads: ranges.len(),
            interrupted: interrupt.is_interrupted(),
        };
        if report.failed() > 0 {
            warn!(
                "{} of {} shapes failed to generate",
                report.failed(),
                report.statuses.len()
            );
        }
        let total_failure = report.succeeded() == 0;
        if sink.wants(GenerateEventKind::BatchFinished) {
            sink.send(GenerateEvent::BatchFinished {
                report: report.clone(),
            });
        }
        if total_failure {
            return Err(Error::GenerationFailed {
                shapes: report.statuses.len(),
            });
        }
        Ok(report)
    }
}
