//! Event types and sinks for observing generate runs.
//!
//! This module defines [`GenerateEvent`] and a set of sinks to emit, collect,
//! or forward events while running a [`crate::generate::BatchGenerator`] or
//! [`crate::generate::generate_mesh`]. Events raised on worker threads are
//! buffered per thread and delivered on the calling thread after the join.
use std::ops::Range;

use crate::engine::{ErrorLevel, Status};
use crate::generate::batch::BatchReport;

/// Describes events emitted by generate operations.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub enum GenerateEvent {
    /// Emitted before worker threads start.
    BatchStarted {
        /// Number of initial shapes in the batch.
        shapes: usize,
        /// Number of worker threads.
        threads: usize,
    },

    /// Emitted once per worker thread with its contiguous shape range.
    RangeAssigned { thread: usize, range: Range<usize> },

    /// The engine reported a failure for one initial shape.
    ShapeFailed {
        shape_index: usize,
        status: Status,
        message: String,
    },

    /// A rule asset could not be resolved or loaded.
    AssetError {
        shape_index: usize,
        level: ErrorLevel,
        key: String,
        uri: String,
        message: String,
    },

    /// Error raised by rule evaluation.
    CgaError {
        shape_index: usize,
        shape_id: i32,
        level: ErrorLevel,
        message: String,
    },

    /// Output of a print statement in a rule.
    CgaPrint {
        shape_index: usize,
        shape_id: i32,
        text: String,
    },

    /// Emitted after all worker threads joined.
    BatchFinished { report: BatchReport },

    /// Non-fatal warning generated during the run.
    Warning {
        /// Context string (e.g. shape name, thread range).
        context: String,
        /// Human-readable message.
        message: String,
    },
}

/// Discriminant of [`GenerateEvent`] used for sink filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenerateEventKind {
    BatchStarted,
    RangeAssigned,
    ShapeFailed,
    AssetError,
    CgaError,
    CgaPrint,
    BatchFinished,
    Warning,
}

impl GenerateEvent {
    pub fn kind(&self) -> GenerateEventKind {
        match self {
            GenerateEvent::BatchStarted { .. } => GenerateEventKind::BatchStarted,
            GenerateEvent::RangeAssigned { .. } => GenerateEventKind::RangeAssigned,
            GenerateEvent::ShapeFailed { .. } => GenerateEventKind::ShapeFailed,
            GenerateEvent::AssetError { .. } => GenerateEventKind::AssetError,
            GenerateEvent::CgaError { .. } => GenerateEventKind::CgaError,
            GenerateEvent::CgaPrint { .. } => GenerateEventKind::CgaPrint,
            GenerateEvent::BatchFinished { .. } => GenerateEventKind::BatchFinished,
            GenerateEvent::Warning { .. } => GenerateEventKind::Warning,
        }
    }
}

/// A generic event sink that accepts [`GenerateEvent`]s.
pub trait EventSink {
    fn send(&mut self, event: GenerateEvent);

    /// Whether events of `kind` should be produced at all.
    fn wants(&self, _kind: GenerateEventKind) -> bool {
        true
    }

    fn send_many<I>(&mut self, events: I)
    where
        Self: Sized,
        I: IntoIterator<Item = GenerateEvent>,
    {
        for e in events {
            self.send(e);
        }
    }
}

/// A no-op event sink.
impl EventSink for () {
    #[inline]
    fn send(&mut self, _event: GenerateEvent) {}

    #[inline]
    fn wants(&self, _kind: GenerateEventKind) -> bool {
        false
    }
}

/// An event sink that forwards to a user-provided closure.
pub struct FnSink<F>
where
    F: FnMut(GenerateEvent),
{
    f: F,
}

impl<F> FnSink<F>
where
    F: FnMut(GenerateEvent),
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> EventSink for FnSink<F>
where
    F: FnMut(GenerateEvent),
{
    #[inline]
    fn send(&mut self, event: GenerateEvent) {
        (self.f)(event);
    }
}

/// An event sink that collects all events in a `Vec`.
#[derive(Default)]
pub struct VecSink {
    events: Vec<GenerateEvent>,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_inner(self) -> Vec<GenerateEvent> {
        self.events
    }

    pub fn as_slice(&self) -> &[GenerateEvent] {
        &self.events
    }

    pub fn count(&self, kind: GenerateEventKind) -> usize {
        self.events.iter().filter(|e| e.kind() == kind).count()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl EventSink for VecSink {
    #[inline]
    fn send(&mut self, event: GenerateEvent) {
        self.events.push(event);
    }
}

/// Fan-out sink that forwards each event to all contained sinks.
pub struct MultiSink<S: EventSink> {
    sinks: Vec<S>,
}

impl<S: EventSink> MultiSink<S> {
    pub fn with_sinks(sinks: Vec<S>) -> Self {
        Self { sinks }
    }

    pub fn sinks(&self) -> &[S] {
        &self.sinks
    }
}

impl<S: EventSink> EventSink for MultiSink<S> {
    fn send(&mut self, event: GenerateEvent) {
        let Some((last, rest)) = self.sinks.split_last_mut() else {
            return;
        };
        for sink in rest {
            if sink.wants(event.kind()) {
                sink.send(event.clone());
            }
        }
        if last.wants(event.kind()) {
            last.send(event);
        }
    }

    fn wants(&self, kind: GenerateEventKind) -> bool {
        self.sinks.iter().any(|s| s.wants(kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn warning(context: &str) -> GenerateEvent {
        GenerateEvent::Warning {
            context: context.into(),
            message: "m".into(),
        }
    }

    #[test]
    fn vec_sink_collects_events() {
        let mut sink = VecSink::new();
        assert!(sink.is_empty());
        sink.send_many([warning("a"), warning("b")]);
        assert_eq!(sink.len(), 2);
        assert_eq!(sink.count(GenerateEventKind::Warning), 2);
    }

    #[test]
    fn multi_sink_fans_out_events() {
        let mut multi = MultiSink::with_sinks(vec![VecSink::new(), VecSink::new()]);
        multi.send(warning("ctx"));
        assert_eq!(multi.sinks()[0].len(), 1);
        assert_eq!(multi.sinks()[1].len(), 1);
    }

    #[test]
    fn fn_sink_forwards_to_closure() {
        let mut seen = Vec::new();
        {
            let mut sink = FnSink::new(|e: GenerateEvent| seen.push(e.kind()));
            sink.send(GenerateEvent::BatchStarted { shapes: 1, threads: 1 });
        }
        assert_eq!(seen, vec![GenerateEventKind::BatchStarted]);
    }

    #[test]
    fn unit_sink_wants_nothing() {
        assert!(!().wants(GenerateEventKind::Warning));
    }
}
