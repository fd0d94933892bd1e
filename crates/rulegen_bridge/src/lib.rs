#![forbid(unsafe_code)]
//! rulegen_bridge: Marshalling and batched dispatch between host polygon meshes and a procedural rule engine.
//!
//! Modules:
//! - mesh: host polygon mesh with typed primitive attributes, vertex attributes and groups
//! - attributes: rule attribute values, host/engine marshalling, name conversion and caches
//! - engine: the rule engine boundary (trait, status codes, owned shape and occlusion handles)
//! - shape: primitive partitioning, initial shape construction, default rule attribute evaluation, attribute write-back
//! - generate: parallel batch generation, result conversion, events and the end-to-end pipeline
pub mod attributes;
pub mod context;
pub mod engine;
pub mod error;
pub mod generate;
pub mod mesh;
pub mod shape;

#[cfg(test)]
pub(crate) mod testing;

/// Convenient re-exports for common types. Import with `use rulegen_bridge::prelude::*;`.
pub mod prelude {
    pub use crate::attributes::cache::{CacheStats, LockedLruCache, LruCache, StringCaches};
    pub use crate::attributes::from_host::FromHost;
    pub use crate::attributes::to_host::{ArrayHandling, DefaultWritePolicy, ToHost};
    pub use crate::attributes::{AttributeMap, AttributeMapBuilder, AttributeValue, ValueType};
    pub use crate::context::{EngineContext, InterruptFlag};
    pub use crate::engine::{
        Continuation, EncoderSpec, ErrorLevel, GenerateCallbacks, GenerateOptions, GeneratedShape,
        GeneratedUvSet, GeometryDescriptor, InitialShape, InitialShapeSpec, OcclusionHandle,
        OcclusionSet, OcclusionStore, ResolveMap, RuleEngine, ShapeToken, Status, UvSet,
    };
    pub use crate::error::{Error, Result};
    pub use crate::generate::{
        assign_mesh, generate_mesh, thread_ranges, AssignReport, BatchGenerator, BatchReport,
        EventSink, FnSink, GenerateConfig, GenerateEvent, GenerateEventKind, GenerateReport,
        MeshGenerator, MultiSink, ResultConverter, VecSink,
    };
    pub use crate::mesh::{Attribute, BlockValue, HostElement, Layout, Mesh, Primitive, Storage};
    pub use crate::shape::{
        assign_main_attributes, assign_rule_attributes, evaluate_default_rule_attributes,
        Classifier, ClassifierType, GroupNaming, MainAttributes, PrimitivePartition, ShapeBuilder,
        ShapeData, ShapeDefaults,
    };
}
