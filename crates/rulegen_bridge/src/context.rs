//! Shared engine context and cancellation flag.
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::attributes::cache::{StringCaches, DEFAULT_CAPACITY};
use crate::engine::{
    InitialShape, InitialShapeSpec, OcclusionSet, ResolveMap, RuleEngine, Status,
};

/// Engine handle, worker count and shared caches.
///
/// Constructed once by the caller and passed by reference to every component
/// that talks to the engine.
pub struct EngineContext {
    engine: Arc<dyn RuleEngine>,
    workers: usize,
    caches: StringCaches,
    resolve_maps: Mutex<HashMap<PathBuf, Arc<ResolveMap>>>,
}

impl EngineContext {
    /// Uses every logical CPU as worker.
    pub fn new(engine: Arc<dyn RuleEngine>) -> Self {
        Self {
            engine,
            workers: num_cpus::get().max(1),
            caches: StringCaches::new(DEFAULT_CAPACITY),
            resolve_maps: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.caches = StringCaches::new(capacity);
        self
    }

    pub fn engine(&self) -> &Arc<dyn RuleEngine> {
        &self.engine
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn caches(&self) -> &StringCaches {
        &self.caches
    }

    /// Resolves a rule package, reusing maps resolved earlier for the same path.
    pub fn resolve_package(&self, package: &Path) -> Result<Arc<ResolveMap>, Status> {
        if let Some(map) = self.resolve_maps.lock().get(package) {
            return Ok(map.clone());
        }
        let map = self.engine.resolve_package(package)?;
        debug!("resolved package '{}' ({} entries)", package.display(), map.len());
        self.resolve_maps
            .lock()
            .insert(package.to_path_buf(), map.clone());
        Ok(map)
    }

    /// Forgets all cached resolve maps, e.g. after a package changed on disk.
    pub fn invalidate_packages(&self) {
        self.resolve_maps.lock().clear();
    }

    /// Creates an engine initial shape and wraps it in an owned handle.
    pub fn create_initial_shape(
        &self,
        spec: &InitialShapeSpec<'_>,
        group: usize,
    ) -> Result<InitialShape, Status> {
        let token = self.engine.create_initial_shape(spec)?;
        Ok(InitialShape::new(self.engine.clone(), token, group, spec.name))
    }

    pub fn create_occlusion_set(&self) -> Result<OcclusionSet, Status> {
        self.engine.create_occlusion_set().map(OcclusionSet::new)
    }
}

/// Cooperative cancellation token, polled from the engine progress callback.
#[derive(Clone, Debug, Default)]
pub struct InterruptFlag(Arc<AtomicBool>);

impl InterruptFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interrupt(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_interrupted(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeEngine;

    #[test]
    fn resolve_maps_are_cached_per_package() {
        let fake = Arc::new(FakeEngine::new());
        let ctx = EngineContext::new(fake.clone());
        let a = ctx.resolve_package(Path::new("a.rpk")).expect("resolve");
        let b = ctx.resolve_package(Path::new("a.rpk")).expect("resolve");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(fake.resolves(), 1);

        ctx.invalidate_packages();
        ctx.resolve_package(Path::new("a.rpk")).expect("resolve");
        assert_eq!(fake.resolves(), 2);
    }

    #[test]
    fn failed_resolve_is_not_cached() {
        let fake = Arc::new(FakeEngine::new().with_missing_package("gone.rpk"));
        let ctx = EngineContext::new(fake.clone());
        assert_eq!(
            ctx.resolve_package(Path::new("gone.rpk")).expect_err("missing"),
            Status::ResolveMapError
        );
        assert!(ctx.resolve_package(Path::new("gone.rpk")).is_err());
        assert_eq!(fake.resolves(), 2);
    }

    #[test]
    fn interrupt_flag_is_shared_between_clones() {
        let flag = InterruptFlag::new();
        let other = flag.clone();
        other.interrupt();
        assert!(flag.is_interrupted());
        flag.reset();
        assert!(!other.is_interrupted());
    }

    #[test]
    fn workers_never_zero() {
        let ctx = EngineContext::new(Arc::new(FakeEngine::new())).with_workers(0);
        assert_eq!(ctx.workers(), 1);
    }
}
