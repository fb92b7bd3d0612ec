use crate::server::cache::ResultsCache;
use crate::server::config::ServerConfig;
use anyhow::Context;
use optipack::{Allocation, AllocationEngine, PacketCatalog};
use std::sync::Arc;

/// Shared application state: the live catalog, the engine (with its derived
/// residue tables), and a bounded cache of finished allocations. Cloning is
/// cheap; all clones observe the same catalog.
#[derive(Clone)]
pub struct AppState {
    catalog: Arc<PacketCatalog>,
    engine: Arc<AllocationEngine>,
    cache: Arc<ResultsCache>,
}

impl AppState {
    pub fn new(config: &ServerConfig) -> anyhow::Result<Self> {
        let catalog = PacketCatalog::new(config.sizes.iter().copied())
            .context("invalid initial packet sizes")?;
        Ok(Self {
            catalog: Arc::new(catalog),
            engine: Arc::new(AllocationEngine::new()),
            cache: Arc::new(ResultsCache::new(config.cache_capacity)),
        })
    }

    pub fn catalog(&self) -> &PacketCatalog {
        &self.catalog
    }

    /// Computes (or recalls) the allocation for `items` against the current
    /// catalog. The snapshot is taken once, so a concurrent replace never
    /// mixes into an in-flight calculation.
    pub fn calculate(&self, items: u64) -> optipack::Result<Arc<Allocation>> {
        let snapshot = self.catalog.snapshot();
        if let Some(hit) = self.cache.get(snapshot.version(), items) {
            tracing::debug!(items, version = snapshot.version(), "cache hit");
            return Ok(hit);
        }
        let allocation = Arc::new(self.engine.allocate(&snapshot, items)?);
        self.cache
            .insert(snapshot.version(), items, Arc::clone(&allocation));
        Ok(allocation)
    }
}
