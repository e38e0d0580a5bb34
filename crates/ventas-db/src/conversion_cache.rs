//! # Conversion Graph Cache
//!
//! Keeps one built [`ConversionGraph`] per tenant and hands out
//! [`GraphHandle`]s for individual operations.
//!
//! ## Lookup
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  get_or_build("t1")                                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  stored generation (conversion_graph_versions)                         │
//! │       │                                                                 │
//! │       ├── cached entry with same generation ──► reuse Arc<Graph>        │
//! │       │                                                                 │
//! │       └── missing / stale ──► load edges ──► build ──► replace entry    │
//! │                                                                         │
//! │  Each call returns a fresh GraphHandle: its memo table lives only as   │
//! │  long as the operation that asked for it.                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Tenants never share entries: the key is the tenant id and the edges are
//! loaded with a tenant filter.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::error::DbResult;
use crate::repository::unit::UnitRepository;
use ventas_core::{ConversionGraph, GraphHandle};

#[derive(Debug, Clone)]
struct CachedGraph {
    generation: i64,
    graph: Arc<ConversionGraph>,
}

/// Process-wide cache of tenant conversion graphs.
#[derive(Debug, Default)]
pub struct ConversionGraphCache {
    entries: RwLock<HashMap<String, CachedGraph>>,
}

impl ConversionGraphCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a handle on the tenant's current graph, rebuilding it when
    /// the stored generation moved since it was cached.
    pub async fn get_or_build(&self, tenant_id: &str, pool: &SqlitePool) -> DbResult<GraphHandle> {
        let units = UnitRepository::new(pool.clone());
        let generation = units.graph_generation(tenant_id).await?;

        if let Some(graph) = self.lookup(tenant_id, generation) {
            debug!(tenant_id = %tenant_id, generation, "Conversion graph cache hit");
            return Ok(GraphHandle::new(tenant_id, generation, graph));
        }

        let edges = units.list_edges(tenant_id).await?;
        let graph = Arc::new(ConversionGraph::build(edges));

        if graph.skipped_edges() > 0 {
            warn!(
                tenant_id = %tenant_id,
                skipped = graph.skipped_edges(),
                "Ignored unusable conversion edges"
            );
        }

        info!(
            tenant_id = %tenant_id,
            generation,
            edges = graph.edge_count(),
            "Conversion graph built"
        );

        self.store(tenant_id, generation, Arc::clone(&graph));
        Ok(GraphHandle::new(tenant_id, generation, graph))
    }

    /// Drops a tenant's cached graph; the next lookup rebuilds it.
    pub fn invalidate(&self, tenant_id: &str) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if entries.remove(tenant_id).is_some() {
            debug!(tenant_id = %tenant_id, "Conversion graph invalidated");
        }
    }

    /// Generation of the cached graph, if any.
    pub fn cached_generation(&self, tenant_id: &str) -> Option<i64> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(tenant_id).map(|entry| entry.generation)
    }

    fn lookup(&self, tenant_id: &str, generation: i64) -> Option<Arc<ConversionGraph>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries
            .get(tenant_id)
            .filter(|entry| entry.generation == generation)
            .map(|entry| Arc::clone(&entry.graph))
    }

    fn store(&self, tenant_id: &str, generation: i64, graph: Arc<ConversionGraph>) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        match entries.get(tenant_id) {
            // A concurrent build already stored something newer
            Some(existing) if existing.generation > generation => {}
            _ => {
                entries.insert(tenant_id.to_string(), CachedGraph { generation, graph });
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
