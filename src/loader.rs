//! Evidence Loader
//!
//! Orchestrates the batch path, fallback path, cache store, circuit breaker,
//! and metrics behind one `load(parent_key)` call. Concurrent loads for the
//! same parent key are coalesced: the second caller awaits the in-flight load
//! and serves the freshly cached result instead of issuing a duplicate query.

use crate::circuit::CircuitTracker;
use crate::config::CacheConfig;
use crate::error::LoadError;
use crate::estimate;
use crate::health::HealthReport;
use crate::locks::KeyLockManager;
use crate::metrics::{LoaderMetrics, MetricsSnapshot};
use crate::source::{BatchSource, FallbackSource};
use crate::store::EvidenceStore;
use crate::supervisor::RecoverySupervisor;
use crate::types::{BatchRow, ChecklistItem, EvidenceRecord, ItemSet};
use futures::stream::{self, StreamExt};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Which path produced a load result
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadSource {
    Cache,
    Batch,
    Fallback,
}

/// Outcome of a successful load
#[derive(Debug, Clone)]
pub struct LoadResult {
    pub items: ItemSet,
    pub source: LoadSource,
    pub load_time_ms: f64,
    /// Data-source round trips this load issued (0 for a cache hit)
    pub query_count: u32,
    pub cache_hit_rate: f64,
    pub memory_usage_bytes: u64,
}

/// Batched, circuit-breaking, size-bounded evidence cache.
///
/// Constructed once per process with injected configuration and data sources;
/// shared by reference (wrap in `Arc`) among consumers.
pub struct EvidenceLoader {
    config: CacheConfig,
    batch: Arc<dyn BatchSource>,
    fallback: Arc<dyn FallbackSource>,
    store: RwLock<EvidenceStore>,
    circuit: Mutex<CircuitTracker>,
    metrics: LoaderMetrics,
    key_locks: KeyLockManager,
    supervisor: RecoverySupervisor,
}

impl EvidenceLoader {
    pub fn new(
        config: CacheConfig,
        batch: Arc<dyn BatchSource>,
        fallback: Arc<dyn FallbackSource>,
    ) -> Self {
        let supervisor = RecoverySupervisor::new(config.recovery_backoff.clone());
        Self {
            store: RwLock::new(EvidenceStore::new(config.max_cache_size)),
            circuit: Mutex::new(CircuitTracker::new(config.fallback_threshold)),
            metrics: LoaderMetrics::new(),
            key_locks: KeyLockManager::new(),
            supervisor,
            config,
            batch,
            fallback,
        }
    }

    /// Load all checklist items and evidence for a parent key.
    ///
    /// Serves from cache when possible; otherwise issues one batch query, or
    /// the per-item fallback when the key's circuit is open or the supervisor
    /// has degraded the fast path. `force_reload` bypasses the cache check but
    /// still participates in caching and circuit accounting.
    pub async fn load(
        &self,
        parent_key: &str,
        force_reload: bool,
    ) -> Result<LoadResult, LoadError> {
        let start = Instant::now();

        if !force_reload {
            if let Some(result) = self.try_cache_hit(parent_key, start) {
                return Ok(result);
            }
        }

        // Coalesce concurrent loads: waiters queue on the key lock, then find
        // the cache populated by whoever held it first
        let lock = self.key_locks.get_lock(parent_key);
        let result = {
            let _guard = lock.lock().await;
            self.load_uncached(parent_key, force_reload, start).await
        };
        // Drop this call's handle first so a key with no other loads in
        // flight leaves no lock entry behind
        drop(lock);
        self.key_locks.release(parent_key);
        result
    }

    /// Slow path of [`load`](Self::load), run while holding the key lock
    async fn load_uncached(
        &self,
        parent_key: &str,
        force_reload: bool,
        start: Instant,
    ) -> Result<LoadResult, LoadError> {
        if !force_reload {
            if let Some(result) = self.try_cache_hit(parent_key, start) {
                return Ok(result);
            }
        }
        self.metrics.record_miss();

        let circuit_open = self.circuit.lock().is_fallback_open(parent_key);
        if circuit_open || self.supervisor.is_degraded() {
            debug!(
                parent_key = %parent_key,
                circuit_open,
                supervisor_degraded = self.supervisor.is_degraded(),
                "Batch path suspended, loading via fallback"
            );
            return self.load_via_fallback(parent_key, start, 0).await;
        }

        self.metrics.record_batch_query();
        let rows = match self.batch.fetch_rows(parent_key).await {
            Ok(rows) => rows,
            Err(source) => {
                let state = self.circuit.lock().record_failure(parent_key);
                self.metrics.record_failure();
                warn!(
                    parent_key = %parent_key,
                    error = %source,
                    consecutive_failures = state.consecutive_failures,
                    "Batch query failed, retrying via fallback"
                );
                // Immediate one-shot fallback retry rather than failing the
                // caller; a fallback success closes the key's circuit again
                return self.load_via_fallback(parent_key, start, 1).await;
            }
        };

        match group_rows(parent_key, rows) {
            Ok(items) => Ok(self.commit(parent_key, items, LoadSource::Batch, 1, start)),
            Err(err) => {
                // A grouping failure is a projection bug, not a per-key data
                // problem: degrade the fast path globally
                error!(parent_key = %parent_key, error = %err, "Malformed batch rows");
                self.supervisor.record_crash();
                self.metrics.record_failure();
                self.load_via_fallback(parent_key, start, 1).await
            }
        }
    }

    /// Pure cache read of one checklist item; never touches a data source
    pub fn item(&self, parent_key: &str, item_id: &str) -> Option<ChecklistItem> {
        self.store
            .read()
            .get(parent_key)
            .and_then(|set| set.get(item_id))
            .cloned()
    }

    /// Pure cache read of the full item set for a parent key
    pub fn cached(&self, parent_key: &str) -> Option<ItemSet> {
        self.store.read().get(parent_key).cloned()
    }

    /// Drop the cache entry for one parent key
    pub fn invalidate(&self, parent_key: &str) {
        let memory = {
            let mut store = self.store.write();
            store.evict(parent_key);
            estimate::estimate_store(&store)
        };
        self.metrics.set_memory_usage(memory);
        self.key_locks.release(parent_key);
        debug!(parent_key = %parent_key, "Invalidated cache entry");
    }

    /// Drop every cache entry
    pub fn invalidate_all(&self) {
        self.store.write().clear();
        self.metrics.set_memory_usage(0);
        info!("Invalidated all cache entries");
    }

    /// Explicitly clear circuit-breaker state for one parent key
    pub fn reset_circuit(&self, parent_key: &str) {
        self.circuit.lock().reset(parent_key);
    }

    /// Whether the fallback path is forced for a key right now
    pub fn is_fallback_open(&self, parent_key: &str) -> bool {
        self.circuit.lock().is_fallback_open(parent_key)
    }

    /// Report an unhandled crash in a downstream consumer of this cache.
    ///
    /// Flips the supervisor into degraded mode: every key is served through
    /// the fallback path until the recovery backoff elapses.
    pub fn report_consumer_crash(&self) {
        self.supervisor.record_crash();
    }

    /// Whether the supervisor currently has the fast path suspended
    pub fn is_degraded(&self) -> bool {
        self.supervisor.is_degraded()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn health(&self) -> HealthReport {
        HealthReport::derive(
            &self.metrics.snapshot(),
            self.supervisor.is_degraded(),
            self.supervisor.at_max_backoff(),
        )
    }

    /// Cancel pending supervisor timers; call before process exit
    pub fn shutdown(&self) {
        self.supervisor.shutdown();
    }

    fn try_cache_hit(&self, parent_key: &str, start: Instant) -> Option<LoadResult> {
        let items = self.store.read().get(parent_key).cloned()?;
        self.metrics.record_hit();
        debug!(parent_key = %parent_key, items = items.len(), "Cache hit");
        Some(LoadResult {
            items,
            source: LoadSource::Cache,
            load_time_ms: start.elapsed().as_secs_f64() * 1000.0,
            query_count: 0,
            cache_hit_rate: self.metrics.cache_hit_rate(),
            memory_usage_bytes: self.metrics.memory_usage(),
        })
    }

    /// Degraded N+1 load: one listing query plus one evidence query per item.
    ///
    /// A failed per-item evidence query yields zero evidence for that item
    /// rather than failing the whole load. The circuit counts one failure per
    /// failed load attempt: when this runs as a retry after a batch failure
    /// (`failed_batch_queries > 0`), that failure has already been recorded,
    /// and the wasted batch round trips still show up in the result's
    /// `query_count`.
    async fn load_via_fallback(
        &self,
        parent_key: &str,
        start: Instant,
        failed_batch_queries: u32,
    ) -> Result<LoadResult, LoadError> {
        let batch_already_failed = failed_batch_queries > 0;
        let stubs = match self.fallback.list_items(parent_key).await {
            Ok(stubs) => stubs,
            Err(source) => {
                self.metrics.record_fallback_queries(1);
                if !batch_already_failed {
                    self.circuit.lock().record_failure(parent_key);
                    self.metrics.record_failure();
                }
                warn!(parent_key = %parent_key, error = %source, "Fallback listing query failed");
                return Err(LoadError::FallbackFailed {
                    parent_key: parent_key.to_string(),
                    source,
                });
            }
        };

        let fallback_queries = 1 + stubs.len() as u32;
        let query_count = failed_batch_queries + fallback_queries;
        let concurrency = self.config.fallback_concurrency.max(1);
        let gathered: Vec<(crate::types::ChecklistItemStub, Vec<EvidenceRecord>)> =
            stream::iter(stubs.into_iter().map(|stub| {
                let fallback = Arc::clone(&self.fallback);
                async move {
                    let evidence = match fallback.list_evidence(&stub.id).await {
                        Ok(evidence) => evidence,
                        Err(err) => {
                            warn!(
                                item_id = %stub.id,
                                error = %err,
                                "Evidence query failed during fallback, recording zero evidence"
                            );
                            Vec::new()
                        }
                    };
                    (stub, evidence)
                }
            }))
            .buffer_unordered(concurrency)
            .collect()
            .await;
        self.metrics.record_fallback_queries(fallback_queries as u64);

        let mut items = ItemSet::new();
        for (stub, evidence) in gathered {
            let mut item = stub.into_item();
            for record in evidence {
                item.evidence.insert(record.id.clone(), record);
            }
            items.insert(item.id.clone(), item);
        }

        Ok(self.commit(parent_key, items, LoadSource::Fallback, query_count, start))
    }

    /// Store a freshly assembled item set and close the books on the load.
    ///
    /// The put (including any eviction) happens under one write-lock hold, so
    /// readers never observe a partially applied load.
    fn commit(
        &self,
        parent_key: &str,
        items: ItemSet,
        source: LoadSource,
        query_count: u32,
        start: Instant,
    ) -> LoadResult {
        let memory = {
            let mut store = self.store.write();
            store.put(parent_key, items.clone());
            estimate::estimate_store(&store)
        };
        self.metrics.set_memory_usage(memory);
        self.circuit.lock().record_success(parent_key);

        let elapsed = start.elapsed();
        self.metrics.record_success(elapsed.as_micros() as u64);
        info!(
            parent_key = %parent_key,
            source = ?source,
            items = items.len(),
            query_count,
            duration_ms = elapsed.as_millis() as u64,
            "Load completed"
        );

        LoadResult {
            items,
            source,
            load_time_ms: elapsed.as_secs_f64() * 1000.0,
            query_count,
            cache_hit_rate: self.metrics.cache_hit_rate(),
            memory_usage_bytes: memory,
        }
    }
}

/// Fold joined batch rows into checklist items.
///
/// Rows sharing an item id become one item; each row with evidence columns
/// contributes one evidence record. Evidence columns must be all present or
/// all absent per row.
pub(crate) fn group_rows(parent_key: &str, rows: Vec<BatchRow>) -> Result<ItemSet, LoadError> {
    let mut items = ItemSet::new();
    for row in rows {
        let item = items
            .entry(row.item_id.clone())
            .or_insert_with(|| ChecklistItem {
                id: row.item_id.clone(),
                label: row.item_label.clone(),
                status: row.item_status.clone(),
                created_at: row.item_created_at,
                evidence: Default::default(),
            });

        match (
            row.evidence_id,
            row.evidence_kind,
            row.evidence_locator,
            row.evidence_created_at,
        ) {
            (Some(id), Some(kind), Some(locator), Some(created_at)) => {
                item.evidence.insert(
                    id.clone(),
                    EvidenceRecord {
                        id,
                        item_id: row.item_id,
                        kind,
                        locator,
                        created_at,
                        size_bytes: row.evidence_size_bytes,
                        metadata: Default::default(),
                    },
                );
            }
            (None, None, None, None) => {
                // Item with no evidence yet
            }
            _ => {
                return Err(LoadError::MalformedRow {
                    parent_key: parent_key.to_string(),
                    item_id: row.item_id,
                });
            }
        }
    }
    Ok(items)
}
