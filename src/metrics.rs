//! Lock-free load and cache counters.
//!
//! Counters accumulate for the process lifetime; `snapshot()` derives the
//! rates. All updates use relaxed atomics, so a snapshot taken mid-load may be
//! off by one between related counters.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide cache and load counters
#[derive(Debug, Default)]
pub struct LoaderMetrics {
    batch_queries: AtomicU64,
    fallback_queries: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    successful_loads: AtomicU64,
    failed_loads: AtomicU64,
    /// Cumulative wall time of successful loads, for the running average
    total_load_time_us: AtomicU64,
    memory_usage_bytes: AtomicU64,
}

/// Point-in-time view of [`LoaderMetrics`] with derived rates
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub batch_queries: u64,
    pub fallback_queries: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub successful_loads: u64,
    pub failed_loads: u64,
    pub average_load_time_ms: f64,
    pub cache_hit_rate: f64,
    pub error_rate: f64,
    pub memory_usage_bytes: u64,
}

impl LoaderMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_batch_query(&self) {
        self.batch_queries.fetch_add(1, Ordering::Relaxed);
    }

    /// Record `count` fallback queries (one listing plus one per item)
    pub fn record_fallback_queries(&self, count: u64) {
        self.fallback_queries.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_success(&self, load_time_us: u64) {
        self.successful_loads.fetch_add(1, Ordering::Relaxed);
        self.total_load_time_us
            .fetch_add(load_time_us, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failed_loads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_memory_usage(&self, bytes: u64) {
        self.memory_usage_bytes.store(bytes, Ordering::Relaxed);
    }

    pub fn memory_usage(&self) -> u64 {
        self.memory_usage_bytes.load(Ordering::Relaxed)
    }

    /// Hit rate over all lookups so far (0.0 when no traffic)
    pub fn cache_hit_rate(&self) -> f64 {
        let hits = self.cache_hits.load(Ordering::Relaxed);
        let misses = self.cache_misses.load(Ordering::Relaxed);
        ratio(hits, hits + misses)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let successful = self.successful_loads.load(Ordering::Relaxed);
        let failed = self.failed_loads.load(Ordering::Relaxed);
        let hits = self.cache_hits.load(Ordering::Relaxed);
        let misses = self.cache_misses.load(Ordering::Relaxed);
        let total_us = self.total_load_time_us.load(Ordering::Relaxed);
        MetricsSnapshot {
            batch_queries: self.batch_queries.load(Ordering::Relaxed),
            fallback_queries: self.fallback_queries.load(Ordering::Relaxed),
            cache_hits: hits,
            cache_misses: misses,
            successful_loads: successful,
            failed_loads: failed,
            average_load_time_ms: if successful == 0 {
                0.0
            } else {
                total_us as f64 / successful as f64 / 1000.0
            },
            cache_hit_rate: ratio(hits, hits + misses),
            error_rate: ratio(failed, successful + failed),
            memory_usage_bytes: self.memory_usage_bytes.load(Ordering::Relaxed),
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn ratio(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}
