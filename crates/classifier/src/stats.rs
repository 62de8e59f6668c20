use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Running counters shared by every snapshot of one engine.
#[derive(Debug, Default)]
pub(crate) struct EngineCounters {
    symbol_hits: AtomicU64,
    symbol_misses: AtomicU64,
    resolver_calls: AtomicU64,
    tags_materialized: AtomicU64,
}

impl EngineCounters {
    pub(crate) fn record_hit(&self) {
        self.symbol_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.symbol_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_resolver_call(&self) {
        self.resolver_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_materialization(&self) {
        self.tags_materialized.fetch_add(1, Ordering::Relaxed);
    }
}

/// Point-in-time view of the engine's caches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub generation: u64,
    pub symbol_hits: u64,
    pub symbol_misses: u64,
    pub resolver_calls: u64,
    pub tags_materialized: u64,
    /// Symbol entries in the current snapshot, including not yet reaped ones
    pub symbol_entries: usize,
    pub tag_entries: usize,
}

impl CacheStats {
    pub(crate) fn capture(
        counters: &EngineCounters,
        generation: u64,
        symbol_entries: usize,
        tag_entries: usize,
    ) -> Self {
        Self {
            generation,
            symbol_hits: counters.symbol_hits.load(Ordering::Relaxed),
            symbol_misses: counters.symbol_misses.load(Ordering::Relaxed),
            resolver_calls: counters.resolver_calls.load(Ordering::Relaxed),
            tags_materialized: counters.tags_materialized.load(Ordering::Relaxed),
            symbol_entries,
            tag_entries,
        }
    }
}
