//! The two caches behind classification.
//!
//! - [`SymbolCache`]: symbol identity → outcome. Holds symbols weakly, so an
//!   entry never keeps a host symbol alive; dead entries are reaped or evicted.
//! - [`TagCache`]: canonical pattern → materialized tag. Held strongly; tags
//!   are few and expensive to build.
//!
//! Both are sharded concurrent maps, so population and eviction lock one
//! shard at a time.

use crate::tag::{ResolvedTag, TagMaterializer};
use dashmap::DashMap;
use rule_config::TagSpec;
use rustc_hash::FxBuildHasher;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use tracing::trace;

/// Result of classifying one symbol. `None` is the cached "no match".
pub type Outcome = Option<Arc<ResolvedTag>>;

/// Number of inserts between opportunistic sweeps of dead symbol entries.
const REAP_INTERVAL: usize = 4096;

struct SymbolEntry<S> {
    symbol: Weak<S>,
    outcome: Outcome,
}

/// Per-symbol outcome cache keyed by the address of the host's `Arc`.
///
/// An address can be reused after the host drops a symbol, so a hit only
/// counts while the entry's weak handle is still alive.
pub struct SymbolCache<S> {
    entries: DashMap<usize, SymbolEntry<S>, FxBuildHasher>,
    inserts_since_reap: AtomicUsize,
}

impl<S> SymbolCache<S> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::with_hasher(FxBuildHasher),
            inserts_since_reap: AtomicUsize::new(0),
        }
    }

    fn key(symbol: &Arc<S>) -> usize {
        Arc::as_ptr(symbol) as *const () as usize
    }

    pub fn get(&self, symbol: &Arc<S>) -> Option<Outcome> {
        let entry = self.entries.get(&Self::key(symbol))?;
        if entry.symbol.strong_count() == 0 {
            return None;
        }
        Some(entry.outcome.clone())
    }

    pub fn insert(&self, symbol: &Arc<S>, outcome: Outcome) {
        self.entries.insert(
            Self::key(symbol),
            SymbolEntry {
                symbol: Arc::downgrade(symbol),
                outcome,
            },
        );

        if self.inserts_since_reap.fetch_add(1, Ordering::Relaxed) + 1 >= REAP_INTERVAL {
            self.inserts_since_reap.store(0, Ordering::Relaxed);
            self.reap();
        }
    }

    /// Drops the entry for `symbol`. Returns whether one existed.
    pub fn evict(&self, symbol: &Arc<S>) -> bool {
        self.entries.remove(&Self::key(symbol)).is_some()
    }

    /// Drops entries whose symbol the host has released. Returns how many.
    pub fn reap(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.symbol.strong_count() > 0);
        let reaped = before.saturating_sub(self.entries.len());
        if reaped > 0 {
            trace!("Reaped {} released symbol(s) from the symbol cache", reaped);
        }
        reaped
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S> Default for SymbolCache<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Materialized tags keyed by canonical pattern.
#[derive(Default)]
pub struct TagCache {
    tags: DashMap<Arc<str>, Arc<ResolvedTag>, FxBuildHasher>,
}

impl TagCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the tag for `spec`, materializing it on first use.
    ///
    /// Concurrent first requests for one pattern converge on a single
    /// materialization: the shard stays locked while `materializer` runs.
    /// `on_materialize` is called once per actual materialization.
    pub fn get_or_materialize(
        &self,
        spec: &TagSpec,
        materializer: &dyn TagMaterializer,
        on_materialize: impl FnOnce(),
    ) -> Arc<ResolvedTag> {
        if let Some(tag) = self.tags.get(spec.pattern.as_str()) {
            return Arc::clone(&tag);
        }

        let tag = self
            .tags
            .entry(Arc::clone(spec.pattern.as_arc()))
            .or_insert_with(|| {
                on_materialize();
                Arc::new(materializer.materialize(spec))
            });
        Arc::clone(&tag)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}
