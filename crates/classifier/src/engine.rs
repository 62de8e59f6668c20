//! The classification engine.
//!
//! The active rule set and both caches form one versioned [`Snapshot`]. Each
//! request clones the current snapshot handle and works against it start to
//! finish; `install` and `invalidate_all` swap in a fresh snapshot. A request
//! that began before a swap may finish with the old rules, but it can only
//! write into the old snapshot's caches, which nothing reads any more.

use crate::cache::{Outcome, SymbolCache, TagCache};
use crate::errors::Result;
use crate::matcher::find_matching_rule;
use crate::resolver::TypeResolver;
use crate::stats::{CacheStats, EngineCounters};
use crate::tag::{AttributeKeyMaterializer, ResolvedTag, TagMaterializer};
use parking_lot::RwLock;
use rule_config::{Rule, RuleEntry, RuleSet, ScopeFlags, ScopeKind};
use std::sync::Arc;
use tracing::{debug, trace};

struct Snapshot<S> {
    generation: u64,
    rule_set: Arc<RuleSet>,
    array_fallback: Option<Rule>,
    tags: TagCache,
    symbols: SymbolCache<S>,
}

impl<S> Snapshot<S> {
    fn new(generation: u64, rule_set: Arc<RuleSet>) -> Self {
        let array_fallback = rule_set.array_fallback().cloned();
        Self {
            generation,
            rule_set,
            array_fallback,
            tags: TagCache::new(),
            symbols: SymbolCache::new(),
        }
    }
}

pub struct ClassificationEngine<R: TypeResolver> {
    resolver: R,
    materializer: Arc<dyn TagMaterializer>,
    snapshot: RwLock<Arc<Snapshot<R::Symbol>>>,
    counters: EngineCounters,
}

impl<R: TypeResolver> ClassificationEngine<R> {
    /// An engine with an empty rule set that materializes tags with
    /// [`AttributeKeyMaterializer`].
    pub fn new(resolver: R) -> Self {
        Self::with_materializer(resolver, Arc::new(AttributeKeyMaterializer))
    }

    pub fn with_materializer(resolver: R, materializer: Arc<dyn TagMaterializer>) -> Self {
        Self {
            resolver,
            materializer,
            snapshot: RwLock::new(Arc::new(Snapshot::new(0, Arc::new(RuleSet::empty())))),
            counters: EngineCounters::default(),
        }
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    fn current(&self) -> Arc<Snapshot<R::Symbol>> {
        Arc::clone(&self.snapshot.read())
    }

    /// Classifies `symbol` as a site of `kind`.
    ///
    /// Returns `None` when the kind is switched off, the symbol is the
    /// implicit receiver, its type is unknown, or no rule matches.
    pub fn classify(&self, symbol: &Arc<R::Symbol>, kind: ScopeKind) -> Option<Arc<ResolvedTag>> {
        let snapshot = self.current();

        if !snapshot.rule_set.flags().allows(kind) {
            return None;
        }
        if self.resolver.is_receiver(symbol) {
            return None;
        }

        if let Some(outcome) = snapshot.symbols.get(symbol) {
            self.counters.record_hit();
            trace!(
                "Symbol cache hit in generation {}: {}",
                snapshot.generation,
                describe(&outcome)
            );
            return outcome;
        }

        self.counters.record_miss();
        let outcome = self.resolve(&snapshot, symbol);
        snapshot.symbols.insert(symbol, outcome.clone());
        outcome
    }

    fn resolve(&self, snapshot: &Snapshot<R::Symbol>, symbol: &R::Symbol) -> Outcome {
        self.counters.record_resolver_call();
        let union = self.resolver.type_of(symbol);
        if union.is_empty() {
            trace!("Resolver returned no type; symbol left unclassified");
            return None;
        }

        let rule = find_matching_rule(
            &union,
            snapshot.rule_set.rules(),
            snapshot.array_fallback.as_ref(),
            &self.resolver,
        )?;

        Some(snapshot.tags.get_or_materialize(
            &rule.tag,
            self.materializer.as_ref(),
            || self.counters.record_materialization(),
        ))
    }

    /// Validates `candidates` and makes them the active rule set.
    ///
    /// Fails without touching the active rule set if any non-blank pattern is
    /// malformed. Returns the new generation.
    pub fn apply(&self, candidates: &[RuleEntry], flags: ScopeFlags) -> Result<u64> {
        let rule_set = RuleSet::validate(candidates, flags)?;
        Ok(self.install(rule_set))
    }

    /// Swaps in an already validated rule set together with empty caches.
    pub fn install(&self, rule_set: RuleSet) -> u64 {
        let rule_count = rule_set.len();
        let generation = self.swap(|_| Arc::new(rule_set));
        debug!(
            "Installed rule set with {} rule(s) as generation {}",
            rule_count, generation
        );
        generation
    }

    /// Drops every cached outcome and tag, keeping the active rule set.
    pub fn invalidate_all(&self) -> u64 {
        let generation = self.swap(|current| Arc::clone(&current.rule_set));
        debug!("Invalidated classification caches; now generation {}", generation);
        generation
    }

    fn swap(&self, next_rules: impl FnOnce(&Snapshot<R::Symbol>) -> Arc<RuleSet>) -> u64 {
        let mut current = self.snapshot.write();
        let generation = current.generation + 1;
        let rule_set = next_rules(&current);
        *current = Arc::new(Snapshot::new(generation, rule_set));
        generation
    }

    pub fn active_rule_set(&self) -> Arc<RuleSet> {
        Arc::clone(&self.current().rule_set)
    }

    pub fn generation(&self) -> u64 {
        self.current().generation
    }

    /// Forgets the cached outcome for a symbol the host is discarding.
    pub fn evict(&self, symbol: &Arc<R::Symbol>) -> bool {
        self.current().symbols.evict(symbol)
    }

    /// Sweeps entries for symbols the host has already released.
    pub fn reap(&self) -> usize {
        self.current().symbols.reap()
    }

    pub fn stats(&self) -> CacheStats {
        let snapshot = self.current();
        CacheStats::capture(
            &self.counters,
            snapshot.generation,
            snapshot.symbols.len(),
            snapshot.tags.len(),
        )
    }
}

fn describe(outcome: &Outcome) -> &str {
    outcome.as_deref().map_or("no match", |tag| tag.key.as_str())
}
