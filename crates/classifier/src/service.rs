//! Engine, configuration scopes and event bus wired together.
//!
//! The service is what a host embeds: it loads both configuration scopes,
//! picks the active scheme, persists applied rules, and tells subscribers
//! when anything they rendered has gone stale.

use crate::engine::ClassificationEngine;
use crate::errors::{ClassifierError, Result};
use crate::resolver::TypeResolver;
use chrono::Utc;
use event_bus::{ApplyRejected, CachesInvalidated, ColorCastEvent, EventBus, RuleSetApplied};
use parking_lot::{Mutex, RwLock};
use rule_config::rules::unreadable_colors;
use rule_config::{
    ConfigStore, RuleEntry, RuleSet, RulesState, ScopeFlags, SchemeKind, resolve_active,
};
use std::sync::Arc;
use tracing::{info, warn};

pub struct ColorCastService<R: TypeResolver> {
    engine: ClassificationEngine<R>,
    default_store: Arc<dyn ConfigStore>,
    project_store: Option<Arc<dyn ConfigStore>>,
    event_bus: EventBus,
    active_kind: RwLock<SchemeKind>,
    // Serializes store writes with the install that follows them.
    mutation: Mutex<()>,
}

impl<R: TypeResolver> ColorCastService<R> {
    pub fn new(
        engine: ClassificationEngine<R>,
        default_store: Arc<dyn ConfigStore>,
        project_store: Option<Arc<dyn ConfigStore>>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            engine,
            default_store,
            project_store,
            event_bus,
            active_kind: RwLock::new(SchemeKind::Default),
            mutation: Mutex::new(()),
        }
    }

    pub fn engine(&self) -> &ClassificationEngine<R> {
        &self.engine
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Which scope the active rule set came from.
    pub fn active_kind(&self) -> SchemeKind {
        *self.active_kind.read()
    }

    /// Loads both scopes and installs the winning scheme's rules.
    ///
    /// Malformed persisted rules are skipped, not reported as errors.
    pub fn load(&self) -> Result<u64> {
        let _guard = self.mutation.lock();
        self.activate()
    }

    /// Validates `candidates`, persists them as the `target` scheme, selects
    /// that scheme and installs the resulting active rule set.
    ///
    /// On validation failure nothing is persisted and the active rule set is
    /// unchanged. If saving fails part way, the rules are reloaded from the
    /// stores before the error is returned.
    pub fn apply(
        &self,
        target: SchemeKind,
        candidates: &[RuleEntry],
        flags: ScopeFlags,
    ) -> Result<u64> {
        let _guard = self.mutation.lock();

        let rule_set = match RuleSet::validate(candidates, flags) {
            Ok(rule_set) => rule_set,
            Err(err) => {
                let invalid_patterns = err.invalid_patterns().map(<[String]>::to_vec);
                warn!("Rejected rules for scheme {}: {}", target, err);
                self.event_bus
                    .send(&ColorCastEvent::ApplyRejected(ApplyRejected {
                        scheme: target.name().to_string(),
                        invalid_patterns: invalid_patterns.unwrap_or_default(),
                        rejected_at: Utc::now(),
                    }));
                return Err(err.into());
            }
        };

        for problem in unreadable_colors(candidates) {
            warn!("{}; it will render as black", problem);
        }

        let store = self.store_for(target)?;
        if let Err(err) = self.persist(store, target, &rule_set) {
            // A partial write may already be on disk; reinstall whatever the
            // stores now hold so the engine matches them.
            warn!("Failed to persist scheme {}: {}", target, err);
            if let Err(resync) = self.activate() {
                warn!("Could not reload rules after failed save: {}", resync);
            }
            return Err(err);
        }

        self.activate()
    }

    fn persist(
        &self,
        store: &Arc<dyn ConfigStore>,
        target: SchemeKind,
        rule_set: &RuleSet,
    ) -> Result<()> {
        let mut document = store.load()?;
        document.set_rules(target, RulesState::from_rule_set(rule_set));
        document.set_current(Some(target));
        store.save(&document)?;

        // Selecting the default scheme hands precedence back from the project.
        if target == SchemeKind::Default
            && let Some(project_store) = &self.project_store
        {
            let mut project = project_store.load()?;
            if project.current.is_some() {
                project.set_current(None);
                project_store.save(&project)?;
            }
        }
        Ok(())
    }

    /// Restores an empty scheme with default flags in the `target` scope.
    pub fn reset_scheme(&self, target: SchemeKind) -> Result<u64> {
        self.apply(target, &[], ScopeFlags::default())
    }

    /// Drops cached classifications while keeping the rules, for when the
    /// host reloads a document or session.
    pub fn reset_scope(&self, reason: &str) -> u64 {
        let generation = self.engine.invalidate_all();
        self.event_bus
            .send(&ColorCastEvent::CachesInvalidated(CachesInvalidated {
                generation,
                reason: reason.to_string(),
                invalidated_at: Utc::now(),
            }));
        generation
    }

    fn store_for(&self, kind: SchemeKind) -> Result<&Arc<dyn ConfigStore>> {
        match kind {
            SchemeKind::Default => Ok(&self.default_store),
            SchemeKind::Project => self
                .project_store
                .as_ref()
                .ok_or(ClassifierError::ProjectScopeUnavailable),
        }
    }

    fn activate(&self) -> Result<u64> {
        let default = self.default_store.load()?;
        let project = self
            .project_store
            .as_ref()
            .map(|store| store.load())
            .transpose()?;

        let active = resolve_active(&default, project.as_ref());
        if !active.dropped.is_empty() {
            warn!(
                "Skipped {} malformed rule(s) in the {} scheme",
                active.dropped.len(),
                active.kind
            );
        }

        let rule_count = active.rule_set.len();
        let generation = self.engine.install(active.rule_set);
        *self.active_kind.write() = active.kind;

        info!(
            "Activated {} scheme with {} rule(s), generation {}",
            active.kind, rule_count, generation
        );
        self.event_bus
            .send(&ColorCastEvent::RuleSetApplied(RuleSetApplied {
                generation,
                scheme: active.kind.name().to_string(),
                rule_count,
                applied_at: Utc::now(),
            }));

        Ok(generation)
    }
}
