use crate::engine::ClassificationEngine;
use crate::errors::ClassifierError;
use crate::resolver::{DeclaredSymbol, HierarchyResolver, TypeHierarchy, TypeName, TypeResolver, TypeUnion};
use crate::service::ColorCastService;
use event_bus::{ColorCastEvent, EventBus};
use rayon::prelude::*;
use rule_config::{
    ConfigStore, MemoryConfigStore, RuleConfigError, RuleEntry, RulesState, ScopeFlags, ScopeKind,
    SchemeDocument, SchemeKind,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use tracing_test::traced_test;

/// Wraps a [`HierarchyResolver`] and counts `type_of` calls.
struct CountingResolver {
    inner: HierarchyResolver,
    type_of_calls: AtomicUsize,
}

impl CountingResolver {
    fn new(edges: &[(&str, &[&str])]) -> Self {
        let mut hierarchy = TypeHierarchy::new();
        for (type_name, supertypes) in edges {
            hierarchy.add_supertypes(type_name, supertypes.iter());
        }
        Self {
            inner: HierarchyResolver::new(hierarchy),
            type_of_calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.type_of_calls.load(Ordering::SeqCst)
    }
}

impl TypeResolver for CountingResolver {
    type Symbol = DeclaredSymbol;

    fn type_of(&self, symbol: &DeclaredSymbol) -> TypeUnion {
        self.type_of_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.type_of(symbol)
    }

    fn supertypes_of(&self, type_name: &str) -> Vec<TypeName> {
        self.inner.supertypes_of(type_name)
    }

    fn is_receiver(&self, symbol: &DeclaredSymbol) -> bool {
        self.inner.is_receiver(symbol)
    }
}

fn engine(edges: &[(&str, &[&str])]) -> ClassificationEngine<CountingResolver> {
    ClassificationEngine::new(CountingResolver::new(edges))
}

fn rows(rules: &[(&str, &str)]) -> Vec<RuleEntry> {
    rules
        .iter()
        .map(|(path, color)| RuleEntry::new(*path, *color))
        .collect()
}

fn symbol(name: &str, types: &[&str]) -> Arc<DeclaredSymbol> {
    Arc::new(DeclaredSymbol::new(name, types.iter()))
}

fn color_of(engine: &ClassificationEngine<CountingResolver>, symbol: &Arc<DeclaredSymbol>) -> Option<String> {
    engine
        .classify(symbol, ScopeKind::Variable)
        .map(|tag| tag.color.to_string())
}

#[test]
fn test_classification_is_idempotent() {
    let engine = engine(&[]);
    engine
        .apply(&rows(&[("App\\User", "#FF77FF")]), ScopeFlags::default())
        .unwrap();
    let user = symbol("$user", &["\\App\\User"]);

    let first = engine.classify(&user, ScopeKind::Variable).unwrap();
    let second = engine.classify(&user, ScopeKind::Variable).unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(engine.resolver().calls(), 1);
    assert_eq!(first.key, "colorcast.dynamic.app.user");
}

#[test]
fn test_no_match_is_cached() {
    let engine = engine(&[]);
    engine
        .apply(&rows(&[("App\\User", "#FF77FF")]), ScopeFlags::default())
        .unwrap();
    let unknown = symbol("$mystery", &[]);
    let other = symbol("$count", &["\\int"]);

    assert!(engine.classify(&unknown, ScopeKind::Variable).is_none());
    assert!(engine.classify(&unknown, ScopeKind::Variable).is_none());
    assert!(engine.classify(&other, ScopeKind::Variable).is_none());
    assert!(engine.classify(&other, ScopeKind::Variable).is_none());

    assert_eq!(engine.resolver().calls(), 2);
}

#[test]
fn test_declaration_order_breaks_ties() {
    let engine = engine(&[("App\\Admin", &["App\\User"])]);
    engine
        .apply(
            &rows(&[("App\\User", "#111111"), ("App\\Admin", "#222222")]),
            ScopeFlags::default(),
        )
        .unwrap();

    let admin = symbol("$admin", &["App\\Admin"]);

    assert_eq!(color_of(&engine, &admin).as_deref(), Some("#111111"));
}

#[test]
fn test_transitive_supertype_match() {
    let engine = engine(&[
        ("App\\Models\\Admin", &["App\\Models\\User"]),
        ("App\\Models\\User", &["App\\Models\\Model"]),
    ]);
    engine
        .apply(&rows(&[("App\\Models\\Model", "#00BFFF")]), ScopeFlags::default())
        .unwrap();

    let admin = symbol("$admin", &["App\\Models\\Admin"]);

    assert_eq!(color_of(&engine, &admin).as_deref(), Some("#00bfff"));
}

#[test]
fn test_cyclic_hierarchy_terminates() {
    let engine = engine(&[("X", &["Y"]), ("Y", &["X"])]);
    engine
        .apply(&rows(&[("Unrelated", "#00BFFF")]), ScopeFlags::default())
        .unwrap();

    assert!(color_of(&engine, &symbol("$x", &["X"])).is_none());
}

/// Host resolver that reports supertypes without the leading separator.
struct BareSupertypeResolver;

impl TypeResolver for BareSupertypeResolver {
    type Symbol = DeclaredSymbol;

    fn type_of(&self, _symbol: &DeclaredSymbol) -> TypeUnion {
        TypeUnion::single("Derived")
    }

    fn supertypes_of(&self, type_name: &str) -> Vec<TypeName> {
        if type_name == "\\Derived" {
            vec!["Base".into()]
        } else {
            Vec::new()
        }
    }
}

#[test]
fn test_bare_supertype_names_match_rules() {
    let engine = ClassificationEngine::new(BareSupertypeResolver);
    engine
        .apply(&rows(&[("Base", "#00BFFF")]), ScopeFlags::default())
        .unwrap();

    let tag = engine
        .classify(&symbol("$derived", &[]), ScopeKind::Variable)
        .unwrap();

    assert_eq!(tag.key, "colorcast.dynamic.base");
    assert_eq!(tag.color.to_string(), "#00bfff");
}

#[test]
fn test_array_fallback_outranks_nominal_rule() {
    let engine = engine(&[]);
    engine
        .apply(
            &rows(&[("App\\User", "#111111"), ("array", "#222222")]),
            ScopeFlags::default(),
        )
        .unwrap();

    let users = symbol("$users", &["\\App\\User", "\\App\\User[]"]);
    let list = symbol("$list", &["\\array"]);

    assert_eq!(color_of(&engine, &users).as_deref(), Some("#222222"));
    assert_eq!(color_of(&engine, &list).as_deref(), Some("#222222"));
}

#[test]
fn test_apply_invalidates_cached_outcomes() {
    let engine = engine(&[]);
    engine
        .apply(&rows(&[("App\\User", "#111111")]), ScopeFlags::default())
        .unwrap();
    let user = symbol("$user", &["\\App\\User"]);
    assert_eq!(color_of(&engine, &user).as_deref(), Some("#111111"));

    engine
        .apply(&rows(&[("App\\User", "#333333")]), ScopeFlags::default())
        .unwrap();
    assert_eq!(color_of(&engine, &user).as_deref(), Some("#333333"));

    engine
        .apply(&rows(&[("App\\Order", "#444444")]), ScopeFlags::default())
        .unwrap();
    assert!(color_of(&engine, &user).is_none());
    assert_eq!(engine.resolver().calls(), 3);
}

#[test]
fn test_invalid_apply_leaves_active_rules_untouched() {
    let engine = engine(&[]);
    engine
        .apply(&rows(&[("App\\User", "#111111")]), ScopeFlags::default())
        .unwrap();
    let before = engine.active_rule_set();
    let generation = engine.generation();

    let err = engine
        .apply(
            &rows(&[
                ("A", "#000001"),
                ("B", "#000002"),
                ("C", "#000003"),
                ("not-a-type", "#000004"),
                ("D", "#000005"),
                ("E", "#000006"),
            ]),
            ScopeFlags::default(),
        )
        .unwrap_err();

    assert_eq!(err.invalid_patterns(), Some(&["not-a-type".to_string()][..]));
    assert!(Arc::ptr_eq(&before, &engine.active_rule_set()));
    assert_eq!(engine.generation(), generation);
}

#[test]
fn test_disabled_scope_skips_resolver() {
    let engine = engine(&[]);
    engine
        .apply(
            &rows(&[("App\\User", "#111111")]),
            ScopeFlags::new(true, true, false),
        )
        .unwrap();
    let user = symbol("$user", &["\\App\\User"]);

    assert!(engine.classify(&user, ScopeKind::Variable).is_none());
    assert!(engine.classify(&user, ScopeKind::Parameter).is_none());
    assert!(engine.classify(&user, ScopeKind::PromotedParameter).is_none());
    assert_eq!(engine.resolver().calls(), 0);

    assert!(engine.classify(&user, ScopeKind::Field).is_some());
    assert_eq!(engine.resolver().calls(), 1);
}

#[test]
fn test_promoted_parameter_only_when_fields_are_off() {
    let engine = engine(&[]);
    let user = symbol("$user", &["\\App\\User"]);

    engine
        .apply(&rows(&[("App\\User", "#111111")]), ScopeFlags::default())
        .unwrap();
    assert!(engine.classify(&user, ScopeKind::PromotedParameter).is_none());

    engine
        .apply(
            &rows(&[("App\\User", "#111111")]),
            ScopeFlags::new(false, true, true),
        )
        .unwrap();
    assert!(engine.classify(&user, ScopeKind::PromotedParameter).is_some());
}

#[test]
fn test_receiver_is_never_classified() {
    let engine = engine(&[]);
    engine
        .apply(&rows(&[("App\\User", "#111111")]), ScopeFlags::default())
        .unwrap();

    let this = symbol("$this", &["\\App\\User"]);

    assert!(engine.classify(&this, ScopeKind::Variable).is_none());
    assert_eq!(engine.resolver().calls(), 0);
}

#[test]
fn test_concurrent_classification_materializes_each_tag_once() {
    let engine = engine(&[("App\\Admin", &["App\\User"])]);
    engine
        .apply(
            &rows(&[("App\\User", "#111111"), ("App\\Order", "#222222")]),
            ScopeFlags::default(),
        )
        .unwrap();

    let symbols: Vec<Arc<DeclaredSymbol>> = (0..2000)
        .map(|i| match i % 3 {
            0 => symbol(&format!("$user{i}"), &["App\\User"]),
            1 => symbol(&format!("$admin{i}"), &["App\\Admin"]),
            _ => symbol(&format!("$order{i}"), &["App\\Order"]),
        })
        .collect();

    let tags: Vec<_> = symbols
        .par_iter()
        .map(|symbol| engine.classify(symbol, ScopeKind::Variable).unwrap())
        .collect();

    let stats = engine.stats();
    assert_eq!(stats.tags_materialized, 2);
    assert_eq!(stats.tag_entries, 2);
    assert_eq!(stats.symbol_entries, 2000);
    assert_eq!(engine.resolver().calls(), 2000);
    assert!(Arc::ptr_eq(&tags[0], &tags[1]));
}

#[test]
fn test_released_symbols_are_reaped() {
    let engine = engine(&[]);
    engine
        .apply(&rows(&[("App\\User", "#111111")]), ScopeFlags::default())
        .unwrap();
    let kept = symbol("$kept", &["\\App\\User"]);
    let released = symbol("$released", &["\\App\\User"]);
    let weak = Arc::downgrade(&released);

    engine.classify(&kept, ScopeKind::Variable);
    engine.classify(&released, ScopeKind::Variable);
    drop(released);

    assert!(weak.upgrade().is_none());
    assert_eq!(engine.reap(), 1);
    assert_eq!(engine.stats().symbol_entries, 1);
}

#[test]
fn test_evict_forces_reclassification() {
    let engine = engine(&[]);
    engine
        .apply(&rows(&[("App\\User", "#111111")]), ScopeFlags::default())
        .unwrap();
    let user = symbol("$user", &["\\App\\User"]);

    engine.classify(&user, ScopeKind::Variable);
    assert!(engine.evict(&user));
    engine.classify(&user, ScopeKind::Variable);

    assert_eq!(engine.resolver().calls(), 2);
}

#[test]
fn test_invalidate_all_keeps_rules_and_drops_caches() {
    let engine = engine(&[]);
    engine
        .apply(&rows(&[("App\\User", "#111111")]), ScopeFlags::default())
        .unwrap();
    let rules = engine.active_rule_set();
    let user = symbol("$user", &["\\App\\User"]);
    engine.classify(&user, ScopeKind::Variable);

    let generation = engine.invalidate_all();

    assert_eq!(generation, 2);
    assert!(Arc::ptr_eq(&rules, &engine.active_rule_set()));
    let stats = engine.stats();
    assert_eq!(stats.symbol_entries, 0);
    assert_eq!(stats.tag_entries, 0);

    engine.classify(&user, ScopeKind::Variable);
    assert_eq!(engine.resolver().calls(), 2);
}

#[test]
fn test_stats_count_hits_and_misses() {
    let engine = engine(&[]);
    engine
        .apply(&rows(&[("App\\User", "#111111")]), ScopeFlags::default())
        .unwrap();
    let user = symbol("$user", &["\\App\\User"]);

    for _ in 0..3 {
        engine.classify(&user, ScopeKind::Variable);
    }

    let stats = engine.stats();
    assert_eq!(stats.symbol_misses, 1);
    assert_eq!(stats.symbol_hits, 2);
    assert_eq!(stats.resolver_calls, 1);
    assert_eq!(stats.generation, 1);
}

/// Resolver that parks inside `type_of` while `gated` is set.
struct GatedResolver {
    inner: HierarchyResolver,
    gated: AtomicBool,
    entered: Barrier,
    release: Barrier,
}

impl TypeResolver for GatedResolver {
    type Symbol = DeclaredSymbol;

    fn type_of(&self, symbol: &DeclaredSymbol) -> TypeUnion {
        if self.gated.swap(false, Ordering::SeqCst) {
            self.entered.wait();
            self.release.wait();
        }
        self.inner.type_of(symbol)
    }

    fn supertypes_of(&self, type_name: &str) -> Vec<TypeName> {
        self.inner.supertypes_of(type_name)
    }
}

#[test]
fn test_in_flight_request_cannot_poison_new_generation() {
    let engine = ClassificationEngine::new(GatedResolver {
        inner: HierarchyResolver::default(),
        gated: AtomicBool::new(false),
        entered: Barrier::new(2),
        release: Barrier::new(2),
    });
    engine
        .apply(&rows(&[("App\\User", "#111111")]), ScopeFlags::default())
        .unwrap();
    let user = symbol("$user", &["\\App\\User"]);
    engine.resolver().gated.store(true, Ordering::SeqCst);

    std::thread::scope(|scope| {
        let in_flight = scope.spawn(|| engine.classify(&user, ScopeKind::Variable));

        engine.resolver().entered.wait();
        engine
            .apply(&rows(&[("App\\User", "#999999")]), ScopeFlags::default())
            .unwrap();
        engine.resolver().release.wait();

        let stale = in_flight.join().unwrap().unwrap();
        assert_eq!(stale.color.to_string(), "#111111");
    });

    let fresh = engine.classify(&user, ScopeKind::Variable).unwrap();
    assert_eq!(fresh.color.to_string(), "#999999");
}

#[traced_test]
#[test]
fn test_apply_logs_generation() {
    let engine = engine(&[]);

    engine
        .apply(
            &rows(&[("App\\User", "#111111"), ("App\\Order", "#222222")]),
            ScopeFlags::default(),
        )
        .unwrap();
    engine.invalidate_all();

    assert!(logs_contain("Installed rule set with 2 rule(s) as generation 1"));
    assert!(logs_contain("Invalidated classification caches; now generation 2"));
}

fn document_with(kind: SchemeKind, paths: &[&str]) -> SchemeDocument {
    let mut document = SchemeDocument::new("0.0.0".to_string(), kind);
    let types = paths.iter().map(|path| RuleEntry::new(*path, "#FF9500")).collect();
    document.set_rules(kind, RulesState::new(types, ScopeFlags::default()));
    document
}

struct ServiceFixture {
    service: ColorCastService<CountingResolver>,
    default_store: Arc<MemoryConfigStore>,
    project_store: Arc<MemoryConfigStore>,
}

fn service_with(default: SchemeDocument, project: SchemeDocument) -> ServiceFixture {
    let default_store = Arc::new(MemoryConfigStore::with_document(default));
    let project_store = Arc::new(MemoryConfigStore::with_document(project));
    let service = ColorCastService::new(
        engine(&[]),
        default_store.clone(),
        Some(project_store.clone() as Arc<dyn ConfigStore>),
        EventBus::new(),
    );
    ServiceFixture {
        service,
        default_store,
        project_store,
    }
}

#[test]
fn test_service_load_prefers_non_empty_project_scheme() {
    let fixture = service_with(
        document_with(SchemeKind::Default, &["App\\User"]),
        document_with(SchemeKind::Project, &["App\\Order", "App\\Invoice"]),
    );
    let mut events = fixture.service.event_bus().subscribe();

    let generation = fixture.service.load().unwrap();

    assert_eq!(fixture.service.active_kind(), SchemeKind::Project);
    assert_eq!(fixture.service.engine().active_rule_set().len(), 2);
    match events.try_recv().unwrap() {
        ColorCastEvent::RuleSetApplied(event) => {
            assert_eq!(event.generation, generation);
            assert_eq!(event.scheme, "Project");
            assert_eq!(event.rule_count, 2);
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[test]
fn test_service_load_skips_malformed_persisted_rules() {
    let fixture = service_with(
        document_with(SchemeKind::Default, &["App\\User", "broken pattern"]),
        SchemeDocument::new("0.0.0".to_string(), SchemeKind::Project),
    );

    fixture.service.load().unwrap();

    assert_eq!(fixture.service.active_kind(), SchemeKind::Default);
    assert_eq!(fixture.service.engine().active_rule_set().len(), 1);
}

#[test]
fn test_service_apply_persists_and_activates() {
    let fixture = service_with(
        document_with(SchemeKind::Default, &["App\\User"]),
        SchemeDocument::new("0.0.0".to_string(), SchemeKind::Project),
    );
    fixture.service.load().unwrap();

    fixture
        .service
        .apply(
            SchemeKind::Project,
            &rows(&[("App\\Order", "#123456")]),
            ScopeFlags::new(true, false, true),
        )
        .unwrap();

    assert_eq!(fixture.service.active_kind(), SchemeKind::Project);
    let persisted = fixture.project_store.load().unwrap();
    let scheme = persisted.current_scheme().unwrap();
    assert_eq!(scheme.rules.types, rows(&[("\\App\\Order", "#123456")]));
    assert!(!scheme.rules.flags.include_accesses);
}

#[test]
fn test_service_apply_to_default_deselects_project() {
    let fixture = service_with(
        document_with(SchemeKind::Default, &["App\\User"]),
        document_with(SchemeKind::Project, &["App\\Order"]),
    );
    fixture.service.load().unwrap();
    assert_eq!(fixture.service.active_kind(), SchemeKind::Project);

    fixture
        .service
        .apply(
            SchemeKind::Default,
            &rows(&[("App\\Invoice", "#654321")]),
            ScopeFlags::default(),
        )
        .unwrap();

    assert_eq!(fixture.service.active_kind(), SchemeKind::Default);
    assert!(fixture.project_store.load().unwrap().current.is_none());
    let default = fixture.default_store.load().unwrap();
    assert_eq!(default.current_scheme().unwrap().rules.types.len(), 1);
}

#[test]
fn test_service_rejected_apply_saves_nothing() {
    let fixture = service_with(
        document_with(SchemeKind::Default, &["App\\User"]),
        SchemeDocument::new("0.0.0".to_string(), SchemeKind::Project),
    );
    fixture.service.load().unwrap();
    let mut events = fixture.service.event_bus().subscribe();
    let before = fixture.default_store.load().unwrap();

    let err = fixture
        .service
        .apply(
            SchemeKind::Default,
            &rows(&[("App\\Fine", "#000000"), ("1Bad", "#000000")]),
            ScopeFlags::default(),
        )
        .unwrap_err();

    assert!(matches!(err, ClassifierError::Config(_)));
    assert_eq!(fixture.default_store.load().unwrap(), before);
    match events.try_recv().unwrap() {
        ColorCastEvent::ApplyRejected(event) => {
            assert_eq!(event.scheme, "Default");
            assert_eq!(event.invalid_patterns, vec!["1Bad".to_string()]);
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

/// Store whose document loads fine but can no longer be written.
struct ReadOnlyStore {
    document: SchemeDocument,
}

impl ConfigStore for ReadOnlyStore {
    fn load(&self) -> rule_config::Result<SchemeDocument> {
        Ok(self.document.clone())
    }

    fn save(&self, _document: &SchemeDocument) -> rule_config::Result<()> {
        Err(RuleConfigError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only",
        )))
    }
}

#[traced_test]
#[test]
fn test_service_failed_save_resyncs_engine_with_stores() {
    let default_store = Arc::new(MemoryConfigStore::with_document(document_with(
        SchemeKind::Default,
        &["App\\User"],
    )));
    // Project is still selected but has no rules, so the default scheme is active.
    let mut project = SchemeDocument::new("0.0.0".to_string(), SchemeKind::Project);
    project.set_current(Some(SchemeKind::Project));
    let service = ColorCastService::new(
        engine(&[]),
        default_store.clone(),
        Some(Arc::new(ReadOnlyStore { document: project }) as Arc<dyn ConfigStore>),
        EventBus::new(),
    );
    let loaded = service.load().unwrap();

    let err = service
        .apply(
            SchemeKind::Default,
            &rows(&[("App\\Invoice", "#654321")]),
            ScopeFlags::default(),
        )
        .unwrap_err();

    assert!(matches!(err, ClassifierError::Config(RuleConfigError::Io(_))));
    let persisted = default_store.load().unwrap();
    assert_eq!(
        persisted.current_scheme().unwrap().rules.types,
        rows(&[("\\App\\Invoice", "#654321")])
    );
    assert!(service.engine().stats().generation > loaded);
    let invoice = symbol("$invoice", &["App\\Invoice"]);
    assert_eq!(color_of(service.engine(), &invoice).as_deref(), Some("#654321"));
    assert!(color_of(service.engine(), &symbol("$user", &["App\\User"])).is_none());
    assert!(logs_contain("Failed to persist scheme Default"));
}

#[test]
fn test_service_without_project_scope() {
    let service = ColorCastService::new(
        engine(&[]),
        Arc::new(MemoryConfigStore::new(SchemeKind::Default)),
        None,
        EventBus::new(),
    );

    let err = service
        .apply(SchemeKind::Project, &rows(&[("A", "#000000")]), ScopeFlags::default())
        .unwrap_err();

    assert!(matches!(err, ClassifierError::ProjectScopeUnavailable));
}

#[test]
fn test_service_reset_scope_and_scheme() {
    let fixture = service_with(
        document_with(SchemeKind::Default, &["App\\User"]),
        SchemeDocument::new("0.0.0".to_string(), SchemeKind::Project),
    );
    let loaded = fixture.service.load().unwrap();
    let mut events = fixture.service.event_bus().subscribe();

    let invalidated = fixture.service.reset_scope("document reloaded");
    assert_eq!(invalidated, loaded + 1);
    match events.try_recv().unwrap() {
        ColorCastEvent::CachesInvalidated(event) => {
            assert_eq!(event.reason, "document reloaded");
            assert_eq!(event.generation, invalidated);
        }
        other => panic!("unexpected event: {other:?}"),
    }
    assert_eq!(fixture.service.engine().active_rule_set().len(), 1);

    fixture.service.reset_scheme(SchemeKind::Default).unwrap();

    assert!(fixture.service.engine().active_rule_set().is_empty());
    let default = fixture.default_store.load().unwrap();
    assert!(!default.current_scheme().unwrap().differs_from_default());
}
