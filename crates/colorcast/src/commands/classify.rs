use super::open_service;
use crate::cli::ScopeArgs;
use anyhow::{Context, Result};
use classifier::{DeclaredSymbol, HierarchyResolver, TypeHierarchy};
use rule_config::ScopeKind;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

pub struct ClassifyArgs {
    pub fixture: PathBuf,
    pub scopes: ScopeArgs,
    pub stats: bool,
}

#[derive(Deserialize, Debug)]
struct Fixture {
    /// Type name to its direct supertypes
    #[serde(default)]
    hierarchy: BTreeMap<String, Vec<String>>,
    symbols: Vec<FixtureSymbol>,
}

#[derive(Deserialize, Debug)]
struct FixtureSymbol {
    name: String,
    #[serde(default = "default_kind")]
    kind: ScopeKind,
    #[serde(default)]
    types: Vec<String>,
}

fn default_kind() -> ScopeKind {
    ScopeKind::Variable
}

pub fn run(args: ClassifyArgs) -> Result<()> {
    let content = fs::read_to_string(&args.fixture)
        .with_context(|| format!("Failed to read fixture {}", args.fixture.display()))?;
    let fixture: Fixture = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse fixture {}", args.fixture.display()))?;

    let mut hierarchy = TypeHierarchy::new();
    for (type_name, supertypes) in &fixture.hierarchy {
        hierarchy.add_supertypes(type_name, supertypes);
    }
    debug!(
        "Fixture has {} type(s) with supertypes and {} symbol(s)",
        hierarchy.len(),
        fixture.symbols.len()
    );

    let service = open_service(&args.scopes, HierarchyResolver::new(hierarchy))?;
    let engine = service.engine();

    let symbols: Vec<(Arc<DeclaredSymbol>, ScopeKind)> = fixture
        .symbols
        .into_iter()
        .map(|symbol| {
            (
                Arc::new(DeclaredSymbol::new(symbol.name, symbol.types)),
                symbol.kind,
            )
        })
        .collect();

    for (symbol, kind) in &symbols {
        match engine.classify(symbol, *kind) {
            Some(tag) => println!("{}\t{}\t{}", symbol.name, tag.key, tag.color),
            None => println!("{}\t-", symbol.name),
        }
    }

    if args.stats {
        println!("{}", serde_json::to_string_pretty(&engine.stats())?);
    }
    Ok(())
}
