use super::open_service;
use crate::cli::ScopeArgs;
use anyhow::Result;
use classifier::HierarchyResolver;

pub fn run(scopes: ScopeArgs) -> Result<()> {
    let service = open_service(&scopes, HierarchyResolver::default())?;
    let rule_set = service.engine().active_rule_set();
    let flags = rule_set.flags();

    // We're printing to stdout, so we don't need to use tracing
    println!("scheme: {}", service.active_kind());
    println!("properties: {}", flags.include_fields);
    println!("references: {}", flags.include_accesses);
    println!("variables: {}", flags.include_variables);
    println!("rules:");
    for rule in rule_set.rules() {
        println!("  {}\t{}", rule.pattern, rule.tag.rgb());
    }
    Ok(())
}
