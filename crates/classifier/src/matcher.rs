//! Rule matching against a symbol's type union.
//!
//! A rule is satisfied when its pattern names a union member or any
//! transitive supertype of one. The supertype graph comes from the host and
//! may be cyclic; the walk tracks visited types and never revisits one.

use crate::resolver::{TypeName, TypeResolver, TypeUnion};
use rule_config::pattern::{NAMESPACE_SEPARATOR, canonicalize};
use rule_config::{Rule, TypePattern, is_array_shaped};
use rustc_hash::FxHashSet;
use std::collections::VecDeque;
use tracing::trace;

/// Every type reachable from a union through `supertypes_of`, the union
/// members included.
#[derive(Debug, Default)]
pub struct SupertypeClosure {
    types: FxHashSet<TypeName>,
}

impl SupertypeClosure {
    pub fn collect<R: TypeResolver + ?Sized>(union: &TypeUnion, resolver: &R) -> Self {
        let mut types: FxHashSet<TypeName> = FxHashSet::default();
        let mut queue: VecDeque<TypeName> = union.iter().cloned().collect();

        while let Some(type_name) = queue.pop_front() {
            if !types.insert(type_name.clone()) {
                trace!("Supertype walk skipped already visited type {}", type_name);
                continue;
            }
            for supertype in resolver.supertypes_of(&type_name) {
                let Some(supertype) = canonical_name(supertype) else {
                    continue;
                };
                if !types.contains(&supertype) {
                    queue.push_back(supertype);
                }
            }
        }

        Self { types }
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.types.contains(type_name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Host resolvers may hand back bare names; rules compare against the
/// `\`-prefixed form.
fn canonical_name(type_name: TypeName) -> Option<TypeName> {
    let trimmed = type_name.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == type_name.len() && type_name.starts_with(NAMESPACE_SEPARATOR) {
        Some(type_name)
    } else {
        Some(canonicalize(trimmed).into())
    }
}

/// Finds the rule that classifies `union`.
///
/// When `array_fallback` is set and any member is array-shaped, the fallback
/// wins before any other rule is considered. Otherwise rules are tried in
/// declaration order and the first satisfied one wins; the supertype closure
/// is computed at most once, and only if some rule needs it.
pub fn find_matching_rule<'a, R: TypeResolver + ?Sized>(
    union: &TypeUnion,
    rules: &'a [Rule],
    array_fallback: Option<&'a Rule>,
    resolver: &R,
) -> Option<&'a Rule> {
    if let Some(fallback) = array_fallback
        && union.iter().any(|member| is_array_shaped(member))
    {
        return Some(fallback);
    }

    let mut closure: Option<SupertypeClosure> = None;
    rules.iter().find(|rule| {
        if names_member(union, &rule.pattern) {
            return true;
        }
        closure
            .get_or_insert_with(|| SupertypeClosure::collect(union, resolver))
            .contains(rule.pattern.as_str())
    })
}

fn names_member(union: &TypeUnion, pattern: &TypePattern) -> bool {
    union.contains(pattern.as_str())
}
