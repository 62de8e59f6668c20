//! # Classifier
//!
//! Classifies typed symbols against an ordered list of type rules and
//! resolves the first matching rule's tag.
//!
//! - [`resolver`]: the type-information contract supplied by the host
//! - [`matcher`]: array fallback, declaration-order matching, cycle-safe supertype walk
//! - [`tag`]: tag materialization
//! - [`cache`]: weak per-symbol cache and compute-once tag cache
//! - [`engine`]: versioned snapshot of rules plus caches
//! - [`service`]: configuration scopes and lifecycle events around an engine

pub mod cache;
pub mod engine;
pub mod errors;
pub mod matcher;
pub mod resolver;
pub mod service;
pub mod stats;
pub mod tag;

#[cfg(test)]
mod tests;

pub use engine::ClassificationEngine;
pub use errors::{ClassifierError, Result};
pub use resolver::{DeclaredSymbol, HierarchyResolver, TypeHierarchy, TypeName, TypeResolver, TypeUnion};
pub use service::ColorCastService;
pub use stats::CacheStats;
pub use tag::{AttributeKeyMaterializer, ResolvedTag, TagMaterializer};
