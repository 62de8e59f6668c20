//! # Rule Config
//!
//! Type rule configuration for colorcast.
//!
//! This crate provides:
//! - Type pattern grammar and canonicalization
//! - Rules, rule sets and the scope flags that gate classification
//! - Schemes for the default and project scopes, and scope resolution
//! - Persistence of scheme documents (JSON file or in-memory)

pub mod config_directory;
pub mod errors;
pub mod pattern;
pub mod rules;
pub mod scheme;
pub mod store;

pub use errors::{Result, RuleConfigError};
pub use pattern::{ARRAY_TYPE_PATH, TypePattern, is_array_shaped};
pub use rules::{Rgb, Rule, RuleEntry, RuleSet, ScopeFlags, ScopeKind, TagSpec};
pub use scheme::{ActiveScheme, RulesState, Scheme, SchemeDocument, SchemeKind, resolve_active};
pub use store::{ConfigStore, JsonConfigStore, MemoryConfigStore};
