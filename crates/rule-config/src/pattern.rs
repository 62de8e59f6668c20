//! Type patterns: canonical, fully-qualified type paths used as rule match keys.
//!
//! A type path is a sequence of identifier segments joined by the namespace
//! separator (`\`). Authors may omit the leading separator; the canonical form
//! always carries it, so `App\User` and `\App\User` name the same pattern.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::sync::Arc;

pub const NAMESPACE_SEPARATOR: char = '\\';

/// Canonical path of the reserved array marker type.
pub const ARRAY_TYPE_PATH: &str = "\\array";

/// Suffix used by resolvers to spell "array of T".
pub const ARRAY_SUFFIX: &str = "[]";

// segment: starts with a letter or `_`, then letters, digits or `_`
// full path: optional leading `\`, then segment(\segment)*
static TYPE_PATH_GRAMMAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\\?[a-zA-Z_][a-zA-Z0-9_]*(?:\\[a-zA-Z_][a-zA-Z0-9_]*)*$")
        .expect("type path grammar is a valid regex literal")
});

/// A validated type path in canonical form.
///
/// Equality, ordering and hashing all operate on the canonical string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypePattern(Arc<str>);

impl TypePattern {
    /// Validates `raw` against the type path grammar and canonicalizes it.
    ///
    /// Returns `None` for blank or malformed input.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if !is_valid_type_path(trimmed) {
            return None;
        }
        Some(Self(canonicalize(trimmed).into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Shared handle to the canonical string, for cache keys.
    pub fn as_arc(&self) -> &Arc<str> {
        &self.0
    }

    /// Identifier segments without the leading separator.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0
            .split(NAMESPACE_SEPARATOR)
            .filter(|segment| !segment.is_empty())
    }

    pub fn is_array_marker(&self) -> bool {
        self.as_str() == ARRAY_TYPE_PATH
    }
}

impl fmt::Display for TypePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TypePattern {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Checks `raw` against the conservative identifier grammar.
pub fn is_valid_type_path(raw: &str) -> bool {
    TYPE_PATH_GRAMMAR.is_match(raw)
}

/// Prefixes the namespace separator when it is missing.
///
/// No other normalization is applied: type names compare exactly.
pub fn canonicalize(path: &str) -> String {
    if path.starts_with(NAMESPACE_SEPARATOR) {
        path.to_string()
    } else {
        format!("{NAMESPACE_SEPARATOR}{path}")
    }
}

/// Returns true when a resolved type name denotes an array or collection shape.
pub fn is_array_shaped(type_name: &str) -> bool {
    type_name == ARRAY_TYPE_PATH || type_name.ends_with(ARRAY_SUFFIX)
}
