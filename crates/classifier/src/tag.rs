//! Materialized tags.
//!
//! A [`TagSpec`] is what the rule author wrote; a [`ResolvedTag`] is what the
//! host renders. Materialization is where a host registers the tag with its
//! rendering layer, so the engine does it at most once per pattern.

use once_cell::sync::Lazy;
use regex::Regex;
use rule_config::{Rgb, TagSpec, TypePattern};

const ATTRIBUTE_KEY_PREFIX: &str = "colorcast.dynamic";

static CAMEL_CASE_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new("([a-z])([A-Z])").expect("camel case boundary is a valid regex literal"));

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedTag {
    pub pattern: TypePattern,
    /// Attribute key the host registers its text style under
    pub key: String,
    pub color: Rgb,
}

pub trait TagMaterializer: Send + Sync {
    fn materialize(&self, spec: &TagSpec) -> ResolvedTag;
}

/// Derives a stable attribute key from the pattern and parses the color,
/// rendering unreadable colors as black.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttributeKeyMaterializer;

impl TagMaterializer for AttributeKeyMaterializer {
    fn materialize(&self, spec: &TagSpec) -> ResolvedTag {
        ResolvedTag {
            pattern: spec.pattern.clone(),
            key: attribute_key(&spec.pattern),
            color: spec.rgb(),
        }
    }
}

/// `\App\UserModel` becomes `colorcast.dynamic.app.user-model`.
pub fn attribute_key(pattern: &TypePattern) -> String {
    let mut key = String::from(ATTRIBUTE_KEY_PREFIX);
    for segment in pattern.segments() {
        key.push('.');
        key.push_str(&CAMEL_CASE_BOUNDARY.replace_all(segment, "$1-$2").to_lowercase());
    }
    key
}
