//! Schemes and the persisted scheme document.
//!
//! Two configuration scopes exist: the application-level scope, whose scheme
//! is named `Default`, and the project-level scope, whose scheme is named
//! `Project`. Each scope persists one [`SchemeDocument`].

use crate::rules::{RuleEntry, RuleSet, ScopeFlags};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which configuration scope a scheme belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemeKind {
    Default,
    Project,
}

impl SchemeKind {
    pub const fn name(self) -> &'static str {
        match self {
            SchemeKind::Default => "Default",
            SchemeKind::Project => "Project",
        }
    }

    pub fn is_project(self) -> bool {
        self == SchemeKind::Project
    }
}

impl fmt::Display for SchemeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The rules of one scheme exactly as persisted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulesState {
    #[serde(default)]
    pub types: Vec<RuleEntry>,
    #[serde(flatten)]
    pub flags: ScopeFlags,
}

impl RulesState {
    pub fn new(types: Vec<RuleEntry>, flags: ScopeFlags) -> Self {
        Self { types, flags }
    }

    pub fn from_rule_set(rule_set: &RuleSet) -> Self {
        Self::new(rule_set.to_entries(), rule_set.flags())
    }

    /// Re-validates the persisted rows, dropping malformed ones.
    pub fn to_rule_set(&self) -> (RuleSet, Vec<String>) {
        RuleSet::sanitize(&self.types, self.flags)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scheme {
    pub name: String,
    #[serde(default)]
    pub rules: RulesState,
}

impl Scheme {
    pub fn new(kind: SchemeKind) -> Self {
        Self {
            name: kind.name().to_string(),
            rules: RulesState::default(),
        }
    }

    /// A scheme differs from its default when it carries any rule rows.
    pub fn differs_from_default(&self) -> bool {
        !self.rules.types.is_empty()
    }
}

/// The persisted configuration of one scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemeDocument {
    /// Version of colorcast that last wrote this document; empty when hand-written
    #[serde(default)]
    pub version: String,
    /// When this document was last written
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Name of the scheme selected in this scope, if any
    #[serde(default)]
    pub current: Option<String>,
    #[serde(default)]
    pub schemes: Vec<Scheme>,
}

impl SchemeDocument {
    /// A fresh document with one empty scheme of `kind`, selected as current.
    pub fn new(version: String, kind: SchemeKind) -> Self {
        Self {
            version,
            updated_at: None,
            current: Some(kind.name().to_string()),
            schemes: vec![Scheme::new(kind)],
        }
    }

    pub fn scheme(&self, name: &str) -> Option<&Scheme> {
        self.schemes.iter().find(|scheme| scheme.name == name)
    }

    pub fn scheme_mut(&mut self, name: &str) -> Option<&mut Scheme> {
        self.schemes.iter_mut().find(|scheme| scheme.name == name)
    }

    pub fn current_scheme(&self) -> Option<&Scheme> {
        self.current.as_deref().and_then(|name| self.scheme(name))
    }

    pub fn set_current(&mut self, kind: Option<SchemeKind>) {
        self.current = kind.map(|kind| kind.name().to_string());
    }

    /// Replaces the rules of the `kind` scheme, creating it if missing.
    pub fn set_rules(&mut self, kind: SchemeKind, rules: RulesState) {
        match self.scheme_mut(kind.name()) {
            Some(scheme) => scheme.rules = rules,
            None => self.schemes.push(Scheme {
                name: kind.name().to_string(),
                rules,
            }),
        }
    }

    pub fn touch(&mut self, version: &str) {
        self.version = version.to_string();
        self.updated_at = Some(Utc::now());
    }
}

/// The rule set selected for classification and where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveScheme {
    pub kind: SchemeKind,
    pub rule_set: RuleSet,
    /// Persisted patterns skipped because they failed validation on load
    pub dropped: Vec<String>,
}

/// Applies the scope-resolution rule: a project scheme that is selected and
/// non-empty wins over the default scheme.
pub fn resolve_active(default: &SchemeDocument, project: Option<&SchemeDocument>) -> ActiveScheme {
    let project_scheme = project
        .and_then(|document| document.current_scheme())
        .filter(|scheme| scheme.name == SchemeKind::Project.name())
        .filter(|scheme| scheme.differs_from_default());

    let (kind, rules) = match project_scheme {
        Some(scheme) => (SchemeKind::Project, scheme.rules.clone()),
        None => {
            let rules = default
                .current_scheme()
                .or_else(|| default.scheme(SchemeKind::Default.name()))
                .map(|scheme| scheme.rules.clone())
                .unwrap_or_default();
            (SchemeKind::Default, rules)
        }
    };

    let (rule_set, dropped) = rules.to_rule_set();
    ActiveScheme {
        kind,
        rule_set,
        dropped,
    }
}
