//! Rules, rule sets and the scope flags that gate classification.

use crate::errors::{Result, RuleConfigError};
use crate::pattern::TypePattern;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// A rule row as authored and persisted: a raw type path and a color string.
///
/// Rows are not validated; see [`RuleSet::validate`] and [`RuleSet::sanitize`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleEntry {
    pub path: String,
    pub color: String,
}

impl RuleEntry {
    pub fn new(path: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            color: color.into(),
        }
    }

    /// Placeholder rows (blank path) are not rules.
    pub fn is_blank(&self) -> bool {
        self.path.trim().is_empty()
    }
}

/// Kind of classifiable site handed to the engine by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    Field,
    FieldAccess,
    Variable,
    Parameter,
    /// A constructor parameter that also declares a field.
    PromotedParameter,
    /// A variable named in a documentation tag.
    DocVariable,
}

/// The three independent switches that decide which kinds of symbols participate.
///
/// Serialized names follow the persisted configuration format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeFlags {
    #[serde(rename = "properties", default = "enabled")]
    pub include_fields: bool,
    #[serde(rename = "references", default = "enabled")]
    pub include_accesses: bool,
    #[serde(rename = "variables", default = "enabled")]
    pub include_variables: bool,
}

fn enabled() -> bool {
    true
}

impl Default for ScopeFlags {
    fn default() -> Self {
        Self {
            include_fields: true,
            include_accesses: true,
            include_variables: true,
        }
    }
}

impl ScopeFlags {
    pub fn new(include_fields: bool, include_accesses: bool, include_variables: bool) -> Self {
        Self {
            include_fields,
            include_accesses,
            include_variables,
        }
    }

    pub fn allows(&self, kind: ScopeKind) -> bool {
        match kind {
            ScopeKind::Field => self.include_fields,
            ScopeKind::FieldAccess => self.include_accesses,
            ScopeKind::Variable | ScopeKind::Parameter | ScopeKind::DocVariable => {
                self.include_variables
            }
            // The field site already carries the tag when fields are classified.
            ScopeKind::PromotedParameter => self.include_variables && !self.include_fields,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Parses `#RRGGBB` (the `#` is optional).
    pub fn parse(hex: &str) -> Option<Self> {
        let digits = hex.trim().trim_start_matches('#');
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let value = u32::from_str_radix(digits, 16).ok()?;
        Some(Self::from_u32(value))
    }

    /// Like [`Rgb::parse`], but unreadable colors render as black.
    pub fn parse_lenient(hex: &str) -> Self {
        Self::parse(hex).unwrap_or(Self::BLACK)
    }

    fn from_u32(value: u32) -> Self {
        Self::new(
            ((value >> 16) & 0xFF) as u8,
            ((value >> 8) & 0xFF) as u8,
            (value & 0xFF) as u8,
        )
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.red, self.green, self.blue)
    }
}

/// The unmaterialized tag of a rule: a color plus the pattern that identifies it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TagSpec {
    pub pattern: TypePattern,
    pub color: String,
}

impl TagSpec {
    pub fn rgb(&self) -> Rgb {
        Rgb::parse_lenient(&self.color)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Rule {
    pub pattern: TypePattern,
    pub tag: TagSpec,
}

impl Rule {
    pub fn new(pattern: TypePattern, color: impl Into<String>) -> Self {
        let tag = TagSpec {
            pattern: pattern.clone(),
            color: color.into(),
        };
        Self { pattern, tag }
    }

    pub fn to_entry(&self) -> RuleEntry {
        RuleEntry::new(self.pattern.as_str(), self.tag.color.clone())
    }
}

/// An ordered, validated list of rules plus the scope flags.
///
/// Declaration order is priority order. A `RuleSet` is never mutated once
/// built; replacing it is the only way to change classification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    rules: Vec<Rule>,
    flags: ScopeFlags,
}

impl RuleSet {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a rule set from candidate rows, failing atomically.
    ///
    /// Blank rows are dropped. If any non-blank path is malformed, every
    /// offending path is reported and nothing is built. Duplicates (by
    /// canonical pattern) collapse to their first occurrence.
    pub fn validate(candidates: &[RuleEntry], flags: ScopeFlags) -> Result<Self> {
        let invalid: Vec<String> = candidates
            .iter()
            .filter(|entry| !entry.is_blank() && TypePattern::parse(&entry.path).is_none())
            .map(|entry| entry.path.clone())
            .collect();

        if !invalid.is_empty() {
            return Err(RuleConfigError::InvalidPatterns { patterns: invalid });
        }

        let (rule_set, _) = Self::sanitize(candidates, flags);
        Ok(rule_set)
    }

    /// Builds a rule set from persisted rows, skipping invalid ones.
    ///
    /// Returns the rule set and the paths that were dropped as malformed.
    pub fn sanitize(entries: &[RuleEntry], flags: ScopeFlags) -> (Self, Vec<String>) {
        let mut seen = FxHashSet::default();
        let mut rules = Vec::with_capacity(entries.len());
        let mut dropped = Vec::new();

        for entry in entries.iter().filter(|entry| !entry.is_blank()) {
            let Some(pattern) = TypePattern::parse(&entry.path) else {
                warn!("Ignoring rule with invalid type pattern '{}'", entry.path);
                dropped.push(entry.path.clone());
                continue;
            };

            if seen.insert(pattern.clone()) {
                rules.push(Rule::new(pattern, entry.color.clone()));
            }
        }

        (Self { rules, flags }, dropped)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn flags(&self) -> ScopeFlags {
        self.flags
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The first rule whose pattern is the reserved array marker.
    pub fn array_fallback(&self) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.pattern.is_array_marker())
    }

    pub fn to_entries(&self) -> Vec<RuleEntry> {
        self.rules.iter().map(Rule::to_entry).collect()
    }
}

/// Reports rows whose color cannot be read. Such rules still classify, but
/// render with [`Rgb::BLACK`].
pub fn unreadable_colors(entries: &[RuleEntry]) -> Vec<RuleConfigError> {
    entries
        .iter()
        .filter(|entry| !entry.is_blank() && Rgb::parse(&entry.color).is_none())
        .map(|entry| RuleConfigError::InvalidColor {
            pattern: entry.path.clone(),
            color: entry.color.clone(),
        })
        .collect()
}
