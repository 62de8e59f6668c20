//! Error types for the rule-config crate

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for rule configuration operations
pub type Result<T> = std::result::Result<T, RuleConfigError>;

#[derive(Error, Debug)]
pub enum RuleConfigError {
    /// IO operations failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// One or more rule patterns do not follow the type path grammar.
    /// Patterns are listed in the order they were submitted.
    #[error("Invalid type pattern(s): {}", patterns.join(", "))]
    InvalidPatterns { patterns: Vec<String> },

    #[error("Invalid color '{color}' for type pattern '{pattern}'")]
    InvalidColor { pattern: String, color: String },

    /// Failed to create the configuration directory
    #[error("Failed to create configuration directory: {path:?}")]
    DirectoryCreationFailed { path: PathBuf },

    /// Failed to determine the user's home directory
    #[error("Failed to determine system configuration directory")]
    ConfigDirectoryNotFound,
}

impl RuleConfigError {
    /// Returns the offending patterns when this is a validation failure.
    pub fn invalid_patterns(&self) -> Option<&[String]> {
        match self {
            RuleConfigError::InvalidPatterns { patterns } => Some(patterns),
            _ => None,
        }
    }
}
