//! Error types for the classifier crate

use rule_config::RuleConfigError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClassifierError>;

/// Failures surfaced to the rule author or the host.
///
/// Resolver misses and supertype cycles are not errors: they only ever turn
/// into "not classified".
#[derive(Error, Debug)]
pub enum ClassifierError {
    /// Rule validation or configuration persistence failed
    #[error(transparent)]
    Config(#[from] RuleConfigError),

    /// The host did not provide a store for the project scope
    #[error("No project configuration scope is available")]
    ProjectScopeUnavailable,
}

impl ClassifierError {
    /// The malformed patterns, when this error rejected an apply.
    pub fn invalid_patterns(&self) -> Option<&[String]> {
        match self {
            ClassifierError::Config(err) => err.invalid_patterns(),
            ClassifierError::ProjectScopeUnavailable => None,
        }
    }
}
