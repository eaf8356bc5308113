//! Error types for Semnet Core

use thiserror::Error;

/// Result type alias using Semnet's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Semnet error types
///
/// An empty match set is never an error; these variants describe corrupt or
/// incomplete graphs and rejected inputs.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Concept not found: {0}")]
    MissingConcept(String),

    #[error("Relation id already used by a different relation: {0}")]
    DuplicateRelation(String),

    #[error("Malformed rule: {0}")]
    MalformedRule(String),

    #[error("Invalid notation: {0}")]
    Notation(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Search budget exceeded after {steps} candidate checks")]
    SearchBudgetExceeded { steps: usize },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
