//! Resource limits for matching and rule application

use serde::{Deserialize, Serialize};

/// Maximum unknown concepts in one query (16)
pub const MAX_UNKNOWNS: usize = 16;

/// Maximum matches collected by one matcher call (10000)
pub const MAX_RESULTS: usize = 10_000;

/// Maximum candidate checks in one matcher call (1,000,000)
pub const MAX_STEPS: usize = 1_000_000;

/// Maximum forward-chaining rounds (64)
pub const MAX_ROUNDS: usize = 64;

/// Maximum length for a concept id (256 chars)
pub const MAX_CONCEPT_ID_LEN: usize = 256;

/// Caps on the combinatorial search of one matcher call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchLimits {
    /// Queries with more unknowns are rejected up front
    #[serde(default = "default_max_unknowns")]
    pub max_unknowns: usize,

    /// Enumeration stops once this many matches are collected
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Candidate checks allowed before the search is abandoned
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
}

fn default_max_unknowns() -> usize {
    MAX_UNKNOWNS
}

fn default_max_results() -> usize {
    MAX_RESULTS
}

fn default_max_steps() -> usize {
    MAX_STEPS
}

impl Default for MatchLimits {
    fn default() -> Self {
        Self {
            max_unknowns: default_max_unknowns(),
            max_results: default_max_results(),
            max_steps: default_max_steps(),
        }
    }
}

impl MatchLimits {
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_max_unknowns(mut self, max_unknowns: usize) -> Self {
        self.max_unknowns = max_unknowns;
        self
    }
}

/// Validation error type
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    TooManyUnknowns { count: usize, max: usize },
    ConceptIdTooLong { len: usize, max: usize },
    EmptyConceptId,
    TooManyRounds { rounds: usize, max: usize },
    ZeroResultLimit,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooManyUnknowns { count, max } => {
                write!(f, "Too many unknown concepts in query: {} (max {})", count, max)
            }
            Self::ConceptIdTooLong { len, max } => {
                write!(f, "Concept id too long: {} chars (max {})", len, max)
            }
            Self::EmptyConceptId => write!(f, "Concept id cannot be empty"),
            Self::TooManyRounds { rounds, max } => {
                write!(f, "Too many chaining rounds: {} (max {})", rounds, max)
            }
            Self::ZeroResultLimit => write!(f, "max_results must be at least 1"),
        }
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for crate::error::Error {
    fn from(err: ValidationError) -> Self {
        crate::error::Error::Validation(err.to_string())
    }
}

/// Validate the unknown count of a query
pub fn validate_unknown_count(count: usize, limits: &MatchLimits) -> Result<(), ValidationError> {
    if count > limits.max_unknowns {
        return Err(ValidationError::TooManyUnknowns {
            count,
            max: limits.max_unknowns,
        });
    }
    Ok(())
}

/// Validate the limits themselves before a search starts
pub fn validate_limits(limits: &MatchLimits) -> Result<(), ValidationError> {
    if limits.max_results == 0 {
        return Err(ValidationError::ZeroResultLimit);
    }
    Ok(())
}

/// Validate concept id
pub fn validate_concept_id(id: &str) -> Result<(), ValidationError> {
    if id.is_empty() {
        return Err(ValidationError::EmptyConceptId);
    }
    if id.len() > MAX_CONCEPT_ID_LEN {
        return Err(ValidationError::ConceptIdTooLong {
            len: id.len(),
            max: MAX_CONCEPT_ID_LEN,
        });
    }
    Ok(())
}

/// Validate forward-chaining round count
pub fn validate_rounds(rounds: usize) -> Result<(), ValidationError> {
    if rounds > MAX_ROUNDS {
        return Err(ValidationError::TooManyRounds {
            rounds,
            max: MAX_ROUNDS,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_unknown_count() {
        let limits = MatchLimits::default().with_max_unknowns(2);
        assert!(validate_unknown_count(2, &limits).is_ok());
        assert!(validate_unknown_count(3, &limits).is_err());
    }

    #[test]
    fn test_zero_result_limit_rejected() {
        assert_eq!(
            validate_limits(&MatchLimits::default().with_max_results(0)),
            Err(ValidationError::ZeroResultLimit)
        );
        assert!(validate_limits(&MatchLimits::default().with_max_results(1)).is_ok());
    }

    #[test]
    fn test_validate_concept_id() {
        assert!(validate_concept_id("sky").is_ok());
        assert!(validate_concept_id("").is_err());
        assert!(validate_concept_id(&"x".repeat(300)).is_err());
    }

    #[test]
    fn test_limits_fill_missing_fields() {
        let limits: MatchLimits = serde_json::from_str(r#"{"max_results": 5}"#).unwrap();
        assert_eq!(limits.max_results, 5);
        assert_eq!(limits.max_steps, MAX_STEPS);
    }
}
