//! Domain errors for the Vaspera orchestrator.

use thiserror::Error;

/// Domain-level errors that can occur while wiring or running the orchestrator.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Rule '{rule_id}' is already registered in domain '{domain}'")]
    DuplicateRule { domain: String, rule_id: String },

    #[error("Product not found: {0}")]
    UnknownProduct(String),

    #[error("Agent not found: {0}")]
    UnknownAgent(String),

    #[error("Invalid schedule for job '{job_id}': {reason}")]
    InvalidSchedule { job_id: String, reason: String },

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}

/// Failure raised while a rule condition inspects its context.
///
/// Never escapes `Rule::evaluate`: the owning rule logs it and reports
/// "not triggered".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConditionError {
    #[error("Context key '{key}' expected {expected}, found {found}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Condition failed: {0}")]
    Failed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_rule_message() {
        let err = DomainError::DuplicateRule {
            domain: "ads.acme".to_string(),
            rule_id: "ads_3x_kill".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Rule 'ads_3x_kill' is already registered in domain 'ads.acme'"
        );
    }

    #[test]
    fn test_serde_error_conversion() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: DomainError = parse_err.into();
        assert!(matches!(err, DomainError::SerializationError(_)));
    }
}
