//! Error types for the Najua orchestration core.

use thiserror::Error;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, NajuaError>;

/// Main error type for the Najua orchestration core.
#[derive(Debug, Error)]
pub enum NajuaError {
    /// Error from the completion provider.
    #[error("provider error: {0}")]
    ProviderError(#[from] async_openai::error::OpenAIError),

    /// The provider returned a value that does not satisfy the producing
    /// role's decision contract (malformed JSON, illegal `agent` value, ...).
    #[error("decision contract violation: {message}")]
    DecisionContract { message: String },

    /// All configured providers failed for a single invocation.
    #[error("all providers failed, last error: {message}")]
    AllProvidersFailed { message: String },

    /// The defensive per-turn iteration cap was exceeded.
    #[error("maximum hops per turn exceeded: {max_hops}")]
    MaxHopsExceeded { max_hops: usize },

    /// An issue record was handed to the store before completion.
    #[error("cannot save incomplete issue, missing: {fields}")]
    IncompleteIssue { fields: String },

    /// Missing or invalid runtime configuration.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Database error.
    #[error("database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = NajuaError::MaxHopsExceeded { max_hops: 8 };
        assert_eq!(err.to_string(), "maximum hops per turn exceeded: 8");

        let err = NajuaError::DecisionContract {
            message: "unknown agent value".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "decision contract violation: unknown agent value"
        );
    }

    #[test]
    fn test_error_from_serde() {
        let serde_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: NajuaError = serde_err.into();
        assert!(matches!(err, NajuaError::SerializationError(_)));
    }

    #[test]
    fn test_result_type() {
        fn produces() -> Result<&'static str> {
            Ok("ok")
        }
        assert_eq!(produces().unwrap(), "ok");
    }
}
