//! Error types for the chatstore adapter engine
//!
//! "Not found" is deliberately absent: single-record operations return
//! `None` and bulk operations return a zero count.

use thiserror::Error;

/// Adapter engine error types
#[derive(Error, Debug)]
pub enum Error {
    // Construction Errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    // Per-call Errors
    #[error("Missing required field `{field}` on model `{model}`")]
    MissingField { model: String, field: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    // Collaborator Errors (drivers and hooks)
    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Transform hook error: {0}")]
    Hook(String),

    // General Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for adapter operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Convenience constructor for a missing required field
    pub fn missing_field(model: impl Into<String>, field: impl Into<String>) -> Self {
        Self::MissingField {
            model: model.into(),
            field: field.into(),
        }
    }

    /// HTTP status code an endpoint layer would typically map this error to
    pub fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request
            Self::MissingField { .. } | Self::Validation(_) => 400,

            // 404 Not Found
            Self::ModelNotFound(_) => 404,

            // 500 Internal Server Error
            Self::Configuration(_)
            | Self::Backend(_)
            | Self::Hook(_)
            | Self::Serialization(_)
            | Self::Io(_)
            | Self::Internal(_) => 500,
        }
    }

    /// Stable machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "config_error",
            Self::MissingField { .. } => "missing_field",
            Self::Validation(_) => "validation_error",
            Self::ModelNotFound(_) => "model_not_found",
            Self::Backend(_) => "backend_error",
            Self::Hook(_) => "hook_error",
            Self::Serialization(_) => "serialization_error",
            Self::Io(_) => "io_error",
            Self::Internal(_) => "internal_error",
        }
    }

    /// True for errors raised while constructing an adapter
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(Error::missing_field("chat", "title").status_code(), 400);
        assert_eq!(Error::ModelNotFound("nope".into()).status_code(), 404);
        assert_eq!(Error::Configuration("bad".into()).status_code(), 500);
        assert_eq!(Error::Backend("down".into()).status_code(), 500);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            Error::missing_field("chat", "title").error_code(),
            "missing_field"
        );
        assert_eq!(Error::Hook("boom".into()).error_code(), "hook_error");
        assert!(Error::Configuration("x".into()).is_configuration());
        assert!(!Error::Validation("x".into()).is_configuration());
    }

    #[test]
    fn test_missing_field_message() {
        let err = Error::missing_field("chat", "title");
        assert_eq!(
            err.to_string(),
            "Missing required field `title` on model `chat`"
        );
    }
}
