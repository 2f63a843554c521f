//! Error types for catalog construction, configuration loading and transfer.
//!
//! Unsatisfied feature dependencies and row-level violations are reported as
//! data (see [`crate::report`]) and never surface through these types. Broken
//! wiring between the feature catalog and its table builders panics instead.

use thiserror::Error;

use crate::validation::ValidationError;

/// Main error type for ImportKit operations.
#[derive(Debug, Error)]
pub enum ImportKitError {
    /// Configuration or settings error
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// The feature catalog is internally inconsistent
    #[error("Catalog error: {message}")]
    Catalog { message: String },

    /// A feature referenced by name is not registered
    #[error("Unknown feature: {name}")]
    UnknownFeature { name: String },

    /// A table referenced by name has no projection builder
    #[error("Unknown table: {name}")]
    UnknownTable { name: String },

    /// A transfer payload failed validation
    #[error("Configuration payload rejected: {source}")]
    Payload {
        #[from]
        source: ValidationError,
    },

    /// Serialization or deserialization failed
    #[error("Serialization failed: {context}")]
    Serialization {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Convenience type alias for Results with ImportKitError
pub type Result<T> = std::result::Result<T, ImportKitError>;

impl ImportKitError {
    /// Creates a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a catalog consistency error
    pub fn catalog(message: impl Into<String>) -> Self {
        Self::Catalog {
            message: message.into(),
        }
    }

    /// Creates an unknown feature error
    pub fn unknown_feature(name: impl Into<String>) -> Self {
        Self::UnknownFeature { name: name.into() }
    }

    /// Creates an unknown table error
    pub fn unknown_table(name: impl Into<String>) -> Self {
        Self::UnknownTable { name: name.into() }
    }

    /// Creates a serialization error with context
    pub fn serialization(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Serialization {
            context: context.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let error = ImportKitError::configuration("reserved word escape is empty");
        assert!(error.to_string().contains("reserved word escape is empty"));

        let error = ImportKitError::unknown_feature("Tank");
        assert_eq!(error.to_string(), "Unknown feature: Tank");

        let error = ImportKitError::unknown_table("Shifts");
        assert_eq!(error.to_string(), "Unknown table: Shifts");
    }

    #[test]
    fn test_payload_error_conversion() {
        let validation = ValidationError::UnsupportedVersion {
            version: "9.0".to_string(),
            supported: vec!["1.x".to_string()],
        };
        let error: ImportKitError = validation.into();
        assert!(matches!(error, ImportKitError::Payload { .. }));
        assert!(error.to_string().contains("9.0"));
    }

    #[test]
    fn test_serialization_error_keeps_context() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error = ImportKitError::serialization("reading catalog", source);
        assert!(error.to_string().contains("reading catalog"));
        assert!(std::error::Error::source(&error).is_some());
    }
}
