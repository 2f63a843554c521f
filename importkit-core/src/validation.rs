//! JSON Schema validation for configuration transfer payloads.
//!
//! Payloads are checked before they are merged into a configuration: the
//! version must belong to a supported major release and the document must
//! be an object whose `features` and `properties` are arrays of objects.
//! Record content is not checked here. Missing keys, unknown fields and
//! mistyped values are tolerated by deserialization and the merge.
//!
//! # Example
//! ```rust
//! use importkit_core::validation::{initialize_payload_validator, validate_config_payload};
//! use serde_json::json;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! initialize_payload_validator()?;
//!
//! let payload = json!({
//!     "version": "1.0",
//!     "features": [{ "featureName": "Resources", "enabled": true }],
//!     "properties": []
//! });
//!
//! validate_config_payload(&payload)?;
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

use jsonschema::Validator;
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use thiserror::Error;

use crate::transfer::ConfigDto;

/// Payload validation errors with field-level reporting
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Schema compilation failed during initialization
    #[error("JSON Schema compilation failed: {message}")]
    SchemaCompilation { message: String },

    /// Validation failed with specific field errors
    #[error("Payload validation failed with {error_count} errors: {errors:?}")]
    ValidationFailed {
        error_count: usize,
        errors: Vec<String>,
    },

    /// Unsupported format version detected
    #[error("Unsupported format version '{version}'. Supported versions: {supported:?}")]
    UnsupportedVersion {
        version: String,
        supported: Vec<String>,
    },

    /// JSON parsing error
    #[error("JSON parsing failed: {source}")]
    JsonParsing {
        #[from]
        source: serde_json::Error,
    },
}

/// Released format versions. Later 1.x minor versions are accepted too.
const SUPPORTED_VERSIONS: &[&str] = &["1.0"];

/// Embedded JSON Schema for the 1.x transfer format
const SCHEMA_V1: &str = r#"{
  "$schema": "https://json-schema.org/draft/2020-12/schema",
  "title": "ImportKit Configuration Transfer Format v1",
  "type": "object",
  "properties": {
    "version": { "type": "string", "pattern": "^1\\.\\d+$" },
    "features": {
      "type": "array",
      "items": { "type": "object" }
    },
    "properties": {
      "type": "array",
      "items": { "type": "object" }
    }
  }
}"#;

/// Compiled JSON Schema instance (initialized once)
static COMPILED_SCHEMA: OnceLock<Validator> = OnceLock::new();

fn version_pattern() -> &'static Regex {
    static VERSION_PATTERN: OnceLock<Regex> = OnceLock::new();
    VERSION_PATTERN.get_or_init(|| Regex::new(r"^1\.\d+$").expect("Invalid version pattern"))
}

/// Initialize and compile the payload schema.
///
/// Safe to call repeatedly; the first successful compilation is kept.
///
/// # Errors
/// Returns `ValidationError::SchemaCompilation` if the embedded schema is invalid.
pub fn initialize_payload_validator() -> Result<(), ValidationError> {
    if COMPILED_SCHEMA.get().is_some() {
        return Ok(());
    }

    let schema_json = get_schema_definition()?;
    let compiled =
        jsonschema::validator_for(&schema_json).map_err(|e| ValidationError::SchemaCompilation {
            message: format!("Schema compilation error: {e}"),
        })?;

    // Another thread may have won the race; either instance is equivalent.
    let _ = COMPILED_SCHEMA.set(compiled);

    Ok(())
}

/// Validate a transfer payload's version and shape.
///
/// The validator is initialized on first use.
///
/// # Errors
/// Returns `ValidationError::UnsupportedVersion` for a version outside the
/// 1.x line and `ValidationError::ValidationFailed` listing every shape
/// violation.
pub fn validate_config_payload(json_value: &Value) -> Result<(), ValidationError> {
    initialize_payload_validator()?;
    let schema = COMPILED_SCHEMA
        .get()
        .ok_or_else(|| ValidationError::SchemaCompilation {
            message: "Payload validator not initialized".to_string(),
        })?;

    validate_format_version(json_value)?;

    let errors: Vec<String> = schema
        .iter_errors(json_value)
        .map(|error| error.to_string())
        .collect();
    if !errors.is_empty() {
        return Err(ValidationError::ValidationFailed {
            error_count: errors.len(),
            errors,
        });
    }

    Ok(())
}

/// Whether `version` belongs to the supported 1.x line.
pub fn is_supported_version(version: &str) -> bool {
    version_pattern().is_match(version)
}

/// A missing version is read as the current format version.
fn validate_format_version(json_value: &Value) -> Result<(), ValidationError> {
    let Some(version) = json_value.get("version") else {
        return Ok(());
    };

    let version = version
        .as_str()
        .ok_or_else(|| ValidationError::ValidationFailed {
            error_count: 1,
            errors: vec!["Field 'version' must be a string".to_string()],
        })?;

    if !is_supported_version(version) {
        return Err(ValidationError::UnsupportedVersion {
            version: version.to_string(),
            supported: SUPPORTED_VERSIONS.iter().map(ToString::to_string).collect(),
        });
    }

    Ok(())
}

/// Parse, validate and deserialize a transfer payload.
///
/// # Errors
/// Returns validation errors for malformed JSON, unsupported versions or
/// shape violations.
///
/// # Example
/// ```rust
/// use importkit_core::validation::validate_and_parse_config;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = validate_and_parse_config(
///     r#"{ "version": "1.2", "features": [{ "featureName": "Tank", "enabled": true }] }"#,
/// )?;
/// assert_eq!(config.features[0].enabled, Some(true));
/// # Ok(())
/// # }
/// # example().unwrap();
/// ```
pub fn validate_and_parse_config(json_str: &str) -> Result<ConfigDto, ValidationError> {
    let json_value: Value = serde_json::from_str(json_str)?;

    validate_config_payload(&json_value)?;

    let config: ConfigDto = serde_json::from_value(json_value)?;
    Ok(config)
}

/// The embedded payload schema as a parsed value.
pub fn get_schema_definition() -> Result<Value, ValidationError> {
    serde_json::from_str(SCHEMA_V1).map_err(|e| ValidationError::SchemaCompilation {
        message: format!("Failed to parse embedded schema: {e}"),
    })
}

#[cfg(test)]
mod tests;
