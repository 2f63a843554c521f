//! Tests for transfer payload validation.

use super::*;
use crate::property::SourceOption;
use serde_json::json;

fn setup() {
    let _ = initialize_payload_validator();
}

#[test]
fn test_schema_initialization_success() {
    assert!(initialize_payload_validator().is_ok());
    // Repeated initialization is a no-op.
    assert!(initialize_payload_validator().is_ok());
}

#[test]
fn test_schema_definition_is_an_object() {
    let schema = get_schema_definition().unwrap();
    assert_eq!(schema["type"], "object");
    assert!(schema["properties"]["features"].is_object());
}

#[test]
fn test_minimal_payload_passes() {
    setup();
    assert!(validate_config_payload(&json!({ "version": "1.0" })).is_ok());
    assert!(validate_config_payload(&json!({})).is_ok());
}

#[test]
fn test_full_payload_passes() {
    setup();
    let payload = json!({
        "version": "1.0",
        "exportedAt": "2024-01-15T10:30:00Z",
        "features": [
            { "featureName": "Resources", "enabled": true },
            { "featureName": "Orders", "enabled": true, "distinct": true, "autoDelete": false }
        ],
        "properties": [
            {
                "id": "5f0c6f1e-8f6a-4d0e-9b7a-1c2d3e4f5a6b",
                "tableName": "Orders",
                "columnName": "Priority",
                "dataType": "Int",
                "fixedValue": "1",
                "sourceOption": "FixedValue"
            },
            { "tableName": "Orders", "columnName": "Notes", "sourceOption": 3 }
        ]
    });

    assert!(validate_config_payload(&payload).is_ok());
}

#[test]
fn test_newer_minor_version_and_unknown_fields_pass() {
    setup();
    let payload = json!({
        "version": "1.7",
        "addedLater": [1, 2, 3],
        "features": [{ "featureName": "Tank", "enabled": true, "colour": "blue" }],
        "properties": [{ "tableName": "Resources", "columnName": "IsTank", "sourceOption": "Someday" }]
    });

    assert!(validate_config_payload(&payload).is_ok());
}

#[test]
fn test_unsupported_major_version_fails() {
    setup();
    let result = validate_config_payload(&json!({ "version": "2.0" }));

    match result {
        Err(ValidationError::UnsupportedVersion { version, supported }) => {
            assert_eq!(version, "2.0");
            assert_eq!(supported, vec!["1.0"]);
        }
        other => panic!("expected UnsupportedVersion, got {other:?}"),
    }
}

#[test]
fn test_non_string_version_fails() {
    setup();
    let result = validate_config_payload(&json!({ "version": 1 }));
    assert!(matches!(result, Err(ValidationError::ValidationFailed { .. })));
}

#[test]
fn test_missing_key_fields_pass_the_gate() {
    setup();
    let payload = json!({
        "version": "1.0",
        "features": [{ "enabled": true }],
        "properties": [{ "tableName": "Orders" }]
    });

    assert!(validate_config_payload(&payload).is_ok());
}

#[test]
fn test_wrong_field_types_pass_the_gate() {
    setup();
    let payload = json!({
        "version": "1.0",
        "exportedAt": 12,
        "features": [{ "featureName": "Resources", "enabled": "yes", "distinct": 0 }],
        "properties": [{ "tableName": "Orders", "columnName": "Priority", "fixedValue": 5 }]
    });
    assert!(validate_config_payload(&payload).is_ok());
}

#[test]
fn test_non_array_or_non_object_records_fail() {
    setup();
    let payload = json!({ "version": "1.0", "features": {} });
    assert!(matches!(
        validate_config_payload(&payload),
        Err(ValidationError::ValidationFailed { .. })
    ));

    let payload = json!({ "version": "1.0", "properties": ["Orders.Priority", 3] });
    match validate_config_payload(&payload) {
        Err(ValidationError::ValidationFailed {
            error_count,
            errors,
        }) => {
            assert_eq!(error_count, 2);
            assert_eq!(errors.len(), error_count);
        }
        other => panic!("expected ValidationFailed, got {other:?}"),
    }

    assert!(validate_config_payload(&json!([])).is_err());
}

#[test]
fn test_parse_keeps_good_records_beside_bad_ones() {
    let config = validate_and_parse_config(
        r#"{
            "version": "1.0",
            "features": [
                { "enabled": true },
                { "featureName": "Tank", "enabled": true, "distinct": "yes" }
            ],
            "properties": [
                { "tableName": "Resources", "columnName": "IsTank", "fixedValue": 5 }
            ]
        }"#,
    )
    .unwrap();

    assert_eq!(config.features.len(), 2);
    assert!(!config.features[0].has_key());
    assert_eq!(config.features[1].feature_name, "Tank");
    assert_eq!(config.features[1].enabled, Some(true));
    assert_eq!(config.features[1].distinct, None);
    assert_eq!(config.properties[0].fixed_value, None);
}

#[test]
fn test_is_supported_version() {
    assert!(is_supported_version("1.0"));
    assert!(is_supported_version("1.12"));
    assert!(!is_supported_version("1"));
    assert!(!is_supported_version("0.9"));
    assert!(!is_supported_version("1.0-beta"));
}

#[test]
fn test_validate_and_parse_config() {
    let json_str = r#"{
        "version": "1.0",
        "features": [{ "featureName": "Tank", "enabled": true }],
        "properties": [
            { "tableName": "Resources", "columnName": "IsTank", "sourceOption": "ClearValue" }
        ]
    }"#;

    let config = validate_and_parse_config(json_str).unwrap();
    assert_eq!(config.features.len(), 1);
    assert_eq!(
        config.properties[0].source_option,
        Some(SourceOption::ClearValue)
    );
}

#[test]
fn test_validate_and_parse_rejects_malformed_json() {
    let result = validate_and_parse_config("{ invalid json");
    assert!(matches!(result, Err(ValidationError::JsonParsing { .. })));
}

#[test]
fn test_version_pattern_compiles_once() {
    let first = version_pattern();
    assert!(first.is_match("1.3"));
    assert!(std::ptr::eq(first, version_pattern()));
}
