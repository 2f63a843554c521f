//! Structured validation results for operators.
//!
//! Dependency problems and row-level violations are data, not errors: these
//! types carry them to the caller, which decides whether to block activation
//! or just warn.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::property::PropertyKey;

/// A property whose feature dependencies are not all enabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidProperty {
    pub table_name: String,
    pub column_name: String,
    /// Disabled features the property requires
    pub missing_features: Vec<String>,
}

impl InvalidProperty {
    /// Creates a new invalid property entry.
    pub fn new(key: &PropertyKey, missing_features: Vec<String>) -> Self {
        Self {
            table_name: key.table_name.clone(),
            column_name: key.column_name.clone(),
            missing_features,
        }
    }

    /// Identity of the offending property.
    pub fn key(&self) -> PropertyKey {
        PropertyKey::new(self.table_name.clone(), self.column_name.clone())
    }
}

impl fmt::Display for InvalidProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} requires disabled feature(s): {}",
            self.table_name,
            self.column_name,
            self.missing_features.join(", ")
        )
    }
}

/// Dependency validation across all enabled features.
///
/// Only features with at least one invalid property appear in the map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub invalid_features: BTreeMap<String, Vec<InvalidProperty>>,
}

impl ValidationReport {
    /// Creates an empty (valid) report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the invalid properties of one feature. Empty lists are dropped.
    pub fn record(&mut self, feature_name: &str, invalid: Vec<InvalidProperty>) {
        if !invalid.is_empty() {
            self.invalid_features.insert(feature_name.to_string(), invalid);
        }
    }

    /// True when no enabled feature has an unsatisfied dependency.
    pub fn is_valid(&self) -> bool {
        self.invalid_features.is_empty()
    }

    /// Total number of invalid properties across features.
    pub fn invalid_property_count(&self) -> usize {
        self.invalid_features.values().map(Vec::len).sum()
    }

    /// Invalid properties reported for one feature.
    pub fn for_feature(&self, feature_name: &str) -> &[InvalidProperty] {
        self.invalid_features
            .get(feature_name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            return writeln!(f, "All enabled features are valid");
        }
        for (feature, properties) in &self.invalid_features {
            writeln!(f, "Feature '{feature}':")?;
            for property in properties {
                writeln!(f, "  - {property}")?;
            }
        }
        Ok(())
    }
}

/// Required fields that were null or empty on a concrete data row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{} invalid value(s) for feature '{feature_name}' on table '{table_name}'", .invalid_values.len())]
pub struct RowValidationError {
    pub feature_name: String,
    pub table_name: String,
    /// Column name to violation message
    pub invalid_values: BTreeMap<String, String>,
}

impl RowValidationError {
    /// Creates a new row validation error.
    pub fn new(
        feature_name: &str,
        table_name: &str,
        invalid_values: BTreeMap<String, String>,
    ) -> Self {
        Self {
            feature_name: feature_name.to_string(),
            table_name: table_name.to_string(),
            invalid_values,
        }
    }

    /// One message per offending column, in column order.
    pub fn messages(&self) -> Vec<String> {
        self.invalid_values
            .iter()
            .map(|(column, message)| format!("{}.{column}: {message}", self.table_name))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tank_dependency() -> InvalidProperty {
        InvalidProperty::new(
            &PropertyKey::new("Resources", "IsTank"),
            vec!["Tank".to_string()],
        )
    }

    #[test]
    fn test_empty_report_is_valid() {
        let mut report = ValidationReport::new();
        report.record("Resources", Vec::new());

        assert!(report.is_valid());
        assert_eq!(report.invalid_property_count(), 0);
        assert!(report.for_feature("Resources").is_empty());
        assert_eq!(report.to_string(), "All enabled features are valid\n");
    }

    #[test]
    fn test_report_lists_feature_and_property() {
        let mut report = ValidationReport::new();
        report.record("Capacity", vec![tank_dependency()]);

        assert!(!report.is_valid());
        assert_eq!(report.invalid_property_count(), 1);
        assert_eq!(
            report.for_feature("Capacity")[0].key(),
            PropertyKey::new("Resources", "IsTank")
        );

        let text = report.to_string();
        assert!(text.contains("Feature 'Capacity':"));
        assert!(text.contains("Resources.IsTank requires disabled feature(s): Tank"));
    }

    #[test]
    fn test_row_validation_messages() {
        let mut invalid = BTreeMap::new();
        invalid.insert("Name".to_string(), "required value is empty".to_string());
        invalid.insert("ExternalId".to_string(), "required value is null".to_string());
        let error = RowValidationError::new("Resources", "Resources", invalid);

        assert_eq!(
            error.to_string(),
            "2 invalid value(s) for feature 'Resources' on table 'Resources'"
        );
        assert_eq!(
            error.messages(),
            vec![
                "Resources.ExternalId: required value is null",
                "Resources.Name: required value is empty",
            ]
        );
    }
}
